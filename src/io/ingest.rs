//! CSV ingest.
//!
//! Turns the `;`-separated monthly sales export into a typed `Dataset`.
//!
//! Unlike a screening tool, a report must never be drawn from a partial file:
//! any schema or value problem aborts the load with the line and column that
//! caused it.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::config::ReportConfig;
use crate::domain::{Dataset, Dimension, Month, PeriodSplit, Sabct, SalesRecord};
use crate::error::{DataFormatError, MetricsError};

/// Physical conventions of the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLayout {
    pub fiscal_year: i32,
    pub delimiter: u8,
    pub thousands_separator: char,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            fiscal_year: 2025,
            delimiter: b';',
            thousands_separator: ',',
        }
    }
}

impl SourceLayout {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            fiscal_year: config.fiscal_year,
            delimiter: config.delimiter_byte(),
            thousands_separator: config.thousands_separator,
        }
    }
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone)]
struct Columns {
    articulo: usize,
    zona: usize,
    canal: usize,
    sabct: usize,
    months: [usize; 12],
    width: usize,
}

/// Load a dataset with the default layout (`;`, `,` thousands, fiscal 2025).
pub fn load(path: &Path, split: PeriodSplit) -> Result<Dataset, MetricsError> {
    load_with(path, split, SourceLayout::default())
}

/// Load a dataset from `path`.
pub fn load_with(path: &Path, split: PeriodSplit, layout: SourceLayout) -> Result<Dataset, MetricsError> {
    let bytes = std::fs::read(path).map_err(|source| MetricsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_dataset(bytes.as_slice(), path, split, layout)
}

/// Parse a dataset from any reader; `source` is only used for messages.
pub fn parse_dataset<R: Read>(
    reader: R,
    source: &Path,
    split: PeriodSplit,
    layout: SourceLayout,
) -> Result<Dataset, MetricsError> {
    let fail = |e: DataFormatError| MetricsError::data_format(source, e);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(layout.delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| {
            fail(DataFormatError::Malformed {
                line: 1,
                message: e.to_string(),
            })
        })?
        .clone();

    let columns = resolve_columns(&headers, layout.fiscal_year).map_err(fail)?;

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Blank lines are skipped and quoted fields may span lines, so take
        // the line from the record's position.
        let fallback = idx + 2;
        let row = result.map_err(|e| {
            fail(DataFormatError::Malformed {
                line: e.position().map_or(fallback, source_line),
                message: e.to_string(),
            })
        })?;
        let line = row.position().map_or(fallback, source_line);
        if row.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let record = parse_row(&row, &columns, line, split, &layout).map_err(fail)?;
        records.push(record);
    }

    tracing::info!(
        source = %source.display(),
        rows = records.len(),
        split = split.pre_months(),
        "dataset loaded"
    );

    Ok(Dataset::new(source, split, layout.fiscal_year, records))
}

fn source_line(position: &csv::Position) -> usize {
    usize::try_from(position.line()).unwrap_or(usize::MAX)
}

fn resolve_columns(headers: &StringRecord, fiscal_year: i32) -> Result<Columns, DataFormatError> {
    let header_map = build_header_map(headers);

    let require = |name: &str| -> Result<usize, DataFormatError> {
        header_map
            .get(&name.to_uppercase())
            .copied()
            .ok_or_else(|| DataFormatError::MissingColumn {
                column: name.to_string(),
            })
    };

    let mut months = [0usize; 12];
    for month in Month::ALL {
        let label = month.column_label(fiscal_year);
        months[month.index()] = match require(&label) {
            Ok(idx) => idx,
            // Some exports spell September `Sep` instead of `Set`.
            Err(e) if month == Month::Set => {
                require(&format!("Sep-{:02}", fiscal_year.rem_euclid(100))).map_err(|_| e)?
            }
            Err(e) => return Err(e),
        };
    }

    let articulo = require(Dimension::Articulo.column_name())?;
    let zona = require(Dimension::Zona.column_name())?;
    let canal = require(Dimension::Canal.column_name())?;
    let sabct = require(Dimension::Sabct.column_name())?;

    let width = [articulo, zona, canal, sabct]
        .into_iter()
        .chain(months)
        .max()
        .unwrap_or(0)
        + 1;

    Ok(Columns {
        articulo,
        zona,
        canal,
        sabct,
        months,
        width,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for duplicated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel exports UTF-8 with a BOM on the first header.
    name.trim().trim_start_matches('\u{feff}').trim().to_uppercase()
}

fn parse_row(
    row: &StringRecord,
    columns: &Columns,
    line: usize,
    split: PeriodSplit,
    layout: &SourceLayout,
) -> Result<SalesRecord, DataFormatError> {
    if row.len() < columns.width {
        return Err(DataFormatError::Malformed {
            line,
            message: format!("expected at least {} fields, found {}", columns.width, row.len()),
        });
    }

    let text = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");

    let articulo = text(columns.articulo);
    if articulo.is_empty() {
        return Err(DataFormatError::EmptyValue {
            line,
            column: Dimension::Articulo.column_name().to_string(),
        });
    }

    let raw_class = text(columns.sabct);
    let sabct = Sabct::parse(raw_class).ok_or_else(|| DataFormatError::InvalidClassification {
        line,
        value: raw_class.to_string(),
    })?;

    let mut monthly = [0.0; 12];
    for month in Month::ALL {
        let raw = text(columns.months[month.index()]);
        monthly[month.index()] = parse_amount(raw, layout.thousands_separator).map_err(|kind| {
            let column = month.column_label(layout.fiscal_year);
            let value = raw.to_string();
            match kind {
                AmountError::NotNumeric => DataFormatError::InvalidNumber { line, column, value },
                AmountError::OutOfRange => DataFormatError::OutOfRange { line, column, value },
            }
        })?;
    }

    let record = SalesRecord::new(
        articulo,
        text(columns.zona),
        text(columns.canal),
        sabct,
        monthly,
        split,
    );
    // Every cell is finite, but twelve large ones can still overflow the sum.
    if !record.total_year().is_finite() {
        return Err(DataFormatError::OutOfRange {
            line,
            column: "TOTAL_YEAR".to_string(),
            value: record.total_year().to_string(),
        });
    }
    Ok(record)
}

/// Why a monthly amount was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    NotNumeric,
    OutOfRange,
}

/// Parse a monthly amount, stripping thousands separators.
///
/// A blank cell is a month without sales (`0.0`). With `.` as the thousands
/// separator the amount is read in decimal-comma notation (`1.234,5`).
pub fn parse_amount(raw: &str, thousands_separator: char) -> Result<f64, AmountError> {
    let decimal_comma = thousands_separator == '.';
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != thousands_separator)
        .map(|c| if decimal_comma && c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    let value = cleaned.parse::<f64>().map_err(|_| AmountError::NotNumeric)?;
    if !value.is_finite() || value < 0.0 {
        return Err(AmountError::OutOfRange);
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    pub(crate) const HEADER: &str = "ARTICULO;ZONA_CONSOLIDADO;CANAL;SABCT;Ene-25;Feb-25;Mar-25;Abr-25;May-25;Jun-25;Jul-25;Ago-25;Set-25;Oct-25;Nov-25;Dic-25";

    pub(crate) fn row(sku: &str, zona: &str, canal: &str, sabct: &str, months: [&str; 12]) -> String {
        format!("{sku};{zona};{canal};{sabct};{}", months.join(";"))
    }

    fn parse(text: &str) -> Result<Dataset, MetricsError> {
        parse_dataset(
            text.as_bytes(),
            Path::new("test.csv"),
            PeriodSplit::default(),
            SourceLayout::default(),
        )
    }

    fn format_error(err: MetricsError) -> DataFormatError {
        match err {
            MetricsError::DataFormat { source, .. } => source,
            other => panic!("expected data format error, got {other:?}"),
        }
    }

    #[test]
    fn parse_amount_strips_separators() {
        assert_eq!(parse_amount("1,234", ','), Ok(1234.0));
        assert_eq!(parse_amount(" 1,234,567.50 ", ','), Ok(1_234_567.5));
        assert_eq!(parse_amount("", ','), Ok(0.0));
        assert_eq!(parse_amount("abc", ','), Err(AmountError::NotNumeric));
        assert_eq!(parse_amount("-5", ','), Err(AmountError::OutOfRange));
        assert_eq!(parse_amount("inf", ','), Err(AmountError::OutOfRange));
    }

    #[test]
    fn parse_amount_decimal_comma() {
        assert_eq!(parse_amount("1.234", '.'), Ok(1234.0));
        assert_eq!(parse_amount("1.234,5", '.'), Ok(1234.5));
        assert_eq!(parse_amount("1.5", '.'), Ok(15.0));
        assert_eq!(parse_amount("1,2,3", '.'), Err(AmountError::NotNumeric));
    }

    #[test]
    fn line_numbers_survive_blank_lines() {
        let text = format!(
            "{HEADER}\n{}\n\n{}\n",
            row("SKU1", "LIMA", "RETAIL", "A", ["1"; 12]),
            row("SKU2", "LIMA", "RETAIL", "A", ["abc"; 12]),
        );
        match format_error(parse(&text).unwrap_err()) {
            DataFormatError::InvalidNumber { line, column, value } => {
                assert_eq!(line, 4);
                assert_eq!(column, "Ene-25");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn line_numbers_survive_multiline_fields() {
        let text = format!(
            "{HEADER}\n\"SKU\n1\";LIMA;RETAIL;A;{}\n{}\n",
            ["1"; 12].join(";"),
            row("SKU2", "LIMA", "RETAIL", "Z", ["1"; 12]),
        );
        assert_eq!(
            format_error(parse(&text).unwrap_err()),
            DataFormatError::InvalidClassification {
                line: 4,
                value: "Z".to_string()
            }
        );
    }

    #[test]
    fn overflowing_total_is_rejected() {
        let text = format!("{HEADER}\n{}\n", row("SKU1", "LIMA", "RETAIL", "A", ["1e308"; 12]));
        match format_error(parse(&text).unwrap_err()) {
            DataFormatError::OutOfRange { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, "TOTAL_YEAR");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn configured_layout_is_honoured() {
        let config = ReportConfig {
            fiscal_year: 2024,
            delimiter: ',',
            thousands_separator: '.',
            ..ReportConfig::default()
        };
        assert!(config.validate().is_ok());
        let layout = SourceLayout::from_config(&config);
        assert_eq!(layout.delimiter, b',');

        let header = HEADER.replace(';', ",").replace("-25", "-24");
        let mut amounts = ["1.000"; 12];
        amounts[0] = "\"1.234,5\"";
        let text = format!("{header}\nSKU1,LIMA,RETAIL,A,{}\n", amounts.join(","));

        let ds = parse_dataset(
            text.as_bytes(),
            Path::new("layout.csv"),
            PeriodSplit::default(),
            layout,
        )
        .unwrap();
        assert_eq!(ds.fiscal_year(), 2024);
        let rec = &ds.records()[0];
        assert_eq!(rec.month(Month::Ene), 1234.5);
        assert_eq!(rec.month(Month::Dic), 1000.0);
        assert_eq!(rec.total_year(), 1234.5 + 11_000.0);

        // A 2025 header does not satisfy a 2024 layout.
        let text = format!("{}\n", HEADER.replace(';', ","));
        let err = parse_dataset(text.as_bytes(), Path::new("layout.csv"), PeriodSplit::default(), layout)
            .unwrap_err();
        assert_eq!(
            format_error(err),
            DataFormatError::MissingColumn {
                column: "Ene-24".to_string()
            }
        );
    }

    #[test]
    fn records_carry_the_dataset_split() {
        let text = format!("{HEADER}\n{}\n", row("SKU1", "LIMA", "RETAIL", "A", ["1"; 12]));
        let split = PeriodSplit::new(4).unwrap();
        let ds = parse_dataset(text.as_bytes(), Path::new("test.csv"), split, SourceLayout::default()).unwrap();
        assert!(ds.records().iter().all(|r| r.split() == ds.split()));
        assert_eq!(ds.records()[0].pre_period_total(), 4.0);
    }

    #[test]
    fn parses_rows_in_source_order() {
        let text = format!(
            "\u{feff}{HEADER}\n{}\n{}\n",
            row("SKU1", "LIMA", "MINORISTA", "A", ["1,000"; 12]),
            row("SKU2", "PIURA", "RETAIL", "Nuevo", ["0", "", "5", "5", "5", "5", "5", "5", "5", "5", "5", "5"]),
        );
        let ds = parse(&text).unwrap();
        assert_eq!(ds.len(), 2);
        let first = &ds.records()[0];
        assert_eq!(first.articulo(), "SKU1");
        assert_eq!(first.total_year(), 12_000.0);
        assert_eq!(first.pre_period_total(), 7_000.0);
        assert_eq!(first.post_period_total(), 5_000.0);
        let second = &ds.records()[1];
        assert_eq!(second.sabct(), Sabct::Nuevo);
        assert_eq!(second.total_year(), 50.0);
    }

    #[test]
    fn malformed_amount_is_a_format_error() {
        let text = format!("{HEADER}\n{}\n", row("SKU1", "LIMA", "RETAIL", "A", ["abc"; 12]));
        match format_error(parse(&text).unwrap_err()) {
            DataFormatError::InvalidNumber { line, column, value } => {
                assert_eq!(line, 2);
                assert_eq!(column, "Ene-25");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_column_is_reported() {
        let text = HEADER.replace(";CANAL", "") + "\n";
        assert_eq!(
            format_error(parse(&text).unwrap_err()),
            DataFormatError::MissingColumn {
                column: "CANAL".to_string()
            }
        );

        let text = HEADER.replace(";Dic-25", "") + "\n";
        assert_eq!(
            format_error(parse(&text).unwrap_err()),
            DataFormatError::MissingColumn {
                column: "Dic-25".to_string()
            }
        );
    }

    #[test]
    fn september_alias_is_accepted() {
        let text = format!(
            "{}\n{}\n",
            HEADER.replace("Set-25", "Sep-25"),
            row("SKU1", "LIMA", "RETAIL", "S", ["1"; 12])
        );
        assert_eq!(parse(&text).unwrap().records()[0].total_year(), 12.0);
    }

    #[test]
    fn unknown_classification_is_rejected() {
        let text = format!("{HEADER}\n{}\n", row("SKU1", "LIMA", "RETAIL", "Z", ["1"; 12]));
        assert_eq!(
            format_error(parse(&text).unwrap_err()),
            DataFormatError::InvalidClassification {
                line: 2,
                value: "Z".to_string()
            }
        );
    }

    #[test]
    fn short_row_is_rejected() {
        let text = format!("{HEADER}\nSKU1;LIMA;RETAIL;A;1;2\n");
        assert!(matches!(
            format_error(parse(&text).unwrap_err()),
            DataFormatError::Malformed { line: 2, .. }
        ));
    }

    #[test]
    fn header_only_file_is_an_empty_dataset() {
        let ds = parse(&format!("{HEADER}\n")).unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load(&PathBuf::from("/nonexistent/ventas.csv"), PeriodSplit::default()).unwrap_err();
        assert!(matches!(err, MetricsError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/ventas.csv"));
    }

    #[test]
    fn load_is_idempotent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "{}", row("SKU1", "LIMA", "RETAIL", "A", ["1,5"; 12])).unwrap();
        writeln!(file, "{}", row("SKU2", "CUSCO", "INTEGRADOR", "T", ["2"; 12])).unwrap();

        let a = load(file.path(), PeriodSplit::default()).unwrap();
        let b = load(file.path(), PeriodSplit::default()).unwrap();
        assert_eq!(a, b);
        for rec in a.records() {
            let diff = rec.pre_period_total() + rec.post_period_total() - rec.total_year();
            assert!(diff.abs() < 1e-9);
        }
    }
}
