use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use arrow::array::Array;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::DataFormatError;
use super::model::{OrderLine, OrderTable};

type Result<T> = std::result::Result<T, DataFormatError>;

/// Columns every source must provide.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "order_id",
    "customer_id",
    "order_date",
    "country",
    "region",
    "channel",
    "product_category",
    "product_name",
    "quantity",
    "unit_price",
    "discount_rate",
    "net_revenue",
    "returned",
];

/// Columns that may be absent.
pub const OPTIONAL_COLUMNS: [&str; 1] = ["gross_revenue"];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load an order table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one order line per record
/// * `.parquet` – flat columns with the same names (any scalar Arrow type)
/// * `.json`    – `[{ "order_id": ..., "order_date": ..., ... }, ...]`
pub fn load_file(path: &Path) -> Result<OrderTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let source = path.display().to_string();
    match ext.as_str() {
        "csv" => load_csv(File::open(path)?, &source),
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(BufReader::new(File::open(path)?), &source),
        other => Err(DataFormatError::UnsupportedExtension(other.to_string())),
    }
}

/// Load CSV text from any reader (header row required).
pub fn load_csv_reader<R: Read>(reader: R) -> Result<OrderTable> {
    load_csv(reader, "<reader>")
}

/// Load a JSON array of records from any reader.
pub fn load_json_reader<R: Read>(reader: R) -> Result<OrderTable> {
    load_json(reader, "<reader>")
}

// ---------------------------------------------------------------------------
// Column layout and row parsing, shared by every format
// ---------------------------------------------------------------------------

/// Positional access to the raw text of one source record.
trait Cells {
    fn cell(&self, idx: usize) -> &str;
}

impl Cells for csv::StringRecord {
    fn cell(&self, idx: usize) -> &str {
        self.get(idx).unwrap_or("")
    }
}

impl Cells for Vec<String> {
    fn cell(&self, idx: usize) -> &str {
        self.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// Position of every known column in the source header.
#[derive(Debug)]
struct ColumnLayout {
    required: [usize; REQUIRED_COLUMNS.len()],
    gross_revenue: Option<usize>,
}

impl ColumnLayout {
    fn resolve(headers: &[String]) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let mut required = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = find(name).ok_or(DataFormatError::MissingColumn(name))?;
        }
        Ok(ColumnLayout {
            required,
            gross_revenue: find(OPTIONAL_COLUMNS[0]),
        })
    }
}

/// Accumulates parsed rows and soft-invariant counters.
struct TableBuilder {
    layout: ColumnLayout,
    rows: Vec<OrderLine>,
    net_above_gross: usize,
    discount_out_of_range: usize,
}

impl TableBuilder {
    fn new(headers: &[String]) -> Result<Self> {
        Ok(TableBuilder {
            layout: ColumnLayout::resolve(headers)?,
            rows: Vec::new(),
            net_above_gross: 0,
            discount_out_of_range: 0,
        })
    }

    fn push<C: Cells>(&mut self, cells: &C) -> Result<()> {
        let row = self.rows.len() + 1;
        let [
            order_id,
            customer_id,
            order_date,
            country,
            region,
            channel,
            product_category,
            product_name,
            quantity,
            unit_price,
            discount_rate,
            net_revenue,
            returned,
        ] = self.layout.required;
        let field = |idx: usize, column: &'static str| Field {
            row,
            column,
            raw: cells.cell(idx),
        };

        let mut line = OrderLine {
            order_id: field(order_id, "order_id").text()?,
            customer_id: field(customer_id, "customer_id").text()?,
            order_date: field(order_date, "order_date").date()?,
            country: field(country, "country").text()?,
            region: field(region, "region").text()?,
            channel: field(channel, "channel").text()?,
            product_category: field(product_category, "product_category").text()?,
            product_name: field(product_name, "product_name").text()?,
            quantity: field(quantity, "quantity").positive_int()?,
            unit_price: field(unit_price, "unit_price").real()?,
            discount_rate: field(discount_rate, "discount_rate").real()?,
            gross_revenue: match self.layout.gross_revenue {
                Some(idx) => field(idx, "gross_revenue").optional_real()?,
                None => None,
            },
            net_revenue: field(net_revenue, "net_revenue").real()?,
            returned: field(returned, "returned").flag()?,
            year_month: String::new(),
            aov: 0.0,
        };
        line.derive_columns();

        if matches!(line.gross_revenue, Some(gross) if line.net_revenue > gross) {
            self.net_above_gross += 1;
        }
        if !(0.0..=1.0).contains(&line.discount_rate) {
            self.discount_out_of_range += 1;
        }
        self.rows.push(line);
        Ok(())
    }

    fn finish(self, source: &str) -> OrderTable {
        let has_gross = self.layout.gross_revenue.is_some();
        if self.net_above_gross > 0 {
            log::warn!(
                "{source}: {} line(s) have net_revenue above gross_revenue",
                self.net_above_gross
            );
        }
        if self.discount_out_of_range > 0 {
            log::warn!(
                "{source}: {} line(s) have discount_rate outside [0, 1]",
                self.discount_out_of_range
            );
        }
        log::info!(
            "loaded {} order lines from {source} (gross_revenue column: {})",
            self.rows.len(),
            if has_gross { "present" } else { "absent" }
        );
        OrderTable::from_derived(self.rows, has_gross)
    }
}

/// One raw cell plus the coordinates needed for a precise error.
struct Field<'a> {
    row: usize,
    column: &'static str,
    raw: &'a str,
}

impl Field<'_> {
    fn invalid(&self, expected: &'static str) -> DataFormatError {
        DataFormatError::InvalidField {
            row: self.row,
            column: self.column,
            value: self.raw.to_string(),
            expected,
        }
    }

    /// Categorical and id columns: empty or null cells are rejected.
    fn text(&self) -> Result<String> {
        if self.raw.trim().is_empty() {
            return Err(self.invalid("a non-empty value"));
        }
        Ok(self.raw.to_string())
    }

    fn date(&self) -> Result<NaiveDate> {
        parse_date(self.raw.trim()).ok_or_else(|| self.invalid("a date"))
    }

    /// Finite reals only; `NaN` or `inf` would poison every sum downstream.
    fn real(&self) -> Result<f64> {
        match self.raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(self.invalid("a finite number")),
        }
    }

    fn optional_real(&self) -> Result<Option<f64>> {
        match self.raw.trim() {
            "" | "NaN" | "nan" | "null" => Ok(None),
            _ => self.real().map(Some),
        }
    }

    /// Integral floats such as `3.0` are accepted, since tabular writers often widen ints.
    fn positive_int(&self) -> Result<u32> {
        let s = self.raw.trim();
        let value = match s.parse::<u32>() {
            Ok(v) => v,
            Err(_) => match s.parse::<f64>() {
                Ok(f) if f.fract() == 0.0 && f >= 0.0 && f <= f64::from(u32::MAX) => f as u32,
                _ => return Err(self.invalid("a positive integer")),
            },
        };
        if value == 0 {
            return Err(self.invalid("a positive integer"));
        }
        Ok(value)
    }

    fn flag(&self) -> Result<bool> {
        match self.raw.trim() {
            "1" | "1.0" | "true" | "True" | "TRUE" => Ok(true),
            "0" | "0.0" | "false" | "False" | "FALSE" => Ok(false),
            _ => Err(self.invalid("a 0/1 flag")),
        }
    }
}

/// Accepts ISO dates, naive date-times and RFC 3339 timestamps; keeps the calendar date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv<R: Read>(reader: R, source: &str) -> Result<OrderTable> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut table = TableBuilder::new(&headers)?;
    for result in reader.records() {
        let record = result?;
        table.push(&record)?;
    }
    Ok(table.finish(source))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `to_json(orient='records')` layout.
/// The header is the union of keys over all records; every record must
/// still carry each required key.
fn load_json<R: Read>(reader: R, source: &str) -> Result<OrderTable> {
    let root: JsonValue = serde_json::from_reader(reader)?;
    let records = root
        .as_array()
        .ok_or_else(|| DataFormatError::Malformed("expected top-level JSON array".into()))?;

    if records.is_empty() {
        log::info!("{source}: empty JSON array, loaded 0 order lines");
        return Ok(OrderTable::from_derived(Vec::new(), false));
    }

    let objects = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            rec.as_object().ok_or_else(|| {
                DataFormatError::Malformed(format!("record {} is not a JSON object", i + 1))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let headers: Vec<String> = objects
        .iter()
        .flat_map(|obj| obj.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect();

    let mut table = TableBuilder::new(&headers)?;
    for (i, obj) in objects.iter().enumerate() {
        if let Some(column) = REQUIRED_COLUMNS.into_iter().find(|c| !obj.contains_key(*c)) {
            return Err(DataFormatError::MissingField { row: i + 1, column });
        }
        let cells: Vec<String> = headers
            .iter()
            .map(|h| obj.get(h).map(json_cell_text).unwrap_or_default())
            .collect();
        table.push(&cells)?;
    }
    Ok(table.finish(source))
}

fn json_cell_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file.  Each cell goes through Arrow's display
/// formatter so ints, floats, dates and timestamps all reach the same parser
/// as CSV text.  Works with files written by Pandas, Polars and Arrow.
fn load_parquet(path: &Path) -> Result<OrderTable> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let mut table = TableBuilder::new(&headers)?;
    let reader = builder.build()?;
    let options = FormatOptions::default();

    for batch_result in reader {
        let batch = batch_result?;
        let formatters = batch
            .columns()
            .iter()
            .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for row in 0..batch.num_rows() {
            let cells: Vec<String> = batch
                .columns()
                .iter()
                .zip(&formatters)
                .map(|(col, fmt)| {
                    if col.is_null(row) {
                        String::new()
                    } else {
                        fmt.value(row).to_string()
                    }
                })
                .collect();
            table.push(&cells)?;
        }
    }

    Ok(table.finish(&path.display().to_string()))
}
