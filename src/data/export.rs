use std::io::Write;

use super::error::DataFormatError;
use super::model::{OrderLine, OrderTable};

/// Export header.  `gross_revenue` is written only when the source had it.
fn header(has_gross: bool) -> Vec<&'static str> {
    let mut cols = vec![
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
    ];
    if has_gross {
        cols.push("gross_revenue");
    }
    cols.extend(["net_revenue", "returned", "year_month", "aov"]);
    cols
}

fn record(row: &OrderLine, has_gross: bool) -> Vec<String> {
    let mut fields = vec![
        row.order_id.clone(),
        row.customer_id.clone(),
        row.order_date.format("%Y-%m-%d").to_string(),
        row.country.clone(),
        row.region.clone(),
        row.channel.clone(),
        row.product_category.clone(),
        row.product_name.clone(),
        row.quantity.to_string(),
        row.unit_price.to_string(),
        row.discount_rate.to_string(),
    ];
    if has_gross {
        fields.push(row.gross_revenue.map(|g| g.to_string()).unwrap_or_default());
    }
    fields.extend([
        row.net_revenue.to_string(),
        u8::from(row.returned).to_string(),
        row.year_month.clone(),
        row.aov.to_string(),
    ]);
    fields
}

/// Write the table as comma-separated UTF-8 text with a header row.
pub fn write_csv<W: Write>(table: &OrderTable, writer: W) -> Result<(), DataFormatError> {
    let has_gross = table.has_gross_revenue();
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(header(has_gross))?;
    for row in table {
        out.write_record(record(row, has_gross))?;
    }
    out.flush()?;
    Ok(())
}

/// The downloadable artifact: the filtered table as CSV bytes.
pub fn to_csv_bytes(table: &OrderTable) -> Result<Vec<u8>, DataFormatError> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(buf)
}
