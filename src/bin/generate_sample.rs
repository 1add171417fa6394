use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use clap::Parser;
use parquet::arrow::ArrowWriter;

use orderscope::{write_csv, OrderLine, OrderTable};

/// Write a deterministic synthetic order table as CSV and Parquet.
#[derive(Debug, Parser)]
struct Args {
    /// Output directory.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Number of orders (each has 1-3 lines).
    #[arg(long, default_value_t = 2000)]
    orders: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n.max(1)
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len())]
    }
}

const COUNTRIES: [(&str, &[&str]); 4] = [
    ("US", &["West", "East", "South", "Midwest"]),
    ("DE", &["Bavaria", "Berlin", "Hesse"]),
    ("FR", &["Ile-de-France", "Occitanie"]),
    ("JP", &["Kanto", "Kansai"]),
];
const CHANNELS: [&str; 3] = ["Web", "Mobile", "Marketplace"];
const CATALOG: [(&str, &[(&str, f64)]); 4] = [
    ("Electronics", &[("Headphones", 89.0), ("Charger", 19.5), ("Monitor", 229.0)]),
    ("Home", &[("Lamp", 35.0), ("Blender", 64.0), ("Rug", 120.0)]),
    ("Books", &[("Novel", 14.0), ("Cookbook", 27.5)]),
    ("Toys", &[("Puzzle", 22.0), ("Kite", 18.0), ("Robot Kit", 75.0)]),
];
const DISCOUNTS: [f64; 5] = [0.0, 0.0, 0.05, 0.1, 0.2];

fn generate(args: &Args) -> Vec<OrderLine> {
    let mut rng = SimpleRng::new(args.seed);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
    let n_customers = (args.orders / 3).max(1);
    let mut lines = Vec::new();

    for order in 0..args.orders {
        let order_id = format!("ORD-{order:06}");
        let customer_id = format!("CUST-{:05}", rng.below(n_customers));
        let order_date = start + Days::new(rng.below(730) as u64);
        let (country, regions) = rng.pick(&COUNTRIES);
        let region = rng.pick(regions);
        let channel = rng.pick(&CHANNELS);

        for _ in 0..=rng.below(3) {
            let (category, products) = rng.pick(&CATALOG);
            let (product, base_price) = rng.pick(products);
            let quantity = 1 + rng.below(4) as u32;
            let unit_price = (base_price * (0.9 + 0.2 * rng.next_f64()) * 100.0).round() / 100.0;
            let discount_rate = *rng.pick(&DISCOUNTS);
            let gross = unit_price * f64::from(quantity);
            let net = ((gross * (1.0 - discount_rate)) * 100.0).round() / 100.0;

            lines.push(OrderLine {
                order_id: order_id.clone(),
                customer_id: customer_id.clone(),
                order_date,
                country: country.to_string(),
                region: region.to_string(),
                channel: channel.to_string(),
                product_category: category.to_string(),
                product_name: product.to_string(),
                quantity,
                unit_price,
                discount_rate,
                gross_revenue: Some((gross * 100.0).round() / 100.0),
                net_revenue: net,
                returned: rng.next_f64() < 0.07,
                year_month: String::new(),
                aov: 0.0,
            });
        }
    }
    lines
}

fn write_parquet(table: &OrderTable, path: &Path) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let rows = table.rows();
    let text = |f: fn(&OrderLine) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let real = |f: fn(&OrderLine) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Utf8, false),
        Field::new("customer_id", DataType::Utf8, false),
        Field::new("order_date", DataType::Date32, false),
        Field::new("country", DataType::Utf8, false),
        Field::new("region", DataType::Utf8, false),
        Field::new("channel", DataType::Utf8, false),
        Field::new("product_category", DataType::Utf8, false),
        Field::new("product_name", DataType::Utf8, false),
        Field::new("quantity", DataType::Int64, false),
        Field::new("unit_price", DataType::Float64, false),
        Field::new("discount_rate", DataType::Float64, false),
        Field::new("gross_revenue", DataType::Float64, true),
        Field::new("net_revenue", DataType::Float64, false),
        Field::new("returned", DataType::Boolean, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            text(|r| r.order_id.as_str()),
            text(|r| r.customer_id.as_str()),
            Arc::new(Date32Array::from(
                rows.iter()
                    .map(|r| (r.order_date - epoch).num_days() as i32)
                    .collect::<Vec<_>>(),
            )),
            text(|r| r.country.as_str()),
            text(|r| r.region.as_str()),
            text(|r| r.channel.as_str()),
            text(|r| r.product_category.as_str()),
            text(|r| r.product_name.as_str()),
            Arc::new(Int64Array::from(
                rows.iter().map(|r| i64::from(r.quantity)).collect::<Vec<_>>(),
            )),
            real(|r| r.unit_price),
            real(|r| r.discount_rate),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.gross_revenue).collect::<Vec<_>>(),
            )),
            real(|r| r.net_revenue),
            Arc::new(BooleanArray::from(
                rows.iter().map(|r| r.returned).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("building record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let table = OrderTable::new(generate(&args), true);

    let csv_path = args.out.join("ecommerce_orders.csv");
    let file = File::create(&csv_path).with_context(|| format!("creating {}", csv_path.display()))?;
    write_csv(&table, file).context("writing CSV")?;

    let parquet_path = args.out.join("ecommerce_orders.parquet");
    write_parquet(&table, &parquet_path)?;

    println!(
        "Wrote {} order lines ({} orders) to {} and {}",
        table.len(),
        args.orders,
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
