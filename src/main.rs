use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;

use orderscope::data::views::DEFAULT_TOP_N;
use orderscope::{to_csv_bytes, Bounds, Dashboard, FilterCriteria, ReturnedState, Session};

/// E-commerce insights: filter an order table and print KPIs and breakdowns.
#[derive(Debug, Parser)]
#[command(name = "orderscope", version, about)]
struct Cli {
    /// Order table (.csv, .parquet or .json).
    data: PathBuf,

    /// JSON file with filter criteria; flags below override its fields.
    #[arg(long)]
    criteria: Option<PathBuf>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    from: Option<NaiveDate>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    to: Option<NaiveDate>,

    #[arg(long)]
    country: Vec<String>,

    #[arg(long)]
    region: Vec<String>,

    #[arg(long)]
    channel: Vec<String>,

    #[arg(long)]
    category: Vec<String>,

    #[arg(long)]
    product: Vec<String>,

    /// All, Returned or "Not Returned".
    #[arg(long)]
    returned: Option<ReturnedState>,

    #[arg(long, value_name = "LO:HI", value_parser = parse_bounds::<f64>)]
    price: Option<Bounds<f64>>,

    #[arg(long, value_name = "LO:HI", value_parser = parse_bounds::<u32>)]
    quantity: Option<Bounds<u32>>,

    #[arg(long, value_name = "LO:HI", value_parser = parse_bounds::<f64>)]
    discount: Option<Bounds<f64>>,

    /// Rows in the top products / customers tables.
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top: usize,

    /// Write the filtered table to this CSV file.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print the dashboard as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Print the available filter choices and exit.
    #[arg(long)]
    options: bool,
}

fn parse_bounds<T>(s: &str) -> std::result::Result<Bounds<T>, String>
where
    T: FromStr + PartialOrd,
    T::Err: std::fmt::Display,
{
    let (lo, hi) = s
        .split_once(':')
        .ok_or_else(|| format!("expected LO:HI, got '{s}'"))?;
    let lo = lo.trim().parse::<T>().map_err(|e| format!("bad lower bound: {e}"))?;
    let hi = hi.trim().parse::<T>().map_err(|e| format!("bad upper bound: {e}"))?;
    Ok(Bounds::new(lo, hi))
}

impl Cli {
    fn criteria(&self) -> Result<FilterCriteria> {
        let mut criteria = match &self.criteria {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading criteria file {}", path.display()))?;
                serde_json::from_str(&text).context("parsing criteria JSON")?
            }
            None => FilterCriteria::default(),
        };

        if self.from.is_some() {
            criteria.date_from = self.from;
        }
        if self.to.is_some() {
            criteria.date_to = self.to;
        }
        for (flag, field) in [
            (&self.country, &mut criteria.country),
            (&self.region, &mut criteria.region),
            (&self.channel, &mut criteria.channel),
            (&self.category, &mut criteria.product_category),
            (&self.product, &mut criteria.product_name),
        ] {
            if !flag.is_empty() {
                *field = flag.iter().cloned().collect();
            }
        }
        if let Some(state) = self.returned {
            criteria.returned = state;
        }
        if self.price.is_some() {
            criteria.unit_price = self.price;
        }
        if self.quantity.is_some() {
            criteria.quantity = self.quantity;
        }
        if self.discount.is_some() {
            criteria.discount_rate = self.discount;
        }
        Ok(criteria)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let session = Session::open(&cli.data)
        .with_context(|| format!("loading {}", cli.data.display()))?;

    if cli.options {
        println!("{}", serde_json::to_string_pretty(session.options())?);
        return Ok(());
    }

    let criteria = cli.criteria()?;
    log::debug!("criteria: {criteria:?}");
    let snapshot = session.apply(&criteria, cli.top);
    log::info!(
        "{} of {} order lines match",
        snapshot.table.len(),
        session.table().len()
    );

    if let Some(path) = &cli.export {
        let bytes = to_csv_bytes(&snapshot.table).context("serializing filtered table")?;
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        log::info!("exported {} rows to {}", snapshot.table.len(), path.display());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snapshot.dashboard)?);
    } else {
        print_report(&snapshot.dashboard);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

fn print_report(d: &Dashboard) {
    let k = &d.kpis;
    let optional = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
    println!("== KPIs");
    println!("  Net revenue     {:.2}", k.total_net_revenue);
    println!("  Gross revenue   {}", optional(k.total_gross_revenue));
    println!("  Discount amount {}", optional(k.discount_amount));
    println!("  Orders          {}", k.orders);
    println!("  Customers       {}", k.customers);
    println!("  AOV             {:.2}", k.aov);
    println!("  Return rate     {:.2}%", k.return_rate * 100.0);

    section(
        "Monthly revenue",
        d.monthly_revenue
            .iter()
            .map(|r| (&r.year_month, money(r.net_revenue))),
    );
    section(
        "Monthly orders",
        d.monthly_orders
            .iter()
            .map(|r| (&r.year_month, r.orders.to_string())),
    );
    section(
        "Revenue by category",
        d.category_revenue
            .iter()
            .map(|r| (&r.product_category, money(r.net_revenue))),
    );
    section(
        "Return rate by category",
        d.returns_by_category
            .iter()
            .map(|r| (&r.product_category, format!("{:.4}", r.return_rate))),
    );
    section(
        "Revenue by country",
        d.country_revenue
            .iter()
            .map(|r| (&r.country, money(r.net_revenue))),
    );
    section(
        "Revenue by channel",
        d.channel_revenue
            .iter()
            .map(|r| (&r.channel, money(r.net_revenue))),
    );
    section(
        "Average order value by month",
        d.aov_by_month
            .iter()
            .map(|r| (&r.year_month, money(r.aov))),
    );
    section(
        "Top products",
        d.top_products
            .iter()
            .map(|r| (&r.product_name, money(r.net_revenue))),
    );
    section(
        "Top customers",
        d.top_customers
            .iter()
            .map(|r| (&r.customer_id, money(r.net_revenue))),
    );
}

fn money(v: f64) -> String {
    format!("{v:.2}")
}

fn section<'a>(title: &str, rows: impl Iterator<Item = (&'a String, String)>) {
    println!();
    println!("== {title}");
    let mut empty = true;
    for (key, value) in rows {
        println!("  {key:<28} {value:>14}");
        empty = false;
    }
    if empty {
        println!("  (no data)");
    }
}
