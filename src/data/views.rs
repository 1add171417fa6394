//! Aggregation views over a (filtered) order table.
//!
//! Every view is a pure function of the table.  Group-by views sort their
//! output explicitly; ties on the sort metric are broken by ascending group
//! key so results are reproducible.  Only the KPI bundle rounds its values.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::model::{OrderLine, OrderTable};

/// Default length of the top-N rankings.
pub const DEFAULT_TOP_N: usize = 10;

// ---------------------------------------------------------------------------
// Result rows
// ---------------------------------------------------------------------------

/// Headline metrics for the whole table.
///
/// Currency values are rounded to 2 decimals, `return_rate` to 4.
/// `total_gross_revenue` and `discount_amount` are `None` when the source had
/// no `gross_revenue` column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_net_revenue: f64,
    pub total_gross_revenue: Option<f64>,
    pub orders: usize,
    pub customers: usize,
    pub aov: f64,
    pub return_rate: f64,
    pub discount_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub year_month: String,
    pub net_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyOrders {
    pub year_month: String,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAov {
    pub year_month: String,
    pub aov: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRevenue {
    pub product_category: String,
    pub net_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReturns {
    pub product_category: String,
    pub return_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRevenue {
    pub country: String,
    pub net_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelRevenue {
    pub channel: String,
    pub net_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRevenue {
    pub product_name: String,
    pub net_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRevenue {
    pub customer_id: String,
    pub net_revenue: f64,
}

// ---------------------------------------------------------------------------
// Rounding at the reporting boundary
// ---------------------------------------------------------------------------

pub fn round_currency(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn round_rate(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

// ---------------------------------------------------------------------------
// Group-by helpers
// ---------------------------------------------------------------------------

/// Sum of `net_revenue` per key, keys in ascending order.
fn revenue_by<'a, F>(table: &'a OrderTable, key: F) -> BTreeMap<&'a str, f64>
where
    F: Fn(&'a OrderLine) -> &'a str,
{
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for row in table {
        *sums.entry(key(row)).or_insert(0.0) += row.net_revenue;
    }
    sums
}

/// Distinct `order_id` count per month.
fn orders_by_month(table: &OrderTable) -> BTreeMap<&str, usize> {
    let mut ids: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
    for row in table {
        ids.entry(row.year_month.as_str())
            .or_default()
            .insert(row.order_id.as_str());
    }
    ids.into_iter().map(|(month, set)| (month, set.len())).collect()
}

/// Descending by value; ties by ascending key.
fn ranked<'a>(groups: BTreeMap<&'a str, f64>) -> Vec<(&'a str, f64)> {
    let mut rows: Vec<(&str, f64)> = groups.into_iter().collect();
    rows.sort_by(|a, b| descending(a.1, b.1).then_with(|| a.0.cmp(b.0)));
    rows
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

fn distinct_count<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.collect::<HashSet<_>>().len()
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// KPI bundle.  Zero rows yields zeros; ratios divide by `max(1, n)`.
pub fn kpis(table: &OrderTable) -> Kpis {
    let total_net: f64 = table.iter().map(|r| r.net_revenue).sum();
    let orders = distinct_count(table.iter().map(|r| r.order_id.as_str()));
    let customers = distinct_count(table.iter().map(|r| r.customer_id.as_str()));
    let returned = table.iter().filter(|r| r.returned).count();
    let return_rate = returned as f64 / table.len().max(1) as f64;
    let aov = total_net / orders.max(1) as f64;

    let (gross, discount) = if table.has_gross_revenue() {
        let gross: f64 = table.iter().filter_map(|r| r.gross_revenue).sum();
        let discount: f64 = table
            .iter()
            .filter_map(|r| r.gross_revenue.map(|g| g - r.net_revenue))
            .sum();
        (Some(round_currency(gross)), Some(round_currency(discount)))
    } else {
        (None, None)
    };

    Kpis {
        total_net_revenue: round_currency(total_net),
        total_gross_revenue: gross,
        orders,
        customers,
        aov: round_currency(aov),
        return_rate: round_rate(return_rate),
        discount_amount: discount,
    }
}

pub fn monthly_revenue(table: &OrderTable) -> Vec<MonthlyRevenue> {
    revenue_by(table, |r| r.year_month.as_str())
        .into_iter()
        .map(|(month, net)| MonthlyRevenue {
            year_month: month.to_string(),
            net_revenue: net,
        })
        .collect()
}

pub fn monthly_orders(table: &OrderTable) -> Vec<MonthlyOrders> {
    orders_by_month(table)
        .into_iter()
        .map(|(month, orders)| MonthlyOrders {
            year_month: month.to_string(),
            orders,
        })
        .collect()
}

pub fn category_revenue(table: &OrderTable) -> Vec<CategoryRevenue> {
    ranked(revenue_by(table, |r| r.product_category.as_str()))
        .into_iter()
        .map(|(category, net)| CategoryRevenue {
            product_category: category.to_string(),
            net_revenue: net,
        })
        .collect()
}

/// Share of returned lines per category.
pub fn returns_by_category(table: &OrderTable) -> Vec<CategoryReturns> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for row in table {
        let entry = counts.entry(row.product_category.as_str()).or_default();
        entry.0 += usize::from(row.returned);
        entry.1 += 1;
    }
    let rates = counts
        .into_iter()
        .map(|(category, (returned, lines))| (category, returned as f64 / lines as f64))
        .collect();

    ranked(rates)
        .into_iter()
        .map(|(category, rate)| CategoryReturns {
            product_category: category.to_string(),
            return_rate: rate,
        })
        .collect()
}

pub fn country_revenue(table: &OrderTable) -> Vec<CountryRevenue> {
    ranked(revenue_by(table, |r| r.country.as_str()))
        .into_iter()
        .map(|(country, net)| CountryRevenue {
            country: country.to_string(),
            net_revenue: net,
        })
        .collect()
}

pub fn channel_revenue(table: &OrderTable) -> Vec<ChannelRevenue> {
    ranked(revenue_by(table, |r| r.channel.as_str()))
        .into_iter()
        .map(|(channel, net)| ChannelRevenue {
            channel: channel.to_string(),
            net_revenue: net,
        })
        .collect()
}

/// Aggregate AOV per month: net revenue over distinct orders in that month.
pub fn aov_by_month(table: &OrderTable) -> Vec<MonthlyAov> {
    let orders = orders_by_month(table);
    revenue_by(table, |r| r.year_month.as_str())
        .into_iter()
        .map(|(month, net)| {
            let n = orders.get(month).copied().unwrap_or(0).max(1);
            MonthlyAov {
                year_month: month.to_string(),
                aov: net / n as f64,
            }
        })
        .collect()
}

pub fn top_products(table: &OrderTable, top_n: usize) -> Vec<ProductRevenue> {
    ranked(revenue_by(table, |r| r.product_name.as_str()))
        .into_iter()
        .take(top_n)
        .map(|(product, net)| ProductRevenue {
            product_name: product.to_string(),
            net_revenue: net,
        })
        .collect()
}

pub fn top_customers(table: &OrderTable, top_n: usize) -> Vec<CustomerRevenue> {
    ranked(revenue_by(table, |r| r.customer_id.as_str()))
        .into_iter()
        .take(top_n)
        .map(|(customer, net)| CustomerRevenue {
            customer_id: customer.to_string(),
            net_revenue: net,
        })
        .collect()
}
