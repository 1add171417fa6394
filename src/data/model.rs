use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OrderLine – one row of the order table
// ---------------------------------------------------------------------------

/// A single order line item.  Several lines may share an `order_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub order_id: String,
    pub customer_id: String,
    pub order_date: NaiveDate,
    pub country: String,
    pub region: String,
    pub channel: String,
    pub product_category: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub discount_rate: f64,
    /// `None` when the source has no `gross_revenue` column or the cell is empty.
    pub gross_revenue: Option<f64>,
    pub net_revenue: f64,
    pub returned: bool,

    // -- derived at load time --
    /// Calendar month of `order_date` as a sortable `"YYYY-MM"` key.
    pub year_month: String,
    /// Per-line ratio `net_revenue / quantity`.  Not the aggregate AOV.
    pub aov: f64,
}

impl OrderLine {
    /// `"YYYY-MM"` bucket key for a date.
    pub fn month_key(date: NaiveDate) -> String {
        date.format("%Y-%m").to_string()
    }

    /// Fill in the derived `year_month` and `aov` columns.
    pub(crate) fn derive_columns(&mut self) {
        self.year_month = Self::month_key(self.order_date);
        self.aov = self.net_revenue / f64::from(self.quantity);
    }
}

// ---------------------------------------------------------------------------
// OrderTable – the loaded (or filtered) dataset
// ---------------------------------------------------------------------------

/// An immutable table of order lines.
///
/// `has_gross_revenue` records whether the source carried the optional
/// `gross_revenue` column; filtered tables inherit it from their parent so
/// that "no gross data" stays distinguishable from "gross sums to zero".
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTable {
    rows: Vec<OrderLine>,
    has_gross_revenue: bool,
}

impl OrderTable {
    /// Build a table, deriving `year_month` and `aov` for every row.
    pub fn new(mut rows: Vec<OrderLine>, has_gross_revenue: bool) -> Self {
        for row in &mut rows {
            row.derive_columns();
        }
        OrderTable {
            rows,
            has_gross_revenue,
        }
    }

    /// Build a table from rows whose derived columns are already set.
    pub(crate) fn from_derived(rows: Vec<OrderLine>, has_gross_revenue: bool) -> Self {
        OrderTable {
            rows,
            has_gross_revenue,
        }
    }

    pub fn rows(&self) -> &[OrderLine] {
        &self.rows
    }

    pub fn has_gross_revenue(&self) -> bool {
        self.has_gross_revenue
    }

    /// Number of order lines.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OrderLine> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a OrderTable {
    type Item = &'a OrderLine;
    type IntoIter = std::slice::Iter<'a, OrderLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// ---------------------------------------------------------------------------
// Filter value types
// ---------------------------------------------------------------------------

/// Which rows to keep with respect to the `returned` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnedState {
    #[default]
    All,
    Returned,
    #[serde(rename = "Not Returned", alias = "NotReturned")]
    NotReturned,
}

impl ReturnedState {
    pub fn matches(self, returned: bool) -> bool {
        match self {
            ReturnedState::All => true,
            ReturnedState::Returned => returned,
            ReturnedState::NotReturned => !returned,
        }
    }
}

impl fmt::Display for ReturnedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnedState::All => write!(f, "All"),
            ReturnedState::Returned => write!(f, "Returned"),
            ReturnedState::NotReturned => write!(f, "Not Returned"),
        }
    }
}

impl FromStr for ReturnedState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], " ").as_str() {
            "all" => Ok(ReturnedState::All),
            "returned" => Ok(ReturnedState::Returned),
            "not returned" | "notreturned" => Ok(ReturnedState::NotReturned),
            other => Err(format!(
                "unknown returned state '{other}' (expected All, Returned or Not Returned)"
            )),
        }
    }
}

/// Inclusive `[lo, hi]` range.  `lo > hi` matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub lo: T,
    pub hi: T,
}

impl<T: PartialOrd> Bounds<T> {
    pub fn new(lo: T, hi: T) -> Self {
        Bounds { lo, hi }
    }

    /// NaN never falls inside a float range.
    pub fn contains(&self, value: &T) -> bool {
        *value >= self.lo && *value <= self.hi
    }
}

impl<T: Copy> From<(T, T)> for Bounds<T> {
    fn from((lo, hi): (T, T)) -> Self {
        Bounds { lo, hi }
    }
}
