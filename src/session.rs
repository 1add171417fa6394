use std::path::Path;

use serde::Serialize;

use crate::data::error::DataFormatError;
use crate::data::filter::{filter, FilterCriteria};
use crate::data::loader::load_file;
use crate::data::model::OrderTable;
use crate::data::options::FilterOptions;
use crate::data::views::{
    self, CategoryRevenue, CategoryReturns, ChannelRevenue, CountryRevenue, CustomerRevenue,
    Kpis, MonthlyAov, MonthlyOrders, MonthlyRevenue, ProductRevenue,
};

// ---------------------------------------------------------------------------
// Session – one loaded table for the lifetime of the dashboard
// ---------------------------------------------------------------------------

/// The loaded table plus the filter choice lists derived from it.
///
/// Nothing here changes after construction; each interaction goes through
/// [`Session::apply`] and gets a fresh [`Snapshot`].
#[derive(Debug, Clone)]
pub struct Session {
    table: OrderTable,
    options: FilterOptions,
}

impl Session {
    pub fn new(table: OrderTable) -> Self {
        let options = FilterOptions::from_table(&table);
        Session { table, options }
    }

    /// Load a file and build the session in one step.
    pub fn open(path: &Path) -> Result<Self, DataFormatError> {
        Ok(Session::new(load_file(path)?))
    }

    pub fn table(&self) -> &OrderTable {
        &self.table
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Criteria matching the initial widget state: full date and numeric ranges.
    pub fn default_criteria(&self) -> FilterCriteria {
        FilterCriteria::full_range(&self.table)
    }

    /// Re-filter and recompute every view.
    pub fn apply(&self, criteria: &FilterCriteria, top_n: usize) -> Snapshot {
        let table = filter(&self.table, criteria);
        let dashboard = Dashboard::compute(&table, top_n);
        Snapshot { table, dashboard }
    }
}

/// Result of one interaction: the filtered table (for export) and its views.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub table: OrderTable,
    pub dashboard: Dashboard,
}

// ---------------------------------------------------------------------------
// Dashboard – every aggregation view for one filtered table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub kpis: Kpis,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub monthly_orders: Vec<MonthlyOrders>,
    pub category_revenue: Vec<CategoryRevenue>,
    pub returns_by_category: Vec<CategoryReturns>,
    pub country_revenue: Vec<CountryRevenue>,
    pub channel_revenue: Vec<ChannelRevenue>,
    pub aov_by_month: Vec<MonthlyAov>,
    pub top_products: Vec<ProductRevenue>,
    pub top_customers: Vec<CustomerRevenue>,
}

impl Dashboard {
    /// Views are independent; they run one after another on the same table.
    pub fn compute(table: &OrderTable, top_n: usize) -> Self {
        Dashboard {
            kpis: views::kpis(table),
            monthly_revenue: views::monthly_revenue(table),
            monthly_orders: views::monthly_orders(table),
            category_revenue: views::category_revenue(table),
            returns_by_category: views::returns_by_category(table),
            country_revenue: views::country_revenue(table),
            channel_revenue: views::channel_revenue(table),
            aov_by_month: views::aov_by_month(table),
            top_products: views::top_products(table, top_n),
            top_customers: views::top_customers(table, top_n),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::data::model::tests::line;
    use crate::data::views::DEFAULT_TOP_N;

    fn session() -> Session {
        let mut rows = vec![
            line("O1", "2024-01-01", 100.0),
            line("O2", "2024-01-02", 50.0),
            line("O3", "2024-02-03", 30.0),
        ];
        rows[2].country = "FR".to_string();
        rows[2].region = "Idf".to_string();
        Session::new(OrderTable::new(rows, false))
    }

    #[test]
    fn country_scenario() {
        let s = session();
        let criteria = FilterCriteria {
            country: BTreeSet::from(["US".to_string()]),
            ..Default::default()
        };
        let snap = s.apply(&criteria, DEFAULT_TOP_N);
        assert_eq!(snap.table.len(), 2);
        assert_eq!(snap.dashboard.country_revenue.len(), 1);
        assert_eq!(snap.dashboard.country_revenue[0].country, "US");
        assert_eq!(snap.dashboard.country_revenue[0].net_revenue, 150.0);
        assert_eq!(s.table().len(), 3);
    }

    #[test]
    fn default_criteria_keep_everything() {
        let s = session();
        let snap = s.apply(&s.default_criteria(), DEFAULT_TOP_N);
        assert_eq!(&snap.table, s.table());
        assert_eq!(snap.dashboard, Dashboard::compute(s.table(), DEFAULT_TOP_N));
    }

    #[test]
    fn empty_selection_yields_zeroed_dashboard() {
        let s = session();
        let criteria = FilterCriteria {
            country: BTreeSet::from(["JP".to_string()]),
            ..Default::default()
        };
        let d = s.apply(&criteria, DEFAULT_TOP_N).dashboard;
        assert_eq!(d.kpis.orders, 0);
        assert_eq!(d.kpis.aov, 0.0);
        assert!(d.monthly_revenue.is_empty());
        assert!(d.top_customers.is_empty());
    }

    #[test]
    fn options_come_from_unfiltered_table() {
        let s = session();
        let fr = BTreeSet::from(["FR".to_string()]);
        assert_eq!(s.options().regions_for(&fr), BTreeSet::from(["Idf".to_string()]));
    }
}
