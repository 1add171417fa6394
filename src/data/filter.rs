use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::{Bounds, OrderLine, OrderTable, ReturnedState};

// ---------------------------------------------------------------------------
// Filter criteria: one independently-optional constraint per dimension
// ---------------------------------------------------------------------------

/// The ten filter dimensions.
///
/// Every field defaults to "no constraint": `None` for dates and ranges,
/// an empty set for the categorical columns and [`ReturnedState::All`].
/// Active constraints combine with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub country: BTreeSet<String>,
    pub region: BTreeSet<String>,
    pub channel: BTreeSet<String>,
    pub product_category: BTreeSet<String>,
    pub product_name: BTreeSet<String>,
    pub returned: ReturnedState,
    pub unit_price: Option<Bounds<f64>>,
    pub quantity: Option<Bounds<u32>>,
    pub discount_rate: Option<Bounds<f64>>,
}

impl FilterCriteria {
    /// Criteria whose date and numeric ranges span the whole table, i.e. the
    /// initial slider positions.  Applying them keeps every row.
    pub fn full_range(table: &OrderTable) -> Self {
        let mut criteria = FilterCriteria::default();
        let mut rows = table.iter();
        let Some(first) = rows.next() else {
            return criteria;
        };

        let mut dates = Bounds::new(first.order_date, first.order_date);
        let mut price = Bounds::new(first.unit_price, first.unit_price);
        let mut qty = Bounds::new(first.quantity, first.quantity);
        let mut disc = Bounds::new(first.discount_rate, first.discount_rate);
        for row in rows {
            dates.lo = dates.lo.min(row.order_date);
            dates.hi = dates.hi.max(row.order_date);
            price.lo = price.lo.min(row.unit_price);
            price.hi = price.hi.max(row.unit_price);
            qty.lo = qty.lo.min(row.quantity);
            qty.hi = qty.hi.max(row.quantity);
            disc.lo = disc.lo.min(row.discount_rate);
            disc.hi = disc.hi.max(row.discount_rate);
        }

        criteria.date_from = Some(dates.lo);
        criteria.date_to = Some(dates.hi);
        criteria.unit_price = Some(price);
        criteria.quantity = Some(qty);
        criteria.discount_rate = Some(disc);
        criteria
    }

    /// Whether no constraint is active at all.
    pub fn is_unconstrained(&self) -> bool {
        *self == FilterCriteria::default()
    }

    /// A row passes when it satisfies every active predicate.
    ///
    /// Predicates run in a fixed order: dates, categorical sets, returned
    /// state, then numeric ranges.
    pub fn matches(&self, row: &OrderLine) -> bool {
        self.date_from.map_or(true, |from| row.order_date >= from)
            && self.date_to.map_or(true, |to| row.order_date <= to)
            && in_set(&self.country, &row.country)
            && in_set(&self.region, &row.region)
            && in_set(&self.channel, &row.channel)
            && in_set(&self.product_category, &row.product_category)
            && in_set(&self.product_name, &row.product_name)
            && self.returned.matches(row.returned)
            && in_range(&self.unit_price, row.unit_price)
            && in_range(&self.quantity, row.quantity)
            && in_range(&self.discount_rate, row.discount_rate)
    }
}

/// Empty set → no filtering.
fn in_set(selected: &BTreeSet<String>, value: &str) -> bool {
    selected.is_empty() || selected.contains(value)
}

fn in_range<T: PartialOrd>(bounds: &Option<Bounds<T>>, value: T) -> bool {
    bounds.as_ref().map_or(true, |b| b.contains(&value))
}

// ---------------------------------------------------------------------------
// Applying the criteria
// ---------------------------------------------------------------------------

/// Return indices of order lines that pass all active filters, in table order.
pub fn filtered_indices(table: &OrderTable, criteria: &FilterCriteria) -> Vec<usize> {
    table
        .iter()
        .enumerate()
        .filter(|(_, row)| criteria.matches(row))
        .map(|(i, _)| i)
        .collect()
}

/// Produce a new table holding only the matching rows.  The input is left
/// untouched and the schema flag (`has_gross_revenue`) carries over.
pub fn filter(table: &OrderTable, criteria: &FilterCriteria) -> OrderTable {
    let rows: Vec<OrderLine> = table
        .iter()
        .filter(|row| criteria.matches(row))
        .cloned()
        .collect();
    log::debug!("filter kept {} of {} order lines", rows.len(), table.len());
    OrderTable::from_derived(rows, table.has_gross_revenue())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::data::model::tests::line;

    fn table_of(rows: Vec<OrderLine>) -> OrderTable {
        OrderTable::new(rows, false)
    }

    #[test]
    fn country_filter_keeps_members_only() {
        let mut rows = vec![
            line("O1", "2024-01-01", 100.0),
            line("O2", "2024-01-02", 50.0),
            line("O3", "2024-01-03", 30.0),
        ];
        rows[2].country = "FR".to_string();
        let table = table_of(rows);

        let criteria = FilterCriteria {
            country: BTreeSet::from(["US".to_string()]),
            ..Default::default()
        };
        let out = filter(&table, &criteria);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.country == "US"));
    }

    #[test]
    fn returned_state_selects_flagged_rows() {
        let mut rows = vec![
            line("O1", "2024-01-01", 1.0),
            line("O2", "2024-01-01", 2.0),
            line("O3", "2024-01-01", 3.0),
        ];
        rows[0].returned = true;
        rows[2].returned = true;
        let table = table_of(rows);

        let returned = FilterCriteria {
            returned: ReturnedState::Returned,
            ..Default::default()
        };
        assert_eq!(filtered_indices(&table, &returned), vec![0, 2]);

        let kept = FilterCriteria {
            returned: ReturnedState::NotReturned,
            ..Default::default()
        };
        assert_eq!(filtered_indices(&table, &kept), vec![1]);
    }

    #[test]
    fn discount_range_is_inclusive() {
        let mut rows = vec![
            line("O1", "2024-01-01", 1.0),
            line("O2", "2024-01-01", 1.0),
            line("O3", "2024-01-01", 1.0),
        ];
        rows[0].discount_rate = 0.05;
        rows[1].discount_rate = 0.2;
        rows[2].discount_rate = 0.0;
        let table = table_of(rows);

        let criteria = FilterCriteria {
            discount_rate: Some(Bounds::new(0.0, 0.1)),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&table, &criteria), vec![0, 2]);
    }

    #[test]
    fn date_bounds_are_inclusive_and_inverted_range_matches_nothing() {
        let table = table_of(vec![
            line("O1", "2024-01-01", 1.0),
            line("O2", "2024-01-15", 1.0),
            line("O3", "2024-02-01", 1.0),
        ]);
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();

        let criteria = FilterCriteria {
            date_from: Some(d("2024-01-15")),
            date_to: Some(d("2024-02-01")),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&table, &criteria), vec![1, 2]);

        let inverted = FilterCriteria {
            date_from: Some(d("2024-02-01")),
            date_to: Some(d("2024-01-01")),
            ..Default::default()
        };
        assert!(filter(&table, &inverted).is_empty());
    }

    #[test]
    fn predicates_combine_with_and() {
        let mut rows = vec![
            line("O1", "2024-01-01", 1.0),
            line("O2", "2024-01-01", 1.0),
            line("O3", "2024-01-01", 1.0),
        ];
        rows[0].channel = "Store".to_string();
        rows[1].quantity = 5;
        let table = table_of(rows);

        let criteria = FilterCriteria {
            channel: BTreeSet::from(["Web".to_string()]),
            quantity: Some(Bounds::new(1, 2)),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&table, &criteria), vec![2]);
    }

    #[test]
    fn filtering_keeps_gross_schema_flag_and_source() {
        let table = OrderTable::new(vec![line("O1", "2024-01-01", 1.0)], true);
        let criteria = FilterCriteria {
            country: BTreeSet::from(["XX".to_string()]),
            ..Default::default()
        };
        let out = filter(&table, &criteria);
        assert!(out.is_empty());
        assert!(out.has_gross_revenue());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn partial_criteria_json_defaults_the_rest() {
        let criteria: FilterCriteria = serde_json::from_str(
            r#"{"country": ["US"], "returned": "Not Returned", "unit_price": {"lo": 1.0, "hi": 9.5}}"#,
        )
        .unwrap();
        assert_eq!(criteria.country, BTreeSet::from(["US".to_string()]));
        assert_eq!(criteria.returned, ReturnedState::NotReturned);
        assert_eq!(criteria.unit_price, Some(Bounds::new(1.0, 9.5)));
        assert_eq!(criteria.date_from, None);
        assert!(criteria.region.is_empty());
    }

    #[test]
    fn full_range_of_empty_table_is_unconstrained() {
        let table = table_of(Vec::new());
        assert!(FilterCriteria::full_range(&table).is_unconstrained());
    }

    // -- property tests --

    fn arb_table() -> impl Strategy<Value = OrderTable> {
        let row = (
            0u32..60,
            prop::sample::select(vec!["US", "FR", "DE"]),
            prop::sample::select(vec!["Web", "Store"]),
            1u32..10,
            0.0f64..100.0,
            0.0f64..0.3,
            any::<bool>(),
        );
        prop::collection::vec(row, 0..40).prop_map(|drafts| {
            let rows = drafts
                .into_iter()
                .enumerate()
                .map(|(i, (day, country, channel, qty, price, disc, returned))| {
                    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                        + chrono::Days::new(u64::from(day));
                    let mut row = line(&format!("O{i}"), "2024-01-01", price * f64::from(qty));
                    row.order_date = date;
                    row.country = country.to_string();
                    row.channel = channel.to_string();
                    row.quantity = qty;
                    row.unit_price = price;
                    row.discount_rate = disc;
                    row.returned = returned;
                    row
                })
                .collect();
            OrderTable::new(rows, false)
        })
    }

    fn arb_criteria() -> impl Strategy<Value = FilterCriteria> {
        (
            prop::option::of(0u32..60),
            prop::collection::btree_set(prop::sample::select(vec!["US", "FR", "DE"]), 0..3),
            prop::sample::select(vec![
                ReturnedState::All,
                ReturnedState::Returned,
                ReturnedState::NotReturned,
            ]),
            prop::option::of((1u32..10, 1u32..10)),
            prop::option::of((0.0f64..100.0, 0.0f64..100.0)),
        )
            .prop_map(|(from_day, countries, returned, qty, price)| FilterCriteria {
                date_from: from_day.map(|d| {
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(d))
                }),
                country: countries.into_iter().map(str::to_string).collect(),
                returned,
                quantity: qty.map(Bounds::from),
                unit_price: price.map(Bounds::from),
                ..Default::default()
            })
    }

    proptest! {
        #[test]
        fn filter_is_subset_and_idempotent(table in arb_table(), criteria in arb_criteria()) {
            let once = filter(&table, &criteria);
            let indices = filtered_indices(&table, &criteria);
            prop_assert_eq!(once.len(), indices.len());
            for (row, idx) in once.iter().zip(&indices) {
                prop_assert_eq!(row, &table.rows()[*idx]);
            }
            let twice = filter(&once, &criteria);
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn full_range_criteria_keep_every_row(table in arb_table()) {
            let criteria = FilterCriteria::full_range(&table);
            prop_assert_eq!(filter(&table, &criteria), table);
        }
    }
}
