use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use super::model::{Bounds, OrderTable};

/// Choice lists for the filter widgets, computed once from the unfiltered table.
///
/// Region choices narrow with the selected countries and product choices
/// narrow with the selected categories.  Both lookups read the precomputed
/// indices below; nothing is re-scanned per interaction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterOptions {
    pub countries: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    pub channels: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub products: BTreeSet<String>,
    /// country → regions observed with it.
    pub regions_by_country: BTreeMap<String, BTreeSet<String>>,
    /// product_category → product names observed with it.
    pub products_by_category: BTreeMap<String, BTreeSet<String>>,
    pub date_bounds: Option<Bounds<NaiveDate>>,
    pub unit_price_bounds: Option<Bounds<f64>>,
    pub quantity_bounds: Option<Bounds<u32>>,
    pub discount_bounds: Option<Bounds<f64>>,
}

impl FilterOptions {
    pub fn from_table(table: &OrderTable) -> Self {
        let mut opts = FilterOptions::default();

        for row in table {
            opts.countries.insert(row.country.clone());
            opts.regions.insert(row.region.clone());
            opts.channels.insert(row.channel.clone());
            opts.categories.insert(row.product_category.clone());
            opts.products.insert(row.product_name.clone());
            opts.regions_by_country
                .entry(row.country.clone())
                .or_default()
                .insert(row.region.clone());
            opts.products_by_category
                .entry(row.product_category.clone())
                .or_default()
                .insert(row.product_name.clone());

            widen(&mut opts.date_bounds, row.order_date);
            widen(&mut opts.unit_price_bounds, row.unit_price);
            widen(&mut opts.quantity_bounds, row.quantity);
            widen(&mut opts.discount_bounds, row.discount_rate);
        }
        opts
    }

    /// Regions to offer given the current country selection (empty → all).
    pub fn regions_for(&self, countries: &BTreeSet<String>) -> BTreeSet<String> {
        narrow(&self.regions, &self.regions_by_country, countries)
    }

    /// Products to offer given the current category selection (empty → all).
    pub fn products_for(&self, categories: &BTreeSet<String>) -> BTreeSet<String> {
        narrow(&self.products, &self.products_by_category, categories)
    }
}

fn narrow(
    all: &BTreeSet<String>,
    index: &BTreeMap<String, BTreeSet<String>>,
    selected: &BTreeSet<String>,
) -> BTreeSet<String> {
    if selected.is_empty() {
        return all.clone();
    }
    selected
        .iter()
        .filter_map(|key| index.get(key))
        .flatten()
        .cloned()
        .collect()
}

fn widen<T: PartialOrd + Copy>(bounds: &mut Option<Bounds<T>>, value: T) {
    match bounds {
        None => *bounds = Some(Bounds::new(value, value)),
        Some(b) => {
            if value < b.lo {
                b.lo = value;
            }
            if value > b.hi {
                b.hi = value;
            }
        }
    }
}
