/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .parquet / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + validate → OrderTable (year_month, aov derived)
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │  OrderTable   │  immutable Vec<OrderLine>  ──►  options (choice lists)
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterCriteria → new OrderTable
///   └──────────┘
///        │
///        ├──────────────►  views   (KPIs, monthly series, breakdowns, top-N)
///        ▼
///   ┌──────────┐
///   │  export   │  filtered table → CSV bytes
///   └──────────┘
/// ```

pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod options;
pub mod views;
