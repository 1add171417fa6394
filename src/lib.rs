//! Order analytics core: load an order table once, filter it by the ten
//! dashboard criteria and recompute every KPI and breakdown view.

pub mod data;
pub mod session;

pub use data::error::DataFormatError;
pub use data::export::{to_csv_bytes, write_csv};
pub use data::filter::{filter, filtered_indices, FilterCriteria};
pub use data::loader::{load_csv_reader, load_file, load_json_reader};
pub use data::model::{Bounds, OrderLine, OrderTable, ReturnedState};
pub use data::options::FilterOptions;
pub use session::{Dashboard, Session, Snapshot};
