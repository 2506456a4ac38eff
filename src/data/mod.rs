//! Data module - Listing and boundary loading, schema and filtering

pub mod boundaries;
pub mod filter;
pub mod loader;
pub mod schema;

pub use boundaries::RegionBoundaries;
pub use filter::{apply_filter, FilterSelection};
pub use loader::{available_regions, DataLoader};
