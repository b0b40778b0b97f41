pub mod analyzer;
pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod shipping;
pub mod stats;

pub use analyzer::{analyze, analyze_at, analyze_batch};
pub use error::{Error, Result};
pub use model::{ListingRecord, PriceAnalysis, ShippingCalculation, SizeClass};
pub use shipping::calculate_shipping;
