//! # Pricing
//!
//! Everything the price calculation pipeline needs as input:
//!
//! - [`options`] - [`PriceCalculationOptions`], the per-request parameter object
//! - [`batch`] - [`ProductBatchContext`], pre-loaded related product data
//! - [`rounding`] - [`CashRoundingOptions`] and [`RoundingRule`]
//! - [`calculate`] - the unit price pipeline itself

pub mod batch;
pub mod calculate;
pub mod options;
pub mod rounding;

pub use batch::ProductBatchContext;
pub use calculate::{calculate_price, CalculatedPrice};
pub use options::PriceCalculationOptions;
pub use rounding::{CashRoundingOptions, RoundingRule};
