//! # storefront-core: Pure Business Logic for the Storefront
//!
//! This crate holds the domain model shared by the database layer and the
//! export engine. Everything in here is deterministic and free of I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/export-cli                              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       storefront-export (segmenter, exporter, config)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ storefront-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │  Options  │  │   rules   │  │   │
//! │  │   │  Customer │  │ TaxRate   │  │  Rounding │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               storefront-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Store, Currency, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Price calculation options, batch context, cash rounding
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//! use storefront_core::types::TaxRate;
//!
//! let price = Money::from_cents(1099);
//! let tax = price.calculate_tax(TaxRate::from_bps(1900));
//! assert_eq!(tax.cents(), 209);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{CashRoundingOptions, PriceCalculationOptions, ProductBatchContext, RoundingRule};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// System name of the built-in role every anonymous visitor is mapped to.
pub const GUESTS_ROLE: &str = "Guests";

/// System name of the role for registered customers.
pub const REGISTERED_ROLE: &str = "Registered";

/// System name of the administrators role.
pub const ADMINISTRATORS_ROLE: &str = "Administrators";

/// System name of the account background jobs such as the export run as.
pub const BACKGROUND_TASK_ACCOUNT: &str = "BackgroundTask";

/// Generic attribute key group used for customer attributes.
pub const CUSTOMER_KEY_GROUP: &str = "Customer";
