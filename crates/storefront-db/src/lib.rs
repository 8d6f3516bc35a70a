//! # storefront-db: Database Layer
//!
//! SQLite persistence for the storefront, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  storefront-export (segmenter loader, loaded callback)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storefront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │◄───│ ProductRepository  │  │ (embedded) │  │   │
//! │  │   │  SqlitePool   │    │ CustomerRepository │  │ 001_*.sql  │  │   │
//! │  │   │               │    │ PermissionRepo...  │  │ 002_*.sql  │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("store.db")).await?;
//! let total = db.products().count_exportable().await?;
//! let deleted = db.customers().delete_guest_customers(None, None, true).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::customer::CustomerRepository;
pub use repository::permission::{
    DefaultPermission, InstallReport, PermissionProvider, PermissionRepository,
    StandardPermissionProvider,
};
pub use repository::product::ProductRepository;
