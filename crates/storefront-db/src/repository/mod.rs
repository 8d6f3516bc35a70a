//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Export driver / maintenance task                                       │
//! │       │                                                                 │
//! │       │  db.products().list_page(offset, take)                          │
//! │       ▼                                                                 │
//! │  ProductRepository      paging, tier prices, variants                   │
//! │  CustomerRepository     guests, roles, batched guest cleanup            │
//! │  PermissionRepository   provider-driven permission install              │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod customer;
pub mod permission;
pub mod product;
