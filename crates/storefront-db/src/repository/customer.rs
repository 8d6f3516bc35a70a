//! # Customer Repository
//!
//! Guest accounts, system accounts and customer roles.
//!
//! ## Guest Cleanup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  delete_guest_customers(from, to, only_without_cart)                    │
//! │                                                                         │
//! │  1. DELETE generic attributes of matching guests   (50,000 per batch)   │
//! │     ... repeat until a batch deletes nothing                            │
//! │  2. DELETE matching guests                         (20,000 per batch)   │
//! │     ... repeat until a batch deletes nothing                            │
//! │                                                                         │
//! │  A guest matches when it has no username, no email, is not a system    │
//! │  account, has no orders and was created inside [from, to].             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Small batches keep each statement's lock short on stores with millions
//! of abandoned guest sessions.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::{Customer, CustomerRole, CUSTOMER_KEY_GROUP, GUESTS_ROLE};

/// Rows removed per generic attribute delete statement.
pub const ATTRIBUTE_DELETE_BATCH: i64 = 50_000;

/// Rows removed per guest customer delete statement.
pub const GUEST_DELETE_BATCH: i64 = 20_000;

/// Generic attribute key holding the visitor fingerprint of a guest.
pub const CLIENT_IDENT_KEY: &str = "ClientIdent";

const CUSTOMER_COLUMNS: &str = "id, customer_guid, username, email, system_name, \
     is_system_account, active, deleted, created_at, last_activity_at";

const GUEST_FILTER: &str = "c.username IS NULL AND c.email IS NULL AND c.is_system_account = 0 \
     AND NOT EXISTS (SELECT 1 FROM orders o WHERE o.customer_id = c.id)";

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a guest customer in the "Guests" role.
    ///
    /// A random GUID is generated when `customer_guid` is `None`. A non-empty
    /// `client_ident` is stored as a generic attribute so a returning visitor
    /// can be matched with [`find_guest_by_client_ident`](Self::find_guest_by_client_ident).
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - the "Guests" role is missing
    pub async fn create_guest(
        &self,
        customer_guid: Option<Uuid>,
        client_ident: Option<&str>,
    ) -> DbResult<Customer> {
        let guid = customer_guid.unwrap_or_else(Uuid::new_v4);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let role_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM customer_roles WHERE system_name = ?1 ORDER BY id LIMIT 1")
                .bind(GUESTS_ROLE)
                .fetch_optional(&mut *tx)
                .await?;
        let role_id = role_id.ok_or_else(|| DbError::not_found("CustomerRole", GUESTS_ROLE))?;

        let result = sqlx::query(
            r#"
            INSERT INTO customers (
                customer_guid, username, email, system_name, is_system_account,
                active, deleted, created_at, last_activity_at
            ) VALUES (?1, NULL, NULL, NULL, 0, 1, 0, ?2, ?2)
            "#,
        )
        .bind(guid.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let customer_id = result.last_insert_rowid();

        sqlx::query("INSERT INTO customer_role_mappings (customer_id, customer_role_id) VALUES (?1, ?2)")
            .bind(customer_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        if let Some(ident) = client_ident.filter(|s| !s.trim().is_empty()) {
            sqlx::query(
                "INSERT INTO generic_attributes (entity_id, key_group, key, value) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(customer_id)
            .bind(CUSTOMER_KEY_GROUP)
            .bind(CLIENT_IDENT_KEY)
            .bind(ident)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(customer_guid = %guid, customer_id, "Guest account created");

        Ok(Customer {
            id: customer_id,
            customer_guid: guid.to_string(),
            username: None,
            email: None,
            system_name: None,
            is_system_account: false,
            active: true,
            deleted: false,
            created_at: now,
            last_activity_at: now,
        })
    }

    /// Finds a guest whose client ident matches and who was active within
    /// the last `max_age_secs` seconds.
    pub async fn find_guest_by_client_ident(
        &self,
        client_ident: &str,
        max_age_secs: i64,
    ) -> DbResult<Option<Customer>> {
        if client_ident.trim().is_empty() {
            return Ok(None);
        }

        let active_since = Utc::now() - Duration::seconds(max_age_secs);
        let sql = format!(
            "SELECT {} FROM customers c \
             JOIN generic_attributes a ON a.entity_id = c.id \
             WHERE a.key_group = ?1 AND a.key = ?2 AND a.value = ?3 \
             AND c.username IS NULL AND c.email IS NULL \
             AND c.last_activity_at >= ?4 \
             ORDER BY c.id LIMIT 1",
            prefixed_columns("c")
        );

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(CUSTOMER_KEY_GROUP)
            .bind(CLIENT_IDENT_KEY)
            .bind(client_ident)
            .bind(active_since)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Gets the first customer with the given system name (search engine
    /// bot, background task account, ...). Blank names return `None`.
    pub async fn customer_by_system_name(&self, system_name: &str) -> DbResult<Option<Customer>> {
        if system_name.trim().is_empty() {
            return Ok(None);
        }

        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE system_name = ?1 ORDER BY id LIMIT 1"
        );

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(system_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Gets the role with the given system name, compared case-insensitively.
    /// Blank names return `None`.
    pub async fn role_by_system_name(&self, system_name: &str) -> DbResult<Option<CustomerRole>> {
        if system_name.trim().is_empty() {
            return Ok(None);
        }

        let role = sqlx::query_as::<_, CustomerRole>(
            "SELECT id, name, system_name, active FROM customer_roles \
             WHERE system_name = ?1 ORDER BY id LIMIT 1",
        )
        .bind(system_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    /// Counts guest accounts (no username, no email, not a system account).
    pub async fn count_guests(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM customers \
             WHERE username IS NULL AND email IS NULL AND is_system_account = 0",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Deletes guest customers without orders and their generic attributes.
    ///
    /// `created_from` / `created_to` bound the creation date inclusively.
    /// With `only_without_cart` guests holding shopping cart items are kept.
    ///
    /// Returns the number of deleted customers.
    pub async fn delete_guest_customers(
        &self,
        created_from: Option<DateTime<Utc>>,
        created_to: Option<DateTime<Utc>>,
        only_without_cart: bool,
    ) -> DbResult<u64> {
        let mut clauses = String::new();
        let mut params: Vec<DateTime<Utc>> = Vec::new();

        if let Some(from) = created_from {
            clauses.push_str(" AND ? <= c.created_at");
            params.push(from);
        }
        if let Some(to) = created_to {
            clauses.push_str(" AND ? >= c.created_at");
            params.push(to);
        }
        if only_without_cart {
            clauses.push_str(
                " AND NOT EXISTS (SELECT 1 FROM shopping_cart_items sci WHERE sci.customer_id = c.id)",
            );
        }

        let attributes_sql = format!(
            "DELETE FROM generic_attributes WHERE id IN (\
             SELECT g.id FROM generic_attributes g \
             JOIN customers c ON c.id = g.entity_id \
             WHERE g.key_group = '{CUSTOMER_KEY_GROUP}' AND {GUEST_FILTER}{clauses} \
             LIMIT {ATTRIBUTE_DELETE_BATCH})"
        );

        let customers_sql = format!(
            "DELETE FROM customers WHERE id IN (\
             SELECT c.id FROM customers c \
             WHERE {GUEST_FILTER}{clauses} \
             LIMIT {GUEST_DELETE_BATCH})"
        );

        let deleted_attributes = self.delete_in_batches(&attributes_sql, &params).await?;
        let deleted_customers = self.delete_in_batches(&customers_sql, &params).await?;

        debug!(
            deleted_customers,
            deleted_attributes, "Deleted guest customers including generic attributes"
        );

        Ok(deleted_customers)
    }

    /// Runs a batched delete statement until it affects no rows.
    async fn delete_in_batches(&self, sql: &str, params: &[DateTime<Utc>]) -> DbResult<u64> {
        let mut total = 0u64;

        loop {
            let mut query = sqlx::query(sql);
            for param in params {
                query = query.bind(*param);
            }

            let deleted = query.execute(&self.pool).await?.rows_affected();
            if deleted == 0 {
                break;
            }
            total += deleted;
        }

        Ok(total)
    }
}

fn prefixed_columns(alias: &str) -> String {
    CUSTOMER_COLUMNS
        .split(", ")
        .map(|column| format!("{alias}.{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Unit Tests
// =============================================================================
