//! # Permission Repository
//!
//! Installs permission records declared by permission providers.
//!
//! ## Install Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  install_permissions(providers, remove_unused)                          │
//! │       │                                                                 │
//! │       ├── legacy names present?  ──► skip (data migration pending)      │
//! │       │                                                                 │
//! │       ├── for each provider (own transaction)                           │
//! │       │     missing names ──► permission_records                        │
//! │       │     default roles ──► customer_roles (created when missing)     │
//! │       │                   ──► permission_role_mappings (allow)          │
//! │       │     any failure   ──► error! log, rollback, next provider       │
//! │       │                                                                 │
//! │       └── remove_unused? ──► DELETE names no provider declares          │
//! │                              (500 names per statement)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, error, info};

use crate::error::DbResult;
use storefront_core::validation::validate_system_name;
use storefront_core::{ADMINISTRATORS_ROLE, GUESTS_ROLE, REGISTERED_ROLE};

/// Well-known permission system names.
pub mod names {
    /// Browse the public store.
    pub const ACCESS_SHOP: &str = "system.accessshop";
    /// Open the administration area.
    pub const ACCESS_BACKEND: &str = "system.accessbackend";

    /// Pre-migration name of [`ACCESS_SHOP`]. Its presence means the
    /// permission data has not been migrated yet.
    pub const LEGACY_ACCESS_SHOP: &str = "PublicStoreAllowNavigation";
}

/// Names removed per DELETE statement.
pub const REMOVE_CHUNK_SIZE: usize = 500;

/// Permissions granted to one customer role by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPermission {
    pub role_system_name: String,
    pub permissions: Vec<String>,
}

impl DefaultPermission {
    pub fn new(role_system_name: impl Into<String>, permissions: &[&str]) -> Self {
        DefaultPermission {
            role_system_name: role_system_name.into(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Declares the permissions of a module.
pub trait PermissionProvider: Send + Sync {
    /// Display name used in logs.
    fn name(&self) -> &str;

    /// System names of every permission the module checks.
    fn permissions(&self) -> Vec<String>;

    /// Roles that are granted permissions when they are first installed.
    fn default_permissions(&self) -> Vec<DefaultPermission>;
}

/// Core permissions every store has.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardPermissionProvider;

impl PermissionProvider for StandardPermissionProvider {
    fn name(&self) -> &str {
        "standard"
    }

    fn permissions(&self) -> Vec<String> {
        vec![names::ACCESS_SHOP.to_string(), names::ACCESS_BACKEND.to_string()]
    }

    fn default_permissions(&self) -> Vec<DefaultPermission> {
        vec![
            DefaultPermission::new(
                ADMINISTRATORS_ROLE,
                &[names::ACCESS_SHOP, names::ACCESS_BACKEND],
            ),
            DefaultPermission::new(REGISTERED_ROLE, &[names::ACCESS_SHOP]),
            DefaultPermission::new(GUESTS_ROLE, &[names::ACCESS_SHOP]),
        ]
    }
}

/// Outcome of [`PermissionRepository::install_permissions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Nothing was touched because legacy permission names are present.
    pub skipped: bool,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Providers whose installation failed and was rolled back.
    pub failed_providers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PermissionRepository {
    pool: SqlitePool,
}

impl PermissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PermissionRepository { pool }
    }

    /// All permission system names, ordered by name.
    pub async fn all_names(&self) -> DbResult<Vec<String>> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT system_name FROM permission_records ORDER BY system_name")
                .fetch_all(&self.pool)
                .await?;

        Ok(names)
    }

    /// System names of the roles allowed `permission`, ordered by name.
    pub async fn allowed_roles(&self, permission: &str) -> DbResult<Vec<String>> {
        let roles: Vec<String> = sqlx::query_scalar(
            "SELECT r.system_name FROM permission_role_mappings m \
             JOIN permission_records p ON p.id = m.permission_record_id \
             JOIN customer_roles r ON r.id = m.customer_role_id \
             WHERE p.system_name = ?1 AND m.allow = 1 AND r.system_name IS NOT NULL \
             ORDER BY r.system_name",
        )
        .bind(permission)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    /// Adds the permissions declared by `providers` that don't exist yet.
    ///
    /// New permissions are allowed for the roles named in the provider's
    /// defaults; missing roles are created. A provider that fails is logged
    /// and skipped without affecting the others. With `remove_unused`,
    /// permission records that no provider declares are deleted.
    ///
    /// Nothing happens while legacy permission names are still present.
    pub async fn install_permissions(
        &self,
        providers: &[&dyn PermissionProvider],
        remove_unused: bool,
    ) -> DbResult<InstallReport> {
        let mut report = InstallReport::default();
        if providers.is_empty() {
            return Ok(report);
        }

        // lowercase -> stored name
        let mut existing: BTreeMap<String, String> = self
            .all_names()
            .await?
            .into_iter()
            .map(|name| (name.to_lowercase(), name))
            .collect();
        let had_permissions = !existing.is_empty();

        if had_permissions && !permissions_migrated(&existing) {
            info!("Permission data not migrated yet, skipping permission installation");
            report.skipped = true;
            return Ok(report);
        }

        let mut roles: Option<HashMap<String, i64>> = None;
        let mut declared: HashSet<String> = HashSet::new();

        for provider in providers {
            let system_names = provider.permissions();
            if remove_unused {
                declared.extend(system_names.iter().map(|name| name.to_lowercase()));
            }

            let missing: Vec<String> = dedup_case_insensitive(system_names)
                .into_iter()
                .filter(|name| !existing.contains_key(&name.to_lowercase()))
                .collect();
            if missing.is_empty() {
                continue;
            }

            if roles.is_none() {
                roles = Some(self.load_roles().await?);
            }
            let role_cache = roles.get_or_insert_with(HashMap::new);

            match self.install_provider(*provider, &missing, role_cache).await {
                Ok(created_roles) => {
                    role_cache.extend(created_roles);
                    for name in missing {
                        existing.insert(name.to_lowercase(), name.clone());
                        report.added.push(name);
                    }
                }
                Err(e) => {
                    error!(provider = provider.name(), error = %e, "Failed to install permissions");
                    report.failed_providers.push(provider.name().to_string());
                }
            }
        }

        if had_permissions && !report.added.is_empty() {
            info!(added = %report.added.join(", "), "Added permissions");
        }

        if remove_unused {
            let to_delete: Vec<String> = existing
                .iter()
                .filter(|(key, _)| !declared.contains(*key))
                .map(|(_, name)| name.clone())
                .collect();

            if !to_delete.is_empty() {
                self.delete_records(&to_delete).await?;
                info!(removed = %to_delete.join(", "), "Removed unused permissions");
                report.removed = to_delete;
            }
        }

        Ok(report)
    }

    /// Inserts one provider's missing permissions in a single transaction.
    ///
    /// Returns the roles created along the way so the caller can cache them
    /// once the transaction has committed.
    async fn install_provider(
        &self,
        provider: &dyn PermissionProvider,
        missing: &[String],
        roles: &HashMap<String, i64>,
    ) -> DbResult<HashMap<String, i64>> {
        for name in missing {
            validate_system_name(name)?;
        }

        let defaults = provider.default_permissions();
        let mut created_roles: HashMap<String, i64> = HashMap::new();

        let mut tx = self.pool.begin().await?;

        for name in missing {
            let record_id = sqlx::query("INSERT INTO permission_records (system_name) VALUES (?1)")
                .bind(name)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

            let role_names = dedup_case_insensitive(
                defaults
                    .iter()
                    .filter(|d| d.permissions.iter().any(|p| p.eq_ignore_ascii_case(name)))
                    .map(|d| d.role_system_name.clone()),
            );

            for role_name in role_names {
                let key = role_name.to_lowercase();
                let role_id = match roles.get(&key).or_else(|| created_roles.get(&key)) {
                    Some(id) => *id,
                    None => {
                        let id = create_role(&mut *tx, &role_name).await?;
                        created_roles.insert(key, id);
                        id
                    }
                };

                sqlx::query(
                    "INSERT INTO permission_role_mappings (permission_record_id, customer_role_id, allow) \
                     VALUES (?1, ?2, 1)",
                )
                .bind(record_id)
                .bind(role_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        debug!(
            provider = provider.name(),
            count = missing.len(),
            "Installed provider permissions"
        );

        Ok(created_roles)
    }

    /// Roles with a system name, keyed by lowercase system name.
    async fn load_roles(&self) -> DbResult<HashMap<String, i64>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT id, system_name FROM customer_roles \
             WHERE system_name IS NOT NULL AND system_name <> ''",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| (name.to_lowercase(), id))
            .collect())
    }

    async fn delete_records(&self, names: &[String]) -> DbResult<()> {
        for chunk in names.chunks(REMOVE_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM permission_records WHERE system_name IN (");
            let mut separated = builder.separated(", ");
            for name in chunk {
                separated.push_bind(name);
            }
            separated.push_unseparated(")");

            builder.build().execute(&self.pool).await?;
        }

        Ok(())
    }
}

async fn create_role(conn: &mut SqliteConnection, system_name: &str) -> DbResult<i64> {
    debug!(role = system_name, "Creating customer role");

    let id = sqlx::query("INSERT INTO customer_roles (name, system_name, active) VALUES (?1, ?1, 1)")
        .bind(system_name)
        .execute(conn)
        .await?
        .last_insert_rowid();

    Ok(id)
}

fn permissions_migrated(existing: &BTreeMap<String, String>) -> bool {
    existing.contains_key(names::ACCESS_SHOP)
        && !existing.contains_key(&names::LEGACY_ACCESS_SHOP.to_lowercase())
}

fn dedup_case_insensitive(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.to_lowercase()))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
