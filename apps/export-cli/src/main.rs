//! # Storefront Export CLI
//!
//! Writes the product catalog as JSON-lines segment files.
//!
//! ## Usage
//! ```bash
//! storefront-export --db ./store.db --out ./feed --per-segment 1000
//! storefront-export --config ./export.toml --offset 200 --limit 300
//!
//! # Remove guest accounts older than 30 days without a cart first
//! storefront-export --delete-guests 30
//! ```
//!
//! Flags override `export.toml`, which overrides the built-in defaults.
//! `RUST_LOG` controls log output (default `info,storefront=debug,sqlx=warn`).

use std::path::PathBuf;

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront_db::{Database, DbConfig};
use storefront_export::{export_products, ExportConfig};

/// Command line flags. Unset flags keep the configured values.
#[derive(Debug, Default, PartialEq, Parser)]
#[command(name = "storefront-export")]
#[command(about = "Writes the product catalog as JSON-lines segment files")]
#[command(version)]
struct CliArgs {
    /// Config file (default: platform config dir)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Output directory for segment files
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Maximum number of products (0 = all)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Products to skip
    #[arg(long, value_name = "N")]
    offset: Option<usize>,

    /// Products per segment file (0 = one file)
    #[arg(long, value_name = "N")]
    per_segment: Option<usize>,

    /// Products loaded per query
    #[arg(long, value_name = "N")]
    take: Option<usize>,

    /// Delete cart-less guests older than DAYS before exporting
    #[arg(long = "delete-guests", value_name = "DAYS")]
    delete_guests_days: Option<i64>,
}

impl CliArgs {
    fn apply(&self, config: &mut ExportConfig) {
        if let Some(db) = &self.db {
            config.database.path = db.clone();
        }
        if let Some(out) = &self.out {
            config.export.output_dir = out.clone();
        }
        if let Some(limit) = self.limit {
            config.export.limit = limit;
        }
        if let Some(offset) = self.offset {
            config.export.offset = offset;
        }
        if let Some(per_segment) = self.per_segment {
            config.export.records_per_segment = per_segment;
        }
        if let Some(take) = self.take {
            config.export.take = take;
        }
    }
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=storefront_export=trace` - Segment progress
/// - Default: INFO, DEBUG for storefront crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,storefront=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();

    init_tracing();

    let mut config = ExportConfig::load(cli.config.clone()).context("loading export config")?;
    cli.apply(&mut config);
    config.validate().context("invalid export settings")?;

    info!(
        db = %config.database.path.display(),
        out = %config.export.output_dir.display(),
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(&config.database.path))
        .await
        .with_context(|| format!("opening {}", config.database.path.display()))?;

    if let Some(days) = cli.delete_guests_days {
        let age = Duration::try_days(days).context("--delete-guests is out of range")?;
        let cutoff = Utc::now() - age;
        let deleted = db
            .customers()
            .delete_guest_customers(None, Some(cutoff), true)
            .await
            .context("deleting guest customers")?;
        info!(deleted, days, "Deleted guest customers");
    }

    let summary = export_products(&db, &config).await.context("export failed")?;

    println!(
        "Exported {} records in {} segment(s) to {}",
        summary.records,
        summary.segments,
        config.export.output_dir.display()
    );
    for file in &summary.files {
        println!("  {}", file.display());
    }

    db.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_parse_all_flags() {
        let cli = CliArgs::try_parse_from([
            "storefront-export", "--db", "store.db", "-o", "feed", "--limit", "300",
            "--offset", "200", "--per-segment", "50", "--take", "100", "--delete-guests", "30",
        ])
        .unwrap();

        assert_eq!(cli.db, Some(PathBuf::from("store.db")));
        assert_eq!(cli.out, Some(PathBuf::from("feed")));
        assert_eq!(cli.limit, Some(300));
        assert_eq!(cli.offset, Some(200));
        assert_eq!(cli.per_segment, Some(50));
        assert_eq!(cli.take, Some(100));
        assert_eq!(cli.delete_guests_days, Some(30));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_help_and_errors() {
        let help = CliArgs::try_parse_from(["storefront-export", "--limit", "5", "--help"]);
        assert_eq!(help.unwrap_err().kind(), ErrorKind::DisplayHelp);

        let missing = CliArgs::try_parse_from(["storefront-export", "--limit"]);
        assert!(missing.is_err());

        let invalid = CliArgs::try_parse_from(["storefront-export", "--limit", "many"]);
        assert_eq!(invalid.unwrap_err().kind(), ErrorKind::ValueValidation);

        let unknown = CliArgs::try_parse_from(["storefront-export", "--verbose"]);
        assert_eq!(unknown.unwrap_err().kind(), ErrorKind::UnknownArgument);

        assert_eq!(
            CliArgs::try_parse_from(["storefront-export"]).unwrap(),
            CliArgs::default()
        );
    }

    #[test]
    fn test_flags_override_config() {
        let cli = CliArgs {
            out: Some(PathBuf::from("/srv/feed")),
            per_segment: Some(0),
            ..Default::default()
        };
        let mut config = ExportConfig::default();
        config.export.limit = 99;
        cli.apply(&mut config);

        assert_eq!(config.export.output_dir, PathBuf::from("/srv/feed"));
        assert_eq!(config.export.records_per_segment, 0);
        assert_eq!(config.export.limit, 99);
    }
}
