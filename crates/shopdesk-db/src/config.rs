//! # Store Configuration
//!
//! Settings loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`SHOPDESK_*`)
//! 2. Defaults (this file)
//!
//! Read-only after initialization.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Store name (shown on documents)
    pub store_name: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency
    pub currency_decimals: u8,

    /// Explicit database file; `None` means the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Pool size for file databases.
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            store_name: "shopdesk".to_string(),
            currency_symbol: "Rs ".to_string(),
            currency_decimals: 2,
            database_path: None,
            max_connections: 5,
        }
    }
}

impl StoreConfig {
    /// Creates a StoreConfig from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `SHOPDESK_DB_PATH`: database file
    /// - `SHOPDESK_STORE_NAME`: store name
    /// - `SHOPDESK_CURRENCY_SYMBOL`: display symbol
    /// - `SHOPDESK_MAX_CONNECTIONS`: pool size (ignored if not a number)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = StoreConfig::default();

        if let Some(path) = lookup("SHOPDESK_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(store_name) = lookup("SHOPDESK_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(symbol) = lookup("SHOPDESK_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(max) = lookup("SHOPDESK_MAX_CONNECTIONS") {
            if let Ok(max) = max.trim().parse::<u32>() {
                if max > 0 {
                    config.max_connections = max;
                }
            }
        }

        config
    }

    /// Resolves the database file.
    ///
    /// ## Platform-Specific Default
    /// - **macOS**: `~/Library/Application Support/com.shopdesk.shopdesk/shopdesk.db`
    /// - **Windows**: `%APPDATA%\shopdesk\shopdesk\data\shopdesk.db`
    /// - **Linux**: `~/.local/share/shopdesk/shopdesk.db`
    pub fn resolve_database_path(&self) -> DbResult<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let proj_dirs = ProjectDirs::from("com", "shopdesk", "shopdesk").ok_or_else(|| {
            DbError::ConnectionFailed("Could not determine app data directory".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|e| {
            DbError::ConnectionFailed(format!("{}: {}", data_dir.display(), e))
        })?;

        Ok(data_dir.join("shopdesk.db"))
    }

    /// Pool configuration for this store.
    pub fn db_config(&self) -> DbResult<DbConfig> {
        Ok(DbConfig::new(self.resolve_database_path()?).max_connections(self.max_connections))
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust
    /// use shopdesk_db::StoreConfig;
    ///
    /// let config = StoreConfig::default();
    /// assert_eq!(config.format_currency(1234), "Rs 12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let divisor = 10_i64.pow(self.currency_decimals as u32);
        let whole = cents / divisor;
        let frac = (cents % divisor).abs();

        format!(
            "{}{}{}",
            if cents < 0 { "-" } else { "" },
            self.currency_symbol,
            if self.currency_decimals > 0 {
                format!(
                    "{}.{:0width$}",
                    whole.abs(),
                    frac,
                    width = self.currency_decimals as usize
                )
            } else {
                whole.abs().to_string()
            }
        )
    }
}
