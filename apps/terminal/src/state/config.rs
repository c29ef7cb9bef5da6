//! # Configuration State
//!
//! Stores terminal configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Command line (`--db`)
//! 2. Environment variables (`CAJA_*`)
//! 3. Defaults (this file)
//!
//! Configuration is read-only after initialization.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default capacity of the change-notification channel.
const DEFAULT_NOTIFIER_CAPACITY: usize = 64;

/// Terminal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Store name (shown in command output)
    pub store_name: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency
    pub currency_decimals: u8,

    /// Database file. `None` means the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Name recorded as the operator of this terminal
    pub operator: String,

    /// argon2 PHC string of the administrative password used to authorize
    /// credit above a client's limit. `None` disables overrides.
    #[serde(skip_serializing)]
    pub admin_password_hash: Option<String>,

    /// Buffered change events before slow subscribers start lagging
    pub notifier_capacity: usize,
}

impl Default for ConfigState {
    /// Returns default configuration suitable for development.
    fn default() -> Self {
        ConfigState {
            store_name: "Caja POS".to_string(),
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
            database_path: None,
            operator: "caja".to_string(),
            admin_password_hash: None,
            notifier_capacity: DEFAULT_NOTIFIER_CAPACITY,
        }
    }
}

impl ConfigState {
    /// Creates a new ConfigState from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `CAJA_STORE_NAME`: Override store name
    /// - `CAJA_CURRENCY_SYMBOL`: Override currency symbol
    /// - `CAJA_DB_PATH`: Database file path
    /// - `CAJA_OPERATOR`: Operator name recorded on overrides
    /// - `CAJA_ADMIN_PASSWORD_HASH`: argon2 hash enabling credit overrides
    /// - `CAJA_NOTIFIER_CAPACITY`: Change-notification buffer size
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ConfigState::default();

        if let Some(store_name) = lookup("CAJA_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(symbol) = lookup("CAJA_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(path) = lookup("CAJA_DB_PATH") {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(operator) = lookup("CAJA_OPERATOR") {
            config.operator = operator;
        }

        if let Some(hash) = lookup("CAJA_ADMIN_PASSWORD_HASH") {
            if !hash.trim().is_empty() {
                config.admin_password_hash = Some(hash);
            }
        }

        if let Some(capacity) = lookup("CAJA_NOTIFIER_CAPACITY") {
            if let Ok(n) = capacity.parse::<usize>() {
                if n > 0 {
                    config.notifier_capacity = n;
                }
            }
        }

        config
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_currency(1234), "$12.34");
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_format_currency() {
        let config = ConfigState::default();
        assert_eq!(config.format_currency(15000), "$150.00");
        assert_eq!(config.format_currency(1), "$0.01");
        assert_eq!(config.format_currency(0), "$0.00");
        assert_eq!(config.format_currency(-5000), "-$50.00");
    }

    #[test]
    fn test_env_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("CAJA_STORE_NAME", "Semillas El Trebol"),
            ("CAJA_DB_PATH", "/tmp/caja.db"),
            ("CAJA_ADMIN_PASSWORD_HASH", "$argon2id$v=19$..."),
            ("CAJA_NOTIFIER_CAPACITY", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = ConfigState::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.store_name, "Semillas El Trebol");
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/caja.db")));
        assert!(config.admin_password_hash.is_some());
        assert_eq!(config.notifier_capacity, DEFAULT_NOTIFIER_CAPACITY);
        assert_eq!(config.operator, "caja");
    }

    #[test]
    fn test_blank_hash_disables_overrides() {
        let config = ConfigState::from_lookup(|k| {
            (k == "CAJA_ADMIN_PASSWORD_HASH").then(|| "  ".to_string())
        });
        assert!(config.admin_password_hash.is_none());
    }
}
