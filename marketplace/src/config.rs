//! Configuration for the marketplace engine

use serde::{Deserialize, Serialize};

/// Who may complete a sale on an active listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaleAuthority {
    /// Only a configured marketplace admin (the escrow-style default)
    #[default]
    Admin,
    /// The listing's seller
    Seller,
    /// The buyer named in the call
    Buyer,
}

/// Marketplace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sale-completion authority
    pub sale_authority: SaleAuthority,

    /// Admin addresses; admins complete sales under the `Admin` authority
    /// and are the only identities that may resolve stolen reports
    pub admins: Vec<String>,

    /// Ledger configuration
    pub ledger: provenance_core::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sale_authority: SaleAuthority::default(),
            admins: vec![],
            ledger: provenance_core::Config::default(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.ledger = provenance_core::Config::from_env()?;

        if let Ok(admins) = std::env::var("GEMTRACE_MARKET_ADMINS") {
            config.admins = admins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(config)
    }

    /// True iff the address is a configured admin
    pub fn is_admin(&self, address: &str) -> bool {
        self.admins.iter().any(|a| a == address)
    }
}
