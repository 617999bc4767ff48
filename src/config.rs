//! Bridge configuration from environment variables
//!
//! Controls the Bitcoin Core connection, the accounts to import and the
//! worker's behaviour flags.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::BridgeError;
use crate::node::RpcSettings;

/// Interval shared by the IBD wait, the progress watchdog and the status reporter
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(7);

/// Long enough for a full-history rescan to come back over a single RPC call
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// A wallet account, identified by its two descriptor chains
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub external: String,
    pub internal: String,
    #[serde(default)]
    pub depth: Option<u32>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: Vec<Account>,
}

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub rpc: RpcSettings,
    /// Optional accounts file; `None` runs in zero-configuration mode
    pub accounts_path: Option<PathBuf>,
    pub checkpoint_path: PathBuf,
    pub circulation_check: bool,
    pub force_import: bool,
    pub poll_interval: Duration,
}

impl BridgeConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `BITCOIN_RPC_URL`: node RPC endpoint (default `http://localhost:8332`)
    /// - `BITCOIN_RPC_USER`, `BITCOIN_RPC_PASSWORD`: RPC credentials (required)
    /// - `BITCOIN_WALLET`: wallet to import into (default `corebridge`)
    /// - `BITCOIN_RPC_TIMEOUT_SECS`: transport timeout (default one day)
    /// - `ACCOUNTS_CONFIG`: path to a JSON accounts file (optional)
    /// - `RESCAN_CHECKPOINT`: checkpoint file (default `./rescan.json`)
    /// - `CIRCULATION_CHECK`, `FORCE_IMPORT`: `true`/`1` to enable
    /// - `POLL_INTERVAL_SECS`: polling interval (default 7)
    pub fn from_env() -> Result<Self, BridgeError> {
        dotenv::dotenv().ok();

        let url = env::var("BITCOIN_RPC_URL").unwrap_or_else(|_| "http://localhost:8332".to_string());
        let user = required("BITCOIN_RPC_USER")?;
        let password = required("BITCOIN_RPC_PASSWORD")?;
        let wallet = env::var("BITCOIN_WALLET").unwrap_or_else(|_| "corebridge".to_string());
        let timeout = seconds("BITCOIN_RPC_TIMEOUT_SECS")?.unwrap_or(DEFAULT_RPC_TIMEOUT);

        let accounts_path = env::var("ACCOUNTS_CONFIG").ok().map(PathBuf::from);
        let checkpoint_path = env::var("RESCAN_CHECKPOINT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./rescan.json"));

        let poll_interval = seconds("POLL_INTERVAL_SECS")?.unwrap_or(DEFAULT_POLL_INTERVAL);

        log::info!("Bitcoin RPC URL: {} (wallet '{}')", url, wallet);
        if let Some(ref path) = accounts_path {
            log::info!("Accounts config: {}", path.display());
        }

        Ok(Self {
            rpc: RpcSettings {
                url,
                user,
                password,
                wallet,
                timeout,
            },
            accounts_path,
            checkpoint_path,
            circulation_check: flag("CIRCULATION_CHECK"),
            force_import: flag("FORCE_IMPORT"),
            poll_interval,
        })
    }

    /// Accounts to import, empty when no accounts file is configured
    pub fn accounts(&self) -> Result<Vec<Account>, BridgeError> {
        match self.accounts_path {
            Some(ref path) => load_accounts(path),
            None => {
                log::info!("No accounts configured, running in zero-configuration mode");
                Ok(Vec::new())
            }
        }
    }
}

pub fn load_accounts(path: &Path) -> Result<Vec<Account>, BridgeError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| BridgeError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    parse_accounts(&contents)
        .map_err(|e| BridgeError::Config(format!("invalid accounts file {}: {}", path.display(), e)))
}

fn parse_accounts(contents: &str) -> Result<Vec<Account>, serde_json::Error> {
    let file: AccountsFile = serde_json::from_str(contents)?;
    Ok(file.accounts)
}

fn required(key: &str) -> Result<String, BridgeError> {
    env::var(key).map_err(|_| BridgeError::Config(format!("{} environment variable not set", key)))
}

fn seconds(key: &str) -> Result<Option<Duration>, BridgeError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(|s| Some(Duration::from_secs(s)))
            .map_err(|_| BridgeError::Config(format!("Invalid {}: {}", key, raw))),
        Err(_) => Ok(None),
    }
}

fn flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
