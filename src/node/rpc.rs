//! Bitcoin Core RPC client wrapper
//!
//! Implements [`NodeClient`] and [`DescriptorCodec`] on top of
//! `bitcoincore-rpc`. The transport timeout is configurable because
//! `importdescriptors` and `rescanblockchain` only return once the whole
//! rescan is done.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bitcoin::{Amount, BlockHash};
use bitcoincore_rpc::bitcoin as core_bitcoin;
use bitcoincore_rpc::json::{EstimateMode, ScanningDetails};
use bitcoincore_rpc::jsonrpc;
use bitcoincore_rpc::{Client, RpcApi};
use chrono::DateTime;
use serde_json::{json, Value};

use super::{decode, ClientFactory, DescriptorCodec, NodeClient};
use crate::error::NodeError;
use crate::types::*;

/// Connection settings for one wallet on one node
#[derive(Clone, Debug)]
pub struct RpcSettings {
    pub url: String,
    pub user: String,
    pub password: String,
    pub wallet: String,
    pub timeout: Duration,
}

impl RpcSettings {
    /// Endpoint scoping wallet calls to the configured wallet
    fn wallet_url(&self) -> String {
        format!("{}/wallet/{}", self.url.trim_end_matches('/'), self.wallet)
    }
}

pub struct RpcNodeClient {
    client: Client,
}

impl RpcNodeClient {
    /// Build a client. Does not touch the network.
    pub fn new(settings: &RpcSettings) -> Result<Self, NodeError> {
        let transport = jsonrpc::simple_http::Builder::new()
            .timeout(settings.timeout)
            .url(&settings.wallet_url())
            .map_err(|e| NodeError::Unreachable(format!("invalid RPC url: {}", e)))?
            .auth(settings.user.clone(), Some(settings.password.clone()))
            .build();

        let client = Client::from_jsonrpc(jsonrpc::Client::with_transport(transport));
        Ok(Self { client })
    }

    /// Make sure the configured wallet is loaded, creating a watch-only
    /// descriptor wallet when the node has never seen it.
    pub fn load_or_create_wallet(&self, name: &str) -> Result<WalletOrigin, NodeError> {
        let loaded = self
            .client
            .list_wallets()
            .map_err(|e| NodeError::rpc("listwallets", e))?;
        if loaded.iter().any(|w| w == name) {
            log::info!("Wallet '{}' already loaded", name);
            return Ok(WalletOrigin::AlreadyLoaded);
        }

        let on_disk = decode::wallet_dir_from(self.raw_request("listwalletdir", &[])?)?;
        if on_disk.iter().any(|w| w == name) {
            self.client
                .load_wallet(name)
                .map_err(|e| NodeError::rpc("loadwallet", e))?;
            log::info!("Wallet '{}' loaded", name);
            return Ok(WalletOrigin::Loaded);
        }

        // name, disable_private_keys, blank, passphrase, avoid_reuse, descriptors
        self.raw_request(
            "createwallet",
            &[json!(name), json!(true), json!(true), json!(""), json!(false), json!(true)],
        )?;
        log::info!("Created watch-only wallet '{}'", name);
        Ok(WalletOrigin::Created)
    }

    fn checked_address(address: &str) -> Result<core_bitcoin::Address, NodeError> {
        core_bitcoin::Address::from_str(address)
            .map(|a| a.assume_checked())
            .map_err(|e| NodeError::InvalidResponse(format!("bad address {}: {}", address, e)))
    }
}

/// Re-key a hash from the RPC crate's `bitcoin` into ours
fn block_hash_from(hash: core_bitcoin::BlockHash) -> Result<BlockHash, NodeError> {
    BlockHash::from_str(&hash.to_string())
        .map_err(|e| NodeError::InvalidResponse(format!("block hash: {}", e)))
}

impl NodeClient for RpcNodeClient {
    fn raw_request(&self, method: &'static str, params: &[Value]) -> Result<Value, NodeError> {
        self.client
            .call::<Value>(method, params)
            .map_err(|e| match e {
                bitcoincore_rpc::Error::JsonRpc(jsonrpc::Error::Transport(t)) => {
                    NodeError::Unreachable(t.to_string())
                }
                other => NodeError::rpc(method, other),
            })
    }

    fn best_block_hash(&self) -> Result<BlockHash, NodeError> {
        let hash = self
            .client
            .get_best_block_hash()
            .map_err(|e| NodeError::rpc("getbestblockhash", e))?;
        block_hash_from(hash)
    }

    fn block_count(&self) -> Result<u64, NodeError> {
        self.client
            .get_block_count()
            .map_err(|e| NodeError::rpc("getblockcount", e))
    }

    fn block_hash(&self, height: u64) -> Result<BlockHash, NodeError> {
        let hash = self
            .client
            .get_block_hash(height)
            .map_err(|e| NodeError::rpc("getblockhash", e))?;
        block_hash_from(hash)
    }

    fn block(&self, hash: &BlockHash) -> Result<BlockSummary, NodeError> {
        let core_hash = core_bitcoin::BlockHash::from_str(&hash.to_string())
            .map_err(|e| NodeError::InvalidResponse(format!("block hash: {}", e)))?;
        let block = self
            .client
            .get_block_info(&core_hash)
            .map_err(|e| NodeError::rpc("getblock", e))?;

        let time = DateTime::from_timestamp(block.time as i64, 0).ok_or_else(|| {
            NodeError::InvalidResponse(format!("block time out of range: {}", block.time))
        })?;

        Ok(BlockSummary {
            hash: *hash,
            height: block.height as u64,
            time,
            transactions: block.tx.iter().map(|txid| txid.to_string()).collect(),
        })
    }

    fn wallet_scan_state(&self) -> Result<WalletScanState, NodeError> {
        let info = self
            .client
            .get_wallet_info()
            .map_err(|e| NodeError::rpc("getwalletinfo", e))?;

        Ok(match info.scanning {
            Some(ScanningDetails::Scanning { duration, progress }) => WalletScanState::Scanning {
                progress: progress as f64,
                duration: Duration::from_secs(duration as u64),
            },
            Some(ScanningDetails::NotScanning(_)) | None => WalletScanState::NotScanning,
        })
    }

    fn tx_out_set_info(&self) -> Result<TxOutSetInfo, NodeError> {
        decode::tx_out_set_info_from(self.raw_request("gettxoutsetinfo", &[])?)
    }

    fn address_info(&self, address: &str) -> Result<AddressInfo, NodeError> {
        let address = Self::checked_address(address)?;
        let info = self
            .client
            .get_address_info(&address)
            .map_err(|e| NodeError::rpc("getaddressinfo", e))?;
        Ok(AddressInfo {
            is_watch_only: info.is_watchonly.unwrap_or(false),
        })
    }

    fn derive_address(&self, descriptor: &str, index: u32) -> Result<String, NodeError> {
        let addresses = self
            .client
            .derive_addresses(descriptor, Some([index, index]))
            .map_err(|e| NodeError::rpc("deriveaddresses", e))?;

        addresses
            .into_iter()
            .next()
            .map(|a| a.assume_checked().to_string())
            .ok_or_else(|| NodeError::InvalidResponse("deriveaddresses returned nothing".into()))
    }

    fn import_descriptors(&self, requests: &[ImportRequest]) -> Result<(), NodeError> {
        let payload = serde_json::to_value(requests).map_err(|source| NodeError::Decode {
            what: "import request",
            source,
        })?;
        decode::import_results_from(requests, self.raw_request("importdescriptors", &[payload])?)
    }

    fn abort_rescan(&self) -> Result<bool, NodeError> {
        let aborted = self.raw_request("abortrescan", &[])?;
        aborted
            .as_bool()
            .ok_or_else(|| NodeError::InvalidResponse(format!("abortrescan returned {}", aborted)))
    }

    fn rescan_blockchain(&self, start: u64, stop: u64) -> Result<(), NodeError> {
        self.client
            .rescan_blockchain(Some(start as usize), Some(stop as usize))
            .map_err(|e| NodeError::rpc("rescanblockchain", e))?;
        Ok(())
    }

    fn estimate_smart_fee(&self, target: u16, mode: FeeMode) -> Result<Option<Amount>, NodeError> {
        let mode = match mode {
            FeeMode::Unset => EstimateMode::Unset,
            FeeMode::Economical => EstimateMode::Economical,
            FeeMode::Conservative => EstimateMode::Conservative,
        };
        let estimate = self
            .client
            .estimate_smart_fee(target, Some(mode))
            .map_err(|e| NodeError::rpc("estimatesmartfee", e))?;
        Ok(estimate.fee_rate.map(|rate| Amount::from_sat(rate.to_sat())))
    }
}

impl DescriptorCodec for RpcNodeClient {
    fn canonical_descriptor(&self, descriptor: &str) -> Result<String, NodeError> {
        let info = self
            .client
            .get_descriptor_info(descriptor)
            .map_err(|e| NodeError::rpc("getdescriptorinfo", e))?;
        Ok(info.descriptor)
    }
}

/// Builds a fresh client for every status query
pub struct RpcClientFactory {
    settings: RpcSettings,
}

impl RpcClientFactory {
    pub fn new(settings: RpcSettings) -> Self {
        Self { settings }
    }
}

impl ClientFactory for RpcClientFactory {
    fn connect(&self) -> Result<Arc<dyn NodeClient>, NodeError> {
        Ok(Arc::new(RpcNodeClient::new(&self.settings)?))
    }
}
