//! Local wire shapes for node calls
//!
//! `getblockchaininfo` and `getnetworkinfo` go through a raw request and are
//! decoded here instead of through the typed client: depending on the Core
//! release, `warnings` is a string or an array of strings and `softforks` is
//! an array, a map keyed by deployment, or missing entirely. Every other part
//! of the crate only sees the normalized types from `crate::types`.

use std::collections::BTreeMap;

use bitcoin::Amount;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::NodeClient;
use crate::error::NodeError;
use crate::types::{ChainSnapshot, ImportRequest, NetworkReport, SoftFork, TxOutSetInfo};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Warnings {
    Many(Vec<String>),
    One(String),
}

impl Default for Warnings {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl From<Warnings> for Vec<String> {
    fn from(warnings: Warnings) -> Self {
        match warnings {
            Warnings::Many(list) => list.into_iter().filter(|w| !w.is_empty()).collect(),
            Warnings::One(w) if w.is_empty() => Vec::new(),
            Warnings::One(w) => vec![w],
        }
    }
}

#[derive(Debug, Deserialize)]
struct SoftForkReject {
    status: bool,
}

#[derive(Debug, Deserialize)]
struct ListedSoftFork {
    id: String,
    version: Option<i32>,
    reject: Option<SoftForkReject>,
}

#[derive(Debug, Deserialize)]
struct KeyedSoftFork {
    active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SoftForks {
    Listed(Vec<ListedSoftFork>),
    Keyed(BTreeMap<String, KeyedSoftFork>),
}

impl From<SoftForks> for Vec<SoftFork> {
    fn from(forks: SoftForks) -> Self {
        match forks {
            SoftForks::Listed(list) => list
                .into_iter()
                .map(|f| SoftFork {
                    id: f.id,
                    version: f.version,
                    active: None,
                    rejected: f.reject.map(|r| r.status),
                })
                .collect(),
            SoftForks::Keyed(map) => map
                .into_iter()
                .map(|(id, f)| SoftFork {
                    id,
                    version: None,
                    active: f.active,
                    rejected: None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BlockChainInfoWire {
    #[serde(default)]
    chain: String,
    blocks: u64,
    headers: u64,
    #[serde(rename = "bestblockhash")]
    best_block_hash: String,
    #[serde(rename = "verificationprogress")]
    verification_progress: f64,
    #[serde(rename = "initialblockdownload", default)]
    initial_block_download: bool,
    #[serde(default)]
    pruned: bool,
    softforks: Option<SoftForks>,
    #[serde(default)]
    warnings: Warnings,
}

#[derive(Debug, Deserialize)]
struct NetworkInfoWire {
    #[serde(rename = "relayfee")]
    relay_fee: f64,
    #[serde(rename = "incrementalfee")]
    incremental_fee: f64,
    version: i64,
    subversion: String,
    #[allow(dead_code)]
    #[serde(default)]
    warnings: Warnings,
}

#[derive(Debug, Deserialize)]
struct TxOutSetInfoWire {
    height: u64,
    #[serde(with = "bitcoin::amount::serde::as_btc")]
    total_amount: Amount,
}

#[derive(Debug, Deserialize)]
struct ImportResultWire {
    success: bool,
    #[serde(default)]
    error: Option<Value>,
}

/// `getindexinfo` only lists the indexes that are enabled
#[derive(Debug, Deserialize)]
struct IndexInfoWire {
    txindex: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WalletDirEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WalletDirWire {
    wallets: Vec<WalletDirEntry>,
}

fn parse<T: DeserializeOwned>(what: &'static str, value: Value) -> Result<T, NodeError> {
    serde_json::from_value(value).map_err(|source| NodeError::Decode { what, source })
}

pub fn chain_snapshot_from(value: Value) -> Result<ChainSnapshot, NodeError> {
    let wire: BlockChainInfoWire = parse("blockchain info", value)?;
    Ok(ChainSnapshot {
        chain: wire.chain,
        blocks: wire.blocks,
        headers: wire.headers,
        best_block_hash: wire.best_block_hash,
        verification_progress: wire.verification_progress,
        initial_block_download: wire.initial_block_download,
        pruned: wire.pruned,
        softforks: wire.softforks.map(Vec::from).unwrap_or_default(),
        warnings: wire.warnings.into(),
    })
}

pub fn network_report_from(value: Value) -> Result<NetworkReport, NodeError> {
    let wire: NetworkInfoWire = parse("network info", value)?;
    Ok(NetworkReport {
        relay_fee: wire.relay_fee,
        incremental_fee: wire.incremental_fee,
        version: wire.version,
        subversion: wire.subversion,
    })
}

pub fn tx_out_set_info_from(value: Value) -> Result<TxOutSetInfo, NodeError> {
    let wire: TxOutSetInfoWire = parse("txout set info", value)?;
    Ok(TxOutSetInfo {
        height: wire.height,
        total_amount: wire.total_amount,
    })
}

pub fn wallet_dir_from(value: Value) -> Result<Vec<String>, NodeError> {
    let wire: WalletDirWire = parse("wallet dir", value)?;
    Ok(wire.wallets.into_iter().map(|w| w.name).collect())
}

pub fn tx_index_from(value: Value) -> Result<bool, NodeError> {
    let wire: IndexInfoWire = parse("index info", value)?;
    Ok(wire.txindex.is_some())
}

/// Fetch and decode `getblockchaininfo`
pub fn chain_snapshot(client: &dyn NodeClient) -> Result<ChainSnapshot, NodeError> {
    chain_snapshot_from(client.raw_request("getblockchaininfo", &[])?)
}

/// Fetch and decode `getnetworkinfo`
pub fn network_report(client: &dyn NodeClient) -> Result<NetworkReport, NodeError> {
    network_report_from(client.raw_request("getnetworkinfo", &[])?)
}

/// Check an `importdescriptors` reply: one successful entry per request
pub fn import_results_from(requests: &[ImportRequest], value: Value) -> Result<(), NodeError> {
    let results: Vec<ImportResultWire> = parse("import result", value)?;
    if results.len() != requests.len() {
        return Err(NodeError::InvalidResponse(format!(
            "importdescriptors answered {} of {} requests",
            results.len(),
            requests.len()
        )));
    }

    for (request, result) in requests.iter().zip(results) {
        if !result.success {
            return Err(NodeError::InvalidResponse(format!(
                "import of {} rejected: {}",
                request.descriptor,
                result.error.unwrap_or(Value::Null)
            )));
        }
    }
    Ok(())
}

/// Whether the node keeps a transaction index
pub fn tx_index(client: &dyn NodeClient) -> Result<bool, NodeError> {
    tx_index_from(client.raw_request("getindexinfo", &[])?)
}
