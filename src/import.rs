//! Descriptor import into the node wallet
//!
//! Import is idempotent: a descriptor whose derived address the wallet
//! already watches is skipped, so re-running with the same accounts issues
//! no `importdescriptors` call at all.

use std::sync::Arc;

use crate::config::Account;
use crate::descriptor::{self, Descriptor};
use crate::error::BridgeError;
use crate::node::{DescriptorCodec, NodeClient};
use crate::types::ImportRequest;

/// What an import run did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub resolved: usize,
    pub imported: usize,
}

pub struct ImportCoordinator {
    client: Arc<dyn NodeClient>,
    codec: Arc<dyn DescriptorCodec>,
}

impl ImportCoordinator {
    pub fn new(client: Arc<dyn NodeClient>, codec: Arc<dyn DescriptorCodec>) -> Self {
        Self { client, codec }
    }

    /// Import the descriptors of `accounts` that the wallet does not watch yet.
    ///
    /// Blocks until the node has finished the rescan the import triggers.
    pub fn import_accounts(&self, accounts: &[Account]) -> Result<ImportSummary, BridgeError> {
        if accounts.is_empty() {
            return Ok(ImportSummary::default());
        }

        let mut all = Vec::new();
        for account in accounts {
            all.extend(descriptor::resolve(self.codec.as_ref(), account)?);
        }

        let mut pending = Vec::new();
        for descriptor in &all {
            if !self.is_watched(descriptor)? {
                pending.push(descriptor);
            }
        }

        if pending.is_empty() {
            log::info!("No (new) descriptors to import");
            return Ok(ImportSummary {
                resolved: all.len(),
                imported: 0,
            });
        }

        let requests: Vec<ImportRequest> = pending
            .iter()
            .map(|d| ImportRequest {
                descriptor: d.value.clone(),
                timestamp: d.age,
                range: [0, d.depth],
            })
            .collect();

        for d in &pending {
            log::info!("Importing {} descriptor {} (depth {})", d.branch, d.value, d.depth);
        }

        self.client.import_descriptors(&requests)?;
        log::info!("Imported {} descriptor(s)", requests.len());

        Ok(ImportSummary {
            resolved: all.len(),
            imported: requests.len(),
        })
    }

    /// Whether the address at the descriptor's depth is already watch-only
    fn is_watched(&self, descriptor: &Descriptor) -> Result<bool, BridgeError> {
        let address = self
            .client
            .derive_address(&descriptor.value, descriptor.depth)
            .map_err(|source| BridgeError::AddressDerivationFailed {
                descriptor: descriptor.value.clone(),
                depth: descriptor.depth,
                source,
            })?;

        let info = self
            .client
            .address_info(&address)
            .map_err(|source| BridgeError::AddressInfoFailed {
                address: address.clone(),
                descriptor: descriptor.value.clone(),
                depth: descriptor.depth,
                source,
            })?;

        Ok(info.is_watch_only)
    }
}
