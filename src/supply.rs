//! Circulating supply audit ("run the numbers")
//!
//! Replays the subsidy schedule up to the node's tip and logs it next to the
//! UTXO-set total. The comparison is for the operator; a mismatch is never an
//! error.

use bitcoin::Amount;

use crate::error::NodeError;
use crate::node::NodeClient;

pub const HALVING_INTERVAL: u64 = 210_000;

pub const INITIAL_SUBSIDY: Amount = Amount::from_sat(50 * 100_000_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplyAudit {
    pub height: u64,
    pub expected: Amount,
    pub actual: Amount,
}

impl SupplyAudit {
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

/// Coins issued by the first `height` blocks
pub fn expected_supply(height: u64) -> Amount {
    let epochs = height / HALVING_INTERVAL;
    let mut subsidy = INITIAL_SUBSIDY.to_sat();
    let mut supply = 0u64;

    for _ in 0..epochs {
        if subsidy == 0 {
            break;
        }
        supply += HALVING_INTERVAL * subsidy;
        subsidy /= 2;
    }

    supply += subsidy * (height - epochs * HALVING_INTERVAL);
    Amount::from_sat(supply)
}

/// Compare the schedule against the node's UTXO set. Blocks for as long as
/// `gettxoutsetinfo` takes (minutes on mainnet).
pub fn run_the_numbers(client: &dyn NodeClient) -> Result<SupplyAudit, NodeError> {
    log::info!("Computing circulating supply...");

    let info = client.tx_out_set_info()?;
    let audit = SupplyAudit {
        height: info.height,
        expected: expected_supply(info.height),
        actual: info.total_amount,
    };

    log::info!(
        "#RunTheNumbers successful: height={} expectedSupply={} actualSupply={}",
        audit.height,
        audit.expected,
        audit.actual
    );
    if !audit.matches() {
        log::info!(
            "Supply differs from schedule by {} sat (unspendable outputs are not in the UTXO set)",
            audit.expected.to_sat() as i128 - audit.actual.to_sat() as i128
        );
    }

    Ok(audit)
}
