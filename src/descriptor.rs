//! Descriptor resolution
//!
//! Turns a configured [`Account`] into the canonical descriptors that get
//! imported into the node wallet, one per chain branch.

use std::fmt;

use crate::config::Account;
use crate::error::BridgeError;
use crate::node::DescriptorCodec;

/// Addresses derived (and imported) per branch when the account sets no depth
pub const DEFAULT_ACCOUNT_DEPTH: u32 = 100;

/// BIP-0039 publication date (2013-09-10T00:00:00Z); no mnemonic wallet can
/// hold funds from before it, so it bounds the rescan when no birthday is set.
pub const BIP0039_GENESIS: i64 = 1_378_771_200;

const CHECKSUM_DELIMITER: char = '#';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    External,
    Internal,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External => write!(f, "external"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// A canonical descriptor ready for import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub value: String,
    pub branch: Branch,
    pub depth: u32,
    /// Unix timestamp the node starts rescanning from
    pub age: i64,
}

/// Drop the `#checksum` suffix, if any
pub fn strip_checksum(descriptor: &str) -> &str {
    descriptor
        .split(CHECKSUM_DELIMITER)
        .next()
        .unwrap_or(descriptor)
}

/// Resolve both branches of `account` into canonical descriptors
pub fn resolve(codec: &dyn DescriptorCodec, account: &Account) -> Result<Vec<Descriptor>, BridgeError> {
    let depth = account.depth.unwrap_or(DEFAULT_ACCOUNT_DEPTH);
    let age = account
        .birthday
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp())
        .unwrap_or(BIP0039_GENESIS);

    [
        (Branch::External, &account.external),
        (Branch::Internal, &account.internal),
    ]
    .into_iter()
    .map(|(branch, raw)| {
        let stripped = strip_checksum(raw);
        let value = codec
            .canonical_descriptor(stripped)
            .map_err(|source| BridgeError::InvalidDescriptor {
                descriptor: stripped.to_string(),
                source,
            })?;

        Ok(Descriptor {
            value,
            branch,
            depth,
            age,
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use chrono::NaiveDate;

    /// Appends a fake checksum, rejects anything mentioning "bogus"
    struct FakeCodec;

    impl DescriptorCodec for FakeCodec {
        fn canonical_descriptor(&self, descriptor: &str) -> Result<String, NodeError> {
            if descriptor.contains("bogus") {
                return Err(NodeError::rpc("getdescriptorinfo", "Invalid descriptor"));
            }
            Ok(format!("{}#canon", descriptor))
        }
    }

    fn account(depth: Option<u32>, birthday: Option<NaiveDate>) -> Account {
        Account {
            external: "wpkh(xpub/0/*)#oldchk1".to_string(),
            internal: "wpkh(xpub/1/*)#oldchk2".to_string(),
            depth,
            birthday,
        }
    }

    #[test]
    fn test_strip_checksum() {
        assert_eq!(strip_checksum("wpkh(xpub/0/*)#abcdefgh"), "wpkh(xpub/0/*)");
        assert_eq!(strip_checksum("wpkh(xpub/0/*)"), "wpkh(xpub/0/*)");
    }

    #[test]
    fn test_defaults() {
        let descriptors = resolve(&FakeCodec, &account(None, None)).unwrap();

        assert_eq!(descriptors.len(), 2);
        for d in &descriptors {
            assert_eq!(d.depth, DEFAULT_ACCOUNT_DEPTH);
            assert_eq!(d.age, BIP0039_GENESIS);
        }
        assert_eq!(descriptors[0].value, "wpkh(xpub/0/*)#canon");
        assert_eq!(descriptors[0].branch, Branch::External);
        assert_eq!(descriptors[1].value, "wpkh(xpub/1/*)#canon");
        assert_eq!(descriptors[1].branch, Branch::Internal);
    }

    #[test]
    fn test_explicit_depth_and_birthday() {
        let birthday = NaiveDate::from_ymd_opt(2020, 1, 1);
        let descriptors = resolve(&FakeCodec, &account(Some(50), birthday)).unwrap();

        assert!(descriptors.iter().all(|d| d.depth == 50));
        assert!(descriptors.iter().all(|d| d.age == 1_577_836_800));
    }

    #[test]
    fn test_invalid_descriptor() {
        let mut bad = account(None, None);
        bad.internal = "bogus(xpub)#zzz".to_string();

        let err = resolve(&FakeCodec, &bad).unwrap_err();
        match err {
            BridgeError::InvalidDescriptor { descriptor, .. } => assert_eq!(descriptor, "bogus(xpub)"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_deterministic() {
        let a = resolve(&FakeCodec, &account(Some(7), None)).unwrap();
        let b = resolve(&FakeCodec, &account(Some(7), None)).unwrap();
        assert_eq!(a, b);
    }
}
