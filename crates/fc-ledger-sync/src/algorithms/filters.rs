//! # Scan Filters
//!
//! Byte filters for program-account scans. Built from the same
//! discriminator and size constants the codec checks, so a scan and a
//! decode always agree on record identity.

use serde::Serialize;

use crate::domain::{
    AccountRecord, Address, BeneficiaryAccount, BENEFICIARY_CONFIG_OFFSET,
    BENEFICIARY_WALLET_OFFSET,
};

/// Byte-equality constraint at an offset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemcmpFilter {
    /// Offset into the account data.
    pub offset: usize,
    /// Expected bytes.
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    /// Whether `data` carries `bytes` at `offset`.
    pub fn matches(&self, data: &[u8]) -> bool {
        data.get(self.offset..self.offset + self.bytes.len()) == Some(self.bytes.as_slice())
    }
}

/// AND-combined scan constraints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanQuery {
    /// Byte constraints, in order.
    pub memcmp: Vec<MemcmpFilter>,
    /// Exact data length.
    pub data_size: Option<usize>,
}

impl ScanQuery {
    /// Discriminator at offset 0 plus exact size of `T`.
    pub fn for_record<T: AccountRecord>() -> Self {
        Self {
            memcmp: vec![MemcmpFilter {
                offset: 0,
                bytes: T::DISCRIMINATOR.to_vec(),
            }],
            data_size: Some(T::SIZE),
        }
    }

    /// Add a byte constraint.
    pub fn with_memcmp(mut self, offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        self.memcmp.push(MemcmpFilter {
            offset,
            bytes: bytes.into(),
        });
        self
    }

    /// Every constraint holds for `data`.
    pub fn matches(&self, data: &[u8]) -> bool {
        self.data_size.map_or(true, |size| data.len() == size)
            && self.memcmp.iter().all(|f| f.matches(data))
    }
}

/// Beneficiary records owned by `wallet`, across all cycles.
pub fn beneficiaries_of_wallet(wallet: &Address) -> ScanQuery {
    ScanQuery::for_record::<BeneficiaryAccount>()
        .with_memcmp(BENEFICIARY_WALLET_OFFSET, wallet.to_bytes())
}

/// Beneficiary records of `config`.
pub fn beneficiaries_of_config(config: &Address) -> ScanQuery {
    ScanQuery::for_record::<BeneficiaryAccount>()
        .with_memcmp(BENEFICIARY_CONFIG_OFFSET, config.to_bytes())
}
