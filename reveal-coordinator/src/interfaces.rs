//! Async boundaries to the ledger and the FHE services.
//!
//! Proof bytes travel through these traits untouched. The coordinator never
//! inspects them, so any verifier scheme the registry is configured with can
//! sit behind an implementation.

use crate::error::CoordinatorResult;
use async_trait::async_trait;
use confidential_rarity_primitives::{
    AssetRecord, CiphertextHandle, Cleartext, DecryptionProof, Descriptor, InputProof,
};
use std::collections::BTreeMap;
use std::fmt::Debug;
use tokio::sync::broadcast;

pub use sp_core::crypto::AccountId32 as AccountId;

/// Milliseconds since the Unix epoch.
pub type Moment = u64;

/// Registry record as seen off-chain.
pub type Record<AssetId> = AssetRecord<AssetId, AccountId, Moment>;

/// Registry events. Neither variant carries ciphertext data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent<AssetId> {
    Created { id: AssetId, owner: AccountId },
    Revealed { id: AssetId, value: Cleartext },
}

/// Submit, read and subscribe against a registry host.
///
/// Registry rejections come back as [`crate::CoordinatorError::Registry`];
/// connectivity problems as `TransportFailure`.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    type AssetId: Clone + PartialEq + Debug + Send + Sync + 'static;

    async fn fetch(&self, id: &Self::AssetId) -> CoordinatorResult<Record<Self::AssetId>>;

    async fn submit_mint(
        &self,
        signer: &AccountId,
        id: Self::AssetId,
        descriptor: Descriptor,
        ciphertext: CiphertextHandle,
        validity_proof: InputProof,
    ) -> CoordinatorResult<()>;

    /// Returns the value the registry recorded.
    async fn submit_reveal(
        &self,
        signer: &AccountId,
        id: Self::AssetId,
        value: Cleartext,
        decryption_proof: DecryptionProof,
    ) -> CoordinatorResult<Cleartext>;

    /// Events emitted after the call returns.
    fn subscribe(&self) -> broadcast::Receiver<RegistryEvent<Self::AssetId>>;
}

/// What the oracle needs to scope its attestation to one registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierContext {
    pub domain: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionResponse {
    pub cleartexts: BTreeMap<CiphertextHandle, Cleartext>,
    /// Forwarded unmodified to `reveal`.
    pub proof: DecryptionProof,
}

#[async_trait]
pub trait DecryptionOracle: Send + Sync {
    async fn decrypt(
        &self,
        handles: &[CiphertextHandle],
        context: &VerifierContext,
    ) -> CoordinatorResult<DecryptionResponse>;
}

/// Recipient an input ciphertext is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientContext {
    pub domain: [u8; 32],
    pub owner: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handle: CiphertextHandle,
    pub validity_proof: InputProof,
}

#[async_trait]
pub trait Encryptor: Send + Sync {
    async fn encrypt(
        &self,
        context: &RecipientContext,
        value: Cleartext,
    ) -> CoordinatorResult<EncryptedInput>;
}
