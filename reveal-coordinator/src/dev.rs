//! Development FHE service
//!
//! Stands in for both the encryption co-processor and the decryption oracle.
//! Plaintexts are kept in memory behind deterministic handles, but every
//! proof it issues is a genuine threshold attestation, so a registry
//! configured with [`DevAttestation`] verifies it exactly as it would a
//! production one.

use crate::config::DEV_DOMAIN;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::interfaces::{
    AccountId, DecryptionOracle, DecryptionResponse, EncryptedInput, Encryptor, RecipientContext,
    VerifierContext,
};
use crate::ledger::MemoryLedger;
use async_trait::async_trait;
use confidential_rarity_primitives::{CiphertextHandle, Cleartext, DecryptionProof, InputProof};
use frame_support::parameter_types;
use parity_scale_codec::Encode;
use parking_lot::RwLock;
use rarity_attestation_verifier::{
    decryption_digest, input_digest, signing::attest, AttestationConfig, AttestationVerifier,
    SignerKey,
};
use sp_core::{ed25519, Pair as _};
use sp_io::hashing::blake2_256;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Size of the development signer set.
pub const DEV_SIGNERS: u8 = 3;
/// Signatures the development registry requires.
pub const DEV_THRESHOLD: u32 = 2;

/// Deterministic development signer `index`.
pub fn dev_signer_pair(index: u8) -> ed25519::Pair {
    ed25519::Pair::from_seed(&blake2_256(&(b"rarity-dev-signer", index).encode()))
}

pub fn dev_signer_keys(count: u8) -> Vec<SignerKey> {
    (0..count).map(|i| dev_signer_pair(i).public().0).collect()
}

/// Deterministic development account for `name`.
pub fn dev_account(name: &str) -> AccountId {
    AccountId::new(blake2_256(&(b"rarity-dev-account", name).encode()))
}

parameter_types! {
    pub const DevDomain: [u8; 32] = DEV_DOMAIN;
    pub DevSignerKeys: Vec<SignerKey> = dev_signer_keys(DEV_SIGNERS);
    pub const DevThreshold: u32 = DEV_THRESHOLD;
}

/// 2-of-3 development authority used for both inputs and decryptions.
pub struct DevAttestation;

impl AttestationConfig for DevAttestation {
    type Domain = DevDomain;
    type Signers = DevSignerKeys;
    type Threshold = DevThreshold;
}

pub type DevVerifier = AttestationVerifier<DevAttestation>;

/// Memory ledger checking proofs against the development authority.
pub type DevLedger<AssetId> = MemoryLedger<AssetId, DevVerifier, DevVerifier>;

/// In-memory encryptor and decryption oracle.
pub struct DevFheService {
    signers: Vec<(u8, ed25519::Pair)>,
    plaintexts: RwLock<HashMap<CiphertextHandle, Cleartext>>,
    nonce: AtomicU64,
}

impl Default for DevFheService {
    fn default() -> Self {
        Self::with_signers(DEV_SIGNERS)
    }
}

impl DevFheService {
    /// Service that co-signs with the first `count` development signers.
    ///
    /// Fewer than [`DEV_THRESHOLD`] signers produce proofs the development
    /// registry rejects.
    pub fn with_signers(count: u8) -> Self {
        Self {
            signers: (0..count).map(|i| (i, dev_signer_pair(i))).collect(),
            plaintexts: RwLock::new(HashMap::new()),
            nonce: AtomicU64::new(0),
        }
    }

    fn attest(&self, digest: &[u8; 32]) -> Vec<u8> {
        let signers: Vec<_> = self.signers.iter().map(|(i, pair)| (*i, pair)).collect();
        attest(&signers, digest)
    }
}

#[async_trait]
impl Encryptor for DevFheService {
    async fn encrypt(
        &self,
        context: &RecipientContext,
        value: Cleartext,
    ) -> CoordinatorResult<EncryptedInput> {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let handle =
            blake2_256(&(b"rarity-dev-handle", &context.domain, &context.owner, nonce).encode());
        self.plaintexts.write().insert(handle, value);

        let digest = input_digest(&context.domain, &handle, &context.owner);
        let validity_proof: InputProof = self
            .attest(&digest)
            .try_into()
            .map_err(|_| CoordinatorError::Encryption("validity proof exceeds bound".into()))?;
        debug!(handle = %hex::encode(handle), "encrypted input");
        Ok(EncryptedInput { handle, validity_proof })
    }
}

#[async_trait]
impl DecryptionOracle for DevFheService {
    async fn decrypt(
        &self,
        handles: &[CiphertextHandle],
        context: &VerifierContext,
    ) -> CoordinatorResult<DecryptionResponse> {
        let plaintexts = self.plaintexts.read();
        let values = handles
            .iter()
            .map(|h| {
                plaintexts
                    .get(h)
                    .copied()
                    .ok_or_else(|| CoordinatorError::MissingCleartext(hex::encode(h)))
            })
            .collect::<CoordinatorResult<Vec<_>>>()?;
        drop(plaintexts);

        let digest = decryption_digest(&context.domain, handles, &values);
        let proof: DecryptionProof = self.attest(&digest).try_into().map_err(|_| {
            CoordinatorError::OracleUnavailable("decryption proof exceeds bound".into())
        })?;
        let cleartexts: BTreeMap<_, _> = handles.iter().copied().zip(values).collect();
        debug!(handles = handles.len(), "decrypted");
        Ok(DecryptionResponse { cleartexts, proof })
    }
}
