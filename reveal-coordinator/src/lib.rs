//! # rarity-reveal-coordinator
//!
//! Off-chain side of the confidential rarity registry: encrypt-and-mint,
//! reveal through the decryption oracle, and observe outcomes. Ledgers and
//! FHE services sit behind the async traits in [`interfaces`];
//! [`MemoryLedger`] and [`dev::DevFheService`] implement them in process for
//! tests and local runs.

pub mod config;
pub mod coordinator;
pub mod dev;
pub mod error;
pub mod interfaces;
pub mod ledger;

pub use config::{CoordinatorConfig, DEV_DOMAIN};
pub use coordinator::{RevealCoordinator, RevealOutcome};
pub use error::{CoordinatorError, CoordinatorResult};
pub use interfaces::{
    AccountId, DecryptionOracle, DecryptionResponse, EncryptedInput, Encryptor, LedgerTransport,
    RecipientContext, Record, RegistryEvent, VerifierContext,
};
pub use ledger::MemoryLedger;

use confidential_rarity_primitives::Descriptor;

/// Bound `text` as a registry descriptor.
pub fn descriptor(text: &str) -> CoordinatorResult<Descriptor> {
    text.as_bytes()
        .to_vec()
        .try_into()
        .map_err(|_| CoordinatorError::DescriptorTooLong(text.len()))
}
