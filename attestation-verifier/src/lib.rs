//! # rarity-attestation-verifier: threshold attestation checks
//!
//! On-chain implementation of the registry's `InputVerifier` and
//! `DecryptionVerifier` boundaries. The FHE co-processor (for inputs) and the
//! decryption oracle (for reveals) attest their results by signing a
//! domain-separated digest with ed25519; a proof is valid once `Threshold`
//! distinct members of the configured signer set have signed.
//!
//! ## Digests
//!
//! ```text
//! input      = blake2_256(SCALE("rarity-registry/input/v1",      domain, handle, owner))
//! decryption = blake2_256(SCALE("rarity-registry/decryption/v1", domain, handles, cleartexts))
//! ```
//!
//! `domain` scopes attestations to one registry deployment. Because the
//! handle list is part of the decryption digest, an attestation for one
//! ciphertext can never be replayed against another.
//!
//! ## Proof layout
//!
//! SCALE-encoded [`Attestation`]: `Vec<(signer_index: u8, signature: [u8; 64])>`.

#![cfg_attr(not(feature = "std"), no_std)]

use core::marker::PhantomData;
use frame_support::{pallet_prelude::*, traits::Get};
use parity_scale_codec::DecodeAll;
use sp_core::ed25519;
use sp_io::hashing::blake2_256;
use sp_std::prelude::*;

use confidential_rarity_primitives::{
    CiphertextHandle, Cleartext, DecryptionVerifier, InputVerifier,
};


pub const INPUT_TAG: &[u8; 24] = b"rarity-registry/input/v1";
pub const DECRYPTION_TAG: &[u8; 29] = b"rarity-registry/decryption/v1";

/// Raw ed25519 public key of an attestation signer.
pub type SignerKey = [u8; 32];

#[derive(Clone, Encode, Decode, TypeInfo, PartialEq, Eq, RuntimeDebug)]
pub struct SignerSignature {
    /// Position of the signer in the configured set.
    pub signer: u8,
    pub signature: [u8; 64],
}

#[derive(Clone, Default, Encode, Decode, TypeInfo, PartialEq, Eq, RuntimeDebug)]
pub struct Attestation {
    pub signatures: Vec<SignerSignature>,
}

/// Runtime-supplied parameters of one attestation authority.
pub trait AttestationConfig {
    /// Registry deployment the attestations are scoped to.
    type Domain: Get<[u8; 32]>;
    type Signers: Get<Vec<SignerKey>>;
    /// Minimum number of distinct signers. Values below 1 are treated as 1.
    type Threshold: Get<u32>;
}

#[derive(Clone, Copy, PartialEq, Eq, RuntimeDebug)]
pub enum AttestationError {
    /// Proof bytes are not a SCALE `Attestation`, or list more entries than signers.
    Malformed,
    UnknownSigner,
    DuplicateSigner,
    BadSignature,
    BelowThreshold,
    /// Handles and cleartexts differ in length, or are empty.
    LengthMismatch,
}

pub fn input_digest<AccountId: Encode>(
    domain: &[u8; 32],
    handle: &CiphertextHandle,
    owner: &AccountId,
) -> [u8; 32] {
    blake2_256(&(INPUT_TAG, domain, handle, owner).encode())
}

pub fn decryption_digest(
    domain: &[u8; 32],
    handles: &[CiphertextHandle],
    cleartexts: &[Cleartext],
) -> [u8; 32] {
    blake2_256(&(DECRYPTION_TAG, domain, handles, cleartexts).encode())
}

/// Check `proof` as a threshold attestation of `digest` by `signers`.
pub fn verify_attestation(
    signers: &[SignerKey],
    threshold: u32,
    digest: &[u8; 32],
    proof: &[u8],
) -> Result<(), AttestationError> {
    let attestation =
        Attestation::decode_all(&mut &proof[..]).map_err(|_| AttestationError::Malformed)?;
    if attestation.signatures.len() > signers.len() {
        return Err(AttestationError::Malformed);
    }

    let mut seen = Vec::new();
    seen.resize(signers.len(), false);
    for entry in &attestation.signatures {
        let index = entry.signer as usize;
        let key = signers.get(index).ok_or(AttestationError::UnknownSigner)?;
        if seen[index] {
            return Err(AttestationError::DuplicateSigner);
        }
        seen[index] = true;

        let valid = sp_io::crypto::ed25519_verify(
            &ed25519::Signature::from_raw(entry.signature),
            digest,
            &ed25519::Public::from_raw(*key),
        );
        if !valid {
            return Err(AttestationError::BadSignature);
        }
    }

    if attestation.signatures.len() < threshold.max(1) as usize {
        return Err(AttestationError::BelowThreshold);
    }
    Ok(())
}

/// `InputVerifier` + `DecryptionVerifier` backed by the authority described by `C`.
///
/// Runtimes usually instantiate it twice: once with the co-processor signer set
/// for `InputVerifier`, once with the decryption oracle's set for `DecryptionVerifier`.
pub struct AttestationVerifier<C>(PhantomData<C>);

impl<C: AttestationConfig, AccountId: Encode> InputVerifier<AccountId> for AttestationVerifier<C> {
    type Error = AttestationError;

    fn verify_input(
        handle: &CiphertextHandle,
        owner: &AccountId,
        proof: &[u8],
    ) -> Result<(), AttestationError> {
        let digest = input_digest(&C::Domain::get(), handle, owner);
        verify_attestation(&C::Signers::get(), C::Threshold::get(), &digest, proof)
    }
}

impl<C: AttestationConfig> DecryptionVerifier for AttestationVerifier<C> {
    type Error = AttestationError;

    fn verify_decryption(
        handles: &[CiphertextHandle],
        cleartexts: &[Cleartext],
        proof: &[u8],
    ) -> Result<(), AttestationError> {
        if handles.is_empty() || handles.len() != cleartexts.len() {
            return Err(AttestationError::LengthMismatch);
        }
        let digest = decryption_digest(&C::Domain::get(), handles, cleartexts);
        verify_attestation(&C::Signers::get(), C::Threshold::get(), &digest, proof)
    }
}

/// Producer side, for off-chain services and tests.
#[cfg(feature = "std")]
pub mod signing {
    use super::*;
    use sp_core::Pair as _;

    /// Sign `digest` with each `(index, pair)` and encode the resulting attestation.
    pub fn attest(signers: &[(u8, &ed25519::Pair)], digest: &[u8; 32]) -> Vec<u8> {
        let signatures = signers
            .iter()
            .map(|(index, pair)| SignerSignature {
                signer: *index,
                signature: pair.sign(digest).0,
            })
            .collect();
        Attestation { signatures }.encode()
    }
}
