//! Types and traits for the confidential rarity registry.
//!
//! The record state machine lives here so the on-chain pallet and off-chain
//! hosts enforce the same transition rules. Hosts are only responsible for
//! identifier uniqueness, per-identifier serialization and persistence.
#![cfg_attr(not(feature = "std"), no_std)]

use frame_support::{pallet_prelude::*, BoundedVec};
use sp_std::prelude::*;

/// Opaque reference to an encrypted attribute. Public, never parsed.
pub type CiphertextHandle = [u8; 32];

/// Plaintext attribute value certified by the decryption oracle.
pub type Cleartext = u64;

/// Value reserved as "unset". A reveal claiming it is always rejected.
pub const UNSET_CLEARTEXT: Cleartext = 0;

/// Display metadata (name or URI), opaque to the registry.
pub type MaxDescriptorLen = ConstU32<256>;
pub type Descriptor = BoundedVec<u8, MaxDescriptorLen>;

/// Proof blobs forwarded to the verifier backends.
pub type MaxProofLen = ConstU32<8192>;
/// Evidence that a ciphertext is a well-formed encryption bound to its owner.
pub type InputProof = BoundedVec<u8, MaxProofLen>;
/// Evidence that a cleartext is the decryption of a specific handle.
pub type DecryptionProof = BoundedVec<u8, MaxProofLen>;

#[derive(
    Clone, Copy, Default, Encode, Decode, TypeInfo, MaxEncodedLen, PartialEq, Eq, RuntimeDebug,
)]
pub enum RevealState {
    #[default]
    Pending,
    Revealed,
}

/// Durable per-asset record.
#[derive(Clone, Encode, Decode, TypeInfo, MaxEncodedLen, PartialEq, Eq, RuntimeDebug)]
pub struct AssetRecord<AssetId, AccountId, Moment> {
    pub id: AssetId,
    pub descriptor: Descriptor,
    pub ciphertext: CiphertextHandle,
    pub owner: AccountId,
    pub revealed_value: Option<Cleartext>,
    pub reveal_timestamp: Option<Moment>,
    pub state: RevealState,
}

/// Failure kinds of registry operations. Every variant leaves state untouched.
#[derive(Clone, Copy, Encode, Decode, TypeInfo, PartialEq, Eq, RuntimeDebug)]
pub enum RegistryError {
    DuplicateAsset,
    UnknownAsset,
    Unauthorized,
    InvalidCiphertext,
    ProofMismatch,
    AlreadyRevealed,
    InvalidPlaintext,
}

impl core::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            RegistryError::DuplicateAsset => "asset identifier already registered",
            RegistryError::UnknownAsset => "asset identifier not registered",
            RegistryError::Unauthorized => "caller is not the asset owner",
            RegistryError::InvalidCiphertext => "ciphertext validity proof rejected",
            RegistryError::ProofMismatch => "decryption proof does not match the stored handle",
            RegistryError::AlreadyRevealed => "asset already revealed",
            RegistryError::InvalidPlaintext => "claimed plaintext is the reserved unset value",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RegistryError {}

impl<AssetId, AccountId: PartialEq, Moment> AssetRecord<AssetId, AccountId, Moment> {
    /// Build a `Pending` record after checking the validity proof for
    /// `(ciphertext, owner)`. Duplicate detection is the host's job.
    pub fn mint<V: InputVerifier<AccountId>>(
        id: AssetId,
        descriptor: Descriptor,
        ciphertext: CiphertextHandle,
        owner: AccountId,
        validity_proof: &[u8],
    ) -> Result<Self, RegistryError> {
        V::verify_input(&ciphertext, &owner, validity_proof)
            .map_err(|_| RegistryError::InvalidCiphertext)?;
        Ok(Self {
            id,
            descriptor,
            ciphertext,
            owner,
            revealed_value: None,
            reveal_timestamp: None,
            state: RevealState::Pending,
        })
    }

    pub fn is_revealed(&self) -> bool {
        self.state == RevealState::Revealed
    }

    /// Run the single `Pending -> Revealed` transition.
    ///
    /// The proof is always checked against `self.ciphertext`, never a handle
    /// supplied by the caller. Zero is rejected after the proof check so a
    /// valid proof for the unset value still fails.
    pub fn reveal<V: DecryptionVerifier>(
        &mut self,
        caller: &AccountId,
        claimed: Cleartext,
        decryption_proof: &[u8],
        now: Moment,
    ) -> Result<Cleartext, RegistryError> {
        if &self.owner != caller {
            return Err(RegistryError::Unauthorized);
        }
        if self.is_revealed() {
            return Err(RegistryError::AlreadyRevealed);
        }
        V::verify_decryption(&[self.ciphertext], &[claimed], decryption_proof)
            .map_err(|_| RegistryError::ProofMismatch)?;
        if claimed == UNSET_CLEARTEXT {
            return Err(RegistryError::InvalidPlaintext);
        }

        self.revealed_value = Some(claimed);
        self.reveal_timestamp = Some(now);
        self.state = RevealState::Revealed;
        Ok(claimed)
    }
}

/// Checks validity proofs produced by the encryption service. Implement in the runtime.
pub trait InputVerifier<AccountId> {
    type Error;

    /// Ok iff `proof` certifies `handle` as a well-formed ciphertext created for `owner`.
    fn verify_input(
        handle: &CiphertextHandle,
        owner: &AccountId,
        proof: &[u8],
    ) -> Result<(), Self::Error>;
}

/// Checks decryption proofs produced by the decryption oracle. Implement in the runtime.
pub trait DecryptionVerifier {
    type Error;

    /// Ok iff `proof` certifies `cleartexts[i]` as the decryption of `handles[i]` for every `i`.
    fn verify_decryption(
        handles: &[CiphertextHandle],
        cleartexts: &[Cleartext],
        proof: &[u8],
    ) -> Result<(), Self::Error>;
}

/// Read access for other pallets (e.g. marketplaces gating on revealed rarity).
pub trait RarityInspect<AssetId, AccountId> {
    fn owner_of(id: &AssetId) -> Option<AccountId>;
    fn revealed_value(id: &AssetId) -> Option<Cleartext>;
}

#[cfg(test)]
mod tests {
    use super::*;

    type Record = AssetRecord<u32, u64, u64>;

    const OWNER: u64 = 1;
    const STRANGER: u64 = 2;

    /// Input proofs are valid iff non-empty.
    struct NonEmptyInput;
    impl InputVerifier<u64> for NonEmptyInput {
        type Error = ();
        fn verify_input(_: &CiphertextHandle, _: &u64, proof: &[u8]) -> Result<(), ()> {
            if proof.is_empty() {
                Err(())
            } else {
                Ok(())
            }
        }
    }

    /// Decryption proof = handle[0] || cleartext (LE).
    struct Echo;
    impl DecryptionVerifier for Echo {
        type Error = ();
        fn verify_decryption(
            handles: &[CiphertextHandle],
            cleartexts: &[Cleartext],
            proof: &[u8],
        ) -> Result<(), ()> {
            let mut expected = vec![handles[0][0]];
            expected.extend_from_slice(&cleartexts[0].to_le_bytes());
            if proof == expected.as_slice() {
                Ok(())
            } else {
                Err(())
            }
        }
    }

    fn echo_proof(handle: u8, value: Cleartext) -> Vec<u8> {
        let mut p = vec![handle];
        p.extend_from_slice(&value.to_le_bytes());
        p
    }

    fn pending() -> Record {
        Record::mint::<NonEmptyInput>(9, Default::default(), [4u8; 32], OWNER, &[1]).unwrap()
    }

    #[test]
    fn mint_starts_pending() {
        let rec = pending();
        assert_eq!(rec.state, RevealState::Pending);
        assert_eq!(rec.revealed_value, None);
        assert_eq!(rec.reveal_timestamp, None);
    }

    #[test]
    fn mint_rejects_invalid_validity_proof() {
        let res = Record::mint::<NonEmptyInput>(9, Default::default(), [4u8; 32], OWNER, &[]);
        assert_eq!(res, Err(RegistryError::InvalidCiphertext));
    }

    #[test]
    fn reveal_sets_value_timestamp_and_state_together() {
        let mut rec = pending();
        assert_eq!(rec.reveal::<Echo>(&OWNER, 87, &echo_proof(4, 87), 1_000), Ok(87));
        assert_eq!(rec.revealed_value, Some(87));
        assert_eq!(rec.reveal_timestamp, Some(1_000));
        assert!(rec.is_revealed());
    }

    #[test]
    fn failed_reveals_leave_record_untouched() {
        let mut rec = pending();
        let before = rec.clone();

        assert_eq!(
            rec.reveal::<Echo>(&STRANGER, 87, &echo_proof(4, 87), 1),
            Err(RegistryError::Unauthorized)
        );
        // proof computed for another handle
        assert_eq!(
            rec.reveal::<Echo>(&OWNER, 87, &echo_proof(5, 87), 1),
            Err(RegistryError::ProofMismatch)
        );
        // valid proof for the reserved value
        assert_eq!(
            rec.reveal::<Echo>(&OWNER, 0, &echo_proof(4, 0), 1),
            Err(RegistryError::InvalidPlaintext)
        );
        assert_eq!(rec, before);
    }

    #[test]
    fn revealed_is_terminal() {
        let mut rec = pending();
        rec.reveal::<Echo>(&OWNER, 87, &echo_proof(4, 87), 1).unwrap();
        let after = rec.clone();
        assert_eq!(
            rec.reveal::<Echo>(&OWNER, 12, &echo_proof(4, 12), 2),
            Err(RegistryError::AlreadyRevealed)
        );
        assert_eq!(rec, after);
    }
}
