//! **pallet-rarity-registry**
//!
//! Ledger-resident registry of NFTs whose rarity attribute is stored as an
//! opaque FHE ciphertext handle and disclosed at most once.
//!
//! Lifecycle of an asset:
//! - `mint`: the owner registers `(id, descriptor, ciphertext)` together with a
//!   validity proof from the encryption service. The record starts `Pending`.
//! - `reveal`: the owner submits the plaintext and a decryption proof from the
//!   decryption oracle. The proof is checked against the handle stored for
//!   `id`, never against a caller-supplied handle, so a proof obtained for any
//!   other ciphertext is rejected. On success the record becomes `Revealed`
//!   and is never mutated again.
//!
//! Both cryptographic checks go through the `InputVerifier` and
//! `DecryptionVerifier` traits so the pallet has no dependency on a specific
//! scheme. The transition rules themselves live in
//! [`confidential_rarity_primitives::AssetRecord`]; this pallet adds storage,
//! identifier uniqueness and insertion-ordered enumeration.
//!
//! Block execution serializes all mutations, so two reveals for the same
//! identifier always resolve to one success and one `AlreadyRevealed`.

#![cfg_attr(not(feature = "std"), no_std)]

use frame_support::{pallet_prelude::*, traits::Time};
use frame_system::pallet_prelude::*;
use sp_std::prelude::*;

use confidential_rarity_primitives::{
    AssetRecord, CiphertextHandle, Cleartext, DecryptionProof, DecryptionVerifier, Descriptor,
    InputProof, InputVerifier, RarityInspect, RegistryError,
};

pub use pallet::*;

#[cfg(test)]
mod mock;

const LOG_TARGET: &str = "runtime::rarity-registry";

#[frame_support::pallet]
pub mod pallet {
    use super::*;

    pub type MomentOf<T> = <<T as Config>::Time as Time>::Moment;
    pub type RecordOf<T> =
        AssetRecord<<T as Config>::AssetId, <T as frame_system::Config>::AccountId, MomentOf<T>>;

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Caller-assigned asset identifier.
        type AssetId: Parameter + Member + MaxEncodedLen;

        /// Source of the reveal timestamp.
        type Time: Time;

        /// Checks validity proofs for freshly minted ciphertexts.
        type InputVerifier: InputVerifier<Self::AccountId>;

        /// Checks decryption proofs at reveal time.
        type DecryptionVerifier: DecryptionVerifier;

        /// Upper bound on registered assets (bounds the ordered index).
        #[pallet::constant]
        type MaxAssets: Get<u32>;

        type WeightInfo: WeightInfo;
    }

    pub trait WeightInfo {
        fn mint() -> Weight;
        fn reveal() -> Weight;
    }
    impl WeightInfo for () {
        fn mint() -> Weight {
            Weight::from_parts(40_000, 0)
        }
        fn reveal() -> Weight {
            Weight::from_parts(60_000, 0)
        }
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    /// id -> record
    #[pallet::storage]
    pub type Assets<T: Config> = StorageMap<_, Blake2_128Concat, T::AssetId, RecordOf<T>, OptionQuery>;

    /// Insertion position -> id. Positions `0..AssetCount` are always populated.
    #[pallet::storage]
    pub type AssetIndex<T: Config> = StorageMap<_, Twox64Concat, u32, T::AssetId, OptionQuery>;

    #[pallet::storage]
    pub type AssetCount<T: Config> = StorageValue<_, u32, ValueQuery>;

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// A new encrypted-rarity asset was registered. Carries no ciphertext data.
        Created { id: T::AssetId, owner: T::AccountId },
        /// The rarity of `id` was verified and disclosed.
        Revealed { id: T::AssetId, value: Cleartext },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// An asset with this identifier already exists.
        DuplicateAsset,
        UnknownAsset,
        /// Only the owner may reveal.
        Unauthorized,
        /// The validity proof did not verify for this ciphertext and owner.
        InvalidCiphertext,
        /// The decryption proof does not certify the value for the stored handle.
        ProofMismatch,
        AlreadyRevealed,
        /// The claimed value is reserved as "unset".
        InvalidPlaintext,
        /// `MaxAssets` reached.
        RegistryFull,
    }

    impl<T> From<RegistryError> for Error<T> {
        fn from(e: RegistryError) -> Self {
            match e {
                RegistryError::DuplicateAsset => Error::<T>::DuplicateAsset,
                RegistryError::UnknownAsset => Error::<T>::UnknownAsset,
                RegistryError::Unauthorized => Error::<T>::Unauthorized,
                RegistryError::InvalidCiphertext => Error::<T>::InvalidCiphertext,
                RegistryError::ProofMismatch => Error::<T>::ProofMismatch,
                RegistryError::AlreadyRevealed => Error::<T>::AlreadyRevealed,
                RegistryError::InvalidPlaintext => Error::<T>::InvalidPlaintext,
            }
        }
    }

    // --------------------------- Calls -------------------------------------------------

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Register a new asset whose rarity is encrypted under `ciphertext`.
        ///
        /// The signer becomes the owner. `validity_proof` must attest that
        /// `ciphertext` is a well-formed encryption created for the signer; the
        /// pallet never learns the plaintext.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::mint())]
        pub fn mint(
            origin: OriginFor<T>,
            id: T::AssetId,
            descriptor: Descriptor,
            ciphertext: CiphertextHandle,
            validity_proof: InputProof,
        ) -> DispatchResult {
            let owner = ensure_signed(origin)?;
            Self::do_mint(owner, id, descriptor, ciphertext, &validity_proof)
        }

        /// Disclose the rarity of `id`.
        ///
        /// `decryption_proof` is forwarded untouched to the decryption verifier
        /// together with the stored handle and `value`.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::reveal())]
        pub fn reveal(
            origin: OriginFor<T>,
            id: T::AssetId,
            value: Cleartext,
            decryption_proof: DecryptionProof,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            Self::do_reveal(&who, id, value, &decryption_proof).map(|_| ())
        }
    }

    // --------------------------- Internals / accessors ----------------------------------

    impl<T: Config> Pallet<T> {
        pub fn do_mint(
            owner: T::AccountId,
            id: T::AssetId,
            descriptor: Descriptor,
            ciphertext: CiphertextHandle,
            validity_proof: &[u8],
        ) -> DispatchResult {
            ensure!(!Assets::<T>::contains_key(&id), Error::<T>::DuplicateAsset);
            let position = AssetCount::<T>::get();
            ensure!(position < T::MaxAssets::get(), Error::<T>::RegistryFull);

            let record = RecordOf::<T>::mint::<T::InputVerifier>(
                id.clone(),
                descriptor,
                ciphertext,
                owner.clone(),
                validity_proof,
            )
            .map_err(|e| {
                log::warn!(target: LOG_TARGET, "validity proof rejected for {:?}", id);
                Error::<T>::from(e)
            })?;

            Assets::<T>::insert(&id, record);
            AssetIndex::<T>::insert(position, &id);
            AssetCount::<T>::put(position.saturating_add(1));

            log::debug!(target: LOG_TARGET, "minted {:?} at position {}", id, position);
            Self::deposit_event(Event::Created { id, owner });
            Ok(())
        }

        pub fn do_reveal(
            who: &T::AccountId,
            id: T::AssetId,
            value: Cleartext,
            decryption_proof: &[u8],
        ) -> Result<Cleartext, DispatchError> {
            let now = T::Time::now();
            // try_mutate only writes back on Ok, so every rejection leaves the record as is.
            let revealed = Assets::<T>::try_mutate(&id, |maybe| -> Result<Cleartext, Error<T>> {
                let record = maybe.as_mut().ok_or(Error::<T>::UnknownAsset)?;
                record
                    .reveal::<T::DecryptionVerifier>(who, value, decryption_proof, now)
                    .map_err(|e| {
                        if e == RegistryError::ProofMismatch {
                            log::warn!(target: LOG_TARGET, "decryption proof rejected for {:?}", id);
                        }
                        Error::<T>::from(e)
                    })
            })?;

            log::debug!(target: LOG_TARGET, "revealed {:?} = {}", id, revealed);
            Self::deposit_event(Event::Revealed { id, value: revealed });
            Ok(revealed)
        }

        /// Full record for `id`, ciphertext handle included.
        pub fn asset(id: &T::AssetId) -> Result<RecordOf<T>, Error<T>> {
            Assets::<T>::get(id).ok_or(Error::<T>::UnknownAsset)
        }

        /// All identifiers in insertion order.
        pub fn list_ids() -> Vec<T::AssetId> {
            (0..AssetCount::<T>::get())
                .filter_map(|position| AssetIndex::<T>::get(position))
                .collect()
        }

        /// Identifiers minted by `owner`, in insertion order.
        pub fn ids_of(owner: &T::AccountId) -> Vec<T::AssetId> {
            Self::list_ids()
                .into_iter()
                .filter(|id| Assets::<T>::get(id).is_some_and(|r| &r.owner == owner))
                .collect()
        }

        pub fn asset_count() -> u32 {
            AssetCount::<T>::get()
        }
    }

    impl<T: Config> RarityInspect<T::AssetId, T::AccountId> for Pallet<T> {
        fn owner_of(id: &T::AssetId) -> Option<T::AccountId> {
            Assets::<T>::get(id).map(|r| r.owner)
        }

        fn revealed_value(id: &T::AssetId) -> Option<Cleartext> {
            Assets::<T>::get(id).and_then(|r| r.revealed_value)
        }
    }
}
