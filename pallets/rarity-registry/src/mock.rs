use crate::pallet as pallet_rarity_registry;
use confidential_rarity_primitives::{
    CiphertextHandle, Cleartext, DecryptionProof, DecryptionVerifier, Descriptor, InputProof,
    InputVerifier,
};
use frame_support::{
    construct_runtime, derive_impl, parameter_types,
    traits::{ConstU32, ConstU64},
    BoundedVec,
};
use parity_scale_codec::Encode;
use sp_io::hashing::blake2_256;
use sp_runtime::BuildStorage;

pub type AccountId = u64;
pub type AssetId = BoundedVec<u8, ConstU32<32>>;
pub const ALICE: AccountId = 1;
pub const BOB: AccountId = 2;

// --- Deterministic stand-ins for the FHE trust boundary --------------------------
// A validity proof is H("input" || handle || owner); a decryption proof is
// H("decrypt" || handles || cleartexts). Anything else is rejected, so a proof
// produced for a different handle, owner or value fails exactly as a real
// attestation would.

pub struct HashInputVerifier;

impl InputVerifier<AccountId> for HashInputVerifier {
    type Error = ();
    fn verify_input(handle: &CiphertextHandle, owner: &AccountId, proof: &[u8]) -> Result<(), ()> {
        if proof == validity_digest(handle, owner).as_slice() {
            Ok(())
        } else {
            Err(())
        }
    }
}

pub struct HashDecryptionVerifier;

impl DecryptionVerifier for HashDecryptionVerifier {
    type Error = ();
    fn verify_decryption(
        handles: &[CiphertextHandle],
        cleartexts: &[Cleartext],
        proof: &[u8],
    ) -> Result<(), ()> {
        if proof == blake2_256(&(b"decrypt", handles, cleartexts).encode()).as_slice() {
            Ok(())
        } else {
            Err(())
        }
    }
}

fn validity_digest(handle: &CiphertextHandle, owner: &AccountId) -> [u8; 32] {
    blake2_256(&(b"input", handle, owner).encode())
}

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Runtime {
    type Block = frame_system::mocking::MockBlock<Runtime>;
}

impl pallet_timestamp::Config for Runtime {
    type Moment = u64;
    type OnTimestampSet = ();
    type MinimumPeriod = ConstU64<1>;
    type WeightInfo = ();
}

parameter_types! {
    pub const MaxAssets: u32 = 16;
}

impl pallet_rarity_registry::Config for Runtime {
    type RuntimeEvent = RuntimeEvent;
    type AssetId = AssetId;
    type Time = Timestamp;
    type InputVerifier = HashInputVerifier;
    type DecryptionVerifier = HashDecryptionVerifier;
    type MaxAssets = MaxAssets;
    type WeightInfo = ();
}

construct_runtime!(
    pub enum Runtime {
        System: frame_system,
        Timestamp: pallet_timestamp,
        RarityRegistry: pallet_rarity_registry,
    }
);

pub const GENESIS_MOMENT: u64 = 1_700_000_000_000;

// Build a fresh externalities for each test.
pub fn new_test_ext() -> sp_io::TestExternalities {
    let t = frame_system::GenesisConfig::<Runtime>::default()
        .build_storage()
        .unwrap();
    let mut ext = sp_io::TestExternalities::new(t);
    ext.execute_with(|| {
        System::set_block_number(1);
        Timestamp::set_timestamp(GENESIS_MOMENT);
    });
    ext
}

// Handy helpers

pub fn id(s: &str) -> AssetId {
    s.as_bytes().to_vec().try_into().expect("short id")
}

pub fn descriptor(s: &str) -> Descriptor {
    s.as_bytes().to_vec().try_into().expect("bounded descriptor")
}

pub fn handle(b: u8) -> CiphertextHandle {
    [b; 32]
}

pub fn validity_proof(handle: &CiphertextHandle, owner: AccountId) -> InputProof {
    validity_digest(handle, &owner).to_vec().try_into().expect("bounded vec")
}

pub fn decryption_proof(handle: &CiphertextHandle, value: Cleartext) -> DecryptionProof {
    let handles = [*handle];
    let cleartexts = [value];
    blake2_256(&(b"decrypt", &handles[..], &cleartexts[..]).encode())
        .to_vec()
        .try_into()
        .expect("bounded vec")
}

/// Mint `name` for `owner` under `handle(h)` with a valid proof.
pub fn mint_as(owner: AccountId, name: &str, h: u8) -> frame_support::dispatch::DispatchResult {
    let ct = handle(h);
    RarityRegistry::mint(
        RuntimeOrigin::signed(owner),
        id(name),
        descriptor(name),
        ct,
        validity_proof(&ct, owner),
    )
}
