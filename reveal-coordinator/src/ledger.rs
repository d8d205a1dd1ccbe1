//! In-process registry host
//!
//! Runs the same record state machine as the pallet. Instead of block
//! ordering, every identifier gets its own mutex: reveals of one asset are
//! serialized while reveals of different assets proceed in parallel. The
//! index lock is only held to insert or look up a slot, never across a proof
//! check.

use crate::error::{CoordinatorError, CoordinatorResult};
use crate::interfaces::{AccountId, LedgerTransport, Moment, Record, RegistryEvent};
use async_trait::async_trait;
use confidential_rarity_primitives::{
    CiphertextHandle, Cleartext, DecryptionProof, DecryptionVerifier, Descriptor, InputProof,
    InputVerifier, RegistryError,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

struct Index<AssetId> {
    slots: HashMap<AssetId, Arc<Mutex<Record<AssetId>>>>,
    order: Vec<AssetId>,
}

/// Registry kept in memory, generic over the two proof verifiers.
pub struct MemoryLedger<AssetId, I, D> {
    index: RwLock<Index<AssetId>>,
    events: broadcast::Sender<RegistryEvent<AssetId>>,
    _verifiers: PhantomData<fn() -> (I, D)>,
}

impl<AssetId, I, D> Default for MemoryLedger<AssetId, I, D>
where
    AssetId: Clone + Eq + Hash + Debug,
    I: InputVerifier<AccountId>,
    D: DecryptionVerifier,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<AssetId, I, D> MemoryLedger<AssetId, I, D>
where
    AssetId: Clone + Eq + Hash + Debug,
    I: InputVerifier<AccountId>,
    D: DecryptionVerifier,
{
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            index: RwLock::new(Index { slots: HashMap::new(), order: Vec::new() }),
            events,
            _verifiers: PhantomData,
        }
    }

    pub fn mint(
        &self,
        owner: AccountId,
        id: AssetId,
        descriptor: Descriptor,
        ciphertext: CiphertextHandle,
        validity_proof: &[u8],
    ) -> Result<(), RegistryError> {
        if self.index.read().slots.contains_key(&id) {
            return Err(RegistryError::DuplicateAsset);
        }
        let record = Record::<AssetId>::mint::<I>(
            id.clone(),
            descriptor,
            ciphertext,
            owner.clone(),
            validity_proof,
        )
        .inspect_err(|_| warn!(?id, "validity proof rejected"))?;

        let mut index = self.index.write();
        // A concurrent mint of the same id may have landed during the proof check.
        if index.slots.contains_key(&id) {
            return Err(RegistryError::DuplicateAsset);
        }
        index.slots.insert(id.clone(), Arc::new(Mutex::new(record)));
        index.order.push(id.clone());
        drop(index);

        info!(?id, %owner, "asset minted");
        // No subscribers is not an error.
        let _ = self.events.send(RegistryEvent::Created { id, owner });
        Ok(())
    }

    pub fn reveal(
        &self,
        caller: &AccountId,
        id: &AssetId,
        value: Cleartext,
        decryption_proof: &[u8],
    ) -> Result<Cleartext, RegistryError> {
        let slot = self.slot(id)?;
        let mut record = slot.lock();
        let revealed = record
            .reveal::<D>(caller, value, decryption_proof, now_ms())
            .inspect_err(|e| {
                if *e == RegistryError::ProofMismatch {
                    warn!(?id, "decryption proof rejected");
                }
            })?;
        // Publish while the slot is held so events follow transition order.
        let _ = self.events.send(RegistryEvent::Revealed { id: id.clone(), value: revealed });
        drop(record);

        info!(?id, value = revealed, "asset revealed");
        Ok(revealed)
    }

    pub fn get(&self, id: &AssetId) -> Result<Record<AssetId>, RegistryError> {
        let slot = self.slot(id)?;
        let record = slot.lock().clone();
        Ok(record)
    }

    /// All identifiers in insertion order.
    pub fn list_ids(&self) -> Vec<AssetId> {
        self.index.read().order.clone()
    }

    pub fn len(&self) -> usize {
        self.index.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: &AssetId) -> Result<Arc<Mutex<Record<AssetId>>>, RegistryError> {
        self.index.read().slots.get(id).cloned().ok_or(RegistryError::UnknownAsset)
    }
}

#[async_trait]
impl<AssetId, I, D> LedgerTransport for MemoryLedger<AssetId, I, D>
where
    AssetId: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    I: InputVerifier<AccountId>,
    D: DecryptionVerifier,
{
    type AssetId = AssetId;

    async fn fetch(&self, id: &AssetId) -> CoordinatorResult<Record<AssetId>> {
        Ok(self.get(id)?)
    }

    async fn submit_mint(
        &self,
        signer: &AccountId,
        id: AssetId,
        descriptor: Descriptor,
        ciphertext: CiphertextHandle,
        validity_proof: InputProof,
    ) -> CoordinatorResult<()> {
        debug!(?id, "mint submitted");
        self.mint(signer.clone(), id, descriptor, ciphertext, &validity_proof)
            .map_err(CoordinatorError::from)
    }

    async fn submit_reveal(
        &self,
        signer: &AccountId,
        id: AssetId,
        value: Cleartext,
        decryption_proof: DecryptionProof,
    ) -> CoordinatorResult<Cleartext> {
        debug!(?id, "reveal submitted");
        self.reveal(signer, &id, value, &decryption_proof).map_err(CoordinatorError::from)
    }

    fn subscribe(&self) -> broadcast::Receiver<RegistryEvent<AssetId>> {
        self.events.subscribe()
    }
}

fn now_ms() -> Moment {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Moment)
        .unwrap_or_default()
}
