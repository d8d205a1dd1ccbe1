//! Reveal Coordinator
//!
//! Client-side flow that turns "reveal asset `id`" into one verified registry
//! transition:
//!
//! 1. read the record; an already revealed record is answered from the ledger
//!    without contacting the oracle;
//! 2. ask the decryption oracle for the plaintext of the stored handle,
//!    retrying timeouts and transient failures with the same handle;
//! 3. submit `(id, plaintext, proof)` to the registry once;
//! 4. if the registry answers `AlreadyRevealed`, another submission won the
//!    race: re-read the record and return its value. The proof is never
//!    resubmitted.
//!
//! Dropping the future before step 3 leaves no trace on the ledger. Once
//! step 3 has been sent, `observe_reveal` reports the outcome.

use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::interfaces::{
    AccountId, DecryptionOracle, DecryptionResponse, Encryptor, LedgerTransport, RecipientContext,
    RegistryEvent, VerifierContext,
};
use confidential_rarity_primitives::{
    CiphertextHandle, Cleartext, Descriptor, RegistryError, UNSET_CLEARTEXT,
};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// How a reveal request ended. Both variants carry the canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// This request performed the transition.
    Revealed(Cleartext),
    /// The record was already revealed, by an earlier or a concurrent request.
    AlreadyRevealed(Cleartext),
}

impl RevealOutcome {
    pub fn value(&self) -> Cleartext {
        match self {
            RevealOutcome::Revealed(v) | RevealOutcome::AlreadyRevealed(v) => *v,
        }
    }
}

/// Drives mints and reveals for one account.
pub struct RevealCoordinator<L, O> {
    ledger: Arc<L>,
    oracle: Arc<O>,
    account: AccountId,
    config: CoordinatorConfig,
}

impl<L, O> RevealCoordinator<L, O>
where
    L: LedgerTransport,
    O: DecryptionOracle,
{
    pub fn new(
        ledger: Arc<L>,
        oracle: Arc<O>,
        account: AccountId,
        config: CoordinatorConfig,
    ) -> CoordinatorResult<Self> {
        config.validate()?;
        Ok(Self { ledger, oracle, account, config })
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Encrypt `value` for this account and register it under `id`.
    ///
    /// Returns the ciphertext handle the registry stored.
    pub async fn mint<E: Encryptor>(
        &self,
        encryptor: &E,
        id: L::AssetId,
        descriptor: Descriptor,
        value: Cleartext,
    ) -> CoordinatorResult<CiphertextHandle> {
        // A zero rarity could never be revealed.
        if value == UNSET_CLEARTEXT {
            return Err(RegistryError::InvalidPlaintext.into());
        }
        let context = RecipientContext { domain: self.config.domain, owner: self.account.clone() };
        let input = encryptor.encrypt(&context, value).await?;
        self.ledger
            .submit_mint(&self.account, id.clone(), descriptor, input.handle, input.validity_proof)
            .await?;
        info!(?id, handle = %hex::encode(input.handle), "mint accepted");
        Ok(input.handle)
    }

    /// Reveal the rarity of `id`. See the module docs for the steps.
    pub async fn request_reveal(&self, id: &L::AssetId) -> CoordinatorResult<RevealOutcome> {
        let record = self.ledger.fetch(id).await?;
        if let Some(value) = record.revealed_value.filter(|_| record.is_revealed()) {
            debug!(?id, value, "already revealed, oracle not contacted");
            return Ok(RevealOutcome::AlreadyRevealed(value));
        }
        // The registry would reject it anyway; fail before spending an oracle call.
        if record.owner != self.account {
            return Err(RegistryError::Unauthorized.into());
        }

        let handle = record.ciphertext;
        let response = self.decrypt_with_retry(handle).await?;
        let value = response
            .cleartexts
            .get(&handle)
            .copied()
            .ok_or_else(|| CoordinatorError::MissingCleartext(hex::encode(handle)))?;

        match self.ledger.submit_reveal(&self.account, id.clone(), value, response.proof).await {
            Ok(revealed) => {
                info!(?id, value = revealed, "reveal accepted");
                Ok(RevealOutcome::Revealed(revealed))
            }
            Err(CoordinatorError::Registry(RegistryError::AlreadyRevealed)) => {
                let current = self.ledger.fetch(id).await?;
                let value = current
                    .revealed_value
                    .ok_or(CoordinatorError::Registry(RegistryError::AlreadyRevealed))?;
                info!(?id, value, "lost reveal race, converged on ledger value");
                Ok(RevealOutcome::AlreadyRevealed(value))
            }
            Err(e) => {
                warn!(?id, error = %e, "reveal rejected");
                Err(e)
            }
        }
    }

    /// Wait until `id` is revealed and return its value.
    ///
    /// Checks the record first, then follows registry events, bounded by
    /// `observe_timeout_ms`.
    pub async fn observe_reveal(&self, id: &L::AssetId) -> CoordinatorResult<Cleartext> {
        // Subscribe before reading so a reveal between the two is not missed.
        let mut events = self.ledger.subscribe();
        if let Some(value) = self.revealed_value(id).await? {
            return Ok(value);
        }

        tokio::time::timeout(self.config.observe_timeout(), self.follow_events(id, &mut events))
            .await
            .map_err(|_| CoordinatorError::ObserveTimeout(self.config.observe_timeout_ms))?
    }

    async fn follow_events(
        &self,
        id: &L::AssetId,
        events: &mut broadcast::Receiver<RegistryEvent<L::AssetId>>,
    ) -> CoordinatorResult<Cleartext> {
        loop {
            match events.recv().await {
                Ok(RegistryEvent::Revealed { id: revealed, value }) if revealed == *id => {
                    return Ok(value);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event stream lagged, re-reading record");
                    if let Some(value) = self.revealed_value(id).await? {
                        return Ok(value);
                    }
                }
                Err(RecvError::Closed) => {
                    return Err(CoordinatorError::TransportFailure(
                        "registry event stream closed".into(),
                    ));
                }
            }
        }
    }

    async fn revealed_value(&self, id: &L::AssetId) -> CoordinatorResult<Option<Cleartext>> {
        let record = self.ledger.fetch(id).await?;
        Ok(record.revealed_value.filter(|_| record.is_revealed()))
    }

    async fn decrypt_with_retry(
        &self,
        handle: CiphertextHandle,
    ) -> CoordinatorResult<DecryptionResponse> {
        let context = VerifierContext { domain: self.config.domain };
        let handles = [handle];
        let attempts = self.config.max_oracle_attempts.max(1);
        let mut last = CoordinatorError::OracleUnavailable("no attempt made".into());

        for attempt in 1..=attempts {
            let call = self.oracle.decrypt(&handles, &context);
            match tokio::time::timeout(self.config.oracle_timeout(), call).await {
                Ok(Ok(response)) => {
                    debug!(attempt, handle = %hex::encode(handle), "oracle answered");
                    return Ok(response);
                }
                Ok(Err(e)) if !e.is_retryable() => return Err(e),
                Ok(Err(e)) => last = e,
                Err(_) => last = CoordinatorError::OracleTimeout(self.config.oracle_timeout_ms),
            }
            if attempt < attempts {
                warn!(attempt, error = %last, "oracle attempt failed, retrying");
                tokio::time::sleep(self.config.backoff(attempt)).await;
            }
        }
        Err(last)
    }
}
