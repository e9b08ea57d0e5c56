//! # State Reconciler
//!
//! Produces one canonical `GameState` for a contract address, whichever
//! contract version is deployed there.
//!
//! ```text
//! contract_fields + next_entry_price + can_end ──ok──► Canonical
//!        │ any failure
//!        ▼
//! raw_state ──► decode_legacy(now) ──ok──► Legacy
//!        │ SchemaMismatch ──► SchemaMismatch
//!        │ anything else  ──► StateUnavailable { canonical, legacy }
//! ```
//!
//! Stateless: every call starts from scratch.

use std::sync::Arc;

use chain_reaction_core::legacy::decode_legacy;
use chain_reaction_core::{Address, Clock, GameState, StateSource, SyncError, SyncResult};
use tracing::{debug, warn};

use crate::remote::StateQuery;

/// Two-path state reconciler.
pub struct Reconciler<N> {
    node: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<N> Clone for Reconciler<N> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<N: StateQuery> Reconciler<N> {
    /// Creates a reconciler. The clock drives legacy `can_end` derivation.
    #[must_use]
    pub fn new(node: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self { node, clock }
    }

    /// Reconciles the state of the contract at `address`.
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` if the legacy layout does not fit either,
    /// `StateUnavailable` if both paths failed for any other reason.
    pub async fn reconcile(&self, address: &Address) -> SyncResult<GameState> {
        let canonical = match self.canonical(address).await {
            Ok(state) => return Ok(state),
            Err(e) => e,
        };
        debug!(address = %address, error = %canonical, "canonical decode failed, trying legacy layout");

        match self.legacy(address).await {
            Ok(state) => Ok(state),
            Err(legacy @ SyncError::SchemaMismatch { .. }) => {
                warn!(address = %address, error = %legacy, "legacy layout mismatch");
                Err(legacy)
            }
            Err(legacy) => Err(SyncError::StateUnavailable {
                address: address.to_string(),
                canonical: canonical.to_string(),
                legacy: legacy.to_string(),
            }),
        }
    }

    async fn canonical(&self, address: &Address) -> SyncResult<GameState> {
        let fields = self.node.contract_fields(address).await?;
        let (next_entry_price, can_end) = tokio::try_join!(
            self.node.next_entry_price(address),
            self.node.can_end(address)
        )?;
        Ok(GameState::new(fields, next_entry_price, can_end, StateSource::Canonical))
    }

    async fn legacy(&self, address: &Address) -> SyncResult<GameState> {
        let raw = self.node.raw_state(address).await?;
        decode_legacy(&raw, self.clock.now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{fixtures, SimulatedNode};
    use chain_reaction_core::ManualClock;
    use chain_reaction_core::U256;

    fn setup() -> (Arc<SimulatedNode>, Reconciler<SimulatedNode>) {
        let clock = Arc::new(ManualClock::new(9_000));
        let node = Arc::new(SimulatedNode::new(clock.clone()));
        let reconciler = Reconciler::new(Arc::clone(&node), clock);
        (node, reconciler)
    }

    #[tokio::test]
    async fn test_canonical_path() {
        let (node, reconciler) = setup();
        let address = Address::new("1Canonical");
        node.deploy_canonical(&address, fixtures::active_fields());

        let state = reconciler.reconcile(&address).await.unwrap();
        assert_eq!(state.source, StateSource::Canonical);
        assert_eq!(state.next_entry_price, U256::from(115u64));
    }

    #[tokio::test]
    async fn test_legacy_fallback() {
        let (node, reconciler) = setup();
        let address = Address::new("1Legacy");
        node.deploy_legacy(&address, fixtures::active_fields());

        let state = reconciler.reconcile(&address).await.unwrap();
        assert_eq!(state.source, StateSource::Legacy);
        assert_eq!(state.fields, fixtures::active_fields());
        assert!(!state.can_end);
    }

    #[tokio::test]
    async fn test_short_legacy_is_schema_mismatch() {
        let (node, reconciler) = setup();
        let address = Address::new("1Broken");
        node.deploy_legacy(&address, fixtures::active_fields());
        node.edit_raw_state(&address, |raw| raw.mutable.truncate(12));

        let err = reconciler.reconcile(&address).await.unwrap_err();
        assert!(matches!(err, SyncError::SchemaMismatch { section: "legacy mutable fields", .. }));
    }

    #[tokio::test]
    async fn test_offline_is_state_unavailable() {
        let (node, reconciler) = setup();
        let address = Address::new("1Canonical");
        node.deploy_canonical(&address, fixtures::active_fields());
        node.set_offline(true);

        let err = reconciler.reconcile(&address).await.unwrap_err();
        match err {
            SyncError::StateUnavailable { address, canonical, legacy } => {
                assert_eq!(address, "1Canonical");
                assert!(canonical.contains("offline"));
                assert!(legacy.contains("offline"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
