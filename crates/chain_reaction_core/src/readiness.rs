//! # UI Readiness
//!
//! Maps the current snapshot plus loading/error flags to the screen a
//! client should show. Pure; callers re-evaluate on every tick so that the
//! active → claimable transition happens on the wall clock alone.
//!
//! ```text
//! loading ──► error ──► no chain ──► claimable ──► active
//!   (first matching rule wins)
//! ```

use serde::{Deserialize, Serialize};

use crate::state::GameState;

/// What a client should render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UiState {
    /// No snapshot yet and a fetch is in flight.
    Loading,
    /// No epoch running; the next entry starts one.
    NoChain,
    /// Epoch running and accepting entries.
    Active,
    /// Countdown expired; the epoch can be settled.
    Claimable,
    /// The last synchronization failed.
    Error,
}

/// Derives the UI state.
///
/// `is_loading` is meant to be the initial-load flag: background refreshes
/// of an already loaded game do not set it.
#[must_use]
pub fn derive_ui_state(
    state: Option<&GameState>,
    is_loading: bool,
    error: Option<&str>,
    now_ms: u64,
) -> UiState {
    if is_loading {
        return UiState::Loading;
    }
    if error.is_some() {
        return UiState::Error;
    }
    match state {
        Some(state) if state.is_active() => {
            if state.is_claimable(now_ms) {
                UiState::Claimable
            } else {
                UiState::Active
            }
        }
        _ => UiState::NoChain,
    }
}
