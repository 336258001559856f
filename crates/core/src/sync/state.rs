//! Process-wide sync state with compare-and-set transitions.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::progress::SyncState;

const STATE_BITS: u32 = 8;
const STATE_MASK: u64 = (1 << STATE_BITS) - 1;

fn encode(state: SyncState) -> u64 {
    match state {
        SyncState::Idle => 0,
        SyncState::Scraping => 1,
        SyncState::Processing => 2,
        SyncState::Completed => 3,
        SyncState::Error => 4,
    }
}

fn decode(bits: u64) -> SyncState {
    match bits & STATE_MASK {
        1 => SyncState::Scraping,
        2 => SyncState::Processing,
        3 => SyncState::Completed,
        4 => SyncState::Error,
        _ => SyncState::Idle,
    }
}

fn pack(generation: u64, state: SyncState) -> u64 {
    (generation << STATE_BITS) | encode(state)
}

fn unpack(word: u64) -> (u64, SyncState) {
    (word >> STATE_BITS, decode(word))
}

/// Sync state tagged with the session generation, in one atomic word.
///
/// Every transition is a compare-and-set against the expected generation,
/// so a stale actor (a reset timer from an older session, say) can never
/// clobber a newer session.
#[derive(Debug, Default)]
pub struct StateCell(AtomicU64);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU64::new(pack(0, SyncState::Idle)))
    }

    /// Current `(generation, state)`.
    pub fn load(&self) -> (u64, SyncState) {
        unpack(self.0.load(Ordering::Acquire))
    }

    /// Enter SCRAPING with a new generation.
    ///
    /// Allowed from IDLE and from a terminal state that has not been reset
    /// yet. Fails with the current `(generation, state)` while a session is
    /// active.
    pub fn try_begin(&self) -> Result<u64, (u64, SyncState)> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let (generation, state) = unpack(current);
            if state.is_active() {
                return Err((generation, state));
            }
            let next = generation + 1;
            match self.0.compare_exchange_weak(
                current,
                pack(next, SyncState::Scraping),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Move session `generation` from `from` to `to`.
    pub fn transition(&self, generation: u64, from: SyncState, to: SyncState) -> bool {
        self.0
            .compare_exchange(
                pack(generation, from),
                pack(generation, to),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move session `generation` from whichever active state it is in to
    /// the terminal state `to`.
    pub fn finish(&self, generation: u64, to: SyncState) -> bool {
        self.transition(generation, SyncState::Scraping, to)
            || self.transition(generation, SyncState::Processing, to)
    }

    /// Reset a finished session to IDLE, unless a newer session started.
    pub fn reset(&self, generation: u64) -> bool {
        self.transition(generation, SyncState::Completed, SyncState::Idle)
            || self.transition(generation, SyncState::Error, SyncState::Idle)
    }
}
