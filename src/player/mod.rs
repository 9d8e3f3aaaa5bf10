//! Participant threads: key admission, token placement and the
//! freeze/wake discipline.
//!
//! A participant owns no reference to the dealer. It shares only the
//! table mutex, the claim queue and its own [`PlayerShared`] state; the
//! dealer reaches back through that shared state to freeze, wake and
//! terminate it.

pub mod synthetic;

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, ThreadId},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::config::GameConfig;
use crate::display::DisplaySink;
use crate::table::{SharedTable, SlotId, Table};

/// Identifier of a participant, `0..players`.
pub type PlayerId = usize;

/// The polling quantum of every tick-sleep loop.
pub const TICK: Duration = Duration::from_millis(10);

/// Queue of participant ids awaiting claim adjudication. The mutex
/// doubles as the dealer coordination lock: enqueueing an id and
/// self-freezing happen atomically under it, and the dealer drains it
/// under it.
pub type ClaimQueue = Arc<Mutex<VecDeque<PlayerId>>>;

/// Freeze discipline of a participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreezeState {
    Active,
    /// Self-clears once the deadline passes.
    FrozenUntil(Instant),
    /// Cleared only by the dealer.
    FrozenUntilWoken,
}

/// Participant state shared between its own threads, the dealer and the
/// key-ingress callers.
pub struct PlayerShared {
    id: PlayerId,
    human: bool,
    set_size: usize,
    freeze: Mutex<FreezeState>,
    changed: Condvar,
    pending: Mutex<VecDeque<SlotId>>,
    terminate: AtomicBool,
    ai_thread: Mutex<Option<ThreadId>>,
    display: Arc<dyn DisplaySink>,
}

impl PlayerShared {
    pub fn new(
        id: PlayerId,
        human: bool,
        config: &GameConfig,
        display: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            id,
            human,
            set_size: config.set_size,
            freeze: Mutex::new(FreezeState::Active),
            changed: Condvar::new(),
            pending: Mutex::new(VecDeque::with_capacity(config.set_size)),
            terminate: AtomicBool::new(false),
            ai_thread: Mutex::new(None),
            display,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn is_human(&self) -> bool {
        self.human
    }

    pub(crate) fn set_size(&self) -> usize {
        self.set_size
    }

    /// Admit a key press. The caller holds the table mutex.
    ///
    /// Presses are dropped while frozen, dropped when the pending queue
    /// is full, and, once a full set of tokens is laid, only re-presses
    /// of already-tokened slots are admitted.
    pub fn on_key(&self, table: &Table, slot: SlotId) {
        if !self.human && *self.ai_thread.lock() != Some(thread::current().id()) {
            return;
        }
        if self.is_frozen() {
            return;
        }
        let tokens = table.player_tokens(self.id);
        let mut pending = self.pending.lock();
        if pending.len() >= self.set_size {
            log::debug!("Player {}: pending queue full, dropping key {slot}", self.id);
            return;
        }
        if tokens.len() < self.set_size || tokens.contains(&slot) {
            pending.push_back(slot);
            drop(pending);
            self.changed.notify_all();
        }
    }

    pub fn is_frozen(&self) -> bool {
        match *self.freeze.lock() {
            FreezeState::Active => false,
            FreezeState::FrozenUntil(deadline) => Instant::now() < deadline,
            FreezeState::FrozenUntilWoken => true,
        }
    }

    pub(crate) fn freeze_state(&self) -> FreezeState {
        *self.freeze.lock()
    }

    /// Freeze until `millis` from now have passed; the participant clears
    /// this itself.
    pub(crate) fn freeze_for(&self, millis: u64) {
        *self.freeze.lock() = FreezeState::FrozenUntil(Instant::now() + Duration::from_millis(millis));
        self.changed.notify_all();
    }

    /// Suspend until the dealer wakes the participant.
    pub(crate) fn suspend(&self) {
        *self.freeze.lock() = FreezeState::FrozenUntilWoken;
        self.changed.notify_all();
    }

    /// Clear a dealer-imposed suspension. Deadline freezes are left to
    /// expire on their own.
    pub(crate) fn wake(&self) {
        let mut state = self.freeze.lock();
        if *state == FreezeState::FrozenUntilWoken {
            *state = FreezeState::Active;
            drop(state);
            self.changed.notify_all();
        }
    }

    /// Clear an expired deadline freeze. Returns whether it cleared.
    fn try_clear_expired(&self) -> bool {
        let mut state = self.freeze.lock();
        if let FreezeState::FrozenUntil(deadline) = *state {
            if Instant::now() >= deadline {
                *state = FreezeState::Active;
                return true;
            }
        }
        false
    }

    pub(crate) fn request_terminate(&self) {
        self.terminate.store(true, Ordering::SeqCst);
        self.changed.notify_all();
    }

    pub(crate) fn is_terminating(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    /// Purge a slot from the pending-key queue; called by the dealer when
    /// the card in it is removed.
    pub(crate) fn discard_pending(&self, slot: SlotId) {
        self.pending.lock().retain(|&s| s != slot);
    }

    fn pending_is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Sleep one tick, waking early on any state change.
    pub(crate) fn tick_wait(&self) {
        let mut state = self.freeze.lock();
        self.changed.wait_for(&mut state, TICK);
    }

    fn register_ai_thread(&self) {
        *self.ai_thread.lock() = Some(thread::current().id());
    }
}

/// Main loop of a participant thread.
///
/// While frozen the participant only ticks, publishing the remaining
/// freeze to the display; otherwise it drains its pending keys into the
/// table and submits a claim whenever a full set of tokens is laid.
pub fn run(shared: Arc<PlayerShared>, table: SharedTable, claims: ClaimQueue, hints: bool) {
    log::info!("Player {} starting", shared.id);
    let ai_worker = if shared.human {
        None
    } else {
        let worker_shared = Arc::clone(&shared);
        let worker_table = Arc::clone(&table);
        let worker = thread::Builder::new()
            .name(format!("synthetic-{}", shared.id))
            .spawn(move || synthetic::run(worker_shared, worker_table, hints))
            .expect("failed to spawn a synthetic-input worker");
        Some(worker)
    };

    while !shared.is_terminating() {
        match shared.freeze_state() {
            FreezeState::Active => {
                if !place_pending(&shared, &table, &claims) {
                    shared.tick_wait();
                }
            }
            FreezeState::FrozenUntil(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    if shared.try_clear_expired() {
                        shared.display.set_freeze(shared.id, 0);
                    }
                } else {
                    shared.display.set_freeze(shared.id, remaining.as_millis() as u64);
                    shared.tick_wait();
                }
            }
            FreezeState::FrozenUntilWoken => {
                shared.display.set_freeze(shared.id, 0);
                shared.tick_wait();
            }
        }
    }

    if let Some(worker) = ai_worker {
        if worker.join().is_err() {
            log::warn!("Synthetic worker {} panicked", shared.id);
        }
    }
    log::info!("Player {} terminated", shared.id);
}

/// Drain the pending-key queue into the table. Returns false when there
/// was nothing to do.
///
/// Stale keys whose cards have been removed are discarded, and a new
/// placement is skipped once a full set of tokens is already laid (a
/// re-press still toggles). If any placement completed a set, the claim
/// is submitted and the participant self-suspends, atomically with the
/// enqueue.
fn place_pending(shared: &PlayerShared, table: &SharedTable, claims: &ClaimQueue) -> bool {
    if shared.pending_is_empty() {
        return false;
    }
    let mut set_laid = false;
    {
        let mut table = table.lock();
        let drained: Vec<SlotId> = shared.pending.lock().drain(..).collect();
        for slot in drained {
            if table.card(slot).is_none() {
                continue;
            }
            let tokens = table.player_tokens(shared.id);
            if tokens.contains(&slot) || tokens.len() < shared.set_size {
                if table.place_token(shared.id, slot) {
                    set_laid = true;
                }
            }
        }
    }
    if set_laid {
        let mut queue = claims.lock();
        debug_assert!(!queue.contains(&shared.id));
        queue.push_back(shared.id);
        shared.suspend();
        log::debug!("Player {} submitted a claim", shared.id);
    }
    true
}
