//! The engine facade: wires the table, the participants and the dealer
//! together and exposes the lifecycle and key-ingress operations.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::config::{ConfigError, GameConfig};
use crate::dealer::Dealer;
use crate::display::DisplaySink;
use crate::player::{ClaimQueue, PlayerId, PlayerShared};
use crate::table::{SharedTable, SlotId, Table};

/// Errors surfaced by the engine facade.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("engine already started")]
    AlreadyStarted,
}

/// One-way game-over switch. Waiters are notified when it flips so no
/// sleep outlives a termination request.
pub struct ShutdownSignal {
    flag: AtomicBool,
    lock: Mutex<()>,
    signal: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
            lock: Mutex::new(()),
            signal: Condvar::new(),
        }
    }

    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _guard = self.lock.lock();
        self.signal.notify_all();
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep up to `timeout`, returning early if the signal fires.
    pub fn wait_timeout(&self, timeout: Duration) {
        if self.is_set() {
            return;
        }
        let mut guard = self.lock.lock();
        if !self.is_set() {
            self.signal.wait_for(&mut guard, timeout);
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A running game of Set: one dealer thread, one thread per participant
/// and one synthetic-input worker per computer-driven participant.
pub struct GameEngine {
    config: GameConfig,
    table: SharedTable,
    players: Vec<Arc<PlayerShared>>,
    claims: ClaimQueue,
    shutdown: Arc<ShutdownSignal>,
    display: Arc<dyn DisplaySink>,
    dealer_thread: Option<JoinHandle<()>>,
}

impl GameEngine {
    /// Build an engine from a validated configuration. Nothing runs
    /// until [`GameEngine::start`].
    pub fn new(config: GameConfig, display: Arc<dyn DisplaySink>) -> Result<Self, EngineError> {
        config.validate()?;
        let table = Table::new(&config, Arc::clone(&display)).into_shared();
        let players = (0..config.players)
            .map(|id| {
                Arc::new(PlayerShared::new(
                    id,
                    config.is_human(id),
                    &config,
                    Arc::clone(&display),
                ))
            })
            .collect();
        Ok(Self {
            config,
            table,
            players,
            claims: Arc::new(Mutex::new(VecDeque::new())),
            shutdown: Arc::new(ShutdownSignal::new()),
            display,
            dealer_thread: None,
        })
    }

    /// Spawn the dealer thread; the dealer spawns the participants.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.dealer_thread.is_some() {
            return Err(EngineError::AlreadyStarted);
        }
        let mut dealer = Dealer::new(
            self.config.clone(),
            Arc::clone(&self.table),
            self.players.clone(),
            Arc::clone(&self.claims),
            Arc::clone(&self.shutdown),
            Arc::clone(&self.display),
        );
        let thread = thread::Builder::new()
            .name("dealer".into())
            .spawn(move || dealer.run())
            .expect("failed to spawn the dealer thread");
        self.dealer_thread = Some(thread);
        Ok(())
    }

    /// Key ingress. Callable from any thread; out-of-range ids and slots
    /// are dropped, everything else goes through the participant's
    /// admission rules.
    pub fn key_pressed(&self, player: PlayerId, slot: SlotId) {
        let Some(shared) = self.players.get(player) else {
            log::warn!("Key press for unknown player {player}");
            return;
        };
        if slot >= self.config.table_size {
            log::warn!("Key press on unknown slot {slot}");
            return;
        }
        let table = self.table.lock();
        shared.on_key(&table, slot);
    }

    /// Request game over. Returns immediately; the dealer notices within
    /// a tick, announces the winners and runs the termination cascade.
    pub fn terminate(&self) {
        self.shutdown.set();
    }

    /// Block until the dealer thread has finished.
    pub fn join(&mut self) {
        if let Some(thread) = self.dealer_thread.take() {
            if thread.join().is_err() {
                log::warn!("Dealer thread panicked");
            }
        }
    }
}

impl Drop for GameEngine {
    fn drop(&mut self) {
        self.terminate();
        self.join();
    }
}
