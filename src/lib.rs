//! # Set Engine
//!
//! The concurrent core of a multi-player game of Set: one dealer thread
//! coordinates N participant threads over a shared card grid guarded by
//! a fair mutex. Participants may be human (fed external key events) or
//! synthetic (driven by an internal key-press worker).
//!
//! ## Architecture
//!
//! Key events flow into a participant's bounded pending queue; its
//! placement worker drains them into token toggles under the table
//! mutex. Laying a full set of tokens enqueues a claim and suspends the
//! participant until the dealer, on its 10 ms tick, adjudicates the
//! claim: a valid set scores a point and replaces the claimed cards, an
//! invalid one earns a penalty freeze. A countdown deadline (or the
//! absence of any legal set, depending on the timer mode) drives full
//! reshuffles, and a cooperative cascade tears every thread down at game
//! end.
//!
//! Rendering, configuration loading and key binding live outside the
//! core; the engine only talks to a [`DisplaySink`] and is driven
//! through [`GameEngine`]'s key ingress.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use set_engine::{GameConfig, GameEngine, NoopDisplay};
//!
//! let config = GameConfig::default();
//! let mut engine = GameEngine::new(config, Arc::new(NoopDisplay)).unwrap();
//! engine.start().unwrap();
//! // Forward physical key events as (player, slot) pairs.
//! engine.key_pressed(0, 4);
//! engine.terminate();
//! engine.join();
//! ```

/// Deck management and the pure set-testing utility.
pub mod cards;

/// Static game configuration.
pub mod config;

/// The round coordinator.
pub mod dealer;

/// The rendering surface consumed by the core.
pub mod display;

/// Lifecycle facade and key ingress.
pub mod engine;

/// Participant threads and the freeze/wake discipline.
pub mod player;

/// The shared card grid.
pub mod table;

pub use cards::CardId;
pub use config::{ConfigError, GameConfig, TimerMode};
pub use display::{DisplaySink, NoopDisplay};
pub use engine::{EngineError, GameEngine};
pub use player::PlayerId;
pub use table::SlotId;
