//! The rendering surface consumed by the engine core.

use crate::cards::CardId;
use crate::player::PlayerId;
use crate::table::SlotId;

/// Sink for everything the engine wants shown to the user.
///
/// Implementations must not block: the core calls these from inside its
/// coordination critical sections and expects them to return promptly.
/// Rendering happens elsewhere; `dispose` is owned by whoever created the
/// sink, the core never calls it.
pub trait DisplaySink: Send + Sync {
    fn place_card(&self, card: CardId, slot: SlotId);
    fn remove_card(&self, slot: SlotId);
    fn place_token(&self, player: PlayerId, slot: SlotId);
    fn remove_token(&self, player: PlayerId, slot: SlotId);
    fn remove_all_tokens(&self);
    fn remove_slot_tokens(&self, slot: SlotId);
    fn set_score(&self, player: PlayerId, score: u32);
    fn set_freeze(&self, player: PlayerId, millis_remaining: u64);
    fn set_countdown(&self, millis: u64, warn: bool);
    fn set_elapsed(&self, millis: u64);
    fn announce_winners(&self, winners: &[PlayerId]);
    fn dispose(&self) {}
}

/// Sink that discards every update; lets the engine run headless.
pub struct NoopDisplay;

impl DisplaySink for NoopDisplay {
    fn place_card(&self, _card: CardId, _slot: SlotId) {}
    fn remove_card(&self, _slot: SlotId) {}
    fn place_token(&self, _player: PlayerId, _slot: SlotId) {}
    fn remove_token(&self, _player: PlayerId, _slot: SlotId) {}
    fn remove_all_tokens(&self) {}
    fn remove_slot_tokens(&self, _slot: SlotId) {}
    fn set_score(&self, _player: PlayerId, _score: u32) {}
    fn set_freeze(&self, _player: PlayerId, _millis_remaining: u64) {}
    fn set_countdown(&self, _millis: u64, _warn: bool) {}
    fn set_elapsed(&self, _millis: u64) {}
    fn announce_winners(&self, _winners: &[PlayerId]) {}
}
