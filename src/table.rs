//! The shared card grid.
//!
//! All grid state lives behind a single fair mutex: slot/card mappings,
//! the used-slot view and every participant's tokens. Callers lock once
//! and compose whole atomic blocks out of the operations below; nothing
//! here takes the lock internally. FIFO handoff on the mutex keeps the
//! dealer and the participants from starving each other.

use std::{sync::Arc, thread, time::Duration};

use parking_lot::FairMutex;
use rand::{seq::SliceRandom, thread_rng};

use crate::cards::{self, CardId};
use crate::config::GameConfig;
use crate::display::DisplaySink;
use crate::player::PlayerId;

/// Fixed position on the grid.
pub type SlotId = usize;

/// The table handle shared between the dealer and the participants.
pub type SharedTable = Arc<FairMutex<Table>>;

pub struct Table {
    /// Card currently occupying each slot.
    slot_to_card: Vec<Option<CardId>>,

    /// Inverse mapping, slot currently holding each card.
    card_to_slot: Vec<Option<SlotId>>,

    /// Occupied slots, kept in placement order.
    used_slots: Vec<SlotId>,

    /// Tokens currently placed by each participant.
    tokens: Vec<Vec<SlotId>>,

    set_size: usize,
    table_delay: Duration,
    display: Arc<dyn DisplaySink>,
}

impl Table {
    pub fn new(config: &GameConfig, display: Arc<dyn DisplaySink>) -> Self {
        Self {
            slot_to_card: vec![None; config.table_size],
            card_to_slot: vec![None; config.deck_size],
            used_slots: Vec::with_capacity(config.table_size),
            tokens: vec![Vec::with_capacity(config.set_size); config.players],
            set_size: config.set_size,
            table_delay: Duration::from_millis(config.table_delay_millis),
            display,
        }
    }

    pub fn into_shared(self) -> SharedTable {
        Arc::new(FairMutex::new(self))
    }

    /// Place a card in an empty slot.
    ///
    /// Panics if the slot is occupied or the card is already on the
    /// table: both indicate a coordination bug, not recoverable state.
    pub fn place_card(&mut self, card: CardId, slot: SlotId) {
        thread::sleep(self.table_delay);
        assert!(
            self.slot_to_card[slot].is_none(),
            "slot {slot} already holds a card"
        );
        assert!(
            self.card_to_slot[card].is_none(),
            "card {card} is already on the table"
        );
        self.slot_to_card[slot] = Some(card);
        self.card_to_slot[card] = Some(slot);
        self.used_slots.push(slot);
        self.display.place_card(card, slot);
    }

    /// Remove the card in a slot, stripping every participant's token on
    /// it first. A no-op on empty slots.
    pub fn remove_card(&mut self, slot: SlotId) {
        thread::sleep(self.table_delay);
        for tokens in &mut self.tokens {
            tokens.retain(|&s| s != slot);
        }
        if let Some(card) = self.slot_to_card[slot].take() {
            self.card_to_slot[card] = None;
            self.used_slots.retain(|&s| s != slot);
            self.display.remove_slot_tokens(slot);
            self.display.remove_card(slot);
        }
    }

    /// Toggle a participant's token on a slot: placed if absent, removed
    /// if present. Returns true iff the participant now has a full set of
    /// tokens, the only way a claimable state is reached.
    pub fn place_token(&mut self, player: PlayerId, slot: SlotId) -> bool {
        if self.tokens[player].contains(&slot) {
            self.remove_token(player, slot);
        } else {
            self.tokens[player].push(slot);
            self.display.place_token(player, slot);
        }
        self.tokens[player].len() == self.set_size
    }

    /// Remove a participant's token from a slot. Returns whether a token
    /// was actually there.
    pub fn remove_token(&mut self, player: PlayerId, slot: SlotId) -> bool {
        if let Some(at) = self.tokens[player].iter().position(|&s| s == slot) {
            self.tokens[player].remove(at);
            self.display.remove_token(player, slot);
            true
        } else {
            false
        }
    }

    /// Clear one participant's tokens, notifying the display per token.
    pub fn remove_player_tokens(&mut self, player: PlayerId) {
        for &slot in &self.tokens[player] {
            self.display.remove_token(player, slot);
        }
        self.tokens[player].clear();
    }

    /// Clear every participant's tokens.
    pub fn reset_all_tokens(&mut self) {
        for tokens in &mut self.tokens {
            tokens.clear();
        }
        self.display.remove_all_tokens();
    }

    pub fn card(&self, slot: SlotId) -> Option<CardId> {
        self.slot_to_card[slot]
    }

    pub fn slot_of(&self, card: CardId) -> Option<SlotId> {
        self.card_to_slot[card]
    }

    /// Snapshot of the slots a participant currently marks.
    pub fn player_tokens(&self, player: PlayerId) -> Vec<SlotId> {
        self.tokens[player].clone()
    }

    /// Snapshot of the occupied slots.
    pub fn used_slots(&self) -> Vec<SlotId> {
        self.used_slots.clone()
    }

    pub fn count_cards(&self) -> usize {
        self.used_slots.len()
    }

    /// The cards currently on the grid.
    pub fn cards_on_table(&self) -> Vec<CardId> {
        self.slot_to_card.iter().flatten().copied().collect()
    }

    /// Whether at least one legal set is on the grid.
    pub fn has_sets(&self) -> bool {
        !cards::find_sets(&self.cards_on_table(), 1).is_empty()
    }

    /// The slots of one randomly chosen legal set on the grid, sorted, or
    /// empty if none exists.
    pub fn ai_hint(&self) -> Vec<SlotId> {
        let sets = cards::find_sets(&self.cards_on_table(), usize::MAX);
        match sets.choose(&mut thread_rng()) {
            Some(set) => {
                let mut slots: Vec<SlotId> =
                    set.iter().filter_map(|&card| self.card_to_slot[card]).collect();
                slots.sort_unstable();
                slots
            }
            None => Vec::new(),
        }
    }

    /// Log every legal set currently on the grid.
    pub fn log_hints(&self) {
        for set in cards::find_sets(&self.cards_on_table(), usize::MAX) {
            let mut slots: Vec<SlotId> =
                set.iter().filter_map(|&card| self.card_to_slot[card]).collect();
            slots.sort_unstable();
            let features: Vec<[u8; cards::FEATURE_COUNT]> =
                set.iter().map(|&card| cards::features(card)).collect();
            log::info!("Hint: set at slots {slots:?} with features {features:?}");
        }
    }
}
