//! Synthetic key-press worker for computer-driven participants.
//!
//! Runs on its own thread and feeds presses through the same admission
//! path as external key events. Two modes: the smart mode plays from the
//! table's hints, the random mode mashes occupied slots.

use std::sync::Arc;

use rand::{seq::SliceRandom, thread_rng};

use super::PlayerShared;
use crate::table::{SharedTable, SlotId, Table};

pub(crate) fn run(shared: Arc<PlayerShared>, table: SharedTable, hints: bool) {
    shared.register_ai_thread();
    log::info!("Synthetic worker {} starting", shared.id());

    while !shared.is_terminating() {
        if shared.is_frozen() {
            shared.tick_wait();
            continue;
        }
        {
            let table = table.lock();
            let presses = if hints {
                smart_presses(&shared, &table)
            } else {
                random_press(&table)
            };
            for slot in presses {
                shared.on_key(&table, slot);
            }
        }
        // Pace the presses so a watching human can follow them.
        shared.tick_wait();
    }

    log::info!("Synthetic worker {} terminated", shared.id());
}

/// Press a random legal set, or, when a full set of tokens is already
/// laid, re-press each of them: they must have been a rejected claim and
/// re-pressing toggles them off.
fn smart_presses(shared: &PlayerShared, table: &Table) -> Vec<SlotId> {
    let current = table.player_tokens(shared.id());
    if current.len() == shared.set_size() {
        current
    } else {
        table.ai_hint()
    }
}

fn random_press(table: &Table) -> Vec<SlotId> {
    let used = table.used_slots();
    used.choose(&mut thread_rng()).into_iter().copied().collect()
}
