//! The round coordinator: deck management, claim adjudication, the timer
//! state machine, reshuffles and the termination cascade.

use std::{
    collections::VecDeque,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use rand::{seq::SliceRandom, thread_rng};

use crate::cards::{self, Deck};
use crate::config::{GameConfig, TimerMode};
use crate::display::DisplaySink;
use crate::engine::ShutdownSignal;
use crate::player::{self, ClaimQueue, PlayerId, PlayerShared, TICK};
use crate::table::{SharedTable, SlotId, Table};

/// A participant as the dealer owns it: shared state, the thread handle
/// and the score. Nothing else in the system holds a participant.
struct PlayerHandle {
    shared: Arc<PlayerShared>,
    thread: Option<JoinHandle<()>>,
    score: u32,
}

pub struct Dealer {
    config: GameConfig,
    table: SharedTable,
    players: Vec<PlayerHandle>,
    claims: ClaimQueue,
    deck: Deck,
    removals: VecDeque<SlotId>,
    round_start: Instant,
    shutdown: Arc<ShutdownSignal>,
    display: Arc<dyn DisplaySink>,
}

impl Dealer {
    pub fn new(
        config: GameConfig,
        table: SharedTable,
        players: Vec<Arc<PlayerShared>>,
        claims: ClaimQueue,
        shutdown: Arc<ShutdownSignal>,
        display: Arc<dyn DisplaySink>,
    ) -> Self {
        let deck = Deck::new(config.deck_size);
        let players = players
            .into_iter()
            .map(|shared| PlayerHandle {
                shared,
                thread: None,
                score: 0,
            })
            .collect();
        Self {
            config,
            table,
            players,
            claims,
            deck,
            removals: VecDeque::new(),
            round_start: Instant::now(),
            shutdown,
            display,
        }
    }

    /// Main loop of the dealer thread. Runs rounds until the game ends,
    /// then announces the winners and shuts the participants down.
    pub fn run(&mut self) {
        log::info!("Dealer starting");
        self.deck.shuffle();
        self.spawn_players();

        while !self.should_finish() {
            {
                let table = Arc::clone(&self.table);
                let mut table = table.lock();
                self.place_cards(&mut table);
                if self.config.hints {
                    table.log_hints();
                }
            }
            self.reset_round_timer();
            self.wake_all();
            self.timer_loop();
            if !self.should_finish() {
                self.reshuffle();
            }
        }

        self.announce_winners();
        self.shutdown_players();
        log::info!("Dealer terminated");
    }

    fn spawn_players(&mut self) {
        for handle in &mut self.players {
            let shared = Arc::clone(&handle.shared);
            let table = Arc::clone(&self.table);
            let claims = Arc::clone(&self.claims);
            let hints = self.config.hints;
            let thread = thread::Builder::new()
                .name(format!("player-{}", shared.id()))
                .spawn(move || player::run(shared, table, claims, hints))
                .expect("failed to spawn a player thread");
            handle.thread = Some(thread);
        }
    }

    /// Whether the game is over: terminated externally, or no legal set
    /// is left in the deck or on the table.
    fn should_finish(&self) -> bool {
        if self.shutdown.is_set() {
            return true;
        }
        if self.deck.has_sets() {
            return false;
        }
        let table = Arc::clone(&self.table);
        let on_table = table.lock().has_sets();
        !on_table
    }

    /// One round: tick, adjudicate queued claims in FIFO order, keep a
    /// set available in the self-refreshing modes, publish the timer.
    /// Exits on round expiry or game end.
    fn timer_loop(&mut self) {
        while !self.should_finish() && !self.round_expired() {
            self.shutdown.wait_timeout(TICK);
            {
                let table = Arc::clone(&self.table);
                let mut table = table.lock();
                // The queue guard must drop before adjudication, which
                // re-locks it while dequeuing colliding claimants.
                loop {
                    let claimant = self.claims.lock().pop_front();
                    let Some(claimant) = claimant else { break };
                    self.adjudicate(&mut table, claimant);
                    self.publish_timer();
                }
                while self.auto_refresh()
                    && !table.has_sets()
                    && !self.shutdown.is_set()
                    && self.deck.has_sets()
                {
                    self.refresh_table(&mut table);
                }
            }
            self.publish_timer();
        }
    }

    fn round_expired(&self) -> bool {
        self.config.timer_mode() == TimerMode::Countdown
            && self.elapsed_millis() >= self.config.countdown_millis()
    }

    /// The self-refreshing modes replace a set-less table instead of
    /// waiting for a countdown.
    fn auto_refresh(&self) -> bool {
        self.config.timer_mode() != TimerMode::Countdown
    }

    fn elapsed_millis(&self) -> u64 {
        self.round_start.elapsed().as_millis() as u64
    }

    fn reset_round_timer(&mut self) {
        self.round_start = Instant::now();
        self.publish_timer();
    }

    fn publish_timer(&self) {
        match self.config.timer_mode() {
            TimerMode::Hidden => {}
            TimerMode::Elapsed => self.display.set_elapsed(self.elapsed_millis()),
            TimerMode::Countdown => {
                let remaining = self.config.countdown_millis().saturating_sub(self.elapsed_millis());
                let warn = remaining <= self.config.turn_timeout_warning_millis;
                self.display.set_countdown(remaining, warn);
            }
        }
    }

    /// Adjudicate one claim. Returns whether it was awarded.
    ///
    /// A claim whose tokens were thinned out while it sat in the queue is
    /// dismissed without penalty; one whose slots were emptied under it
    /// is treated as an invalid set.
    fn adjudicate(&mut self, table: &mut Table, claimant: PlayerId) -> bool {
        let tokens = table.player_tokens(claimant);
        if tokens.len() < self.config.set_size {
            self.wake(claimant);
            return false;
        }

        let mut claimed = Vec::with_capacity(tokens.len());
        for &slot in &tokens {
            match table.card(slot) {
                Some(card) => claimed.push(card),
                None => {
                    self.wake(claimant);
                    self.penalty(claimant);
                    return false;
                }
            }
        }

        if cards::is_set(&claimed) {
            log::debug!("Player {claimant} claimed a valid set at slots {tokens:?}");
            self.removals.extend(tokens.iter().copied());
            table.remove_player_tokens(claimant);
            self.drain_removals(table);
            self.place_cards(table);
            self.wake(claimant);
            self.point(claimant);
            if self.config.hints {
                table.log_hints();
            }
            true
        } else {
            log::debug!("Player {claimant} claimed an invalid set at slots {tokens:?}");
            self.wake(claimant);
            self.penalty(claimant);
            false
        }
    }

    /// Remove every queued slot's card. Other participants holding a
    /// token on such a slot lose the token with the card; if they are
    /// waiting in the claim queue they are dequeued and woken so they can
    /// re-evaluate, without penalty.
    fn drain_removals(&mut self, table: &mut Table) {
        while let Some(slot) = self.removals.pop_front() {
            for handle in &self.players {
                handle.shared.discard_pending(slot);
                if table.player_tokens(handle.shared.id()).contains(&slot) {
                    let mut queue = self.claims.lock();
                    if let Some(at) = queue.iter().position(|&id| id == handle.shared.id()) {
                        queue.remove(at);
                        drop(queue);
                        handle.shared.wake();
                    }
                }
            }
            table.remove_card(slot);
        }
    }

    /// Fill the empty slots, in random order, from the top of the deck.
    /// Slots stay empty once the deck runs out.
    fn place_cards(&mut self, table: &mut Table) {
        let mut slots: Vec<SlotId> = (0..self.config.table_size).collect();
        slots.shuffle(&mut thread_rng());
        for slot in slots {
            if self.deck.is_empty() {
                break;
            }
            if table.card(slot).is_none() {
                if let Some(card) = self.deck.draw() {
                    table.place_card(card, slot);
                }
            }
        }
    }

    /// Return every card on the grid to the deck, in random order, and
    /// shuffle.
    fn remove_all_cards(&mut self, table: &mut Table) {
        let mut slots = table.used_slots();
        slots.shuffle(&mut thread_rng());
        for slot in slots {
            if let Some(card) = table.card(slot) {
                table.remove_card(slot);
                self.deck.return_card(card);
            }
        }
        self.deck.shuffle();
    }

    fn refresh_table(&mut self, table: &mut Table) {
        log::debug!("No set on the table, refreshing");
        self.remove_all_cards(table);
        self.place_cards(table);
    }

    /// Replace the whole table: suspend everyone, clear tokens, return
    /// the cards to the deck, shuffle, refill, wake everyone. The
    /// self-refreshing modes repeat until the fresh table holds a set.
    fn reshuffle(&mut self) {
        log::debug!("Reshuffling the table");
        self.reset_round_timer();
        let table = Arc::clone(&self.table);
        let mut table = table.lock();
        self.suspend_all();
        loop {
            table.reset_all_tokens();
            self.remove_all_cards(&mut table);
            self.place_cards(&mut table);
            if !self.auto_refresh() || table.has_sets() {
                break;
            }
        }
        self.wake_all();
    }

    fn suspend_all(&self) {
        for handle in &self.players {
            handle.shared.suspend();
        }
    }

    fn wake_all(&self) {
        for handle in &self.players {
            handle.shared.wake();
        }
    }

    fn wake(&self, player: PlayerId) {
        self.players[player].shared.wake();
    }

    /// Award a point: bump and publish the score, then freeze the
    /// participant for the configured reward period.
    fn point(&mut self, player: PlayerId) {
        let handle = &mut self.players[player];
        handle.score += 1;
        self.display.set_score(player, handle.score);
        handle.shared.freeze_for(self.config.point_freeze_millis);
        self.display.set_freeze(player, self.config.point_freeze_millis);
        log::debug!("Player {player} scored, now at {}", handle.score);
    }

    /// Penalize an invalid claim with the configured freeze. Tokens are
    /// left in place; the participant re-presses to clear them.
    fn penalty(&self, player: PlayerId) {
        self.players[player]
            .shared
            .freeze_for(self.config.penalty_freeze_millis);
        self.display
            .set_freeze(player, self.config.penalty_freeze_millis);
    }

    /// Publish the ids holding the top score.
    fn announce_winners(&self) -> Vec<PlayerId> {
        let best = self.players.iter().map(|handle| handle.score).max().unwrap_or(0);
        let winners: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|handle| handle.score == best)
            .map(|handle| handle.shared.id())
            .collect();
        log::info!("Game over, winners: {winners:?}");
        self.display.announce_winners(&winners);
        winners
    }

    /// Cooperative termination: suspend everyone under the table mutex,
    /// then terminate and join the participants, highest id first.
    fn shutdown_players(&mut self) {
        self.shutdown.set();
        {
            let table = Arc::clone(&self.table);
            let _table = table.lock();
            self.suspend_all();
        }
        // Joining happens outside the table mutex: a participant blocked
        // on it could never observe its terminate flag otherwise.
        for handle in self.players.iter_mut().rev() {
            handle.shared.request_terminate();
            if let Some(thread) = handle.thread.take() {
                if thread.join().is_err() {
                    log::warn!("Player {} thread panicked", handle.shared.id());
                }
            }
        }
    }
}
