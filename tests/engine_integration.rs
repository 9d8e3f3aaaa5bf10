//! Integration scenarios driving the full engine: real dealer and player
//! threads observed through a recording display sink.

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use set_engine::{cards, CardId, DisplaySink, GameConfig, GameEngine, PlayerId, SlotId};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Event {
    PlaceCard(CardId, SlotId),
    RemoveCard(SlotId),
    PlaceToken(PlayerId, SlotId),
    RemoveToken(PlayerId, SlotId),
    RemoveAllTokens,
    RemoveSlotTokens(SlotId),
    Score(PlayerId, u32),
    Freeze(PlayerId, u64),
    Countdown(u64, bool),
    Elapsed(u64),
    Winners(Vec<PlayerId>),
}

#[derive(Default)]
struct RecordingDisplay {
    events: Mutex<Vec<Event>>,
}

impl RecordingDisplay {
    fn snapshot(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl DisplaySink for RecordingDisplay {
    fn place_card(&self, card: CardId, slot: SlotId) {
        self.push(Event::PlaceCard(card, slot));
    }
    fn remove_card(&self, slot: SlotId) {
        self.push(Event::RemoveCard(slot));
    }
    fn place_token(&self, player: PlayerId, slot: SlotId) {
        self.push(Event::PlaceToken(player, slot));
    }
    fn remove_token(&self, player: PlayerId, slot: SlotId) {
        self.push(Event::RemoveToken(player, slot));
    }
    fn remove_all_tokens(&self) {
        self.push(Event::RemoveAllTokens);
    }
    fn remove_slot_tokens(&self, slot: SlotId) {
        self.push(Event::RemoveSlotTokens(slot));
    }
    fn set_score(&self, player: PlayerId, score: u32) {
        self.push(Event::Score(player, score));
    }
    fn set_freeze(&self, player: PlayerId, millis_remaining: u64) {
        self.push(Event::Freeze(player, millis_remaining));
    }
    fn set_countdown(&self, millis: u64, warn: bool) {
        self.push(Event::Countdown(millis, warn));
    }
    fn set_elapsed(&self, millis: u64) {
        self.push(Event::Elapsed(millis));
    }
    fn announce_winners(&self, winners: &[PlayerId]) {
        self.push(Event::Winners(winners.to_vec()));
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn wait_for<F>(display: &RecordingDisplay, timeout: Duration, pred: F) -> bool
where
    F: Fn(&[Event]) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if pred(&display.snapshot()) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Replay the card events into the current slot -> card picture.
fn grid(events: &[Event], table_size: usize) -> Vec<Option<CardId>> {
    let mut slots = vec![None; table_size];
    for event in events {
        match *event {
            Event::PlaceCard(card, slot) => slots[slot] = Some(card),
            Event::RemoveCard(slot) => slots[slot] = None,
            _ => {}
        }
    }
    slots
}

fn occupied(grid: &[Option<CardId>]) -> usize {
    grid.iter().flatten().count()
}

fn has_set(grid: &[Option<CardId>]) -> bool {
    let cards: Vec<CardId> = grid.iter().flatten().copied().collect();
    !cards::find_sets(&cards, 1).is_empty()
}

/// The slots of one legal set currently on the grid.
fn set_slots(grid: &[Option<CardId>]) -> Option<Vec<SlotId>> {
    let cards: Vec<CardId> = grid.iter().flatten().copied().collect();
    let set = cards::find_sets(&cards, 1).into_iter().next()?;
    let slots = set
        .iter()
        .map(|card| grid.iter().position(|c| *c == Some(*card)).unwrap())
        .collect();
    Some(slots)
}

/// The slots of some triple that is not a legal set.
fn non_set_slots(grid: &[Option<CardId>]) -> Option<Vec<SlotId>> {
    let slots: Vec<SlotId> = (0..grid.len()).filter(|&s| grid[s].is_some()).collect();
    for i in 0..slots.len() {
        for j in i + 1..slots.len() {
            for k in j + 1..slots.len() {
                let triple = [slots[i], slots[j], slots[k]];
                let cards: Vec<CardId> = triple.iter().map(|&s| grid[s].unwrap()).collect();
                if !cards::is_set(&cards) {
                    return Some(triple.to_vec());
                }
            }
        }
    }
    None
}

fn base_config() -> GameConfig {
    GameConfig {
        players: 2,
        human_players: 2,
        deck_size: 81,
        table_size: 12,
        set_size: 3,
        // Elapsed mode: the dealer keeps a legal set on the table.
        turn_timeout_millis: 0,
        turn_timeout_warning_millis: 5_000,
        point_freeze_millis: 400,
        penalty_freeze_millis: 1_200,
        table_delay_millis: 0,
        hints: false,
    }
}

/// Wait until the table is fully dealt and shows a legal set. In elapsed
/// mode the state is then stable until someone claims.
fn wait_for_stable_table(display: &RecordingDisplay, table_size: usize) -> Vec<Option<CardId>> {
    assert!(
        wait_for(display, Duration::from_secs(5), |events| {
            let grid = grid(events, table_size);
            occupied(&grid) == table_size && has_set(&grid)
        }),
        "table never settled with a legal set"
    );
    grid(&display.snapshot(), table_size)
}

#[test]
fn a_valid_set_scores_and_is_replaced() {
    init_logging();
    let display = Arc::new(RecordingDisplay::default());
    let mut engine = GameEngine::new(base_config(), display.clone()).unwrap();
    engine.start().unwrap();

    let table = wait_for_stable_table(&display, 12);
    let slots = set_slots(&table).unwrap();
    for &slot in &slots {
        engine.key_pressed(0, slot);
    }

    assert!(
        wait_for(&display, Duration::from_secs(5), |events| {
            events.contains(&Event::Score(0, 1))
        }),
        "the claim was never awarded"
    );

    let events = display.snapshot();
    for &slot in &slots {
        assert!(events.contains(&Event::PlaceToken(0, slot)));
        assert!(events.contains(&Event::RemoveCard(slot)));
    }
    // The reward freeze was published.
    assert!(events.contains(&Event::Freeze(0, 400)));
    // Elapsed mode publishes the running timer.
    assert!(events.iter().any(|e| matches!(e, Event::Elapsed(_))));

    // The claimed slots are refilled from the deck.
    assert!(wait_for(&display, Duration::from_secs(5), |events| {
        occupied(&grid(events, 12)) == 12
    }));

    engine.terminate();
    engine.join();
}

#[test]
fn an_invalid_set_freezes_without_scoring() {
    init_logging();
    let display = Arc::new(RecordingDisplay::default());
    let mut engine = GameEngine::new(base_config(), display.clone()).unwrap();
    engine.start().unwrap();

    let table = wait_for_stable_table(&display, 12);
    let slots = non_set_slots(&table).unwrap();
    for &slot in &slots {
        engine.key_pressed(1, slot);
    }

    assert!(
        wait_for(&display, Duration::from_secs(5), |events| {
            events.contains(&Event::Freeze(1, 1_200))
        }),
        "the penalty freeze was never published"
    );

    let events = display.snapshot();
    assert!(!events.iter().any(|e| matches!(e, Event::Score(1, _))));
    // The tokens stay on the table; the player must re-press to clear.
    for &slot in &slots {
        assert!(events.contains(&Event::PlaceToken(1, slot)));
        assert!(!events.contains(&Event::RemoveToken(1, slot)));
    }

    engine.terminate();
    engine.join();
}

#[test]
fn countdown_expiry_reshuffles_the_table() {
    init_logging();
    let config = GameConfig {
        players: 1,
        human_players: 1,
        turn_timeout_millis: 500,
        turn_timeout_warning_millis: 200,
        ..base_config()
    };
    let display = Arc::new(RecordingDisplay::default());
    let mut engine = GameEngine::new(config, display.clone()).unwrap();
    engine.start().unwrap();

    // 12 cards are dealt, returned at the deadline, and 12 dealt again.
    assert!(
        wait_for(&display, Duration::from_secs(5), |events| {
            let placed = events
                .iter()
                .filter(|e| matches!(e, Event::PlaceCard(..)))
                .count();
            placed >= 24 && events.contains(&Event::RemoveAllTokens)
        }),
        "the table was never reshuffled"
    );

    let events = display.snapshot();
    let warn_at = events
        .iter()
        .position(|e| matches!(e, Event::Countdown(_, true)))
        .expect("no warning was published");
    assert!(matches!(events[warn_at], Event::Countdown(millis, true) if millis <= 200));
    // The countdown starts unwarned.
    assert!(events[..warn_at]
        .iter()
        .any(|e| matches!(e, Event::Countdown(millis, false) if *millis > 200)));
    // The reshuffle resets the countdown.
    assert!(
        events[warn_at..]
            .iter()
            .any(|e| matches!(e, Event::Countdown(millis, _) if *millis > 300)),
        "the countdown was never reset"
    );

    engine.terminate();
    engine.join();
}

#[test]
fn termination_cascade_announces_the_winners() {
    init_logging();
    let config = GameConfig {
        turn_timeout_millis: 60_000,
        ..base_config()
    };
    let display = Arc::new(RecordingDisplay::default());
    let mut engine = GameEngine::new(config, display.clone()).unwrap();
    engine.start().unwrap();

    assert!(wait_for(&display, Duration::from_secs(5), |events| {
        events.iter().any(|e| matches!(e, Event::PlaceCard(..)))
    }));

    engine.terminate();
    engine.join();

    // Scoreless game: everyone shares the top score.
    let events = display.snapshot();
    assert!(events.contains(&Event::Winners(vec![0, 1])));
}

#[test]
fn playing_out_the_deck_ends_the_game() {
    init_logging();
    let config = GameConfig {
        players: 1,
        human_players: 1,
        deck_size: 3,
        table_size: 3,
        point_freeze_millis: 50,
        ..base_config()
    };
    let display = Arc::new(RecordingDisplay::default());
    let mut engine = GameEngine::new(config, display.clone()).unwrap();
    engine.start().unwrap();

    // The whole deck is on the table, and cards 0, 1, 2 are a set.
    assert!(wait_for(&display, Duration::from_secs(5), |events| {
        occupied(&grid(events, 3)) == 3
    }));
    for slot in 0..3 {
        engine.key_pressed(0, slot);
    }

    // The award empties both deck and table, which ends the game.
    assert!(
        wait_for(&display, Duration::from_secs(5), |events| {
            events.contains(&Event::Winners(vec![0]))
        }),
        "the game never finished"
    );
    assert!(display.snapshot().contains(&Event::Score(0, 1)));

    engine.join();
}

#[test]
fn hint_driven_synthetic_player_scores_on_its_own() {
    init_logging();
    let config = GameConfig {
        players: 1,
        human_players: 0,
        table_size: 3,
        point_freeze_millis: 50,
        penalty_freeze_millis: 50,
        hints: true,
        ..base_config()
    };
    let display = Arc::new(RecordingDisplay::default());
    let mut engine = GameEngine::new(config, display.clone()).unwrap();
    engine.start().unwrap();

    assert!(
        wait_for(&display, Duration::from_secs(10), |events| {
            events.iter().any(|e| matches!(e, Event::Score(0, _)))
        }),
        "the synthetic player never scored"
    );

    engine.terminate();
    engine.join();

    // Scores only ever go up, one point at a time.
    let scores: Vec<u32> = display
        .snapshot()
        .iter()
        .filter_map(|e| match e {
            Event::Score(0, score) => Some(*score),
            _ => None,
        })
        .collect();
    for (i, score) in scores.iter().enumerate() {
        assert_eq!(*score, i as u32 + 1);
    }
}

#[test]
fn random_synthetic_player_places_tokens() {
    init_logging();
    let config = GameConfig {
        players: 1,
        human_players: 0,
        hints: false,
        ..base_config()
    };
    let display = Arc::new(RecordingDisplay::default());
    let mut engine = GameEngine::new(config, display.clone()).unwrap();
    engine.start().unwrap();

    assert!(
        wait_for(&display, Duration::from_secs(5), |events| {
            events.iter().any(|e| matches!(e, Event::PlaceToken(0, _)))
        }),
        "the synthetic player never pressed a key"
    );

    engine.terminate();
    engine.join();
}

