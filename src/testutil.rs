//! Test doubles shared by the unit tests: a closure-driven oracle, a
//! display that records every call, and a bare `Shared` builder.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::board::Board;
use crate::config::GameConfig;
use crate::dealer::Monitor;
use crate::interfaces::{GameDisplay, SetOracle};
use crate::session::Shared;

/// Oracle whose answers come from closures supplied by the test.
pub(crate) struct FnOracle {
    valid: Box<dyn Fn(&[usize]) -> bool + Send + Sync>,
    any: Box<dyn Fn(&[usize]) -> bool + Send + Sync>,
}

impl FnOracle {
    pub(crate) fn new(
        valid: impl Fn(&[usize]) -> bool + Send + Sync + 'static,
        any: impl Fn(&[usize]) -> bool + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            valid: Box::new(valid),
            any: Box::new(any),
        })
    }

    /// Every submission is rejected; sets always remain in the pool.
    pub(crate) fn never() -> Arc<Self> {
        Self::new(|_| false, |_| true)
    }

    /// Every submission is confirmed; sets always remain in the pool.
    pub(crate) fn always() -> Arc<Self> {
        Self::new(|_| true, |_| true)
    }

    /// No set exists anywhere: the session ends at the first terminal check.
    pub(crate) fn exhausted() -> Arc<Self> {
        Self::new(|_| false, |_| false)
    }
}

impl SetOracle for FnOracle {
    fn is_valid(&self, cards: &[usize]) -> bool {
        (self.valid)(cards)
    }

    fn any_valid_set_exists(&self, pool: &[usize]) -> bool {
        (self.any)(pool)
    }
}

/// Everything a display was told, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DisplayEvent {
    Countdown(Duration, bool),
    Score(usize, u32),
    Freeze(usize, Duration),
    Winners(Vec<usize>),
}

/// Display that records every call for later assertions.
#[derive(Default)]
pub(crate) struct RecordingDisplay {
    events: Mutex<Vec<DisplayEvent>>,
}

impl RecordingDisplay {
    /// The winner set from the last announcement, if any.
    pub(crate) fn winners(&self) -> Option<Vec<usize>> {
        self.events
            .lock()
            .iter()
            .rev()
            .find_map(|event| match event {
                DisplayEvent::Winners(ids) => Some(ids.clone()),
                _ => None,
            })
    }

    /// Every `(player, score)` publication, in call order.
    pub(crate) fn scores(&self) -> Vec<(usize, u32)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                DisplayEvent::Score(player, score) => Some((*player, *score)),
                _ => None,
            })
            .collect()
    }

    /// Whether any countdown update was marked urgent.
    pub(crate) fn saw_urgent_countdown(&self) -> bool {
        self.events
            .lock()
            .iter()
            .any(|event| matches!(event, DisplayEvent::Countdown(_, true)))
    }
}

impl GameDisplay for RecordingDisplay {
    fn set_countdown(&self, remaining: Duration, urgent: bool) {
        self.events
            .lock()
            .push(DisplayEvent::Countdown(remaining, urgent));
    }

    fn set_score(&self, player: usize, score: u32) {
        self.events.lock().push(DisplayEvent::Score(player, score));
    }

    fn set_freeze(&self, player: usize, remaining: Duration) {
        self.events
            .lock()
            .push(DisplayEvent::Freeze(player, remaining));
    }

    fn announce_winners(&self, players: &[usize]) {
        self.events
            .lock()
            .push(DisplayEvent::Winners(players.to_vec()));
    }
}

/// Build a `Shared` directly, bypassing `GameSession`, for unit tests that
/// drive the dealer or players by hand.
pub(crate) fn shared_with(
    config: GameConfig,
    oracle: Arc<dyn SetOracle>,
    display: Arc<dyn GameDisplay>,
) -> Arc<Shared> {
    let board = Board::new(config.table_size, config.deck_size, config.player_count());
    Arc::new(Shared {
        config,
        board: Mutex::new(board),
        dealing: AtomicBool::new(false),
        monitor: Monitor::new(),
        cancelled: AtomicBool::new(false),
        oracle,
        display,
    })
}
