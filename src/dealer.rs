//! The dealer: session state machine, validation queue, and reshuffle clock.
//!
//! The dealer owns the deck, the pending-validation queue, and the turn
//! timer. Its loop walks Dealing → Running → Reshuffling until the terminal
//! condition holds, resolving at most one completed claim per wake-up so
//! validation stays strictly FIFO by completion order.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngExt, SeedableRng};

use crate::player::{Player, PlayerHandle, Verdict};
use crate::session::Shared;

/// Wait granularity while the deadline is far away.
const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Wait granularity inside the warning window, so the countdown stays smooth.
const URGENT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The shared wait object: the FIFO queue of players awaiting validation,
/// paired with the condition variable every session thread rendezvouses on.
///
/// Players push themselves and notify; the dealer sleeps on it with a
/// timeout and pops one entry per wake. Pop order is the fairness contract:
/// the first player to complete a claim queue is judged first.
pub(crate) struct Monitor {
    pub(crate) queue: Mutex<VecDeque<usize>>,
    pub(crate) cond: Condvar,
}

impl Monitor {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
        }
    }

    /// Append a player id (at most one entry per player) and wake everyone.
    pub(crate) fn enqueue(&self, id: usize) {
        let mut queue = self.queue.lock();
        if !queue.contains(&id) {
            queue.push_back(id);
        }
        self.cond.notify_all();
    }

    /// Wake every waiter without changing the queue.
    pub(crate) fn notify_all(&self) {
        let _queue = self.queue.lock();
        self.cond.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn drain(&self) -> Vec<usize> {
        self.queue.lock().drain(..).collect()
    }
}

/// A confirmed set waiting to be lifted off the board.
struct MatchedSet {
    owner: usize,
    cards: Vec<usize>,
    slots: Vec<usize>,
}

/// The session coordinator. Owns the undealt deck and drives the board;
/// everything else it touches lives in [`Shared`].
pub(crate) struct Dealer {
    shared: Arc<Shared>,
    players: Vec<Arc<Player>>,
    /// Card ids not currently on the board. Cards of a confirmed set leave
    /// play entirely; reshuffles return board cards here.
    deck: Vec<usize>,
    rng: StdRng,
    /// Absolute time of the next forced reshuffle.
    reshuffle_at: Instant,
    /// Current wait granularity, shortened inside the warning window.
    poll: Duration,
    matched: Option<MatchedSet>,
}

impl Dealer {
    pub(crate) fn new(shared: Arc<Shared>, players: Vec<Arc<Player>>) -> Self {
        let seed = shared.config.rng_seed.unwrap_or_else(rand::random);
        let deck: Vec<usize> = (0..shared.config.deck_size).collect();
        Self {
            shared,
            players,
            deck,
            rng: StdRng::seed_from_u64(seed),
            reshuffle_at: Instant::now(),
            poll: POLL_INTERVAL,
            matched: None,
        }
    }

    /// The dealer thread body: spawn the players, loop until the terminal
    /// condition holds, then publish the winners and shut the players down
    /// in reverse registration order.
    pub(crate) fn run(mut self) {
        log::info!("dealer thread starting");
        let mut handles: Vec<PlayerHandle> = self
            .players
            .iter()
            .map(|player| Player::spawn(Arc::clone(player)))
            .collect();

        while !self.should_finish() {
            self.deal_all();
            self.update_countdown(true);
            self.timer_loop();
            self.shared.display.set_countdown(Duration::ZERO, false);
            self.reshuffle();
        }

        self.shared.display.set_countdown(Duration::ZERO, false);
        self.announce_winners();
        while let Some(handle) = handles.pop() {
            handle.shutdown();
        }
        log::info!("dealer thread terminated");
    }

    /// Terminal condition, checked at the top of each dealing cycle:
    /// external cancellation, or no valid set left anywhere in play (the
    /// undealt deck plus whatever still sits on the board).
    fn should_finish(&self) -> bool {
        if self.shared.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        let mut pool = self.deck.clone();
        pool.extend(self.shared.board.lock().occupied_cards());
        !self.shared.oracle.any_valid_set_exists(&pool)
    }

    /// The Running state: react to completed claims until the deadline or
    /// cancellation ends the turn.
    fn timer_loop(&mut self) {
        while !self.shared.cancelled.load(Ordering::SeqCst) && Instant::now() < self.reshuffle_at {
            self.sleep_until_woken_or_timeout();
            let found = self.matched.is_some();
            self.update_countdown(found);
            if let Some(freed) = self.apply_matched_set() {
                self.refill(&freed);
            }
        }
    }

    /// Sleep on the monitor, or resolve exactly one pending player.
    ///
    /// Resolution happens under the monitor lock: snapshot the player's
    /// claim queue, map it to cards, consult the oracle, store the verdict,
    /// and broadcast. A snapshot that no longer covers a full set of
    /// occupied slots is stale, not an error; the player is released with
    /// an invalidated verdict.
    fn sleep_until_woken_or_timeout(&mut self) {
        let monitor = &self.shared.monitor;
        let mut queue = monitor.queue.lock();
        let Some(id) = queue.pop_front() else {
            let _ = monitor.cond.wait_for(&mut queue, self.poll);
            return;
        };

        let player = Arc::clone(&self.players[id]);
        let slots = player.selection_snapshot();
        let cards: Option<Vec<usize>> = if slots.len() == self.shared.config.feature_size {
            let board = self.shared.board.lock();
            slots.iter().map(|&slot| board.card(slot)).collect()
        } else {
            None
        };

        match cards {
            Some(cards) if self.shared.oracle.is_valid(&cards) => {
                log::info!("player {id} found a set: cards {cards:?} on slots {slots:?}");
                player.deliver(Verdict::Confirmed);
                self.matched = Some(MatchedSet {
                    owner: id,
                    cards,
                    slots,
                });
            }
            Some(_) => {
                log::debug!("player {id} submitted an invalid set on slots {slots:?}");
                player.deliver(Verdict::Rejected);
            }
            None => {
                player.deliver(Verdict::Invalidated);
            }
        }
        monitor.cond.notify_all();
    }

    /// Lift a confirmed set off the board, returning the freed slots.
    ///
    /// Runs with the board-mutation flag raised and both the monitor and
    /// board held, so no player can observe a half-applied removal. Every
    /// player claiming one of the removed slots has that claim repaired out
    /// of its queue; one that was itself awaiting validation is released
    /// with an invalidated verdict.
    fn apply_matched_set(&mut self) -> Option<Vec<usize>> {
        let matched = self.matched.take()?;
        self.shared.dealing.store(true, Ordering::SeqCst);
        let mut freed = Vec::new();
        {
            let mut queue = self.shared.monitor.queue.lock();
            let mut board = self.shared.board.lock();
            let mut pairs: Vec<(usize, usize)> = matched
                .slots
                .iter()
                .copied()
                .zip(matched.cards.iter().copied())
                .collect();
            pairs.shuffle(&mut self.rng);
            for (slot, card) in pairs {
                // Re-validate at application time; skip slots whose card
                // changed since the set was judged.
                if board.card(slot) != Some(card) {
                    continue;
                }
                freed.push(slot);
                for claimant in board.remove_card(slot) {
                    let state = &self.players[claimant];
                    state.remove_queued_slot(slot);
                    if let Some(pos) = queue.iter().position(|&p| p == claimant) {
                        queue.remove(pos);
                        state.deliver(Verdict::Invalidated);
                    }
                }
            }
            self.shared.monitor.cond.notify_all();
        }
        self.shared.dealing.store(false, Ordering::SeqCst);
        log::debug!(
            "removed set cards {:?} for player {}",
            matched.cards,
            matched.owner
        );
        Some(freed)
    }

    /// Refill freed slots from the deck. Deck exhaustion simply leaves
    /// slots empty.
    fn refill(&mut self, slots: &[usize]) {
        if slots.is_empty() {
            return;
        }
        self.shared.dealing.store(true, Ordering::SeqCst);
        {
            let mut board = self.shared.board.lock();
            for &slot in slots {
                if self.deck.is_empty() {
                    break;
                }
                if board.card(slot).is_none() {
                    let idx = self.rng.random_range(0..self.deck.len());
                    let card = self.deck.swap_remove(idx);
                    board.place_card(slot, card);
                }
            }
        }
        self.shared.dealing.store(false, Ordering::SeqCst);
    }

    /// The Dealing state: draw cards uniformly at random without
    /// replacement into every empty slot, in shuffled slot order.
    fn deal_all(&mut self) {
        self.shared.dealing.store(true, Ordering::SeqCst);
        {
            let mut board = self.shared.board.lock();
            let mut empty: Vec<usize> = (0..board.table_size())
                .filter(|&slot| board.card(slot).is_none())
                .collect();
            empty.shuffle(&mut self.rng);
            for slot in empty {
                if self.deck.is_empty() {
                    break;
                }
                let idx = self.rng.random_range(0..self.deck.len());
                let card = self.deck.swap_remove(idx);
                board.place_card(slot, card);
            }
            log::debug!(
                "dealt table: {} slots occupied, {} cards in deck",
                board.count_occupied(),
                self.deck.len()
            );
        }
        self.shared.dealing.store(false, Ordering::SeqCst);
    }

    /// The Reshuffling state: return every board card to the deck, clear
    /// all claims and claim queues, drain the pending-validation queue, and
    /// wake everyone whose selection just became void.
    fn reshuffle(&mut self) {
        self.shared.dealing.store(true, Ordering::SeqCst);
        {
            let mut queue = self.shared.monitor.queue.lock();
            let mut board = self.shared.board.lock();
            for slot in 0..board.table_size() {
                if let Some(card) = board.card(slot) {
                    board.remove_card(slot);
                    self.deck.push(card);
                }
            }
            for player in &self.players {
                player.void_selection();
            }
            for id in queue.drain(..) {
                self.players[id].deliver(Verdict::Invalidated);
            }
            self.shared.monitor.cond.notify_all();
        }
        self.shared.dealing.store(false, Ordering::SeqCst);
        for player in &self.players {
            player.wake_generator();
        }
        log::debug!("reshuffled, {} cards in deck", self.deck.len());
    }

    /// Reset or repaint the countdown. A reset recomputes the deadline and
    /// restores the relaxed poll; inside the warning window the poll drops
    /// to the urgent interval and the display turns urgent.
    fn update_countdown(&mut self, reset: bool) {
        if reset {
            let timeout = self.shared.config.turn_timeout();
            self.poll = POLL_INTERVAL;
            self.reshuffle_at = Instant::now() + timeout;
            self.shared.display.set_countdown(timeout, false);
        } else {
            let remaining = self.reshuffle_at.saturating_duration_since(Instant::now());
            let urgent = remaining < self.shared.config.turn_timeout_warning();
            if urgent {
                self.poll = URGENT_POLL_INTERVAL;
            }
            self.shared.display.set_countdown(remaining, urgent);
        }
    }

    /// Publish every player whose score equals the session maximum.
    fn announce_winners(&self) {
        let top = self.players.iter().map(|p| p.score()).max().unwrap_or(0);
        let winners: Vec<usize> = self
            .players
            .iter()
            .filter(|p| p.score() == top)
            .map(|p| p.id())
            .collect();
        log::info!("game over, winners {winners:?} with {top} points");
        self.shared.display.announce_winners(&winners);
    }
}
