//! Player agents: persistent per-player state plus the threads that drive it.
//!
//! A [`Player`] is the state the dealer and the session share (claim queue,
//! score, blocking flags); the execution loop lives in [`Player::spawn`],
//! which starts the player thread and, for autonomous players, the
//! selection-generation thread. Input for human players arrives through the
//! same [`Player::select`] entry point the generation thread uses.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rand::RngExt;

use crate::session::Shared;

/// Freeze countdowns update at most this often.
const FREEZE_TICK: Duration = Duration::from_secs(1);

const VERDICT_NONE: u8 = 0;
const VERDICT_CONFIRMED: u8 = 1;
const VERDICT_REJECTED: u8 = 2;
const VERDICT_INVALIDATED: u8 = 3;

/// Outcome of a completed claim queue, delivered by the dealer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// The claimed cards form a valid set; the player scores and serves the
    /// point freeze.
    Confirmed,
    /// The claimed cards do not form a set; the player serves the penalty
    /// freeze.
    Rejected,
    /// The selection was voided before it could be judged (a slot it used
    /// was removed, or the board was reshuffled). No score, no freeze.
    Invalidated,
}

impl Verdict {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            VERDICT_CONFIRMED => Some(Verdict::Confirmed),
            VERDICT_REJECTED => Some(Verdict::Rejected),
            VERDICT_INVALIDATED => Some(Verdict::Invalidated),
            _ => None,
        }
    }

    fn raw(self) -> u8 {
        match self {
            Verdict::Confirmed => VERDICT_CONFIRMED,
            Verdict::Rejected => VERDICT_REJECTED,
            Verdict::Invalidated => VERDICT_INVALIDATED,
        }
    }
}

/// Persistent state of one player.
///
/// Lives behind an `Arc` shared by the session, the dealer, and the player's
/// own threads. The claim queue is ordered FIFO and never exceeds the
/// configured feature size; the score only increases, by one per confirmed
/// set.
pub struct Player {
    /// Stable player id, the index into the session's roster.
    id: usize,
    /// Whether selections come from an external input device rather than a
    /// generation thread.
    human: bool,
    shared: Arc<Shared>,

    /// The claim queue: slots selected so far, in selection order.
    selection: Mutex<VecDeque<usize>>,
    /// Pending outcome, `VERDICT_NONE` when empty.
    verdict: AtomicU8,
    /// True while awaiting a verdict or serving a freeze.
    blocked: AtomicBool,
    /// True while this player holds its single pending-validation entry.
    queued: AtomicBool,
    score: AtomicU32,
    /// Per-player cancellation, set by the dealer during shutdown.
    cancelled: AtomicBool,

    /// Gate the generation thread sleeps on while `blocked`.
    gate: Mutex<()>,
    unblocked: Condvar,
}

impl Player {
    pub(crate) fn new(id: usize, human: bool, shared: Arc<Shared>) -> Self {
        Self {
            id,
            human,
            shared,
            selection: Mutex::new(VecDeque::new()),
            verdict: AtomicU8::new(VERDICT_NONE),
            blocked: AtomicBool::new(false),
            queued: AtomicBool::new(false),
            score: AtomicU32::new(0),
            cancelled: AtomicBool::new(false),
            gate: Mutex::new(()),
            unblocked: Condvar::new(),
        }
    }

    /// Stable player id (≥ 0).
    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether this player receives external input.
    pub fn is_human(&self) -> bool {
        self.human
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.score.load(Ordering::SeqCst)
    }

    /// Whether the player is awaiting a verdict or serving a freeze.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Toggle a slot selection.
    ///
    /// A no-op while the player is blocked or while the dealer is mutating
    /// the board. A slot already in the claim queue is removed and its board
    /// claim cleared; otherwise, if the queue has room and the slot is
    /// occupied, the slot is appended and claimed. When the queue reaches
    /// the feature size the player enqueues itself for validation, blocks,
    /// and wakes the dealer.
    pub fn select(&self, slot: usize) {
        if self.shared.dealing.load(Ordering::SeqCst) || self.is_blocked() {
            return;
        }
        let feature_size = self.shared.config.feature_size;
        let mut completed = false;
        {
            let mut board = self.shared.board.lock();
            let mut selection = self.selection.lock();
            if let Some(pos) = selection.iter().position(|&s| s == slot) {
                selection.remove(pos);
                // The claim may already be gone if the dealer removed the
                // card between our flag check and taking the lock.
                if board.claim(self.id, slot) {
                    board.toggle_claim(self.id, slot);
                }
                self.queued.store(false, Ordering::SeqCst);
            } else if selection.len() < feature_size && board.card(slot).is_some() {
                selection.push_back(slot);
                board.toggle_claim(self.id, slot);
            }
            if selection.len() == feature_size && !self.queued.load(Ordering::SeqCst) {
                completed = true;
            }
        }
        if completed {
            self.queued.store(true, Ordering::SeqCst);
            self.blocked.store(true, Ordering::SeqCst);
            self.shared.monitor.enqueue(self.id);
        }
    }

    // ---- Dealer-side operations ----

    /// Deliver a verdict. The player must be blocked awaiting one; the cell
    /// is guaranteed empty because a blocked player cannot re-enqueue.
    pub(crate) fn deliver(&self, verdict: Verdict) {
        self.verdict.store(verdict.raw(), Ordering::SeqCst);
    }

    /// Read-only copy of the claim queue.
    pub(crate) fn selection_snapshot(&self) -> Vec<usize> {
        self.selection.lock().iter().copied().collect()
    }

    /// Drop `slot` from the claim queue, if present. Called by the dealer
    /// when applying a confirmed set perturbs this player's selection.
    pub(crate) fn remove_queued_slot(&self, slot: usize) {
        let mut selection = self.selection.lock();
        if let Some(pos) = selection.iter().position(|&s| s == slot) {
            selection.remove(pos);
        }
    }

    /// Clear the claim queue without touching the board. Used during
    /// reshuffles, after the dealer has already wiped every claim marker.
    pub(crate) fn void_selection(&self) {
        self.selection.lock().clear();
        self.queued.store(false, Ordering::SeqCst);
    }

    /// Request cancellation and wake every wait this player might be in.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.shared.monitor.notify_all();
        self.wake_generator();
    }

    /// Wake the generation thread's gate.
    pub(crate) fn wake_generator(&self) {
        let _gate = self.gate.lock();
        self.unblocked.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn force_score(&self, score: u32) {
        self.score.store(score, Ordering::SeqCst);
    }

    // ---- Player-thread internals ----

    fn should_stop(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.shared.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn take_verdict(&self) -> Option<Verdict> {
        Verdict::from_raw(self.verdict.swap(VERDICT_NONE, Ordering::SeqCst))
    }

    /// Block on the shared monitor until a verdict arrives or cancellation
    /// is requested. Every verdict wakes all players; the others re-check
    /// their own state and keep sleeping.
    fn wait_for_verdict(&self) -> Option<Verdict> {
        let monitor = &self.shared.monitor;
        let mut queue = monitor.queue.lock();
        loop {
            if self.should_stop() {
                return None;
            }
            if let Some(verdict) = self.take_verdict() {
                return Some(verdict);
            }
            monitor.cond.wait(&mut queue);
        }
    }

    /// Award a point and serve the point freeze.
    fn point(&self) {
        let score = self.score.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.display.set_score(self.id, score);
        log::info!("player {} scored, total {}", self.id, score);
        self.freeze(self.shared.config.point_freeze());
        self.clear_selection();
    }

    /// Serve the penalty freeze. The claim queue is cleared only once the
    /// freeze completes.
    fn penalty(&self) {
        log::debug!("player {} penalized", self.id);
        self.freeze(self.shared.config.penalty_freeze());
        self.clear_selection();
    }

    /// Deterministic chunked sleep with a decrementing freeze display.
    /// Cancellation shortens it to the next chunk boundary.
    fn freeze(&self, total: Duration) {
        let mut remaining = total;
        while !remaining.is_zero() && !self.should_stop() {
            self.shared.display.set_freeze(self.id, remaining);
            let chunk = remaining.min(FREEZE_TICK);
            thread::sleep(chunk);
            remaining = remaining.saturating_sub(chunk);
        }
        self.shared.display.set_freeze(self.id, Duration::ZERO);
    }

    /// Remove every queued claim from the board and empty the queue.
    fn clear_selection(&self) {
        let mut board = self.shared.board.lock();
        let mut selection = self.selection.lock();
        for &slot in selection.iter() {
            if board.claim(self.id, slot) {
                board.toggle_claim(self.id, slot);
            }
        }
        selection.clear();
        self.queued.store(false, Ordering::SeqCst);
    }

    /// Clear `blocked` and release the generation thread.
    fn unblock(&self) {
        self.blocked.store(false, Ordering::SeqCst);
        self.wake_generator();
    }

    /// Suspend the generation thread while the player is blocked.
    fn wait_while_blocked(&self) {
        let mut gate = self.gate.lock();
        while self.is_blocked() && !self.should_stop() {
            self.unblocked.wait(&mut gate);
        }
    }

    // ---- Threads ----

    /// Start the player thread (and the generation thread for autonomous
    /// players), returning the handle the dealer joins during shutdown.
    pub(crate) fn spawn(state: Arc<Player>) -> PlayerHandle {
        let runner = Arc::clone(&state);
        let thread = thread::Builder::new()
            .name(format!("player-{}", state.id))
            .spawn(move || runner.run())
            .expect("failed to spawn player thread");
        PlayerHandle { state, thread }
    }

    fn run(self: Arc<Self>) {
        log::info!("player {} thread starting", self.id);
        let generator = if self.human {
            None
        } else {
            Some(self.spawn_generator())
        };

        while let Some(verdict) = self.wait_for_verdict() {
            match verdict {
                Verdict::Confirmed => self.point(),
                Verdict::Rejected => self.penalty(),
                Verdict::Invalidated => {
                    // The dealer already repaired the queue and claims.
                    self.queued.store(false, Ordering::SeqCst);
                }
            }
            self.unblock();
        }

        if let Some(generator) = generator {
            let _ = generator.join();
        }
        log::info!("player {} thread terminated", self.id);
    }

    /// The autonomous selection loop: pick a pseudo-random slot, select it,
    /// and sleep on the gate whenever the selection left us blocked.
    fn spawn_generator(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        thread::Builder::new()
            .name(format!("computer-{}", self.id))
            .spawn(move || {
                log::info!("computer {} thread starting", state.id);
                let table_size = state.shared.config.table_size;
                let mut rng = rand::rng();
                while !state.should_stop() {
                    let slot = rng.random_range(0..table_size);
                    state.select(slot);
                    state.wait_while_blocked();
                }
                log::info!("computer {} thread terminated", state.id);
            })
            .expect("failed to spawn generation thread")
    }
}

/// Join handle for a running player, kept by the dealer.
pub(crate) struct PlayerHandle {
    pub(crate) state: Arc<Player>,
    thread: JoinHandle<()>,
}

impl PlayerHandle {
    /// Cancel the player and join its thread (which joins the generation
    /// thread first). Never blocks on the shared monitor itself, so it is
    /// safe to call from the dealer at any point.
    pub(crate) fn shutdown(self) {
        self.state.cancel();
        let _ = self.thread.join();
    }
}
