//! Shared board state: slot-to-card mapping and per-player claim markers.
//!
//! The board holds no lock of its own. It is owned by the session behind a
//! single `Mutex`, and the dealer additionally raises its `dealing` flag
//! around bulk mutations so players skip selections instead of queueing on
//! the lock (see `session::Shared`).

/// Slot/card state for one session.
///
/// Invariants: a card id occupies at most one slot at a time, and a claim
/// marker exists only on an occupied slot. Violations are programmer errors
/// and trip `debug_assert!` in debug builds.
#[derive(Debug)]
pub struct Board {
    /// Card occupying each slot, if any.
    slot_to_card: Vec<Option<usize>>,
    /// Reverse mapping, indexed by card id.
    card_to_slot: Vec<Option<usize>>,
    /// Claim markers, indexed `[slot][player]`.
    claims: Vec<Vec<bool>>,
}

impl Board {
    /// Create an empty board for `table_size` slots, `deck_size` card ids,
    /// and `players` participants.
    pub fn new(table_size: usize, deck_size: usize, players: usize) -> Self {
        Self {
            slot_to_card: vec![None; table_size],
            card_to_slot: vec![None; deck_size],
            claims: vec![vec![false; players]; table_size],
        }
    }

    /// Number of slots on the board.
    pub fn table_size(&self) -> usize {
        self.slot_to_card.len()
    }

    /// Card occupying `slot`, if any.
    pub fn card(&self, slot: usize) -> Option<usize> {
        self.slot_to_card[slot]
    }

    /// Slot currently holding `card`, if it is on the board.
    pub fn slot_of(&self, card: usize) -> Option<usize> {
        self.card_to_slot[card]
    }

    /// Place `card` into `slot`. The slot must be empty and the card must
    /// not already be on the board.
    pub fn place_card(&mut self, slot: usize, card: usize) {
        debug_assert!(self.slot_to_card[slot].is_none(), "slot {slot} is occupied");
        debug_assert!(
            self.card_to_slot[card].is_none(),
            "card {card} is already on the board"
        );
        self.slot_to_card[slot] = Some(card);
        self.card_to_slot[card] = Some(slot);
    }

    /// Clear `slot` and every claim on it, returning the ids of the players
    /// whose claim was removed. A no-op on an empty slot.
    pub fn remove_card(&mut self, slot: usize) -> Vec<usize> {
        if let Some(card) = self.slot_to_card[slot].take() {
            self.card_to_slot[card] = None;
        }
        let mut evicted = Vec::new();
        for (player, claimed) in self.claims[slot].iter_mut().enumerate() {
            if *claimed {
                *claimed = false;
                evicted.push(player);
            }
        }
        evicted
    }

    /// Flip `player`'s claim marker on `slot` and return the new state.
    /// The slot must be occupied.
    pub fn toggle_claim(&mut self, player: usize, slot: usize) -> bool {
        debug_assert!(
            self.slot_to_card[slot].is_some(),
            "claim toggled on empty slot {slot}"
        );
        let marker = &mut self.claims[slot][player];
        *marker = !*marker;
        *marker
    }

    /// Whether `player` currently claims `slot`.
    pub fn claim(&self, player: usize, slot: usize) -> bool {
        self.claims[slot][player]
    }

    /// Players currently claiming `slot`.
    pub fn claimants(&self, slot: usize) -> Vec<usize> {
        self.claims[slot]
            .iter()
            .enumerate()
            .filter_map(|(player, &claimed)| claimed.then_some(player))
            .collect()
    }

    /// Number of occupied slots.
    pub fn count_occupied(&self) -> usize {
        self.slot_to_card.iter().filter(|c| c.is_some()).count()
    }

    /// Card ids of every occupied slot, in slot order.
    pub fn occupied_cards(&self) -> Vec<usize> {
        self.slot_to_card.iter().filter_map(|&c| c).collect()
    }
}
