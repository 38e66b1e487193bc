//! Participant seats: humans and bots
//!
//! A participant owns a base with bounded health, a regenerating elixir
//! pool, and a cycling hand of drawable cards.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::VecDeque;

use crate::arena::cards;
use crate::core::config::{BASE_MAX_HEALTH, ELIXIR_INITIAL, HAND_SIZE};
use crate::core::error::{GameError, Result};
use crate::core::types::{GridPos, PlayerId};

/// Fixed spawn coordinates, one per seat, at the four cardinal positions
pub const BASE_POSITIONS: [GridPos; 4] = [
    GridPos { x: 20, y: 4 },
    GridPos { x: 20, y: 35 },
    GridPos { x: 4, y: 20 },
    GridPos { x: 35, y: 20 },
];

/// Seat colors, indexed like BASE_POSITIONS
pub const SEAT_COLORS: [&str; 4] = ["#e74c3c", "#3498db", "#2ecc71", "#f1c40f"];

/// One seat in a match
#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub id: PlayerId,
    pub display_name: String,
    pub seat: usize,
    pub base_pos: GridPos,
    pub color: String,
    pub base_health: i32,
    pub elixir: f32,
    /// Mode-dependent pool ceiling, set by the match on join
    pub elixir_cap: f32,
    pub hand: Vec<String>,
    pub next_card: String,
    #[serde(skip)]
    deck: VecDeque<String>,
    pub eliminated: bool,
    pub is_bot: bool,
}

impl Participant {
    /// Create a seat with a freshly shuffled deck cycle.
    ///
    /// The RNG is the match's seeded source, so seat hands are
    /// reproducible for a given match seed.
    pub fn new(
        display_name: String,
        seat: usize,
        elixir_cap: f32,
        is_bot: bool,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut ids: Vec<String> = cards::catalog().iter().map(|c| c.id.to_string()).collect();
        ids.shuffle(rng);
        let mut deck: VecDeque<String> = ids.into();

        let hand: Vec<String> = deck.drain(..HAND_SIZE).collect();
        let next_card = deck.pop_front().unwrap_or_else(|| "knight".to_string());

        Self {
            id: PlayerId::new(),
            display_name,
            seat,
            base_pos: BASE_POSITIONS[seat],
            color: SEAT_COLORS[seat].to_string(),
            base_health: BASE_MAX_HEALTH,
            elixir: ELIXIR_INITIAL,
            elixir_cap,
            hand,
            next_card,
            deck,
            eliminated: false,
            is_bot,
        }
    }

    /// Spend elixir for a deploy; rejects without mutating on shortfall
    pub fn spend(&mut self, cost: u8) -> Result<()> {
        if self.elixir < cost as f32 {
            return Err(GameError::InsufficientResource {
                cost,
                available: self.elixir,
            });
        }
        self.elixir -= cost as f32;
        Ok(())
    }

    /// Add elixir, clamped to the pool ceiling
    pub fn gain_elixir(&mut self, amount: f32) {
        self.elixir = (self.elixir + amount).clamp(0.0, self.elixir_cap);
    }

    /// Cycle a played card out of the hand: the next card takes its slot
    /// and the played card rejoins the back of the deck.
    pub fn cycle_card(&mut self, card_id: &str) -> Result<()> {
        let slot = self
            .hand
            .iter()
            .position(|c| c == card_id)
            .ok_or_else(|| GameError::InvalidIdentifier(format!("card not in hand: {card_id}")))?;

        self.deck.push_back(self.hand[slot].clone());
        self.hand[slot] = std::mem::take(&mut self.next_card);
        self.next_card = self
            .deck
            .pop_front()
            .unwrap_or_else(|| "knight".to_string());
        Ok(())
    }

    pub fn holds_card(&self, card_id: &str) -> bool {
        self.hand.iter().any(|c| c == card_id)
    }

    /// Apply structure damage, clamped to [0, max]. Returns true if the
    /// base just fell.
    pub fn damage_base(&mut self, amount: i32) -> bool {
        let before = self.base_health;
        self.base_health = (self.base_health - amount).clamp(0, BASE_MAX_HEALTH);
        before > 0 && self.base_health == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn seat(rng: &mut ChaCha8Rng) -> Participant {
        Participant::new("alice".into(), 0, 15.0, false, rng)
    }

    #[test]
    fn test_hand_and_next_card_filled() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let p = seat(&mut rng);
        assert_eq!(p.hand.len(), HAND_SIZE);
        assert!(!p.next_card.is_empty());
        assert_eq!(p.base_health, BASE_MAX_HEALTH);
    }

    #[test]
    fn test_deck_is_seed_reproducible() {
        let mut a_rng = ChaCha8Rng::seed_from_u64(42);
        let mut b_rng = ChaCha8Rng::seed_from_u64(42);
        let a = seat(&mut a_rng);
        let b = seat(&mut b_rng);
        assert_eq!(a.hand, b.hand);
        assert_eq!(a.next_card, b.next_card);
    }

    #[test]
    fn test_spend_rejects_shortfall_without_mutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut p = seat(&mut rng);
        p.elixir = 2.0;
        let err = p.spend(5).unwrap_err();
        assert!(matches!(err, GameError::InsufficientResource { .. }));
        assert_eq!(p.elixir, 2.0);
    }

    #[test]
    fn test_elixir_clamps_at_cap() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut p = seat(&mut rng);
        p.gain_elixir(100.0);
        assert_eq!(p.elixir, p.elixir_cap);
    }

    #[test]
    fn test_cycle_card_rotates_hand() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut p = seat(&mut rng);
        let played = p.hand[0].clone();
        let incoming = p.next_card.clone();

        p.cycle_card(&played).unwrap();

        assert_eq!(p.hand.len(), HAND_SIZE);
        assert!(p.hand.contains(&incoming));
        // Played card went to the back of the cycle, not the hand slot
        assert_ne!(p.hand[0], played);
    }

    #[test]
    fn test_cycle_unknown_card_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut p = seat(&mut rng);
        assert!(p.cycle_card("dragon").is_err());
    }

    #[test]
    fn test_base_damage_bounds_and_fall() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut p = seat(&mut rng);
        assert!(!p.damage_base(400));
        assert_eq!(p.base_health, 600);
        assert!(p.damage_base(5_000));
        assert_eq!(p.base_health, 0);
        // Already fallen: no second fall signal
        assert!(!p.damage_base(10));
    }
}
