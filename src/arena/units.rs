//! Deployed combat entities

use serde::Serialize;

use crate::arena::cards::{CardCategory, CardDef};
use crate::core::types::{GridPos, PlayerId, UnitId};

/// A unit on the board, spawned from a card definition
#[derive(Debug, Clone, Serialize)]
pub struct Unit {
    pub id: UnitId,
    pub owner: PlayerId,
    pub card_id: String,
    pub category: CardCategory,

    // Position
    pub position: GridPos,
    /// Queued cells toward the current objective (excludes current cell)
    pub path: Vec<GridPos>,
    /// Enemy base this unit marches on, if any
    pub target: Option<PlayerId>,

    // Stats copied from the card template at spawn
    pub health: i32,
    pub max_health: i32,
    pub damage: i32,
    pub move_allowance: u8,
    pub range: i32,
    pub immobile: bool,
    pub stationary_ranged: bool,
}

impl Unit {
    pub fn spawn(owner: PlayerId, card: &CardDef, position: GridPos) -> Self {
        Self {
            id: UnitId::new(),
            owner,
            card_id: card.id.to_string(),
            category: card.category,
            position,
            path: Vec::new(),
            target: None,
            health: card.health,
            max_health: card.health,
            damage: card.damage,
            move_allowance: card.move_allowance,
            range: card.range as i32,
            immobile: card.immobile,
            stationary_ranged: card.stationary_ranged,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Damage this unit deals per resolution. Defense-category units hit
    /// at half their nominal stat.
    pub fn effective_damage(&self) -> i32 {
        match self.category {
            CardCategory::Offense => self.damage,
            CardCategory::Defense => self.damage / 2,
        }
    }

    pub fn apply_damage(&mut self, amount: i32) {
        self.health = (self.health - amount).max(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::cards;

    #[test]
    fn test_spawn_copies_template() {
        let owner = PlayerId::new();
        let card = cards::find("archer").unwrap();
        let unit = Unit::spawn(owner, card, GridPos::new(10, 5));

        assert_eq!(unit.health, card.health);
        assert_eq!(unit.max_health, card.health);
        assert_eq!(unit.range, card.range as i32);
        assert!(unit.is_alive());
        assert!(unit.path.is_empty());
    }

    #[test]
    fn test_defense_damage_is_halved() {
        let owner = PlayerId::new();
        let cannon = Unit::spawn(owner, cards::find("cannon").unwrap(), GridPos::new(5, 5));
        let knight = Unit::spawn(owner, cards::find("knight").unwrap(), GridPos::new(6, 5));

        assert_eq!(cannon.effective_damage(), cannon.damage / 2);
        assert_eq!(knight.effective_damage(), knight.damage);
    }

    #[test]
    fn test_damage_floors_at_zero() {
        let owner = PlayerId::new();
        let mut unit = Unit::spawn(owner, cards::find("goblins").unwrap(), GridPos::new(5, 5));
        unit.apply_damage(10_000);
        assert_eq!(unit.health, 0);
        assert!(!unit.is_alive());
    }
}
