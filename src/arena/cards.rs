//! Immutable action-definition catalog
//!
//! Shared read-only across all matches. Stats here are templates; deployed
//! units copy them at spawn time.

use serde::{Deserialize, Serialize};

/// Offense marches on enemy bases; defense holds ground and deals
/// half its nominal damage in unit-vs-unit exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    Offense,
    Defense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
}

/// Catalog entry for a deployable action
#[derive(Debug, Clone, Serialize)]
pub struct CardDef {
    pub id: &'static str,
    pub name: &'static str,
    pub cost: u8,
    pub category: CardCategory,
    pub health: i32,
    pub damage: i32,
    /// Cells moved per turn (or per tick batch in continuous mode)
    pub move_allowance: u8,
    /// Attack range in Manhattan distance
    pub range: u8,
    /// Immobile units never path; they fight from where they are dropped
    pub immobile: bool,
    /// Fires at range while standing still (turret behavior)
    pub stationary_ranged: bool,
    pub rarity: Rarity,
}

const CATALOG: &[CardDef] = &[
    CardDef {
        id: "knight",
        name: "Knight",
        cost: 3,
        category: CardCategory::Offense,
        health: 300,
        damage: 40,
        move_allowance: 2,
        range: 1,
        immobile: false,
        stationary_ranged: false,
        rarity: Rarity::Common,
    },
    CardDef {
        id: "archer",
        name: "Archer",
        cost: 2,
        category: CardCategory::Offense,
        health: 120,
        damage: 30,
        move_allowance: 2,
        range: 3,
        immobile: false,
        stationary_ranged: false,
        rarity: Rarity::Common,
    },
    CardDef {
        id: "goblins",
        name: "Goblins",
        cost: 2,
        category: CardCategory::Offense,
        health: 80,
        damage: 25,
        move_allowance: 3,
        range: 1,
        immobile: false,
        stationary_ranged: false,
        rarity: Rarity::Common,
    },
    CardDef {
        id: "giant",
        name: "Giant",
        cost: 5,
        category: CardCategory::Offense,
        health: 600,
        damage: 50,
        move_allowance: 1,
        range: 1,
        immobile: false,
        stationary_ranged: false,
        rarity: Rarity::Rare,
    },
    CardDef {
        id: "musketeer",
        name: "Musketeer",
        cost: 4,
        category: CardCategory::Offense,
        health: 180,
        damage: 45,
        move_allowance: 2,
        range: 4,
        immobile: false,
        stationary_ranged: false,
        rarity: Rarity::Rare,
    },
    CardDef {
        id: "cannon",
        name: "Cannon",
        cost: 3,
        category: CardCategory::Defense,
        health: 250,
        damage: 35,
        move_allowance: 0,
        range: 4,
        immobile: true,
        stationary_ranged: true,
        rarity: Rarity::Common,
    },
    CardDef {
        id: "tesla",
        name: "Tesla",
        cost: 4,
        category: CardCategory::Defense,
        health: 200,
        damage: 50,
        move_allowance: 0,
        range: 3,
        immobile: true,
        stationary_ranged: true,
        rarity: Rarity::Rare,
    },
    CardDef {
        id: "guardian",
        name: "Guardian",
        cost: 3,
        category: CardCategory::Defense,
        health: 350,
        damage: 30,
        move_allowance: 1,
        range: 1,
        immobile: false,
        stationary_ranged: false,
        rarity: Rarity::Epic,
    },
];

/// The full shared catalog
pub fn catalog() -> &'static [CardDef] {
    CATALOG
}

/// Look up a card by id
pub fn find(id: &str) -> Option<&'static CardDef> {
    CATALOG.iter().find(|c| c.id == id)
}
