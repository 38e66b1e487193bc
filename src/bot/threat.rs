//! Threat assessment for bot seats

use crate::arena::state::MatchState;
use crate::core::types::{PlayerId, UnitId};

/// How far out an enemy unit counts as pressure on a base
pub const THREAT_RADIUS: i32 = 10;

/// An enemy unit bearing down on a base
#[derive(Debug, Clone)]
pub struct Threat {
    pub unit_id: UnitId,
    pub owner: PlayerId,
    pub distance: i32,
    pub health: i32,
    pub damage: i32,
    pub speed: u8,
}

/// Enemy units within the threat radius of `player_id`'s base, nearest
/// first.
pub fn assess(state: &MatchState, player_id: PlayerId) -> Vec<Threat> {
    let Some(base_pos) = state.player(player_id).map(|p| p.base_pos) else {
        return Vec::new();
    };

    let mut threats: Vec<Threat> = state
        .units
        .iter()
        .filter(|u| u.owner != player_id)
        .filter_map(|u| {
            let distance = u.position.manhattan(&base_pos);
            (distance <= THREAT_RADIUS).then(|| Threat {
                unit_id: u.id,
                owner: u.owner,
                distance,
                health: u.health,
                damage: u.damage,
                speed: u.move_allowance,
            })
        })
        .collect();
    threats.sort_by_key(|t| t.distance);
    threats
}

/// Aggregate incoming pressure on a base in [0, 1]: more and closer
/// attackers push it toward 1.
pub fn pressure_on(state: &MatchState, player_id: PlayerId) -> f32 {
    let threats = assess(state, player_id);
    let raw: f32 = threats
        .iter()
        .map(|t| 1.0 - t.distance as f32 / (THREAT_RADIUS as f32 + 1.0))
        .sum();
    (raw / 3.0).clamp(0.0, 1.0)
}
