//! Combat resolution
//!
//! One `resolve` call settles every eligible engagement for the current
//! tick exactly once: base bombardment, symmetric unit exchanges from a
//! pre-application snapshot, then death and elimination cleanup.

use ahash::AHashMap;
use serde::Serialize;

use crate::arena::cards::CardCategory;
use crate::arena::state::MatchState;
use crate::core::config::BASE_ENGAGE_BONUS;
use crate::core::types::{GridPos, PlayerId, UnitId};

/// Events emitted by a resolution pass, broadcast to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CombatEvent {
    /// Unit-vs-unit strike
    Attack {
        attacker: UnitId,
        defender: UnitId,
        damage: i32,
    },
    /// Unit striking an enemy base
    Projectile {
        attacker: UnitId,
        target: PlayerId,
        damage: i32,
    },
    Death { unit: UnitId },
    Eliminated { player: PlayerId },
}

/// Resolve all eligible engagements for this tick.
pub fn resolve(state: &mut MatchState) -> Vec<CombatEvent> {
    let mut events = Vec::new();

    // Phase 1: units in reach of their target base. Bases are engaged at
    // range + 1, see BASE_ENGAGE_BONUS.
    let mut base_hits: Vec<(UnitId, PlayerId, i32)> = Vec::new();
    for unit in &state.units {
        let Some(target) = unit.target else { continue };
        let Some(player) = state.player(target) else { continue };
        if player.eliminated {
            continue;
        }
        if unit.position.manhattan(&player.base_pos) <= unit.range + BASE_ENGAGE_BONUS {
            base_hits.push((unit.id, target, unit.effective_damage()));
        }
    }

    let mut fallen: Vec<PlayerId> = Vec::new();
    for (attacker, target, damage) in base_hits {
        events.push(CombatEvent::Projectile {
            attacker,
            target,
            damage,
        });
        if let Some(player) = state.player_mut(target) {
            if player.damage_base(damage) && !fallen.contains(&target) {
                fallen.push(target);
            }
        }
    }
    for player in fallen {
        for unit in state.eliminate(player) {
            events.push(CombatEvent::Death { unit });
        }
        events.push(CombatEvent::Eliminated { player });
    }

    // Phase 2: unit-vs-unit exchanges. Damage is computed from a snapshot
    // taken before any application, so each pair trades exactly once and
    // simultaneous kills are possible.
    let snapshot: Vec<(UnitId, PlayerId, GridPos, i32, i32)> = state
        .units
        .iter()
        .map(|u| (u.id, u.owner, u.position, u.range, u.effective_damage()))
        .collect();

    let mut incoming: AHashMap<UnitId, i32> = AHashMap::new();
    for (atk_id, atk_owner, atk_pos, atk_range, atk_damage) in &snapshot {
        for (def_id, def_owner, def_pos, _, _) in &snapshot {
            if atk_owner == def_owner {
                continue;
            }
            if atk_pos.manhattan(def_pos) <= *atk_range {
                *incoming.entry(*def_id).or_insert(0) += atk_damage;
                events.push(CombatEvent::Attack {
                    attacker: *atk_id,
                    defender: *def_id,
                    damage: *atk_damage,
                });
            }
        }
    }

    let mut dead: Vec<UnitId> = Vec::new();
    for unit in &mut state.units {
        if let Some(&damage) = incoming.get(&unit.id) {
            unit.apply_damage(damage);
            if !unit.is_alive() {
                dead.push(unit.id);
            }
        }
    }
    for unit in dead {
        state.remove_unit(unit);
        events.push(CombatEvent::Death { unit });
    }

    events
}

/// Disengagement tax: a unit breaking away from a defense-category enemy
/// that had it in reach (range + 1) takes one hit before the move lands.
///
/// At most one instance per move; with several eligible defenders the
/// hardest-hitting one collects.
pub fn disengagement_tax(
    state: &MatchState,
    mover: UnitId,
    from: GridPos,
    to: GridPos,
) -> Option<(UnitId, i32)> {
    let mover_unit = state.unit(mover)?;
    state
        .units
        .iter()
        .filter(|u| {
            u.owner != mover_unit.owner
                && u.category == CardCategory::Defense
                && from.manhattan(&u.position) <= u.range + BASE_ENGAGE_BONUS
                && to.manhattan(&u.position) > from.manhattan(&u.position)
        })
        .map(|u| (u.id, u.effective_damage()))
        .max_by_key(|(_, damage)| *damage)
}
