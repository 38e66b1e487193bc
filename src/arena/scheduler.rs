//! Turn and tick scheduling
//!
//! Drives the match state machine: combat resolution, automatic unit
//! movement, elixir regeneration, and turn rotation. The owning actor
//! decides *when* these run (turn timer vs fixed-rate tick); everything
//! here is synchronous.

use crate::arena::combat::{self, CombatEvent};
use crate::arena::pathfinding::find_path;
use crate::arena::state::{MatchState, MatchStatus, MovementMode};
use crate::core::config::{BASE_ENGAGE_BONUS, ELIXIR_PER_REGEN, ELIXIR_PER_TURN};
use crate::core::error::{GameError, Result};
use crate::core::types::{GridPos, PlayerId, UnitId};

/// What a turn transition or tick produced
#[derive(Debug, Default)]
pub struct StepOutcome {
    pub events: Vec<CombatEvent>,
    /// Player whose turn begins now (turn-based only)
    pub next_player: Option<PlayerId>,
    /// Match just became decided
    pub ended: bool,
}

/// Transition `waiting -> active`. Needs at least two seats.
pub fn start_match(state: &mut MatchState) -> Result<()> {
    if state.status != MatchStatus::Waiting {
        return Err(GameError::NotAuthorized("match is not waiting".into()));
    }
    if state.players.len() < 2 {
        return Err(GameError::CapacityExceeded(
            "need at least two participants to start".into(),
        ));
    }
    state.status = MatchStatus::Active;
    state.turn_index = 0;
    Ok(())
}

/// One turn transition in turn-based mode: resolve combat, march
/// automatic units their full allowance, rotate to the next living seat
/// and pay them their turn elixir.
pub fn advance_turn(state: &mut MatchState) -> StepOutcome {
    if state.status != MatchStatus::Active {
        return StepOutcome::default();
    }

    let mut events = combat::resolve(state);
    if state.movement == MovementMode::Automatic {
        events.extend(advance_automatic_units(state, None));
    }

    if state.is_decided() {
        state.status = MatchStatus::Ended;
        return StepOutcome {
            events,
            next_player: None,
            ended: true,
        };
    }

    let next_player = state.rotate_turn();
    if let Some(id) = next_player {
        if let Some(player) = state.player_mut(id) {
            player.gain_elixir(ELIXIR_PER_TURN);
        }
    }

    StepOutcome {
        events,
        next_player,
        ended: false,
    }
}

/// One fixed-rate tick in continuous mode: resolve combat and advance
/// every automatic unit one cell. Elixir regen runs on its own cadence
/// via `regen_elixir`.
pub fn run_tick(state: &mut MatchState) -> StepOutcome {
    if state.status != MatchStatus::Active {
        return StepOutcome::default();
    }

    let mut events = combat::resolve(state);
    if state.movement == MovementMode::Automatic {
        events.extend(advance_automatic_units(state, Some(1)));
    }

    if state.is_decided() {
        state.status = MatchStatus::Ended;
        return StepOutcome {
            events,
            next_player: None,
            ended: true,
        };
    }

    StepOutcome {
        events,
        next_player: None,
        ended: false,
    }
}

/// Continuous-mode elixir regeneration for every living seat
pub fn regen_elixir(state: &mut MatchState) {
    for player in &mut state.players {
        if !player.eliminated {
            player.gain_elixir(ELIXIR_PER_REGEN);
        }
    }
}

/// March every mobile automatic unit toward its target base.
///
/// `step_cap` limits cells moved (continuous ticks move one cell); when
/// None each unit spends its full move allowance. Stale or exhausted
/// paths are recomputed around current occupancy.
fn advance_automatic_units(state: &mut MatchState, step_cap: Option<u8>) -> Vec<CombatEvent> {
    state.resolve_auto_targets();
    let mut events = Vec::new();

    let movers: Vec<UnitId> = state
        .units
        .iter()
        .filter(|u| !u.immobile && !u.stationary_ranged)
        .map(|u| u.id)
        .collect();

    for id in movers {
        let steps = {
            let Some(unit) = state.unit(id) else { continue };
            let allowance = unit.move_allowance;
            step_cap.unwrap_or(allowance).min(allowance)
        };
        events.extend(march_unit(state, id, steps));
    }
    events
}

/// Advance one unit up to `steps` cells along its path, recomputing when
/// the path is stale. The disengagement tax lands at most once for the
/// whole march.
fn march_unit(state: &mut MatchState, id: UnitId, steps: u8) -> Vec<CombatEvent> {
    let mut events = Vec::new();
    let mut taxed = false;

    for _ in 0..steps {
        let Some(unit) = state.unit(id) else { break };
        let Some(target) = unit.target else { break };
        let Some(base_pos) = state.player(target).map(|p| p.base_pos) else {
            break;
        };
        let here = unit.position;

        // Close enough to fight the base: hold and let combat resolve it
        if here.manhattan(&base_pos) <= unit.range + BASE_ENGAGE_BONUS {
            break;
        }

        // Recompute a stale or exhausted path
        let next = match unit.path.first().copied() {
            Some(cell)
                if cell.manhattan(&here) == 1
                    && state.terrain.is_passable(&cell)
                    && !state.occupancy.contains_key(&cell) =>
            {
                cell
            }
            _ => {
                let blocked = state.occupied_excluding(id);
                let path = find_path(&state.terrain, here, base_pos, Some(&blocked));
                if path.is_empty() {
                    // Unreachable right now: hold position
                    if let Some(unit) = state.unit_mut(id) {
                        unit.path.clear();
                    }
                    break;
                }
                let first = path[0];
                if let Some(unit) = state.unit_mut(id) {
                    unit.path = path;
                }
                first
            }
        };

        if state.occupancy.contains_key(&next) {
            break;
        }

        if !taxed {
            if let Some((defender, damage)) = combat::disengagement_tax(state, id, here, next) {
                taxed = true;
                events.push(CombatEvent::Attack {
                    attacker: defender,
                    defender: id,
                    damage,
                });
                if let Some(unit) = state.unit_mut(id) {
                    unit.apply_damage(damage);
                    if !unit.is_alive() {
                        state.remove_unit(id);
                        events.push(CombatEvent::Death { unit: id });
                        break;
                    }
                }
            }
        }

        if state.relocate_unit(id, next).is_err() {
            break;
        }
        if let Some(unit) = state.unit_mut(id) {
            if !unit.path.is_empty() && unit.path[0] == next {
                unit.path.remove(0);
            }
        }
    }
    events
}

/// Explicit manual move of a single unit (manual movement mode).
///
/// The destination must be passable, unclaimed, and within the unit's
/// move allowance; a unit moves at most once per turn.
pub fn manual_move(state: &mut MatchState, unit_id: UnitId, dest: GridPos) -> Result<Vec<CombatEvent>> {
    let unit = state
        .unit(unit_id)
        .ok_or_else(|| GameError::InvalidIdentifier(format!("unit {unit_id:?}")))?;

    if unit.immobile {
        return Err(GameError::InvalidTarget("unit cannot move".into()));
    }
    if state.acted_this_turn.contains(&unit_id) {
        return Err(GameError::NotAuthorized("unit already moved this turn".into()));
    }
    if !dest.in_bounds() || !state.terrain.is_passable(&dest) {
        return Err(GameError::OutOfBounds(dest.x, dest.y));
    }
    if state.occupancy.contains_key(&dest) {
        return Err(GameError::OutOfBounds(dest.x, dest.y));
    }

    let here = unit.position;
    let allowance = unit.move_allowance as usize;
    let blocked = state.occupied_excluding(unit_id);
    let path = find_path(&state.terrain, here, dest, Some(&blocked));
    if path.is_empty() || path.len() > allowance {
        return Err(GameError::InvalidTarget(format!(
            "destination not reachable within allowance: ({}, {})",
            dest.x, dest.y
        )));
    }

    let mut events = Vec::new();
    if let Some((defender, damage)) = combat::disengagement_tax(state, unit_id, here, dest) {
        events.push(CombatEvent::Attack {
            attacker: defender,
            defender: unit_id,
            damage,
        });
        if let Some(unit) = state.unit_mut(unit_id) {
            unit.apply_damage(damage);
            if !unit.is_alive() {
                state.remove_unit(unit_id);
                events.push(CombatEvent::Death { unit: unit_id });
                return Ok(events);
            }
        }
    }

    state.relocate_unit(unit_id, dest)?;
    if let Some(unit) = state.unit_mut(unit_id) {
        unit.path.clear();
    }
    state.acted_this_turn.insert(unit_id);
    Ok(events)
}
