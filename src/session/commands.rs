//! Input-validating handlers for every player-originated action
//!
//! Each handler validates identity, match status, turn entitlement,
//! resources, and coordinates before touching state. A violation returns
//! a typed error and leaves the match untouched; only the originator
//! hears about it.

use serde::Deserialize;

use crate::arena::cards::{self, CardCategory};
use crate::arena::combat::CombatEvent;
use crate::arena::scheduler::{self, StepOutcome};
use crate::arena::state::{MatchState, MatchStatus, MovementMode, SchedulingMode};
use crate::arena::units::Unit;
use crate::core::config::UNITS_PER_PLAYER_CAP;
use crate::core::error::{GameError, Result};
use crate::core::types::{GridPos, PlayerId, UnitId};

/// Pre-start room settings, applied by the configuration authority
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub scheduling_mode: Option<SchedulingMode>,
    pub movement_mode: Option<MovementMode>,
    pub bot_count: Option<usize>,
    pub use_learned_scorer: Option<bool>,
}

fn require_active(state: &MatchState) -> Result<()> {
    if state.status != MatchStatus::Active {
        return Err(GameError::NotAuthorized("match is not active".into()));
    }
    Ok(())
}

fn require_turn(state: &MatchState, player_id: PlayerId) -> Result<()> {
    if state.scheduling == SchedulingMode::TurnBased && !state.is_current(player_id) {
        return Err(GameError::NotAuthorized("not your turn".into()));
    }
    Ok(())
}

fn require_authority(state: &MatchState, player_id: PlayerId) -> Result<()> {
    if state.authority != Some(player_id) {
        return Err(GameError::NotAuthorized(
            "only the room authority may do that".into(),
        ));
    }
    Ok(())
}

/// Deploy a card as a unit.
///
/// Without an explicit position the unit spawns on the first free cell
/// around its owner's base; without an explicit target, offense units
/// auto-target on the next scheduling pass.
pub fn deploy_action(
    state: &mut MatchState,
    player_id: PlayerId,
    card_id: &str,
    position: Option<GridPos>,
    target: Option<PlayerId>,
) -> Result<UnitId> {
    require_active(state)?;
    require_turn(state, player_id)?;

    let player = state
        .player(player_id)
        .ok_or_else(|| GameError::InvalidIdentifier(format!("player {player_id}")))?;
    if player.eliminated {
        return Err(GameError::NotAuthorized("player is eliminated".into()));
    }

    let card = cards::find(card_id)
        .ok_or_else(|| GameError::InvalidIdentifier(format!("card {card_id}")))?;
    if !player.holds_card(card_id) {
        return Err(GameError::InvalidIdentifier(format!(
            "card not in hand: {card_id}"
        )));
    }
    if player.elixir < card.cost as f32 {
        return Err(GameError::InsufficientResource {
            cost: card.cost,
            available: player.elixir,
        });
    }
    if state.units_of(player_id).count() >= UNITS_PER_PLAYER_CAP {
        return Err(GameError::CapacityExceeded(format!(
            "unit cap of {UNITS_PER_PLAYER_CAP} reached"
        )));
    }

    let base_pos = player.base_pos;
    let spawn_pos = match position {
        Some(pos) => {
            if !pos.in_bounds() {
                return Err(GameError::OutOfBounds(pos.x, pos.y));
            }
            if !state.terrain.is_passable(&pos) || state.occupancy.contains_key(&pos) {
                return Err(GameError::OutOfBounds(pos.x, pos.y));
            }
            pos
        }
        None => default_spawn_cell(state, base_pos)?,
    };

    if let Some(target_id) = target {
        let target_player = state
            .player(target_id)
            .ok_or_else(|| GameError::InvalidTarget(format!("player {target_id}")))?;
        if target_id == player_id {
            return Err(GameError::InvalidTarget("cannot target own base".into()));
        }
        if target_player.eliminated {
            return Err(GameError::InvalidTarget("target already eliminated".into()));
        }
    }

    // Validation done: mutate
    let player = state
        .player_mut(player_id)
        .ok_or_else(|| GameError::InvalidIdentifier(format!("player {player_id}")))?;
    player.spend(card.cost)?;
    player.cycle_card(card_id)?;

    let mut unit = Unit::spawn(player_id, card, spawn_pos);
    unit.target = target;
    let unit_id = unit.id;
    state.add_unit(unit)?;
    state
        .action_log
        .entry(player_id)
        .or_default()
        .push(card_id.to_string());

    tracing::debug!(match_id = %state.id, player = %player_id, card = card_id, "unit deployed");
    Ok(unit_id)
}

/// First free passable cell ringing the base, scanning outward
fn default_spawn_cell(state: &MatchState, base_pos: GridPos) -> Result<GridPos> {
    for radius in 1..=3 {
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let pos = GridPos::new(base_pos.x + dx, base_pos.y + dy);
                if pos.in_bounds()
                    && state.terrain.is_passable(&pos)
                    && !state.occupancy.contains_key(&pos)
                {
                    return Ok(pos);
                }
            }
        }
    }
    Err(GameError::CapacityExceeded("no free cell near base".into()))
}

/// Manual move of an owned unit (manual movement mode only)
pub fn move_unit(
    state: &mut MatchState,
    player_id: PlayerId,
    unit_id: UnitId,
    dest: GridPos,
) -> Result<Vec<CombatEvent>> {
    require_active(state)?;
    require_turn(state, player_id)?;
    if state.movement != MovementMode::Manual {
        return Err(GameError::NotAuthorized(
            "manual moves are disabled in automatic mode".into(),
        ));
    }

    let unit = state
        .unit(unit_id)
        .ok_or_else(|| GameError::InvalidIdentifier(format!("unit {unit_id:?}")))?;
    if unit.owner != player_id {
        return Err(GameError::NotAuthorized("not your unit".into()));
    }

    scheduler::manual_move(state, unit_id, dest)
}

/// Retarget a deployed offensive unit at another enemy base
pub fn set_target(
    state: &mut MatchState,
    player_id: PlayerId,
    unit_id: UnitId,
    target: PlayerId,
) -> Result<()> {
    require_active(state)?;

    let unit = state
        .unit(unit_id)
        .ok_or_else(|| GameError::InvalidIdentifier(format!("unit {unit_id:?}")))?;
    if unit.owner != player_id {
        return Err(GameError::NotAuthorized("not your unit".into()));
    }
    if unit.category != CardCategory::Offense {
        return Err(GameError::InvalidTarget(
            "defense units hold their ground".into(),
        ));
    }
    if target == player_id {
        return Err(GameError::InvalidTarget("cannot target own base".into()));
    }
    let target_player = state
        .player(target)
        .ok_or_else(|| GameError::InvalidTarget(format!("player {target}")))?;
    if target_player.eliminated {
        return Err(GameError::InvalidTarget("target already eliminated".into()));
    }

    let unit = state
        .unit_mut(unit_id)
        .ok_or_else(|| GameError::InvalidIdentifier(format!("unit {unit_id:?}")))?;
    unit.target = Some(target);
    unit.path.clear();
    Ok(())
}

/// Explicit end of the current player's turn (turn-based only)
pub fn end_turn(state: &mut MatchState, player_id: PlayerId) -> Result<StepOutcome> {
    require_active(state)?;
    if state.scheduling != SchedulingMode::TurnBased {
        return Err(GameError::NotAuthorized(
            "no turn boundaries in continuous mode".into(),
        ));
    }
    if !state.is_current(player_id) {
        return Err(GameError::NotAuthorized("not your turn".into()));
    }
    Ok(scheduler::advance_turn(state))
}

/// Apply room settings; configuration authority, pre-start only
pub fn update_settings(
    state: &mut MatchState,
    player_id: PlayerId,
    update: &SettingsUpdate,
) -> Result<()> {
    if state.status != MatchStatus::Waiting {
        return Err(GameError::NotAuthorized("match already started".into()));
    }
    require_authority(state, player_id)?;

    if let Some(mode) = update.scheduling_mode {
        state.scheduling = mode;
        let cap = state.elixir_cap();
        for player in &mut state.players {
            player.elixir_cap = cap;
            player.elixir = player.elixir.min(cap);
        }
    }
    if let Some(mode) = update.movement_mode {
        state.movement = mode;
    }
    if let Some(flag) = update.use_learned_scorer {
        state.use_learned_scorer = flag;
    }
    if let Some(count) = update.bot_count {
        adjust_bot_seats(state, count)?;
    }
    Ok(())
}

/// Add or remove bot seats until `count` of them are present
fn adjust_bot_seats(state: &mut MatchState, count: usize) -> Result<()> {
    let current = state.players.iter().filter(|p| p.is_bot).count();
    if count > current {
        for i in current..count {
            state.join(format!("Bot {}", i + 1), true)?;
        }
    } else {
        let doomed: Vec<PlayerId> = state
            .players
            .iter()
            .filter(|p| p.is_bot)
            .rev()
            .take(current - count)
            .map(|p| p.id)
            .collect();
        state.players.retain(|p| !doomed.contains(&p.id));
    }
    Ok(())
}

/// Transition waiting -> active on the authority's demand
pub fn force_start(state: &mut MatchState, player_id: PlayerId) -> Result<()> {
    require_authority(state, player_id)?;
    scheduler::start_match(state)?;
    tracing::info!(match_id = %state.id, players = state.players.len(), "match started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MatchId;

    fn waiting_match(names: &[&str]) -> MatchState {
        let mut state = MatchState::new(MatchId::new(), 21);
        for name in names {
            state.join((*name).to_string(), false).unwrap();
        }
        state
    }

    fn started(names: &[&str]) -> MatchState {
        let mut state = waiting_match(names);
        scheduler::start_match(&mut state).unwrap();
        state
    }

    fn hand_card(state: &MatchState, player: PlayerId) -> String {
        state.player(player).unwrap().hand[0].clone()
    }

    #[test]
    fn test_deploy_happy_path() {
        let mut state = started(&["a", "b"]);
        let a = state.players[0].id;
        state.player_mut(a).unwrap().elixir = 10.0;
        let card = hand_card(&state, a);

        let unit_id = deploy_action(&mut state, a, &card, None, None).unwrap();
        assert!(state.unit(unit_id).is_some());
        assert_eq!(state.action_log[&a], vec![card]);
    }

    #[test]
    fn test_deploy_out_of_turn_rejected() {
        let mut state = started(&["a", "b"]);
        let b = state.players[1].id;
        state.player_mut(b).unwrap().elixir = 10.0;
        let card = hand_card(&state, b);

        let err = deploy_action(&mut state, b, &card, None, None).unwrap_err();
        assert!(matches!(err, GameError::NotAuthorized(_)));
        assert!(state.units.is_empty());
    }

    #[test]
    fn test_deploy_insufficient_elixir_rejected() {
        let mut state = started(&["a", "b"]);
        let a = state.players[0].id;
        state.player_mut(a).unwrap().elixir = 0.5;
        let card = hand_card(&state, a);

        let err = deploy_action(&mut state, a, &card, None, None).unwrap_err();
        assert!(matches!(err, GameError::InsufficientResource { .. }));
        // No mutation on rejection
        assert_eq!(state.player(a).unwrap().elixir, 0.5);
        assert!(state.units.is_empty());
    }

    #[test]
    fn test_deploy_at_unit_cap_costs_nothing() {
        let mut state = started(&["a", "b"]);
        let a = state.players[0].id;
        state.player_mut(a).unwrap().elixir = 10.0;

        for i in 0..UNITS_PER_PLAYER_CAP {
            let knight = cards::find("knight").unwrap();
            let unit = Unit::spawn(a, knight, GridPos::new(1 + i as i32, 0));
            state.add_unit(unit).unwrap();
        }

        let card = hand_card(&state, a);
        let hand_before = state.player(a).unwrap().hand.clone();
        let next_before = state.player(a).unwrap().next_card.clone();

        // The rejection must leave elixir and the hand untouched
        let err = deploy_action(&mut state, a, &card, None, None).unwrap_err();
        assert!(matches!(err, GameError::CapacityExceeded(_)));
        assert_eq!(state.player(a).unwrap().elixir, 10.0);
        assert_eq!(state.player(a).unwrap().hand, hand_before);
        assert_eq!(state.player(a).unwrap().next_card, next_before);
        assert_eq!(state.units_of(a).count(), UNITS_PER_PLAYER_CAP);
    }

    #[test]
    fn test_deploy_on_barrier_rejected() {
        let mut state = started(&["a", "b"]);
        let a = state.players[0].id;
        state.player_mut(a).unwrap().elixir = 10.0;
        let card = hand_card(&state, a);

        let err =
            deploy_action(&mut state, a, &card, Some(GridPos::new(5, 5)), None).unwrap_err();
        assert!(matches!(err, GameError::OutOfBounds(5, 5)));
    }

    #[test]
    fn test_deploy_unknown_card_rejected() {
        let mut state = started(&["a", "b"]);
        let a = state.players[0].id;
        let err = deploy_action(&mut state, a, "dragon", None, None).unwrap_err();
        assert!(matches!(err, GameError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_deploy_targeting_self_rejected() {
        let mut state = started(&["a", "b"]);
        let a = state.players[0].id;
        state.player_mut(a).unwrap().elixir = 10.0;
        let card = hand_card(&state, a);

        let err = deploy_action(&mut state, a, &card, None, Some(a)).unwrap_err();
        assert!(matches!(err, GameError::InvalidTarget(_)));
    }

    #[test]
    fn test_set_target_ownership_enforced() {
        let mut state = started(&["a", "b"]);
        let a = state.players[0].id;
        let b = state.players[1].id;
        state.player_mut(a).unwrap().elixir = 10.0;

        // Deploy something offensive for player a
        let card = state
            .player(a)
            .unwrap()
            .hand
            .iter()
            .find(|c| cards::find(c).unwrap().category == CardCategory::Offense)
            .cloned();
        let Some(card) = card else { return };
        let unit_id = deploy_action(&mut state, a, &card, None, None).unwrap();

        let err = set_target(&mut state, b, unit_id, a).unwrap_err();
        assert!(matches!(err, GameError::NotAuthorized(_)));
        assert!(set_target(&mut state, a, unit_id, b).is_ok());
        assert_eq!(state.unit(unit_id).unwrap().target, Some(b));
    }

    #[test]
    fn test_end_turn_only_for_current() {
        let mut state = started(&["a", "b"]);
        let b = state.players[1].id;
        let err = end_turn(&mut state, b).unwrap_err();
        assert!(matches!(err, GameError::NotAuthorized(_)));

        let a = state.players[0].id;
        let outcome = end_turn(&mut state, a).unwrap();
        assert_eq!(outcome.next_player, Some(b));
    }

    #[test]
    fn test_settings_authority_and_prestart_only() {
        let mut state = waiting_match(&["a", "b"]);
        let a = state.players[0].id;
        let b = state.players[1].id;

        let update = SettingsUpdate {
            scheduling_mode: Some(SchedulingMode::Continuous),
            ..Default::default()
        };
        assert!(matches!(
            update_settings(&mut state, b, &update).unwrap_err(),
            GameError::NotAuthorized(_)
        ));
        update_settings(&mut state, a, &update).unwrap();
        assert_eq!(state.scheduling, SchedulingMode::Continuous);
        // Caps follow the mode switch
        assert!(state
            .players
            .iter()
            .all(|p| p.elixir_cap == state.elixir_cap()));

        scheduler::start_match(&mut state).unwrap();
        assert!(update_settings(&mut state, a, &update).is_err());
    }

    #[test]
    fn test_settings_adjust_bot_count() {
        let mut state = waiting_match(&["a"]);
        let a = state.players[0].id;

        let update = SettingsUpdate {
            bot_count: Some(2),
            ..Default::default()
        };
        update_settings(&mut state, a, &update).unwrap();
        assert_eq!(state.players.iter().filter(|p| p.is_bot).count(), 2);

        let update = SettingsUpdate {
            bot_count: Some(1),
            ..Default::default()
        };
        update_settings(&mut state, a, &update).unwrap();
        assert_eq!(state.players.iter().filter(|p| p.is_bot).count(), 1);
    }

    #[test]
    fn test_force_start_authority_only() {
        let mut state = waiting_match(&["a", "b"]);
        let b = state.players[1].id;
        assert!(force_start(&mut state, b).is_err());
        let a = state.players[0].id;
        assert!(force_start(&mut state, a).is_ok());
        assert_eq!(state.status, MatchStatus::Active);
    }
}
