//! Authoritative per-match state
//!
//! One `MatchState` is owned by exactly one match actor; every mutation
//! goes through it, so validation never races against the unit list or a
//! resource pool. The occupancy index is updated transactionally with
//! every unit position change.

use ahash::{AHashMap, AHashSet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use crate::arena::cards::CardCategory;
use crate::arena::player::{Participant, BASE_POSITIONS};
use crate::arena::terrain::Terrain;
use crate::arena::units::Unit;
use crate::core::config::{ELIXIR_CAP_CONTINUOUS, ELIXIR_CAP_TURN, MAX_PLAYERS, RECONNECT_GRACE, UNITS_PER_PLAYER_CAP};
use crate::core::error::{GameError, Result};
use crate::core::types::{GridPos, MatchId, PlayerId, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Waiting,
    Active,
    Ended,
}

/// The two scheduling disciplines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchedulingMode {
    TurnBased,
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MovementMode {
    Automatic,
    Manual,
}

/// Saved seat for a participant inside the reconnect grace window
#[derive(Debug)]
pub struct DisconnectRecord {
    pub participant: Participant,
    pub units: Vec<Unit>,
    pub expires_at: Instant,
}

pub struct MatchState {
    pub id: MatchId,
    pub status: MatchStatus,
    pub scheduling: SchedulingMode,
    pub movement: MovementMode,
    pub terrain: Terrain,

    /// Seat order doubles as turn order
    pub players: Vec<Participant>,
    pub turn_index: usize,
    pub turn_count: u64,

    /// First joiner; may change room settings before start
    pub authority: Option<PlayerId>,
    pub use_learned_scorer: bool,

    pub units: Vec<Unit>,
    /// Board index: which unit stands on which cell
    pub occupancy: AHashMap<GridPos, UnitId>,
    /// Units that already took a manual move this turn
    pub acted_this_turn: AHashSet<UnitId>,
    /// Deploy history per participant, feeds end-of-match statistics
    pub action_log: AHashMap<PlayerId, Vec<String>>,
    /// Grace-window records keyed by display name
    pub pending_reconnects: HashMap<String, DisconnectRecord>,

    pub seed: u64,
    pub rng: ChaCha8Rng,
}

impl MatchState {
    pub fn new(id: MatchId, seed: u64) -> Self {
        Self {
            id,
            status: MatchStatus::Waiting,
            scheduling: SchedulingMode::TurnBased,
            movement: MovementMode::Automatic,
            terrain: Terrain::generate(),
            players: Vec::new(),
            turn_index: 0,
            turn_count: 0,
            authority: None,
            use_learned_scorer: false,
            units: Vec::new(),
            occupancy: AHashMap::new(),
            acted_this_turn: AHashSet::new(),
            action_log: AHashMap::new(),
            pending_reconnects: HashMap::new(),
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Pool ceiling for the current scheduling discipline
    pub fn elixir_cap(&self) -> f32 {
        match self.scheduling {
            SchedulingMode::TurnBased => ELIXIR_CAP_TURN,
            SchedulingMode::Continuous => ELIXIR_CAP_CONTINUOUS,
        }
    }

    // === SEATS ===

    /// Seat a new participant. Fresh joins only happen pre-start;
    /// mid-match attach goes through `try_restore`.
    pub fn join(&mut self, display_name: String, is_bot: bool) -> Result<PlayerId> {
        if self.status != MatchStatus::Waiting {
            return Err(GameError::NotAuthorized("match already started".into()));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::CapacityExceeded("match is full".into()));
        }
        if self.players.iter().any(|p| p.display_name == display_name) {
            return Err(GameError::InvalidIdentifier(format!(
                "display name taken: {display_name}"
            )));
        }

        let seat = self.free_seat()?;
        let cap = self.elixir_cap();
        let participant = Participant::new(display_name, seat, cap, is_bot, &mut self.rng);
        let player_id = participant.id;

        if self.authority.is_none() && !is_bot {
            self.authority = Some(player_id);
        }
        self.action_log.entry(player_id).or_default();
        self.players.push(participant);
        Ok(player_id)
    }

    fn free_seat(&self) -> Result<usize> {
        let taken: Vec<usize> = self.players.iter().map(|p| p.seat).collect();
        (0..BASE_POSITIONS.len())
            .find(|seat| !taken.contains(seat))
            .ok_or_else(|| GameError::CapacityExceeded("no free seat".into()))
    }

    pub fn player(&self, id: PlayerId) -> Option<&Participant> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Participant> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn current_player(&self) -> Option<&Participant> {
        self.players.get(self.turn_index)
    }

    pub fn is_current(&self, id: PlayerId) -> bool {
        self.current_player().is_some_and(|p| p.id == id)
    }

    pub fn living_players(&self) -> impl Iterator<Item = &Participant> {
        self.players.iter().filter(|p| !p.eliminated)
    }

    /// Index of the next non-eliminated seat after the current one
    pub fn next_turn_index(&self) -> Option<usize> {
        if self.players.is_empty() {
            return None;
        }
        let n = self.players.len();
        (1..=n)
            .map(|step| (self.turn_index + step) % n)
            .find(|&i| !self.players[i].eliminated)
    }

    /// Rotate to the next living seat; never lands on an eliminated one
    pub fn rotate_turn(&mut self) -> Option<PlayerId> {
        let next = self.next_turn_index()?;
        self.turn_index = next;
        self.turn_count += 1;
        self.acted_this_turn.clear();
        Some(self.players[next].id)
    }

    // === UNITS / BOARD ===

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn units_of(&self, owner: PlayerId) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.owner == owner)
    }

    /// Place a freshly spawned unit, claiming its cell
    pub fn add_unit(&mut self, unit: Unit) -> Result<()> {
        if self.units_of(unit.owner).count() >= UNITS_PER_PLAYER_CAP {
            return Err(GameError::CapacityExceeded("unit cap reached".into()));
        }
        if self.occupancy.contains_key(&unit.position) {
            return Err(GameError::OutOfBounds(unit.position.x, unit.position.y));
        }
        self.occupancy.insert(unit.position, unit.id);
        self.units.push(unit);
        Ok(())
    }

    /// Move a unit, keeping the occupancy index in step
    pub fn relocate_unit(&mut self, unit_id: UnitId, to: GridPos) -> Result<()> {
        if let Some(&holder) = self.occupancy.get(&to) {
            if holder != unit_id {
                return Err(GameError::OutOfBounds(to.x, to.y));
            }
        }
        let unit = self
            .unit_mut(unit_id)
            .ok_or_else(|| GameError::InvalidIdentifier(format!("unit {unit_id:?}")))?;
        let from = unit.position;
        unit.position = to;
        self.occupancy.remove(&from);
        self.occupancy.insert(to, unit_id);
        Ok(())
    }

    pub fn remove_unit(&mut self, unit_id: UnitId) -> Option<Unit> {
        let idx = self.units.iter().position(|u| u.id == unit_id)?;
        let unit = self.units.remove(idx);
        if self.occupancy.get(&unit.position) == Some(&unit_id) {
            self.occupancy.remove(&unit.position);
        }
        Some(unit)
    }

    /// Cells currently held by any unit other than `except`
    pub fn occupied_excluding(&self, except: UnitId) -> AHashSet<GridPos> {
        self.occupancy
            .iter()
            .filter(|(_, &id)| id != except)
            .map(|(&pos, _)| pos)
            .collect()
    }

    /// Mark a participant eliminated and clear their units off the board.
    /// Returns the removed unit ids.
    pub fn eliminate(&mut self, player_id: PlayerId) -> Vec<UnitId> {
        if let Some(p) = self.player_mut(player_id) {
            p.eliminated = true;
        }
        let doomed: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.owner == player_id)
            .map(|u| u.id)
            .collect();
        for id in &doomed {
            self.remove_unit(*id);
        }
        // Stale targets on the fallen base are re-resolved next cycle
        for unit in &mut self.units {
            if unit.target == Some(player_id) {
                unit.target = None;
                unit.path.clear();
            }
        }
        doomed
    }

    /// A match is decided once at most one seat is still standing
    pub fn is_decided(&self) -> bool {
        self.living_players().count() <= 1
    }

    pub fn winner(&self) -> Option<PlayerId> {
        let mut living = self.living_players();
        let first = living.next()?;
        if living.next().is_none() {
            Some(first.id)
        } else {
            None
        }
    }

    /// Give every targetless offense unit the nearest enemy base; with a
    /// sole remaining enemy that is simply them.
    pub fn resolve_auto_targets(&mut self) {
        let bases: Vec<(PlayerId, GridPos)> = self
            .living_players()
            .map(|p| (p.id, p.base_pos))
            .collect();

        for unit in &mut self.units {
            if unit.target.is_some() || unit.category != CardCategory::Offense {
                continue;
            }
            let nearest = bases
                .iter()
                .filter(|(id, _)| *id != unit.owner)
                .min_by_key(|(_, base)| unit.position.manhattan(base));
            if let Some((id, _)) = nearest {
                unit.target = Some(*id);
                unit.path.clear();
            }
        }
    }

    // === RECONNECTION ===

    /// Pull a disconnected participant (and their units) off the board
    /// into a grace-window record keyed by display name.
    pub fn snapshot_disconnect(&mut self, player_id: PlayerId, now: Instant) {
        let Some(idx) = self.players.iter().position(|p| p.id == player_id) else {
            return;
        };
        let participant = self.players.remove(idx);

        // Keep rotation pointing at the same seat that was up next
        if self.turn_index > idx {
            self.turn_index -= 1;
        } else if self.turn_index >= self.players.len() {
            self.turn_index = 0;
        }

        let unit_ids: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.owner == player_id)
            .map(|u| u.id)
            .collect();
        let mut units = Vec::with_capacity(unit_ids.len());
        for id in unit_ids {
            if let Some(unit) = self.remove_unit(id) {
                units.push(unit);
            }
        }
        for unit in &mut self.units {
            if unit.target == Some(player_id) {
                unit.target = None;
                unit.path.clear();
            }
        }

        self.pending_reconnects.insert(
            participant.display_name.clone(),
            DisconnectRecord {
                participant,
                units,
                expires_at: now + RECONNECT_GRACE,
            },
        );
    }

    /// Restore a grace-window seat under a new connection id.
    ///
    /// A single atomic transition: either the whole seat (health, hand,
    /// elixir, units) comes back, or nothing does.
    pub fn try_restore(&mut self, display_name: &str, now: Instant) -> Option<PlayerId> {
        let record = self.pending_reconnects.get(display_name)?;
        if record.expires_at <= now {
            self.pending_reconnects.remove(display_name);
            return None;
        }
        let record = self.pending_reconnects.remove(display_name)?;
        let mut participant = record.participant;
        let old_id = participant.id;
        let new_id = PlayerId::new();
        participant.id = new_id;

        // Re-insert at the original seat's place in turn order
        let insert_at = self
            .players
            .iter()
            .position(|p| p.seat > participant.seat)
            .unwrap_or(self.players.len());
        if self.turn_index >= insert_at && !self.players.is_empty() {
            self.turn_index += 1;
        }
        self.players.insert(insert_at, participant);

        // Retarget unit ownership and put the units back on the board
        for mut unit in record.units {
            unit.owner = new_id;
            if self.occupancy.contains_key(&unit.position) {
                // Cell was claimed while they were gone; nudge aside
                if let Some(free) = unit
                    .position
                    .neighbors()
                    .into_iter()
                    .find(|n| self.terrain.is_passable(n) && !self.occupancy.contains_key(n))
                {
                    unit.position = free;
                } else {
                    continue;
                }
            }
            self.occupancy.insert(unit.position, unit.id);
            self.units.push(unit);
        }

        if let Some(log) = self.action_log.remove(&old_id) {
            self.action_log.insert(new_id, log);
        }
        if self.authority == Some(old_id) {
            self.authority = Some(new_id);
        }
        Some(new_id)
    }

    /// Drop grace records whose window has passed
    pub fn purge_expired_reconnects(&mut self, now: Instant) {
        self.pending_reconnects.retain(|_, r| r.expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn active_match(names: &[&str]) -> MatchState {
        let mut state = MatchState::new(MatchId::new(), 1);
        for name in names {
            state.join((*name).to_string(), false).unwrap();
        }
        state.status = MatchStatus::Active;
        state
    }

    #[test]
    fn test_join_assigns_distinct_seats() {
        let state = active_match(&["a", "b", "c"]);
        let seats: Vec<usize> = state.players.iter().map(|p| p.seat).collect();
        assert_eq!(seats, vec![0, 1, 2]);
    }

    #[test]
    fn test_join_rejects_fifth_player() {
        let mut state = MatchState::new(MatchId::new(), 1);
        for name in ["a", "b", "c", "d"] {
            state.join(name.to_string(), false).unwrap();
        }
        let err = state.join("e".to_string(), false).unwrap_err();
        assert!(matches!(err, GameError::CapacityExceeded(_)));
    }

    #[test]
    fn test_join_rejects_after_start() {
        let mut state = active_match(&["a", "b"]);
        assert!(state.join("late".to_string(), false).is_err());
    }

    #[test]
    fn test_first_human_is_authority() {
        let mut state = MatchState::new(MatchId::new(), 1);
        let bot = state.join("bot".to_string(), true).unwrap();
        let human = state.join("alice".to_string(), false).unwrap();
        assert_ne!(state.authority, Some(bot));
        assert_eq!(state.authority, Some(human));
    }

    #[test]
    fn test_rotation_skips_eliminated() {
        // [A, B, C] with B eliminated: turn after A is C
        let mut state = active_match(&["a", "b", "c"]);
        let b = state.players[1].id;
        let c = state.players[2].id;
        state.eliminate(b);

        assert_eq!(state.turn_index, 0);
        assert_eq!(state.rotate_turn(), Some(c));
        assert_eq!(state.turn_index, 2);
    }

    #[test]
    fn test_rotation_wraps_past_eliminated() {
        let mut state = active_match(&["a", "b", "c"]);
        let a = state.players[0].id;
        let b = state.players[1].id;
        state.eliminate(b);
        state.turn_index = 2;
        assert_eq!(state.rotate_turn(), Some(a));
    }

    #[test]
    fn test_occupancy_tracks_unit_moves() {
        let mut state = active_match(&["a", "b"]);
        let owner = state.players[0].id;
        let card = crate::arena::cards::find("knight").unwrap();
        let unit = Unit::spawn(owner, card, GridPos::new(20, 6));
        let unit_id = unit.id;
        state.add_unit(unit).unwrap();

        assert_eq!(state.occupancy.get(&GridPos::new(20, 6)), Some(&unit_id));

        state.relocate_unit(unit_id, GridPos::new(20, 7)).unwrap();
        assert!(!state.occupancy.contains_key(&GridPos::new(20, 6)));
        assert_eq!(state.occupancy.get(&GridPos::new(20, 7)), Some(&unit_id));
    }

    #[test]
    fn test_add_unit_rejects_occupied_cell() {
        let mut state = active_match(&["a", "b"]);
        let owner = state.players[0].id;
        let card = crate::arena::cards::find("knight").unwrap();
        state
            .add_unit(Unit::spawn(owner, card, GridPos::new(20, 6)))
            .unwrap();
        let err = state
            .add_unit(Unit::spawn(owner, card, GridPos::new(20, 6)))
            .unwrap_err();
        assert!(matches!(err, GameError::OutOfBounds(_, _)));
    }

    #[test]
    fn test_eliminate_clears_units_and_targets() {
        let mut state = active_match(&["a", "b"]);
        let a = state.players[0].id;
        let b = state.players[1].id;
        let card = crate::arena::cards::find("knight").unwrap();

        let mut attacker = Unit::spawn(a, card, GridPos::new(20, 6));
        attacker.target = Some(b);
        let attacker_id = attacker.id;
        state.add_unit(attacker).unwrap();
        state
            .add_unit(Unit::spawn(b, card, GridPos::new(20, 30)))
            .unwrap();

        let removed = state.eliminate(b);
        assert_eq!(removed.len(), 1);
        assert_eq!(state.units.len(), 1);
        assert_eq!(state.unit(attacker_id).unwrap().target, None);
        assert!(state.is_decided());
        assert_eq!(state.winner(), Some(a));
    }

    #[test]
    fn test_auto_target_sole_enemy() {
        let mut state = active_match(&["a", "b"]);
        let a = state.players[0].id;
        let b = state.players[1].id;
        let card = crate::arena::cards::find("archer").unwrap();
        let unit = Unit::spawn(a, card, GridPos::new(20, 6));
        let unit_id = unit.id;
        state.add_unit(unit).unwrap();

        state.resolve_auto_targets();
        assert_eq!(state.unit(unit_id).unwrap().target, Some(b));
    }

    #[test]
    fn test_auto_target_skips_defense_units() {
        // Guardian is mobile but defense-category: it holds its ground
        // rather than acquiring a base to march on.
        let mut state = active_match(&["a", "b"]);
        let a = state.players[0].id;
        let card = crate::arena::cards::find("guardian").unwrap();
        let unit = Unit::spawn(a, card, GridPos::new(20, 6));
        let unit_id = unit.id;
        state.add_unit(unit).unwrap();

        state.resolve_auto_targets();
        assert_eq!(state.unit(unit_id).unwrap().target, None);
    }

    #[test]
    fn test_reconnect_restores_seat_within_grace() {
        let mut state = active_match(&["a", "b"]);
        let a = state.players[0].id;
        let card = crate::arena::cards::find("knight").unwrap();
        let unit = Unit::spawn(a, card, GridPos::new(20, 6));
        state.add_unit(unit).unwrap();
        state.player_mut(a).unwrap().base_health = 640;
        let hand_before = state.player(a).unwrap().hand.clone();

        let now = Instant::now();
        state.snapshot_disconnect(a, now);
        assert_eq!(state.players.len(), 1);
        assert!(state.units.is_empty());

        let new_id = state.try_restore("a", now + Duration::from_secs(5)).unwrap();
        assert_ne!(new_id, a);
        let restored = state.player(new_id).unwrap();
        assert_eq!(restored.base_health, 640);
        assert_eq!(restored.hand, hand_before);
        assert_eq!(restored.seat, 0);
        assert_eq!(state.units_of(new_id).count(), 1);
        assert_eq!(state.occupancy.get(&GridPos::new(20, 6)), Some(&state.units[0].id));
    }

    #[test]
    fn test_reconnect_expired_is_discarded() {
        let mut state = active_match(&["a", "b"]);
        let a = state.players[0].id;
        let now = Instant::now();
        state.snapshot_disconnect(a, now);

        let after = now + RECONNECT_GRACE + Duration::from_secs(1);
        assert!(state.try_restore("a", after).is_none());
        assert!(state.pending_reconnects.is_empty());
    }
}
