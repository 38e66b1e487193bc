//! Wire protocol: JSON messages over one duplex channel per participant

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::arena::combat::CombatEvent;
use crate::arena::player::Participant;
use crate::arena::state::{MatchState, MatchStatus, MovementMode, SchedulingMode};
use crate::arena::terrain::Terrain;
use crate::arena::units::Unit;
use crate::bot::engine::win_probability;
use crate::core::types::{GridPos, MatchId, PlayerId, UnitId};
use crate::session::commands::SettingsUpdate;
use crate::stats::store::{AggregateStats, StatsHandle};

/// Messages a client may send
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    #[serde(rename_all = "camelCase")]
    Join {
        match_id: String,
        display_name: String,
        movement_mode: Option<MovementMode>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateSettings {
        match_id: String,
        settings: SettingsUpdate,
    },
    #[serde(rename_all = "camelCase")]
    ForceStart { match_id: String },
    #[serde(rename_all = "camelCase")]
    DeployAction {
        match_id: String,
        action_id: String,
        position: Option<GridPos>,
        target_id: Option<PlayerId>,
    },
    #[serde(rename_all = "camelCase")]
    MoveUnit {
        match_id: String,
        unit_id: UnitId,
        target_position: GridPos,
    },
    #[serde(rename_all = "camelCase")]
    SetTarget {
        match_id: String,
        unit_id: UnitId,
        target_id: PlayerId,
    },
    #[serde(rename_all = "camelCase")]
    EndTurn { match_id: String },
    GetStatistics,
}

/// Messages pushed to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    #[serde(rename_all = "camelCase")]
    Joined {
        match_id: MatchId,
        player_id: PlayerId,
    },
    #[serde(rename_all = "camelCase")]
    MatchState { state: MatchView },
    #[serde(rename_all = "camelCase")]
    MatchEnded { winner: Option<PlayerId> },
    #[serde(rename_all = "camelCase")]
    CombatEvents { events: Vec<CombatEvent> },
    #[serde(rename_all = "camelCase")]
    Rejection { reason: String },
    #[serde(rename_all = "camelCase")]
    Statistics { stats: AggregateStats },
}

/// Full serialized match pushed after every mutation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub id: MatchId,
    pub status: MatchStatus,
    pub scheduling: SchedulingMode,
    pub movement: MovementMode,
    pub turn_count: u64,
    pub current_player: Option<PlayerId>,
    pub players: Vec<Participant>,
    pub units: Vec<Unit>,
    pub terrain: Terrain,
    /// Win-probability estimates for bot seats
    pub win_estimates: HashMap<PlayerId, f32>,
}

impl MatchView {
    pub fn build(state: &MatchState, stats: &StatsHandle) -> Self {
        let historical = stats.overall_win_rate();
        let win_estimates = state
            .players
            .iter()
            .filter(|p| p.is_bot)
            .map(|p| (p.id, win_probability(state, p.id, historical)))
            .collect();

        Self {
            id: state.id,
            status: state.status,
            scheduling: state.scheduling,
            movement: state.movement,
            turn_count: state.turn_count,
            current_player: state.current_player().map(|p| p.id),
            players: state.players.clone(),
            units: state.units.clone(),
            terrain: state.terrain.clone(),
            win_estimates,
        }
    }
}
