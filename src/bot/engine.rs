//! Bot decision engine
//!
//! Runs inside the match actor, synchronously with the turn/tick cycle.
//! Each decision cycle weighs defense against offense, then picks cards
//! by a blend of historical win rates (exploit) and randomness
//! (explore). A seeded RNG makes runs reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::arena::cards::{self, CardDef};
use crate::arena::pathfinding::find_path;
use crate::arena::state::{MatchState, MovementMode};
use crate::bot::scorer::{ActionFeatures, ScoreSource};
use crate::bot::threat::{self, Threat};
use crate::core::config::{BASE_ENGAGE_BONUS, BASE_MAX_HEALTH};
use crate::core::types::{GridPos, PlayerId, UnitId};

/// Knobs for a bot seat
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Probability of exploiting the scorer instead of exploring randomly
    pub exploit_ratio: f32,
    /// Most actions taken in one decision cycle
    pub action_cap: usize,
    /// Skip the cycle below this much elixir, unless threatened
    pub elixir_floor: f32,
    /// Strategy bucket name, keyed into per-strategy statistics
    pub strategy: &'static str,
}

impl BotConfig {
    /// Exploratory default: plays broadly, trusts randomness often
    pub fn baseline() -> Self {
        Self {
            exploit_ratio: 0.6,
            action_cap: 1,
            elixir_floor: 4.0,
            strategy: "baseline",
        }
    }

    /// Trust-the-scorer mode: near-always exploits, acts more per cycle
    pub fn decisive() -> Self {
        Self {
            exploit_ratio: 0.95,
            action_cap: 2,
            elixir_floor: 3.0,
            strategy: "decisive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Defense,
    Offense,
}

/// Why an action was chosen; rides along for observability
#[derive(Debug, Clone, Serialize)]
pub struct DecisionReason {
    pub intent: Intent,
    pub target: Option<PlayerId>,
}

/// One action the bot wants applied through the normal validation path
#[derive(Debug, Clone)]
pub enum PlannedAction {
    Deploy {
        card_id: String,
        position: Option<GridPos>,
        target: Option<PlayerId>,
        reason: DecisionReason,
    },
    Move {
        unit_id: UnitId,
        destination: GridPos,
        reason: DecisionReason,
    },
}

fn plan_has_card(plan: &[PlannedAction], id: &str) -> bool {
    plan.iter()
        .any(|a| matches!(a, PlannedAction::Deploy { card_id, .. } if card_id.as_str() == id))
}

/// Distance at which a threat forces a defensive response
const DEFEND_DISTANCE: i32 = 6;

/// Threat health above which it counts as tanky
const TANKY_HEALTH: i32 = 300;

pub struct DecisionEngine {
    config: BotConfig,
    rng: ChaCha8Rng,
}

impl DecisionEngine {
    pub fn new(config: BotConfig) -> Self {
        Self::with_seed(config, 42)
    }

    /// Create with a specific RNG seed for deterministic behavior
    pub fn with_seed(config: BotConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn strategy(&self) -> &'static str {
        self.config.strategy
    }

    /// Plan zero or more actions for this cycle.
    ///
    /// Never fails: an empty plan means the bot passes.
    pub async fn decide(
        &mut self,
        state: &MatchState,
        player_id: PlayerId,
        scorer: &ScoreSource,
    ) -> Vec<PlannedAction> {
        let Some(player) = state.player(player_id) else {
            return Vec::new();
        };
        if player.eliminated {
            return Vec::new();
        }

        let threats = threat::assess(state, player_id);
        let mut plan = self.plan_unit_moves(state, player_id);
        if player.elixir < self.config.elixir_floor && threats.is_empty() {
            return plan;
        }

        let mut budget = player.elixir;
        let hand = player.hand.clone();
        let own_health = player.base_health as f32 / BASE_MAX_HEALTH as f32;
        let elixir_fraction = player.elixir / player.elixir_cap;

        for _ in 0..self.config.action_cap {
            let affordable: Vec<&'static CardDef> = hand
                .iter()
                .filter(|id| !plan_has_card(&plan, id))
                .filter_map(|id| cards::find(id))
                .filter(|c| (c.cost as f32) <= budget)
                .collect();
            if affordable.is_empty() {
                break;
            }

            let defend = threats
                .first()
                .is_some_and(|t| t.distance <= DEFEND_DISTANCE);

            let action = if defend {
                self.plan_defense(state, player_id, &threats, &affordable, scorer, own_health, elixir_fraction)
                    .await
            } else {
                self.plan_offense(state, player_id, &affordable, scorer, own_health, elixir_fraction, threats.len())
                    .await
            };

            let Some(action) = action else { break };
            if let PlannedAction::Deploy { card_id, .. } = &action {
                let cost = cards::find(card_id).map(|c| c.cost).unwrap_or(0);
                budget -= cost as f32;
            }
            plan.push(action);
        }
        plan
    }

    /// Manual movement mode disables automatic marching, so the engine
    /// steers its own deployed units toward their targets itself.
    fn plan_unit_moves(&self, state: &MatchState, player_id: PlayerId) -> Vec<PlannedAction> {
        if state.movement != MovementMode::Manual {
            return Vec::new();
        }
        let mut moves = Vec::new();
        for unit in state.units_of(player_id) {
            if unit.immobile || unit.stationary_ranged || state.acted_this_turn.contains(&unit.id) {
                continue;
            }
            let Some(target) = unit.target else { continue };
            let Some(base_pos) = state.player(target).map(|p| p.base_pos) else {
                continue;
            };
            if unit.position.manhattan(&base_pos) <= unit.range + BASE_ENGAGE_BONUS {
                continue;
            }
            let blocked = state.occupied_excluding(unit.id);
            let path = find_path(&state.terrain, unit.position, base_pos, Some(&blocked));
            if path.is_empty() {
                continue;
            }
            let reach = (unit.move_allowance as usize).min(path.len());
            let destination = path[..reach]
                .iter()
                .rev()
                .find(|cell| !state.occupancy.contains_key(*cell))
                .copied();
            let Some(destination) = destination else { continue };
            moves.push(PlannedAction::Move {
                unit_id: unit.id,
                destination,
                reason: DecisionReason {
                    intent: Intent::Offense,
                    target: Some(target),
                },
            });
        }
        moves
    }

    /// Counter a specific nearby threat: high damage against tanky
    /// attackers, fast response against a swarm.
    #[allow(clippy::too_many_arguments)]
    async fn plan_defense(
        &mut self,
        state: &MatchState,
        player_id: PlayerId,
        threats: &[Threat],
        affordable: &[&'static CardDef],
        scorer: &ScoreSource,
        own_health: f32,
        elixir_fraction: f32,
    ) -> Option<PlannedAction> {
        let lead = threats.first()?;

        let candidates: Vec<&'static CardDef> = if lead.health >= TANKY_HEALTH {
            // Tanky attacker: bring damage
            let max_damage = affordable.iter().map(|c| c.damage).max()?;
            affordable
                .iter()
                .filter(|c| c.damage >= max_damage / 2)
                .copied()
                .collect()
        } else if threats.len() >= 2 {
            // Swarm: favor fast responders and turrets
            affordable
                .iter()
                .filter(|c| c.move_allowance >= 2 || c.stationary_ranged)
                .copied()
                .collect()
        } else {
            affordable.to_vec()
        };
        let candidates = if candidates.is_empty() {
            affordable.to_vec()
        } else {
            candidates
        };

        let card = self
            .select_card(&candidates, scorer, 1.0, own_health, own_health, elixir_fraction, threats.len())
            .await?;

        let position = self.intercept_cell(state, player_id, lead);
        Some(PlannedAction::Deploy {
            card_id: card.id.to_string(),
            position,
            target: None,
            reason: DecisionReason {
                intent: Intent::Defense,
                target: None,
            },
        })
    }

    /// Push on the most promising enemy base
    #[allow(clippy::too_many_arguments)]
    async fn plan_offense(
        &mut self,
        state: &MatchState,
        player_id: PlayerId,
        affordable: &[&'static CardDef],
        scorer: &ScoreSource,
        own_health: f32,
        elixir_fraction: f32,
        threat_count: usize,
    ) -> Option<PlannedAction> {
        let own_base = state.player(player_id)?.base_pos;

        // Weighted target score: weakened, close, already under pressure
        let target = state
            .living_players()
            .filter(|p| p.id != player_id)
            .map(|p| {
                let health = p.base_health as f32 / BASE_MAX_HEALTH as f32;
                let distance =
                    own_base.manhattan(&p.base_pos) as f32 / (2.0 * crate::core::types::GRID_SIZE as f32);
                let pressure = threat::pressure_on(state, p.id);
                let score = 0.5 * (1.0 - health) + 0.3 * (1.0 - distance) + 0.2 * pressure;
                (p.id, health, score)
            })
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))?;

        // Offense only; a defensive card makes no push
        let marchers: Vec<&'static CardDef> = affordable
            .iter()
            .filter(|c| c.category == cards::CardCategory::Offense)
            .copied()
            .collect();
        let candidates = if marchers.is_empty() {
            affordable.to_vec()
        } else {
            marchers
        };

        let card = self
            .select_card(&candidates, scorer, 0.0, own_health, target.1, elixir_fraction, threat_count)
            .await?;

        Some(PlannedAction::Deploy {
            card_id: card.id.to_string(),
            position: None,
            target: Some(target.0),
            reason: DecisionReason {
                intent: Intent::Offense,
                target: Some(target.0),
            },
        })
    }

    /// Exploit the scorer with probability `exploit_ratio`, otherwise
    /// explore a uniform random candidate.
    #[allow(clippy::too_many_arguments)]
    async fn select_card(
        &mut self,
        candidates: &[&'static CardDef],
        scorer: &ScoreSource,
        defensive: f32,
        own_base_health: f32,
        target_base_health: f32,
        elixir_fraction: f32,
        threat_count: usize,
    ) -> Option<&'static CardDef> {
        if candidates.is_empty() {
            return None;
        }
        if self.rng.gen::<f32>() >= self.config.exploit_ratio {
            let pick = self.rng.gen_range(0..candidates.len());
            return Some(candidates[pick]);
        }

        let mut best: Option<(&'static CardDef, f32)> = None;
        for card in candidates {
            let features = ActionFeatures {
                card_id: card.id.to_string(),
                defensive,
                own_base_health,
                target_base_health,
                elixir_fraction,
                threat_count,
            };
            let score = scorer.score(&features).await;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((card, score));
            }
        }
        best.map(|(card, _)| card)
    }

    /// A free passable cell between the base and the incoming threat
    fn intercept_cell(&self, state: &MatchState, player_id: PlayerId, lead: &Threat) -> Option<GridPos> {
        let base = state.player(player_id)?.base_pos;
        let threat_pos = state.unit(lead.unit_id)?.position;
        let step = GridPos::new(
            base.x + (threat_pos.x - base.x).signum() * 2,
            base.y + (threat_pos.y - base.y).signum() * 2,
        );
        let candidates = [step, GridPos::new(step.x, base.y), GridPos::new(base.x, step.y)];
        candidates.into_iter().find(|p| {
            p.in_bounds() && state.terrain.is_passable(p) && !state.occupancy.contains_key(p)
        })
    }
}

/// Rough win-probability estimate for a bot seat, broadcast with each
/// match state: current base standing blended with historical win rate.
pub fn win_probability(state: &MatchState, player_id: PlayerId, historical: f32) -> f32 {
    let Some(player) = state.player(player_id) else {
        return 0.0;
    };
    if player.eliminated {
        return 0.0;
    }
    let own = player.base_health as f32 / BASE_MAX_HEALTH as f32;
    let enemies: Vec<f32> = state
        .living_players()
        .filter(|p| p.id != player_id)
        .map(|p| p.base_health as f32 / BASE_MAX_HEALTH as f32)
        .collect();
    if enemies.is_empty() {
        return 1.0;
    }
    let enemy_avg = enemies.iter().sum::<f32>() / enemies.len() as f32;
    let standing = 0.5 + (own - enemy_avg) / 2.0;
    (0.7 * standing + 0.3 * historical).clamp(0.0, 1.0)
}
