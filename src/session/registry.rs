//! Match registry and per-match actors
//!
//! One coordinator-owned map of room key to handle; one tokio task per
//! match owning its `MatchState`. Every mutation (player commands,
//! timer-driven advancement, bot decisions) funnels through the actor's
//! command channel, so nothing races inside a match. Teardown drops the
//! actor and with it every timer it armed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rand::RngCore;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant as TokioInstant};

use crate::arena::combat::CombatEvent;
use crate::arena::scheduler::{self, StepOutcome};
use crate::arena::state::{MatchState, MatchStatus, MovementMode, SchedulingMode};
use crate::bot::engine::{BotConfig, DecisionEngine, PlannedAction};
use crate::bot::scorer::ScoreSource;
use crate::core::config::{
    ServerConfig, BOT_INTERVAL, ELIXIR_PER_TURN, REAP_DELAY, REGEN_INTERVAL, TICK_INTERVAL,
    TURN_DURATION,
};
use crate::core::error::{GameError, Result};
use crate::core::types::{MatchId, PlayerId};
use crate::net::protocol::{ClientMsg, MatchView, ServerMsg};
use crate::session::commands::{self, SettingsUpdate};
use crate::session::rate_limit::RateLimiter;
use crate::stats::store::{MatchSummary, StatsHandle};

/// Outbound push channel for one connected participant
pub type Outbound = mpsc::UnboundedSender<ServerMsg>;

/// Commands a connection task sends into a match actor
pub enum MatchCmd {
    Join {
        display_name: String,
        movement_mode: Option<MovementMode>,
        sink: Outbound,
        reply: oneshot::Sender<Result<PlayerId>>,
    },
    Client {
        player_id: PlayerId,
        msg: ClientMsg,
    },
    Disconnect {
        player_id: PlayerId,
    },
}

/// Cheap clonable handle to a running match actor
#[derive(Clone)]
pub struct MatchHandle {
    pub id: MatchId,
    tx: mpsc::Sender<MatchCmd>,
}

impl MatchHandle {
    pub async fn send(&self, cmd: MatchCmd) {
        // A closed channel means the match was reaped; commands just drop
        let _ = self.tx.send(cmd).await;
    }
}

/// Coordinator-owned map of live matches, keyed by client room key
pub struct MatchRegistry {
    matches: Arc<Mutex<HashMap<String, MatchHandle>>>,
    stats: Arc<StatsHandle>,
    config: ServerConfig,
}

impl MatchRegistry {
    pub fn new(stats: Arc<StatsHandle>, config: ServerConfig) -> Self {
        Self {
            matches: Arc::new(Mutex::new(HashMap::new())),
            stats,
            config,
        }
    }

    pub fn stats(&self) -> Arc<StatsHandle> {
        Arc::clone(&self.stats)
    }

    /// Look up a running match by room key
    pub fn get(&self, room: &str) -> Option<MatchHandle> {
        self.matches
            .lock()
            .ok()
            .and_then(|map| map.get(room).cloned())
    }

    /// Fetch or spawn the match for a room key
    pub fn get_or_create(&self, room: &str) -> MatchHandle {
        let mut map = match self.matches.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = map.get(room) {
            return handle.clone();
        }

        let seed = rand::thread_rng().next_u64();
        let id = MatchId::new();
        let (tx, rx) = mpsc::channel(64);
        let handle = MatchHandle { id, tx };
        map.insert(room.to_string(), handle.clone());

        let actor = MatchActor::new(
            id,
            seed,
            rx,
            Arc::clone(&self.stats),
            self.config.clone(),
        );
        tracing::info!(%room, match_id = %id, "match created");

        let matches = Arc::clone(&self.matches);
        let room = room.to_string();
        tokio::spawn(async move {
            actor.run().await;
            if let Ok(mut map) = matches.lock() {
                map.remove(&room);
            }
            tracing::info!(%room, "match reaped");
        });
        handle
    }
}

/// The single owner of one match's state
struct MatchActor {
    state: MatchState,
    rx: mpsc::Receiver<MatchCmd>,
    stats: Arc<StatsHandle>,
    config: ServerConfig,
    sinks: HashMap<PlayerId, Outbound>,
    limiters: HashMap<PlayerId, RateLimiter>,
    bots: HashMap<PlayerId, DecisionEngine>,
    scorer: ScoreSource,
    turn_deadline: Option<TokioInstant>,
    stats_recorded: bool,
}

impl MatchActor {
    fn new(
        id: MatchId,
        seed: u64,
        rx: mpsc::Receiver<MatchCmd>,
        stats: Arc<StatsHandle>,
        config: ServerConfig,
    ) -> Self {
        let scorer = ScoreSource::statistical(Arc::clone(&stats));
        Self {
            state: MatchState::new(id, seed),
            rx,
            stats,
            config,
            sinks: HashMap::new(),
            limiters: HashMap::new(),
            bots: HashMap::new(),
            scorer,
            turn_deadline: None,
            stats_recorded: false,
        }
    }

    async fn run(mut self) {
        let mut tick = time::interval(TICK_INTERVAL);
        let mut regen = time::interval(REGEN_INTERVAL);
        let mut bot_cycle = time::interval(BOT_INTERVAL);

        loop {
            let turn_based = self.turn_based_active();
            let continuous = self.continuous_active();
            // Idle turn timer parks a day out rather than never firing
            let deadline = self
                .turn_deadline
                .unwrap_or_else(|| TokioInstant::now() + Duration::from_secs(86_400));

            tokio::select! {
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_cmd(cmd).await,
                        None => break,
                    }
                }
                _ = time::sleep_until(deadline), if turn_based => {
                    self.on_turn_boundary().await;
                }
                _ = tick.tick(), if continuous => {
                    let outcome = scheduler::run_tick(&mut self.state);
                    self.publish_outcome(&outcome);
                    self.broadcast_state();
                }
                _ = regen.tick(), if continuous => {
                    scheduler::regen_elixir(&mut self.state);
                    self.broadcast_state();
                }
                _ = bot_cycle.tick(), if continuous => {
                    self.run_bot_seats().await;
                    self.broadcast_state();
                }
            }

            if self.state.status == MatchStatus::Ended {
                self.finish_match().await;
                break;
            }
            // A waiting room with no connected humans has nothing to wait
            // for; bot seats alone cannot start a match
            if self.state.status == MatchStatus::Waiting
                && self.sinks.is_empty()
                && !self.state.players.iter().any(|p| !p.is_bot)
            {
                break;
            }
        }
    }

    fn turn_based_active(&self) -> bool {
        self.state.status == MatchStatus::Active
            && self.state.scheduling == SchedulingMode::TurnBased
    }

    fn continuous_active(&self) -> bool {
        self.state.status == MatchStatus::Active
            && self.state.scheduling == SchedulingMode::Continuous
    }

    // === COMMANDS ===

    async fn handle_cmd(&mut self, cmd: MatchCmd) {
        match cmd {
            MatchCmd::Join {
                display_name,
                movement_mode,
                sink,
                reply,
            } => {
                let result = self.handle_join(display_name, movement_mode, sink);
                let _ = reply.send(result);
                self.broadcast_state();
            }
            MatchCmd::Client { player_id, msg } => {
                if let Err(e) = self.handle_client(player_id, msg).await {
                    self.reject(player_id, &e);
                }
            }
            MatchCmd::Disconnect { player_id } => {
                self.handle_disconnect(player_id).await;
            }
        }
    }

    fn handle_join(
        &mut self,
        display_name: String,
        movement_mode: Option<MovementMode>,
        sink: Outbound,
    ) -> Result<PlayerId> {
        self.state.purge_expired_reconnects(Instant::now());

        // Same display name inside the grace window: restore the seat
        if self.state.status == MatchStatus::Active {
            if let Some(player_id) = self.state.try_restore(&display_name, Instant::now()) {
                self.sinks.insert(player_id, sink.clone());
                self.limiters.insert(player_id, RateLimiter::default());
                let _ = sink.send(ServerMsg::Joined {
                    match_id: self.state.id,
                    player_id,
                });
                tracing::info!(match_id = %self.state.id, %display_name, "participant reconnected");
                return Ok(player_id);
            }
        }

        let player_id = self.state.join(display_name.clone(), false)?;
        if let Some(mode) = movement_mode {
            if self.state.authority == Some(player_id) {
                self.state.movement = mode;
            }
        }
        self.sinks.insert(player_id, sink.clone());
        self.limiters.insert(player_id, RateLimiter::default());
        let _ = sink.send(ServerMsg::Joined {
            match_id: self.state.id,
            player_id,
        });
        tracing::info!(match_id = %self.state.id, %display_name, "participant joined");
        Ok(player_id)
    }

    async fn handle_client(&mut self, player_id: PlayerId, msg: ClientMsg) -> Result<()> {
        // Statistics snapshots skip the limiter; they mutate nothing
        if let ClientMsg::GetStatistics = msg {
            let stats = self.stats.snapshot();
            self.send_to(player_id, ServerMsg::Statistics { stats });
            return Ok(());
        }

        let limiter = self.limiters.entry(player_id).or_default();
        if !limiter.check(Instant::now()) {
            return Err(GameError::RateLimited);
        }

        match msg {
            ClientMsg::UpdateSettings { settings, .. } => {
                self.apply_settings(player_id, &settings)?;
            }
            ClientMsg::ForceStart { .. } => {
                commands::force_start(&mut self.state, player_id)?;
                self.on_match_started().await;
            }
            ClientMsg::DeployAction {
                action_id,
                position,
                target_id,
                ..
            } => {
                commands::deploy_action(&mut self.state, player_id, &action_id, position, target_id)?;
            }
            ClientMsg::MoveUnit {
                unit_id,
                target_position,
                ..
            } => {
                let events = commands::move_unit(&mut self.state, player_id, unit_id, target_position)?;
                self.publish_events(events);
            }
            ClientMsg::SetTarget {
                unit_id, target_id, ..
            } => {
                commands::set_target(&mut self.state, player_id, unit_id, target_id)?;
            }
            ClientMsg::EndTurn { .. } => {
                let outcome = commands::end_turn(&mut self.state, player_id)?;
                self.after_turn(outcome).await;
            }
            ClientMsg::Join { .. } | ClientMsg::GetStatistics => {
                return Err(GameError::InvalidIdentifier("unexpected message".into()));
            }
        }

        self.broadcast_state();
        Ok(())
    }

    fn apply_settings(&mut self, player_id: PlayerId, settings: &SettingsUpdate) -> Result<()> {
        commands::update_settings(&mut self.state, player_id, settings)?;
        if self.state.use_learned_scorer && !self.config.scorer_url.is_empty() {
            self.scorer = ScoreSource::learned(self.config.scorer_url.clone(), Arc::clone(&self.stats));
        } else {
            self.scorer = ScoreSource::statistical(Arc::clone(&self.stats));
        }
        self.ensure_bot_engines();
        Ok(())
    }

    async fn handle_disconnect(&mut self, player_id: PlayerId) {
        self.sinks.remove(&player_id);
        self.limiters.remove(&player_id);

        match self.state.status {
            MatchStatus::Waiting => {
                // No grace pre-start; the seat simply frees up
                self.state.players.retain(|p| p.id != player_id);
                if self.state.authority == Some(player_id) {
                    self.state.authority =
                        self.state.players.iter().find(|p| !p.is_bot).map(|p| p.id);
                }
            }
            MatchStatus::Active => {
                let was_current = self.state.is_current(player_id);
                self.state.snapshot_disconnect(player_id, Instant::now());

                if self.state.is_decided() {
                    self.state.status = MatchStatus::Ended;
                } else if was_current && self.state.scheduling == SchedulingMode::TurnBased {
                    // Removing the seat already made the next participant
                    // current; hand them the turn without rotating again.
                    if self.state.current_player().is_some_and(|p| p.eliminated) {
                        self.state.rotate_turn();
                    } else {
                        self.state.turn_count += 1;
                        self.state.acted_this_turn.clear();
                    }
                    if let Some(id) = self.state.current_player().map(|p| p.id) {
                        if let Some(player) = self.state.player_mut(id) {
                            player.gain_elixir(ELIXIR_PER_TURN);
                        }
                    }
                    self.arm_turn_timer();
                    self.drive_bot_turns().await;
                }
            }
            MatchStatus::Ended => {}
        }
        self.broadcast_state();
    }

    // === SCHEDULING ===

    async fn on_match_started(&mut self) {
        self.ensure_bot_engines();
        if self.state.scheduling == SchedulingMode::TurnBased {
            self.arm_turn_timer();
            // An opening bot seat acts immediately
            self.drive_bot_turns().await;
        }
        self.broadcast_state();
    }

    async fn on_turn_boundary(&mut self) {
        let outcome = scheduler::advance_turn(&mut self.state);
        self.after_turn(outcome).await;
        self.broadcast_state();
    }

    /// Common post-advance handling: publish events, rearm the timer,
    /// and let bot seats take their turns.
    async fn after_turn(&mut self, outcome: StepOutcome) {
        self.publish_outcome(&outcome);
        if outcome.ended {
            self.turn_deadline = None;
            return;
        }
        self.arm_turn_timer();
        self.drive_bot_turns().await;
    }

    fn arm_turn_timer(&mut self) {
        self.turn_deadline = Some(TokioInstant::now() + TURN_DURATION);
    }

    /// While the current seat is a bot, let it act and advance. Bounded
    /// by the seat count so an all-bot table cannot spin the actor.
    async fn drive_bot_turns(&mut self) {
        for _ in 0..self.state.players.len() {
            if self.state.status != MatchStatus::Active {
                break;
            }
            let Some(current) = self.state.current_player() else { break };
            if !current.is_bot {
                break;
            }
            let bot_id = current.id;
            self.run_bot_cycle(bot_id).await;
            let outcome = scheduler::advance_turn(&mut self.state);
            self.publish_outcome(&outcome);
            if outcome.ended {
                self.turn_deadline = None;
                return;
            }
            self.arm_turn_timer();
        }
    }

    /// Continuous mode: every bot seat gets a cycle
    async fn run_bot_seats(&mut self) {
        let bot_ids: Vec<PlayerId> = self
            .state
            .players
            .iter()
            .filter(|p| p.is_bot && !p.eliminated)
            .map(|p| p.id)
            .collect();
        for bot_id in bot_ids {
            self.run_bot_cycle(bot_id).await;
        }
    }

    /// One decision cycle for one bot, applied through the same
    /// validation path a human uses. Failures degrade to a pass.
    async fn run_bot_cycle(&mut self, bot_id: PlayerId) {
        let Some(engine) = self.bots.get_mut(&bot_id) else {
            return;
        };
        let plan = engine.decide(&self.state, bot_id, &self.scorer).await;
        for action in plan {
            match action {
                PlannedAction::Deploy {
                    card_id,
                    position,
                    target,
                    reason,
                } => {
                    tracing::debug!(
                        match_id = %self.state.id,
                        bot = %bot_id,
                        card = %card_id,
                        reason = ?reason,
                        "bot deployment"
                    );
                    if let Err(e) = commands::deploy_action(
                        &mut self.state,
                        bot_id,
                        &card_id,
                        position,
                        target,
                    ) {
                        tracing::debug!(match_id = %self.state.id, error = %e, "bot deployment rejected");
                    }
                }
                PlannedAction::Move {
                    unit_id,
                    destination,
                    ..
                } => {
                    match commands::move_unit(&mut self.state, bot_id, unit_id, destination) {
                        Ok(events) => self.publish_events(events),
                        Err(e) => {
                            tracing::debug!(match_id = %self.state.id, error = %e, "bot move rejected");
                        }
                    }
                }
            }
        }
    }

    fn ensure_bot_engines(&mut self) {
        let preset = if self.state.use_learned_scorer {
            BotConfig::decisive()
        } else {
            BotConfig::baseline()
        };
        // Process config overrides the preset knobs
        let config = BotConfig {
            exploit_ratio: self.config.bot_exploit_ratio,
            action_cap: self.config.bot_action_cap,
            ..preset
        };
        for player in &self.state.players {
            if player.is_bot && !self.bots.contains_key(&player.id) {
                let seed = self.state.seed ^ player.seat as u64;
                self.bots
                    .insert(player.id, DecisionEngine::with_seed(config.clone(), seed));
            }
        }
        self.bots
            .retain(|id, _| self.state.players.iter().any(|p| p.id == *id));
    }

    // === END OF MATCH ===

    async fn finish_match(&mut self) {
        self.record_statistics();
        let winner = self.state.winner();
        self.broadcast(ServerMsg::MatchEnded { winner });
        self.broadcast_state();
        tracing::info!(match_id = %self.state.id, winner = ?winner, "match ended");

        // Linger so clients can read the final state, then tear down;
        // dropping the actor cancels every timer it owned.
        time::sleep(REAP_DELAY).await;
    }

    fn record_statistics(&mut self) {
        if self.stats_recorded || self.bots.is_empty() {
            return;
        }
        self.stats_recorded = true;

        let winner = self.state.winner();
        let bot_won = winner
            .and_then(|id| self.state.player(id))
            .is_some_and(|p| p.is_bot);
        let winner_name = winner
            .and_then(|id| self.state.player(id))
            .map(|p| p.display_name.clone());
        let strategy = self
            .bots
            .values()
            .next()
            .map(|e| e.strategy())
            .unwrap_or("baseline");

        let cards_played: Vec<String> = self
            .bots
            .keys()
            .filter_map(|id| self.state.action_log.get(id))
            .flatten()
            .cloned()
            .collect();

        let ended_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.stats.record_match(
            &cards_played,
            MatchSummary {
                winner: winner_name,
                turns: self.state.turn_count,
                bot_won,
                strategy: strategy.to_string(),
                ended_at_unix,
            },
        );
    }

    // === OUTBOUND ===

    fn publish_outcome(&mut self, outcome: &StepOutcome) {
        if !outcome.events.is_empty() {
            self.publish_events(outcome.events.clone());
        }
    }

    fn publish_events(&mut self, events: Vec<CombatEvent>) {
        if !events.is_empty() {
            self.broadcast(ServerMsg::CombatEvents { events });
        }
    }

    fn broadcast_state(&mut self) {
        let view = MatchView::build(&self.state, &self.stats);
        self.broadcast(ServerMsg::MatchState { state: view });
    }

    fn broadcast(&mut self, msg: ServerMsg) {
        self.sinks.retain(|_, sink| sink.send(msg.clone()).is_ok());
    }

    fn send_to(&self, player_id: PlayerId, msg: ServerMsg) {
        if let Some(sink) = self.sinks.get(&player_id) {
            let _ = sink.send(msg);
        }
    }

    /// Typed rejection, delivered only to the offender
    fn reject(&self, player_id: PlayerId, error: &GameError) {
        tracing::debug!(match_id = %self.state.id, player = %player_id, error = %error, "action rejected");
        self.send_to(
            player_id,
            ServerMsg::Rejection {
                reason: error.rejection_reason(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::store::MemoryStore;

    fn registry() -> MatchRegistry {
        let stats = Arc::new(StatsHandle::load(Box::new(MemoryStore::default())).unwrap());
        MatchRegistry::new(stats, ServerConfig::default())
    }

    async fn join(
        handle: &MatchHandle,
        name: &str,
    ) -> (PlayerId, mpsc::UnboundedReceiver<ServerMsg>) {
        let (sink, rx) = mpsc::unbounded_channel();
        let (reply, response) = oneshot::channel();
        handle
            .send(MatchCmd::Join {
                display_name: name.into(),
                movement_mode: None,
                sink,
                reply,
            })
            .await;
        let player_id = response.await.unwrap().unwrap();
        (player_id, rx)
    }

    async fn drain_for(
        rx: &mut mpsc::UnboundedReceiver<ServerMsg>,
        pred: impl Fn(&ServerMsg) -> bool,
    ) -> Option<ServerMsg> {
        loop {
            match time::timeout(Duration::from_millis(500), rx.recv()).await {
                Ok(Some(msg)) if pred(&msg) => return Some(msg),
                Ok(Some(_)) => continue,
                _ => return None,
            }
        }
    }

    #[tokio::test]
    async fn test_join_and_force_start_flow() {
        let registry = registry();
        let handle = registry.get_or_create("room-1");

        let (alice, mut alice_rx) = join(&handle, "alice").await;
        let (_bob, _bob_rx) = join(&handle, "bob").await;

        handle
            .send(MatchCmd::Client {
                player_id: alice,
                msg: ClientMsg::ForceStart {
                    match_id: "room-1".into(),
                },
            })
            .await;

        let msg = drain_for(&mut alice_rx, |m| {
            matches!(m, ServerMsg::MatchState { state } if state.status == MatchStatus::Active)
        })
        .await;
        assert!(msg.is_some(), "expected active match state broadcast");
    }

    #[tokio::test]
    async fn test_non_authority_force_start_rejected_privately() {
        let registry = registry();
        let handle = registry.get_or_create("room-2");

        let (_alice, mut alice_rx) = join(&handle, "alice").await;
        let (bob, mut bob_rx) = join(&handle, "bob").await;

        handle
            .send(MatchCmd::Client {
                player_id: bob,
                msg: ClientMsg::ForceStart {
                    match_id: "room-2".into(),
                },
            })
            .await;

        let rejection =
            drain_for(&mut bob_rx, |m| matches!(m, ServerMsg::Rejection { .. })).await;
        assert!(rejection.is_some());

        // The rejection stays private to bob
        let leaked = drain_for(&mut alice_rx, |m| matches!(m, ServerMsg::Rejection { .. })).await;
        assert!(leaked.is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_excess() {
        let registry = registry();
        let handle = registry.get_or_create("room-3");

        let (alice, mut alice_rx) = join(&handle, "alice").await;
        let (_bob, _bob_rx) = join(&handle, "bob").await;

        // Hammer with more end-turn attempts than the window allows;
        // every one is invalid pre-start, but the limiter fires first
        // once the window fills.
        for _ in 0..(crate::core::config::RATE_MAX_ACTIONS + 3) {
            handle
                .send(MatchCmd::Client {
                    player_id: alice,
                    msg: ClientMsg::EndTurn {
                        match_id: "room-3".into(),
                    },
                })
                .await;
        }

        let mut saw_rate_limited = false;
        while let Some(ServerMsg::Rejection { reason }) =
            drain_for(&mut alice_rx, |m| matches!(m, ServerMsg::Rejection { .. })).await
        {
            if reason.contains("Rate limited") {
                saw_rate_limited = true;
                break;
            }
        }
        assert!(saw_rate_limited);
    }

    #[tokio::test]
    async fn test_current_player_disconnect_hands_turn_to_next_seat() {
        use crate::core::config::{ELIXIR_INITIAL, ELIXIR_PER_TURN};

        let registry = registry();
        let handle = registry.get_or_create("room-4");

        let (alice, _alice_rx) = join(&handle, "alice").await;
        let (bob, mut bob_rx) = join(&handle, "bob").await;
        let (_carol, _carol_rx) = join(&handle, "carol").await;

        handle
            .send(MatchCmd::Client {
                player_id: alice,
                msg: ClientMsg::ForceStart {
                    match_id: "room-4".into(),
                },
            })
            .await;

        // Alice holds the opening turn; her disconnect must pass it to
        // bob, the next seat, not skip over him.
        handle.send(MatchCmd::Disconnect { player_id: alice }).await;

        let msg = drain_for(&mut bob_rx, |m| {
            matches!(m, ServerMsg::MatchState { state }
                if state.status == MatchStatus::Active && state.players.len() == 2)
        })
        .await;
        let Some(ServerMsg::MatchState { state }) = msg else {
            panic!("expected post-disconnect match state");
        };
        assert_eq!(state.current_player, Some(bob));
        let bob_seat = state.players.iter().find(|p| p.id == bob).unwrap();
        assert_eq!(bob_seat.elixir, ELIXIR_INITIAL + ELIXIR_PER_TURN);
    }

    #[tokio::test]
    async fn test_waiting_room_with_only_bots_is_reaped() {
        let registry = registry();
        let handle = registry.get_or_create("room-5");

        let (alice, _alice_rx) = join(&handle, "alice").await;
        handle
            .send(MatchCmd::Client {
                player_id: alice,
                msg: ClientMsg::UpdateSettings {
                    match_id: "room-5".into(),
                    settings: SettingsUpdate {
                        bot_count: Some(2),
                        ..SettingsUpdate::default()
                    },
                },
            })
            .await;

        handle.send(MatchCmd::Disconnect { player_id: alice }).await;

        // Bot seats alone cannot hold a waiting room open
        time::sleep(Duration::from_millis(50)).await;
        assert!(registry.get("room-5").is_none());
    }

    #[tokio::test]
    async fn test_registry_reuses_room_handle() {
        let registry = registry();
        let first = registry.get_or_create("same-room");
        let second = registry.get_or_create("same-room");
        assert_eq!(first.id, second.id);
        assert!(registry.get("same-room").is_some());
        assert!(registry.get("other-room").is_none());
    }
}
