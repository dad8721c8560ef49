//! Per-stage transition functions
//!
//! Each lifecycle stage maps to one pure-ish function
//! `(&mut Arena, ctx) -> Transition`; the transition is returned by value,
//! so evaluations for different arenas can never observe each other's
//! scratch state. `IN_GAME` and `RESTARTING` delegate to the pluggable
//! `GameLogic` extension point.

use crate::config::TimingConfig;
use crate::hooks::{Hooks, RewardKind, GAMES_PLAYED_STAT};

use super::events::ArenaEvent;
use super::instance::{Arena, ArenaState};
use super::PlayerId;

/// Everything an evaluation may reach besides the arena itself
pub struct TickContext<'a> {
    pub timing: &'a TimingConfig,
    pub hooks: &'a Hooks,
    pub logic: &'a dyn crate::hooks::GameLogic,
}

/// Result of one evaluation. `next_timer: None` leaves the timer to its
/// natural once-per-tick decrement; `Some` overrides it.
#[derive(Debug)]
pub struct Transition {
    pub next_state: ArenaState,
    pub next_timer: Option<i32>,
    pub events: Vec<ArenaEvent>,
}

impl Transition {
    /// Remain in the given stage for another tick
    pub fn stay(state: ArenaState) -> Self {
        Self::to(state, None)
    }

    pub fn to(next_state: ArenaState, next_timer: Option<i32>) -> Self {
        Self {
            next_state,
            next_timer,
            events: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: ArenaEvent) -> Self {
        self.events.push(event);
        self
    }
}

/// Evaluation failure. Caught per-arena by the driver; the arena is
/// marked unready instead of stalling the tick for everyone else.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("arena is missing its {0} location")]
    MissingLocation(&'static str),

    #[error("game logic failure: {0}")]
    Logic(String),
}

/// Run the transition function for the arena's current stage.
/// The closed `ArenaState` enum makes an unhandled stage unrepresentable.
pub fn evaluate(arena: &mut Arena, ctx: &TickContext<'_>) -> Result<Transition, StateError> {
    match arena.state() {
        ArenaState::Starting | ArenaState::FullGame => starting_tick(arena, ctx),
        ArenaState::WaitingForPlayers => waiting_tick(arena, ctx),
        ArenaState::Ending => ending_tick(arena, ctx),
        ArenaState::InGame => ctx.logic.tick_in_game(arena, ctx),
        ArenaState::Restarting => ctx.logic.tick_restarting(arena, ctx),
    }
}

/// Shared by `STARTING` and `FULL_GAME` (the latter is just the countdown
/// with its timer capped). Exit priority when several conditions hold at
/// once: start the game > shorten for a full lobby > stay put.
fn starting_tick(arena: &mut Arena, ctx: &TickContext<'_>) -> Result<Transition, StateError> {
    let timer = arena.timer();
    let players: Vec<PlayerId> = arena.players().to_vec();

    let starting_wait = ctx.timing.starting_wait_secs.max(1);
    let progress = (timer as f32 / starting_wait as f32).clamp(0.0, 1.0);
    for player in &players {
        ctx.hooks.sessions.set_progress(*player, progress, timer.max(0));
    }

    let minimum = arena.minimum_players() as usize;

    if players.len() < minimum && arena.force_start() {
        // the override is consumed, not honored, below the minimum
        arena.set_force_start(false);
        notify_arena(
            &players,
            ctx,
            &format!("Cannot force a start below {} players", minimum),
        );
    }

    if players.len() < minimum {
        notify_arena(
            &players,
            ctx,
            &format!("Waiting for players... ({}/{})", players.len(), minimum),
        );
        for player in &players {
            ctx.hooks.sessions.set_progress(*player, 1.0, 0);
        }
        return Ok(Transition::to(
            ArenaState::WaitingForPlayers,
            Some(ctx.timing.waiting_secs),
        ));
    }

    if timer <= 0 || arena.force_start() {
        arena.set_force_start(false);
        return start_game(arena, ctx, &players);
    }

    // Re-checked every tick so a drained lobby cannot keep a stale cap
    if arena.is_full() && timer > ctx.timing.shorten_waiting_full_secs {
        if arena.state() != ArenaState::FullGame {
            notify_arena(&players, ctx, "The lobby is full! Shortening the countdown.");
        }
        return Ok(Transition::to(
            ArenaState::FullGame,
            Some(ctx.timing.shorten_waiting_full_secs),
        ));
    }

    if arena.state() == ArenaState::FullGame && !arena.is_full() {
        return Ok(Transition::to(ArenaState::Starting, None));
    }

    Ok(Transition::stay(arena.state()))
}

/// Move everyone into active play and hand out kits/stats/rewards
fn start_game(
    arena: &mut Arena,
    ctx: &TickContext<'_>,
    players: &[PlayerId],
) -> Result<Transition, StateError> {
    let start = arena
        .start_location()
        .cloned()
        .ok_or(StateError::MissingLocation("start"))?;

    for player in players {
        ctx.hooks.sessions.teleport(*player, &start);
        ctx.hooks.sessions.prepare_for_game(*player);
        ctx.hooks.sessions.set_progress(*player, 0.0, 0);
        ctx.hooks.kits.give_kit(*player);
        ctx.hooks.stats.increment(*player, GAMES_PLAYED_STAT);
        ctx.hooks
            .rewards
            .perform_reward(*player, arena.id(), RewardKind::GameStart);
        ctx.hooks
            .sessions
            .send_message(*player, "The game has started. Good luck!");
    }

    Ok(
        Transition::to(ArenaState::InGame, Some(ctx.timing.in_game_secs)).with_event(
            ArenaEvent::GameStarted {
                arena_id: arena.id().to_string(),
            },
        ),
    )
}

/// Symmetrical re-entry into the countdown once the minimum is met again
fn waiting_tick(arena: &mut Arena, ctx: &TickContext<'_>) -> Result<Transition, StateError> {
    let players: Vec<PlayerId> = arena.players().to_vec();
    let minimum = arena.minimum_players() as usize;

    if players.len() >= minimum || arena.force_start() {
        notify_arena(&players, ctx, "Enough players! The countdown begins.");
        return Ok(Transition::to(
            ArenaState::Starting,
            Some(ctx.timing.starting_wait_secs),
        ));
    }

    for player in &players {
        ctx.hooks.sessions.set_progress(*player, 1.0, 0);
    }

    if arena.timer() <= 0 {
        return Ok(Transition::to(
            ArenaState::WaitingForPlayers,
            Some(ctx.timing.waiting_secs),
        ));
    }
    Ok(Transition::stay(ArenaState::WaitingForPlayers))
}

fn ending_tick(arena: &mut Arena, ctx: &TickContext<'_>) -> Result<Transition, StateError> {
    if arena.timer() > 0 {
        return Ok(Transition::stay(ArenaState::Ending));
    }
    for player in arena.players() {
        ctx.hooks
            .rewards
            .perform_reward(*player, arena.id(), RewardKind::GameEnd);
    }
    Ok(Transition::to(
        ArenaState::Restarting,
        Some(ctx.timing.restarting_secs),
    ))
}

fn notify_arena(players: &[PlayerId], ctx: &TickContext<'_>, message: &str) {
    for player in players {
        ctx.hooks.sessions.send_message(*player, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::events::EVENT_CHANNEL_CAPACITY;
    use crate::hooks::{BaseGameLogic, GameLogic, StatSink};
    use crate::util::location::Location;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::broadcast;
    use uuid::Uuid;

    fn test_location(world: &str) -> Location {
        format!("{},0,64,0,0,0", world).parse().unwrap()
    }

    fn test_arena(state: ArenaState, timer: i32, min: u32, max: u32, players: usize) -> Arena {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let mut arena = Arena::new("colosseum", tx);
        arena.set_player_bounds(min, max);
        arena.set_lobby_location(test_location("lobby"));
        arena.set_start_location(test_location("colosseum"));
        arena.set_end_location(test_location("lobby"));
        arena.set_spectator_location(test_location("colosseum"));
        arena.set_ready(true);
        arena.set_state(state);
        arena.set_timer(timer);
        for _ in 0..players {
            arena.add_player(Uuid::new_v4());
        }
        arena
    }

    struct Ctx {
        timing: TimingConfig,
        hooks: Hooks,
        logic: BaseGameLogic,
    }

    impl Ctx {
        fn quiet() -> Self {
            Self {
                timing: TimingConfig::default(),
                hooks: Hooks::quiet(),
                logic: BaseGameLogic,
            }
        }

        fn ctx(&self) -> TickContext<'_> {
            TickContext {
                timing: &self.timing,
                hooks: &self.hooks,
                logic: &self.logic,
            }
        }
    }

    #[test]
    fn starting_below_minimum_falls_back_to_waiting() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::Starting, 10, 3, 16, 2);

        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::WaitingForPlayers);
        assert_eq!(transition.next_timer, Some(20));
    }

    #[test]
    fn starting_timer_elapsed_begins_the_game() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::Starting, 0, 3, 16, 5);

        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::InGame);
        assert_eq!(transition.next_timer, Some(270));
        assert!(transition
            .events
            .iter()
            .any(|e| matches!(e, ArenaEvent::GameStarted { .. })));
    }

    #[test]
    fn full_lobby_shortens_the_countdown() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::Starting, 40, 3, 16, 16);

        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::FullGame);
        assert_eq!(transition.next_timer, Some(15));
    }

    #[test]
    fn starting_the_game_outranks_the_full_lobby_cap() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::Starting, 0, 3, 16, 16);
        arena.set_force_start(true);

        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::InGame);
        assert!(!arena.force_start());
    }

    #[test]
    fn force_start_below_minimum_is_cleared_without_transition_to_game() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::Starting, 10, 3, 16, 1);
        arena.set_force_start(true);

        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert!(!arena.force_start());
        assert_eq!(transition.next_state, ArenaState::WaitingForPlayers);
    }

    #[test]
    fn force_start_above_minimum_skips_the_countdown() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::Starting, 45, 3, 16, 4);
        arena.set_force_start(true);

        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::InGame);
        assert!(!arena.force_start());
    }

    #[test]
    fn drained_full_lobby_reverts_to_plain_countdown() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::FullGame, 12, 3, 16, 15);

        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::Starting);
        assert_eq!(transition.next_timer, None);
    }

    #[test]
    fn full_game_keeps_counting_down_while_full() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::FullGame, 12, 3, 16, 16);

        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::FullGame);
        assert_eq!(transition.next_timer, None);
    }

    #[test]
    fn waiting_reenters_countdown_once_minimum_is_met() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::WaitingForPlayers, 7, 3, 16, 3);

        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::Starting);
        assert_eq!(transition.next_timer, Some(60));
    }

    #[test]
    fn waiting_resets_its_own_timer_when_it_runs_out() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::WaitingForPlayers, 0, 3, 16, 1);

        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::WaitingForPlayers);
        assert_eq!(transition.next_timer, Some(20));
    }

    #[test]
    fn ending_counts_down_then_restarts() {
        let ctx = Ctx::quiet();

        let mut arena = test_arena(ArenaState::Ending, 3, 3, 16, 4);
        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::Ending);
        assert_eq!(transition.next_timer, None);

        let mut arena = test_arena(ArenaState::Ending, 0, 3, 16, 4);
        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::Restarting);
        assert_eq!(transition.next_timer, Some(5));
    }

    #[test]
    fn base_logic_stops_the_game_when_play_time_runs_out() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::InGame, 0, 3, 16, 4);

        let transition = evaluate(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::Ending);
        assert_eq!(transition.next_timer, Some(10));
        assert!(transition
            .events
            .iter()
            .any(|e| matches!(e, ArenaEvent::GameStopped { .. })));
    }

    #[test]
    fn base_logic_restart_evicts_players_and_reopens_the_lobby() {
        let ctx = Ctx::quiet();
        let mut arena = test_arena(ArenaState::Restarting, 0, 3, 16, 4);

        let transition = ctx.logic.tick_restarting(&mut arena, &ctx.ctx()).unwrap();
        assert_eq!(transition.next_state, ArenaState::WaitingForPlayers);
        assert_eq!(transition.next_timer, Some(20));
        assert_eq!(arena.player_count(), 0);
    }

    #[test]
    fn starting_without_a_start_location_fails_the_evaluation() {
        let ctx = Ctx::quiet();
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let mut arena = Arena::new("broken", tx);
        arena.set_player_bounds(1, 4);
        arena.set_ready(true);
        arena.set_state(ArenaState::Starting);
        arena.set_timer(0);
        arena.add_player(Uuid::new_v4());

        let result = evaluate(&mut arena, &ctx.ctx());
        assert!(matches!(result, Err(StateError::MissingLocation("start"))));
    }

    #[derive(Default)]
    struct RecordingStats {
        increments: Mutex<Vec<(PlayerId, String)>>,
    }

    impl StatSink for RecordingStats {
        fn increment(&self, player: PlayerId, stat: &str) {
            self.increments.lock().push((player, stat.to_string()));
        }
    }

    #[test]
    fn every_starter_gets_the_games_played_statistic() {
        let stats = Arc::new(RecordingStats::default());
        let mut hooks = Hooks::quiet();
        hooks.stats = stats.clone();
        let ctx = Ctx {
            timing: TimingConfig::default(),
            hooks,
            logic: BaseGameLogic,
        };
        let mut arena = test_arena(ArenaState::Starting, 0, 3, 16, 5);

        evaluate(&mut arena, &ctx.ctx()).unwrap();

        let increments = stats.increments.lock();
        assert_eq!(increments.len(), 5);
        assert!(increments.iter().all(|(_, s)| s == GAMES_PLAYED_STAT));
    }
}
