//! Collaborator seams
//!
//! The lifecycle core never talks to the host engine directly. Rewards,
//! kits, statistics, session cosmetics, permissions, and the actual
//! minigame rules all arrive through the narrow traits below; the binary
//! wires tracing-backed implementations, tests wire quiet ones.

pub mod logging;

use std::sync::Arc;

use crate::arena::instance::Arena;
use crate::arena::states::{StateError, TickContext, Transition};
use crate::arena::{ArenaEvent, ArenaState, PlayerId};
use crate::util::location::Location;

/// Per-player statistic bumped whenever a game starts
pub const GAMES_PLAYED_STAT: &str = "games_played";

/// Which reward table to run for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardKind {
    GameStart,
    GameEnd,
}

/// Player session surface owned by the host process
pub trait PlayerHost: Send + Sync {
    /// Timer visualization: progress in `[0, 1]` plus the raw seconds level
    fn set_progress(&self, player: PlayerId, progress: f32, level: i32);
    fn teleport(&self, player: PlayerId, location: &Location);
    fn send_message(&self, player: PlayerId, message: &str);
    /// Clear inventory, reset game mode, hide outsiders before active play
    fn prepare_for_game(&self, player: PlayerId);
}

pub trait RewardHandler: Send + Sync {
    fn perform_reward(&self, player: PlayerId, arena_id: &str, kind: RewardKind);
}

pub trait KitGranter: Send + Sync {
    fn give_kit(&self, player: PlayerId);
}

pub trait StatSink: Send + Sync {
    fn increment(&self, player: PlayerId, stat: &str);
}

/// External authorization for administrative actions
pub trait Authorizer: Send + Sync {
    fn can_force_start(&self, actor: PlayerId) -> bool;
}

/// Consulted before arena membership is committed; any guard may cancel
pub trait JoinGuard: Send + Sync {
    fn allow_join(&self, player: PlayerId, arena_id: &str) -> bool;
}

/// Pluggable minigame rules for the stages this core does not define
pub trait GameLogic: Send + Sync {
    fn tick_in_game(
        &self,
        arena: &mut Arena,
        ctx: &TickContext<'_>,
    ) -> Result<Transition, StateError>;

    fn tick_restarting(
        &self,
        arena: &mut Arena,
        ctx: &TickContext<'_>,
    ) -> Result<Transition, StateError>;
}

/// The bundle of collaborators handed to the registry and the driver
pub struct Hooks {
    pub sessions: Arc<dyn PlayerHost>,
    pub rewards: Arc<dyn RewardHandler>,
    pub kits: Arc<dyn KitGranter>,
    pub stats: Arc<dyn StatSink>,
    pub auth: Arc<dyn Authorizer>,
    pub join_guards: Vec<Arc<dyn JoinGuard>>,
}

impl Hooks {
    /// No-op collaborators that allow everything; used by tests
    pub fn quiet() -> Self {
        let quiet = Arc::new(Quiet);
        Self {
            sessions: quiet.clone(),
            rewards: quiet.clone(),
            kits: quiet.clone(),
            stats: quiet.clone(),
            auth: quiet,
            join_guards: Vec::new(),
        }
    }

    /// Tracing-backed collaborators for running without a real host
    pub fn logging() -> Self {
        let bridge = Arc::new(logging::TracingBridge);
        Self {
            sessions: bridge.clone(),
            rewards: bridge.clone(),
            kits: bridge.clone(),
            stats: bridge.clone(),
            auth: bridge,
            join_guards: Vec::new(),
        }
    }
}

struct Quiet;

impl PlayerHost for Quiet {
    fn set_progress(&self, _player: PlayerId, _progress: f32, _level: i32) {}
    fn teleport(&self, _player: PlayerId, _location: &Location) {}
    fn send_message(&self, _player: PlayerId, _message: &str) {}
    fn prepare_for_game(&self, _player: PlayerId) {}
}

impl RewardHandler for Quiet {
    fn perform_reward(&self, _player: PlayerId, _arena_id: &str, _kind: RewardKind) {}
}

impl KitGranter for Quiet {
    fn give_kit(&self, _player: PlayerId) {}
}

impl StatSink for Quiet {
    fn increment(&self, _player: PlayerId, _stat: &str) {}
}

impl Authorizer for Quiet {
    fn can_force_start(&self, _actor: PlayerId) -> bool {
        true
    }
}

/// Default minigame rules: play out the clock, then wind down and reset
pub struct BaseGameLogic;

impl GameLogic for BaseGameLogic {
    fn tick_in_game(
        &self,
        arena: &mut Arena,
        ctx: &TickContext<'_>,
    ) -> Result<Transition, StateError> {
        if arena.timer() > 0 {
            return Ok(Transition::stay(ArenaState::InGame));
        }
        Ok(
            Transition::to(ArenaState::Ending, Some(ctx.timing.ending_secs)).with_event(
                ArenaEvent::GameStopped {
                    arena_id: arena.id().to_string(),
                },
            ),
        )
    }

    fn tick_restarting(
        &self,
        arena: &mut Arena,
        ctx: &TickContext<'_>,
    ) -> Result<Transition, StateError> {
        if arena.timer() > 0 {
            return Ok(Transition::stay(ArenaState::Restarting));
        }

        // Hand everyone back to the host, then reopen the lobby
        let exit = arena.end_location().cloned();
        for player in arena.players().to_vec() {
            if let Some(location) = &exit {
                ctx.hooks.sessions.teleport(player, location);
            }
            ctx.hooks
                .sessions
                .send_message(player, "The arena is restarting. Thanks for playing!");
            arena.remove_player(player);
        }

        Ok(Transition::to(
            ArenaState::WaitingForPlayers,
            Some(ctx.timing.waiting_secs),
        ))
    }
}
