//! Tracing-backed collaborators
//!
//! Stands in for the host engine when the binary runs on its own: every
//! side effect the lifecycle asks for is logged instead of rendered.

use tracing::{debug, info};

use crate::arena::PlayerId;
use crate::util::location::Location;

use super::{Authorizer, KitGranter, PlayerHost, RewardHandler, RewardKind, StatSink};

pub struct TracingBridge;

impl PlayerHost for TracingBridge {
    fn set_progress(&self, player: PlayerId, progress: f32, level: i32) {
        debug!(%player, progress, level, "progress bar update");
    }

    fn teleport(&self, player: PlayerId, location: &Location) {
        debug!(%player, %location, "teleport");
    }

    fn send_message(&self, player: PlayerId, message: &str) {
        debug!(%player, message, "arena message");
    }

    fn prepare_for_game(&self, player: PlayerId) {
        debug!(%player, "prepared for game");
    }
}

impl RewardHandler for TracingBridge {
    fn perform_reward(&self, player: PlayerId, arena_id: &str, kind: RewardKind) {
        info!(%player, arena_id, ?kind, "reward granted");
    }
}

impl KitGranter for TracingBridge {
    fn give_kit(&self, player: PlayerId) {
        debug!(%player, "kit granted");
    }
}

impl StatSink for TracingBridge {
    fn increment(&self, player: PlayerId, stat: &str) {
        debug!(%player, stat, "statistic incremented");
    }
}

impl Authorizer for TracingBridge {
    fn can_force_start(&self, actor: PlayerId) -> bool {
        debug!(%actor, "force-start authorized (no permission backend wired)");
        true
    }
}
