//! Lifecycle notifications emitted by arenas and the registry

use super::instance::ArenaState;
use super::PlayerId;

/// Broadcast channel capacity for lifecycle notifications
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notification fanned out to UI/reward/stat collaborators.
/// Dispatched over a `tokio::sync::broadcast` channel; arenas never
/// block on slow or absent subscribers.
#[derive(Debug, Clone)]
pub enum ArenaEvent {
    StateChanged {
        arena_id: String,
        new_state: ArenaState,
    },
    TimerSet {
        arena_id: String,
        timer: i32,
    },
    ForceStartChanged {
        arena_id: String,
        force_start: bool,
    },
    GameStarted {
        arena_id: String,
    },
    GameStopped {
        arena_id: String,
    },
    PlayerJoined {
        arena_id: String,
        player: PlayerId,
    },
    PlayerLeft {
        arena_id: String,
        player: PlayerId,
    },
    /// Start-up hook fired when a validated arena is registered
    /// (world/sign refresh collaborators listen for this).
    ArenaReady {
        arena_id: String,
    },
}
