//! Arena lifecycle core

pub mod events;
pub mod instance;
pub mod registry;
pub mod scheduler;
pub mod states;

pub use events::ArenaEvent;
pub use instance::{Arena, ArenaState};
pub use registry::ArenaRegistry;
pub use scheduler::Scheduler;

use uuid::Uuid;

/// Stable player identity. Session objects stay with the host process;
/// arenas only relate to players by id.
pub type PlayerId = Uuid;
