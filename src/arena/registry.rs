//! Arena registry - the authoritative collection of live arenas
//!
//! Owns every `Arena`, validates on-disk instance definitions, and indexes
//! arenas by id, by player, and by world. Mutation and tick iteration are
//! serialized on the collection's write lock, so the driver never iterates
//! concurrently with a register/unregister.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::arenas::{ArenasConfig, InstanceEntry, RESERVED_TEMPLATE_KEY};
use crate::hooks::Hooks;
use crate::util::location::Location;
use crate::util::time::Timer;

use super::events::{ArenaEvent, EVENT_CHANNEL_CAPACITY};
use super::instance::Arena;
use super::states::{self, TickContext};
use super::PlayerId;

/// Join workflow rejections. Lookup misses are part of normal control
/// flow, not faults.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("no arena with id `{0}`")]
    UnknownArena(String),

    #[error("arena `{0}` has not passed validation")]
    NotReady(String),

    #[error("arena `{0}` is full")]
    Full(String),

    #[error("player is already in arena `{0}`")]
    AlreadyPlaying(String),

    #[error("join was cancelled by a collaborator")]
    Cancelled,
}

/// Administrative action rejections
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    #[error("actor lacks the force-start capability")]
    NotPermitted,

    #[error("no arena with id `{0}`")]
    UnknownArena(String),
}

/// Why an instance definition was rejected during `load_all`
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("location `{0}` is missing or malformed")]
    BadLocation(&'static str),

    #[error("player bounds are invalid (minimum {minimum}, maximum {maximum})")]
    PlayerBounds { minimum: u32, maximum: u32 },

    #[error("instance is not marked done by its operator")]
    NotMarkedDone,
}

/// Outcome counts of one `load_all` pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub registered: usize,
    pub ready: usize,
    pub failed: usize,
}

pub struct ArenaRegistry {
    arenas: RwLock<Vec<Arena>>,
    /// Multiset of worlds referenced by any registered location
    arena_worlds: RwLock<Vec<String>>,
    /// Multiset of worlds hosting active play (start locations)
    arena_ingame_worlds: RwLock<Vec<String>>,
    /// Cached index for cross-instance routing
    routed_arena: Mutex<Option<usize>>,
    events: broadcast::Sender<ArenaEvent>,
    hooks: Arc<Hooks>,
}

impl ArenaRegistry {
    pub fn new(hooks: Arc<Hooks>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            arenas: RwLock::new(Vec::new()),
            arena_worlds: RwLock::new(Vec::new()),
            arena_ingame_worlds: RwLock::new(Vec::new()),
            routed_arena: Mutex::new(None),
            events,
            hooks,
        }
    }

    /// Subscribe to lifecycle notifications from every arena
    pub fn subscribe(&self) -> broadcast::Receiver<ArenaEvent> {
        self.events.subscribe()
    }

    /// Construct an arena wired to this registry's notification channel
    pub fn new_arena(&self, id: impl Into<String>) -> Arena {
        Arena::new(id, self.events.clone())
    }

    /// Append an arena and derive its worlds into the membership sets.
    /// Does not deduplicate ids; callers reloading an instance unregister
    /// the old arena first.
    pub fn register(&self, arena: Arena) {
        debug!(arena_id = %arena.id(), "Instance registered");
        let mut arenas = self.arenas.write();
        let was_empty = arenas.is_empty();
        {
            let mut worlds = self.arena_worlds.write();
            let mut ingame = self.arena_ingame_worlds.write();
            if let Some(start) = arena.start_location() {
                ingame.push(start.world.clone());
                worlds.push(start.world.clone());
            }
            if let Some(end) = arena.end_location() {
                worlds.push(end.world.clone());
            }
            if let Some(lobby) = arena.lobby_location() {
                worlds.push(lobby.world.clone());
            }
        }
        arenas.push(arena);
        drop(arenas);

        if was_empty {
            self.reroll_routed_arena();
        }
    }

    /// Remove an arena, evicting any remaining players first and
    /// reversing the world bookkeeping. A second call for the same id is
    /// a no-op, so unregistration is idempotent.
    pub fn unregister(&self, id: &str) -> bool {
        let mut arenas = self.arenas.write();
        let Some(index) = arenas
            .iter()
            .position(|arena| arena.id().eq_ignore_ascii_case(id))
        else {
            return false;
        };
        let mut arena = arenas.remove(index);

        // Never destroy an arena while it still holds players
        let exit = arena
            .end_location()
            .or_else(|| arena.lobby_location())
            .cloned();
        for player in arena.players().to_vec() {
            if let Some(location) = &exit {
                self.hooks.sessions.teleport(player, location);
            }
            arena.remove_player(player);
        }

        {
            let mut worlds = self.arena_worlds.write();
            let mut ingame = self.arena_ingame_worlds.write();
            if let Some(start) = arena.start_location() {
                remove_one(&mut ingame, &start.world);
                remove_one(&mut worlds, &start.world);
            }
            if let Some(end) = arena.end_location() {
                remove_one(&mut worlds, &end.world);
            }
            if let Some(lobby) = arena.lobby_location() {
                remove_one(&mut worlds, &lobby.world);
            }
        }

        debug!(arena_id = %arena.id(), "Instance unregistered");
        true
    }

    pub fn arena_count(&self) -> usize {
        self.arenas.read().len()
    }

    pub fn arena_ids(&self) -> Vec<String> {
        self.arenas
            .read()
            .iter()
            .map(|arena| arena.id().to_string())
            .collect()
    }

    pub fn players_online(&self) -> usize {
        self.arenas
            .read()
            .iter()
            .map(|arena| arena.player_count())
            .sum()
    }

    /// Case-insensitive id lookup; `None` is a normal outcome
    pub fn with_arena<R>(&self, id: &str, f: impl FnOnce(&Arena) -> R) -> Option<R> {
        let arenas = self.arenas.read();
        arenas
            .iter()
            .find(|arena| arena.id().eq_ignore_ascii_case(id))
            .map(f)
    }

    pub fn with_arena_mut<R>(&self, id: &str, f: impl FnOnce(&mut Arena) -> R) -> Option<R> {
        let mut arenas = self.arenas.write();
        arenas
            .iter_mut()
            .find(|arena| arena.id().eq_ignore_ascii_case(id))
            .map(f)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.with_arena(id, |_| ()).is_some()
    }

    /// Linear scan for the arena holding this player. The join workflow
    /// keeps a player in at most one arena at any instant.
    pub fn find_by_player(&self, player: PlayerId) -> Option<String> {
        let arenas = self.arenas.read();
        arenas
            .iter()
            .find(|arena| arena.has_player(player))
            .map(|arena| arena.id().to_string())
    }

    /// Commit arena membership after capacity, readiness, and the
    /// cancellable join guards all pass
    pub fn join(&self, player: PlayerId, id: &str) -> Result<(), JoinError> {
        // Guards are collaborator code; run them outside the collection lock
        for guard in &self.hooks.join_guards {
            if !guard.allow_join(player, id) {
                return Err(JoinError::Cancelled);
            }
        }

        let mut arenas = self.arenas.write();
        if let Some(current) = arenas.iter().find(|arena| arena.has_player(player)) {
            return Err(JoinError::AlreadyPlaying(current.id().to_string()));
        }
        let arena = arenas
            .iter_mut()
            .find(|arena| arena.id().eq_ignore_ascii_case(id))
            .ok_or_else(|| JoinError::UnknownArena(id.to_string()))?;
        if !arena.ready() {
            return Err(JoinError::NotReady(arena.id().to_string()));
        }
        if arena.is_full() {
            return Err(JoinError::Full(arena.id().to_string()));
        }
        arena.add_player(player);
        Ok(())
    }

    /// Remove the player from whichever arena holds them, if any
    pub fn leave(&self, player: PlayerId) -> Option<String> {
        let mut arenas = self.arenas.write();
        let arena = arenas.iter_mut().find(|arena| arena.has_player(player))?;
        arena.remove_player(player);
        Some(arena.id().to_string())
    }

    /// Administrative force-start. Requires the authorizer capability;
    /// a no-op (`Ok(false)`) outside the countdown-eligible stages.
    pub fn force_start(
        &self,
        actor: PlayerId,
        id: &str,
        timer: Option<i32>,
    ) -> Result<bool, AdminError> {
        if !self.hooks.auth.can_force_start(actor) {
            return Err(AdminError::NotPermitted);
        }
        self.with_arena_mut(id, |arena| {
            if !arena.state().accepts_force_start() {
                return false;
            }
            arena.set_force_start(true);
            if let Some(timer) = timer {
                arena.set_timer(timer);
            }
            true
        })
        .ok_or_else(|| AdminError::UnknownArena(id.to_string()))
    }

    /// Cached random arena index for cross-instance routing. `None` when
    /// the registry is empty; re-rolled on the empty-to-non-empty edge and
    /// whenever the cached index has gone stale.
    pub fn pick_random_arena(&self) -> Option<usize> {
        let arenas = self.arenas.read();
        if arenas.is_empty() {
            return None;
        }
        let mut routed = self.routed_arena.lock();
        match *routed {
            Some(index) if index < arenas.len() => Some(index),
            _ => {
                let index = rand::thread_rng().gen_range(0..arenas.len());
                *routed = Some(index);
                Some(index)
            }
        }
    }

    pub fn reroll_routed_arena(&self) {
        let arenas = self.arenas.read();
        let mut routed = self.routed_arena.lock();
        *routed = if arenas.is_empty() {
            None
        } else {
            Some(rand::thread_rng().gen_range(0..arenas.len()))
        };
    }

    pub fn arena_worlds(&self) -> Vec<String> {
        self.arena_worlds.read().clone()
    }

    pub fn ingame_worlds(&self) -> Vec<String> {
        self.arena_ingame_worlds.read().clone()
    }

    /// Populate the registry from the arenas document. Every named
    /// instance (except the reserved template key) is registered whether
    /// or not validation passed; readiness gates whether it accepts
    /// players. Failed entries get `isdone` cleared in the document so
    /// operators can see and fix them.
    pub fn load_all(&self, config: &mut ArenasConfig) -> LoadSummary {
        debug!("Initial arenas registration");
        let timer = Timer::new();

        for id in self.arena_ids() {
            self.unregister(&id);
        }

        let mut summary = LoadSummary::default();
        let ids: Vec<String> = config.instances.keys().cloned().collect();
        for id in ids {
            if id.eq_ignore_ascii_case(RESERVED_TEMPLATE_KEY) {
                continue;
            }
            let entry = config.instances[&id].clone();
            let mut arena = self.new_arena(&id);
            summary.registered += 1;

            match validate_instance(&mut arena, &entry) {
                Ok(()) => {
                    arena.set_ready(true);
                    let arena_id = arena.id().to_string();
                    self.register(arena);
                    // start-up hook: world/sign refresh collaborators listen
                    let _ = self.events.send(ArenaEvent::ArenaReady {
                        arena_id: arena_id.clone(),
                    });
                    info!(arena_id = %arena_id, "Instance validated and started");
                    summary.ready += 1;
                }
                Err(reason) => {
                    warn!(arena_id = %id, %reason, "Invalid arena configuration, registered unready");
                    if let Some(entry) = config.instances.get_mut(&id) {
                        entry.isdone = false;
                    }
                    self.register(arena);
                    summary.failed += 1;
                }
            }
        }

        info!(
            elapsed_ms = timer.elapsed_ms(),
            registered = summary.registered,
            ready = summary.ready,
            "Arenas registration completed"
        );
        summary
    }

    /// Evaluate every ready arena once. Holds the write lock across the
    /// whole iteration so registration cannot interleave with a tick. An
    /// evaluation failure marks only that arena unready; the others keep
    /// ticking.
    pub fn tick_all(&self, ctx: &TickContext<'_>) {
        let mut arenas = self.arenas.write();
        for arena in arenas.iter_mut() {
            if !arena.ready() {
                continue;
            }
            match states::evaluate(arena, ctx) {
                Ok(transition) => arena.apply(transition),
                Err(error) => {
                    warn!(
                        arena_id = %arena.id(),
                        state = %arena.state(),
                        %error,
                        "Evaluation failed, marking arena unready"
                    );
                    arena.set_ready(false);
                }
            }
        }
    }
}

/// Two-phase validation of one instance definition: numeric bounds and
/// map name first (with defaults), then the four required locations and
/// the operator completion flag.
fn validate_instance(arena: &mut Arena, entry: &InstanceEntry) -> Result<(), ValidationError> {
    let minimum = entry.minimumplayers.unwrap_or(3);
    let maximum = entry.maximumplayers.unwrap_or(16);
    if minimum < 1 || minimum > maximum {
        return Err(ValidationError::PlayerBounds { minimum, maximum });
    }
    arena.set_player_bounds(minimum, maximum);
    arena.set_map_name(
        entry
            .mapname
            .clone()
            .unwrap_or_else(|| arena.id().to_string()),
    );

    arena.set_lobby_location(parse_location(&entry.lobbylocation, "lobbylocation")?);
    arena.set_start_location(parse_location(&entry.startlocation, "startlocation")?);
    arena.set_end_location(parse_location(&entry.endlocation, "endlocation")?);
    arena.set_spectator_location(parse_location(
        &entry.spectatorlocation,
        "spectatorlocation",
    )?);

    if !entry.isdone {
        return Err(ValidationError::NotMarkedDone);
    }
    Ok(())
}

fn parse_location(
    raw: &Option<String>,
    field: &'static str,
) -> Result<Location, ValidationError> {
    raw.as_deref()
        .and_then(|serialized| serialized.parse().ok())
        .ok_or(ValidationError::BadLocation(field))
}

fn remove_one(worlds: &mut Vec<String>, world: &str) {
    if let Some(index) = worlds.iter().position(|w| w == world) {
        worlds.remove(index);
    }
}
