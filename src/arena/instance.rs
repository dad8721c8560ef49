//! Arena state and the mutable record of one game instance

use std::fmt;

use tokio::sync::broadcast;

use crate::util::location::Location;

use super::events::ArenaEvent;
use super::states::Transition;
use super::PlayerId;

/// Lifecycle stage of an arena. The set is closed; ordering exists for
/// debugging and log output only, transitions are handler-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArenaState {
    WaitingForPlayers,
    Starting,
    /// Starting with the countdown capped because the lobby is full
    FullGame,
    InGame,
    Ending,
    Restarting,
}

impl fmt::Display for ArenaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WaitingForPlayers => "WAITING_FOR_PLAYERS",
            Self::Starting => "STARTING",
            Self::FullGame => "FULL_GAME",
            Self::InGame => "IN_GAME",
            Self::Ending => "ENDING",
            Self::Restarting => "RESTARTING",
        };
        f.write_str(name)
    }
}

impl ArenaState {
    /// Stages in which an administrative force-start is honored
    pub fn accepts_force_start(self) -> bool {
        matches!(
            self,
            Self::WaitingForPlayers | Self::Starting | Self::FullGame
        )
    }
}

/// The mutable record of one game instance. Owned exclusively by the
/// registry; players are weak references (session objects belong to the
/// host), membership is a relation, not ownership.
#[derive(Debug)]
pub struct Arena {
    id: String,
    map_name: String,
    state: ArenaState,
    timer: i32,
    minimum_players: u32,
    maximum_players: u32,
    force_start: bool,
    ready: bool,
    players: Vec<PlayerId>,
    lobby_location: Option<Location>,
    start_location: Option<Location>,
    end_location: Option<Location>,
    spectator_location: Option<Location>,
    notify: broadcast::Sender<ArenaEvent>,
}

impl Arena {
    pub fn new(id: impl Into<String>, notify: broadcast::Sender<ArenaEvent>) -> Self {
        let id = id.into();
        Self {
            map_name: id.clone(),
            id,
            state: ArenaState::WaitingForPlayers,
            timer: 0,
            minimum_players: 3,
            maximum_players: 16,
            force_start: false,
            ready: false,
            players: Vec::new(),
            lobby_location: None,
            start_location: None,
            end_location: None,
            spectator_location: None,
            notify,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn set_map_name(&mut self, name: impl Into<String>) {
        self.map_name = name.into();
    }

    pub fn state(&self) -> ArenaState {
        self.state
    }

    pub fn timer(&self) -> i32 {
        self.timer
    }

    pub fn minimum_players(&self) -> u32 {
        self.minimum_players
    }

    pub fn maximum_players(&self) -> u32 {
        self.maximum_players
    }

    /// Invariant: 1 <= min <= max, checked by registry validation
    pub fn set_player_bounds(&mut self, minimum: u32, maximum: u32) {
        self.minimum_players = minimum;
        self.maximum_players = maximum;
    }

    pub fn force_start(&self) -> bool {
        self.force_start
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.maximum_players as usize
    }

    pub fn has_player(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    pub fn lobby_location(&self) -> Option<&Location> {
        self.lobby_location.as_ref()
    }

    pub fn start_location(&self) -> Option<&Location> {
        self.start_location.as_ref()
    }

    pub fn end_location(&self) -> Option<&Location> {
        self.end_location.as_ref()
    }

    pub fn spectator_location(&self) -> Option<&Location> {
        self.spectator_location.as_ref()
    }

    pub fn set_lobby_location(&mut self, location: Location) {
        self.lobby_location = Some(location);
    }

    pub fn set_start_location(&mut self, location: Location) {
        self.start_location = Some(location);
    }

    pub fn set_end_location(&mut self, location: Location) {
        self.end_location = Some(location);
    }

    pub fn set_spectator_location(&mut self, location: Location) {
        self.spectator_location = Some(location);
    }

    /// Swap lifecycle stage and notify observers
    pub fn set_state(&mut self, state: ArenaState) {
        self.state = state;
        self.emit(ArenaEvent::StateChanged {
            arena_id: self.id.clone(),
            new_state: state,
        });
    }

    /// Override the countdown timer and notify observers
    pub fn set_timer(&mut self, timer: i32) {
        self.timer = timer;
        self.emit(ArenaEvent::TimerSet {
            arena_id: self.id.clone(),
            timer,
        });
    }

    pub fn set_force_start(&mut self, force_start: bool) {
        if self.force_start == force_start {
            return;
        }
        self.force_start = force_start;
        self.emit(ArenaEvent::ForceStartChanged {
            arena_id: self.id.clone(),
            force_start,
        });
    }

    /// Add a player reference. Duplicate ids are rejected; the join
    /// workflow guarantees a player is in at most one arena.
    pub fn add_player(&mut self, player: PlayerId) -> bool {
        if self.players.contains(&player) {
            return false;
        }
        self.players.push(player);
        self.emit(ArenaEvent::PlayerJoined {
            arena_id: self.id.clone(),
            player,
        });
        true
    }

    pub fn remove_player(&mut self, player: PlayerId) -> bool {
        let Some(index) = self.players.iter().position(|p| *p == player) else {
            return false;
        };
        self.players.remove(index);
        self.emit(ArenaEvent::PlayerLeft {
            arena_id: self.id.clone(),
            player,
        });
        true
    }

    /// Apply the transition returned by this tick's evaluation: swap the
    /// stage only when it changed, override the timer only when the
    /// evaluation asked for it, otherwise decrement naturally.
    pub fn apply(&mut self, transition: Transition) {
        if transition.next_state != self.state {
            self.set_state(transition.next_state);
        }
        match transition.next_timer {
            Some(timer) => self.set_timer(timer),
            None => self.set_timer(self.timer - 1),
        }
        for event in transition.events {
            self.emit(event);
        }
    }

    pub(crate) fn emit(&self, event: ArenaEvent) {
        // Nobody listening is fine
        let _ = self.notify.send(event);
    }
}
