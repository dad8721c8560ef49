//! Serialized location codec (`world,x,y,z,yaw,pitch`)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A point in a named world, with orientation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

/// Location string parse failure
#[derive(Debug, thiserror::Error)]
pub enum LocationParseError {
    #[error("expected 6 comma-separated fields, got {0}")]
    FieldCount(usize),

    #[error("world name is empty")]
    EmptyWorld,

    #[error("invalid numeric field `{0}`")]
    InvalidNumber(String),
}

impl FromStr for Location {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 6 {
            return Err(LocationParseError::FieldCount(parts.len()));
        }

        let world = parts[0].to_string();
        if world.is_empty() {
            return Err(LocationParseError::EmptyWorld);
        }

        fn num<T: FromStr>(raw: &str) -> Result<T, LocationParseError> {
            raw.parse()
                .map_err(|_| LocationParseError::InvalidNumber(raw.to_string()))
        }

        Ok(Self {
            world,
            x: num(parts[1])?,
            y: num(parts[2])?,
            z: num(parts[3])?,
            yaw: num(parts[4])?,
            pitch: num(parts[5])?,
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.world, self.x, self.y, self.z, self.yaw, self.pitch
        )
    }
}
