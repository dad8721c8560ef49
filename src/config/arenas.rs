//! Arenas instance document - on-disk arena definitions

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ConfigError;

/// Key inside `instances` reserved for the operator template; never an arena.
pub const RESERVED_TEMPLATE_KEY: &str = "default";

/// The backing arenas document. One named entry per arena instance
/// under the reserved `instances` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArenasConfig {
    #[serde(default)]
    pub instances: BTreeMap<String, InstanceEntry>,
}

/// A raw, unvalidated instance definition. Locations are serialized
/// `world,x,y,z,yaw,pitch` strings; missing numeric fields fall back to
/// defaults during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimumplayers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximumplayers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lobbylocation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startlocation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endlocation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectatorlocation: Option<String>,
    /// Operator-set completion flag; cleared by the registry when
    /// validation fails so the entry is visibly broken.
    #[serde(default)]
    pub isdone: bool,
}

impl ArenasConfig {
    /// Load the document from disk. A missing file yields an empty
    /// document; a malformed one is a startup error the operator must fix.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!(path = %path.display(), "Arenas document not found, starting empty");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Persist the document back to disk (validation writes `isdone` flags).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("arena_host_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn parses_instances_section() {
        let doc: ArenasConfig = serde_json::from_str(
            r#"{
                "instances": {
                    "default": { "isdone": false },
                    "village": {
                        "minimumplayers": 2,
                        "maximumplayers": 8,
                        "mapname": "Village",
                        "lobbylocation": "lobby,0,64,0,0,0",
                        "startlocation": "village,100,70,100,0,0",
                        "endlocation": "lobby,0,64,0,0,0",
                        "spectatorlocation": "village,100,90,100,0,0",
                        "isdone": true
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(doc.instances.len(), 2);
        let village = &doc.instances["village"];
        assert_eq!(village.minimumplayers, Some(2));
        assert_eq!(village.mapname.as_deref(), Some("Village"));
        assert!(village.isdone);
    }

    #[test]
    fn absent_fields_default_to_none_and_not_done() {
        let doc: ArenasConfig =
            serde_json::from_str(r#"{ "instances": { "bare": {} } }"#).unwrap();
        let bare = &doc.instances["bare"];
        assert_eq!(bare.minimumplayers, None);
        assert_eq!(bare.startlocation, None);
        assert!(!bare.isdone);
    }

    #[test]
    fn missing_file_loads_as_empty_document() {
        let doc = ArenasConfig::load(Path::new("/nonexistent/arena_host.json")).unwrap();
        assert!(doc.instances.is_empty());
    }

    #[test]
    fn saves_and_reloads_the_document() {
        let path = temp_path("roundtrip");
        let mut doc = ArenasConfig::default();
        doc.instances.insert(
            "pit".to_string(),
            InstanceEntry {
                minimumplayers: Some(4),
                isdone: true,
                ..Default::default()
            },
        );

        doc.save(&path).unwrap();
        let reloaded = ArenasConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(reloaded.instances["pit"].minimumplayers, Some(4));
        assert!(reloaded.instances["pit"].isdone);
    }
}
