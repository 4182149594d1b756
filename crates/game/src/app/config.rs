use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine::world::{Hour, TimeError};
use engine::LoopConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid start_hour {value:?} in config: {source}")]
    StartHour {
        value: String,
        #[source]
        source: TimeError,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_render_fps: Option<u32>,
    /// Map registry, relative to the assets directory.
    pub maps: String,
    pub start_map: String,
    /// Player start in tiles.
    pub start_tile: [i32; 2],
    pub timescale: f32,
    pub start_hour: String,
    pub player_sprite: Option<String>,
    pub npc_sprite: Option<String>,
    pub show_overlay: bool,
    pub debug_collision: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_width: 800,
            window_height: 600,
            target_tps: 60,
            max_render_fps: None,
            maps: "maps/maps.xml".to_string(),
            start_map: "path_a".to_string(),
            start_tile: [5, 5],
            timescale: 1.0,
            start_hour: "DAWN".to_string(),
            player_sprite: None,
            npc_sprite: None,
            show_overlay: false,
            debug_collision: false,
        }
    }
}

impl GameConfig {
    pub(crate) fn start_hour(&self) -> Result<Hour, ConfigError> {
        self.start_hour
            .parse::<Hour>()
            .map_err(|source| ConfigError::StartHour {
                value: self.start_hour.clone(),
                source,
            })
    }

    pub(crate) fn loop_config(&self, assets_dir: &Path) -> LoopConfig {
        LoopConfig {
            window_width: self.window_width,
            window_height: self.window_height,
            target_tps: self.target_tps,
            max_render_fps: self.max_render_fps,
            asset_root: Some(assets_dir.to_path_buf()),
            show_overlay: self.show_overlay,
            metrics_log_interval: Duration::from_secs(5),
            ..LoopConfig::default()
        }
    }
}

/// Reads `path`, falling back to defaults when the file does not exist.
pub(crate) fn load_config(path: &Path) -> Result<GameConfig, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "config_missing_using_defaults");
            return Ok(GameConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let config = parse_config(path, &raw)?;
    config.start_hour()?;
    info!(path = %path.display(), start_map = config.start_map.as_str(), "config_loaded");
    Ok(config)
}

fn parse_config(path: &Path, raw: &str) -> Result<GameConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            json_path,
            source: error.into_inner(),
        }
    })
}
