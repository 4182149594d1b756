use engine::{resolve_app_paths, LoopConfig, Scene, StartupError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{load_config, ConfigError};
use super::gameplay::{self, MapScene, WorldSetupError};

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Paths(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    World(#[from] WorldSetupError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    info!("=== Tileworld Startup ===");

    let paths = resolve_app_paths()?;
    let config = load_config(&paths.config_path)?;
    let world = gameplay::build_world(&config, &paths.assets_dir)?;
    info!(
        root = %paths.root.display(),
        assets = %paths.assets_dir.display(),
        "startup_paths"
    );

    Ok(AppWiring {
        config: config.loop_config(&paths.assets_dir),
        scene: Box::new(MapScene::new(world)),
    })
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
