use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod ai;
pub mod app;
pub mod combat;
pub mod config;
mod digest;
pub mod entity;
pub mod grid;
pub mod movement;
pub mod nav;
pub mod projection;
pub mod world;

pub use ai::{AiState, AiTransition, Behavior};
pub use app::{
    run_headless, run_headless_with_metrics, AppError, InputAction, InputSnapshot, InputSource,
    LoopConfig, LoopSummary, MetricsHandle, TickMetrics,
};
pub use combat::{CombatPhase, CombatScheduler, CombatTransition, TurnEvent};
pub use config::{AiConfig, Chance, CombatConfig, ConfigError, MovementConfig, SimConfig};
pub use entity::{
    ActionPoints, Entity, EntityError, EntityId, EntityRole, EntityStore, MovementPhase,
    MAX_ENTITIES,
};
pub use grid::{
    Direction, GridMap, MapLoadError, TileCoord, TileDef, TileId, DEFAULT_MAP_HEIGHT,
    DEFAULT_MAP_WIDTH,
};
pub use movement::{AssignOutcome, MovementEvent, StepBlock, StepGate};
pub use nav::{compute_reachable, find_path, MoveRange, Path as TilePath, PathError, RangeTile};
pub use projection::{IsoProjection, ScreenPoint, Vec2, Viewport};
pub use world::{ClickOutcome, TickReport, World, WorldError};

pub const ROOT_ENV_VAR: &str = "ISO_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub maps_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl AppPaths {
    pub fn default_map_path(&self) -> PathBuf {
        self.maps_dir.join("test_map.txt")
    }

    pub fn default_config_path(&self) -> PathBuf {
        self.config_dir.join("sim.json")
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "ISO_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/iso-sim\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    Ok(app_paths_for_root(root))
}

fn app_paths_for_root(root: PathBuf) -> AppPaths {
    let assets_dir = root.join("assets");
    AppPaths {
        maps_dir: assets_dir.join("maps"),
        config_dir: assets_dir.join("config"),
        assets_dir,
        root,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
