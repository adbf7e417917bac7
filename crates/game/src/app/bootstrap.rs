use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use engine::{
    resolve_app_paths, AppError, ConfigError, EntityRole, GridMap, LoopConfig, SimConfig, World,
    DEFAULT_MAP_HEIGHT, DEFAULT_MAP_WIDTH,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use super::session::ScriptedSession;

const CONFIG_ENV_VAR: &str = "ISO_CONFIG";
const MAP_ENV_VAR: &str = "ISO_MAP";
const MAX_TICKS_ENV_VAR: &str = "ISO_MAX_TICKS";
const PACED_ENV_VAR: &str = "ISO_PACED";

const PLAYER_SPAWN: (i32, i32) = (5, 5);
const NPC_SPAWNS: [(i32, i32); 1] = [(10, 10)];

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) world: World,
    pub(crate) session: ScriptedSession,
}

pub(crate) fn build_app() -> Result<AppWiring, ExitCode> {
    init_tracing();
    info!("=== Iso Sim Startup ===");

    wire_app().map_err(|err| {
        error!(error = %err, "startup_failed");
        ExitCode::FAILURE
    })
}

fn wire_app() -> Result<AppWiring, AppError> {
    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        assets_dir = %paths.assets_dir.display(),
        "startup"
    );

    let config_path = env_path(CONFIG_ENV_VAR).unwrap_or_else(|| paths.default_config_path());
    let sim_config = match SimConfig::load(&config_path) {
        Ok(config) => {
            info!(path = %config_path.display(), "config_loaded");
            config
        }
        Err(ConfigError::Io { path, source }) if source.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "config_missing_using_defaults");
            SimConfig::default()
        }
        Err(err) => return Err(err.into()),
    };

    let map_path = env_path(MAP_ENV_VAR).unwrap_or_else(|| paths.default_map_path());
    let map = GridMap::load(&map_path, DEFAULT_MAP_WIDTH, DEFAULT_MAP_HEIGHT)?;
    let world = build_explore_scene(map, sim_config)?;

    let config = LoopConfig {
        max_ticks: Some(parse_max_ticks(env::var(MAX_TICKS_ENV_VAR).ok().as_deref())),
        paced: parse_enabled_flag(env::var(PACED_ENV_VAR).ok().as_deref()),
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        world,
        session: ScriptedSession::demo(),
    })
}

pub(crate) fn build_explore_scene(map: GridMap, config: SimConfig) -> Result<World, AppError> {
    let mut world = World::new(map, config);
    let (x, y) = PLAYER_SPAWN;
    world.spawn(x, y, EntityRole::Player)?;
    for (x, y) in NPC_SPAWNS {
        world.spawn(x, y, EntityRole::Npc)?;
    }
    world.refresh_move_range();
    info!(
        scene = "explore",
        entity_count = world.entities().len(),
        width = world.map().width(),
        height = world.map().height(),
        "scene_loaded"
    );
    Ok(world)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn parse_max_ticks(raw: Option<&str>) -> u64 {
    let default = LoopConfig::default().max_ticks.unwrap_or(600);
    match raw.map(str::trim) {
        None | Some("") => default,
        Some(value) => value.parse::<u64>().unwrap_or_else(|_| {
            warn!(
                env_var = MAX_TICKS_ENV_VAR,
                value, "invalid tick limit; falling back to default"
            );
            default
        }),
    }
}

fn parse_enabled_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explore_scene_spawns_player_first() {
        let map = GridMap::filled(20, 20, 0).expect("map");
        let world = build_explore_scene(map, SimConfig::default()).expect("scene");
        assert_eq!(world.entities().len(), 2);
        let player = world.player().expect("player");
        assert_eq!(player.id.0, 0);
        assert_eq!((player.position.x, player.position.y), PLAYER_SPAWN);
        assert_eq!(world.move_range().origin(), Some(player.position));
    }

    #[test]
    fn explore_scene_respects_entity_cap() {
        let map = GridMap::filled(20, 20, 0).expect("map");
        let mut config = SimConfig::default();
        config.max_entities = 1;
        let err = build_explore_scene(map, config).expect_err("cap");
        assert!(matches!(err, AppError::SceneSetup(_)));
    }

    #[test]
    fn max_ticks_parsing_falls_back_on_garbage() {
        assert_eq!(parse_max_ticks(None), 600);
        assert_eq!(parse_max_ticks(Some(" 42 ")), 42);
        assert_eq!(parse_max_ticks(Some("lots")), 600);
    }

    #[test]
    fn enabled_flag_accepts_common_truthy_values() {
        assert!(parse_enabled_flag(Some("1")));
        assert!(parse_enabled_flag(Some("TRUE")));
        assert!(!parse_enabled_flag(Some("0")));
        assert!(!parse_enabled_flag(None));
    }
}
