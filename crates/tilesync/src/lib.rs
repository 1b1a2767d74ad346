use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

mod actor;
mod camera;
mod clock;
mod config;
pub mod content;
mod controller;
mod geom;
mod grid;
mod input;
mod interpolation;
mod prediction;
mod session;
mod sync;
mod targeting;
mod timers;

pub use actor::{Actor, ActorCue, ActorVisual, PositionSource, SessionId};
pub use camera::{FollowCamera, Viewport};
pub use clock::{FrameClock, FrameTime};
pub use config::{load_config, ConfigError, SyncConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE};
pub use content::{
    compile_def_database, AbilityDef, AbilityId, ActorDef, ActorKind, ActorStatsResolver,
    ContentCompileError, ContentErrorCode, DefDatabase, SourceLocation,
};
pub use controller::{
    ActionKind, ControllerContext, ControllerOutput, ControllerState, InputController,
    MoveThrottle, ServerLink,
};
pub use geom::{Direction, TilePos, Vec2};
pub use grid::{CollisionGrid, CollisionGridError};
pub use input::{InputAction, InputCollector, InputSnapshot, MouseButton, ABILITY_SLOTS};
pub use interpolation::{InterpolationParams, RenderInterpolator, StepKind};
pub use prediction::{PredictionStore, ReconcileOutcome, Reconciliation};
pub use session::{ClientSession, FrameReport};
pub use sync::{
    ActorSpawnError, AuthoritativeEntity, EntityCollection, EntitySynchronizer, SyncStats,
};
pub use targeting::{
    range_overlay_tiles, TargetingEndReason, TargetingEvent, TargetingMode, TargetingSession,
};
pub use timers::{TimerId, TimerQueue};

pub const ROOT_ENV_VAR: &str = "TILESYNC_ROOT";

#[derive(Debug, Clone)]
pub struct ClientPaths {
    pub root: PathBuf,
    pub content_dir: PathBuf,
    pub config_path: PathBuf,
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
        "TILESYNC_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/tilesync\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_client_paths() -> Result<ClientPaths, StartupError> {
    let root = resolve_root()?;
    let config_override = env::var_os(CONFIG_ENV_VAR);
    Ok(client_paths_for_root(root, config_override))
}

fn client_paths_for_root(root: PathBuf, config_override: Option<OsString>) -> ClientPaths {
    let content_dir = root.join("assets").join("base");
    let config_path = match config_override.filter(|value| !value.is_empty()) {
        Some(value) => PathBuf::from(value),
        None => root.join("assets").join(DEFAULT_CONFIG_FILE),
    };
    ClientPaths {
        root,
        content_dir,
        config_path,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
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
