use std::str::FromStr;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FRAMES_ENV_VAR: &str = "TILESYNC_FRAMES";
const LATENCY_ENV_VAR: &str = "TILESYNC_LATENCY_MS";
const DEFAULT_FRAME_COUNT: u32 = 600;
const DEFAULT_FRAME_STEP_MS: u64 = 16;
const DEFAULT_LATENCY_MS: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DriveSettings {
    pub(crate) frame_count: u32,
    pub(crate) frame_step_ms: u64,
    pub(crate) latency_ms: f64,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            frame_count: DEFAULT_FRAME_COUNT,
            frame_step_ms: DEFAULT_FRAME_STEP_MS,
            latency_ms: DEFAULT_LATENCY_MS,
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) settings: DriveSettings,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== tilesync client startup ===");

    let settings = DriveSettings {
        frame_count: parse_env_number(FRAMES_ENV_VAR, std::env::var(FRAMES_ENV_VAR).ok())
            .unwrap_or(DEFAULT_FRAME_COUNT),
        latency_ms: parse_env_number(LATENCY_ENV_VAR, std::env::var(LATENCY_ENV_VAR).ok())
            .filter(|latency: &f64| latency.is_finite() && *latency >= 0.0)
            .unwrap_or(DEFAULT_LATENCY_MS),
        ..DriveSettings::default()
    };
    info!(
        frame_count = settings.frame_count,
        frame_step_ms = settings.frame_step_ms,
        latency_ms = settings.latency_ms,
        "drive_settings"
    );

    AppWiring { settings }
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

fn parse_env_number<T: FromStr>(var: &'static str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var, value = trimmed, "ignoring_invalid_env_value");
            None
        }
    }
}
