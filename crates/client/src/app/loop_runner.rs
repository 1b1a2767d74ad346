use std::process::ExitCode;
use std::time::{Duration, Instant};

use thiserror::Error;
use tilesync::{
    compile_def_database, load_config, resolve_client_paths, ActorSpawnError, ActorStatsResolver,
    ClientSession, CollisionGrid, CollisionGridError, ConfigError, ContentCompileError,
    FrameClock, InputAction, InputSnapshot, SessionId, StartupError, SyncConfig, SyncStats,
    TargetingEvent, Vec2, Viewport,
};
use tracing::{debug, error, info};

use super::bootstrap::{AppWiring, DriveSettings};
use super::loopback::{LoopbackServer, LoopbackStats, ServerEvent};
use super::script::{
    guard_route, scripted_frame, ScriptedFrame, WorldEvent, BAT, BAT_TILE, GUARD, LOCAL_KIND,
    LOCAL_SESSION, LOCAL_SPAWN, MAP_ROWS, MERCHANT, MERCHANT_TILE,
};

const VIEWPORT: Viewport = Viewport {
    width: 800,
    height: 608,
};
const STATUS_EVERY_FRAMES: u32 = 60;

#[derive(Debug, Error)]
pub(crate) enum ClientError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Content(#[from] ContentCompileError),
    #[error("invalid loopback map: {0}")]
    Map(#[from] CollisionGridError),
    #[error(transparent)]
    Spawn(#[from] ActorSpawnError),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DriveSummary {
    pub(crate) frames: u32,
    pub(crate) sync: SyncStats,
    pub(crate) loopback: LoopbackStats,
    pub(crate) targeting_begun: u32,
    pub(crate) cue_events: u32,
    pub(crate) debug_line: String,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match start(app.settings) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                predictions = summary.sync.predictions,
                confirmations = summary.sync.confirmations,
                hard_corrections = summary.sync.hard_corrections,
                timeout_corrections = summary.sync.timeout_corrections,
                teleport_snaps = summary.sync.teleport_snaps,
                spawns = summary.sync.spawns,
                despawns = summary.sync.despawns,
                rejected_spawns = summary.sync.rejected_spawns,
                moves_applied = summary.loopback.moves_applied,
                moves_rejected = summary.loopback.moves_rejected,
                targeting_begun = summary.targeting_begun,
                cue_events = summary.cue_events,
                status = %summary.debug_line,
                "client_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}

fn start(settings: DriveSettings) -> Result<DriveSummary, ClientError> {
    let paths = resolve_client_paths()?;
    info!(root = %paths.root.display(), "client_root_resolved");
    let config = load_config(&paths.config_path)?;
    info!(path = %paths.config_path.display(), "config_loaded");
    let defs = compile_def_database(&paths.content_dir)?;
    drive(&defs, config, settings)
}

pub(crate) fn drive<R: ActorStatsResolver>(
    resolver: R,
    config: SyncConfig,
    settings: DriveSettings,
) -> Result<DriveSummary, ClientError> {
    let grid = CollisionGrid::from_rows(&MAP_ROWS)?;
    let local = SessionId::new(LOCAL_SESSION);
    let mut server = LoopbackServer::new(grid, settings.latency_ms, local.clone());
    server.spawn(local.clone(), LOCAL_KIND.token(), LOCAL_SPAWN);
    server.spawn_patrol(SessionId::new(GUARD), "orc", guard_route());
    server.spawn(SessionId::new(MERCHANT), "merchant", MERCHANT_TILE);
    server.spawn(SessionId::new(BAT), "bat", BAT_TILE);
    let session_grid = server.grid().clone();

    let tile_size_px = config.tile_size_px;
    let max_frame_delta = Duration::from_millis(config.max_frame_delta_ms);
    let mut session =
        ClientSession::new(resolver, local.clone(), LOCAL_KIND, config, VIEWPORT, server)?
            .with_collision_grid(session_grid);

    let start = Instant::now();
    let mut clock = FrameClock::starting_at(start, max_frame_delta);
    let mut targeting_begun = 0;
    let mut cue_events = 0;

    for frame in 0..settings.frame_count {
        let instant = start + Duration::from_millis(settings.frame_step_ms * u64::from(frame + 1));
        let time = clock.tick_at(instant);
        let step = scripted_frame(frame);

        if let Some(event) = step.world {
            apply_world_event(session.link_mut(), &local, event);
        }
        let server_events = session.link_mut().tick(time.now_ms);
        for event in server_events {
            let applied = match &event {
                ServerEvent::Hit(session_id) => session.on_hit(session_id, time.now_ms),
                ServerEvent::Speaking(session_id) => session.on_speaking(session_id, time.now_ms),
            };
            if applied {
                cue_events += 1;
            }
        }

        let input = scripted_input(&step, &session, tile_size_px);
        let snapshot = session.link().entities().clone();
        let report = session.frame(&input, &snapshot, time);
        targeting_begun += report
            .targeting_events
            .iter()
            .filter(|event| matches!(event, TargetingEvent::Began(_)))
            .count() as u32;

        if frame % STATUS_EVERY_FRAMES == 0 {
            debug!(frame, status = %session.debug_line(), "sync_status");
        }
    }

    Ok(DriveSummary {
        frames: settings.frame_count,
        sync: session.sync().stats(),
        loopback: session.link().stats(),
        targeting_begun,
        cue_events,
        debug_line: session.debug_line(),
    })
}

fn apply_world_event(server: &mut LoopbackServer, local: &SessionId, event: WorldEvent) {
    match event {
        WorldEvent::Teleport(name, tile) => server.teleport(&SessionId::new(name), tile),
        WorldEvent::Despawn(name) => server.despawn(&SessionId::new(name)),
        WorldEvent::SetLocalStunned(stunned) => server.set_stunned(local, stunned),
    }
}

fn scripted_input<R: ActorStatsResolver>(
    step: &ScriptedFrame,
    session: &ClientSession<R, LoopbackServer>,
    tile_size_px: f32,
) -> InputSnapshot {
    let mut input = InputSnapshot::empty().with_secondary_click_pressed(step.secondary_click);
    if let Some(direction) = step.hold {
        input = input.with_action_down(InputAction::for_direction(direction), true);
    }
    if let Some(action) = step.press {
        input = input.with_action_pressed(action);
    }
    let clicked_tile = step
        .click_entity
        .and_then(|name| session.link().entity(&SessionId::new(name)))
        .map(|entity| entity.tile);
    if let Some(tile) = clicked_tile {
        let (x, y) = session.camera().world_to_screen(tile.center_px(tile_size_px));
        input = input
            .with_cursor_position_px(Some(Vec2::new(x as f32, y as f32)))
            .with_primary_click_pressed(true);
    }
    input
}
