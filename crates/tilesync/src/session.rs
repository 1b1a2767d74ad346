//! Per-frame orchestration of the local client.
//!
//! Frame order: input and throttled intents (with the optimistic prediction),
//! then the authoritative snapshot, then interpolation, cue timers and the
//! camera last so it sees this frame's render positions.

use tracing::debug;

use crate::actor::SessionId;
use crate::camera::{FollowCamera, Viewport};
use crate::clock::FrameTime;
use crate::config::SyncConfig;
use crate::content::{ActorKind, ActorStatsResolver};
use crate::controller::{ControllerContext, InputController, ServerLink};
use crate::geom::{Direction, TilePos};
use crate::grid::CollisionGrid;
use crate::input::InputSnapshot;
use crate::sync::{ActorSpawnError, EntityCollection, EntitySynchronizer};
use crate::targeting::{range_overlay_tiles, TargetingEvent};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub move_sent: Option<Direction>,
    /// Set when the sent move was also applied to the prediction store.
    pub predicted: Option<TilePos>,
    pub targeting_events: Vec<TargetingEvent>,
}

pub struct ClientSession<R, L> {
    sync: EntitySynchronizer<R>,
    controller: InputController,
    camera: FollowCamera,
    link: L,
    grid: Option<CollisionGrid>,
}

impl<R: ActorStatsResolver, L: ServerLink> ClientSession<R, L> {
    pub fn new(
        resolver: R,
        local_session: SessionId,
        local_kind: ActorKind,
        config: SyncConfig,
        viewport: Viewport,
        link: L,
    ) -> Result<Self, ActorSpawnError> {
        let controller = InputController::for_actor(&local_session, local_kind, &resolver)?;
        let mut camera = FollowCamera::new(viewport, &config);
        camera.follow(local_session.clone());
        Ok(Self {
            sync: EntitySynchronizer::new(resolver, local_session, config),
            controller,
            camera,
            link,
            grid: None,
        })
    }

    pub fn with_collision_grid(mut self, grid: CollisionGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn set_collision_grid(&mut self, grid: Option<CollisionGrid>) {
        self.grid = grid;
    }

    pub fn sync(&self) -> &EntitySynchronizer<R> {
        &self.sync
    }

    pub fn controller(&self) -> &InputController {
        &self.controller
    }

    pub fn camera(&self) -> &FollowCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut FollowCamera {
        &mut self.camera
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn frame(
        &mut self,
        input: &InputSnapshot,
        entities: &EntityCollection,
        time: FrameTime,
    ) -> FrameReport {
        let local_record = entities.get(self.sync.local_session());
        let ctx = ControllerContext {
            now_ms: time.now_ms,
            cursor_tile: input
                .cursor_position_px()
                .map(|cursor| self.camera.screen_to_tile(cursor)),
            origin_tile: self.sync.local_actor().and_then(|actor| actor.predicted_tile()),
            incapacitated: local_record.is_some_and(|record| !record.alive || record.stunned),
        };
        let output = self.controller.update(input, &ctx, &mut self.link);

        let predicted = output.move_sent.and_then(|direction| {
            if self.local_move_is_open(direction, entities) {
                self.sync.predict_local_move(direction, time.now_ms)
            } else {
                debug!(direction = ?direction, "prediction_skipped_blocked");
                None
            }
        });

        self.sync.sync_entities(entities, time.now_ms);
        self.sync.advance(time.delta_ms);
        self.sync.expire_timers(time.now_ms);

        let target = self
            .camera
            .followed()
            .and_then(|session_id| self.sync.actor(session_id))
            .map(|actor| actor.render_position());
        self.camera.update(target);

        FrameReport {
            move_sent: output.move_sent,
            predicted,
            targeting_events: output.events,
        }
    }

    /// Tiles to highlight for the active targeting session, if any.
    pub fn range_overlay(&self) -> Option<Vec<TilePos>> {
        let session = self.controller.targeting()?;
        let center = self.sync.local_actor()?.predicted_tile()?;
        Some(range_overlay_tiles(center, session.range_tiles, self.grid.as_ref()))
    }

    pub fn cancel_targeting(&mut self) -> Option<TargetingEvent> {
        self.controller.cancel_targeting()
    }

    pub fn set_speed_override(&mut self, speed_tiles_per_second: Option<f32>) {
        self.controller.set_speed_override(speed_tiles_per_second);
    }

    pub fn on_speaking(&mut self, session_id: &SessionId, now_ms: f64) -> bool {
        self.sync.set_speaking(session_id, now_ms)
    }

    pub fn on_hit(&mut self, session_id: &SessionId, now_ms: f64) -> bool {
        self.sync.flash_hit(session_id, now_ms)
    }

    pub fn debug_line(&self) -> String {
        self.sync.debug_line()
    }

    /// Destination is inside the map, not blocked, and not held by another living actor.
    fn local_move_is_open(&self, direction: Direction, entities: &EntityCollection) -> bool {
        let Some(from) = self.sync.local_actor().and_then(|actor| actor.predicted_tile()) else {
            return false;
        };
        let destination = from.offset(direction);
        if let Some(grid) = &self.grid {
            if !grid.is_walkable(destination) {
                return false;
            }
        }
        let local = self.sync.local_session();
        !entities.iter().any(|(session_id, record)| {
            session_id != local && record.alive && record.tile == destination
        })
    }
}
