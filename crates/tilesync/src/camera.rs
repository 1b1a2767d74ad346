use tracing::debug;

use crate::actor::SessionId;
use crate::config::SyncConfig;
use crate::geom::{TilePos, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Keeps the followed actor centered. World pixels map to screen pixels with
/// a fixed zoom that fits the configured tile window into the viewport.
#[derive(Debug, Clone)]
pub struct FollowCamera {
    viewport: Viewport,
    tile_size_px: f32,
    visible_tiles: (u32, u32),
    zoom: f32,
    lerp: f32,
    center: Vec2,
    followed: Option<SessionId>,
    snap_pending: bool,
}

impl FollowCamera {
    pub fn new(viewport: Viewport, config: &SyncConfig) -> Self {
        let visible_tiles = (config.viewport_tiles_x, config.viewport_tiles_y);
        Self {
            viewport,
            tile_size_px: config.tile_size_px,
            visible_tiles,
            zoom: fit_zoom(viewport, visible_tiles, config.tile_size_px),
            lerp: config.camera_lerp,
            center: Vec2::ZERO,
            followed: None,
            snap_pending: true,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn followed(&self) -> Option<&SessionId> {
        self.followed.as_ref()
    }

    /// Switching targets snaps on the next update instead of gliding across the map.
    pub fn follow(&mut self, session_id: SessionId) {
        if self.followed.as_ref() == Some(&session_id) {
            return;
        }
        debug!(session_id = %session_id, "camera_follow");
        self.followed = Some(session_id);
        self.snap_pending = true;
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.zoom = fit_zoom(viewport, self.visible_tiles, self.tile_size_px);
    }

    /// Moves toward `target`. `None` (followed actor not present) leaves the camera where it is.
    pub fn update(&mut self, target: Option<Vec2>) {
        let Some(target) = target else {
            return;
        };
        if self.snap_pending {
            self.center = target;
            self.snap_pending = false;
            return;
        }
        self.center = Vec2::new(
            self.center.x + (target.x - self.center.x) * self.lerp,
            self.center.y + (target.y - self.center.y) * self.lerp,
        );
    }

    pub fn world_to_screen(&self, world: Vec2) -> (i32, i32) {
        let x = (world.x - self.center.x) * self.zoom + self.viewport.width as f32 * 0.5;
        let y = (world.y - self.center.y) * self.zoom + self.viewport.height as f32 * 0.5;
        (x.round() as i32, y.round() as i32)
    }

    pub fn screen_to_world(&self, screen_px: Vec2) -> Vec2 {
        Vec2::new(
            (screen_px.x - self.viewport.width as f32 * 0.5) / self.zoom + self.center.x,
            (screen_px.y - self.viewport.height as f32 * 0.5) / self.zoom + self.center.y,
        )
    }

    /// Tile under a cursor position given in screen pixels.
    pub fn screen_to_tile(&self, screen_px: Vec2) -> TilePos {
        TilePos::containing(self.screen_to_world(screen_px), self.tile_size_px)
    }
}

fn fit_zoom(viewport: Viewport, visible_tiles: (u32, u32), tile_size_px: f32) -> f32 {
    let world_width = visible_tiles.0 as f32 * tile_size_px;
    let world_height = visible_tiles.1 as f32 * tile_size_px;
    let zoom = (viewport.width as f32 / world_width).min(viewport.height as f32 / world_height);
    if zoom.is_finite() && zoom > 0.0 {
        zoom
    } else {
        1.0
    }
}
