use crate::config::SyncConfig;
use crate::geom::Vec2;

/// Distance thresholds shared by every interpolator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationParams {
    pub arrive_snap_px: f32,
    pub moving_epsilon_px: f32,
    pub teleport_snap_px: f32,
}

impl InterpolationParams {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            arrive_snap_px: config.arrive_snap_px,
            moving_epsilon_px: config.moving_epsilon_px,
            teleport_snap_px: config.teleport_snap_px(),
        }
    }
}

impl Default for InterpolationParams {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Render position already sat on the target, or was close enough to snap.
    Arrived,
    Walked,
    /// Target was too far away to walk; render position jumped onto it.
    Teleported,
}

/// Continuous render position chasing a discrete target at a capped speed.
#[derive(Debug, Clone)]
pub struct RenderInterpolator {
    render: Vec2,
    target: Vec2,
    pixels_per_second: f32,
    is_moving: bool,
}

impl RenderInterpolator {
    pub fn new(position: Vec2, pixels_per_second: f32) -> Self {
        Self {
            render: position,
            target: position,
            pixels_per_second: pixels_per_second.max(0.0),
            is_moving: false,
        }
    }

    pub fn render_position(&self) -> Vec2 {
        self.render
    }

    pub fn target_position(&self) -> Vec2 {
        self.target
    }

    pub fn pixels_per_second(&self) -> f32 {
        self.pixels_per_second
    }

    /// Whether the gap to the target exceeded the moving epsilon at the last advance.
    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }

    pub fn advance(&mut self, delta_ms: f64, params: &InterpolationParams) -> StepKind {
        let distance_sq = self.render.distance_sq(self.target);
        self.is_moving = distance_sq > params.moving_epsilon_px * params.moving_epsilon_px;

        if distance_sq < params.arrive_snap_px * params.arrive_snap_px {
            self.render = self.target;
            return StepKind::Arrived;
        }
        if distance_sq > params.teleport_snap_px * params.teleport_snap_px {
            self.render = self.target;
            return StepKind::Teleported;
        }

        let max_step = self.pixels_per_second * (delta_ms.max(0.0) / 1000.0) as f32;
        self.render = step_toward(self.render, self.target, max_step);
        StepKind::Walked
    }
}

/// Moves `current` toward `target` by at most `max_step`, landing exactly on
/// the target when the step would reach or pass it.
fn step_toward(current: Vec2, target: Vec2, max_step: f32) -> Vec2 {
    let dx = target.x - current.x;
    let dy = target.y - current.y;
    let distance = (dx * dx + dy * dy).sqrt();
    if max_step >= distance {
        return target;
    }

    let inv_distance = distance.recip();
    Vec2 {
        x: current.x + dx * inv_distance * max_step,
        y: current.y + dy * inv_distance * max_step,
    }
}
