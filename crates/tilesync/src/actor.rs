use std::fmt;

use crate::config::SyncConfig;
use crate::content::ActorKind;
use crate::geom::{Direction, TilePos, Vec2};
use crate::interpolation::RenderInterpolator;
use crate::prediction::PredictionStore;
use crate::timers::TimerId;

/// Server-assigned identity, stable for the lifetime of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which tile feeds an actor's render target.
#[derive(Debug, Clone)]
pub enum PositionSource {
    /// Locally controlled: the prediction store decides.
    Predicted(PredictionStore),
    /// Everyone else: the last authoritative tile, used as-is.
    Authoritative(TilePos),
}

impl PositionSource {
    pub fn render_tile(&self) -> TilePos {
        match self {
            PositionSource::Predicted(store) => store.predicted_tile(),
            PositionSource::Authoritative(tile) => *tile,
        }
    }

    pub fn authoritative_tile(&self) -> TilePos {
        match self {
            PositionSource::Predicted(store) => store.authoritative_tile(),
            PositionSource::Authoritative(tile) => *tile,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorCue {
    Speaking,
    HitFlash,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CueTimers {
    speaking: Option<TimerId>,
    hit_flash: Option<TimerId>,
}

impl CueTimers {
    pub(crate) fn get(&self, cue: ActorCue) -> Option<TimerId> {
        match cue {
            ActorCue::Speaking => self.speaking,
            ActorCue::HitFlash => self.hit_flash,
        }
    }

    pub(crate) fn replace(&mut self, cue: ActorCue, timer: Option<TimerId>) -> Option<TimerId> {
        let slot = match cue {
            ActorCue::Speaking => &mut self.speaking,
            ActorCue::HitFlash => &mut self.hit_flash,
        };
        std::mem::replace(slot, timer)
    }

    pub(crate) fn take_all(&mut self) -> impl Iterator<Item = TimerId> {
        [self.speaking.take(), self.hit_flash.take()]
            .into_iter()
            .flatten()
    }
}

/// What the sprite layer needs to draw one actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorVisual {
    pub render_position: Vec2,
    pub facing: Direction,
    pub is_moving: bool,
    pub opacity: f32,
    pub speaking: bool,
}

#[derive(Debug, Clone)]
pub struct Actor {
    session_id: SessionId,
    kind: ActorKind,
    pub(crate) source: PositionSource,
    pub(crate) interpolator: RenderInterpolator,
    facing: Direction,
    alive: bool,
    stealthed: bool,
    opacity: f32,
    pub(crate) cues: CueTimers,
}

impl Actor {
    pub(crate) fn new(
        session_id: SessionId,
        kind: ActorKind,
        source: PositionSource,
        pixels_per_second: f32,
        tile_size_px: f32,
    ) -> Self {
        let start = source.render_tile().center_px(tile_size_px);
        Self {
            session_id,
            kind,
            source,
            interpolator: RenderInterpolator::new(start, pixels_per_second),
            facing: Direction::default(),
            alive: true,
            stealthed: false,
            opacity: 1.0,
            cues: CueTimers::default(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, PositionSource::Predicted(_))
    }

    pub fn position_source(&self) -> &PositionSource {
        &self.source
    }

    pub fn authoritative_tile(&self) -> TilePos {
        self.source.authoritative_tile()
    }

    /// `None` for remote actors.
    pub fn predicted_tile(&self) -> Option<TilePos> {
        match &self.source {
            PositionSource::Predicted(store) => Some(store.predicted_tile()),
            PositionSource::Authoritative(_) => None,
        }
    }

    pub fn pending_predictions(&self) -> u32 {
        match &self.source {
            PositionSource::Predicted(store) => store.pending_predictions(),
            PositionSource::Authoritative(_) => 0,
        }
    }

    pub fn render_position(&self) -> Vec2 {
        self.interpolator.render_position()
    }

    pub fn target_position(&self) -> Vec2 {
        self.interpolator.target_position()
    }

    pub fn pixels_per_second(&self) -> f32 {
        self.interpolator.pixels_per_second()
    }

    pub fn is_moving(&self) -> bool {
        self.interpolator.is_moving()
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_stealthed(&self) -> bool {
        self.stealthed
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn has_cue(&self, cue: ActorCue) -> bool {
        self.cues.get(cue).is_some()
    }

    pub fn visual(&self) -> ActorVisual {
        ActorVisual {
            render_position: self.render_position(),
            facing: self.facing,
            is_moving: self.is_moving(),
            opacity: self.opacity,
            speaking: self.has_cue(ActorCue::Speaking),
        }
    }

    pub(crate) fn apply_status(&mut self, facing: Direction, alive: bool, stealthed: bool) {
        self.facing = facing;
        self.alive = alive;
        self.stealthed = stealthed;
    }

    /// Dead beats stealth; a hit flash can only dim further.
    pub(crate) fn refresh_opacity(&mut self, config: &SyncConfig) {
        let base = if !self.alive {
            config.dead_opacity
        } else if self.stealthed && self.is_local() {
            config.stealth_local_opacity
        } else if self.stealthed {
            config.stealth_remote_opacity
        } else {
            1.0
        };
        self.opacity = if self.has_cue(ActorCue::HitFlash) {
            base.min(config.hit_flash_opacity)
        } else {
            base
        };
    }
}
