//! Mirrors the authoritative entity collection into locally owned actors.
//!
//! The registry is keyed by session id and only this module inserts or
//! removes entries. Each snapshot routes an actor's tile through its
//! [`PositionSource`]: the prediction store for the local actor, a direct
//! assignment for everyone else.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actor::{Actor, ActorCue, PositionSource, SessionId};
use crate::config::SyncConfig;
use crate::content::{ActorKind, ActorStatsResolver};
use crate::geom::{Direction, TilePos};
use crate::interpolation::{InterpolationParams, StepKind};
use crate::prediction::{PredictionStore, ReconcileOutcome};
use crate::timers::TimerQueue;

/// One entity as the server last described it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthoritativeEntity {
    pub tile: TilePos,
    pub facing: Direction,
    pub alive: bool,
    pub stealthed: bool,
    pub stunned: bool,
    /// Class or creature token, e.g. `"ranger"` or `"orc"`.
    pub kind: String,
}

impl AuthoritativeEntity {
    pub fn new(kind: impl Into<String>, tile: TilePos) -> Self {
        Self {
            tile,
            facing: Direction::default(),
            alive: true,
            stealthed: false,
            stunned: false,
            kind: kind.into(),
        }
    }
}

pub type EntityCollection = BTreeMap<SessionId, AuthoritativeEntity>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActorSpawnError {
    #[error("actor {session_id} has unknown kind '{kind}'")]
    UnknownKind { session_id: SessionId, kind: String },
    #[error("no actor definition for kind '{kind}' (actor {session_id})")]
    MissingDefinition {
        session_id: SessionId,
        kind: ActorKind,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub predictions: u64,
    pub confirmations: u64,
    pub hard_corrections: u64,
    pub timeout_corrections: u64,
    pub teleport_snaps: u64,
    pub spawns: u64,
    pub despawns: u64,
    pub rejected_spawns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CueExpiry {
    session_id: SessionId,
    cue: ActorCue,
}

pub struct EntitySynchronizer<R> {
    resolver: R,
    local_session: SessionId,
    config: SyncConfig,
    params: InterpolationParams,
    actors: BTreeMap<SessionId, Actor>,
    rejected: BTreeSet<SessionId>,
    timers: TimerQueue<CueExpiry>,
    stats: SyncStats,
}

impl<R: ActorStatsResolver> EntitySynchronizer<R> {
    pub fn new(resolver: R, local_session: SessionId, config: SyncConfig) -> Self {
        let params = InterpolationParams::from_config(&config);
        Self {
            resolver,
            local_session,
            config,
            params,
            actors: BTreeMap::new(),
            rejected: BTreeSet::new(),
            timers: TimerQueue::new(),
            stats: SyncStats::default(),
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn local_session(&self) -> &SessionId {
        &self.local_session
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn actor(&self, session_id: &SessionId) -> Option<&Actor> {
        self.actors.get(session_id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn local_actor(&self) -> Option<&Actor> {
        self.actors.get(&self.local_session)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Spawns, despawns and routes one authoritative snapshot.
    pub fn sync_entities(&mut self, entities: &EntityCollection, now_ms: f64) {
        let departed = self
            .actors
            .keys()
            .filter(|id| !entities.contains_key(*id))
            .cloned()
            .collect::<Vec<_>>();
        for session_id in departed {
            self.despawn(&session_id);
        }
        self.rejected.retain(|id| entities.contains_key(id));

        for (session_id, record) in entities {
            if !self.actors.contains_key(session_id) {
                if self.rejected.contains(session_id) {
                    continue;
                }
                match self.spawn(session_id, record) {
                    Ok(actor) => {
                        self.actors.insert(session_id.clone(), actor);
                    }
                    Err(error) => {
                        warn!(error = %error, "actor_spawn_rejected");
                        self.stats.rejected_spawns += 1;
                        self.rejected.insert(session_id.clone());
                        continue;
                    }
                }
            }

            if let Some(actor) = self.actors.get_mut(session_id) {
                sync_actor(actor, record, now_ms, &self.config, &mut self.stats);
            }
        }
    }

    /// Advances every render interpolator by one frame.
    pub fn advance(&mut self, delta_ms: f64) {
        for actor in self.actors.values_mut() {
            if actor.interpolator.advance(delta_ms, &self.params) == StepKind::Teleported {
                self.stats.teleport_snaps += 1;
                warn!(session_id = %actor.session_id(), "render_teleport_snap");
            }
        }
    }

    /// Clears cues whose timers came due.
    pub fn expire_timers(&mut self, now_ms: f64) {
        for (timer_id, expiry) in self.timers.drain_due(now_ms) {
            let Some(actor) = self.actors.get_mut(&expiry.session_id) else {
                continue;
            };
            if actor.cues.get(expiry.cue) == Some(timer_id) {
                actor.cues.replace(expiry.cue, None);
                actor.refresh_opacity(&self.config);
            }
        }
    }

    /// Applies a local move to the prediction store. Returns the new predicted
    /// tile, or `None` when the local actor is not spawned yet.
    pub fn predict_local_move(&mut self, direction: Direction, now_ms: f64) -> Option<TilePos> {
        let tile_size = self.config.tile_size_px;
        let actor = self.actors.get_mut(&self.local_session)?;
        let PositionSource::Predicted(store) = &mut actor.source else {
            return None;
        };
        let predicted = store.predict_move(direction, now_ms);
        let pending = store.pending_predictions();
        actor.interpolator.set_target(predicted.center_px(tile_size));
        self.stats.predictions += 1;
        debug!(
            direction = ?direction,
            x = predicted.x,
            y = predicted.y,
            pending,
            "prediction_applied"
        );
        Some(predicted)
    }

    /// Shows the speaking indicator, replacing any running one.
    pub fn set_speaking(&mut self, session_id: &SessionId, now_ms: f64) -> bool {
        let duration = self.config.speaking_indicator_ms;
        self.arm_cue(session_id, ActorCue::Speaking, now_ms, duration)
    }

    pub fn flash_hit(&mut self, session_id: &SessionId, now_ms: f64) -> bool {
        let duration = self.config.hit_flash_ms;
        self.arm_cue(session_id, ActorCue::HitFlash, now_ms, duration)
    }

    /// Drops every actor and its timers.
    pub fn clear(&mut self) {
        let ids = self.actors.keys().cloned().collect::<Vec<_>>();
        for session_id in ids {
            self.despawn(&session_id);
        }
        self.rejected.clear();
    }

    pub fn debug_line(&self) -> String {
        let mut line = String::new();
        match self.local_actor() {
            Some(actor) => {
                let tile = actor.predicted_tile().unwrap_or(actor.authoritative_tile());
                let _ = write!(
                    line,
                    "local=({},{}) pending={}",
                    tile.x,
                    tile.y,
                    actor.pending_predictions()
                );
            }
            None => line.push_str("local=none"),
        }
        let _ = write!(
            line,
            " actors={} timers={} corrections={}/{}",
            self.actors.len(),
            self.timers.len(),
            self.stats.hard_corrections,
            self.stats.timeout_corrections
        );
        line
    }

    fn arm_cue(
        &mut self,
        session_id: &SessionId,
        cue: ActorCue,
        now_ms: f64,
        duration_ms: f64,
    ) -> bool {
        let Some(actor) = self.actors.get_mut(session_id) else {
            warn!(session_id = %session_id, cue = ?cue, "cue_for_unknown_actor");
            return false;
        };
        let timer = self.timers.schedule(
            now_ms,
            duration_ms,
            CueExpiry {
                session_id: session_id.clone(),
                cue,
            },
        );
        if let Some(previous) = actor.cues.replace(cue, Some(timer)) {
            self.timers.cancel(previous);
        }
        actor.refresh_opacity(&self.config);
        true
    }

    fn spawn(
        &mut self,
        session_id: &SessionId,
        record: &AuthoritativeEntity,
    ) -> Result<Actor, ActorSpawnError> {
        let kind = ActorKind::from_token(&record.kind).ok_or_else(|| ActorSpawnError::UnknownKind {
            session_id: session_id.clone(),
            kind: record.kind.clone(),
        })?;
        let def = self
            .resolver
            .actor_def(kind)
            .ok_or_else(|| ActorSpawnError::MissingDefinition {
                session_id: session_id.clone(),
                kind,
            })?;

        let is_local = *session_id == self.local_session;
        let source = if is_local {
            PositionSource::Predicted(PredictionStore::new(
                record.tile,
                self.config.reconcile_timeout_ms,
            ))
        } else {
            PositionSource::Authoritative(record.tile)
        };
        let pixels_per_second = def.speed_tiles_per_second * self.config.tile_size_px;
        self.stats.spawns += 1;
        info!(
            session_id = %session_id,
            kind = %kind,
            is_local,
            x = record.tile.x,
            y = record.tile.y,
            "actor_spawned"
        );
        Ok(Actor::new(
            session_id.clone(),
            kind,
            source,
            pixels_per_second,
            self.config.tile_size_px,
        ))
    }

    fn despawn(&mut self, session_id: &SessionId) {
        let Some(mut actor) = self.actors.remove(session_id) else {
            return;
        };
        let mut cancelled = 0usize;
        for timer in actor.cues.take_all() {
            if self.timers.cancel(timer) {
                cancelled += 1;
            }
        }
        self.stats.despawns += 1;
        info!(session_id = %session_id, cancelled_timers = cancelled, "actor_despawned");
    }
}

/// The one update path shared by local and remote actors.
fn sync_actor(
    actor: &mut Actor,
    record: &AuthoritativeEntity,
    now_ms: f64,
    config: &SyncConfig,
    stats: &mut SyncStats,
) {
    let target_tile = match &mut actor.source {
        PositionSource::Predicted(store) => {
            let reconciliation = store.reconcile_server(record.tile, now_ms);
            if reconciliation.confirmed {
                stats.confirmations += 1;
                debug!(
                    x = record.tile.x,
                    y = record.tile.y,
                    pending = store.pending_predictions(),
                    "prediction_confirmed"
                );
            }
            if let ReconcileOutcome::Corrected { timed_out } = reconciliation.outcome {
                if timed_out {
                    stats.timeout_corrections += 1;
                    warn!(
                        x = record.tile.x,
                        y = record.tile.y,
                        "prediction_timed_out"
                    );
                } else {
                    stats.hard_corrections += 1;
                    debug!(x = record.tile.x, y = record.tile.y, "prediction_corrected");
                }
            }
            store.predicted_tile()
        }
        PositionSource::Authoritative(tile) => {
            *tile = record.tile;
            record.tile
        }
    };

    actor
        .interpolator
        .set_target(target_tile.center_px(config.tile_size_px));
    actor.apply_status(record.facing, record.alive, record.stealthed);
    actor.refresh_opacity(config);
}
