//! Free/Targeting input state machine and the move-intent throttle.

use tracing::{debug, info, warn};

use crate::actor::SessionId;
use crate::content::{AbilityId, ActorKind, ActorStatsResolver};
use crate::geom::{Direction, TilePos};
use crate::input::{InputAction, InputSnapshot, ABILITY_SLOTS};
use crate::sync::ActorSpawnError;
use crate::targeting::{TargetingEndReason, TargetingEvent, TargetingMode, TargetingSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Attack,
    Cast(AbilityId),
}

impl From<TargetingMode> for ActionKind {
    fn from(mode: TargetingMode) -> Self {
        match mode {
            TargetingMode::Attack => ActionKind::Attack,
            TargetingMode::Spell(ability) => ActionKind::Cast(ability),
        }
    }
}

/// Fire-and-forget outbound intents.
pub trait ServerLink {
    fn send_move(&mut self, direction: Direction);
    fn send_action(&mut self, action: ActionKind, target: Option<TilePos>);
    fn send_interact(&mut self, tile: TilePos);
}

/// Limits move intents to one per interval on an accumulating schedule, so a
/// held key keeps the nominal cadence even when frames arrive late.
#[derive(Debug, Clone)]
pub struct MoveThrottle {
    interval_ms: f64,
    last_sent_ms: Option<f64>,
}

impl MoveThrottle {
    pub fn for_speed(speed_tiles_per_second: f32) -> Self {
        Self {
            interval_ms: interval_for_speed(speed_tiles_per_second),
            last_sent_ms: None,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn set_speed(&mut self, speed_tiles_per_second: f32) {
        self.interval_ms = interval_for_speed(speed_tiles_per_second);
    }

    pub fn try_acquire(&mut self, now_ms: f64) -> bool {
        if !self.interval_ms.is_finite() {
            return false;
        }
        let next = match self.last_sent_ms {
            None => now_ms,
            Some(last) if now_ms - last < self.interval_ms => return false,
            Some(last) => {
                let scheduled = last + self.interval_ms;
                if now_ms - scheduled > self.interval_ms {
                    now_ms
                } else {
                    scheduled
                }
            }
        };
        self.last_sent_ms = Some(next);
        true
    }
}

fn interval_for_speed(speed_tiles_per_second: f32) -> f64 {
    if speed_tiles_per_second.is_finite() && speed_tiles_per_second > 0.0 {
        1000.0 / f64::from(speed_tiles_per_second)
    } else {
        f64::INFINITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Free,
    Targeting(TargetingSession),
}

/// Per-frame facts the controller cannot see on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerContext {
    pub now_ms: f64,
    /// Tile under the cursor, if the cursor is over the map.
    pub cursor_tile: Option<TilePos>,
    /// Local predicted tile; range checks measure from here.
    pub origin_tile: Option<TilePos>,
    /// Dead or stunned.
    pub incapacitated: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerOutput {
    pub move_sent: Option<Direction>,
    pub events: Vec<TargetingEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AbilitySlot {
    ability: AbilityId,
    range_tiles: u32,
}

#[derive(Debug, Clone)]
pub struct InputController {
    state: ControllerState,
    throttle: MoveThrottle,
    base_speed_tiles_per_second: f32,
    speed_override: Option<f32>,
    melee_range: u32,
    slots: Vec<AbilitySlot>,
}

impl InputController {
    /// Builds the controller from the local actor's class definition.
    pub fn for_actor(
        session_id: &SessionId,
        kind: ActorKind,
        resolver: &impl ActorStatsResolver,
    ) -> Result<Self, ActorSpawnError> {
        let missing = || ActorSpawnError::MissingDefinition {
            session_id: session_id.clone(),
            kind,
        };
        let def = resolver.actor_def(kind).ok_or_else(missing)?;
        let slots = def
            .abilities
            .iter()
            .map(|ability| {
                resolver
                    .ability_def(*ability)
                    .map(|ability_def| AbilitySlot {
                        ability: *ability,
                        range_tiles: ability_def.range_tiles,
                    })
                    .ok_or_else(missing)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            state: ControllerState::Free,
            throttle: MoveThrottle::for_speed(def.speed_tiles_per_second),
            base_speed_tiles_per_second: def.speed_tiles_per_second,
            speed_override: None,
            melee_range: def.melee_range,
            slots,
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn targeting(&self) -> Option<TargetingSession> {
        match self.state {
            ControllerState::Free => None,
            ControllerState::Targeting(session) => Some(session),
        }
    }

    pub fn move_interval_ms(&self) -> f64 {
        self.throttle.interval_ms()
    }

    pub fn speed_tiles_per_second(&self) -> f32 {
        self.speed_override
            .unwrap_or(self.base_speed_tiles_per_second)
    }

    /// Replaces the class speed until called again with `None`.
    pub fn set_speed_override(&mut self, speed_tiles_per_second: Option<f32>) {
        self.speed_override = speed_tiles_per_second;
        self.throttle.set_speed(self.speed_tiles_per_second());
        info!(
            speed_tiles_per_second = self.speed_tiles_per_second(),
            overridden = speed_tiles_per_second.is_some(),
            "move_speed_changed"
        );
    }

    /// Leaves targeting if active. Calling it in `Free` does nothing.
    pub fn cancel_targeting(&mut self) -> Option<TargetingEvent> {
        self.end_targeting(TargetingEndReason::Cancelled)
    }

    pub fn update(
        &mut self,
        input: &InputSnapshot,
        ctx: &ControllerContext,
        link: &mut impl ServerLink,
    ) -> ControllerOutput {
        let mut output = ControllerOutput::default();

        if let Some(direction) = input.held_direction() {
            if self.throttle.try_acquire(ctx.now_ms) {
                link.send_move(direction);
                output.move_sent = Some(direction);
            } else {
                debug!(direction = ?direction, "move_throttled");
            }
        }

        match self.state {
            ControllerState::Targeting(session) => {
                self.update_targeting(session, input, ctx, link, &mut output.events);
            }
            ControllerState::Free => self.update_free(input, ctx, link, &mut output.events),
        }

        if ctx.incapacitated {
            output
                .events
                .extend(self.end_targeting(TargetingEndReason::Invalidated));
        }
        output
    }

    fn update_targeting(
        &mut self,
        session: TargetingSession,
        input: &InputSnapshot,
        ctx: &ControllerContext,
        link: &mut impl ServerLink,
        events: &mut Vec<TargetingEvent>,
    ) {
        if input.was_pressed(InputAction::Cancel) {
            events.extend(self.end_targeting(TargetingEndReason::Cancelled));
            return;
        }
        if input.secondary_click_pressed() {
            events.extend(self.end_targeting(TargetingEndReason::SecondaryClick));
            return;
        }
        if input.primary_click_pressed() {
            if self.try_confirm(session, ctx, link) {
                events.extend(self.end_targeting(TargetingEndReason::Confirmed));
            }
            return;
        }
        if let Some(action) = self.pressed_action(input) {
            events.extend(self.end_targeting(TargetingEndReason::Replaced));
            self.start_action(action, link, events);
        }
    }

    fn update_free(
        &mut self,
        input: &InputSnapshot,
        ctx: &ControllerContext,
        link: &mut impl ServerLink,
        events: &mut Vec<TargetingEvent>,
    ) {
        if let Some(action) = self.pressed_action(input) {
            self.start_action(action, link, events);
        }
        if input.primary_click_pressed() {
            if let Some(tile) = ctx.cursor_tile {
                link.send_interact(tile);
                debug!(x = tile.x, y = tile.y, "interact_sent");
            }
        }
    }

    /// First action key pressed this frame: attack, then slots in order.
    fn pressed_action(&self, input: &InputSnapshot) -> Option<(TargetingMode, u32)> {
        if input.was_pressed(InputAction::Attack) {
            return Some((TargetingMode::Attack, self.attack_range()));
        }
        ABILITY_SLOTS
            .iter()
            .zip(&self.slots)
            .find(|(key, _)| input.was_pressed(**key))
            .map(|(_, slot)| (TargetingMode::Spell(slot.ability), slot.range_tiles))
    }

    /// Melee classes attack whatever they face; reach beyond one tile needs a target.
    fn attack_range(&self) -> u32 {
        if self.melee_range > 1 {
            self.melee_range
        } else {
            0
        }
    }

    fn start_action(
        &mut self,
        (mode, range_tiles): (TargetingMode, u32),
        link: &mut impl ServerLink,
        events: &mut Vec<TargetingEvent>,
    ) {
        match TargetingSession::new(mode, range_tiles) {
            Some(session) => {
                self.state = ControllerState::Targeting(session);
                info!(mode = ?session.mode, range_tiles, "targeting_began");
                events.push(TargetingEvent::Began(session));
            }
            None => {
                link.send_action(mode.into(), None);
                debug!(mode = ?mode, "action_sent");
            }
        }
    }

    fn try_confirm(
        &mut self,
        session: TargetingSession,
        ctx: &ControllerContext,
        link: &mut impl ServerLink,
    ) -> bool {
        let Some(target) = ctx.cursor_tile else {
            warn!(mode = ?session.mode, "targeting_confirm_declined_no_cursor");
            return false;
        };
        let Some(origin) = ctx.origin_tile else {
            warn!(mode = ?session.mode, "targeting_confirm_declined_no_local_actor");
            return false;
        };
        if !session.in_range(origin, target) {
            warn!(
                mode = ?session.mode,
                range_tiles = session.range_tiles,
                distance = origin.manhattan(target),
                "targeting_confirm_declined_out_of_range"
            );
            return false;
        }
        link.send_action(session.mode.into(), Some(target));
        debug!(mode = ?session.mode, x = target.x, y = target.y, "action_sent");
        true
    }

    fn end_targeting(&mut self, reason: TargetingEndReason) -> Option<TargetingEvent> {
        let ControllerState::Targeting(session) = self.state else {
            return None;
        };
        self.state = ControllerState::Free;
        info!(mode = ?session.mode, reason = ?reason, "targeting_ended");
        Some(TargetingEvent::Ended { session, reason })
    }
}
