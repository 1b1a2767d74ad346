//! In-process stand-in for the authoritative server. Intents arrive after a
//! fixed latency and are validated against the collision grid and occupancy.

use std::collections::VecDeque;

use tilesync::{
    ActionKind, AuthoritativeEntity, CollisionGrid, Direction, EntityCollection, ServerLink,
    SessionId, TilePos,
};
use tracing::{debug, info};

const PATROL_STEP_MS: f64 = 450.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Intent {
    Move(Direction),
    Action(ActionKind, Option<TilePos>),
    Interact(TilePos),
}

/// Server-side happenings the client reacts to with visual cues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ServerEvent {
    Hit(SessionId),
    Speaking(SessionId),
}

#[derive(Debug, Clone)]
struct Patrol {
    session_id: SessionId,
    route: Vec<TilePos>,
    next_index: usize,
    next_step_ms: f64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoopbackStats {
    pub(crate) moves_applied: u64,
    pub(crate) moves_rejected: u64,
    pub(crate) actions: u64,
    pub(crate) interacts: u64,
}

pub(crate) struct LoopbackServer {
    grid: CollisionGrid,
    latency_ms: f64,
    clock_ms: f64,
    local: SessionId,
    entities: EntityCollection,
    inbox: VecDeque<(f64, Intent)>,
    patrols: Vec<Patrol>,
    stats: LoopbackStats,
}

impl LoopbackServer {
    pub(crate) fn new(grid: CollisionGrid, latency_ms: f64, local: SessionId) -> Self {
        Self {
            grid,
            latency_ms,
            clock_ms: 0.0,
            local,
            entities: EntityCollection::new(),
            inbox: VecDeque::new(),
            patrols: Vec::new(),
            stats: LoopbackStats::default(),
        }
    }

    pub(crate) fn grid(&self) -> &CollisionGrid {
        &self.grid
    }

    pub(crate) fn stats(&self) -> LoopbackStats {
        self.stats
    }

    pub(crate) fn entities(&self) -> &EntityCollection {
        &self.entities
    }

    pub(crate) fn entity(&self, session_id: &SessionId) -> Option<&AuthoritativeEntity> {
        self.entities.get(session_id)
    }

    pub(crate) fn spawn(&mut self, session_id: SessionId, kind: &str, tile: TilePos) {
        self.entities
            .insert(session_id, AuthoritativeEntity::new(kind, tile));
    }

    /// Walks `route` in a loop, one tile per step. The first tile is the spawn point.
    pub(crate) fn spawn_patrol(&mut self, session_id: SessionId, kind: &str, route: Vec<TilePos>) {
        let Some(start) = route.first().copied() else {
            return;
        };
        self.spawn(session_id.clone(), kind, start);
        self.patrols.push(Patrol {
            session_id,
            route,
            next_index: 1,
            next_step_ms: self.clock_ms + PATROL_STEP_MS,
        });
    }

    pub(crate) fn despawn(&mut self, session_id: &SessionId) {
        self.entities.remove(session_id);
        self.patrols.retain(|patrol| patrol.session_id != *session_id);
    }

    pub(crate) fn teleport(&mut self, session_id: &SessionId, tile: TilePos) {
        if let Some(entity) = self.entities.get_mut(session_id) {
            entity.tile = tile;
        }
    }

    pub(crate) fn set_stunned(&mut self, session_id: &SessionId, stunned: bool) {
        if let Some(entity) = self.entities.get_mut(session_id) {
            entity.stunned = stunned;
        }
    }

    /// Applies intents that have waited out the latency and advances patrols.
    pub(crate) fn tick(&mut self, now_ms: f64) -> Vec<ServerEvent> {
        self.clock_ms = now_ms;
        let mut events = Vec::new();
        while self
            .inbox
            .front()
            .is_some_and(|(deliver_at, _)| *deliver_at <= now_ms)
        {
            let Some((_, intent)) = self.inbox.pop_front() else {
                break;
            };
            self.apply(intent, &mut events);
        }
        self.advance_patrols(now_ms, &mut events);
        events
    }

    fn enqueue(&mut self, intent: Intent) {
        self.inbox
            .push_back((self.clock_ms + self.latency_ms, intent));
    }

    fn apply(&mut self, intent: Intent, events: &mut Vec<ServerEvent>) {
        match intent {
            Intent::Move(direction) => self.apply_move(direction),
            Intent::Action(action, target) => {
                self.stats.actions += 1;
                info!(action = ?action, target = ?target, "loopback_action");
                let hit = target.and_then(|tile| self.living_occupant(tile, &self.local));
                if let Some(victim) = hit {
                    events.push(ServerEvent::Hit(victim));
                }
            }
            Intent::Interact(tile) => {
                self.stats.interacts += 1;
                if let Some(occupant) = self.living_occupant(tile, &self.local) {
                    events.push(ServerEvent::Speaking(occupant));
                }
            }
        }
    }

    fn apply_move(&mut self, direction: Direction) {
        let Some(from) = self.entities.get(&self.local).map(|entity| entity.tile) else {
            return;
        };
        let destination = from.offset(direction);
        let open = self.grid.is_walkable(destination)
            && self.living_occupant(destination, &self.local).is_none();
        let Some(entity) = self.entities.get_mut(&self.local) else {
            return;
        };
        entity.facing = direction;
        if open {
            entity.tile = destination;
            self.stats.moves_applied += 1;
        } else {
            self.stats.moves_rejected += 1;
            debug!(
                x = destination.x,
                y = destination.y,
                "loopback_move_rejected"
            );
        }
    }

    fn advance_patrols(&mut self, now_ms: f64, events: &mut Vec<ServerEvent>) {
        for patrol in &mut self.patrols {
            if now_ms < patrol.next_step_ms || patrol.route.len() < 2 {
                continue;
            }
            patrol.next_step_ms += PATROL_STEP_MS;
            let next = patrol.route[patrol.next_index];
            let Some(entity) = self.entities.get_mut(&patrol.session_id) else {
                continue;
            };
            entity.facing = facing_toward(entity.tile, next).unwrap_or(entity.facing);
            entity.tile = next;
            if patrol.next_index == 0 {
                events.push(ServerEvent::Speaking(patrol.session_id.clone()));
            }
            patrol.next_index = (patrol.next_index + 1) % patrol.route.len();
        }
    }

    fn living_occupant(&self, tile: TilePos, except: &SessionId) -> Option<SessionId> {
        self.entities
            .iter()
            .find(|(session_id, entity)| {
                *session_id != except && entity.alive && entity.tile == tile
            })
            .map(|(session_id, _)| session_id.clone())
    }
}

impl ServerLink for LoopbackServer {
    fn send_move(&mut self, direction: Direction) {
        self.enqueue(Intent::Move(direction));
    }

    fn send_action(&mut self, action: ActionKind, target: Option<TilePos>) {
        self.enqueue(Intent::Action(action, target));
    }

    fn send_interact(&mut self, tile: TilePos) {
        self.enqueue(Intent::Interact(tile));
    }
}

fn facing_toward(from: TilePos, to: TilePos) -> Option<Direction> {
    Direction::PRIORITY
        .into_iter()
        .find(|direction| from.offset(*direction) == to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> LoopbackServer {
        let grid = CollisionGrid::from_rows(&["....", "..#.", "...."]).expect("grid");
        let mut server = LoopbackServer::new(grid, 100.0, SessionId::new("me"));
        server.spawn(SessionId::new("me"), "ranger", TilePos::new(1, 0));
        server
    }

    fn local_tile(server: &LoopbackServer) -> Option<TilePos> {
        server.entity(&SessionId::new("me")).map(|entity| entity.tile)
    }

    #[test]
    fn moves_apply_after_latency() {
        let mut server = server();
        server.tick(0.0);
        server.send_move(Direction::Right);
        server.tick(99.0);
        assert_eq!(local_tile(&server), Some(TilePos::new(1, 0)));
        server.tick(100.0);
        assert_eq!(local_tile(&server), Some(TilePos::new(2, 0)));
        assert_eq!(server.stats().moves_applied, 1);
    }

    #[test]
    fn blocked_and_occupied_moves_are_rejected() {
        let mut server = server();
        server.spawn(SessionId::new("orc"), "orc", TilePos::new(0, 0));
        server.tick(0.0);
        server.send_move(Direction::Left);
        server.send_move(Direction::Up);
        server.tick(100.0);
        assert_eq!(local_tile(&server), Some(TilePos::new(1, 0)));
        assert_eq!(server.stats().moves_rejected, 2);

        server.send_move(Direction::Right);
        server.send_move(Direction::Down);
        server.tick(200.0);
        assert_eq!(local_tile(&server), Some(TilePos::new(2, 0)));
        assert_eq!(
            server.entity(&SessionId::new("me")).map(|entity| entity.facing),
            Some(Direction::Down)
        );
    }

    #[test]
    fn targeted_action_on_occupant_reports_hit() {
        let mut server = server();
        server.spawn(SessionId::new("orc"), "orc", TilePos::new(3, 2));
        server.tick(0.0);
        server.send_action(ActionKind::Attack, Some(TilePos::new(3, 2)));
        server.send_action(ActionKind::Attack, Some(TilePos::new(0, 2)));
        let events = server.tick(100.0);
        assert_eq!(events, vec![ServerEvent::Hit(SessionId::new("orc"))]);
        assert_eq!(server.stats().actions, 2);
    }

    #[test]
    fn patrol_loops_and_speaks_at_start() {
        let mut server = server();
        let route = vec![TilePos::new(0, 2), TilePos::new(1, 2)];
        server.spawn_patrol(SessionId::new("guard"), "orc", route);
        let guard = SessionId::new("guard");

        assert!(server.tick(450.0).is_empty());
        assert_eq!(server.entity(&guard).map(|entity| entity.tile), Some(TilePos::new(1, 2)));
        assert_eq!(server.entity(&guard).map(|entity| entity.facing), Some(Direction::Right));

        let events = server.tick(900.0);
        assert_eq!(events, vec![ServerEvent::Speaking(guard.clone())]);
        assert_eq!(server.entity(&guard).map(|entity| entity.tile), Some(TilePos::new(0, 2)));
    }
}
