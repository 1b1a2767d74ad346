use crate::content::AbilityId;
use crate::geom::TilePos;
use crate::grid::CollisionGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetingMode {
    Spell(AbilityId),
    Attack,
}

/// A pending ranged action waiting for a tile. `range_tiles` is always > 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetingSession {
    pub mode: TargetingMode,
    pub range_tiles: u32,
}

impl TargetingSession {
    /// `None` for zero range: such actions resolve without targeting.
    pub fn new(mode: TargetingMode, range_tiles: u32) -> Option<Self> {
        (range_tiles > 0).then_some(Self { mode, range_tiles })
    }

    pub fn in_range(&self, origin: TilePos, target: TilePos) -> bool {
        origin.manhattan(target) <= self.range_tiles
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetingEndReason {
    Confirmed,
    Cancelled,
    SecondaryClick,
    /// Another action key replaced the session.
    Replaced,
    /// The local actor died or became incapacitated.
    Invalidated,
}

/// Begin/end signals for the range-overlay renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetingEvent {
    Began(TargetingSession),
    Ended {
        session: TargetingSession,
        reason: TargetingEndReason,
    },
}

/// Tiles within Manhattan `range` of `center`, row-major. With a grid,
/// out-of-bounds and blocked tiles are left out.
pub fn range_overlay_tiles(
    center: TilePos,
    range: u32,
    grid: Option<&CollisionGrid>,
) -> Vec<TilePos> {
    let reach = i32::try_from(range).unwrap_or(i32::MAX);
    let mut tiles = Vec::new();
    for dy in -reach..=reach {
        let span = reach - dy.abs();
        for dx in -span..=span {
            let tile = TilePos::new(center.x.saturating_add(dx), center.y.saturating_add(dy));
            if grid.map_or(true, |grid| grid.is_walkable(tile)) {
                tiles.push(tile);
            }
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_range_never_creates_a_session() {
        assert_eq!(TargetingSession::new(TargetingMode::Attack, 0), None);
        assert!(TargetingSession::new(TargetingMode::Attack, 5).is_some());
    }

    #[test]
    fn range_check_is_manhattan() {
        let session = TargetingSession::new(TargetingMode::Attack, 3).expect("session");
        let origin = TilePos::new(0, 0);
        assert!(session.in_range(origin, TilePos::new(2, 1)));
        assert!(!session.in_range(origin, TilePos::new(2, 2)));
    }

    #[test]
    fn overlay_is_a_diamond() {
        let tiles = range_overlay_tiles(TilePos::new(5, 5), 2, None);
        assert_eq!(tiles.len(), 13);
        assert!(tiles.contains(&TilePos::new(5, 3)));
        assert!(tiles.contains(&TilePos::new(6, 6)));
        assert!(!tiles.contains(&TilePos::new(7, 6)));
        assert_eq!(range_overlay_tiles(TilePos::new(0, 0), 0, None), vec![TilePos::new(0, 0)]);
    }

    #[test]
    fn overlay_skips_blocked_and_outside_tiles() {
        let grid = CollisionGrid::from_rows(&["...", ".#.", "..."]).expect("grid");
        let tiles = range_overlay_tiles(TilePos::new(0, 0), 2, Some(&grid));
        assert!(!tiles.contains(&TilePos::new(1, 1)));
        assert!(!tiles.contains(&TilePos::new(-1, 0)));
        assert_eq!(
            tiles,
            vec![
                TilePos::new(0, 0),
                TilePos::new(1, 0),
                TilePos::new(2, 0),
                TilePos::new(0, 1),
                TilePos::new(0, 2),
            ]
        );
    }
}
