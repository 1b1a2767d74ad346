/// Continuous position in world pixel space. `y` grows downward, matching tile rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    pub fn distance(self, other: Vec2) -> f32 {
        self.distance_sq(other).sqrt()
    }
}

/// Discrete grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    pub fn manhattan(self, other: TilePos) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// Pixel-space center of this tile.
    pub fn center_px(self, tile_size_px: f32) -> Vec2 {
        Vec2 {
            x: self.x as f32 * tile_size_px + tile_size_px * 0.5,
            y: self.y as f32 * tile_size_px + tile_size_px * 0.5,
        }
    }

    pub fn containing(world_px: Vec2, tile_size_px: f32) -> Self {
        Self {
            x: (world_px.x / tile_size_px).floor() as i32,
            y: (world_px.y / tile_size_px).floor() as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    /// Polling order when several directions are held at once.
    pub const PRIORITY: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_applies_direction_delta() {
        let origin = TilePos::new(3, 4);
        assert_eq!(origin.offset(Direction::Up), TilePos::new(3, 3));
        assert_eq!(origin.offset(Direction::Down), TilePos::new(3, 5));
        assert_eq!(origin.offset(Direction::Left), TilePos::new(2, 4));
        assert_eq!(origin.offset(Direction::Right), TilePos::new(4, 4));
    }

    #[test]
    fn center_px_is_tile_midpoint() {
        assert_eq!(TilePos::new(0, 0).center_px(32.0), Vec2::new(16.0, 16.0));
        assert_eq!(TilePos::new(4, 4).center_px(32.0), Vec2::new(144.0, 144.0));
    }

    #[test]
    fn containing_floors_negative_coordinates() {
        assert_eq!(
            TilePos::containing(Vec2::new(-0.5, 31.9), 32.0),
            TilePos::new(-1, 0)
        );
        assert_eq!(
            TilePos::containing(Vec2::new(64.0, 95.0), 32.0),
            TilePos::new(2, 2)
        );
    }

    #[test]
    fn manhattan_sums_axis_distances() {
        assert_eq!(TilePos::new(1, 1).manhattan(TilePos::new(4, -1)), 5);
        assert_eq!(TilePos::new(2, 2).manhattan(TilePos::new(2, 2)), 0);
    }
}
