use thiserror::Error;

use crate::geom::TilePos;

/// Walkability of a rectangular map. Tile (0,0) is the top-left cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionGrid {
    width: u32,
    height: u32,
    blocked: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollisionGridError {
    #[error("cell count mismatch: expected {expected}, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },
    #[error("row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

impl CollisionGrid {
    pub fn new(width: u32, height: u32, blocked: Vec<bool>) -> Result<Self, CollisionGridError> {
        let expected = width as usize * height as usize;
        let actual = blocked.len();
        if expected != actual {
            return Err(CollisionGridError::CellCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            blocked,
        })
    }

    pub fn open(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            blocked: vec![false; width as usize * height as usize],
        }
    }

    /// Parses rows of `#` (blocked) and `.` (open). Rows must share one width.
    pub fn from_rows(rows: &[&str]) -> Result<Self, CollisionGridError> {
        let width = rows.first().map_or(0, |row| row.chars().count());
        if let Some((row, actual)) = rows
            .iter()
            .map(|row| row.chars().count())
            .enumerate()
            .find(|(_, count)| *count != width)
        {
            return Err(CollisionGridError::RaggedRow {
                row,
                expected: width,
                actual,
            });
        }
        let blocked = rows
            .iter()
            .flat_map(|row| row.chars().map(|cell| cell == '#'))
            .collect::<Vec<_>>();
        Self::new(width as u32, rows.len() as u32, blocked)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_blocked(&mut self, tile: TilePos, blocked: bool) -> bool {
        match self.index_of(tile) {
            Some(index) => {
                self.blocked[index] = blocked;
                true
            }
            None => false,
        }
    }

    pub fn index_of(&self, tile: TilePos) -> Option<usize> {
        let x = u32::try_from(tile.x).ok()?;
        let y = u32::try_from(tile.y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn in_bounds(&self, tile: TilePos) -> bool {
        self.index_of(tile).is_some()
    }

    /// Out-of-bounds tiles count as not walkable.
    pub fn is_walkable(&self, tile: TilePos) -> bool {
        self.index_of(tile)
            .and_then(|index| self.blocked.get(index))
            .is_some_and(|blocked| !blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_cell_count() {
        assert_eq!(
            CollisionGrid::new(3, 2, vec![false; 5]),
            Err(CollisionGridError::CellCountMismatch {
                expected: 6,
                actual: 5
            })
        );
    }

    #[test]
    fn rows_parse_blocked_cells() {
        let grid = CollisionGrid::from_rows(&["..#", "#.."]).expect("grid");
        assert_eq!((grid.width(), grid.height()), (3, 2));
        assert!(grid.is_walkable(TilePos::new(0, 0)));
        assert!(!grid.is_walkable(TilePos::new(2, 0)));
        assert!(!grid.is_walkable(TilePos::new(0, 1)));
    }

    #[test]
    fn outside_is_not_walkable() {
        let grid = CollisionGrid::open(4, 4);
        assert!(!grid.in_bounds(TilePos::new(-1, 0)));
        assert!(!grid.is_walkable(TilePos::new(4, 0)));
        assert!(grid.is_walkable(TilePos::new(3, 3)));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert_eq!(
            CollisionGrid::from_rows(&["..", "...", "."]),
            Err(CollisionGridError::RaggedRow {
                row: 1,
                expected: 2,
                actual: 3
            })
        );
    }
}
