//! Hexagonal coordinate system using offset coordinates (odd-r).
//!
//! Based on Red Blob Games' guide:
//! https://www.redblobgames.com/grids/hexagons/
//!
//! Tokens are packed like bricks: even rows start flush against the left
//! wall, odd rows are shifted right by half a token. Even rows hold
//! [`EVEN_ROW_WIDTH`] tokens, odd rows one fewer.
//!
//! Pixel space is local to the playfield: the ceiling is `y = 0`, the left
//! wall is `x = 0` and `y` grows downward toward the shooter.

use bevy::prelude::*;

/// Square root of 3, used frequently in hex math.
pub const SQRT_3: f32 = 1.732_050_8;

/// Number of columns in an even (flush-left) row.
pub const EVEN_ROW_WIDTH: i32 = 9;

/// Number of columns in an odd (half-offset) row.
pub const ODD_ROW_WIDTH: i32 = 8;

/// Offset hex coordinate (odd-r system).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct HexCoord {
    /// Row, 0 is the ceiling.
    pub row: i32,
    /// Column, 0 is the left wall.
    pub col: i32,
}

impl HexCoord {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    #[inline]
    pub const fn is_odd_row(&self) -> bool {
        self.row % 2 != 0
    }

    /// Number of valid columns in this coordinate's row.
    #[inline]
    pub const fn row_width(&self) -> i32 {
        if self.is_odd_row() {
            ODD_ROW_WIDTH
        } else {
            EVEN_ROW_WIDTH
        }
    }

    /// All 6 neighboring coordinates, unbounded.
    ///
    /// Odd rows are shifted right, so the diagonal neighbors sit one column
    /// further right than they do for even rows. Use
    /// [`GridBounds::neighbors`](super::grid::GridBounds::neighbors) for the
    /// in-bounds subset.
    pub fn neighbors(&self) -> [HexCoord; 6] {
        let (r, c) = (self.row, self.col);

        if self.is_odd_row() {
            [
                HexCoord::new(r - 1, c),     // Northwest
                HexCoord::new(r - 1, c + 1), // Northeast
                HexCoord::new(r, c - 1),     // West
                HexCoord::new(r, c + 1),     // East
                HexCoord::new(r + 1, c),     // Southwest
                HexCoord::new(r + 1, c + 1), // Southeast
            ]
        } else {
            [
                HexCoord::new(r - 1, c - 1), // Northwest
                HexCoord::new(r - 1, c),     // Northeast
                HexCoord::new(r, c - 1),     // West
                HexCoord::new(r, c + 1),     // East
                HexCoord::new(r + 1, c - 1), // Southwest
                HexCoord::new(r + 1, c),     // Southeast
            ]
        }
    }

    /// Vertical distance between the centers of two adjacent rows.
    #[inline]
    pub fn row_height(diameter: f32) -> f32 {
        diameter * SQRT_3 / 2.0
    }

    /// Convert to the pixel center of this slot.
    ///
    /// - x = d * col + d/2 (+ d/2 on odd rows)
    /// - y = row * d * sqrt(3)/2 + d/2
    pub fn to_pixel(&self, diameter: f32) -> Vec2 {
        let radius = diameter / 2.0;
        let row_offset = if self.is_odd_row() { radius } else { 0.0 };
        let x = self.col as f32 * diameter + radius + row_offset;
        let y = self.row as f32 * Self::row_height(diameter) + radius;
        Vec2::new(x, y)
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
