//! The hexagonal grid that holds all tokens.
//!
//! Every token spawned during a level stays in `tokens` so ids remain
//! stable; destroyed tokens simply flip `visible` off. A HashMap indexes the
//! visible ones by address, which keeps address lookups sparse.

use bevy::prelude::*;
use std::collections::HashMap;

use super::{
    error::CoreError,
    hex::HexCoord,
    token::{Token, TokenColor, TokenId, TokenSnapshot},
};

/// The bounds of the playable grid area.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct GridBounds {
    /// Exclusive row bound. Must exceed the tallest stack a level can build.
    pub max_rows: i32,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self { max_rows: 14 }
    }
}

impl GridBounds {
    pub fn new(max_rows: i32) -> Self {
        Self { max_rows }
    }

    /// Check if a hex coordinate is within bounds.
    pub fn contains(&self, coord: HexCoord) -> bool {
        coord.row >= 0 && coord.row < self.max_rows && coord.col >= 0 && coord.col < coord.row_width()
    }

    /// The in-bounds subset of [`HexCoord::neighbors`].
    pub fn neighbors(&self, coord: HexCoord) -> impl Iterator<Item = HexCoord> + '_ {
        coord.neighbors().into_iter().filter(move |n| self.contains(*n))
    }

    /// Iterate over every valid address in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = HexCoord> {
        (0..self.max_rows).flat_map(|row| {
            let width = HexCoord::new(row, 0).row_width();
            (0..width).map(move |col| HexCoord::new(row, col))
        })
    }
}

/// The grid holding all tokens of the current level.
#[derive(Debug, Clone)]
pub struct HexGrid {
    tokens: Vec<Token>,
    slots: HashMap<HexCoord, usize>,
    diameter: f32,
    pub bounds: GridBounds,
}

impl HexGrid {
    pub fn new(bounds: GridBounds, diameter: f32) -> Self {
        Self {
            tokens: Vec::new(),
            slots: HashMap::new(),
            diameter,
            bounds,
        }
    }

    /// Token diameter this grid lays its pixel positions out with.
    pub fn diameter(&self) -> f32 {
        self.diameter
    }

    /// Check if a cell holds a visible token.
    pub fn is_occupied(&self, coord: HexCoord) -> bool {
        self.slots.contains_key(&coord)
    }

    /// Get the visible token at a position, if any.
    pub fn get(&self, coord: HexCoord) -> Option<&Token> {
        self.slots.get(&coord).map(|&idx| &self.tokens[idx])
    }

    pub fn get_mut(&mut self, coord: HexCoord) -> Option<&mut Token> {
        self.slots.get(&coord).map(|&idx| &mut self.tokens[idx])
    }

    /// Look a token up by id, destroyed ones included.
    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.0 as usize)
    }

    /// Place a new visible token.
    pub fn spawn(
        &mut self,
        coord: HexCoord,
        color: TokenColor,
        reinforced: bool,
    ) -> Result<TokenId, CoreError> {
        if !self.bounds.contains(coord) || self.is_occupied(coord) {
            return Err(CoreError::SlotOccupied(coord));
        }

        let idx = self.tokens.len();
        let id = TokenId(idx as u32);
        let position = coord.to_pixel(self.diameter);
        self.tokens.push(Token::new(id, coord, position, color, reinforced));
        self.slots.insert(coord, idx);
        Ok(id)
    }

    /// Destroy the token at a position.
    ///
    /// Returns the id of the token that was removed, if any.
    pub fn destroy(&mut self, coord: HexCoord) -> Option<TokenId> {
        let idx = self.slots.remove(&coord)?;
        let token = &mut self.tokens[idx];
        token.visible = false;
        token.frozen = false;
        token.reinforced = false;
        token.hits_remaining = 0;
        Some(token.id)
    }

    /// Drop every token. Ids restart from zero.
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.slots.clear();
    }

    /// Get the number of visible tokens.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Visible tokens in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.visible)
    }

    /// Addresses of all visible tokens, sorted row-major.
    pub fn coords(&self) -> Vec<HexCoord> {
        let mut coords: Vec<HexCoord> = self.slots.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// In-bounds neighbors of `coord` that hold a visible token.
    pub fn occupied_neighbors(&self, coord: HexCoord) -> impl Iterator<Item = HexCoord> + '_ {
        self.bounds.neighbors(coord).filter(|n| self.is_occupied(*n))
    }

    /// Empty addresses in row-major, then column order.
    pub fn empty_slots(&self) -> impl Iterator<Item = HexCoord> + '_ {
        self.bounds.iter().filter(|c| !self.is_occupied(*c))
    }

    /// Visible tokens sitting on the ceiling row.
    pub fn top_row_coords(&self) -> Vec<HexCoord> {
        self.coords().into_iter().filter(|c| c.row == 0).collect()
    }

    /// Full picture of the visible grid for the renderer, sorted row-major.
    pub fn snapshot(&self) -> Vec<TokenSnapshot> {
        self.coords()
            .into_iter()
            .filter_map(|c| self.get(c))
            .map(Token::snapshot)
            .collect()
    }
}


/// Random grids for property tests elsewhere in the crate.
#[cfg(test)]
pub(crate) mod strategies {
    use super::*;
    use crate::config::Scoring;
    use crate::game::{
        floating::drop_floating,
        landing::{Cascade, Effect},
    };
    use proptest::prelude::*;

    /// Rows a random grid may fill.
    const FILLED_ROWS: i32 = 6;

    const COLORS: [TokenColor; 3] = [TokenColor::Red, TokenColor::Blue, TokenColor::Green];

    /// A random grid of three colors, some reinforced, some frozen, with
    /// every token hanging from the ceiling.
    pub fn anchored_grid() -> impl Strategy<Value = HexGrid> {
        let slots: Vec<HexCoord> = GridBounds::default()
            .iter()
            .filter(|c| c.row < FILLED_ROWS)
            .collect();
        let cell = (0..COLORS.len() + 1, prop::bool::weighted(0.25), prop::bool::weighted(0.1));

        prop::collection::vec(cell, slots.len()).prop_map(move |cells| {
            let mut grid = HexGrid::new(GridBounds::default(), 40.0);
            for (&coord, &(color, reinforced, frozen)) in slots.iter().zip(&cells) {
                // The extra index leaves the slot empty
                let Some(&color) = COLORS.get(color) else {
                    continue;
                };
                grid.spawn(coord, color, reinforced).unwrap();
                grid.get_mut(coord).unwrap().frozen = frozen;
            }

            let mut scratch = Cascade::new(Effect::Placed {
                coord: HexCoord::new(0, 0),
                token: TokenId(0),
            });
            drop_floating(&mut grid, &Scoring::default(), &mut scratch);
            grid
        })
    }
}
