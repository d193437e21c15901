//! Floating detection - tokens that lost their path to the ceiling fall.

use bevy::prelude::*;
use std::collections::HashSet;

use super::{flood::flood, grid::HexGrid, hex::HexCoord, landing::Cascade};
use crate::config::Scoring;

/// Every visible token connected to row 0 through visible tokens of any color.
pub fn find_anchored(grid: &HexGrid) -> HashSet<HexCoord> {
    flood(grid, grid.top_row_coords(), |_| true).into_iter().collect()
}

/// Remove every visible token not anchored to the ceiling.
///
/// Runs one pass: removing floaters can never disconnect anything else,
/// since whatever hangs off a floater is a floater too.
pub fn drop_floating(grid: &mut HexGrid, scoring: &Scoring, cascade: &mut Cascade) {
    let anchored = find_anchored(grid);

    let floating: Vec<HexCoord> = grid
        .coords()
        .into_iter()
        .filter(|c| !anchored.contains(c))
        .collect();

    if floating.is_empty() {
        return;
    }

    let mut dropped = 0;
    for coord in floating {
        if let Some(id) = grid.destroy(coord) {
            cascade.floating.push(id);
            dropped += 1;
        }
    }

    let bonus = dropped * scoring.floating_bonus;
    cascade.points += bonus;
    info!("Dropped {} floating tokens, +{} bonus points", dropped, bonus);
}
