//! Cluster detection - finding and popping matching tokens.
//!
//! Uses flood fill (BFS) to find connected groups of same-colored tokens.
//! When a cluster of 3+ is found, plain tokens pop and reinforced tokens
//! take a hit.

use bevy::prelude::*;

use super::{
    floating::drop_floating, flood::flood, grid::HexGrid, hex::HexCoord, landing::Cascade,
};
use crate::config::Scoring;

/// Minimum cluster size to pop (match-3).
pub const MIN_CLUSTER_SIZE: usize = 3;

/// Find all connected tokens sharing the color of the token at `start`.
///
/// Frozen tokens never join a cluster. Returns an empty list when `start`
/// is empty or frozen.
pub fn find_cluster(grid: &HexGrid, start: HexCoord) -> Vec<HexCoord> {
    let Some(color) = grid.get(start).map(|t| t.color) else {
        return Vec::new();
    };

    flood(grid, [start], |t| t.color == color && !t.frozen)
}

/// Match from the token that just landed at `start`.
///
/// Pops the cluster if it is large enough, then drops whatever lost its
/// anchor.
pub fn pop_cluster(grid: &mut HexGrid, start: HexCoord, scoring: &Scoring, cascade: &mut Cascade) {
    let cluster = find_cluster(grid, start);

    if cluster.len() < MIN_CLUSTER_SIZE {
        debug!("Cluster of {} at {} is too small to pop", cluster.len(), start);
        return;
    }

    let mut destroyed = 0;
    for coord in cluster.iter().copied() {
        let Some(token) = grid.get_mut(coord) else {
            continue;
        };

        if token.absorbs_hit() {
            token.hits_remaining -= 1;
            cascade.damaged.push(token.id);
        } else if let Some(id) = grid.destroy(coord) {
            cascade.destroyed.push(id);
            destroyed += 1;
        }
    }

    cascade.points += destroyed * scoring.destroy_points;
    info!(
        "Cluster of {} at {}: {} popped, {} reinforced hit",
        cluster.len(),
        start,
        destroyed,
        cascade.damaged.len()
    );

    if destroyed > 0 {
        drop_floating(grid, scoring, cascade);
    }
}
