//! Abilities - special shots that skip placement and matching.
//!
//! A level starts with a number of charges per ability. Firing one spends a
//! charge only if the shot actually reaches a token.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{floating::drop_floating, grid::HexGrid, hex::HexCoord, landing::Cascade};
use crate::config::{FreezeBand, Scoring};

/// All available abilities.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    /// Clears the struck row.
    Lightning,
    /// Clears the struck token and its neighbors.
    Bomb,
    /// Freezes a band of tokens above the strike.
    Freeze,
    /// Burns the struck token and every frozen token.
    Fire,
}

impl Ability {
    pub const ALL: [Ability; 4] = [Ability::Lightning, Ability::Bomb, Ability::Freeze, Ability::Fire];

    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            Ability::Lightning => "lightning",
            Ability::Bomb => "bomb",
            Ability::Freeze => "freeze",
            Ability::Fire => "fire",
        }
    }
}

impl std::fmt::Display for Ability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when an ability name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAbility(pub String);

impl std::fmt::Display for UnknownAbility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown ability '{}'", self.0)
    }
}

impl std::error::Error for UnknownAbility {}

impl FromStr for Ability {
    type Err = UnknownAbility;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ability::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownAbility(s.to_string()))
    }
}

/// Run `ability` against the token at `target`.
pub fn apply(
    ability: Ability,
    grid: &mut HexGrid,
    target: HexCoord,
    scoring: &Scoring,
    freeze: &FreezeBand,
    cascade: &mut Cascade,
) {
    match ability {
        Ability::Lightning => lightning(grid, target, scoring, cascade),
        Ability::Bomb => bomb(grid, target, scoring, cascade),
        Ability::Freeze => freeze_band(grid, target, freeze, cascade),
        Ability::Fire => fire(grid, target, scoring, cascade),
    }
}

/// Destroy `coords` and award ability points for each visible one.
fn blast(grid: &mut HexGrid, coords: Vec<HexCoord>, scoring: &Scoring, cascade: &mut Cascade) {
    let mut destroyed = 0;
    for coord in coords {
        if let Some(id) = grid.destroy(coord) {
            cascade.destroyed.push(id);
            destroyed += 1;
        }
    }
    cascade.points += destroyed * scoring.power_destroy_points;

    if destroyed > 0 {
        drop_floating(grid, scoring, cascade);
    }
}

/// Row-clear: everything in the struck row except reinforced tokens.
fn lightning(grid: &mut HexGrid, target: HexCoord, scoring: &Scoring, cascade: &mut Cascade) {
    let (reinforced, plain): (Vec<_>, Vec<_>) = grid
        .coords()
        .into_iter()
        .filter(|c| c.row == target.row)
        .partition(|c| grid.get(*c).is_some_and(|t| t.reinforced));

    cascade
        .bounced
        .extend(reinforced.iter().filter_map(|c| grid.get(*c)).map(|t| t.id));

    info!(
        "Lightning on row {}: {} cleared, {} bounced",
        target.row,
        plain.len(),
        reinforced.len()
    );
    blast(grid, plain, scoring, cascade);
}

/// Area-clear: the struck token and all of its neighbors, no exceptions.
fn bomb(grid: &mut HexGrid, target: HexCoord, scoring: &Scoring, cascade: &mut Cascade) {
    let mut area = vec![target];
    area.extend(grid.occupied_neighbors(target));

    info!("Bomb at {} hits {} tokens", target, area.len());
    blast(grid, area, scoring, cascade);
}

/// Freeze a band of columns from the struck row up toward the ceiling.
fn freeze_band(grid: &mut HexGrid, target: HexCoord, band: &FreezeBand, cascade: &mut Cascade) {
    let top_row = target.row - band.rows_above;
    let in_band = |c: &HexCoord| {
        (top_row..=target.row).contains(&c.row) && (c.col - target.col).abs() <= band.half_width
    };

    for coord in grid.coords().into_iter().filter(in_band) {
        if let Some(token) = grid.get_mut(coord)
            && !token.frozen
        {
            token.frozen = true;
            cascade.frozen.push(token.id);
        }
    }

    info!("Freeze at {} froze {} tokens", target, cascade.frozen.len());
}

/// Frozen-network-clear: the struck token plus every frozen token anywhere.
///
/// A reinforced, unfrozen target deflects the fire completely.
fn fire(grid: &mut HexGrid, target: HexCoord, scoring: &Scoring, cascade: &mut Cascade) {
    let Some(struck) = grid.get(target) else {
        return;
    };

    if struck.reinforced && !struck.frozen {
        info!("Fire bounced off reinforced token at {}", target);
        cascade.bounced.push(struck.id);
        return;
    }

    let mut burning = vec![target];
    burning.extend(
        grid.iter()
            .filter(|t| t.frozen && t.coord != target)
            .map(|t| t.coord),
    );

    info!("Fire at {} burns {} tokens", target, burning.len());
    blast(grid, burning, scoring, cascade);
}
