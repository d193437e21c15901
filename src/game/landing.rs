//! Landing - turning a stopped shot into grid changes.
//!
//! A plain shot snaps into the nearest empty slot and is matched. An
//! ability shot never takes a slot; it goes straight to its effect.

use bevy::prelude::*;

use super::{
    cluster::pop_cluster,
    error::CoreError,
    grid::HexGrid,
    hex::HexCoord,
    powerups::{self, Ability},
    projectile::{Flight, Stop},
    token::TokenId,
};
use crate::config::CoreConfig;

/// What a stopped shot turned into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// A new token was placed.
    Placed { coord: HexCoord, token: TokenId },
    /// An ability went off against the token at `target`.
    Power { ability: Ability, target: HexCoord },
    /// An ability shot reached no token and did nothing.
    Fizzled { ability: Ability },
}

/// Everything one shot changed on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    pub effect: Effect,
    /// Removed by matching or an ability.
    pub destroyed: Vec<TokenId>,
    /// Reinforced tokens that absorbed a match hit.
    pub damaged: Vec<TokenId>,
    /// Reinforced tokens an ability glanced off.
    pub bounced: Vec<TokenId>,
    /// Newly frozen tokens.
    pub frozen: Vec<TokenId>,
    /// Removed for losing their path to the ceiling.
    pub floating: Vec<TokenId>,
    pub points: u32,
}

impl Cascade {
    pub fn new(effect: Effect) -> Self {
        Self {
            effect,
            destroyed: Vec::new(),
            damaged: Vec::new(),
            bounced: Vec::new(),
            frozen: Vec::new(),
            floating: Vec::new(),
            points: 0,
        }
    }

    /// Fizzled shots cost nothing.
    pub fn consumes_move(&self) -> bool {
        !matches!(self.effect, Effect::Fizzled { .. })
    }

    /// Ability charge to spend for this shot, if any.
    pub fn ability_used(&self) -> Option<Ability> {
        match self.effect {
            Effect::Power { ability, .. } => Some(ability),
            _ => None,
        }
    }

    pub fn removed_count(&self) -> usize {
        self.destroyed.len() + self.floating.len()
    }
}

/// Find the empty slot whose center is closest to `position`.
///
/// Slots are scanned row-major, then by column; on equal distance the first
/// one scanned wins.
pub fn nearest_empty_slot(grid: &HexGrid, position: Vec2) -> Option<HexCoord> {
    let diameter = grid.diameter();
    let mut best: Option<(HexCoord, f32)> = None;

    for coord in grid.empty_slots() {
        let distance = position.distance(coord.to_pixel(diameter));
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((coord, distance));
        }
    }

    best.map(|(coord, _)| coord)
}

/// Resolve a stopped shot against the grid.
pub fn resolve_landing(
    grid: &mut HexGrid,
    stop: &Stop,
    config: &CoreConfig,
) -> Result<Cascade, CoreError> {
    match stop.flight {
        Flight::PowerTriggered {
            ability,
            collided: Some(target),
        } => {
            let mut cascade = Cascade::new(Effect::Power { ability, target });
            powerups::apply(
                ability,
                grid,
                target,
                &config.scoring,
                &config.freeze,
                &mut cascade,
            );
            Ok(cascade)
        }
        Flight::PowerTriggered {
            ability,
            collided: None,
        } => {
            info!("{} shot hit nothing and fizzled", ability);
            Ok(Cascade::new(Effect::Fizzled { ability }))
        }
        Flight::Landed { .. } | Flight::InFlight => {
            let Some(coord) = nearest_empty_slot(grid, stop.position) else {
                return Err(CoreError::NoEmptySlot {
                    max_rows: grid.bounds.max_rows,
                });
            };

            let token = grid.spawn(coord, stop.color, false)?;
            info!("Token {} landed at {} with color {:?}", token, coord, stop.color);

            let mut cascade = Cascade::new(Effect::Placed { coord, token });
            pop_cluster(grid, coord, &config.scoring, &mut cascade);
            Ok(cascade)
        }
    }
}
