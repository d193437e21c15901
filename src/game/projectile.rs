//! Projectile - the token being shot.
//!
//! The projectile travels in a straight line, bouncing off the side walls,
//! until it touches another token or the ceiling. Each call to
//! [`Projectile::step`] is one discrete tick; nothing here reads a clock.

use bevy::prelude::*;

use super::{grid::HexGrid, hex::HexCoord, powerups::Ability, token::TokenColor};
use crate::config::CoreConfig;

/// Walls and collision radii a projectile flies between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playfield {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    /// Projectile radius used against the walls and ceiling.
    pub radius: f32,
    /// Center distance below which a token counts as hit.
    pub collision_distance: f32,
}

impl Playfield {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            left: 0.0,
            right: config.playfield_width(),
            top: 0.0,
            radius: config.token_radius(),
            collision_distance: config.token_diameter * config.projectile.collision_fraction,
        }
    }
}

/// Where a projectile is in its life.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flight {
    InFlight,
    /// Stopped against a token or, with `collided: None`, the ceiling.
    Landed { collided: Option<HexCoord> },
    /// An ability shot stopped; placement is skipped.
    PowerTriggered {
        ability: Ability,
        collided: Option<HexCoord>,
    },
}

/// A stopped shot, ready for the landing resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stop {
    pub position: Vec2,
    pub color: TokenColor,
    pub flight: Flight,
}

/// The token currently in the air.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub position: Vec2,
    /// Pixels per tick.
    pub velocity: Vec2,
    pub color: TokenColor,
    pub ability: Option<Ability>,
    /// Ticks flown so far.
    pub ticks: u32,
    flight: Flight,
}

impl Projectile {
    /// Fire from `origin` at `angle` radians off vertical (positive aims right).
    ///
    /// The angle is clamped to `±max_angle` so shots always travel upward.
    pub fn launch(
        origin: Vec2,
        angle: f32,
        speed: f32,
        max_angle: f32,
        color: TokenColor,
        ability: Option<Ability>,
    ) -> Self {
        let angle = if angle.is_finite() { angle } else { 0.0 };
        let clamped = angle.clamp(-max_angle, max_angle);
        let velocity = Vec2::new(clamped.sin(), -clamped.cos()) * speed;

        Self {
            position: origin,
            velocity,
            color,
            ability,
            ticks: 0,
            flight: Flight::InFlight,
        }
    }

    pub fn flight(&self) -> Flight {
        self.flight
    }

    /// The stopped shot, once the projectile has left [`Flight::InFlight`].
    pub fn stop(&self) -> Option<Stop> {
        match self.flight {
            Flight::InFlight => None,
            flight => Some(Stop {
                position: self.position,
                color: self.color,
                flight,
            }),
        }
    }

    /// Advance one tick. A stopped projectile stays where it is.
    pub fn step(&mut self, grid: &HexGrid, field: &Playfield) -> Flight {
        if self.flight != Flight::InFlight {
            return self.flight;
        }

        self.ticks += 1;
        self.position += self.velocity;

        // Left wall bounce
        if self.position.x - field.radius < field.left {
            self.position.x = field.left + field.radius;
            self.velocity.x = self.velocity.x.abs();
        }

        // Right wall bounce
        if self.position.x + field.radius > field.right {
            self.position.x = field.right - field.radius;
            self.velocity.x = -self.velocity.x.abs();
        }

        let collided = self.nearest_hit(grid, field);
        if collided.is_some() || self.position.y - field.radius <= field.top {
            self.flight = match self.ability {
                Some(ability) => Flight::PowerTriggered { ability, collided },
                None => Flight::Landed { collided },
            };
            debug!(
                "Projectile stopped at {:?} after {} ticks ({:?})",
                self.position, self.ticks, self.flight
            );
        }

        self.flight
    }

    /// Closest visible token within collision distance, if any.
    fn nearest_hit(&self, grid: &HexGrid, field: &Playfield) -> Option<HexCoord> {
        let mut best: Option<(HexCoord, f32)> = None;

        for token in grid.iter() {
            let distance = self.position.distance(token.position);
            if distance < field.collision_distance && best.is_none_or(|(_, d)| distance < d) {
                best = Some((token.coord, distance));
            }
        }

        best.map(|(coord, _)| coord)
    }
}
