//! Errors raised by the core.
//!
//! Everything here is fatal for the current level. Ordinary rejections
//! (busy shooter, empty ability slot) are [`FireRejection`](super::state::FireRejection)
//! instead and never reach this type.

use std::fmt;

use super::hex::HexCoord;

#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The landing scan found no empty address inside the row bound.
    NoEmptySlot { max_rows: i32 },
    /// A projectile kept flying past the tick guard.
    ProjectileRunaway { ticks: u32 },
    /// Tried to spawn a token on an occupied or out-of-bounds address.
    SlotOccupied(HexCoord),
    /// A level template could not be parsed.
    Pattern { name: String, reason: String },
    /// Level indices start at 1.
    InvalidLevel(u32),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::NoEmptySlot { max_rows } => {
                write!(f, "no empty slot left within {max_rows} rows")
            }
            CoreError::ProjectileRunaway { ticks } => {
                write!(f, "projectile still in flight after {ticks} ticks")
            }
            CoreError::SlotOccupied(coord) => write!(f, "cannot place a token at {coord}"),
            CoreError::Pattern { name, reason } => {
                write!(f, "level template '{name}' is invalid: {reason}")
            }
            CoreError::InvalidLevel(level) => write!(f, "level index must be >= 1, got {level}"),
        }
    }
}

impl std::error::Error for CoreError {}
