//! Tokens - the colored cells packed into the grid.
//!
//! When 3+ of the same color are connected, they pop.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::hex::HexCoord;

/// Hits a reinforced token absorbs before it can be removed.
pub const REINFORCED_HITS: u8 = 2;

/// The token palette.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Reflect, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TokenColor {
    #[default]
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
}

impl TokenColor {
    pub const ALL: [TokenColor; 6] = [
        TokenColor::Red,
        TokenColor::Blue,
        TokenColor::Green,
        TokenColor::Yellow,
        TokenColor::Purple,
        TokenColor::Orange,
    ];
}

/// Identifier handed to the presentation layer. Unique within a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u32);

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single token on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: TokenId,
    pub coord: HexCoord,
    /// Pixel center, derived from `coord` when the token is spawned.
    pub position: Vec2,
    pub color: TokenColor,
    /// False once the token has been destroyed.
    pub visible: bool,
    pub reinforced: bool,
    pub hits_remaining: u8,
    pub frozen: bool,
}

impl Token {
    pub(crate) fn new(
        id: TokenId,
        coord: HexCoord,
        position: Vec2,
        color: TokenColor,
        reinforced: bool,
    ) -> Self {
        Self {
            id,
            coord,
            position,
            color,
            visible: true,
            reinforced,
            hits_remaining: if reinforced { REINFORCED_HITS } else { 1 },
            frozen: false,
        }
    }

    /// Whether a qualifying match only dents this token instead of removing it.
    #[inline]
    pub fn absorbs_hit(&self) -> bool {
        self.reinforced && self.hits_remaining > 1
    }

    pub fn snapshot(&self) -> TokenSnapshot {
        TokenSnapshot {
            id: self.id,
            row: self.coord.row,
            col: self.coord.col,
            x: self.position.x,
            y: self.position.y,
            color: self.color,
            reinforced: self.reinforced,
            hits_remaining: self.hits_remaining,
            frozen: self.frozen,
        }
    }
}

/// The view of a visible token handed to the renderer after every shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub id: TokenId,
    pub row: i32,
    pub col: i32,
    pub x: f32,
    pub y: f32,
    pub color: TokenColor,
    pub reinforced: bool,
    pub hits_remaining: u8,
    pub frozen: bool,
}
