//! Level patterns - textual templates that seed the grid.
//!
//! A template is a few rows of characters: `x` marks a token, `.` or a space
//! marks an empty slot. Colors are not part of the template; they come from a
//! generator seeded with the level index, so a level always looks the same.

use bevy::prelude::*;
use rand::{Rng, SeedableRng, seq::SliceRandom};
use rand_pcg::Pcg32;

use super::{
    error::CoreError,
    grid::{GridBounds, HexGrid},
    hex::HexCoord,
    token::TokenColor,
};
use crate::config::CoreConfig;

/// Template character for an occupied slot.
pub const OCCUPIED: char = 'x';

/// Fewest colors any level uses.
const BASE_COLORS: usize = 3;

/// Levels between each extra palette color.
const LEVELS_PER_COLOR: u32 = 3;

/// One parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelTemplate {
    pub name: String,
    cells: Vec<HexCoord>,
}

impl LevelTemplate {
    /// Parse rows of template text.
    pub fn parse(name: &str, text: &str, bounds: GridBounds) -> Result<Self, CoreError> {
        let invalid = |reason: String| CoreError::Pattern {
            name: name.to_string(),
            reason,
        };

        let rows: Vec<&str> = text.lines().collect();
        if rows.len() as i32 > bounds.max_rows {
            return Err(invalid(format!(
                "{} rows do not fit in {} grid rows",
                rows.len(),
                bounds.max_rows
            )));
        }

        let mut cells = Vec::new();
        for (row, line) in rows.iter().enumerate() {
            let row = row as i32;
            let line = line.trim_end();
            let width = HexCoord::new(row, 0).row_width();
            if line.chars().count() as i32 > width {
                return Err(invalid(format!("row {row} is wider than {width} slots")));
            }

            for (col, ch) in line.chars().enumerate() {
                match ch {
                    OCCUPIED => cells.push(HexCoord::new(row, col as i32)),
                    '.' | ' ' => {}
                    other => {
                        return Err(invalid(format!("unexpected '{other}' in row {row}")));
                    }
                }
            }
        }

        if !cells.iter().any(|c| c.row == 0) {
            return Err(invalid("no token touches the ceiling".to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            cells,
        })
    }

    /// Occupied addresses, row-major.
    pub fn cells(&self) -> &[HexCoord] {
        &self.cells
    }
}

/// Colors a level uses, derived once from its index.
#[derive(Debug, Clone)]
pub struct LevelColors {
    pub palette: Vec<TokenColor>,
    /// Every token of this color starts reinforced.
    pub reinforced: Option<TokenColor>,
    rng: Pcg32,
}

impl LevelColors {
    pub fn for_level(level: u32, reinforced_from_level: u32) -> Self {
        let mut rng = Pcg32::seed_from_u64(u64::from(level));

        let size = (BASE_COLORS + (level.saturating_sub(1) / LEVELS_PER_COLOR) as usize)
            .min(TokenColor::ALL.len());
        let mut palette = TokenColor::ALL.to_vec();
        palette.shuffle(&mut rng);
        palette.truncate(size);

        let reinforced = (level >= reinforced_from_level)
            .then(|| palette[rng.random_range(0..palette.len())]);

        Self {
            palette,
            reinforced,
            rng,
        }
    }

    /// Next color from the level's sequence.
    pub fn next_color(&mut self) -> TokenColor {
        let idx = self.rng.random_range(0..self.palette.len());
        self.palette[idx]
    }

    /// Color for the next shot: one still on the grid, so every shot can
    /// make progress. Falls back to the palette once the grid is empty.
    pub fn next_shot_color(&mut self, grid: &HexGrid) -> TokenColor {
        let mut on_grid: Vec<TokenColor> = grid.iter().map(|t| t.color).collect();
        on_grid.sort_unstable();
        on_grid.dedup();

        if on_grid.is_empty() {
            return self.next_color();
        }
        on_grid[self.rng.random_range(0..on_grid.len())]
    }
}

/// Named templates, picked by level index.
#[derive(Resource, Debug, Clone)]
pub struct PatternLibrary {
    templates: Vec<LevelTemplate>,
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PatternLibrary {
    /// Build a library from already parsed templates.
    pub fn new(templates: Vec<LevelTemplate>) -> Result<Self, CoreError> {
        if templates.is_empty() {
            return Err(CoreError::Pattern {
                name: "<library>".to_string(),
                reason: "a pattern library needs at least one template".to_string(),
            });
        }
        Ok(Self { templates })
    }

    /// The templates shipped with the game.
    pub fn builtin() -> Self {
        let bounds = GridBounds::default();
        let templates = BUILTIN_TEMPLATES
            .iter()
            .filter_map(|(name, text)| match LevelTemplate::parse(name, text, bounds) {
                Ok(template) => Some(template),
                Err(e) => {
                    error!("Skipping built-in template: {}", e);
                    None
                }
            })
            .collect();
        Self { templates }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// The template for `level`: index modulo library size.
    pub fn select(&self, level: u32) -> Option<&LevelTemplate> {
        if self.templates.is_empty() {
            return None;
        }
        self.templates.get(level as usize % self.templates.len())
    }

    /// Build the starting grid for `level`.
    pub fn load(&self, level: u32, config: &CoreConfig) -> Result<(HexGrid, LevelColors), CoreError> {
        if level == 0 {
            return Err(CoreError::InvalidLevel(level));
        }

        let Some(template) = self.select(level) else {
            return Err(CoreError::Pattern {
                name: "<library>".to_string(),
                reason: "no templates loaded".to_string(),
            });
        };

        if let Some(deepest) = template.cells().iter().map(|c| c.row).max()
            && deepest >= config.max_rows
        {
            return Err(CoreError::Pattern {
                name: template.name.clone(),
                reason: format!(
                    "needs {} rows but the grid has {}",
                    deepest + 1,
                    config.max_rows
                ),
            });
        }

        let bounds = GridBounds::new(config.max_rows);
        let mut grid = HexGrid::new(bounds, config.token_diameter);
        let mut colors = LevelColors::for_level(level, config.reinforced_from_level);

        for &coord in template.cells() {
            let color = colors.next_color();
            grid.spawn(coord, color, colors.reinforced == Some(color))?;
        }

        info!(
            "Level {} uses template '{}': {} tokens, palette {:?}, reinforced {:?}",
            level,
            template.name,
            grid.len(),
            colors.palette,
            colors.reinforced
        );
        Ok((grid, colors))
    }
}

const BUILTIN_TEMPLATES: [(&str, &str); 5] = [
    (
        "wall",
        "xxxxxxxxx\n\
         xxxxxxxx\n\
         xxxxxxxxx\n\
         xxxxxxxx\n\
         xxxxxxxxx",
    ),
    (
        "pyramid",
        "xxxxxxxxx\n\
         xxxxxxxx\n\
         .xxxxxxx\n\
         .xxxxxx\n\
         ..xxxxx\n\
         ..xxxx\n\
         ...xxx",
    ),
    (
        "pillars",
        "xxxxxxxxx\n\
         xx.xx.xx\n\
         xx.xx.xxx\n\
         xx.xx.xx\n\
         xx.xx.xxx\n\
         x..x..x",
    ),
    (
        "diamond",
        "xxxxxxxxx\n\
         ...xx...\n\
         ..xxxxx\n\
         .xxxxxx\n\
         .xxxxxxx\n\
         .xxxxxx\n\
         ..xxxxx\n\
         ...xx",
    ),
    (
        "checker",
        "xxxxxxxxx\n\
         x.x.x.x.\n\
         xxxxxxxxx\n\
         .x.x.x.x\n\
         xxxxxxxxx\n\
         x.x.x.x.",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_all_parse() {
        assert_eq!(PatternLibrary::builtin().len(), BUILTIN_TEMPLATES.len());
    }

    #[test]
    fn test_parse_reads_markers() {
        let template = LevelTemplate::parse("t", "x.x\n x", GridBounds::default()).unwrap();
        assert_eq!(
            template.cells(),
            &[HexCoord::new(0, 0), HexCoord::new(0, 2), HexCoord::new(1, 1)]
        );
    }

    #[test]
    fn test_parse_rejects_wide_odd_row() {
        let err = LevelTemplate::parse("t", "xxxxxxxxx\nxxxxxxxxx", GridBounds::default()).unwrap_err();
        assert!(matches!(err, CoreError::Pattern { .. }));
    }

    #[test]
    fn test_parse_rejects_unknown_characters() {
        assert!(LevelTemplate::parse("t", "xxo", GridBounds::default()).is_err());
    }

    #[test]
    fn test_parse_rejects_floating_template() {
        assert!(LevelTemplate::parse("t", "....\nxxxx", GridBounds::default()).is_err());
    }

    #[test]
    fn test_parse_rejects_too_many_rows() {
        let text = vec!["x"; 3].join("\n");
        assert!(LevelTemplate::parse("t", &text, GridBounds::new(2)).is_err());
    }

    #[test]
    fn test_selection_wraps_around_library() {
        let library = PatternLibrary::builtin();
        let n = library.len() as u32;
        assert_eq!(library.select(2).unwrap().name, library.select(2 + n).unwrap().name);
        assert_eq!(library.select(n).unwrap().name, library.select(0).unwrap().name);
    }

    #[test]
    fn test_same_level_loads_identically() {
        let library = PatternLibrary::builtin();
        let config = CoreConfig::default();
        let (a, _) = library.load(7, &config).unwrap();
        let (b, _) = library.load(7, &config).unwrap();
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_palette_grows_with_level() {
        assert_eq!(LevelColors::for_level(1, 4).palette.len(), 3);
        assert_eq!(LevelColors::for_level(4, 4).palette.len(), 4);
        assert_eq!(LevelColors::for_level(100, 4).palette.len(), 6);
    }

    #[test]
    fn test_reinforced_color_from_threshold_level() {
        let config = CoreConfig::default();
        let library = PatternLibrary::builtin();

        let (early, colors) = library.load(1, &config).unwrap();
        assert_eq!(colors.reinforced, None);
        assert!(early.iter().all(|t| !t.reinforced));

        let (late, colors) = library.load(9, &config).unwrap();
        let guarded = colors.reinforced.unwrap();
        assert!(colors.palette.contains(&guarded));
        for token in late.iter() {
            assert_eq!(token.reinforced, token.color == guarded);
            assert_eq!(token.hits_remaining, if token.reinforced { 2 } else { 1 });
        }
    }

    #[test]
    fn test_shot_colors_come_from_the_grid() {
        let config = CoreConfig::default();
        let mut grid = HexGrid::new(GridBounds::new(config.max_rows), config.token_diameter);
        grid.spawn(HexCoord::new(0, 0), TokenColor::Orange, false).unwrap();
        grid.spawn(HexCoord::new(0, 1), TokenColor::Orange, false).unwrap();

        let mut colors = LevelColors::for_level(2, 4);
        for _ in 0..20 {
            assert_eq!(colors.next_shot_color(&grid), TokenColor::Orange);
        }

        grid.clear();
        let fallback = colors.next_shot_color(&grid);
        assert!(colors.palette.contains(&fallback));
    }

    #[test]
    fn test_level_zero_is_rejected() {
        let library = PatternLibrary::builtin();
        assert_eq!(
            library.load(0, &CoreConfig::default()).unwrap_err(),
            CoreError::InvalidLevel(0)
        );
    }

    #[test]
    fn test_template_taller_than_grid_is_rejected() {
        let library = PatternLibrary::builtin();
        let mut config = CoreConfig::default();
        config.max_rows = 2;

        let err = library.load(1, &config).unwrap_err();
        assert!(matches!(err, CoreError::Pattern { .. }), "{err:?}");
    }

    #[test]
    fn test_empty_library_is_rejected() {
        assert!(PatternLibrary::new(Vec::new()).is_err());
    }
}
