//! Session state - score, moves, abilities, win/lose conditions.
//!
//! Win: clear every token from the grid.
//! Lose: run out of moves.
//!
//! A [`Session`] owns the grid for one level and is advanced one tick at a
//! time. It accepts a new shot only while it is [`Phase::Ready`]; from the
//! moment a shot is fired until its floating cascade has been reported the
//! shooter is locked.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    error::CoreError,
    grid::HexGrid,
    landing::{Cascade, resolve_landing},
    pattern::{LevelColors, PatternLibrary},
    powerups::Ability,
    projectile::{Flight, Playfield, Projectile},
    token::{TokenColor, TokenId, TokenSnapshot},
};
use crate::config::CoreConfig;

/// What a level starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSetup {
    /// 1-based level index.
    pub level: u32,
    /// Move budget.
    pub moves: u32,
    /// Starting charges per ability.
    #[serde(default)]
    pub abilities: BTreeMap<Ability, u32>,
}

/// A request to shoot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireCommand {
    /// Radians off vertical, positive aims right.
    pub angle: f32,
    pub ability: Option<Ability>,
}

/// Why a fire command was turned away. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireRejection {
    /// A previous shot is still resolving.
    Busy,
    /// No charges left for the requested ability.
    NoCharges(Ability),
    /// The level has ended, failed, or been abandoned.
    LevelOver,
}

impl std::fmt::Display for FireRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FireRejection::Busy => f.write_str("a shot is still resolving"),
            FireRejection::NoCharges(ability) => write!(f, "no {ability} charges left"),
            FireRejection::LevelOver => f.write_str("the level is over"),
        }
    }
}

/// Result of one resolved shot, for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotReport {
    pub score_delta: u32,
    /// Tokens removed by matching or an ability, in blast order.
    pub destroyed: Vec<TokenId>,
    /// Reinforced tokens that absorbed a hit.
    pub damaged: Vec<TokenId>,
    /// Reinforced tokens an ability glanced off.
    pub bounced: Vec<TokenId>,
    pub frozen: Vec<TokenId>,
    /// Floating tokens already removed; their ids follow in the cascade report.
    pub floating_count: usize,
    pub ability: Option<Ability>,
    pub snapshot: Vec<TokenSnapshot>,
    pub score: u32,
    pub moves_remaining: u32,
}

/// Summary handed to the backend once per level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOutcome {
    pub level: u32,
    pub won: bool,
    pub final_score: u32,
    pub moves_used: u32,
    pub stars: u8,
    pub coins_earned: u32,
    pub abilities_used: BTreeMap<Ability, u32>,
    pub tokens_destroyed: u32,
}

/// Something the session wants the outside world to know.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    ShotResolved(ShotReport),
    /// An ability shot reached no token. Nothing was spent.
    ShotFizzled { ability: Ability },
    /// Delayed report of the tokens that fell during the last shot.
    FloatingCascade { tokens: Vec<TokenId> },
    LevelEnded(SessionOutcome),
}

/// Where the session is in its shot cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Waiting for the next shot.
    Ready,
    InFlight(Projectile),
    /// Shot resolved; floating tokens are reported once the delay runs out.
    Cascade {
        ticks_left: u32,
        floating: Vec<TokenId>,
    },
    Ended(SessionOutcome),
    /// An invariant broke; the level cannot continue.
    Failed,
    /// Torn down by [`Session::reset`].
    Abandoned,
}

/// One level in progress.
#[derive(Debug, Clone)]
pub struct Session {
    level: u32,
    config: CoreConfig,
    playfield: Playfield,
    grid: HexGrid,
    colors: LevelColors,
    loaded: TokenColor,
    next: TokenColor,
    score: u32,
    moves_budget: u32,
    moves_remaining: u32,
    abilities: BTreeMap<Ability, u32>,
    abilities_used: BTreeMap<Ability, u32>,
    tokens_destroyed: u32,
    phase: Phase,
}

impl Session {
    /// Start `setup.level` from the pattern library.
    pub fn new(
        setup: LevelSetup,
        library: &PatternLibrary,
        config: &CoreConfig,
    ) -> Result<Self, CoreError> {
        let (grid, colors) = library.load(setup.level, config)?;
        Self::from_grid(setup, grid, colors, config)
    }

    /// Start a level on an already built grid.
    pub fn from_grid(
        setup: LevelSetup,
        grid: HexGrid,
        mut colors: LevelColors,
        config: &CoreConfig,
    ) -> Result<Self, CoreError> {
        if setup.level == 0 {
            return Err(CoreError::InvalidLevel(setup.level));
        }

        let loaded = colors.next_shot_color(&grid);
        let next = colors.next_shot_color(&grid);

        info!(
            "Level {} started: {} tokens, {} moves, abilities {:?}",
            setup.level,
            grid.len(),
            setup.moves,
            setup.abilities
        );

        Ok(Self {
            level: setup.level,
            config: config.clone(),
            playfield: Playfield::from_config(config),
            grid,
            colors,
            loaded,
            next,
            score: 0,
            moves_budget: setup.moves,
            moves_remaining: setup.moves,
            abilities: setup.abilities,
            abilities_used: BTreeMap::new(),
            tokens_destroyed: 0,
            phase: Phase::Ready,
        })
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn grid(&self) -> &HexGrid {
        &self.grid
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Whether a new shot would be accepted.
    pub fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn moves_remaining(&self) -> u32 {
        self.moves_remaining
    }

    /// Color of the token the next plain shot fires.
    pub fn loaded_color(&self) -> TokenColor {
        self.loaded
    }

    /// Preview of the color after that.
    pub fn next_color(&self) -> TokenColor {
        self.next
    }

    pub fn charges(&self, ability: Ability) -> u32 {
        self.abilities.get(&ability).copied().unwrap_or(0)
    }

    /// The projectile currently in the air, if any.
    pub fn projectile(&self) -> Option<&Projectile> {
        match &self.phase {
            Phase::InFlight(projectile) => Some(projectile),
            _ => None,
        }
    }

    /// Launch a shot. Rejections leave the session untouched.
    pub fn fire(&mut self, command: FireCommand) -> Result<(), FireRejection> {
        match self.phase {
            Phase::Ready => {}
            Phase::InFlight(_) | Phase::Cascade { .. } => return Err(FireRejection::Busy),
            Phase::Ended(_) | Phase::Failed | Phase::Abandoned => {
                return Err(FireRejection::LevelOver);
            }
        }

        if self.moves_remaining == 0 {
            return Err(FireRejection::LevelOver);
        }

        if let Some(ability) = command.ability
            && self.charges(ability) == 0
        {
            return Err(FireRejection::NoCharges(ability));
        }

        let tuning = &self.config.projectile;
        let projectile = Projectile::launch(
            self.config.shooter_origin(),
            command.angle,
            tuning.speed,
            tuning.max_aim_angle,
            self.loaded,
            command.ability,
        );

        info!(
            "Fired {:?} token at angle {:.3} (ability {:?}, {} moves left)",
            self.loaded, command.angle, command.ability, self.moves_remaining
        );
        self.phase = Phase::InFlight(projectile);
        Ok(())
    }

    /// Advance one tick.
    ///
    /// A broken invariant moves the session to [`Phase::Failed`] and is
    /// returned as an error; later ticks do nothing.
    pub fn tick(&mut self) -> Result<Vec<CoreEvent>, CoreError> {
        let mut events = Vec::new();

        match &mut self.phase {
            Phase::InFlight(projectile) => {
                if projectile.step(&self.grid, &self.playfield) == Flight::InFlight {
                    if projectile.ticks >= self.config.projectile.max_flight_ticks {
                        let ticks = projectile.ticks;
                        return Err(self.fail(CoreError::ProjectileRunaway { ticks }));
                    }
                    return Ok(events);
                }

                let Some(stop) = projectile.stop() else {
                    return Ok(events);
                };
                let cascade = match resolve_landing(&mut self.grid, &stop, &self.config) {
                    Ok(cascade) => cascade,
                    Err(e) => return Err(self.fail(e)),
                };
                self.apply_cascade(cascade, &mut events);
            }
            Phase::Cascade {
                ticks_left,
                floating,
            } => {
                if *ticks_left > 0 {
                    *ticks_left -= 1;
                    return Ok(events);
                }

                let tokens = std::mem::take(floating);
                debug!("Reporting {} floating tokens", tokens.len());
                events.push(CoreEvent::FloatingCascade { tokens });
                self.finish_shot(&mut events);
            }
            // A level can start with nothing left to play for.
            Phase::Ready if self.moves_remaining == 0 || self.grid.is_empty() => {
                self.finish_shot(&mut events);
            }
            Phase::Ready | Phase::Ended(_) | Phase::Failed | Phase::Abandoned => {}
        }

        Ok(events)
    }

    /// Abandon the level immediately, mid-cascade included.
    pub fn reset(&mut self) {
        info!("Level {} abandoned", self.level);
        self.grid.clear();
        self.phase = Phase::Abandoned;
    }

    /// Summary of the level so far.
    pub fn outcome(&self) -> SessionOutcome {
        let won = self.grid.is_empty();
        let stars = if won { self.stars() } else { 0 };
        let rewards = &self.config.rewards;
        let coins_earned = u32::from(stars) * rewards.coins_per_star
            + self.score / rewards.score_per_coin.max(1);

        SessionOutcome {
            level: self.level,
            won,
            final_score: self.score,
            moves_used: self.moves_budget - self.moves_remaining,
            stars,
            coins_earned,
            abilities_used: self.abilities_used.clone(),
            tokens_destroyed: self.tokens_destroyed,
        }
    }

    /// 3 with at least half the budget left, 2 with a quarter, 1 otherwise.
    fn stars(&self) -> u8 {
        let remaining = u64::from(self.moves_remaining);
        let budget = u64::from(self.moves_budget);
        if remaining * 2 >= budget {
            3
        } else if remaining * 4 >= budget {
            2
        } else {
            1
        }
    }

    fn apply_cascade(&mut self, cascade: Cascade, events: &mut Vec<CoreEvent>) {
        if !cascade.consumes_move() {
            if let Some(ability) = self.fizzled_ability(&cascade) {
                events.push(CoreEvent::ShotFizzled { ability });
            }
            self.phase = Phase::Ready;
            return;
        }

        self.moves_remaining = self.moves_remaining.saturating_sub(1);
        self.score += cascade.points;
        self.tokens_destroyed += cascade.removed_count() as u32;

        let ability = cascade.ability_used();
        match ability {
            Some(ability) => {
                if let Some(charges) = self.abilities.get_mut(&ability) {
                    *charges = charges.saturating_sub(1);
                }
                *self.abilities_used.entry(ability).or_insert(0) += 1;
            }
            None => {
                self.loaded = self.next;
                self.next = self.colors.next_shot_color(&self.grid);
            }
        }

        info!(
            "Shot resolved: +{} points ({} destroyed, {} floating), score {}, {} moves left",
            cascade.points,
            cascade.destroyed.len(),
            cascade.floating.len(),
            self.score,
            self.moves_remaining
        );

        events.push(CoreEvent::ShotResolved(ShotReport {
            score_delta: cascade.points,
            destroyed: cascade.destroyed,
            damaged: cascade.damaged,
            bounced: cascade.bounced,
            frozen: cascade.frozen,
            floating_count: cascade.floating.len(),
            ability,
            snapshot: self.grid.snapshot(),
            score: self.score,
            moves_remaining: self.moves_remaining,
        }));

        if cascade.floating.is_empty() {
            self.finish_shot(events);
        } else {
            self.phase = Phase::Cascade {
                ticks_left: self.config.floating_cascade_delay,
                floating: cascade.floating,
            };
        }
    }

    fn fizzled_ability(&self, cascade: &Cascade) -> Option<Ability> {
        match cascade.effect {
            super::landing::Effect::Fizzled { ability } => Some(ability),
            _ => None,
        }
    }

    /// Release the shooter, or end the level.
    fn finish_shot(&mut self, events: &mut Vec<CoreEvent>) {
        // A stale shot color can no longer match after its color is cleared.
        if !self.grid.iter().any(|t| t.color == self.loaded) {
            self.loaded = self.colors.next_shot_color(&self.grid);
        }
        if !self.grid.iter().any(|t| t.color == self.next) {
            self.next = self.colors.next_shot_color(&self.grid);
        }

        if self.grid.is_empty() || self.moves_remaining == 0 {
            let outcome = self.outcome();
            info!(
                "Level {} {}: score {}, {} stars, {} coins",
                outcome.level,
                if outcome.won { "won" } else { "lost" },
                outcome.final_score,
                outcome.stars,
                outcome.coins_earned
            );
            events.push(CoreEvent::LevelEnded(outcome.clone()));
            self.phase = Phase::Ended(outcome);
        } else {
            self.phase = Phase::Ready;
        }
    }

    fn fail(&mut self, error: CoreError) -> CoreError {
        error!("Level {} failed: {}", self.level, error);
        self.phase = Phase::Failed;
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{grid::GridBounds, hex::HexCoord};

    fn session(cells: &[(i32, i32, TokenColor)], moves: u32, abilities: &[(Ability, u32)]) -> Session {
        session_with(cells, moves, abilities, &CoreConfig::default())
    }

    fn session_with(
        cells: &[(i32, i32, TokenColor)],
        moves: u32,
        abilities: &[(Ability, u32)],
        config: &CoreConfig,
    ) -> Session {
        let mut grid = HexGrid::new(GridBounds::new(config.max_rows), config.token_diameter);
        for &(row, col, color) in cells {
            grid.spawn(HexCoord::new(row, col), color, false).unwrap();
        }
        let setup = LevelSetup {
            level: 1,
            moves,
            abilities: abilities.iter().copied().collect(),
        };
        Session::from_grid(setup, grid, LevelColors::for_level(1, 4), config).unwrap()
    }

    fn straight_up(ability: Option<Ability>) -> FireCommand {
        FireCommand {
            angle: 0.0,
            ability,
        }
    }

    /// Tick until the session is ready or over, collecting every event.
    fn settle(session: &mut Session) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        for _ in 0..1_000 {
            events.extend(session.tick().unwrap());
            if matches!(session.phase(), Phase::Ready | Phase::Ended(_)) {
                break;
            }
        }
        events
    }

    fn ended(events: &[CoreEvent]) -> Option<&SessionOutcome> {
        events.iter().find_map(|e| match e {
            CoreEvent::LevelEnded(outcome) => Some(outcome),
            _ => None,
        })
    }

    #[test]
    fn test_clearing_the_grid_wins() {
        use TokenColor::*;
        // The shot touches (0,4) and snaps into (1,3), completing a red triple
        let mut s = session(&[(0, 3, Red), (0, 4, Red)], 5, &[]);
        assert_eq!(s.loaded_color(), Red);

        s.fire(straight_up(None)).unwrap();
        let events = settle(&mut s);

        let outcome = ended(&events).unwrap();
        assert!(outcome.won);
        assert_eq!(outcome.final_score, 30);
        assert_eq!(outcome.moves_used, 1);
        assert_eq!(outcome.stars, 3);
        assert_eq!(outcome.coins_earned, 30);
        assert_eq!(outcome.tokens_destroyed, 3);
        assert!(matches!(s.phase(), Phase::Ended(_)));
        assert_eq!(s.fire(straight_up(None)), Err(FireRejection::LevelOver));
    }

    #[test]
    fn test_running_out_of_moves_loses() {
        use TokenColor::*;
        let mut s = session(&[(0, 0, Red), (0, 8, Red)], 1, &[]);

        s.fire(straight_up(None)).unwrap();
        let events = settle(&mut s);

        let outcome = ended(&events).unwrap();
        assert!(!outcome.won);
        assert_eq!(outcome.stars, 0);
        assert_eq!(outcome.coins_earned, 0);
        assert_eq!(s.moves_remaining(), 0);
        assert!(s.grid().is_occupied(HexCoord::new(0, 4)));
    }

    #[test]
    fn test_shooter_is_locked_while_resolving() {
        let mut s = session(&[(0, 0, TokenColor::Red)], 5, &[]);
        s.fire(straight_up(None)).unwrap();

        assert!(!s.is_ready());
        assert_eq!(s.fire(straight_up(None)), Err(FireRejection::Busy));
        assert!(s.projectile().is_some());
    }

    #[test]
    fn test_floating_report_waits_for_cascade_delay() {
        use TokenColor::*;
        // Blue at (2,3) hangs only from the slot the shot lands in
        let mut s = session(&[(0, 3, Red), (0, 4, Red), (2, 3, Blue), (0, 8, Yellow)], 5, &[]);
        s.loaded = Red;
        s.fire(straight_up(None)).unwrap();

        let mut report = None;
        while report.is_none() {
            for event in s.tick().unwrap() {
                if let CoreEvent::ShotResolved(r) = event {
                    report = Some(r);
                }
            }
        }
        let report = report.unwrap();
        assert_eq!(report.floating_count, 1);
        assert_eq!(report.score_delta, 3 * 10 + 20);
        assert!(matches!(s.phase(), Phase::Cascade { .. }));
        assert_eq!(s.fire(straight_up(None)), Err(FireRejection::Busy));

        let delay = CoreConfig::default().floating_cascade_delay;
        let mut waited = 0;
        let tokens = loop {
            waited += 1;
            let events = s.tick().unwrap();
            if let Some(CoreEvent::FloatingCascade { tokens }) = events.first() {
                break tokens.clone();
            }
            assert!(waited <= delay);
        };

        assert_eq!(waited, delay + 1);
        assert_eq!(tokens.len(), 1);
        assert!(s.is_ready());
        assert_eq!(s.grid().coords(), vec![HexCoord::new(0, 8)]);
    }

    #[test]
    fn test_ability_without_charges_is_rejected() {
        let mut s = session(&[(0, 0, TokenColor::Red)], 5, &[(Ability::Fire, 1)]);
        assert_eq!(
            s.fire(straight_up(Some(Ability::Bomb))),
            Err(FireRejection::NoCharges(Ability::Bomb))
        );
        assert!(s.is_ready());
    }

    #[test]
    fn test_bomb_spends_a_charge_and_a_move() {
        use TokenColor::*;
        let mut s = session(&[(0, 4, Red), (0, 3, Blue), (0, 0, Green)], 5, &[(Ability::Bomb, 1)]);

        s.fire(straight_up(Some(Ability::Bomb))).unwrap();
        let events = settle(&mut s);

        let Some(CoreEvent::ShotResolved(report)) = events.first() else {
            panic!("expected a resolved shot, got {events:?}");
        };
        assert_eq!(report.ability, Some(Ability::Bomb));
        assert_eq!(report.destroyed.len(), 2);
        assert_eq!(report.score_delta, 2 * 15);
        assert_eq!(s.moves_remaining(), 4);
        assert_eq!(s.charges(Ability::Bomb), 0);
        assert_eq!(s.outcome().abilities_used.get(&Ability::Bomb), Some(&1));
        assert_eq!(
            s.fire(straight_up(Some(Ability::Bomb))),
            Err(FireRejection::NoCharges(Ability::Bomb))
        );
    }

    #[test]
    fn test_fizzled_ability_costs_nothing() {
        let mut s = session(&[(0, 0, TokenColor::Red)], 5, &[(Ability::Lightning, 1)]);

        s.fire(straight_up(Some(Ability::Lightning))).unwrap();
        let events = settle(&mut s);

        assert_eq!(
            events,
            vec![CoreEvent::ShotFizzled {
                ability: Ability::Lightning
            }]
        );
        assert!(s.is_ready());
        assert_eq!(s.moves_remaining(), 5);
        assert_eq!(s.charges(Ability::Lightning), 1);
        assert_eq!(s.grid().len(), 1);
    }

    #[test]
    fn test_reset_abandons_mid_flight() {
        let mut s = session(&[(0, 0, TokenColor::Red)], 5, &[]);
        s.fire(straight_up(None)).unwrap();
        s.tick().unwrap();

        s.reset();
        assert_eq!(s.phase(), &Phase::Abandoned);
        assert!(s.grid().is_empty());
        assert!(s.tick().unwrap().is_empty());
        assert_eq!(s.fire(straight_up(None)), Err(FireRejection::LevelOver));
    }

    #[test]
    fn test_runaway_projectile_fails_the_level() {
        let mut config = CoreConfig::default();
        config.projectile.max_flight_ticks = 5;
        let mut s = session_with(&[(0, 0, TokenColor::Red)], 5, &[], &config);

        s.fire(straight_up(None)).unwrap();
        let err = (0..10).find_map(|_| s.tick().err()).unwrap();

        assert_eq!(err, CoreError::ProjectileRunaway { ticks: 5 });
        assert_eq!(s.phase(), &Phase::Failed);
        assert!(s.tick().unwrap().is_empty());
    }

    #[test]
    fn test_zero_move_budget_ends_on_first_tick() {
        let mut s = session(&[(0, 0, TokenColor::Red)], 0, &[]);
        assert_eq!(s.fire(straight_up(None)), Err(FireRejection::LevelOver));

        let events = s.tick().unwrap();
        let outcome = ended(&events).unwrap();
        assert!(!outcome.won);
        assert_eq!(outcome.moves_used, 0);
        assert_eq!(outcome.stars, 0);
        assert!(matches!(s.phase(), Phase::Ended(_)));
        assert!(s.tick().unwrap().is_empty());
    }

    #[test]
    fn test_empty_starting_grid_is_an_immediate_win() {
        let mut s = session(&[], 5, &[]);
        let outcome = ended(&s.tick().unwrap()).cloned().unwrap();
        assert!(outcome.won);
        assert_eq!(outcome.stars, 3);
    }

    #[test]
    fn test_preview_color_follows_the_grid() {
        use TokenColor::*;
        let mut s = session(&[(0, 4, Red), (0, 3, Blue), (0, 0, Green)], 5, &[(Ability::Bomb, 1)]);
        s.loaded = Green;
        s.next = Red;

        s.fire(straight_up(Some(Ability::Bomb))).unwrap();
        settle(&mut s);

        assert_eq!(s.grid().coords(), vec![HexCoord::new(0, 0)]);
        assert_eq!(s.loaded_color(), Green);
        assert_eq!(s.next_color(), Green);
    }

    #[test]
    fn test_star_thresholds() {
        let mut s = session(&[(0, 0, TokenColor::Red)], 8, &[]);
        for (remaining, stars) in [(8, 3), (4, 3), (3, 2), (2, 2), (1, 1), (0, 1)] {
            s.moves_remaining = remaining;
            assert_eq!(s.stars(), stars, "{remaining} of 8 moves left");
        }
    }

    #[test]
    fn test_new_loads_from_library() {
        let library = PatternLibrary::builtin();
        let config = CoreConfig::default();
        let setup = LevelSetup {
            level: 3,
            moves: 20,
            abilities: BTreeMap::new(),
        };

        let s = Session::new(setup.clone(), &library, &config).unwrap();
        assert!(!s.grid().is_empty());
        assert!(s.grid().iter().any(|t| t.color == s.loaded_color()));

        let zero = LevelSetup { level: 0, ..setup };
        assert!(Session::new(zero, &library, &config).is_err());
    }

    #[test]
    fn test_setup_deserializes_ability_charges() {
        let setup: LevelSetup =
            serde_json::from_str(r#"{"level": 2, "moves": 15, "abilities": {"bomb": 2}}"#).unwrap();
        assert_eq!(setup.abilities.get(&Ability::Bomb), Some(&2));
    }
}
