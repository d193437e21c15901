//! The gameplay core of the token shooter.
//!
//! This module contains all the gameplay logic including:
//! - Hexagonal grid addressing (odd-r offset rows)
//! - Tokens, level patterns and seeded colors
//! - Projectile physics
//! - Cluster matching and floating detection
//! - Abilities
//! - The per-level session, driven from `FixedUpdate`
//!
//! Rendering, input and persistence live elsewhere and talk to the core
//! through the messages declared here.

pub mod cluster;
pub mod error;
pub mod floating;
pub mod flood;
pub mod grid;
pub mod hex;
pub mod landing;
pub mod pattern;
pub mod powerups;
pub mod projectile;
pub mod state;
pub mod token;

use bevy::prelude::*;

use crate::config::CoreConfig;
use pattern::PatternLibrary;
use powerups::Ability;
use state::{
    CoreEvent, FireCommand, FireRejection, LevelSetup, Session, SessionOutcome, ShotReport,
};
use token::TokenId;

pub(crate) fn plugin(app: &mut App) {
    app.init_resource::<ActiveSession>();

    app.add_message::<StartLevel>();
    app.add_message::<FireShot>();
    app.add_message::<AbandonLevel>();
    app.add_message::<ShotResolved>();
    app.add_message::<ShotFizzled>();
    app.add_message::<FireRejected>();
    app.add_message::<FloatingCascade>();
    app.add_message::<LevelEnded>();

    app.add_systems(
        FixedUpdate,
        (start_level, abandon_level, fire_shots, advance_session)
            .chain()
            .in_set(CoreSystems),
    );
}

/// Everything the core runs each fixed tick.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoreSystems;

/// The level being played, if any.
#[derive(Resource, Debug, Default)]
pub struct ActiveSession(pub Option<Session>);

/// Begin a level, replacing whatever was running.
#[derive(Message, Debug, Clone)]
pub struct StartLevel(pub LevelSetup);

#[derive(Message, Debug, Clone, Copy)]
pub struct FireShot(pub FireCommand);

/// Tear down the running level immediately.
#[derive(Message, Debug, Clone, Copy)]
pub struct AbandonLevel;

#[derive(Message, Debug, Clone)]
pub struct ShotResolved(pub ShotReport);

/// An ability shot reached no token; no move or charge was spent.
#[derive(Message, Debug, Clone, Copy)]
pub struct ShotFizzled {
    pub ability: Ability,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct FireRejected {
    pub command: FireCommand,
    pub reason: FireRejection,
}

/// Tokens that fell during the last shot, reported after the cascade delay.
#[derive(Message, Debug, Clone)]
pub struct FloatingCascade {
    pub tokens: Vec<TokenId>,
}

#[derive(Message, Debug, Clone)]
pub struct LevelEnded(pub SessionOutcome);

fn start_level(
    mut requests: MessageReader<StartLevel>,
    mut active: ResMut<ActiveSession>,
    library: Res<PatternLibrary>,
    config: Res<CoreConfig>,
) {
    for StartLevel(setup) in requests.read() {
        if let Some(previous) = active.0.as_mut() {
            previous.reset();
        }

        match Session::new(setup.clone(), &library, &config) {
            Ok(session) => active.0 = Some(session),
            Err(e) => {
                error!("Could not start level {}: {}", setup.level, e);
                active.0 = None;
            }
        }
    }
}

fn abandon_level(mut requests: MessageReader<AbandonLevel>, mut active: ResMut<ActiveSession>) {
    if requests.read().count() == 0 {
        return;
    }

    if let Some(mut session) = active.0.take() {
        session.reset();
    }
}

fn fire_shots(
    mut requests: MessageReader<FireShot>,
    mut active: ResMut<ActiveSession>,
    mut rejected: MessageWriter<FireRejected>,
) {
    for &FireShot(command) in requests.read() {
        let result = match active.0.as_mut() {
            Some(session) => session.fire(command),
            None => Err(FireRejection::LevelOver),
        };

        if let Err(reason) = result {
            warn!("Shot rejected: {}", reason);
            rejected.write(FireRejected { command, reason });
        }
    }
}

fn advance_session(
    mut active: ResMut<ActiveSession>,
    mut resolved: MessageWriter<ShotResolved>,
    mut fizzled: MessageWriter<ShotFizzled>,
    mut cascades: MessageWriter<FloatingCascade>,
    mut ended: MessageWriter<LevelEnded>,
) -> Result {
    let Some(session) = active.0.as_mut() else {
        return Ok(());
    };

    for event in session.tick()? {
        match event {
            CoreEvent::ShotResolved(report) => {
                resolved.write(ShotResolved(report));
            }
            CoreEvent::ShotFizzled { ability } => {
                fizzled.write(ShotFizzled { ability });
            }
            CoreEvent::FloatingCascade { tokens } => {
                cascades.write(FloatingCascade { tokens });
            }
            CoreEvent::LevelEnded(outcome) => {
                ended.write(LevelEnded(outcome));
            }
        }
    }

    Ok(())
}
