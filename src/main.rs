//! Headless demo: plays one level with a scripted aim sweep and prints the
//! level summary.
//!
//! Usage: `hexpop [level] [moves]`

use bevy::{log::LogPlugin, prelude::*};
use std::collections::BTreeMap;

use hexpop::{
    CorePlugin,
    config::CoreConfig,
    game::{
        ActiveSession, CoreSystems, FireShot, FloatingCascade, LevelEnded, ShotFizzled,
        ShotResolved, StartLevel,
        powerups::Ability,
        state::{FireCommand, LevelSetup},
    },
};

/// Every this many shots the demo tries an ability instead of a token.
const ABILITY_EVERY: u32 = 5;

fn main() -> AppExit {
    let mut args = std::env::args().skip(1);
    let level = args.next().and_then(|a| a.parse().ok()).unwrap_or(1);
    let moves = args.next().and_then(|a| a.parse().ok()).unwrap_or(40);
    if level == 0 {
        eprintln!("levels start at 1");
        return AppExit::error();
    }

    let abilities: BTreeMap<Ability, u32> = Ability::ALL.iter().map(|&a| (a, 1)).collect();

    App::new()
        .add_plugins((MinimalPlugins, LogPlugin::default(), CorePlugin))
        .insert_resource(Time::<Fixed>::from_hz(960.0))
        .insert_resource(Demo {
            setup: LevelSetup {
                level,
                moves,
                abilities,
            },
            shots: 0,
        })
        .add_systems(Startup, start_level)
        .add_systems(FixedUpdate, aim.before(CoreSystems))
        .add_systems(Update, (report, finish))
        .run()
}

#[derive(Resource)]
struct Demo {
    setup: LevelSetup,
    shots: u32,
}

fn start_level(demo: Res<Demo>, mut start: MessageWriter<StartLevel>) {
    start.write(StartLevel(demo.setup.clone()));
}

/// Fire whenever the shooter is free, sweeping across the aim range.
fn aim(
    mut demo: ResMut<Demo>,
    active: Res<ActiveSession>,
    config: Res<CoreConfig>,
    mut fire: MessageWriter<FireShot>,
) {
    let Some(session) = active.0.as_ref() else {
        return;
    };
    if !session.is_ready() {
        return;
    }

    demo.shots += 1;
    let sweep = (demo.shots as f32 * 0.618_034).fract() * 2.0 - 1.0;
    let angle = sweep * config.projectile.max_aim_angle * 0.9;

    let ability = (demo.shots % ABILITY_EVERY == 0)
        .then(|| {
            Ability::ALL
                .iter()
                .copied()
                .find(|&a| session.charges(a) > 0)
        })
        .flatten();

    fire.write(FireShot(FireCommand { angle, ability }));
}

fn report(
    mut resolved: MessageReader<ShotResolved>,
    mut fizzled: MessageReader<ShotFizzled>,
    mut cascades: MessageReader<FloatingCascade>,
) {
    for ShotResolved(report) in resolved.read() {
        info!(
            "+{} ({} destroyed, {} damaged, {} frozen) score {} moves {}",
            report.score_delta,
            report.destroyed.len(),
            report.damaged.len(),
            report.frozen.len(),
            report.score,
            report.moves_remaining
        );
    }
    for shot in fizzled.read() {
        info!("{} fizzled", shot.ability);
    }
    for cascade in cascades.read() {
        info!("{} tokens fell", cascade.tokens.len());
    }
}

fn finish(mut ended: MessageReader<LevelEnded>, mut exit: MessageWriter<AppExit>) {
    if let Some(LevelEnded(outcome)) = ended.read().last() {
        match serde_json::to_string_pretty(outcome) {
            Ok(json) => println!("{json}"),
            Err(e) => error!("Could not serialize the summary: {}", e),
        }
        exit.write(AppExit::Success);
    }
}
