//! Grid, physics and matching core for a hex-grid token shooter.
//!
//! Add [`CorePlugin`] to an app, send [`game::StartLevel`] and
//! [`game::FireShot`], and listen for the outbound messages in [`game`].

pub mod config;
pub mod game;

use bevy::prelude::*;

use config::CoreConfig;
use game::pattern::PatternLibrary;

/// Registers the core resources, messages and fixed-tick systems.
///
/// A [`CoreConfig`] inserted before this plugin wins over the one on disk.
pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<CoreConfig>() {
            app.insert_resource(CoreConfig::load());
        }
        app.init_resource::<PatternLibrary>();
        app.add_plugins(game::plugin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_keeps_inserted_config() {
        let mut config = CoreConfig::default();
        config.max_rows = 9;

        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(config.clone());
        app.add_plugins(CorePlugin);

        assert_eq!(app.world().resource::<CoreConfig>(), &config);
        assert!(app.world().contains_resource::<PatternLibrary>());
        assert!(app.world().contains_resource::<game::ActiveSession>());
    }
}
