use std::path::PathBuf;

use avian3d::prelude::*;
use bevy::prelude::*;
use clap::Parser;
use garage::{Catalog, GameState, GarageStore};

use arcade_racer::session::{Garage, RacePlugin, RaceTrack};
use arcade_racer::track_format::TrackFile;

mod ui;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Track layout to race on.
    #[arg(long, default_value = "racing/assets/track1.toml")]
    track: PathBuf,

    /// Catalog overriding the built-in cars and upgrades.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Garage save file.
    #[arg(long, env = "ARCADE_RACER_SAVE", default_value = "garage-save.json")]
    save: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let mut app = App::new();
    app.add_plugins((DefaultPlugins, PhysicsPlugins::default()));

    // Logging is only available once the LogPlugin has been built.
    let track = load_track(&cli.track);
    let catalog = load_catalog(cli.catalog.as_deref());
    let store = load_garage(&cli.save, catalog);

    app.add_plugins((RacePlugin, ui::GarageUiPlugin))
        .insert_resource(Time::<Fixed>::from_duration(
            std::time::Duration::from_secs_f32(1.0 / 60.0),
        ))
        .insert_resource(RaceTrack(track))
        .insert_resource(Garage {
            store,
            save_path: cli.save,
        })
        .run();
}

fn load_track(path: &std::path::Path) -> TrackFile {
    match TrackFile::load(path) {
        Ok(track) => {
            info!("Loaded track `{}` from {}", track.metadata.name, path.display());
            track
        }
        Err(error) => {
            warn!("{error}; racing on the built-in test loop");
            TrackFile::test_loop()
        }
    }
}

fn load_catalog(path: Option<&std::path::Path>) -> Catalog {
    let Some(path) = path else {
        return Catalog::builtin();
    };
    match Catalog::load(path) {
        Ok(catalog) => {
            info!(
                "Loaded catalog with {} cars and {} upgrades",
                catalog.cars.len(),
                catalog.upgrades.len()
            );
            catalog
        }
        Err(error) => {
            warn!("{error}; using the built-in catalog");
            Catalog::builtin()
        }
    }
}

fn load_garage(path: &std::path::Path, catalog: Catalog) -> GarageStore {
    match GarageStore::load(path, catalog.clone()) {
        Ok(store) => store,
        Err(error) => {
            error!("{error}; starting a new game");
            GarageStore::new(GameState::default(), catalog)
        }
    }
}
