use bevy::prelude::*;
use garage::{CarStats, DriveTrain};

pub mod audio;
pub mod camera;
pub mod controls;
pub mod engine;
pub mod physics;
pub mod session;
pub mod telemetry;
pub mod track;
pub mod track_format;
pub mod vehicle;

/// The player's car for the current race.
#[derive(Component)]
pub struct Car {
    pub stats: CarStats,
    pub drive_train: DriveTrain,
    pub controller: vehicle::VehicleController,
}

impl Car {
    pub fn new(stats: CarStats, drive_train: DriveTrain) -> Self {
        Self {
            stats,
            drive_train,
            controller: vehicle::VehicleController::new(),
        }
    }
}
