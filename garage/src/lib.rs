use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod stats;
pub mod store;

pub use catalog::Catalog;
pub use stats::resolve_stats;
pub use store::{GarageStore, StoreError};

/// Effective performance figures of a car, after upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarStats {
    pub horsepower: f32,
    /// N·m
    pub torque: f32,
    /// kg
    pub weight: f32,
    /// Multiplier on tyre friction slip.
    pub grip: f32,
    /// km/h, estimated
    pub top_speed: f32,
    /// 0-100 estimate in seconds. Informational only.
    pub acceleration: f32,
}

impl CarStats {
    /// Stats reported for a car instance that cannot be resolved.
    pub const FALLBACK: CarStats = CarStats {
        horsepower: 0.0,
        torque: 0.0,
        weight: 1000.0,
        grip: 1.0,
        top_speed: 0.0,
        acceleration: 0.0,
    };
}

/// Which wheel set receives engine force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriveTrain {
    #[serde(rename = "FWD")]
    Fwd,
    #[serde(rename = "RWD")]
    Rwd,
    #[serde(rename = "AWD")]
    Awd,
}

impl DriveTrain {
    pub fn label(&self) -> &'static str {
        match self {
            DriveTrain::Fwd => "FWD",
            DriveTrain::Rwd => "RWD",
            DriveTrain::Awd => "AWD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshType {
    Sport,
    Muscle,
    Super,
}

impl MeshType {
    /// Body style badge shown on the dealer card.
    pub fn label(&self) -> &'static str {
        match self {
            MeshType::Sport => "SPORT",
            MeshType::Muscle => "MUSCLE",
            MeshType::Super => "SUPER",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarDef {
    pub id: String,
    pub name: String,
    pub price: u32,
    pub base_stats: CarStats,
    pub drive_train: DriveTrain,
    pub color: String,
    pub mesh_type: MeshType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeKind {
    Engine,
    Weight,
    Tires,
    Turbo,
}

/// Additive stat changes applied by an upgrade. Absent fields leave the stat alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatModifiers {
    #[serde(default)]
    pub horsepower: Option<f32>,
    #[serde(default)]
    pub torque: Option<f32>,
    #[serde(default)]
    pub weight: Option<f32>,
    #[serde(default)]
    pub grip: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upgrade {
    pub id: String,
    pub name: String,
    pub kind: UpgradeKind,
    pub tier: u8,
    pub cost: u32,
    #[serde(default)]
    pub modifiers: StatModifiers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedCar {
    pub instance_id: String,
    pub def_id: String,
    pub upgrades: Vec<String>,
    pub custom_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub credits: u32,
    pub owned_cars: Vec<OwnedCar>,
    /// Empty when no car is selected.
    pub active_car_id: String,
    pub unlocked_tracks: Vec<String>,
    #[serde(default)]
    pub next_instance_id: u64,
}

pub const STARTING_CREDITS: u32 = 20_000;

impl Default for GameState {
    fn default() -> Self {
        Self {
            credits: STARTING_CREDITS,
            owned_cars: Vec::new(),
            active_car_id: String::new(),
            unlocked_tracks: vec!["track_1".to_string()],
            next_instance_id: 1,
        }
    }
}
