use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CarDef, CarStats, DriveTrain, MeshType, StatModifiers, Upgrade, UpgradeKind};

/// Read-only list of purchasable cars and upgrades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub cars: Vec<CarDef>,
    #[serde(default)]
    pub upgrades: Vec<Upgrade>,
}

impl Catalog {
    /// The dealership stock shipped with the game.
    pub fn builtin() -> Self {
        Self {
            cars: vec![
                car(
                    "starter_hatch",
                    "Civetta Bolide (Used)",
                    5_000,
                    DriveTrain::Fwd,
                    "#8899AA",
                    MeshType::Sport,
                    [110.0, 140.0, 1200.0, 1.0, 180.0, 8.5],
                ),
                car(
                    "muscle_classic",
                    "V8 Stallion",
                    25_000,
                    DriveTrain::Rwd,
                    "#AA2200",
                    MeshType::Muscle,
                    [300.0, 450.0, 1600.0, 0.9, 240.0, 5.8],
                ),
                car(
                    "super_concept",
                    "Proto X-1",
                    150_000,
                    DriveTrain::Awd,
                    "#11FF44",
                    MeshType::Super,
                    [600.0, 700.0, 1100.0, 2.5, 330.0, 2.9],
                ),
            ],
            upgrades: vec![
                upgrade(
                    "ecu_1",
                    "Sports ECU",
                    UpgradeKind::Engine,
                    1,
                    2_000,
                    StatModifiers {
                        horsepower: Some(20.0),
                        torque: Some(15.0),
                        ..Default::default()
                    },
                ),
                upgrade(
                    "turbo_1",
                    "Bolt-on Turbo",
                    UpgradeKind::Turbo,
                    1,
                    4_500,
                    StatModifiers {
                        horsepower: Some(60.0),
                        torque: Some(80.0),
                        weight: Some(10.0),
                        ..Default::default()
                    },
                ),
                upgrade(
                    "tires_1",
                    "Semi-Slicks",
                    UpgradeKind::Tires,
                    1,
                    3_000,
                    StatModifiers {
                        grip: Some(0.3),
                        ..Default::default()
                    },
                ),
                upgrade(
                    "weight_1",
                    "Strip Interior",
                    UpgradeKind::Weight,
                    1,
                    1_000,
                    StatModifiers {
                        weight: Some(-100.0),
                        ..Default::default()
                    },
                ),
                upgrade(
                    "tires_2",
                    "Racing Slicks",
                    UpgradeKind::Tires,
                    2,
                    8_000,
                    StatModifiers {
                        grip: Some(0.6),
                        ..Default::default()
                    },
                ),
                upgrade(
                    "turbo_2",
                    "Twin Turbo Kit",
                    UpgradeKind::Turbo,
                    2,
                    12_000,
                    StatModifiers {
                        horsepower: Some(150.0),
                        torque: Some(180.0),
                        weight: Some(25.0),
                        ..Default::default()
                    },
                ),
            ],
        }
    }

    /// Load a catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        toml::from_str(&text).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    pub fn car(&self, id: &str) -> Option<&CarDef> {
        self.cars.iter().find(|c| c.id == id)
    }

    pub fn upgrade(&self, id: &str) -> Option<&Upgrade> {
        self.upgrades.iter().find(|u| u.id == id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn car(
    id: &str,
    name: &str,
    price: u32,
    drive_train: DriveTrain,
    color: &str,
    mesh_type: MeshType,
    [horsepower, torque, weight, grip, top_speed, acceleration]: [f32; 6],
) -> CarDef {
    CarDef {
        id: id.to_string(),
        name: name.to_string(),
        price,
        base_stats: CarStats {
            horsepower,
            torque,
            weight,
            grip,
            top_speed,
            acceleration,
        },
        drive_train,
        color: color.to_string(),
        mesh_type,
    }
}

fn upgrade(
    id: &str,
    name: &str,
    kind: UpgradeKind,
    tier: u8,
    cost: u32,
    modifiers: StatModifiers,
) -> Upgrade {
    Upgrade {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        tier,
        cost,
        modifiers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_one_car_per_drivetrain() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.cars.len(), 3);
        assert_eq!(
            catalog.car("starter_hatch").map(|c| c.drive_train),
            Some(DriveTrain::Fwd)
        );
        assert_eq!(
            catalog.car("muscle_classic").map(|c| c.drive_train),
            Some(DriveTrain::Rwd)
        );
        assert_eq!(
            catalog.car("super_concept").map(|c| c.drive_train),
            Some(DriveTrain::Awd)
        );
        assert!(catalog.car("missing").is_none());
    }

    #[test]
    fn catalog_parses_from_toml() {
        let text = r##"
            [[cars]]
            id = "kart"
            name = "Kart"
            price = 100
            drive_train = "RWD"
            color = "#FFFFFF"
            mesh_type = "sport"
            base_stats = { horsepower = 10.0, torque = 20.0, weight = 150.0, grip = 1.2, top_speed = 90.0, acceleration = 6.0 }

            [[upgrades]]
            id = "slicks"
            name = "Slicks"
            kind = "tires"
            tier = 1
            cost = 50
            modifiers = { grip = 0.2 }
        "##;
        let catalog: Catalog = toml::from_str(text).unwrap();
        let kart = catalog.car("kart").unwrap();
        assert_eq!(kart.drive_train, DriveTrain::Rwd);
        assert_eq!(kart.base_stats.torque, 20.0);
        let slicks = catalog.upgrade("slicks").unwrap();
        assert_eq!(slicks.modifiers.grip, Some(0.2));
        assert_eq!(slicks.modifiers.torque, None);
    }
}
