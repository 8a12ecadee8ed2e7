use crate::{CarDef, CarStats, Catalog};

/// Combine a car's base stats with the modifiers of its installed upgrades.
///
/// Unknown upgrade ids are ignored. Top speed and acceleration are never
/// touched by upgrades.
pub fn resolve_stats<S: AsRef<str>>(def: &CarDef, upgrade_ids: &[S], catalog: &Catalog) -> CarStats {
    let mut stats = def.base_stats;
    for id in upgrade_ids {
        let Some(upgrade) = catalog.upgrade(id.as_ref()) else {
            continue;
        };
        let m = &upgrade.modifiers;
        stats.horsepower += m.horsepower.unwrap_or(0.0);
        stats.torque += m.torque.unwrap_or(0.0);
        stats.weight += m.weight.unwrap_or(0.0);
        stats.grip += m.grip.unwrap_or(0.0);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starter() -> (Catalog, CarDef) {
        let catalog = Catalog::builtin();
        let def = catalog.car("starter_hatch").cloned().unwrap();
        (catalog, def)
    }

    #[test]
    fn no_upgrades_returns_base_stats() {
        let (catalog, def) = starter();
        let none: [&str; 0] = [];
        assert_eq!(resolve_stats(&def, &none, &catalog), def.base_stats);
    }

    #[test]
    fn upgrades_stack_additively() {
        let (catalog, def) = starter();
        let stats = resolve_stats(&def, &["ecu_1", "turbo_1", "weight_1", "tires_2"], &catalog);
        assert_eq!(stats.horsepower, 110.0 + 20.0 + 60.0);
        assert_eq!(stats.torque, 140.0 + 15.0 + 80.0);
        assert_eq!(stats.weight, 1200.0 + 10.0 - 100.0);
        assert!((stats.grip - 1.6).abs() < 1e-6);
        assert_eq!(stats.top_speed, def.base_stats.top_speed);
        assert_eq!(stats.acceleration, def.base_stats.acceleration);
    }

    #[test]
    fn unknown_upgrade_is_skipped() {
        let (catalog, def) = starter();
        let stats = resolve_stats(&def, &["nitro_9", "ecu_1"], &catalog);
        assert_eq!(stats.torque, 155.0);
    }
}
