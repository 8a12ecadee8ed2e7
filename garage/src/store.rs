use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::{CarDef, CarStats, Catalog, GameState, OwnedCar, resolve_stats};

/// A sold car returns its list price divided by this.
pub const RESALE_DIVISOR: u32 = 2;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown car model `{0}`")]
    UnknownCar(String),
    #[error("no owned car with id `{0}`")]
    UnknownInstance(String),
    #[error("unknown upgrade `{0}`")]
    UnknownUpgrade(String),
    #[error("upgrade `{0}` is already installed")]
    AlreadyInstalled(String),
    #[error("insufficient credits: need {needed}, have {available}")]
    InsufficientCredits { needed: u32, available: u32 },
    #[error("failed to access save file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt save file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Player garage: credits, owned cars and their upgrades.
#[derive(Debug, Clone)]
pub struct GarageStore {
    state: GameState,
    catalog: Catalog,
}

impl GarageStore {
    pub fn new(state: GameState, catalog: Catalog) -> Self {
        Self { state, catalog }
    }

    /// Load the saved garage, or start a new game when no save exists yet.
    pub fn load(path: &Path, catalog: Catalog) -> Result<Self, StoreError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no save at {}, starting a new garage", path.display());
                return Ok(Self::new(GameState::default(), catalog));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        let state = serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(state, catalog))
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.state).map_err(|source| {
            StoreError::Corrupt {
                path: path.display().to_string(),
                source,
            }
        })?;
        std::fs::write(path, text).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!("saved garage to {}", path.display());
        Ok(())
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn credits(&self) -> u32 {
        self.state.credits
    }

    pub fn owned_car(&self, instance_id: &str) -> Option<&OwnedCar> {
        self.state
            .owned_cars
            .iter()
            .find(|c| c.instance_id == instance_id)
    }

    /// The selected car, or the first owned car when the selection is stale.
    pub fn active_car(&self) -> Option<&OwnedCar> {
        self.owned_car(&self.state.active_car_id)
            .or_else(|| self.state.owned_cars.first())
    }

    pub fn def_for(&self, car: &OwnedCar) -> Option<&CarDef> {
        self.catalog.car(&car.def_id)
    }

    pub fn buy_car(&mut self, def_id: &str, color: &str) -> Result<String, StoreError> {
        let price = self
            .catalog
            .car(def_id)
            .ok_or_else(|| StoreError::UnknownCar(def_id.to_string()))?
            .price;
        self.charge(price)?;

        let instance_id = format!("car-{}", self.state.next_instance_id);
        self.state.next_instance_id += 1;
        if self.state.owned_cars.is_empty() {
            self.state.active_car_id = instance_id.clone();
        }
        self.state.owned_cars.push(OwnedCar {
            instance_id: instance_id.clone(),
            def_id: def_id.to_string(),
            upgrades: Vec::new(),
            custom_color: color.to_string(),
        });
        info!("bought {def_id} as {instance_id}");
        Ok(instance_id)
    }

    /// Sell a car for a fixed share of its list price. Returns the credits earned.
    pub fn sell_car(&mut self, instance_id: &str) -> Result<u32, StoreError> {
        let car = self
            .owned_car(instance_id)
            .ok_or_else(|| StoreError::UnknownInstance(instance_id.to_string()))?;
        let def = self
            .def_for(car)
            .ok_or_else(|| StoreError::UnknownCar(car.def_id.clone()))?;
        let value = def.price / RESALE_DIVISOR;

        self.state.credits = self.state.credits.saturating_add(value);
        self.state.owned_cars.retain(|c| c.instance_id != instance_id);
        if self.state.active_car_id == instance_id {
            self.state.active_car_id = self
                .state
                .owned_cars
                .first()
                .map(|c| c.instance_id.clone())
                .unwrap_or_default();
        }
        info!("sold {instance_id} for {value}");
        Ok(value)
    }

    pub fn buy_upgrade(&mut self, instance_id: &str, upgrade_id: &str) -> Result<(), StoreError> {
        let cost = self
            .catalog
            .upgrade(upgrade_id)
            .ok_or_else(|| StoreError::UnknownUpgrade(upgrade_id.to_string()))?
            .cost;
        let car = self
            .owned_car(instance_id)
            .ok_or_else(|| StoreError::UnknownInstance(instance_id.to_string()))?;
        if car.upgrades.iter().any(|u| u == upgrade_id) {
            return Err(StoreError::AlreadyInstalled(upgrade_id.to_string()));
        }
        self.charge(cost)?;

        if let Some(car) = self
            .state
            .owned_cars
            .iter_mut()
            .find(|c| c.instance_id == instance_id)
        {
            car.upgrades.push(upgrade_id.to_string());
        }
        info!("installed {upgrade_id} on {instance_id}");
        Ok(())
    }

    pub fn select_car(&mut self, instance_id: &str) {
        self.state.active_car_id = instance_id.to_string();
    }

    /// Effective stats of an owned car; [`CarStats::FALLBACK`] when it cannot be resolved.
    pub fn car_stats(&self, instance_id: &str) -> CarStats {
        let Some(car) = self.owned_car(instance_id) else {
            return CarStats::FALLBACK;
        };
        let Some(def) = self.def_for(car) else {
            return CarStats::FALLBACK;
        };
        resolve_stats(def, &car.upgrades, &self.catalog)
    }

    fn charge(&mut self, amount: u32) -> Result<(), StoreError> {
        if self.state.credits < amount {
            return Err(StoreError::InsufficientCredits {
                needed: amount,
                available: self.state.credits,
            });
        }
        self.state.credits -= amount;
        Ok(())
    }
}
