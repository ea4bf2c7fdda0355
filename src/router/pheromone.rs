use crate::flight::InstanceId;
use std::collections::HashMap;

const RENORMALIZE_BELOW: f64 = 1e-150;

/// Desirability per flight instance.
///
/// Evaporation multiplies a global scale instead of touching every entry;
/// stored values are kept unscaled and the floor is applied on read.
#[derive(Debug, Clone)]
pub struct PheromoneTable {
    raw: HashMap<InstanceId, f64>,
    default_raw: f64,
    scale: f64,
    floor: f64,
}

impl PheromoneTable {
    pub fn new(init: f64, floor: f64) -> PheromoneTable {
        PheromoneTable {
            raw: HashMap::new(),
            default_raw: init.max(floor),
            scale: 1.0,
            floor,
        }
    }

    pub fn get(&self, id: &str) -> f64 {
        let raw = self.raw.get(id).copied().unwrap_or(self.default_raw);
        (raw * self.scale).max(self.floor)
    }

    /// `tau *= 1 - rho` for every instance.
    pub fn evaporate(&mut self, rho: f64) {
        self.scale *= 1.0 - rho.clamp(0.0, 1.0);
        if self.scale < RENORMALIZE_BELOW {
            let scale = self.scale;
            self.raw.values_mut().for_each(|v| *v *= scale);
            self.default_raw *= scale;
            self.scale = 1.0;
        }
    }

    pub fn deposit(&mut self, id: &InstanceId, amount: f64) {
        if amount <= 0.0 || !amount.is_finite() {
            return;
        }
        let value = self.get(id) + amount;
        if self.scale > 0.0 {
            self.raw.insert(id.clone(), value / self.scale);
        } else {
            self.default_raw = 0.0;
            self.scale = 1.0;
            self.raw.insert(id.clone(), value);
        }
    }
}
