//! Internal engine model.
//!
//! RPM here is a feel/telemetry approximation driven by throttle input only.
//! It never reads chassis or wheel velocity.

/// Idle floor.
pub const IDLE_RPM: f32 = 800.0;
/// Redline ceiling.
pub const REDLINE_RPM: f32 = 8000.0;
/// Base rise per tick under throttle, scaled by `RPM_RISE_PIVOT / rpm`.
pub const RPM_RISE: f32 = 100.0;
pub const RPM_RISE_PIVOT: f32 = 4000.0;
/// Constant decay per tick off throttle.
pub const RPM_DECAY: f32 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineModel {
    rpm: f32,
    gear: u8,
}

impl Default for EngineModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineModel {
    pub fn new() -> Self {
        Self {
            rpm: IDLE_RPM,
            gear: 1,
        }
    }

    /// Start from an arbitrary rpm, clamped into the operating range.
    pub fn with_rpm(rpm: f32) -> Self {
        Self {
            rpm: rpm.clamp(IDLE_RPM, REDLINE_RPM),
            gear: 1,
        }
    }

    pub fn rpm(&self) -> f32 {
        self.rpm
    }

    /// Always 1: there is no gearbox.
    pub fn gear(&self) -> u8 {
        self.gear
    }

    /// Advance one tick.
    pub fn update(&mut self, throttle: bool) {
        if throttle {
            // The idle floor keeps the divisor away from zero.
            let divisor = self.rpm.max(IDLE_RPM);
            self.rpm = REDLINE_RPM.min(self.rpm + RPM_RISE * (RPM_RISE_PIVOT / divisor));
        } else {
            self.rpm = IDLE_RPM.max(self.rpm - RPM_DECAY);
        }
    }

    /// Speed shown to the driver, derived from rpm alone.
    pub fn estimated_speed(&self, top_speed: f32) -> f32 {
        (self.rpm / REDLINE_RPM) * top_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    #[test]
    fn starts_at_idle_in_first() {
        let engine = EngineModel::new();
        assert_eq!(engine.rpm(), IDLE_RPM);
        assert_eq!(engine.gear(), 1);
    }

    #[test]
    fn throttle_from_idle_adds_five_hundred() {
        let mut engine = EngineModel::new();
        engine.update(true);
        assert!((engine.rpm() - 1300.0).abs() < EPS);
    }

    #[test]
    fn throttle_converges_upward_and_clamps_at_redline() {
        for start in [800.0, 1300.0, 4000.0, 7900.0, 8000.0] {
            let mut engine = EngineModel::with_rpm(start);
            let mut prev = engine.rpm();
            for _ in 0..2_000 {
                engine.update(true);
                assert!(engine.rpm() >= prev);
                assert!(engine.rpm() <= REDLINE_RPM);
                prev = engine.rpm();
            }
            assert_eq!(engine.rpm(), REDLINE_RPM);
        }
    }

    #[test]
    fn coasting_decays_by_constant_step_to_idle() {
        for start in [800.0, 950.0, 1300.0, 5555.0, 8000.0] {
            let mut engine = EngineModel::with_rpm(start);
            for _ in 0..200 {
                let before = engine.rpm();
                engine.update(false);
                if before - RPM_DECAY >= IDLE_RPM {
                    assert!((engine.rpm() - (before - RPM_DECAY)).abs() < EPS);
                } else {
                    assert_eq!(engine.rpm(), IDLE_RPM);
                }
                assert!(engine.rpm() >= IDLE_RPM);
            }
            assert_eq!(engine.rpm(), IDLE_RPM);
        }
    }

    #[test]
    fn coasting_from_1300_lands_on_1150() {
        let mut engine = EngineModel::with_rpm(1300.0);
        engine.update(false);
        assert!((engine.rpm() - 1150.0).abs() < EPS);
    }

    #[test]
    fn estimated_speed_is_monotonic_and_bounded() {
        for top_speed in [0.0, 180.0, 330.0] {
            let mut prev = -1.0;
            for step in 0..=72 {
                let engine = EngineModel::with_rpm(IDLE_RPM + step as f32 * 100.0);
                let speed = engine.estimated_speed(top_speed);
                assert!(speed >= prev);
                assert!((0.0..=top_speed).contains(&speed));
                prev = speed;
            }
        }
    }

    #[test]
    fn estimated_speed_at_1300_for_180_top_speed() {
        let engine = EngineModel::with_rpm(1300.0);
        assert!((engine.estimated_speed(180.0) - 29.25).abs() < EPS);
    }
}
