use std::time::Duration;

use bevy::prelude::*;

/// Per-tick readout for the HUD and engine audio.
#[derive(Message, Debug, Clone, Copy, Default, PartialEq)]
pub struct Telemetry {
    /// Estimated from rpm, not measured from the chassis.
    pub speed: f32,
    pub rpm: f32,
    pub gear: u8,
}

/// Latest telemetry sample, as shown on the HUD.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct HudTelemetry(pub Telemetry);

/// Republish the most recent sample of this frame.
pub fn emit_telemetry(mut samples: MessageReader<Telemetry>, mut hud: ResMut<HudTelemetry>) {
    if let Some(sample) = samples.read().last() {
        hud.0 = *sample;
    }
}

/// HUD speed readout in whole km/h.
pub fn display_kph(speed: f32) -> u32 {
    (speed * 3.6).floor().max(0.0) as u32
}

pub const LAP_CLOCK_STEP: f32 = 0.1;
const LAP_CLOCK_INTERVAL: Duration = Duration::from_millis(100);

/// Free-running race clock driven by wall-clock time, not by the simulation tick.
#[derive(Resource, Debug)]
pub struct LapClock {
    timer: Timer,
    elapsed: f32,
    running: bool,
}

impl Default for LapClock {
    fn default() -> Self {
        Self {
            timer: Timer::new(LAP_CLOCK_INTERVAL, TimerMode::Repeating),
            elapsed: 0.0,
            running: false,
        }
    }
}

impl LapClock {
    pub fn start(&mut self) {
        *self = Self {
            running: true,
            ..Self::default()
        };
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Add one step per whole 100 ms of real time that has passed.
    pub fn advance(&mut self, real_delta: Duration) {
        if !self.running {
            return;
        }
        self.timer.tick(real_delta);
        self.elapsed += LAP_CLOCK_STEP * self.timer.times_finished_this_tick() as f32;
    }

    pub fn label(&self) -> String {
        format!("{:.1}", self.elapsed)
    }
}

pub fn advance_lap_clock(real_time: Res<Time<Real>>, mut clock: ResMut<LapClock>) {
    clock.advance(real_time.delta());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kph_is_floored() {
        assert_eq!(display_kph(0.0), 0);
        assert_eq!(display_kph(29.25), 105);
        assert_eq!(display_kph(10.0), 36);
    }

    #[test]
    fn lap_clock_counts_real_time_steps() {
        let mut clock = LapClock::default();
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.elapsed(), 0.0, "stopped clock must not advance");

        clock.start();
        clock.advance(Duration::from_millis(50));
        assert_eq!(clock.elapsed(), 0.0);
        clock.advance(Duration::from_millis(50));
        assert!((clock.elapsed() - 0.1).abs() < 1e-5);
        clock.advance(Duration::from_millis(350));
        assert!((clock.elapsed() - 0.4).abs() < 1e-5);
        assert_eq!(clock.label(), "0.4");

        clock.stop();
        clock.advance(Duration::from_secs(3));
        assert!((clock.elapsed() - 0.4).abs() < 1e-5);
    }

    #[test]
    fn restart_resets_the_clock() {
        let mut clock = LapClock::default();
        clock.start();
        clock.advance(Duration::from_secs(1));
        clock.start();
        assert_eq!(clock.elapsed(), 0.0);
        assert!(clock.is_running());
    }

    #[test]
    fn hud_keeps_last_sample_of_the_frame() {
        let mut app = App::new();
        app.add_message::<Telemetry>()
            .init_resource::<HudTelemetry>()
            .add_systems(Update, emit_telemetry);

        app.world_mut().write_message(Telemetry {
            speed: 1.0,
            rpm: 900.0,
            gear: 1,
        });
        app.world_mut().write_message(Telemetry {
            speed: 2.0,
            rpm: 1300.0,
            gear: 1,
        });
        app.update();

        let hud = app.world().resource::<HudTelemetry>();
        assert_eq!(hud.0.rpm, 1300.0);
        assert_eq!(hud.0.speed, 2.0);
    }
}
