//! Vehicle controller: maps driver intent and car stats to per-wheel commands.

use bevy::prelude::*;
use garage::{CarStats, DriveTrain};

use crate::Car;
use crate::controls::{ActiveControls, Controls};
use crate::engine::EngineModel;
use crate::physics::RaycastVehicle;
use crate::telemetry::Telemetry;

/// Front wheel steering angle in radians. Positive steers left.
pub const STEER_ANGLE: f32 = 0.35;
/// Arcade gain from stats torque to wheel engine force. Tuned for feel, not physics.
pub const ENGINE_FORCE_GAIN: f32 = 50.0;
pub const BRAKE_FORCE: f32 = 250.0;

pub const WHEEL_COUNT: usize = 4;
pub const FRONT_LEFT: usize = 0;
pub const FRONT_RIGHT: usize = 1;
pub const REAR_LEFT: usize = 2;
pub const REAR_RIGHT: usize = 3;
pub const FRONT_WHEELS: [usize; 2] = [FRONT_LEFT, FRONT_RIGHT];
pub const REAR_WHEELS: [usize; 2] = [REAR_LEFT, REAR_RIGHT];
pub const ALL_WHEELS: [usize; WHEEL_COUNT] = [FRONT_LEFT, FRONT_RIGHT, REAR_LEFT, REAR_RIGHT];

// Chassis box, metres.
pub const CHASSIS_WIDTH: f32 = 1.8;
pub const CHASSIS_HEIGHT: f32 = 0.6;
pub const CHASSIS_LENGTH: f32 = 4.2;
pub const CHASSIS_ANGULAR_DAMPING: f32 = 0.5;
pub const CHASSIS_LINEAR_DAMPING: f32 = 0.05;

// Wheel inset from the chassis corners.
const WHEEL_INSET_X: f32 = 0.3;
const WHEEL_INSET_Z: f32 = 0.5;

pub const WHEEL_RADIUS: f32 = 0.35;
pub const BASE_FRICTION_SLIP: f32 = 2.5;

/// Suspension and geometry of one wheel, fixed when the vehicle spawns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelConfig {
    pub radius: f32,
    pub direction_local: Vec3,
    pub axle_local: Vec3,
    pub connection_point_local: Vec3,
    pub suspension_stiffness: f32,
    pub suspension_rest_length: f32,
    pub max_suspension_force: f32,
    pub max_suspension_travel: f32,
    pub damping_relaxation: f32,
    pub damping_compression: f32,
    pub friction_slip: f32,
    pub is_front: bool,
}

impl WheelConfig {
    fn base(grip: f32) -> Self {
        Self {
            radius: WHEEL_RADIUS,
            direction_local: Vec3::NEG_Y,
            axle_local: Vec3::NEG_X,
            connection_point_local: Vec3::ZERO,
            suspension_stiffness: 30.0,
            suspension_rest_length: 0.3,
            max_suspension_force: 100_000.0,
            max_suspension_travel: 0.3,
            damping_relaxation: 2.3,
            damping_compression: 4.4,
            friction_slip: BASE_FRICTION_SLIP * grip,
            is_front: false,
        }
    }
}

/// Four wheels mirrored across the chassis box. Indices 0,1 are front, 2,3 rear.
pub fn wheel_layout(grip: f32) -> [WheelConfig; WHEEL_COUNT] {
    let x = CHASSIS_WIDTH / 2.0 - WHEEL_INSET_X;
    let y = -CHASSIS_HEIGHT / 2.0;
    let z = CHASSIS_LENGTH / 2.0 - WHEEL_INSET_Z;
    let wheel = |point: Vec3, is_front: bool| WheelConfig {
        connection_point_local: point,
        is_front,
        ..WheelConfig::base(grip)
    };
    [
        wheel(Vec3::new(-x, y, z), true),
        wheel(Vec3::new(x, y, z), true),
        wheel(Vec3::new(-x, y, -z), false),
        wheel(Vec3::new(x, y, -z), false),
    ]
}

/// Per-wheel command surface of a raycast vehicle.
pub trait VehicleApi {
    fn set_steering_value(&mut self, angle: f32, wheel: usize);
    fn apply_engine_force(&mut self, force: f32, wheel: usize);
    fn set_brake(&mut self, force: f32, wheel: usize);
}

pub fn steering_angle(controls: &Controls) -> f32 {
    match (controls.left, controls.right) {
        (true, false) => STEER_ANGLE,
        (false, true) => -STEER_ANGLE,
        _ => 0.0,
    }
}

/// Negative drives forward. Backward is evaluated last and wins a tie.
pub fn engine_force(controls: &Controls, stats: &CarStats) -> f32 {
    let max_force = stats.torque * ENGINE_FORCE_GAIN;
    let mut force = 0.0;
    if controls.forward {
        force = -max_force;
    }
    if controls.backward {
        force = max_force;
    }
    force
}

pub fn brake_force(controls: &Controls) -> f32 {
    if controls.brake { BRAKE_FORCE } else { 0.0 }
}

pub fn driven_wheels(drive_train: DriveTrain) -> &'static [usize] {
    match drive_train {
        DriveTrain::Fwd => &FRONT_WHEELS,
        DriveTrain::Rwd => &REAR_WHEELS,
        DriveTrain::Awd => &ALL_WHEELS,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleController {
    engine: EngineModel,
}

impl VehicleController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine(&self) -> &EngineModel {
        &self.engine
    }

    /// Run one control tick: command every wheel, then advance the engine model.
    pub fn tick(
        &mut self,
        controls: &Controls,
        stats: &CarStats,
        drive_train: DriveTrain,
        body: &mut impl VehicleApi,
    ) -> Telemetry {
        let steer = steering_angle(controls);
        for wheel in FRONT_WHEELS {
            body.set_steering_value(steer, wheel);
        }

        let force = engine_force(controls, stats);
        let driven = driven_wheels(drive_train);
        for wheel in ALL_WHEELS {
            let wheel_force = if driven.contains(&wheel) { force } else { 0.0 };
            body.apply_engine_force(wheel_force, wheel);
        }

        let brake = brake_force(controls);
        for wheel in ALL_WHEELS {
            body.set_brake(brake, wheel);
        }

        self.engine.update(controls.forward);

        Telemetry {
            speed: self.engine.estimated_speed(stats.top_speed),
            rpm: self.engine.rpm(),
            gear: self.engine.gear(),
        }
    }
}

/// Once per frame: feed the sampled controls through each car's controller.
pub fn drive_cars(
    controls: Res<ActiveControls>,
    mut cars: Query<(&mut Car, &mut RaycastVehicle)>,
    mut telemetry: MessageWriter<Telemetry>,
) {
    for (mut car, mut vehicle) in &mut cars {
        let Car {
            stats,
            drive_train,
            controller,
        } = &mut *car;
        let sample = controller.tick(&controls.0, stats, *drive_train, &mut *vehicle);
        telemetry.write(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IDLE_RPM;

    #[derive(Default)]
    struct RecordingBody {
        steering: [Option<f32>; WHEEL_COUNT],
        engine: [Option<f32>; WHEEL_COUNT],
        brake: [Option<f32>; WHEEL_COUNT],
    }

    impl VehicleApi for RecordingBody {
        fn set_steering_value(&mut self, angle: f32, wheel: usize) {
            self.steering[wheel] = Some(angle);
        }

        fn apply_engine_force(&mut self, force: f32, wheel: usize) {
            self.engine[wheel] = Some(force);
        }

        fn set_brake(&mut self, force: f32, wheel: usize) {
            self.brake[wheel] = Some(force);
        }
    }

    fn starter_stats() -> CarStats {
        CarStats {
            horsepower: 110.0,
            torque: 140.0,
            weight: 1200.0,
            grip: 1.0,
            top_speed: 180.0,
            acceleration: 8.5,
        }
    }

    fn controls(forward: bool, backward: bool, left: bool, right: bool, brake: bool) -> Controls {
        Controls {
            forward,
            backward,
            left,
            right,
            brake,
        }
    }

    #[test]
    fn steering_follows_left_right_exclusively() {
        assert_eq!(steering_angle(&controls(false, false, true, false, false)), 0.35);
        assert_eq!(steering_angle(&controls(false, false, false, true, false)), -0.35);
        assert_eq!(steering_angle(&controls(false, false, true, true, false)), 0.0);
        assert_eq!(steering_angle(&Controls::default()), 0.0);
    }

    #[test]
    fn backward_wins_when_both_pedals_held() {
        for torque in [-30.0, 1.0, 140.0, 700.0] {
            let stats = CarStats {
                torque,
                ..starter_stats()
            };
            let both = controls(true, true, false, false, false);
            assert_eq!(engine_force(&both, &stats), torque * ENGINE_FORCE_GAIN);
        }
    }

    #[test]
    fn forward_is_negative_force() {
        let stats = starter_stats();
        assert_eq!(engine_force(&controls(true, false, false, false, false), &stats), -7000.0);
        assert_eq!(engine_force(&controls(false, true, false, false, false), &stats), 7000.0);
        assert_eq!(engine_force(&Controls::default(), &stats), 0.0);
    }

    #[test]
    fn drivetrain_routes_force_to_its_axle() {
        let stats = starter_stats();
        let input = controls(true, false, false, false, false);
        let cases = [
            (DriveTrain::Fwd, [-7000.0, -7000.0, 0.0, 0.0]),
            (DriveTrain::Rwd, [0.0, 0.0, -7000.0, -7000.0]),
            (DriveTrain::Awd, [-7000.0; 4]),
        ];
        for (drive_train, expected) in cases {
            let mut body = RecordingBody::default();
            VehicleController::new().tick(&input, &stats, drive_train, &mut body);
            assert_eq!(body.engine.map(|f| f.unwrap()), expected, "{drive_train:?}");
        }
    }

    #[test]
    fn only_front_wheels_steer() {
        let mut body = RecordingBody::default();
        VehicleController::new().tick(
            &controls(false, false, true, false, false),
            &starter_stats(),
            DriveTrain::Rwd,
            &mut body,
        );
        assert_eq!(body.steering, [Some(0.35), Some(0.35), None, None]);
    }

    #[test]
    fn brake_and_throttle_apply_together() {
        let mut body = RecordingBody::default();
        VehicleController::new().tick(
            &controls(true, false, false, false, true),
            &starter_stats(),
            DriveTrain::Awd,
            &mut body,
        );
        assert_eq!(body.brake.map(|b| b.unwrap()), [250.0; 4]);
        assert_eq!(body.engine.map(|f| f.unwrap()), [-7000.0; 4]);
    }

    #[test]
    fn one_tick_forward_then_one_tick_coast() {
        let stats = starter_stats();
        let mut controller = VehicleController::new();
        assert_eq!(controller.engine().rpm(), IDLE_RPM);

        let mut body = RecordingBody::default();
        let sample = controller.tick(
            &controls(true, false, false, false, false),
            &stats,
            DriveTrain::Fwd,
            &mut body,
        );
        assert_eq!(body.engine.map(|f| f.unwrap()), [-7000.0, -7000.0, 0.0, 0.0]);
        assert_eq!(body.brake.map(|b| b.unwrap()), [0.0; 4]);
        assert!((sample.rpm - 1300.0).abs() < 1e-3);
        assert!((sample.speed - 29.25).abs() < 1e-3);
        assert_eq!(sample.gear, 1);

        let mut body = RecordingBody::default();
        let sample = controller.tick(&Controls::default(), &stats, DriveTrain::Fwd, &mut body);
        assert_eq!(body.engine.map(|f| f.unwrap()), [0.0; 4]);
        assert!((sample.rpm - 1150.0).abs() < 1e-3);
    }

    #[test]
    fn wheel_layout_is_mirrored() {
        let wheels = wheel_layout(1.0);
        assert!(wheels[FRONT_LEFT].is_front && wheels[FRONT_RIGHT].is_front);
        assert!(!wheels[REAR_LEFT].is_front && !wheels[REAR_RIGHT].is_front);

        let fl = wheels[FRONT_LEFT].connection_point_local;
        let fr = wheels[FRONT_RIGHT].connection_point_local;
        let rl = wheels[REAR_LEFT].connection_point_local;
        assert_eq!(fl.x, -fr.x);
        assert_eq!(fl.z, -rl.z);
        assert!((fl - Vec3::new(-0.6, -0.3, 1.6)).length() < 1e-5);
    }

    #[test]
    fn grip_scales_friction_slip() {
        let wheels = wheel_layout(2.5);
        for wheel in wheels {
            assert!((wheel.friction_slip - 6.25).abs() < 1e-5);
        }
    }
}
