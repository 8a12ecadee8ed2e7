use bevy::prelude::*;

use crate::Car;
use crate::physics::ChassisPose;
use crate::session::SimulationFault;

/// Camera offset in chassis space: above and behind.
pub const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 3.0, -6.5);
/// Exponential approach rate, per second.
pub const CAMERA_SMOOTHING: f32 = 5.0;
pub const LOOK_AT_OFFSET: Vec3 = Vec3::new(0.0, 1.0, 0.0);
/// Where the camera starts relative to the vehicle spawn point.
pub const SPAWN_CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 5.0, -10.0);
pub const CAMERA_FOV_DEGREES: f32 = 60.0;

/// Where to put the camera and what to point it at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraAim {
    pub position: Vec3,
    pub look_at: Vec3,
}

/// Trailing camera with smoothing memory across frames.
#[derive(Component, Debug, Clone, Copy)]
pub struct ChaseCamera {
    position: Vec3,
}

impl ChaseCamera {
    pub fn spawned_at(vehicle_spawn: Vec3) -> Self {
        Self {
            position: vehicle_spawn + SPAWN_CAMERA_OFFSET,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target_position(pose: &ChassisPose) -> Vec3 {
        pose.position + pose.rotation * CAMERA_OFFSET
    }

    pub fn update(&mut self, pose: &ChassisPose, delta_secs: f32) -> CameraAim {
        let target = Self::target_position(pose);
        let t = (CAMERA_SMOOTHING * delta_secs).clamp(0.0, 1.0);
        self.position = self.position.lerp(target, t);
        CameraAim {
            position: self.position,
            look_at: pose.position + LOOK_AT_OFFSET,
        }
    }
}

pub fn follow_car(
    time: Res<Time>,
    cars: Query<&Transform, With<Car>>,
    mut cameras: Query<(&mut Transform, &mut ChaseCamera), Without<Car>>,
    mut faults: MessageWriter<SimulationFault>,
) {
    let Ok(car_transform) = cars.single() else {
        return;
    };
    let Ok((mut camera_transform, mut chase)) = cameras.single_mut() else {
        return;
    };

    let pose = match ChassisPose::from_transform(car_transform) {
        Ok(pose) => pose,
        Err(error) => {
            faults.write(SimulationFault(error));
            return;
        }
    };

    let aim = chase.update(&pose, time.delta_secs());
    *camera_transform = Transform::from_translation(aim.position).looking_at(aim.look_at, Vec3::Y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn origin_pose() -> ChassisPose {
        ChassisPose {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    #[test]
    fn target_is_offset_rotated_by_chassis() {
        assert_eq!(ChaseCamera::target_position(&origin_pose()), CAMERA_OFFSET);

        let turned = ChassisPose {
            position: Vec3::new(10.0, 0.0, 0.0),
            rotation: Quat::from_rotation_y(FRAC_PI_2),
        };
        let target = ChaseCamera::target_position(&turned);
        assert!((target - Vec3::new(10.0 - 6.5, 3.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn large_delta_snaps_without_overshoot() {
        let mut camera = ChaseCamera::spawned_at(Vec3::new(0.0, 2.0, 0.0));
        let pose = origin_pose();
        for _ in 0..10 {
            let aim = camera.update(&pose, 3.0);
            assert!((aim.position - CAMERA_OFFSET).length() < 1e-5);
        }
    }

    #[test]
    fn small_delta_approaches_monotonically() {
        let mut camera = ChaseCamera::spawned_at(Vec3::ZERO);
        let pose = origin_pose();
        let target = ChaseCamera::target_position(&pose);
        let mut distance = camera.position().distance(target);
        for _ in 0..600 {
            camera.update(&pose, 1.0 / 60.0);
            let next = camera.position().distance(target);
            assert!(next <= distance + 1e-6);
            distance = next;
        }
        assert!(distance < 1e-3);
    }

    #[test]
    fn spawn_position_is_above_and_behind() {
        let camera = ChaseCamera::spawned_at(Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(camera.position(), Vec3::new(0.0, 7.0, -10.0));
    }

    #[test]
    fn look_target_does_not_disturb_pose() {
        let mut camera = ChaseCamera::spawned_at(Vec3::ZERO);
        let pose = ChassisPose {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::IDENTITY,
        };
        let aim = camera.update(&pose, 0.016);
        assert_eq!(aim.look_at, Vec3::new(1.0, 3.0, 3.0));
        assert_eq!(pose.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ChaseCamera::target_position(&pose), pose.position + CAMERA_OFFSET);
    }
}
