//! Raycast vehicle on top of avian3d.
//!
//! Each wheel is a ray cast from its chassis connection point along the
//! suspension direction. Contact produces a spring-damper force along the
//! ground normal plus tyre forces in the contact plane, limited by the wheel's
//! friction slip times its suspension load. Wheels are not rigid bodies.

use avian3d::prelude::{forces::ForcesItem, *};
use bevy::prelude::*;

use crate::session::SessionError;
use crate::vehicle::{VehicleApi, WHEEL_COUNT, WheelConfig};

/// Below this alignment between ground normal and suspension axis the
/// suspension is treated as side-on to the ground.
const MIN_NORMAL_ALIGNMENT: f32 = 0.1;
const SIDE_ON_INV_CONTACT_DOT: f32 = 10.0;
/// Height at which side forces act, as a fraction of the contact depth below
/// the centre of mass. Small values resist roll-over.
pub const ROLL_INFLUENCE: f32 = 0.01;

/// World pose of the chassis as read once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl ChassisPose {
    pub fn from_transform(transform: &Transform) -> Result<Self, SessionError> {
        if !transform.translation.is_finite() || !transform.rotation.is_finite() {
            return Err(SessionError::NonFinitePose);
        }
        Ok(Self {
            position: transform.translation,
            rotation: transform.rotation,
        })
    }
}

/// Commands and suspension state of one wheel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelState {
    pub steering: f32,
    pub engine_force: f32,
    /// Impulse cap per step, N·s.
    pub brake: f32,
    pub suspension_length: f32,
    pub suspension_force: f32,
    pub in_contact: bool,
}

#[derive(Component, Debug, Clone)]
pub struct RaycastVehicle {
    pub wheels: [WheelConfig; WHEEL_COUNT],
    pub states: [WheelState; WHEEL_COUNT],
    pub chassis_mass: f32,
}

impl RaycastVehicle {
    pub fn new(wheels: [WheelConfig; WHEEL_COUNT], chassis_mass: f32) -> Self {
        let states = wheels.map(|w| WheelState {
            suspension_length: w.suspension_rest_length,
            ..default()
        });
        Self {
            wheels,
            states,
            chassis_mass,
        }
    }
}

impl VehicleApi for RaycastVehicle {
    fn set_steering_value(&mut self, angle: f32, wheel: usize) {
        if let Some(state) = self.states.get_mut(wheel) {
            state.steering = angle;
        }
    }

    fn apply_engine_force(&mut self, force: f32, wheel: usize) {
        if let Some(state) = self.states.get_mut(wheel) {
            state.engine_force = force;
        }
    }

    fn set_brake(&mut self, force: f32, wheel: usize) {
        if let Some(state) = self.states.get_mut(wheel) {
            state.brake = force;
        }
    }
}

/// Marker for the mesh of wheel `n` under a vehicle.
#[derive(Component)]
pub struct WheelVisual(pub usize);

pub struct RaycastVehiclePlugin;

impl Plugin for RaycastVehiclePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(FixedUpdate, update_raycast_vehicles)
            .add_systems(Update, sync_wheel_visuals);
    }
}

/// Axle and rolling direction of a wheel in world space, projected onto the
/// contact plane. Positive steering turns the wheel toward the chassis' left.
///
/// A negative force along the returned rolling direction drives the car
/// toward its nose.
pub fn wheel_basis(chassis: Quat, config: &WheelConfig, steering: f32, normal: Vec3) -> (Vec3, Vec3) {
    let up = chassis * -config.direction_local;
    let axle = Quat::from_axis_angle(up, steering) * (chassis * config.axle_local);
    let axle = (axle - normal * axle.dot(normal)).normalize_or_zero();
    let rolling = axle.cross(normal).normalize_or_zero();
    (axle, rolling)
}

/// Spring-damper load on one wheel, in newtons, clamped to `[0, max_suspension_force]`.
///
/// `relative_velocity` is negative while the suspension compresses.
pub fn suspension_force(
    config: &WheelConfig,
    suspension_length: f32,
    relative_velocity: f32,
    inv_contact_dot: f32,
    chassis_mass: f32,
) -> f32 {
    let spring = config.suspension_stiffness
        * (config.suspension_rest_length - suspension_length)
        * inv_contact_dot;
    let damping = if relative_velocity < 0.0 {
        config.damping_compression
    } else {
        config.damping_relaxation
    };
    ((spring - damping * relative_velocity) * chassis_mass).clamp(0.0, config.max_suspension_force)
}

/// Tyre force along (rolling, axle) for one contact, limited to the friction circle.
pub fn tyre_force(
    state: &WheelState,
    config: &WheelConfig,
    rolling_velocity: f32,
    side_velocity: f32,
    mass_share: f32,
    dt: f32,
) -> Vec2 {
    let mut longitudinal = state.engine_force;
    if state.brake > 0.0 {
        let stop = -rolling_velocity * mass_share / dt;
        let cap = state.brake / dt;
        longitudinal += stop.clamp(-cap, cap);
    }
    let lateral = -side_velocity * mass_share / dt;

    let force = Vec2::new(longitudinal, lateral);
    let limit = config.friction_slip * state.suspension_force;
    if force.length() > limit {
        force.normalize_or_zero() * limit
    } else {
        force
    }
}

pub fn update_raycast_vehicles(
    time: Res<Time>,
    spatial_query: SpatialQuery,
    mut vehicles: Query<(Entity, &Transform, &mut RaycastVehicle, Forces)>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    for (entity, transform, mut vehicle, mut forces) in &mut vehicles {
        let filter = SpatialQueryFilter::from_excluded_entities([entity]);
        let chassis_mass = vehicle.chassis_mass;
        let mass_share = chassis_mass / WHEEL_COUNT as f32;

        for index in 0..WHEEL_COUNT {
            let config = vehicle.wheels[index];
            let state = &mut vehicle.states[index];
            step_wheel(
                transform,
                &config,
                state,
                &spatial_query,
                &filter,
                &mut forces,
                chassis_mass,
                mass_share,
                dt,
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn step_wheel(
    transform: &Transform,
    config: &WheelConfig,
    state: &mut WheelState,
    spatial_query: &SpatialQuery,
    filter: &SpatialQueryFilter,
    forces: &mut ForcesItem<'_, '_>,
    chassis_mass: f32,
    mass_share: f32,
    dt: f32,
) {
    let centre = transform.translation;
    let rotation = transform.rotation;
    let hard_point = centre + rotation * config.connection_point_local;
    let down = rotation * config.direction_local;
    let max_length = config.suspension_rest_length + config.max_suspension_travel;
    let min_length = (config.suspension_rest_length - config.max_suspension_travel).max(0.0);

    let hit = Dir3::new(down).ok().and_then(|direction| {
        spatial_query.cast_ray(hard_point, direction, max_length + config.radius, true, filter)
    });
    let Some(hit) = hit else {
        state.in_contact = false;
        state.suspension_length = max_length;
        state.suspension_force = 0.0;
        return;
    };

    let normal = hit.normal;
    let contact = hard_point + down * hit.distance;
    let point_velocity = forces.linear_velocity() + forces.angular_velocity().cross(contact - centre);

    let contact_dot = normal.dot(down);
    let (relative_velocity, inv_contact_dot) = if contact_dot >= -MIN_NORMAL_ALIGNMENT {
        (0.0, SIDE_ON_INV_CONTACT_DOT)
    } else {
        let inv = -1.0 / contact_dot;
        (normal.dot(point_velocity) * inv, inv)
    };

    state.in_contact = true;
    state.suspension_length = (hit.distance - config.radius).clamp(min_length, max_length);
    state.suspension_force = suspension_force(
        config,
        state.suspension_length,
        relative_velocity,
        inv_contact_dot,
        chassis_mass,
    );
    forces.apply_force_at_point(normal * state.suspension_force, contact);

    let (axle, rolling) = wheel_basis(rotation, config, state.steering, normal);
    let tyre = tyre_force(
        state,
        config,
        point_velocity.dot(rolling),
        point_velocity.dot(axle),
        mass_share,
        dt,
    );

    forces.apply_force_at_point(rolling * tyre.x, contact);

    // Lift the side force toward the centre of mass.
    let up = -down;
    let offset = contact - centre;
    let side_point = contact - up * offset.dot(up) * (1.0 - ROLL_INFLUENCE);
    forces.apply_force_at_point(axle * tyre.y, side_point);
}

pub fn sync_wheel_visuals(
    vehicles: Query<(&RaycastVehicle, &Children)>,
    mut visuals: Query<(&WheelVisual, &mut Transform), Without<RaycastVehicle>>,
) {
    for (vehicle, children) in &vehicles {
        for child in children.iter() {
            let Ok((wheel, mut transform)) = visuals.get_mut(child) else {
                continue;
            };
            let (Some(config), Some(state)) = (vehicle.wheels.get(wheel.0), vehicle.states.get(wheel.0))
            else {
                continue;
            };
            transform.translation =
                config.connection_point_local + config.direction_local * state.suspension_length;
            transform.rotation = Quat::from_rotation_y(state.steering);
        }
    }
}
