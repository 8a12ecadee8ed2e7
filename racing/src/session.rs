//! Race lifecycle: resolve the active car, spawn the scene, run the frame
//! loop, tear everything down on exit.

use std::f32::consts::PI;
use std::path::PathBuf;

use avian3d::prelude::*;
use bevy::app::{RunFixedMainLoop, RunFixedMainLoopSystems};
use bevy::prelude::*;
use garage::{CarStats, DriveTrain, GarageStore};
use thiserror::Error;

use crate::Car;
use crate::audio::{self, EngineAudio, EngineAudioPlugin, EngineTone, EngineToneSource};
use crate::camera::{self, CAMERA_FOV_DEGREES, ChaseCamera};
use crate::controls::{self, ActiveControls};
use crate::physics::{RaycastVehicle, RaycastVehiclePlugin, WheelVisual};
use crate::telemetry::{self, HudTelemetry, LapClock, Telemetry};
use crate::track;
use crate::track_format::{SpawnSpec, TrackFile};
use crate::vehicle::{self, CHASSIS_HEIGHT, CHASSIS_LENGTH, CHASSIS_WIDTH, WHEEL_RADIUS};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no car selected, buy one at the dealer first")]
    NoActiveCar,
    #[error("car model `{0}` is missing from the catalog")]
    UnknownCarDef(String),
    #[error("chassis pose is not finite, the simulation diverged")]
    NonFinitePose,
}

/// Fatal fault raised while a race is running.
#[derive(Message, Debug)]
pub struct SimulationFault(pub SessionError);

#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppMode {
    #[default]
    Garage,
    Race,
}

#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub enum RaceStatus {
    #[default]
    Idle,
    Running,
    Failed(String),
}

pub fn race_running(status: Res<RaceStatus>) -> bool {
    *status == RaceStatus::Running
}

/// Everything spawned for a race carries this and is despawned on exit.
#[derive(Component)]
pub struct RaceEntity;

/// Player garage plus where it is persisted.
#[derive(Resource)]
pub struct Garage {
    pub store: GarageStore,
    pub save_path: PathBuf,
}

impl Garage {
    /// Write the garage to disk. A failed save is logged and otherwise ignored.
    pub fn persist(&self) {
        if let Err(error) = self.store.save(&self.save_path) {
            warn!("could not save garage: {error}");
        }
    }
}

#[derive(Resource, Clone)]
pub struct RaceTrack(pub TrackFile);

/// Resolved inputs for one race, passed by value at session start.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceSetup {
    pub name: String,
    pub stats: CarStats,
    pub drive_train: DriveTrain,
    pub color: String,
}

impl RaceSetup {
    pub fn resolve(store: &GarageStore) -> Result<Self, SessionError> {
        let car = store.active_car().ok_or(SessionError::NoActiveCar)?;
        let def = store
            .def_for(car)
            .ok_or_else(|| SessionError::UnknownCarDef(car.def_id.clone()))?;
        Ok(Self {
            name: def.name.clone(),
            stats: store.car_stats(&car.instance_id),
            drive_train: def.drive_train,
            color: car.custom_color.clone(),
        })
    }
}

pub struct RacePlugin;

impl Plugin for RacePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((RaycastVehiclePlugin, EngineAudioPlugin))
            .init_state::<AppMode>()
            .add_message::<Telemetry>()
            .add_message::<SimulationFault>()
            .insert_resource(Gravity(Vec3::NEG_Y * 9.8))
            .init_resource::<RaceStatus>()
            .init_resource::<ActiveControls>()
            .init_resource::<HudTelemetry>()
            .init_resource::<LapClock>()
            .add_systems(Startup, pause_physics)
            .add_systems(OnEnter(AppMode::Race), start_race)
            .add_systems(
                Update,
                telemetry::advance_lap_clock.run_if(in_state(AppMode::Race)),
            );
        add_race_frame_systems(app);
        add_race_exit_systems(app);
    }
}

/// Controls are sampled and the controller ticked before the fixed physics
/// steps of the frame, so the solver steps on this frame's wheel commands.
/// Camera, telemetry and audio follow the step in `Update`.
fn add_race_frame_systems(app: &mut App) {
    app.add_systems(
        RunFixedMainLoop,
        (controls::sample_controls, vehicle::drive_cars)
            .chain()
            .in_set(RunFixedMainLoopSystems::BeforeFixedMainLoop)
            .run_if(in_state(AppMode::Race).and(race_running)),
    )
    .add_systems(
        Update,
        (
            camera::follow_car,
            telemetry::emit_telemetry,
            audio::feed_engine_rpm,
        )
            .chain()
            .run_if(in_state(AppMode::Race).and(race_running)),
    );
}

fn add_race_exit_systems(app: &mut App) {
    app.add_systems(
        OnExit(AppMode::Race),
        (audio::stop_engine_audio, end_race).chain(),
    )
    .add_systems(
        Update,
        (handle_simulation_faults, exit_race_on_escape).run_if(in_state(AppMode::Race)),
    );
}

fn pause_physics(mut physics_time: ResMut<Time<Physics>>) {
    physics_time.pause();
}

#[allow(clippy::too_many_arguments)]
fn start_race(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut tone_sources: ResMut<Assets<EngineToneSource>>,
    garage: Res<Garage>,
    track: Res<RaceTrack>,
    mut status: ResMut<RaceStatus>,
    mut clock: ResMut<LapClock>,
    mut hud: ResMut<HudTelemetry>,
    mut physics_time: ResMut<Time<Physics>>,
) {
    let setup = match RaceSetup::resolve(&garage.store) {
        Ok(setup) => setup,
        Err(error) => {
            error!("cannot start race: {error}");
            *status = RaceStatus::Failed(error.to_string());
            return;
        }
    };

    track::spawn_track(&mut commands, &mut meshes, &mut materials, &track.0);
    spawn_vehicle(&mut commands, &mut meshes, &mut materials, &setup, &track.0.spawn);

    let chase = ChaseCamera::spawned_at(track.0.spawn.position());
    commands.spawn((
        RaceEntity,
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: CAMERA_FOV_DEGREES.to_radians(),
            ..default()
        }),
        Transform::from_translation(chase.position()).looking_at(track.0.spawn.position(), Vec3::Y),
        chase,
    ));
    commands.spawn((
        RaceEntity,
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(100.0, 20.0, 100.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        RaceEntity,
        PointLight {
            intensity: 1_000_000.0,
            range: 200.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(10.0, 50.0, 10.0),
    ));

    audio::spawn_engine_voice(&mut commands, &mut tone_sources);

    hud.0 = Telemetry::default();
    clock.start();
    physics_time.unpause();
    *status = RaceStatus::Running;
    info!(
        "Race started in {} ({}, {:.0} N·m, {:.0} kg)",
        setup.name,
        setup.drive_train.label(),
        setup.stats.torque,
        setup.stats.weight
    );
}

fn spawn_vehicle(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    setup: &RaceSetup,
    spawn: &SpawnSpec,
) -> Entity {
    let paint = match Srgba::hex(&setup.color) {
        Ok(color) => Color::from(color),
        Err(error) => {
            warn!("invalid paint colour `{}`: {error:?}", setup.color);
            Color::srgb(0.5, 0.5, 0.5)
        }
    };
    let body_material = materials.add(StandardMaterial {
        base_color: paint,
        metallic: 0.6,
        perceptual_roughness: 0.2,
        ..default()
    });
    let dark = materials.add(StandardMaterial {
        base_color: Color::srgb(0.07, 0.07, 0.07),
        ..default()
    });
    let headlight = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        emissive: LinearRgba::WHITE * 2.0,
        ..default()
    });
    let taillight = materials.add(StandardMaterial {
        base_color: Color::srgb(1.0, 0.0, 0.0),
        emissive: LinearRgba::RED,
        ..default()
    });
    let wheel_mesh = meshes.add(Cylinder::new(WHEEL_RADIUS, 0.25));
    let wheels = vehicle::wheel_layout(setup.stats.grip);

    let mut entity = commands.spawn((
        RaceEntity,
        Name::new(setup.name.clone()),
        Transform::from_translation(spawn.position()).with_rotation(Quat::from_rotation_y(spawn.yaw)),
        Visibility::default(),
        RigidBody::Dynamic,
        Collider::cuboid(CHASSIS_WIDTH, CHASSIS_HEIGHT, CHASSIS_LENGTH),
        Mass(setup.stats.weight),
        AngularDamping(vehicle::CHASSIS_ANGULAR_DAMPING),
        LinearDamping(vehicle::CHASSIS_LINEAR_DAMPING),
        SleepingDisabled,
        Car::new(setup.stats, setup.drive_train),
        RaycastVehicle::new(wheels, setup.stats.weight),
        Mesh3d(meshes.add(Cuboid::new(CHASSIS_WIDTH, CHASSIS_HEIGHT, CHASSIS_LENGTH))),
        MeshMaterial3d(body_material),
    ));

    entity.with_children(|parent| {
        // Cockpit
        parent.spawn((
            Mesh3d(meshes.add(Cuboid::new(1.6, 0.4, 2.0))),
            MeshMaterial3d(dark.clone()),
            Transform::from_xyz(0.0, 0.35, 0.0),
        ));
        for x in [-0.6, 0.6] {
            parent.spawn((
                Mesh3d(meshes.add(Cuboid::new(0.3, 0.2, 0.1))),
                MeshMaterial3d(headlight.clone()),
                Transform::from_xyz(x, 0.0, 2.0),
            ));
            parent.spawn((
                Mesh3d(meshes.add(Cuboid::new(0.4, 0.2, 0.1))),
                MeshMaterial3d(taillight.clone()),
                Transform::from_xyz(x, 0.1, -2.1),
            ));
        }
        for (index, wheel) in wheels.iter().enumerate() {
            parent
                .spawn((
                    WheelVisual(index),
                    Transform::from_translation(
                        wheel.connection_point_local
                            + wheel.direction_local * wheel.suspension_rest_length,
                    ),
                    Visibility::default(),
                ))
                .with_children(|parent| {
                    parent.spawn((
                        Mesh3d(wheel_mesh.clone()),
                        MeshMaterial3d(dark.clone()),
                        Transform::from_rotation(Quat::from_rotation_z(-PI / 2.0)),
                    ));
                });
        }
    });

    entity.id()
}

fn end_race(
    mut commands: Commands,
    race_entities: Query<Entity, With<RaceEntity>>,
    mut status: ResMut<RaceStatus>,
    mut clock: ResMut<LapClock>,
    mut physics_time: ResMut<Time<Physics>>,
) {
    for entity in &race_entities {
        commands.entity(entity).despawn();
    }
    clock.stop();
    physics_time.pause();
    *status = RaceStatus::Idle;
    info!("Race ended after {} s", clock.label());
}

fn handle_simulation_faults(
    mut faults: MessageReader<SimulationFault>,
    mut status: ResMut<RaceStatus>,
    mut clock: ResMut<LapClock>,
    mut physics_time: ResMut<Time<Physics>>,
    mut tones: Query<&mut EngineTone>,
) {
    let Some(SimulationFault(error)) = faults.read().next() else {
        return;
    };
    error!("race aborted: {error}");
    *status = RaceStatus::Failed(error.to_string());
    clock.stop();
    physics_time.pause();
    for mut tone in &mut tones {
        tone.stop();
    }
}

fn exit_race_on_escape(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_mode: ResMut<NextState<AppMode>>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        next_mode.set(AppMode::Garage);
    }
}
