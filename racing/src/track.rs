use avian3d::prelude::*;
use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;

use crate::session::RaceEntity;
use crate::track_format::TrackFile;

const FLOOR_COLOR: Color = Color::srgb(0.13, 0.13, 0.13);
const GRID_COLOR: Color = Color::srgb(0.27, 0.27, 0.27);
const WALL_COLOR: Color = Color::srgb(0.27, 0.27, 0.27);
const START_LINE_COLOR: Color = Color::WHITE;
const GRID_DIVISIONS: u32 = 50;

/// Spawn floor, walls and start line as static bodies tagged for teardown.
pub fn spawn_track(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    track: &TrackFile,
) {
    let floor = &track.floor;
    commands.spawn((
        RaceEntity,
        Name::new("Floor"),
        RigidBody::Static,
        Collider::half_space(Vec3::Y),
        Friction::new(floor.friction),
        Restitution::new(floor.restitution),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(floor.size, floor.size))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: FLOOR_COLOR,
            perceptual_roughness: 0.8,
            ..default()
        })),
        Transform::default(),
    ));

    commands.spawn((
        RaceEntity,
        Name::new("Floor Grid"),
        Mesh3d(meshes.add(create_grid_mesh(floor.size, GRID_DIVISIONS))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: GRID_COLOR,
            unlit: true,
            ..default()
        })),
        Transform::from_xyz(0.0, 0.005, 0.0),
    ));

    let wall_material = materials.add(StandardMaterial {
        base_color: WALL_COLOR,
        perceptual_roughness: 0.5,
        ..default()
    });
    for wall in &track.walls {
        let size = wall.size();
        commands.spawn((
            RaceEntity,
            Name::new("Wall"),
            RigidBody::Static,
            Collider::cuboid(size.x, size.y, size.z),
            Mesh3d(meshes.add(Cuboid::from_size(size))),
            MeshMaterial3d(wall_material.clone()),
            Transform::from_translation(wall.position()),
        ));
    }

    if let Some(line) = &track.start_line {
        let size = line.size();
        commands.spawn((
            RaceEntity,
            Name::new("Start Line"),
            Mesh3d(meshes.add(Plane3d::default().mesh().size(size.x, size.z))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: START_LINE_COLOR,
                unlit: true,
                ..default()
            })),
            Transform::from_translation(line.position()),
        ));
    }

    info!(
        "Spawned track `{}` with {} walls",
        track.metadata.name,
        track.walls.len()
    );
}

/// Square line grid on the XZ plane centred at the origin.
pub fn create_grid_mesh(size: f32, divisions: u32) -> Mesh {
    let half = size * 0.5;
    let step = size / divisions as f32;

    let mut positions = Vec::new();
    let mut indices = Vec::new();

    for i in 0..=divisions {
        let offset = -half + i as f32 * step;
        let base = positions.len() as u32;

        // Line parallel to X
        positions.push([-half, 0.0, offset]);
        positions.push([half, 0.0, offset]);
        // Line parallel to Z
        positions.push([offset, 0.0, -half]);
        positions.push([offset, 0.0, half]);

        indices.extend_from_slice(&[base, base + 1, base + 2, base + 3]);
    }

    let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_two_lines_per_division_boundary() {
        let mesh = create_grid_mesh(500.0, 50);
        assert_eq!(mesh.count_vertices(), 51 * 4);
        match mesh.indices() {
            Some(Indices::U32(indices)) => assert_eq!(indices.len(), 51 * 4),
            _ => panic!("grid mesh should use u32 indices"),
        }
    }

    #[test]
    fn grid_spans_the_floor() {
        let mesh = create_grid_mesh(10.0, 2);
        let Some(positions) = mesh
            .attribute(Mesh::ATTRIBUTE_POSITION)
            .and_then(|attr| attr.as_float3())
        else {
            panic!("grid mesh should have float3 positions");
        };
        assert_eq!(positions[0], [-5.0, 0.0, -5.0]);
        assert_eq!(positions[positions.len() - 1], [5.0, 0.0, 5.0]);
    }
}
