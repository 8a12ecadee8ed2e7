use std::f32::consts::PI;
use std::path::Path;

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TrackFile {
    #[serde(default)]
    pub metadata: TrackMetadata,
    #[serde(default)]
    pub floor: FloorSpec,
    #[serde(default)]
    pub walls: Vec<BoxSpec>,
    #[serde(default)]
    pub start_line: Option<BoxSpec>,
    #[serde(default)]
    pub spawn: SpawnSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TrackMetadata {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub author: String,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            name: default_name(),
            author: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FloorSpec {
    #[serde(default = "default_floor_size")]
    pub size: f32,
    #[serde(default = "default_floor_friction")]
    pub friction: f32,
    #[serde(default)]
    pub restitution: f32,
}

impl Default for FloorSpec {
    fn default() -> Self {
        Self {
            size: default_floor_size(),
            friction: default_floor_friction(),
            restitution: 0.0,
        }
    }
}

/// Axis-aligned box: centre position and full extents.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct BoxSpec {
    pub position: [f32; 3],
    pub size: [f32; 3],
}

impl BoxSpec {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn size(&self) -> Vec3 {
        Vec3::from_array(self.size)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SpawnSpec {
    #[serde(default = "default_spawn_position")]
    pub position: [f32; 3],
    /// Rotation about +Y, radians.
    #[serde(default = "default_spawn_yaw")]
    pub yaw: f32,
}

impl Default for SpawnSpec {
    fn default() -> Self {
        Self {
            position: default_spawn_position(),
            yaw: default_spawn_yaw(),
        }
    }
}

impl SpawnSpec {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

fn default_name() -> String {
    "Untitled".to_string()
}

fn default_floor_size() -> f32 {
    500.0
}

fn default_floor_friction() -> f32 {
    0.1
}

fn default_spawn_position() -> [f32; 3] {
    [0.0, 2.0, 0.0]
}

fn default_spawn_yaw() -> f32 {
    PI
}

impl TrackFile {
    /// Load a track from a TOML file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&text).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// The walled test loop used when no track file can be read.
    pub fn test_loop() -> Self {
        let wall = |position: [f32; 3], size: [f32; 3]| BoxSpec { position, size };
        Self {
            metadata: TrackMetadata {
                name: "Test Loop".to_string(),
                author: String::new(),
            },
            floor: FloorSpec::default(),
            walls: vec![
                wall([0.0, 1.0, -50.0], [200.0, 2.0, 2.0]),
                wall([0.0, 1.0, 50.0], [200.0, 2.0, 2.0]),
                wall([-100.0, 1.0, 0.0], [2.0, 2.0, 100.0]),
                wall([100.0, 1.0, 0.0], [2.0, 2.0, 100.0]),
            ],
            start_line: Some(wall([0.0, 0.01, 20.0], [20.0, 0.0, 4.0])),
            spawn: SpawnSpec::default(),
        }
    }
}
