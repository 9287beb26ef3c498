use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::settings::{de_hex, CameraSettings, FogSettings, LightSettings, Rgb};

pub const DEFAULT_PRESET: &str = "showcase";

const BUILTIN: &[(&str, &str)] = &[
    ("cubes", include_str!("../../presets/cubes.json")),
    ("showcase", include_str!("../../presets/showcase.json")),
    ("picking", include_str!("../../presets/picking.json")),
];

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("unknown builtin preset `{0}`")]
    Unknown(String),
    #[error("failed to read preset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid preset json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A row of identical primitives that spin as one animated group
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RowPreset {
    pub count: usize,
    pub spacing: f32,
    pub y: f32,
    pub z: f32,
    pub size: f32,
    pub base_speed: f32,
    pub speed_increment: f32,
    /// Hex colors, cycled over the members
    pub colors: Vec<String>,
    /// Texture paths relative to the asset root, one per member
    pub textures: Vec<String>,
    pub unlit: bool,
}

impl Default for RowPreset {
    fn default() -> Self {
        Self {
            count: 0,
            spacing: 2.0,
            y: 0.0,
            z: 0.0,
            size: 1.0,
            base_speed: 0.2,
            speed_increment: 0.1,
            colors: Vec::new(),
            textures: Vec::new(),
            unlit: false,
        }
    }
}

impl RowPreset {
    /// X coordinate of member `index`, with the row centered on x = 0
    pub fn x_at(&self, index: usize) -> f32 {
        index as f32 * self.spacing - (self.count.saturating_sub(1)) as f32 * self.spacing * 0.5
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroundPreset {
    pub size: f32,
    pub y: f32,
    #[serde(deserialize_with = "de_hex")]
    pub color: Rgb,
    pub texture: Option<String>,
    /// Texture repetitions across the plane
    pub repeat: f32,
}

impl Default for GroundPreset {
    fn default() -> Self {
        Self {
            size: 40.0,
            y: -2.0,
            color: [1.0, 1.0, 1.0],
            texture: None,
            repeat: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelPreset {
    pub obj: String,
    pub mtl: Option<String>,
    pub position: [f32; 3],
    pub scale: f32,
    /// Material names rendered without back-face culling; `*` means all
    pub double_sided: Vec<String>,
}

impl Default for ModelPreset {
    fn default() -> Self {
        Self {
            obj: String::new(),
            mtl: None,
            position: [0.0, 0.0, 0.0],
            scale: 1.0,
            double_sided: Vec::new(),
        }
    }
}

/// Everything needed to build one scene variant
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScenePreset {
    pub name: String,
    pub asset_root: String,
    pub camera: CameraSettings,
    pub lights: LightSettings,
    pub fog: FogSettings,
    #[serde(deserialize_with = "de_hex")]
    pub background: Rgb,
    /// Equirectangular image replacing the background color once loaded
    pub environment: Option<String>,
    pub cubes: Option<RowPreset>,
    pub rings: Option<RowPreset>,
    pub gems: Option<RowPreset>,
    pub ground: Option<GroundPreset>,
    pub models: Vec<ModelPreset>,
    pub picking: bool,
    pub orbit: bool,
}

impl Default for ScenePreset {
    fn default() -> Self {
        Self {
            name: "empty".to_string(),
            asset_root: "assets".to_string(),
            camera: CameraSettings::default(),
            lights: LightSettings::default(),
            fog: FogSettings::default(),
            background: [0.0, 0.0, 0.0],
            environment: None,
            cubes: None,
            rings: None,
            gems: None,
            ground: None,
            models: Vec::new(),
            picking: false,
            orbit: false,
        }
    }
}

impl ScenePreset {
    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|(name, _)| *name)
    }

    pub fn builtin(name: &str) -> Result<Self, PresetError> {
        let (_, json) = BUILTIN
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| PresetError::Unknown(name.to_string()))?;
        Self::from_json(json)
    }

    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PresetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Builtin name, or a JSON file path when `selector` ends in `.json`.
    /// Falls back to the default preset, logging why.
    pub fn resolve(selector: Option<&str>) -> Self {
        let selector = selector.map(str::trim).filter(|s| !s.is_empty());
        let result = match selector {
            Some(s) if s.ends_with(".json") => Self::from_file(s),
            Some(s) => Self::builtin(s),
            None => Self::builtin(DEFAULT_PRESET),
        };

        match result {
            Ok(preset) => {
                tracing::info!(preset = %preset.name, "scene preset loaded");
                preset
            }
            Err(e) => {
                tracing::warn!("{e}; using `{DEFAULT_PRESET}`");
                Self::builtin(DEFAULT_PRESET).unwrap_or_default()
            }
        }
    }

    /// Join a relative asset path onto the asset root
    pub fn asset_path(&self, relative: &str) -> String {
        if self.asset_root.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.asset_root.trim_end_matches('/'), relative)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtins_parse() {
        for name in ScenePreset::builtin_names() {
            let preset = ScenePreset::builtin(name).unwrap_or_else(|e| panic!("{name}: {e}"));
            assert_eq!(preset.name, name);
            assert!(preset.camera.near < preset.camera.far);
        }
    }

    #[test]
    fn test_cubes_preset_matches_demo_row() {
        let preset = ScenePreset::builtin("cubes").unwrap();
        assert_eq!(preset.camera.fov, 150.0);
        assert_eq!(preset.camera.far, 5.0);
        assert_eq!(preset.camera.position, [0.0, 0.0, 2.0]);

        let cubes = preset.cubes.unwrap();
        assert!(cubes.unlit);
        assert_eq!(cubes.count, 6);
        assert_eq!(cubes.base_speed, 0.2);
        assert_eq!(cubes.speed_increment, 0.1);
        assert_eq!(cubes.textures.len(), 6);
        assert_eq!(cubes.x_at(0), -5.0);
        assert_eq!(cubes.x_at(5), 5.0);
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(matches!(ScenePreset::builtin("nope"), Err(PresetError::Unknown(_))));
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let preset = ScenePreset::resolve(Some("does-not-exist"));
        assert_eq!(preset.name, DEFAULT_PRESET);

        let missing = ScenePreset::resolve(Some("/no/such/preset.json"));
        assert_eq!(missing.name, DEFAULT_PRESET);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let preset = ScenePreset::from_json(r#"{ "name": "tiny", "picking": true, "cubes": { "count": 2 } }"#).unwrap();
        assert!(preset.picking);
        assert_eq!(preset.asset_root, "assets");
        assert_eq!(preset.cubes.as_ref().unwrap().spacing, 2.0);
        assert_eq!(preset.asset_path("fire.jpg"), "assets/fire.jpg");
    }
}
