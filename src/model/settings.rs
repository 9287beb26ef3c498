use serde::Deserialize;

/// RGB color with components in [0, 1]
pub type Rgb = [f32; 3];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: 60.0,
            near: 0.1,
            far: 100.0,
            position: [0.0, 2.0, 10.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

/// Ambient fill plus one directional light
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    #[serde(deserialize_with = "de_hex")]
    pub ambient_color: Rgb,
    pub ambient_intensity: f32,
    #[serde(deserialize_with = "de_hex")]
    pub sun_color: Rgb,
    pub sun_intensity: f32,
    /// Light position; it shines from here towards the origin
    pub sun_position: [f32; 3],
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            ambient_color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.3,
            sun_color: [1.0, 1.0, 1.0],
            sun_intensity: 3.0,
            sun_position: [-1.0, 2.0, 4.0],
        }
    }
}

/// Linear distance fog
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FogSettings {
    pub enabled: bool,
    #[serde(deserialize_with = "de_hex")]
    pub color: Rgb,
    pub near: f32,
    pub far: f32,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            color: [0.8, 0.8, 0.8],
            near: 1.0,
            far: 20.0,
        }
    }
}

impl FogSettings {
    pub fn range(&self) -> MinMax {
        MinMax { min: self.near, max: self.far }
    }

    pub fn set_range(&mut self, range: MinMax) {
        self.near = range.min;
        self.far = range.max;
    }
}

/// A min/max pair edited through two separate controls. Moving one bound
/// past the other drags the other along, so `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    pub min: f32,
    pub max: f32,
}

impl MinMax {
    pub fn with_min(self, min: f32) -> Self {
        Self { min, max: self.max.max(min) }
    }

    pub fn with_max(self, max: f32) -> Self {
        Self { min: self.min.min(max), max }
    }
}

/// Parse `#rrggbb`, `rrggbb` or `0xrrggbb`
pub fn parse_hex_color(text: &str) -> Option<Rgb> {
    let digits = text
        .trim()
        .trim_start_matches('#')
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    if digits.len() != 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().map(color_from_hex)
}

pub fn color_from_hex(hex: u32) -> Rgb {
    [
        ((hex >> 16) & 0xFF) as f32 / 255.0,
        ((hex >> 8) & 0xFF) as f32 / 255.0,
        (hex & 0xFF) as f32 / 255.0,
    ]
}

pub fn color_to_hex(color: Rgb) -> u32 {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(color[0]) << 16) | (channel(color[1]) << 8) | channel(color[2])
}

/// Accepts either a hex string or an `[r, g, b]` array
pub(crate) fn de_hex<'de, D>(deserializer: D) -> Result<Rgb, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ColorRepr {
        Hex(String),
        Rgb(Rgb),
    }

    match ColorRepr::deserialize(deserializer)? {
        ColorRepr::Hex(text) => parse_hex_color(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex color `{text}`"))),
        ColorRepr::Rgb(rgb) => Ok(rgb),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_keeps_order() {
        let range = MinMax { min: 1.0, max: 10.0 };

        let raised = range.with_min(15.0);
        assert_eq!(raised, MinMax { min: 15.0, max: 15.0 });

        let lowered = range.with_max(0.5);
        assert_eq!(lowered, MinMax { min: 0.5, max: 0.5 });

        let plain = range.with_min(2.0).with_max(8.0);
        assert_eq!(plain, MinMax { min: 2.0, max: 8.0 });
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(parse_hex_color("#ff0000"), Some([1.0, 0.0, 0.0]));
        assert_eq!(parse_hex_color("0x00FF00"), Some([0.0, 1.0, 0.0]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("zzzzzz"), None);
        assert_eq!(color_to_hex(color_from_hex(0x44aa88)), 0x44aa88);
    }

    #[test]
    fn test_fog_deserialize_hex() {
        let fog: FogSettings = serde_json::from_str(r##"{ "enabled": true, "color": "#336699", "far": 50 }"##).unwrap();
        assert!(fog.enabled);
        assert_eq!(color_to_hex(fog.color), 0x336699);
        assert_eq!(fog.near, 1.0);
        assert_eq!(fog.far, 50.0);
    }
}
