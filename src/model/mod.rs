// MODEL: Scene data, camera, presets and asset loading
pub mod animation;
pub mod assets;
pub mod builder;
pub mod camera;
pub mod preset;
pub mod raycast;
pub mod scene;
pub mod settings;

pub use animation::AnimatedGroup;
pub use assets::{AssetError, AssetLoader, AssetRequest};
pub use camera::Camera;
pub use preset::ScenePreset;
pub use raycast::{Aabb, Ray};
pub use scene::{Material, MeshId, NodeId, Scene, SceneNode, TextureData, TextureId, Transform};
pub use settings::{CameraSettings, FogSettings, LightSettings, MinMax};
