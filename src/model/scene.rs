use glam::{EulerRot, Mat4, Quat, Vec3};

use super::animation::AnimatedGroup;
use super::raycast::{intersect_triangle, Aabb, Ray};
use super::settings::{FogSettings, LightSettings, Rgb};
use crate::utils::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians, applied in XYZ order
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self { position, ..Default::default() }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color: Rgb,
    pub emissive: Rgb,
    pub texture: Option<TextureId>,
    pub uv_repeat: [f32; 2],
    pub double_sided: bool,
    /// Ignore scene lighting and show color/texture as-is
    pub unlit: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            emissive: [0.0, 0.0, 0.0],
            texture: None,
            uv_repeat: [1.0, 1.0],
            double_sided: false,
            unlit: false,
        }
    }
}

impl Material {
    pub fn colored(color: Rgb) -> Self {
        Self { color, ..Default::default() }
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub material: Material,
    /// Group nodes carry no mesh and only position their children
    pub mesh: Option<MeshId>,
    pub parent: Option<NodeId>,
}

impl SceneNode {
    pub fn mesh(name: impl Into<String>, mesh: MeshId, material: Material, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            material,
            mesh: Some(mesh),
            parent: None,
        }
    }

    pub fn group(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            material: Material::default(),
            mesh: None,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// A ray hit on a scene node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub node: NodeId,
    pub distance: f32,
    pub point: Vec3,
}

struct MeshEntry {
    mesh: Mesh,
    bounds: Option<Aabb>,
}

/// Scene graph: an append-only arena of nodes plus the meshes and
/// textures they reference. Nodes live for the whole session.
pub struct Scene {
    nodes: Vec<SceneNode>,
    meshes: Vec<MeshEntry>,
    textures: Vec<TextureData>,
    pub groups: Vec<AnimatedGroup>,
    pub lights: LightSettings,
    pub fog: FogSettings,
    pub background: Rgb,
    /// Equirectangular sky drawn behind everything once loaded
    pub environment: Option<TextureId>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            meshes: Vec::new(),
            textures: Vec::new(),
            groups: Vec::new(),
            lights: LightSettings::default(),
            fog: FogSettings::default(),
            background: [0.0, 0.0, 0.0],
            environment: None,
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let bounds = mesh.bounds();
        self.meshes.push(MeshEntry { mesh, bounds });
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_texture(&mut self, texture: TextureData) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    /// Append a node. A parent must already exist, which keeps the
    /// hierarchy acyclic.
    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        debug_assert!(node.parent.map_or(true, |p| p.0 < self.nodes.len()));
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn mesh_count(&self) -> usize { self.meshes.len() }
    pub fn texture_count(&self) -> usize { self.textures.len() }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0).map(|e| &e.mesh)
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureData> {
        self.textures.get(id.0)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    /// Local transform composed with every ancestor
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = self.node(id);
        while let Some(node) = current {
            matrix = node.transform.matrix() * matrix;
            current = node.parent.and_then(|p| self.node(p));
        }
        matrix
    }

    /// All mesh nodes hit by the ray, nearest first. Equal distances keep
    /// node insertion order.
    pub fn raycast(&self, ray: &Ray) -> Vec<Intersection> {
        let mut hits = Vec::new();

        for (id, node) in self.nodes() {
            let Some(entry) = node.mesh.and_then(|m| self.meshes.get(m.0)) else {
                continue;
            };
            let Some(bounds) = entry.bounds else {
                continue;
            };

            let world = self.world_matrix(id);
            if bounds.transform(&world).intersect_ray(ray).is_none() {
                continue;
            }

            // narrow phase in mesh space; the direction is left unnormalized
            // so `t` stays a world space distance
            let inv = world.inverse();
            let origin = inv.transform_point3(ray.origin);
            let dir = inv.transform_vector3(ray.direction);

            let nearest = entry
                .mesh
                .triangles()
                .filter_map(|tri| intersect_triangle(origin, dir, tri))
                .min_by(|a, b| a.total_cmp(b));

            if let Some(distance) = nearest {
                hits.push(Intersection { node: id, distance, point: ray.point_at(distance) });
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::create_box_mesh;

    fn two_cubes() -> (Scene, NodeId, NodeId) {
        let mut scene = Scene::new();
        let cube = scene.add_mesh(create_box_mesh(1.0, 1.0, 1.0));
        let near = scene.add_node(SceneNode::mesh("near", cube, Material::default(), Transform::at(Vec3::new(0.0, 0.0, 2.0))));
        let far = scene.add_node(SceneNode::mesh("far", cube, Material::default(), Transform::at(Vec3::new(0.0, 0.0, -2.0))));
        (scene, near, far)
    }

    #[test]
    fn test_raycast_sorted_nearest_first() {
        let (scene, near, far) = two_cubes();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);

        let hits = scene.raycast(&ray);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, near);
        assert_eq!(hits[1].node, far);
        assert!((hits[0].distance - 7.5).abs() < 1e-4);
        assert!((hits[0].point.z - 2.5).abs() < 1e-4);
    }

    #[test]
    fn test_raycast_misses_empty_space() {
        let (scene, _, _) = two_cubes();
        let ray = Ray::new(Vec3::new(5.0, 0.0, 10.0), Vec3::NEG_Z);
        assert!(scene.raycast(&ray).is_empty());
    }

    #[test]
    fn test_raycast_follows_parent_transform() {
        let mut scene = Scene::new();
        let cube = scene.add_mesh(create_box_mesh(1.0, 1.0, 1.0));
        let group = scene.add_node(SceneNode::group("model", Transform::at(Vec3::new(3.0, 0.0, 0.0))));
        let child = scene.add_node(
            SceneNode::mesh("part", cube, Material::default(), Transform::default()).with_parent(group),
        );

        let hits = scene.raycast(&Ray::new(Vec3::new(3.0, 0.0, 10.0), Vec3::NEG_Z));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, child);

        assert!(scene.raycast(&Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z)).is_empty());
    }

    #[test]
    fn test_scaled_node_distance_in_world_units() {
        let mut scene = Scene::new();
        let cube = scene.add_mesh(create_box_mesh(1.0, 1.0, 1.0));
        let mut transform = Transform::default();
        transform.scale = Vec3::splat(4.0);
        scene.add_node(SceneNode::mesh("big", cube, Material::default(), transform));

        let hits = scene.raycast(&Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z));
        assert!((hits[0].distance - 8.0).abs() < 1e-4);
    }
}
