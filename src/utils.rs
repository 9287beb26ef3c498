use std::f32::consts::TAU;

use bytemuck::NoUninit;
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::model::Aabb;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Bounding box of all vertex positions, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Aabb> {
        if self.vertices.is_empty() {
            return None;
        }
        Some(Aabb::from_points(self.vertices.iter().map(|v| Vec3::from(v.pos))))
    }

    /// Iterate the triangles as vertex position triples
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let a = self.vertices.get(tri[0] as usize)?;
            let b = self.vertices.get(tri[1] as usize)?;
            let c = self.vertices.get(tri[2] as usize)?;
            Some([Vec3::from(a.pos), Vec3::from(b.pos), Vec3::from(c.pos)])
        })
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {

        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }

    // `u` and `v` are half-extent vectors with u x v pointing along `normal`
    fn push_quad(&mut self, center: Vec3, normal: Vec3, u: Vec3, v: Vec3, uv_scale: [f32; 2]) {
        let base = self.vertices.len() as u32;
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        for (su, sv) in corners {
            let pos = center + u * su + v * sv;
            self.vertices.push(Vertex {
                pos: pos.to_array(),
                normal: normal.to_array(),
                color: [1.0, 1.0, 1.0, 1.0],
                uv: [
                    (su + 1.0) * 0.5 * uv_scale[0],
                    (1.0 - sv) * 0.5 * uv_scale[1],
                ],
            });
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    // flat-shaded triangle, normal taken from the winding
    fn push_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        let base = self.vertices.len() as u32;
        let normal = (b - a).cross(c - a).normalize_or_zero();
        for (pos, uv) in [(a, [0.0, 1.0]), (b, [1.0, 1.0]), (c, [0.5, 0.0])] {
            self.vertices.push(Vertex {
                pos: pos.to_array(),
                normal: normal.to_array(),
                color: [1.0, 1.0, 1.0, 1.0],
                uv,
            });
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
}

/// Axis-aligned box centered at the origin, one quad per face
pub fn create_box_mesh(width: f32, height: f32, depth: f32) -> Mesh {
    let half = Vec3::new(width, height, depth) * 0.5;
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut mesh = Mesh::empty();
    for (n, u, v) in faces {
        mesh.push_quad(n * half, n, u * half, v * half, [1.0, 1.0]);
    }
    mesh
}

/// Torus lying in the XY plane (a ring facing the camera)
pub fn create_torus_mesh(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Mesh {
    let radial_segments = radial_segments.max(3);
    let tubular_segments = tubular_segments.max(3);
    let mut mesh = Mesh::empty();

    for j in 0..=radial_segments {
        for i in 0..=tubular_segments {
            let u = i as f32 / tubular_segments as f32 * TAU;
            let v = j as f32 / radial_segments as f32 * TAU;

            let pos = Vec3::new(
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            );
            let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
            let normal = (pos - center).normalize_or_zero();

            mesh.vertices.push(Vertex {
                pos: pos.to_array(),
                normal: normal.to_array(),
                color: [1.0, 1.0, 1.0, 1.0],
                uv: [i as f32 / tubular_segments as f32, j as f32 / radial_segments as f32],
            });
        }
    }

    let row = tubular_segments + 1;
    for j in 1..=radial_segments {
        for i in 1..=tubular_segments {
            let a = row * j + i - 1;
            let b = row * (j - 1) + i - 1;
            let c = row * (j - 1) + i;
            let d = row * j + i;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    mesh
}

/// Faceted gem: a bipyramid over a regular polygon of `sides` corners
pub fn create_gem_mesh(radius: f32, height: f32, sides: u32) -> Mesh {
    let sides = sides.max(3);
    let top = Vec3::new(0.0, height * 0.5, 0.0);
    let bottom = Vec3::new(0.0, -height * 0.5, 0.0);
    let ring: Vec<Vec3> = (0..sides)
        .map(|k| {
            let angle = k as f32 / sides as f32 * TAU;
            Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
        })
        .collect();

    let mut mesh = Mesh::empty();
    for k in 0..ring.len() {
        let a = ring[k];
        let b = ring[(k + 1) % ring.len()];
        mesh.push_triangle(a, top, b);
        mesh.push_triangle(a, b, bottom);
    }
    mesh
}

/// Horizontal plane facing +Y; `uv_repeat` tiles the texture across it
pub fn create_plane_mesh(width: f32, depth: f32, uv_repeat: f32) -> Mesh {
    let mut mesh = Mesh::empty();
    mesh.push_quad(
        Vec3::ZERO,
        Vec3::Y,
        Vec3::X * (width * 0.5),
        Vec3::NEG_Z * (depth * 0.5),
        [uv_repeat, uv_repeat],
    );
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_outward(mesh: &Mesh) {
        // every face normal points away from the origin for these convex shapes
        for [a, b, c] in mesh.triangles() {
            let n = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(n.dot(centroid) > 0.0, "inward facing triangle at {centroid:?}");
        }
    }

    #[test]
    fn test_box_layout() {
        let mesh = create_box_mesh(1.0, 2.0, 3.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);

        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(-0.5, -1.0, -1.5));
        assert_eq!(bounds.max, Vec3::new(0.5, 1.0, 1.5));
        assert_outward(&mesh);
    }

    #[test]
    fn test_gem_is_closed_and_outward() {
        let mesh = create_gem_mesh(0.5, 1.2, 6);
        assert_eq!(mesh.triangles().count(), 12);
        assert_outward(&mesh);
    }

    #[test]
    fn test_torus_indices_in_range() {
        let mesh = create_torus_mesh(1.0, 0.2, 8, 16);
        assert_eq!(mesh.vertices.len(), 9 * 17);
        assert_eq!(mesh.indices.len(), 8 * 16 * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_plane_faces_up() {
        let mesh = create_plane_mesh(10.0, 10.0, 4.0);
        let [a, b, c] = mesh.triangles().next().unwrap();
        assert!((b - a).cross(c - a).y > 0.0);
        assert!(mesh.vertices.iter().any(|v| v.uv[0] == 4.0));
    }
}
