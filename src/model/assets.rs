//! Asynchronous asset loading.
//!
//! Every request runs as its own task (a `spawn_local` future over `fetch`
//! on the web, a short-lived thread on native). Finished loads are sent
//! over a channel and picked up by the frame loop with [`AssetLoader::drain`],
//! so scene insertion always happens on the render thread. There is no
//! ordering between requests, no cancellation and no timeout.

use std::future::Future;
use std::io::Cursor;
use std::sync::mpsc::{channel, Receiver, Sender};

use glam::Vec3;
use thiserror::Error;

use super::scene::{NodeId, TextureData, Transform};
use super::settings::Rgb;
use crate::utils::{Mesh, Vertex};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },
    #[error("invalid obj file: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub obj_path: String,
    pub mtl_path: Option<String>,
    pub transform: Transform,
    /// Material names forced double-sided; `*` matches every material
    pub double_sided: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum AssetRequest {
    Model(ModelRequest),
    /// Image to attach to the material of an existing node
    Texture { path: String, target: NodeId },
    /// Equirectangular image used as the scene background
    Environment { path: String },
}

impl AssetRequest {
    pub fn path(&self) -> &str {
        match self {
            AssetRequest::Model(m) => &m.obj_path,
            AssetRequest::Texture { path, .. } | AssetRequest::Environment { path } => path,
        }
    }
}

/// One OBJ object with its resolved material
#[derive(Debug, Clone)]
pub struct ModelPart {
    pub name: String,
    pub mesh: Mesh,
    pub color: Rgb,
    pub double_sided: bool,
    pub texture: Option<TextureData>,
}

#[derive(Debug, Clone)]
pub enum AssetPayload {
    Model(Vec<ModelPart>),
    Texture(TextureData),
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub request: AssetRequest,
    pub result: Result<AssetPayload, AssetError>,
}

pub struct AssetLoader {
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    in_flight: usize,
}

impl AssetLoader {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx, in_flight: 0 }
    }

    /// Start loading in the background. Never blocks.
    pub fn request(&mut self, request: AssetRequest) {
        tracing::debug!(path = request.path(), "asset requested");
        self.in_flight += 1;
        let tx = self.tx.clone();
        spawn_task(async move {
            let result = load(&request).await;
            // the receiver only disappears together with the scene
            let _ = tx.send(LoadOutcome { request, result });
        });
    }

    /// Completed loads since the last call, in completion order
    pub fn drain(&mut self) -> Vec<LoadOutcome> {
        let done: Vec<LoadOutcome> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(done.len());
        done
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
fn spawn_task(task: impl Future<Output = ()> + 'static) {
    wasm_bindgen_futures::spawn_local(task);
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_task(task: impl Future<Output = ()> + Send + 'static) {
    std::thread::spawn(move || pollster::block_on(task));
}

async fn load(request: &AssetRequest) -> Result<AssetPayload, AssetError> {
    match request {
        AssetRequest::Texture { path, .. } | AssetRequest::Environment { path } => {
            let bytes = read_bytes(path).await?;
            Ok(AssetPayload::Texture(decode_texture(&bytes)?))
        }
        AssetRequest::Model(model) => {
            let obj = read_bytes(&model.obj_path).await?;
            let mtl = match &model.mtl_path {
                Some(path) => match read_bytes(path).await {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        // geometry is still worth showing untextured
                        tracing::warn!("{e}");
                        None
                    }
                },
                None => None,
            };

            let (mut parts, texture_names) = parse_obj(&obj, mtl.as_deref(), &model.double_sided)?;

            for (part, texture) in parts.iter_mut().zip(texture_names) {
                let Some(name) = texture else { continue };
                let path = sibling_path(&model.obj_path, &name);
                match read_bytes(&path).await.and_then(|b| decode_texture(&b)) {
                    Ok(tex) => part.texture = Some(tex),
                    Err(e) => tracing::warn!(part = %part.name, "{e}"),
                }
            }
            Ok(AssetPayload::Model(parts))
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn read_bytes(path: &str) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Io { path: path.to_string(), source })
}

#[cfg(target_arch = "wasm32")]
async fn read_bytes(path: &str) -> Result<Vec<u8>, AssetError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let fetch_err = |reason: String| AssetError::Fetch { path: path.to_string(), reason };

    let window = web_sys::window().ok_or_else(|| fetch_err("no global `window`".into()))?;
    let response = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(|e| fetch_err(format!("{e:?}")))?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|_| fetch_err("not a Response".into()))?;
    if !response.ok() {
        return Err(fetch_err(format!("HTTP {}", response.status())));
    }

    let buffer = response.array_buffer().map_err(|e| fetch_err(format!("{e:?}")))?;
    let buffer = JsFuture::from(buffer).await.map_err(|e| fetch_err(format!("{e:?}")))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

pub fn decode_texture(bytes: &[u8]) -> Result<TextureData, AssetError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    Ok(TextureData {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// Parse OBJ geometry (and optional MTL) into one part per OBJ object.
/// Also returns each part's diffuse texture name, still to be loaded.
pub fn parse_obj(
    obj: &[u8],
    mtl: Option<&[u8]>,
    double_sided: &[String],
) -> Result<(Vec<ModelPart>, Vec<Option<String>>), AssetError> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };

    let (models, materials) = tobj::load_obj_buf(&mut Cursor::new(obj), &options, |_| match mtl {
        Some(bytes) => tobj::load_mtl_buf(&mut Cursor::new(bytes)),
        None => Err(tobj::LoadError::OpenFileFailed),
    })?;

    let materials = materials.unwrap_or_else(|e| {
        if mtl.is_some() {
            tracing::warn!("invalid mtl file: {e}");
        }
        Vec::new()
    });

    let mut parts = Vec::with_capacity(models.len());
    let mut textures = Vec::with_capacity(models.len());
    for model in models {
        let material = model.mesh.material_id.and_then(|id| materials.get(id));
        let material_name = material.map(|m| m.name.as_str()).unwrap_or_default();

        let is_double_sided = double_sided
            .iter()
            .any(|name| name == "*" || (!material_name.is_empty() && name == material_name));

        parts.push(ModelPart {
            name: model.name.clone(),
            mesh: mesh_from_obj(&model.mesh),
            color: material.and_then(|m| m.diffuse).unwrap_or([1.0, 1.0, 1.0]),
            double_sided: is_double_sided,
            texture: None,
        });
        textures.push(material.and_then(|m| m.diffuse_texture.clone()));
    }

    Ok((parts, textures))
}

fn mesh_from_obj(mesh: &tobj::Mesh) -> Mesh {
    let vertex_count = mesh.positions.len() / 3;
    let normals = if mesh.normals.len() == mesh.positions.len() {
        mesh.normals.clone()
    } else {
        compute_vertex_normals(&mesh.positions, &mesh.indices)
    };

    let vertices = (0..vertex_count)
        .map(|i| {
            let uv = if mesh.texcoords.len() >= (i + 1) * 2 {
                // OBJ puts v = 0 at the bottom of the image
                [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            };
            Vertex {
                pos: [mesh.positions[i * 3], mesh.positions[i * 3 + 1], mesh.positions[i * 3 + 2]],
                normal: [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]],
                color: [1.0, 1.0, 1.0, 1.0],
                uv,
            }
        })
        .collect();

    Mesh { vertices, indices: mesh.indices.clone() }
}

/// Area-weighted smooth normals for meshes that ship without any
fn compute_vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let pos = |i: u32| {
        let i = i as usize * 3;
        Vec3::new(positions[i], positions[i + 1], positions[i + 2])
    };

    let mut acc = vec![Vec3::ZERO; positions.len() / 3];
    for tri in indices.chunks_exact(3) {
        let n = (pos(tri[1]) - pos(tri[0])).cross(pos(tri[2]) - pos(tri[0]));
        for &i in tri {
            acc[i as usize] += n;
        }
    }
    acc.into_iter().flat_map(|n| n.normalize_or_zero().to_array()).collect()
}

/// Resolve `name` next to the file at `path`
fn sibling_path(path: &str, name: &str) -> String {
    match path.rfind('/') {
        Some(idx) => format!("{}/{}", &path[..idx], name),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    const PANEL_OBJ: &str = "mtllib panel.mtl
o Panel
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
usemtl Red
f 1 2 3 4
o Back
v -1 -1 -1
v 1 -1 -1
v 0 1 -1
usemtl Blue
f 5 6 7
";

    const PANEL_MTL: &str = "newmtl Red
Kd 1.0 0.0 0.0
map_Kd red.png

newmtl Blue
Kd 0.0 0.0 1.0
";

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_parse_obj_with_materials() {
        let names = vec!["Blue".to_string()];
        let (parts, textures) = parse_obj(PANEL_OBJ.as_bytes(), Some(PANEL_MTL.as_bytes()), &names).unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "Panel");
        assert_eq!(parts[0].mesh.indices.len(), 6);
        assert_eq!(parts[0].color, [1.0, 0.0, 0.0]);
        assert!(!parts[0].double_sided);
        assert_eq!(textures[0].as_deref(), Some("red.png"));

        assert_eq!(parts[1].color, [0.0, 0.0, 1.0]);
        assert!(parts[1].double_sided);
        assert_eq!(textures[1], None);

        // computed normals face +z for the front panel
        assert!(parts[0].mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_parse_obj_without_mtl() {
        let all = vec!["*".to_string()];
        let (parts, _) = parse_obj(PANEL_OBJ.as_bytes(), None, &all).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.color == [1.0, 1.0, 1.0] && p.double_sided));
    }

    #[test]
    fn test_decode_texture() {
        let tex = decode_texture(&png_bytes()).unwrap();
        assert_eq!((tex.width, tex.height), (2, 2));
        assert_eq!(tex.rgba.len(), 16);
        assert_eq!(&tex.rgba[..4], &[255, 0, 0, 255]);

        assert!(matches!(decode_texture(b"not an image"), Err(AssetError::Image(_))));
    }

    #[test]
    fn test_sibling_path() {
        assert_eq!(sibling_path("assets/models/a.obj", "b.png"), "assets/models/b.png");
        assert_eq!(sibling_path("a.obj", "b.png"), "b.png");
    }

    fn wait_for(loader: &mut AssetLoader, count: usize) -> Vec<LoadOutcome> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut done = Vec::new();
        while done.len() < count && Instant::now() < deadline {
            done.extend(loader.drain());
            std::thread::sleep(Duration::from_millis(5));
        }
        done
    }

    #[test]
    fn test_loader_delivers_model_and_texture() {
        let dir = std::env::temp_dir().join(format!("showcase-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("panel.obj"), PANEL_OBJ).unwrap();
        std::fs::write(dir.join("panel.mtl"), PANEL_MTL).unwrap();
        std::fs::write(dir.join("red.png"), png_bytes()).unwrap();
        let root = dir.to_string_lossy().replace('\\', "/");

        let mut loader = AssetLoader::new();
        loader.request(AssetRequest::Model(ModelRequest {
            obj_path: format!("{root}/panel.obj"),
            mtl_path: Some(format!("{root}/panel.mtl")),
            transform: Transform::default(),
            double_sided: Vec::new(),
        }));
        loader.request(AssetRequest::Texture { path: format!("{root}/red.png"), target: NodeId(0) });
        assert_eq!(loader.in_flight(), 2);

        let done = wait_for(&mut loader, 2);
        assert_eq!(done.len(), 2);
        assert_eq!(loader.in_flight(), 0);

        for outcome in done {
            match (outcome.request, outcome.result.unwrap()) {
                (AssetRequest::Model(_), AssetPayload::Model(parts)) => {
                    assert_eq!(parts.len(), 2);
                    assert!(parts[0].texture.is_some());
                }
                (AssetRequest::Texture { target, .. }, AssetPayload::Texture(tex)) => {
                    assert_eq!(target, NodeId(0));
                    assert_eq!(tex.width, 2);
                }
                other => panic!("mismatched outcome {other:?}"),
            }
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_loader_decodes_environment() {
        let dir = std::env::temp_dir().join(format!("showcase-env-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("sky.png"), png_bytes()).unwrap();
        let path = dir.join("sky.png").to_string_lossy().replace('\\', "/");

        let mut loader = AssetLoader::new();
        loader.request(AssetRequest::Environment { path: path.clone() });

        let done = wait_for(&mut loader, 1);
        assert_eq!(done.len(), 1);
        assert!(matches!(&done[0].request, AssetRequest::Environment { path: p } if *p == path));
        match &done[0].result {
            Ok(AssetPayload::Texture(tex)) => assert_eq!((tex.width, tex.height), (2, 2)),
            other => panic!("unexpected outcome {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_loader_reports_missing_file() {
        let mut loader = AssetLoader::new();
        loader.request(AssetRequest::Texture { path: "/definitely/missing.png".into(), target: NodeId(3) });

        let done = wait_for(&mut loader, 1);
        assert_eq!(done.len(), 1);
        assert!(matches!(done[0].result, Err(AssetError::Io { .. })));
    }
}
