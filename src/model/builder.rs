use glam::Vec3;

use super::animation::AnimatedGroup;
use super::assets::{AssetPayload, AssetRequest, LoadOutcome, ModelRequest};
use super::preset::{RowPreset, ScenePreset};
use super::scene::{Material, MeshId, NodeId, Scene, SceneNode, Transform};
use super::settings::parse_hex_color;
use crate::utils::{create_box_mesh, create_gem_mesh, create_plane_mesh, create_torus_mesh};

/// Build the static part of a scene from a preset. Models and textures are
/// returned as requests; they join the scene when their load completes.
pub fn build_scene(preset: &ScenePreset) -> (Scene, Vec<AssetRequest>) {
    let mut scene = Scene::new();
    scene.lights = preset.lights.clone();
    scene.fog = preset.fog.clone();
    scene.background = preset.background;

    let mut requests = Vec::new();
    if let Some(environment) = &preset.environment {
        requests.push(AssetRequest::Environment { path: preset.asset_path(environment) });
    }

    if let Some(row) = &preset.cubes {
        let mesh = scene.add_mesh(create_box_mesh(row.size, row.size, row.size));
        add_row(&mut scene, preset, row, "cube", mesh, &mut requests);
    }
    if let Some(row) = &preset.rings {
        let mesh = scene.add_mesh(create_torus_mesh(row.size * 0.5, row.size * 0.12, 12, 48));
        add_row(&mut scene, preset, row, "ring", mesh, &mut requests);
    }
    if let Some(row) = &preset.gems {
        let mesh = scene.add_mesh(create_gem_mesh(row.size * 0.45, row.size, 6));
        add_row(&mut scene, preset, row, "gem", mesh, &mut requests);
    }

    if let Some(ground) = &preset.ground {
        let mesh = scene.add_mesh(create_plane_mesh(ground.size, ground.size, ground.repeat));
        let mut material = Material::colored(ground.color);
        material.double_sided = true;
        let id = scene.add_node(SceneNode::mesh(
            "ground",
            mesh,
            material,
            Transform::at(Vec3::new(0.0, ground.y, 0.0)),
        ));
        if let Some(texture) = &ground.texture {
            requests.push(AssetRequest::Texture { path: preset.asset_path(texture), target: id });
        }
    }

    for model in &preset.models {
        let mut transform = Transform::at(Vec3::from(model.position));
        transform.scale = Vec3::splat(model.scale);
        requests.push(AssetRequest::Model(ModelRequest {
            obj_path: preset.asset_path(&model.obj),
            mtl_path: model.mtl.as_deref().map(|m| preset.asset_path(m)),
            transform,
            double_sided: model.double_sided.clone(),
        }));
    }

    tracing::info!(
        nodes = scene.node_count(),
        groups = scene.groups.len(),
        pending = requests.len(),
        "scene built"
    );
    (scene, requests)
}

fn add_row(
    scene: &mut Scene,
    preset: &ScenePreset,
    row: &RowPreset,
    kind: &str,
    mesh: MeshId,
    requests: &mut Vec<AssetRequest>,
) {
    let colors: Vec<_> = row.colors.iter().filter_map(|c| parse_hex_color(c)).collect();
    let mut group = AnimatedGroup::new(format!("{kind}s"), row.base_speed, row.speed_increment);

    for index in 0..row.count {
        let color = if colors.is_empty() { [1.0, 1.0, 1.0] } else { colors[index % colors.len()] };
        let position = Vec3::new(row.x_at(index), row.y, row.z);
        let material = Material { color, unlit: row.unlit, ..Default::default() };
        let id = scene.add_node(SceneNode::mesh(format!("{kind}{index}"), mesh, material, Transform::at(position)));
        group.members.push(id);

        if let Some(texture) = row.textures.get(index) {
            requests.push(AssetRequest::Texture { path: preset.asset_path(texture), target: id });
        }
    }
    scene.groups.push(group);
}

/// Insert a completed load into the scene and return the node it touched.
/// Failures are logged and the object simply stays absent.
pub fn apply_outcome(scene: &mut Scene, outcome: LoadOutcome) -> Option<NodeId> {
    let LoadOutcome { request, result } = outcome;
    let payload = match result {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(path = request.path(), "asset load failed: {e}");
            return None;
        }
    };

    match (request, payload) {
        (AssetRequest::Texture { target, path }, AssetPayload::Texture(data)) => {
            let texture = scene.add_texture(data);
            let Some(node) = scene.node_mut(target) else {
                tracing::warn!(%path, ?target, "texture target does not exist");
                return None;
            };
            node.material.texture = Some(texture);
            // the texture carries the color now, as with a basic textured material
            node.material.color = [1.0, 1.0, 1.0];
            tracing::debug!(%path, ?target, "texture attached");
            Some(target)
        }
        (AssetRequest::Environment { path }, AssetPayload::Texture(data)) => {
            let (width, height) = (data.width, data.height);
            scene.environment = Some(scene.add_texture(data));
            tracing::info!(%path, width, height, "environment attached");
            None
        }
        (AssetRequest::Model(model), AssetPayload::Model(parts)) => {
            let name = model.obj_path.rsplit('/').next().unwrap_or(&model.obj_path).to_string();
            let root = scene.add_node(SceneNode::group(name, model.transform));

            let part_count = parts.len();
            for part in parts {
                if part.mesh.is_empty() {
                    continue;
                }
                let texture = part.texture.map(|t| scene.add_texture(t));
                let mesh = scene.add_mesh(part.mesh);
                let material = Material {
                    color: part.color,
                    texture,
                    double_sided: part.double_sided,
                    ..Default::default()
                };
                scene.add_node(SceneNode::mesh(part.name, mesh, material, Transform::default()).with_parent(root));
            }
            tracing::info!(path = %model.obj_path, parts = part_count, "model added to scene");
            Some(root)
        }
        (request, _) => {
            tracing::warn!(path = request.path(), "asset payload does not match its request");
            None
        }
    }
}
