//! glTF/GLB decoding into a flat list of surfaces
//!
//! Node transforms are baked into the vertices, so the resulting
//! [`Object`] only carries the uniform model scale applied by the scene.

use std::collections::HashMap;
use std::path::Path;

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4};
use log::{debug, warn};

use super::error::AssetError;
use crate::gfx::resources::material::Material;
use crate::gfx::scene::object::{Mesh, Object, Surface};
use crate::material::Color;

pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Decodes the model at `path`
///
/// `draco_decoder_path` only shows up in the log when a compressed model is
/// rejected.
pub fn load_model(path: &Path, draco_decoder_path: &str) -> Result<Object, AssetError> {
    let bytes = std::fs::read(path)?;
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice_without_validation(&bytes)?;

    if document.extensions_required().any(|ext| ext == DRACO_EXTENSION) {
        warn!(
            "{} needs a Draco decoder (configured at {}), which is not available",
            path.display(),
            draco_decoder_path
        );
        return Err(AssetError::UnsupportedExtension(DRACO_EXTENSION.to_string()));
    }

    let document = gltf::Document::from_json(document.into_json())?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)?;

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    let object = flatten_document(&name, &document, &buffers)?;
    debug!(
        "Flattened {} into {} surface(s), {} triangle(s)",
        path.display(),
        object.surfaces.len(),
        object.triangle_count()
    );
    Ok(object)
}

fn flatten_document(
    name: &str,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Object, AssetError> {
    let mut surfaces = Vec::new();
    let mut names = SurfaceNames::default();
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    let roots: Vec<gltf::Node> = match scene {
        Some(scene) => scene.nodes().collect(),
        None => document.nodes().collect(),
    };

    for node in roots {
        visit_node(&node, Matrix4::identity(), buffers, &mut names, &mut surfaces);
    }

    if surfaces.is_empty() {
        return Err(AssetError::EmptyModel);
    }
    Ok(Object::new(name, surfaces))
}

/// Hands out surface names, suffixing repeats with `_1`, `_2`, ...
#[derive(Default)]
struct SurfaceNames {
    used: HashMap<String, usize>,
}

impl SurfaceNames {
    fn unique(&mut self, name: &str) -> String {
        match self.used.get_mut(name) {
            Some(count) => {
                *count += 1;
                format!("{}_{}", name, count)
            }
            None => {
                self.used.insert(name.to_string(), 0);
                name.to_string()
            }
        }
    }
}

/// A single-primitive mesh takes its node's name. Each primitive of a
/// multi-primitive mesh is named after the mesh instead.
fn visit_node(
    node: &gltf::Node,
    parent: Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    names: &mut SurfaceNames,
    surfaces: &mut Vec<Surface>,
) {
    let world = parent * Matrix4::from(node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        let single = mesh.primitives().len() == 1;

        for primitive in mesh.primitives() {
            let surface_name = match node.name() {
                Some(node_name) if single => names.unique(node_name),
                _ => names.unique(&mesh_name),
            };
            match build_surface(&surface_name, &primitive, world, buffers) {
                Some(surface) => surfaces.push(surface),
                None => debug!("Skipping primitive {} without triangles", surface_name),
            }
        }
    }

    for child in node.children() {
        visit_node(&child, world, buffers, names, surfaces);
    }
}

fn build_surface(
    name: &str,
    primitive: &gltf::Primitive,
    world: Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
) -> Option<Surface> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        return None;
    }

    let reader =
        primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    if positions.is_empty() {
        return None;
    }
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|normals| normals.collect())
        .unwrap_or_default();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let normal_matrix = normal_matrix(world);
    let positions: Vec<[f32; 3]> = positions
        .into_iter()
        .map(|p| (world * Vector4::new(p[0], p[1], p[2], 1.0)).truncate().into())
        .collect();
    let normals: Vec<[f32; 3]> = normals
        .into_iter()
        .map(|n| {
            let n = normal_matrix * Vector3::from(n);
            if n.magnitude2() > 0.0 {
                n.normalize().into()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect();

    let mesh = Mesh::from_arrays(positions, normals, indices);
    Some(Surface::new(name, mesh, material_from_gltf(name, &primitive.material())))
}

fn normal_matrix(world: Matrix4<f32>) -> Matrix3<f32> {
    let linear = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    linear.invert().map(|m| m.transpose()).unwrap_or(linear)
}

fn material_from_gltf(surface_name: &str, material: &gltf::Material) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    let name = material.name().unwrap_or(surface_name);
    Material::new(
        name,
        Color::from_linear([r, g, b]),
        pbr.metallic_factor(),
        pbr.roughness_factor(),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    const TRIANGLE_BUFFER: &str =
        "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAAAAAAIC/AAABAAIAAAA=";

    /// Two instances of one triangle: `Object_6` (blue, offset by +1 in Y)
    /// nested under a scaled root, and `Frame` at the origin
    pub(crate) fn write_gltf_fixture(path: &Path) {
        let json = format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0, 2] }}],
  "nodes": [
    {{ "name": "Root", "scale": [2.0, 2.0, 2.0], "children": [1] }},
    {{ "name": "Object_6", "mesh": 0, "translation": [0.0, 1.0, 0.0] }},
    {{ "name": "Frame", "mesh": 1 }}
  ],
  "meshes": [
    {{ "name": "Paint", "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }}] }},
    {{ "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }}] }}
  ],
  "materials": [
    {{ "name": "Paint", "pbrMetallicRoughness": {{ "baseColorFactor": [0.0, 0.0, 1.0, 1.0], "metallicFactor": 0.25, "roughnessFactor": 0.75 }} }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, -1.0], "max": [1.0, 0.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }}
  ],
  "buffers": [{{ "byteLength": 44, "uri": "{}" }}]
}}"#,
            TRIANGLE_BUFFER
        );
        std::fs::write(path, json).unwrap();
    }

    pub(crate) fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("showroom-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_flattens_nodes_with_world_transforms() {
        let path = temp_dir("model").join("bike.gltf");
        write_gltf_fixture(&path);

        let object = load_model(&path, "").unwrap();
        assert_eq!(object.name, "bike");
        let names: Vec<_> = object.surfaces.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Object_6", "Frame"]);

        // Root scale 2 applied to translation (0,1,0) and the vertex (1,0,0)
        let subject = &object.surfaces[0];
        let vertices = subject.mesh.vertices();
        assert_eq!(vertices[0].position, [0.0, 2.0, 0.0]);
        assert_eq!(vertices[1].position, [2.0, 2.0, 0.0]);
        assert!((vertices[0].normal[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_multi_primitive_meshes_are_named_after_the_mesh() {
        let path = temp_dir("primitives").join("body.gltf");
        let json = format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scenes": [{{ "nodes": [0, 1] }}],
  "nodes": [
    {{ "name": "Body", "mesh": 0 }},
    {{ "mesh": 1 }}
  ],
  "meshes": [
    {{ "name": "Object_6", "primitives": [
      {{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }},
      {{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }}
    ] }},
    {{ "name": "Object_6", "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }}] }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, -1.0], "max": [1.0, 0.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }}
  ],
  "buffers": [{{ "byteLength": 44, "uri": "{}" }}]
}}"#,
            TRIANGLE_BUFFER
        );
        std::fs::write(&path, json).unwrap();

        let mut object = load_model(&path, "").unwrap();
        let names: Vec<_> = object.surfaces.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Object_6", "Object_6_1", "Object_6_2"]);
        assert_eq!(object.tag_subject_surfaces("Object_6"), 3);
    }

    #[test]
    fn test_repeated_names_get_suffixes() {
        let mut names = SurfaceNames::default();
        assert_eq!(names.unique("Wheel"), "Wheel");
        assert_eq!(names.unique("Wheel"), "Wheel_1");
        assert_eq!(names.unique("Wheel"), "Wheel_2");
        assert_eq!(names.unique("Frame"), "Frame");
    }

    #[test]
    fn test_materials_come_from_factors() {
        let path = temp_dir("material").join("bike.gltf");
        write_gltf_fixture(&path);

        let object = load_model(&path, "").unwrap();
        let paint = &object.surfaces[0].material;
        assert_eq!(paint.color.to_hex(), "#0000ff");
        assert_eq!(paint.metalness, 0.25);
        assert_eq!(paint.roughness, 0.75);

        let frame = &object.surfaces[1].material;
        assert_eq!(frame.name, "Frame");
        assert_eq!(frame.color.to_hex(), "#ffffff");
    }

    #[test]
    fn test_draco_models_are_rejected() {
        let path = temp_dir("draco").join("compressed.gltf");
        std::fs::write(
            &path,
            r#"{ "asset": { "version": "2.0" },
                 "extensionsUsed": ["KHR_draco_mesh_compression"],
                 "extensionsRequired": ["KHR_draco_mesh_compression"] }"#,
        )
        .unwrap();

        let err = load_model(&path, "https://decoders.example/").err().unwrap();
        assert!(matches!(err, AssetError::UnsupportedExtension(ext) if ext == DRACO_EXTENSION));
    }

    #[test]
    fn test_model_without_meshes_is_empty() {
        let path = temp_dir("empty").join("empty.gltf");
        let json = r#"{ "asset": { "version": "2.0" }, "nodes": [{ "name": "lonely" }] }"#;
        std::fs::write(&path, json).unwrap();
        assert!(matches!(load_model(&path, ""), Err(AssetError::EmptyModel)));
    }
}
