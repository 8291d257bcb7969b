use std::ops::Range;

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3};
use wgpu::Device;

use super::vertex::Vertex3D;
use crate::gfx::resources::material::{Material, MaterialBindings};
use crate::wgpu_utils::{BindGroupBuilder, BindGroupLayoutWithDesc, UniformBuffer};

pub struct Mesh {
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    index_count: u32,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex3D>, indices: Vec<u32>) -> Self {
        let index_count = indices.len() as u32;
        Self {
            vertices,
            indices,
            vertex_buffer: None,
            index_buffer: None,
            index_count,
        }
    }

    /// Builds a mesh from flat position/normal arrays; normals are derived
    /// from the faces when `normals` is empty
    pub fn from_arrays(positions: Vec<[f32; 3]>, normals: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        let normals = if normals.len() == positions.len() {
            normals
        } else {
            Self::calculate_face_normals(&positions, &indices)
        };
        let vertices = positions
            .into_iter()
            .zip(normals)
            .map(|(position, normal)| Vertex3D { position, normal })
            .collect();
        Self::new(vertices, indices)
    }

    /// Area-weighted vertex normals averaged over adjacent faces
    pub fn calculate_face_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
        let mut normals = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];

        for triangle in indices.chunks_exact(3) {
            let [i0, i1, i2] = [
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            ];
            if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
                continue;
            }
            let v0 = Vector3::from(positions[i0]);
            let edge1 = Vector3::from(positions[i1]) - v0;
            let edge2 = Vector3::from(positions[i2]) - v0;
            let face_normal = edge1.cross(edge2);

            for index in [i0, i1, i2] {
                normals[index] += face_normal;
            }
        }

        normals
            .into_iter()
            .map(|normal| {
                if normal.magnitude2() > 0.0 {
                    normal.normalize().into()
                } else {
                    [0.0, 1.0, 0.0]
                }
            })
            .collect()
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn init_gpu_resources(&mut self, device: &Device) {
        if self.vertex_buffer.is_some() {
            return;
        }

        let vertex_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );

        let index_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&self.indices),
                usage: wgpu::BufferUsages::INDEX,
            },
        );

        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
    }
}

/// Whether a surface follows the "bike" parameters of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceRole {
    Subject,
    #[default]
    Regular,
}

/// One renderable primitive with its own material
pub struct Surface {
    pub name: String,
    pub role: SurfaceRole,
    pub mesh: Mesh,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Surface {
    pub fn new(name: impl Into<String>, mesh: Mesh, material: Material) -> Self {
        Self {
            name: name.into(),
            role: SurfaceRole::Regular,
            mesh,
            material,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn is_subject(&self) -> bool {
        self.role == SurfaceRole::Subject
    }
}

// GPU resources struct to hold all uniform buffers and bind groups
pub struct ObjectGpuResources {
    pub transform_ubo: UniformBuffer<[[f32; 4]; 4]>,
    pub transform_bind_group: wgpu::BindGroup,
}

/// A group of surfaces sharing one model transform (the loaded model or the ground)
pub struct Object {
    pub name: String,
    pub surfaces: Vec<Surface>,
    pub transform: Matrix4<f32>, // cgmath 4x4 transformation matrix
    pub gpu_resources: Option<ObjectGpuResources>, // None until init_gpu_resources called
}

impl Object {
    /// Create a new Object with identity transformation
    pub fn new(name: impl Into<String>, surfaces: Vec<Surface>) -> Self {
        Self {
            name: name.into(),
            surfaces,
            transform: Matrix4::identity(),
            gpu_resources: None,
        }
    }

    /// Set uniform scale
    pub fn set_scale(&mut self, scale: f32) {
        self.transform = Matrix4::from_scale(scale);
    }

    /// Origin of the object in world space
    pub fn translation(&self) -> Vector3<f32> {
        self.transform.w.truncate()
    }

    pub fn vertex_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.mesh.vertex_count()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.mesh.triangle_count()).sum()
    }

    /// Marks every surface whose name contains `marker` as a subject surface.
    ///
    /// Returns the number of matches.
    pub fn tag_subject_surfaces(&mut self, marker: &str) -> usize {
        let mut matched = 0;
        for surface in &mut self.surfaces {
            surface.role = if !marker.is_empty() && surface.name.contains(marker) {
                matched += 1;
                SurfaceRole::Subject
            } else {
                SurfaceRole::Regular
            };
        }
        matched
    }

    pub fn subject_surfaces(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.iter().filter(|s| s.is_subject())
    }

    /// Get the transform bind group for rendering
    pub fn get_transform_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu_resources
            .as_ref()
            .map(|res| &res.transform_bind_group)
    }

    /// Uploads meshes once and syncs the transform and every material
    pub fn sync_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        transform_layout: &BindGroupLayoutWithDesc,
        material_bindings: &MaterialBindings,
    ) {
        for surface in &mut self.surfaces {
            surface.mesh.init_gpu_resources(device);
            surface.material.update_gpu_resources(
                device,
                queue,
                material_bindings,
                surface.receive_shadow,
            );
        }

        let gpu_resources = self.gpu_resources.get_or_insert_with(|| {
            let transform_ubo = UniformBuffer::new(device);
            let transform_bind_group = BindGroupBuilder::new(transform_layout)
                .resource(transform_ubo.binding_resource())
                .create(device, "Transform Bind Group");
            ObjectGpuResources {
                transform_ubo,
                transform_bind_group,
            }
        });

        // cgmath matrices are already column-major for GPU
        gpu_resources
            .transform_ubo
            .update_content(queue, self.transform.into());
    }
}

pub trait DrawObject<'a> {
    fn draw_mesh(&mut self, mesh: &'a Mesh);
    fn draw_mesh_instanced(&mut self, mesh: &'a Mesh, instances: Range<u32>);
    /// Draws every surface with its material bound at `material_group`
    fn draw_object(&mut self, object: &'a Object, material_group: u32);
    /// Geometry only, for depth passes
    fn draw_object_shadow_casters(&mut self, object: &'a Object);
}

impl<'a, 'b> DrawObject<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(&mut self, mesh: &'b Mesh) {
        self.draw_mesh_instanced(mesh, 0..1);
    }

    fn draw_mesh_instanced(&mut self, mesh: &'b Mesh, instances: Range<u32>) {
        let vertex_buffer = match &mesh.vertex_buffer {
            Some(buffer) => buffer,
            None => return, // Skip drawing if not uploaded
        };
        let index_buffer = match &mesh.index_buffer {
            Some(buffer) => buffer,
            None => return,
        };

        self.set_vertex_buffer(0, vertex_buffer.slice(..));
        self.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.index_count, 0, instances);
    }

    fn draw_object(&mut self, object: &'b Object, material_group: u32) {
        for surface in &object.surfaces {
            if let Some(bind_group) = surface.material.get_bind_group() {
                self.set_bind_group(material_group, bind_group, &[]);
                self.draw_mesh(&surface.mesh);
            }
        }
    }

    fn draw_object_shadow_casters(&mut self, object: &'b Object) {
        for surface in object.surfaces.iter().filter(|s| s.cast_shadow) {
            self.draw_mesh(&surface.mesh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Color;

    fn triangle() -> Mesh {
        Mesh::from_arrays(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
            Vec::new(),
            vec![0, 1, 2],
        )
    }

    fn surface(name: &str) -> Surface {
        Surface::new(name, triangle(), Material::new(name, Color::WHITE, 0.0, 1.0))
    }

    #[test]
    fn test_missing_normals_are_computed() {
        let mesh = triangle();
        for vertex in mesh.vertices() {
            assert!((vertex.normal[1] - 1.0).abs() < 1e-6);
        }
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_degenerate_triangle_gets_up_normal() {
        let mesh = Mesh::from_arrays(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            Vec::new(),
            vec![0, 1, 2],
        );
        for vertex in mesh.vertices() {
            assert_eq!(vertex.normal, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn test_surfaces_do_not_receive_shadows_by_default() {
        let surface = surface("Object_6");
        assert!(!surface.receive_shadow);
        assert!(!surface.cast_shadow);
    }

    #[test]
    fn test_tag_subject_surfaces_by_substring() {
        let mut object = Object::new(
            "model",
            vec![surface("Object_6_mesh"), surface("Frame_mesh"), surface("Object_61")],
        );
        assert_eq!(object.tag_subject_surfaces("Object_6"), 2);
        let names: Vec<_> = object.subject_surfaces().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Object_6_mesh", "Object_61"]);
        assert_eq!(object.surfaces[1].role, SurfaceRole::Regular);
    }

    #[test]
    fn test_counts_and_translation() {
        let mut object = Object::new("model", vec![surface("a"), surface("b")]);
        object.set_scale(3.5);
        assert_eq!(object.vertex_count(), 6);
        assert_eq!(object.triangle_count(), 2);
        assert_eq!(object.translation(), Vector3::new(0.0, 0.0, 0.0));
    }
}
