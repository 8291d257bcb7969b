//! Surface materials for PBR rendering
//!
//! Every surface owns its own [`Material`], so edits made to one surface never
//! leak onto another. The environment map is the only shared piece and is
//! held through an `Arc`.

use std::sync::Arc;

use wgpu::Device;

use crate::assets::EnvironmentMap;
use crate::material::Color;
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

/// GPU uniform data for materials
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// Linear RGB, alpha unused
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub env_intensity: f32,
    /// 1.0 when an environment map is assigned
    pub env_enabled: f32,
    /// 1.0 when the spotlight's shadow map darkens this surface
    pub receive_shadow: f32,
    pub _padding: [f32; 3],
}

type MaterialUBO = UniformBuffer<MaterialUniform>;

/// Shared layout for the material bind group (group 2 of the PBR pipeline)
pub struct MaterialBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
}

impl MaterialBindings {
    pub fn new(device: &Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .create(device, "Material Bind Group");

        MaterialBindings { bind_group_layout }
    }

    fn create_bind_group(&self, device: &Device, ubo: &MaterialUBO) -> wgpu::BindGroup {
        BindGroupBuilder::new(&self.bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Material Bind Group")
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }
}

/// Standard metal/rough material of a single surface
pub struct Material {
    pub name: String,
    /// sRGB colour as edited in the panel
    pub color: Color,
    pub metalness: f32,
    pub roughness: f32,
    pub env_map: Option<Arc<EnvironmentMap>>,
    pub env_map_intensity: f32,

    material_ubo: Option<MaterialUBO>,
    bind_group: Option<wgpu::BindGroup>,
}

impl Default for Material {
    fn default() -> Self {
        Self::new("Default", Color::WHITE, 0.0, 1.0)
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("color", &self.color)
            .field("metalness", &self.metalness)
            .field("roughness", &self.roughness)
            .field("env_map", &self.env_map.is_some())
            .field("env_map_intensity", &self.env_map_intensity)
            .finish()
    }
}

impl Material {
    pub fn new(name: &str, color: Color, metalness: f32, roughness: f32) -> Self {
        Self {
            name: name.to_string(),
            color,
            metalness: metalness.clamp(0.0, 1.0),
            roughness: roughness.clamp(0.0, 1.0),
            env_map: None,
            env_map_intensity: 1.0,
            material_ubo: None,
            bind_group: None,
        }
    }

    /// Shader values for a surface that does or does not receive shadows
    pub fn uniform(&self, receive_shadow: bool) -> MaterialUniform {
        let [r, g, b] = self.color.to_linear();
        MaterialUniform {
            base_color: [r, g, b, 1.0],
            metallic: self.metalness,
            roughness: self.roughness,
            env_intensity: self.env_map_intensity,
            env_enabled: if self.env_map.is_some() { 1.0 } else { 0.0 },
            receive_shadow: if receive_shadow { 1.0 } else { 0.0 },
            _padding: [0.0; 3],
        }
    }

    /// Creates the uniform buffer on first use and uploads the current values.
    ///
    /// Unchanged values are not re-sent.
    pub fn update_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        bindings: &MaterialBindings,
        receive_shadow: bool,
    ) {
        let uniform = self.uniform(receive_shadow);
        let ubo = self
            .material_ubo
            .get_or_insert_with(|| MaterialUBO::new(device));
        if self.bind_group.is_none() {
            self.bind_group = Some(bindings.create_bind_group(device, ubo));
        }
        ubo.update_content(queue, uniform);
    }

    /// Gets the bind group for rendering
    pub fn get_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}
