//! Shadow map and environment texture bindings (group 3 of the PBR pipeline,
//! group 1 of the sky pipeline)

use super::texture_resource::TextureResource;
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
};

pub struct LightingBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: Option<wgpu::BindGroup>,
}

impl LightingBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::depth_texture_2d())
            .next_binding_fragment(binding_types::sampler(
                wgpu::SamplerBindingType::Comparison,
            ))
            .next_binding_fragment(binding_types::texture_2d_unfilterable())
            .next_binding_fragment(binding_types::sampler(
                wgpu::SamplerBindingType::NonFiltering,
            ))
            .create(device, "Lighting Bind Group");

        Self {
            bind_group_layout,
            bind_group: None,
        }
    }

    /// Rebuilds the bind group; called again once the environment is uploaded
    pub fn create_bind_group(
        &mut self,
        device: &wgpu::Device,
        shadow_map: &TextureResource,
        environment: &TextureResource,
    ) {
        self.bind_group = Some(
            BindGroupBuilder::new(&self.bind_group_layout)
                .texture(&shadow_map.view)
                .sampler(&shadow_map.sampler)
                .texture(&environment.view)
                .sampler(&environment.sampler)
                .create(device, "Lighting Bind Group"),
        );
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}
