//! WGPU-based rendering engine for the showroom viewer
//!
//! Owns the device, the window surface and every pipeline. A frame is drawn in
//! this order: spotlight shadow map, optional environment background, the lit
//! scene, the light helper, an optional screenshot copy, then the UI overlay.

use std::sync::Arc;

use log::{debug, error, info, warn};
use thiserror::Error;
use wgpu::{Device, TextureFormat};

use crate::assets::{environment::MAX_TEXTURE_SIZE, EnvironmentMap};
use crate::config::ViewerConfig;
use crate::gfx::{
    resources::{
        global_bindings::{update_global_ubo, GlobalBindings, GlobalUBO},
        lighting_bindings::LightingBindings,
        material::MaterialBindings,
        texture_resource::TextureResource,
    },
    scene::{object::DrawObject, scene::Scene},
};
use crate::screenshot::{CapturedFrame, ScreenshotError};
use crate::viewport::DrawSurface;
use crate::wgpu_utils::{binding_types, BindGroupLayoutBuilder, BindGroupLayoutWithDesc};

use super::pipeline_manager::{PipelineConfig, PipelineManager, PipelineStats, VertexInput};
use super::readback::PendingReadback;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create a window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to open the graphics device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("the surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("failed to acquire the next frame: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Frame-level settings that do not belong to the scene
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub clear_color: wgpu::Color,
    pub shadow_map_size: u32,
    /// Draw the environment map behind the scene instead of `clear_color`
    pub environment_background: bool,
}

impl RenderOptions {
    pub fn from_config(config: &ViewerConfig) -> Self {
        let [r, g, b] = config.scene.clear_color.to_array();
        Self {
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
            shadow_map_size: config.light.shadow_map_size.max(1),
            environment_background: config.debug.environment_background,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    format: TextureFormat,
    pub pipeline_manager: PipelineManager,
    pub options: RenderOptions,

    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    transform_layout: BindGroupLayoutWithDesc,
    material_bindings: MaterialBindings,
    lighting_bindings: LightingBindings,

    shadow_map: TextureResource,
    environment: TextureResource,
    has_environment: bool,

    can_capture: bool,
    screenshot_requested: bool,
    screenshot: Option<Result<CapturedFrame, ScreenshotError>>,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// Initializes wgpu, creates the depth buffer and shadow map, binds a
    /// black placeholder in place of the environment and builds every
    /// pipeline up front.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        options: RenderOptions,
    ) -> Result<RenderEngine, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: MAX_TEXTURE_SIZE,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        // Shaders encode sRGB themselves
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let can_capture = surface_capabilities
            .usages
            .contains(wgpu::TextureUsages::COPY_SRC);
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        if can_capture {
            usage |= wgpu::TextureUsages::COPY_SRC;
        } else {
            warn!("Surface does not support COPY_SRC; screenshots are disabled");
        }

        let config = wgpu::SurfaceConfiguration {
            usage,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(
            &device,
            config.width,
            config.height,
            "depth_texture",
        );
        let shadow_map = TextureResource::create_shadow_map(&device, options.shadow_map_size);
        let environment = TextureResource::create_placeholder_environment(&device, &queue);

        let global_ubo = GlobalUBO::new(&device);
        let mut global_bindings = GlobalBindings::new(&device);
        global_bindings.create_bind_group(&device, &global_ubo);

        let transform_layout = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::uniform())
            .create(&device, "Transform Bind Group Layout");

        let material_bindings = MaterialBindings::new(&device);

        let mut lighting_bindings = LightingBindings::new(&device);
        lighting_bindings.create_bind_group(&device, &shadow_map, &environment);

        let device_handle: Arc<Device> = device.into();
        let queue_handle: Arc<wgpu::Queue> = queue.into();
        let mut pipeline_manager = PipelineManager::new(device_handle.clone());

        pipeline_manager.load_shader("pbr", include_str!("pbr.wgsl"));
        pipeline_manager.load_shader("shadow", include_str!("shadow_pass.wgsl"));
        pipeline_manager.load_shader("sky", include_str!("sky.wgsl"));
        pipeline_manager.load_shader("lines", include_str!("lines.wgsl"));

        let color_target = vec![Some(wgpu::ColorTargetState {
            format,
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        // No culling so thin model parts still occlude the light
        pipeline_manager.register_pipeline(
            "Shadow",
            PipelineConfig::default()
                .with_label("SHADOW")
                .with_shader("shadow")
                .with_depth_stencil(TextureResource::DEPTH_FORMAT)
                .with_depth_bias(wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                })
                .with_cull_mode(None)
                .with_vertex_only()
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layout().clone(),
                    transform_layout.layout.clone(),
                ])
                .with_color_targets(vec![]),
        );

        pipeline_manager.register_pipeline(
            "PBR",
            PipelineConfig::default()
                .with_label("PBR")
                .with_shader("pbr")
                .with_depth_stencil(TextureResource::DEPTH_FORMAT)
                .with_cull_mode(None)
                .with_color_targets(color_target.clone())
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layout().clone(),
                    transform_layout.layout.clone(),
                    material_bindings.bind_group_layout().clone(),
                    lighting_bindings.bind_group_layout().clone(),
                ]),
        );

        pipeline_manager.register_pipeline(
            "Sky",
            PipelineConfig::default()
                .with_label("SKY")
                .with_shader("sky")
                .with_depth_stencil(TextureResource::DEPTH_FORMAT)
                .with_depth_read_only(wgpu::CompareFunction::Always)
                .with_cull_mode(None)
                .with_no_vertex_buffers()
                .with_color_targets(color_target.clone())
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layout().clone(),
                    lighting_bindings.bind_group_layout().clone(),
                ]),
        );

        pipeline_manager.register_pipeline(
            "Lines",
            PipelineConfig::default()
                .with_label("LINES")
                .with_shader("lines")
                .with_depth_stencil(TextureResource::DEPTH_FORMAT)
                .with_depth_read_only(wgpu::CompareFunction::LessEqual)
                .with_cull_mode(None)
                .with_primitive_topology(wgpu::PrimitiveTopology::LineList)
                .with_vertex_input(VertexInput::Lines)
                .with_color_targets(color_target)
                .with_bind_group_layouts(vec![global_bindings.bind_group_layout().clone()]),
        );

        if let Err(errors) = pipeline_manager.create_all_pipelines() {
            for e in errors {
                error!("Pipeline creation failed: {}", e);
            }
        }

        Ok(RenderEngine {
            surface,
            device: device_handle,
            queue: queue_handle,
            config,
            depth_texture,
            format,
            pipeline_manager,
            options,
            global_ubo,
            global_bindings,
            transform_layout,
            material_bindings,
            lighting_bindings,
            shadow_map,
            environment,
            has_environment: false,
            can_capture,
            screenshot_requested: false,
            screenshot: None,
        })
    }

    /// Uploads the environment map and rebinds it for shading and background
    pub fn set_environment(&mut self, environment: &EnvironmentMap) {
        self.environment =
            TextureResource::create_environment(&self.device, &self.queue, environment);
        self.lighting_bindings
            .create_bind_group(&self.device, &self.shadow_map, &self.environment);
        self.has_environment = true;
        debug!(
            "Environment uploaded ({}x{})",
            environment.width(),
            environment.height()
        );
    }

    pub fn has_environment(&self) -> bool {
        self.has_environment
    }

    /// Pushes scene changes to the GPU: new meshes, materials, transforms,
    /// the camera and the spotlight
    ///
    /// Should be called once per frame before [`RenderEngine::render_frame`].
    pub fn update(&mut self, scene: &mut Scene) {
        scene.sync_gpu_resources(
            &self.device,
            &self.queue,
            &self.transform_layout,
            &self.material_bindings,
        );
        update_global_ubo(
            &mut self.global_ubo,
            &self.queue,
            scene.camera_manager.camera.uniform,
            scene.light().uniform(),
        );
    }

    /// Captures the next rendered frame (before the UI is drawn over it)
    pub fn request_screenshot(&mut self) {
        self.screenshot_requested = true;
    }

    /// Result of the last requested capture, once the frame has rendered
    pub fn take_screenshot(&mut self) -> Option<Result<CapturedFrame, ScreenshotError>> {
        self.screenshot.take()
    }

    /// Renders a frame with an optional UI overlay
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn render_frame<F>(&mut self, scene: &Scene, ui_callback: Option<F>) -> Result<(), RenderError>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out acquiring a frame; skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.encode_shadow_pass(&mut encoder, scene);
        self.encode_main_pass(&mut encoder, &surface_texture_view, scene);

        let readback = if std::mem::take(&mut self.screenshot_requested) {
            if self.can_capture {
                Some(PendingReadback::encode(
                    &self.device,
                    &mut encoder,
                    &surface_texture.texture,
                ))
            } else {
                self.screenshot = Some(Err(ScreenshotError::SurfaceNotCopyable));
                None
            }
        } else {
            None
        };

        if let Some(ui_callback) = ui_callback {
            ui_callback(
                &self.device,
                &self.queue,
                &mut encoder,
                &surface_texture_view,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(readback) = readback {
            self.screenshot = Some(readback.wait(&self.device));
        }

        surface_texture.present();
        Ok(())
    }

    /// Convenience method for rendering without UI
    pub fn render_frame_simple(&mut self, scene: &Scene) -> Result<(), RenderError> {
        self.render_frame(
            scene,
            None::<fn(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView)>,
        )
    }

    fn encode_shadow_pass(&mut self, encoder: &mut wgpu::CommandEncoder, scene: &Scene) {
        // Always cleared so a disabled or empty pass leaves everything lit
        let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Depth Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.shadow_map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        if !scene.light().cast_shadow {
            return;
        }
        let Some(globals) = self.global_bindings.bind_group() else {
            return;
        };
        let Some(shadow_pipeline) = self.pipeline_manager.get_pipeline("Shadow") else {
            return;
        };

        shadow_pass.set_pipeline(shadow_pipeline);
        shadow_pass.set_bind_group(0, globals, &[]);
        for object in scene.objects() {
            if let Some(transform) = object.get_transform_bind_group() {
                shadow_pass.set_bind_group(1, transform, &[]);
                shadow_pass.draw_object_shadow_casters(object);
            }
        }
    }

    fn encode_main_pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        scene: &Scene,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.options.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        let (Some(globals), Some(lighting)) = (
            self.global_bindings.bind_group(),
            self.lighting_bindings.bind_group(),
        ) else {
            return;
        };

        if self.options.environment_background && self.has_environment {
            if let Some(sky) = self.pipeline_manager.get_pipeline("Sky") {
                render_pass.set_pipeline(sky);
                render_pass.set_bind_group(0, globals, &[]);
                render_pass.set_bind_group(1, lighting, &[]);
                render_pass.draw(0..3, 0..1);
            }
        }

        if let Some(pipeline) = self.pipeline_manager.get_pipeline("PBR") {
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, globals, &[]);
            render_pass.set_bind_group(3, lighting, &[]);

            for object in scene.objects() {
                match object.get_transform_bind_group() {
                    Some(transform) => {
                        render_pass.set_bind_group(1, transform, &[]);
                        render_pass.draw_object(object, 2);
                    }
                    None => debug!("Skipping '{}' - no GPU resources yet", object.name),
                }
            }
        }

        if let Some((buffer, vertex_count)) = scene.light_helper.draw_data() {
            if let Some(lines) = self.pipeline_manager.get_pipeline("Lines") {
                render_pass.set_pipeline(lines);
                render_pass.set_bind_group(0, globals, &[]);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..vertex_count, 0..1);
            }
        }
    }

    /// Resizes the surface and recreates the depth buffer
    ///
    /// Zero sizes are ignored. The shadow map keeps its fixed resolution.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, width, height, "depth_texture");
    }

    /// Returns current surface dimensions
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns the surface texture format
    ///
    /// Used for creating compatible render targets and UI systems.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn pipeline_stats(&self) -> PipelineStats {
        self.pipeline_manager.get_stats()
    }
}

impl DrawSurface for RenderEngine {
    fn resize(&mut self, width: u32, height: u32) {
        RenderEngine::resize(self, width, height);
    }
}
