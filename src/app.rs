//! winit host: window, event routing and the per-frame draw

use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    assets::{AssetLoader, EnvironmentMap, LoadError, LoadedAssets, ProgressEvent},
    config::ViewerConfig,
    gfx::{
        rendering::{RenderEngine, RenderError, RenderOptions},
        scene::Scene,
    },
    material::MaterialParams,
    render_loop::{CancellationToken, DrawTarget, RenderLoop, TickOutcome},
    screenshot::save_png,
    ui::{debug_panel, loading_window, LoadingState, PanelAction, UiManager},
    viewport::{handle_resize, Viewport},
};

/// Messages from the loader thread to the event loop
pub enum ViewerEvent {
    Progress(ProgressEvent),
    Loaded(Box<LoadedAssets>),
    LoadFailed(LoadError),
}

/// Creates the event loop and runs the viewer until the window closes
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event().build()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(config, event_loop.create_proxy());
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub struct ViewerApp {
    config: ViewerConfig,
    proxy: EventLoopProxy<ViewerEvent>,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    scene: Scene,
    viewport: Viewport,
    params: MaterialParams,
    environment: Option<Arc<EnvironmentMap>>,
    loading: LoadingState,
    render_loop: RenderLoop,
    /// Startup failure that ended the event loop early
    fatal: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig, proxy: EventLoopProxy<ViewerEvent>) -> Self {
        let viewport = Viewport::new(1280, 720);
        let scene = Scene::new(&config, viewport);
        let params = MaterialParams::from(&config.material);

        Self {
            config,
            proxy,
            window: None,
            render_engine: None,
            ui_manager: None,
            scene,
            viewport,
            params,
            environment: None,
            loading: LoadingState::Loading { fraction: 0.0 },
            render_loop: RenderLoop::new(CancellationToken::new()),
            fatal: None,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.render_loop.cancellation_token().clone()
    }

    fn start_loading(&self) {
        let progress_proxy = Mutex::new(self.proxy.clone());
        let done_proxy = self.proxy.clone();
        let loader = AssetLoader::new(self.config.assets.clone());

        let spawned = loader.spawn(
            move |event| {
                if let Ok(proxy) = progress_proxy.lock() {
                    let _ = proxy.send_event(ViewerEvent::Progress(event));
                }
            },
            move |result| {
                let event = match result {
                    Ok(assets) => ViewerEvent::Loaded(Box::new(assets)),
                    Err(err) => ViewerEvent::LoadFailed(err),
                };
                if done_proxy.send_event(event).is_err() {
                    debug!("Event loop closed before assets arrived");
                }
            },
        );

        if let Err(e) = spawned {
            error!("Failed to start the asset loader: {}", e);
        }
    }

    fn on_assets_loaded(&mut self, assets: LoadedAssets) {
        if let Some(render_engine) = self.render_engine.as_mut() {
            render_engine.set_environment(&assets.environment);
        }

        if let Err(e) = self.scene.attach_model(assets.model) {
            warn!("Ignoring loaded model: {}", e);
            return;
        }
        self.environment = Some(assets.environment);
        self.scene
            .apply_material_params(&self.params, self.environment.as_ref());
    }

    fn on_progress(&mut self, event: ProgressEvent) {
        match &event {
            ProgressEvent::Progress { url, loaded, total } => {
                debug!("Loaded {} ({}/{})", url, loaded, total);
            }
            ProgressEvent::Loaded => info!("All assets loaded"),
            ProgressEvent::Error { url } => warn!("Failed to load {}", url),
        }
        self.loading.apply(&event);
    }

    fn handle_panel_actions(&mut self, actions: Vec<PanelAction>) {
        for action in actions {
            match action {
                PanelAction::ParamsChanged => self
                    .scene
                    .apply_material_params(&self.params, self.environment.as_ref()),
                PanelAction::Screenshot => {
                    if let Some(render_engine) = self.render_engine.as_mut() {
                        render_engine.request_screenshot();
                    }
                }
            }
        }
    }

    fn save_pending_screenshot(&mut self) {
        let Some(result) = self
            .render_engine
            .as_mut()
            .and_then(RenderEngine::take_screenshot)
        else {
            return;
        };

        let path = self.config.output.screenshot_path();
        if let Err(e) = result.and_then(|frame| save_png(&frame, &path)) {
            error!("Screenshot failed: {}", e);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(render_engine)) =
            (self.window.as_ref(), self.render_engine.as_mut())
        else {
            return;
        };
        if self.viewport.is_empty() {
            return;
        }

        let mut target = FrameTarget {
            engine: render_engine,
            ui: self.ui_manager.as_mut(),
            window,
            params: &mut self.params,
            loading: self.loading,
            actions: Vec::new(),
        };
        let outcome = self.render_loop.tick(&mut self.scene, &mut target);
        let actions = target.actions;

        if outcome == TickOutcome::Stopped {
            info!("Render loop stopped, closing");
            event_loop.exit();
            return;
        }

        self.handle_panel_actions(actions);
        self.save_pending_screenshot();
    }

    fn handle_keyboard(&mut self, event: &KeyEvent) {
        if event.state == ElementState::Pressed
            && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
        {
            self.render_loop.cancellation_token().cancel();
            if let Some(window) = self.window.as_ref() {
                window.request_redraw();
            }
            return;
        }
        self.scene.camera_manager.process_keyboard_event(event);
    }
}

/// One frame's view of the renderer and the overlay
struct FrameTarget<'a> {
    engine: &'a mut RenderEngine,
    ui: Option<&'a mut UiManager>,
    window: &'a Window,
    params: &'a mut MaterialParams,
    loading: LoadingState,
    actions: Vec<PanelAction>,
}

impl DrawTarget for FrameTarget<'_> {
    type Error = RenderError;

    fn draw(&mut self, scene: &mut Scene) -> Result<(), RenderError> {
        self.engine.update(scene);

        let Some(ui) = self.ui.as_deref_mut() else {
            return self.engine.render_frame_simple(scene);
        };

        let params = &mut *self.params;
        let loading = self.loading;
        let actions = &mut self.actions;
        ui.update_logic(self.window, |frame| {
            actions.extend(debug_panel(frame, params));
            loading_window(frame, loading);
        });

        self.engine.render_frame(
            scene,
            Some(
                |device: &wgpu::Device,
                 queue: &wgpu::Queue,
                 encoder: &mut wgpu::CommandEncoder,
                 view: &wgpu::TextureView| {
                    ui.render_display_only(device, queue, encoder, view);
                },
            ),
        )
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title("showroom")
            .with_inner_size(LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                self.fatal = Some(anyhow::Error::new(e).context("failed to create window"));
                event_loop.exit();
                return;
            }
        };

        let PhysicalSize { width, height } = window.inner_size();
        let options = RenderOptions::from_config(&self.config);
        let mut render_engine =
            match pollster::block_on(RenderEngine::new(window.clone(), width, height, options)) {
                Ok(engine) => engine,
                Err(e) => {
                    error!("Failed to initialise rendering: {}", e);
                    let err = anyhow::Error::new(e).context("failed to initialise rendering");
                    self.fatal = Some(err);
                    event_loop.exit();
                    return;
                }
            };

        let mut ui_manager = UiManager::new(
            render_engine.device(),
            render_engine.queue(),
            render_engine.surface_format(),
            &window,
        );
        ui_manager.update_display_size(width, height);
        debug!("Pipelines ready: {:?}", render_engine.pipeline_stats());

        handle_resize(
            &mut self.viewport,
            &mut self.scene.camera_manager.camera,
            &mut render_engine,
            width,
            height,
        );

        self.window = Some(window.clone());
        self.render_engine = Some(render_engine);
        self.ui_manager = Some(ui_manager);

        self.start_loading();
        window.request_redraw();
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Progress(progress) => self.on_progress(progress),
            ViewerEvent::Loaded(assets) => self.on_assets_loaded(*assets),
            ViewerEvent::LoadFailed(err) => {
                error!("{}", err);
                self.on_progress(ProgressEvent::Error {
                    url: err.path().display().to_string(),
                });
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        // Releases always reach the controller so a drag never sticks
        if let WindowEvent::MouseInput {
            state: ElementState::Released,
            button: MouseButton::Left,
            ..
        } = event
        {
            self.scene.camera_manager.controller.set_mouse_pressed(false);
        }

        if let Some(ui_manager) = self.ui_manager.as_mut() {
            if ui_manager.handle_input(&window, window_id, &event) {
                return;
            }
        }

        match event {
            WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard(&event),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                self.scene.camera_manager.controller.set_mouse_pressed(true);
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(render_engine) = self.render_engine.as_mut() {
                    handle_resize(
                        &mut self.viewport,
                        &mut self.scene.camera_manager.camera,
                        render_engine,
                        width,
                        height,
                    );
                }
                if let Some(ui_manager) = self.ui_manager.as_mut() {
                    ui_manager.update_display_size(width, height);
                }
            }
            WindowEvent::CloseRequested => {
                self.render_loop.cancellation_token().cancel();
                window.request_redraw();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if self
            .ui_manager
            .as_ref()
            .is_some_and(|ui_manager| ui_manager.wants_mouse())
        {
            return;
        }
        self.scene.camera_manager.process_event(&event);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.render_loop.cancellation_token().is_cancelled() && self.viewport.is_empty() {
            // Minimised windows never redraw, so nothing would observe the token
            event_loop.exit();
            return;
        }
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}
