//! Window host and event loop.
//!
//! [`run`] opens a winit window, builds the globe scene on a wgpu backend and maps input onto
//! the camera, the scene and the layer flags:
//!
//! | input              | effect                                              |
//! |--------------------|-----------------------------------------------------|
//! | left drag          | orbit (latitude / longitude)                        |
//! | wheel              | zoom between the camera's height bounds             |
//! | `R`                | reset the camera and every node rotation            |
//! | `1` / `2`          | toggle the earth / cloud texture layer              |
//! | `+` / `-`          | double / halve sphere rasterization and repack      |
//! | `Escape`           | quit                                                |

use std::{rc::Rc, sync::Arc};

use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::Window,
};

use crate::{
    camera::OrbitCamera,
    config::ViewerConfig,
    context::Context,
    data_structures::{scene_graph::SceneGraph, shape::Primitive},
    error::ViewerError,
    layers::{Layer, LayerConfiguration},
    render::{Renderer, wgpu_backend::WgpuBackend},
    resources::{self, TextureProvider},
    scene::SceneBuilder,
};

/// Wheel units per scrolled line, matching one notch of a classic mouse wheel.
pub const WHEEL_UNITS_PER_LINE: f32 = 120.0;
pub const MIN_RASTERIZATION: u32 = 4;
pub const MAX_RASTERIZATION: u32 = 512;

/// Doubles or halves `current`, clamped to the supported range.
pub fn next_rasterization(current: u32, finer: bool) -> u32 {
    let next = if finer {
        current.saturating_mul(2)
    } else {
        current / 2
    };
    next.clamp(MIN_RASTERIZATION, MAX_RASTERIZATION)
}

/// Converts a wheel event into zoom units; positive values zoom in.
pub fn wheel_delta(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y * WHEEL_UNITS_PER_LINE,
        MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => y as f32,
    }
}

#[derive(Debug, Default)]
struct MouseState {
    dragging: bool,
    position: Option<PhysicalPosition<f64>>,
}

struct ViewerState {
    window: Arc<Window>,
    renderer: Renderer<WgpuBackend>,
    graph: SceneGraph,
    camera: OrbitCamera,
    layers: Rc<LayerConfiguration>,
    mouse: MouseState,
    rasterization: u32,
}

impl ViewerState {
    fn new(
        config: &ViewerConfig,
        window: Arc<Window>,
        async_runtime: &tokio::runtime::Runtime,
    ) -> Result<Self, ViewerError> {
        let scene = &config.scene;
        let asset_names = vec![
            scene.space_texture.clone(),
            scene.earth_diffuse_texture.clone(),
            scene.earth_specular_texture.clone(),
            scene.cloud_texture.clone(),
        ];
        let init_future = {
            let window = window.clone();
            async move {
                let (ctx, assets) = futures::join!(
                    Context::new(window),
                    resources::load_assets(asset_names)
                );
                ctx.map(|ctx| (ctx, assets))
            }
        };
        let (ctx, assets) = async_runtime.block_on(init_future)?;

        let mut backend = WgpuBackend::new(ctx, assets);
        let mut builder = SceneBuilder::new(scene.clone());
        {
            let window = window.clone();
            builder.on_scene_changed(move |_| window.request_redraw());
        }
        let mut graph = builder.build(&mut backend)?;
        let placeholder = backend.transparent_placeholder()?;

        let layers = Rc::new(LayerConfiguration::new());
        {
            let window = window.clone();
            layers.subscribe(move |layer, show| {
                log::info!("{:?} layer {}", layer, if show { "shown" } else { "hidden" });
                window.request_redraw();
            });
        }

        let size = window.inner_size();
        let mut renderer = Renderer::new(
            backend,
            layers.clone(),
            config.lighting.clone(),
            placeholder,
        );
        renderer.initialize(size.width, size.height, &mut graph)?;

        let camera = OrbitCamera::new(&config.camera, aspect_ratio(size))?;

        Ok(Self {
            window,
            renderer,
            graph,
            camera,
            layers,
            mouse: MouseState::default(),
            rasterization: scene.rasterization,
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.renderer.resize(size.width, size.height);
        if size.width > 0 && size.height > 0 {
            self.camera.set_aspect_ratio(aspect_ratio(size));
        }
    }

    fn set_rasterization(&mut self, rasterization: u32) -> Result<(), ViewerError> {
        if rasterization == self.rasterization {
            return Ok(());
        }
        for shape in self.graph.shapes_mut() {
            if let Primitive::Sphere { .. } = shape.primitive() {
                shape.set_rasterization(rasterization)?;
            }
        }
        self.rasterization = rasterization;
        self.renderer.reinitialize(&mut self.graph)?;
        log::info!("Rasterization set to {}", rasterization);
        Ok(())
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        match event.logical_key.as_ref() {
            Key::Named(NamedKey::Escape) => event_loop.exit(),
            Key::Character("r" | "R") => {
                self.camera.reset();
                self.graph.reset_rotations();
            }
            Key::Character("1") => {
                self.layers.toggle(Layer::PrimaryBody);
            }
            Key::Character("2") => {
                self.layers.toggle(Layer::Clouds);
            }
            Key::Character(key @ ("+" | "=" | "-")) => {
                let next = next_rasterization(self.rasterization, key != "-");
                if let Err(e) = self.set_rasterization(next) {
                    log::error!("Could not change rasterization: {}", e);
                }
            }
            _ => return,
        }
        self.window.request_redraw();
    }

    fn handle_cursor(&mut self, position: PhysicalPosition<f64>, drag_sensitivity: f32) {
        if let (true, Some(previous)) = (self.mouse.dragging, self.mouse.position) {
            let dx = (position.x - previous.x) as f32;
            let dy = (position.y - previous.y) as f32;
            self.camera
                .set_latitude(self.camera.latitude() - dy * drag_sensitivity);
            self.camera
                .set_longitude(self.camera.longitude() + dx * drag_sensitivity);
            self.window.request_redraw();
        }
        self.mouse.position = Some(position);
    }

    fn render(&mut self) {
        match self.renderer.render(&self.graph, &self.camera) {
            Ok(()) => {}
            Err(e @ ViewerError::ResourceExhausted(_)) => {
                log::error!("Frame skipped: {}", e);
            }
            Err(e) => log::error!("Unable to render {}", e),
        }
    }
}

fn aspect_ratio(size: PhysicalSize<u32>) -> f32 {
    size.width.max(1) as f32 / size.height.max(1) as f32
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: ViewerConfig,
    state: Option<ViewerState>,
}

impl App {
    fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            async_runtime,
            config,
            state: None,
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_config = &self.config.window;
        let window_attributes = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match ViewerState::new(&self.config, window, &self.async_runtime) {
            Ok(state) => {
                state.window.request_redraw();
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("Viewer initialization failed: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                state.resize(size);
                state.window.request_redraw();
            }
            WindowEvent::RedrawRequested => state.render(),
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => {
                state.mouse.dragging = button_state.is_pressed();
            }
            WindowEvent::CursorMoved { position, .. } => {
                state.handle_cursor(position, self.config.camera.drag_sensitivity);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                state.camera.zoom(wheel_delta(delta));
                state.window.request_redraw();
            }
            WindowEvent::KeyboardInput { event, .. } => state.handle_key(event_loop, &event),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            state.renderer.dispose(&mut state.graph);
        }
    }
}

/// Opens the viewer window and runs until it is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
