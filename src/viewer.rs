//! Application event loop.
//!
//! [`run`] opens a window, loads the material catalog and the configured model
//! and then renders on every redraw. Input is routed once, here, to the camera
//! controller and to the session's group and material controls:
//!
//! - left drag orbits, right drag pans, the wheel zooms
//! - `G` / `Shift+G` cycles the group, `M` / `Shift+M` cycles the material and
//!   applies it to the selected group
//! - `R` frames the camera on the model again
//! - dropping a `.glb`/`.gltf` file loads it as the model, dropping an image adds
//!   it to the catalog under its file name

use std::{path::Path, sync::Arc};

use anyhow::Context as _;
use image::RgbaImage;
use instant::Instant;
use tokio::{
    runtime::Runtime,
    sync::oneshot::{self, error::TryRecvError},
};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    camera::OrbitCamera,
    config::ViewerConfig,
    context::Context,
    pipelines::background::Background,
    render::{GpuScene, render_frame},
    resources::{self, AssetSource},
    session::ViewerSession,
};

const TITLE: &str = "swatch-viewer";

/// GPU state that only exists once the window is up.
struct ViewerState {
    ctx: Context,
    gpu: GpuScene,
    background: Option<Background>,
    framed_revision: u64,
}

impl ViewerState {
    fn frame_model(&mut self, session: &ViewerSession) {
        let Some(bounds) = session.model().and_then(|scene| scene.bounds()) else {
            return;
        };
        self.ctx.camera.camera = OrbitCamera::frame(&bounds);
        self.ctx.camera.controller.stop();
    }

    fn poll_background(
        &mut self,
        pending: &mut Option<oneshot::Receiver<anyhow::Result<RgbaImage>>>,
    ) {
        let Some(receiver) = pending else {
            return;
        };
        match receiver.try_recv() {
            Ok(Ok(rgba)) => {
                self.background = Some(Background::new(
                    &self.ctx.device,
                    &self.ctx.queue,
                    &self.ctx.background_layout,
                    &rgba,
                ));
                *pending = None;
            }
            Ok(Err(e)) => {
                log::error!("could not load background: {:#}", e);
                *pending = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => *pending = None,
        }
    }
}

/// What a file dropped onto the window turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DroppedFile {
    /// `.glb` / `.gltf`, loaded from its path so external buffers resolve.
    Model,
    /// An image, added to the catalog under its file name.
    Material(String),
    Unsupported,
}

impl DroppedFile {
    fn classify(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let file_name = path.file_name().and_then(|n| n.to_str());
        match (extension.as_deref(), file_name) {
            (Some("glb" | "gltf"), _) => Self::Model,
            (Some(_), Some(name)) if image::ImageFormat::from_path(path).is_ok() => {
                Self::Material(name.to_string())
            }
            _ => Self::Unsupported,
        }
    }
}

pub struct App {
    config: ViewerConfig,
    runtime: Runtime,
    session: ViewerSession,
    state: Option<ViewerState>,
    pending_background: Option<oneshot::Receiver<anyhow::Result<RgbaImage>>>,
    modifiers: ModifiersState,
}

impl App {
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("cannot start the asset loading runtime")?;
        let session = ViewerSession::new(config.asset_root.clone(), runtime.handle().clone())
            .with_default_material(config.default_material.clone());
        Ok(Self {
            config,
            runtime,
            session,
            state: None,
            pending_background: None,
            modifiers: ModifiersState::empty(),
        })
    }

    pub fn session(&self) -> &ViewerSession {
        &self.session
    }

    fn start_background_load(&mut self) {
        let Some(path) = self.config.background.clone() else {
            return;
        };
        let (sender, receiver) = oneshot::channel();
        let asset_root = self.config.asset_root.clone();
        self.runtime.spawn(async move {
            let result = resources::load_image(&asset_root, AssetSource::path(path)).await;
            let _ = sender.send(result);
        });
        self.pending_background = Some(receiver);
    }

    fn update_title(&self) {
        let Some(state) = &self.state else {
            return;
        };
        let group = self.session.group_control().selected().unwrap_or("-");
        let material = self.session.material_control().selected().unwrap_or("-");
        state
            .ctx
            .window()
            .set_title(&format!("{TITLE}: {group} / {material}"));
    }

    fn handle_key(&mut self, code: KeyCode) {
        let forward = !self.modifiers.shift_key();
        match code {
            KeyCode::KeyG => {
                if self.session.cycle_group(forward).is_none() {
                    log::info!("the model has no groups");
                }
            }
            KeyCode::KeyM => {
                if let Err(e) = self.session.cycle_material(forward) {
                    log::warn!("material not applied: {}", e);
                }
            }
            KeyCode::KeyR => {
                if let Some(state) = &mut self.state {
                    state.frame_model(&self.session);
                }
            }
            _ => return,
        }
        self.update_title();
    }

    fn handle_dropped_file(&mut self, path: &Path) {
        match DroppedFile::classify(path) {
            DroppedFile::Model => {
                self.session.load_model(AssetSource::path(path));
            }
            DroppedFile::Material(name) => {
                log::info!("adding material `{}` from {}", name, path.display());
                self.session.add_material(name, AssetSource::path(path));
            }
            DroppedFile::Unsupported => log::warn!("ignoring dropped file {}", path.display()),
        }
    }

    fn redraw(&mut self) {
        let applied = self.session.poll_loads();
        let Some(state) = &mut self.state else {
            return;
        };
        state.poll_background(&mut self.pending_background);

        let revision = self.session.model_revision();
        if state.framed_revision != revision {
            state.frame_model(&self.session);
            state.framed_revision = revision;
        }
        state.ctx.update_camera();
        state.gpu.sync(
            &state.ctx,
            self.session.model(),
            revision,
            self.session.catalog(),
        );

        match render_frame(
            &state.ctx,
            &state.gpu,
            self.session.model(),
            state.background.as_ref(),
        ) {
            Ok(()) => {}
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = state.ctx.window().inner_size();
                state.ctx.resize(size.width, size.height);
            }
            Err(e) => log::error!("Unable to render {}", e),
        }
        state.ctx.window().request_redraw();

        if applied > 0 {
            self.update_title();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes().with_title(TITLE);
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("cannot open a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let ctx = match self.runtime.block_on(Context::new(window, &self.config)) {
            Ok(ctx) => ctx,
            Err(e) => {
                log::error!("cannot initialise the GPU: {:#}", e);
                event_loop.exit();
                return;
            }
        };

        let started = Instant::now();
        let loaded = self
            .runtime
            .block_on(self.session.load_catalog(&self.config.materials));
        log::info!("{} material(s) ready after {:?}", loaded, started.elapsed());

        if let Some(model) = self.config.model.clone() {
            self.session.load_model(AssetSource::path(model));
        }
        self.start_background_load();

        let gpu = GpuScene::new(&ctx);
        ctx.window().request_redraw();
        self.state = Some(ViewerState {
            ctx,
            gpu,
            background: None,
            framed_revision: 0,
        });
        self.update_title();
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            state.ctx.camera.controller.handle_mouse(dx, dy);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if self.state.is_none() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.ctx.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                if let Some(state) = &mut self.state {
                    state
                        .ctx
                        .camera
                        .controller
                        .handle_mouse_button(button, button_state);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(state) = &mut self.state {
                    state.ctx.camera.controller.handle_scroll(&delta);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(code),
            WindowEvent::DroppedFile(path) => self.handle_dropped_file(&path),
            _ => {}
        }
    }
}

/// Runs the viewer until the window is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_images_keep_their_file_name() {
        assert_eq!(
            DroppedFile::classify(Path::new("/tmp/swatches/denim.png")),
            DroppedFile::Material("denim.png".to_string())
        );
        assert_eq!(
            DroppedFile::classify(Path::new("oak.JPG")),
            DroppedFile::Material("oak.JPG".to_string())
        );
    }

    #[test]
    fn dropping_an_image_adds_it_under_its_file_name() {
        let dir = tempfile::TempDir::new().expect("failed to create a temp dir");
        let path = dir.path().join("denim.png");
        image::RgbaImage::from_pixel(2, 2, image::Rgba([20, 40, 120, 255]))
            .save(&path)
            .expect("failed to write png fixture");
        let mut app = App::new(ViewerConfig::default()).expect("runtime starts");

        app.handle_dropped_file(&path);
        for _ in 0..500 {
            if app.session.poll_loads() > 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert_eq!(app.session().catalog().names().collect::<Vec<_>>(), ["denim.png"]);
    }

    #[test]
    fn dropped_models_and_other_files() {
        assert_eq!(DroppedFile::classify(Path::new("chair.GLB")), DroppedFile::Model);
        assert_eq!(DroppedFile::classify(Path::new("scene/chair.gltf")), DroppedFile::Model);
        assert_eq!(DroppedFile::classify(Path::new("notes.txt")), DroppedFile::Unsupported);
        assert_eq!(DroppedFile::classify(Path::new("Makefile")), DroppedFile::Unsupported);
    }
}
