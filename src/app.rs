use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    assets::AssetReference,
    capture::CaptureProvider,
    config::Config,
    error::{Error, Result},
    gfx::engine::SurfaceSize,
    pipeline::{RenderHandoff, Stage},
    progress::TerminalOverlayHost,
    session::Session,
    toolkit::ToolkitLoader,
    viewer::{Container, Viewer},
};

/// Events sent to the event loop from pipeline tasks
#[derive(Debug)]
pub enum AppEvent {
    StageFinished { stage: Stage, error: Option<String> },
    ModelReady(AssetReference),
}

/// Hands installed models to the event loop, which owns the viewer
struct ProxyHandoff {
    proxy: Mutex<EventLoopProxy<AppEvent>>,
}

impl RenderHandoff for ProxyHandoff {
    fn render(&self, reference: &AssetReference) -> Result<()> {
        self.proxy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send_event(AppEvent::ModelReady(reference.clone()))
            .map_err(|_| Error::Surface("event loop closed before the model arrived".into()))
    }
}

/// What the window should start with
#[derive(Default)]
pub struct AppOptions {
    pub camera: Option<Box<dyn CaptureProvider>>,
    /// Overrides the configured enhancement instruction
    pub instruction: Option<String>,
    /// Model file shown as soon as the window is up
    pub model: Option<PathBuf>,
}

pub struct SnapforgeApp {
    event_loop: EventLoop<AppEvent>,
    app_state: AppState,
}

struct AppState {
    session: Session,
    runtime: Runtime,
    proxy: EventLoopProxy<AppEvent>,
    config: Config,
    camera: Option<Box<dyn CaptureProvider>>,
    instruction: String,
    preload: Option<PathBuf>,
    window: Option<Arc<Window>>,
    viewer: Option<Viewer>,
    status: String,
}

impl SnapforgeApp {
    pub fn new(config: Config, runtime: Runtime, options: AppOptions) -> Result<Self> {
        let event_loop = EventLoop::<AppEvent>::with_user_event()
            .build()
            .map_err(|e| Error::Surface(e.to_string()))?;
        let proxy = event_loop.create_proxy();

        let session = Session::from_config(
            &config,
            Arc::new(TerminalOverlayHost::new()),
            runtime.handle().clone(),
        )?;
        let instruction = options
            .instruction
            .unwrap_or_else(|| config.enhance.instruction.clone());

        Ok(Self {
            event_loop,
            app_state: AppState {
                session,
                runtime,
                proxy,
                config,
                camera: options.camera,
                instruction,
                preload: options.model,
                window: None,
                viewer: None,
                status: "Press C to capture".into(),
            },
        })
    }

    /// Runs the event loop until the window closes
    pub fn run(mut self) -> Result<()> {
        self.event_loop.set_control_flow(ControlFlow::Poll);
        self.event_loop
            .run_app(&mut self.app_state)
            .map_err(|e| Error::Surface(e.to_string()))
    }
}

fn failure_status(error: &Error) -> String {
    if error.is_retryable() {
        format!("{error} (press the key again to retry)")
    } else {
        error.to_string()
    }
}

impl AppState {
    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        log::info!("{}", self.status);
        self.refresh_title();
    }

    fn refresh_title(&self) {
        let Some(window) = &self.window else {
            return;
        };
        let controls = self.session.controls();
        let mut keys = Vec::new();
        if controls.capture || self.camera.is_some() {
            keys.push("[C]apture");
        }
        if controls.enhance {
            keys.push("[E]nhance");
        }
        if controls.generate {
            keys.push("[G]enerate");
        }
        if controls.download {
            keys.push("[S]ave");
        }
        window.set_title(&format!("snapforge | {} | {}", self.status, keys.join(" ")));
    }

    fn capture(&mut self) {
        if !self.session.camera_active() {
            let Some(camera) = self.camera.as_deref() else {
                self.set_status(Error::NoActiveDevice.to_string());
                return;
            };
            if let Err(e) = self.session.start_camera(camera) {
                self.set_status(e.to_string());
                return;
            }
        }

        match self.session.capture() {
            Ok(frame) => self.set_status(format!("Captured {} bytes, press E to enhance", frame.len())),
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn enhance(&mut self) {
        let task = self.session.enhance_task(self.instruction.clone());
        let proxy = self.proxy.clone();
        self.runtime.spawn(async move {
            let error = task.await.err().map(|e| failure_status(&e));
            let _ = proxy.send_event(AppEvent::StageFinished {
                stage: Stage::Enhance,
                error,
            });
        });
        self.set_status("Enhancing...");
    }

    fn generate(&mut self) {
        let handoff = Arc::new(ProxyHandoff {
            proxy: Mutex::new(self.proxy.clone()),
        });
        let task = self.session.generate_task(handoff);
        let proxy = self.proxy.clone();
        self.runtime.spawn(async move {
            let error = task.await.err().map(|e| failure_status(&e));
            let _ = proxy.send_event(AppEvent::StageFinished {
                stage: Stage::Generate3D,
                error,
            });
        });
        self.set_status("Generating 3D model...");
    }

    fn save(&mut self) {
        match self.session.save(&self.config.viewer.download_dir) {
            Ok(path) => self.set_status(format!("Saved {}", path.display())),
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn display(&mut self, reference: &AssetReference) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        let outcome = pollster::block_on(viewer.display(&reference.public_url, self.session.registry()));
        self.session.context().record_render(&outcome);

        match outcome {
            Ok(()) => self.set_status(format!("Showing {}", reference.suggested_filename)),
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(key_code) = event.physical_key else {
            return;
        };
        if event.state != ElementState::Pressed || event.repeat {
            if let Some(viewer) = self.viewer.as_mut() {
                viewer.keyboard_event(event);
            }
            return;
        }

        match key_code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyC => self.capture(),
            KeyCode::KeyE => self.enhance(),
            KeyCode::KeyG => self.generate(),
            KeyCode::KeyS => self.save(),
            KeyCode::KeyR => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.reset_view();
                }
            }
            _ => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.keyboard_event(event);
                }
            }
        }
    }
}

impl ApplicationHandler<AppEvent> for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let size = SurfaceSize::for_container_width(self.config.viewer.width);
        let window = match event_loop.create_window(
            WindowAttributes::default()
                .with_title("snapforge")
                .with_inner_size(PhysicalSize::new(size.width, size.height)),
        ) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let loader = ToolkitLoader::with_fallback(
            self.config.toolkit.clone(),
            self.config.viewer.navigation(),
        );
        self.viewer = Some(Viewer::new(Container::for_window(window.clone()), loader));
        self.window = Some(window);
        self.refresh_title();

        if let Some(path) = self.preload.take() {
            match self.session.open_local(&path) {
                Ok(reference) => self.display(&reference),
                Err(e) => self.set_status(format!("{}: {}", path.display(), e)),
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::ModelReady(reference) => self.display(&reference),
            AppEvent::StageFinished { stage, error } => match error {
                Some(error) => self.set_status(error),
                // the display that followed already reported
                None if stage == Stage::Generate3D => self.refresh_title(),
                None => {
                    let status = self.session.stage_result(stage).status(stage);
                    self.set_status(status);
                }
            },
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { ref event, .. } => self.handle_key(event_loop, event),
            WindowEvent::Resized(PhysicalSize { width, .. }) => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.on_resize(width);
                }
            }
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                if let Some(viewer) = self.viewer.as_mut() {
                    if let Err(e) = viewer.render_frame() {
                        log::warn!("Frame skipped: {}", e);
                    }
                }
            }
            other => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.window_event(&other);
                }
            }
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.device_event(&event);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let (Some(window), Some(viewer)) = (&self.window, &self.viewer) {
            if viewer.is_rendering() {
                window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.discard();
        }
        self.session.teardown();
    }
}
