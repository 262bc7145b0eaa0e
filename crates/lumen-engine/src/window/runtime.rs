use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::device::{Gpu, GpuInit, SurfaceErrorAction, WgpuDevice};
use crate::render::Renderer;
use crate::source::RenderSource;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Close the window when Escape is pressed.
    pub exit_on_escape: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            exit_on_escape: true,
        }
    }
}

/// Event-loop driver: one window, one surface, one [`Renderer`].
pub struct Runtime;

impl Runtime {
    /// Opens a window and renders the source produced by `make_source` on
    /// every redraw until the window closes.
    ///
    /// `make_source` runs once the window and GPU exist (and again if the
    /// platform tears the window down and resumes). A renderer setup error
    /// ends the loop and is returned.
    pub fn run<S, F>(config: RuntimeConfig, gpu_init: GpuInit, make_source: F) -> Result<()>
    where
        S: RenderSource + 'static,
        F: FnMut() -> S + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, make_source);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<S, F>
where
    S: RenderSource,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    make_source: F,

    entry: Option<WindowEntry>,
    renderer: Option<Renderer<WgpuDevice, S>>,
    failure: Option<anyhow::Error>,
}

impl<S, F> AppState<S, F>
where
    S: RenderSource,
    F: FnMut() -> S,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, make_source: F) -> Self {
        Self {
            config,
            gpu_init,
            make_source,
            entry: None,
            renderer: None,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure = Some(err);
        event_loop.exit();
    }

    fn open_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        let source = (self.make_source)();
        let renderer = entry
            .with_gpu(|gpu| Renderer::new(gpu.render_device(), source))
            .context("renderer setup failed")?;

        entry.with_window(|w| w.request_redraw());
        self.entry = Some(entry);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn close_window(&mut self, event_loop: &ActiveEventLoop) {
        // Renderer resources go before the surface they were drawn to.
        self.renderer = None;
        self.entry = None;
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(entry), Some(renderer)) = (self.entry.as_mut(), self.renderer.as_mut()) else {
            return;
        };

        match entry.with_gpu_mut(|gpu| renderer.draw(gpu)) {
            Ok(()) => {}
            Err(SurfaceErrorAction::Fatal) => {
                log::error!("surface lost beyond recovery; exiting");
                self.close_window(event_loop);
            }
            Err(SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame) => {}
        }
    }
}

impl<S, F> ApplicationHandler for AppState<S, F>
where
    S: RenderSource,
    F: FnMut() -> S,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }
        if let Err(err) = self.open_window(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.renderer = None;
        self.entry = None;
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: one frame per display refresh under Fifo.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close_window(event_loop),

            WindowEvent::KeyboardInput { event, .. }
                if self.config.exit_on_escape
                    && event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                self.close_window(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.entry.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
