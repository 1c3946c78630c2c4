use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{UVec2, Vec2};
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::assets::FontAtlas;
use crate::config::TransitionConfig;
use crate::draw2d::{Canvas, Color, Draw2d};
use crate::error::EngineError;
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::presentation::Presentation;
use crate::transition::{
    Action, FrameOutcome, HandoffOutcome, Launcher, TransitionRunner, draw_status,
};

pub const CONTROLS_HINT: &str = "F11: Fullscreen | SPACE: Skip | ESC: Exit";
pub const FULLSCREEN_HINT: &str = "F11: Window Mode | ESC: Exit";
/// Rasterized size of the text atlas: the largest status text size, so
/// everything else is drawn scaled down.
const FONT_SIZE: f32 = 48.0;
const HINT_SIZE: f32 = 16.0;
/// Distance from the bottom-right corner of the window, in surface pixels.
const HINT_MARGIN: f32 = 10.0;
const HINT_COLOR: Color = Color::rgb8(150, 150, 150);
/// Extra wait for the hand-off on top of its own retry budget.
const HANDOFF_GRACE: Duration = Duration::from_secs(1);

/// Open a window and play one transition.
///
/// Returns once the transition finishes or the user quits, after giving a
/// pending hand-off a bounded amount of time to report back.
///
/// # Example
/// ```no_run
/// let config = lightjump::TransitionConfig::default().with_seed(7);
/// let outcome = lightjump::run(config)?;
/// println!("{outcome:?}");
/// # Ok::<(), lightjump::EngineError>(())
/// ```
pub fn run(config: TransitionConfig) -> Result<Option<HandoffOutcome>, EngineError> {
    config.validate()?;
    let launcher: Option<Arc<dyn Launcher>> = if config.handoff.enabled {
        Some(Arc::new(config.handoff.launcher()))
    } else {
        None
    };
    let grace = config.handoff.retry_policy().worst_case() + HANDOFF_GRACE;

    run_with_launcher(config, launcher, grace)
}

/// Like [`run`], with a caller-supplied hand-off.
pub fn run_with_launcher(
    config: TransitionConfig,
    launcher: Option<Arc<dyn Launcher>>,
    grace: Duration,
) -> Result<Option<HandoffOutcome>, EngineError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = LightjumpApp {
        state: AppState::Pending { config, launcher },
        error: None,
    };
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.error.take() {
        return Err(err);
    }
    match app.state {
        AppState::Running(running) => Ok(running.runner.finish(grace)),
        _ => Ok(None),
    }
}

struct LightjumpApp {
    state: AppState,
    error: Option<EngineError>,
}

enum AppState {
    Pending {
        config: TransitionConfig,
        launcher: Option<Arc<dyn Launcher>>,
    },
    /// Placeholder while the window is being created.
    Starting,
    Running(Box<Running>),
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    draw_2d: Draw2d,
    canvas: Canvas,
    presentation: Presentation,
    input: Input,
    runner: TransitionRunner,
    font: Option<FontAtlas>,
}

impl Running {
    fn new(
        event_loop: &ActiveEventLoop,
        config: TransitionConfig,
        launcher: Option<Arc<dyn Launcher>>,
    ) -> Result<Self, EngineError> {
        let window = &config.window;
        let mut attrs = WindowAttributes::default()
            .with_title(&window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(window.width, window.height));
        if window.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(event_loop.create_window(attrs)?);
        let gpu = GpuContext::new(window.clone())?;
        let mut draw_2d = Draw2d::new(&gpu);

        let mut presentation = Presentation::new(
            config.reference.as_vec2(),
            UVec2::new(gpu.width(), gpu.height()),
        );
        presentation.set_fullscreen(config.window.fullscreen);

        let font = config.font.as_deref().and_then(|path| {
            match FontAtlas::from_file(&gpu, path, FONT_SIZE) {
                Ok(font) => {
                    draw_2d.set_font(&gpu, &font);
                    Some(font)
                }
                Err(err) => {
                    warn!(error = %err, "text disabled");
                    None
                }
            }
        });

        let runner = TransitionRunner::new(&config, launcher, Instant::now())?;
        info!(
            width = gpu.width(),
            height = gpu.height(),
            fullscreen = config.window.fullscreen,
            "window ready"
        );
        window.request_redraw();

        Ok(Self {
            window,
            gpu,
            draw_2d,
            canvas: Canvas::new(),
            presentation,
            input: Input::new(),
            runner,
            font,
        })
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        for action in self.input.actions() {
            self.runner.apply(action);
        }
        if self.input.toggle_fullscreen() {
            self.toggle_fullscreen();
        }
        self.input.begin_frame();

        if self.runner.frame(Instant::now(), &mut self.canvas) == FrameOutcome::Exit {
            event_loop.exit();
            return;
        }
        self.runner.poll_handoff();

        self.draw_text();
        self.present();
    }

    fn toggle_fullscreen(&mut self) {
        let fullscreen = !self.presentation.is_fullscreen();
        self.window
            .set_fullscreen(fullscreen.then_some(Fullscreen::Borderless(None)));
        self.presentation.set_fullscreen(fullscreen);
        info!(fullscreen, "presentation mode changed");
    }

    fn resize(&mut self, width: u32, height: u32) {
        let size = self.presentation.resize(width, height);
        self.gpu.resize(size.x, size.y);
    }

    /// Status lines in the bottom-left corner, controls hint in the
    /// bottom-right. Both are anchored to the window, not the reference
    /// plane, so cover-scaling never crops them.
    fn draw_text(&mut self) {
        let Some(font) = &self.font else {
            return;
        };
        let surface = self.presentation.surface_size().as_vec2();
        let bottom_left = self.presentation.to_reference(Vec2::new(0.0, surface.y));
        draw_status(&mut self.canvas, font, bottom_left, self.runner.status_lines());

        let hint = hint_text(self.presentation.is_fullscreen());
        let scale = HINT_SIZE / font.size();
        let text_size = Vec2::new(font.measure(hint), font.line_height()) * scale;
        let position = hint_origin(&self.presentation, text_size);
        self.canvas.text_scaled(font, position, hint, scale, HINT_COLOR);
    }

    fn present(&mut self) {
        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.presentation.surface_size();
                warn!(width = size.x, height = size.y, "surface lost, reconfiguring");
                self.gpu.resize(size.x, size.y);
                return;
            }
            Err(err) => {
                warn!(error = %err, "dropping frame");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Transition Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Transition Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.draw_2d
                .render(&self.gpu, &mut render_pass, &self.canvas, &self.presentation);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        output.present();
    }
}

fn hint_text(fullscreen: bool) -> &'static str {
    if fullscreen { FULLSCREEN_HINT } else { CONTROLS_HINT }
}

/// Reference-space position of text of `text_size` (reference units) so it
/// sits in the bottom-right corner of the surface.
fn hint_origin(presentation: &Presentation, text_size: Vec2) -> Vec2 {
    let surface = presentation.surface_size().as_vec2();
    let corner = surface - text_size * presentation.scale() - Vec2::splat(HINT_MARGIN);
    presentation.to_reference(corner)
}

impl ApplicationHandler for LightjumpApp {
    fn new_events(&mut self, _event_loop: &ActiveEventLoop, cause: StartCause) {
        if let (StartCause::ResumeTimeReached { .. }, AppState::Running(running)) =
            (cause, &self.state)
        {
            running.window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.state, AppState::Pending { .. }) {
            return;
        }
        let AppState::Pending { config, launcher } =
            std::mem::replace(&mut self.state, AppState::Starting)
        else {
            return;
        };

        match Running::new(event_loop, config, launcher) {
            Ok(running) => self.state = AppState::Running(Box::new(running)),
            Err(err) => {
                error!(error = %err, "failed to start");
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppState::Running(running) = &mut self.state else {
            return;
        };

        running.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                running.runner.apply(Action::Quit);
                running.window.request_redraw();
            }
            WindowEvent::Resized(size) => {
                running.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                running.redraw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let AppState::Running(running) = &self.state {
            event_loop.set_control_flow(ControlFlow::WaitUntil(running.runner.next_deadline()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_switches_with_presentation_mode() {
        assert_eq!(hint_text(false), CONTROLS_HINT);
        assert_eq!(hint_text(true), "F11: Window Mode | ESC: Exit");
    }

    #[test]
    fn hint_sits_in_bottom_right_corner() {
        let presentation = Presentation::new(Vec2::new(1920.0, 1080.0), UVec2::new(1920, 1080));
        let origin = hint_origin(&presentation, Vec2::new(300.0, 20.0));
        assert_eq!(origin, Vec2::new(1610.0, 1050.0));
    }

    #[test]
    fn hint_tracks_window_corner_when_scaled() {
        let presentation = Presentation::new(Vec2::new(1920.0, 1080.0), UVec2::new(1200, 800));
        let text = Vec2::new(300.0, 20.0);
        let origin = hint_origin(&presentation, text);
        let bottom_right = presentation.to_surface(origin + text);
        assert!((bottom_right.x - 1190.0).abs() < 1e-2);
        assert!((bottom_right.y - 790.0).abs() < 1e-2);
    }
}
