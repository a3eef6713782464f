use std::any::Any;
use std::env;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use log::{info, warn};
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{
    DeviceEvent, ElementState, Event, MouseButton as WinitMouseButton, MouseScrollDelta,
    VirtualKeyCode, WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::{CursorGrabMode, Window, WindowBuilder};

use lit_pyramid::config::{WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH};
use lit_pyramid::{
    AppConfig, AppContext, KeyCode, MouseButton, NamedKey, Renderer, Scene, SceneAssets,
    StartupError,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = AppConfig::from_args(env::args().skip(1))?;
    let assets = SceneAssets::load(&config)?;
    println!("{}", assets.summary());

    if config.summary_only {
        return Ok(());
    }
    run_interactive(assets)
}

fn run_interactive(assets: SceneAssets) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let mut event_loop = event_loop.map_err(|panic| {
        StartupError::WindowCreation(format!("event loop: {}", panic_message(panic)))
    })?;

    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .build(&event_loop)
            .map_err(|err| StartupError::WindowCreation(err.to_string()))?,
    );
    capture_cursor(&window);

    let SceneAssets {
        scene,
        mesh,
        programs,
        texture,
        ..
    } = assets;
    let renderer = block_on(Renderer::new(
        Arc::clone(&window),
        &mesh,
        programs,
        &texture,
        scene.clear_color,
    ))?;

    let size = window.inner_size();
    let context = AppContext::new(scene.camera.build(), scene.controls, size.width, size.height);

    let mut app = AppState {
        renderer,
        context,
        scene,
        last_error: None,
    };

    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    let AppState {
        renderer,
        last_error,
        ..
    } = app;
    renderer.destroy()?;
    info!("shut down cleanly");

    match last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn capture_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    if let Err(err) = grabbed {
        warn!("could not capture the cursor: {err}");
    }
    window.set_cursor_visible(false);
}

struct AppState {
    renderer: Renderer,
    context: AppContext,
    scene: Scene,
    last_error: Option<anyhow::Error>,
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => self.context.request_close(),
                    WindowEvent::Focused(focused) => self.context.on_focus(*focused),
                    WindowEvent::Resized(size) => {
                        self.renderer.resize(*size);
                        self.context.on_resize(size.width, size.height);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.resize(**new_inner_size);
                        self.context
                            .on_resize(new_inner_size.width, new_inner_size.height);
                    }
                    WindowEvent::KeyboardInput { input, .. } => {
                        if let Some(key) = input.virtual_keycode.and_then(map_keycode) {
                            self.context
                                .on_key(key, input.state == ElementState::Pressed);
                        }
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        self.context.on_mouse_button(
                            map_mouse_button(*button),
                            *state == ElementState::Pressed,
                        );
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        self.context.on_cursor_moved(position.x, position.y);
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let lines = match delta {
                            MouseScrollDelta::LineDelta(_, y) => *y,
                            MouseScrollDelta::PixelDelta(position) => (position.y / 20.0) as f32,
                        };
                        self.context.on_scroll(lines);
                    }
                    _ => {}
                }
            }
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => self.context.on_mouse_motion(delta.0, delta.1),
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                if let Err(err) =
                    self.renderer
                        .render_frame(&mut self.context, &mut self.scene, Instant::now())
                {
                    match err.downcast_ref::<wgpu::SurfaceError>() {
                        Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            self.renderer.reconfigure();
                        }
                        Some(wgpu::SurfaceError::Timeout) => {
                            warn!("surface timeout; retrying next frame");
                        }
                        Some(wgpu::SurfaceError::OutOfMemory) => {
                            return Err(anyhow!("GPU is out of memory"));
                        }
                        None => return Err(err),
                    }
                }
            }
            Event::MainEventsCleared => {
                if self.context.should_close() {
                    control_flow.set_exit();
                } else {
                    self.renderer.window().request_redraw();
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn map_mouse_button(button: WinitMouseButton) -> MouseButton {
    let index = match button {
        WinitMouseButton::Left => 0,
        WinitMouseButton::Right => 1,
        WinitMouseButton::Middle => 2,
        WinitMouseButton::Other(value) => value.min(u16::from(u8::MAX)) as u8,
    };
    MouseButton::new(index)
}

fn map_keycode(code: VirtualKeyCode) -> Option<KeyCode> {
    use VirtualKeyCode as Key;
    const LETTERS: [Key; 26] = [
        Key::A,
        Key::B,
        Key::C,
        Key::D,
        Key::E,
        Key::F,
        Key::G,
        Key::H,
        Key::I,
        Key::J,
        Key::K,
        Key::L,
        Key::M,
        Key::N,
        Key::O,
        Key::P,
        Key::Q,
        Key::R,
        Key::S,
        Key::T,
        Key::U,
        Key::V,
        Key::W,
        Key::X,
        Key::Y,
        Key::Z,
    ];
    const DIGITS: [Key; 10] = [
        Key::Key0,
        Key::Key1,
        Key::Key2,
        Key::Key3,
        Key::Key4,
        Key::Key5,
        Key::Key6,
        Key::Key7,
        Key::Key8,
        Key::Key9,
    ];
    const FUNCTIONS: [Key; 12] = [
        Key::F1,
        Key::F2,
        Key::F3,
        Key::F4,
        Key::F5,
        Key::F6,
        Key::F7,
        Key::F8,
        Key::F9,
        Key::F10,
        Key::F11,
        Key::F12,
    ];

    if let Some(index) = LETTERS.iter().position(|key| *key == code) {
        return Some(KeyCode::Character((b'A' + index as u8) as char));
    }
    if let Some(index) = DIGITS.iter().position(|key| *key == code) {
        return Some(KeyCode::Digit(index as u8));
    }
    if let Some(index) = FUNCTIONS.iter().position(|key| *key == code) {
        return Some(KeyCode::Function(index as u8 + 1));
    }
    let named = match code {
        Key::Space => NamedKey::Space,
        Key::Return => NamedKey::Enter,
        Key::Tab => NamedKey::Tab,
        Key::Left => NamedKey::Left,
        Key::Right => NamedKey::Right,
        Key::Up => NamedKey::Up,
        Key::Down => NamedKey::Down,
        Key::Escape => NamedKey::Escape,
        Key::LShift => NamedKey::LeftShift,
        Key::RShift => NamedKey::RightShift,
        Key::LControl => NamedKey::LeftCtrl,
        Key::RControl => NamedKey::RightCtrl,
        _ => return None,
    };
    Some(KeyCode::Named(named))
}
