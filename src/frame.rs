//! # Frame Context
//!
//! Per-frame state for an interactive viewer: the camera, frame timing, the
//! held movement keys and whether the window should close. Input handlers
//! receive it by `&mut` instead of reaching for globals.
//!
//! ```
//! use std::time::{Duration, Instant};
//! use pinhole::{frame::FrameContext, gfx::camera::MoveDirection};
//!
//! let mut frame = FrameContext::new(800, 600);
//! let start = Instant::now();
//! frame.advance(start);
//! frame.key_changed(MoveDirection::Forward, true);
//! frame.advance(start + Duration::from_millis(500));
//! assert!((frame.camera.position.z - (3.0 - 1.25)).abs() < 1e-4);
//! ```

use std::time::Instant;

use winit::{
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::gfx::camera::{
    camera_controller::scroll_amount, movement_for_key, CameraController, CameraSettings,
    MoveDirection, OrbitCamera,
};

/// Seconds between consecutive frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTimer {
    last: Option<Instant>,
    delta: f32,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a new frame at `now` and returns the seconds since the previous
    /// one; zero on the first frame.
    pub fn tick(&mut self, now: Instant) -> f32 {
        self.delta = match self.last {
            Some(last) => now.saturating_duration_since(last).as_secs_f32(),
            None => 0.0,
        };
        self.last = Some(now);
        self.delta
    }

    /// Seconds measured by the last [`tick`](Self::tick).
    pub fn delta(&self) -> f32 {
        self.delta
    }
}

/// Everything input handlers may read or change during a frame.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub camera: OrbitCamera,
    pub timer: FrameTimer,
    pub controller: CameraController,
    close_requested: bool,
}

impl FrameContext {
    /// A context with a default camera for a `width` x `height` viewport.
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = OrbitCamera::with_settings(CameraSettings::default());
        camera.set_aspect(width, height);
        camera.recompute_projection();
        Self::with_camera(camera)
    }

    pub fn with_camera(camera: OrbitCamera) -> Self {
        Self {
            camera,
            timer: FrameTimer::new(),
            controller: CameraController::new(),
            close_requested: false,
        }
    }

    pub fn key_changed(&mut self, direction: MoveDirection, pressed: bool) {
        self.controller.set_held(direction, pressed);
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        self.camera.look_at_cursor(x, y);
    }

    /// Vertical scroll in lines; positive zooms in.
    pub fn scrolled(&mut self, dy: f32) {
        self.camera.apply_scroll(dy);
    }

    pub fn resized(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// Starts a frame at `now`: moves the camera for every held key and
    /// recomputes view and projection. Returns the elapsed seconds.
    pub fn advance(&mut self, now: Instant) -> f32 {
        let elapsed = self.timer.tick(now);
        self.controller.update_camera(&mut self.camera, elapsed);
        self.camera.update();
        elapsed
    }

    /// Escape closes; movement keys update the held set.
    pub fn handle_key(&mut self, key: KeyCode, state: ElementState) -> bool {
        if key == KeyCode::Escape {
            if state == ElementState::Pressed {
                self.request_close();
            }
            return true;
        }
        match movement_for_key(key) {
            Some(direction) => {
                self.key_changed(direction, state == ElementState::Pressed);
                true
            }
            None => false,
        }
    }

    /// Applies a window event. Returns `true` when the event was consumed.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state,
                        ..
                    },
                ..
            } => self.handle_key(*key_code, *state),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(position.x, position.y);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.camera.reset_cursor();
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scrolled(scroll_amount(delta));
                true
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.resized(*width, *height);
                false
            }
            WindowEvent::Focused(false) => {
                self.controller.release_all();
                false
            }
            WindowEvent::CloseRequested => {
                self.request_close();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use winit::{
        dpi::PhysicalPosition,
        event::{DeviceId, MouseScrollDelta, TouchPhase},
    };

    fn device_id() -> DeviceId {
        // SAFETY: only used as an opaque value in synthetic events
        unsafe { DeviceId::dummy() }
    }

    #[test]
    fn test_first_advance_is_zero() {
        let mut frame = FrameContext::new(800, 600);
        frame.key_changed(MoveDirection::Forward, true);
        let start = frame.camera.position;

        assert_eq!(frame.advance(Instant::now()), 0.0);
        assert_eq!(frame.camera.position, start);
    }

    #[test]
    fn test_held_keys_move_with_elapsed_time() {
        let mut frame = FrameContext::new(800, 600);
        let start = Instant::now();
        frame.advance(start);

        frame.handle_key(KeyCode::KeyD, ElementState::Pressed);
        let elapsed = frame.advance(start + Duration::from_secs(2));
        assert!((elapsed - 2.0).abs() < 1e-6);
        assert!((frame.camera.position.x - 5.0).abs() < 1e-4);

        frame.handle_key(KeyCode::KeyD, ElementState::Released);
        frame.advance(start + Duration::from_secs(3));
        assert!((frame.camera.position.x - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_escape_requests_close() {
        let mut frame = FrameContext::new(800, 600);
        assert!(!frame.close_requested());
        assert!(frame.handle_key(KeyCode::Escape, ElementState::Pressed));
        assert!(frame.close_requested());
        assert!(!frame.handle_key(KeyCode::KeyQ, ElementState::Pressed));
    }

    #[test]
    fn test_window_events_drive_the_camera() {
        let mut frame = FrameContext::new(800, 600);
        let cursor = |x, y| WindowEvent::CursorMoved {
            device_id: device_id(),
            position: PhysicalPosition::new(x, y),
        };

        assert!(frame.handle_window_event(&cursor(400.0, 300.0)));
        assert_eq!(frame.camera.yaw(), -90.0);
        frame.handle_window_event(&cursor(420.0, 300.0));
        assert!((frame.camera.yaw() - (-89.0)).abs() < 1e-5);

        frame.handle_window_event(&WindowEvent::MouseWheel {
            device_id: device_id(),
            delta: MouseScrollDelta::LineDelta(0.0, 5.0),
            phase: TouchPhase::Moved,
        });
        assert_eq!(frame.camera.fov(), 40.0);

        frame.handle_window_event(&WindowEvent::Resized(PhysicalSize::new(1000, 500)));
        assert!((frame.camera.aspect - 2.0).abs() < 1e-6);

        assert!(frame.handle_window_event(&WindowEvent::CloseRequested));
        assert!(frame.close_requested());
    }

    #[test]
    fn test_losing_focus_releases_keys() {
        let mut frame = FrameContext::new(800, 600);
        frame.key_changed(MoveDirection::Left, true);
        frame.handle_window_event(&WindowEvent::Focused(false));
        assert_eq!(frame.controller.held().count(), 0);
    }
}
