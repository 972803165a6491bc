use winit::{dpi::PhysicalPosition, event::MouseScrollDelta, keyboard::KeyCode};

use super::orbit_camera::OrbitCamera;

/// Pixels per scroll line when a touchpad reports pixel deltas.
pub const PIXELS_PER_LINE: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
}

impl MoveDirection {
    pub const ALL: [MoveDirection; 4] = [
        MoveDirection::Forward,
        MoveDirection::Backward,
        MoveDirection::Left,
        MoveDirection::Right,
    ];

    fn index(self) -> usize {
        match self {
            MoveDirection::Forward => 0,
            MoveDirection::Backward => 1,
            MoveDirection::Left => 2,
            MoveDirection::Right => 3,
        }
    }
}

/// W/A/S/D and the arrow keys.
pub fn movement_for_key(key: KeyCode) -> Option<MoveDirection> {
    match key {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(MoveDirection::Forward),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(MoveDirection::Backward),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(MoveDirection::Left),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(MoveDirection::Right),
        _ => None,
    }
}

/// Turns absolute cursor positions into deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorTracker {
    last: Option<(f64, f64)>,
}

impl CursorTracker {
    /// Returns `(dx, dy)` with `dy` positive when the cursor moved up
    /// (window y grows downwards). The first call returns `(0, 0)`.
    pub fn delta(&mut self, x: f64, y: f64) -> (f32, f32) {
        let delta = match self.last {
            Some((last_x, last_y)) => ((x - last_x) as f32, (last_y - y) as f32),
            None => (0.0, 0.0),
        };
        self.last = Some((x, y));
        delta
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.last
    }
}

/// Field of view change for one wheel event, positive when zooming in.
pub fn scroll_amount(delta: &MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, scroll) => *scroll,
        MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
            *scroll as f32 / PIXELS_PER_LINE
        }
    }
}

/// Keeps track of which movement keys are held.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraController {
    held: [bool; 4],
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_held(&mut self, direction: MoveDirection, pressed: bool) {
        self.held[direction.index()] = pressed;
    }

    pub fn is_held(&self, direction: MoveDirection) -> bool {
        self.held[direction.index()]
    }

    pub fn held(&self) -> impl Iterator<Item = MoveDirection> + '_ {
        MoveDirection::ALL.into_iter().filter(|d| self.is_held(*d))
    }

    pub fn release_all(&mut self) {
        self.held = [false; 4];
    }

    /// Moves `camera` for every held key. Opposite keys cancel out.
    pub fn update_camera(&self, camera: &mut OrbitCamera, elapsed_seconds: f32) {
        for direction in self.held() {
            camera.apply_movement(direction, elapsed_seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3, Zero};

    #[test]
    fn test_first_delta_is_zero() {
        let mut tracker = CursorTracker::default();
        assert_eq!(tracker.delta(320.0, 240.0), (0.0, 0.0));
        assert_eq!(tracker.delta(330.0, 250.0), (10.0, -10.0));
        assert_eq!(tracker.last(), Some((330.0, 250.0)));

        tracker.reset();
        assert_eq!(tracker.delta(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(movement_for_key(KeyCode::KeyW), Some(MoveDirection::Forward));
        assert_eq!(movement_for_key(KeyCode::ArrowDown), Some(MoveDirection::Backward));
        assert_eq!(movement_for_key(KeyCode::KeyA), Some(MoveDirection::Left));
        assert_eq!(movement_for_key(KeyCode::ArrowRight), Some(MoveDirection::Right));
        assert_eq!(movement_for_key(KeyCode::Escape), None);
    }

    #[test]
    fn test_scroll_amount() {
        assert_eq!(scroll_amount(&MouseScrollDelta::LineDelta(0.0, 2.0)), 2.0);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -32.0));
        assert_eq!(scroll_amount(&pixels), -2.0);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut camera = OrbitCamera::new(1.0);
        camera.position = Vector3::zero();
        let mut controller = CameraController::new();
        controller.set_held(MoveDirection::Forward, true);
        controller.set_held(MoveDirection::Backward, true);

        controller.update_camera(&mut camera, 1.0);
        assert!(camera.position.magnitude() < 1e-5);

        controller.set_held(MoveDirection::Backward, false);
        controller.update_camera(&mut camera, 1.0);
        assert!((camera.position - Vector3::new(0.0, 0.0, -2.5)).magnitude() < 1e-5);

        controller.release_all();
        assert_eq!(controller.held().count(), 0);
    }
}
