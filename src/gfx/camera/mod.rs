//! First-person camera with yaw/pitch look, WASD movement and scroll zoom.

pub mod camera_controller;
pub mod camera_utils;
pub mod orbit_camera;

// Re-export main types
pub use camera_controller::{movement_for_key, CameraController, CursorTracker, MoveDirection};
pub use camera_utils::{Camera, CameraUniform};
pub use orbit_camera::{CameraSettings, ClipSpace, OrbitCamera, OPENGL_TO_WGPU_MATRIX};
