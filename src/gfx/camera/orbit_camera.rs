use super::{
    camera_controller::{CursorTracker, MoveDirection},
    camera_utils::{convert_matrix4_to_array, Camera, CameraUniform},
};
use crate::gfx::{context::RenderContext, resources::ShaderProgram};
use cgmath::*;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Pitch stays strictly inside ±90° so the view never flips over the pole.
pub const PITCH_LIMIT: f32 = 89.0;

/// Smallest field of view reachable by zooming, in degrees.
pub const MIN_FOV: f32 = 1.0;

/// Depth range convention of the projection matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipSpace {
    /// Depth in [-1, 1]
    #[default]
    OpenGl,
    /// Depth in [0, 1]
    Wgpu,
}

/// Construction parameters of an [`OrbitCamera`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub aspect: f32,
    pub position: Vector3<f32>,
    pub up: Vector3<f32>,
    /// Degrees; -90 looks down -Z.
    pub yaw: f32,
    /// Degrees
    pub pitch: f32,
    /// Degrees of rotation per unit of cursor movement
    pub sensitivity: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub max_fov: f32,
    pub near: f32,
    pub far: f32,
    /// Units per second
    pub movement_speed: f32,
    pub clip_space: ClipSpace,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            aspect: 800.0 / 600.0,
            position: Vector3::new(0.0, 0.0, 3.0),
            up: Vector3::unit_y(),
            yaw: -90.0,
            pitch: 0.0,
            sensitivity: 0.05,
            fov: 45.0,
            max_fov: 55.0,
            near: 0.1,
            far: 100.0,
            movement_speed: 2.5,
            clip_space: ClipSpace::OpenGl,
        }
    }
}

impl CameraSettings {
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_position(mut self, position: Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    pub fn with_fov(mut self, fov: f32, max_fov: f32) -> Self {
        self.fov = fov;
        self.max_fov = max_fov;
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn with_clip_space(mut self, clip_space: ClipSpace) -> Self {
        self.clip_space = clip_space;
        self
    }
}

/// A first-person camera steered by yaw and pitch.
///
/// `view` and `projection` are caches: input methods only change the pose,
/// and [`recompute_view`](Self::recompute_view) /
/// [`recompute_projection`](Self::recompute_projection) (or
/// [`update`](Self::update)) refresh the matrices.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub position: Vector3<f32>,
    pub up: Vector3<f32>,
    front: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    fov: f32,
    max_fov: f32,
    pub aspect: f32,
    pub sensitivity: f32,
    pub znear: f32,
    pub zfar: f32,
    pub movement_speed: f32,
    pub clip_space: ClipSpace,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    /// Per-draw scratch transform pushed alongside view and projection.
    pub model: Matrix4<f32>,
    cursor: CursorTracker,
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection * self.view
    }
}

impl OrbitCamera {
    /// Camera at the default pose with the given aspect ratio.
    pub fn new(aspect: f32) -> Self {
        Self::with_settings(CameraSettings::default().with_aspect(aspect))
    }

    pub fn with_settings(settings: CameraSettings) -> Self {
        let mut camera = Self {
            position: settings.position,
            up: settings.up,
            // Looking down -Z until the first look input
            front: Vector3::new(0.0, 0.0, -1.0),
            yaw: settings.yaw,
            pitch: settings.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            fov: settings.fov.clamp(MIN_FOV, settings.max_fov.max(MIN_FOV)),
            max_fov: settings.max_fov.max(MIN_FOV),
            aspect: settings.aspect,
            sensitivity: settings.sensitivity,
            znear: settings.near,
            zfar: settings.far,
            movement_speed: settings.movement_speed,
            clip_space: settings.clip_space,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            model: Matrix4::identity(),
            cursor: CursorTracker::default(),
        };
        camera.update();
        camera
    }

    /// `view = look_at(position, position + front, up)`
    pub fn recompute_view(&mut self) {
        let eye = Point3::from_vec(self.position);
        let target = Point3::from_vec(self.position + self.front);
        self.view = Matrix4::look_at_rh(eye, target, self.up);
    }

    /// Perspective projection from the current fov, aspect and depth range.
    pub fn recompute_projection(&mut self) {
        let projection = perspective(Deg(self.fov), self.aspect, self.znear, self.zfar);
        self.projection = match self.clip_space {
            ClipSpace::OpenGl => projection,
            ClipSpace::Wgpu => OPENGL_TO_WGPU_MATRIX * projection,
        };
    }

    /// Recomputes both cached matrices.
    pub fn update(&mut self) {
        self.recompute_view();
        self.recompute_projection();
    }

    /// Moves `step` units in `direction`: along `front` for forward and
    /// backward, along the right vector for strafing.
    pub fn move_by(&mut self, direction: MoveDirection, step: f32) {
        match direction {
            MoveDirection::Forward => self.position += self.front * step,
            MoveDirection::Backward => self.position -= self.front * step,
            MoveDirection::Left => self.position -= self.right() * step,
            MoveDirection::Right => self.position += self.right() * step,
        }
    }

    /// Moves for `elapsed_seconds` at the configured speed.
    pub fn apply_movement(&mut self, direction: MoveDirection, elapsed_seconds: f32) {
        self.move_by(direction, self.movement_speed * elapsed_seconds);
    }

    /// Adds angles in degrees, clamps pitch and recomputes `front`.
    pub fn rotate(&mut self, yaw_offset: f32, pitch_offset: f32) {
        self.yaw += yaw_offset;
        self.pitch = (self.pitch + pitch_offset).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
    }

    /// Rotates by a cursor delta scaled by the sensitivity.
    ///
    /// `dy` is positive when the cursor moved up.
    pub fn apply_look(&mut self, dx: f32, dy: f32) {
        self.rotate(dx * self.sensitivity, dy * self.sensitivity);
    }

    /// Rotates from an absolute cursor position. The first position seen
    /// only seeds the tracker, so it never causes a jump.
    pub fn look_at_cursor(&mut self, x: f64, y: f64) {
        let (dx, dy) = self.cursor.delta(x, y);
        self.apply_look(dx, dy);
    }

    /// Forgets the last cursor position, e.g. after the cursor was released.
    pub fn reset_cursor(&mut self) {
        self.cursor.reset();
    }

    /// Zooms by narrowing the field of view.
    pub fn apply_scroll(&mut self, delta: f32) {
        self.set_fov(self.fov - delta);
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov.clamp(MIN_FOV, self.max_fov);
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn set_model(&mut self, model: Matrix4<f32>) {
        self.model = model;
    }

    /// Writes the cached view and projection and the model matrix into the
    /// named uniforms of `program`.
    pub fn push_to_shader<C: RenderContext + ?Sized>(
        &self,
        ctx: &mut C,
        program: &ShaderProgram,
        view_name: &str,
        projection_name: &str,
        model_name: &str,
    ) {
        program.set_matrix4(ctx, view_name, self.view);
        program.set_matrix4(ctx, projection_name, self.projection);
        program.set_matrix4(ctx, model_name, self.model);
    }

    /// Unit vector pointing to the camera's right.
    pub fn right(&self) -> Vector3<f32> {
        self.front.cross(self.up).normalize()
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn max_fov(&self) -> f32 {
        self.max_fov
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn camera_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_position: [self.position.x, self.position.y, self.position.z, 1.0],
            view_proj: convert_matrix4_to_array(self.build_view_projection_matrix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{
        context::{UniformKind, UniformValue},
        recording::RecordingContext,
        resources::ProgramDesc,
    };

    const EPS: f32 = 1e-5;

    fn assert_vec_close(actual: Vector3<f32>, expected: Vector3<f32>) {
        assert!(
            (actual - expected).magnitude() < EPS,
            "expected {expected:?}, got {actual:?}"
        );
    }

    fn at_origin() -> OrbitCamera {
        OrbitCamera::with_settings(
            CameraSettings::default()
                .with_aspect(800.0 / 600.0)
                .with_position(Vector3::zero()),
        )
    }

    /// Deterministic pseudo-random values in [-range, range).
    fn noise(seed: &mut u64, range: f32) -> f32 {
        *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let unit = (*seed >> 40) as f32 / (1u64 << 24) as f32;
        (unit * 2.0 - 1.0) * range
    }

    #[test]
    fn test_initial_pose() {
        let camera = at_origin();
        assert_vec_close(camera.front(), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(camera.yaw(), -90.0);
        assert_eq!(camera.pitch(), 0.0);
        assert_eq!(camera.fov(), 45.0);
        assert_eq!(camera.model, Matrix4::identity());
    }

    #[test]
    fn test_forward_for_one_second() {
        let mut camera = at_origin();
        camera.apply_movement(MoveDirection::Forward, 1.0);
        assert_vec_close(camera.position, Vector3::new(0.0, 0.0, -2.5));

        camera.apply_movement(MoveDirection::Backward, 0.5);
        assert_vec_close(camera.position, Vector3::new(0.0, 0.0, -1.25));
    }

    #[test]
    fn test_strafe_uses_right_vector() {
        let mut camera = at_origin();
        camera.apply_movement(MoveDirection::Right, 1.0);
        assert_vec_close(camera.position, Vector3::new(2.5, 0.0, 0.0));

        camera.apply_movement(MoveDirection::Left, 2.0);
        assert_vec_close(camera.position, Vector3::new(-2.5, 0.0, 0.0));
    }

    #[test]
    fn test_recompute_view_is_idempotent() {
        let mut camera = at_origin();
        camera.apply_look(123.0, -45.0);
        camera.apply_movement(MoveDirection::Forward, 0.3);

        camera.recompute_view();
        let first = camera.view();
        camera.recompute_view();
        assert_eq!(first, camera.view());

        camera.recompute_projection();
        let projection = camera.projection();
        camera.recompute_projection();
        assert_eq!(projection, camera.projection());
    }

    #[test]
    fn test_view_matches_look_direction() {
        let mut camera = at_origin();
        camera.recompute_view();
        // A point straight ahead lands on the negative view-space Z axis
        let ahead = camera.view() * Vector4::new(0.0, 0.0, -5.0, 1.0);
        assert!((ahead.x).abs() < EPS && (ahead.y).abs() < EPS);
        assert!((ahead.z + 5.0).abs() < EPS);
    }

    #[test]
    fn test_pitch_is_always_clamped() {
        let mut camera = at_origin();
        let mut seed = 7;
        for _ in 0..1000 {
            let dx = noise(&mut seed, 5000.0);
            let dy = noise(&mut seed, 5000.0);
            camera.apply_look(dx, dy);
            assert!((-PITCH_LIMIT..=PITCH_LIMIT).contains(&camera.pitch()));
            assert!((camera.front().magnitude() - 1.0).abs() < EPS);
        }

        camera.apply_look(0.0, 1.0e6);
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        camera.apply_look(0.0, -1.0e6);
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
    }

    #[test]
    fn test_fov_is_always_clamped() {
        let mut camera = at_origin();
        let mut seed = 11;
        for _ in 0..1000 {
            camera.apply_scroll(noise(&mut seed, 30.0));
            assert!((MIN_FOV..=camera.max_fov()).contains(&camera.fov()));
        }

        camera.apply_scroll(1000.0);
        assert_eq!(camera.fov(), MIN_FOV);
        camera.apply_scroll(-1000.0);
        assert_eq!(camera.fov(), 55.0);
    }

    #[test]
    fn test_scroll_zooms_in() {
        let mut camera = at_origin();
        camera.apply_scroll(2.0);
        assert_eq!(camera.fov(), 43.0);
    }

    #[test]
    fn test_first_cursor_sample_is_suppressed() {
        for (x, y) in [(0.0, 0.0), (400.0, 300.0), (-1.0e5, 9.9e4)] {
            let mut camera = at_origin();
            camera.look_at_cursor(x, y);
            assert_eq!(camera.yaw(), -90.0);
            assert_eq!(camera.pitch(), 0.0);
            assert_vec_close(camera.front(), Vector3::new(0.0, 0.0, -1.0));
        }
    }

    #[test]
    fn test_cursor_deltas_after_first_sample() {
        let mut camera = at_origin();
        camera.look_at_cursor(400.0, 300.0);
        // Right by 100px, up by 20px
        camera.look_at_cursor(500.0, 280.0);
        assert!((camera.yaw() - (-90.0 + 5.0)).abs() < EPS);
        assert!((camera.pitch() - 1.0).abs() < EPS);

        camera.reset_cursor();
        camera.look_at_cursor(0.0, 0.0);
        assert!((camera.yaw() - (-85.0)).abs() < EPS);
    }

    #[test]
    fn test_wgpu_clip_space_maps_near_plane_to_zero() {
        let mut camera = OrbitCamera::with_settings(
            CameraSettings::default()
                .with_position(Vector3::zero())
                .with_clip_space(ClipSpace::Wgpu),
        );
        camera.update();
        let near = camera.build_view_projection_matrix() * Vector4::new(0.0, 0.0, -0.1, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);

        camera.clip_space = ClipSpace::OpenGl;
        camera.recompute_projection();
        let near = camera.build_view_projection_matrix() * Vector4::new(0.0, 0.0, -0.1, 1.0);
        assert!((near.z / near.w + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_push_to_shader_writes_three_matrices() {
        let mut ctx = RecordingContext::new();
        let program = ShaderProgram::new(
            &mut ctx,
            &ProgramDesc::new("camera", "src")
                .with_uniform("model", UniformKind::Mat4)
                .with_uniform("view", UniformKind::Mat4)
                .with_uniform("projection", UniformKind::Mat4),
        )
        .unwrap();
        let mut camera = at_origin();
        camera.set_model(Matrix4::from_scale(2.0));

        camera.push_to_shader(&mut ctx, &program, "view", "projection", "model");

        assert_eq!(
            ctx.uniform(program.id(), "view"),
            Some(UniformValue::from(camera.view()))
        );
        assert_eq!(
            ctx.uniform(program.id(), "projection"),
            Some(UniformValue::from(camera.projection()))
        );
        assert_eq!(
            ctx.uniform(program.id(), "model"),
            Some(UniformValue::from(Matrix4::from_scale(2.0f32)))
        );
    }

    #[test]
    fn test_set_aspect_ignores_zero_height() {
        let mut camera = at_origin();
        camera.set_aspect(1920, 0);
        assert!((camera.aspect - 800.0 / 600.0).abs() < EPS);
        camera.set_aspect(1920, 1080);
        assert!((camera.aspect - 16.0 / 9.0).abs() < EPS);
    }
}
