//! Orbit camera, its input controls and the GPU uniform it feeds.
//!
//! [`ArcRotateCamera`] orbits a target point. Its position is derived from two
//! spherical angles and a radius:
//!
//! ```text
//! position = target + radius * (cos(alpha) * sin(beta), cos(beta), sin(alpha) * sin(beta))
//! ```
//!
//! Input never moves the camera directly. Pointer, wheel and keyboard input add
//! to inertial offsets that are applied and decayed once per frame in
//! [`ArcRotateCamera::update`]. Arrow keys add to the offsets on every frame
//! they are held down, independent of the keyboard's repeat rate.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3};
use wgpu::util::DeviceExt;
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    scene::{NodeId, Scene},
    surface::Surface,
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Offsets smaller than this are dropped instead of decayed forever.
const INERTIA_EPSILON: f32 = 0.001;
const MIN_RADIUS: f32 = 0.01;
const ORBIT_KEYS: [KeyCode; 4] = [
    KeyCode::ArrowLeft,
    KeyCode::ArrowRight,
    KeyCode::ArrowUp,
    KeyCode::ArrowDown,
];

#[derive(Clone, Debug)]
pub struct ArcRotateCamera {
    id: NodeId,
    name: String,
    pub alpha: f32,
    pub beta: f32,
    pub radius: f32,
    pub target: Point3<f32>,
    /// Vertical field of view.
    pub fov: Rad<f32>,
    pub min_z: f32,
    pub max_z: f32,
    pub lower_beta_limit: f32,
    pub upper_beta_limit: f32,
    pub lower_radius_limit: Option<f32>,
    pub upper_radius_limit: Option<f32>,
    /// Fraction of an inertial offset that survives each frame.
    pub inertia: f32,
    inertial_alpha_offset: f32,
    inertial_beta_offset: f32,
    inertial_radius_offset: f32,
    inertial_panning: (f32, f32),
    controls: Option<OrbitControls>,
}

impl ArcRotateCamera {
    pub(crate) fn new(
        id: NodeId,
        name: &str,
        alpha: f32,
        beta: f32,
        radius: f32,
        target: Point3<f32>,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            alpha,
            beta,
            radius,
            target,
            fov: Rad(0.8),
            min_z: 1.0,
            max_z: 10000.0,
            lower_beta_limit: 0.01,
            upper_beta_limit: std::f32::consts::PI - 0.01,
            lower_radius_limit: None,
            upper_radius_limit: None,
            inertia: 0.9,
            inertial_alpha_offset: 0.0,
            inertial_beta_offset: 0.0,
            inertial_radius_offset: 0.0,
            inertial_panning: (0.0, 0.0),
            controls: None,
        }
    }

    /// Create a camera orbiting `target` and add it to `scene`.
    ///
    /// The first camera added to a scene becomes its active camera.
    pub fn create<'s>(
        name: &str,
        alpha: f32,
        beta: f32,
        radius: f32,
        target: Point3<f32>,
        scene: &'s mut Scene,
    ) -> &'s mut ArcRotateCamera {
        scene.add_camera(|id| ArcRotateCamera::new(id, name, alpha, beta, radius, target))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Point3<f32> {
        let offset = Vector3::new(
            self.alpha.cos() * self.beta.sin(),
            self.beta.cos(),
            self.alpha.sin() * self.beta.sin(),
        );
        self.target + offset * self.radius
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position(), self.target, Vector3::unit_y())
    }

    pub fn projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fov, aspect, self.min_z, self.max_z)
    }

    pub fn view_proj(&self, aspect: f32) -> Matrix4<f32> {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Bind pointer, wheel and keyboard input on `surface` to this camera.
    ///
    /// With `no_prevent_default` the browser keeps its default handling of input
    /// events on the canvas. Calling this on an attached camera does nothing.
    pub fn attach_control(&mut self, surface: &Surface, no_prevent_default: bool) {
        if self.controls.is_some() {
            log::debug!("camera {} already has controls attached", self.name);
            return;
        }
        surface.set_prevent_default(!no_prevent_default);
        self.bind_controls(no_prevent_default);
    }

    pub(crate) fn bind_controls(&mut self, no_prevent_default: bool) {
        if self.controls.is_none() {
            self.controls = Some(OrbitControls::new(no_prevent_default));
        }
    }

    pub fn detach_control(&mut self) {
        self.controls = None;
    }

    pub fn is_attached(&self) -> bool {
        self.controls.is_some()
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.controls.as_ref()
    }

    /// Feed a window event to the attached controls. Returns whether the event was used.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        if self.controls.is_none() {
            return false;
        }
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(position.x, position.y);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                if let Some(controls) = &mut self.controls {
                    controls.last_pointer = None;
                }
                false
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.pointer_button(*button, state.is_pressed());
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let wheel_delta = match delta {
                    // one notch reports 120 in browsers
                    MouseScrollDelta::LineDelta(_, y) => f64::from(*y) * 120.0,
                    MouseScrollDelta::PixelDelta(position) => position.y,
                };
                self.wheel(wheel_delta as f32);
                true
            }
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => {
                    self.key_input(code, event.state == ElementState::Pressed)
                }
                PhysicalKey::Unidentified(_) => false,
            },
            WindowEvent::Focused(false) => {
                if let Some(controls) = &mut self.controls {
                    controls.held_keys.clear();
                }
                false
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                if let Some(controls) = &mut self.controls {
                    controls.ctrl = modifiers.state().control_key();
                }
                false
            }
            _ => false,
        }
    }

    pub(crate) fn pointer_moved(&mut self, x: f64, y: f64) {
        let Some(controls) = &mut self.controls else {
            return;
        };
        let last = controls.last_pointer.replace((x, y));
        let Some((last_x, last_y)) = last else {
            return;
        };
        let (dx, dy) = ((x - last_x) as f32, (y - last_y) as f32);
        if controls.panning() {
            self.inertial_panning.0 += -dx / controls.panning_sensibility;
            self.inertial_panning.1 += dy / controls.panning_sensibility;
        } else if controls.left_pressed {
            self.inertial_alpha_offset -= dx / controls.angular_sensibility;
            self.inertial_beta_offset -= dy / controls.angular_sensibility;
        }
    }

    pub(crate) fn pointer_button(&mut self, button: MouseButton, pressed: bool) {
        let Some(controls) = &mut self.controls else {
            return;
        };
        match button {
            MouseButton::Left => controls.left_pressed = pressed,
            MouseButton::Right => controls.right_pressed = pressed,
            _ => (),
        }
    }

    pub(crate) fn wheel(&mut self, wheel_delta: f32) {
        let Some(controls) = &self.controls else {
            return;
        };
        self.inertial_radius_offset += wheel_delta / (controls.wheel_precision * 40.0);
    }

    /// Track an arrow key going down or up. Repeated presses of a held key change nothing.
    pub(crate) fn key_input(&mut self, code: KeyCode, pressed: bool) -> bool {
        let Some(controls) = &mut self.controls else {
            return false;
        };
        if !ORBIT_KEYS.contains(&code) {
            return false;
        }
        let held = controls.held_keys.iter().position(|key| *key == code);
        match (pressed, held) {
            (true, None) => controls.held_keys.push(code),
            (false, Some(index)) => {
                controls.held_keys.remove(index);
            }
            _ => (),
        }
        true
    }

    fn apply_held_keys(&mut self) {
        let Some(controls) = &self.controls else {
            return;
        };
        let speed = controls.angular_speed;
        for key in &controls.held_keys {
            match key {
                KeyCode::ArrowLeft => self.inertial_alpha_offset -= speed,
                KeyCode::ArrowRight => self.inertial_alpha_offset += speed,
                KeyCode::ArrowUp => self.inertial_beta_offset -= speed,
                KeyCode::ArrowDown => self.inertial_beta_offset += speed,
                _ => (),
            }
        }
    }

    /// Add held arrow keys, apply and decay pending inertial offsets, then enforce the limits.
    ///
    /// Returns whether the camera moved.
    pub fn update(&mut self) -> bool {
        self.apply_held_keys();
        let mut moved = false;
        if self.inertial_alpha_offset != 0.0
            || self.inertial_beta_offset != 0.0
            || self.inertial_radius_offset != 0.0
        {
            self.alpha += self.inertial_alpha_offset;
            self.beta += self.inertial_beta_offset;
            self.radius -= self.inertial_radius_offset;
            self.inertial_alpha_offset = decay(self.inertial_alpha_offset, self.inertia);
            self.inertial_beta_offset = decay(self.inertial_beta_offset, self.inertia);
            self.inertial_radius_offset = decay(self.inertial_radius_offset, self.inertia);
            moved = true;
        }
        if self.inertial_panning != (0.0, 0.0) {
            let forward = (self.target - self.position()).normalize();
            let right = forward.cross(Vector3::unit_y()).normalize();
            let up = right.cross(forward);
            let shift = right * self.inertial_panning.0 + up * self.inertial_panning.1;
            self.target = Point3::from_vec(self.target.to_vec() + shift);
            self.inertial_panning.0 = decay(self.inertial_panning.0, self.inertia);
            self.inertial_panning.1 = decay(self.inertial_panning.1, self.inertia);
            moved = true;
        }
        self.check_limits();
        moved
    }

    fn check_limits(&mut self) {
        self.beta = self.beta.clamp(self.lower_beta_limit, self.upper_beta_limit);
        if let Some(lower) = self.lower_radius_limit {
            self.radius = self.radius.max(lower);
        }
        if let Some(upper) = self.upper_radius_limit {
            self.radius = self.radius.min(upper);
        }
        self.radius = self.radius.max(MIN_RADIUS);
    }
}

fn decay(offset: f32, inertia: f32) -> f32 {
    let next = offset * inertia;
    if next.abs() < INERTIA_EPSILON { 0.0 } else { next }
}

/// Input state and sensitivities of an attached camera.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    /// Pixels of pointer travel per radian of rotation.
    pub angular_sensibility: f32,
    /// Pixels of pointer travel per unit of panning.
    pub panning_sensibility: f32,
    pub wheel_precision: f32,
    /// Radians added per frame while an arrow key is held.
    pub angular_speed: f32,
    pub no_prevent_default: bool,
    last_pointer: Option<(f64, f64)>,
    left_pressed: bool,
    right_pressed: bool,
    ctrl: bool,
    held_keys: Vec<KeyCode>,
}

impl OrbitControls {
    fn new(no_prevent_default: bool) -> Self {
        Self {
            angular_sensibility: 1000.0,
            panning_sensibility: 1000.0,
            wheel_precision: 3.0,
            angular_speed: 0.01,
            no_prevent_default,
            last_pointer: None,
            left_pressed: false,
            right_pressed: false,
            ctrl: false,
            held_keys: Vec::new(),
        }
    }

    fn panning(&self) -> bool {
        self.right_pressed || (self.left_pressed && self.ctrl)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: cgmath::Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &ArcRotateCamera, aspect: f32) {
        self.view_position = camera.position().to_homogeneous().into();
        self.view_proj = camera.view_proj(aspect).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, camera: &ArcRotateCamera, aspect: f32) {
        self.uniform.update_view_proj(camera, aspect);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    fn camera() -> ArcRotateCamera {
        let mut scene = Scene::new();
        let id = scene.reserve_id();
        ArcRotateCamera::new(id, "Camera", FRAC_PI_2, FRAC_PI_2, 10.0, Point3::origin())
    }

    fn approx(a: Point3<f32>, b: Point3<f32>) -> bool {
        (a - b).magnitude() < 1e-4
    }

    #[test]
    fn position_follows_spherical_coordinates() {
        let mut camera = camera();
        assert!(approx(camera.position(), Point3::new(0.0, 0.0, 10.0)));
        camera.alpha = 0.0;
        assert!(approx(camera.position(), Point3::new(10.0, 0.0, 0.0)));
        camera.beta = 0.01;
        assert!(camera.position().y > 9.99);
    }

    #[test]
    fn input_is_ignored_until_attached() {
        let mut camera = camera();
        camera.pointer_button(MouseButton::Left, true);
        camera.pointer_moved(0.0, 0.0);
        camera.pointer_moved(100.0, 0.0);
        camera.wheel(120.0);
        assert!(!camera.key_input(KeyCode::ArrowLeft, true));
        assert!(!camera.update());
        assert_eq!(camera.alpha, FRAC_PI_2);
        assert_eq!(camera.radius, 10.0);
    }

    #[test]
    fn left_drag_orbits_with_inertia() {
        let mut camera = camera();
        camera.bind_controls(true);
        camera.pointer_button(MouseButton::Left, true);
        camera.pointer_moved(0.0, 0.0);
        camera.pointer_moved(100.0, 0.0);

        assert!(camera.update());
        assert!((camera.alpha - (FRAC_PI_2 - 0.1)).abs() < 1e-6);
        // the remaining offset keeps turning the camera for a while
        assert!(camera.update());
        assert!(camera.alpha < FRAC_PI_2 - 0.1);

        let mut frames = 0;
        while camera.update() {
            frames += 1;
            assert!(frames < 100, "inertia never settled");
        }
        let settled = camera.alpha;
        assert!(!camera.update());
        assert_eq!(camera.alpha, settled);
        // geometric series 0.1 / (1 - 0.9), minus the cut-off tail
        assert!((FRAC_PI_2 - settled - 1.0).abs() < 0.02);
    }

    #[test]
    fn moving_without_a_button_does_nothing() {
        let mut camera = camera();
        camera.bind_controls(true);
        camera.pointer_moved(0.0, 0.0);
        camera.pointer_moved(50.0, 50.0);
        assert!(!camera.update());
    }

    #[test]
    fn wheel_notch_zooms_by_one_unit() {
        let mut camera = camera();
        camera.bind_controls(true);
        camera.wheel(120.0);
        camera.update();
        assert!((camera.radius - 9.0).abs() < 1e-6);
    }

    #[test]
    fn beta_and_radius_are_clamped() {
        let mut camera = camera();
        camera.bind_controls(true);
        camera.key_input(KeyCode::ArrowUp, true);
        for _ in 0..400 {
            camera.update();
        }
        camera.key_input(KeyCode::ArrowUp, false);
        while camera.update() {}
        assert!((camera.beta - 0.01).abs() < 1e-6);

        camera.wheel(120.0 * 100.0);
        while camera.update() {}
        assert!(camera.radius >= MIN_RADIUS);

        camera.lower_radius_limit = Some(2.0);
        camera.update();
        assert_eq!(camera.radius, 2.0);
    }

    #[test]
    fn held_arrow_key_turns_every_frame() {
        let mut camera = camera();
        camera.bind_controls(true);
        assert!(camera.key_input(KeyCode::ArrowRight, true));

        assert!(camera.update());
        assert!((camera.alpha - (FRAC_PI_2 + 0.01)).abs() < 1e-6);
        // 0.009 left over from the first frame plus 0.01 for the second
        assert!(camera.update());
        assert!((camera.alpha - (FRAC_PI_2 + 0.029)).abs() < 1e-6);
    }

    #[test]
    fn key_repeat_does_not_speed_up_the_orbit() {
        let mut camera = camera();
        camera.bind_controls(true);
        for _ in 0..5 {
            camera.key_input(KeyCode::ArrowLeft, true);
        }
        camera.update();
        assert!((camera.alpha - (FRAC_PI_2 - 0.01)).abs() < 1e-6);
    }

    #[test]
    fn released_key_only_leaves_inertia() {
        let mut camera = camera();
        camera.bind_controls(true);
        camera.key_input(KeyCode::ArrowDown, true);
        camera.update();
        camera.update();
        camera.key_input(KeyCode::ArrowDown, false);

        let mut frames = 0;
        while camera.update() {
            frames += 1;
            assert!(frames < 100, "inertia never settled");
        }
        let settled = camera.beta;
        for _ in 0..10 {
            camera.update();
        }
        assert_eq!(camera.beta, settled);
        assert!(settled > FRAC_PI_2);
    }

    #[test]
    fn other_keys_and_focus_loss_are_handled() {
        let mut camera = camera();
        camera.bind_controls(true);
        assert!(!camera.key_input(KeyCode::KeyW, true));
        assert!(!camera.update());

        camera.key_input(KeyCode::ArrowUp, true);
        assert!(!camera.handle_window_event(&WindowEvent::Focused(false)));
        assert!(!camera.update());
        assert_eq!(camera.beta, FRAC_PI_2);
    }

    #[test]
    fn right_drag_pans_the_target() {
        let mut camera = camera();
        camera.bind_controls(true);
        camera.pointer_button(MouseButton::Right, true);
        camera.pointer_moved(0.0, 0.0);
        camera.pointer_moved(100.0, 0.0);
        camera.update();
        assert!(camera.target != Point3::origin());
        assert_eq!(camera.alpha, FRAC_PI_2);
        assert!((camera.target.y).abs() < 1e-6);
    }

    #[test]
    fn attaching_twice_keeps_the_first_controls() {
        let mut camera = camera();
        camera.bind_controls(true);
        camera.pointer_button(MouseButton::Left, true);
        camera.bind_controls(false);
        assert!(camera.controls().map(|c| c.no_prevent_default).unwrap_or(false));
        camera.detach_control();
        assert!(!camera.is_attached());
    }

    #[test]
    fn uniform_holds_eye_position() {
        let camera = camera();
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, 16.0 / 9.0);
        assert!((uniform.view_position[2] - 10.0).abs() < 1e-4);
        assert_eq!(uniform.view_position[3], 1.0);
    }
}
