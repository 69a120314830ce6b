//! Orbit camera, its controller and the camera uniform.
//!
//! The camera circles a target point: `yaw` turns around the world Y axis,
//! `pitch` lifts the eye above the target's horizon and `radius` is the distance
//! between the two. The controller accumulates mouse input and feeds a fixed
//! fraction of it into the camera each frame, so motion eases out after the
//! user lets go.

use std::f32::consts::FRAC_PI_2;

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector2, Vector3, perspective};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta},
};

use crate::{config::CameraConfig, data_structures::aabb::Aabb};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_PITCH: f32 = FRAC_PI_2 - 0.01;
const MIN_RADIUS: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
    pub radius: f32,
}

impl OrbitCamera {
    pub fn new<P: Into<Point3<f32>>>(target: P, yaw: Rad<f32>, pitch: Rad<f32>, radius: f32) -> Self {
        Self {
            target: target.into(),
            yaw,
            pitch: Rad(pitch.0.clamp(-SAFE_PITCH, SAFE_PITCH)),
            radius: radius.max(MIN_RADIUS),
        }
    }

    /// Camera at `eye` looking at `target`.
    pub fn looking_at(eye: Point3<f32>, target: Point3<f32>) -> Self {
        let offset = eye - target;
        let radius = offset.magnitude().max(MIN_RADIUS);
        let yaw = Rad(offset.x.atan2(offset.z));
        let pitch = Rad((offset.y / radius).clamp(-1.0, 1.0).asin());
        Self::new(target, yaw, pitch, radius)
    }

    /// Unit vector from the target towards the eye.
    fn direction(&self) -> Vector3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    pub fn eye(&self) -> Point3<f32> {
        self.target + self.direction() * self.radius
    }

    /// Screen-right in world space.
    pub fn right(&self) -> Vector3<f32> {
        Vector3::unit_y().cross(self.direction()).normalize()
    }

    /// Screen-up in world space.
    pub fn up(&self) -> Vector3<f32> {
        self.direction().cross(self.right()).normalize()
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye(), self.target, Vector3::unit_y())
    }

    /// Aims at the centre of `bounds` from slightly left of, above and a box
    /// diagonal in front of it.
    pub fn frame(bounds: &Aabb) -> Self {
        let center = bounds.center();
        let eye = center + Vector3::new(-0.1, 0.1, bounds.diagonal());
        Self::looking_at(eye, center)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_at(Point3::new(-0.1, 0.1, 5.0), Point3::origin())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn from_config(width: u32, height: u32, config: &CameraConfig) -> Self {
        Self::new(width, height, Rad(config.fov_rad), config.near, config.far)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    None,
    Orbit,
    Pan,
}

/// Turns mouse input into orbit, pan and zoom of an [`OrbitCamera`].
///
/// Left drag orbits, right drag pans in the screen plane, the wheel zooms.
#[derive(Debug)]
pub struct OrbitController {
    rotate_speed: f32,
    zoom_speed: f32,
    pan_speed: f32,
    damping: f32,
    drag: Drag,
    pending_orbit: Vector2<f32>,
    pending_pan: Vector2<f32>,
    pending_zoom: f32,
}

impl OrbitController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            damping: config.damping.clamp(0.01, 1.0),
            drag: Drag::None,
            pending_orbit: Vector2::new(0.0, 0.0),
            pending_pan: Vector2::new(0.0, 0.0),
            pending_zoom: 0.0,
        }
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        self.drag = match (button, state) {
            (MouseButton::Left, ElementState::Pressed) => Drag::Orbit,
            (MouseButton::Right, ElementState::Pressed) => Drag::Pan,
            (_, ElementState::Released) => Drag::None,
            _ => self.drag,
        };
    }

    /// Raw mouse motion in pixels.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        let delta = Vector2::new(dx as f32, dy as f32);
        match self.drag {
            Drag::Orbit => self.pending_orbit += delta,
            Drag::Pan => self.pending_pan += delta,
            Drag::None => (),
        }
    }

    pub fn handle_scroll(&mut self, delta: &MouseScrollDelta) {
        self.pending_zoom += match delta {
            MouseScrollDelta::LineDelta(_, lines) => *lines,
            MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32 / 50.0,
        };
    }

    /// Drops any motion still easing out.
    pub fn stop(&mut self) {
        self.pending_orbit = Vector2::new(0.0, 0.0);
        self.pending_pan = Vector2::new(0.0, 0.0);
        self.pending_zoom = 0.0;
    }

    pub fn is_settled(&self) -> bool {
        self.pending_orbit.magnitude2() < 1e-6
            && self.pending_pan.magnitude2() < 1e-6
            && self.pending_zoom.abs() < 1e-4
    }

    /// Moves `camera` by the damped share of the accumulated input.
    pub fn update(&mut self, camera: &mut OrbitCamera) {
        let orbit = self.pending_orbit * self.damping;
        self.pending_orbit -= orbit;
        camera.yaw -= Rad(orbit.x * self.rotate_speed);
        camera.pitch = Rad((camera.pitch.0 + orbit.y * self.rotate_speed).clamp(-SAFE_PITCH, SAFE_PITCH));

        let pan = self.pending_pan * self.damping;
        self.pending_pan -= pan;
        let scale = camera.radius * 0.002 * self.pan_speed;
        camera.target += (camera.up() * pan.y - camera.right() * pan.x) * scale;

        let zoom = self.pending_zoom * self.damping;
        self.pending_zoom -= zoom;
        camera.radius = (camera.radius * 0.95f32.powf(zoom * self.zoom_speed)).max(MIN_RADIUS);

        if self.is_settled() {
            self.stop();
        }
    }
}

/// GPU layout of the camera: eye position and view-projection matrix.
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
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &OrbitCamera, projection: &Projection) {
        self.view_position = camera.eye().to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: OrbitCamera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::from_points([Point3::new(1.0, 1.0, 1.0), Point3::new(3.0, 3.0, 3.0)])
            .expect("a box around two corners")
    }

    #[test]
    fn framing_targets_the_bounds_centre() {
        let camera = OrbitCamera::frame(&unit_box());
        let eye = camera.eye();

        assert_eq!(camera.target, Point3::new(2.0, 2.0, 2.0));
        assert_relative_eq!(eye.x, 1.9, epsilon = 1e-4);
        assert_relative_eq!(eye.y, 2.1, epsilon = 1e-4);
        assert_relative_eq!(eye.z, 2.0 + 12.0f32.sqrt(), epsilon = 1e-4);
    }

    #[test]
    fn damping_eases_out() {
        let mut controller = OrbitController::new(&CameraConfig::default());
        let mut camera = OrbitCamera::default();
        let start = camera.yaw;

        controller.handle_mouse_button(MouseButton::Left, ElementState::Pressed);
        controller.handle_mouse(100.0, 0.0);
        controller.handle_mouse_button(MouseButton::Left, ElementState::Released);

        controller.update(&mut camera);
        let first = start - camera.yaw;
        controller.update(&mut camera);
        let second = start - camera.yaw - first;

        // a quarter of 100px at 0.005 rad/px, then a quarter of what is left
        assert_relative_eq!(first.0, 0.125, epsilon = 1e-5);
        assert_relative_eq!(second.0, 0.09375, epsilon = 1e-5);
        assert!(!controller.is_settled());
        for _ in 0..200 {
            controller.update(&mut camera);
        }
        assert!(controller.is_settled());
    }

    #[test]
    fn motion_without_drag_is_ignored() {
        let mut controller = OrbitController::new(&CameraConfig::default());
        controller.handle_mouse(50.0, 50.0);
        assert!(controller.is_settled());
    }

    #[test]
    fn pitch_never_reaches_the_poles() {
        let mut controller = OrbitController::new(&CameraConfig {
            damping: 1.0,
            ..CameraConfig::default()
        });
        let mut camera = OrbitCamera::default();
        controller.handle_mouse_button(MouseButton::Left, ElementState::Pressed);
        controller.handle_mouse(0.0, 10_000.0);
        controller.update(&mut camera);
        assert!(camera.pitch.0 < FRAC_PI_2);
    }

    #[test]
    fn zoom_keeps_a_minimum_distance() {
        let mut controller = OrbitController::new(&CameraConfig {
            damping: 1.0,
            ..CameraConfig::default()
        });
        let mut camera = OrbitCamera::default();
        controller.handle_scroll(&MouseScrollDelta::LineDelta(0.0, 10_000.0));
        controller.update(&mut camera);
        assert_relative_eq!(camera.radius, MIN_RADIUS);
    }
}
