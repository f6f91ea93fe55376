/// Camera: current and previous-frame view/projection.
///
/// Motion vectors need both the matrices used this frame and the ones used
/// last frame. `update()` snapshots current into previous once per frame,
/// before the caller moves the camera.

use glam::{Mat4, Vec2, Vec3};
use super::frustum::Frustum;

#[derive(Debug, Clone)]
pub struct Camera {
    view_matrix: Mat4,
    projection_matrix: Mat4,
    prev_view_matrix: Mat4,
    prev_projection_matrix: Mat4,
    eye: Vec3,
    near_plane: f32,
    far_plane: f32,
}

impl Camera {
    /// Camera from explicit matrices. Previous matrices start equal to current.
    pub fn new(view: Mat4, projection: Mat4, near_plane: f32, far_plane: f32) -> Self {
        Self {
            view_matrix: view,
            projection_matrix: projection,
            prev_view_matrix: view,
            prev_projection_matrix: projection,
            eye: view.inverse().col(3).truncate(),
            near_plane,
            far_plane,
        }
    }

    /// Right-handed perspective camera looking from `eye` at `target`
    pub fn look_at(
        eye: Vec3,
        target: Vec3,
        fov_y: f32,
        aspect: f32,
        near_plane: f32,
        far_plane: f32,
    ) -> Self {
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let projection = Mat4::perspective_rh(fov_y, aspect, near_plane, far_plane);
        Self::new(view, projection, near_plane, far_plane)
    }

    // ===== GETTERS =====

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// View matrix of the previous frame
    pub fn prev_view_matrix(&self) -> &Mat4 {
        &self.prev_view_matrix
    }

    /// Projection matrix of the previous frame
    pub fn prev_projection_matrix(&self) -> &Mat4 {
        &self.prev_projection_matrix
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    /// World-space eye position
    pub fn eye_pos(&self) -> Vec3 {
        self.eye
    }

    pub fn near_plane(&self) -> f32 {
        self.near_plane
    }

    pub fn far_plane(&self) -> f32 {
        self.far_plane
    }

    /// Frustum of the current view-projection
    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection_matrix())
    }

    /// `(near * q, q)` with `q = far / (far - near)`: converts a [0, 1]
    /// hardware depth to linear view depth.
    pub fn linear_depth_params(&self) -> Vec2 {
        let q = self.far_plane / (self.far_plane - self.near_plane);
        Vec2::new(self.near_plane * q, q)
    }

    // ===== SETTERS =====

    pub fn set_view(&mut self, view: Mat4) {
        self.view_matrix = view;
        self.eye = view.inverse().col(3).truncate();
    }

    pub fn set_projection(&mut self, projection: Mat4, near_plane: f32, far_plane: f32) {
        self.projection_matrix = projection;
        self.near_plane = near_plane;
        self.far_plane = far_plane;
    }

    /// Start a new frame: current matrices become the previous ones
    pub fn update(&mut self) {
        self.prev_view_matrix = self.view_matrix;
        self.prev_projection_matrix = self.projection_matrix;
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
