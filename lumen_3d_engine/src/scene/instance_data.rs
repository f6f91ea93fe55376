/// Per-instance record uploaded for instanced draws.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// One drawn instance: current and previous affine transform plus a color.
///
/// Transforms are stored as the first three rows of the 4x4 model matrix
/// (the last row of an affine matrix is always `0 0 0 1`). The layout is
/// `#[repr(C)]` so the whole array uploads as one instance stream.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    /// Rows 0..3 of the current model matrix
    pub mat: [Vec4; 3],
    /// Rows 0..3 of the previous-frame model matrix
    pub last_mat: [Vec4; 3],
    /// Packed ABGR8 color (R in the low byte)
    pub color: u32,
    pub _pad: [u32; 3],
}

impl InstanceData {
    pub fn new(model: &Mat4, last_model: &Mat4, color: u32) -> Self {
        Self {
            mat: Self::rows(model),
            last_mat: Self::rows(last_model),
            color,
            _pad: [0; 3],
        }
    }

    fn rows(m: &Mat4) -> [Vec4; 3] {
        [m.row(0), m.row(1), m.row(2)]
    }

    fn from_rows(rows: &[Vec4; 3]) -> Mat4 {
        Mat4::from_cols(rows[0], rows[1], rows[2], Vec4::W).transpose()
    }

    pub fn set_model(&mut self, model: &Mat4) {
        self.mat = Self::rows(model);
    }

    pub fn set_last_model(&mut self, last_model: &Mat4) {
        self.last_mat = Self::rows(last_model);
    }

    /// Current model matrix rebuilt from the stored rows
    pub fn model(&self) -> Mat4 {
        Self::from_rows(&self.mat)
    }

    /// Previous model matrix rebuilt from the stored rows
    pub fn last_model(&self) -> Mat4 {
        Self::from_rows(&self.last_mat)
    }

    /// Color as RGBA floats in [0, 1]
    pub fn color_rgba(&self) -> Vec4 {
        let c = self.color;
        Vec4::new(
            (c & 0xFF) as f32,
            ((c >> 8) & 0xFF) as f32,
            ((c >> 16) & 0xFF) as f32,
            ((c >> 24) & 0xFF) as f32,
        ) / 255.0
    }
}

/// Pack RGBA floats in [0, 1] as ABGR8
pub fn pack_abgr(rgba: Vec4) -> u32 {
    let c = (rgba.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    (c.w as u32) << 24 | (c.z as u32) << 16 | (c.y as u32) << 8 | c.x as u32
}

#[cfg(test)]
#[path = "instance_data_tests.rs"]
mod tests;
