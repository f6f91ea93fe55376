/// RenderEngine trait: the device-side command surface consumed by the core.
///
/// The scene manager and the post-process stages never talk to a graphics API
/// directly. They issue frame brackets, state binds, parameter sets and draws
/// through this trait; a backend crate implements it.

use glam::{Mat4, Vec2, Vec3, Vec4};
use crate::error::Result;
use super::device_caps::DeviceCaps;
use super::frame_buffer::ClearFlags;
use super::handles::{
    FrameBufferHandle, ParamHandle, RenderLayoutHandle, TechniqueHandle, TextureHandle,
};

/// Value written to an effect parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Float4x4(Mat4),
    UInt(u32),
    /// Texture binding (`None` unbinds)
    Texture(Option<TextureHandle>),
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<Vec2> for ParamValue {
    fn from(v: Vec2) -> Self {
        ParamValue::Float2(v)
    }
}

impl From<Vec3> for ParamValue {
    fn from(v: Vec3) -> Self {
        ParamValue::Float3(v)
    }
}

impl From<Vec4> for ParamValue {
    fn from(v: Vec4) -> Self {
        ParamValue::Float4(v)
    }
}

impl From<Mat4> for ParamValue {
    fn from(v: Mat4) -> Self {
        ParamValue::Float4x4(v)
    }
}

impl From<TextureHandle> for ParamValue {
    fn from(v: TextureHandle) -> Self {
        ParamValue::Texture(Some(v))
    }
}

/// Device command surface
///
/// `Send` so it can live behind the `Arc<Mutex<dyn RenderEngine>>` held by
/// [`EngineContext`](crate::lumen3d::EngineContext).
pub trait RenderEngine: Send {
    /// Open a frame. Every `begin_frame` is matched by one `end_frame`.
    fn begin_frame(&mut self) -> Result<()>;

    /// Close the frame opened by `begin_frame`
    fn end_frame(&mut self) -> Result<()>;

    /// Bind the frame buffer subsequent clears and draws target.
    ///
    /// `None` binds the default (screen) frame buffer.
    fn bind_frame_buffer(&mut self, frame_buffer: Option<FrameBufferHandle>) -> Result<()>;

    /// Currently bound frame buffer (`None` = screen)
    fn current_frame_buffer(&self) -> Option<FrameBufferHandle>;

    /// Clear planes of the bound frame buffer
    fn clear(&mut self, flags: ClearFlags, color: Vec4, depth: f32, stencil: u32) -> Result<()>;

    /// Bind a shading state (technique) for the following draws
    fn set_render_effect(&mut self, technique: TechniqueHandle) -> Result<()>;

    /// Write an effect parameter
    fn set_param(&mut self, param: ParamHandle, value: ParamValue) -> Result<()>;

    /// Draw a render layout with the bound shading state
    ///
    /// `instance_count` is 1 for non-instanced draws.
    fn render(&mut self, layout: RenderLayoutHandle, instance_count: u32) -> Result<()>;

    /// Upload the per-instance stream used by the next instanced draw of `layout`
    fn update_instance_stream(&mut self, layout: RenderLayoutHandle, data: &[u8]) -> Result<()>;

    /// Dispatch the bound compute technique
    fn dispatch(&mut self, thread_groups: [u32; 3]) -> Result<()>;

    /// Rebuild the mip chain of a texture created with `GENERATE_MIPS`
    fn generate_mips(&mut self, texture: TextureHandle) -> Result<()>;

    /// Device capabilities (fixed for the lifetime of the device)
    fn device_caps(&self) -> &DeviceCaps;
}
