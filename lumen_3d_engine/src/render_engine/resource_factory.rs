/// ResourceFactory trait: allocation and name resolution.

use crate::error::Result;
use super::buffer::{BufferDesc, RenderLayoutDesc};
use super::frame_buffer::Attachment;
use super::handles::{
    BufferHandle, EffectHandle, FrameBufferHandle, ParamHandle, RenderLayoutHandle,
    TechniqueHandle, TextureHandle,
};
use super::texture::{TextureDesc, TextureInfo};

/// Creates and releases GPU resources, resolves effect names to handles.
///
/// Name lookups happen once, at construction time of a stage or renderable.
/// Per-frame code only uses the returned handles.
pub trait ResourceFactory: Send {
    // ===== TEXTURES =====

    /// Allocate a 2D texture
    fn make_texture_2d(&mut self, desc: &TextureDesc) -> Result<TextureHandle>;

    /// Properties of a live texture (`None` if the handle is stale)
    fn texture_info(&self, texture: TextureHandle) -> Option<TextureInfo>;

    fn release_texture(&mut self, texture: TextureHandle);

    // ===== FRAME BUFFERS =====

    /// Create an empty frame buffer
    fn make_frame_buffer(&mut self) -> Result<FrameBufferHandle>;

    /// Attach (or replace) a texture at an attachment point
    fn attach(
        &mut self,
        frame_buffer: FrameBufferHandle,
        attachment: Attachment,
        texture: TextureHandle,
    ) -> Result<()>;

    fn release_frame_buffer(&mut self, frame_buffer: FrameBufferHandle);

    // ===== GEOMETRY =====

    /// Create a vertex or index buffer with initial contents
    fn make_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle>;

    fn release_buffer(&mut self, buffer: BufferHandle);

    /// Create a render layout over existing buffers
    fn make_render_layout(&mut self, desc: &RenderLayoutDesc) -> Result<RenderLayoutHandle>;

    /// Descriptor a layout was created from
    fn render_layout_desc(&self, layout: RenderLayoutHandle) -> Option<RenderLayoutDesc>;

    fn release_render_layout(&mut self, layout: RenderLayoutHandle);

    // ===== EFFECTS =====

    /// Load (or fetch the already loaded) effect by asset name
    fn load_effect(&mut self, name: &str) -> Result<EffectHandle>;

    /// Resolve a technique of an effect by name
    fn technique_by_name(&mut self, effect: EffectHandle, name: &str) -> Result<TechniqueHandle>;

    /// Resolve a parameter of an effect by name
    fn param_by_name(&mut self, effect: EffectHandle, name: &str) -> Result<ParamHandle>;
}
