/// Opaque handles to backend-owned GPU objects.
///
/// All handles are `slotmap` keys. The backend (render engine / resource
/// factory implementation) owns the arenas and therefore the lifetime of the
/// objects. A null key (`KeyData` default) is never a valid handle; passing
/// one to the scene manager or a post-process stage is a contract violation.

use slotmap::new_key_type;

new_key_type! {
    /// 2D texture (color, depth, or intermediate)
    pub struct TextureHandle;

    /// Frame buffer (set of attachments a pass renders into)
    pub struct FrameBufferHandle;

    /// Vertex or index buffer
    pub struct BufferHandle;

    /// Geometry binding: topology + vertex stream + optional index stream
    pub struct RenderLayoutHandle;

    /// Loaded effect (a bundle of techniques and parameters)
    pub struct EffectHandle;

    /// Resolved technique inside an effect: the shading state bound before a draw
    pub struct TechniqueHandle;

    /// Resolved parameter inside an effect
    pub struct ParamHandle;
}
