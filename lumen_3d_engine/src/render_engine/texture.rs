/// Texture formats, access hints, descriptors and info

use bitflags::bitflags;

/// Texture and vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    // Color formats
    R8G8_UNORM,
    R8G8B8A8_UNORM,
    B8G8R8A8_UNORM,
    R16_SFLOAT,
    R16G16B16A16_SFLOAT,
    B10G11R11_UFLOAT,
    R32G32B32A32_SFLOAT,

    // Depth formats
    D16_UNORM,

    // Vertex / index formats
    R32G32_SFLOAT,
    R32_UINT,
}

impl TextureFormat {
    /// Size in bytes of one texel / element
    pub fn bytes_per_element(&self) -> u32 {
        match self {
            TextureFormat::R8G8_UNORM => 2,
            TextureFormat::R16_SFLOAT => 2,
            TextureFormat::D16_UNORM => 2,
            TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::B10G11R11_UFLOAT
            | TextureFormat::R32_UINT => 4,
            TextureFormat::R16G16B16A16_SFLOAT | TextureFormat::R32G32_SFLOAT => 8,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
        }
    }

    /// True for depth(-stencil) formats
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::D16_UNORM)
    }
}

bitflags! {
    /// How the GPU (and CPU) will access a resource
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessHint: u32 {
        /// Sampled / read by shaders
        const GPU_READ = 1 << 0;
        /// Written as a render target
        const GPU_WRITE = 1 << 1;
        /// Bound as an unordered-access view (compute read/write)
        const GPU_UNORDERED = 1 << 2;
        /// Contents never change after creation
        const IMMUTABLE = 1 << 3;
        /// Mip chain is generated on the GPU
        const GENERATE_MIPS = 1 << 4;
    }
}

/// Descriptor for creating a 2D texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Number of mip levels (1 = no mips)
    pub mip_levels: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Access hints
    pub access: AccessHint,
}

impl TextureDesc {
    /// Single-mip read/write render target
    pub fn render_target(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            mip_levels: 1,
            format,
            access: AccessHint::GPU_READ | AccessHint::GPU_WRITE,
        }
    }
}

/// Read-only properties of a created texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Number of mip levels
    pub mip_levels: u32,
    /// Pixel format
    pub format: TextureFormat,
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
