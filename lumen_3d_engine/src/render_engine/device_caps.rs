/// Device capabilities queried once at construction time

use rustc_hash::FxHashSet;
use super::texture::TextureFormat;

/// Capabilities reported by the render engine.
///
/// Post-process stages choose their algorithm variant (compute vs raster,
/// geometry-shader points vs expanded quads, strip vs list) and their
/// preferred formats from this structure.
#[derive(Debug, Clone, Default)]
pub struct DeviceCaps {
    /// Highest supported shader model (2, 3, 4, 5...)
    pub max_shader_model: u8,
    /// Compute shaders available
    pub cs_support: bool,
    /// Strip primitive restart with the 0xFFFFFFFF marker
    pub primitive_restart_support: bool,
    /// Formats usable as sampled textures
    pub texture_formats: FxHashSet<TextureFormat>,
    /// Formats usable as render targets
    pub render_target_formats: FxHashSet<TextureFormat>,
}

impl DeviceCaps {
    /// Compute-shader-class device: compute support and shader model 5
    pub fn compute_capable(&self) -> bool {
        self.cs_support && self.max_shader_model >= 5
    }

    /// Geometry-shader tier (shader model 4+)
    pub fn geometry_shader_tier(&self) -> bool {
        self.max_shader_model >= 4
    }

    pub fn texture_format_support(&self, format: TextureFormat) -> bool {
        self.texture_formats.contains(&format)
    }

    pub fn render_target_format_support(&self, format: TextureFormat) -> bool {
        self.render_target_formats.contains(&format)
    }

    /// First format of `candidates` usable as a render target.
    ///
    /// Panics when none is: a required render-target format missing is a
    /// contract violation, not a recoverable error.
    pub fn pick_render_target_format(&self, source: &str, candidates: &[TextureFormat]) -> TextureFormat {
        match candidates.iter().find(|f| self.render_target_format_support(**f)) {
            Some(format) => *format,
            None => crate::engine_fatal!(
                source,
                "None of the render target formats {:?} is supported",
                candidates
            ),
        }
    }

    /// Shader model 5 device supporting every format the engine knows.
    pub fn full() -> Self {
        let all = [
            TextureFormat::R8G8_UNORM,
            TextureFormat::R8G8B8A8_UNORM,
            TextureFormat::B8G8R8A8_UNORM,
            TextureFormat::R16_SFLOAT,
            TextureFormat::R16G16B16A16_SFLOAT,
            TextureFormat::B10G11R11_UFLOAT,
            TextureFormat::R32G32B32A32_SFLOAT,
            TextureFormat::D16_UNORM,
        ];
        Self {
            max_shader_model: 5,
            cs_support: true,
            primitive_restart_support: true,
            texture_formats: all.iter().copied().collect(),
            render_target_formats: all.iter().copied().filter(|f| !f.is_depth()).collect(),
        }
    }
}

#[cfg(test)]
#[path = "device_caps_tests.rs"]
mod tests;
