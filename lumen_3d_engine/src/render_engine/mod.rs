//! Render engine collaborator interfaces
//!
//! Traits the core consumes (`RenderEngine`, `ResourceFactory`) plus the
//! plain data they exchange: handles, descriptors, formats, capabilities.
//! Backends live in their own crates.

pub mod handles;
pub mod texture;
pub mod buffer;
pub mod frame_buffer;
pub mod device_caps;
pub mod render_engine;
pub mod resource_factory;
#[cfg(test)]
pub mod mock_render_engine;

pub use handles::*;
pub use texture::*;
pub use buffer::*;
pub use frame_buffer::*;
pub use device_caps::*;
pub use render_engine::*;
pub use resource_factory::*;
