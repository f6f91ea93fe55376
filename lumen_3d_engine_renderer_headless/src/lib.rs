/*!
# Lumen 3D Engine - Headless Renderer Backend

Window-less implementation of the Lumen3D `RenderEngine` and `ResourceFactory`
traits.

Resources live in slotmap arenas, commands are validated against them and
counted per frame. Used by the demo when no display is available and by the
engine's integration tests.
*/

mod headless_store;
mod headless_render_engine;
mod headless_resource_factory;
mod headless_backend;

pub use headless_store::{EffectManifest, FrameStats};
pub use headless_render_engine::HeadlessRenderEngine;
pub use headless_resource_factory::HeadlessResourceFactory;
pub use headless_backend::{HeadlessBackend, HeadlessStats, ResourceCounts};
