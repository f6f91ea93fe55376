/*!
# Lumen 3D Engine

Render-queue and post-process core of the Lumen3D rendering engine.

This crate provides the platform-agnostic part of the engine: a scene manager
that batches renderables by shading state and drives the per-frame lifecycle,
and a post-process pin graph (copy, motion blur, summed-area table, depth of
field, bokeh) executed over GPU-resident textures. Device work goes through the
`RenderEngine` and `ResourceFactory` traits; backend crates implement them.

## Architecture

- **EngineContext**: render engine + resource factory + configuration, passed to constructors
- **SceneManager**: render queue, culling, frame lifecycle, statistics
- **Renderable / SceneObject**: drawable units and the objects placing them
- **PostProcess**: stages with input/output texture pins
- **PostProcessGraph**: stages wired through texture slots, run in dependency order
*/

// Internal modules
mod error;
mod engine;
mod app;
pub mod log;
pub mod render_engine;
pub mod camera;
pub mod scene;
pub mod post_process;

// Main lumen3d namespace module
pub mod lumen3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging facade, configuration, composed services
    pub use crate::engine::{Engine, EngineConfig, EngineContext};

    // Application callbacks
    pub use crate::app::{App, UpdateResult};

    // Logging sub-module (types only; the engine_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Render engine collaborator traits and data
    pub mod render {
        pub use crate::render_engine::*;
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Post-process sub-module
    pub mod post_process {
        pub use crate::post_process::*;
    }
}

// Re-export math library at crate root
pub use glam;
