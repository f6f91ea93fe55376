//! Scene management module
//!
//! Renderables, scene objects, the render queue that buckets them by shading
//! state, culling strategies and the scene manager driving the per-frame
//! lifecycle. Also the motion-blur meshes and moving instances used by the
//! dual-pass (color/depth then motion vector) rendering.

mod aabb;
mod instance_data;
mod motion_history;
mod renderable;
mod scene_object;
mod render_queue;
mod culler;
mod scene_manager;
mod motion_blur_mesh;
mod moving_instance;

pub use aabb::AABB;
pub use instance_data::{InstanceData, pack_abgr};
pub use motion_history::MotionHistory;
pub use renderable::{Instancing, RenderContext, Renderable, RenderableKey};
pub use scene_object::{SceneObject, SceneObjectAttrib, SceneObjectKey};
pub use render_queue::{RenderBucket, RenderQueue, RenderQueueEntry};
pub use culler::{Culler, BruteForceCuller, FrustumCuller};
pub use scene_manager::{SceneManager, SceneStats};
pub use motion_blur_mesh::{MeshVariant, MotionBlurMesh, MOTION_BLUR_EFFECT};
pub use moving_instance::{MovingInstance, DEFAULT_ORBIT_RATE};
