//! Camera module: camera data and frustum.
//!
//! Passive containers. The caller positions the camera; the scene manager
//! reads it for culling and hands it to renderable hooks.

mod camera;
mod frustum;

pub use camera::Camera;
pub use frustum::{
    Frustum,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
