/// Culling strategies.
///
/// A Culler decides which cullable scene objects are visible from the
/// camera. Non-cullable objects never reach the culler.

use crate::camera::Camera;
use super::aabb::AABB;
use super::scene_object::SceneObjectKey;

/// Strategy for determining visible objects from a camera.
///
/// `&mut self` allows stateful implementations (e.g. caching).
pub trait Culler {
    /// Append the keys of visible `candidates` (world-space bounds) to `visible`
    fn cull(
        &mut self,
        camera: &Camera,
        candidates: &[(SceneObjectKey, AABB)],
        visible: &mut Vec<SceneObjectKey>,
    );
}

/// Brute-force culler: everything is visible.
#[derive(Debug, Default)]
pub struct BruteForceCuller;

impl BruteForceCuller {
    pub fn new() -> Self {
        Self
    }
}

impl Culler for BruteForceCuller {
    fn cull(
        &mut self,
        _camera: &Camera,
        candidates: &[(SceneObjectKey, AABB)],
        visible: &mut Vec<SceneObjectKey>,
    ) {
        visible.extend(candidates.iter().map(|(key, _)| *key));
    }
}

/// Frustum culler: tests world bounds against the camera frustum.
#[derive(Debug, Default)]
pub struct FrustumCuller;

impl FrustumCuller {
    pub fn new() -> Self {
        Self
    }
}

impl Culler for FrustumCuller {
    fn cull(
        &mut self,
        camera: &Camera,
        candidates: &[(SceneObjectKey, AABB)],
        visible: &mut Vec<SceneObjectKey>,
    ) {
        let frustum = camera.frustum();
        visible.extend(
            candidates
                .iter()
                .filter(|(_, bounds)| frustum.intersects_aabb(bounds))
                .map(|(key, _)| *key),
        );
    }
}

#[cfg(test)]
#[path = "culler_tests.rs"]
mod tests;
