use glam::{Mat4, Vec3};
use crate::scene::AABB;
use super::*;

fn looking_down_minus_z(far: f32) -> Frustum {
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, far);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    Frustum::from_view_projection(&(projection * view))
}

fn aabb(min: [f32; 3], max: [f32; 3]) -> AABB {
    AABB { min: Vec3::from(min), max: Vec3::from(max) }
}

#[test]
fn test_planes_are_normalized() {
    let frustum = looking_down_minus_z(100.0);
    for plane in &frustum.planes {
        assert!((plane.truncate().length() - 1.0).abs() < 1e-4);
    }
}

#[test]
fn test_aabb_at_target_is_visible() {
    let frustum = looking_down_minus_z(100.0);
    assert!(frustum.intersects_aabb(&aabb([-1.0; 3], [1.0; 3])));
}

#[test]
fn test_aabb_far_to_the_side_is_culled() {
    let frustum = looking_down_minus_z(100.0);
    assert!(!frustum.intersects_aabb(&aabb([100.0; 3], [101.0; 3])));
}

#[test]
fn test_aabb_behind_camera_is_culled() {
    let frustum = looking_down_minus_z(100.0);
    assert!(!frustum.intersects_aabb(&aabb([-1.0, -1.0, 10.0], [1.0, 1.0, 12.0])));
}

#[test]
fn test_aabb_beyond_far_plane_is_culled() {
    let frustum = looking_down_minus_z(10.0);
    assert!(!frustum.intersects_aabb(&aabb([-1.0, -1.0, -20.0], [1.0, 1.0, -18.0])));
}

#[test]
fn test_aabb_straddling_boundary_is_visible() {
    let projection = Mat4::orthographic_rh(-5.0, 5.0, -5.0, 5.0, 0.1, 100.0);
    let frustum = Frustum::from_view_projection(&projection);
    assert!(frustum.intersects_aabb(&aabb([4.0, 0.0, -10.0], [6.0, 1.0, -5.0])));
}

#[test]
fn test_contains_point() {
    let frustum = looking_down_minus_z(100.0);
    assert!(frustum.contains_point(Vec3::ZERO));
    assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 50.0)));
    assert_eq!(PLANE_NEAR, 4);
}
