use glam::{Mat4, Vec3, Vec4};
use crate::camera::Camera;
use crate::engine::EngineContext;
use crate::error::Error;
use crate::render_engine::mock_render_engine::{mock_context, MockState};
use crate::render_engine::{
    BufferDesc, DeviceCaps, IndexFormat, IndexStream, ParamValue, PrimitiveTopology,
    RenderLayoutDesc, RenderLayoutHandle, TextureFormat, VertexStream,
};
use crate::scene::pack_abgr;
use std::sync::{Arc, Mutex};
use super::*;

// ============================================================================
// Helpers
// ============================================================================

fn cube_layout(ctx: &EngineContext) -> RenderLayoutHandle {
    ctx.with_factory(|f| {
        let vb = f.make_buffer(&BufferDesc::immutable_vertices(&[Vec4::ZERO; 8]))?;
        let ib = f.make_buffer(&BufferDesc::immutable_indices(&[0u32; 36]))?;
        f.make_render_layout(&RenderLayoutDesc {
            topology: PrimitiveTopology::TriangleList,
            vertices: VertexStream { buffer: vb, format: TextureFormat::R32G32B32A32_SFLOAT, vertex_count: 8 },
            indices: Some(IndexStream { buffer: ib, format: IndexFormat::U32, index_count: 36 }),
        })
    })
    .unwrap()
}

fn mesh(variant: MeshVariant) -> (MotionBlurMesh, EngineContext, Arc<Mutex<MockState>>) {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let layout = cube_layout(&ctx);
    let bounds = AABB::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
    let mesh = MotionBlurMesh::new(&ctx, variant, layout, bounds).unwrap();
    (mesh, ctx, state)
}

fn technique_name(state: &Arc<Mutex<MockState>>, technique: TechniqueHandle) -> String {
    state.lock().unwrap().techniques[technique].clone()
}

// ============================================================================
// Tests: construction
// ============================================================================

#[test]
fn test_instanced_mesh_techniques_and_mode() {
    let (mut mesh, _ctx, state) = mesh(MeshVariant::Instanced);

    assert_eq!(mesh.instancing(), Instancing::Hardware);
    assert_eq!(mesh.name(), "InstancedMesh");
    assert_eq!(technique_name(&state, mesh.technique()), "ColorDepthInstanced");

    mesh.motion_vec_pass(true);
    assert!(mesh.is_motion_vec_pass());
    assert_eq!(technique_name(&state, mesh.technique()), "MotionVectorInstanced");

    mesh.motion_vec_pass(false);
    assert_eq!(technique_name(&state, mesh.technique()), "ColorDepthInstanced");
}

#[test]
fn test_non_instanced_mesh_techniques_and_mode() {
    let (mut mesh, _ctx, state) = mesh(MeshVariant::NonInstanced);

    assert_eq!(mesh.instancing(), Instancing::PerInstance);
    assert_eq!(technique_name(&state, mesh.technique()), "ColorDepthNonInstanced");

    mesh.motion_vec_pass(true);
    assert_eq!(technique_name(&state, mesh.technique()), "MotionVectorNonInstanced");
}

#[test]
fn test_mode_switch_does_not_resolve_names_again() {
    let (mut mesh, _ctx, state) = mesh(MeshVariant::Instanced);
    let technique_count = state.lock().unwrap().techniques.len();

    for i in 0..10 {
        mesh.motion_vec_pass(i % 2 == 0);
        let _ = mesh.technique();
    }

    assert_eq!(state.lock().unwrap().techniques.len(), technique_count);
}

#[test]
fn test_counts_come_from_layout() {
    let (mesh, _ctx, _state) = mesh(MeshVariant::Instanced);
    assert_eq!(mesh.vertex_count(), 8);
    assert_eq!(mesh.primitive_count(), 12);
}

#[test]
fn test_missing_layout_is_an_error() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let bounds = AABB::new(Vec3::ZERO, Vec3::ONE);
    let result = MotionBlurMesh::new(&ctx, MeshVariant::Instanced, RenderLayoutHandle::default(), bounds);
    assert!(matches!(result, Err(Error::BackendError(_))));
}

// ============================================================================
// Tests: hooks
// ============================================================================

#[test]
fn test_build_mesh_info_sets_position_decompression() {
    let (mut mesh, ctx, state) = mesh(MeshVariant::Instanced);

    ctx.with_render_engine(|re| mesh.build_mesh_info(re)).unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.last_param("pos_center"), Some(ParamValue::Float3(Vec3::new(0.0, 1.0, 0.0))));
    assert_eq!(state.last_param("pos_extent"), Some(ParamValue::Float3(Vec3::ONE)));
}

#[test]
fn test_render_begin_sets_camera_params() {
    let (mut mesh, ctx, state) = mesh(MeshVariant::Instanced);
    let mut camera = Camera::look_at(Vec3::new(-1.8, 1.9, -1.8), Vec3::ZERO, 1.0, 1.0, 0.1, 100.0);
    let old_view = *camera.view_matrix();
    camera.update();
    camera.set_view(Mat4::look_at_rh(Vec3::new(-2.0, 1.9, -1.8), Vec3::ZERO, Vec3::Y));
    let render_ctx = RenderContext { camera: &camera, app_time: 2.0, elapsed: 0.02 };

    ctx.with_render_engine(|re| mesh.on_render_begin(&render_ctx, re)).unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.last_param("view"), Some(ParamValue::Float4x4(*camera.view_matrix())));
    assert_eq!(state.last_param("prev_view"), Some(ParamValue::Float4x4(old_view)));
    assert_eq!(state.last_param("elapsed_time"), Some(ParamValue::Float(0.02)));
    match state.last_param("eye_in_world") {
        Some(ParamValue::Float3(eye)) => assert!(eye.abs_diff_eq(Vec3::new(-2.0, 1.9, -1.8), 1e-4)),
        other => panic!("Expected eye position, got {:?}", other),
    }
}

#[test]
fn test_instance_begin_sets_transforms_and_color() {
    let (mut mesh, ctx, state) = mesh(MeshVariant::NonInstanced);
    let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    let last = Mat4::from_translation(Vec3::new(1.0, 2.0, 2.5));
    let color = Vec4::new(1.0, 0.0, 0.0, 1.0);
    let instance = InstanceData::new(&model, &last, pack_abgr(color));

    ctx.with_render_engine(|re| mesh.on_instance_begin(0, &instance, re)).unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.last_param("modelmat"), Some(ParamValue::Float4x4(model)));
    assert_eq!(state.last_param("last_modelmat"), Some(ParamValue::Float4x4(last)));
    assert_eq!(state.last_param("color"), Some(ParamValue::Float4(color)));
}
