/// Tests for PostProcessGraph
///
/// Ordering, writer rules, cycles, execution and resize.

use crate::error::Error;
use crate::post_process::library;
use crate::post_process::{MotionBlur, PostProcessPass, StageState};
use crate::render_engine::mock_render_engine::{mock_context, mock_texture};
use crate::render_engine::DeviceCaps;
use super::*;

const FMT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;

fn copy(ctx: &EngineContext) -> PostProcessPass {
    PostProcessPass::new(ctx, &library::copy()).unwrap()
}

fn linearize(ctx: &EngineContext) -> PostProcessPass {
    PostProcessPass::new(ctx, &library::depth_to_linear()).unwrap()
}

// ============================================================================
// Tests: ordering
// ============================================================================

#[test]
fn test_writers_run_before_readers() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 64, 64);
    let src = graph.import_slot("src", mock_texture(&ctx, 64, 64, FMT));
    let mid = graph.add_owned_slot("mid", FMT).unwrap();
    let out = graph.add_owned_slot("out", FMT).unwrap();

    // reader added first
    let second = graph.add_stage(copy(&ctx));
    let first = graph.add_stage(linearize(&ctx));
    graph.connect_input(second, "src_tex", mid).unwrap();
    graph.connect_output(second, "output", out).unwrap();
    graph.connect_input(first, "src_tex", src).unwrap();
    graph.connect_output(first, "output", mid).unwrap();

    assert_eq!(graph.compile().unwrap(), &[first, second]);
}

#[test]
fn test_independent_stages_keep_insertion_order() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 16, 16);
    let src = graph.import_slot("src", mock_texture(&ctx, 16, 16, FMT));
    let a = graph.add_stage(copy(&ctx));
    let b = graph.add_stage(copy(&ctx));
    let c = graph.add_stage(copy(&ctx));
    for stage in [a, b, c] {
        graph.connect_input(stage, 0usize, src).unwrap();
    }

    assert_eq!(graph.compile().unwrap(), &[a, b, c]);
}

#[test]
fn test_in_place_stage_is_not_its_own_dependency() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 16, 16);
    let buffer = graph.add_owned_slot("buffer", FMT).unwrap();
    let stage = graph.add_stage(copy(&ctx));
    graph.connect_input(stage, "src_tex", buffer).unwrap();
    graph.connect_output(stage, "output", buffer).unwrap();

    assert_eq!(graph.compile().unwrap(), &[stage]);
}

#[test]
fn test_cycle_is_rejected() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 16, 16);
    let x = graph.add_owned_slot("x", FMT).unwrap();
    let y = graph.add_owned_slot("y", FMT).unwrap();
    let a = graph.add_stage(copy(&ctx));
    let b = graph.add_stage(copy(&ctx));
    graph.connect_input(a, "src_tex", x).unwrap();
    graph.connect_output(a, "output", y).unwrap();
    graph.connect_input(b, "src_tex", y).unwrap();
    graph.connect_output(b, "output", x).unwrap();

    match graph.compile() {
        Err(Error::GraphError(msg)) => assert!(msg.contains("Cycle")),
        other => panic!("expected GraphError, got {:?}", other),
    }
    assert!(matches!(graph.execute(), Err(Error::GraphError(_))));
}

#[test]
fn test_disabling_a_stage_breaks_the_cycle() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 16, 16);
    let x = graph.add_owned_slot("x", FMT).unwrap();
    let y = graph.add_owned_slot("y", FMT).unwrap();
    let a = graph.add_stage(copy(&ctx));
    let b = graph.add_stage(copy(&ctx));
    graph.connect_input(a, "src_tex", x).unwrap();
    graph.connect_output(a, "output", y).unwrap();
    graph.connect_input(b, "src_tex", y).unwrap();
    graph.connect_output(b, "output", x).unwrap();

    graph.set_enabled(b, false).unwrap();

    assert_eq!(graph.compile().unwrap(), &[a]);
}

// ============================================================================
// Tests: writers
// ============================================================================

#[test]
fn test_second_enabled_writer_is_rejected() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 16, 16);
    let out = graph.add_owned_slot("out", FMT).unwrap();
    let a = graph.add_stage(copy(&ctx));
    let b = graph.add_stage(copy(&ctx));
    graph.connect_output(a, "output", out).unwrap();

    let result = graph.connect_output(b, "output", out);

    assert!(matches!(result, Err(Error::GraphError(_))));
    assert_eq!(graph.writer_of(out, None), Some(a));
    assert_eq!(graph.stage(b).output_pin(0), None);
}

#[test]
fn test_alternative_writers_toggle() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 16, 16);
    let out = graph.add_owned_slot("out", FMT).unwrap();
    let a = graph.add_stage(copy(&ctx));
    let b = graph.add_stage(copy(&ctx));
    graph.connect_output(a, "output", out).unwrap();
    graph.set_enabled(b, false).unwrap();
    graph.connect_output(b, "output", out).unwrap();

    // b cannot come on while a writes the slot
    assert!(matches!(graph.set_enabled(b, true), Err(Error::GraphError(_))));
    assert!(!graph.is_enabled(b));

    graph.set_enabled(a, false).unwrap();
    graph.set_enabled(b, true).unwrap();
    assert_eq!(graph.writer_of(out, None), Some(b));
}

#[test]
#[should_panic(expected = "has no input pin 'depth_tex'")]
fn test_unknown_pin_name_panics() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 16, 16);
    let slot = graph.add_owned_slot("x", FMT).unwrap();
    let stage = graph.add_stage(copy(&ctx));
    let _ = graph.connect_input(stage, "depth_tex", slot);
}

// ============================================================================
// Tests: execution
// ============================================================================

#[test]
fn test_execute_applies_enabled_stages_in_order() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 16, 16);
    let src = graph.import_slot("src", mock_texture(&ctx, 16, 16, FMT));
    let mid = graph.add_owned_slot("mid", FMT).unwrap();
    let show = graph.add_stage(copy(&ctx));
    let linear = graph.add_stage(linearize(&ctx));
    let unused = graph.add_stage(linearize(&ctx));
    graph.connect_input(show, "src_tex", mid).unwrap();
    graph.connect_input(linear, "src_tex", src).unwrap();
    graph.connect_output(linear, "output", mid).unwrap();
    graph.connect_input(unused, "src_tex", src).unwrap();
    graph.set_enabled(unused, false).unwrap();
    state.lock().unwrap().clear_commands();

    graph.execute().unwrap();

    assert_eq!(state.lock().unwrap().effect_binds(), vec!["DepthToSM", "Copy"]);
    assert_eq!(graph.stage(show).state(), StageState::Ready);
    assert_eq!(graph.stage(unused).state(), StageState::Bound);
}

#[test]
fn test_stage_downcast() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 16, 16);
    let blur = graph.add_stage(MotionBlur::new(&ctx).unwrap());

    assert!(graph.stage_as::<PostProcessPass>(blur).is_none());
    graph.stage_as_mut::<MotionBlur>(blur).unwrap().show_motion_vector(true);
    assert!(graph.stage_as::<MotionBlur>(blur).unwrap().is_showing_motion_vector());
    assert_eq!(graph.stage(blur).name(), "MotionBlur");
}

// ============================================================================
// Tests: resize and rebinding
// ============================================================================

#[test]
fn test_resize_reallocates_owned_slots_and_rebinds() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 32, 16);
    let src_tex = mock_texture(&ctx, 32, 16, FMT);
    let src = graph.import_slot("src", src_tex);
    let mid = graph.add_owned_slot("mid", FMT).unwrap();
    let a = graph.add_stage(linearize(&ctx));
    let b = graph.add_stage(copy(&ctx));
    graph.connect_input(a, "src_tex", src).unwrap();
    graph.connect_output(a, "output", mid).unwrap();
    graph.connect_input(b, "src_tex", mid).unwrap();
    let old_mid = graph.slot_texture(mid);

    graph.resize(64, 48).unwrap();

    let new_mid = graph.slot_texture(mid);
    assert_ne!(new_mid, old_mid);
    assert_eq!(graph.size(), (64, 48));
    assert_eq!(graph.slot_texture(src), src_tex);
    assert_eq!(graph.stage(a).output_pin(0), Some(new_mid));
    assert_eq!(graph.stage(b).input_pin(0), Some(new_mid));
    let state = state.lock().unwrap();
    assert!(!state.textures.contains_key(old_mid));
    let info = state.textures[new_mid];
    assert_eq!((info.width, info.height, info.format), (64, 48, FMT));
}

#[test]
fn test_set_imported_texture_rebinds_readers() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut graph = PostProcessGraph::new(&ctx, 16, 16);
    let src = graph.import_slot("src", mock_texture(&ctx, 16, 16, FMT));
    let stage = graph.add_stage(copy(&ctx));
    graph.connect_input(stage, "src_tex", src).unwrap();

    let replacement = mock_texture(&ctx, 16, 16, FMT);
    graph.set_imported_texture(src, replacement).unwrap();

    assert_eq!(graph.stage(stage).input_pin(0), Some(replacement));
    assert_eq!(graph.slot_by_name("src"), Some(src));
    assert_eq!(graph.slot_kind(src), SlotKind::Imported);
}

#[test]
fn test_drop_releases_owned_slots_only() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let imported = mock_texture(&ctx, 16, 16, FMT);
    let owned = {
        let mut graph = PostProcessGraph::new(&ctx, 16, 16);
        graph.import_slot("src", imported);
        let slot = graph.add_owned_slot("mid", FMT).unwrap();
        graph.add_stage(copy(&ctx));
        graph.slot_texture(slot)
    };
    let state = state.lock().unwrap();
    assert!(state.textures.contains_key(imported));
    assert!(!state.textures.contains_key(owned));
    assert!(state.frame_buffers.is_empty());
}
