use crate::engine::EngineContext;
use crate::render_engine::mock_render_engine::{mock_context, mock_texture, MockCommand, MockState};
use crate::render_engine::{DeviceCaps, ParamValue, TextureFormat};
use super::*;

const FMT: TextureFormat = TextureFormat::R32G32B32A32_SFLOAT;

fn tap_steps(state: &MockState) -> Vec<f32> {
    state
        .commands
        .iter()
        .filter_map(|c| match c {
            MockCommand::SetParam(name, ParamValue::Float(v)) if name == "tap_step" => Some(*v),
            _ => None,
        })
        .collect()
}

fn in_place(ctx: &EngineContext, sat: &mut SummedAreaTable, w: u32, h: u32) -> TextureHandle {
    let tex = mock_texture(ctx, w, h, FMT);
    sat.set_input_pin(0, tex).unwrap();
    sat.set_output_pin(0, tex).unwrap();
    tex
}

// ============================================================================
// Tests: pass count
// ============================================================================

#[test]
fn test_scan_passes() {
    assert_eq!(scan_passes(0), 1);
    assert_eq!(scan_passes(1), 1);
    assert_eq!(scan_passes(8), 1);
    assert_eq!(scan_passes(9), 2);
    assert_eq!(scan_passes(64), 2);
    assert_eq!(scan_passes(65), 3);
    assert_eq!(scan_passes(1953), 4);
}

#[test]
fn test_size_param() {
    assert_eq!(size_param(4, 2), Vec4::new(4.0, 2.0, 0.25, 0.5));
}

// ============================================================================
// Tests: raster variant
// ============================================================================

#[test]
fn test_raster_even_pass_count_ends_on_output() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let mut sat = SummedAreaTable::with_variant(&ctx, false).unwrap();
    let tex = in_place(&ctx, &mut sat, 64, 64);
    assert_eq!(sat.scan_pass_count(), 4);
    state.lock().unwrap().clear_commands();

    sat.apply().unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.effect_binds(), vec!["SATScanX", "SATScanX", "SATScanY", "SATScanY"]);
    assert_eq!(tap_steps(&state), vec![1.0, 8.0, 1.0, 8.0]);
    // last scan reads the intermediate and writes the output
    assert_eq!(
        state.last_param("src_tex"),
        Some(ParamValue::Texture(sat.intermediate()))
    );
    let intermediate_info = state.textures[sat.intermediate().unwrap()];
    assert_eq!((intermediate_info.width, intermediate_info.height), (64, 64));
    assert_eq!(intermediate_info.format, FMT);
    assert!(state.textures.contains_key(tex));
}

#[test]
fn test_raster_odd_pass_count_copies_back() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let mut sat = SummedAreaTable::with_variant(&ctx, false).unwrap();
    in_place(&ctx, &mut sat, 100, 10);
    state.lock().unwrap().clear_commands();

    sat.apply().unwrap();

    let state = state.lock().unwrap();
    assert_eq!(
        state.effect_binds(),
        vec!["SATScanX", "SATScanX", "SATScanX", "SATScanY", "SATScanY", "Copy"]
    );
    assert_eq!(tap_steps(&state), vec![1.0, 8.0, 64.0, 1.0, 8.0]);
    assert_eq!(
        state.last_param("src_tex"),
        Some(ParamValue::Texture(sat.intermediate()))
    );
}

#[test]
fn test_raster_first_pass_reads_source() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let mut sat = SummedAreaTable::with_variant(&ctx, false).unwrap();
    let src = mock_texture(&ctx, 8, 8, FMT);
    let dst = mock_texture(&ctx, 8, 8, FMT);
    sat.set_input_pin(0, src).unwrap();
    sat.set_output_pin(0, dst).unwrap();
    state.lock().unwrap().clear_commands();

    sat.apply().unwrap();

    let state = state.lock().unwrap();
    let first_src = state.commands.iter().find_map(|c| match c {
        MockCommand::SetParam(name, v) if name == "src_tex" => Some(*v),
        _ => None,
    });
    assert_eq!(first_src, Some(ParamValue::Texture(Some(src))));
    // 1 + 1 passes, second one lands on the output
    assert_eq!(state.effect_binds(), vec!["SATScanX", "SATScanY"]);
}

#[test]
fn test_same_dimensions_do_not_reallocate() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let mut sat = SummedAreaTable::with_variant(&ctx, false).unwrap();
    in_place(&ctx, &mut sat, 32, 16);
    let first = sat.intermediate();
    let allocations = state.lock().unwrap().texture_allocations;

    let other = mock_texture(&ctx, 32, 16, FMT);
    sat.set_input_pin(0, other).unwrap();

    assert_eq!(state.lock().unwrap().texture_allocations, allocations + 1);
    assert_eq!(sat.intermediate(), first);
}

#[test]
fn test_new_dimensions_reallocate_and_release() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let mut sat = SummedAreaTable::with_variant(&ctx, false).unwrap();
    in_place(&ctx, &mut sat, 32, 16);
    sat.apply().unwrap();
    assert_eq!(sat.state(), StageState::Ready);
    let first = sat.intermediate().unwrap();

    in_place(&ctx, &mut sat, 128, 16);

    assert_eq!(sat.state(), StageState::Bound);
    assert_eq!(sat.scan_pass_count(), 3 + 2);
    let state = state.lock().unwrap();
    assert!(!state.textures.contains_key(first));
    assert!(state.texture_by_size(128, 16).is_some());
}

#[test]
fn test_drop_releases_intermediate() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let intermediate = {
        let mut sat = SummedAreaTable::with_variant(&ctx, false).unwrap();
        in_place(&ctx, &mut sat, 16, 16);
        sat.intermediate().unwrap()
    };
    let state = state.lock().unwrap();
    assert!(!state.textures.contains_key(intermediate));
    assert!(state.layouts.is_empty());
}

#[test]
#[should_panic(expected = "Required output pin 0 ('output') is not bound")]
fn test_apply_without_output_panics() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut sat = SummedAreaTable::with_variant(&ctx, false).unwrap();
    let tex = mock_texture(&ctx, 8, 8, FMT);
    sat.set_input_pin(0, tex).unwrap();
    let _ = sat.apply();
}

// ============================================================================
// Tests: compute variant
// ============================================================================

#[test]
fn test_new_picks_compute_from_caps() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    assert!(SummedAreaTable::new(&ctx).unwrap().is_compute());

    let mut caps = DeviceCaps::full();
    caps.cs_support = false;
    let (ctx, _state) = mock_context(caps);
    assert!(!SummedAreaTable::new(&ctx).unwrap().is_compute());
}

#[test]
fn test_compute_scans_rows_then_columns_in_place() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let mut sat = SummedAreaTable::with_variant(&ctx, true).unwrap();
    let tex = in_place(&ctx, &mut sat, 40, 30);
    assert_eq!(sat.intermediate(), None);
    state.lock().unwrap().clear_commands();

    sat.apply().unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.effect_binds(), vec!["SATScanXCS", "SATScanYCS"]);
    assert!(state.commands.contains(&MockCommand::Dispatch([30, 1, 1])));
    assert!(state.commands.contains(&MockCommand::Dispatch([40, 1, 1])));
    assert_eq!(state.last_param("output"), Some(ParamValue::Texture(Some(tex))));
}

#[test]
fn test_compute_copies_distinct_source_first() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let mut sat = SummedAreaTable::with_variant(&ctx, true).unwrap();
    let src = mock_texture(&ctx, 16, 16, FMT);
    let dst = mock_texture(&ctx, 16, 16, FMT);
    sat.set_input_pin(0, src).unwrap();
    sat.set_output_pin(0, dst).unwrap();
    state.lock().unwrap().clear_commands();

    sat.apply().unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.effect_binds(), vec!["Copy", "SATScanXCS", "SATScanYCS"]);
    assert_eq!(state.dispatches(), 2);
}
