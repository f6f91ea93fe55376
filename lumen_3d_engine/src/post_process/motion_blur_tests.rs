use crate::render_engine::mock_render_engine::{mock_context, mock_texture};
use crate::render_engine::{DeviceCaps, ParamValue, TextureFormat};
use super::*;

fn bind_all(blur: &mut MotionBlur, ctx: &crate::engine::EngineContext) -> [TextureHandle; 4] {
    let color = mock_texture(ctx, 32, 32, TextureFormat::B10G11R11_UFLOAT);
    let depth = mock_texture(ctx, 32, 32, TextureFormat::R16_SFLOAT);
    let motion = mock_texture(ctx, 32, 32, TextureFormat::R8G8_UNORM);
    let output = mock_texture(ctx, 32, 32, TextureFormat::B10G11R11_UFLOAT);
    blur.set_input_pin(0, color).unwrap();
    blur.set_input_pin(1, depth).unwrap();
    blur.set_input_pin(2, motion).unwrap();
    blur.set_output_pin(0, output).unwrap();
    [color, depth, motion, output]
}

#[test]
fn test_pins() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let blur = MotionBlur::new(&ctx).unwrap();

    assert_eq!(blur.name(), "MotionBlur");
    assert_eq!(blur.input_pins().len(), 3);
    assert_eq!(blur.input_pins().index_of("motion_vec_tex"), Some(2));
    assert_eq!(blur.output_pins().len(), 1);
    assert_eq!(blur.state(), StageState::Unconfigured);
}

#[test]
fn test_apply_binds_all_inputs() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let mut blur = MotionBlur::new(&ctx).unwrap();
    let [color, depth, motion, _] = bind_all(&mut blur, &ctx);

    blur.apply().unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.effect_binds(), vec!["MotionBlur".to_string()]);
    assert_eq!(state.last_param("color_tex"), Some(ParamValue::Texture(Some(color))));
    assert_eq!(state.last_param("depth_tex"), Some(ParamValue::Texture(Some(depth))));
    assert_eq!(state.last_param("motion_vec_tex"), Some(ParamValue::Texture(Some(motion))));
    assert_eq!(state.draws().len(), 1);
    assert_eq!(blur.state(), StageState::Ready);
}

#[test]
fn test_show_motion_vector_toggles_technique() {
    let (ctx, state) = mock_context(DeviceCaps::full());
    let mut blur = MotionBlur::new(&ctx).unwrap();
    bind_all(&mut blur, &ctx);
    let techniques_before = state.lock().unwrap().techniques.len();

    blur.show_motion_vector(true);
    assert!(blur.is_showing_motion_vector());
    blur.apply().unwrap();
    blur.show_motion_vector(false);
    blur.apply().unwrap();

    let state = state.lock().unwrap();
    assert_eq!(
        state.effect_binds(),
        vec!["MotionBlurMotionVec".to_string(), "MotionBlur".to_string()]
    );
    // both techniques were resolved up front
    assert_eq!(state.techniques.len(), techniques_before);
}

#[test]
#[should_panic(expected = "Required input pin 2 ('motion_vec_tex') is not bound")]
fn test_apply_without_motion_vectors_panics() {
    let (ctx, _state) = mock_context(DeviceCaps::full());
    let mut blur = MotionBlur::new(&ctx).unwrap();
    let color = mock_texture(&ctx, 8, 8, TextureFormat::R16G16B16A16_SFLOAT);
    let depth = mock_texture(&ctx, 8, 8, TextureFormat::R16_SFLOAT);
    blur.set_input_pin(0, color).unwrap();
    blur.set_input_pin(1, depth).unwrap();
    let _ = blur.apply();
}
