/// Descriptors of the stock single-pass stages.
///
/// Effect and technique names are the ones the shipped effect files use.
/// Parameter order is the index order of [`PostProcessPass::set_param`](super::PostProcessPass::set_param).

use super::post_process::{DispatchGrid, PostProcessDesc};

pub const COPY_EFFECT: &str = "Copy.fxml";
pub const DEPTH_TO_SM_EFFECT: &str = "DepthToSM.fxml";
pub const DEPTH_OF_FIELD_EFFECT: &str = "DepthOfFieldPP.fxml";
pub const MOTION_BLUR_PP_EFFECT: &str = "MotionBlurPP.fxml";
pub const SAT_EFFECT: &str = "SummedAreaTable.fxml";

/// Texels per thread group side for per-texel compute passes
pub const COMPUTE_GROUP_SIZE: u32 = 16;

/// Taps summed per raster scan pass
pub const SAT_TAPS_PER_PASS: u32 = 8;

/// `src_tex` -> `output`
pub fn copy() -> PostProcessDesc {
    PostProcessDesc::new("Copy", COPY_EFFECT, "Copy").inputs(&["src_tex"])
}

/// Hardware depth -> linear view depth.
///
/// Param 0: `near_q` = (near * q, q) with q = far / (far - near).
pub fn depth_to_linear() -> PostProcessDesc {
    PostProcessDesc::new("DepthToSM", DEPTH_TO_SM_EFFECT, "DepthToSM")
        .inputs(&["src_tex"])
        .params(&["near_q"])
}

/// Depth-of-field spreading into the summed-area-table source.
///
/// Params: 0 `tex_size` (w, h, 1/w, 1/h of the spread texture),
/// 1 `max_radius`, 2 `focus_plane_inv_range` (-plane/range, 1/range).
pub fn spreading(compute: bool) -> PostProcessDesc {
    let desc = if compute {
        PostProcessDesc::new("spreading_cs", DEPTH_OF_FIELD_EFFECT, "DepthOfFieldSpreadingCS")
            .compute(DispatchGrid::Texels { group_size: [COMPUTE_GROUP_SIZE, COMPUTE_GROUP_SIZE] })
    } else {
        PostProcessDesc::new("spreading", DEPTH_OF_FIELD_EFFECT, "DepthOfFieldSpreading")
    };
    desc.inputs(&["color_tex", "depth_tex"])
        .params(&["tex_size", "max_radius", "focus_plane_inv_range"])
}

/// Bokeh composite over the blurred scene.
///
/// Params: 0 `in_width_height`, 1 `bokeh_width_height`, 2 `max_radius`,
/// 3 `focus_plane_inv_range`, 4 `focus_plane`, 5 `background_offset`.
pub fn merge_bokeh() -> PostProcessDesc {
    PostProcessDesc::new("merge_bokeh", DEPTH_OF_FIELD_EFFECT, "MergeBokeh")
        .inputs(&["bokeh_tex", "depth_tex"])
        .params(&[
            "in_width_height",
            "bokeh_width_height",
            "max_radius",
            "focus_plane_inv_range",
            "focus_plane",
            "background_offset",
        ])
}

/// One raster summed-area-table scan pass along x or y.
///
/// Params: 0 `tex_size` (w, h, 1/w, 1/h), 1 `tap_step` (texel spacing of
/// the 8 taps, 8^pass).
pub fn sat_scan(vertical: bool) -> PostProcessDesc {
    let (name, technique) = if vertical {
        ("sat_scan_y", "SATScanY")
    } else {
        ("sat_scan_x", "SATScanX")
    };
    PostProcessDesc::new(name, SAT_EFFECT, technique)
        .inputs(&["src_tex"])
        .params(&["tex_size", "tap_step"])
}

/// Compute summed-area-table scan: one thread group per row (x) or column (y),
/// reading and writing `output` in place.
pub fn sat_scan_cs(vertical: bool) -> PostProcessDesc {
    let (name, technique, grid) = if vertical {
        ("sat_scan_y_cs", "SATScanYCS", DispatchGrid::Columns)
    } else {
        ("sat_scan_x_cs", "SATScanXCS", DispatchGrid::Rows)
    };
    PostProcessDesc::new(name, SAT_EFFECT, technique).compute(grid)
}

#[cfg(test)]
#[path = "library_tests.rs"]
mod tests;
