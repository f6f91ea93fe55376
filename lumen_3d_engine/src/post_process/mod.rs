//! Post-process pin graph
//!
//! Stages with named input/output texture pins, the stock stages built on
//! them, and a graph that wires stages through texture slots.

mod pin;
mod post_process;
pub mod library;
mod motion_blur;
mod summed_area_table;
mod depth_of_field;
mod bokeh_filter;
mod graph;

pub use pin::{Pin, PinDirection, PinSet};
pub use post_process::{
    DispatchGrid, Execution, PostProcess, PostProcessDesc, PostProcessPass, StageState,
};
pub use motion_blur::MotionBlur;
pub use summed_area_table::{scan_passes, size_param, SummedAreaTable};
pub use depth_of_field::{spread_extent, DepthOfField};
pub use bokeh_filter::{bokeh_extents, BokehFilter};
pub use graph::{PinRef, PostProcessGraph, SlotId, SlotKind, StageId};
