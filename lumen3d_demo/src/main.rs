//! Lumen3D demo: the MotionBlurDoF sample on the headless backend
//!
//! Usage: `lumen3d_demo [frames]` (default 120). Renders the requested number
//! of frames at a fixed 60 Hz step. Halfway through it resizes and switches
//! to per-instance draws; the last frame runs with motion blur and depth of
//! field off. Prints the scene and device statistics at exit.

mod geometry;
mod motion_blur_dof;

use colored::*;
use lumen_3d_engine::lumen3d::render::DeviceCaps;
use lumen_3d_engine::lumen3d::scene::SceneManager;
use lumen_3d_engine::lumen3d::{EngineConfig, Result};
use lumen_3d_engine::{engine_error, engine_info};
use lumen_3d_engine_renderer_headless::HeadlessBackend;
use motion_blur_dof::{make_camera, MotionBlurDoFApp};

const SOURCE: &str = "lumen3d_demo";
const DEFAULT_FRAMES: u64 = 120;
const FRAME_TIME: f32 = 1.0 / 60.0;

fn main() {
    let frames = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);

    if let Err(e) = run(frames) {
        engine_error!(SOURCE, "Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run(frames: u64) -> Result<()> {
    let backend = HeadlessBackend::new(DeviceCaps::full());
    let config = EngineConfig {
        app_name: "Motion Blur and Depth of Field".to_string(),
        ..Default::default()
    };
    let context = backend.context(config)?;

    let (width, height) = (800, 600);
    let mut scene = SceneManager::new(context, make_camera(width, height));
    let mut app = MotionBlurDoFApp::new(&mut scene, width, height)?;
    engine_info!(
        SOURCE,
        "{} objects, {} renderables, {} post-process stages",
        scene.object_count(),
        scene.renderable_count(),
        app.graph().stage_count()
    );

    let mut app_time = 0.0;
    for frame in 0..frames {
        if frame == frames / 2 {
            app.on_resize(&mut scene, 1280, 720)?;
            app.set_use_instancing(&mut scene, false);
        }
        if frame == frames * 3 / 4 {
            app.set_focus_plane(2.5);
            app.set_focus_range(0.5);
            app.set_bokeh(false)?;
            app.set_show_blur_factor(true);
            app.set_show_motion_vector(true);
        }
        if frame + 1 == frames {
            app.set_motion_blur(false)?;
            app.set_depth_of_field(false)?;
        }
        app_time += FRAME_TIME;
        scene.update(&mut app, app_time, FRAME_TIME)?;
    }

    let stats = app.last_stats();
    println!("\n{}", "=== MotionBlurDoF ===".bright_blue().bold());
    println!("  {} {}", "Frames:".white().bold(), app.frames());
    println!("  {} {}x{}", "Size:".white().bold(), app.size().0, app.size().1);
    println!(
        "  {} {} Scene objects {} Renderables {} Primitives {} Vertices",
        "Last frame:".cyan(),
        stats.objects_rendered,
        stats.renderables_rendered,
        stats.primitives_rendered,
        stats.vertices_rendered
    );
    println!(
        "  {} {} ({} draw calls)",
        "Instancing:".cyan(),
        app.is_instancing(),
        stats.draw_calls
    );
    println!(
        "  {} motion blur {}, depth of field {}",
        "Post-process:".cyan(),
        app.is_motion_blur_on(),
        app.is_depth_of_field_on()
    );

    backend.print_stats_report();
    Ok(())
}
