/// Procedural geometry and instance placement for the demo scene

use glam::{Mat4, Vec3, Vec4};
use lumen_3d_engine::lumen3d::render::{
    BufferDesc, IndexFormat, IndexStream, PrimitiveTopology, RenderLayoutDesc,
    RenderLayoutHandle, TextureFormat, VertexStream,
};
use lumen_3d_engine::lumen3d::scene::{pack_abgr, AABB};
use lumen_3d_engine::lumen3d::{EngineContext, Result};

pub const NUM_INSTANCE: usize = 400;
pub const NUM_LINE: usize = 10;

/// Half extent of one object
const OBJECT_HALF_SIZE: f32 = 0.04;

/// Unit cube corners; the vertex shader scales them by the mesh bounds
const CUBE_CORNERS: [Vec4; 8] = [
    Vec4::new(-1.0, -1.0, -1.0, 1.0),
    Vec4::new(1.0, -1.0, -1.0, 1.0),
    Vec4::new(-1.0, 1.0, -1.0, 1.0),
    Vec4::new(1.0, 1.0, -1.0, 1.0),
    Vec4::new(-1.0, -1.0, 1.0, 1.0),
    Vec4::new(1.0, -1.0, 1.0, 1.0),
    Vec4::new(-1.0, 1.0, 1.0, 1.0),
    Vec4::new(1.0, 1.0, 1.0, 1.0),
];

#[rustfmt::skip]
const CUBE_INDICES: [u32; 36] = [
    0, 2, 1, 1, 2, 3, // -z
    4, 5, 6, 5, 7, 6, // +z
    0, 4, 2, 2, 4, 6, // -x
    1, 3, 5, 3, 7, 5, // +x
    2, 6, 3, 3, 6, 7, // +y
    0, 1, 4, 1, 5, 4, // -y
];

/// Cube layout shared by the instanced and the non-instanced mesh
pub fn make_cube_layout(context: &EngineContext) -> Result<RenderLayoutHandle> {
    context.with_factory(|f| {
        let vb = f.make_buffer(&BufferDesc::immutable_vertices(&CUBE_CORNERS))?;
        let ib = f.make_buffer(&BufferDesc::immutable_indices(&CUBE_INDICES))?;
        f.make_render_layout(&RenderLayoutDesc {
            topology: PrimitiveTopology::TriangleList,
            vertices: VertexStream {
                buffer: vb,
                format: TextureFormat::R32G32B32A32_SFLOAT,
                vertex_count: CUBE_CORNERS.len() as u32,
            },
            indices: Some(IndexStream {
                buffer: ib,
                format: IndexFormat::U32,
                index_count: CUBE_INDICES.len() as u32,
            }),
        })
    })
}

pub fn cube_bounds() -> AABB {
    AABB::from_center_half_size(Vec3::ZERO, Vec3::splat(OBJECT_HALF_SIZE))
}

/// Placement of instance `index` in `line`: one ring per line, rings
/// stacked along Y.
pub fn instance_transform(line: usize, index: usize) -> Mat4 {
    let per_line = (NUM_INSTANCE / NUM_LINE) as f32;
    let angle = index as f32 / per_line * std::f32::consts::TAU;
    let height = (line as f32 - (NUM_LINE as f32 - 1.0) / 2.0) * 0.15;
    let radius = 0.8 + 0.05 * line as f32;
    Mat4::from_translation(Vec3::new(radius * angle.cos(), height, radius * angle.sin()))
}

/// Packed color of every instance in `line`, hue walking around the wheel
pub fn line_color(line: usize) -> u32 {
    let hue = line as f32 / NUM_LINE as f32 * 6.0;
    let x = 1.0 - (hue % 2.0 - 1.0).abs();
    let (r, g, b) = match hue as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    pack_abgr(Vec4::new(r, g, b, 1.0))
}
