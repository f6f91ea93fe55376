/// Vertex / index buffers and render layouts

use super::handles::BufferHandle;
use super::texture::{AccessHint, TextureFormat};

/// Which binding point a buffer is created for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Descriptor for creating a GPU buffer with initial contents
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Binding point
    pub kind: BufferKind,
    /// Access hints (static geometry is `GPU_READ | IMMUTABLE`)
    pub access: AccessHint,
    /// Initial contents
    pub data: Vec<u8>,
}

impl BufferDesc {
    /// Immutable vertex buffer from any plain-old-data slice
    pub fn immutable_vertices<T: bytemuck::Pod>(data: &[T]) -> Self {
        Self {
            kind: BufferKind::Vertex,
            access: AccessHint::GPU_READ | AccessHint::IMMUTABLE,
            data: bytemuck::cast_slice(data).to_vec(),
        }
    }

    /// Immutable 32-bit index buffer
    pub fn immutable_indices(indices: &[u32]) -> Self {
        Self {
            kind: BufferKind::Index,
            access: AccessHint::GPU_READ | AccessHint::IMMUTABLE,
            data: bytemuck::cast_slice(indices).to_vec(),
        }
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    PointList,
    TriangleList,
    TriangleStrip,
}

/// Index element format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    U16,
    U32,
}

/// Restart marker for 32-bit strip indices
pub const PRIMITIVE_RESTART_U32: u32 = 0xFFFF_FFFF;

/// Vertex stream bound to a render layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexStream {
    pub buffer: BufferHandle,
    /// Format of the single position element
    pub format: TextureFormat,
    pub vertex_count: u32,
}

/// Index stream bound to a render layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStream {
    pub buffer: BufferHandle,
    pub format: IndexFormat,
    pub index_count: u32,
}

/// Descriptor for creating a render layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLayoutDesc {
    pub topology: PrimitiveTopology,
    pub vertices: VertexStream,
    pub indices: Option<IndexStream>,
}

impl RenderLayoutDesc {
    /// Number of elements the draw consumes (indices if present, else vertices)
    pub fn element_count(&self) -> u32 {
        match &self.indices {
            Some(ib) => ib.index_count,
            None => self.vertices.vertex_count,
        }
    }
}
