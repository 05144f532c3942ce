//! Unit Cube Geometry
//!
//! An axis-aligned `[0, 1]³` cube, 8 vertices and 12 triangles. It only
//! drives rasterization: the vertex shader scales it to the volume's index
//! box and the pixel shader intersects the real bounds from the parameter
//! block.

use bytemuck::{Pod, Zeroable};

use crate::host::{BufferDesc, BufferId, RenderDevice};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CubeVertex {
    pub position: [f32; 4],
    pub uv: [f32; 2],
}

impl CubeVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x2];

    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

const fn vertex(x: f32, y: f32, z: f32, u: f32, v: f32) -> CubeVertex {
    CubeVertex {
        position: [x, y, z, 1.0],
        uv: [u, v],
    }
}

pub const CUBE_VERTICES: [CubeVertex; 8] = [
    // z = 0
    vertex(0.0, 0.0, 0.0, 0.0, 0.0),
    vertex(1.0, 0.0, 0.0, 1.0, 0.0),
    vertex(0.0, 1.0, 0.0, 0.0, 1.0),
    vertex(1.0, 1.0, 0.0, 1.0, 1.0),
    // z = 1
    vertex(0.0, 0.0, 1.0, 1.0, 1.0),
    vertex(1.0, 0.0, 1.0, 1.0, 0.0),
    vertex(0.0, 1.0, 1.0, 0.0, 1.0),
    vertex(1.0, 1.0, 1.0, 0.0, 0.0),
];

#[rustfmt::skip]
pub const CUBE_INDICES: [u16; 36] = [
    0, 1, 2,  1, 3, 2, // z = 0
    1, 5, 3,  3, 5, 7, // x = 1
    3, 7, 6,  2, 3, 6, // y = 1
    2, 4, 0,  2, 6, 4, // x = 0
    0, 4, 5,  1, 0, 5, // y = 0
    5, 4, 6,  5, 6, 7, // z = 1
];

pub const CUBE_INDEX_FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint16;

/// Indexed draw arguments for one unit cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedDraw {
    pub vertex_count: u32,
    pub index_count: u32,
    pub instance_count: u32,
}

impl IndexedDraw {
    pub const UNIT_CUBE: Self = Self {
        vertex_count: CUBE_VERTICES.len() as u32,
        index_count: CUBE_INDICES.len() as u32,
        instance_count: 1,
    };

    #[inline]
    #[must_use]
    pub const fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}

/// Device handles of the static cube buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitCubeBuffers {
    pub vertex: Option<BufferId>,
    pub index: Option<BufferId>,
}

impl UnitCubeBuffers {
    /// Creates whichever buffer is missing or no longer valid on `device`.
    /// Returns `true` when something was (re)allocated.
    pub fn ensure(&mut self, device: &mut dyn RenderDevice) -> bool {
        let mut created = false;

        if !self.vertex.is_some_and(|id| device.is_buffer_valid(id)) {
            self.vertex = Some(device.create_buffer(&BufferDesc {
                label: "VdbUnitCubeVB",
                contents: bytemuck::cast_slice(&CUBE_VERTICES),
                usage: wgpu::BufferUsages::VERTEX,
            }));
            created = true;
        }

        if !self.index.is_some_and(|id| device.is_buffer_valid(id)) {
            self.index = Some(device.create_buffer(&BufferDesc {
                label: "VdbUnitCubeIB",
                contents: bytemuck::cast_slice(&CUBE_INDICES),
                usage: wgpu::BufferUsages::INDEX,
            }));
            created = true;
        }

        if created {
            log::debug!("Unit cube buffers allocated");
        }
        created
    }

    /// Both handles, when allocated.
    #[inline]
    #[must_use]
    pub fn handles(&self) -> Option<(BufferId, BufferId)> {
        Some((self.vertex?, self.index?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_twelve_triangles_over_eight_vertices() {
        assert_eq!(IndexedDraw::UNIT_CUBE.vertex_count, 8);
        assert_eq!(IndexedDraw::UNIT_CUBE.triangle_count(), 12);
        assert!(CUBE_INDICES.iter().all(|&i| (i as usize) < CUBE_VERTICES.len()));
    }

    #[test]
    fn cube_is_unit_sized() {
        for v in &CUBE_VERTICES {
            assert!(v.position[..3].iter().all(|c| *c == 0.0 || *c == 1.0));
            assert_eq!(v.position[3], 1.0);
        }
    }

    #[test]
    fn every_vertex_is_referenced() {
        for i in 0..CUBE_VERTICES.len() as u16 {
            assert!(CUBE_INDICES.contains(&i));
        }
    }
}
