//! CPU-side label meshes.
//!
//! Every style owns one quad mesh per glyph/sprite atlas. Meshes are rebuilt
//! from scratch each frame and uploaded by the renderer in draw chunks of at
//! most `max_quad_vertices` vertices, so a chunk can always be indexed with
//! `u16`.

use bytemuck::{Pod, Zeroable};

use crate::error::{LabelError, LabelResult};
use crate::labels::types::VertexAttributes;

/// Vertex layout shared by text and sprite labels.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LabelVertex {
    pub position: [f32; 2], // screen pixels
    pub uv: [u16; 2],       // normalized atlas coords
    pub selection_color: u32,
    pub fill: u32,
    pub stroke: u32,
    pub alpha: u16,
    pub font_scale: u16,
}

impl LabelVertex {
    /// Vertex carrying a label's attributes, position and uv left zeroed.
    pub fn from_attributes(attributes: &VertexAttributes, alpha: f32) -> Self {
        Self {
            position: [0.0; 2],
            uv: [0; 2],
            selection_color: attributes.selection_color,
            fill: attributes.fill,
            stroke: attributes.stroke,
            alpha: (alpha.clamp(0.0, 1.0) * u16::MAX as f32) as u16,
            font_scale: attributes.font_scale,
        }
    }
}

/// Growable quad list split into fixed-size draw chunks.
#[derive(Debug, Clone)]
pub struct DynamicQuadMesh {
    vertices: Vec<LabelVertex>,
    max_vertices: usize,
}

impl DynamicQuadMesh {
    pub fn new(max_vertices: usize) -> Self {
        Self {
            vertices: Vec::new(),
            max_vertices: (max_vertices / 4).max(1) * 4,
        }
    }

    /// Append a zeroed quad and return its four vertices.
    pub fn push_quad(&mut self) -> &mut [LabelVertex] {
        let start = self.vertices.len();
        self.vertices.resize(start + 4, LabelVertex::zeroed());
        &mut self.vertices[start..]
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    pub fn vertices(&self) -> &[LabelVertex] {
        &self.vertices
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex slices to draw, each at most `max_vertices` long.
    pub fn draw_chunks(&self) -> impl Iterator<Item = &[LabelVertex]> {
        self.vertices.chunks(self.max_vertices)
    }

    /// Raw bytes for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index buffer for one full chunk: two triangles per quad.
    pub fn chunk_indices(&self) -> Vec<u16> {
        (0..self.max_vertices / 4)
            .flat_map(|q| {
                let base = (q * 4) as u16;
                [base, base + 1, base + 2, base + 2, base + 3, base]
            })
            .collect()
    }
}

/// The per-atlas meshes of one style.
#[derive(Debug, Clone)]
pub struct StyleMeshes {
    meshes: Vec<DynamicQuadMesh>,
    max_vertices: usize,
}

impl StyleMeshes {
    pub fn new(atlas_count: usize, max_vertices: usize) -> Self {
        Self {
            meshes: (0..atlas_count).map(|_| DynamicQuadMesh::new(max_vertices)).collect(),
            max_vertices,
        }
    }

    /// Grow the mesh list when new atlases are allocated.
    pub fn ensure_atlas_count(&mut self, count: usize) {
        while self.meshes.len() < count {
            self.meshes.push(DynamicQuadMesh::new(self.max_vertices));
        }
    }

    pub fn atlas_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn mesh(&self, atlas: usize) -> Option<&DynamicQuadMesh> {
        self.meshes.get(atlas)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DynamicQuadMesh> {
        self.meshes.iter()
    }

    /// Append a quad to the mesh of `atlas`.
    pub fn push_quad(&mut self, atlas: usize) -> LabelResult<&mut [LabelVertex]> {
        let available = self.meshes.len();
        self.meshes
            .get_mut(atlas)
            .map(DynamicQuadMesh::push_quad)
            .ok_or(LabelError::MeshIndex { atlas, available })
    }

    pub fn clear(&mut self) {
        for mesh in &mut self.meshes {
            mesh.clear();
        }
    }

    pub fn quad_count(&self) -> usize {
        self.meshes.iter().map(DynamicQuadMesh::quad_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<LabelVertex>(), 28);
    }

    #[test]
    fn test_chunks() {
        let mut mesh = DynamicQuadMesh::new(8);
        for _ in 0..5 {
            mesh.push_quad();
        }
        let chunks: Vec<usize> = mesh.draw_chunks().map(|c| c.len()).collect();
        assert_eq!(chunks, vec![8, 8, 4]);
        assert_eq!(mesh.chunk_indices(), vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert_eq!(mesh.as_bytes().len(), 20 * 28);
    }

    #[test]
    fn test_missing_atlas() {
        let mut meshes = StyleMeshes::new(1, 16384);
        assert!(meshes.push_quad(0).is_ok());
        match meshes.push_quad(2) {
            Err(LabelError::MeshIndex { atlas, available }) => {
                assert_eq!(atlas, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        meshes.ensure_atlas_count(3);
        assert!(meshes.push_quad(2).is_ok());
        assert_eq!(meshes.quad_count(), 2);
    }
}
