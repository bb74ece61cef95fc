// Procedural particle meshes and triangulation.
//
// Every particle group shares one tiny unit mesh drawn thousands of times via
// instancing: octahedra for the canopy, icosahedra for the glints, and low-res
// UV spheres for the orbit particles and the background stars. All are built
// once at startup as a PolyMesh and triangulated with smooth normals.

use glam::Vec3;
use std::f32::consts::{PI, TAU};

// ============================================================================
// GPU VERTEX
// ============================================================================

/// GPU-ready vertex with position and normal:
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl GpuVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

// ============================================================================
// POLY MESH
// ============================================================================

/// Intermediate polygon mesh for procedural construction. Supports n-gon
/// faces with CCW winding viewed from outside. Only used at startup; heap
/// allocation per face is acceptable.
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces: Vec<Vec<usize>>,
}

impl PolyMesh {
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Vec3) -> usize {
        let idx = self.positions.len();
        self.positions.push(pos);
        idx
    }

    /// Add a face by vertex indices (CCW order).
    pub fn add_face(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.len() >= 3, "face must have at least 3 vertices");
        self.faces.push(indices);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// GPU-ready triangulated mesh with per-vertex smooth normals. Upload
/// vertex_bytes() to a VERTEX buffer, index_bytes() to an INDEX buffer.
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices: Vec<u32>,
}

impl RenderMesh {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Convert a PolyMesh to a RenderMesh using smooth, area-weighted normals.
/// Vertices are shared across triangles via the index buffer; the cross
/// product magnitude (2x triangle area) gives automatic area-weighting.
pub fn triangulate_smooth(poly: &PolyMesh) -> RenderMesh {
    let n_verts = poly.vertex_count();
    let mut normal_accum: Vec<Vec3> = vec![Vec3::ZERO; n_verts];

    for face in &poly.faces {
        let n = face.len();
        // Fan triangulate from vertex 0
        for i in 1..(n - 1) {
            let a = poly.positions[face[0]];
            let b = poly.positions[face[i]];
            let c = poly.positions[face[i + 1]];
            let weighted_normal = (b - a).cross(c - a);
            normal_accum[face[0]] += weighted_normal;
            normal_accum[face[i]] += weighted_normal;
            normal_accum[face[i + 1]] += weighted_normal;
        }
    }

    let vertices: Vec<GpuVertex> = poly
        .positions
        .iter()
        .zip(normal_accum.iter())
        .map(|(pos, n)| GpuVertex {
            position: pos.to_array(),
            normal: n.normalize_or_zero().to_array(),
        })
        .collect();

    let mut indices: Vec<u32> = Vec::new();
    for face in &poly.faces {
        let n = face.len();
        for i in 1..(n - 1) {
            indices.push(face[0] as u32);
            indices.push(face[i] as u32);
            indices.push(face[i + 1] as u32);
        }
    }

    RenderMesh { vertices, indices }
}

// ============================================================================
// UNIT SOLIDS
// ============================================================================

/// Unit octahedron: six vertices on the axes, eight triangular faces.
pub fn octahedron() -> PolyMesh {
    let mut mesh = PolyMesh::new();
    let px = mesh.add_vertex(Vec3::X);
    let nx = mesh.add_vertex(-Vec3::X);
    let py = mesh.add_vertex(Vec3::Y);
    let ny = mesh.add_vertex(-Vec3::Y);
    let pz = mesh.add_vertex(Vec3::Z);
    let nz = mesh.add_vertex(-Vec3::Z);

    // Upper pyramid then lower, CCW from outside.
    mesh.add_face(vec![py, pz, px]);
    mesh.add_face(vec![py, px, nz]);
    mesh.add_face(vec![py, nz, nx]);
    mesh.add_face(vec![py, nx, pz]);
    mesh.add_face(vec![ny, px, pz]);
    mesh.add_face(vec![ny, nz, px]);
    mesh.add_face(vec![ny, nx, nz]);
    mesh.add_face(vec![ny, pz, nx]);
    mesh
}

/// Unit icosahedron built from three orthogonal golden rectangles.
pub fn icosahedron() -> PolyMesh {
    let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let inv = 1.0 / (1.0 + phi * phi).sqrt();
    let a = inv;
    let b = phi * inv;

    let mut mesh = PolyMesh::new();
    let raw = [
        (-a, b, 0.0), (a, b, 0.0), (-a, -b, 0.0), (a, -b, 0.0),
        (0.0, -a, b), (0.0, a, b), (0.0, -a, -b), (0.0, a, -b),
        (b, 0.0, -a), (b, 0.0, a), (-b, 0.0, -a), (-b, 0.0, a),
    ];
    for (x, y, z) in raw {
        mesh.add_vertex(Vec3::new(x, y, z));
    }

    const FACES: [[usize; 3]; 20] = [
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];
    for f in FACES {
        mesh.add_face(f.to_vec());
    }
    mesh
}

/// Unit UV sphere with the given ring and segment counts. The orbit particles
/// use 5x5 and the background stars 4x4 — deliberately coarse, they render at
/// a few pixels each.
pub fn uv_sphere(rings: usize, segments: usize) -> PolyMesh {
    debug_assert!(rings >= 2 && segments >= 3);
    let mut mesh = PolyMesh::new();

    let top = mesh.add_vertex(Vec3::Y);
    let mut ring_start = Vec::with_capacity(rings - 1);
    for r in 1..rings {
        let polar = PI * r as f32 / rings as f32;
        let start = mesh.vertex_count();
        ring_start.push(start);
        for s in 0..segments {
            let azimuth = TAU * s as f32 / segments as f32;
            mesh.add_vertex(Vec3::new(
                polar.sin() * azimuth.cos(),
                polar.cos(),
                polar.sin() * azimuth.sin(),
            ));
        }
    }
    let bottom = mesh.add_vertex(-Vec3::Y);

    // Top cap
    for s in 0..segments {
        let next = (s + 1) % segments;
        mesh.add_face(vec![top, ring_start[0] + next, ring_start[0] + s]);
    }
    // Quad strips between rings
    for r in 0..rings - 2 {
        let upper = ring_start[r];
        let lower = ring_start[r + 1];
        for s in 0..segments {
            let next = (s + 1) % segments;
            mesh.add_face(vec![upper + s, upper + next, lower + next, lower + s]);
        }
    }
    // Bottom cap
    let last = ring_start[rings - 2];
    for s in 0..segments {
        let next = (s + 1) % segments;
        mesh.add_face(vec![bottom, last + s, last + next]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unit_radii(mesh: &PolyMesh) {
        for p in &mesh.positions {
            assert!((p.length() - 1.0).abs() < 1e-5, "vertex off unit sphere: {p:?}");
        }
    }

    #[test]
    fn octahedron_counts() {
        let mesh = octahedron();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.faces.len(), 8);
        assert_unit_radii(&mesh);
    }

    #[test]
    fn icosahedron_counts() {
        let mesh = icosahedron();
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.faces.len(), 20);
        assert_unit_radii(&mesh);
    }

    #[test]
    fn uv_sphere_counts() {
        let mesh = uv_sphere(5, 5);
        // poles + interior rings
        assert_eq!(mesh.vertex_count(), 2 + 4 * 5);
        assert_unit_radii(&mesh);
        let render = triangulate_smooth(&mesh);
        assert_eq!(render.vertices.len(), mesh.vertex_count());
        assert!(render.index_count() % 3 == 0);
    }

    #[test]
    fn smooth_normals_point_outward() {
        let render = triangulate_smooth(&octahedron());
        for v in &render.vertices {
            let p = Vec3::from_array(v.position);
            let n = Vec3::from_array(v.normal);
            assert!(p.dot(n) > 0.0, "normal flipped at {p:?}");
        }
    }
}
