// Centerpiece star geometry: a 2D five-point star outline extruded into a
// beveled solid. Pure functions — outline, then extrude — no geometry
// subclassing.

use super::mesh::PolyMesh;
use glam::{Vec2, Vec3};
use std::f32::consts::TAU;

/// 2D star polygon: `points * 2` vertices alternating between the outer and
/// inner radius, starting at the top, wound CCW.
pub fn star_outline(points: usize, outer_radius: f32, inner_radius: f32) -> Vec<Vec2> {
    debug_assert!(points >= 2);
    let n = points * 2;
    (0..n)
        .map(|i| {
            let radius = if i % 2 == 0 { outer_radius } else { inner_radius };
            let angle = i as f32 / n as f32 * TAU - TAU / 4.0;
            Vec2::new(angle.cos() * radius, angle.sin() * radius)
        })
        .collect()
}

/// Extrude a closed CCW outline along Z with a single-segment bevel on both
/// caps. The outline must contain the origin (true for any star outline) so
/// caps can be fan-triangulated around a center vertex. The result is
/// centered on the origin with total depth `depth + 2 * bevel_thickness`.
pub fn extrude_beveled(
    outline: &[Vec2],
    depth: f32,
    bevel_thickness: f32,
    bevel_size: f32,
) -> PolyMesh {
    let n = outline.len();
    debug_assert!(n >= 3);
    let half = depth / 2.0;
    let inset = 1.0 - bevel_size;

    let mut mesh = PolyMesh::new();
    let ring = |mesh: &mut PolyMesh, z: f32, scale: f32| -> usize {
        let start = mesh.vertex_count();
        for p in outline {
            mesh.add_vertex(Vec3::new(p.x * scale, p.y * scale, z));
        }
        start
    };

    let back_bevel = ring(&mut mesh, -half - bevel_thickness, inset);
    let back = ring(&mut mesh, -half, 1.0);
    let front = ring(&mut mesh, half, 1.0);
    let front_bevel = ring(&mut mesh, half + bevel_thickness, inset);
    let back_center = mesh.add_vertex(Vec3::new(0.0, 0.0, -half - bevel_thickness));
    let front_center = mesh.add_vertex(Vec3::new(0.0, 0.0, half + bevel_thickness));

    // Bands, CCW from outside. For two rings the quad [upper_i, lower_i,
    // lower_next, upper_next] faces outward when "upper" has the larger z.
    let mut band = |upper: usize, lower: usize| {
        for i in 0..n {
            let next = (i + 1) % n;
            mesh.add_face(vec![upper + i, lower + i, lower + next, upper + next]);
        }
    };
    band(back, back_bevel);
    band(front, back);
    band(front_bevel, front);

    // Caps as fans around the center vertices.
    for i in 0..n {
        let next = (i + 1) % n;
        mesh.add_face(vec![front_center, front_bevel + i, front_bevel + next]);
        mesh.add_face(vec![back_center, back_bevel + next, back_bevel + i]);
    }

    mesh
}

/// The ornament mesh used atop the tree: five points, unit outer radius,
/// 0.45 inner radius, shallow extrusion with a slight bevel.
pub fn ornament() -> PolyMesh {
    let outline = star_outline(5, 1.0, 0.45);
    extrude_beveled(&outline, 0.1, 0.05, 0.05)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_alternates_radii() {
        let outline = star_outline(5, 1.0, 0.45);
        assert_eq!(outline.len(), 10);
        for (i, p) in outline.iter().enumerate() {
            let expected = if i % 2 == 0 { 1.0 } else { 0.45 };
            assert!((p.length() - expected).abs() < 1e-5);
        }
        // First vertex lies on the vertical axis.
        assert!(outline[0].x.abs() < 1e-5);
        assert!((outline[0].y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn outline_is_ccw() {
        let outline = star_outline(5, 1.0, 0.45);
        // Shoelace signed area: positive for CCW winding.
        let area: f32 = outline
            .iter()
            .zip(outline.iter().cycle().skip(1))
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum();
        assert!(area > 0.0);
    }

    #[test]
    fn extrusion_is_centered_and_closed() {
        let mesh = ornament();
        // 4 rings of 10 + 2 cap centers
        assert_eq!(mesh.vertex_count(), 42);
        // 3 bands of 10 quads + 2 caps of 10 triangles
        assert_eq!(mesh.faces.len(), 50);

        let (min_z, max_z) = mesh.positions.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
            (lo.min(p.z), hi.max(p.z))
        });
        assert!((min_z + max_z).abs() < 1e-5, "not centered on z");
        assert!((max_z - min_z - 0.2).abs() < 1e-5, "depth + bevels mismatch");
    }
}
