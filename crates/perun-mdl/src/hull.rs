//! Convex-hull vertex subset.
//!
//! The engine wants a small set of hull vertices per mesh for coarse
//! culling, not an exact hull. Extreme points along a fixed fan of 26
//! directions (faces, edges, and corners of the unit cube) are guaranteed to
//! lie on the convex hull and are cheap to find in one pass per direction.

use glam::Vec3;

/// Select a deterministic convex-hull vertex subset.
///
/// Ties along a direction resolve to the lowest vertex index, so the result
/// is stable for identical input. Returns at most 26 vertices, in ascending
/// input order, deduplicated by index.
pub fn hull_subset(points: &[Vec3]) -> Vec<Vec3> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut extremes = Vec::with_capacity(26);
    for ix in -1i32..=1 {
        for iy in -1i32..=1 {
            for iz in -1i32..=1 {
                if ix == 0 && iy == 0 && iz == 0 {
                    continue;
                }
                let direction = Vec3::new(ix as f32, iy as f32, iz as f32);

                let mut best = 0;
                let mut best_dot = points[0].dot(direction);
                for (i, point) in points.iter().enumerate().skip(1) {
                    let dot = point.dot(direction);
                    if dot > best_dot {
                        best = i;
                        best_dot = dot;
                    }
                }
                extremes.push(best);
            }
        }
    }

    extremes.sort_unstable();
    extremes.dedup();
    extremes.into_iter().map(|i| points[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> Vec<Vec3> {
        let mut points = Vec::new();
        for &x in &[-1.0f32, 1.0] {
            for &y in &[-1.0f32, 1.0] {
                for &z in &[-1.0f32, 1.0] {
                    points.push(Vec3::new(x, y, z));
                }
            }
        }
        // Interior points must never be selected.
        points.push(Vec3::ZERO);
        points.push(Vec3::splat(0.25));
        points
    }

    #[test]
    fn test_cube_corners_selected() {
        let points = cube();
        let hull = hull_subset(&points);
        assert_eq!(hull.len(), 8);
        for corner in &points[..8] {
            assert!(hull.contains(corner));
        }
    }

    #[test]
    fn test_deterministic() {
        let points = cube();
        assert_eq!(hull_subset(&points), hull_subset(&points));
    }

    #[test]
    fn test_empty_input() {
        assert!(hull_subset(&[]).is_empty());
    }

    #[test]
    fn test_single_point() {
        let hull = hull_subset(&[Vec3::ONE]);
        assert_eq!(hull, vec![Vec3::ONE]);
    }
}
