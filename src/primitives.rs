//! Inbound mesh abstraction: primitive enumeration with bounding boxes.
//!
//! The octree and the mesh influence field consume meshes through the
//! object-safe [`PrimitiveSource`] trait so that any host representation can
//! feed the spatial index without copying vertex buffers. A concrete
//! [`TriangleMesh`] implementation with exact closest-point-on-triangle math
//! is provided for the common case.

use glam::DVec3;

use crate::aabb::Aabb;

/// Attribute name carrying vertex positions.
pub const POSITION_ATTRIBUTE: &str = "position";

/// Read-only view over a host mesh's primitives.
///
/// Bounding boxes and closest points are keyed by attribute name so a host
/// can expose more than one point channel; implementations backed by a single
/// channel may ignore the attribute.
pub trait PrimitiveSource: Send + Sync {
  /// Number of primitives in the mesh.
  fn primitive_count(&self) -> usize;

  /// Bounding box of a single primitive.
  fn primitive_bounds(&self, index: usize, attribute: &str) -> Aabb;

  /// Closest point on a single primitive to `point`.
  fn primitive_closest_point(&self, index: usize, attribute: &str, point: DVec3) -> DVec3;

  /// Bounding box over the whole mesh for the given attribute.
  fn bounding_box(&self, attribute: &str) -> Aabb;
}

/// Indexed triangle mesh backing a [`PrimitiveSource`].
///
/// Carries only the position channel; the attribute argument of the trait
/// methods is ignored.
#[derive(Clone, Debug)]
pub struct TriangleMesh {
  positions: Vec<DVec3>,
  indices: Vec<u32>,
}

impl TriangleMesh {
  /// Create a triangle mesh from a position buffer and flat indices.
  ///
  /// # Panics
  /// Panics if the index count is not a multiple of three or any index is
  /// out of range (caller bug).
  pub fn new(positions: Vec<DVec3>, indices: Vec<u32>) -> Self {
    assert!(
      indices.len() % 3 == 0,
      "triangle mesh index count must be a multiple of 3, got {}",
      indices.len()
    );
    assert!(
      indices.iter().all(|&i| (i as usize) < positions.len()),
      "triangle mesh index out of range"
    );
    Self { positions, indices }
  }

  /// Corner positions of triangle `index`.
  #[inline]
  pub fn triangle(&self, index: usize) -> [DVec3; 3] {
    let base = index * 3;
    [
      self.positions[self.indices[base] as usize],
      self.positions[self.indices[base + 1] as usize],
      self.positions[self.indices[base + 2] as usize],
    ]
  }

  pub fn positions(&self) -> &[DVec3] {
    &self.positions
  }
}

impl PrimitiveSource for TriangleMesh {
  fn primitive_count(&self) -> usize {
    self.indices.len() / 3
  }

  fn primitive_bounds(&self, index: usize, _attribute: &str) -> Aabb {
    let [a, b, c] = self.triangle(index);
    let mut bounds = Aabb::at_point(a);
    bounds.encapsulate_point(b);
    bounds.encapsulate_point(c);
    bounds
  }

  fn primitive_closest_point(&self, index: usize, _attribute: &str, point: DVec3) -> DVec3 {
    let [a, b, c] = self.triangle(index);
    closest_point_on_triangle(point, a, b, c)
  }

  fn bounding_box(&self, _attribute: &str) -> Aabb {
    match self.positions.split_first() {
      Some((&first, rest)) => {
        let mut bounds = Aabb::at_point(first);
        for &p in rest {
          bounds.encapsulate_point(p);
        }
        bounds
      }
      None => Aabb::at_point(DVec3::ZERO),
    }
  }
}

/// Closest point on a triangle to `point`.
///
/// Projects onto the triangle plane when the projection lands inside the
/// triangle, otherwise clamps onto the nearest edge.
pub fn closest_point_on_triangle(point: DVec3, v0: DVec3, v1: DVec3, v2: DVec3) -> DVec3 {
  let e0 = v1 - v0;
  let e1 = v2 - v1;
  let e2 = v0 - v2;

  let n = e0.cross(e1);

  let p0 = point - v0;
  let p1 = point - v1;
  let p2 = point - v2;

  // Each e_i x n points outward from edge i; the projection lands inside
  // the triangle exactly when every d_i is non-positive
  let d0 = e0.cross(n).dot(p0);
  let d1 = e1.cross(n).dot(p1);
  let d2 = e2.cross(n).dot(p2);

  let len_sq = n.length_squared();
  if d0 <= 0.0 && d1 <= 0.0 && d2 <= 0.0 && len_sq > 1e-30 {
    // Inside triangle - project onto the plane
    return point - n * (p0.dot(n) / len_sq);
  }

  // Outside (or degenerate) - clamp onto each edge, keep the nearest
  let clamp_edge = |origin: DVec3, edge: DVec3, rel: DVec3| -> DVec3 {
    let denom = edge.dot(edge);
    if denom <= 1e-30 {
      return origin;
    }
    origin + edge * (rel.dot(edge) / denom).clamp(0.0, 1.0)
  };

  let c0 = clamp_edge(v0, e0, p0);
  let c1 = clamp_edge(v1, e1, p1);
  let c2 = clamp_edge(v2, e2, p2);

  let q0 = point.distance_squared(c0);
  let q1 = point.distance_squared(c1);
  let q2 = point.distance_squared(c2);

  if q0 <= q1 && q0 <= q2 {
    c0
  } else if q1 <= q2 {
    c1
  } else {
    c2
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const EPS: f64 = 1e-9;

  fn unit_triangle() -> (DVec3, DVec3, DVec3) {
    (
      DVec3::ZERO,
      DVec3::new(1.0, 0.0, 0.0),
      DVec3::new(0.0, 1.0, 0.0),
    )
  }

  #[test]
  fn test_closest_point_above_interior() {
    let (a, b, c) = unit_triangle();
    let closest = closest_point_on_triangle(DVec3::new(0.25, 0.25, 5.0), a, b, c);
    assert!(closest.distance(DVec3::new(0.25, 0.25, 0.0)) < EPS);
  }

  #[test]
  fn test_closest_point_clamps_to_vertex() {
    let (a, b, c) = unit_triangle();
    let closest = closest_point_on_triangle(DVec3::new(-1.0, -1.0, 0.0), a, b, c);
    assert!(closest.distance(DVec3::ZERO) < EPS);
  }

  #[test]
  fn test_closest_point_clamps_to_edge() {
    let (a, b, c) = unit_triangle();
    let closest = closest_point_on_triangle(DVec3::new(0.5, -2.0, 0.0), a, b, c);
    assert!(closest.distance(DVec3::new(0.5, 0.0, 0.0)) < EPS);
  }

  #[test]
  fn test_point_on_triangle_is_fixed() {
    let (a, b, c) = unit_triangle();
    let p = DVec3::new(0.2, 0.3, 0.0);
    let closest = closest_point_on_triangle(p, a, b, c);
    assert!(closest.distance(p) < EPS);
  }

  #[test]
  fn test_triangle_mesh_primitives() {
    let mesh = TriangleMesh::new(
      vec![
        DVec3::ZERO,
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::new(0.0, 1.0, 0.0),
        DVec3::new(0.0, 0.0, 1.0),
      ],
      vec![0, 1, 2, 0, 1, 3],
    );

    assert_eq!(mesh.primitive_count(), 2);

    let bounds = mesh.primitive_bounds(1, POSITION_ATTRIBUTE);
    assert_eq!(bounds.min(), DVec3::ZERO);
    assert_eq!(bounds.max(), DVec3::new(1.0, 0.0, 1.0));

    let total = mesh.bounding_box(POSITION_ATTRIBUTE);
    assert_eq!(total.max(), DVec3::splat(1.0));
  }

  #[test]
  #[should_panic(expected = "multiple of 3")]
  fn test_ragged_indices_panic() {
    TriangleMesh::new(vec![DVec3::ZERO], vec![0, 0]);
  }
}
