//! Influence field derived from an existing mesh.
//!
//! Builds an octree over the mesh's primitives and wraps it in a smooth
//! scalar field: zero beyond `radius` of the surface, rising linearly to
//! `radius * strength` on the surface itself. Useful for blending new
//! geometry onto an existing mesh or snapping fields to it.

use std::sync::Arc;

use glam::DVec3;

use crate::aabb::Aabb;
use crate::field::Field;
use crate::octree::Octree;
use crate::primitives::PrimitiveSource;

/// Build an influence field around the surface of `source`.
///
/// The returned field carries one Float1 channel named `channel`. Its
/// domain is the source's bounding box expanded by `radius`; outside the
/// domain the field is 0. Inside, a point within `radius` of the surface
/// evaluates to `(radius - distance) * strength`, and 0 beyond that.
///
/// A source with no primitives yields a zero field over a zero-volume
/// domain.
///
/// # Panics
/// Panics when `radius` is not positive (caller bug).
pub fn mesh_influence_field(
  source: Arc<dyn PrimitiveSource>,
  attribute: &str,
  radius: f64,
  strength: f64,
  channel: &str,
) -> Field {
  assert!(radius > 0.0, "influence radius must be positive, got {radius}");

  let Some(octree) = Octree::build_default_depth(Arc::clone(&source), attribute) else {
    return Field::scalar(channel, Aabb::at_point(DVec3::ZERO), |_| 0.0);
  };
  let octree = Arc::new(octree);

  let domain = source.bounding_box(attribute).expand(radius);
  Field::scalar(channel, domain, move |point| {
    if !domain.contains(point) {
      return 0.0;
    }
    let (_, closest) = octree.closest_point(point);
    let distance = point.distance(closest);
    if distance < radius {
      (radius - distance) * strength
    } else {
      0.0
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::primitives::{TriangleMesh, POSITION_ATTRIBUTE};

  fn single_triangle() -> Arc<TriangleMesh> {
    Arc::new(TriangleMesh::new(
      vec![
        DVec3::new(-1.0, 0.0, -1.0),
        DVec3::new(1.0, 0.0, -1.0),
        DVec3::new(0.0, 0.0, 1.0),
      ],
      vec![0, 1, 2],
    ))
  }

  #[test]
  fn test_zero_outside_expanded_bounds() {
    let field = mesh_influence_field(single_triangle(), POSITION_ATTRIBUTE, 0.5, 1.0, "influence");
    let f = field.float1("influence").unwrap();
    assert_eq!(f(DVec3::new(10.0, 10.0, 10.0)), 0.0);
    assert_eq!(f(DVec3::new(0.0, 0.6, 0.0)), 0.0);
  }

  #[test]
  fn test_maximal_on_surface() {
    let field = mesh_influence_field(single_triangle(), POSITION_ATTRIBUTE, 0.5, 2.0, "influence");
    let f = field.float1("influence").unwrap();
    // On the triangle: distance 0, influence = radius * strength
    assert!((f(DVec3::ZERO) - 1.0).abs() < 1e-9);
  }

  #[test]
  fn test_falls_off_linearly() {
    let field = mesh_influence_field(single_triangle(), POSITION_ATTRIBUTE, 0.5, 1.0, "influence");
    let f = field.float1("influence").unwrap();
    let at = |y: f64| f(DVec3::new(0.0, y, 0.0));
    assert!((at(0.1) - 0.4).abs() < 1e-9);
    assert!((at(0.25) - 0.25).abs() < 1e-9);
    assert!(at(0.5) <= 1e-9);
  }

  #[test]
  fn test_domain_expanded_by_radius() {
    let field = mesh_influence_field(single_triangle(), POSITION_ATTRIBUTE, 0.5, 1.0, "influence");
    assert_eq!(field.domain().min(), DVec3::new(-1.5, -0.5, -1.5));
    assert_eq!(field.domain().max(), DVec3::new(1.5, 0.5, 1.5));
  }

  #[test]
  fn test_empty_mesh_yields_zero_field() {
    let empty = Arc::new(TriangleMesh::new(Vec::new(), Vec::new()));
    let field = mesh_influence_field(empty, POSITION_ATTRIBUTE, 1.0, 1.0, "influence");
    let f = field.float1("influence").unwrap();
    assert_eq!(f(DVec3::ZERO), 0.0);
  }

  #[test]
  #[should_panic(expected = "radius must be positive")]
  fn test_non_positive_radius_panics() {
    mesh_influence_field(single_triangle(), POSITION_ATTRIBUTE, 0.0, 1.0, "influence");
  }
}
