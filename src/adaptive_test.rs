//! Tests for the adaptive marcher.

use std::collections::HashMap;

use glam::DVec3;

use crate::aabb::Aabb;
use crate::field::Field;
use crate::mesh::Mesh;
use crate::sdf;

use super::march_field;

fn assert_watertight(mesh: &Mesh) {
  assert!(!mesh.is_empty());
  let mut counts: HashMap<(u32, u32), u32> = HashMap::new();
  for triangle in mesh.indices.chunks_exact(3) {
    for (a, b) in [
      (triangle[0], triangle[1]),
      (triangle[1], triangle[2]),
      (triangle[2], triangle[0]),
    ] {
      *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
    }
  }
  for (edge, count) in counts {
    assert_eq!(count, 2, "edge {edge:?} used {count} times");
  }
}

// =============================================================================
// Batch 1: Surface extraction
// =============================================================================

#[test]
fn test_sphere_vertices_lie_on_surface() {
  let sphere = sdf::sphere(DVec3::ZERO, 1.0, "distance");
  let mesh = march_field(&sphere, "distance", 0.05, 0.0);

  assert!(mesh.triangle_count() > 0);
  assert_watertight(&mesh);
  for p in &mesh.positions {
    let distance = p.length();
    assert!(
      (distance - 1.0).abs() < 0.01,
      "vertex {p:?} at distance {distance}"
    );
  }
}

#[test]
fn test_nonzero_cutoff_shifts_the_surface() {
  // f = |p| - 1, so the 0.3 level set is the sphere of radius 1.3
  let sphere = sdf::sphere(DVec3::ZERO, 1.0, "distance");
  let mesh = march_field(&sphere, "distance", 0.05, 0.3);

  assert!(mesh.triangle_count() > 0);
  for p in &mesh.positions {
    let distance = p.length();
    assert!(
      (distance - 1.3).abs() < 0.01,
      "vertex {p:?} at distance {distance}"
    );
  }
}

#[test]
fn test_off_center_domain() {
  let center = DVec3::new(5.0, -3.0, 2.0);
  let sphere = sdf::sphere(center, 0.5, "distance");
  let mesh = march_field(&sphere, "distance", 0.05, 0.0);

  assert!(mesh.triangle_count() > 0);
  for p in &mesh.positions {
    assert!((p.distance(center) - 0.5).abs() < 0.01);
  }
}

#[test]
fn test_crossing_in_outermost_cell_survives() {
  // 4 cells per axis; the crossing plane sits in the outermost +x cell,
  // between the last in-domain grid point and the padding point beyond it
  let field = Field::scalar(
    "distance",
    Aabb::from_min_max(DVec3::ZERO, DVec3::splat(3.0)),
    |p| p.x - 3.2,
  );
  let mesh = march_field(&field, "distance", 1.0, 0.0);

  assert!(mesh.triangle_count() > 0);
  for p in &mesh.positions {
    assert!((p.x - 3.2).abs() < 1e-9, "vertex {p:?} off the crossing plane");
  }
}

#[test]
fn test_homogeneous_field_is_empty() {
  let field = Field::scalar(
    "distance",
    Aabb::from_min_max(DVec3::splat(-1.0), DVec3::splat(1.0)),
    |_| 5.0,
  );
  assert!(march_field(&field, "distance", 0.1, 0.0).is_empty());
}

// =============================================================================
// Batch 2: Contract errors
// =============================================================================

#[test]
#[should_panic(expected = "cube_size must be positive")]
fn test_non_positive_cube_size_panics() {
  let sphere = sdf::sphere(DVec3::ZERO, 1.0, "distance");
  march_field(&sphere, "distance", 0.0, 0.0);
}

#[test]
#[should_panic(expected = "no Float1 channel")]
fn test_missing_channel_panics() {
  let sphere = sdf::sphere(DVec3::ZERO, 1.0, "distance");
  march_field(&sphere, "density", 0.1, 0.0);
}
