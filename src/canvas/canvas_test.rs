//! Tests for canvas accumulation and marching-cubes extraction.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{DVec3, IVec3};

use crate::aabb::Aabb;
use crate::field::{combine_fields, subtract, Channel, Field};
use crate::mesh::Mesh;
use crate::sdf;

use super::Canvas;

fn unit_domain() -> Aabb {
  Aabb::from_min_max(DVec3::splat(-1.0), DVec3::splat(1.0))
}

// =============================================================================
// Helpers
// =============================================================================

/// Count of triangles using each undirected edge. A closed surface uses
/// every edge exactly twice.
fn edge_use_counts(mesh: &Mesh) -> HashMap<(u32, u32), u32> {
  let mut counts = HashMap::new();
  for triangle in mesh.indices.chunks_exact(3) {
    for (a, b) in [
      (triangle[0], triangle[1]),
      (triangle[1], triangle[2]),
      (triangle[2], triangle[0]),
    ] {
      let key = (a.min(b), a.max(b));
      *counts.entry(key).or_insert(0) += 1;
    }
  }
  counts
}

fn assert_watertight(mesh: &Mesh) {
  assert!(!mesh.is_empty());
  for (edge, count) in edge_use_counts(mesh) {
    assert_eq!(count, 2, "edge {edge:?} used {count} times");
  }
}

/// Connected components of the triangle graph, via union-find on vertices.
fn component_count(mesh: &Mesh) -> usize {
  let mut parent: Vec<u32> = (0..mesh.positions.len() as u32).collect();

  fn find(parent: &mut [u32], v: u32) -> u32 {
    let mut v = v;
    while parent[v as usize] != v {
      parent[v as usize] = parent[parent[v as usize] as usize];
      v = parent[v as usize];
    }
    v
  }

  for triangle in mesh.indices.chunks_exact(3) {
    let root = find(&mut parent, triangle[0]);
    for &v in &triangle[1..] {
      let other = find(&mut parent, v);
      parent[other as usize] = root;
    }
  }

  let mut roots: Vec<u32> = mesh
    .indices
    .iter()
    .map(|&v| find(&mut parent, v))
    .collect();
  roots.sort_unstable();
  roots.dedup();
  roots.len()
}

// =============================================================================
// Batch 1: Construction and accumulation
// =============================================================================

#[test]
#[should_panic(expected = "cubes_per_unit must be positive")]
fn test_non_positive_scale_panics() {
  Canvas::new(0.0);
}

#[test]
fn test_add_field_accumulates() {
  let sphere = sdf::sphere(DVec3::ZERO, 2.0, "distance");
  let mut canvas = Canvas::new(4.0);
  canvas.add_field(&sphere);
  canvas.add_field(&sphere);

  // Voxel (0,0,0) samples the field at the origin: distance -2, twice
  assert_eq!(canvas.voxel_value("distance", IVec3::ZERO), Some(-4.0));

  // Voxel (4,0,0) samples world (1,0,0): distance -1, twice
  assert_eq!(canvas.voxel_value("distance", IVec3::new(4, 0, 0)), Some(-2.0));
}

#[test]
fn test_add_field_parallel_matches_serial() {
  let sphere = sdf::sphere(DVec3::new(0.3, -0.2, 0.1), 1.5, "distance");

  let mut serial = Canvas::new(6.0).with_chunk_size(8);
  serial.add_field(&sphere);
  let mut parallel = Canvas::new(6.0).with_chunk_size(8);
  parallel.add_field_parallel(&sphere);

  for x in -12..=12 {
    for y in -12..=12 {
      for z in -12..=12 {
        let voxel = IVec3::new(x, y, z);
        assert_eq!(
          serial.voxel_value("distance", voxel),
          parallel.voxel_value("distance", voxel),
          "voxel {voxel:?}"
        );
      }
    }
  }
}

#[test]
#[should_panic(expected = "already registered")]
fn test_conflicting_channel_kind_panics() {
  let scalar = Field::scalar("attr", unit_domain(), |_| 0.0);
  let vector =
    Field::new(unit_domain()).with_channel("attr", Channel::Float3(Arc::new(|_| DVec3::ZERO)));

  let mut canvas = Canvas::new(2.0);
  canvas.add_field(&scalar);
  canvas.add_field(&vector);
}

// =============================================================================
// Batch 2: Marching a sphere
// =============================================================================

#[test]
fn test_sphere_march_is_watertight_and_on_surface() {
  let sphere = sdf::sphere(DVec3::ZERO, 2.0, "distance");
  let mut canvas = Canvas::new(10.0).with_chunk_size(16);
  canvas.add_field(&sphere);
  let mesh = canvas.march("distance", 0.0);

  assert!(mesh.triangle_count() > 0);
  assert_watertight(&mesh);

  // Linear interpolation of an exact SDF puts vertices on the surface,
  // modulo curvature across one voxel and the 3-decimal weld snap
  for p in &mesh.positions {
    let distance = p.length();
    assert!(
      (distance - 2.0).abs() < 0.02,
      "vertex {p:?} at distance {distance}"
    );
  }
}

#[test]
fn test_march_parallel_equals_serial() {
  let sphere = sdf::sphere(DVec3::new(0.1, 0.2, -0.3), 1.2, "distance");
  let mut canvas = Canvas::new(8.0).with_chunk_size(8);
  canvas.add_field(&sphere);

  let serial = canvas.march("distance", 0.0);
  let parallel = canvas.march_parallel("distance", 0.0);

  assert_eq!(serial.positions, parallel.positions);
  assert_eq!(serial.uvs, parallel.uvs);
  assert_eq!(serial.indices, parallel.indices);
}

#[test]
fn test_disjoint_spheres_yield_two_components() {
  let a = sdf::sphere(DVec3::new(-3.0, 0.0, 0.0), 1.0, "distance");
  let b = sdf::sphere(DVec3::new(3.0, 0.0, 0.0), 1.0, "distance");
  let combined = combine_fields(vec![a, b]);

  let mut canvas = Canvas::new(6.0).with_chunk_size(16);
  canvas.add_field(&combined);
  let mesh = canvas.march("distance", 0.0);

  assert_watertight(&mesh);
  assert_eq!(component_count(&mesh), 2);
}

#[test]
fn test_subtract_carves_a_cavity() {
  let base = sdf::cuboid(DVec3::ZERO, DVec3::splat(3.0), "distance");
  let cut = sdf::sphere(DVec3::ZERO, 1.0, "distance");
  let carved = subtract(base, cut);

  let mut canvas = Canvas::new(8.0).with_chunk_size(16);
  canvas.add_field(&carved);
  let mesh = canvas.march("distance", 0.0);

  assert!(mesh.triangle_count() > 0);
  // Box shell plus the spherical cavity
  assert_eq!(component_count(&mesh), 2);
  // Nothing survives strictly inside the cut
  for p in &mesh.positions {
    assert!(p.length() > 1.0 - 0.02, "vertex {p:?} inside the cut");
  }
}

#[test]
fn test_homogeneous_field_marches_empty() {
  let field = Field::scalar("distance", unit_domain(), |_| 1.0);
  let mut canvas = Canvas::new(4.0);
  canvas.add_field(&field);
  assert!(canvas.march("distance", 0.0).is_empty());
}

// =============================================================================
// Batch 3: Contract errors
// =============================================================================

#[test]
#[should_panic(expected = "no voxel data")]
fn test_march_unpopulated_attribute_panics() {
  Canvas::new(4.0).march("distance", 0.0);
}

#[test]
#[should_panic(expected = "needs Float1")]
fn test_march_vector_attribute_panics() {
  let field =
    Field::new(unit_domain()).with_channel("color", Channel::Float3(Arc::new(|_| DVec3::ONE)));
  let mut canvas = Canvas::new(4.0);
  canvas.add_field(&field);
  canvas.march("color", 0.0);
}
