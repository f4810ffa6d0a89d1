//! Tests for the marching-cubes tables.

use glam::DVec3;

use super::{cube_config, interpolate_edge, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};

// =============================================================================
// Batch 1: Edge table structure
// =============================================================================

#[test]
fn test_empty_and_full_cubes_cross_nothing() {
  assert_eq!(EDGE_TABLE[0], 0);
  assert_eq!(EDGE_TABLE[255], 0);
  assert_eq!(TRI_TABLE[0][0], -1);
  assert_eq!(TRI_TABLE[255][0], -1);
}

#[test]
fn test_single_solid_corner_crosses_its_three_edges() {
  // Corner 0 touches edges 0, 3 and 8
  assert_eq!(EDGE_TABLE[1], (1 << 0) | (1 << 3) | (1 << 8));
}

#[test]
fn test_edge_table_complement_symmetry() {
  // Inverting solidity leaves the crossed-edge set unchanged
  for config in 0..256 {
    assert_eq!(EDGE_TABLE[config], EDGE_TABLE[255 - config]);
  }
}

#[test]
fn test_edge_table_matches_endpoint_disagreement() {
  for config in 0..256usize {
    for (edge, [c0, c1]) in EDGE_CORNERS.iter().enumerate() {
      let crossed = (config >> c0) & 1 != (config >> c1) & 1;
      assert_eq!(
        EDGE_TABLE[config] & (1 << edge) != 0,
        crossed,
        "config {config} edge {edge}"
      );
    }
  }
}

// =============================================================================
// Batch 2: Triangle table consistency
// =============================================================================

#[test]
fn test_tri_table_rows_are_whole_triangles() {
  for (config, row) in TRI_TABLE.iter().enumerate() {
    let len = row.iter().position(|&e| e == -1).unwrap_or(16);
    assert_eq!(len % 3, 0, "config {config} has a partial triangle");
    // Nothing meaningful after the terminator
    for &e in &row[len..] {
      assert_eq!(e, -1, "config {config} has entries after -1");
    }
  }
}

#[test]
fn test_tri_table_only_uses_crossed_edges() {
  for (config, row) in TRI_TABLE.iter().enumerate() {
    for &e in row.iter().take_while(|&&e| e != -1) {
      assert!((0..12).contains(&(e as i32)), "config {config} edge {e}");
      assert!(
        EDGE_TABLE[config] & (1 << e) != 0,
        "config {config} triangulates uncrossed edge {e}"
      );
    }
  }
}

#[test]
fn test_tri_table_covers_every_crossed_edge() {
  for (config, row) in TRI_TABLE.iter().enumerate() {
    let mut used = 0u16;
    for &e in row.iter().take_while(|&&e| e != -1) {
      used |= 1 << e;
    }
    assert_eq!(used, EDGE_TABLE[config], "config {config}");
  }
}

// =============================================================================
// Batch 3: Helpers
// =============================================================================

#[test]
fn test_cube_config_bits() {
  let mut values = [1.0f64; 8];
  assert_eq!(cube_config(&values, 0.0), 0);

  values[2] = -1.0;
  values[5] = -1.0;
  assert_eq!(cube_config(&values, 0.0), (1 << 2) | (1 << 5));

  assert_eq!(cube_config(&[-1.0; 8], 0.0), 255);
}

#[test]
fn test_interpolate_edge_crossing() {
  let p1 = DVec3::ZERO;
  let p2 = DVec3::new(1.0, 0.0, 0.0);

  // Crossing at t = 0.25 for v1=-1, v2=3, cutoff=0
  let p = interpolate_edge(p1, p2, -1.0, 3.0, 0.0);
  assert!((p.x - 0.25).abs() < 1e-12);

  // Equal values fall back to the midpoint
  let mid = interpolate_edge(p1, p2, 1.0, 1.0, 1.0);
  assert!((mid.x - 0.5).abs() < 1e-12);
}
