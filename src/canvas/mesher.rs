//! Per-block marching-cubes mesher.
//!
//! One `BlockMesher` builds the mesh fragment for a single block of voxels,
//! in grid coordinates (one unit per voxel). Vertices are welded by edge
//! identity: two cubes sharing an edge share the same two samples, so the
//! interpolated crossing is bit-identical and keyed exactly, without
//! quantization. Welding across blocks is the caller's problem.

use std::collections::HashMap;

use glam::{DVec2, DVec3, IVec3};

use crate::mesh::Mesh;

use super::tables::{corner_offset, cube_config, interpolate_edge, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};

/// Identity of a grid edge: its lower endpoint and axis (0=x, 1=y, 2=z).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct EdgeKey {
  lower: IVec3,
  axis: u8,
}

/// Accumulates welded marching-cubes output for one block.
pub struct BlockMesher {
  positions: Vec<DVec3>,
  uvs: Vec<DVec2>,
  indices: Vec<u32>,
  welded: HashMap<EdgeKey, u32>,
}

impl BlockMesher {
  pub fn new() -> Self {
    Self {
      positions: Vec::new(),
      uvs: Vec::new(),
      indices: Vec::new(),
      welded: HashMap::new(),
    }
  }

  /// March one cube whose low corner sits at grid coordinate `base`.
  ///
  /// `values[i]` is the sample at `base + CORNER_OFFSETS[i]`. Corners with
  /// values below `cutoff` count as solid.
  pub fn march_cube(&mut self, base: IVec3, values: &[f64; 8], cutoff: f64) {
    let config = cube_config(values, cutoff);
    if EDGE_TABLE[config] == 0 {
      return;
    }

    let row = &TRI_TABLE[config];
    let mut i = 0;
    while row[i] != -1 {
      let a = self.edge_vertex(base, row[i] as usize, values, cutoff);
      let b = self.edge_vertex(base, row[i + 1] as usize, values, cutoff);
      let c = self.edge_vertex(base, row[i + 2] as usize, values, cutoff);
      // Welding can collapse a sliver triangle; drop it
      if a != b && b != c && a != c {
        self.indices.extend([a, b, c]);
      }
      i += 3;
    }
  }

  fn edge_vertex(&mut self, base: IVec3, edge: usize, values: &[f64; 8], cutoff: f64) -> u32 {
    let [c0, c1] = EDGE_CORNERS[edge];
    let g0 = base + corner_offset(c0);
    let g1 = base + corner_offset(c1);

    let diff = g1 - g0;
    let axis = if diff.x != 0 {
      0
    } else if diff.y != 0 {
      1
    } else {
      2
    };
    let key = EdgeKey {
      lower: g0.min(g1),
      axis,
    };

    if let Some(&index) = self.welded.get(&key) {
      return index;
    }

    let position = interpolate_edge(g0.as_dvec3(), g1.as_dvec3(), values[c0], values[c1], cutoff);
    let index = self.positions.len() as u32;
    self.positions.push(position);
    self.uvs.push(DVec2::new(position.x, position.z));
    self.welded.insert(key, index);
    index
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  pub fn into_mesh(self) -> Mesh {
    Mesh {
      positions: self.positions,
      uvs: self.uvs,
      indices: self.indices,
    }
  }
}

impl Default for BlockMesher {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_uniform_cubes_emit_nothing() {
    let mut mesher = BlockMesher::new();
    mesher.march_cube(IVec3::ZERO, &[1.0; 8], 0.0);
    mesher.march_cube(IVec3::ZERO, &[-1.0; 8], 0.0);
    assert!(mesher.is_empty());
    assert!(mesher.into_mesh().is_empty());
  }

  #[test]
  fn test_single_solid_corner_yields_one_triangle() {
    let mut values = [1.0; 8];
    values[0] = -1.0;

    let mut mesher = BlockMesher::new();
    mesher.march_cube(IVec3::ZERO, &values, 0.0);
    let mesh = mesher.into_mesh();

    assert_eq!(mesh.triangle_count(), 1);
    assert_eq!(mesh.positions.len(), 3);
    // Crossings sit at the midpoints of corner 0's edges
    for p in &mesh.positions {
      assert!((p.length() - 0.5).abs() < 1e-12);
    }
  }

  #[test]
  fn test_adjacent_cubes_share_edge_vertices() {
    // Two cubes along +x, solid only below y=0.5: each contributes a quad
    // crossing the same shared face edges
    let sample = |g: IVec3| if g.y == 0 { -1.0 } else { 1.0 };
    let mut mesher = BlockMesher::new();
    for base in [IVec3::ZERO, IVec3::new(1, 0, 0)] {
      let mut values = [0.0; 8];
      for (i, v) in values.iter_mut().enumerate() {
        *v = sample(base + corner_offset(i));
      }
      mesher.march_cube(base, &values, 0.0);
    }

    let mesh = mesher.into_mesh();
    assert_eq!(mesh.triangle_count(), 4);
    // 4 quads would need 8 corners unwelded; sharing the seam leaves 6
    assert_eq!(mesh.positions.len(), 6);
  }

  #[test]
  fn test_uv_is_xz_projection() {
    let mut values = [1.0; 8];
    values[0] = -1.0;

    let mut mesher = BlockMesher::new();
    mesher.march_cube(IVec3::new(2, 0, 3), &values, 0.0);
    let mesh = mesher.into_mesh();
    for (p, uv) in mesh.positions.iter().zip(&mesh.uvs) {
      assert_eq!(*uv, DVec2::new(p.x, p.z));
    }
  }
}
