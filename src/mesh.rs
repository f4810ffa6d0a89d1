//! Output mesh value: positions, optional UVs, flat triangle indices.
//!
//! Produced by the marchers and consumed by format writers outside this
//! crate. `weld` merges geometrically coincident vertices, which the canvas
//! relies on to stitch fragments generated independently per chunk.

use std::collections::HashMap;

use glam::{DVec2, DVec3};

use crate::aabb::Aabb;

/// Triangle mesh with a required position channel and an optional UV channel.
///
/// When present, `uvs` is parallel to `positions`. Indices reference
/// positions in groups of three.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
  pub positions: Vec<DVec3>,
  pub uvs: Vec<DVec2>,
  pub indices: Vec<u32>,
}

impl Mesh {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns true if no geometry is present.
  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  /// Number of triangles.
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Append another mesh, offsetting its indices.
  ///
  /// Unless one side is empty, both meshes must agree on whether they carry
  /// UVs; mixing would desynchronize the parallel arrays.
  pub fn append(&mut self, other: Mesh) {
    debug_assert!(
      self.positions.is_empty()
        || other.positions.is_empty()
        || self.uvs.is_empty() == other.uvs.is_empty(),
      "append requires both meshes to agree on UV presence"
    );
    let offset = self.positions.len() as u32;
    self.positions.extend(other.positions);
    self.uvs.extend(other.uvs);
    self
      .indices
      .extend(other.indices.into_iter().map(|i| i + offset));
  }

  /// Uniformly scale positions and UVs.
  ///
  /// UVs scale with positions because they are planar projections of the
  /// vertex coordinates; scaling keeps the two consistent.
  pub fn scale(&mut self, factor: f64) {
    for p in &mut self.positions {
      *p *= factor;
    }
    for uv in &mut self.uvs {
      *uv *= factor;
    }
  }

  /// Translate all positions by `offset`, shifting UVs by its XZ projection.
  pub fn translate(&mut self, offset: DVec3) {
    for p in &mut self.positions {
      *p += offset;
    }
    let uv_offset = DVec2::new(offset.x, offset.z);
    for uv in &mut self.uvs {
      *uv += uv_offset;
    }
  }

  /// Bounding box over all vertices, or None for an empty mesh.
  pub fn bounds(&self) -> Option<Aabb> {
    let first = *self.positions.first()?;
    let mut bounds = Aabb::at_point(first);
    for &p in &self.positions[1..] {
      bounds.encapsulate_point(p);
    }
    Some(bounds)
  }

  /// Merge vertices whose positions agree after rounding to `decimals`
  /// decimal places. Triangles degenerated by the merge are dropped.
  pub fn weld(&mut self, decimals: u32) {
    let scale = 10f64.powi(decimals as i32);
    let quantize = |p: DVec3| {
      (
        (p.x * scale).round() as i64,
        (p.y * scale).round() as i64,
        (p.z * scale).round() as i64,
      )
    };

    let has_uvs = !self.uvs.is_empty();
    let mut lookup: HashMap<(i64, i64, i64), u32> = HashMap::new();
    let mut remap: Vec<u32> = Vec::with_capacity(self.positions.len());
    let mut positions: Vec<DVec3> = Vec::new();
    let mut uvs: Vec<DVec2> = Vec::new();

    for (i, &p) in self.positions.iter().enumerate() {
      let index = *lookup.entry(quantize(p)).or_insert_with(|| {
        positions.push(p);
        if has_uvs {
          uvs.push(self.uvs[i]);
        }
        (positions.len() - 1) as u32
      });
      remap.push(index);
    }

    let mut indices = Vec::with_capacity(self.indices.len());
    for tri in self.indices.chunks_exact(3) {
      let (a, b, c) = (
        remap[tri[0] as usize],
        remap[tri[1] as usize],
        remap[tri[2] as usize],
      );
      if a != b && b != c && a != c {
        indices.push(a);
        indices.push(b);
        indices.push(c);
      }
    }

    self.positions = positions;
    self.uvs = uvs;
    self.indices = indices;
  }
}

#[cfg(test)]
#[path = "mesh_test.rs"]
mod mesh_test;
