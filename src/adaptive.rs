//! Adaptive recursive marcher for a single composed field.
//!
//! Instead of sampling every voxel the way the canvas does, the domain is
//! subdivided octree-style and whole cells are discarded when the field
//! value at their center proves the isosurface cannot pass through them:
//!
//! ```text
//!   |f(center) - cutoff|  >  half_diagonal + 2 * cube_size   =>  prune
//! ```
//!
//! The bound assumes the field changes no faster than distance (true for
//! SDFs); the two-cube slack absorbs mild violations near blends. Surviving
//! unit cells are triangulated with the shared marching-cubes tables, with
//! corner samples cached so shared grid points are evaluated once.
//!
//! Cheaper than a canvas when the surface occupies a small fraction of the
//! domain, but offers no accumulation and marches exactly one channel.

use std::collections::HashMap;

use glam::{DVec3, IVec3};

use crate::canvas::mesher::BlockMesher;
use crate::canvas::tables::corner_offset;
use crate::field::{Field, ScalarField};
use crate::mesh::Mesh;

/// Extract the isosurface of one Float1 channel of `field` at `cutoff`,
/// with cubes of `cube_size` world units.
///
/// # Panics
/// Panics when `cube_size` is not positive or the channel is missing or
/// not Float1 (caller bugs).
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "adaptive::march"))]
pub fn march_field(field: &Field, channel: &str, cube_size: f64, cutoff: f64) -> Mesh {
  assert!(cube_size > 0.0, "cube_size must be positive, got {cube_size}");
  let Some(f) = field.float1(channel) else {
    panic!("field has no Float1 channel {channel:?} to march");
  };

  let domain = field.domain();
  let origin = domain.min();
  // One cell beyond the domain on each axis closes boundary surfaces
  let cells = (domain.size() / cube_size).ceil().as_ivec3() + IVec3::ONE;
  // The root starts at coord -1, so it must span cells + 1 along each axis
  let root = ((cells.max_element() + 1).max(2) as u32).next_power_of_two() as i32;

  let mut active = Vec::new();
  subdivide(
    f, origin, cube_size, cutoff, cells, IVec3::splat(-1), root, &mut active,
  );

  let mut cache: HashMap<IVec3, f64> = HashMap::new();
  let mut mesher = BlockMesher::new();
  let mut values = [0.0; 8];
  for cell in active {
    for corner in 0..8 {
      values[corner] = sample_grid(&mut cache, f, origin, cube_size, cell + corner_offset(corner));
    }
    mesher.march_cube(cell, &values, cutoff);
  }

  let mut mesh = mesher.into_mesh();
  mesh.scale(cube_size);
  mesh.translate(origin);
  mesh
}

/// Recursively subdivide the cell at `coord` spanning `size` grid cells,
/// collecting surviving unit cells.
fn subdivide(
  f: &ScalarField,
  origin: DVec3,
  cube_size: f64,
  cutoff: f64,
  cells: IVec3,
  coord: IVec3,
  size: i32,
  out: &mut Vec<IVec3>,
) {
  // Entirely outside the covered grid
  if coord.cmpge(cells).any() || (coord + size).cmple(IVec3::splat(-1)).any() {
    return;
  }

  let center = origin + (coord.as_dvec3() + DVec3::splat(size as f64 * 0.5)) * cube_size;
  let half_diagonal = size as f64 * cube_size * 3f64.sqrt() * 0.5;
  if (f(center) - cutoff).abs() > half_diagonal + 2.0 * cube_size {
    return;
  }

  if size == 1 {
    out.push(coord);
    return;
  }

  let half = size / 2;
  for octant in 0..8 {
    let offset = IVec3::new(octant & 1, (octant >> 1) & 1, (octant >> 2) & 1) * half;
    subdivide(f, origin, cube_size, cutoff, cells, coord + offset, half, out);
  }
}

fn sample_grid(
  cache: &mut HashMap<IVec3, f64>,
  f: &ScalarField,
  origin: DVec3,
  cube_size: f64,
  grid: IVec3,
) -> f64 {
  if let Some(&value) = cache.get(&grid) {
    return value;
  }
  let value = f(origin + grid.as_dvec3() * cube_size);
  cache.insert(grid, value);
  value
}

#[cfg(test)]
#[path = "adaptive_test.rs"]
mod adaptive_test;
