//! Sparse chunked voxel canvas with marching-cubes extraction.
//!
//! # Layout
//!
//! ```text
//!   world space              voxel space                 chunk map
//!
//!   field domain   *cpu      integer lattice   /cs    IVec3 -> flat Vec
//!   ┌──────────┐  ──────►   ┌─┬─┬─┬─┬─┬─┐    ──────►  ┌────┬────┐
//!   │  f(p)    │            ├─┼─┼─┼─┼─┼─┤            │(0,0)│(1,0)│
//!   │          │            ├─┼─┼─┼─┼─┼─┤            ├────┼────┤
//!   └──────────┘            └─┴─┴─┴─┴─┴─┘            │(0,1)│(1,1)│
//!                                                     └────┴────┘
//!   cpu = cubes_per_unit    one sample per voxel      cs³ values each,
//!                                                     allocated lazily
//! ```
//!
//! Fields are sampled once per voxel over their domain (padded by one voxel
//! so surfaces at the boundary close) and **accumulated**: adding two fields
//! sums their contributions. Each named attribute owns its own chunk map.
//!
//! Extraction marches every allocated chunk independently. A cube whose
//! corner falls in an unallocated chunk is skipped, never guessed. Fragments
//! are welded per block by edge identity, then a final fixed-precision weld
//! stitches the shared faces between blocks.

use std::collections::HashMap;
use std::ops::AddAssign;
use std::thread;

use crossbeam_channel::bounded;
use glam::{DVec2, DVec3, IVec3};
use rayon::prelude::*;

use crate::field::{Channel, ChannelKind, Field};
use crate::mesh::Mesh;

pub(crate) mod mesher;
pub(crate) mod tables;

use mesher::BlockMesher;
use tables::corner_offset;

/// Default chunk edge length, in voxels.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Typed voxel storage for one attribute.
enum Section {
  Float1(HashMap<IVec3, Vec<f64>>),
  Float2(HashMap<IVec3, Vec<DVec2>>),
  Float3(HashMap<IVec3, Vec<DVec3>>),
}

impl Section {
  fn empty(kind: ChannelKind) -> Self {
    match kind {
      ChannelKind::Float1 => Section::Float1(HashMap::new()),
      ChannelKind::Float2 => Section::Float2(HashMap::new()),
      ChannelKind::Float3 => Section::Float3(HashMap::new()),
    }
  }

  fn kind(&self) -> ChannelKind {
    match self {
      Section::Float1(_) => ChannelKind::Float1,
      Section::Float2(_) => ChannelKind::Float2,
      Section::Float3(_) => ChannelKind::Float3,
    }
  }
}

/// One chunk's worth of evaluation work: the chunk coordinate and the
/// clipped inclusive voxel range to sample inside it.
#[derive(Clone, Copy, Debug)]
struct ChunkJob {
  chunk: IVec3,
  lo: IVec3,
  hi: IVec3,
}

impl ChunkJob {
  fn volume(&self) -> usize {
    let span = self.hi - self.lo + IVec3::ONE;
    (span.x * span.y * span.z) as usize
  }
}

/// Sparse voxel grid that accumulates fields and extracts meshes.
pub struct Canvas {
  cubes_per_unit: f64,
  chunk_size: usize,
  sections: HashMap<String, Section>,
}

impl Canvas {
  /// New empty canvas with `cubes_per_unit` voxels per world unit.
  ///
  /// # Panics
  /// Panics on a non-positive scale (caller bug).
  pub fn new(cubes_per_unit: f64) -> Self {
    assert!(
      cubes_per_unit > 0.0,
      "cubes_per_unit must be positive, got {cubes_per_unit}"
    );
    Self {
      cubes_per_unit,
      chunk_size: DEFAULT_CHUNK_SIZE,
      sections: HashMap::new(),
    }
  }

  /// Override the chunk edge length. Only affects chunks allocated later,
  /// so call this before the first `add_field`.
  pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
    assert!(chunk_size > 0, "chunk_size must be positive");
    self.chunk_size = chunk_size;
    self
  }

  pub fn cubes_per_unit(&self) -> f64 {
    self.cubes_per_unit
  }

  /// Inclusive voxel range covering `field`'s domain, padded by one voxel
  /// so marching sees the positive shell around boundary surfaces.
  fn voxel_range(&self, field: &Field) -> (IVec3, IVec3) {
    let domain = field.domain();
    let min = (domain.min() * self.cubes_per_unit).floor().as_ivec3() - IVec3::ONE;
    let max = (domain.max() * self.cubes_per_unit).ceil().as_ivec3() + IVec3::ONE;
    (min, max)
  }

  fn section_mut(&mut self, name: &str, kind: ChannelKind) -> &mut Section {
    let section = self
      .sections
      .entry(name.to_string())
      .or_insert_with(|| Section::empty(kind));
    assert!(
      section.kind() == kind,
      "attribute {:?} is already registered as {:?}, cannot add as {:?}",
      name,
      section.kind(),
      kind
    );
    section
  }

  /// Sample every channel of `field` over its domain and accumulate into
  /// this canvas.
  ///
  /// # Panics
  /// Panics when a channel name is already registered under a different
  /// kind (caller bug).
  pub fn add_field(&mut self, field: &Field) {
    let (min, max) = self.voxel_range(field);
    let jobs = chunk_jobs(min, max, self.chunk_size as i32);
    let chunk_size = self.chunk_size as i32;
    let cubes_per_unit = self.cubes_per_unit;

    for (name, channel) in field.channels() {
      match (self.section_mut(name, channel.kind()), channel) {
        (Section::Float1(chunks), Channel::Float1(f)) => {
          accumulate_serial(chunks, &jobs, chunk_size, cubes_per_unit, f.as_ref());
        }
        (Section::Float2(chunks), Channel::Float2(f)) => {
          accumulate_serial(chunks, &jobs, chunk_size, cubes_per_unit, f.as_ref());
        }
        (Section::Float3(chunks), Channel::Float3(f)) => {
          accumulate_serial(chunks, &jobs, chunk_size, cubes_per_unit, f.as_ref());
        }
        _ => unreachable!("section kind checked on registration"),
      }
    }
  }

  /// Like [`add_field`](Self::add_field), fanning the per-chunk evaluation
  /// across a worker pool.
  ///
  /// Workers evaluate chunk ranges into scratch buffers; the calling thread
  /// allocates chunks and accumulates the results, so storage is never
  /// shared between threads. The accumulated values are identical to the
  /// serial variant's.
  #[cfg_attr(
    feature = "tracing",
    tracing::instrument(skip_all, name = "canvas::add_field_parallel")
  )]
  pub fn add_field_parallel(&mut self, field: &Field) {
    let (min, max) = self.voxel_range(field);
    let jobs = chunk_jobs(min, max, self.chunk_size as i32);
    let chunk_size = self.chunk_size as i32;
    let cubes_per_unit = self.cubes_per_unit;

    for (name, channel) in field.channels() {
      match (self.section_mut(name, channel.kind()), channel) {
        (Section::Float1(chunks), Channel::Float1(f)) => {
          accumulate_parallel(chunks, &jobs, chunk_size, cubes_per_unit, f.as_ref());
        }
        (Section::Float2(chunks), Channel::Float2(f)) => {
          accumulate_parallel(chunks, &jobs, chunk_size, cubes_per_unit, f.as_ref());
        }
        (Section::Float3(chunks), Channel::Float3(f)) => {
          accumulate_parallel(chunks, &jobs, chunk_size, cubes_per_unit, f.as_ref());
        }
        _ => unreachable!("section kind checked on registration"),
      }
    }
  }

  fn float1_chunks(&self, attribute: &str) -> &HashMap<IVec3, Vec<f64>> {
    match self.sections.get(attribute) {
      Some(Section::Float1(chunks)) => chunks,
      Some(section) => panic!(
        "attribute {:?} is registered as {:?}, marching needs Float1",
        attribute,
        section.kind()
      ),
      None => panic!("attribute {attribute:?} has no voxel data to march"),
    }
  }

  /// Accumulated value at a voxel of a Float1 attribute, None when the
  /// voxel's chunk was never allocated.
  pub fn voxel_value(&self, attribute: &str, voxel: IVec3) -> Option<f64> {
    let chunks = self.float1_chunks(attribute);
    sample_voxel(chunks, voxel, self.chunk_size as i32)
  }

  /// Extract the isosurface of a Float1 attribute at `cutoff`.
  ///
  /// Corners with values below the cutoff count as inside. The result is in
  /// world units, welded at 3 decimals so block seams merge.
  ///
  /// # Panics
  /// Panics when `attribute` was never populated or is not Float1.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "canvas::march"))]
  pub fn march(&self, attribute: &str, cutoff: f64) -> Mesh {
    let chunks = self.float1_chunks(attribute);
    let mut mesh = Mesh::default();
    for chunk in sorted_chunk_coords(chunks) {
      mesh.append(self.march_chunk(chunks, chunk, cutoff));
    }
    self.finish_mesh(mesh)
  }

  /// Like [`march`](Self::march) with one rayon job per allocated chunk.
  ///
  /// Fragments are assembled in chunk-coordinate order, so the output equals
  /// the serial variant's.
  #[cfg_attr(
    feature = "tracing",
    tracing::instrument(skip_all, name = "canvas::march_parallel")
  )]
  pub fn march_parallel(&self, attribute: &str, cutoff: f64) -> Mesh {
    let chunks = self.float1_chunks(attribute);
    let coords = sorted_chunk_coords(chunks);
    let fragments: Vec<Mesh> = coords
      .into_par_iter()
      .map(|chunk| self.march_chunk(chunks, chunk, cutoff))
      .collect();

    let mut mesh = Mesh::default();
    for fragment in fragments {
      mesh.append(fragment);
    }
    self.finish_mesh(mesh)
  }

  fn finish_mesh(&self, mut mesh: Mesh) -> Mesh {
    mesh.scale(1.0 / self.cubes_per_unit);
    mesh.weld(3);
    mesh
  }

  /// March every cube whose low corner lies in `chunk`, in voxel space.
  fn march_chunk(&self, chunks: &HashMap<IVec3, Vec<f64>>, chunk: IVec3, cutoff: f64) -> Mesh {
    let chunk_size = self.chunk_size as i32;
    let base = chunk * chunk_size;
    let mut mesher = BlockMesher::new();
    let mut values = [0.0; 8];

    for x in 0..chunk_size {
      for y in 0..chunk_size {
        'cubes: for z in 0..chunk_size {
          let voxel = base + IVec3::new(x, y, z);
          for corner in 0..8 {
            match sample_voxel(chunks, voxel + corner_offset(corner), chunk_size) {
              Some(value) => values[corner] = value,
              // Corner in an unallocated chunk: skip, never guess
              None => continue 'cubes,
            }
          }
          mesher.march_cube(voxel, &values, cutoff);
        }
      }
    }
    mesher.into_mesh()
  }
}

/// Chunk coordinate of a voxel (euclidean floor handles negatives).
#[inline]
fn chunk_of(voxel: IVec3, chunk_size: i32) -> IVec3 {
  voxel.div_euclid(IVec3::splat(chunk_size))
}

/// Flat index of a voxel inside its chunk.
#[inline]
fn local_index(voxel: IVec3, chunk: IVec3, chunk_size: i32) -> usize {
  let local = voxel - chunk * chunk_size;
  ((local.x * chunk_size + local.y) * chunk_size + local.z) as usize
}

fn sample_voxel(chunks: &HashMap<IVec3, Vec<f64>>, voxel: IVec3, chunk_size: i32) -> Option<f64> {
  let chunk = chunk_of(voxel, chunk_size);
  let values = chunks.get(&chunk)?;
  Some(values[local_index(voxel, chunk, chunk_size)])
}

fn sorted_chunk_coords<T>(chunks: &HashMap<IVec3, Vec<T>>) -> Vec<IVec3> {
  let mut coords: Vec<IVec3> = chunks.keys().copied().collect();
  coords.sort_by_key(|c| (c.x, c.y, c.z));
  coords
}

/// Split an inclusive voxel range into per-chunk jobs with clipped ranges.
fn chunk_jobs(min: IVec3, max: IVec3, chunk_size: i32) -> Vec<ChunkJob> {
  let chunk_min = chunk_of(min, chunk_size);
  let chunk_max = chunk_of(max, chunk_size);

  let mut jobs = Vec::new();
  for cx in chunk_min.x..=chunk_max.x {
    for cy in chunk_min.y..=chunk_max.y {
      for cz in chunk_min.z..=chunk_max.z {
        let chunk = IVec3::new(cx, cy, cz);
        let base = chunk * chunk_size;
        jobs.push(ChunkJob {
          chunk,
          lo: base.max(min),
          hi: (base + chunk_size - 1).min(max),
        });
      }
    }
  }
  jobs
}

/// Evaluate `sample` over every job's voxel range and add into `chunks`,
/// allocating zeroed chunks on first touch.
fn accumulate_serial<T>(
  chunks: &mut HashMap<IVec3, Vec<T>>,
  jobs: &[ChunkJob],
  chunk_size: i32,
  cubes_per_unit: f64,
  sample: &(dyn Fn(DVec3) -> T + Send + Sync),
) where
  T: Copy + Default + AddAssign,
{
  for job in jobs {
    let mut scratch = Vec::with_capacity(job.volume());
    evaluate_job(job, cubes_per_unit, sample, &mut scratch);
    accumulate_job(chunks, job, chunk_size, &scratch);
  }
}

/// Parallel counterpart of [`accumulate_serial`]: jobs fan out over a
/// bounded channel to a worker pool, results fan back in and are
/// accumulated by the calling thread.
fn accumulate_parallel<T>(
  chunks: &mut HashMap<IVec3, Vec<T>>,
  jobs: &[ChunkJob],
  chunk_size: i32,
  cubes_per_unit: f64,
  sample: &(dyn Fn(DVec3) -> T + Send + Sync),
) where
  T: Copy + Default + AddAssign + Send,
{
  let workers = thread::available_parallelism().map_or(1, |n| n.get());
  let (job_tx, job_rx) = bounded::<ChunkJob>(workers * 2);
  let (result_tx, result_rx) = bounded::<(ChunkJob, Vec<T>)>(workers * 2);

  thread::scope(|scope| {
    // Feeder runs on its own thread so the calling thread can drain
    // results while the job channel is full
    scope.spawn(move || {
      for &job in jobs {
        if job_tx.send(job).is_err() {
          break;
        }
      }
    });

    for _ in 0..workers {
      let job_rx = job_rx.clone();
      let result_tx = result_tx.clone();
      scope.spawn(move || {
        for job in job_rx {
          let mut scratch = Vec::with_capacity(job.volume());
          evaluate_job(&job, cubes_per_unit, sample, &mut scratch);
          if result_tx.send((job, scratch)).is_err() {
            break;
          }
        }
      });
    }
    drop(job_rx);
    drop(result_tx);

    for (job, scratch) in result_rx {
      accumulate_job(chunks, &job, chunk_size, &scratch);
    }
  });
}

fn evaluate_job<T>(
  job: &ChunkJob,
  cubes_per_unit: f64,
  sample: &(dyn Fn(DVec3) -> T + Send + Sync),
  out: &mut Vec<T>,
) {
  for x in job.lo.x..=job.hi.x {
    for y in job.lo.y..=job.hi.y {
      for z in job.lo.z..=job.hi.z {
        let world = IVec3::new(x, y, z).as_dvec3() / cubes_per_unit;
        out.push(sample(world));
      }
    }
  }
}

fn accumulate_job<T>(
  chunks: &mut HashMap<IVec3, Vec<T>>,
  job: &ChunkJob,
  chunk_size: i32,
  scratch: &[T],
) where
  T: Copy + Default + AddAssign,
{
  let volume = (chunk_size * chunk_size * chunk_size) as usize;
  let chunk = chunks
    .entry(job.chunk)
    .or_insert_with(|| vec![T::default(); volume]);

  let mut cursor = 0;
  for x in job.lo.x..=job.hi.x {
    for y in job.lo.y..=job.hi.y {
      for z in job.lo.z..=job.hi.z {
        let voxel = IVec3::new(x, y, z);
        chunk[local_index(voxel, job.chunk, chunk_size)] += scratch[cursor];
        cursor += 1;
      }
    }
  }
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod canvas_test;
