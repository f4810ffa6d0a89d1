//! implicit_mesh - Implicit-surface modeling engine
//!
//! This crate composes scalar distance fields with CSG-style combinators and
//! extracts triangle meshes from them via marching cubes. It also provides an
//! octree spatial index for nearest-point queries over mesh primitives, which
//! powers distance fields derived from existing meshes.
//!
//! # Components
//!
//! - **Aabb**: axis-aligned bounding box (center + half-size), the domain
//!   type used throughout.
//! - **Octree**: arena-based spatial index over a primitive set with
//!   branch-and-bound closest-point queries.
//! - **Fields**: `ScalarField` closures grouped into named-channel `Field`
//!   aggregates, composed with `union`, `intersect`, `subtract`,
//!   `combine_fields` and `mirror`.
//! - **Canvas**: sparse chunked voxel grid that accumulates fields additively
//!   and extracts meshes with (optionally parallel) marching cubes.
//! - **Adaptive march**: a lighter, non-chunked recursive marcher for a
//!   single already-composed field.
//!
//! # Example
//!
//! ```ignore
//! use glam::DVec3;
//! use implicit_mesh::{canvas::Canvas, field, sdf};
//!
//! let a = sdf::sphere(DVec3::ZERO, 1.0, "distance");
//! let b = sdf::sphere(DVec3::new(0.5, 0.0, 0.0), 1.0, "distance");
//! let combined = field::combine_fields(vec![a, b]);
//!
//! let mut canvas = Canvas::new(10.0);
//! canvas.add_field_parallel(&combined);
//! let mesh = canvas.march_parallel("distance", 0.0);
//!
//! println!("{} triangles", mesh.triangle_count());
//! ```

pub mod aabb;
pub mod mesh;
pub mod primitives;

pub use aabb::Aabb;
pub use mesh::Mesh;
pub use primitives::{PrimitiveSource, TriangleMesh};

// Spatial index for nearest-point queries
pub mod octree;
pub use octree::Octree;

// Field abstraction and CSG combinators
pub mod field;
pub use field::{Channel, ChannelKind, Field, MirrorAxes, ScalarField, Vec2Field, Vec3Field};

// Influence field derived from a mesh via the octree
pub mod mesh_field;
pub use mesh_field::mesh_influence_field;

// Simple analytic fields for composing scenes and tests
pub mod sdf;

// Chunked sparse voxel canvas with marching-cubes extraction
pub mod canvas;
pub use canvas::{Canvas, DEFAULT_CHUNK_SIZE};

// Adaptive recursive marcher for a single composed field
pub mod adaptive;
pub use adaptive::march_field;
