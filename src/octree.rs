//! Octree spatial index over mesh primitives.
//!
//! Nodes live in an arena and reference each other by integer handles, so
//! the tree is a plain `Vec` with no aliasing hazards and is trivially
//! `Sync` once built. Primitives whose bounding box straddles more than one
//! child octant are kept at the parent, because they cannot be safely
//! delegated to a single child.
//!
//! Closest-point queries use branch-and-bound: the distance from the query
//! point to a child's AABB is a lower bound on the distance to anything
//! inside it, so children whose bound cannot beat the best candidate found
//! so far are pruned without being visited.

use std::sync::Arc;

use glam::DVec3;
use smallvec::SmallVec;

use crate::aabb::Aabb;
use crate::primitives::PrimitiveSource;

/// Handle of a node in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct NodeId(u32);

/// One octree node: tight bounds, straddling primitives, up to 8 children.
struct Node {
  bounds: Aabb,
  /// Primitives kept at this level because they straddle the split.
  /// At a leaf this is every primitive that reached it.
  primitives: Vec<u32>,
  children: [Option<NodeId>; 8],
}

/// Immutable spatial index supporting nearest-point queries.
///
/// Holds a read-only view into the host mesh; no vertex data is copied.
/// Safe for concurrent queries from multiple threads once built.
pub struct Octree {
  source: Arc<dyn PrimitiveSource>,
  attribute: String,
  nodes: Vec<Node>,
  root: NodeId,
}

impl Octree {
  /// Build an octree over every primitive of `source`.
  ///
  /// Returns None when the source has no primitives. `max_depth` bounds the
  /// recursion; a depth of 0 produces a single leaf.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "octree::build"))]
  pub fn build(
    source: Arc<dyn PrimitiveSource>,
    attribute: &str,
    max_depth: u32,
  ) -> Option<Octree> {
    let count = source.primitive_count();
    if count == 0 {
      return None;
    }

    let primitives: Vec<u32> = (0..count as u32).collect();
    let mut nodes = Vec::new();
    let root = build_node(&mut nodes, source.as_ref(), attribute, primitives, max_depth);

    Some(Octree {
      source,
      attribute: attribute.to_string(),
      nodes,
      root,
    })
  }

  /// Build with the default depth `max(1, round(log8(N)))`, which balances
  /// recursion against leaf occupancy.
  pub fn build_default_depth(source: Arc<dyn PrimitiveSource>, attribute: &str) -> Option<Octree> {
    let depth = default_depth(source.primitive_count());
    Self::build(source, attribute, depth)
  }

  /// Bounding box of the whole tree.
  pub fn bounds(&self) -> Aabb {
    self.nodes[self.root.0 as usize].bounds
  }

  /// Longest root-to-leaf path, in edges (0 for a single leaf).
  ///
  /// Never exceeds the `max_depth` the tree was built with.
  pub fn height(&self) -> u32 {
    self.node_height(self.root)
  }

  fn node_height(&self, id: NodeId) -> u32 {
    let node = &self.nodes[id.0 as usize];
    node
      .children
      .iter()
      .flatten()
      .map(|&child| self.node_height(child) + 1)
      .max()
      .unwrap_or(0)
  }

  /// Find the primitive closest to `point` and the closest point on it.
  ///
  /// Exact: a child is only skipped when its AABB distance proves it cannot
  /// contain a closer point than the best candidate found so far.
  pub fn closest_point(&self, point: DVec3) -> (usize, DVec3) {
    let mut best = Candidate {
      primitive: 0,
      point: DVec3::ZERO,
      distance_sq: f64::INFINITY,
    };
    self.search(self.root, point, &mut best);
    (best.primitive as usize, best.point)
  }

  fn search(&self, id: NodeId, point: DVec3, best: &mut Candidate) {
    let node = &self.nodes[id.0 as usize];

    // Primitives kept at this node are scanned directly
    for &primitive in &node.primitives {
      let candidate =
        self
          .source
          .primitive_closest_point(primitive as usize, &self.attribute, point);
      let distance_sq = point.distance_squared(candidate);
      if distance_sq < best.distance_sq {
        *best = Candidate {
          primitive,
          point: candidate,
          distance_sq,
        };
      }
    }

    // Children ordered by their AABB lower bound; each is pruned against
    // the best found so far, which tightens as closer children are visited
    let mut order: SmallVec<[(NodeId, f64); 8]> = node
      .children
      .iter()
      .flatten()
      .map(|&child| {
        let bound = self.nodes[child.0 as usize].bounds.distance(point);
        (child, bound)
      })
      .collect();
    order.sort_by(|a, b| a.1.total_cmp(&b.1));

    for (child, bound) in order {
      if bound * bound >= best.distance_sq {
        break;
      }
      self.search(child, point, best);
    }
  }
}

struct Candidate {
  primitive: u32,
  point: DVec3,
  distance_sq: f64,
}

/// Default build depth for `count` primitives: `max(1, round(log8(N)))`.
pub fn default_depth(count: usize) -> u32 {
  if count <= 1 {
    return 1;
  }
  let depth = ((count as f64).ln() / 8f64.ln()).round() as u32;
  depth.max(1)
}

/// Octant code of `point` relative to `center`: 3 sign bits (x, y, z).
#[inline]
fn octant_code(point: DVec3, center: DVec3) -> usize {
  (point.x >= center.x) as usize
    | ((point.y >= center.y) as usize) << 1
    | ((point.z >= center.z) as usize) << 2
}

fn build_node(
  nodes: &mut Vec<Node>,
  source: &dyn PrimitiveSource,
  attribute: &str,
  primitives: Vec<u32>,
  depth: u32,
) -> NodeId {
  debug_assert!(!primitives.is_empty());

  let mut bounds = source.primitive_bounds(primitives[0] as usize, attribute);
  for &primitive in &primitives[1..] {
    bounds.encapsulate(&source.primitive_bounds(primitive as usize, attribute));
  }

  if primitives.len() == 1 || depth == 0 {
    nodes.push(Node {
      bounds,
      primitives,
      children: [None; 8],
    });
    return NodeId((nodes.len() - 1) as u32);
  }

  // Classify each primitive by the octant of its bounds' min and max
  // corners: equal codes mean the primitive fits one child, different codes
  // mean it straddles the split and stays here.
  let center = bounds.center();
  let mut buckets: [Vec<u32>; 8] = Default::default();
  let mut kept = Vec::new();

  for primitive in primitives {
    let prim_bounds = source.primitive_bounds(primitive as usize, attribute);
    let low = octant_code(prim_bounds.min(), center);
    let high = octant_code(prim_bounds.max(), center);
    if low == high {
      buckets[low].push(primitive);
    } else {
      kept.push(primitive);
    }
  }

  let mut children: [Option<NodeId>; 8] = [None; 8];
  for (octant, bucket) in buckets.into_iter().enumerate() {
    if !bucket.is_empty() {
      children[octant] = Some(build_node(nodes, source, attribute, bucket, depth - 1));
    }
  }

  nodes.push(Node {
    bounds,
    primitives: kept,
    children,
  });
  NodeId((nodes.len() - 1) as u32)
}

#[cfg(test)]
#[path = "octree_test.rs"]
mod octree_test;
