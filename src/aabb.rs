//! Axis-aligned bounding box stored as center + half-size.
//!
//! Used as the `Domain` of every field: the region of space in which the
//! field's values are meaningful. Encapsulation operations only ever grow
//! the box.

use glam::DVec3;

/// Axis-aligned bounding box.
///
/// Stored as center + half-size; half-size is non-negative per axis, so
/// `min() <= max()` always holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
  center: DVec3,
  half_size: DVec3,
}

impl Aabb {
  /// Create an AABB from center and full size.
  ///
  /// # Panics
  /// Debug-asserts that size is non-negative on all axes.
  pub fn new(center: DVec3, size: DVec3) -> Self {
    debug_assert!(
      size.x >= 0.0 && size.y >= 0.0 && size.z >= 0.0,
      "AABB size must be non-negative on all axes"
    );
    Self {
      center,
      half_size: size * 0.5,
    }
  }

  /// Create an AABB from min and max corners.
  ///
  /// # Panics
  /// Debug-asserts that min <= max on all axes.
  pub fn from_min_max(min: DVec3, max: DVec3) -> Self {
    debug_assert!(
      min.x <= max.x && min.y <= max.y && min.z <= max.z,
      "AABB min must be <= max on all axes"
    );
    Self {
      center: (min + max) * 0.5,
      half_size: (max - min) * 0.5,
    }
  }

  /// Zero-volume AABB at a point, ready for encapsulation.
  pub fn at_point(point: DVec3) -> Self {
    Self {
      center: point,
      half_size: DVec3::ZERO,
    }
  }

  /// Center of the box.
  #[inline]
  pub fn center(&self) -> DVec3 {
    self.center
  }

  /// Full size (max - min).
  #[inline]
  pub fn size(&self) -> DVec3 {
    self.half_size * 2.0
  }

  /// Half-size per axis.
  #[inline]
  pub fn half_size(&self) -> DVec3 {
    self.half_size
  }

  /// Minimum corner.
  #[inline]
  pub fn min(&self) -> DVec3 {
    self.center - self.half_size
  }

  /// Maximum corner.
  #[inline]
  pub fn max(&self) -> DVec3 {
    self.center + self.half_size
  }

  /// A copy grown by `amount` on every side.
  pub fn expand(&self, amount: f64) -> Self {
    debug_assert!(amount >= 0.0, "expand amount must be non-negative");
    Self {
      center: self.center,
      half_size: self.half_size + DVec3::splat(amount),
    }
  }

  /// Grow to include a point. Never shrinks.
  pub fn encapsulate_point(&mut self, point: DVec3) {
    let min = self.min().min(point);
    let max = self.max().max(point);
    self.center = (min + max) * 0.5;
    self.half_size = (max - min) * 0.5;
  }

  /// Grow to include another box. Never shrinks.
  pub fn encapsulate(&mut self, other: &Aabb) {
    let min = self.min().min(other.min());
    let max = self.max().max(other.max());
    self.center = (min + max) * 0.5;
    self.half_size = (max - min) * 0.5;
  }

  /// Smallest box containing both inputs.
  pub fn union(a: &Aabb, b: &Aabb) -> Aabb {
    let mut out = *a;
    out.encapsulate(b);
    out
  }

  /// Check if this AABB contains a point (boundary inclusive).
  #[inline]
  pub fn contains(&self, point: DVec3) -> bool {
    let d = (point - self.center).abs();
    d.x <= self.half_size.x && d.y <= self.half_size.y && d.z <= self.half_size.z
  }

  /// Closest point on or inside the box to `point`.
  #[inline]
  pub fn closest_point(&self, point: DVec3) -> DVec3 {
    point.clamp(self.min(), self.max())
  }

  /// Distance from `point` to the box surface; 0 when inside.
  ///
  /// A lower bound on the distance to anything contained in the box.
  #[inline]
  pub fn distance(&self, point: DVec3) -> f64 {
    point.distance(self.closest_point(point))
  }
}
