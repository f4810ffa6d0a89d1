//! Simple analytic signed distance fields for composing scenes and tests.
//!
//! These are deterministic, easy to verify shapes. Richer SDF and noise
//! libraries are expected to supply their own field closures; anything that
//! is `Fn(DVec3) -> f64` paired with a domain works.

use glam::DVec3;

use crate::aabb::Aabb;
use crate::field::Field;

/// Sphere SDF: negative inside, positive outside.
///
/// The domain pads the sphere's bounds by half the radius so the marchers
/// always see a positive shell around the surface.
pub fn sphere(center: DVec3, radius: f64, channel: &str) -> Field {
  debug_assert!(radius > 0.0, "sphere radius must be positive");
  let domain = Aabb::new(center, DVec3::splat(radius * 2.0)).expand(radius * 0.5);
  Field::scalar(channel, domain, move |p| p.distance(center) - radius)
}

/// Axis-aligned box SDF: negative inside, positive outside.
pub fn cuboid(center: DVec3, size: DVec3, channel: &str) -> Field {
  debug_assert!(
    size.x > 0.0 && size.y > 0.0 && size.z > 0.0,
    "cuboid size must be positive"
  );
  let half = size * 0.5;
  let pad = 0.25 * size.max_element();
  let domain = Aabb::new(center, size).expand(pad);
  Field::scalar(channel, domain, move |p| {
    let d = (p - center).abs() - half;
    let outside = d.max(DVec3::ZERO).length();
    let inside = d.max_element().min(0.0);
    outside + inside
  })
}
