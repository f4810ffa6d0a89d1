//! Scalar/vector field abstraction and CSG-style combinators.
//!
//! A field is a pure function from a point to a value, paired with a domain
//! AABB bounding where it is meaningful. [`Field`] aggregates named channels
//! (Float1/Float2/Float3) under one domain, so a single evaluation position
//! can carry auxiliary per-point attributes alongside the distance value.
//!
//! Combinators never evaluate anything eagerly; they wrap the input closures
//! and union the domains (over-estimating a domain is always safe).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use glam::{DVec2, DVec3};

use crate::aabb::Aabb;

/// Pure scalar field, usually an exact or approximate signed distance.
pub type ScalarField = Arc<dyn Fn(DVec3) -> f64 + Send + Sync>;

/// Pure 2-component field (UVs and similar per-point attributes).
pub type Vec2Field = Arc<dyn Fn(DVec3) -> DVec2 + Send + Sync>;

/// Pure 3-component field (colors, offsets and similar).
pub type Vec3Field = Arc<dyn Fn(DVec3) -> DVec3 + Send + Sync>;

/// Channel kind, used for conflict checks and error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
  Float1,
  Float2,
  Float3,
}

/// A typed field channel. The variant carries the evaluation function, so a
/// kind mismatch is unrepresentable rather than a runtime cast.
#[derive(Clone)]
pub enum Channel {
  Float1(ScalarField),
  Float2(Vec2Field),
  Float3(Vec3Field),
}

impl Channel {
  pub fn kind(&self) -> ChannelKind {
    match self {
      Channel::Float1(_) => ChannelKind::Float1,
      Channel::Float2(_) => ChannelKind::Float2,
      Channel::Float3(_) => ChannelKind::Float3,
    }
  }
}

/// Named set of channels sharing one domain.
#[derive(Clone)]
pub struct Field {
  domain: Aabb,
  channels: HashMap<String, Channel>,
}

impl Field {
  /// Empty field over the given domain.
  pub fn new(domain: Aabb) -> Self {
    Self {
      domain,
      channels: HashMap::new(),
    }
  }

  /// Single-channel scalar field, the common case.
  pub fn scalar<F>(name: &str, domain: Aabb, f: F) -> Self
  where
    F: Fn(DVec3) -> f64 + Send + Sync + 'static,
  {
    Self::new(domain).with_channel(name, Channel::Float1(Arc::new(f)))
  }

  /// Add or replace a channel.
  ///
  /// # Panics
  /// Panics when a channel of the same name already exists under a
  /// different kind (caller bug).
  pub fn with_channel(mut self, name: &str, channel: Channel) -> Self {
    if let Some(existing) = self.channels.get(name) {
      assert!(
        existing.kind() == channel.kind(),
        "channel {:?} is already registered as {:?}, cannot replace with {:?}",
        name,
        existing.kind(),
        channel.kind()
      );
    }
    self.channels.insert(name.to_string(), channel);
    self
  }

  pub fn domain(&self) -> Aabb {
    self.domain
  }

  pub fn channel(&self, name: &str) -> Option<&Channel> {
    self.channels.get(name)
  }

  /// Scalar channel by name, None when absent or not Float1.
  pub fn float1(&self, name: &str) -> Option<&ScalarField> {
    match self.channels.get(name) {
      Some(Channel::Float1(f)) => Some(f),
      _ => None,
    }
  }

  pub fn channels(&self) -> impl Iterator<Item = (&str, &Channel)> {
    self.channels.iter().map(|(name, c)| (name.as_str(), c))
  }
}

/// Pointwise minimum of scalar fields: implicit-surface union.
///
/// # Panics
/// Panics on an empty input (caller bug).
pub fn union(fields: Vec<ScalarField>) -> ScalarField {
  assert!(!fields.is_empty(), "union requires at least one field");
  if fields.len() == 1 {
    return fields.into_iter().next().unwrap();
  }
  Arc::new(move |p| fields.iter().map(|f| f(p)).fold(f64::INFINITY, f64::min))
}

/// Pointwise maximum of scalar fields: implicit-surface intersection.
///
/// # Panics
/// Panics on an empty input (caller bug).
pub fn intersect(fields: Vec<ScalarField>) -> ScalarField {
  assert!(!fields.is_empty(), "intersect requires at least one field");
  if fields.len() == 1 {
    return fields.into_iter().next().unwrap();
  }
  Arc::new(move |p| {
    fields
      .iter()
      .map(|f| f(p))
      .fold(f64::NEG_INFINITY, f64::max)
  })
}

/// Merge field aggregates.
///
/// Float1 channels reduce via [`union`] (implicit-surface semantics);
/// Float2/Float3 channels reduce via unweighted per-point averaging over the
/// inputs carrying them (they are auxiliary attributes, not distances). The
/// result's domain is the union of every input domain. A single input is
/// returned unchanged; callers rely on that identity.
///
/// # Panics
/// Panics on an empty input, or when the same channel name appears under
/// conflicting kinds (caller bugs).
pub fn combine_fields(mut fields: Vec<Field>) -> Field {
  assert!(!fields.is_empty(), "combine_fields requires at least one field");
  if fields.len() == 1 {
    return fields.pop().unwrap();
  }

  let mut domain = fields[0].domain;
  for field in &fields[1..] {
    domain.encapsulate(&field.domain);
  }

  // Group channels by name; BTreeMap keeps the grouping deterministic
  let mut grouped: BTreeMap<String, Vec<Channel>> = BTreeMap::new();
  for field in fields {
    for (name, channel) in field.channels {
      let entry = grouped.entry(name.clone()).or_default();
      if let Some(first) = entry.first() {
        assert!(
          first.kind() == channel.kind(),
          "channel {:?} appears as both {:?} and {:?}",
          name,
          first.kind(),
          channel.kind()
        );
      }
      entry.push(channel);
    }
  }

  let mut out = Field::new(domain);
  for (name, group) in grouped {
    let combined = match group.first().map(Channel::kind) {
      Some(ChannelKind::Float1) => {
        let scalars: Vec<ScalarField> = group
          .into_iter()
          .map(|c| match c {
            Channel::Float1(f) => f,
            _ => unreachable!("kind checked while grouping"),
          })
          .collect();
        Channel::Float1(union(scalars))
      }
      Some(ChannelKind::Float2) => {
        let inputs: Vec<Vec2Field> = group
          .into_iter()
          .map(|c| match c {
            Channel::Float2(f) => f,
            _ => unreachable!("kind checked while grouping"),
          })
          .collect();
        let count = inputs.len() as f64;
        Channel::Float2(Arc::new(move |p| {
          inputs.iter().map(|f| f(p)).sum::<DVec2>() / count
        }))
      }
      Some(ChannelKind::Float3) => {
        let inputs: Vec<Vec3Field> = group
          .into_iter()
          .map(|c| match c {
            Channel::Float3(f) => f,
            _ => unreachable!("kind checked while grouping"),
          })
          .collect();
        let count = inputs.len() as f64;
        Channel::Float3(Arc::new(move |p| {
          inputs.iter().map(|f| f(p)).sum::<DVec3>() / count
        }))
      }
      None => continue,
    };
    out = out.with_channel(&name, combined);
  }
  out
}

/// CSG subtraction: carve `cut` out of `base`.
///
/// For every Float1 channel of `cut` that `base` also carries,
/// `result(v) = max(base(v), -cut(v))`: points far outside the cut pass the
/// base through, points deep inside the cut are forced strongly positive.
/// Other base channels pass through untouched. The domain is the union of
/// both (over-estimating is always safe).
pub fn subtract(base: Field, cut: Field) -> Field {
  let domain = Aabb::union(&base.domain, &cut.domain);

  let mut out = Field::new(domain);
  for (name, channel) in base.channels {
    let carved = match (&channel, cut.channels.get(&name)) {
      (Channel::Float1(base_f), Some(Channel::Float1(cut_f))) => {
        let base_f = Arc::clone(base_f);
        let cut_f = Arc::clone(cut_f);
        Channel::Float1(Arc::new(move |p| base_f(p).max(-cut_f(p))))
      }
      _ => channel,
    };
    out = out.with_channel(&name, carved);
  }
  out
}

/// Axes to reflect in [`mirror`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MirrorAxes {
  pub x: bool,
  pub y: bool,
  pub z: bool,
}

impl MirrorAxes {
  pub const X: Self = Self {
    x: true,
    y: false,
    z: false,
  };
  pub const Y: Self = Self {
    x: false,
    y: true,
    z: false,
  };
  pub const Z: Self = Self {
    x: false,
    y: false,
    z: true,
  };

  /// Map a query point into the un-mirrored half-space.
  #[inline]
  fn fold(self, p: DVec3) -> DVec3 {
    DVec3::new(
      if self.x { p.x.abs() } else { p.x },
      if self.y { p.y.abs() } else { p.y },
      if self.z { p.z.abs() } else { p.z },
    )
  }

  /// Reflect a point across the selected axis planes.
  #[inline]
  fn reflect(self, p: DVec3) -> DVec3 {
    DVec3::new(
      if self.x { -p.x } else { p.x },
      if self.y { -p.y } else { p.y },
      if self.z { -p.z } else { p.z },
    )
  }
}

/// Mirror a field across the selected axis planes.
///
/// The query point's mirrored axes are folded (`x -> |x|`) before
/// delegating, and the domain is extended to cover the mirrored half.
pub fn mirror(field: Field, axes: MirrorAxes) -> Field {
  let r1 = axes.reflect(field.domain.min());
  let r2 = axes.reflect(field.domain.max());
  let reflected = Aabb::from_min_max(r1.min(r2), r1.max(r2));
  let domain = Aabb::union(&field.domain, &reflected);

  let mut out = Field::new(domain);
  for (name, channel) in field.channels {
    let mirrored = match channel {
      Channel::Float1(f) => Channel::Float1(Arc::new(move |p| f(axes.fold(p)))),
      Channel::Float2(f) => Channel::Float2(Arc::new(move |p| f(axes.fold(p)))),
      Channel::Float3(f) => Channel::Float3(Arc::new(move |p| f(axes.fold(p)))),
    };
    out = out.with_channel(&name, mirrored);
  }
  out
}

#[cfg(test)]
#[path = "field_test.rs"]
mod field_test;
