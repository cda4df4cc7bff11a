//! Identity: a node in the political identity hierarchy.
//!
//! Identities are stored flat. Position in the tree is carried by the
//! materialized `path` (ancestor ids, root-first, excluding the node itself)
//! and the derived `level`. Only [`Hierarchy`](crate::hierarchy::Hierarchy)
//! computes those two fields; callers supply `parent_id` and leaf fields.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Colour assigned when a new identity does not specify one.
pub const DEFAULT_COLOR: &str = "#808080";

/// A persisted identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  /// Stable external identifier.
  pub id:          i64,
  pub parent_id:   Option<i64>,
  pub name:        String,
  /// Unique, lowercase, URL-safe key.
  pub slug:        String,
  #[serde(default)]
  pub abbr:        String,
  pub color:       String,
  #[serde(default)]
  pub description: String,
  /// Depth from the root; always equal to `path.len()`.
  pub level:       u32,
  /// Ancestor ids, root-first, excluding `id`.
  pub path:        Vec<i64>,
  pub is_active:   bool,
}

impl Identity {
  pub fn is_root(&self) -> bool { self.parent_id.is_none() }

  /// `true` if `ancestor_id` appears anywhere in this node's path.
  pub fn descends_from(&self, ancestor_id: i64) -> bool {
    self.path.contains(&ancestor_id)
  }

  /// The path a direct child of this node would carry.
  pub fn child_path(&self) -> Vec<i64> {
    let mut path = Vec::with_capacity(self.path.len() + 1);
    path.extend_from_slice(&self.path);
    path.push(self.id);
    path
  }
}

/// Input for [`Hierarchy::create`](crate::hierarchy::Hierarchy::create).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIdentity {
  /// Caller-chosen id (seed data); allocated by the store when absent.
  pub id:          Option<i64>,
  pub parent_id:   Option<i64>,
  pub name:        String,
  /// Derived from `name` when absent.
  pub slug:        Option<String>,
  #[serde(default)]
  pub abbr:        String,
  /// Defaults to [`DEFAULT_COLOR`].
  pub color:       Option<String>,
  #[serde(default)]
  pub description: String,
}

impl NewIdentity {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }

  pub fn with_id(mut self, id: i64) -> Self {
    self.id = Some(id);
    self
  }

  pub fn under(mut self, parent_id: i64) -> Self {
    self.parent_id = Some(parent_id);
    self
  }

  pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
    self.slug = Some(slug.into());
    self
  }

  pub fn with_color(mut self, color: impl Into<String>) -> Self {
    self.color = Some(color.into());
    self
  }
}

/// Leaf-field edit. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityPatch {
  pub name:        Option<String>,
  pub abbr:        Option<String>,
  pub color:       Option<String>,
  pub description: Option<String>,
}

impl IdentityPatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.abbr.is_none()
      && self.color.is_none()
      && self.description.is_none()
  }

  /// Apply the patch to `identity` in place.
  pub fn apply_to(self, identity: &mut Identity) {
    if let Some(name) = self.name {
      identity.name = name;
    }
    if let Some(abbr) = self.abbr {
      identity.abbr = abbr;
    }
    if let Some(color) = self.color {
      identity.color = color;
    }
    if let Some(description) = self.description {
      identity.description = description;
    }
  }
}

// ─── Lookup key ──────────────────────────────────────────────────────────────

/// A reference to an identity by numeric id or by slug.
///
/// Parsed from a URL segment: all-digit strings are ids, anything else is a
/// slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityRef {
  Id(i64),
  Slug(String),
}

impl fmt::Display for IdentityRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      IdentityRef::Id(id) => write!(f, "#{id}"),
      IdentityRef::Slug(slug) => write!(f, "{slug:?}"),
    }
  }
}

impl FromStr for IdentityRef {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if !s.is_empty()
      && s.bytes().all(|b| b.is_ascii_digit())
      && let Ok(id) = s.parse()
    {
      return Ok(IdentityRef::Id(id));
    }
    Ok(IdentityRef::Slug(s.to_owned()))
  }
}

impl From<i64> for IdentityRef {
  fn from(id: i64) -> Self { IdentityRef::Id(id) }
}
