//! Encoding and decoding helpers between [`Identity`] and the plain column
//! values stored in SQLite.
//!
//! The materialized path is stored as a compact JSON array; `is_active` as
//! an integer flag.

use polity_core::identity::Identity;

use crate::{Error, Result};

/// Column list used by every `SELECT`, against the `identities i` alias.
pub const COLUMNS: &str =
  "i.id, i.parent_id, i.name, i.slug, i.abbr, i.color, i.description, i.level, i.path, i.is_active";

// ─── Path ────────────────────────────────────────────────────────────────────

pub fn encode_path(path: &[i64]) -> Result<String> { Ok(serde_json::to_string(path)?) }

pub fn decode_path(s: &str) -> Result<Vec<i64>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values read directly from (or about to be written to) an
/// `identities` row.
pub struct RawIdentity {
  pub id:          i64,
  pub parent_id:   Option<i64>,
  pub name:        String,
  pub slug:        String,
  pub abbr:        String,
  pub color:       String,
  pub description: String,
  pub level:       i64,
  pub path:        String,
  pub is_active:   bool,
}

impl RawIdentity {
  /// Read a row selected with [`COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      parent_id:   row.get(1)?,
      name:        row.get(2)?,
      slug:        row.get(3)?,
      abbr:        row.get(4)?,
      color:       row.get(5)?,
      description: row.get(6)?,
      level:       row.get(7)?,
      path:        row.get(8)?,
      is_active:   row.get(9)?,
    })
  }

  pub fn from_identity(identity: &Identity) -> Result<Self> {
    Ok(Self {
      id:          identity.id,
      parent_id:   identity.parent_id,
      name:        identity.name.clone(),
      slug:        identity.slug.clone(),
      abbr:        identity.abbr.clone(),
      color:       identity.color.clone(),
      description: identity.description.clone(),
      level:       i64::from(identity.level),
      path:        encode_path(&identity.path)?,
      is_active:   identity.is_active,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    let level = u32::try_from(self.level).map_err(|_| Error::Corrupt {
      column: "level",
      value:  self.level.to_string(),
    })?;
    Ok(Identity {
      id:          self.id,
      parent_id:   self.parent_id,
      name:        self.name,
      slug:        self.slug,
      abbr:        self.abbr,
      color:       self.color,
      description: self.description,
      level,
      path:        decode_path(&self.path)?,
      is_active:   self.is_active,
    })
  }
}

/// A record ready to write: its columns plus the decoded path, which feeds
/// the closure table.
pub struct PendingWrite {
  pub raw:  RawIdentity,
  pub path: Vec<i64>,
}

impl PendingWrite {
  pub fn new(identity: &Identity) -> Result<Self> {
    Ok(Self {
      raw:  RawIdentity::from_identity(identity)?,
      path: identity.path.clone(),
    })
  }
}

pub fn decode_all(raws: Vec<RawIdentity>) -> Result<Vec<Identity>> {
  raws.into_iter().map(RawIdentity::into_identity).collect()
}
