//! Field-level validation for identity records.
//!
//! Every check is a pure function. [`validate_identity`] runs all of them and
//! collects every violation instead of stopping at the first, so a rejected
//! write reports all offending fields at once.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::identity::Identity;

pub const NAME_MAX: usize = 100;
pub const SLUG_MAX: usize = 100;
pub const ABBR_MAX: usize = 20;
pub const DESCRIPTION_MAX: usize = 500;

static COLOR_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid colour regex"));

static SLUG_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

// ─── Error values ────────────────────────────────────────────────────────────

/// What is wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
  Required,
  InvalidColor,
  InvalidSlug { reason: &'static str },
  FieldTooLong { max: usize, actual: usize },
  Invalid { reason: &'static str },
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Violation::Required => f.write_str("is required"),
      Violation::InvalidColor => f.write_str("must be a hex colour like #1A2B3C"),
      Violation::InvalidSlug { reason } => write!(f, "is not a valid slug: {reason}"),
      Violation::FieldTooLong { max, actual } => {
        write!(f, "is {actual} characters long (max {max})")
      }
      Violation::Invalid { reason } => f.write_str(reason),
    }
  }
}

/// A violation attached to the field it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:     &'static str,
  #[serde(flatten)]
  pub violation: Violation,
}

impl fmt::Display for FieldError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.field, self.violation)
  }
}

/// Every violation found while validating one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  pub fn single(field: &'static str, violation: Violation) -> Self {
    Self(vec![FieldError { field, violation }])
  }

  pub fn push(&mut self, field: &'static str, violation: Violation) {
    self.0.push(FieldError { field, violation });
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn iter(&self) -> impl Iterator<Item = &FieldError> { self.0.iter() }

  /// The first violation recorded against `field`, if any.
  pub fn field(&self, field: &str) -> Option<&Violation> {
    self.0.iter().find(|e| e.field == field).map(|e| &e.violation)
  }

  /// `Ok(())` when nothing was recorded.
  pub fn into_result(self) -> Result<(), Self> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, e) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("; ")?;
      }
      write!(f, "{e}")?;
    }
    Ok(())
  }
}

// ─── Checks ──────────────────────────────────────────────────────────────────

pub fn validate_color(color: &str) -> Result<(), Violation> {
  if COLOR_RE.is_match(color) { Ok(()) } else { Err(Violation::InvalidColor) }
}

pub fn validate_slug(slug: &str) -> Result<(), Violation> {
  if slug.is_empty() {
    return Err(Violation::InvalidSlug { reason: "must not be empty" });
  }
  if slug.chars().count() > SLUG_MAX {
    return Err(Violation::InvalidSlug { reason: "longer than 100 characters" });
  }
  if slug.chars().any(char::is_uppercase) {
    return Err(Violation::InvalidSlug { reason: "must be lowercase" });
  }
  if !SLUG_RE.is_match(slug) {
    return Err(Violation::InvalidSlug {
      reason: "only a-z, 0-9 and single hyphens between words are allowed",
    });
  }
  Ok(())
}

/// Check each `(field, value, max)` triple; lengths are counted in chars.
pub fn validate_lengths(fields: &[(&'static str, &str, usize)]) -> ValidationErrors {
  let mut errors = ValidationErrors::new();
  for &(field, value, max) in fields {
    let actual = value.chars().count();
    if actual > max {
      errors.push(field, Violation::FieldTooLong { max, actual });
    }
  }
  errors
}

/// Run every field check against `identity`.
pub fn validate_identity(identity: &Identity) -> Result<(), ValidationErrors> {
  let mut errors = ValidationErrors::new();

  if identity.id <= 0 {
    errors.push("id", Violation::Invalid { reason: "must be a positive integer" });
  }
  if identity.name.trim().is_empty() {
    errors.push("name", Violation::Required);
  }
  if let Err(v) = validate_slug(&identity.slug) {
    errors.push("slug", v);
  }
  if let Err(v) = validate_color(&identity.color) {
    errors.push("color", v);
  }
  errors.0.extend(
    validate_lengths(&[
      ("name", &identity.name, NAME_MAX),
      ("abbr", &identity.abbr, ABBR_MAX),
      ("description", &identity.description, DESCRIPTION_MAX),
    ])
    .0,
  );

  errors.into_result()
}

/// Derive a slug from a display name: lowercase ASCII alphanumerics, with
/// every run of other characters collapsed to a single hyphen.
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len());
  let mut pending_hyphen = false;
  for c in name.chars() {
    if c.is_ascii_alphanumeric() {
      if pending_hyphen && !slug.is_empty() {
        slug.push('-');
      }
      pending_hyphen = false;
      slug.push(c.to_ascii_lowercase());
    } else {
      pending_hyphen = true;
    }
  }
  slug
}

#[cfg(test)]
mod tests {
  use super::*;

  fn identity() -> Identity {
    Identity {
      id:          7,
      parent_id:   None,
      name:        "Independent".into(),
      slug:        "independent".into(),
      abbr:        "I".into(),
      color:       "#a0B1c2".into(),
      description: "Not affiliated with a party".into(),
      level:       0,
      path:        vec![],
      is_active:   true,
    }
  }

  #[test]
  fn accepts_valid_identity() {
    assert!(validate_identity(&identity()).is_ok());
  }

  #[test]
  fn color_must_be_six_hex_digits() {
    assert!(validate_color("#00ff00").is_ok());
    assert!(validate_color("#00FF00").is_ok());
    assert_eq!(validate_color("00ff00"), Err(Violation::InvalidColor));
    assert_eq!(validate_color("#0f0"), Err(Violation::InvalidColor));
    assert_eq!(validate_color("#00ff00 "), Err(Violation::InvalidColor));
    assert_eq!(validate_color("#00fg00"), Err(Violation::InvalidColor));
    assert_eq!(validate_color("not-a-color"), Err(Violation::InvalidColor));
  }

  #[test]
  fn slug_rules() {
    assert!(validate_slug("green-party").is_ok());
    assert!(validate_slug("party2").is_ok());
    assert!(matches!(validate_slug(""), Err(Violation::InvalidSlug { .. })));
    assert!(matches!(
      validate_slug("Green"),
      Err(Violation::InvalidSlug { reason: "must be lowercase" })
    ));
    assert!(matches!(validate_slug("green party"), Err(Violation::InvalidSlug { .. })));
    assert!(matches!(validate_slug("-green"), Err(Violation::InvalidSlug { .. })));
    assert!(matches!(validate_slug("green--party"), Err(Violation::InvalidSlug { .. })));
    assert!(matches!(
      validate_slug(&"a".repeat(101)),
      Err(Violation::InvalidSlug { .. })
    ));
    assert!(validate_slug(&"a".repeat(100)).is_ok());
  }

  #[test]
  fn lengths_count_chars_not_bytes() {
    let abbr = "é".repeat(20);
    assert!(validate_lengths(&[("abbr", &abbr, ABBR_MAX)]).is_empty());

    let abbr = "é".repeat(21);
    let errors = validate_lengths(&[("abbr", &abbr, ABBR_MAX)]);
    assert_eq!(
      errors.field("abbr"),
      Some(&Violation::FieldTooLong { max: 20, actual: 21 })
    );
  }

  #[test]
  fn collects_every_violation() {
    let mut bad = identity();
    bad.id = 0;
    bad.name = "  ".into();
    bad.slug = "Bad Slug".into();
    bad.color = "not-a-color".into();
    bad.abbr = "x".repeat(ABBR_MAX + 1);
    bad.description = "x".repeat(DESCRIPTION_MAX + 1);

    let errors = validate_identity(&bad).unwrap_err();
    assert_eq!(errors.len(), 6);
    assert!(errors.field("id").is_some());
    assert_eq!(errors.field("name"), Some(&Violation::Required));
    assert!(errors.field("slug").is_some());
    assert_eq!(errors.field("color"), Some(&Violation::InvalidColor));
    assert!(errors.field("abbr").is_some());
    assert!(errors.field("description").is_some());
  }

  #[test]
  fn slugify_collapses_separators() {
    assert_eq!(slugify("Green Party"), "green-party");
    assert_eq!(slugify("  Left / Socialist  "), "left-socialist");
    assert_eq!(slugify("Über-Partei"), "ber-partei");
    assert_eq!(slugify("!!!"), "");
  }

  #[test]
  fn errors_display_every_field() {
    let mut errors = ValidationErrors::new();
    errors.push("color", Violation::InvalidColor);
    errors.push("name", Violation::Required);
    assert_eq!(
      errors.to_string(),
      "color must be a hex colour like #1A2B3C; name is required"
    );
  }
}
