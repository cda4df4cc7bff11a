//! Plain-text rendering of identities for terminal output.

use std::fmt::Write as _;

use polity_core::{identity::Identity, tree::IdentityNode};

/// One line per identity: id, slug, name, abbreviation and state.
pub fn line(identity: &Identity) -> String {
  let mut out = format!("{:>5}  {:<24} {}", identity.id, identity.slug, identity.name);
  if !identity.abbr.is_empty() {
    let _ = write!(out, " ({})", identity.abbr);
  }
  if !identity.is_active {
    out.push_str(" [inactive]");
  }
  out
}

/// Full detail block for a single identity.
pub fn detail(identity: &Identity) -> String {
  let parent = identity
    .parent_id
    .map_or_else(|| "-".to_string(), |p| p.to_string());
  let path = identity
    .path
    .iter()
    .map(i64::to_string)
    .collect::<Vec<_>>()
    .join(" / ");
  let mut out = String::new();
  let _ = writeln!(out, "id:          {}", identity.id);
  let _ = writeln!(out, "name:        {}", identity.name);
  let _ = writeln!(out, "slug:        {}", identity.slug);
  let _ = writeln!(out, "abbr:        {}", identity.abbr);
  let _ = writeln!(out, "color:       {}", identity.color);
  let _ = writeln!(out, "parent:      {parent}");
  let _ = writeln!(out, "level:       {}", identity.level);
  let _ = writeln!(out, "path:        {path}");
  let _ = writeln!(out, "active:      {}", identity.is_active);
  if !identity.description.is_empty() {
    let _ = writeln!(out, "description: {}", identity.description);
  }
  out
}

/// Summary line for a deactivation that touched `count` records.
pub fn deactivated(count: usize) -> String {
  let noun = if count == 1 { "identity" } else { "identities" };
  format!("deactivated {count} {noun}")
}

/// Render nested trees with box-drawing guides.
pub fn tree(roots: &[IdentityNode]) -> String {
  let mut out = String::new();
  for root in roots {
    let _ = writeln!(out, "{}", label(&root.identity));
    children(&mut out, &root.children, "");
  }
  out
}

fn children(out: &mut String, nodes: &[IdentityNode], prefix: &str) {
  for (i, node) in nodes.iter().enumerate() {
    let last = i + 1 == nodes.len();
    let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
    let _ = writeln!(out, "{prefix}{branch}{}", label(&node.identity));
    children(out, &node.children, &format!("{prefix}{indent}"));
  }
}

fn label(identity: &Identity) -> String {
  if identity.abbr.is_empty() {
    format!("{} [{}]", identity.name, identity.id)
  } else {
    format!("{} ({}) [{}]", identity.name, identity.abbr, identity.id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use polity_core::tree::assemble;

  fn identity(id: i64, name: &str, path: Vec<i64>) -> Identity {
    Identity {
      id,
      parent_id: path.last().copied(),
      name: name.into(),
      slug: name.to_lowercase(),
      abbr: String::new(),
      color: "#808080".into(),
      description: String::new(),
      level: path.len() as u32,
      path,
      is_active: true,
    }
  }

  #[test]
  fn tree_draws_guides() {
    let mut dem = identity(2, "Democrat", vec![1]);
    dem.abbr = "D".into();
    let flat = vec![
      identity(1, "Partisan", vec![]),
      dem,
      identity(3, "Republican", vec![1]),
      identity(4, "Progressive", vec![1, 2]),
    ];
    let rendered = tree(&assemble(flat, None));
    assert_eq!(
      rendered,
      "Partisan [1]\n\
       ├── Democrat (D) [2]\n\
       │   └── Progressive [4]\n\
       └── Republican [3]\n"
    );
  }

  #[test]
  fn deactivated_pluralises() {
    assert_eq!(deactivated(1), "deactivated 1 identity");
    assert_eq!(deactivated(3), "deactivated 3 identities");
    assert_eq!(deactivated(0), "deactivated 0 identities");
  }

  #[test]
  fn line_marks_inactive() {
    let mut i = identity(7, "Whig", vec![]);
    i.is_active = false;
    let l = line(&i);
    assert!(l.contains("whig"));
    assert!(l.ends_with("[inactive]"));
  }

  #[test]
  fn detail_shows_path() {
    let d = detail(&identity(4, "Progressive", vec![1, 2]));
    assert!(d.contains("path:        1 / 2"));
    assert!(d.contains("parent:      2"));
  }
}
