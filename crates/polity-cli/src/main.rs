//! `polity`: command-line client for the Polity identity hierarchy.
//!
//! # Usage
//!
//! ```text
//! polity --url http://localhost:8080 --user admin --password secret tree
//! polity --config ~/.config/polity/config.toml list --category partisan
//! polity seed parties.toml
//! ```

mod client;
mod render;
mod seed;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, ListQuery};
use polity_core::identity::{IdentityPatch, NewIdentity};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "polity", about = "Command-line client for the Polity identity hierarchy")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the polity server (default: http://localhost:8080).
  #[arg(long, env = "POLITY_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "POLITY_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "POLITY_PASSWORD")]
  password: Option<String>,

  /// Print raw JSON instead of formatted text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List identities, filtered and paginated.
  List {
    #[arg(long)]
    level:            Option<u32>,
    /// Id or slug of a top-level identity.
    #[arg(long)]
    category:         Option<String>,
    /// Case-insensitive match on name or abbreviation.
    #[arg(long)]
    search:           Option<String>,
    #[arg(long)]
    include_inactive: bool,
    #[arg(long)]
    page:             Option<u32>,
    #[arg(long)]
    page_size:        Option<u32>,
  },
  /// Show one identity by id or slug.
  Get { key: String },
  /// List every identity below the given one.
  Descendants {
    key:              String,
    #[arg(long)]
    include_inactive: bool,
  },
  /// List the ancestor chain, root first.
  Ancestors { key: String },
  /// List active top-level identities.
  Categories,
  /// Print the active hierarchy as a tree.
  Tree {
    /// Only the subtree under this id or slug.
    #[arg(long)]
    root: Option<String>,
  },
  /// Create an identity.
  Create {
    name:        String,
    #[arg(long)]
    parent:      Option<i64>,
    #[arg(long)]
    id:          Option<i64>,
    #[arg(long)]
    slug:        Option<String>,
    #[arg(long, default_value = "")]
    abbr:        String,
    #[arg(long)]
    color:       Option<String>,
    #[arg(long, default_value = "")]
    description: String,
  },
  /// Edit name, abbreviation, colour or description.
  Update {
    id:          i64,
    #[arg(long)]
    name:        Option<String>,
    #[arg(long)]
    abbr:        Option<String>,
    #[arg(long)]
    color:       Option<String>,
    #[arg(long)]
    description: Option<String>,
  },
  /// Move an identity (and its subtree) under a new parent.
  Move {
    id:     i64,
    #[arg(long, required_unless_present = "root", conflicts_with = "root")]
    parent: Option<i64>,
    /// Make the identity top-level.
    #[arg(long)]
    root:   bool,
  },
  /// Deactivate an identity.
  Deactivate {
    id:      i64,
    /// Also deactivate every descendant.
    #[arg(long)]
    cascade: bool,
  },
  /// Reactivate an identity.
  Activate { id: i64 },
  /// Import a nested tree of identities from a TOML file.
  Seed { file: PathBuf },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    username: args
      .user
      .or_else(|| (!file_cfg.username.is_empty()).then(|| file_cfg.username.clone()))
      .unwrap_or_default(),
    password: args
      .password
      .or_else(|| (!file_cfg.password.is_empty()).then(|| file_cfg.password.clone()))
      .unwrap_or_default(),
  };

  let client = ApiClient::new(api_config)?;
  run(&client, args.command, args.json).await
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn print_lines(identities: &[polity_core::Identity]) {
  for identity in identities {
    println!("{}", render::line(identity));
  }
}

async fn run(client: &ApiClient, command: Command, json: bool) -> Result<()> {
  match command {
    Command::List { level, category, search, include_inactive, page, page_size } => {
      let query = ListQuery { level, category, search, include_inactive, page, page_size };
      let result = client.list(&query).await?;
      if json {
        return print_json(&result);
      }
      print_lines(&result.items);
      let pages = result.total.div_ceil(u64::from(result.page_size.max(1)));
      println!("-- page {} of {} ({} total)", result.page, pages.max(1), result.total);
    }
    Command::Get { key } => {
      let identity = client.get(&key).await?;
      if json {
        return print_json(&identity);
      }
      print!("{}", render::detail(&identity));
    }
    Command::Descendants { key, include_inactive } => {
      let found = client.descendants(&key, include_inactive).await?;
      if json {
        return print_json(&found);
      }
      print_lines(&found);
    }
    Command::Ancestors { key } => {
      let found = client.ancestors(&key).await?;
      if json {
        return print_json(&found);
      }
      print_lines(&found);
    }
    Command::Categories => {
      let found = client.categories().await?;
      if json {
        return print_json(&found);
      }
      print_lines(&found);
    }
    Command::Tree { root } => {
      let trees = client.hierarchy(root.as_deref()).await?;
      if json {
        return print_json(&trees);
      }
      print!("{}", render::tree(&trees));
    }
    Command::Create { name, parent, id, slug, abbr, color, description } => {
      let input = NewIdentity { id, parent_id: parent, name, slug, abbr, color, description };
      let identity = client.create(&input).await?;
      if json {
        return print_json(&identity);
      }
      println!("created {}", render::line(&identity));
    }
    Command::Update { id, name, abbr, color, description } => {
      let patch = IdentityPatch { name, abbr, color, description };
      let identity = client.update(id, &patch).await?;
      if json {
        return print_json(&identity);
      }
      println!("updated {}", render::line(&identity));
    }
    Command::Move { id, parent, root } => {
      let parent_id = if root { None } else { parent };
      let identity = client.move_to(id, parent_id).await?;
      if json {
        return print_json(&identity);
      }
      println!("moved {} (level {})", render::line(&identity), identity.level);
    }
    Command::Deactivate { id, cascade } => {
      let changed = client.deactivate(id, cascade).await?;
      if json {
        return print_json(&changed);
      }
      println!("{}", render::deactivated(changed.len()));
      print_lines(&changed);
    }
    Command::Activate { id } => {
      let identity = client.activate(id).await?;
      if json {
        return print_json(&identity);
      }
      println!("activated {}", render::line(&identity));
    }
    Command::Seed { file } => {
      let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("reading seed file {}", file.display()))?;
      let seed_file = seed::SeedFile::parse(&raw)?;
      let created = seed::import(client, &seed_file).await?;
      if json {
        return print_json(&created);
      }
      println!("seeded {} identities", created.len());
    }
  }
  Ok(())
}
