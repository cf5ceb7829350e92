//! Tree command - Print the mirrored namespace
//!
//! Reads the namespace snapshot and prints the subtree under a node,
//! one line per node, optionally with payloads.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use zkmirror_core::domain::NodePath;
use zkmirror_store::MemoryCoordinationStore;

use super::{parse_node_path, CliContext, EXIT_INVALID_CONFIG};
use crate::output::plural;

/// Payloads longer than this are elided in the tree view
const MAX_PREVIEW_CHARS: usize = 40;

/// Tree command with clap options
#[derive(Debug, Args)]
pub struct TreeCommand {
    /// Node to start from
    #[arg(default_value = "/", value_parser = parse_node_path)]
    pub prefix: NodePath,

    /// Namespace snapshot to read (overrides store.snapshot)
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Show node payloads
    #[arg(long)]
    pub data: bool,
}

impl TreeCommand {
    /// Execute the tree command
    pub fn execute(&self, ctx: &CliContext) -> Result<ExitCode> {
        let formatter = ctx.formatter();
        let snapshot = match &self.snapshot {
            Some(snapshot) => snapshot.clone(),
            None => match ctx.load_config() {
                Ok(config) => config.store.snapshot,
                Err(e) => {
                    formatter.error(&format!("{e:#}"));
                    return Ok(ExitCode::from(EXIT_INVALID_CONFIG));
                }
            },
        };

        info!(snapshot = %snapshot.display(), prefix = %self.prefix, "Reading namespace");

        let store = MemoryCoordinationStore::load_or_empty(&snapshot)
            .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;

        if store.stat(&self.prefix).is_none() {
            formatter.error(&format!("Node not found: {}", self.prefix));
            return Ok(ExitCode::FAILURE);
        }

        if ctx.is_json() {
            formatter.print_json(&nodes_json(&store, &self.prefix, self.data));
        } else {
            let lines = render_tree(&store, &self.prefix, self.data);
            let count = lines.len();
            for line in lines {
                println!("{}", line);
            }
            formatter.info("");
            formatter.info(&plural(count, "node"));
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Renders `prefix` and its descendants with box-drawing connectors
pub fn render_tree(store: &MemoryCoordinationStore, prefix: &NodePath, data: bool) -> Vec<String> {
    let mut lines = vec![format!("{}{}", prefix, payload_suffix(store, prefix, data))];
    render_children(store, prefix, "", data, &mut lines);
    lines
}

fn render_children(
    store: &MemoryCoordinationStore,
    parent: &NodePath,
    indent: &str,
    data: bool,
    lines: &mut Vec<String>,
) {
    let children = store.children(parent);
    let last = children.len().saturating_sub(1);
    for (i, child) in children.iter().enumerate() {
        let (connector, continuation) = if i == last {
            ("\u{2514}\u{2500}\u{2500} ", "    ")
        } else {
            ("\u{251c}\u{2500}\u{2500} ", "\u{2502}   ")
        };
        lines.push(format!(
            "{}{}{}{}",
            indent,
            connector,
            child.name().unwrap_or_default(),
            payload_suffix(store, child, data)
        ));
        render_children(store, child, &format!("{indent}{continuation}"), data, lines);
    }
}

fn payload_suffix(store: &MemoryCoordinationStore, path: &NodePath, data: bool) -> String {
    if !data {
        return String::new();
    }
    match store.get_data(path) {
        Some(bytes) if bytes.is_empty() => String::new(),
        Some(bytes) => match std::str::from_utf8(&bytes) {
            Ok(text) => format!(" = {:?}", preview(text)),
            Err(_) => format!(" <{}>", plural(bytes.len(), "byte")),
        },
        None => String::new(),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= MAX_PREVIEW_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_PREVIEW_CHARS).collect();
    format!("{head}...")
}

/// Every node in the subtree as `{path, version, size[, data]}`
fn nodes_json(store: &MemoryCoordinationStore, prefix: &NodePath, data: bool) -> serde_json::Value {
    store
        .paths()
        .into_iter()
        .filter(|path| path.starts_with(prefix))
        .filter_map(|path| {
            let stat = store.stat(&path)?;
            let mut node = serde_json::json!({
                "path": path.as_str(),
                "version": stat.version,
                "size": stat.data_length,
            });
            if data {
                node["data"] = store
                    .get_data(&path)
                    .and_then(|bytes| String::from_utf8(bytes).ok())
                    .map_or(serde_json::Value::Null, serde_json::Value::String);
            }
            Some(node)
        })
        .collect()
}
