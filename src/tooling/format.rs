//! Text and JSON rendering of listings, stats and trees.

use crate::error::FsError;
use crate::time::readable_utc;
use crate::tree::{Directory, FsNode, Node, NodeStat};
use crate::types::NodeKind;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn display_name(stat: &NodeStat) -> String {
    if stat.id.is_root() {
        "/".to_string()
    } else {
        stat.name.clone()
    }
}

/// Directory listing as a table: kind, name, size, modified
pub fn format_listing_text(entries: &[NodeStat]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Kind", "Name", "Size", "Modified (UTC)"]);
    for stat in entries {
        table.add_row(vec![
            stat.kind.as_str().to_string(),
            display_name(stat),
            stat.size.to_string(),
            readable_utc(stat.modified),
        ]);
    }
    table.to_string()
}

pub fn format_stat_text(stat: &NodeStat) -> String {
    let mut out = format!("{}\n", format_section_heading(&display_name(stat)));
    out.push_str(&format!("  Id:       {}\n", stat.id));
    out.push_str(&format!("  Kind:     {}\n", stat.kind.as_str()));
    out.push_str(&format!("  Size:     {}\n", stat.size));
    out.push_str(&format!("  Created:  {}\n", readable_utc(stat.created)));
    out.push_str(&format!("  Modified: {}\n", readable_utc(stat.modified)));
    match stat.parent {
        Some(parent) => out.push_str(&format!("  Parent:   {}\n", parent)),
        None => out.push_str("  Parent:   -\n"),
    }
    out
}

/// Info entries as a two-column table
pub fn format_info_text(entries: &[(String, Option<String>)]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Value"]);
    for (name, value) in entries {
        table.add_row(vec![
            name.clone(),
            value.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.to_string()
}

pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, FsError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| FsError::Config(format!("Failed to render JSON: {}", e)))
}

/// Indented tree below `dir`, directories first marked with a trailing `/`.
pub fn format_tree(dir: &Directory<'_>) -> Result<String, FsError> {
    let mut out = String::new();
    let name = if dir.is_root() { "/".to_string() } else { dir.name()? };
    out.push_str(&format!("{}\n", name.bold()));
    render_children(dir, "", &mut out)?;
    Ok(out)
}

fn render_children(dir: &Directory<'_>, prefix: &str, out: &mut String) -> Result<(), FsError> {
    let children = dir.children()?;
    let count = children.len();
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        let name = child.name()?;
        match child {
            Node::Dir(sub) => {
                out.push_str(&format!("{}{}{}/\n", prefix, branch, name.blue().bold()));
                let nested = format!("{}{}", prefix, if last { "    " } else { "│   " });
                render_children(sub, &nested, out)?;
            }
            Node::File(file) => {
                out.push_str(&format!("{}{}{} ({} B)\n", prefix, branch, name, file.size()?));
            }
        }
    }
    Ok(())
}

/// Stat snapshots of every child, in listing order
pub fn child_stats(dir: &Directory<'_>) -> Result<Vec<NodeStat>, FsError> {
    dir.children()?.iter().map(|c| c.stat()).collect()
}

pub fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Dir => "directory",
        NodeKind::File => "file",
    }
}
