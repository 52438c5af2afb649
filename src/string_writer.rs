//! Plain-text serialization (the document-internal string form)
//!
//! Lists serialize along the draw chain: a broken composite contributes
//! nothing itself and its sub-parts, which are on the chain, supply the
//! text. Forced line breaks become newlines.

use crate::model::{CellId, CellKind, CellTree};

/// Serialize one cell. Returns an empty string for a cell currently broken
/// into lines, since the unit is not independently representable while
/// split.
pub fn cell_to_string(tree: &CellTree, id: CellId) -> String {
    let cell = &tree[id];
    if cell.is_broken() {
        return String::new();
    }
    if let Some(alt) = &cell.alt_copy_text {
        return alt.clone();
    }
    match &cell.kind {
        CellKind::Text { text } => text.clone(),
        CellKind::Invalid => "?".to_string(),
        CellKind::Fun { name, arg } => format!(
            "{}{}",
            inner_list_to_string(tree, *name),
            inner_list_to_string(tree, *arg)
        ),
        CellKind::Abs { inner, .. } => format!("abs({})", inner_list_to_string(tree, *inner)),
        CellKind::Limit { under, base, .. } => {
            limit_to_string(&inner_list_to_string(tree, *base), &inner_list_to_string(tree, *under))
        }
        CellKind::Diff { diff, base } => format!(
            "'diff({}{})",
            inner_list_to_string(tree, *base),
            inner_list_to_string(tree, *diff)
        ),
    }
}

/// Serialize a draw chain, inserting a newline before every forced line
/// break.
pub fn list_to_string(tree: &CellTree, head: CellId) -> String {
    let mut out = String::new();
    for id in tree.draw_iter(head) {
        if id != head && tree[id].flags.force_break_line {
            out.push('\n');
        }
        out.push_str(&cell_to_string(tree, id));
    }
    out
}

/// Concatenate an inner cell list along the logical chain.
pub fn inner_list_to_string(tree: &CellTree, head: CellId) -> String {
    tree.logical_iter(head)
        .map(|id| cell_to_string(tree, id))
        .collect()
}

/// Build the `limit(...)` call form. The under-script splits at `->` into
/// variable and target; a trailing sign on the target names the approach
/// direction.
fn limit_to_string(base: &str, under: &str) -> String {
    match under.split_once("->") {
        Some((var, to)) => {
            if let Some(to) = to.strip_suffix('+') {
                format!("limit({base},{var},{to},plus)")
            } else if let Some(to) = to.strip_suffix('-') {
                format!("limit({base},{var},{to},minus)")
            } else {
                format!("limit({base},{var},{to})")
            }
        }
        None => format!("limit({base},{under})"),
    }
}
