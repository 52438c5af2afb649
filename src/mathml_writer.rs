//! Presentation MathML serialization

use crate::model::{CellId, CellKind, CellTree};

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Token element for a text run: numbers become `<mn>`, single operator
/// characters `<mo>`, everything else an identifier.
fn text_token(text: &str) -> String {
    let arrow_normalized = text.replace("->", "\u{2192}");
    let escaped = escape_xml(&arrow_normalized);
    let numeric = !text.is_empty() && text.chars().all(|c| c.is_ascii_digit() || c == '.');
    if numeric {
        format!("<mn>{escaped}</mn>")
    } else if arrow_normalized.chars().count() == 1
        && !arrow_normalized.chars().next().is_some_and(char::is_alphanumeric)
    {
        format!("<mo>{escaped}</mo>")
    } else {
        format!("<mi>{escaped}</mi>")
    }
}

pub fn cell_to_mathml(tree: &CellTree, id: CellId) -> String {
    let cell = &tree[id];
    let body = match &cell.kind {
        CellKind::Text { text } => text_token(text),
        CellKind::Invalid => "<merror><mtext>?</mtext></merror>".to_string(),
        CellKind::Fun { name, arg } => format!(
            "<mrow>{}<mo>&#x2061;</mo>{}</mrow>",
            inner_list_to_mathml(tree, *name),
            inner_list_to_mathml(tree, *arg)
        ),
        CellKind::Abs { inner, .. } => format!(
            "<mrow><mo>|</mo>{}<mo>|</mo></mrow>",
            inner_list_to_mathml(tree, *inner)
        ),
        CellKind::Limit { under, base, .. } => format!(
            "<mrow><munder><mo>lim</mo><mrow>{}</mrow></munder>{}</mrow>",
            inner_list_to_mathml(tree, *under),
            inner_list_to_mathml(tree, *base)
        ),
        CellKind::Diff { diff, base } => format!(
            "<mrow>{}{}</mrow>",
            inner_list_to_mathml(tree, *diff),
            inner_list_to_mathml(tree, *base)
        ),
    };
    if cell.flags.highlight {
        format!("<mrow mathcolor=\"red\">{body}</mrow>")
    } else {
        body
    }
}

/// Serialize a logical chain. More than one cell is grouped in a single
/// `<mrow>`.
pub fn list_to_mathml(tree: &CellTree, head: CellId) -> String {
    let body: String = tree
        .logical_iter(head)
        .map(|id| cell_to_mathml(tree, id))
        .collect();
    if tree[head].next.is_some() {
        format!("<mrow>{body}</mrow>")
    } else {
        body
    }
}

fn inner_list_to_mathml(tree: &CellTree, head: CellId) -> String {
    tree.logical_iter(head)
        .map(|id| cell_to_mathml(tree, id))
        .collect()
}
