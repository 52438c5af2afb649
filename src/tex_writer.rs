//! TeX serialization
//!
//! Lists serialize along the logical chain; callers unbreak a list before
//! exporting it, since a broken composite yields an empty fragment.

use crate::config::Configuration;
use crate::model::{CellId, CellKind, CellTree};
use crate::string_writer::inner_list_to_string;

/// Function names rendered as TeX macros instead of upright text.
pub const BUILTIN_TEX_FUNCTIONS: [&str; 9] = [
    "sin", "cos", "tan", "sec", "csc", "cot", "sinh", "cosh", "log",
];

fn escape_tex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '%' => out.push_str("\\%"),
            '&' => out.push_str("\\&"),
            '#' => out.push_str("\\#"),
            '$' => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out
}

/// Serialize one cell to TeX. Empty for a cell currently broken into
/// lines.
pub fn cell_to_tex(tree: &CellTree, config: &Configuration, id: CellId) -> String {
    let cell = &tree[id];
    if cell.is_broken() {
        return String::new();
    }
    match &cell.kind {
        CellKind::Text { text } => escape_tex(text),
        CellKind::Invalid => "?".to_string(),
        CellKind::Fun { name, arg } => {
            let name_str = inner_list_to_string(tree, *name);
            let arg_tex = inner_list_to_tex(tree, config, *arg);
            if BUILTIN_TEX_FUNCTIONS.contains(&name_str.as_str()) {
                format!("\\{name_str}{{{arg_tex}}}")
            } else {
                format!("{}{}", inner_list_to_tex(tree, config, *name), arg_tex)
            }
        }
        CellKind::Abs { inner, .. } => {
            format!("\\left| {}\\right|", inner_list_to_tex(tree, config, *inner))
        }
        CellKind::Limit { under, base, .. } => {
            let under_str = inner_list_to_string(tree, *under).replace("->", "\\to ");
            format!(
                "\\lim_{{{under_str}}}{{{}}}",
                inner_list_to_tex(tree, config, *base)
            )
        }
        CellKind::Diff { diff, base } => {
            let diff_str = inner_list_to_string(tree, *diff);
            // the derivative notation reads "num/den" and becomes a fraction
            let diff_tex = match diff_str.split_once('/') {
                Some((num, den)) => format!("\\frac{{{num}}}{{{den}}}"),
                None => escape_tex(&diff_str),
            };
            let mut out = format!("{}{}", diff_tex, inner_list_to_tex(tree, config, *base));
            if config.use_partial_for_diff {
                out = out.replacen("\\frac{d}{d", "\\frac{\\partial}{\\partial", 1);
            }
            out
        }
    }
}

/// Serialize a logical chain, splitting the display environment at every
/// forced line break.
pub fn list_to_tex(tree: &CellTree, config: &Configuration, head: CellId) -> String {
    let mut out = String::new();
    for id in tree.logical_iter(head) {
        if id != head && tree[id].flags.force_break_line {
            out.push_str("\\]\\[");
        }
        out.push_str(&cell_to_tex(tree, config, id));
    }
    out
}

fn inner_list_to_tex(tree: &CellTree, config: &Configuration, head: CellId) -> String {
    tree.logical_iter(head)
        .map(|id| cell_to_tex(tree, config, id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GroupId;

    fn fun_cell(tree: &mut CellTree, g: GroupId, name: &str, arg: &str) -> CellId {
        let fun = tree.new_fun(g);
        let n = tree.new_text(g, name);
        let a = tree.new_text(g, arg);
        tree.set_fun_name(fun, n);
        tree.set_fun_arg(fun, a);
        fun
    }

    fn diff_cell(tree: &mut CellTree, g: GroupId, notation: &str, base: &str) -> CellId {
        let diff = tree.new_diff(g);
        let d = tree.new_text(g, notation);
        let b = tree.new_text(g, base);
        tree.set_diff(diff, d);
        tree.set_diff_base(diff, b);
        diff
    }

    #[test]
    fn test_builtin_function_becomes_macro() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let fun = fun_cell(&mut tree, g, "sin", "(x)");
        assert_eq!(cell_to_tex(&tree, &config, fun), "\\sin{(x)}");
    }

    #[test]
    fn test_unknown_function_stays_verbatim() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let fun = fun_cell(&mut tree, g, "myfun", "(x)");
        assert_eq!(cell_to_tex(&tree, &config, fun), "myfun(x)");
    }

    #[test]
    fn test_abs_uses_growing_delimiters() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let abs = tree.new_abs(g);
        let inner = tree.new_text(g, "x");
        tree.set_abs_inner(abs, inner);
        assert_eq!(cell_to_tex(&tree, &config, abs), "\\left| x\\right|");
    }

    #[test]
    fn test_limit_rewrites_arrow() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let limit = tree.new_limit(g);
        let u = tree.new_text(g, "x->0");
        let b = tree.new_text(g, "f(x)");
        tree.set_limit_under(limit, u);
        tree.set_limit_base(limit, b);
        assert_eq!(
            cell_to_tex(&tree, &config, limit),
            "\\lim_{x\\to 0}{f(x)}"
        );
    }

    #[test]
    fn test_diff_partial_toggle() {
        let mut config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let diff = diff_cell(&mut tree, g, "d/dx", "x^2");

        assert_eq!(cell_to_tex(&tree, &config, diff), "\\frac{d}{dx}x^2");
        config.use_partial_for_diff = true;
        assert_eq!(
            cell_to_tex(&tree, &config, diff),
            "\\frac{\\partial}{\\partialx}x^2"
        );
    }

    #[test]
    fn test_escapes_special_characters() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let t = tree.new_text(g, "100% & #1");
        assert_eq!(cell_to_tex(&tree, &config, t), "100\\% \\& \\#1");
    }

    #[test]
    fn test_forced_break_splits_display() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let a = tree.new_text(g, "a");
        let b = tree.new_text(g, "b");
        tree.append(a, b);
        tree[b].flags.force_break_line = true;
        assert_eq!(list_to_tex(&tree, &config, a), "a\\]\\[b");
    }
}
