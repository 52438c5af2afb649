//! Structural layout engine for worksheet math cells
//!
//! The engine models mathematical content as a tree of typed cells held in
//! an arena ([`CellTree`]). Every cell sits on two singly linked
//! sequences: the *logical* chain (`next`), which reflects expression
//! order and drives copying and serialization, and the *draw* chain
//! (`next_to_draw`), which reflects visual order and diverges from the
//! logical chain once a composite is broken into lines.
//!
//! Geometry is memoized and invalidation-driven: [`Layout`] recomputes a
//! cell's width, height and baseline only when its cached values are
//! missing or the recorded font size, zoom, or client width no longer
//! match the live [`Configuration`]. [`RenderPass`] converts the draw
//! chain into backend-neutral primitives, and the `select` module resolves
//! points and rectangles back to cells.
//!
//! ```
//! use mathcell::{CellTree, Configuration, Layout, string_writer};
//!
//! let config = Configuration::default();
//! let mut tree = CellTree::new();
//! let group = tree.new_group();
//!
//! let fun = tree.new_fun(group);
//! let name = tree.new_text(group, "sin");
//! let arg = tree.new_text(group, "(x)");
//! tree.set_fun_name(fun, name);
//! tree.set_fun_arg(fun, arg);
//!
//! Layout::new(&config).recalculate_list(&mut tree, fun, config.font_size);
//! assert_eq!(string_writer::cell_to_string(&tree, fun), "sin(x)");
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod mathml_writer;
pub mod model;
pub mod render;
pub mod rtf_writer;
pub mod select;
pub mod string_writer;
pub mod tex_writer;
pub mod xml_writer;

pub use config::{Configuration, FontMetrics, TextRole};
pub use error::{CellError, CellResult};
pub use geometry::{CellSizes, Point, Rect, RecalcStamp, Size};
pub use layout::{limit_script_font, Layout, LIMIT_FONT_SIZE_DECREASE, MIN_LIMIT_FONT_SIZE};
pub use model::{
    Cell, CellFlags, CellId, CellKind, CellTree, CellType, GroupId, RecalcStats,
};
pub use render::{Color, RenderPass, RenderPrimitive};
pub use select::Selection;

#[cfg(test)]
mod tests {
    use super::*;

    fn fun_cell(tree: &mut CellTree, g: GroupId, name: &str, arg: &str) -> CellId {
        let fun = tree.new_fun(g);
        let n = tree.new_text(g, name);
        let a = tree.new_text(g, arg);
        tree.set_fun_name(fun, n);
        tree.set_fun_arg(fun, a);
        fun
    }

    fn limit_cell(tree: &mut CellTree, g: GroupId, under: &str, base: &str) -> CellId {
        let limit = tree.new_limit(g);
        let u = tree.new_text(g, under);
        let b = tree.new_text(g, base);
        tree.set_limit_under(limit, u);
        tree.set_limit_base(limit, b);
        limit
    }

    /// Recalculate, render once to assign anchors, recalculate again so
    /// every stamp is warm.
    fn warm_up(config: &Configuration, tree: &mut CellTree, head: CellId) {
        let layout = Layout::new(config);
        layout.recalculate_list(tree, head, config.font_size);
        let mut pass = RenderPass::new(config);
        pass.draw_list(tree, head, Point::new(0.0, 20.0));
        layout.recalculate_list(tree, head, config.font_size);
    }

    #[test]
    fn test_recalculation_idempotent_after_full_pass() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let fun = fun_cell(&mut tree, g, "sin", "(x)");
        let plus = tree.new_text(g, "+");
        let limit = limit_cell(&mut tree, g, "x->0", "f(x)");
        tree.append(fun, plus);
        tree.append(fun, limit);

        warm_up(&config, &mut tree, fun);
        let stats = tree.stats;
        let layout = Layout::new(&config);
        layout.recalculate_list(&mut tree, fun, config.font_size);
        layout.recalculate_list(&mut tree, fun, config.font_size);
        assert_eq!(tree.stats, stats, "warm recalculation recomputed a cell");
    }

    #[test]
    fn test_zoom_change_invalidates_everything() {
        let mut config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let fun = fun_cell(&mut tree, g, "cos", "(y)");
        warm_up(&config, &mut tree, fun);
        let width = tree[fun].sizes.width.unwrap();

        config.zoom_factor = 2.0;
        let layout = Layout::new(&config);
        layout.recalculate_list(&mut tree, fun, config.font_size);
        assert!(tree[fun].sizes.width.unwrap() > width);
    }

    #[test]
    fn test_wide_expression_breaks_wraps_and_reads_whole() {
        let mut config = Configuration::default();
        config.client_width = 30.0;
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let fun = fun_cell(&mut tree, g, "expand", "((x+1)^8)");
        let layout = Layout::new(&config);
        layout.recalculate_list(&mut tree, fun, config.font_size);

        layout.break_up_wide_cells(&mut tree, fun);
        assert!(tree[fun].is_broken());
        layout.recalculate_list(&mut tree, fun, config.font_size);

        // the split unit still serializes whole through its parts
        assert_eq!(string_writer::list_to_string(&tree, fun), "expand((x+1)^8)");

        let mut pass = RenderPass::new(&config);
        pass.draw_list(&mut tree, fun, Point::new(0.0, 20.0));
        let texts: Vec<&str> = pass
            .primitives()
            .iter()
            .filter_map(|p| match p {
                RenderPrimitive::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["expand", "((x+1)^8)"]);
    }

    #[test]
    fn test_break_unbreak_restores_serialization_and_geometry() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let limit = limit_cell(&mut tree, g, "x->inf+", "1/x");
        let layout = Layout::new(&config);
        layout.recalculate_list(&mut tree, limit, config.font_size);
        let width = tree[limit].sizes.width;
        let height = tree[limit].sizes.height;

        layout.break_up(&mut tree, limit);
        assert_eq!(string_writer::cell_to_string(&tree, limit), "");
        layout.unbreak(&mut tree, limit);
        layout.recalculate_list(&mut tree, limit, config.font_size);

        assert_eq!(tree[limit].sizes.width, width);
        assert_eq!(tree[limit].sizes.height, height);
        assert_eq!(
            string_writer::cell_to_string(&tree, limit),
            "limit(1/x,x,inf,plus)"
        );
    }

    #[test]
    fn test_hit_test_after_render() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let a = tree.new_text(g, "alpha");
        let b = tree.new_text(g, "beta");
        tree.append(a, b);
        warm_up(&config, &mut tree, a);

        let pb = tree[b].position.unwrap();
        let hit = select::cell_at(&tree, a, Point::new(pb.x + 1.0, pb.y));
        assert_eq!(hit, Some(b));
    }

    #[test]
    fn test_all_serializations_of_one_expression() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let fun = fun_cell(&mut tree, g, "sin", "(x)");

        assert_eq!(string_writer::cell_to_string(&tree, fun), "sin(x)");
        assert_eq!(tex_writer::cell_to_tex(&tree, &config, fun), "\\sin{(x)}");
        assert_eq!(
            mathml_writer::cell_to_mathml(&tree, fun),
            "<mrow><mi>sin</mi><mo>&#x2061;</mo><mi>(x)</mi></mrow>"
        );
        let xml = xml_writer::cell_to_xml(&tree, fun).unwrap();
        assert_eq!(xml, "<fn><r><t>sin</t></r><r><t>(x)</t></r></fn>");
        assert_eq!(rtf_writer::cell_to_rtf(&tree, fun), "sin(x)");
        // the XML form survives the markup-to-RTF conversion
        assert_eq!(rtf_writer::markup_to_rtf(&xml), "sin(x)");
    }

    #[test]
    fn test_placeholder_survives_recalc_and_serializes() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let fun = tree.new_fun(g);
        let name = tree.new_text(g, "f");
        tree.set_fun_name(fun, name);
        // the argument was never supplied

        let layout = Layout::new(&config);
        layout.recalculate_list(&mut tree, fun, config.font_size);
        assert!(tree[fun].sizes.width.unwrap() > 0.0);
        assert!(string_writer::cell_to_string(&tree, fun).contains('?'));
    }
}
