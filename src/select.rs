//! Hit-testing: resolving points and rectangles to cells
//!
//! All queries walk the draw chain, since selection follows the visual
//! layout. Cells without a recorded position (never drawn) are ignored.

use crate::geometry::{Point, Rect, Size};
use crate::model::{CellId, CellTree};

/// A contiguous run of cells on the same chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub first: CellId,
    pub last: CellId,
}

/// Bounding rectangle of a drawn cell. The recorded anchor addresses the
/// baseline, so the box starts `center` above it.
pub fn bounding_rect(tree: &CellTree, id: CellId) -> Option<Rect> {
    let cell = &tree[id];
    let position = cell.position?;
    let width = cell.sizes.width.unwrap_or(0.0);
    let height = cell.sizes.height.unwrap_or(0.0);
    let center = cell.sizes.center.unwrap_or(0.0);
    Some(Rect {
        origin: Point::new(position.x, position.y - center),
        size: Size::new(width, height),
    })
}

pub fn contains_point(tree: &CellTree, id: CellId, point: Point) -> bool {
    bounding_rect(tree, id)
        .map(|r| r.contains_point(point))
        .unwrap_or(false)
}

pub fn contains_rect(tree: &CellTree, id: CellId, rect: &Rect) -> bool {
    bounding_rect(tree, id)
        .map(|r| r.contains_rect(rect))
        .unwrap_or(false)
}

fn intersects(tree: &CellTree, id: CellId, rect: &Rect) -> bool {
    bounding_rect(tree, id)
        .map(|r| r.intersects(rect))
        .unwrap_or(false)
}

/// First draw-chain cell whose bounding rectangle touches `rect`. Broken
/// cells are transparent to selection; their parts are on the chain.
pub fn select_first(tree: &CellTree, head: CellId, rect: &Rect) -> Option<CellId> {
    tree.draw_iter(head)
        .find(|&id| !tree[id].is_broken() && intersects(tree, id, rect))
}

/// Last draw-chain cell whose bounding rectangle touches `rect`.
pub fn select_last(tree: &CellTree, head: CellId, rect: &Rect) -> Option<CellId> {
    let mut last = None;
    for id in tree.draw_iter(head) {
        if !tree[id].is_broken() && intersects(tree, id, rect) {
            last = Some(id);
        }
    }
    last
}

/// Resolve a rectangle to the run of top-level cells it touches, then
/// narrow into inner lists while the whole selection stays inside one
/// composite.
pub fn select_rect(tree: &CellTree, head: CellId, rect: &Rect) -> Option<Selection> {
    let first = select_first(tree, head, rect)?;
    let last = select_last(tree, head, rect)?;
    if first == last {
        Some(select_inner(tree, first, rect))
    } else {
        Some(Selection { first, last })
    }
}

/// Narrow a single-cell hit to the most deeply nested cells bounding the
/// query rectangle. Only lists that actually paint are considered, so the
/// hidden token cells of an unbroken composite are transparent here.
pub fn select_inner(tree: &CellTree, id: CellId, rect: &Rect) -> Selection {
    for head in tree.painted_inner_heads(id) {
        let first = select_first(tree, head, rect);
        let last = select_last(tree, head, rect);
        if let (Some(first), Some(last)) = (first, last) {
            if first == last {
                return select_inner(tree, first, rect);
            }
            return Selection { first, last };
        }
    }
    Selection { first: id, last: id }
}

/// The draw-chain cell under a point, if any.
pub fn cell_at(tree: &CellTree, head: CellId, point: Point) -> Option<CellId> {
    tree.draw_iter(head)
        .find(|&id| !tree[id].is_broken() && contains_point(tree, id, point))
}

/// Tooltip of the most deeply nested cell under `point` that carries one.
pub fn tooltip_at(tree: &CellTree, head: CellId, point: Point) -> Option<&str> {
    for id in tree.draw_iter(head) {
        if !contains_point(tree, id, point) {
            continue;
        }
        // inner cells take precedence over their enclosing composite
        for inner in tree.painted_inner_heads(id) {
            if let Some(tip) = tooltip_at(tree, inner, point) {
                return Some(tip);
            }
        }
        if let Some(tip) = tree[id].tooltip.as_deref() {
            return Some(tip);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::layout::Layout;
    use crate::model::GroupId;
    use crate::render::RenderPass;

    fn place(tree: &mut CellTree, id: CellId, x: f32, baseline: f32, w: f32, h: f32, c: f32) {
        tree[id].position = Some(Point::new(x, baseline));
        tree[id].sizes.width = Some(w);
        tree[id].sizes.height = Some(h);
        tree[id].sizes.center = Some(c);
    }

    fn three_cells(tree: &mut CellTree, g: GroupId) -> (CellId, CellId, CellId) {
        let a = tree.new_text(g, "a");
        let b = tree.new_text(g, "b");
        let c = tree.new_text(g, "c");
        tree.append(a, b);
        tree.append(a, c);
        place(tree, a, 0.0, 10.0, 10.0, 12.0, 8.0);
        place(tree, b, 10.0, 10.0, 10.0, 12.0, 8.0);
        place(tree, c, 20.0, 10.0, 10.0, 12.0, 8.0);
        (a, b, c)
    }

    #[test]
    fn test_bounding_rect_is_baseline_anchored() {
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let a = tree.new_text(g, "a");
        place(&mut tree, a, 5.0, 20.0, 10.0, 12.0, 8.0);
        let rect = bounding_rect(&tree, a).unwrap();
        assert_eq!(rect.y(), 12.0);
        assert_eq!(rect.bottom(), 24.0);
    }

    #[test]
    fn test_undrawn_cell_is_never_hit() {
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let a = tree.new_text(g, "a");
        assert!(bounding_rect(&tree, a).is_none());
        assert!(!contains_point(&tree, a, Point::origin()));
    }

    #[test]
    fn test_select_first_and_last() {
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let (a, b, c) = three_cells(&mut tree, g);

        let query = Rect::new(12.0, 5.0, 15.0, 10.0);
        assert_eq!(select_first(&tree, a, &query), Some(b));
        assert_eq!(select_last(&tree, a, &query), Some(c));
        assert_eq!(
            select_rect(&tree, a, &query),
            Some(Selection { first: b, last: c })
        );
    }

    #[test]
    fn test_select_misses_outside() {
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let (a, _, _) = three_cells(&mut tree, g);
        let query = Rect::new(100.0, 100.0, 5.0, 5.0);
        assert_eq!(select_rect(&tree, a, &query), None);
    }

    #[test]
    fn test_select_descends_into_composite() {
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let fun = tree.new_fun(g);
        let name = tree.new_text(g, "sin");
        let arg = tree.new_text(g, "(x)");
        tree.set_fun_name(fun, name);
        tree.set_fun_arg(fun, arg);
        place(&mut tree, fun, 0.0, 10.0, 50.0, 12.0, 8.0);
        place(&mut tree, name, 0.0, 10.0, 20.0, 12.0, 8.0);
        place(&mut tree, arg, 20.0, 10.0, 30.0, 12.0, 8.0);

        // a query inside the argument only narrows down to it
        let query = Rect::new(25.0, 6.0, 4.0, 4.0);
        assert_eq!(
            select_rect(&tree, fun, &query),
            Some(Selection {
                first: arg,
                last: arg
            })
        );
    }

    #[test]
    fn test_unbroken_abs_brackets_are_transparent_to_selection() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let abs = tree.new_abs(g);
        let inner = tree.new_text(g, "x");
        tree.set_abs_inner(abs, inner);
        Layout::new(&config).recalculate_list(&mut tree, abs, config.font_size);
        let mut pass = RenderPass::new(&config);
        pass.draw_cell(&mut tree, abs, Point::new(0.0, 20.0));

        // the bar region left of the content belongs to the composite,
        // not to the never-painted "abs(" token cell behind it
        let query = Rect::new(0.5, 18.0, 1.0, 1.0);
        assert_eq!(
            select_rect(&tree, abs, &query),
            Some(Selection {
                first: abs,
                last: abs
            })
        );

        // a query over the content still narrows into it
        let inner_x = tree[inner].position.unwrap().x;
        let content = Rect::new(inner_x + 0.5, 18.0, 1.0, 1.0);
        assert_eq!(
            select_rect(&tree, abs, &content),
            Some(Selection {
                first: inner,
                last: inner
            })
        );
    }

    #[test]
    fn test_cell_at_point() {
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let (a, b, _) = three_cells(&mut tree, g);
        assert_eq!(cell_at(&tree, a, Point::new(15.0, 10.0)), Some(b));
        assert_eq!(cell_at(&tree, a, Point::new(50.0, 10.0)), None);
    }

    #[test]
    fn test_tooltip_prefers_inner_cell() {
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let fun = tree.new_fun(g);
        let name = tree.new_text(g, "sin");
        let arg = tree.new_text(g, "(x)");
        tree.set_fun_name(fun, name);
        tree.set_fun_arg(fun, arg);
        tree.set_tooltip(fun, "outer");
        tree.set_tooltip(arg, "inner");
        place(&mut tree, fun, 0.0, 10.0, 50.0, 12.0, 8.0);
        place(&mut tree, name, 0.0, 10.0, 20.0, 12.0, 8.0);
        place(&mut tree, arg, 20.0, 10.0, 30.0, 12.0, 8.0);

        assert_eq!(tooltip_at(&tree, fun, Point::new(25.0, 10.0)), Some("inner"));
        assert_eq!(tooltip_at(&tree, fun, Point::new(5.0, 10.0)), Some("outer"));
    }
}
