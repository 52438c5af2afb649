//! Rendering - convert the draw chain into backend-neutral primitives
//!
//! A [`RenderPass`] is created per paint callback, borrows the live
//! configuration for its duration, and collects the primitives a drawing
//! backend consumes. Cell anchor points address the text baseline, so a
//! cell's bounding box starts `center` pixels above its anchor.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{Configuration, TextRole};
use crate::geometry::{Point, Rect, Size};
use crate::layout::Layout;
use crate::model::{CellId, CellKind, CellTree};

// =============================================================================
// Render primitives
// =============================================================================

/// A color in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// A primitive drawing operation, addressed in worksheet coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderPrimitive {
    /// A text run, positioned at its baseline start
    Text {
        position: Point,
        text: String,
        font_size: f32,
        color: Color,
    },
    /// A single glyph, positioned at its baseline start
    Glyph {
        position: Point,
        chr: char,
        font_size: f32,
        color: Color,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
    },
    Rect {
        rect: Rect,
        color: Color,
        filled: bool,
    },
}

// =============================================================================
// Render pass
// =============================================================================

/// Background color of the marker painted behind cells carrying a tooltip.
const TOOLTIP_MARKER_COLOR: Color = Color::rgb(255, 250, 205);

/// One paint pass over a cell tree.
pub struct RenderPass<'a> {
    pub config: &'a Configuration,
    primitives: Vec<RenderPrimitive>,
}

impl<'a> RenderPass<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            primitives: Vec::new(),
        }
    }

    pub fn primitives(&self) -> &[RenderPrimitive] {
        &self.primitives
    }

    pub fn into_primitives(self) -> Vec<RenderPrimitive> {
        self.primitives
    }

    fn push(&mut self, primitive: RenderPrimitive) {
        self.primitives.push(primitive);
    }

    /// Bounding rectangle of a cell anchored at `point`.
    fn cell_rect(&self, tree: &CellTree, id: CellId, point: Point) -> Rect {
        let sizes = &tree[id].sizes;
        let center = sizes.center.unwrap_or(0.0);
        let height = sizes
            .height
            .unwrap_or_else(|| self.estimated_height(tree, id, point));
        Rect {
            origin: Point::new(point.x, point.y - center),
            size: Size::new(sizes.width.unwrap_or(0.0), height),
        }
    }

    /// Height estimate for a cell whose full height was deferred: assume it
    /// reaches down to its draw successor's anchor, and never less than one
    /// text line.
    fn estimated_height(&self, tree: &CellTree, id: CellId, point: Point) -> f32 {
        let line = self.config.base_metrics().line_height();
        match tree[id]
            .next_to_draw
            .and_then(|next| tree[next].position)
        {
            Some(next_point) => (next_point.y - point.y).abs().max(line),
            None => line,
        }
    }

    /// Eligibility check for drawing a single cell: the anchor must be
    /// non-negative and the cell must not be broken (its parts draw in its
    /// stead). With clipping on, the bounding rectangle must also touch the
    /// update region.
    pub fn draw_this_cell(&self, tree: &CellTree, id: CellId, point: Point) -> bool {
        if point.x < 0.0 || point.y < 0.0 {
            return false;
        }
        if tree[id].is_broken() {
            return false;
        }
        if self.config.clip_to_draw_region {
            let rect = self.cell_rect(tree, id, point);
            if !rect.intersects(&self.config.update_region) {
                return false;
            }
        }
        true
    }

    /// Draw a whole draw chain, wrapping to a new visual line at each break
    /// marker. `origin.y` is the baseline of the first line.
    pub fn draw_list(&mut self, tree: &mut CellTree, head: CellId, origin: Point) {
        let layout = Layout::new(self.config);
        let ids: Vec<CellId> = tree.draw_iter(head).collect();
        let mut point = origin;
        let mut line_start = head;
        for id in ids {
            if id != head && tree[id].starts_new_line() {
                let skip = if tree[line_start].flags.big_skip {
                    self.config.base_metrics().line_padding
                } else {
                    0.0
                };
                point.y += layout.max_drop(tree, line_start) + layout.center_list(tree, id) + skip;
                point.x = origin.x;
                line_start = id;
            }
            self.draw_cell(tree, id, point);
            point.x += tree[id].sizes.width.unwrap_or(0.0);
        }
        trace!(primitives = self.primitives.len(), "draw pass complete");
    }

    /// Draw one cell at a baseline anchor. The anchor is recorded on the
    /// cell whether or not anything is painted, since hit-testing and the
    /// invalidation predicate both depend on it.
    pub fn draw_cell(&mut self, tree: &mut CellTree, id: CellId, point: Point) {
        tree[id].position = Some(point);
        if !self.draw_this_cell(tree, id, point) || tree[id].flags.is_hidden {
            return;
        }

        if tree[id].tooltip.is_some() && self.config.clip_to_draw_region {
            let rect = self.cell_rect(tree, id, point);
            self.push(RenderPrimitive::Rect {
                rect,
                color: TOOLTIP_MARKER_COLOR,
                filled: true,
            });
        }

        let font_size = tree[id]
            .stamp
            .map(|s| s.font_size)
            .unwrap_or(self.config.font_size);
        let color = self.config.color_for(tree[id].text_role());

        match tree[id].kind.clone() {
            CellKind::Text { text } => {
                self.push(RenderPrimitive::Text {
                    position: point,
                    text,
                    font_size: font_size * self.config.zoom_factor,
                    color,
                });
            }
            CellKind::Invalid => {
                let color = self.config.color_for(TextRole::Error);
                self.push(RenderPrimitive::Text {
                    position: point,
                    text: "?".to_string(),
                    font_size: font_size * self.config.zoom_factor,
                    color,
                });
            }
            CellKind::Fun { name, arg } => {
                let layout = Layout::new(self.config);
                let name_width = layout.full_width(tree, name);
                self.draw_sub_list(tree, name, point);
                let arg_point = point.offset(name_width - self.config.scale_px(1.0), 0.0);
                self.draw_sub_list(tree, arg, arg_point);
            }
            CellKind::Abs { inner, open, close } => {
                let margin = self.config.scale_px(4.0);
                let layout = Layout::new(self.config);
                let inner_width = layout.full_width(tree, inner);
                self.draw_sub_list(tree, inner, point.offset(margin, 0.0));

                let rect = self.cell_rect(tree, id, point);
                let bar = self.config.scale_px(2.0);
                self.push(RenderPrimitive::Line {
                    from: Point::new(point.x + bar, rect.y()),
                    to: Point::new(point.x + bar, rect.bottom()),
                    color,
                });
                let right = point.x + inner_width + 2.0 * margin - bar;
                self.push(RenderPrimitive::Line {
                    from: Point::new(right, rect.y()),
                    to: Point::new(right, rect.bottom()),
                    color,
                });
                // token parts paint only while broken, but they are still
                // placed so their cached geometry stays warm
                self.place_sub_list(tree, open, point);
                self.place_sub_list(tree, close, point);
            }
            CellKind::Limit {
                name,
                under,
                base,
                open,
                comma,
                close,
            } => {
                let layout = Layout::new(self.config);
                let name_width = layout.full_width(tree, name);
                let under_width = layout.full_width(tree, under);
                let head_width = name_width.max(under_width);

                let name_point = point.offset((head_width - name_width) / 2.0, 0.0);
                self.draw_sub_list(tree, name, name_point);

                let name_drop = layout.max_drop(tree, name);
                let under_center = layout.center_list(tree, under);
                let under_point = Point::new(
                    point.x + (head_width - under_width) / 2.0,
                    point.y + name_drop + under_center,
                );
                self.draw_sub_list(tree, under, under_point);

                self.draw_sub_list(tree, base, point.offset(head_width, 0.0));
                self.place_sub_list(tree, open, point);
                self.place_sub_list(tree, comma, point);
                self.place_sub_list(tree, close, point);
            }
            CellKind::Diff { diff, base } => {
                let layout = Layout::new(self.config);
                let diff_width = layout.full_width(tree, diff);
                self.draw_sub_list(tree, diff, point);
                self.draw_sub_list(tree, base, point.offset(diff_width, 0.0));
            }
        }
    }

    /// Record anchors for an inner list without painting it.
    fn place_sub_list(&mut self, tree: &mut CellTree, head: CellId, origin: Point) {
        let ids: Vec<CellId> = tree.logical_iter(head).collect();
        let mut point = origin;
        for id in ids {
            tree[id].position = Some(point);
            point.x += tree[id].sizes.width.unwrap_or(0.0);
        }
    }

    /// Draw an inner cell list left to right at a common baseline. Inner
    /// lists never wrap; wrapping happens through break-up instead.
    fn draw_sub_list(&mut self, tree: &mut CellTree, head: CellId, origin: Point) {
        let ids: Vec<CellId> = tree.logical_iter(head).collect();
        let mut point = origin;
        for id in ids {
            self.draw_cell(tree, id, point);
            point.x += tree[id].sizes.width.unwrap_or(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GroupId;

    fn recalc(config: &Configuration, tree: &mut CellTree, head: CellId) {
        Layout::new(config).recalculate_list(tree, head, config.font_size);
    }

    fn text_runs(pass: &RenderPass) -> Vec<String> {
        pass.primitives()
            .iter()
            .filter_map(|p| match p {
                RenderPrimitive::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn fun_cell(tree: &mut CellTree, g: GroupId, name: &str, arg: &str) -> CellId {
        let fun = tree.new_fun(g);
        let n = tree.new_text(g, name);
        let a = tree.new_text(g, arg);
        tree.set_fun_name(fun, n);
        tree.set_fun_arg(fun, a);
        fun
    }

    #[test]
    fn test_draw_sets_positions_and_emits_text() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let a = tree.new_text(g, "x");
        let b = tree.new_text(g, "+1");
        tree.append(a, b);
        recalc(&config, &mut tree, a);

        let mut pass = RenderPass::new(&config);
        pass.draw_list(&mut tree, a, Point::new(0.0, 20.0));
        assert_eq!(text_runs(&pass), vec!["x".to_string(), "+1".to_string()]);
        let ax = tree[a].position.unwrap().x;
        let bx = tree[b].position.unwrap().x;
        assert_eq!(bx - ax, tree[a].sizes.width.unwrap());
    }

    #[test]
    fn test_negative_anchor_is_not_drawn() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let a = tree.new_text(g, "x");
        recalc(&config, &mut tree, a);

        let mut pass = RenderPass::new(&config);
        pass.draw_cell(&mut tree, a, Point::new(-1.0, 20.0));
        assert!(pass.primitives().is_empty());
        // the anchor is still recorded
        assert_eq!(tree[a].position.unwrap().x, -1.0);
    }

    #[test]
    fn test_hidden_cell_draws_nothing() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let a = tree.new_text(g, "*");
        tree[a].flags.is_hidden = true;
        recalc(&config, &mut tree, a);

        let mut pass = RenderPass::new(&config);
        pass.draw_cell(&mut tree, a, Point::new(0.0, 20.0));
        assert!(pass.primitives().is_empty());
    }

    #[test]
    fn test_clipping_culls_cells_outside_region() {
        let mut config = Configuration::default();
        config.clip_to_draw_region = true;
        config.update_region = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let a = tree.new_text(g, "x");
        recalc(&config, &mut tree, a);

        let mut pass = RenderPass::new(&config);
        pass.draw_cell(&mut tree, a, Point::new(500.0, 20.0));
        assert!(pass.primitives().is_empty());

        pass.draw_cell(&mut tree, a, Point::new(10.0, 20.0));
        assert!(!pass.primitives().is_empty());
    }

    #[test]
    fn test_abs_draws_two_bars() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let abs = tree.new_abs(g);
        let inner = tree.new_text(g, "x");
        tree.set_abs_inner(abs, inner);
        recalc(&config, &mut tree, abs);

        let mut pass = RenderPass::new(&config);
        pass.draw_cell(&mut tree, abs, Point::new(0.0, 20.0));
        let bars = pass
            .primitives()
            .iter()
            .filter(|p| matches!(p, RenderPrimitive::Line { .. }))
            .count();
        assert_eq!(bars, 2);
        assert_eq!(text_runs(&pass), vec!["x".to_string()]);
    }

    #[test]
    fn test_broken_cell_draws_parts_not_itself() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let fun = fun_cell(&mut tree, g, "sin", "(x)");
        recalc(&config, &mut tree, fun);
        Layout::new(&config).break_up(&mut tree, fun);
        recalc(&config, &mut tree, fun);

        let mut pass = RenderPass::new(&config);
        pass.draw_list(&mut tree, fun, Point::new(0.0, 20.0));
        assert_eq!(
            text_runs(&pass),
            vec!["sin".to_string(), "(x)".to_string()]
        );
    }

    #[test]
    fn test_placeholder_renders_question_mark_in_error_color() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let fun = tree.new_fun(g);
        recalc(&config, &mut tree, fun);

        let mut pass = RenderPass::new(&config);
        pass.draw_cell(&mut tree, fun, Point::new(0.0, 20.0));
        let error = config.color_for(TextRole::Error);
        assert!(pass.primitives().iter().any(|p| matches!(
            p,
            RenderPrimitive::Text { text, color, .. } if text == "?" && *color == error
        )));
    }

    #[test]
    fn test_tooltip_marker_behind_cell_when_clipping() {
        let mut config = Configuration::default();
        config.clip_to_draw_region = true;
        config.update_region = Rect::new(0.0, 0.0, 1000.0, 1000.0);
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let a = tree.new_text(g, "x");
        tree.set_tooltip(a, "a variable");
        recalc(&config, &mut tree, a);

        let mut pass = RenderPass::new(&config);
        pass.draw_cell(&mut tree, a, Point::new(10.0, 20.0));
        assert!(matches!(
            pass.primitives().first(),
            Some(RenderPrimitive::Rect { filled: true, .. })
        ));
    }

    #[test]
    fn test_line_wrap_advances_baseline() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let g = tree.new_group();
        let a = tree.new_text(g, "first");
        let b = tree.new_text(g, "second");
        tree.append(a, b);
        tree[b].flags.force_break_line = true;
        recalc(&config, &mut tree, a);

        let mut pass = RenderPass::new(&config);
        pass.draw_list(&mut tree, a, Point::new(5.0, 20.0));
        let pa = tree[a].position.unwrap();
        let pb = tree[b].position.unwrap();
        assert_eq!(pb.x, 5.0);
        assert!(pb.y > pa.y);
    }
}
