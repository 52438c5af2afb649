//! Geometry recalculation, line aggregates, and line breaking
//!
//! Recalculation is memoized and invalidation-driven: each pass re-samples
//! the live [`Configuration`] and recomputes a cell only when its cached
//! geometry is missing or its recalculation stamp no longer matches. The
//! break-up/unbreak pair re-links the draw chain when a composite becomes
//! too wide for the client area.

use tracing::trace;

use crate::config::Configuration;
use crate::geometry::RecalcStamp;
use crate::model::{CellId, CellKind, CellTree};

/// The under-script of a limit is rendered this much smaller than the main
/// font.
pub const LIMIT_FONT_SIZE_DECREASE: f32 = 1.0;
/// Smallest font size used for a limit's under-script.
pub const MIN_LIMIT_FONT_SIZE: f32 = 8.0;

/// Font size for a limit's under-script, clamped to the minimum.
pub fn limit_script_font(font_size: f32) -> f32 {
    (font_size - LIMIT_FONT_SIZE_DECREASE).max(MIN_LIMIT_FONT_SIZE)
}

/// One recalculation pass over a cell tree, borrowing the live
/// configuration.
pub struct Layout<'a> {
    pub config: &'a Configuration,
}

impl<'a> Layout<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    fn stamp(&self, font_size: f32, was_broken: bool) -> RecalcStamp {
        RecalcStamp {
            font_size,
            zoom_factor: self.config.zoom_factor,
            client_width: self.config.client_width,
            was_broken,
        }
    }

    /// True if the cached geometry of `id` may not be read without
    /// recomputing it first.
    pub fn needs_recalculation(&self, tree: &CellTree, id: CellId, font_size: f32) -> bool {
        if self.config.recalculation_force {
            return true;
        }
        let cell = &tree[id];
        if cell.sizes.width.is_none()
            || cell.sizes.height.is_none()
            || cell.sizes.center.is_none()
            || cell.position.is_none()
        {
            return true;
        }
        match cell.stamp {
            None => true,
            Some(stamp) => stamp != self.stamp(font_size, cell.is_broken()),
        }
    }

    /// Recalculate widths and heights for a whole logical list.
    pub fn recalculate_list(&self, tree: &mut CellTree, head: CellId, font_size: f32) {
        self.recalculate_widths_list(tree, head, font_size);
        self.recalculate_height_list(tree, head, font_size);
    }

    /// Aggregates memoize sums and maxima of member geometry, so they go
    /// stale as soon as any member recomputed.
    fn reset_list_aggregates(&self, tree: &mut CellTree, ids: &[CellId]) {
        for &id in ids {
            tree[id].sizes.reset_lists();
        }
    }

    /// Recalculate widths for a whole logical list.
    pub fn recalculate_widths_list(&self, tree: &mut CellTree, head: CellId, font_size: f32) {
        let ids: Vec<CellId> = tree.logical_iter(head).collect();
        let mut changed = false;
        for &id in &ids {
            changed |= self.recalculate_widths(tree, id, font_size);
        }
        if changed {
            self.reset_list_aggregates(tree, &ids);
        }
    }

    /// Recalculate heights for a whole logical list.
    pub fn recalculate_height_list(&self, tree: &mut CellTree, head: CellId, font_size: f32) {
        let ids: Vec<CellId> = tree.logical_iter(head).collect();
        let mut changed = false;
        for &id in &ids {
            changed |= self.recalculate_height(tree, id, font_size);
        }
        if changed {
            self.reset_list_aggregates(tree, &ids);
        }
    }

    /// Recompute the width of one cell, inner lists first. A no-op when the
    /// cached value is still valid; returns whether anything recomputed.
    pub fn recalculate_widths(&self, tree: &mut CellTree, id: CellId, font_size: f32) -> bool {
        match tree[id].kind {
            CellKind::Text { .. } | CellKind::Invalid => {}
            CellKind::Fun { name, arg } => {
                self.recalculate_widths_list(tree, name, font_size);
                self.recalculate_widths_list(tree, arg, font_size);
            }
            CellKind::Abs { inner, open, close } => {
                self.recalculate_widths_list(tree, inner, font_size);
                self.recalculate_widths_list(tree, open, font_size);
                self.recalculate_widths_list(tree, close, font_size);
            }
            CellKind::Limit {
                name,
                under,
                base,
                open,
                comma,
                close,
            } => {
                self.recalculate_widths_list(tree, name, font_size);
                self.recalculate_widths_list(tree, under, limit_script_font(font_size));
                self.recalculate_widths_list(tree, base, font_size);
                self.recalculate_widths_list(tree, open, font_size);
                self.recalculate_widths_list(tree, comma, font_size);
                self.recalculate_widths_list(tree, close, font_size);
            }
            CellKind::Diff { diff, base } => {
                self.recalculate_widths_list(tree, diff, font_size);
                self.recalculate_widths_list(tree, base, font_size);
            }
        }

        if !self.needs_recalculation(tree, id, font_size) {
            return false;
        }

        let width = if tree[id].is_broken() {
            // a broken composite does not draw itself; its parts carry the
            // geometry
            0.0
        } else {
            match tree[id].kind.clone() {
                CellKind::Text { text } => {
                    if tree[id].flags.is_hidden {
                        0.0
                    } else {
                        self.config.metrics(font_size).text_width(&text)
                    }
                }
                CellKind::Invalid => self.config.metrics(font_size).text_width("?"),
                CellKind::Fun { name, arg } => {
                    self.full_width(tree, name) + self.full_width(tree, arg)
                        - self.config.scale_px(1.0)
                }
                CellKind::Abs { inner, .. } => {
                    self.full_width(tree, inner) + 2.0 * self.config.scale_px(4.0)
                }
                CellKind::Limit {
                    name, under, base, ..
                } => {
                    let head_width = self.full_width(tree, name).max(self.full_width(tree, under));
                    head_width + self.full_width(tree, base)
                }
                CellKind::Diff { diff, base } => {
                    self.full_width(tree, diff) + self.full_width(tree, base)
                }
            }
        };
        tree[id].sizes.width = Some(width);
        tree.stats.widths_recalculated += 1;
        trace!(cell = id.0, width, "recalculated width");
        true
    }

    /// Recompute height and center of one cell, inner lists first, then
    /// store the recalculation stamp. A no-op when the cached value is
    /// still valid; returns whether anything recomputed.
    pub fn recalculate_height(&self, tree: &mut CellTree, id: CellId, font_size: f32) -> bool {
        match tree[id].kind {
            CellKind::Text { .. } | CellKind::Invalid => {}
            CellKind::Fun { name, arg } => {
                self.recalculate_height_list(tree, name, font_size);
                self.recalculate_height_list(tree, arg, font_size);
            }
            CellKind::Abs { inner, open, close } => {
                self.recalculate_height_list(tree, inner, font_size);
                self.recalculate_height_list(tree, open, font_size);
                self.recalculate_height_list(tree, close, font_size);
            }
            CellKind::Limit {
                name,
                under,
                base,
                open,
                comma,
                close,
            } => {
                self.recalculate_height_list(tree, name, font_size);
                self.recalculate_height_list(tree, under, limit_script_font(font_size));
                self.recalculate_height_list(tree, base, font_size);
                self.recalculate_height_list(tree, open, font_size);
                self.recalculate_height_list(tree, comma, font_size);
                self.recalculate_height_list(tree, close, font_size);
            }
            CellKind::Diff { diff, base } => {
                self.recalculate_height_list(tree, diff, font_size);
                self.recalculate_height_list(tree, base, font_size);
            }
        }

        if !self.needs_recalculation(tree, id, font_size) {
            return false;
        }

        let (height, center) = if tree[id].is_broken() {
            (0.0, 0.0)
        } else {
            match tree[id].kind.clone() {
                CellKind::Text { text: _ } | CellKind::Invalid => {
                    if tree[id].flags.is_hidden {
                        (0.0, 0.0)
                    } else {
                        let m = self.config.metrics(font_size);
                        (m.line_height(), m.line_center())
                    }
                }
                CellKind::Fun { name, arg } => {
                    let center = self.center_list(tree, name).max(self.center_list(tree, arg));
                    let drop = self.max_drop(tree, name).max(self.max_drop(tree, arg));
                    (center + drop, center)
                }
                CellKind::Abs { inner, .. } => {
                    let center = self.center_list(tree, inner) + self.config.scale_px(2.0);
                    let height = self.height_list(tree, inner) + self.config.scale_px(4.0);
                    (height, center)
                }
                CellKind::Limit {
                    name, under, base, ..
                } => {
                    let center = self.center_list(tree, base).max(self.center_list(tree, name));
                    let name_drop = self.max_drop(tree, name) + self.height_list(tree, under);
                    let drop = self.max_drop(tree, base).max(name_drop);
                    (center + drop, center)
                }
                CellKind::Diff { diff, base } => {
                    let center = self.center_list(tree, diff).max(self.center_list(tree, base));
                    let drop = self.max_drop(tree, diff).max(self.max_drop(tree, base));
                    (center + drop, center)
                }
            }
        };
        let was_broken = tree[id].is_broken();
        let cell = &mut tree[id];
        cell.sizes.height = Some(height);
        cell.sizes.center = Some(center);
        cell.stamp = Some(self.stamp(font_size, was_broken));
        tree.stats.heights_recalculated += 1;
        trace!(cell = id.0, height, center, "recalculated height");
        true
    }

    // -------------------------------------------------------------------------
    // Aggregates over the chains
    // -------------------------------------------------------------------------

    /// Sum of cached widths over the whole logical list headed at `head`.
    /// Memoized on the head; cells without a cached width count as zero so
    /// a stale chain never panics a draw pass.
    pub fn full_width(&self, tree: &mut CellTree, head: CellId) -> f32 {
        if !self.config.recalculation_force {
            if let Some(w) = tree[head].sizes.full_width {
                return w;
            }
        }
        let width = tree
            .logical_iter(head)
            .map(|id| tree[id].sizes.width.unwrap_or(0.0))
            .sum();
        tree[head].sizes.full_width = Some(width);
        width
    }

    /// Sum of widths of all draw-chain cells from `head` up to, not
    /// including, the next line-break marker.
    pub fn line_width(&self, tree: &mut CellTree, head: CellId) -> f32 {
        if !self.config.recalculation_force {
            if let Some(w) = tree[head].sizes.line_width {
                return w;
            }
        }
        let mut width = 0.0;
        for id in tree.draw_iter(head) {
            if id != head && tree[id].starts_new_line() {
                break;
            }
            width += tree[id].sizes.width.unwrap_or(0.0);
        }
        tree[head].sizes.line_width = Some(width);
        width
    }

    /// Maximum center over the current visual line of the draw chain.
    /// Broken cells contribute through their parts, not themselves.
    pub fn center_list(&self, tree: &mut CellTree, head: CellId) -> f32 {
        if !self.config.recalculation_force {
            if let Some(c) = tree[head].sizes.max_center {
                return c;
            }
        }
        let mut center = 0.0f32;
        for id in tree.draw_iter(head) {
            if id != head && tree[id].starts_new_line() {
                break;
            }
            if tree[id].is_broken() {
                continue;
            }
            center = center.max(tree[id].sizes.center.unwrap_or(0.0));
        }
        tree[head].sizes.max_center = Some(center);
        center
    }

    /// Maximum drop below the baseline over the current visual line.
    pub fn max_drop(&self, tree: &mut CellTree, head: CellId) -> f32 {
        if !self.config.recalculation_force {
            if let Some(d) = tree[head].sizes.max_drop {
                return d;
            }
        }
        let mut drop = 0.0f32;
        for id in tree.draw_iter(head) {
            if id != head && tree[id].starts_new_line() {
                break;
            }
            if tree[id].is_broken() {
                continue;
            }
            drop = drop.max(tree[id].sizes.drop().unwrap_or(0.0));
        }
        tree[head].sizes.max_drop = Some(drop);
        drop
    }

    /// Total height of the current visual line.
    pub fn height_list(&self, tree: &mut CellTree, head: CellId) -> f32 {
        self.center_list(tree, head) + self.max_drop(tree, head)
    }

    // -------------------------------------------------------------------------
    // Break-up / unbreak
    // -------------------------------------------------------------------------

    /// Replace a composite, for drawing only, by the sequence of its own
    /// sub-parts. Idempotent; returns whether the cell changed state. The
    /// old draw successor is re-linked after the last sub-part so the draw
    /// chain stays seamless.
    pub fn break_up(&self, tree: &mut CellTree, id: CellId) -> bool {
        if tree[id].is_broken() {
            return false;
        }
        let parts: Vec<CellId> = match tree[id].kind {
            CellKind::Text { .. } | CellKind::Invalid | CellKind::Diff { .. } => return false,
            CellKind::Fun { name, arg } => vec![name, arg],
            CellKind::Abs { inner, open, close } => vec![open, inner, close],
            CellKind::Limit {
                name,
                under,
                base,
                open,
                comma,
                close,
            } => vec![name, open, base, comma, under, close],
        };
        trace!(cell = id.0, "breaking cell into lines");
        let old_next = tree[id].next_to_draw;
        tree.reset_data(id);
        tree[id].flags.is_broken_into_lines = true;
        tree.reset_size(id);

        let mut prev = id;
        for &part in &parts {
            debug_assert!(part != prev);
            tree[prev].next_to_draw = Some(part);
            prev = tree.draw_last(part);
        }
        tree[prev].next_to_draw = old_next;
        true
    }

    /// Undo a break-up, restoring `next_to_draw = next` for this cell and
    /// for everything reachable through its inner lists. Aggregate sizes
    /// computed while broken are invalid once re-collapsed, so they are
    /// reset first.
    pub fn unbreak(&self, tree: &mut CellTree, id: CellId) {
        if tree[id].is_broken() {
            tree.reset_data(id);
            tree.reset_size(id);
        }
        tree[id].flags.is_broken_into_lines = false;
        tree[id].next_to_draw = tree[id].next;
        for head in tree.inner_heads(id) {
            self.unbreak_list(tree, head);
        }
    }

    /// Unbreak every cell of a logical list.
    pub fn unbreak_list(&self, tree: &mut CellTree, head: CellId) {
        let ids: Vec<CellId> = tree.logical_iter(head).collect();
        for id in ids {
            self.unbreak(tree, id);
        }
    }

    /// Walk a logical list and break every composite wider than the client
    /// area, recursing into the parts of anything broken. Callers should
    /// recalculate the list afterwards.
    pub fn break_up_wide_cells(&self, tree: &mut CellTree, head: CellId) {
        let ids: Vec<CellId> = tree.logical_iter(head).collect();
        for id in ids {
            if tree[id].is_broken() {
                continue;
            }
            let width = tree[id].sizes.width.unwrap_or(0.0);
            if width > self.config.client_width && self.break_up(tree, id) {
                for inner in tree.inner_heads(id) {
                    self.break_up_wide_cells(tree, inner);
                }
            }
        }
    }
}
