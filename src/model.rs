//! Cell model - arena-backed tree of worksheet math cells
//!
//! Cells form two singly linked sequences at once: the *logical* chain
//! (`next`, expression order) and the *draw* chain (`next_to_draw`, visual
//! order). Both links are arena indices; `next` owns its target by
//! convention, `next_to_draw` is a non-owning alias that coincides with
//! `next` until a composite is broken into lines.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::TextRole;
use crate::geometry::{CellSizes, Point, RecalcStamp};

// =============================================================================
// Identifiers
// =============================================================================

/// Index of a cell slot in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u32);

/// Identifier of the group (paragraph-level container) owning a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u32);

// =============================================================================
// Cell kinds and styling
// =============================================================================

/// The semantic role of a cell within the worksheet, mapped to a text style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    Default,
    MainPrompt,
    Prompt,
    Label,
    Input,
    Error,
    Warning,
    Text,
    Section,
    Title,
}

impl CellType {
    pub fn text_role(self) -> TextRole {
        match self {
            CellType::Default => TextRole::Default,
            CellType::MainPrompt => TextRole::MainPrompt,
            CellType::Prompt => TextRole::OtherPrompt,
            CellType::Label => TextRole::Label,
            CellType::Input => TextRole::Input,
            CellType::Error => TextRole::Error,
            CellType::Warning => TextRole::Warning,
            CellType::Text => TextRole::Text,
            CellType::Section => TextRole::Section,
            CellType::Title => TextRole::Title,
        }
    }
}

/// One tag per concrete cell kind. Composite kinds store the heads of their
/// inner cell lists plus their fixed token cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellKind {
    /// A run of text
    Text { text: String },
    /// Placeholder shown when a required inner subtree was never supplied
    Invalid,
    /// Function application: name followed by its argument list
    Fun { name: CellId, arg: CellId },
    /// Absolute value around inner content, with token cells used when the
    /// cell is broken into lines
    Abs {
        inner: CellId,
        open: CellId,
        close: CellId,
    },
    /// Limit: "lim" stacked over an under-script, argument to the right
    Limit {
        name: CellId,
        under: CellId,
        base: CellId,
        open: CellId,
        comma: CellId,
        close: CellId,
    },
    /// Derivative: the diff notation placed before the base expression
    Diff { diff: CellId, base: CellId },
}

/// Per-cell boolean state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFlags {
    /// Draw order diverges from logical order for this cell
    pub is_broken_into_lines: bool,
    /// A soft line break was placed before this cell during wrapping
    pub break_line: bool,
    /// A hard line break is always taken before this cell
    pub force_break_line: bool,
    pub highlight: bool,
    pub is_hidden: bool,
    /// Extra vertical spacing after the line this cell ends
    pub big_skip: bool,
}

// =============================================================================
// Cell
// =============================================================================

/// A single node of the worksheet content tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub kind: CellKind,
    pub cell_type: CellType,
    pub group: GroupId,
    /// Logical successor; owns the rest of the chain
    pub next: Option<CellId>,
    /// Logical predecessor; traversal aid only, never an owner
    pub previous: Option<CellId>,
    /// Draw-order successor; non-owning
    pub next_to_draw: Option<CellId>,
    pub sizes: CellSizes,
    /// Configuration recorded at the last recalculation
    pub stamp: Option<RecalcStamp>,
    /// Top-left anchor assigned by the last draw pass
    pub position: Option<Point>,
    pub flags: CellFlags,
    pub tooltip: Option<String>,
    /// Overrides the plain-text serialization of this cell when set
    pub alt_copy_text: Option<String>,
}

impl Cell {
    fn new(kind: CellKind, group: GroupId) -> Self {
        Self {
            kind,
            cell_type: CellType::Default,
            group,
            next: None,
            previous: None,
            next_to_draw: None,
            sizes: CellSizes::default(),
            stamp: None,
            position: None,
            flags: CellFlags::default(),
            tooltip: None,
            alt_copy_text: None,
        }
    }

    pub fn is_broken(&self) -> bool {
        self.flags.is_broken_into_lines
    }

    /// True if a line starts at this cell in the draw chain.
    pub fn starts_new_line(&self) -> bool {
        self.flags.break_line || self.flags.force_break_line
    }

    pub fn text_role(&self) -> TextRole {
        if self.flags.highlight {
            TextRole::Highlight
        } else {
            self.cell_type.text_role()
        }
    }
}

// =============================================================================
// Recalculation statistics
// =============================================================================

/// Counts actual geometry recomputations, so idempotence of the
/// recalculation protocol is observable from tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcStats {
    pub widths_recalculated: u64,
    pub heights_recalculated: u64,
}

impl RecalcStats {
    pub fn total(&self) -> u64 {
        self.widths_recalculated + self.heights_recalculated
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// Cell tree (arena)
// =============================================================================

const INVALID_CELL_TOOLTIP: &str = "The contents of this cell are missing or could not be interpreted";

/// The arena holding every cell of a worksheet fragment.
///
/// Slots are reused through a free list. Stale `CellId`s are a structural
/// integrity violation and panic on access.
#[derive(Debug, Default)]
pub struct CellTree {
    slots: Vec<Option<Cell>>,
    free: Vec<u32>,
    next_group: u32,
    changed_groups: BTreeSet<GroupId>,
    pub stats: RecalcStats,
}

impl CellTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_group(&mut self) -> GroupId {
        let id = GroupId(self.next_group);
        self.next_group += 1;
        id
    }

    fn alloc(&mut self, cell: Cell) -> CellId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(cell);
                CellId(slot)
            }
            None => {
                self.slots.push(Some(cell));
                CellId((self.slots.len() - 1) as u32)
            }
        }
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.slots
            .get(id.0 as usize)
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    /// Number of live cells in the arena.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -------------------------------------------------------------------------
    // Constructors
    // -------------------------------------------------------------------------

    pub fn new_text(&mut self, group: GroupId, text: impl Into<String>) -> CellId {
        self.alloc(Cell::new(CellKind::Text { text: text.into() }, group))
    }

    /// The placeholder substituted for every missing inner subtree. Styled
    /// as an error and carrying a diagnostic tooltip so the condition is
    /// visible by inspection instead of crashing a draw pass.
    pub fn new_invalid(&mut self, group: GroupId) -> CellId {
        let mut cell = Cell::new(CellKind::Invalid, group);
        cell.cell_type = CellType::Error;
        cell.tooltip = Some(INVALID_CELL_TOOLTIP.to_string());
        self.alloc(cell)
    }

    pub fn new_fun(&mut self, group: GroupId) -> CellId {
        let name = self.new_invalid(group);
        let arg = self.new_invalid(group);
        self.alloc(Cell::new(CellKind::Fun { name, arg }, group))
    }

    pub fn new_abs(&mut self, group: GroupId) -> CellId {
        let inner = self.new_invalid(group);
        let open = self.new_text(group, "abs(");
        let close = self.new_text(group, ")");
        self.alloc(Cell::new(CellKind::Abs { inner, open, close }, group))
    }

    pub fn new_limit(&mut self, group: GroupId) -> CellId {
        let name = self.new_text(group, "lim");
        let under = self.new_invalid(group);
        let base = self.new_invalid(group);
        let open = self.new_text(group, "(");
        let comma = self.new_text(group, ",");
        let close = self.new_text(group, ")");
        self.alloc(Cell::new(
            CellKind::Limit {
                name,
                under,
                base,
                open,
                comma,
                close,
            },
            group,
        ))
    }

    pub fn new_diff(&mut self, group: GroupId) -> CellId {
        let diff = self.new_invalid(group);
        let base = self.new_invalid(group);
        self.alloc(Cell::new(CellKind::Diff { diff, base }, group))
    }

    // -------------------------------------------------------------------------
    // Inner-list setters
    // -------------------------------------------------------------------------

    /// Invalidation after an inner list was replaced: the previous subtree
    /// must already be released and the new head installed.
    fn inner_changed(&mut self, id: CellId) {
        self.reset_size(id);
        self.reset_data(id);
        let group = self[id].group;
        self.mark_group_changed(group);
    }

    pub fn set_fun_name(&mut self, id: CellId, head: CellId) {
        debug_assert!(head != id, "cell cannot contain itself");
        let CellKind::Fun { name: old, .. } = self[id].kind else {
            panic!("set_fun_name on a non-function cell");
        };
        self.release(old);
        let CellKind::Fun { name, .. } = &mut self[id].kind else {
            unreachable!()
        };
        *name = head;
        self.inner_changed(id);
    }

    pub fn set_fun_arg(&mut self, id: CellId, head: CellId) {
        debug_assert!(head != id, "cell cannot contain itself");
        let CellKind::Fun { arg: old, .. } = self[id].kind else {
            panic!("set_fun_arg on a non-function cell");
        };
        self.release(old);
        let CellKind::Fun { arg, .. } = &mut self[id].kind else {
            unreachable!()
        };
        *arg = head;
        self.inner_changed(id);
    }

    pub fn set_abs_inner(&mut self, id: CellId, head: CellId) {
        debug_assert!(head != id, "cell cannot contain itself");
        let CellKind::Abs { inner: old, .. } = self[id].kind else {
            panic!("set_abs_inner on a non-abs cell");
        };
        self.release(old);
        let CellKind::Abs { inner, .. } = &mut self[id].kind else {
            unreachable!()
        };
        *inner = head;
        self.inner_changed(id);
    }

    pub fn set_limit_name(&mut self, id: CellId, head: CellId) {
        debug_assert!(head != id, "cell cannot contain itself");
        let CellKind::Limit { name: old, .. } = self[id].kind else {
            panic!("set_limit_name on a non-limit cell");
        };
        self.release(old);
        let CellKind::Limit { name, .. } = &mut self[id].kind else {
            unreachable!()
        };
        *name = head;
        self.inner_changed(id);
    }

    pub fn set_limit_under(&mut self, id: CellId, head: CellId) {
        debug_assert!(head != id, "cell cannot contain itself");
        let CellKind::Limit { under: old, .. } = self[id].kind else {
            panic!("set_limit_under on a non-limit cell");
        };
        self.release(old);
        let CellKind::Limit { under, .. } = &mut self[id].kind else {
            unreachable!()
        };
        *under = head;
        self.inner_changed(id);
    }

    pub fn set_limit_base(&mut self, id: CellId, head: CellId) {
        debug_assert!(head != id, "cell cannot contain itself");
        let CellKind::Limit { base: old, .. } = self[id].kind else {
            panic!("set_limit_base on a non-limit cell");
        };
        self.release(old);
        let CellKind::Limit { base, .. } = &mut self[id].kind else {
            unreachable!()
        };
        *base = head;
        self.inner_changed(id);
    }

    pub fn set_diff(&mut self, id: CellId, head: CellId) {
        debug_assert!(head != id, "cell cannot contain itself");
        let CellKind::Diff { diff: old, .. } = self[id].kind else {
            panic!("set_diff on a non-diff cell");
        };
        self.release(old);
        let CellKind::Diff { diff, .. } = &mut self[id].kind else {
            unreachable!()
        };
        *diff = head;
        self.inner_changed(id);
    }

    pub fn set_diff_base(&mut self, id: CellId, head: CellId) {
        debug_assert!(head != id, "cell cannot contain itself");
        let CellKind::Diff { base: old, .. } = self[id].kind else {
            panic!("set_diff_base on a non-diff cell");
        };
        self.release(old);
        let CellKind::Diff { base, .. } = &mut self[id].kind else {
            unreachable!()
        };
        *base = head;
        self.inner_changed(id);
    }

    /// Heads of every inner cell list, in the kind's declared order.
    pub fn inner_heads(&self, id: CellId) -> Vec<CellId> {
        match self[id].kind {
            CellKind::Text { .. } | CellKind::Invalid => Vec::new(),
            CellKind::Fun { name, arg } => vec![name, arg],
            CellKind::Abs { inner, open, close } => vec![inner, open, close],
            CellKind::Limit {
                name,
                under,
                base,
                open,
                comma,
                close,
            } => vec![name, under, base, open, comma, close],
            CellKind::Diff { diff, base } => vec![diff, base],
        }
    }

    /// Heads of the inner lists that paint while the cell is not broken.
    /// Token lists (brackets, the limit comma) draw only through the draw
    /// chain of a broken cell, so hit-testing must not descend into them.
    pub fn painted_inner_heads(&self, id: CellId) -> Vec<CellId> {
        match self[id].kind {
            CellKind::Text { .. } | CellKind::Invalid => Vec::new(),
            CellKind::Fun { name, arg } => vec![name, arg],
            CellKind::Abs { inner, .. } => vec![inner],
            CellKind::Limit {
                name, under, base, ..
            } => vec![name, under, base],
            CellKind::Diff { diff, base } => vec![diff, base],
        }
    }

    // -------------------------------------------------------------------------
    // Type, tooltip, alternate copy text
    // -------------------------------------------------------------------------

    /// Change the worksheet role of a cell. A label always starts its own
    /// line, and the owning group is told its contents changed so it can
    /// invalidate its own size.
    pub fn set_type(&mut self, id: CellId, cell_type: CellType) {
        self[id].cell_type = cell_type;
        if cell_type == CellType::Label {
            self[id].flags.force_break_line = true;
        }
        let group = self[id].group;
        self.mark_group_changed(group);
    }

    pub fn set_tooltip(&mut self, id: CellId, tooltip: impl Into<String>) {
        self[id].tooltip = Some(tooltip.into());
    }

    pub fn set_alt_copy_text(&mut self, id: CellId, text: impl Into<String>) {
        self[id].alt_copy_text = Some(text.into());
    }

    fn mark_group_changed(&mut self, group: GroupId) {
        self.changed_groups.insert(group);
    }

    /// Groups whose contents changed since the last call. Cleared on read.
    pub fn take_changed_groups(&mut self) -> Vec<GroupId> {
        std::mem::take(&mut self.changed_groups).into_iter().collect()
    }

    // -------------------------------------------------------------------------
    // Chain operations
    // -------------------------------------------------------------------------

    /// Attach `tail` after the last cell of the logical chain starting at
    /// `head`, and after the last cell of the (possibly divergent) draw
    /// chain. The head's aggregate sizes are invalidated since the chain
    /// contributing to them changed.
    pub fn append(&mut self, head: CellId, tail: CellId) {
        debug_assert!(head != tail, "cell cannot follow itself");
        let last = self.last(head);
        debug_assert!(last != tail);
        self[last].next = Some(tail);
        self[tail].previous = Some(last);

        let draw_last = self.draw_last(head);
        self.set_next_to_draw(draw_last, Some(tail));

        self[head].sizes.full_width = None;
        self[head].sizes.max_center = None;
        self[head].sizes.max_drop = None;
    }

    /// Set the draw successor. A broken composite does not draw itself, so
    /// the link is routed to the tail of its last drawn sub-part instead.
    pub fn set_next_to_draw(&mut self, id: CellId, target: Option<CellId>) {
        debug_assert!(target != Some(id), "cell cannot draw after itself");
        if self[id].is_broken() {
            let last_part = match self[id].kind {
                CellKind::Fun { arg, .. } => Some(arg),
                CellKind::Abs { close, .. } => Some(close),
                CellKind::Limit { close, .. } => Some(close),
                CellKind::Text { .. } | CellKind::Invalid | CellKind::Diff { .. } => None,
            };
            if let Some(part) = last_part {
                let tail = self.draw_last(part);
                if tail != id {
                    self.set_next_to_draw(tail, target);
                    return;
                }
            }
        }
        self[id].next_to_draw = target;
    }

    /// Last cell of the logical chain starting at `id`.
    pub fn last(&self, id: CellId) -> CellId {
        let mut cur = id;
        while let Some(next) = self[cur].next {
            debug_assert!(next != cur, "logical chain self-loop");
            cur = next;
        }
        cur
    }

    /// First cell of the logical chain containing `id`.
    pub fn first(&self, id: CellId) -> CellId {
        let mut cur = id;
        while let Some(prev) = self[cur].previous {
            debug_assert!(prev != cur, "logical chain self-loop");
            cur = prev;
        }
        cur
    }

    /// Last cell of the draw chain starting at `id`.
    pub fn draw_last(&self, id: CellId) -> CellId {
        let mut cur = id;
        while let Some(next) = self[cur].next_to_draw {
            debug_assert!(next != cur, "draw chain self-loop");
            cur = next;
        }
        cur
    }

    /// Iterate the logical chain from `head`.
    pub fn logical_iter(&self, head: CellId) -> impl Iterator<Item = CellId> + '_ {
        std::iter::successors(Some(head), move |&id| {
            let next = self[id].next;
            debug_assert!(next != Some(id), "logical chain self-loop");
            next
        })
    }

    /// Iterate the draw chain from `head`.
    pub fn draw_iter(&self, head: CellId) -> impl Iterator<Item = CellId> + '_ {
        std::iter::successors(Some(head), move |&id| {
            let next = self[id].next_to_draw;
            debug_assert!(next != Some(id), "draw chain self-loop");
            next
        })
    }

    // -------------------------------------------------------------------------
    // Copying
    // -------------------------------------------------------------------------

    /// Deep-copy one cell, inner lists included, without its chain links.
    pub fn copy(&mut self, id: CellId) -> CellId {
        let group = self[id].group;
        let kind = match self[id].kind.clone() {
            CellKind::Text { text } => CellKind::Text { text },
            CellKind::Invalid => CellKind::Invalid,
            CellKind::Fun { name, arg } => CellKind::Fun {
                name: self.copy_list(name),
                arg: self.copy_list(arg),
            },
            CellKind::Abs { inner, open, close } => CellKind::Abs {
                inner: self.copy_list(inner),
                open: self.copy_list(open),
                close: self.copy_list(close),
            },
            CellKind::Limit {
                name,
                under,
                base,
                open,
                comma,
                close,
            } => CellKind::Limit {
                name: self.copy_list(name),
                under: self.copy_list(under),
                base: self.copy_list(base),
                open: self.copy_list(open),
                comma: self.copy_list(comma),
                close: self.copy_list(close),
            },
            CellKind::Diff { diff, base } => CellKind::Diff {
                diff: self.copy_list(diff),
                base: self.copy_list(base),
            },
        };
        let copy = self.alloc(Cell::new(kind, group));
        self.copy_common_data(id, copy);
        copy
    }

    /// Deep-copy a cell and its entire logical chain. The draw chain of the
    /// copy starts out coinciding with the logical chain; broken state is
    /// not carried over and is rebuilt if the copy is broken again.
    pub fn copy_list(&mut self, head: CellId) -> CellId {
        let new_head = self.copy(head);
        let mut src = self[head].next;
        let mut dst = new_head;
        while let Some(cur) = src {
            let copy = self.copy(cur);
            self[dst].next = Some(copy);
            self[dst].next_to_draw = Some(copy);
            self[copy].previous = Some(dst);
            dst = copy;
            src = self[cur].next;
        }
        new_head
    }

    /// Carry the state that travels with a copy: type, tooltip, alternate
    /// copy text, hard break and hidden flags. Broken state and cached
    /// geometry stay behind.
    fn copy_common_data(&mut self, from: CellId, to: CellId) {
        let (cell_type, tooltip, alt, force_break, hidden, highlight) = {
            let src = &self[from];
            (
                src.cell_type,
                src.tooltip.clone(),
                src.alt_copy_text.clone(),
                src.flags.force_break_line,
                src.flags.is_hidden,
                src.flags.highlight,
            )
        };
        let dst = &mut self[to];
        dst.cell_type = cell_type;
        dst.tooltip = tooltip;
        dst.alt_copy_text = alt;
        dst.flags.force_break_line = force_break;
        dst.flags.is_hidden = hidden;
        dst.flags.highlight = highlight;
    }

    // -------------------------------------------------------------------------
    // Invalidation
    // -------------------------------------------------------------------------

    /// Invalidate a cell's own dimensions and its recalculation stamp.
    pub fn reset_size(&mut self, id: CellId) {
        let cell = &mut self[id];
        cell.sizes.reset_size();
        cell.stamp = None;
    }

    /// Invalidate own dimensions for every cell of a logical list.
    pub fn reset_size_list(&mut self, head: CellId) {
        let ids: Vec<CellId> = self.logical_iter(head).collect();
        for id in ids {
            self.reset_size(id);
        }
    }

    /// Invalidate the aggregate sizes of this cell and, transitively, of
    /// every cell reachable through inner lists. Logical successors are not
    /// touched; use [`reset_data_list`](Self::reset_data_list) for that.
    pub fn reset_data(&mut self, id: CellId) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            self[cur].sizes.reset_lists();
            for head in self.inner_heads(cur) {
                stack.extend(self.logical_iter(head));
            }
        }
    }

    /// `reset_data` for every cell of a logical list.
    pub fn reset_data_list(&mut self, head: CellId) {
        let ids: Vec<CellId> = self.logical_iter(head).collect();
        for id in ids {
            self.reset_data(id);
        }
    }

    // -------------------------------------------------------------------------
    // Destruction
    // -------------------------------------------------------------------------

    /// Release a cell, its logical chain and all inner subtrees. Walks with
    /// an explicit work stack so arbitrarily long chains cannot overflow
    /// the call stack. Draw links are aliases and are never followed.
    pub fn release(&mut self, id: CellId) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(cell) = self.slots[cur.0 as usize].take() else {
                continue;
            };
            if let Some(next) = cell.next {
                stack.push(next);
            }
            match cell.kind {
                CellKind::Text { .. } | CellKind::Invalid => {}
                CellKind::Fun { name, arg } => stack.extend([name, arg]),
                CellKind::Abs { inner, open, close } => stack.extend([inner, open, close]),
                CellKind::Limit {
                    name,
                    under,
                    base,
                    open,
                    comma,
                    close,
                } => stack.extend([name, under, base, open, comma, close]),
                CellKind::Diff { diff, base } => stack.extend([diff, base]),
            }
            self.free.push(cur.0);
        }
    }
}

impl std::ops::Index<CellId> for CellTree {
    type Output = Cell;

    fn index(&self, id: CellId) -> &Cell {
        self.slots[id.0 as usize]
            .as_ref()
            .expect("stale cell id")
    }
}

impl std::ops::IndexMut<CellId> for CellTree {
    fn index_mut(&mut self, id: CellId) -> &mut Cell {
        self.slots[id.0 as usize]
            .as_mut()
            .expect("stale cell id")
    }
}
