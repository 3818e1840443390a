//! A numbered workspace holding a table of containers plus a floating layer
use crate::{
    pure::{container::Container, geometry::Rect},
    Xid,
};
use serde::{Deserialize, Serialize};

/// One workspace: a 2-D grid of [Container]s, a floating layer and the focus
/// bookkeeping spanning both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// 0-based index of this workspace (displayed as `num + 1`)
    pub num: usize,
    /// Display name shown in the bar
    pub name: String,
    /// The table: `table[col][row]`, always at least 1x1
    pub table: Vec<Vec<Container>>,
    /// Per column width factor; 0.0 means "default share"
    pub width_factor: Vec<f64>,
    /// Per row height factor; 0.0 means "default share"
    pub height_factor: Vec<f64>,
    /// Currently selected column
    pub current_col: usize,
    /// Currently selected row
    pub current_row: usize,
    /// All clients of this workspace in most-recently-focused order
    /// (tiled and floating; docks are not part of any workspace)
    pub focus_stack: Vec<Xid>,
    /// Floating clients in stacking order, bottom to top
    pub floating: Vec<Xid>,
    /// The at most one fullscreen client of this workspace
    pub fullscreen: Option<Xid>,
    /// Index of the output showing this workspace, if any hosts it
    pub output: Option<usize>,
    /// Output name this workspace prefers to be assigned to
    pub preferred_output: Option<String>,
    /// The rect of the hosting output at assignment time
    pub rect: Rect,
    /// Any client on this workspace has the urgency hint set
    pub urgent: bool,
    /// New clients on this workspace float by default
    pub auto_float: bool,
    /// The floating layer is currently hidden
    pub floating_hidden: bool,
}

impl Workspace {
    /// Create workspace `num` with a 1x1 table.
    pub fn new(num: usize) -> Self {
        Self {
            num,
            name: format!("{}", num + 1),
            table: vec![vec![Container::new(0, 0)]],
            width_factor: vec![0.0],
            height_factor: vec![0.0],
            current_col: 0,
            current_row: 0,
            focus_stack: Vec::new(),
            floating: Vec::new(),
            fullscreen: None,
            output: None,
            preferred_output: None,
            rect: Rect::default(),
            urgent: false,
            auto_float: false,
            floating_hidden: false,
        }
    }

    /// Number of columns in the table
    pub fn cols(&self) -> usize {
        self.table.len()
    }

    /// Number of rows in the table
    pub fn rows(&self) -> usize {
        self.table.first().map(Vec::len).unwrap_or(0)
    }

    /// The currently selected cell
    pub fn current_cell(&self) -> &Container {
        &self.table[self.current_col][self.current_row]
    }

    /// The currently selected cell, mutably
    pub fn current_cell_mut(&mut self) -> &mut Container {
        &mut self.table[self.current_col][self.current_row]
    }

    /// Whether this workspace holds no clients at all
    pub fn is_empty(&self) -> bool {
        self.focus_stack.is_empty()
    }

    /// The most recently focused client of this workspace, if any
    pub fn last_focused(&self) -> Option<Xid> {
        self.focus_stack.first().copied()
    }

    /// Move (or insert) `id` to the head of the focus stack.
    pub fn focus_push(&mut self, id: Xid) {
        self.focus_stack.retain(|&c| c != id);
        self.focus_stack.insert(0, id);
    }

    /// Insert `id` into the focus stack after `after`, or at the tail when
    /// `after` is not present.
    pub fn focus_insert_after(&mut self, id: Xid, after: Xid) {
        self.focus_stack.retain(|&c| c != id);
        match self.focus_stack.iter().position(|&c| c == after) {
            Some(i) => self.focus_stack.insert(i + 1, id),
            None => self.focus_stack.push(id),
        }
    }

    /// Drop `id` from the focus stack.
    pub fn focus_remove(&mut self, id: Xid) {
        self.focus_stack.retain(|&c| c != id);
    }

    /// The nearest entry in the focus stack that belongs to the container at
    /// `(col, row)` and is not `except`.
    pub fn last_focused_in(&self, col: usize, row: usize, except: Option<Xid>) -> Option<Xid> {
        let cell = &self.table[col][row];

        self.focus_stack
            .iter()
            .find(|&&id| Some(id) != except && cell.clients.contains(&id))
            .copied()
    }

    /// Raise a floating client to the top of the floating layer.
    pub fn raise_floating(&mut self, id: Xid) {
        if let Some(i) = self.floating.iter().position(|&c| c == id) {
            let id = self.floating.remove(i);
            self.floating.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_workspace_is_one_by_one() {
        let ws = Workspace::new(0);

        assert_eq!(ws.cols(), 1);
        assert_eq!(ws.rows(), 1);
        assert!(ws.current_cell().is_empty());
    }

    #[test]
    fn focus_push_moves_to_head() {
        let mut ws = Workspace::new(0);
        ws.focus_push(Xid(1));
        ws.focus_push(Xid(2));
        ws.focus_push(Xid(1));

        assert_eq!(ws.focus_stack, vec![Xid(1), Xid(2)]);
    }

    #[test]
    fn focus_insert_after_falls_back_to_tail() {
        let mut ws = Workspace::new(0);
        ws.focus_push(Xid(2));
        ws.focus_push(Xid(1));

        ws.focus_insert_after(Xid(3), Xid(1));
        assert_eq!(ws.focus_stack, vec![Xid(1), Xid(3), Xid(2)]);

        ws.focus_insert_after(Xid(4), Xid(99));
        assert_eq!(ws.focus_stack, vec![Xid(1), Xid(3), Xid(2), Xid(4)]);
    }

    #[test]
    fn raise_floating_moves_to_top() {
        let mut ws = Workspace::new(0);
        ws.floating = vec![Xid(1), Xid(2), Xid(3)];

        ws.raise_floating(Xid(1));

        assert_eq!(ws.floating, vec![Xid(2), Xid(3), Xid(1)]);
    }

    #[test]
    fn last_focused_in_skips_except() {
        let mut ws = Workspace::new(0);
        ws.table[0][0].clients = vec![Xid(1), Xid(2)];
        ws.focus_stack = vec![Xid(1), Xid(2)];

        assert_eq!(ws.last_focused_in(0, 0, None), Some(Xid(1)));
        assert_eq!(ws.last_focused_in(0, 0, Some(Xid(1))), Some(Xid(2)));
    }
}
