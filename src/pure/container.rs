//! A single cell of the workspace table
use crate::{pure::geometry::Rect, Xid};
use serde::{Deserialize, Serialize};

/// How the clients of a container are rendered within its rect
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Clients share the container rect in equal vertical slices
    #[default]
    Default,
    /// All clients render into the same rect below a multi line title strip
    Stack,
    /// All clients render into the same rect below a single tab strip
    Tabbed,
}

/// Cap on the decoration strip of a stacked container
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackLimit {
    /// One decoration line per client
    #[default]
    None,
    /// At most this many columns; rows grow as needed
    Cols(u32),
    /// At most this many rows; columns grow as needed
    Rows(u32),
}

/// One cell of a workspace's table.
///
/// A container always exists for every allocated cell: an empty cell is a
/// container with an empty client list, never a hole in the table.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Column of this container within its workspace table
    pub col: usize,
    /// Row of this container within its workspace table
    pub row: usize,
    /// Number of columns this container spans (>= 1)
    pub colspan: usize,
    /// Number of rows this container spans (>= 1)
    pub rowspan: usize,
    /// Geometry assigned by the last render pass
    pub rect: Rect,
    /// Render mode for the clients of this cell
    pub mode: Mode,
    /// Clients of this cell in user order (a circular ring for focus cycling)
    pub clients: Vec<Xid>,
    /// The client that has (or would receive) focus within this container.
    /// None iff `clients` is empty.
    pub focused: Option<Xid>,
    /// Decoration grid cap for Stack mode
    pub stack_limit: StackLimit,
    /// The decoration window used in Stack/Tabbed modes, created on first
    /// render in one of those modes
    pub stack_win: Option<Xid>,
}

impl Container {
    pub(crate) fn new(col: usize, row: usize) -> Self {
        Self {
            col,
            row,
            colspan: 1,
            rowspan: 1,
            ..Default::default()
        }
    }

    /// Whether this cell holds no clients
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Position of the focused client within the ring
    pub fn focused_index(&self) -> Option<usize> {
        let focused = self.focused?;
        self.clients.iter().position(|&id| id == focused)
    }

    /// The neighbour of `id` in the client ring, wrapping at the ends.
    ///
    /// Returns None when `id` is not in this container or is its only client.
    pub fn cycled_client(&self, id: Xid, forward: bool) -> Option<Xid> {
        if self.clients.len() < 2 {
            return None;
        }
        let i = self.clients.iter().position(|&c| c == id)?;
        let n = self.clients.len();
        let j = if forward { (i + 1) % n } else { (i + n - 1) % n };

        Some(self.clients[j])
    }

    /// Remove a client from the ring, updating `focused` from `fallback`
    /// when it was the focused one.
    pub fn remove_client(&mut self, id: Xid, fallback: Option<Xid>) {
        self.clients.retain(|&c| c != id);

        if self.focused == Some(id) {
            self.focused = fallback.filter(|f| self.clients.contains(f));
            if self.focused.is_none() {
                self.focused = self.clients.last().copied();
            }
        }
    }

    /// Insert a client after the currently focused one (or at the tail) and
    /// focus it.
    pub fn insert_client(&mut self, id: Xid) {
        match self.focused_index() {
            Some(i) => self.clients.insert(i + 1, id),
            None => self.clients.push(id),
        }
        self.focused = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container_with(ids: &[u32]) -> Container {
        let mut c = Container::new(0, 0);
        c.clients = ids.iter().map(|&n| Xid(n)).collect();
        c.focused = c.clients.first().copied();
        c
    }

    #[test]
    fn cycling_wraps_both_ways() {
        let c = container_with(&[1, 2, 3]);

        assert_eq!(c.cycled_client(Xid(3), true), Some(Xid(1)));
        assert_eq!(c.cycled_client(Xid(1), false), Some(Xid(3)));
    }

    #[test]
    fn cycling_a_single_client_is_none() {
        let c = container_with(&[1]);

        assert_eq!(c.cycled_client(Xid(1), true), None);
    }

    #[test]
    fn insert_lands_after_focus() {
        let mut c = container_with(&[1, 2, 3]);
        c.focused = Some(Xid(2));

        c.insert_client(Xid(9));

        assert_eq!(c.clients, vec![Xid(1), Xid(2), Xid(9), Xid(3)]);
        assert_eq!(c.focused, Some(Xid(9)));
    }

    #[test]
    fn remove_focused_falls_back() {
        let mut c = container_with(&[1, 2, 3]);
        c.focused = Some(Xid(2));

        c.remove_client(Xid(2), Some(Xid(1)));

        assert_eq!(c.focused, Some(Xid(1)));

        c.remove_client(Xid(1), None);
        assert_eq!(c.focused, Some(Xid(3)));

        c.remove_client(Xid(3), None);
        assert_eq!(c.focused, None);
        assert!(c.is_empty());
    }
}
