//! The pure window manager state: workspaces, clients and outputs.
//!
//! Everything in here can be driven and asserted on without an X server.
//! Cross references between workspaces, containers and clients are expressed
//! as [Xid] handles and `(col, row)` indices rather than pointers; the focus
//! stacks hold handles only.
use crate::{
    pure::{
        client::Client,
        geometry::{Point, Rect},
        output::Output,
        workspace::Workspace,
        Direction,
    },
    Xid,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Where a client currently lives within the model.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClientPosition {
    /// In the table of a workspace
    Tiled {
        /// Owning workspace index
        ws: usize,
        /// Owning cell
        col: usize,
        /// Owning cell
        row: usize,
    },
    /// In the floating layer of a workspace
    Floating {
        /// Owning workspace index
        ws: usize,
    },
    /// In the dock area of an output
    Docked {
        /// Owning output index
        output: usize,
    },
}

/// The complete pure state of the window manager.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Model {
    /// All workspaces, created on demand, indexed by `num`
    pub workspaces: Vec<Workspace>,
    /// All managed clients, keyed by their child window
    pub clients: HashMap<Xid, Client>,
    /// All known outputs, active or not
    pub outputs: Vec<Output>,
    /// Index of the workspace holding input focus
    pub current_workspace: usize,
    /// A client spanning all outputs, over everything else
    pub global_fullscreen: Option<Xid>,
}

impl Model {
    /// A model with workspace 1 existing and no outputs yet.
    pub fn new() -> Self {
        Self {
            workspaces: vec![Workspace::new(0)],
            clients: HashMap::new(),
            outputs: Vec::new(),
            current_workspace: 0,
            global_fullscreen: None,
        }
    }

    /// Get workspace `num` (0-based), creating all workspaces up to it on
    /// demand.
    pub fn workspace_get(&mut self, num: usize) -> &mut Workspace {
        while self.workspaces.len() <= num {
            let n = self.workspaces.len();
            debug!(workspace = n + 1, "creating workspace");
            self.workspaces.push(Workspace::new(n));
        }

        &mut self.workspaces[num]
    }

    /// The currently focused workspace.
    pub fn current(&self) -> &Workspace {
        &self.workspaces[self.current_workspace]
    }

    /// The currently focused workspace, mutably.
    pub fn current_mut(&mut self) -> &mut Workspace {
        &mut self.workspaces[self.current_workspace]
    }

    /// Whether `ws` is the workspace shown on its output right now.
    pub fn workspace_is_visible(&self, ws: usize) -> bool {
        self.workspaces[ws]
            .output
            .and_then(|o| self.outputs.get(o))
            .map(|o| o.current_workspace == Some(ws))
            .unwrap_or(false)
    }

    /// The most recently focused client on the current workspace.
    pub fn focused_client(&self) -> Option<Xid> {
        self.current().last_focused()
    }

    /// Look up a client by its child window.
    pub fn client(&self, id: Xid) -> Option<&Client> {
        self.clients.get(&id)
    }

    /// Look up a client by its child window, mutably.
    pub fn client_mut(&mut self, id: Xid) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    /// Look up a client by either its child window or its frame.
    pub fn client_for_window(&self, id: Xid) -> Option<Xid> {
        if self.clients.contains_key(&id) {
            return Some(id);
        }
        self.clients
            .values()
            .find(|c| c.frame == id)
            .map(|c| c.window)
    }

    /// Where `id` currently lives, if it is managed.
    pub fn position_of(&self, id: Xid) -> Option<ClientPosition> {
        let client = self.clients.get(&id)?;

        if client.dock {
            let output = self
                .outputs
                .iter()
                .position(|o| o.dock_clients.contains(&id))?;
            return Some(ClientPosition::Docked { output });
        }

        match client.cell {
            Some((col, row)) => Some(ClientPosition::Tiled {
                ws: client.workspace,
                col,
                row,
            }),
            None => Some(ClientPosition::Floating {
                ws: client.workspace,
            }),
        }
    }

    /// Remove every edge pointing at `id` (container ring, floating list,
    /// dock list, focus stack, fullscreen) and drop it from the client map.
    ///
    /// Returns the removed client.
    pub fn remove_client(&mut self, id: Xid) -> Option<Client> {
        let position = self.position_of(id)?;

        match position {
            ClientPosition::Tiled { ws, col, row } => {
                let fallback = self.workspaces[ws].last_focused_in(col, row, Some(id));
                let workspace = &mut self.workspaces[ws];
                workspace.table[col][row].remove_client(id, fallback);
                workspace.focus_remove(id);
                if workspace.fullscreen == Some(id) {
                    workspace.fullscreen = None;
                }
            }
            ClientPosition::Floating { ws } => {
                let workspace = &mut self.workspaces[ws];
                workspace.floating.retain(|&c| c != id);
                workspace.focus_remove(id);
                if workspace.fullscreen == Some(id) {
                    workspace.fullscreen = None;
                }
            }
            ClientPosition::Docked { output } => {
                self.outputs[output].dock_clients.retain(|&c| c != id);
            }
        }

        self.clients.remove(&id)
    }

    /// Pull a tiled client out of its container (for floating or moving),
    /// leaving it in the focus stack.
    pub fn detach_tiled(&mut self, id: Xid) {
        if let Some(ClientPosition::Tiled { ws, col, row }) = self.position_of(id) {
            let fallback = self.workspaces[ws].last_focused_in(col, row, Some(id));
            self.workspaces[ws].table[col][row].remove_client(id, fallback);
            if let Some(client) = self.clients.get_mut(&id) {
                client.cell = None;
            }
        }
    }

    /// Insert `id` into the currently selected cell of workspace `ws`.
    pub fn attach_tiled(&mut self, id: Xid, ws: usize) {
        let (col, row) = {
            let workspace = self.workspace_get(ws);
            (workspace.current_col, workspace.current_row)
        };
        self.workspaces[ws].table[col][row].insert_client(id);
        if let Some(client) = self.clients.get_mut(&id) {
            client.cell = Some((col, row));
            client.workspace = ws;
        }
    }

    /// Rewrite the `(col, row)` back references of every tiled client of a
    /// workspace. Must run after any operation that shifts table cells
    /// (compaction, head expansion, swaps).
    pub fn sync_client_cells(&mut self, ws: usize) {
        let positions: Vec<(Xid, usize, usize)> = self.workspaces[ws]
            .table
            .iter()
            .flatten()
            .flat_map(|cell| cell.clients.iter().map(|&id| (id, cell.col, cell.row)))
            .collect();

        for (id, col, row) in positions {
            if let Some(client) = self.clients.get_mut(&id) {
                client.cell = Some((col, row));
            }
        }
    }

    /// The first active output, if any.
    pub fn first_active_output(&self) -> Option<usize> {
        self.outputs.iter().position(|o| o.active)
    }

    /// The active output containing the given point.
    pub fn output_containing(&self, p: Point) -> Option<usize> {
        self.outputs
            .iter()
            .position(|o| o.active && o.rect.contains_point(p))
    }

    /// The active output which is the furthest in `direction`, restricted to
    /// outputs sharing the perpendicular coordinate of `current`. Ties pick
    /// the last one encountered.
    pub fn get_output_most(&self, direction: Direction, current: usize) -> usize {
        let cur = &self.outputs[current].rect;
        let mut best = current;

        for (i, o) in self.outputs.iter().enumerate() {
            if !o.active {
                continue;
            }

            let (aligned, better) = match direction {
                Direction::Left => (o.rect.y == cur.y, o.rect.x <= self.outputs[best].rect.x),
                Direction::Right => (o.rect.y == cur.y, o.rect.x >= self.outputs[best].rect.x),
                Direction::Up => (o.rect.x == cur.x, o.rect.y <= self.outputs[best].rect.y),
                Direction::Down => (o.rect.x == cur.x, o.rect.y >= self.outputs[best].rect.y),
            };

            if aligned && better {
                best = i;
            }
        }

        best
    }

    /// The bounding rect of all active outputs (used for global fullscreen).
    pub fn combined_output_rect(&self) -> Rect {
        self.outputs
            .iter()
            .filter(|o| o.active)
            .map(|o| o.rect)
            .reduce(|acc, r| acc.union(&r))
            .unwrap_or_default()
    }

    /// Find a client by its user assigned mark.
    pub fn client_with_mark(&self, mark: &str) -> Option<Xid> {
        self.clients
            .values()
            .find(|c| c.mark.as_deref() == Some(mark))
            .map(|c| c.window)
    }

    /// Find a client whose `class` (and optionally `title`) matches the
    /// `"class/title"` pattern used by the jump and bring commands.
    pub fn client_matching(&self, pattern: &str) -> Option<Xid> {
        let (class, title) = match pattern.split_once('/') {
            Some((c, t)) => (c, Some(t)),
            None => (pattern, None),
        };

        self.clients
            .values()
            .find(|c| {
                c.class_class == class
                    && title.map(|t| c.title.value.contains(t)).unwrap_or(true)
            })
            .map(|c| c.window)
    }

    /// The next (or previous) workspace after the current one that holds at
    /// least one client, wrapping around.
    pub fn next_nonempty_workspace(&self, forward: bool) -> Option<usize> {
        let n = self.workspaces.len();
        (1..n)
            .map(|step| {
                if forward {
                    (self.current_workspace + step) % n
                } else {
                    (self.current_workspace + n - step) % n
                }
            })
            .find(|&i| !self.workspaces[i].is_empty())
    }

    /// Recompute the workspace urgency flag from its member clients.
    pub fn refresh_workspace_urgency(&mut self, ws: usize) {
        let urgent = self.workspaces[ws]
            .focus_stack
            .iter()
            .any(|id| self.clients.get(id).map(|c| c.urgent).unwrap_or(false));
        self.workspaces[ws].urgent = urgent;
    }

    /// Check the structural invariants of the model, returning a description
    /// of the first violation found.
    ///
    /// This is exercised by the property tests after every mutating command.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        for ws in self.workspaces.iter() {
            if ws.cols() == 0 || ws.rows() == 0 {
                return Err(format!("workspace {} has an empty table", ws.num + 1));
            }
            if ws.current_col >= ws.cols() || ws.current_row >= ws.rows() {
                return Err(format!("workspace {} selection out of bounds", ws.num + 1));
            }
            for column in ws.table.iter() {
                if column.len() != ws.rows() {
                    return Err(format!("workspace {} table is ragged", ws.num + 1));
                }
                for cell in column.iter() {
                    if cell.focused.is_none() != cell.clients.is_empty() {
                        return Err(format!(
                            "cell ({}, {}) focus/empty mismatch on workspace {}",
                            cell.col,
                            cell.row,
                            ws.num + 1
                        ));
                    }
                }
            }

            if let Some(fs) = ws.fullscreen {
                let on_ws = self.clients.get(&fs).map(|c| c.workspace) == Some(ws.num);
                if !on_ws || !ws.focus_stack.contains(&fs) {
                    return Err(format!(
                        "fullscreen client {fs} not owned by workspace {}",
                        ws.num + 1
                    ));
                }
            }

            for id in ws.focus_stack.iter() {
                match self.clients.get(id) {
                    Some(c) if c.workspace == ws.num => (),
                    _ => {
                        return Err(format!(
                            "focus stack of workspace {} holds foreign client {id}",
                            ws.num + 1
                        ))
                    }
                }
            }
        }

        for (&id, _) in self.clients.iter() {
            let mut positions = 0;
            for ws in self.workspaces.iter() {
                positions += ws
                    .table
                    .iter()
                    .flatten()
                    .filter(|cell| cell.clients.contains(&id))
                    .count();
                positions += ws.floating.iter().filter(|&&c| c == id).count();
            }
            for o in self.outputs.iter() {
                positions += o.dock_clients.iter().filter(|&&c| c == id).count();
            }

            if positions != 1 {
                return Err(format!("client {id} appears in {positions} positions"));
            }
        }

        Ok(())
    }
}
