//! A physical display region as reported by RandR
use crate::{pure::geometry::Rect, Xid};
use serde::{Deserialize, Serialize};

/// One RandR output. Disabled outputs are kept in the list so their
/// workspaces can be reassigned during reconciliation.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Output name as reported by RandR (e.g. "LVDS1")
    pub name: String,
    /// Whether a CRTC is currently driving this output
    pub active: bool,
    /// Position and size within the root window
    pub rect: Rect,
    /// The workspace currently shown on this output
    pub current_workspace: Option<usize>,
    /// Dock clients reserving space at the edges of this output
    pub dock_clients: Vec<Xid>,
    /// The internal bar window, created on first render
    pub bar_win: Option<Xid>,
    /// Marked by discovery: the output lost its CRTC and its workspaces need
    /// to move elsewhere during the reconciliation sweep
    pub to_be_disabled: bool,
    /// Marked by discovery: the mode changed and every hosted client needs a
    /// reconfigure
    pub changed: bool,
}

impl Output {
    /// A new, active output covering `rect`.
    pub fn new(name: impl Into<String>, rect: Rect) -> Self {
        Self {
            name: name.into(),
            active: true,
            rect,
            ..Default::default()
        }
    }
}
