//! A managed client window and its frame
use crate::{pure::geometry::Rect, Xid};
use serde::{Deserialize, Serialize};

/// How a client ended up in (or out of) the floating layer.
///
/// States at or above [FloatingState::AutoOn] count as floating: the ordering
/// of the variants is meaningful.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FloatingState {
    /// Tiled, never touched by the user
    #[default]
    AutoOff,
    /// Tiled because the user toggled it back
    UserOff,
    /// Floating due to window type / assignment
    AutoOn,
    /// Floating because the user toggled it
    UserOn,
}

/// Where the titlebar of a client frame is drawn
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TitlebarPosition {
    /// Above the client area
    #[default]
    Top,
    /// No titlebar at all
    Off,
}

/// Which X property a client title came from.
///
/// `_NET_WM_NAME` is sticky: once a client has set it, later changes to the
/// legacy `WM_NAME` property are ignored.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TitleSource {
    /// Legacy WM_NAME (latin-1 / COMPOUND_TEXT)
    #[default]
    Legacy,
    /// EWMH _NET_WM_NAME (UTF-8)
    Utf8,
}

/// A client window title plus the cached UCS-2 form used for 16-bit text
/// rendering of UTF-8 titles.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    /// The property the current value came from
    pub source: TitleSource,
    /// The title text
    pub value: String,
    /// UCS-2 form of `value`, maintained for Utf8 sourced titles
    pub ucs2: Vec<u16>,
}

impl Title {
    /// Replace the title value, respecting the stickiness of UTF-8 titles.
    ///
    /// Returns false if the update was ignored.
    pub fn update(&mut self, source: TitleSource, value: String) -> bool {
        if self.source == TitleSource::Utf8 && source == TitleSource::Legacy {
            return false;
        }

        self.ucs2 = value.chars().map(|c| c as u32 as u16).collect();
        self.source = source;
        self.value = value;

        true
    }
}

/// Size related WM_NORMAL_HINTS of a client, normalised at property read time.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeHints {
    /// Minimum client width in pixels
    pub min_width: u32,
    /// Minimum client height in pixels
    pub min_height: u32,
    /// Base width subtracted before applying resize increments
    pub base_width: u32,
    /// Base height subtracted before applying resize increments
    pub base_height: u32,
    /// Horizontal resize increment
    pub width_increment: u32,
    /// Vertical resize increment
    pub height_increment: u32,
}

/// One managed external window: the client's own window plus the frame we
/// reparented it into.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// The client's own (child) window
    pub window: Xid,
    /// The frame created by the manager around `window`
    pub frame: Xid,
    /// Index of the workspace holding this client
    pub workspace: usize,
    /// `(col, row)` of the owning container when tiled, None when floating
    /// or docked
    pub cell: Option<(usize, usize)>,
    /// The outer frame rect
    pub rect: Rect,
    /// The client area within the frame
    pub child_rect: Rect,
    /// Remembered frame rect from the last time this client floated.
    /// None means it never floated.
    pub floating_rect: Option<Rect>,
    /// The client title (WM_NAME / _NET_WM_NAME)
    pub title: Title,
    /// First element of WM_CLASS
    pub class_instance: String,
    /// Second element of WM_CLASS
    pub class_class: String,
    /// Floating layer membership
    pub floating: FloatingState,
    /// Whether this client currently fills its workspace / all outputs
    pub fullscreen: bool,
    /// Set for screen-edge dock clients (_NET_WM_WINDOW_TYPE_DOCK)
    pub dock: bool,
    /// Dock clients only: reserve the bottom edge instead of the top
    pub dock_bottom: bool,
    /// Draw no border at all
    pub borderless: bool,
    /// Titlebar placement for the frame
    pub titlebar: TitlebarPosition,
    /// Aspect ratio numerator from WM_NORMAL_HINTS, 0 when unset
    pub proportional_width: u32,
    /// Aspect ratio denominator from WM_NORMAL_HINTS, 0 when unset
    pub proportional_height: u32,
    /// Remaining WM_NORMAL_HINTS fields
    pub size_hints: SizeHints,
    /// The X border width of the child window
    pub border_width: u32,
    /// Screen edge reservation for dock clients
    pub desired_height: u32,
    /// The WM_HINTS urgency bit
    pub urgent: bool,
    /// WM_CLIENT_LEADER window, 0 if none
    pub leader: Xid,
    /// User assigned mark, unique across all workspaces
    pub mark: Option<String>,
    /// Set when the manager itself unmapped the child (reparenting) so the
    /// resulting UnmapNotify must be absorbed instead of treated as a
    /// withdraw
    pub awaiting_useless_unmap: bool,
    /// Set when the owning output changed geometry and the next render must
    /// reconfigure even if the rect is unchanged
    pub force_reconfigure: bool,
    /// Whether the frame is currently mapped
    pub mapped: bool,
}

impl Client {
    /// Create a client in its initial (tiled, undecorated-state-pending) form.
    pub fn new(window: Xid, frame: Xid, workspace: usize) -> Self {
        Self {
            window,
            frame,
            workspace,
            border_width: 0,
            ..Default::default()
        }
    }

    /// Whether this client is currently in the floating layer
    pub fn is_floating(&self) -> bool {
        self.floating >= FloatingState::AutoOn
    }

    /// Toggle between the floating / tiled user states
    pub fn toggle_floating(&mut self) {
        self.floating = if self.is_floating() {
            FloatingState::UserOff
        } else {
            FloatingState::UserOn
        };
    }
}
