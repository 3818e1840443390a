//! Data types for working with X events
use crate::{
    core::bindings::KeyCode,
    pure::geometry::{Point, Rect},
    Xid,
};

/// Wrapper around the low level X event types that correspond to request /
/// response data when communicating with the X server itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XEvent {
    /// A message has been sent to a particular client
    ClientMessage(ClientMessage),
    /// Client config has changed in some way
    ConfigureNotify(ConfigureEvent),
    /// A client is requesting to be repositioned
    ConfigureRequest(ConfigureRequest),
    /// A client window has been closed
    Destroy(Xid),
    /// The mouse pointer has entered a new client window
    Enter(PointerChange),
    /// A part or all of a client has become visible
    Expose(Xid),
    /// A grabbed key combination has been entered by the user
    KeyPress(KeyCode),
    /// A mouse button has been pressed
    ButtonPress(ButtonEvent),
    /// A mouse button has been released
    ButtonRelease(ButtonEvent),
    /// The pointer has moved while a button grab is active
    Motion(Point),
    /// Keyboard or modifier mappings have changed
    MappingNotify,
    /// A client window is requesting to be positioned and rendered on the
    /// screen
    MapRequest(Xid),
    /// A client property has changed in some way
    PropertyNotify(PropertyEvent),
    /// A randr action has occured (new outputs, resolution change etc)
    RandrNotify,
    /// A client is being unmapped
    UnmapNotify(Xid),
}

impl std::fmt::Display for XEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use XEvent::*;

        match self {
            ClientMessage(_) => write!(f, "ClientMessage"),
            ConfigureNotify(_) => write!(f, "ConfigureNotify"),
            ConfigureRequest(_) => write!(f, "ConfigureRequest"),
            Destroy(_) => write!(f, "Destroy"),
            Enter(_) => write!(f, "Enter"),
            Expose(_) => write!(f, "Expose"),
            KeyPress(_) => write!(f, "KeyPress"),
            ButtonPress(_) => write!(f, "ButtonPress"),
            ButtonRelease(_) => write!(f, "ButtonRelease"),
            Motion(_) => write!(f, "Motion"),
            MappingNotify => write!(f, "MappingNotify"),
            MapRequest(_) => write!(f, "MapRequest"),
            PropertyNotify(_) => write!(f, "PropertyNotify"),
            RandrNotify => write!(f, "RandrNotify"),
            UnmapNotify(_) => write!(f, "UnmapNotify"),
        }
    }
}

/// A client message that needs to be parsed and handled based on its type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessage {
    /// The ID of the window the message is about
    pub id: Xid,
    /// The name of the message type atom
    pub dtype: String,
    /// The raw message data (format 32)
    pub data: [u32; 5],
}

/// A configure notification for a client or the root window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureEvent {
    /// The ID of the window that changed
    pub id: Xid,
    /// The new window size
    pub r: Rect,
    /// Is this window the root window?
    pub is_root: bool,
}

/// A client request to be repositioned. Only the fields named in the request
/// mask are carried.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureRequest {
    /// The window making the request
    pub id: Xid,
    /// Requested x coordinate
    pub x: Option<i32>,
    /// Requested y coordinate
    pub y: Option<i32>,
    /// Requested width
    pub w: Option<u32>,
    /// Requested height
    pub h: Option<u32>,
    /// Requested border width
    pub border_width: Option<u32>,
}

impl ConfigureRequest {
    /// Merge the requested fields over a current rect.
    pub fn applied_to(&self, r: Rect) -> Rect {
        Rect {
            x: self.x.unwrap_or(r.x),
            y: self.y.unwrap_or(r.y),
            w: self.w.unwrap_or(r.w),
            h: self.h.unwrap_or(r.h),
        }
    }
}

/// A notification that the mouse pointer has entered a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerChange {
    /// The ID of the window that was entered
    pub id: Xid,
    /// Absolute coordinate of the event
    pub abs: Point,
}

/// A mouse button press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// The window the press happened in
    pub id: Xid,
    /// The button (1 = left, 2 = middle, 3 = right)
    pub button: u8,
    /// Held modifier mask
    pub state: u16,
    /// Absolute coordinate of the event
    pub abs: Point,
    /// Coordinate relative to the top left of the event window
    pub relative: Point,
}

/// A property change on a known client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEvent {
    /// The ID of the window that had a property changed
    pub id: Xid,
    /// The property that changed
    pub atom: String,
    /// Is this window the root window?
    pub is_root: bool,
}
