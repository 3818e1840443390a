//! Logic for interacting with the X server
use crate::{
    core::bindings::KeyCode,
    pure::{
        geometry::{Point, Rect},
        Output,
    },
    Result, Xid,
};
use std::os::unix::io::RawFd;

pub mod atom;
pub mod event;
pub mod property;

#[cfg(test)]
pub mod mock;

#[cfg(test)]
pub use mock::StubXConn;

pub use atom::{Atom, AUTO_FLOAT_WINDOW_TYPES, EWMH_SUPPORTED_ATOMS};
pub use event::XEvent;
pub use property::{Prop, WindowAttributes, WmState};

/// A window type to be specified when creating a new window in the X server.
///
/// All windows the manager creates for itself are override-redirect
/// InputOutput windows; the variants select the event mask and background.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WinType {
    /// A frame wrapping a managed client
    Frame,
    /// A stack / tab decoration strip or the internal bar
    Decoration,
    /// The crash handler popup
    Popup,
}

/// On screen configuration options for X windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientConfig {
    /// The border width in pixels
    BorderPx(u32),
    /// Absolute size and position on the screen as a [Rect]
    Position(Rect),
    /// Mark this window as stacking directly above the given Xid
    StackAbove(Xid),
    /// Mark this window as stacking directly below the given Xid
    StackBelow(Xid),
    /// Mark this window as stacking above all other windows
    StackTop,
    /// Mark this window as stacking below all other windows
    StackBottom,
}

/// Attributes for an X11 client window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientAttr {
    /// Border color as an rgb hex value
    BorderColor(u32),
    /// Set the event mask used for managed child windows
    ClientEventMask,
    /// Set an empty event mask so a self-inflicted unmap is not reported
    NoEventMask,
    /// Set the event mask used for the root window
    RootEventMask,
}

/// The keysym table of the keyboard as reported by the server.
#[derive(Debug, Clone, Default)]
pub struct KeyboardMapping {
    /// The lowest keycode of the table
    pub min_keycode: u8,
    /// Number of keysym columns per keycode
    pub keysyms_per_keycode: usize,
    /// `keysyms_per_keycode` entries per keycode, starting at `min_keycode`
    pub keysyms: Vec<u32>,
}

impl KeyboardMapping {
    /// All keycodes that produce the given keysym in any column.
    pub fn keycodes_for(&self, keysym: u32) -> Vec<u8> {
        if self.keysyms_per_keycode == 0 {
            return Vec::new();
        }

        self.keysyms
            .chunks(self.keysyms_per_keycode)
            .enumerate()
            .filter(|(_, syms)| syms.contains(&keysym))
            .map(|(i, _)| self.min_keycode + i as u8)
            .collect()
    }
}

/// The modifier table of the keyboard: which keycodes are attached to which
/// of the eight modifier bits.
#[derive(Debug, Clone, Default)]
pub struct ModifierMapping {
    /// Number of keycodes per modifier row
    pub keycodes_per_modifier: usize,
    /// 8 rows of `keycodes_per_modifier` keycodes (0 = unused slot)
    pub keycodes: Vec<u8>,
}

impl ModifierMapping {
    /// The modifier bit mask (if any) that the given keycode is attached to.
    pub fn mask_for_keycode(&self, keycode: u8) -> Option<u16> {
        if self.keycodes_per_modifier == 0 || keycode == 0 {
            return None;
        }

        self.keycodes
            .chunks(self.keycodes_per_modifier)
            .position(|row| row.contains(&keycode))
            .map(|mod_index| 1 << mod_index)
    }
}

/// A handle on a running X11 connection that we can use for issuing X
/// requests.
///
/// XConn is an abstraction layer over the actual communication with the
/// X server: the real implementation lives in [crate::x11rb], while tests
/// drive the core against a stub.
pub trait XConn {
    /// The ID of the window manager root window.
    fn root(&self) -> Xid;

    /// Flush any pending requests to the X server.
    fn flush(&self);

    /// Block and wait for the next event from the X server.
    fn next_event(&self) -> Result<XEvent>;

    /// Return the next event if one is already queued.
    fn poll_event(&self) -> Result<Option<XEvent>>;

    /// The file descriptor of the server connection for event loop
    /// multiplexing, if this connection has one.
    fn connection_fd(&self) -> Option<RawFd> {
        None
    }

    /// Create a new override-redirect window for the manager's own use.
    fn create_window(&self, ty: WinType, r: Rect) -> Result<Xid>;

    /// Destroy a window created via [XConn::create_window].
    fn destroy_window(&self, id: Xid) -> Result<()>;

    /// Reparent `child` into `parent` at the given offset.
    fn reparent(&self, child: Xid, parent: Xid, p: Point) -> Result<()>;

    /// Add a client window to the save set so it survives a manager crash.
    fn add_to_save_set(&self, id: Xid) -> Result<()>;

    /// Map the given window, making it visible.
    fn map(&self, id: Xid) -> Result<()>;

    /// Unmap the given window, hiding it.
    fn unmap(&self, id: Xid) -> Result<()>;

    /// Set one or more [ClientConfig] values for a window.
    fn set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()>;

    /// Set one or more [ClientAttr] values for a window.
    fn set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()>;

    /// Send a synthetic ConfigureNotify carrying the given rect to a client.
    fn send_configure_notify(&self, id: Xid, r: Rect, border: u32) -> Result<()>;

    /// Apply an unmanaged client's configure request literally.
    fn configure_unmanaged(&self, ev: &event::ConfigureRequest) -> Result<()>;

    /// Set X input focus to be held by the given window.
    fn set_input_focus(&self, id: Xid) -> Result<()>;

    /// Reposition the mouse cursor within the given window.
    fn warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()>;

    /// Current (x, y) position of the mouse cursor on the root window.
    fn cursor_position(&self) -> Result<Point>;

    /// Forcibly sever the connection of the client owning `id`.
    fn kill_client(&self, id: Xid) -> Result<()>;

    /// Ask a client to close itself via the WM_DELETE_WINDOW protocol.
    fn send_delete(&self, id: Xid) -> Result<()>;

    /// Resolve a raw atom value to its name.
    fn atom_name(&self, atom: u32) -> Result<Option<String>>;

    /// Look up a specific property on a given client window.
    fn get_prop(&self, id: Xid, name: &str) -> Result<Option<Prop>>;

    /// Set a specific property on a given window.
    fn set_prop(&self, id: Xid, name: &str, val: Prop) -> Result<()>;

    /// Delete a property from a given window.
    fn delete_prop(&self, id: Xid, name: &str) -> Result<()>;

    /// Set the ICCCM WM_STATE of a client.
    fn set_wm_state(&self, id: Xid, state: WmState) -> Result<()>;

    /// Request the [WindowAttributes] for a given window.
    fn get_window_attributes(&self, id: Xid) -> Result<WindowAttributes>;

    /// Look up the current dimensions and position of a given window.
    fn client_geometry(&self, id: Xid) -> Result<Rect>;

    /// Ask the X server for the IDs of all current top level windows.
    fn existing_clients(&self) -> Result<Vec<Xid>>;

    /// Grab the specified key codes on the root window.
    fn grab_keys(&self, key_codes: &[KeyCode]) -> Result<()>;

    /// Release all key grabs on the root window.
    fn ungrab_keys(&self) -> Result<()>;

    /// Grab the pointer for a drag loop. Returns false if the grab was
    /// refused.
    fn grab_pointer(&self) -> Result<bool>;

    /// Release a pointer grab.
    fn ungrab_pointer(&self) -> Result<()>;

    /// Grab the whole keyboard. Returns false if the grab was refused.
    fn grab_keyboard(&self) -> Result<bool>;

    /// Release a keyboard grab.
    fn ungrab_keyboard(&self) -> Result<()>;

    /// The keysym table of the attached keyboard.
    fn keyboard_mapping(&self) -> Result<KeyboardMapping>;

    /// The modifier table of the attached keyboard.
    fn modifier_mapping(&self) -> Result<ModifierMapping>;

    /// Enumerate the current RandR outputs.
    fn query_outputs(&self) -> Result<Vec<Output>>;
}

/// Extended functionality for [XConn] impls, derived from the base methods.
pub trait XConnExt: XConn + Sized {
    /// Check to see if a given client window supports a particular protocol
    /// or not.
    fn client_supports_protocol(&self, id: Xid, proto: &str) -> Result<bool> {
        if let Some(Prop::Atom(protocols)) = self.get_prop(id, Atom::WmProtocols.as_ref())? {
            Ok(protocols.iter().any(|p| p == proto))
        } else {
            Ok(false)
        }
    }

    /// Close a client, preferring the WM_DELETE_WINDOW protocol over a
    /// forced kill.
    fn close_client(&self, id: Xid) -> Result<()> {
        if self.client_supports_protocol(id, Atom::WmDeleteWindow.as_ref())? {
            self.send_delete(id)
        } else {
            self.kill_client(id)
        }
    }

    /// Warp the mouse cursor to the center of the given rect.
    fn warp_pointer_to_rect(&self, r: Rect) -> Result<()> {
        let mid = r.midpoint();
        self.warp_pointer(self.root(), mid.x as i16, mid.y as i16)
    }

    /// Warp the mouse cursor to the center of the given window.
    fn warp_pointer_to_window(&self, id: Xid, r: Rect) -> Result<()> {
        self.warp_pointer(id, r.w as i16 / 2, r.h as i16 / 2)
    }
}

// Auto impl XConnExt for all XConn impls
impl<T> XConnExt for T where T: XConn {}
