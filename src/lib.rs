//! lattice: a table based dynamic tiling window manager for X11.
//!
//! Clients are arranged on a per-workspace two dimensional grid (the
//! "table"). Each cell of the table is a container rendering its clients in
//! one of three modes (tiled, stacked, tabbed), with an additional floating
//! layer above the table. Multiple physical outputs are handled via RandR,
//! and a UNIX socket IPC interface allows external programs to inspect and
//! drive the manager.
//!
//! The crate is split into a pure data model ([pure]) that can be exercised
//! without an X server, the layout maths ([layout]), an X server abstraction
//! ([x]) with an x11rb backed implementation ([x11rb]), and the window
//! manager core itself ([core]).
#![warn(missing_debug_implementations, rust_2018_idioms)]

#[macro_use]
extern crate bitflags;

use std::ops::Deref;

pub mod core;
pub mod draw;
pub mod ipc;
pub mod layout;
mod macros;
pub mod pure;
pub mod x;
pub mod x11rb;

pub use crate::core::WindowManager;
pub use draw::Color;
pub use pure::geometry::{Point, Rect};

/// An X11 ID for a given resource
#[derive(Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Xid(pub(crate) u32);

impl std::fmt::Display for Xid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for Xid {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u32> for Xid {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<Xid> for u32 {
    fn from(id: Xid) -> Self {
        id.0
    }
}

/// Error variants from the core window manager logic and its backends.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Unable to establish a connection to the X server
    #[error(transparent)]
    Connect(#[from] ::x11rb::errors::ConnectError),

    /// The X11 connection broke
    #[error(transparent)]
    Connection(#[from] ::x11rb::errors::ConnectionError),

    /// Could not get an X11 request reply
    #[error(transparent)]
    Reply(#[from] ::x11rb::errors::ReplyError),

    /// Could not get an X11 request reply or generate a new resource id
    #[error(transparent)]
    ReplyOrId(#[from] ::x11rb::errors::ReplyOrIdError),

    /// An IO operation on the IPC socket failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A string hex code was invalid as a color
    #[error("invalid hex color code: '{hex}'")]
    InvalidHexColor {
        /// The string that was used
        hex: String,
    },

    /// A keybinding spec named an unknown key symbol
    #[error("'{0}' is not a known key name")]
    UnknownKeyName(String),

    /// A command string could not be parsed
    #[error("invalid command: '{0}'")]
    InvalidCommand(String),

    /// A client lookup failed
    #[error("client {0} is not in the window manager state")]
    UnknownClient(Xid),

    /// A requested client property was not set
    #[error("'{prop}' is not set for client {id}")]
    MissingProp {
        /// Property name that was requested
        prop: String,
        /// The client being queried
        id: Xid,
    },

    /// The X server does not support the RandR extension
    #[error("the X server does not support the RandR extension")]
    MissingRandRSupport,

    /// No active outputs could be found
    #[error("no active outputs")]
    NoOutputs,

    /// An IPC peer violated the wire protocol
    #[error("ipc protocol violation: {0}")]
    IpcProtocol(String),

    /// A stub method was called that has no implementation in a test mock
    #[error("mock method not implemented")]
    UnimplementedMock,
}

/// A Result where the error type is a lattice [Error]
pub type Result<T> = std::result::Result<T, Error>;
