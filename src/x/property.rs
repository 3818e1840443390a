//! Data types for working with X window properties
use crate::{pure::geometry::Rect, Xid};
use serde::{Deserialize, Serialize};

/// Known property types that should be returnable by XConn impls when they
/// check window properties.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Prop {
    /// One or more X Atoms
    Atom(Vec<String>),
    /// Raw bytes for when the prop type is non-standard
    Bytes(Vec<u32>),
    /// A cardinal number
    Cardinal(Vec<u32>),
    /// UTF-8 encoded string data
    UTF8String(Vec<String>),
    /// Legacy latin-1 / COMPOUND_TEXT string data, bytes preserved
    Latin1Bytes(Vec<u8>),
    /// One or more X window IDs
    Window(Vec<Xid>),
    /// The WM_HINTS properties for this window
    WmHints(WmHints),
    /// The WM_NORMAL_HINTS properties for this window
    WmNormalHints(WmNormalHints),
}

bitflags! {
    /// Possible flags that can be set in a WM_HINTS client property
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WmHintsFlags: u32 {
        /// Input hint is set
        const INPUT_HINT         = 0b0000000001;
        /// State hint is set
        const STATE_HINT         = 0b0000000010;
        /// Window group hint is set
        const WINDOW_GROUP_HINT  = 0b0001000000;
        /// Urgency hint is set
        const URGENCY_HINT       = 0b0100000000;
    }
}

bitflags! {
    /// Possible flags that can be set in a WM_NORMAL_HINTS client property
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WmNormalHintsFlags: u32 {
        /// User-specified x, y
        const U_POSITION    = 0b0000000001;
        /// User-specified width, height
        const U_SIZE        = 0b0000000010;
        /// Program-specified position
        const P_POSITION    = 0b0000000100;
        /// Program-specified size
        const P_SIZE        = 0b0000001000;
        /// Program-specified minimum size
        const P_MIN_SIZE    = 0b0000010000;
        /// Program-specified maximum size
        const P_MAX_SIZE    = 0b0000100000;
        /// Program-specified resize increments
        const P_RESIZE_INC  = 0b0001000000;
        /// Program-specified min and max aspect ratios
        const P_ASPECT      = 0b0010000000;
        /// Program-specified base size
        const P_BASE_SIZE   = 0b0100000000;
        /// Program-specified window gravity
        const P_WIN_GRAVITY = 0b1000000000;
    }
}

/// Client requested hints about information other than window geometry.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy)]
pub struct WmHints {
    /// Flags marking which hint fields carry values
    pub flags: WmHintsFlags,
    /// The window group this client belongs to
    pub window_group: u32,
}

impl WmHints {
    /// Whether the urgency bit is set
    pub fn urgent(&self) -> bool {
        self.flags.contains(WmHintsFlags::URGENCY_HINT)
    }

    /// Create a new instance from raw 32bit values as they are stored in the
    /// property.
    pub fn from_bytes(raw: &[u32]) -> Option<Self> {
        if raw.len() < 9 {
            return None;
        }

        Some(Self {
            flags: WmHintsFlags::from_bits_truncate(raw[0]),
            window_group: raw[8],
        })
    }
}

/// An aspect ratio as numerator / denominator
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy)]
pub struct AspectRatio {
    /// Ratio numerator
    pub numerator: i32,
    /// Ratio denominator
    pub denominator: i32,
}

impl AspectRatio {
    fn as_f64(&self) -> Option<f64> {
        if self.numerator > 0 && self.denominator > 0 {
            Some(self.numerator as f64 / self.denominator as f64)
        } else {
            None
        }
    }
}

/// Client requested size hints (WM_NORMAL_HINTS).
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy)]
pub struct WmNormalHints {
    /// Flags marking which hint fields carry values
    pub flags: WmNormalHintsFlags,
    /// Minimum acceptable size
    pub min_size: (u32, u32),
    /// Base size subtracted before applying resize increments
    pub base_size: (u32, u32),
    /// Resize increments
    pub resize_inc: (u32, u32),
    /// Minimum acceptable aspect ratio
    pub min_aspect: AspectRatio,
    /// Maximum acceptable aspect ratio
    pub max_aspect: AspectRatio,
}

impl WmNormalHints {
    /// Create a new instance from raw 32bit values as they are stored in the
    /// property.
    pub fn from_bytes(raw: &[u32]) -> Option<Self> {
        if raw.len() < 18 {
            return None;
        }

        Some(Self {
            flags: WmNormalHintsFlags::from_bits_truncate(raw[0]),
            min_size: (raw[5], raw[6]),
            resize_inc: (raw[9], raw[10]),
            min_aspect: AspectRatio {
                numerator: raw[11] as i32,
                denominator: raw[12] as i32,
            },
            max_aspect: AspectRatio {
                numerator: raw[13] as i32,
                denominator: raw[14] as i32,
            },
            base_size: (raw[15], raw[16]),
        })
    }

    /// Resolve the aspect hints against the current child size.
    ///
    /// Returns the `(numerator, denominator)` ratio the client area should be
    /// held to, or None when the hints are absent, malformed (non-positive
    /// values) or already satisfied by `w x h`.
    pub fn proportional_hint(&self, w: u32, h: u32) -> Option<(u32, u32)> {
        if !self.flags.contains(WmNormalHintsFlags::P_ASPECT) || h == 0 {
            return None;
        }

        let min = self.min_aspect.as_f64()?;
        let max = self.max_aspect.as_f64()?;
        let current = w as f64 / h as f64;

        if current < min {
            Some((
                self.min_aspect.numerator as u32,
                self.min_aspect.denominator as u32,
            ))
        } else if current > max {
            Some((
                self.max_aspect.numerator as u32,
                self.max_aspect.denominator as u32,
            ))
        } else {
            None
        }
    }
}

/// A _NET_WM_STRUT_PARTIAL reservation, reduced to the parts the manager
/// honours: top and bottom screen edge reservations for dock clients.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy)]
pub struct StrutPartial {
    /// Pixels reserved at the top edge
    pub top: u32,
    /// Pixels reserved at the bottom edge
    pub bottom: u32,
}

impl StrutPartial {
    /// Create a new instance from raw 32bit values as they are stored in the
    /// property.
    pub fn from_bytes(raw: &[u32]) -> Option<Self> {
        if raw.len() < 4 {
            return None;
        }

        Some(Self {
            top: raw[2],
            bottom: raw[3],
        })
    }
}

/// Possible valid values for setting the `WM_STATE` property on a client.
///
/// See the [ICCCM docs][1] for more information.
///
/// [1]: https://tronche.com/gui/x/icccm/sec-4.html#s-4.1.3.1
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum WmState {
    /// Window is not visible
    Withdrawn,
    /// Window is visible
    Normal,
    /// Window is iconified
    Iconic,
}

/// The mapping states a window can be in
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum MapState {
    /// The window is unmapped
    Unmapped,
    /// The window is never viewable
    UnViewable,
    /// The window is currently viewable
    Viewable,
}

/// Attributes of a window relevant to the decision of whether to manage it.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct WindowAttributes {
    /// The window asked not to be managed
    pub override_redirect: bool,
    /// Whether the window is currently shown
    pub map_state: MapState,
}
