//! Color primitives and the font / text drawing boundary.
//!
//! Text rendering itself (font loading, glyph metrics, pixel drawing) is not
//! part of the window manager core: the layout engine only talks to the
//! [Draw] trait defined here. The x11rb backed implementation using X core
//! fonts lives in [crate::x11rb::draw].
use crate::{pure::geometry::Rect, Error, Result, Xid};
use serde::{Deserialize, Serialize};

/// A simple RGBA based color
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    r: f64,
    g: f64,
    b: f64,
    a: f64,
}

// helper for methods in Color
macro_rules! _f2u { { $f:expr, $s:expr } => { (($f * 255.0) as u32) << $s } }

impl Color {
    /// Create a new Color from a hex encoded u32: 0xRRGGBB or 0xRRGGBBAA
    pub fn new_from_hex(hex: u32) -> Self {
        let floats: Vec<f64> = hex
            .to_be_bytes()
            .iter()
            .map(|n| *n as f64 / 255.0)
            .collect();

        let (r, g, b, a) = (floats[0], floats[1], floats[2], floats[3]);
        Self { r, g, b, a }
    }

    /// The RGB information of this color as 0.0-1.0 range floats representing
    /// proportions of 255 for each of R, G, B
    pub fn rgb(&self) -> (f64, f64, f64) {
        (self.r, self.g, self.b)
    }

    /// 0xRRGGBB representation of this Color (no alpha information).
    ///
    /// This is the server pixel value for a 24-bit TrueColor visual.
    pub fn rgb_u32(&self) -> u32 {
        _f2u!(self.r, 16) + _f2u!(self.g, 8) + _f2u!(self.b, 0)
    }

    /// 0xAARRGGBB representation of this Color
    pub fn argb_u32(&self) -> u32 {
        _f2u!(self.a, 24) + self.rgb_u32()
    }
}

impl From<u32> for Color {
    fn from(hex: u32) -> Self {
        Self::new_from_hex(hex)
    }
}

impl TryFrom<&str> for Color {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        let hex = u32::from_str_radix(s.strip_prefix('#').unwrap_or(s), 16).map_err(|_| {
            Error::InvalidHexColor { hex: s.into() }
        })?;

        if s.len() == 7 {
            Ok(Self::new_from_hex((hex << 8) + 0xFF))
        } else if s.len() == 9 {
            Ok(Self::new_from_hex(hex))
        } else {
            Err(Error::InvalidHexColor { hex: s.into() })
        }
    }
}

/// The border / background / text colors used to decorate a client frame in
/// one particular state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorTriple {
    /// Frame border color
    pub border: Color,
    /// Titlebar background
    pub background: Color,
    /// Titlebar text
    pub text: Color,
}

impl ColorTriple {
    /// Build a color triple from `#RRGGBB` hex strings.
    pub fn from_hex(border: &str, background: &str, text: &str) -> Result<Self> {
        Ok(Self {
            border: border.try_into()?,
            background: background.try_into()?,
            text: text.try_into()?,
        })
    }
}

/// A piece of text to be drawn on a decoration.
///
/// Legacy (COMPOUND_TEXT / latin-1) titles are passed through byte for byte
/// to the 8-bit text primitive; UTF-8 titles are drawn from their cached
/// UCS-2 form via the 16-bit primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRun<'a> {
    /// Raw bytes for the 8-bit text primitive
    Legacy(&'a [u8]),
    /// UCS-2 code units for the 16-bit text primitive
    Ucs2(&'a [u16]),
}

impl<'a> TextRun<'a> {
    /// Number of glyphs in this run
    pub fn len(&self) -> usize {
        match self {
            TextRun::Legacy(b) => b.len(),
            TextRun::Ucs2(u) => u.len(),
        }
    }

    /// Whether the run contains no glyphs
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The font and pixel drawing service used for decorations, the internal bar
/// and the crash popup.
pub trait Draw {
    /// Load (or re-use) the named font and make it current.
    fn load_font(&mut self, name: &str) -> Result<()>;

    /// Height of the current font in pixels (ascent + descent).
    fn font_height(&self) -> u32;

    /// Predict the pixel width `text` will take up when drawn.
    fn text_width(&self, text: TextRun<'_>) -> Result<u32>;

    /// Fill `r` on the drawable with a solid color.
    fn fill_rect(&self, drawable: Xid, r: Rect, color: Color) -> Result<()>;

    /// Draw a single line of text at the given baseline-less position
    /// (x, y is the top left of the glyph box).
    fn draw_text(
        &self,
        drawable: Xid,
        x: i32,
        y: i32,
        fg: Color,
        bg: Color,
        text: TextRun<'_>,
    ) -> Result<()>;
}
