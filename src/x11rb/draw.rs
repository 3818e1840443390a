//! X core font text rendering for decorations, the internal bar and the
//! crash popup.
//!
//! Runs on its own dedicated connection so that drawing never interleaves
//! with the event handling requests of the main connection.
use crate::{
    draw::{Color, Draw, TextRun},
    pure::geometry::Rect,
    Result, Xid,
};
use tracing::{debug, warn};
use x11rb::{
    connection::Connection,
    protocol::xproto::{Char2b, ChangeGCAux, ConnectionExt as _, CreateGCAux, Rectangle},
    rust_connection::RustConnection,
};

const FALLBACK_FONT: &str = "fixed";

// image_text requests carry the string length in a single byte
const MAX_TEXT_LEN: usize = 255;

struct LoadedFont {
    fid: u32,
    ascent: i16,
    height: u32,
}

/// A [Draw] implementation backed by X core fonts.
pub struct CoreFontDraw {
    conn: RustConnection,
    gc: u32,
    font: Option<LoadedFont>,
}

impl std::fmt::Debug for CoreFontDraw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreFontDraw")
            .field("font_loaded", &self.font.is_some())
            .finish()
    }
}

impl CoreFontDraw {
    /// Open a dedicated connection for drawing.
    pub fn new() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        let gc = conn.generate_id()?;
        conn.create_gc(gc, root, &CreateGCAux::new().graphics_exposures(0))?;

        Ok(Self {
            conn,
            gc,
            font: None,
        })
    }

    fn open_font(&self, name: &str) -> Result<u32> {
        let fid = self.conn.generate_id()?;
        self.conn.open_font(fid, name.as_bytes())?.check()?;

        Ok(fid)
    }

    fn to_char2b(text: TextRun<'_>) -> Vec<Char2b> {
        match text {
            TextRun::Legacy(bytes) => bytes
                .iter()
                .take(MAX_TEXT_LEN)
                .map(|&b| Char2b { byte1: 0, byte2: b })
                .collect(),
            TextRun::Ucs2(units) => units
                .iter()
                .take(MAX_TEXT_LEN)
                .map(|&u| Char2b {
                    byte1: (u >> 8) as u8,
                    byte2: (u & 0xff) as u8,
                })
                .collect(),
        }
    }
}

impl Draw for CoreFontDraw {
    fn load_font(&mut self, name: &str) -> Result<()> {
        let fid = match self.open_font(name) {
            Ok(fid) => fid,
            Err(e) => {
                warn!(%name, %e, "unable to open font, falling back");
                self.open_font(FALLBACK_FONT)?
            }
        };

        let info = self.conn.query_font(fid)?.reply()?;
        let height = (info.font_ascent + info.font_descent).max(1) as u32;
        debug!(%name, height, "loaded font");

        self.conn
            .change_gc(self.gc, &ChangeGCAux::new().font(fid))?;
        if let Some(old) = self.font.take() {
            let _ = self.conn.close_font(old.fid);
        }
        self.font = Some(LoadedFont {
            fid,
            ascent: info.font_ascent,
            height,
        });

        Ok(())
    }

    fn font_height(&self) -> u32 {
        self.font.as_ref().map(|f| f.height).unwrap_or(13)
    }

    fn text_width(&self, text: TextRun<'_>) -> Result<u32> {
        let Some(font) = &self.font else {
            return Ok(0);
        };

        let chars = Self::to_char2b(text);
        let reply = self.conn.query_text_extents(font.fid, &chars)?.reply()?;

        Ok(reply.overall_width.max(0) as u32)
    }

    fn fill_rect(&self, drawable: Xid, r: Rect, color: Color) -> Result<()> {
        self.conn
            .change_gc(self.gc, &ChangeGCAux::new().foreground(color.rgb_u32()))?;
        self.conn.poly_fill_rectangle(
            *drawable,
            self.gc,
            &[Rectangle {
                x: r.x as i16,
                y: r.y as i16,
                width: r.w as u16,
                height: r.h as u16,
            }],
        )?;

        Ok(())
    }

    fn draw_text(
        &self,
        drawable: Xid,
        x: i32,
        y: i32,
        fg: Color,
        bg: Color,
        text: TextRun<'_>,
    ) -> Result<()> {
        let Some(font) = &self.font else {
            return Ok(());
        };
        if text.is_empty() {
            return Ok(());
        }

        self.conn.change_gc(
            self.gc,
            &ChangeGCAux::new()
                .foreground(fg.rgb_u32())
                .background(bg.rgb_u32()),
        )?;

        let baseline = (y + font.ascent as i32) as i16;

        // legacy titles go through the 8-bit primitive byte for byte; UTF-8
        // titles use their UCS-2 form and the 16-bit primitive
        match text {
            TextRun::Legacy(bytes) => {
                let bytes = &bytes[..bytes.len().min(MAX_TEXT_LEN)];
                self.conn
                    .image_text8(*drawable, self.gc, x as i16, baseline, bytes)?;
            }
            TextRun::Ucs2(_) => {
                let chars = Self::to_char2b(text);
                self.conn
                    .image_text16(*drawable, self.gc, x as i16, baseline, &chars)?;
            }
        }
        self.conn.flush()?;

        Ok(())
    }
}
