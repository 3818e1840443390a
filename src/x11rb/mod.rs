//! Helpers and utilities for using x11rb as a back end for lattice
//!
//! [xconn::Conn] implements the [crate::x::XConn] abstraction over a
//! `RustConnection`; [draw::CoreFontDraw] implements the
//! [crate::draw::Draw] text boundary using X core fonts on a second,
//! dedicated connection.

pub mod draw;
pub mod xconn;

pub use draw::CoreFontDraw;
pub use xconn::Conn;
