//! The synchronous pointer drag loop and its move / resize callbacks.
use crate::{
    core::{handle, State},
    draw::Draw,
    layout::{self, render::configure_client, render_layout},
    pure::{geometry::Point, geometry::Rect, table::resize_tracks, Direction},
    x::{XConn, XEvent},
    Result, Xid,
};
use tracing::{debug, trace};

/// Why a drag loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// The button was released at this root position
    Released(Point),
    /// The dragged client disappeared mid drag
    Aborted,
}

/// Run a nested event loop with the pointer grabbed, delivering the most
/// recent motion position to `on_motion` until the button is released.
///
/// An UnmapNotify for the dragged client aborts the drag.
pub fn drag_pointer<X, F>(x: &X, dragged: Xid, mut on_motion: F) -> Result<DragOutcome>
where
    X: XConn,
    F: FnMut(Point) -> Result<()>,
{
    if !x.grab_pointer()? {
        debug!("pointer grab refused, not dragging");
        return Ok(DragOutcome::Aborted);
    }

    let outcome = loop {
        let mut event = x.next_event()?;

        // only the most recent motion between wake-ups is of interest
        if let XEvent::Motion(_) = event {
            while let Some(next) = x.poll_event()? {
                match next {
                    XEvent::Motion(_) => event = next,
                    XEvent::ButtonRelease(_) | XEvent::UnmapNotify(_) => {
                        event = next;
                        break;
                    }
                    _ => (),
                }
            }
        }

        match event {
            XEvent::Motion(p) => {
                trace!(?p, "drag motion");
                on_motion(p)?;
            }
            XEvent::ButtonRelease(e) => break DragOutcome::Released(e.abs),
            XEvent::UnmapNotify(id) if id == dragged => {
                debug!(%id, "dragged client unmapped, aborting drag");
                break DragOutcome::Aborted;
            }
            _ => (),
        }
    };

    x.ungrab_pointer()?;
    x.flush();

    Ok(outcome)
}

/// Compute the new position of a floating client for a pointer move,
/// keeping a margin of the client inside the workspace.
///
/// Returns None when the move would push the client (almost) entirely off
/// the workspace.
pub fn moved_floating_rect(old: Rect, press: Point, pointer: Point, ws: Rect) -> Option<Rect> {
    const MARGIN: i32 = 5;

    let new = Rect::new(
        old.x + (pointer.x - press.x),
        old.y + (pointer.y - press.y),
        old.w,
        old.h,
    );

    let inside_x =
        new.x + MARGIN <= ws.x + ws.w as i32 && new.x + new.w as i32 - MARGIN >= ws.x;
    let inside_y =
        new.y + MARGIN <= ws.y + ws.h as i32 && new.y + new.h as i32 - MARGIN >= ws.y;

    (inside_x && inside_y).then_some(new)
}

/// Compute the new rect of a floating client for a resize drag from the
/// corner nearest to `press`.
pub fn resized_floating_rect(
    old: Rect,
    press: Point,
    pointer: Point,
    min_w: u32,
    min_h: u32,
) -> Rect {
    let mid = old.midpoint();
    let (dx, dy) = (pointer.x - press.x, pointer.y - press.y);
    let mut r = old;

    if press.x >= mid.x {
        r.w = (old.w as i32 + dx).max(min_w as i32) as u32;
    } else {
        let w = (old.w as i32 - dx).max(min_w as i32) as u32;
        r.x = old.x + (old.w as i32 - w as i32);
        r.w = w;
    }

    if press.y >= mid.y {
        r.h = (old.h as i32 + dy).max(min_h as i32) as u32;
    } else {
        let h = (old.h as i32 - dy).max(min_h as i32) as u32;
        r.y = old.y + (old.h as i32 - h as i32);
        r.h = h;
    }

    r
}

/// Drag-move a floating client.
pub fn move_floating<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    id: Xid,
    press: Point,
) -> Result<()> {
    let old = state.model.clients[&id].rect;
    let ws = state.model.clients[&id].workspace;
    let ws_rect = state.model.workspaces[ws].rect;
    let font_h = d.font_height();

    let model = &mut state.model;
    drag_pointer(x, id, |p| {
        if let Some(r) = moved_floating_rect(old, press, p, ws_rect) {
            model.clients.get_mut(&id).unwrap().floating_rect = Some(r);
            configure_client(x, model, id, r, true, font_h)?;
            x.flush();
        }
        Ok(())
    })?;

    Ok(())
}

/// Drag-resize a floating client from its nearest corner.
pub fn resize_floating<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    id: Xid,
    press: Point,
) -> Result<()> {
    let old = state.model.clients[&id].rect;
    let hints = state.model.clients[&id].size_hints;
    let min_w = hints.min_width.max(30);
    let min_h = hints.min_height.max(30);
    let font_h = d.font_height();

    let model = &mut state.model;
    drag_pointer(x, id, |p| {
        let r = resized_floating_rect(old, press, p, min_w, min_h);
        model.clients.get_mut(&id).unwrap().floating_rect = Some(r);
        configure_client(x, model, id, r, true, font_h)?;
        x.flush();
        Ok(())
    })?;

    Ok(())
}

/// Drag a border of a tiled client: on release, hand the pixel delta to the
/// table engine for the two adjacent tracks.
pub fn resize_tiled<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    id: Xid,
    border: Direction,
    press: Point,
) -> Result<()> {
    let Some((ws, col, row)) = handle::container_of(state, id) else {
        return Ok(());
    };

    let (first, second, vertical) = match border {
        Direction::Left if col > 0 => (col - 1, col, true),
        Direction::Right if col + 1 < state.model.workspaces[ws].cols() => (col, col + 1, true),
        Direction::Down if row + 1 < state.model.workspaces[ws].rows() => (row, row + 1, false),
        _ => return Ok(()),
    };

    let outcome = drag_pointer(x, id, |_| Ok(()))?;
    let DragOutcome::Released(at) = outcome else {
        return Ok(());
    };

    let delta = if vertical {
        at.x - press.x
    } else {
        at.y - press.y
    };
    if delta == 0 {
        return Ok(());
    }

    debug!(ws = ws + 1, first, second, delta, "resizing tracks from drag");
    let min_px = state.config.min_track_px;
    if vertical {
        let total = state.model.workspaces[ws].rect.w;
        let workspace = &mut state.model.workspaces[ws];
        resize_tracks(&mut workspace.width_factor, total, first, second, delta, min_px);
    } else {
        let total = usable_height(state, ws, d.font_height());
        let workspace = &mut state.model.workspaces[ws];
        resize_tracks(&mut workspace.height_factor, total, first, second, delta, min_px);
    }

    render_layout(x, d, &mut state.model, &state.config)
}

/// The height the table of a workspace actually has: the output height minus
/// dock reservations and the internal bar.
pub fn usable_height(state: &State, ws: usize, font_h: u32) -> u32 {
    let rect = state.model.workspaces[ws].rect;
    let docks: u32 = state.model.workspaces[ws]
        .output
        .map(|o| {
            state.model.outputs[o]
                .dock_clients
                .iter()
                .map(|id| state.model.clients[id].desired_height)
                .sum()
        })
        .unwrap_or(0);

    rect.h
        .saturating_sub(docks + layout::bar_height(font_h))
}
