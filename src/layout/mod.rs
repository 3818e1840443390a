//! The layout engine: pure geometry for frames, decorations and the table
//! grid, plus the rendering pass that applies it to the X server.
//!
//! Everything in this file is side effect free and unit tested against the
//! numbers frozen in the behavioural contract; [render] drives the actual X
//! requests.
use crate::{
    pure::{
        client::{Client, TitlebarPosition},
        container::{Mode, StackLimit},
        geometry::Rect,
        workspace::Workspace,
    },
    Xid,
};

pub mod render;

pub use render::render_layout;

/// Decoration line height for a given font height.
pub fn title_height(font_height: u32) -> u32 {
    font_height + 2 + 2
}

/// Height of the internal workspace bar for a given font height.
pub fn bar_height(font_height: u32) -> u32 {
    font_height + 6
}

/// Split `total` into `n` integer parts by rounding the running edges, so
/// the parts sum to exactly `total` (remainders spread over the middle).
fn even_split(total: u32, n: usize) -> Vec<u32> {
    if n == 0 {
        return Vec::new();
    }

    let share = total as f64 / n as f64;
    let mut parts = Vec::with_capacity(n);
    let mut prev = 0i64;
    for i in 1..=n {
        let edge = (share * i as f64).round() as i64;
        parts.push((edge - prev) as u32);
        prev = edge;
    }

    parts
}

/// The client area within a frame of the given size, before size hint
/// adjustments. Matches the decoration regime: stack/tab children leave room
/// for the 2px frame border only, tiled children additionally leave room for
/// the titlebar unless it is disabled.
pub fn child_rect(
    mode: Mode,
    borderless: bool,
    titlebar: TitlebarPosition,
    frame_w: u32,
    frame_h: u32,
    font_height: u32,
) -> Rect {
    if matches!(mode, Mode::Stack | Mode::Tabbed) {
        return Rect::new(2, 0, frame_w.saturating_sub(4), frame_h.saturating_sub(2));
    }

    match (borderless, titlebar) {
        (true, TitlebarPosition::Off) => Rect::new(0, 0, frame_w, frame_h),
        (false, TitlebarPosition::Off) => Rect::new(
            1,
            1,
            frame_w.saturating_sub(2),
            frame_h.saturating_sub(2),
        ),
        (_, TitlebarPosition::Top) => {
            let deco = title_height(font_height);
            Rect::new(
                2,
                deco as i32,
                frame_w.saturating_sub(4),
                frame_h.saturating_sub(deco + 2),
            )
        }
    }
}

/// Apply the client's size related hints to a child rect: the X border, the
/// aspect ratio and the resize increments. The rect is shrunk only, and
/// re-centered horizontally in the frame when the aspect ratio applies.
pub fn apply_size_hints(mut child: Rect, client: &Client) -> Rect {
    let (mut w, mut h) = (child.w, child.h);

    // the child's own X border takes space inside the frame
    w = w.saturating_sub(2 * client.border_width);
    h = h.saturating_sub(2 * client.border_width);

    let (pw, ph) = (client.proportional_width, client.proportional_height);
    if pw > 0 && ph > 0 && w > 0 && h > 0 {
        let ratio = pw as f64 / ph as f64;
        if (w as f64 / h as f64) > ratio {
            w = (h as f64 * ratio) as u32;
        } else {
            h = (w as f64 / ratio) as u32;
        }
        // keep the reduced rect centered in the space it was given
        child.x += ((child.w - w) / 2) as i32;
        child.y += ((child.h - h) / 2) as i32;
    }

    let hints = &client.size_hints;
    if hints.width_increment > 1 && w > hints.base_width {
        w -= (w - hints.base_width) % hints.width_increment;
    }
    if hints.height_increment > 1 && h > hints.base_height {
        h -= (h - hints.base_height) % hints.height_increment;
    }

    Rect::new(child.x, child.y, w, h)
}

/// The decoration strip layout for a stacked / tabbed container: the number
/// of decoration lines and the per-client title cells (relative to the
/// strip).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoPlan {
    /// Height of the strip in decoration lines
    pub lines: u32,
    /// One title cell per client, in ring order, relative to the strip
    pub cells: Vec<(Xid, Rect)>,
}

/// Compute the decoration plan for a stacked or tabbed container.
pub fn deco_plan(
    mode: Mode,
    limit: StackLimit,
    clients: &[Xid],
    strip_w: u32,
    font_height: u32,
) -> DecoPlan {
    let n = clients.len() as u32;
    let line_h = title_height(font_height);

    if n == 0 {
        return DecoPlan {
            lines: 1,
            cells: Vec::new(),
        };
    }

    if mode == Mode::Tabbed {
        let cell_w = strip_w / n;
        let cells = clients
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, Rect::new((i as u32 * cell_w) as i32, 0, cell_w, line_h)))
            .collect();
        return DecoPlan { lines: 1, cells };
    }

    let (lines, columns) = match limit {
        StackLimit::None => (n, 1),
        StackLimit::Cols(k) if k > 0 => (n.div_ceil(k.min(n)), k.min(n)),
        StackLimit::Rows(k) if k > 0 => {
            let rows = k.min(n);
            (rows, n.div_ceil(rows))
        }
        _ => (n, 1),
    };

    let cell_w = strip_w / columns;
    let cells = clients
        .iter()
        .enumerate()
        .map(|(i, &id)| {
            let i = i as u32;
            let (col, row) = match limit {
                StackLimit::Rows(k) if k > 0 => (i / k.min(n), i % k.min(n)),
                _ => (i % columns, i / columns),
            };
            (
                id,
                Rect::new((col * cell_w) as i32, (row * line_h) as i32, cell_w, line_h),
            )
        })
        .collect();

    DecoPlan { lines, cells }
}

/// Per-client frame rects for a container in Default mode: the container
/// rect divided vertically in equal shares. The fullscreen client (rendered
/// separately) is excluded.
pub fn default_mode_frames(
    clients: &[Xid],
    fullscreen: Option<Xid>,
    r: Rect,
) -> Vec<(Xid, Rect)> {
    let visible: Vec<Xid> = clients
        .iter()
        .copied()
        .filter(|&id| Some(id) != fullscreen)
        .collect();

    let heights = even_split(r.h, visible.len());
    let mut y = r.y;

    visible
        .into_iter()
        .zip(heights)
        .map(|(id, h)| {
            let fr = Rect::new(r.x, y, r.w, h);
            y += h as i32;
            (id, fr)
        })
        .collect()
}

/// The inner (client body) rect of a stacked / tabbed container after
/// reserving the decoration strip at the top.
pub fn stacked_inner_rect(r: Rect, lines: u32, font_height: u32) -> Rect {
    let strip = lines * title_height(font_height);

    Rect::new(
        r.x,
        r.y + strip as i32,
        r.w,
        r.h.saturating_sub(strip),
    )
}

/// Absolute rects for every cell of the workspace grid within `usable`,
/// including col/row spans.
pub fn workspace_grid(ws: &Workspace, usable: Rect) -> Vec<Vec<Rect>> {
    let widths = ws.col_widths(usable.w);
    let heights = ws.row_heights(usable.h);

    let mut x_edges = vec![usable.x];
    for w in widths.iter() {
        x_edges.push(x_edges.last().unwrap() + *w as i32);
    }
    let mut y_edges = vec![usable.y];
    for h in heights.iter() {
        y_edges.push(y_edges.last().unwrap() + *h as i32);
    }

    ws.table
        .iter()
        .enumerate()
        .map(|(c, column)| {
            column
                .iter()
                .enumerate()
                .map(|(r, cell)| {
                    let c_end = (c + cell.colspan).min(widths.len());
                    let r_end = (r + cell.rowspan).min(heights.len());
                    Rect::new(
                        x_edges[c],
                        y_edges[r],
                        (x_edges[c_end] - x_edges[c]) as u32,
                        (y_edges[r_end] - y_edges[r]) as u32,
                    )
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pure::client::SizeHints;
    use simple_test_case::test_case;

    const FONT_H: u32 = 13;

    #[test]
    fn three_tiled_windows_split_1000x700() {
        let mut ws = Workspace::new(0);
        ws.expand_cols();
        ws.expand_cols();

        let grid = workspace_grid(&ws, Rect::new(0, 0, 1000, 700));

        assert_eq!(grid[0][0], Rect::new(0, 0, 333, 700));
        assert_eq!(grid[1][0], Rect::new(333, 0, 334, 700));
        assert_eq!(grid[2][0], Rect::new(667, 0, 333, 700));
    }

    #[test]
    fn spanned_cells_cover_their_tracks() {
        let mut ws = Workspace::new(0);
        ws.expand_cols();
        ws.expand_rows();
        ws.table[0][0].colspan = 2;

        let grid = workspace_grid(&ws, Rect::new(0, 0, 1000, 700));

        assert_eq!(grid[0][0].w, 1000);
        assert_eq!(grid[0][1].w, 500);
    }

    #[test_case(
        Mode::Stack, false, TitlebarPosition::Top,
        Rect::new(2, 0, 796, 598);
        "stack ignores titlebar"
    )]
    #[test_case(
        Mode::Default, true, TitlebarPosition::Off,
        Rect::new(0, 0, 800, 600);
        "borderless"
    )]
    #[test_case(
        Mode::Default, false, TitlebarPosition::Off,
        Rect::new(1, 1, 798, 598);
        "one pixel border"
    )]
    #[test_case(
        Mode::Default, false, TitlebarPosition::Top,
        Rect::new(2, 17, 796, 581);
        "normal titlebar"
    )]
    #[test]
    fn child_rects(mode: Mode, borderless: bool, titlebar: TitlebarPosition, expected: Rect) {
        assert_eq!(child_rect(mode, borderless, titlebar, 800, 600, FONT_H), expected);
    }

    #[test]
    fn size_hints_shrink_by_child_border() {
        let client = Client {
            border_width: 1,
            ..Default::default()
        };

        let r = apply_size_hints(Rect::new(2, 17, 796, 581), &client);

        assert_eq!(r, Rect::new(2, 17, 794, 579));
    }

    #[test]
    fn aspect_hints_shrink_and_center() {
        let client = Client {
            proportional_width: 4,
            proportional_height: 3,
            ..Default::default()
        };

        let r = apply_size_hints(Rect::new(0, 0, 1000, 600), &client);

        assert_eq!(r.w, 800);
        assert_eq!(r.h, 600);
        assert_eq!(r.x, 100);
    }

    #[test]
    fn resize_increments_are_honoured() {
        let client = Client {
            size_hints: SizeHints {
                base_width: 2,
                base_height: 4,
                width_increment: 9,
                height_increment: 18,
                ..Default::default()
            },
            ..Default::default()
        };

        let r = apply_size_hints(Rect::new(0, 0, 643, 400), &client);

        assert_eq!((r.w - 2) % 9, 0);
        assert_eq!((r.h - 4) % 18, 0);
        assert!(r.w <= 643 && r.h <= 400);
    }

    #[test]
    fn stack_deco_is_one_line_per_client() {
        let clients = [Xid(1), Xid(2), Xid(3)];

        let plan = deco_plan(Mode::Stack, StackLimit::None, &clients, 333, FONT_H);

        assert_eq!(plan.lines, 3);
        assert_eq!(plan.cells.len(), 3);
        assert_eq!(plan.cells[2].1, Rect::new(0, 34, 333, 17));

        let inner = stacked_inner_rect(Rect::new(333, 0, 334, 700), plan.lines, FONT_H);
        assert_eq!(inner, Rect::new(333, 51, 334, 649));
    }

    #[test]
    fn stack_limit_cols_builds_a_grid() {
        let clients: Vec<Xid> = (1..=5).map(Xid).collect();

        let plan = deco_plan(Mode::Stack, StackLimit::Cols(2), &clients, 400, FONT_H);

        // 5 clients capped at 2 columns -> 3 rows of 2
        assert_eq!(plan.lines, 3);
        assert_eq!(plan.cells[0].1, Rect::new(0, 0, 200, 17));
        assert_eq!(plan.cells[1].1, Rect::new(200, 0, 200, 17));
        assert_eq!(plan.cells[2].1, Rect::new(0, 17, 200, 17));
    }

    #[test]
    fn stack_limit_rows_fills_columns_first() {
        let clients: Vec<Xid> = (1..=5).map(Xid).collect();

        let plan = deco_plan(Mode::Stack, StackLimit::Rows(2), &clients, 400, FONT_H);

        // 5 clients capped at 2 rows -> 3 columns, width 400 / 3
        assert_eq!(plan.lines, 2);
        assert_eq!(plan.cells[0].1, Rect::new(0, 0, 133, 17));
        assert_eq!(plan.cells[1].1, Rect::new(0, 17, 133, 17));
        assert_eq!(plan.cells[2].1, Rect::new(133, 0, 133, 17));
    }

    #[test]
    fn tabbed_deco_is_a_single_line() {
        let clients: Vec<Xid> = (1..=4).map(Xid).collect();

        let plan = deco_plan(Mode::Tabbed, StackLimit::None, &clients, 400, FONT_H);

        assert_eq!(plan.lines, 1);
        assert!(plan.cells.iter().all(|(_, r)| r.h == 17 && r.w == 100));
        assert_eq!(plan.cells[3].1.x, 300);
    }

    #[test]
    fn default_mode_splits_vertically_excluding_fullscreen() {
        let clients = [Xid(1), Xid(2), Xid(3)];

        let frames = default_mode_frames(&clients, Some(Xid(2)), Rect::new(0, 0, 333, 700));

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].1, Rect::new(0, 0, 333, 350));
        assert_eq!(frames[1].1, Rect::new(0, 350, 333, 350));
    }

    #[test]
    fn even_split_distributes_remainder() {
        assert_eq!(even_split(700, 3), vec![233, 234, 233]);
        assert_eq!(even_split(700, 3).iter().sum::<u32>(), 700);
    }
}
