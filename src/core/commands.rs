//! The command interpreter: parsing and executing the single-command
//! strings bound to keys and received over IPC.
use crate::{
    core::{bindings, drag::usable_height, handle, State},
    draw::Draw,
    layout::render_layout,
    pure::{
        client::TitlebarPosition,
        container::{Mode, StackLimit},
        geometry::Rect,
        table::resize_tracks,
        Direction,
    },
    x::{XConn, XConnExt},
    Error, Result, Xid,
};
use std::os::unix::process::CommandExt;
use tracing::{debug, warn};

/// What a directional command operates on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Operand {
    Window,
    Container,
    Workspace,
    Screen,
}

/// Parse and execute a single command string.
///
/// The grammar is line oriented and prefix dispatched; invalid input is
/// reported as [Error::InvalidCommand] without mutating any state.
pub fn run_command<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    command: &str,
) -> Result<()> {
    debug!(%command, "parsing command");
    let command = command.trim();
    if command.is_empty() {
        return Ok(());
    }

    let last_focused = state.model.focused_client();

    if let Some(rest) = command.strip_prefix("exec ") {
        return exec_program(rest);
    }

    if let Some(rest) = strip_word(command, "mark") {
        let Some(id) = last_focused else {
            warn!("there is no window to mark");
            return Ok(());
        };
        if rest.is_empty() {
            warn!("interactive marking requires the input helper");
            return Ok(());
        }
        return mark_client(state, id, rest);
    }

    if let Some(rest) = strip_word(command, "goto") {
        if rest.is_empty() {
            warn!("interactive goto requires the input helper");
            return Ok(());
        }
        match state.model.client_with_mark(rest) {
            Some(id) => {
                let ws = state.model.clients[&id].workspace;
                handle::workspace_show(x, d, state, ws)?;
                return handle::set_focus(x, d, state, id, true);
            }
            None => {
                warn!(mark = rest, "no window with this mark found");
                return Ok(());
            }
        }
    }

    if let Some(rest) = command.strip_prefix("stack-limit ") {
        return stack_limit(x, d, state, rest);
    }

    if let Some(rest) = command.strip_prefix("resize ") {
        return resize_command(x, d, state, last_focused, rest);
    }

    if let Some(rest) = command.strip_prefix("move ") {
        return move_floating_command(x, d, state, last_focused, rest);
    }

    if let Some(rest) = command.strip_prefix("mode ") {
        return switch_binding_mode(x, state, rest);
    }

    if command == "exit" {
        state.halt = true;
        return Ok(());
    }
    if command == "reload" {
        state.reload = true;
        return Ok(());
    }
    if command == "restart" {
        state.restart = true;
        return Ok(());
    }
    if command == "kill" {
        let Some(id) = last_focused else {
            warn!("there is no window to kill");
            return Ok(());
        };
        return x.close_client(id);
    }

    if let Some(rest) = command.strip_prefix("bring ") {
        return bring_window(x, d, state, parse_quoted(rest)?);
    }

    if let Some(rest) = command.strip_prefix("jump ") {
        if rest.starts_with('"') {
            let pattern = parse_quoted(rest)?;
            match state.model.client_matching(pattern) {
                Some(id) => {
                    let ws = state.model.clients[&id].workspace;
                    handle::workspace_show(x, d, state, ws)?;
                    return handle::set_focus(x, d, state, id, true);
                }
                None => {
                    warn!(pattern, "no matching client found");
                    return Ok(());
                }
            }
        }
        return jump_to_container(x, d, state, rest);
    }

    if let Some(rest) = strip_word(command, "focus") {
        return travel_focus_stack(x, d, state, rest);
    }

    if command == "f" || command == "fg" {
        let Some(id) = last_focused else {
            return Ok(());
        };
        return handle::toggle_fullscreen(x, d, state, id, command == "fg");
    }

    if command == "s" || command == "d" || command == "T" {
        return switch_container_mode(x, d, state, command);
    }

    if let Some(style) = command.strip_prefix('b') {
        if !style.is_empty() {
            let Some(id) = last_focused else {
                warn!("no window focused, cannot change border type");
                return Ok(());
            };
            return change_border(x, d, state, id, style);
        }
    }

    if command == "H" {
        let ws = state.model.current_workspace;
        state.model.workspaces[ws].floating_hidden =
            !state.model.workspaces[ws].floating_hidden;
        debug!(
            hidden = state.model.workspaces[ws].floating_hidden,
            "toggled floating layer"
        );
        return render_layout(x, d, &mut state.model, &state.config);
    }

    // the composed micro syntax: optional operand prefix, optional toggle,
    // next/previous workspace, then [times][m|s][workspace][directions]
    let mut rest = command;
    let mut operand = Operand::Window;
    if let Some(r) = rest.strip_prefix('w') {
        let (op, r) = match r.chars().next() {
            Some('c') => (Operand::Container, &r[1..]),
            Some('w') => (Operand::Workspace, &r[1..]),
            Some('s') => (Operand::Screen, &r[1..]),
            _ => return Err(Error::InvalidCommand(command.to_string())),
        };
        operand = op;
        rest = r;
    }

    if rest == "t" {
        if operand == Operand::Workspace {
            let ws = state.model.current_mut();
            ws.auto_float = !ws.auto_float;
            debug!(auto_float = ws.auto_float, "toggled workspace auto float");
            return Ok(());
        }
        let Some(id) = last_focused else {
            warn!("cannot toggle tiling/floating: workspace empty");
            return Ok(());
        };
        return handle::toggle_floating(x, d, state, id);
    }

    if rest == "nw" || rest == "pw" {
        if let Some(ws) = state.model.next_nonempty_workspace(rest == "nw") {
            return handle::workspace_show(x, d, state, ws);
        }
        return Ok(());
    }

    parse_directional(x, d, state, operand, rest)
}

// `<prefix>` or `<prefix> <rest>`, returning the trimmed rest
fn strip_word<'a>(command: &'a str, word: &str) -> Option<&'a str> {
    if command == word {
        return Some("");
    }
    command.strip_prefix(word).and_then(|r| {
        r.starts_with(' ').then(|| r.trim_start_matches(' '))
    })
}

fn parse_quoted(s: &str) -> Result<&str> {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| Error::InvalidCommand(s.to_string()))
}

fn exec_program(shell_command: &str) -> Result<()> {
    debug!(%shell_command, "starting application");
    let mut cmd = std::process::Command::new("/bin/sh");
    cmd.args(["-c", shell_command]);

    // detach from our process group so commands survive a wm restart
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid().map_err(std::io::Error::from)?;
            Ok(())
        });
    }

    match cmd.spawn() {
        Ok(_) => Ok(()),
        Err(e) => {
            warn!(%e, "unable to spawn program");
            Ok(())
        }
    }
}

// marks are unique: setting a mark removes it from any other client
fn mark_client(state: &mut State, id: Xid, mark: &str) -> Result<()> {
    for client in state.model.clients.values_mut() {
        if client.mark.as_deref() == Some(mark) {
            client.mark = None;
        }
    }
    state.model.clients.get_mut(&id).unwrap().mark = Some(mark.to_string());
    debug!(%id, mark, "marked client");

    Ok(())
}

fn stack_limit<X: XConn, D: Draw>(x: &X, d: &D, state: &mut State, rest: &str) -> Result<()> {
    let (kind, value) = rest
        .split_once(' ')
        .ok_or_else(|| Error::InvalidCommand(format!("stack-limit {rest}")))?;
    let value: u32 = value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidCommand(format!("stack-limit {rest}")))?;

    let limit = match (kind, value) {
        (_, 0) => StackLimit::None,
        ("rows", v) => StackLimit::Rows(v),
        ("cols", v) => StackLimit::Cols(v),
        _ => return Err(Error::InvalidCommand(format!("stack-limit {rest}"))),
    };

    state.model.current_mut().current_cell_mut().stack_limit = limit;
    render_layout(x, d, &mut state.model, &state.config)
}

fn resize_command<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    last_focused: Option<Xid>,
    rest: &str,
) -> Result<()> {
    let Some(id) = last_focused else {
        return Ok(());
    };
    let (dir, px) = rest
        .split_once(' ')
        .ok_or_else(|| Error::InvalidCommand(format!("resize {rest}")))?;
    let px: i32 = px
        .trim()
        .trim_start_matches('+')
        .parse()
        .map_err(|_| Error::InvalidCommand(format!("resize {rest}")))?;
    if px == 0 {
        return Ok(());
    }

    if state.model.clients[&id].is_floating() {
        let r = state.model.clients[&id].rect;
        let new = match dir {
            "left" => Rect::new(r.x - px, r.y, (r.w as i32 + px).max(1) as u32, r.h),
            "right" => Rect::new(r.x, r.y, (r.w as i32 + px).max(1) as u32, r.h),
            "top" => Rect::new(r.x, r.y - px, r.w, (r.h as i32 + px).max(1) as u32),
            "bottom" => Rect::new(r.x, r.y, r.w, (r.h as i32 + px).max(1) as u32),
            _ => return Err(Error::InvalidCommand(format!("resize {rest}"))),
        };
        let client = state.model.clients.get_mut(&id).unwrap();
        client.rect = new;
        client.floating_rect = Some(new);
        return render_layout(x, d, &mut state.model, &state.config);
    }

    let ws = state.model.current_workspace;
    let (col, row) = (
        state.model.workspaces[ws].current_col,
        state.model.workspaces[ws].current_row,
    );
    let (cols, rows) = (
        state.model.workspaces[ws].cols(),
        state.model.workspaces[ws].rows(),
    );
    let min_px = state.config.min_track_px;

    match dir {
        "left" if col > 0 => {
            let total = state.model.workspaces[ws].rect.w;
            let f = &mut state.model.workspaces[ws].width_factor;
            resize_tracks(f, total, col - 1, col, -px, min_px);
        }
        "right" if col + 1 < cols => {
            let total = state.model.workspaces[ws].rect.w;
            let f = &mut state.model.workspaces[ws].width_factor;
            resize_tracks(f, total, col, col + 1, px, min_px);
        }
        "top" if row > 0 => {
            let total = usable_height(state, ws, d.font_height());
            let f = &mut state.model.workspaces[ws].height_factor;
            resize_tracks(f, total, row - 1, row, -px, min_px);
        }
        "bottom" if row + 1 < rows => {
            let total = usable_height(state, ws, d.font_height());
            let f = &mut state.model.workspaces[ws].height_factor;
            resize_tracks(f, total, row, row + 1, px, min_px);
        }
        "left" | "right" | "top" | "bottom" => {
            warn!(dir, "no neighbouring track to resize against");
            return Ok(());
        }
        _ => return Err(Error::InvalidCommand(format!("resize {rest}"))),
    }

    render_layout(x, d, &mut state.model, &state.config)
}

fn move_floating_command<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    last_focused: Option<Xid>,
    rest: &str,
) -> Result<()> {
    let Some(id) = last_focused else {
        return Ok(());
    };
    if !state.model.clients[&id].is_floating() {
        warn!("only floating clients can be moved with the move command");
        return Ok(());
    }

    let (dir, px) = rest
        .split_once(' ')
        .ok_or_else(|| Error::InvalidCommand(format!("move {rest}")))?;
    let px: i32 = px
        .trim()
        .parse()
        .map_err(|_| Error::InvalidCommand(format!("move {rest}")))?;

    let r = state.model.clients[&id].rect;
    let new = match dir {
        "left" => Rect::new(r.x - px, r.y, r.w, r.h),
        "right" => Rect::new(r.x + px, r.y, r.w, r.h),
        "top" => Rect::new(r.x, r.y - px, r.w, r.h),
        "bottom" => Rect::new(r.x, r.y + px, r.w, r.h),
        _ => return Err(Error::InvalidCommand(format!("move {rest}"))),
    };

    let client = state.model.clients.get_mut(&id).unwrap();
    client.rect = new;
    client.floating_rect = Some(new);

    render_layout(x, d, &mut state.model, &state.config)
}

fn switch_binding_mode<X: XConn>(x: &X, state: &mut State, mode: &str) -> Result<()> {
    debug!(mode, "switching binding mode");
    state.binding_mode = mode.to_string();
    let bindings = state.config.bindings_for_mode(mode).to_vec();
    state.keymap = bindings::regrab(x, &bindings)?;

    Ok(())
}

fn switch_container_mode<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    which: &str,
) -> Result<()> {
    if let Some(id) = state.model.focused_client() {
        if state.model.clients[&id].is_floating() {
            warn!("not switching mode for a floating client");
            return Ok(());
        }
    }

    let cell = state.model.current_mut().current_cell_mut();
    cell.mode = match which {
        "s" if cell.mode != Mode::Stack => Mode::Stack,
        "T" if cell.mode != Mode::Tabbed => Mode::Tabbed,
        _ => Mode::Default,
    };
    debug!(mode = ?cell.mode, "switched container mode");

    render_layout(x, d, &mut state.model, &state.config)
}

fn change_border<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    id: Xid,
    style: &str,
) -> Result<()> {
    let client = state.model.clients.get_mut(&id).unwrap();

    let style = match style {
        // three way toggle: normal -> 1px -> borderless -> normal
        "t" => {
            if client.titlebar == TitlebarPosition::Top && !client.borderless {
                "p"
            } else if client.titlebar == TitlebarPosition::Off && !client.borderless {
                "b"
            } else {
                "n"
            }
        }
        s => s,
    };

    match style {
        "n" => {
            client.borderless = false;
            client.titlebar = TitlebarPosition::Top;
        }
        "p" => {
            client.borderless = false;
            client.titlebar = TitlebarPosition::Off;
        }
        "b" => {
            client.borderless = true;
            client.titlebar = TitlebarPosition::Off;
        }
        _ => return Err(Error::InvalidCommand(format!("b{style}"))),
    }
    client.force_reconfigure = true;

    render_layout(x, d, &mut state.model, &state.config)
}

fn travel_focus_stack<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    args: &str,
) -> Result<()> {
    let ws = state.model.current_workspace;
    let stack = state.model.workspaces[ws].focus_stack.clone();

    let target = match args {
        "floating" | "tiling" | "ft" => {
            let want_floating = match args {
                "floating" => true,
                "tiling" => false,
                _ => match stack.first() {
                    Some(&id) => !state.model.clients[&id].is_floating(),
                    None => {
                        warn!("cannot select the next floating/tiling client: workspace empty");
                        return Ok(());
                    }
                },
            };
            stack
                .iter()
                .find(|&&id| state.model.clients[&id].is_floating() == want_floating)
                .copied()
        }
        _ => {
            let times: usize = args.trim().parse().unwrap_or(1);
            stack.get(times.min(stack.len().saturating_sub(1))).copied()
        }
    };

    match target {
        Some(id) => handle::set_focus(x, d, state, id, true),
        None => Ok(()),
    }
}

fn jump_to_container<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    args: &str,
) -> Result<()> {
    let mut parts = args.split_whitespace().map(str::parse::<usize>);

    let ws = match parts.next() {
        Some(Ok(n)) if n > 0 => n - 1,
        _ => return Err(Error::InvalidCommand(format!("jump {args}"))),
    };
    handle::workspace_show(x, d, state, ws)?;

    let (col, row) = match (parts.next(), parts.next()) {
        (Some(Ok(col)), Some(Ok(row))) => (col, row),
        _ => return Ok(()),
    };

    let ws = state.model.current_workspace;
    let col = col.min(state.model.workspaces[ws].cols() - 1);
    let row = row.min(state.model.workspaces[ws].rows() - 1);

    if let Some(id) = state.model.workspaces[ws].table[col][row].focused {
        handle::set_focus(x, d, state, id, true)?;
    }

    Ok(())
}

/// `bring "class/title"`: pull the matching window onto the current
/// workspace and focus it.
fn bring_window<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    pattern: &str,
) -> Result<()> {
    let Some(id) = state.model.client_matching(pattern) else {
        warn!(pattern, "no matching client found");
        return Ok(());
    };

    let here = state.model.current_workspace;
    if state.model.clients[&id].workspace == here {
        return handle::set_focus(x, d, state, id, true);
    }

    move_client_to_workspace(x, d, state, id, here)?;
    handle::workspace_show(x, d, state, here)?;
    handle::set_focus(x, d, state, id, true)
}

/// The composed `[times][m|s][workspace]<dirs>` micro syntax.
fn parse_directional<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    operand: Operand,
    rest: &str,
) -> Result<()> {
    #[derive(PartialEq, Clone, Copy)]
    enum Action {
        Focus,
        Move,
        Snap,
    }

    let (times, rest) = split_leading_int(rest);
    let original = rest;

    // a bare number is a workspace switch, not a times specification
    if rest.is_empty() {
        return match times {
            Some(n) if n > 0 => handle::workspace_show(x, d, state, n - 1),
            _ => Err(Error::InvalidCommand(original.to_string())),
        };
    }
    let times = times.unwrap_or(1).max(1);

    let (action, rest) = match rest.chars().next() {
        Some('m') => (Action::Move, &rest[1..]),
        Some('s') => (Action::Snap, &rest[1..]),
        _ => (Action::Focus, rest),
    };

    let (target_ws, rest) = split_leading_int(rest);
    if let Some(ws) = target_ws {
        if rest.is_empty() {
            if ws == 0 {
                return Err(Error::InvalidCommand(original.to_string()));
            }
            let Some(id) = state.model.focused_client() else {
                warn!("no window to move");
                return Ok(());
            };
            move_client_to_workspace(x, d, state, id, ws - 1)?;
            return Ok(());
        }
    }

    if state.model.focused_client().is_none() && operand == Operand::Window {
        warn!("not performing, no window found");
        return Ok(());
    }

    let mut rest = rest;
    while let Some(c) = rest.chars().next() {
        let direction = match c {
            'h' => Direction::Left,
            'j' => Direction::Down,
            'k' => Direction::Up,
            'l' => Direction::Right,
            _ => return Err(Error::InvalidCommand(original.to_string())),
        };
        rest = &rest[1..];

        for _ in 0..times {
            match action {
                Action::Focus => focus_direction(x, d, state, direction, operand)?,
                Action::Move => move_direction(x, d, state, direction)?,
                Action::Snap => snap_direction(x, d, state, direction)?,
            }
        }
    }

    Ok(())
}

fn split_leading_int(s: &str) -> (Option<usize>, &str) {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return (None, s);
    }

    (s[..digits].parse().ok(), &s[digits..])
}

/// Directional focus: within the container first, then across cells
/// (honouring spans), then across outputs with wrap around.
fn focus_direction<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    direction: Direction,
    mut operand: Operand,
) -> Result<()> {
    let ws = state.model.current_workspace;

    // fullscreen forces whole-screen focus moves
    if state.model.workspaces[ws].fullscreen.is_some() {
        operand = Operand::Screen;
    }

    if operand == Operand::Screen || operand == Operand::Workspace {
        return focus_output(x, d, state, direction);
    }

    let workspace = &state.model.workspaces[ws];
    let (col, row) = (workspace.current_col, workspace.current_row);

    // in-container cycling comes first for plain window focus
    if operand == Operand::Window
        && matches!(direction, Direction::Up | Direction::Down)
    {
        let cell = workspace.current_cell();
        if let Some(focused) = cell.focused {
            if let Some(next) = cell.cycled_client(focused, direction == Direction::Down) {
                return handle::set_focus(x, d, state, next, true);
            }
        }
    }

    let (mut t_ws, mut new_col, mut new_row) = (ws, col, row);
    let mut crossed_output = false;

    match direction {
        Direction::Down if workspace.cell_exists(col as isize, row as isize + 1) => {
            new_row = row + workspace.table[col][row].rowspan;
        }
        Direction::Up if workspace.cell_exists(col as isize, row as isize - 1) => {
            new_row = spanning_track_start(
                (0..row).map(|r| workspace.table[col][r].rowspan).collect(),
                row - 1,
            );
        }
        Direction::Right if workspace.cell_exists(col as isize + 1, row as isize) => {
            new_col = col + workspace.table[col][row].colspan;
        }
        Direction::Left if workspace.cell_exists(col as isize - 1, row as isize) => {
            new_col = spanning_track_start(
                (0..col).map(|c| workspace.table[c][row].colspan).collect(),
                col - 1,
            );
        }
        _ => {
            // no neighbouring cell: try the next output in that direction
            crossed_output = true;
        }
    }

    if crossed_output {
        let Some(output) = state.model.workspaces[ws].output else {
            return Ok(());
        };
        let target = next_output(state, output, direction);
        let Some(shown) = state.model.outputs[target].current_workspace else {
            return Ok(());
        };

        t_ws = shown;
        let target_workspace = &state.model.workspaces[t_ws];
        new_col = col.min(target_workspace.cols() - 1);
        new_row = row.min(target_workspace.rows() - 1);
        match direction {
            Direction::Up => new_row = target_workspace.rows() - 1,
            Direction::Down => new_row = 0,
            Direction::Left => new_col = target_workspace.cols() - 1,
            Direction::Right => new_col = 0,
        }
    }

    let target_workspace = &state.model.workspaces[t_ws];
    new_col = new_col.min(target_workspace.cols() - 1);
    new_row = new_row.min(target_workspace.rows() - 1);

    // an empty cell may be covered by a span starting further up/left
    if target_workspace.table[new_col][new_row].focused.is_none() {
        new_col = spanning_track_start(
            (0..new_col)
                .map(|c| target_workspace.table[c][new_row].colspan)
                .collect(),
            new_col,
        );
    }
    if target_workspace.table[new_col][new_row].focused.is_none() {
        new_row = spanning_track_start(
            (0..new_row)
                .map(|r| target_workspace.table[new_col][r].rowspan)
                .collect(),
            new_row,
        );
    }

    if let Some(id) = state.model.workspaces[t_ws].table[new_col][new_row].focused {
        handle::set_focus(x, d, state, id, true)?;
    }

    Ok(())
}

// The start index of the track whose span covers `target` (scanning from 0
// by span width), or `target` itself.
fn spanning_track_start(spans: Vec<usize>, target: usize) -> usize {
    let mut i = 0;
    while i < spans.len() && i <= target {
        let span = spans[i].max(1);
        if target <= i + span - 1 {
            return i;
        }
        i += span;
    }

    target
}

fn focus_output<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    direction: Direction,
) -> Result<()> {
    let ws = state.model.current_workspace;
    let Some(current) = state.model.workspaces[ws].output else {
        return Ok(());
    };

    let target = next_output(state, current, direction);
    if let Some(shown) = state.model.outputs[target].current_workspace {
        handle::workspace_show(x, d, state, shown)?;
    }

    Ok(())
}

// The active output adjacent in `direction`, wrapping to the far side when
// there is none.
fn next_output(state: &State, current: usize, direction: Direction) -> usize {
    let r = state.model.outputs[current].rect;
    let probe = match direction {
        Direction::Left => (r.x - 1, r.y),
        Direction::Right => (r.x + r.w as i32 + 1, r.y),
        Direction::Up => (r.x, r.y - 1),
        Direction::Down => (r.x, r.y + r.h as i32 + 1),
    };

    match state.model.output_containing(probe.into()) {
        Some(o) => o,
        None => state.model.get_output_most(direction.flipped(), current),
    }
}

/// Directional move: reorder within the container for Up/Down, otherwise
/// swap with an occupied neighbour cell or move into an empty one, growing
/// the table at the edges.
fn move_direction<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    direction: Direction,
) -> Result<()> {
    let ws = state.model.current_workspace;
    let (col, row) = (
        state.model.workspaces[ws].current_col,
        state.model.workspaces[ws].current_row,
    );

    let Some(id) = state.model.workspaces[ws].table[col][row].focused else {
        return Ok(());
    };
    if state.model.clients[&id].dock {
        return Ok(());
    }

    // moving up/down within a container reorders the ring
    if matches!(direction, Direction::Up | Direction::Down) {
        let cell = &mut state.model.workspaces[ws].table[col][row];
        if let Some(i) = cell.focused_index() {
            let target = match direction {
                Direction::Up if i > 0 => Some(i - 1),
                Direction::Down if i + 1 < cell.clients.len() => Some(i + 1),
                _ => None,
            };
            if let Some(j) = target {
                cell.clients.swap(i, j);
                return render_layout(x, d, &mut state.model, &state.config);
            }
        }
    }

    // work out the target cell, growing the table at the edges
    let workspace = &mut state.model.workspaces[ws];
    let (t_col, t_row) = match direction {
        Direction::Left => {
            if workspace.current_col == 0 {
                workspace.expand_cols_at_head();
                state.model.sync_client_cells(ws);
            }
            let w = &state.model.workspaces[ws];
            (w.current_col - 1, w.current_row)
        }
        Direction::Right => {
            if workspace.current_col == workspace.cols() - 1 {
                workspace.expand_cols();
            }
            let w = &state.model.workspaces[ws];
            (w.current_col + 1, w.current_row)
        }
        Direction::Up => {
            if workspace.current_row == 0 {
                workspace.expand_rows_at_head();
                state.model.sync_client_cells(ws);
            }
            let w = &state.model.workspaces[ws];
            (w.current_col, w.current_row - 1)
        }
        Direction::Down => {
            if workspace.current_row == workspace.rows() - 1 {
                workspace.expand_rows();
            }
            let w = &state.model.workspaces[ws];
            (w.current_col, w.current_row + 1)
        }
    };

    let (col, row) = (
        state.model.workspaces[ws].current_col,
        state.model.workspaces[ws].current_row,
    );

    // an occupied horizontal neighbour swaps with the moved client; vertical
    // moves merge into the target container instead so containers can be
    // built up for stacking
    let other = if matches!(direction, Direction::Left | Direction::Right) {
        state.model.workspaces[ws].table[t_col][t_row].focused
    } else {
        None
    };

    let fallback = state.model.workspaces[ws].last_focused_in(col, row, Some(id));
    state.model.workspaces[ws].table[col][row].remove_client(id, fallback);
    state.model.workspaces[ws].table[t_col][t_row].insert_client(id);
    state.model.clients.get_mut(&id).unwrap().cell = Some((t_col, t_row));

    if let Some(other) = other {
        let fallback = state.model.workspaces[ws].last_focused_in(t_col, t_row, Some(other));
        state.model.workspaces[ws].table[t_col][t_row].remove_client(other, fallback);
        state.model.workspaces[ws].table[col][row].insert_client(other);
        state.model.clients.get_mut(&other).unwrap().cell = Some((col, row));
    }

    state.model.workspaces[ws].current_col = t_col;
    state.model.workspaces[ws].current_row = t_row;

    state.model.workspaces[ws].cleanup_table();
    state.model.workspaces[ws].fix_colrowspan();
    state.model.sync_client_cells(ws);

    render_layout(x, d, &mut state.model, &state.config)?;
    handle::set_focus(x, d, state, id, true)
}

/// Snap: grow the current container's span into empty neighbour cells,
/// shrinking any span that would now overlap.
fn snap_direction<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    direction: Direction,
) -> Result<()> {
    let ws = state.model.current_workspace;
    let workspace = &state.model.workspaces[ws];
    let (col, row) = (workspace.current_col, workspace.current_row);
    let (colspan, rowspan) = (
        workspace.table[col][row].colspan,
        workspace.table[col][row].rowspan,
    );

    match direction {
        // snapping left/up is a move followed by a snap back
        Direction::Left => {
            if !workspace.cell_exists(col as isize - 1, row as isize)
                || workspace.table[col - 1][row].focused.is_some()
            {
                warn!("cannot snap left, the cell is already used");
                return Ok(());
            }
            move_direction(x, d, state, Direction::Left)?;
            return snap_direction(x, d, state, Direction::Right);
        }
        Direction::Up => {
            if !workspace.cell_exists(col as isize, row as isize - 1)
                || workspace.table[col][row - 1].focused.is_some()
            {
                warn!("cannot snap up, the cell is already used");
                return Ok(());
            }
            move_direction(x, d, state, Direction::Up)?;
            return snap_direction(x, d, state, Direction::Down);
        }

        Direction::Right => {
            let new_col = col + colspan;
            for r in row..row + rowspan {
                if !workspace.cell_exists(new_col as isize, r as isize)
                    || workspace.table[new_col][r].focused.is_some()
                {
                    warn!("cannot snap right, the cell is already used");
                    return Ok(());
                }
            }

            let workspace = &mut state.model.workspaces[ws];
            for r in (0..row).rev() {
                while workspace.table[new_col][r].rowspan > row - r {
                    workspace.table[new_col][r].rowspan -= 1;
                }
            }
            workspace.table[col][row].colspan += 1;
        }

        Direction::Down => {
            let new_row = row + rowspan;
            for c in col..col + colspan {
                if !workspace.cell_exists(c as isize, new_row as isize)
                    || workspace.table[c][new_row].focused.is_some()
                {
                    warn!("cannot snap down, the cell is already used");
                    return Ok(());
                }
            }

            let workspace = &mut state.model.workspaces[ws];
            for c in (0..col).rev() {
                while workspace.table[c][new_row].colspan > col - c {
                    workspace.table[c][new_row].colspan -= 1;
                }
            }
            workspace.table[col][row].rowspan += 1;
        }
    }

    render_layout(x, d, &mut state.model, &state.config)
}

/// Move a client to another workspace (0-based), keeping fullscreen
/// exclusivity on the destination.
pub fn move_client_to_workspace<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    id: Xid,
    target: usize,
) -> Result<()> {
    let source = state.model.clients[&id].workspace;
    if source == target {
        return Ok(());
    }

    state.model.workspace_get(target);
    ensure_workspace_output(state, target);

    if state.model.clients[&id].fullscreen
        && state.model.workspaces[target].fullscreen.is_some()
    {
        warn!("not moving: fullscreen client already on destination workspace");
        return Ok(());
    }

    debug!(%id, workspace = target + 1, "moving client to workspace");
    let floating = state.model.clients[&id].is_floating();
    let was_fullscreen = state.model.clients[&id].fullscreen;

    if state.model.workspaces[source].fullscreen == Some(id) {
        state.model.workspaces[source].fullscreen = None;
    }
    state.model.workspaces[source].focus_remove(id);

    if floating {
        state.model.workspaces[source].floating.retain(|&c| c != id);
        state.model.workspaces[target].floating.push(id);

        // keep the same position relative to the new workspace rect
        let src_rect = state.model.workspaces[source].rect;
        let dst_rect = state.model.workspaces[target].rect;
        let client = state.model.clients.get_mut(&id).unwrap();
        let rel = (client.rect.x - src_rect.x, client.rect.y - src_rect.y);
        client.rect.x = dst_rect.x + rel.0;
        client.rect.y = dst_rect.y + rel.1;
        client.floating_rect = Some(client.rect);
        client.workspace = target;
    } else {
        state.model.detach_tiled(id);
        let (t_col, t_row) = {
            let w = &state.model.workspaces[target];
            (w.current_col, w.current_row)
        };
        state.model.workspaces[target].table[t_col][t_row].clients.push(id);
        state.model.workspaces[target].table[t_col][t_row].focused = Some(id);
        let client = state.model.clients.get_mut(&id).unwrap();
        client.cell = Some((t_col, t_row));
        client.workspace = target;
    }

    state.model.workspaces[target].focus_push(id);

    if was_fullscreen {
        state.model.workspaces[target].fullscreen = Some(id);
        state.model.clients.get_mut(&id).unwrap().force_reconfigure = true;
    }

    state.model.workspaces[source].cleanup_table();
    state.model.workspaces[source].fix_colrowspan();
    state.model.sync_client_cells(source);

    render_layout(x, d, &mut state.model, &state.config)?;

    if state.model.workspace_is_visible(target) {
        handle::set_focus(x, d, state, id, true)?;
    } else if let Some(client) = state.model.client(id) {
        let frame = client.frame;
        if state.model.clients[&id].mapped {
            state.model.clients.get_mut(&id).unwrap().mapped = false;
            x.unmap(frame)?;
        }
    }

    // focus whoever is left behind
    if state.model.current_workspace == source {
        if let Some(next) = state.model.workspaces[source].last_focused() {
            handle::set_focus(x, d, state, next, false)?;
        }
    }

    Ok(())
}

// assign a workspace to an output before it is shown, defaulting to the
// output of the current workspace
fn ensure_workspace_output(state: &mut State, ws: usize) {
    if state.model.workspaces[ws].output.is_some() {
        return;
    }

    let output = state.model.workspaces[state.model.current_workspace]
        .output
        .or_else(|| state.model.first_active_output());

    if let Some(output) = output {
        state.model.workspaces[ws].output = Some(output);
        state.model.workspaces[ws].rect = state.model.outputs[output].rect;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{config::Config, State},
        draw::{Color, TextRun},
        pure::{Model, Output},
        x::StubXConn,
        Xid,
    };
    use simple_test_case::test_case;

    struct Conn;
    impl StubXConn for Conn {}

    struct NullDraw;
    impl Draw for NullDraw {
        fn load_font(&mut self, _: &str) -> Result<()> {
            Ok(())
        }
        fn font_height(&self) -> u32 {
            13
        }
        fn text_width(&self, text: TextRun<'_>) -> Result<u32> {
            Ok(7 * text.len() as u32)
        }
        fn fill_rect(&self, _: Xid, _: Rect, _: Color) -> Result<()> {
            Ok(())
        }
        fn draw_text(&self, _: Xid, _: i32, _: i32, _: Color, _: Color, _: TextRun<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn test_state() -> State {
        let mut model = Model::new();
        model.outputs.push(Output::new("STUB", Rect::new(0, 0, 800, 600)));
        model.outputs[0].current_workspace = Some(0);
        model.workspaces[0].output = Some(0);
        model.workspaces[0].rect = Rect::new(0, 0, 800, 600);

        State {
            config: Config::default(),
            model,
            root: Xid(1),
            keymap: Default::default(),
            binding_mode: "default".to_string(),
            pending_ipc_events: Vec::new(),
            halt: false,
            restart: false,
            reload: false,
        }
    }

    #[test_case("exit"; "exit")]
    #[test_case("reload"; "reload")]
    #[test_case("restart"; "restart")]
    #[test]
    fn lifecycle_commands_set_their_flag(cmd: &str) {
        let mut state = test_state();

        run_command(&Conn, &NullDraw, &mut state, cmd).unwrap();

        let flag = match cmd {
            "exit" => state.halt,
            "reload" => state.reload,
            _ => state.restart,
        };
        assert!(flag);
    }

    #[test_case("zzz"; "unknown word")]
    #[test_case("wq"; "bad operand")]
    #[test_case("3mx"; "bad direction")]
    #[test_case("bring URxvt"; "missing quotes")]
    #[test]
    fn invalid_commands_error_without_mutating(cmd: &str) {
        let mut state = test_state();
        let id = Xid(42);
        state
            .model
            .clients
            .insert(id, crate::pure::Client::new(id, Xid(142), 0));
        state.model.attach_tiled(id, 0);
        state.model.workspaces[0].focus_push(id);
        let cols_before = state.model.workspaces[0].cols();

        assert!(run_command(&Conn, &NullDraw, &mut state, cmd).is_err());
        assert_eq!(state.model.workspaces[0].cols(), cols_before);
    }

    #[test]
    fn a_bare_number_switches_workspaces() {
        let mut state = test_state();

        run_command(&Conn, &NullDraw, &mut state, "3").unwrap();

        assert_eq!(state.model.current_workspace, 2);
        assert_eq!(state.model.workspaces.len(), 3);
        assert_eq!(state.model.check_invariants(), Ok(()));
    }

    #[test]
    fn mode_switches_the_binding_mode() {
        let mut state = test_state();
        state.config.modes.insert("resize".to_string(), Vec::new());

        run_command(&Conn, &NullDraw, &mut state, "mode resize").unwrap();

        assert_eq!(state.binding_mode, "resize");
    }

    #[test]
    fn commands_with_no_focus_are_noops() {
        let mut state = test_state();

        for cmd in ["kill", "f", "t", "mark x", "mh", "resize left 10"] {
            run_command(&Conn, &NullDraw, &mut state, cmd).unwrap();
            assert_eq!(state.model.check_invariants(), Ok(()));
        }
    }
}
