//! The rendering pass: applying the computed layout to the X server and
//! painting decorations.
use crate::{
    core::config::Config,
    draw::{ColorTriple, Draw, TextRun},
    layout::{
        apply_size_hints, bar_height, child_rect, deco_plan, default_mode_frames,
        stacked_inner_rect, title_height, workspace_grid,
    },
    pure::{
        client::{TitleSource, TitlebarPosition},
        container::Mode,
        geometry::Rect,
        model::Model,
    },
    x::{ClientConfig, WinType, XConn},
    Result, Xid,
};
use tracing::trace;

/// Lay out and redraw every active output and its current workspace, then
/// flush the connection.
pub fn render_layout<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    model: &mut Model,
    config: &Config,
) -> Result<()> {
    for output in 0..model.outputs.len() {
        if model.outputs[output].active {
            render_output(x, d, model, config, output)?;
        }
    }

    x.flush();

    Ok(())
}

/// Lay out and redraw a single output.
pub fn render_output<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    model: &mut Model,
    config: &Config,
    output: usize,
) -> Result<()> {
    let rect = model.outputs[output].rect;
    let font_h = d.font_height();

    // bottom docks stack upwards from just above the internal bar
    let reserved_top = place_docks(x, model, output, false, 0)?;
    let reserved_bottom = place_docks(x, model, output, true, bar_height(font_h))?;
    render_bar(x, d, model, config, output)?;

    let ws = match model.outputs[output].current_workspace {
        Some(ws) => ws,
        None => return Ok(()),
    };

    let bar_h = bar_height(font_h);
    let usable = Rect::new(
        rect.x,
        rect.y + reserved_top as i32,
        rect.w,
        rect.h
            .saturating_sub(reserved_top + reserved_bottom + bar_h),
    );

    render_workspace(x, d, model, config, ws, usable)?;
    restack(x, model, ws)?;

    Ok(())
}

/// Render the table and the floating layer of one workspace into `usable`.
pub fn render_workspace<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    model: &mut Model,
    config: &Config,
    ws: usize,
    usable: Rect,
) -> Result<()> {
    let visible = model.workspace_is_visible(ws);
    let grid = workspace_grid(&model.workspaces[ws], usable);

    for col in 0..model.workspaces[ws].cols() {
        for row in 0..model.workspaces[ws].rows() {
            model.workspaces[ws].table[col][row].rect = grid[col][row];
            render_container(x, d, model, config, ws, col, row, visible)?;
        }
    }

    let floating: Vec<Xid> = model.workspaces[ws].floating.clone();
    let hidden = model.workspaces[ws].floating_hidden;
    for id in floating {
        let r = model.clients[&id].rect;
        configure_client(x, model, id, r, visible && !hidden, d.font_height())?;
        decorate_client(d, model, config, id)?;
    }

    if let Some(fs) = model.workspaces[ws].fullscreen {
        let r = if model.global_fullscreen == Some(fs) {
            model.combined_output_rect()
        } else {
            model.workspaces[ws].rect
        };
        configure_fullscreen(x, model, fs, r, visible)?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn render_container<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    model: &mut Model,
    config: &Config,
    ws: usize,
    col: usize,
    row: usize,
    visible: bool,
) -> Result<()> {
    let font_h = d.font_height();
    let cell = &model.workspaces[ws].table[col][row];
    let rect = cell.rect;
    let mode = cell.mode;

    match mode {
        Mode::Default => {
            if let Some(win) = cell.stack_win {
                x.unmap(win)?;
            }

            let frames = default_mode_frames(
                &cell.clients,
                model.workspaces[ws].fullscreen,
                rect,
            );
            for (id, r) in frames {
                configure_client(x, model, id, r, visible, font_h)?;
                decorate_client(d, model, config, id)?;
            }
        }

        Mode::Stack | Mode::Tabbed => {
            let plan = deco_plan(mode, cell.stack_limit, &cell.clients, rect.w, font_h);
            let inner = stacked_inner_rect(rect, plan.lines, font_h);
            let focused = cell.focused;
            let clients = cell.clients.clone();

            let strip = Rect::new(rect.x, rect.y, rect.w, plan.lines * title_height(font_h));
            let win = match model.workspaces[ws].table[col][row].stack_win {
                Some(win) => win,
                None => {
                    let win = x.create_window(WinType::Decoration, strip)?;
                    model.workspaces[ws].table[col][row].stack_win = Some(win);
                    win
                }
            };
            x.set_client_config(win, &[ClientConfig::Position(strip)])?;
            if visible && !clients.is_empty() {
                x.map(win)?;
            } else {
                x.unmap(win)?;
            }

            for id in clients {
                // all clients share the inner rect; only the focused frame
                // stays mapped
                configure_client(x, model, id, inner, visible && focused == Some(id), font_h)?;
            }

            let colors: Vec<(Xid, Rect, ColorTriple)> = plan
                .cells
                .iter()
                .map(|&(id, r)| (id, r, client_colors(model, config, id)))
                .collect();
            for (id, r, colors) in colors {
                d.fill_rect(win, r, colors.background)?;
                if let Some(client) = model.client(id) {
                    let text = match client.title.source {
                        TitleSource::Utf8 => TextRun::Ucs2(&client.title.ucs2),
                        TitleSource::Legacy => TextRun::Legacy(client.title.value.as_bytes()),
                    };
                    d.draw_text(win, r.x + 3, r.y + 2, colors.text, colors.background, text)?;
                }
            }
        }
    }

    Ok(())
}

/// Move dock clients of one edge into place, returning the total height they
/// reserve.
fn place_docks<X: XConn>(
    x: &X,
    model: &mut Model,
    output: usize,
    bottom: bool,
    base_offset: u32,
) -> Result<u32> {
    let rect = model.outputs[output].rect;
    let docks: Vec<Xid> = model.outputs[output]
        .dock_clients
        .iter()
        .copied()
        .filter(|id| model.clients[id].dock_bottom == bottom)
        .collect();

    let mut offset = 0u32;
    for id in docks {
        let h = model.clients[&id].desired_height;
        let r = if bottom {
            Rect::new(
                rect.x,
                rect.y + rect.h.saturating_sub(base_offset + offset + h) as i32,
                rect.w,
                h,
            )
        } else {
            Rect::new(rect.x, rect.y + offset as i32, rect.w, h)
        };

        let client = model.clients.get_mut(&id).unwrap();
        if client.rect != r || client.force_reconfigure {
            client.rect = r;
            client.child_rect = Rect::new(0, 0, r.w, r.h);
            client.force_reconfigure = false;
            x.set_client_config(client.frame, &[ClientConfig::Position(r)])?;
            x.set_client_config(
                client.window,
                &[ClientConfig::Position(Rect::new(0, 0, r.w, r.h))],
            )?;
        }
        if !client.mapped {
            client.mapped = true;
            x.map(client.frame)?;
        }

        offset += h;
    }

    Ok(offset)
}

/// Draw the internal workspace bar along the bottom edge of an output.
fn render_bar<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    model: &mut Model,
    config: &Config,
    output: usize,
) -> Result<()> {
    let font_h = d.font_height();
    let bar_h = bar_height(font_h);
    let rect = model.outputs[output].rect;
    let bar_rect = Rect::new(rect.x, rect.y + (rect.h - bar_h) as i32, rect.w, bar_h);

    let win = match model.outputs[output].bar_win {
        Some(win) => win,
        None => {
            let win = x.create_window(WinType::Decoration, bar_rect)?;
            model.outputs[output].bar_win = Some(win);
            win
        }
    };
    x.set_client_config(win, &[ClientConfig::Position(bar_rect)])?;
    x.map(win)?;

    d.fill_rect(
        win,
        Rect::new(0, 0, bar_rect.w, bar_rect.h),
        config.bar_colors.unfocused.background,
    )?;

    let mut x_offset = 0i32;
    for ws in model.workspaces.iter() {
        if ws.is_empty() && model.outputs[output].current_workspace != Some(ws.num) {
            continue;
        }

        let colors = if model.outputs[output].current_workspace == Some(ws.num) {
            config.bar_colors.focused
        } else if ws.urgent {
            config.bar_colors.urgent
        } else {
            config.bar_colors.unfocused
        };

        let name_ucs2: Vec<u16> = ws.name.chars().map(|c| c as u32 as u16).collect();
        let text = TextRun::Ucs2(&name_ucs2);
        let text_w = d.text_width(text)?;
        let button = Rect::new(x_offset, 1, text_w + 10, bar_h - 2);

        d.fill_rect(win, button, colors.background)?;
        d.draw_text(win, x_offset + 5, 3, colors.text, colors.background, text)?;

        x_offset += button.w as i32 + 1;
    }

    Ok(())
}

/// Configure a client's frame and child to the given frame rect, mapping or
/// unmapping it to match `should_map`. A synthetic ConfigureNotify with the
/// absolute child geometry is sent whenever the geometry changed.
pub fn configure_client<X: XConn>(
    x: &X,
    model: &mut Model,
    id: Xid,
    frame_rect: Rect,
    should_map: bool,
    font_h: u32,
) -> Result<()> {
    let (frame, window, changed) = {
        let ws = model.clients[&id].workspace;
        let mode = match model.clients[&id].cell {
            Some((c, r)) => model.workspaces[ws].table[c][r].mode,
            None => Mode::Default,
        };
        let client = model.clients.get_mut(&id).unwrap();

        let inner = child_rect(
            mode,
            client.borderless,
            client.titlebar,
            frame_rect.w,
            frame_rect.h,
            font_h,
        );
        let inner = apply_size_hints(inner, client);

        let changed = client.rect != frame_rect
            || client.child_rect != inner
            || client.force_reconfigure;
        client.rect = frame_rect;
        client.child_rect = inner;
        client.force_reconfigure = false;

        (client.frame, client.window, changed)
    };

    if changed {
        trace!(%id, ?frame_rect, "configuring client");
        x.set_client_config(frame, &[ClientConfig::Position(frame_rect)])?;
        let child = model.clients[&id].child_rect;
        x.set_client_config(window, &[ClientConfig::Position(child)])?;

        let abs = Rect::new(
            frame_rect.x + child.x,
            frame_rect.y + child.y,
            child.w,
            child.h,
        );
        let border = model.clients[&id].border_width;
        x.send_configure_notify(window, abs, border)?;
    }

    let client = model.clients.get_mut(&id).unwrap();
    if should_map && !client.mapped {
        client.mapped = true;
        x.map(frame)?;
    } else if !should_map && client.mapped {
        client.mapped = false;
        x.unmap(frame)?;
    }

    Ok(())
}

fn configure_fullscreen<X: XConn>(
    x: &X,
    model: &mut Model,
    id: Xid,
    r: Rect,
    visible: bool,
) -> Result<()> {
    let client = model.clients.get_mut(&id).unwrap();
    if client.rect != r || client.force_reconfigure {
        client.rect = r;
        client.child_rect = Rect::new(0, 0, r.w, r.h);
        client.force_reconfigure = false;
        x.set_client_config(client.frame, &[ClientConfig::Position(r)])?;
        x.set_client_config(
            client.window,
            &[ClientConfig::Position(Rect::new(0, 0, r.w, r.h))],
        )?;
        x.send_configure_notify(client.window, r, client.border_width)?;
    }
    if visible && !client.mapped {
        client.mapped = true;
        x.map(client.frame)?;
    }

    Ok(())
}

/// Redraw the decorations that show a client's state: the frame itself for
/// plain containers, the whole decoration strip when the client sits in a
/// stacked or tabbed container.
pub fn redecorate<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    model: &Model,
    config: &Config,
    id: Xid,
) -> Result<()> {
    let client = match model.client(id) {
        Some(c) => c,
        None => return Ok(()),
    };

    if let Some((col, row)) = client.cell {
        let ws = client.workspace;
        let cell = &model.workspaces[ws].table[col][row];
        if matches!(cell.mode, Mode::Stack | Mode::Tabbed) {
            if let Some(win) = cell.stack_win {
                let font_h = d.font_height();
                let plan = deco_plan(cell.mode, cell.stack_limit, &cell.clients, cell.rect.w, font_h);
                for (cid, r) in plan.cells {
                    let colors = client_colors(model, config, cid);
                    d.fill_rect(win, r, colors.background)?;
                    if let Some(c) = model.client(cid) {
                        let text = match c.title.source {
                            TitleSource::Utf8 => TextRun::Ucs2(&c.title.ucs2),
                            TitleSource::Legacy => TextRun::Legacy(c.title.value.as_bytes()),
                        };
                        d.draw_text(win, r.x + 3, r.y + 2, colors.text, colors.background, text)?;
                    }
                }
            }
            return Ok(());
        }
    }

    decorate_client(d, model, config, id)
}

/// Repaint the decorations of a single client frame without moving anything.
pub fn decorate_client<D: Draw>(
    d: &D,
    model: &Model,
    config: &Config,
    id: Xid,
) -> Result<()> {
    let client = match model.client(id) {
        Some(c) => c,
        None => return Ok(()),
    };

    if client.borderless && client.titlebar == TitlebarPosition::Off {
        return Ok(());
    }

    let colors = client_colors(model, config, id);
    let r = client.rect;
    let font_h = d.font_height();

    d.fill_rect(
        client.frame,
        Rect::new(0, 0, r.w, r.h),
        colors.border,
    )?;

    if client.titlebar == TitlebarPosition::Top {
        let deco_h = title_height(font_h);
        d.fill_rect(
            client.frame,
            Rect::new(2, 2, r.w.saturating_sub(4), deco_h.saturating_sub(4)),
            colors.background,
        )?;

        let text = match client.title.source {
            TitleSource::Utf8 => TextRun::Ucs2(&client.title.ucs2),
            TitleSource::Legacy => TextRun::Legacy(client.title.value.as_bytes()),
        };
        d.draw_text(client.frame, 3, 2, colors.text, colors.background, text)?;
    }

    Ok(())
}

/// The color triple a client's decorations should use, per its current
/// state.
pub fn client_colors(model: &Model, config: &Config, id: Xid) -> ColorTriple {
    let client = match model.client(id) {
        Some(c) => c,
        None => return config.colors.unfocused,
    };
    let ws = &model.workspaces[client.workspace];

    if client.urgent {
        return config.colors.urgent;
    }

    if client.is_floating() {
        return if ws.last_focused() == Some(id) {
            config.colors.focused
        } else {
            config.colors.unfocused
        };
    }

    match client.cell {
        Some((col, row)) => {
            let cell = &ws.table[col][row];
            if cell.focused != Some(id) {
                config.colors.unfocused
            } else if (col, row) == (ws.current_col, ws.current_row)
                && model.current_workspace == client.workspace
            {
                config.colors.focused
            } else {
                config.colors.focused_inactive
            }
        }
        None => config.colors.unfocused,
    }
}

/// Apply the stacking order for a workspace: tiled frames lowest, then dock
/// clients, then a local fullscreen client, then the floating layer, with a
/// global fullscreen client above everything.
fn restack<X: XConn>(x: &X, model: &Model, ws: usize) -> Result<()> {
    let workspace = &model.workspaces[ws];
    let mut order: Vec<Xid> = Vec::new();

    for column in workspace.table.iter() {
        for cell in column.iter() {
            order.extend(cell.clients.iter().map(|id| model.clients[id].frame));
        }
    }

    if let Some(output) = workspace.output {
        order.extend(
            model.outputs[output]
                .dock_clients
                .iter()
                .map(|id| model.clients[id].frame),
        );
    }

    if let Some(fs) = workspace.fullscreen {
        if model.global_fullscreen != Some(fs) {
            order.push(model.clients[&fs].frame);
        }
    }

    order.extend(workspace.floating.iter().map(|id| model.clients[id].frame));

    if let Some(fs) = model.global_fullscreen {
        if let Some(client) = model.client(fs) {
            order.push(client.frame);
        }
    }

    let mut ids = order.into_iter();
    let mut previous = match ids.next() {
        Some(id) => id,
        None => return Ok(()),
    };

    for id in ids {
        x.set_client_config(id, &[ClientConfig::StackAbove(previous)])?;
        previous = id;
    }

    Ok(())
}
