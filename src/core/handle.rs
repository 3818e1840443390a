//! Event handlers: the X protocol state machine of the window manager.
use crate::{
    core::{commands, drag, outputs, State},
    draw::Draw,
    ipc::IpcEvent,
    layout::{self, render::configure_client, render_layout},
    pure::{
        client::{Client, FloatingState, TitleSource, TitlebarPosition},
        container::Mode,
        geometry::{Point, Rect},
        model::ClientPosition,
        Direction,
    },
    x::{
        event::{ButtonEvent, ClientMessage, ConfigureRequest, PointerChange, PropertyEvent},
        property::{StrutPartial, WmHints, WmNormalHints},
        Atom, ClientAttr, Prop, WmState, XConn, XConnExt, XEvent, AUTO_FLOAT_WINDOW_TYPES,
    },
    Result, Xid,
};
use crate::core::config::{AssignmentTarget, BorderStyle};
use std::str::FromStr;
use tracing::{debug, trace, warn};

// _NET_WM_STATE client message actions
const NET_WM_STATE_REMOVE: u32 = 0;
const NET_WM_STATE_ADD: u32 = 1;
const NET_WM_STATE_TOGGLE: u32 = 2;

/// Top level dispatch for a single X event.
pub fn handle_xevent<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    event: XEvent,
) -> Result<()> {
    use XEvent::*;

    match event {
        ClientMessage(m) => client_message(x, d, state, m),
        ConfigureNotify(e) if e.is_root => outputs::update_outputs(x, d, state),
        ConfigureNotify(_) => Ok(()),
        ConfigureRequest(e) => configure_request(x, d, state, e),
        Destroy(id) => unmanage_window(x, d, state, id, true),
        Enter(p) => enter_notify(x, d, state, p),
        Expose(id) => expose(x, d, state, id),
        KeyPress(key) => match state.keymap.command_for(key).map(String::from) {
            Some(cmd) => commands::run_command(x, d, state, &cmd),
            None => Ok(()),
        },
        ButtonPress(e) => button_press(x, d, state, e),
        ButtonRelease(_) => Ok(()),
        Motion(p) => check_crossing_output_boundary(state, p),
        MappingNotify => remap_bindings(x, state),
        MapRequest(id) => manage_window(x, d, state, id, false),
        PropertyNotify(e) => property_notify(x, d, state, e),
        RandrNotify => outputs::update_outputs(x, d, state),
        UnmapNotify(id) => unmanage_window(x, d, state, id, false),
    }
}

/// Establish window manager state for a new (or, during startup, existing)
/// client window.
pub fn manage_window<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    window: Xid,
    startup: bool,
) -> Result<()> {
    if state.model.clients.contains_key(&window) {
        trace!(%window, "already managed");
        return Ok(());
    }

    let attrs = x.get_window_attributes(window)?;
    if attrs.override_redirect {
        trace!(%window, "override_redirect is set, not managing");
        return Ok(());
    }
    if startup && attrs.map_state != crate::x::property::MapState::Viewable {
        trace!(%window, "unmapped at startup, not managing");
        return Ok(());
    }

    let geom = x.client_geometry(window)?;
    let frame = x.create_window(crate::x::WinType::Frame, geom)?;
    debug!(%window, %frame, "framing new client");

    x.add_to_save_set(window)?;
    x.set_client_attributes(window, &[ClientAttr::ClientEventMask])?;

    let mut client = Client::new(window, frame, state.model.current_workspace);
    client.rect = geom;

    apply_window_type(x, &mut client)?;
    if client.dock {
        read_strut(x, &mut client, geom.h)?;
    }
    read_title(x, &mut client)?;
    read_class(x, &mut client)?;
    read_normal_hints(x, &mut client, geom);
    if let Some(Prop::WmHints(hints)) = x.get_prop(window, Atom::WmHints.as_ref())? {
        client.urgent = hints.urgent();
    }

    // WM_CLIENT_LEADER: new windows of an application land next to their
    // leader and are flagged urgent so the user notices them
    let mut leader_cell = None;
    if let Some(Prop::Window(ids)) = x.get_prop(window, Atom::WmClientLeader.as_ref())? {
        if let Some(&leader) = ids.first() {
            if leader != window {
                client.leader = leader;
                if let Some(lc) = state.model.client(leader) {
                    if !lc.is_floating() && !lc.dock {
                        leader_cell = Some((lc.workspace, lc.cell));
                        client.urgent = true;
                    }
                }
            }
        }
    }

    if let Some(Prop::Window(ids)) = x.get_prop(window, Atom::WmTransientFor.as_ref())? {
        if !ids.is_empty() {
            debug!(%window, "transient window, floating");
            client.floating = FloatingState::AutoOn;
        }
    }

    // first matching assignment wins; workspace routing supersedes the
    // leader placement, so the leader's cell must not leak onto the
    // assigned workspace
    let mut target_ws = leader_cell
        .map(|(ws, _)| ws)
        .unwrap_or(state.model.current_workspace);
    if let Some(assignment) =
        state.config.assignment_for(&client.class_class, &client.title.value)
    {
        debug!(pattern = %assignment.pattern, "assignment matched");
        match assignment.target {
            AssignmentTarget::Workspace(ws) => {
                target_ws = ws;
                leader_cell = None;
            }
            AssignmentTarget::FloatingOnly => client.floating = FloatingState::AutoOn,
            AssignmentTarget::FloatingWith(ws) => {
                client.floating = FloatingState::AutoOn;
                target_ws = ws;
                leader_cell = None;
            }
        }
    }

    if !client.dock {
        state.model.workspace_get(target_ws);
        if state.model.workspaces[target_ws].auto_float {
            client.floating = FloatingState::AutoOn;
        }
    }

    apply_border_style(&mut client, state.config.default_border);
    client.workspace = target_ws;

    // reparent at the child offset the decoration flags produce
    let inner = layout::child_rect(
        Mode::Default,
        client.borderless,
        client.titlebar,
        geom.w,
        geom.h,
        d.font_height(),
    );
    // reparenting an already mapped window (startup adoption) makes the
    // server report an unmap we must not treat as a withdraw
    client.awaiting_useless_unmap = startup;
    x.reparent(window, frame, Point::new(inner.x, inner.y))?;

    let id = window;
    let is_floating = client.is_floating();
    let is_dock = client.dock;
    let is_urgent = client.urgent;
    state.model.clients.insert(id, client);

    if is_dock {
        let output = state
            .model
            .workspaces
            .get(target_ws)
            .and_then(|ws| ws.output)
            .or_else(|| state.model.first_active_output());
        if let Some(output) = output {
            state.model.outputs[output].dock_clients.push(id);
        }
    } else if is_floating {
        state.model.workspaces[target_ws].floating.push(id);
        state.model.workspaces[target_ws].focus_push(id);
        init_floating_rect(state, id, d.font_height());
    } else {
        let cell = leader_cell.and_then(|(_, cell)| cell);
        if cell.is_none() {
            // an occupied default-mode cell stays untouched: the new client
            // opens a fresh column instead (stacked and tabbed containers
            // keep collecting clients)
            let ws_ref = &state.model.workspaces[target_ws];
            let current = ws_ref.current_cell();
            if !current.is_empty() && current.mode == Mode::Default {
                let ws_ref = &mut state.model.workspaces[target_ws];
                ws_ref.expand_cols();
                ws_ref.current_col = ws_ref.cols() - 1;
            }
        }
        attach_to_cell(state, id, target_ws, cell);
        // a running fullscreen client keeps its position in the focus order
        match state.model.workspaces[target_ws].fullscreen {
            Some(fs) => state.model.workspaces[target_ws].focus_insert_after(id, fs),
            None => state.model.workspaces[target_ws].focus_push(id),
        }
    }

    if is_urgent {
        state.model.refresh_workspace_urgency(target_ws);
    }

    // initial fullscreen request via _NET_WM_STATE
    if !is_dock {
        if let Some(Prop::Atom(atoms)) = x.get_prop(id, Atom::NetWmState.as_ref())? {
            if atoms.iter().any(|a| a == Atom::NetWmStateFullscreen.as_ref()) {
                toggle_fullscreen(x, d, state, id, false)?;
            }
        }
    }

    x.set_wm_state(id, WmState::Normal)?;
    x.map(id)?;

    // if the frame ends up below an active fullscreen client, stack it there
    if let Some(fs) = state.model.workspaces[target_ws].fullscreen {
        if fs != id {
            let fs_frame = state.model.clients[&fs].frame;
            x.set_client_config(
                state.model.clients[&id].frame,
                &[crate::x::ClientConfig::StackBelow(fs_frame)],
            )?;
        }
    }

    render_layout(x, d, &mut state.model, &state.config)?;
    update_ewmh_client_list(x, state)?;

    let ws_visible = state.model.workspace_is_visible(target_ws);
    let fullscreen_running = state.model.workspaces[target_ws].fullscreen.is_some();
    if ws_visible && !is_dock && !fullscreen_running {
        set_focus(x, d, state, id, false)?;
    }

    Ok(())
}

/// Remove the window manager state for a client window that was unmapped or
/// destroyed.
pub fn unmanage_window<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    window: Xid,
    destroyed: bool,
) -> Result<()> {
    let Some(client) = state.model.client_mut(window) else {
        // unmap of one of our own frames or an unmanaged window
        return Ok(());
    };

    if !destroyed && client.awaiting_useless_unmap {
        trace!(%window, "absorbing self inflicted unmap");
        client.awaiting_useless_unmap = false;
        return Ok(());
    }

    debug!(%window, "unmanaging client");
    let removed = match state.model.remove_client(window) {
        Some(c) => c,
        None => return Ok(()),
    };
    let ws = removed.workspace;

    if !destroyed {
        x.set_client_attributes(window, &[ClientAttr::NoEventMask])?;
        x.reparent(window, x.root(), Point::from(removed.rect))?;
        x.set_wm_state(window, WmState::Withdrawn)?;
        x.set_client_attributes(window, &[ClientAttr::ClientEventMask])?;
    }
    x.destroy_window(removed.frame)?;

    if removed.dock {
        render_layout(x, d, &mut state.model, &state.config)?;
        update_ewmh_client_list(x, state)?;
        return Ok(());
    }

    if state.model.global_fullscreen == Some(window) {
        state.model.global_fullscreen = None;
    }

    if state.model.workspaces[ws].is_empty() && !state.model.workspace_is_visible(ws) {
        debug!(workspace = ws + 1, "workspace empty, unassigning output");
        state.model.workspaces[ws].output = None;
        state.push_ipc_event(IpcEvent::workspace_change("empty"));
    }

    state.model.workspaces[ws].cleanup_table();
    state.model.workspaces[ws].fix_colrowspan();
    state.model.sync_client_cells(ws);
    state.model.refresh_workspace_urgency(ws);

    render_layout(x, d, &mut state.model, &state.config)?;
    update_ewmh_client_list(x, state)?;

    if state.model.current_workspace == ws {
        match state.model.workspaces[ws].last_focused() {
            Some(next) => set_focus(x, d, state, next, false)?,
            None => {
                x.set_input_focus(state.root)?;
                x.set_prop(
                    state.root,
                    Atom::NetActiveWindow.as_ref(),
                    Prop::Window(vec![Xid(0)]),
                )?;
            }
        }
    }

    Ok(())
}

/// Arbitrate a ConfigureRequest per the client's current role.
pub fn configure_request<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    ev: ConfigureRequest,
) -> Result<()> {
    let Some(id) = state.model.client_for_window(ev.id) else {
        trace!(id = %ev.id, "passing through configure request for unmanaged window");
        return x.configure_unmanaged(&ev);
    };

    let client = state.model.clients[&id].clone();

    if client.fullscreen {
        let r = if state.model.global_fullscreen == Some(id) {
            state.model.combined_output_rect()
        } else {
            state.model.workspaces[client.workspace].rect
        };
        return x.send_configure_notify(id, r, client.border_width);
    }

    if client.dock {
        if let Some(h) = ev.h {
            debug!(%id, h, "dock height change");
            state.model.clients.get_mut(&id).unwrap().desired_height = h;
            render_layout(x, d, &mut state.model, &state.config)?;
        }
        return Ok(());
    }

    if client.is_floating() {
        // the client requests child coordinates; translate to the frame
        let requested = ev.applied_to(Rect::new(
            client.rect.x + client.child_rect.x,
            client.rect.y + client.child_rect.y,
            client.child_rect.w,
            client.child_rect.h,
        ));
        let frame_rect = Rect::new(
            requested.x - client.child_rect.x,
            requested.y - client.child_rect.y,
            requested.w + (client.rect.w - client.child_rect.w),
            requested.h + (client.rect.h - client.child_rect.h),
        );

        let c = state.model.clients.get_mut(&id).unwrap();
        c.floating_rect = Some(frame_rect);
        let visible = state.model.workspace_is_visible(client.workspace)
            && !state.model.workspaces[client.workspace].floating_hidden;
        configure_client(x, &mut state.model, id, frame_rect, visible, d.font_height())?;
        x.flush();
        return Ok(());
    }

    // tiled clients don't get a say: answer with the current geometry
    let abs = Rect::new(
        client.rect.x + client.child_rect.x,
        client.rect.y + client.child_rect.y,
        client.child_rect.w,
        client.child_rect.h,
    );
    x.send_configure_notify(id, abs, client.border_width)
}

/// Route a property change on a client window.
pub fn property_notify<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    ev: PropertyEvent,
) -> Result<()> {
    if ev.is_root {
        return Ok(());
    }
    let Some(id) = state.model.client_for_window(ev.id) else {
        return Ok(());
    };

    match Atom::from_str(&ev.atom) {
        Ok(Atom::NetWmName) | Ok(Atom::WmName) => {
            let client = state.model.clients.get_mut(&id).unwrap();
            read_title(x, client)?;
            layout::render::redecorate(x, d, &state.model, &state.config, id)?;
        }

        Ok(Atom::WmClass) => {
            let client = state.model.clients.get_mut(&id).unwrap();
            read_class(x, client)?;
        }

        Ok(Atom::WmHints) => {
            if let Some(Prop::WmHints(hints)) = x.get_prop(id, Atom::WmHints.as_ref())? {
                urgency_hint_changed(x, d, state, id, &hints)?;
            }
        }

        Ok(Atom::WmNormalHints) => {
            let geom = state.model.clients[&id].child_rect;
            let client = state.model.clients.get_mut(&id).unwrap();
            read_normal_hints(x, client, geom);
            render_layout(x, d, &mut state.model, &state.config)?;
        }

        Ok(Atom::NetWmStrutPartial) => {
            if state.model.clients[&id].dock {
                let h = state.model.clients[&id].rect.h;
                let client = state.model.clients.get_mut(&id).unwrap();
                read_strut(x, client, h)?;
                render_layout(x, d, &mut state.model, &state.config)?;
            }
        }

        _ => trace!(atom = %ev.atom, "ignoring property change"),
    }

    Ok(())
}

/// WM_HINTS changed: apply the urgency bit. The currently focused client can
/// never be urgent.
fn urgency_hint_changed<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    id: Xid,
    hints: &WmHints,
) -> Result<()> {
    let focused = state.model.focused_client() == Some(id)
        && state.model.workspace_is_visible(state.model.clients[&id].workspace);
    let urgent = hints.urgent() && !focused;

    let client = state.model.clients.get_mut(&id).unwrap();
    if client.urgent == urgent {
        return Ok(());
    }
    client.urgent = urgent;
    let ws = client.workspace;
    debug!(%id, urgent, "urgency changed");

    state.model.refresh_workspace_urgency(ws);
    layout::render::redecorate(x, d, &state.model, &state.config, id)?;
    render_layout(x, d, &mut state.model, &state.config)?;

    Ok(())
}

/// Handle a ClientMessage: only _NET_WM_STATE fullscreen requests are
/// honoured.
pub fn client_message<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    msg: ClientMessage,
) -> Result<()> {
    if msg.dtype != Atom::NetWmState.as_ref() {
        trace!(dtype = %msg.dtype, "ignoring client message");
        return Ok(());
    }
    let Some(id) = state.model.client_for_window(msg.id) else {
        return Ok(());
    };

    let fullscreen_atom = Atom::NetWmStateFullscreen.as_ref();
    let mut names = Vec::with_capacity(2);
    for &a in msg.data[1..3].iter().filter(|&&a| a != 0) {
        if let Some(name) = x.atom_name(a)? {
            names.push(name);
        }
    }
    if !names.iter().any(|n| n == fullscreen_atom) {
        return Ok(());
    }

    let currently = state.model.clients[&id].fullscreen;
    let wanted = match msg.data[0] {
        NET_WM_STATE_REMOVE => false,
        NET_WM_STATE_ADD => true,
        NET_WM_STATE_TOGGLE => !currently,
        other => {
            warn!(other, "invalid _NET_WM_STATE action");
            return Ok(());
        }
    };

    if wanted != currently {
        toggle_fullscreen(x, d, state, id, false)?;
    }

    Ok(())
}

/// Toggle fullscreen for a client. Requests for a workspace that already has
/// a different fullscreen client are rejected.
pub fn toggle_fullscreen<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    id: Xid,
    global: bool,
) -> Result<()> {
    let ws = state.model.clients[&id].workspace;

    if !state.model.clients[&id].fullscreen {
        if state.model.workspaces[ws].fullscreen.is_some() {
            warn!(%id, "workspace already has a fullscreen client, rejecting");
            return Ok(());
        }

        debug!(%id, global, "entering fullscreen");
        state.model.workspaces[ws].fullscreen = Some(id);
        if global {
            state.model.global_fullscreen = Some(id);
        }
        let client = state.model.clients.get_mut(&id).unwrap();
        client.fullscreen = true;
        client.force_reconfigure = true;
        x.set_prop(
            id,
            Atom::NetWmState.as_ref(),
            Prop::Atom(vec![Atom::NetWmStateFullscreen.as_ref().to_string()]),
        )?;
    } else {
        debug!(%id, "leaving fullscreen");
        if state.model.workspaces[ws].fullscreen == Some(id) {
            state.model.workspaces[ws].fullscreen = None;
        }
        if state.model.global_fullscreen == Some(id) {
            state.model.global_fullscreen = None;
        }
        let client = state.model.clients.get_mut(&id).unwrap();
        client.fullscreen = false;
        client.force_reconfigure = true;
        if client.is_floating() {
            if let Some(r) = client.floating_rect {
                client.rect = r;
            }
        }
        x.set_prop(id, Atom::NetWmState.as_ref(), Prop::Atom(vec![]))?;
    }

    render_layout(x, d, &mut state.model, &state.config)?;
    if state.model.workspace_is_visible(ws) {
        set_focus(x, d, state, id, false)?;
    }

    Ok(())
}

/// Toggle a client between the tiled and floating layers.
pub fn toggle_floating<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    id: Xid,
) -> Result<()> {
    if state.model.clients[&id].dock {
        return Ok(());
    }
    if state.model.clients[&id].fullscreen {
        toggle_fullscreen(x, d, state, id, false)?;
    }

    let ws = state.model.clients[&id].workspace;
    let was_floating = state.model.clients[&id].is_floating();

    if was_floating {
        debug!(%id, "floating -> tiled");
        let rect = state.model.clients[&id].rect;
        state.model.workspaces[ws].floating.retain(|&c| c != id);
        {
            let client = state.model.clients.get_mut(&id).unwrap();
            client.floating_rect = Some(rect);
            client.toggle_floating();
            client.force_reconfigure = true;
        }
        state.model.attach_tiled(id, ws);
    } else {
        debug!(%id, "tiled -> floating");
        state.model.detach_tiled(id);
        state.model.workspaces[ws].floating.push(id);
        init_floating_rect(state, id, d.font_height());
        let client = state.model.clients.get_mut(&id).unwrap();
        client.toggle_floating();
        client.force_reconfigure = true;
        client.rect = client.floating_rect.expect("initialised above");
    }

    state.model.workspaces[ws].cleanup_table();
    state.model.workspaces[ws].fix_colrowspan();
    state.model.sync_client_cells(ws);
    render_layout(x, d, &mut state.model, &state.config)?;
    set_focus(x, d, state, id, false)?;

    Ok(())
}

/// Update the focus stacks and input focus for `id`, redecorating the old
/// and new focus and optionally warping the pointer into the client.
pub fn set_focus<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    id: Xid,
    warp_pointer: bool,
) -> Result<()> {
    let Some(client) = state.model.client(id) else {
        return Err(crate::Error::UnknownClient(id));
    };
    if client.dock {
        return Ok(());
    }

    let ws = client.workspace;
    let cell = client.cell;
    let window = client.window;
    let rect = client.rect;
    let frame = client.frame;
    let floating = client.is_floating();

    if !state.model.workspace_is_visible(ws) {
        trace!(%id, "not focusing client on invisible workspace");
        return Ok(());
    }

    let old = state.model.workspaces[ws].last_focused();
    state.model.current_workspace = ws;
    state.model.workspaces[ws].focus_push(id);

    if let Some((col, row)) = cell {
        state.model.workspaces[ws].current_col = col;
        state.model.workspaces[ws].current_row = row;
        state.model.workspaces[ws].table[col][row].focused = Some(id);
    } else if floating {
        state.model.workspaces[ws].raise_floating(id);
        x.set_client_config(frame, &[crate::x::ClientConfig::StackTop])?;
    }

    // the focused client can never be urgent
    if state.model.clients[&id].urgent {
        state.model.clients.get_mut(&id).unwrap().urgent = false;
        state.model.refresh_workspace_urgency(ws);
    }

    x.set_input_focus(window)?;
    x.set_prop(
        state.root,
        Atom::NetActiveWindow.as_ref(),
        Prop::Window(vec![window]),
    )?;

    if let Some(old) = old.filter(|&o| o != id) {
        layout::render::redecorate(x, d, &state.model, &state.config, old)?;
    }
    layout::render::redecorate(x, d, &state.model, &state.config, id)?;

    if warp_pointer {
        x.warp_pointer_to_window(frame, rect)?;
    }
    x.flush();

    Ok(())
}

/// Switch the visible workspace (0-based), creating it and intermediates on
/// demand. Crossing outputs moves input focus and warps the pointer.
pub fn workspace_show<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    num: usize,
) -> Result<()> {
    let created = num >= state.model.workspaces.len();
    state.model.workspace_get(num);

    let current_output = state.model.workspaces[state.model.current_workspace].output;
    let target_output = match state.model.workspaces[num].output.or(current_output) {
        Some(o) => o,
        None => match state.model.first_active_output() {
            Some(o) => o,
            None => return Err(crate::Error::NoOutputs),
        },
    };

    if state.model.workspaces[num].output.is_none() {
        let rect = state.model.outputs[target_output].rect;
        let ws = &mut state.model.workspaces[num];
        ws.output = Some(target_output);
        ws.rect = rect;
    }
    if created {
        state.push_ipc_event(IpcEvent::workspace_change("init"));
    }

    let crossing = current_output != Some(target_output);
    let old_shown = state.model.outputs[target_output].current_workspace;

    if old_shown == Some(num) && state.model.current_workspace == num && !created {
        return Ok(());
    }

    debug!(workspace = num + 1, crossing, "showing workspace");

    if let Some(old) = old_shown.filter(|&o| o != num) {
        hide_workspace(x, state, old);
    }

    state.model.outputs[target_output].current_workspace = Some(num);
    state.model.current_workspace = num;

    x.set_prop(
        state.root,
        Atom::NetCurrentDesktop.as_ref(),
        Prop::Cardinal(vec![num as u32]),
    )?;

    render_layout(x, d, &mut state.model, &state.config)?;

    match state.model.workspaces[num].last_focused() {
        Some(id) => set_focus(x, d, state, id, crossing)?,
        None => {
            x.set_input_focus(state.root)?;
            if crossing {
                let rect = state.model.outputs[target_output].rect;
                x.warp_pointer_to_rect(rect)?;
            }
        }
    }

    state.push_ipc_event(IpcEvent::workspace_change("focus"));
    x.flush();

    Ok(())
}

/// Unmap every frame of a workspace that is being hidden.
pub fn hide_workspace<X: XConn>(x: &X, state: &mut State, ws: usize) {
    let ids: Vec<Xid> = state.model.workspaces[ws].focus_stack.clone();
    for id in ids {
        let client = state.model.clients.get_mut(&id).unwrap();
        if client.mapped {
            client.mapped = false;
            let _ = x.unmap(client.frame);
        }
    }

    for column in state.model.workspaces[ws].table.iter() {
        for cell in column.iter() {
            if let Some(win) = cell.stack_win {
                let _ = x.unmap(win);
            }
        }
    }
}

/// Focus follows mouse, and entering a window on another output moves the
/// current workspace there.
fn enter_notify<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    p: PointerChange,
) -> Result<()> {
    check_crossing_output_boundary(state, p.abs)?;

    if let Some(id) = state.model.client_for_window(p.id) {
        if state.model.focused_client() != Some(id) {
            set_focus(x, d, state, id, false)?;
        }
    }

    Ok(())
}

/// Moving the pointer onto another output changes the current workspace
/// without warping.
fn check_crossing_output_boundary(state: &mut State, p: Point) -> Result<()> {
    if let Some(output) = state.model.output_containing(p) {
        if let Some(ws) = state.model.outputs[output].current_workspace {
            if state.model.current_workspace != ws {
                debug!(output = %state.model.outputs[output].name, "pointer crossed output boundary");
                state.model.current_workspace = ws;
            }
        }
    }

    Ok(())
}

fn expose<X: XConn, D: Draw>(x: &X, d: &D, state: &mut State, id: Xid) -> Result<()> {
    if let Some(client) = state.model.client_for_window(id) {
        return layout::render::redecorate(x, d, &state.model, &state.config, client);
    }

    // stack windows and bars repaint with their whole output
    render_layout(x, d, &mut state.model, &state.config)
}

/// Click handling: focus (and raise) on click, drags via the floating
/// modifier, border drags for tiled resize and title selection in stack /
/// tab decorations.
fn button_press<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    ev: ButtonEvent,
) -> Result<()> {
    // a click in a stack/tab decoration focuses the selected title
    if let Some((ws, col, row)) = stack_win_owner(state, ev.id) {
        let cell = &state.model.workspaces[ws].table[col][row];
        let plan = layout::deco_plan(
            cell.mode,
            cell.stack_limit,
            &cell.clients,
            cell.rect.w,
            d.font_height(),
        );
        if let Some(&(id, _)) = plan
            .cells
            .iter()
            .find(|(_, r)| r.contains_point(ev.relative))
        {
            return set_focus(x, d, state, id, false);
        }
        return Ok(());
    }

    if let Some(output) = bar_owner(state, ev.id) {
        return bar_click(x, d, state, output, ev.relative);
    }

    let Some(id) = state.model.client_for_window(ev.id) else {
        return Ok(());
    };

    set_focus(x, d, state, id, false)?;

    let client = state.model.clients[&id].clone();
    let modifier_held = ev.state & state.config.floating_modifier != 0;

    if client.is_floating() {
        if modifier_held && ev.button == 1 {
            return drag::move_floating(x, d, state, id, ev.abs);
        }
        if modifier_held && ev.button == 3 {
            return drag::resize_floating(x, d, state, id, ev.abs);
        }
        // titlebar drag without the modifier
        if ev.button == 1 && ev.relative.y < layout::title_height(d.font_height()) as i32 {
            return drag::move_floating(x, d, state, id, ev.abs);
        }
        return Ok(());
    }

    if ev.button == 1 {
        if let Some(border) = border_hit(&client, ev.relative) {
            return drag::resize_tiled(x, d, state, id, border, ev.abs);
        }
    }

    Ok(())
}

fn stack_win_owner(state: &State, id: Xid) -> Option<(usize, usize, usize)> {
    for ws in state.model.workspaces.iter() {
        for column in ws.table.iter() {
            for cell in column.iter() {
                if cell.stack_win == Some(id) {
                    return Some((ws.num, cell.col, cell.row));
                }
            }
        }
    }

    None
}

fn bar_owner(state: &State, id: Xid) -> Option<usize> {
    state.model.outputs.iter().position(|o| o.bar_win == Some(id))
}

// Clicking a workspace button in the bar shows that workspace.
fn bar_click<X: XConn, D: Draw>(
    x: &X,
    d: &D,
    state: &mut State,
    output: usize,
    p: Point,
) -> Result<()> {
    let mut x_offset = 0i32;
    let targets: Vec<usize> = state
        .model
        .workspaces
        .iter()
        .filter(|ws| {
            !ws.is_empty() || state.model.outputs[output].current_workspace == Some(ws.num)
        })
        .map(|ws| ws.num)
        .collect();

    for num in targets {
        let name_ucs2: Vec<u16> = state.model.workspaces[num]
            .name
            .chars()
            .map(|c| c as u32 as u16)
            .collect();
        let w = d.text_width(crate::draw::TextRun::Ucs2(&name_ucs2))? + 10;
        if p.x >= x_offset && p.x < x_offset + w as i32 {
            return workspace_show(x, d, state, num);
        }
        x_offset += w as i32 + 1;
    }

    Ok(())
}

/// Which border of its frame a click landed on, if any.
fn border_hit(client: &Client, p: Point) -> Option<Direction> {
    let r = client.rect;

    if p.x < 2 {
        Some(Direction::Left)
    } else if p.x >= r.w as i32 - 2 {
        Some(Direction::Right)
    } else if p.y >= r.h as i32 - 2 {
        Some(Direction::Down)
    } else {
        None
    }
}

fn remap_bindings<X: XConn>(x: &X, state: &mut State) -> Result<()> {
    debug!("keyboard mapping changed, re-translating bindings");
    let bindings = state
        .config
        .bindings_for_mode(&state.binding_mode)
        .to_vec();
    state.keymap = crate::core::bindings::regrab(x, &bindings)?;

    Ok(())
}

/// Write the EWMH root window properties advertising our supported hints
/// and desktops.
pub fn set_ewmh_root_properties<X: XConn>(x: &X, state: &State) -> Result<()> {
    let root = state.root;

    x.set_prop(
        root,
        Atom::NetSupported.as_ref(),
        Prop::Atom(
            crate::x::EWMH_SUPPORTED_ATOMS
                .iter()
                .map(|a| a.as_ref().to_string())
                .collect(),
        ),
    )?;

    update_ewmh_desktops(x, state)?;

    // no single workarea can describe a table of containers: delete the
    // property so desktop environments don't act on a stale value
    x.delete_prop(root, Atom::NetWorkarea.as_ref())?;

    Ok(())
}

/// Refresh _NET_NUMBER_OF_DESKTOPS, _NET_DESKTOP_NAMES, _NET_DESKTOP_VIEWPORT
/// and _NET_CURRENT_DESKTOP.
pub fn update_ewmh_desktops<X: XConn>(x: &X, state: &State) -> Result<()> {
    let root = state.root;
    let names: Vec<String> = state
        .model
        .workspaces
        .iter()
        .map(|w| w.name.clone())
        .collect();
    let viewports: Vec<u32> = state
        .model
        .workspaces
        .iter()
        .flat_map(|w| [w.rect.x.max(0) as u32, w.rect.y.max(0) as u32])
        .collect();

    x.set_prop(
        root,
        Atom::NetNumberOfDesktops.as_ref(),
        Prop::Cardinal(vec![names.len() as u32]),
    )?;
    x.set_prop(root, Atom::NetDesktopNames.as_ref(), Prop::UTF8String(names))?;
    x.set_prop(
        root,
        Atom::NetDesktopViewport.as_ref(),
        Prop::Cardinal(viewports),
    )?;
    x.set_prop(
        root,
        Atom::NetCurrentDesktop.as_ref(),
        Prop::Cardinal(vec![state.model.current_workspace as u32]),
    )?;

    Ok(())
}

/// Refresh _NET_CLIENT_LIST and _NET_CLIENT_LIST_STACKING.
pub fn update_ewmh_client_list<X: XConn>(x: &X, state: &State) -> Result<()> {
    let clients: Vec<Xid> = state.model.clients.keys().copied().collect();

    x.set_prop(
        state.root,
        Atom::NetClientList.as_ref(),
        Prop::Window(clients.clone()),
    )?;
    x.set_prop(
        state.root,
        Atom::NetClientListStacking.as_ref(),
        Prop::Window(clients),
    )?;

    Ok(())
}

/// Reparent all managed children back to the root window. Used on graceful
/// exit and restart so clients survive us.
pub fn restore_all_clients<X: XConn>(x: &X, state: &mut State) -> Result<()> {
    let ids: Vec<Xid> = state.model.clients.keys().copied().collect();
    for id in ids {
        if let Some(client) = state.model.remove_client(id) {
            let _ = x.set_client_attributes(id, &[ClientAttr::NoEventMask]);
            let _ = x.reparent(id, x.root(), Point::from(client.rect));
            let _ = x.set_wm_state(id, WmState::Withdrawn);
            let _ = x.destroy_window(client.frame);
        }
    }
    x.flush();

    Ok(())
}

// --- manage helpers ---------------------------------------------------------

fn apply_window_type<X: XConn>(x: &X, client: &mut Client) -> Result<()> {
    let Some(Prop::Atom(types)) = x.get_prop(client.window, Atom::NetWmWindowType.as_ref())?
    else {
        return Ok(());
    };

    for ty in types.iter() {
        if ty == Atom::NetWindowTypeDock.as_ref() {
            debug!(id = %client.window, "dock client");
            client.dock = true;
            client.borderless = true;
            client.titlebar = TitlebarPosition::Off;
            return Ok(());
        }
        if AUTO_FLOAT_WINDOW_TYPES.iter().any(|a| ty == a.as_ref()) {
            debug!(id = %client.window, %ty, "auto floating window type");
            client.floating = FloatingState::AutoOn;
            return Ok(());
        }
    }

    Ok(())
}

fn read_strut<X: XConn>(x: &X, client: &mut Client, fallback_height: u32) -> Result<()> {
    let strut = match x.get_prop(client.window, Atom::NetWmStrutPartial.as_ref())? {
        Some(Prop::Cardinal(raw)) => StrutPartial::from_bytes(&raw).unwrap_or_default(),
        _ => StrutPartial::default(),
    };

    client.dock_bottom = strut.bottom > 0;
    client.desired_height = if strut.bottom > 0 {
        strut.bottom
    } else if strut.top > 0 {
        strut.top
    } else {
        fallback_height
    };

    Ok(())
}

fn read_title<X: XConn>(x: &X, client: &mut Client) -> Result<()> {
    if let Some(Prop::UTF8String(mut strs)) = x.get_prop(client.window, Atom::NetWmName.as_ref())?
    {
        if !strs.is_empty() {
            client.title.update(TitleSource::Utf8, strs.remove(0));
            return Ok(());
        }
    }

    match x.get_prop(client.window, Atom::WmName.as_ref())? {
        Some(Prop::Latin1Bytes(bytes)) => {
            client
                .title
                .update(TitleSource::Legacy, String::from_utf8_lossy(&bytes).to_string());
        }
        Some(Prop::UTF8String(mut strs)) if !strs.is_empty() => {
            client.title.update(TitleSource::Legacy, strs.remove(0));
        }
        _ => (),
    }

    Ok(())
}

fn read_class<X: XConn>(x: &X, client: &mut Client) -> Result<()> {
    if let Some(Prop::UTF8String(strs)) = x.get_prop(client.window, Atom::WmClass.as_ref())? {
        if let Some(instance) = strs.first() {
            client.class_instance = instance.clone();
        }
        if let Some(class) = strs.get(1) {
            client.class_class = class.clone();
        }
    }

    Ok(())
}

fn read_normal_hints<X: XConn>(x: &X, client: &mut Client, geom: Rect) {
    let hints = match x.get_prop(client.window, Atom::WmNormalHints.as_ref()) {
        Ok(Some(Prop::WmNormalHints(hints))) => hints,
        _ => WmNormalHints::default(),
    };

    client.size_hints.min_width = hints.min_size.0;
    client.size_hints.min_height = hints.min_size.1;
    client.size_hints.base_width = hints.base_size.0;
    client.size_hints.base_height = hints.base_size.1;
    client.size_hints.width_increment = hints.resize_inc.0;
    client.size_hints.height_increment = hints.resize_inc.1;

    match hints.proportional_hint(geom.w, geom.h) {
        Some((num, den)) => {
            client.proportional_width = num;
            client.proportional_height = den;
        }
        None => {
            client.proportional_width = 0;
            client.proportional_height = 0;
        }
    }
}

fn apply_border_style(client: &mut Client, style: BorderStyle) {
    if client.dock {
        return;
    }

    match style {
        BorderStyle::Normal => {
            client.borderless = false;
            client.titlebar = TitlebarPosition::Top;
        }
        BorderStyle::OnePixel => {
            client.borderless = false;
            client.titlebar = TitlebarPosition::Off;
        }
        BorderStyle::Borderless => {
            client.borderless = true;
            client.titlebar = TitlebarPosition::Off;
        }
    }
}

fn attach_to_cell(state: &mut State, id: Xid, ws: usize, cell: Option<(usize, usize)>) {
    match cell {
        Some((col, row)) if state.model.workspaces[ws].cell_exists(col as isize, row as isize) => {
            state.model.workspaces[ws].table[col][row].insert_client(id);
            let client = state.model.clients.get_mut(&id).unwrap();
            client.cell = Some((col, row));
            client.workspace = ws;
        }
        _ => state.model.attach_tiled(id, ws),
    }
}

/// First-float placement: centered on the leader window when one exists,
/// otherwise centered on the workspace.
fn init_floating_rect(state: &mut State, id: Xid, font_h: u32) {
    let client = &state.model.clients[&id];
    if client.floating_rect.is_some() {
        let r = client.floating_rect.unwrap();
        state.model.clients.get_mut(&id).unwrap().rect = r;
        return;
    }

    let ws_rect = state.model.workspaces[client.workspace].rect;
    let leader_rect = state
        .model
        .client(client.leader)
        .filter(|l| l.workspace == client.workspace)
        .map(|l| l.rect);

    let deco = layout::title_height(font_h);
    let size = Rect::new(
        0,
        0,
        (client.rect.w + 4).min(ws_rect.w.max(4)),
        (client.rect.h + deco + 2).min(ws_rect.h.max(deco + 2)),
    );
    let enclosing = leader_rect.unwrap_or(ws_rect);
    let r = size
        .centered_in(&enclosing)
        .or_else(|| size.centered_in(&ws_rect))
        .unwrap_or(size);

    let client = state.model.clients.get_mut(&id).unwrap();
    client.floating_rect = Some(r);
    client.rect = r;
}

/// Resolve a client's position to its container, if tiled.
pub fn container_of(state: &State, id: Xid) -> Option<(usize, usize, usize)> {
    match state.model.position_of(id) {
        Some(ClientPosition::Tiled { ws, col, row }) => Some((ws, col, row)),
        _ => None,
    }
}
