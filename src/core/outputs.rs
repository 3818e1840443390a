//! Multi-output discovery and reconciliation via RandR.
use crate::{
    core::{handle, State},
    draw::Draw,
    ipc::IpcEvent,
    layout::render_layout,
    x::XConn,
    Result,
};
use tracing::{debug, info, warn};

/// Re-query RandR and reconcile the model with the reported outputs:
/// new outputs are attached to workspaces, vanished or cloned outputs hand
/// their workspaces to the first active output and mode changes force a
/// reconfigure of every hosted client.
pub fn update_outputs<X: XConn, D: Draw>(x: &X, d: &D, state: &mut State) -> Result<()> {
    let discovered = x.query_outputs()?;
    debug!(n = discovered.len(), "discovered outputs");

    // merge the discovery results over the known output list
    for disc in discovered.iter() {
        match state
            .model
            .outputs
            .iter_mut()
            .find(|o| o.name == disc.name)
        {
            None => {
                info!(name = %disc.name, rect = ?disc.rect, "new output");
                state.model.outputs.push(disc.clone());
            }
            Some(existing) => {
                if !disc.active {
                    if existing.active {
                        info!(name = %existing.name, "output lost its CRTC");
                        existing.to_be_disabled = true;
                    }
                } else if !existing.active {
                    info!(name = %existing.name, "output re-enabled");
                    existing.active = true;
                    existing.rect = disc.rect;
                } else if existing.rect != disc.rect {
                    info!(name = %existing.name, old = ?existing.rect, new = ?disc.rect, "output mode changed");
                    existing.rect = disc.rect;
                    existing.changed = true;
                }
            }
        }
    }

    // outputs that RandR no longer reports at all
    for output in state.model.outputs.iter_mut() {
        if output.active && !discovered.iter().any(|o| o.name == output.name) {
            info!(name = %output.name, "output vanished");
            output.to_be_disabled = true;
        }
    }

    detect_clones(state);
    reconcile(x, state)?;

    render_layout(x, d, &mut state.model, &state.config)?;
    handle::update_ewmh_desktops(x, state)?;

    Ok(())
}

// Two active outputs with the same top left corner are clones: reduce both
// to the minimum common size and keep only the first one driving
// workspaces.
fn detect_clones(state: &mut State) {
    let n = state.model.outputs.len();

    for a in 0..n {
        for b in (a + 1)..n {
            let (oa, ob) = (&state.model.outputs[a], &state.model.outputs[b]);
            if !oa.active || !ob.active || oa.to_be_disabled || ob.to_be_disabled {
                continue;
            }
            if (oa.rect.x, oa.rect.y) != (ob.rect.x, ob.rect.y) {
                continue;
            }

            let w = oa.rect.w.min(ob.rect.w);
            let h = oa.rect.h.min(ob.rect.h);
            debug!(a = %oa.name, b = %ob.name, w, h, "clone detected");

            let changed_a = state.model.outputs[a].rect.w != w
                || state.model.outputs[a].rect.h != h;
            state.model.outputs[a].rect.w = w;
            state.model.outputs[a].rect.h = h;
            state.model.outputs[a].changed |= changed_a;
            state.model.outputs[b].rect.w = w;
            state.model.outputs[b].rect.h = h;
            state.model.outputs[b].to_be_disabled = true;
        }
    }
}

fn reconcile<X: XConn>(x: &X, state: &mut State) -> Result<()> {

    // disabled outputs hand everything to the first surviving output
    let to_disable: Vec<usize> = state
        .model
        .outputs
        .iter()
        .enumerate()
        .filter(|(_, o)| o.to_be_disabled)
        .map(|(i, _)| i)
        .collect();

    for idx in to_disable {
        let fallback = state
            .model
            .outputs
            .iter()
            .position(|o| o.active && !o.to_be_disabled);

        let Some(fallback) = fallback else {
            warn!("no active output left to adopt workspaces");
            state.model.outputs[idx].active = false;
            state.model.outputs[idx].to_be_disabled = false;
            continue;
        };

        info!(
            from = %state.model.outputs[idx].name,
            to = %state.model.outputs[fallback].name,
            "reassigning workspaces of disabled output"
        );

        let fallback_rect = state.model.outputs[fallback].rect;
        for ws in 0..state.model.workspaces.len() {
            if state.model.workspaces[ws].output == Some(idx) {
                state.model.workspaces[ws].output = Some(fallback);
                state.model.workspaces[ws].rect = fallback_rect;
                for id in state.model.workspaces[ws].focus_stack.clone() {
                    state.model.clients.get_mut(&id).unwrap().force_reconfigure = true;
                }
            }
        }

        let docks = std::mem::take(&mut state.model.outputs[idx].dock_clients);
        state.model.outputs[fallback].dock_clients.extend(docks);

        // the first adopted workspace initialises a previously empty output
        let shown = state.model.outputs[idx].current_workspace.take();
        if state.model.outputs[fallback].current_workspace.is_none() {
            state.model.outputs[fallback].current_workspace = shown;
        }

        if let Some(win) = state.model.outputs[idx].bar_win.take() {
            let _ = x.destroy_window(win);
        }
        state.model.outputs[idx].active = false;
        state.model.outputs[idx].to_be_disabled = false;
    }

    // mode changes force a reconfigure of everything the output hosts
    for idx in 0..state.model.outputs.len() {
        if !state.model.outputs[idx].changed {
            continue;
        }
        state.model.outputs[idx].changed = false;
        let rect = state.model.outputs[idx].rect;

        for ws in 0..state.model.workspaces.len() {
            if state.model.workspaces[ws].output != Some(idx) {
                continue;
            }
            state.model.workspaces[ws].rect = rect;
            for id in state.model.workspaces[ws].focus_stack.clone() {
                state.model.clients.get_mut(&id).unwrap().force_reconfigure = true;
            }
        }
    }

    // attach workspaces to active outputs that show nothing yet
    for idx in 0..state.model.outputs.len() {
        if !state.model.outputs[idx].active
            || state.model.outputs[idx].current_workspace.is_some()
        {
            continue;
        }

        let ws = eligible_workspace(state, idx);
        let rect = state.model.outputs[idx].rect;
        info!(output = %state.model.outputs[idx].name, workspace = ws + 1, "attaching workspace");

        state.model.workspaces[ws].output = Some(idx);
        state.model.workspaces[ws].rect = rect;
        state.model.outputs[idx].current_workspace = Some(ws);
        state.push_ipc_event(IpcEvent::output_change());
    }

    Ok(())
}

// The first workspace this output should show: one naming it as preferred
// output, else the first workspace not assigned anywhere, else a fresh one.
fn eligible_workspace(state: &mut State, output: usize) -> usize {
    let name = state.model.outputs[output].name.clone();

    if let Some(ws) = state
        .model
        .workspaces
        .iter()
        .position(|w| w.output.is_none() && w.preferred_output.as_deref() == Some(&name))
    {
        return ws;
    }

    if let Some(ws) = state
        .model
        .workspaces
        .iter()
        .position(|w| w.output.is_none() && !state.model.outputs.iter().any(|o| o.current_workspace == Some(w.num)))
    {
        return ws;
    }

    let next = state.model.workspaces.len();
    state.model.workspace_get(next);
    next
}
