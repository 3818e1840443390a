//! End to end scenarios driven through the real handlers against the in
//! memory connection.
mod common;

use common::{new_state, open_window, TestConn, TestDraw};
use lattice::{
    core::{commands::run_command, handle},
    draw::Draw,
    layout::{bar_height, title_height},
    pure::{container::Mode, geometry::Rect},
    x::{event::ClientMessage, Prop},
    Xid,
};

const OUTPUT: Rect = Rect::new(0, 0, 1000, 700);

fn three_windows() -> (TestConn, TestDraw, lattice::core::State) {
    let x = TestConn::with_outputs(&[OUTPUT]);
    let d = TestDraw;
    let mut state = new_state(&x, &d);

    for id in [100, 200, 300] {
        open_window(&x, &d, &mut state, id);
    }

    (x, d, state)
}

#[test]
fn three_tiled_windows_form_three_columns() {
    let (_, d, state) = three_windows();

    let ws = &state.model.workspaces[0];
    assert_eq!(ws.cols(), 3);
    assert_eq!(ws.rows(), 1);

    let usable_h = OUTPUT.h - bar_height(d.font_height());
    let rects: Vec<Rect> = (0..3).map(|c| ws.table[c][0].rect).collect();

    assert_eq!(rects[0], Rect::new(0, 0, 333, usable_h));
    assert_eq!(rects[1], Rect::new(333, 0, 334, usable_h));
    assert_eq!(rects[2], Rect::new(667, 0, 333, usable_h));

    common::assert_invariants(&state);
}

#[test]
fn stacked_container_maps_only_the_focused_child() {
    let (x, d, mut state) = three_windows();

    // collect all three clients into one container: vertical moves merge
    // into an occupied neighbour cell
    handle::set_focus(&x, &d, &mut state, Xid::from(100), false).unwrap();
    run_command(&x, &d, &mut state, "mj").unwrap(); // own row below
    run_command(&x, &d, &mut state, "ml").unwrap(); // under 200
    run_command(&x, &d, &mut state, "mk").unwrap(); // merge with 200
    common::assert_invariants(&state);

    handle::set_focus(&x, &d, &mut state, Xid::from(300), false).unwrap();
    run_command(&x, &d, &mut state, "mj").unwrap();
    run_command(&x, &d, &mut state, "mh").unwrap();
    run_command(&x, &d, &mut state, "mk").unwrap(); // merge with the rest
    common::assert_invariants(&state);

    let ws = &state.model.workspaces[0];
    assert_eq!((ws.cols(), ws.rows()), (1, 1));
    assert_eq!(ws.table[0][0].clients.len(), 3);

    run_command(&x, &d, &mut state, "s").unwrap();

    let cell = &state.model.workspaces[0].table[0][0];
    assert_eq!(cell.mode, Mode::Stack);
    assert!(cell.stack_win.is_some(), "stack window was created");

    // only the focused client frame of the stacked cell stays mapped
    let focused = cell.focused.expect("cell has focus");
    for &id in cell.clients.iter() {
        let frame = state.model.clients[&id].frame;
        assert_eq!(x.is_mapped(frame), id == focused, "mapping of {id}");
    }
}

#[test]
fn stack_strip_has_one_line_per_client() {
    use lattice::layout::{deco_plan, stacked_inner_rect};
    use lattice::pure::container::StackLimit;

    let d = TestDraw;
    let clients: Vec<Xid> = [1u32, 2, 3].map(Xid::from).to_vec();
    let plan = deco_plan(Mode::Stack, StackLimit::None, &clients, 334, d.font_height());

    assert_eq!(plan.lines, 3);
    assert_eq!(title_height(d.font_height()), d.font_height() + 4);

    let inner = stacked_inner_rect(Rect::new(333, 0, 334, 681), plan.lines, d.font_height());
    assert_eq!(inner.y, 3 * title_height(d.font_height()) as i32);
    assert_eq!(inner.h, 681 - 3 * title_height(d.font_height()));
}

#[test]
fn moving_right_swaps_and_stops_at_the_edge() {
    let (x, d, mut state) = three_windows();
    let d = &d;

    // focus the leftmost window
    handle::set_focus(&x, d, &mut state, Xid::from(100), false).unwrap();
    let order = |state: &lattice::core::State| -> Vec<Xid> {
        (0..3)
            .map(|c| state.model.workspaces[0].table[c][0].clients[0])
            .collect()
    };

    assert_eq!(order(&state), [100, 200, 300].map(Xid::from).to_vec());

    run_command(&x, d, &mut state, "ml").unwrap();
    assert_eq!(order(&state), [200, 100, 300].map(Xid::from).to_vec());
    common::assert_invariants(&state);

    run_command(&x, d, &mut state, "ml").unwrap();
    assert_eq!(order(&state), [200, 300, 100].map(Xid::from).to_vec());

    // at the edge the appended column immediately compacts away again
    run_command(&x, d, &mut state, "ml").unwrap();
    assert_eq!(order(&state), [200, 300, 100].map(Xid::from).to_vec());
    assert_eq!(state.model.workspaces[0].cols(), 3);
    common::assert_invariants(&state);
}

#[test]
fn new_output_gets_the_next_unused_workspace() {
    let x = TestConn::with_outputs(&[OUTPUT]);
    let d = TestDraw;
    let mut state = new_state(&x, &d);
    open_window(&x, &d, &mut state, 100);

    // a second output appears at runtime
    x.outputs.borrow_mut().push(lattice::pure::Output::new(
        "TEST2",
        Rect::new(1000, 0, 1280, 800),
    ));
    lattice::core::outputs::update_outputs(&x, &d, &mut state).unwrap();

    let second = state
        .model
        .outputs
        .iter()
        .position(|o| o.name == "TEST2")
        .expect("output exists");
    let shown = state.model.outputs[second].current_workspace.expect("workspace bound");

    assert_ne!(Some(shown), state.model.outputs[0].current_workspace);
    assert_eq!(state.model.workspaces[shown].rect, Rect::new(1000, 0, 1280, 800));

    // opening a client while focused there lands on the new output
    state.model.current_workspace = shown;
    let id = open_window(&x, &d, &mut state, 200);
    assert_eq!(state.model.clients[&id].workspace, shown);
    common::assert_invariants(&state);
}

#[test]
fn fullscreen_client_message_round_trips() {
    let (x, d, mut state) = three_windows();
    let id = Xid::from(200);
    let before = state.model.clients[&id].rect;

    // the connection resolves atom 555 to the fullscreen atom name
    x.atom_names
        .borrow_mut()
        .insert(555, "_NET_WM_STATE_FULLSCREEN".to_string());

    let toggle = ClientMessage {
        id,
        dtype: "_NET_WM_STATE".to_string(),
        data: [2, 555, 0, 0, 0],
    };

    handle::client_message(&x, &d, &mut state, toggle.clone()).unwrap();

    assert_eq!(state.model.workspaces[0].fullscreen, Some(id));
    assert!(state.model.clients[&id].fullscreen);
    assert_eq!(state.model.clients[&id].rect, state.model.workspaces[0].rect);
    common::assert_invariants(&state);

    handle::client_message(&x, &d, &mut state, toggle).unwrap();

    assert_eq!(state.model.workspaces[0].fullscreen, None);
    assert!(!state.model.clients[&id].fullscreen);
    assert_eq!(state.model.clients[&id].rect, before);
    common::assert_invariants(&state);
}

#[test]
fn second_fullscreen_request_is_rejected() {
    let (x, d, mut state) = three_windows();

    handle::toggle_fullscreen(&x, &d, &mut state, Xid::from(100), false).unwrap();
    handle::toggle_fullscreen(&x, &d, &mut state, Xid::from(200), false).unwrap();

    assert_eq!(state.model.workspaces[0].fullscreen, Some(Xid::from(100)));
    assert!(!state.model.clients[&Xid::from(200)].fullscreen);
}

#[test]
fn dialog_windows_float_and_center() {
    let x = TestConn::with_outputs(&[OUTPUT]);
    let d = TestDraw;
    let mut state = new_state(&x, &d);

    let id = Xid::from(100);
    x.geometries.borrow_mut().insert(id, Rect::new(0, 0, 400, 300));
    x.set_prop(
        id,
        "_NET_WM_WINDOW_TYPE",
        Prop::Atom(vec!["_NET_WM_WINDOW_TYPE_DIALOG".to_string()]),
    );

    open_window(&x, &d, &mut state, 100);

    let client = &state.model.clients[&id];
    assert!(client.is_floating());
    assert!(state.model.workspaces[0].floating.contains(&id));

    // centered on the workspace
    let mid = client.rect.midpoint();
    assert_eq!(mid.x, OUTPUT.w as i32 / 2);
    common::assert_invariants(&state);
}

#[test]
fn float_then_unfloat_returns_to_the_table() {
    let (x, d, mut state) = three_windows();
    let id = Xid::from(300);

    run_command(&x, &d, &mut state, "t").unwrap();
    assert!(state.model.clients[&id].is_floating());
    assert_eq!(state.model.workspaces[0].cols(), 2);
    common::assert_invariants(&state);

    run_command(&x, &d, &mut state, "t").unwrap();
    let client = &state.model.clients[&id];
    assert!(!client.is_floating());
    assert!(client.cell.is_some());

    // the tiled rect is recomputed from the current layout, not the
    // remembered pixel rect
    let (col, row) = client.cell.unwrap();
    let cell_rect = state.model.workspaces[0].table[col][row].rect;
    assert_eq!(client.rect.w, cell_rect.w);
    assert!(cell_rect.contains(&client.rect));
    common::assert_invariants(&state);
}

#[test]
fn killing_the_last_client_on_a_hidden_workspace_releases_its_output() {
    let x = TestConn::with_outputs(&[OUTPUT]);
    let d = TestDraw;
    let mut state = new_state(&x, &d);

    open_window(&x, &d, &mut state, 100);
    run_command(&x, &d, &mut state, "m2").unwrap(); // move it to workspace 2
    assert_eq!(state.model.clients[&Xid::from(100)].workspace, 1);
    assert!(state.model.workspaces[1].output.is_some());

    handle::unmanage_window(&x, &d, &mut state, Xid::from(100), true).unwrap();

    assert!(state.model.workspaces[1].output.is_none());
    common::assert_invariants(&state);
}

#[test]
fn urgency_is_suppressed_for_the_focused_client() {
    use lattice::x::property::{WmHints, WmHintsFlags};

    let (x, d, mut state) = three_windows();
    let focused = state.model.focused_client().expect("has focus");
    let other = Xid::from(100);
    assert_ne!(focused, other);

    let urgent_hints = WmHints {
        flags: WmHintsFlags::URGENCY_HINT,
        window_group: 0,
    };

    x.set_prop(other, "WM_HINTS", Prop::WmHints(urgent_hints));
    x.set_prop(focused, "WM_HINTS", Prop::WmHints(urgent_hints));

    for id in [other, focused] {
        handle::property_notify(
            &x,
            &d,
            &mut state,
            lattice::x::event::PropertyEvent {
                id,
                atom: "WM_HINTS".to_string(),
                is_root: false,
            },
        )
        .unwrap();
    }

    assert!(state.model.clients[&other].urgent);
    assert!(!state.model.clients[&focused].urgent);
    assert!(state.model.workspaces[0].urgent);

    // focusing the urgent client clears the flag
    handle::set_focus(&x, &d, &mut state, other, false).unwrap();
    assert!(!state.model.clients[&other].urgent);
    assert!(!state.model.workspaces[0].urgent);
}
