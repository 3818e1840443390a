//! Command interpreter behaviour driven through the public handlers.
mod common;

use common::{new_state, open_window, TestConn, TestDraw};
use lattice::{
    core::{commands::run_command, handle},
    pure::geometry::Rect,
    Xid,
};

const OUTPUT: Rect = Rect::new(0, 0, 1000, 700);
const SECOND_OUTPUT: Rect = Rect::new(1000, 0, 1280, 800);

fn setup(n: u32) -> (TestConn, TestDraw, lattice::core::State) {
    let x = TestConn::with_outputs(&[OUTPUT]);
    let d = TestDraw;
    let mut state = new_state(&x, &d);
    for i in 0..n {
        open_window(&x, &d, &mut state, 100 + i * 100);
    }

    (x, d, state)
}

#[test]
fn showing_a_high_workspace_creates_the_intermediates() {
    let (x, d, mut state) = setup(1);

    run_command(&x, &d, &mut state, "5").unwrap();

    assert_eq!(state.model.workspaces.len(), 5);
    assert_eq!(state.model.current_workspace, 4);
    assert!(state.model.workspace_is_visible(4));
    common::assert_invariants(&state);
}

#[test]
fn focus_moves_between_columns() {
    let (x, d, mut state) = setup(3);
    assert_eq!(state.model.focused_client(), Some(Xid::from(300)));

    run_command(&x, &d, &mut state, "h").unwrap();
    assert_eq!(state.model.focused_client(), Some(Xid::from(200)));

    run_command(&x, &d, &mut state, "h").unwrap();
    assert_eq!(state.model.focused_client(), Some(Xid::from(100)));

    run_command(&x, &d, &mut state, "l").unwrap();
    assert_eq!(state.model.focused_client(), Some(Xid::from(200)));

    // focus never creates new tracks
    run_command(&x, &d, &mut state, "ll").unwrap();
    assert_eq!(state.model.focused_client(), Some(Xid::from(300)));
    assert_eq!(state.model.workspaces[0].cols(), 3);
}

#[test]
fn focus_cycles_within_a_container() {
    let (x, d, mut state) = setup(2);

    // merge 200 into 100's container
    handle::set_focus(&x, &d, &mut state, Xid::from(200), false).unwrap();
    run_command(&x, &d, &mut state, "mj").unwrap();
    run_command(&x, &d, &mut state, "mh").unwrap();
    run_command(&x, &d, &mut state, "mk").unwrap();

    let cell = state.model.workspaces[0].table[0][0].clone();
    assert_eq!(cell.clients.len(), 2);

    run_command(&x, &d, &mut state, "j").unwrap();
    let after_one = state.model.focused_client();
    run_command(&x, &d, &mut state, "j").unwrap();
    let after_two = state.model.focused_client();

    assert_ne!(after_one, after_two);
    assert_eq!(after_two, Some(Xid::from(200)));
}

#[test]
fn snap_right_grows_the_colspan() {
    let (x, d, mut state) = setup(2);

    // 200 at col1; move it down so col1 row0 frees up for the span
    run_command(&x, &d, &mut state, "mj").unwrap();
    handle::set_focus(&x, &d, &mut state, Xid::from(100), false).unwrap();

    run_command(&x, &d, &mut state, "sl").unwrap();

    let ws = &state.model.workspaces[0];
    assert_eq!(ws.table[0][0].colspan, 2);

    // rendering honours the span
    assert_eq!(ws.table[0][0].rect.w, OUTPUT.w);
    common::assert_invariants(&state);
}

#[test]
fn resize_command_moves_the_column_boundary() {
    let (x, d, mut state) = setup(2);
    handle::set_focus(&x, &d, &mut state, Xid::from(100), false).unwrap();

    let before = state.model.workspaces[0].table[0][0].rect.w;
    run_command(&x, &d, &mut state, "resize right 100").unwrap();
    let after = state.model.workspaces[0].table[0][0].rect.w;

    assert_eq!(after, before + 100);

    // and back again
    run_command(&x, &d, &mut state, "resize right -100").unwrap();
    assert_eq!(state.model.workspaces[0].table[0][0].rect.w, before);
}

#[test]
fn marks_are_unique_and_goto_follows_them() {
    let (x, d, mut state) = setup(2);

    run_command(&x, &d, &mut state, "mark irc").unwrap();
    assert_eq!(state.model.clients[&Xid::from(200)].mark.as_deref(), Some("irc"));

    handle::set_focus(&x, &d, &mut state, Xid::from(100), false).unwrap();
    run_command(&x, &d, &mut state, "mark irc").unwrap();

    // the mark moved to the newly marked client
    assert_eq!(state.model.clients[&Xid::from(200)].mark, None);
    assert_eq!(state.model.clients[&Xid::from(100)].mark.as_deref(), Some("irc"));

    handle::set_focus(&x, &d, &mut state, Xid::from(200), false).unwrap();
    run_command(&x, &d, &mut state, "goto irc").unwrap();
    assert_eq!(state.model.focused_client(), Some(Xid::from(100)));
}

#[test]
fn bring_pulls_a_window_from_another_workspace() {
    let (x, d, mut state) = setup(1);
    state
        .model
        .clients
        .get_mut(&Xid::from(100))
        .unwrap()
        .class_class = "URxvt".to_string();

    run_command(&x, &d, &mut state, "m3").unwrap();
    assert_eq!(state.model.clients[&Xid::from(100)].workspace, 2);

    run_command(&x, &d, &mut state, "bring \"URxvt\"").unwrap();

    assert_eq!(state.model.clients[&Xid::from(100)].workspace, 0);
    assert_eq!(state.model.focused_client(), Some(Xid::from(100)));
    common::assert_invariants(&state);
}

#[test]
fn jump_by_workspace_and_cell() {
    let (x, d, mut state) = setup(3);

    run_command(&x, &d, &mut state, "jump 1 0 0").unwrap();

    assert_eq!(state.model.current_workspace, 0);
    assert_eq!(state.model.focused_client(), Some(Xid::from(100)));
}

#[test]
fn border_style_toggle_cycles() {
    use lattice::pure::client::TitlebarPosition;

    let (x, d, mut state) = setup(1);
    let id = Xid::from(100);

    let style = |state: &lattice::core::State| {
        let c = &state.model.clients[&id];
        (c.borderless, c.titlebar)
    };

    assert_eq!(style(&state), (false, TitlebarPosition::Top));

    run_command(&x, &d, &mut state, "bt").unwrap();
    assert_eq!(style(&state), (false, TitlebarPosition::Off));

    run_command(&x, &d, &mut state, "bt").unwrap();
    assert_eq!(style(&state), (true, TitlebarPosition::Off));

    run_command(&x, &d, &mut state, "bt").unwrap();
    assert_eq!(style(&state), (false, TitlebarPosition::Top));
}

#[test]
fn hiding_the_floating_layer_unmaps_it() {
    let (x, d, mut state) = setup(2);
    run_command(&x, &d, &mut state, "t").unwrap();
    let id = Xid::from(200);
    assert!(state.model.clients[&id].is_floating());
    let frame = state.model.clients[&id].frame;
    assert!(x.is_mapped(frame));

    run_command(&x, &d, &mut state, "H").unwrap();
    assert!(!x.is_mapped(frame));

    run_command(&x, &d, &mut state, "H").unwrap();
    assert!(x.is_mapped(frame));
}

#[test]
fn next_and_previous_skip_empty_workspaces() {
    let (x, d, mut state) = setup(1);

    run_command(&x, &d, &mut state, "m3").unwrap(); // client to ws 3
    run_command(&x, &d, &mut state, "5").unwrap(); // park on empty ws 5
    open_window(&x, &d, &mut state, 900);

    run_command(&x, &d, &mut state, "nw").unwrap();
    assert_eq!(state.model.current_workspace, 2);

    run_command(&x, &d, &mut state, "nw").unwrap();
    assert_eq!(state.model.current_workspace, 4);

    run_command(&x, &d, &mut state, "pw").unwrap();
    assert_eq!(state.model.current_workspace, 2);
}

#[test]
fn stack_limit_caps_the_decoration_grid() {
    use lattice::pure::container::StackLimit;

    let (x, d, mut state) = setup(1);
    run_command(&x, &d, &mut state, "stack-limit cols 2").unwrap();
    assert_eq!(
        state.model.workspaces[0].table[0][0].stack_limit,
        StackLimit::Cols(2)
    );

    run_command(&x, &d, &mut state, "stack-limit rows 0").unwrap();
    assert_eq!(
        state.model.workspaces[0].table[0][0].stack_limit,
        StackLimit::None
    );
}

#[test]
fn focus_crosses_outputs_and_wraps() {
    let x = TestConn::with_outputs(&[OUTPUT, SECOND_OUTPUT]);
    let d = TestDraw;
    let mut state = new_state(&x, &d);

    let first_ws = state.model.outputs[0].current_workspace.unwrap();
    let second_ws = state.model.outputs[1].current_workspace.unwrap();
    assert_ne!(first_ws, second_ws);

    open_window(&x, &d, &mut state, 100);

    // screen-operand focus moves to the next output
    run_command(&x, &d, &mut state, "wsl").unwrap();
    assert_eq!(state.model.current_workspace, second_ws);

    // and wraps around at the far edge
    run_command(&x, &d, &mut state, "wsl").unwrap();
    assert_eq!(state.model.current_workspace, first_ws);
}

#[test]
fn fullscreen_forces_screen_focus() {
    let x = TestConn::with_outputs(&[OUTPUT, SECOND_OUTPUT]);
    let d = TestDraw;
    let mut state = new_state(&x, &d);
    let second_ws = state.model.outputs[1].current_workspace.unwrap();

    open_window(&x, &d, &mut state, 100);
    run_command(&x, &d, &mut state, "f").unwrap();
    assert!(state.model.clients[&Xid::from(100)].fullscreen);

    run_command(&x, &d, &mut state, "h").unwrap();
    assert_eq!(state.model.current_workspace, second_ws);
}

#[test]
fn global_fullscreen_spans_all_outputs() {
    let x = TestConn::with_outputs(&[OUTPUT, SECOND_OUTPUT]);
    let d = TestDraw;
    let mut state = new_state(&x, &d);

    open_window(&x, &d, &mut state, 100);
    run_command(&x, &d, &mut state, "fg").unwrap();

    let expected = Rect::new(0, 0, 2280, 800);
    assert_eq!(state.model.clients[&Xid::from(100)].rect, expected);
    assert_eq!(state.model.global_fullscreen, Some(Xid::from(100)));
}

#[test]
fn mode_switch_changes_the_binding_table() {
    use lattice::core::bindings::Binding;

    let (x, d, mut state) = setup(0);
    state
        .config
        .modes
        .insert("resize".to_string(), vec![Binding::sym(0, "h", "resize left 10")]);

    run_command(&x, &d, &mut state, "mode resize").unwrap();
    assert_eq!(state.binding_mode, "resize");

    run_command(&x, &d, &mut state, "mode default").unwrap();
    assert_eq!(state.binding_mode, "default");
}

#[test]
fn invariants_hold_across_a_command_storm() {
    let (x, d, mut state) = setup(4);

    let commands = [
        "mh", "mj", "ml", "mk", "h", "j", "k", "l", "t", "s", "2", "1", "m2", "2", "t", "d",
        "ml", "ml", "sh", "sl", "1", "T", "f", "f", "H", "H", "nw", "pw",
    ];

    for cmd in commands {
        run_command(&x, &d, &mut state, cmd).unwrap();
        if let Err(e) = state.model.check_invariants() {
            panic!("invariant violated after '{cmd}': {e}");
        }
    }
}
