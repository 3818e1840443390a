//! Manage protocol placement: WM_CLIENT_LEADER routing and its interaction
//! with assignments.
mod common;

use common::{new_state, open_window, TestConn, TestDraw};
use lattice::{
    core::{
        commands::run_command,
        config::{Assignment, AssignmentTarget},
        handle,
    },
    pure::geometry::Rect,
    x::Prop,
    Xid,
};

const OUTPUT: Rect = Rect::new(0, 0, 1000, 700);

fn set_leader(x: &TestConn, window: u32, leader: u32) {
    x.set_prop(
        Xid::from(window),
        "WM_CLIENT_LEADER",
        Prop::Window(vec![Xid::from(leader)]),
    );
}

fn set_class(x: &TestConn, window: u32, class: &str) {
    x.set_prop(
        Xid::from(window),
        "WM_CLASS",
        Prop::UTF8String(vec![class.to_lowercase(), class.to_string()]),
    );
}

#[test]
fn followers_join_their_leaders_container() {
    let x = TestConn::with_outputs(&[OUTPUT]);
    let d = TestDraw;
    let mut state = new_state(&x, &d);

    // leader ends up in the rightmost column at (2, 0)
    for id in [100, 200, 300] {
        open_window(&x, &d, &mut state, id);
    }
    assert_eq!(state.model.clients[&Xid::from(300)].cell, Some((2, 0)));

    set_leader(&x, 999, 300);
    open_window(&x, &d, &mut state, 999);

    let follower = &state.model.clients[&Xid::from(999)];
    assert_eq!(follower.workspace, 0);
    assert_eq!(follower.cell, Some((2, 0)));
    assert_eq!(
        state.model.workspaces[0].table[2][0].clients,
        vec![Xid::from(300), Xid::from(999)]
    );

    // no new column was opened for it
    assert_eq!(state.model.workspaces[0].cols(), 3);
    assert_eq!(state.model.focused_client(), Some(Xid::from(999)));
    common::assert_invariants(&state);
}

#[test]
fn followers_follow_their_leader_to_another_workspace() {
    let x = TestConn::with_outputs(&[OUTPUT]);
    let d = TestDraw;
    let mut state = new_state(&x, &d);

    open_window(&x, &d, &mut state, 100);
    run_command(&x, &d, &mut state, "m3").unwrap(); // leader to workspace 3
    assert_eq!(state.model.clients[&Xid::from(100)].workspace, 2);

    set_leader(&x, 999, 100);
    open_window(&x, &d, &mut state, 999);

    let follower = &state.model.clients[&Xid::from(999)];
    assert_eq!(follower.workspace, 2);
    assert_eq!(follower.cell, state.model.clients[&Xid::from(100)].cell);
    assert!(follower.urgent, "leader placement flags the window urgent");
    assert_eq!(state.model.current_workspace, 0);
    common::assert_invariants(&state);
}

#[test]
fn assignment_routing_supersedes_the_leader_cell() {
    let x = TestConn::with_outputs(&[OUTPUT]);
    let d = TestDraw;
    let mut state = new_state(&x, &d);

    // leader at the non-trivial cell (2, 0) of workspace 1
    for id in [100, 200, 300] {
        open_window(&x, &d, &mut state, id);
    }
    assert_eq!(state.model.clients[&Xid::from(300)].cell, Some((2, 0)));

    // workspace 2 also has a (2, 0) cell, occupied by someone else, and its
    // own selection on (0, 0)
    run_command(&x, &d, &mut state, "2").unwrap();
    for id in [400, 500, 600] {
        open_window(&x, &d, &mut state, id);
    }
    handle::set_focus(&x, &d, &mut state, Xid::from(400), false).unwrap();

    // back on workspace 1 with the leader focused
    run_command(&x, &d, &mut state, "1").unwrap();
    handle::set_focus(&x, &d, &mut state, Xid::from(300), false).unwrap();

    state.config.assignments.push(Assignment {
        pattern: "Gimp".to_string(),
        target: AssignmentTarget::Workspace(1),
    });
    set_leader(&x, 999, 300);
    set_class(&x, 999, "Gimp");

    open_window(&x, &d, &mut state, 999);

    // the assignment wins: the follower lands on workspace 2 in a cell of
    // workspace 2's own layout, not at the leader's (2, 0) coordinates
    let follower = &state.model.clients[&Xid::from(999)];
    assert_eq!(follower.workspace, 1);

    let (col, row) = follower.cell.expect("follower is tiled");
    assert_ne!((col, row), (2, 0));
    assert_eq!(
        state.model.workspaces[1].table[col][row].clients,
        vec![Xid::from(999)]
    );

    // the previous occupant of workspace 2's (2, 0) cell is untouched
    assert_eq!(
        state.model.workspaces[1].table[2][0].clients,
        vec![Xid::from(600)]
    );

    // not visible, so the follower keeps its leader-derived urgency and
    // focus stays where it was
    assert!(follower.urgent);
    assert!(state.model.workspaces[1].urgent);
    assert_eq!(state.model.current_workspace, 0);
    assert_eq!(state.model.focused_client(), Some(Xid::from(300)));
    common::assert_invariants(&state);
}
