//! Shared test fixtures: an in-memory X connection and draw service plus
//! helpers for building a running-manager state.
use lattice::{
    core::{bindings::KeyCode, config::Config, handle, outputs, State},
    draw::{Color, Draw, TextRun},
    ipc::IpcServer,
    pure::{
        geometry::{Point, Rect},
        Model, Output,
    },
    x::{
        event::ConfigureRequest,
        property::{MapState, Prop, WindowAttributes, WmState},
        ClientAttr, ClientConfig, KeyboardMapping, ModifierMapping, WinType, XConn, XEvent,
    },
    Error, Result, Xid,
};
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet, VecDeque},
};

pub const FONT_H: u32 = 13;

/// An in-memory X connection: answers queries from configured tables and
/// records the visibility relevant calls.
pub struct TestConn {
    next_id: Cell<u32>,
    /// queued events served by next_event / poll_event
    pub events: RefCell<VecDeque<XEvent>>,
    /// per (window, property) canned replies
    pub props: RefCell<HashMap<(Xid, String), Prop>>,
    /// atom value -> name resolution for client messages
    pub atom_names: RefCell<HashMap<u32, String>>,
    /// initial geometry served for unmanaged windows
    pub geometries: RefCell<HashMap<Xid, Rect>>,
    /// outputs reported by query_outputs
    pub outputs: RefCell<Vec<Output>>,
    /// windows currently mapped
    pub mapped: RefCell<HashSet<Xid>>,
    /// window holding input focus
    pub focused: Cell<Xid>,
}

impl Default for TestConn {
    fn default() -> Self {
        Self {
            next_id: Cell::new(0x1000_0000),
            events: RefCell::new(VecDeque::new()),
            props: RefCell::new(HashMap::new()),
            atom_names: RefCell::new(HashMap::new()),
            geometries: RefCell::new(HashMap::new()),
            outputs: RefCell::new(Vec::new()),
            mapped: RefCell::new(HashSet::new()),
            focused: Cell::new(Xid::from(0)),
        }
    }
}

impl TestConn {
    pub fn with_outputs(rects: &[Rect]) -> Self {
        let conn = Self::default();
        conn.outputs.replace(
            rects
                .iter()
                .enumerate()
                .map(|(i, &r)| Output::new(format!("TEST{}", i + 1), r))
                .collect(),
        );
        conn
    }

    pub fn set_prop(&self, id: Xid, name: &str, value: Prop) {
        self.props
            .borrow_mut()
            .insert((id, name.to_string()), value);
    }

    pub fn is_mapped(&self, id: Xid) -> bool {
        self.mapped.borrow().contains(&id)
    }
}

impl XConn for TestConn {
    fn root(&self) -> Xid {
        Xid::from(1)
    }

    fn flush(&self) {}

    fn next_event(&self) -> Result<XEvent> {
        self.events
            .borrow_mut()
            .pop_front()
            .ok_or(Error::UnimplementedMock)
    }

    fn poll_event(&self) -> Result<Option<XEvent>> {
        Ok(self.events.borrow_mut().pop_front())
    }

    fn create_window(&self, _ty: WinType, _r: Rect) -> Result<Xid> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(Xid::from(id))
    }

    fn destroy_window(&self, id: Xid) -> Result<()> {
        self.mapped.borrow_mut().remove(&id);
        Ok(())
    }

    fn reparent(&self, _child: Xid, _parent: Xid, _p: Point) -> Result<()> {
        Ok(())
    }

    fn add_to_save_set(&self, _id: Xid) -> Result<()> {
        Ok(())
    }

    fn map(&self, id: Xid) -> Result<()> {
        self.mapped.borrow_mut().insert(id);
        Ok(())
    }

    fn unmap(&self, id: Xid) -> Result<()> {
        self.mapped.borrow_mut().remove(&id);
        Ok(())
    }

    fn set_client_config(&self, _id: Xid, _data: &[ClientConfig]) -> Result<()> {
        Ok(())
    }

    fn set_client_attributes(&self, _id: Xid, _attrs: &[ClientAttr]) -> Result<()> {
        Ok(())
    }

    fn send_configure_notify(&self, _id: Xid, _r: Rect, _border: u32) -> Result<()> {
        Ok(())
    }

    fn configure_unmanaged(&self, _ev: &ConfigureRequest) -> Result<()> {
        Ok(())
    }

    fn set_input_focus(&self, id: Xid) -> Result<()> {
        self.focused.set(id);
        Ok(())
    }

    fn warp_pointer(&self, _id: Xid, _x: i16, _y: i16) -> Result<()> {
        Ok(())
    }

    fn cursor_position(&self) -> Result<Point> {
        Ok(Point::new(0, 0))
    }

    fn kill_client(&self, _id: Xid) -> Result<()> {
        Ok(())
    }

    fn send_delete(&self, _id: Xid) -> Result<()> {
        Ok(())
    }

    fn atom_name(&self, atom: u32) -> Result<Option<String>> {
        Ok(self.atom_names.borrow().get(&atom).cloned())
    }

    fn get_prop(&self, id: Xid, name: &str) -> Result<Option<Prop>> {
        Ok(self.props.borrow().get(&(id, name.to_string())).cloned())
    }

    fn set_prop(&self, _id: Xid, _name: &str, _val: Prop) -> Result<()> {
        Ok(())
    }

    fn delete_prop(&self, _id: Xid, _name: &str) -> Result<()> {
        Ok(())
    }

    fn set_wm_state(&self, _id: Xid, _state: WmState) -> Result<()> {
        Ok(())
    }

    fn get_window_attributes(&self, _id: Xid) -> Result<WindowAttributes> {
        Ok(WindowAttributes {
            override_redirect: false,
            map_state: MapState::Viewable,
        })
    }

    fn client_geometry(&self, id: Xid) -> Result<Rect> {
        Ok(self
            .geometries
            .borrow()
            .get(&id)
            .copied()
            .unwrap_or(Rect::new(0, 0, 640, 480)))
    }

    fn existing_clients(&self) -> Result<Vec<Xid>> {
        Ok(Vec::new())
    }

    fn grab_keys(&self, _key_codes: &[KeyCode]) -> Result<()> {
        Ok(())
    }

    fn ungrab_keys(&self) -> Result<()> {
        Ok(())
    }

    fn grab_pointer(&self) -> Result<bool> {
        Ok(true)
    }

    fn ungrab_pointer(&self) -> Result<()> {
        Ok(())
    }

    fn grab_keyboard(&self) -> Result<bool> {
        Ok(true)
    }

    fn ungrab_keyboard(&self) -> Result<()> {
        Ok(())
    }

    fn keyboard_mapping(&self) -> Result<KeyboardMapping> {
        Ok(KeyboardMapping::default())
    }

    fn modifier_mapping(&self) -> Result<ModifierMapping> {
        Ok(ModifierMapping::default())
    }

    fn query_outputs(&self) -> Result<Vec<Output>> {
        Ok(self.outputs.borrow().clone())
    }
}

/// A draw service with fixed metrics: every glyph is 7px wide, the font is
/// 13px high.
#[derive(Debug, Default)]
pub struct TestDraw;

impl Draw for TestDraw {
    fn load_font(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn font_height(&self) -> u32 {
        FONT_H
    }

    fn text_width(&self, text: TextRun<'_>) -> Result<u32> {
        Ok(7 * text.len() as u32)
    }

    fn fill_rect(&self, _drawable: Xid, _r: Rect, _color: Color) -> Result<()> {
        Ok(())
    }

    fn draw_text(
        &self,
        _drawable: Xid,
        _x: i32,
        _y: i32,
        _fg: Color,
        _bg: Color,
        _text: TextRun<'_>,
    ) -> Result<()> {
        Ok(())
    }
}

/// A state wired to the outputs the connection reports, with workspace 1
/// shown on the first output.
pub fn new_state(x: &TestConn, d: &TestDraw) -> State {
    let mut state = State {
        config: Config::default(),
        model: Model::new(),
        root: x.root(),
        keymap: Default::default(),
        binding_mode: "default".to_string(),
        pending_ipc_events: Vec::new(),
        halt: false,
        restart: false,
        reload: false,
    };

    outputs::update_outputs(x, d, &mut state).expect("initial output discovery");

    state
}

/// Manage a fresh window with the given id, as if a MapRequest arrived.
pub fn open_window(x: &TestConn, d: &TestDraw, state: &mut State, id: u32) -> Xid {
    let id = Xid::from(id);
    handle::manage_window(x, d, state, id, false).expect("manage");

    id
}

/// The IpcServer handle used where a [State] needs constructing manually.
#[allow(dead_code)]
pub fn disabled_ipc() -> IpcServer {
    IpcServer::disabled()
}

/// Assert that the model invariants hold, with a readable failure.
pub fn assert_invariants(state: &State) {
    if let Err(e) = state.model.check_invariants() {
        panic!("model invariant violated: {e}");
    }
}
