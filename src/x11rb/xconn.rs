//! API wrapper for talking to the X server using x11rb
use crate::{
    core::bindings::KeyCode,
    pure::{
        geometry::{Point, Rect},
        Output,
    },
    x::{
        event::{
            ButtonEvent, ClientMessage, ConfigureEvent, ConfigureRequest, PointerChange,
            PropertyEvent,
        },
        property::{MapState, Prop, WindowAttributes, WmHints, WmNormalHints},
        Atom, ClientAttr, ClientConfig, KeyboardMapping, ModifierMapping, WinType, XConn, XEvent,
    },
    Error, Result, Xid,
};
use std::{collections::HashMap, os::unix::io::{AsRawFd, RawFd}, str::FromStr};
use strum::IntoEnumIterator;
use tracing::{trace, warn};
use x11rb::{
    connection::{Connection, RequestConnection},
    protocol::{
        randr::{self, ConnectionExt as _},
        xproto::{
            AtomEnum, ChangeWindowAttributesAux, ClientMessageEvent, ConfigWindow,
            ConfigureNotifyEvent, ConfigureWindowAux, ConnectionExt as _, CreateWindowAux,
            EventMask, GrabMode, GrabStatus, InputFocus, ModMask, PropMode, SetMode, StackMode,
            WindowClass, CLIENT_MESSAGE_EVENT, CONFIGURE_NOTIFY_EVENT,
        },
        Event,
    },
    rust_connection::RustConnection,
    wrapper::ConnectionExt as _,
    CURRENT_TIME, NONE,
};

const WM_NAME: &str = "lattice";

// WM_STATE values per ICCCM
const WM_STATE_WITHDRAWN: u32 = 0;
const WM_STATE_NORMAL: u32 = 1;
const WM_STATE_ICONIC: u32 = 3;

/// Handles communication with the X server via the x11rb crate.
pub struct Conn {
    conn: RustConnection,
    root: u32,
    check_win: u32,
    atoms: HashMap<Atom, u32>,
    atom_names: HashMap<u32, Atom>,
}

impl std::fmt::Debug for Conn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conn").field("root", &self.root).finish()
    }
}

impl Conn {
    /// Connect to the display named by `DISPLAY` and prepare the connection
    /// for managing it.
    pub fn new() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        // intern all known atoms up front: send every request first, then
        // collect the replies
        let cookies: Vec<_> = Atom::iter()
            .map(|atom| (atom, conn.intern_atom(false, atom.as_ref().as_bytes())))
            .collect();
        let mut atoms = HashMap::new();
        let mut atom_names = HashMap::new();
        for (atom, cookie) in cookies {
            let value = cookie?.reply()?.atom;
            atoms.insert(atom, value);
            atom_names.insert(value, atom);
        }

        if conn
            .extension_information(randr::X11_EXTENSION_NAME)?
            .is_none()
        {
            return Err(Error::MissingRandRSupport);
        }
        let mask = randr::NotifyMask::OUTPUT_CHANGE
            | randr::NotifyMask::CRTC_CHANGE
            | randr::NotifyMask::SCREEN_CHANGE;
        conn.randr_select_input(root, mask)?;

        // the _NET_SUPPORTING_WM_CHECK window
        let check_win = conn.generate_id()?;
        let aux = CreateWindowAux::new().override_redirect(1);
        conn.create_window(
            0,
            check_win,
            root,
            -1,
            -1,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &aux,
        )?;

        let this = Self {
            conn,
            root,
            check_win,
            atoms,
            atom_names,
        };
        this.advertise_check_window()?;

        Ok(this)
    }

    fn known_atom(&self, atom: Atom) -> u32 {
        self.atoms[&atom]
    }

    fn any_atom(&self, name: &str) -> Result<u32> {
        if let Ok(known) = Atom::from_str(name) {
            return Ok(self.known_atom(known));
        }

        Ok(self.conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
    }

    fn advertise_check_window(&self) -> Result<()> {
        let check = self.known_atom(Atom::NetSupportingWmCheck);
        for win in [self.check_win, self.root] {
            self.conn
                .change_property32(PropMode::REPLACE, win, check, AtomEnum::WINDOW, &[self.check_win])?;
            self.conn.change_property8(
                PropMode::REPLACE,
                win,
                self.known_atom(Atom::NetWmName),
                self.known_atom(Atom::UTF8String),
                WM_NAME.as_bytes(),
            )?;
        }

        Ok(())
    }

    fn convert_event(&self, event: Event) -> Option<XEvent> {
        match event {
            Event::MapRequest(e) => Some(XEvent::MapRequest(Xid(e.window))),

            Event::UnmapNotify(e) => Some(XEvent::UnmapNotify(Xid(e.window))),

            Event::DestroyNotify(e) => Some(XEvent::Destroy(Xid(e.window))),

            Event::ConfigureRequest(e) => {
                let has = |flag: ConfigWindow| u16::from(e.value_mask) & u16::from(flag) != 0;
                Some(XEvent::ConfigureRequest(ConfigureRequest {
                    id: Xid(e.window),
                    x: has(ConfigWindow::X).then_some(e.x as i32),
                    y: has(ConfigWindow::Y).then_some(e.y as i32),
                    w: has(ConfigWindow::WIDTH).then_some(e.width as u32),
                    h: has(ConfigWindow::HEIGHT).then_some(e.height as u32),
                    border_width: has(ConfigWindow::BORDER_WIDTH)
                        .then_some(e.border_width as u32),
                }))
            }

            Event::ConfigureNotify(e) => Some(XEvent::ConfigureNotify(ConfigureEvent {
                id: Xid(e.window),
                r: Rect::new(e.x as i32, e.y as i32, e.width as u32, e.height as u32),
                is_root: e.window == self.root,
            })),

            Event::PropertyNotify(e) => {
                let atom = self.atom_name_of(e.atom)?;
                Some(XEvent::PropertyNotify(PropertyEvent {
                    id: Xid(e.window),
                    atom,
                    is_root: e.window == self.root,
                }))
            }

            Event::ClientMessage(e) => {
                let dtype = self.atom_name_of(e.type_)?;
                Some(XEvent::ClientMessage(ClientMessage {
                    id: Xid(e.window),
                    dtype,
                    data: e.data.as_data32(),
                }))
            }

            Event::KeyPress(e) => Some(XEvent::KeyPress(KeyCode {
                mask: e.state.into(),
                code: e.detail,
            })),

            Event::ButtonPress(e) => Some(XEvent::ButtonPress(ButtonEvent {
                id: Xid(e.event),
                button: e.detail,
                state: e.state.into(),
                abs: Point::new(e.root_x as i32, e.root_y as i32),
                relative: Point::new(e.event_x as i32, e.event_y as i32),
            })),

            Event::ButtonRelease(e) => Some(XEvent::ButtonRelease(ButtonEvent {
                id: Xid(e.event),
                button: e.detail,
                state: e.state.into(),
                abs: Point::new(e.root_x as i32, e.root_y as i32),
                relative: Point::new(e.event_x as i32, e.event_y as i32),
            })),

            Event::MotionNotify(e) => {
                Some(XEvent::Motion(Point::new(e.root_x as i32, e.root_y as i32)))
            }

            Event::EnterNotify(e) => Some(XEvent::Enter(PointerChange {
                id: Xid(e.event),
                abs: Point::new(e.root_x as i32, e.root_y as i32),
            })),

            Event::Expose(e) if e.count == 0 => Some(XEvent::Expose(Xid(e.window))),

            Event::MappingNotify(_) => Some(XEvent::MappingNotify),

            Event::RandrScreenChangeNotify(_) | Event::RandrNotify(_) => {
                Some(XEvent::RandrNotify)
            }

            Event::Error(e) => {
                // transient errors are expected when clients disappear under us
                warn!(?e, "X error");
                None
            }

            _ => None,
        }
    }

    fn atom_name_of(&self, atom: u32) -> Option<String> {
        if let Some(known) = self.atom_names.get(&atom) {
            return Some(known.as_ref().to_string());
        }

        self.conn
            .get_atom_name(atom)
            .ok()
            .and_then(|c| c.reply().ok())
            .and_then(|reply| String::from_utf8(reply.name).ok())
    }

    fn prop_strings(&self, value: Vec<u8>) -> Vec<String> {
        value
            .split(|&b| b == 0)
            .filter(|s| !s.is_empty())
            .map(|s| String::from_utf8_lossy(s).to_string())
            .collect()
    }
}

impl XConn for Conn {
    fn root(&self) -> Xid {
        Xid(self.root)
    }

    fn flush(&self) {
        let _ = self.conn.flush();
    }

    fn next_event(&self) -> Result<XEvent> {
        loop {
            let event = self.conn.wait_for_event()?;
            if let Some(converted) = self.convert_event(event) {
                return Ok(converted);
            }
        }
    }

    fn poll_event(&self) -> Result<Option<XEvent>> {
        loop {
            match self.conn.poll_for_event()? {
                Some(event) => {
                    if let Some(converted) = self.convert_event(event) {
                        return Ok(Some(converted));
                    }
                }
                None => return Ok(None),
            }
        }
    }

    fn connection_fd(&self) -> Option<RawFd> {
        Some(self.conn.stream().as_raw_fd())
    }

    fn create_window(&self, ty: WinType, r: Rect) -> Result<Xid> {
        let mask = match ty {
            WinType::Frame => {
                EventMask::EXPOSURE
                    | EventMask::BUTTON_PRESS
                    | EventMask::BUTTON_RELEASE
                    | EventMask::ENTER_WINDOW
                    | EventMask::LEAVE_WINDOW
                    | EventMask::STRUCTURE_NOTIFY
            }
            WinType::Decoration => EventMask::EXPOSURE | EventMask::BUTTON_PRESS,
            WinType::Popup => EventMask::EXPOSURE | EventMask::KEY_PRESS,
        };

        let id = self.conn.generate_id()?;
        let aux = CreateWindowAux::new()
            .override_redirect(1)
            .background_pixel(0)
            .event_mask(mask);

        trace!(%id, ?ty, ?r, "creating window");
        self.conn.create_window(
            0, // CopyFromParent
            id,
            self.root,
            r.x as i16,
            r.y as i16,
            r.w.max(1) as u16,
            r.h.max(1) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            0, // CopyFromParent
            &aux,
        )?;

        Ok(Xid(id))
    }

    fn destroy_window(&self, id: Xid) -> Result<()> {
        self.conn.destroy_window(*id)?;

        Ok(())
    }

    fn reparent(&self, child: Xid, parent: Xid, p: Point) -> Result<()> {
        self.conn
            .reparent_window(*child, *parent, p.x as i16, p.y as i16)?;

        Ok(())
    }

    fn add_to_save_set(&self, id: Xid) -> Result<()> {
        self.conn.change_save_set(SetMode::INSERT, *id)?;

        Ok(())
    }

    fn map(&self, id: Xid) -> Result<()> {
        self.conn.map_window(*id)?;

        Ok(())
    }

    fn unmap(&self, id: Xid) -> Result<()> {
        self.conn.unmap_window(*id)?;

        Ok(())
    }

    fn set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()> {
        let mut aux = ConfigureWindowAux::new();

        for conf in data {
            aux = match conf {
                ClientConfig::BorderPx(px) => aux.border_width(*px),
                ClientConfig::Position(r) => aux
                    .x(r.x)
                    .y(r.y)
                    .width(r.w.max(1))
                    .height(r.h.max(1)),
                ClientConfig::StackAbove(sibling) => {
                    aux.sibling(**sibling).stack_mode(StackMode::ABOVE)
                }
                ClientConfig::StackBelow(sibling) => {
                    aux.sibling(**sibling).stack_mode(StackMode::BELOW)
                }
                ClientConfig::StackTop => aux.stack_mode(StackMode::ABOVE),
                ClientConfig::StackBottom => aux.stack_mode(StackMode::BELOW),
            };
        }

        self.conn.configure_window(*id, &aux)?;

        Ok(())
    }

    fn set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()> {
        let client_event_mask = EventMask::ENTER_WINDOW
            | EventMask::PROPERTY_CHANGE
            | EventMask::STRUCTURE_NOTIFY;
        let root_event_mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::POINTER_MOTION
            | EventMask::PROPERTY_CHANGE
            | EventMask::ENTER_WINDOW;

        for attr in attrs {
            let aux = match attr {
                ClientAttr::BorderColor(color) => {
                    ChangeWindowAttributesAux::new().border_pixel(*color)
                }
                ClientAttr::ClientEventMask => {
                    ChangeWindowAttributesAux::new().event_mask(client_event_mask)
                }
                ClientAttr::NoEventMask => {
                    ChangeWindowAttributesAux::new().event_mask(EventMask::NO_EVENT)
                }
                ClientAttr::RootEventMask => {
                    ChangeWindowAttributesAux::new().event_mask(root_event_mask)
                }
            };
            self.conn.change_window_attributes(*id, &aux)?;
        }

        Ok(())
    }

    fn send_configure_notify(&self, id: Xid, r: Rect, border: u32) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: *id,
            window: *id,
            above_sibling: NONE,
            x: r.x as i16,
            y: r.y as i16,
            width: r.w as u16,
            height: r.h as u16,
            border_width: border as u16,
            override_redirect: false,
        };
        self.conn
            .send_event(false, *id, EventMask::STRUCTURE_NOTIFY, event)?;

        Ok(())
    }

    fn configure_unmanaged(&self, ev: &ConfigureRequest) -> Result<()> {
        let mut aux = ConfigureWindowAux::new();
        if let Some(x) = ev.x {
            aux = aux.x(x);
        }
        if let Some(y) = ev.y {
            aux = aux.y(y);
        }
        if let Some(w) = ev.w {
            aux = aux.width(w);
        }
        if let Some(h) = ev.h {
            aux = aux.height(h);
        }
        if let Some(bw) = ev.border_width {
            aux = aux.border_width(bw);
        }

        self.conn.configure_window(*ev.id, &aux)?;

        Ok(())
    }

    fn set_input_focus(&self, id: Xid) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, *id, CURRENT_TIME)?;

        Ok(())
    }

    fn warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()> {
        self.conn.warp_pointer(NONE, *id, 0, 0, 0, 0, x, y)?;

        Ok(())
    }

    fn cursor_position(&self) -> Result<Point> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;

        Ok(Point::new(reply.root_x as i32, reply.root_y as i32))
    }

    fn kill_client(&self, id: Xid) -> Result<()> {
        self.conn.kill_client(*id)?;

        Ok(())
    }

    fn send_delete(&self, id: Xid) -> Result<()> {
        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window: *id,
            type_: self.known_atom(Atom::WmProtocols),
            data: [
                self.known_atom(Atom::WmDeleteWindow),
                CURRENT_TIME,
                0,
                0,
                0,
            ]
            .into(),
        };
        self.conn
            .send_event(false, *id, EventMask::NO_EVENT, event)?;

        Ok(())
    }

    fn atom_name(&self, atom: u32) -> Result<Option<String>> {
        Ok(self.atom_name_of(atom))
    }

    fn get_prop(&self, id: Xid, name: &str) -> Result<Option<Prop>> {
        let atom = self.any_atom(name)?;
        let reply = self
            .conn
            .get_property(false, *id, atom, AtomEnum::ANY, 0, 1024)?
            .reply()?;

        if reply.type_ == NONE {
            return Ok(None);
        }

        let prop = match Atom::from_str(name) {
            Ok(Atom::WmHints) => {
                let raw: Vec<u32> = reply.value32().map(Iterator::collect).unwrap_or_default();
                match WmHints::from_bytes(&raw) {
                    Some(hints) => Prop::WmHints(hints),
                    None => return Ok(None),
                }
            }

            Ok(Atom::WmNormalHints) => {
                let raw: Vec<u32> = reply.value32().map(Iterator::collect).unwrap_or_default();
                match WmNormalHints::from_bytes(&raw) {
                    Some(hints) => Prop::WmNormalHints(hints),
                    None => return Ok(None),
                }
            }

            Ok(Atom::WmTransientFor) | Ok(Atom::WmClientLeader) => {
                let ids: Vec<Xid> = reply
                    .value32()
                    .map(|it| it.map(Xid).collect())
                    .unwrap_or_default();
                Prop::Window(ids)
            }

            Ok(Atom::WmProtocols) | Ok(Atom::NetWmWindowType) | Ok(Atom::NetWmState) => {
                let names: Vec<String> = reply
                    .value32()
                    .map(|it| it.filter_map(|a| self.atom_name_of(a)).collect())
                    .unwrap_or_default();
                Prop::Atom(names)
            }

            Ok(Atom::NetWmStrutPartial) => {
                let raw: Vec<u32> = reply.value32().map(Iterator::collect).unwrap_or_default();
                Prop::Cardinal(raw)
            }

            Ok(Atom::WmName) if reply.type_ != self.known_atom(Atom::UTF8String) => {
                Prop::Latin1Bytes(reply.value)
            }

            _ => {
                if reply.type_ == self.known_atom(Atom::UTF8String)
                    || reply.type_ == u32::from(AtomEnum::STRING)
                {
                    Prop::UTF8String(self.prop_strings(reply.value))
                } else if reply.type_ == u32::from(AtomEnum::WINDOW) {
                    Prop::Window(reply.value32().map(|it| it.map(Xid).collect()).unwrap_or_default())
                } else if reply.type_ == u32::from(AtomEnum::CARDINAL) {
                    Prop::Cardinal(reply.value32().map(Iterator::collect).unwrap_or_default())
                } else {
                    Prop::Bytes(reply.value32().map(Iterator::collect).unwrap_or_default())
                }
            }
        };

        Ok(Some(prop))
    }

    fn set_prop(&self, id: Xid, name: &str, val: Prop) -> Result<()> {
        let atom = self.any_atom(name)?;

        match val {
            Prop::Window(ids) => {
                let raw: Vec<u32> = ids.iter().map(|id| **id).collect();
                self.conn.change_property32(
                    PropMode::REPLACE,
                    *id,
                    atom,
                    AtomEnum::WINDOW,
                    &raw,
                )?;
            }
            Prop::Cardinal(vals) => {
                self.conn.change_property32(
                    PropMode::REPLACE,
                    *id,
                    atom,
                    AtomEnum::CARDINAL,
                    &vals,
                )?;
            }
            Prop::Atom(names) => {
                let mut raw = Vec::with_capacity(names.len());
                for name in names.iter() {
                    raw.push(self.any_atom(name)?);
                }
                self.conn
                    .change_property32(PropMode::REPLACE, *id, atom, AtomEnum::ATOM, &raw)?;
            }
            Prop::UTF8String(strs) => {
                let joined = strs.join("\0");
                self.conn.change_property8(
                    PropMode::REPLACE,
                    *id,
                    atom,
                    self.known_atom(Atom::UTF8String),
                    joined.as_bytes(),
                )?;
            }
            Prop::Latin1Bytes(bytes) => {
                self.conn.change_property8(
                    PropMode::REPLACE,
                    *id,
                    atom,
                    AtomEnum::STRING,
                    &bytes,
                )?;
            }
            Prop::Bytes(vals) => {
                self.conn.change_property32(
                    PropMode::REPLACE,
                    *id,
                    atom,
                    AtomEnum::CARDINAL,
                    &vals,
                )?;
            }
            Prop::WmHints(_) | Prop::WmNormalHints(_) => {
                return Err(Error::IpcProtocol(
                    "setting hints properties is not supported".to_string(),
                ))
            }
        }

        Ok(())
    }

    fn delete_prop(&self, id: Xid, name: &str) -> Result<()> {
        let atom = self.any_atom(name)?;
        self.conn.delete_property(*id, atom)?;

        Ok(())
    }

    fn set_wm_state(&self, id: Xid, state: crate::x::property::WmState) -> Result<()> {
        let value = match state {
            crate::x::property::WmState::Withdrawn => WM_STATE_WITHDRAWN,
            crate::x::property::WmState::Normal => WM_STATE_NORMAL,
            crate::x::property::WmState::Iconic => WM_STATE_ICONIC,
        };
        let wm_state = self.known_atom(Atom::WmState);
        self.conn
            .change_property32(PropMode::REPLACE, *id, wm_state, wm_state, &[value, NONE])?;

        Ok(())
    }

    fn get_window_attributes(&self, id: Xid) -> Result<WindowAttributes> {
        let reply = self.conn.get_window_attributes(*id)?.reply()?;

        let map_state = match reply.map_state {
            x11rb::protocol::xproto::MapState::UNMAPPED => MapState::Unmapped,
            x11rb::protocol::xproto::MapState::UNVIEWABLE => MapState::UnViewable,
            _ => MapState::Viewable,
        };

        Ok(WindowAttributes {
            override_redirect: reply.override_redirect,
            map_state,
        })
    }

    fn client_geometry(&self, id: Xid) -> Result<Rect> {
        let geo = self.conn.get_geometry(*id)?.reply()?;

        Ok(Rect::new(
            geo.x as i32,
            geo.y as i32,
            geo.width as u32,
            geo.height as u32,
        ))
    }

    fn existing_clients(&self) -> Result<Vec<Xid>> {
        let reply = self.conn.query_tree(self.root)?.reply()?;

        Ok(reply.children.into_iter().map(Xid).collect())
    }

    fn grab_keys(&self, key_codes: &[KeyCode]) -> Result<()> {
        for key in key_codes {
            self.conn.grab_key(
                false,
                self.root,
                key.mask.into(),
                key.code,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?;
        }
        self.conn.flush()?;

        Ok(())
    }

    fn ungrab_keys(&self) -> Result<()> {
        // key 0 == AnyKey
        self.conn.ungrab_key(0u8, self.root, ModMask::ANY)?;

        Ok(())
    }

    fn grab_pointer(&self) -> Result<bool> {
        let mask = EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION;
        let reply = self
            .conn
            .grab_pointer(
                false,
                self.root,
                (u32::from(mask) as u16).into(),
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                CURRENT_TIME,
            )?
            .reply()?;

        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.conn.ungrab_pointer(CURRENT_TIME)?;

        Ok(())
    }

    fn grab_keyboard(&self) -> Result<bool> {
        let reply = self
            .conn
            .grab_keyboard(false, self.root, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;

        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_keyboard(&self) -> Result<()> {
        self.conn.ungrab_keyboard(CURRENT_TIME)?;

        Ok(())
    }

    fn keyboard_mapping(&self) -> Result<KeyboardMapping> {
        let setup = self.conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = self
            .conn
            .get_keyboard_mapping(min, max - min + 1)?
            .reply()?;

        Ok(KeyboardMapping {
            min_keycode: min,
            keysyms_per_keycode: reply.keysyms_per_keycode as usize,
            keysyms: reply.keysyms,
        })
    }

    fn modifier_mapping(&self) -> Result<ModifierMapping> {
        let reply = self.conn.get_modifier_mapping()?.reply()?;

        Ok(ModifierMapping {
            keycodes_per_modifier: reply.keycodes_per_modifier() as usize,
            keycodes: reply.keycodes,
        })
    }

    fn query_outputs(&self) -> Result<Vec<Output>> {
        let resources = self.conn.randr_get_screen_resources(self.root)?.reply()?;

        let mut outputs = Vec::new();
        for output in resources.outputs.iter() {
            let info = self
                .conn
                .randr_get_output_info(*output, resources.config_timestamp)?
                .reply()?;
            let name = String::from_utf8_lossy(&info.name).to_string();

            if info.crtc == NONE {
                outputs.push(Output {
                    name,
                    active: false,
                    ..Default::default()
                });
                continue;
            }

            let crtc = self
                .conn
                .randr_get_crtc_info(info.crtc, resources.config_timestamp)?
                .reply()?;

            outputs.push(Output::new(
                name,
                Rect::new(
                    crtc.x as i32,
                    crtc.y as i32,
                    crtc.width as u32,
                    crtc.height as u32,
                ),
            ));
        }

        Ok(outputs)
    }
}
