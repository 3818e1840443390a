//! A stub implementation of XConn that is easier to implement for use in
//! tests. This module and its contents are only available when testing.
use crate::{
    core::bindings::KeyCode,
    pure::{
        geometry::{Point, Rect},
        Output,
    },
    x::{
        event::ConfigureRequest,
        property::{MapState, Prop, WindowAttributes, WmState},
        ClientAttr, ClientConfig, KeyboardMapping, ModifierMapping, WinType, XConn, XEvent,
    },
    Error, Result, Xid,
};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_WINDOW_ID: AtomicU32 = AtomicU32::new(0x1000_0000);

/// Stub methods default to benign values so handler logic can be driven end
/// to end without an X server: setters succeed, getters return an empty /
/// neutral answer. Tests override exactly the methods their scenario needs.
///
/// Any implementation of `StubXConn` automatically implements `XConn` by
/// forwarding each `$method` to `mock_$method`.
#[allow(unused_variables)]
pub trait StubXConn {
    fn mock_root(&self) -> Xid {
        Xid(1)
    }

    fn mock_flush(&self) {}

    fn mock_next_event(&self) -> Result<XEvent> {
        Err(Error::UnimplementedMock)
    }

    fn mock_poll_event(&self) -> Result<Option<XEvent>> {
        Ok(None)
    }

    fn mock_create_window(&self, ty: WinType, r: Rect) -> Result<Xid> {
        Ok(Xid(NEXT_WINDOW_ID.fetch_add(1, Ordering::SeqCst)))
    }

    fn mock_destroy_window(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_reparent(&self, child: Xid, parent: Xid, p: Point) -> Result<()> {
        Ok(())
    }

    fn mock_add_to_save_set(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_map(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_unmap(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()> {
        Ok(())
    }

    fn mock_set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()> {
        Ok(())
    }

    fn mock_send_configure_notify(&self, id: Xid, r: Rect, border: u32) -> Result<()> {
        Ok(())
    }

    fn mock_configure_unmanaged(&self, ev: &ConfigureRequest) -> Result<()> {
        Ok(())
    }

    fn mock_set_input_focus(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()> {
        Ok(())
    }

    fn mock_cursor_position(&self) -> Result<Point> {
        Ok(Point::new(0, 0))
    }

    fn mock_kill_client(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_send_delete(&self, id: Xid) -> Result<()> {
        Ok(())
    }

    fn mock_atom_name(&self, atom: u32) -> Result<Option<String>> {
        Ok(None)
    }

    fn mock_get_prop(&self, id: Xid, name: &str) -> Result<Option<Prop>> {
        Ok(None)
    }

    fn mock_set_prop(&self, id: Xid, name: &str, val: Prop) -> Result<()> {
        Ok(())
    }

    fn mock_delete_prop(&self, id: Xid, name: &str) -> Result<()> {
        Ok(())
    }

    fn mock_set_wm_state(&self, id: Xid, state: WmState) -> Result<()> {
        Ok(())
    }

    fn mock_get_window_attributes(&self, id: Xid) -> Result<WindowAttributes> {
        Ok(WindowAttributes {
            override_redirect: false,
            map_state: MapState::Viewable,
        })
    }

    fn mock_client_geometry(&self, id: Xid) -> Result<Rect> {
        Ok(Rect::new(0, 0, 640, 480))
    }

    fn mock_existing_clients(&self) -> Result<Vec<Xid>> {
        Ok(Vec::new())
    }

    fn mock_grab_keys(&self, key_codes: &[KeyCode]) -> Result<()> {
        Ok(())
    }

    fn mock_ungrab_keys(&self) -> Result<()> {
        Ok(())
    }

    fn mock_grab_pointer(&self) -> Result<bool> {
        Ok(true)
    }

    fn mock_ungrab_pointer(&self) -> Result<()> {
        Ok(())
    }

    fn mock_grab_keyboard(&self) -> Result<bool> {
        Ok(true)
    }

    fn mock_ungrab_keyboard(&self) -> Result<()> {
        Ok(())
    }

    fn mock_keyboard_mapping(&self) -> Result<KeyboardMapping> {
        Ok(KeyboardMapping::default())
    }

    fn mock_modifier_mapping(&self) -> Result<ModifierMapping> {
        Ok(ModifierMapping::default())
    }

    fn mock_query_outputs(&self) -> Result<Vec<Output>> {
        Ok(Vec::new())
    }
}

impl<T> XConn for T
where
    T: StubXConn,
{
    fn root(&self) -> Xid {
        self.mock_root()
    }

    fn flush(&self) {
        self.mock_flush()
    }

    fn next_event(&self) -> Result<XEvent> {
        self.mock_next_event()
    }

    fn poll_event(&self) -> Result<Option<XEvent>> {
        self.mock_poll_event()
    }

    fn create_window(&self, ty: WinType, r: Rect) -> Result<Xid> {
        self.mock_create_window(ty, r)
    }

    fn destroy_window(&self, id: Xid) -> Result<()> {
        self.mock_destroy_window(id)
    }

    fn reparent(&self, child: Xid, parent: Xid, p: Point) -> Result<()> {
        self.mock_reparent(child, parent, p)
    }

    fn add_to_save_set(&self, id: Xid) -> Result<()> {
        self.mock_add_to_save_set(id)
    }

    fn map(&self, id: Xid) -> Result<()> {
        self.mock_map(id)
    }

    fn unmap(&self, id: Xid) -> Result<()> {
        self.mock_unmap(id)
    }

    fn set_client_config(&self, id: Xid, data: &[ClientConfig]) -> Result<()> {
        self.mock_set_client_config(id, data)
    }

    fn set_client_attributes(&self, id: Xid, attrs: &[ClientAttr]) -> Result<()> {
        self.mock_set_client_attributes(id, attrs)
    }

    fn send_configure_notify(&self, id: Xid, r: Rect, border: u32) -> Result<()> {
        self.mock_send_configure_notify(id, r, border)
    }

    fn configure_unmanaged(&self, ev: &ConfigureRequest) -> Result<()> {
        self.mock_configure_unmanaged(ev)
    }

    fn set_input_focus(&self, id: Xid) -> Result<()> {
        self.mock_set_input_focus(id)
    }

    fn warp_pointer(&self, id: Xid, x: i16, y: i16) -> Result<()> {
        self.mock_warp_pointer(id, x, y)
    }

    fn cursor_position(&self) -> Result<Point> {
        self.mock_cursor_position()
    }

    fn kill_client(&self, id: Xid) -> Result<()> {
        self.mock_kill_client(id)
    }

    fn send_delete(&self, id: Xid) -> Result<()> {
        self.mock_send_delete(id)
    }

    fn atom_name(&self, atom: u32) -> Result<Option<String>> {
        self.mock_atom_name(atom)
    }

    fn get_prop(&self, id: Xid, name: &str) -> Result<Option<Prop>> {
        self.mock_get_prop(id, name)
    }

    fn set_prop(&self, id: Xid, name: &str, val: Prop) -> Result<()> {
        self.mock_set_prop(id, name, val)
    }

    fn delete_prop(&self, id: Xid, name: &str) -> Result<()> {
        self.mock_delete_prop(id, name)
    }

    fn set_wm_state(&self, id: Xid, state: WmState) -> Result<()> {
        self.mock_set_wm_state(id, state)
    }

    fn get_window_attributes(&self, id: Xid) -> Result<WindowAttributes> {
        self.mock_get_window_attributes(id)
    }

    fn client_geometry(&self, id: Xid) -> Result<Rect> {
        self.mock_client_geometry(id)
    }

    fn existing_clients(&self) -> Result<Vec<Xid>> {
        self.mock_existing_clients()
    }

    fn grab_keys(&self, key_codes: &[KeyCode]) -> Result<()> {
        self.mock_grab_keys(key_codes)
    }

    fn ungrab_keys(&self) -> Result<()> {
        self.mock_ungrab_keys()
    }

    fn grab_pointer(&self) -> Result<bool> {
        self.mock_grab_pointer()
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.mock_ungrab_pointer()
    }

    fn grab_keyboard(&self) -> Result<bool> {
        self.mock_grab_keyboard()
    }

    fn ungrab_keyboard(&self) -> Result<()> {
        self.mock_ungrab_keyboard()
    }

    fn keyboard_mapping(&self) -> Result<KeyboardMapping> {
        self.mock_keyboard_mapping()
    }

    fn modifier_mapping(&self) -> Result<ModifierMapping> {
        self.mock_modifier_mapping()
    }

    fn query_outputs(&self) -> Result<Vec<Output>> {
        self.mock_query_outputs()
    }
}
