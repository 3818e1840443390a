//! The IPC server: a UNIX socket speaking the i3-ipc framing so existing
//! helper programs (message senders, status bars) keep working.
//!
//! Each message on the wire is `"i3-ipc"` followed by a little endian u32
//! payload length, a little endian u32 message type and the payload itself.
//! Events share the framing with the high bit of the type field set.
use crate::{pure::Model, Error, Result};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde::Serialize;
use std::{
    collections::HashSet,
    io::{Read, Write},
    os::unix::io::{AsRawFd, RawFd},
    os::unix::net::{UnixListener, UnixStream},
    path::{Path, PathBuf},
};
use tracing::{debug, trace, warn};

/// The protocol magic every message starts with.
pub const MAGIC: &[u8; 6] = b"i3-ipc";

const HEADER_LEN: usize = 6 + 4 + 4;
const EVENT_BIT: u32 = 1 << 31;

/// Request message types.
pub mod msg {
    /// Run a command, reply with a status object
    pub const COMMAND: u32 = 0;
    /// Reply with the list of workspaces
    pub const GET_WORKSPACES: u32 = 1;
    /// Subscribe this connection to a set of events
    pub const SUBSCRIBE: u32 = 2;
    /// Reply with the list of outputs
    pub const GET_OUTPUTS: u32 = 3;
}

/// Event types (sent with the high bit set).
pub mod event {
    /// A workspace was created, focused, emptied or renamed
    pub const WORKSPACE: u32 = 0;
    /// The output configuration changed
    pub const OUTPUT: u32 = 1;
}

/// A parsed request from an IPC client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpcRequest {
    /// Run a window manager command
    Command(String),
    /// Dump the workspace list
    GetWorkspaces,
    /// Dump the output list
    GetOutputs,
    /// Subscribe to the named events
    Subscribe(Vec<String>),
}

/// An event to be pushed to subscribed clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcEvent {
    kind: &'static str,
    message_type: u32,
    payload: String,
}

impl IpcEvent {
    /// A `workspace` event with the given change tag (`init`, `focus`,
    /// `empty`, `reload`).
    pub fn workspace_change(change: &str) -> Self {
        Self {
            kind: "workspace",
            message_type: event::WORKSPACE,
            payload: format!("{{\"change\":\"{change}\"}}"),
        }
    }

    /// An `output` event.
    pub fn output_change() -> Self {
        Self {
            kind: "output",
            message_type: event::OUTPUT,
            payload: "{\"change\":\"unspecified\"}".to_string(),
        }
    }
}

#[derive(Serialize)]
struct WorkspaceReply {
    num: usize,
    name: String,
    visible: bool,
    focused: bool,
    urgent: bool,
    rect: RectReply,
    output: String,
}

#[derive(Serialize)]
struct OutputReply {
    name: String,
    active: bool,
    current_workspace: Option<String>,
    rect: RectReply,
}

#[derive(Serialize)]
struct RectReply {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl From<crate::pure::geometry::Rect> for RectReply {
    fn from(r: crate::pure::geometry::Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.w,
            height: r.h,
        }
    }
}

struct IpcClient {
    stream: UnixStream,
    buf: Vec<u8>,
    subscriptions: HashSet<String>,
    dead: bool,
}

/// The listening IPC socket and its connected clients.
pub struct IpcServer {
    listener: Option<UnixListener>,
    clients: Vec<IpcClient>,
    path: PathBuf,
}

impl std::fmt::Debug for IpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcServer")
            .field("path", &self.path)
            .field("clients", &self.clients.len())
            .finish()
    }
}

/// Resolve the socket path: `I3SOCK` wins, then the configured path, then a
/// runtime-dir default.
pub fn socket_path(configured: Option<&str>) -> PathBuf {
    if let Ok(path) = std::env::var("I3SOCK") {
        return PathBuf::from(path);
    }
    if let Some(path) = configured {
        return PathBuf::from(path);
    }
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Path::new(&dir).join(format!("lattice-ipc.{}", std::process::id()));
    }

    std::env::temp_dir().join(format!("lattice-ipc.{}", std::process::id()))
}

impl IpcServer {
    /// Bind the socket, replacing a stale one at the same path.
    pub fn bind(path: PathBuf) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        debug!(?path, "binding ipc socket");
        let listener = UnixListener::bind(&path)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            listener: Some(listener),
            clients: Vec::new(),
            path,
        })
    }

    /// A server that accepts no connections, for embedding and tests.
    pub fn disabled() -> Self {
        Self {
            listener: None,
            clients: Vec::new(),
            path: PathBuf::new(),
        }
    }

    /// The file descriptors to include in the main poll loop.
    pub fn fds(&self) -> Vec<RawFd> {
        let mut fds: Vec<RawFd> = self
            .listener
            .iter()
            .map(|l| l.as_raw_fd())
            .collect();
        fds.extend(self.clients.iter().map(|c| c.stream.as_raw_fd()));

        fds
    }

    /// Accept new connections and parse any complete request frames.
    ///
    /// Protocol violations close the offending connection; other clients
    /// are unaffected.
    pub fn poll_requests(&mut self) -> Vec<(usize, IpcRequest)> {
        // tokens are indices into the client list: prune the casualties of
        // the previous round before handing out new ones
        self.clients.retain(|c| !c.dead);
        self.accept_pending();

        let mut requests = Vec::new();
        for (token, client) in self.clients.iter_mut().enumerate() {
            let mut chunk = [0u8; 4096];
            loop {
                match client.stream.read(&mut chunk) {
                    Ok(0) => {
                        client.dead = true;
                        break;
                    }
                    Ok(n) => client.buf.extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        debug!(%e, "ipc read error, dropping client");
                        client.dead = true;
                        break;
                    }
                }
            }

            while !client.dead {
                match parse_frame(&client.buf) {
                    Ok(Some((request, consumed))) => {
                        client.buf.drain(..consumed);
                        requests.push((token, request));
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(%e, "ipc protocol violation, closing connection");
                        client.dead = true;
                    }
                }
            }
        }

        requests
    }

    fn accept_pending(&mut self) {
        let Some(listener) = &self.listener else {
            return;
        };

        loop {
            match listener.accept() {
                Ok((stream, _)) => {
                    trace!("new ipc connection");
                    if stream.set_nonblocking(true).is_ok() {
                        self.clients.push(IpcClient {
                            stream,
                            buf: Vec::new(),
                            subscriptions: HashSet::new(),
                            dead: false,
                        });
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(%e, "ipc accept failed");
                    break;
                }
            }
        }
    }

    /// Record the event subscriptions of a client and build the reply.
    pub fn subscribe(&mut self, token: usize, events: &[String]) -> (u32, Vec<u8>) {
        if let Some(client) = self.clients.get_mut(token) {
            for ev in events {
                client.subscriptions.insert(ev.clone());
            }
        }

        (msg::SUBSCRIBE, b"{\"success\":true}".to_vec())
    }

    /// Send a reply frame to one client.
    pub fn send_reply(&mut self, token: usize, (message_type, payload): (u32, Vec<u8>)) {
        if let Some(client) = self.clients.get_mut(token) {
            let frame = encode_frame(message_type, &payload);
            if client.stream.write_all(&frame).is_err() {
                client.dead = true;
            }
        }
    }

    /// Push an event to every client subscribed to its kind.
    pub fn broadcast(&mut self, ev: IpcEvent) {
        trace!(kind = ev.kind, "broadcasting ipc event");
        let frame = encode_frame(ev.message_type | EVENT_BIT, ev.payload.as_bytes());

        for client in self.clients.iter_mut() {
            if client.subscriptions.contains(ev.kind)
                && client.stream.write_all(&frame).is_err()
            {
                client.dead = true;
            }
        }
    }

    /// The COMMAND reply body.
    pub fn command_reply(success: bool) -> (u32, Vec<u8>) {
        (msg::COMMAND, format!("{{\"success\":{success}}}").into_bytes())
    }

    /// The GET_WORKSPACES reply body.
    pub fn workspaces_reply(model: &Model) -> (u32, Vec<u8>) {
        let replies: Vec<WorkspaceReply> = model
            .workspaces
            .iter()
            .map(|ws| WorkspaceReply {
                num: ws.num + 1,
                name: ws.name.clone(),
                visible: model.workspace_is_visible(ws.num),
                focused: model.current_workspace == ws.num,
                urgent: ws.urgent,
                rect: ws.rect.into(),
                output: ws
                    .output
                    .map(|o| model.outputs[o].name.clone())
                    .unwrap_or_default(),
            })
            .collect();

        let payload = serde_json::to_vec(&replies).expect("workspace reply serializes");
        (msg::GET_WORKSPACES, payload)
    }

    /// The GET_OUTPUTS reply body.
    pub fn outputs_reply(model: &Model) -> (u32, Vec<u8>) {
        let replies: Vec<OutputReply> = model
            .outputs
            .iter()
            .map(|o| OutputReply {
                name: o.name.clone(),
                active: o.active,
                current_workspace: o
                    .current_workspace
                    .map(|ws| model.workspaces[ws].name.clone()),
                rect: o.rect.into(),
            })
            .collect();

        let payload = serde_json::to_vec(&replies).expect("output reply serializes");
        (msg::GET_OUTPUTS, payload)
    }

    /// Close the listener and remove the socket file.
    pub fn close(&mut self) {
        self.clients.clear();
        self.listener = None;
        if !self.path.as_os_str().is_empty() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.close();
    }
}

/// Encode one message frame.
pub fn encode_frame(message_type: u32, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(MAGIC);
    frame
        .write_u32::<LittleEndian>(payload.len() as u32)
        .expect("vec write");
    frame
        .write_u32::<LittleEndian>(message_type)
        .expect("vec write");
    frame.extend_from_slice(payload);

    frame
}

/// Try to parse one complete request frame from the head of `buf`.
///
/// Returns the request and the number of consumed bytes, `None` when more
/// data is needed, or an error on a malformed frame.
pub fn parse_frame(buf: &[u8]) -> Result<Option<(IpcRequest, usize)>> {
    if buf.len() < HEADER_LEN {
        // incomplete magic is only acceptable as a prefix of more to come
        if !MAGIC.starts_with(&buf[..buf.len().min(6)]) {
            return Err(Error::IpcProtocol("bad magic".to_string()));
        }
        return Ok(None);
    }

    if &buf[..6] != MAGIC {
        return Err(Error::IpcProtocol("bad magic".to_string()));
    }

    let len = LittleEndian::read_u32(&buf[6..10]) as usize;
    let message_type = LittleEndian::read_u32(&buf[10..14]);

    if buf.len() < HEADER_LEN + len {
        return Ok(None);
    }

    let payload = &buf[HEADER_LEN..HEADER_LEN + len];
    let request = match message_type {
        msg::COMMAND => {
            let cmd = std::str::from_utf8(payload)
                .map_err(|_| Error::IpcProtocol("command payload is not UTF-8".to_string()))?
                .trim_end_matches('\0');
            IpcRequest::Command(cmd.to_string())
        }
        msg::GET_WORKSPACES => IpcRequest::GetWorkspaces,
        msg::GET_OUTPUTS => IpcRequest::GetOutputs,
        msg::SUBSCRIBE => {
            let events: Vec<String> = serde_json::from_slice(payload)
                .map_err(|_| Error::IpcProtocol("subscribe payload is not a JSON array".to_string()))?;
            IpcRequest::Subscribe(events)
        }
        other => {
            return Err(Error::IpcProtocol(format!("unknown message type {other}")));
        }
    };

    Ok(Some((request, HEADER_LEN + len)))
}
