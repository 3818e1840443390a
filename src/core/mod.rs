//! Core data structures and the window manager event loop
use crate::{
    draw::Draw,
    ipc::{IpcEvent, IpcRequest, IpcServer},
    layout::render_layout,
    pure::Model,
    x::{ClientAttr, XConn},
    Result, Xid,
};
use nix::{
    poll::{poll, PollFd, PollFlags},
    sys::signal::{signal, SigHandler, Signal},
};
use tracing::{debug, error, info, span, trace, warn, Level};

pub mod bindings;
pub mod commands;
pub mod config;
pub mod crash;
pub mod drag;
pub mod handle;
pub mod outputs;

use bindings::KeyTable;
use config::Config;

/// How many times the initial key grab is retried while another window
/// manager may still be shutting down.
const GRAB_ATTEMPTS: usize = 500;

/// Mutable state of the running window manager: the pure model plus the
/// active configuration and input translation tables.
#[derive(Debug)]
pub struct State {
    /// The active configuration
    pub config: Config,
    /// The pure data model
    pub model: Model,
    /// The root window of the managed screen
    pub root: Xid,
    /// The translated key table for the active binding mode
    pub keymap: KeyTable,
    /// Name of the active binding mode
    pub binding_mode: String,
    /// IPC events generated by handlers, drained by the event loop
    pub pending_ipc_events: Vec<IpcEvent>,
    /// Set by the `exit` command / SIGTERM: leave the event loop
    pub halt: bool,
    /// Set by the `restart` command: re-exec the running image
    pub restart: bool,
    /// Set by the `reload` command / SIGUSR1: re-run the config loader
    pub reload: bool,
}

impl State {
    /// Queue an IPC event for broadcast at the end of the current handler.
    pub fn push_ipc_event(&mut self, ev: IpcEvent) {
        self.pending_ipc_events.push(ev);
    }
}

/// A top level struct holding all of the state required to run as an X11
/// window manager.
pub struct WindowManager<X, D>
where
    X: XConn,
    D: Draw,
{
    x: X,
    draw: D,
    /// All mutable window manager state
    pub state: State,
    ipc: IpcServer,
    config_loader: Option<Box<dyn Fn() -> Result<Config>>>,
}

impl<X, D> std::fmt::Debug for WindowManager<X, D>
where
    X: XConn,
    D: Draw,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowManager")
            .field("state", &self.state)
            .finish()
    }
}

impl<X, D> WindowManager<X, D>
where
    X: XConn,
    D: Draw,
{
    /// Construct a new [WindowManager] with the provided config, X
    /// connection and draw service.
    pub fn new(config: Config, x: X, mut draw: D, ipc: IpcServer) -> Result<Self> {
        draw.load_font(&config.font)?;

        let state = State {
            root: x.root(),
            config,
            model: Model::new(),
            keymap: KeyTable::default(),
            binding_mode: "default".to_string(),
            pending_ipc_events: Vec::new(),
            halt: false,
            restart: false,
            reload: false,
        };

        Ok(Self {
            x,
            draw,
            state,
            ipc,
            config_loader: None,
        })
    }

    /// Install a closure that produces a fresh [Config] for the `reload`
    /// command. Reload keeps the previous config when the closure errors.
    pub fn with_config_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> Result<Config> + 'static,
    {
        self.config_loader = Some(Box::new(loader));
        self
    }

    /// Start the window manager and run it until told to exit.
    pub fn run(mut self) -> Result<()> {
        info!("registering signal handlers");
        crash::install_signal_handlers();
        if let Err(e) = unsafe { signal(Signal::SIGCHLD, SigHandler::SigIgn) } {
            panic!("unable to set signal handler: {}", e);
        }

        info!("selecting root window events");
        self.x
            .set_client_attributes(self.state.root, &[ClientAttr::RootEventMask])?;

        for (ws, name) in self.state.config.workspace_outputs.clone() {
            self.state.model.workspace_get(ws).preferred_output = Some(name);
        }

        info!("performing initial output discovery");
        outputs::update_outputs(&self.x, &self.draw, &mut self.state)?;

        info!("setting EWMH root properties");
        handle::set_ewmh_root_properties(&self.x, &self.state)?;

        self.grab_with_retries()?;

        info!("managing existing clients");
        for id in self.x.existing_clients()? {
            if let Err(e) = handle::manage_window(&self.x, &self.draw, &mut self.state, id, true) {
                warn!(%id, %e, "unable to manage existing window");
            }
        }

        render_layout(&self.x, &self.draw, &mut self.state.model, &self.state.config)?;
        self.x.flush();

        self.event_loop()
    }

    // Another WM may still hold the grab while we start up; retry at 1ms
    // intervals before giving up.
    fn grab_with_retries(&mut self) -> Result<()> {
        let bindings = self
            .state
            .config
            .bindings_for_mode(&self.state.binding_mode)
            .to_vec();

        let mut last_err = None;
        for attempt in 0..GRAB_ATTEMPTS {
            match bindings::regrab(&self.x, &bindings) {
                Ok(table) => {
                    self.state.keymap = table;
                    return Ok(());
                }
                Err(e) => {
                    trace!(attempt, "keyboard grab failed, retrying");
                    last_err = Some(e);
                    std::thread::sleep(std::time::Duration::from_millis(1));
                }
            }
        }

        Err(last_err.expect("at least one grab attempt was made"))
    }

    fn event_loop(&mut self) -> Result<()> {
        loop {
            // drain everything the X connection already has buffered before
            // blocking
            while let Some(event) = self.x.poll_event()? {
                let span = span!(target: "lattice", Level::DEBUG, "XEvent", %event);
                let _enter = span.enter();
                trace!(details = ?event, "event details");

                if let Err(e) = handle::handle_xevent(&self.x, &self.draw, &mut self.state, event) {
                    error!(%e, "error handling X event");
                }
                self.after_handler()?;
            }
            self.x.flush();

            self.service_ipc()?;

            if let Some(sig) = crash::take_fault() {
                crash::run_crash_ui(&self.x, &self.draw, &self.state, sig)?;
            }
            if crash::take_termination_request() {
                self.state.halt = true;
            }
            if crash::take_reload_request() {
                self.state.reload = true;
                self.after_handler()?;
            }

            if self.state.halt || self.state.restart {
                break;
            }

            self.await_activity()?;
        }

        self.shutdown()
    }

    // Post-handler bookkeeping: pending binding mode changes, reloads and
    // queued IPC events.
    fn after_handler(&mut self) -> Result<()> {
        if self.state.reload {
            self.state.reload = false;
            self.reload_config();
        }

        for ev in std::mem::take(&mut self.state.pending_ipc_events) {
            self.ipc.broadcast(ev);
        }

        Ok(())
    }

    fn reload_config(&mut self) {
        let loaded = match &self.config_loader {
            Some(loader) => loader(),
            None => Ok(Config::default()),
        };

        match loaded {
            Ok(config) => {
                info!("applying reloaded configuration");
                self.state.config = config;
                self.state.binding_mode = "default".to_string();
                if let Err(e) = self.grab_with_retries() {
                    error!(%e, "unable to re-grab bindings after reload");
                }
                if let Err(e) = render_layout(
                    &self.x,
                    &self.draw,
                    &mut self.state.model,
                    &self.state.config,
                ) {
                    error!(%e, "unable to re-render after reload");
                }
                self.state
                    .push_ipc_event(IpcEvent::workspace_change("reload"));
                for ev in std::mem::take(&mut self.state.pending_ipc_events) {
                    self.ipc.broadcast(ev);
                }
            }
            // the previous configuration stays active
            Err(e) => error!(%e, "config reload failed, keeping previous configuration"),
        }
    }

    fn service_ipc(&mut self) -> Result<()> {
        for (client, request) in self.ipc.poll_requests() {
            debug!(?request, "ipc request");
            let reply = match request {
                IpcRequest::Command(cmd) => {
                    let result =
                        commands::run_command(&self.x, &self.draw, &mut self.state, &cmd);
                    if let Err(ref e) = result {
                        warn!(%cmd, %e, "ipc command failed");
                    }
                    self.after_handler()?;
                    IpcServer::command_reply(result.is_ok())
                }
                IpcRequest::GetWorkspaces => IpcServer::workspaces_reply(&self.state.model),
                IpcRequest::GetOutputs => IpcServer::outputs_reply(&self.state.model),
                IpcRequest::Subscribe(events) => self.ipc.subscribe(client, &events),
            };

            self.ipc.send_reply(client, reply);
        }

        Ok(())
    }

    // Block until the X connection or one of the IPC sockets is readable.
    fn await_activity(&mut self) -> Result<()> {
        let x_fd = match self.x.connection_fd() {
            Some(fd) => fd,
            // connections without an fd (tests) just block on the next event
            None => return Ok(()),
        };

        let mut fds = vec![PollFd::new(x_fd, PollFlags::POLLIN)];
        for fd in self.ipc.fds() {
            fds.push(PollFd::new(fd, PollFlags::POLLIN));
        }

        // signals interrupt the poll, which is exactly what we want: the
        // loop re-checks the async flags on every wake-up
        if let Err(e) = poll(&mut fds, 1000) {
            if e != nix::errno::Errno::EINTR {
                return Err(crate::Error::Io(std::io::Error::from(e)));
            }
        }

        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        info!("shutting down: restoring client windows");
        if let Err(e) = handle::restore_all_clients(&self.x, &mut self.state) {
            warn!(%e, "unable to restore clients");
        }
        self.ipc.close();

        if self.state.restart {
            info!("restarting in place");
            crash::exec_self();
        }

        Ok(())
    }
}
