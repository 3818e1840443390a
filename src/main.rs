//! The lattice binary: connect, load the configuration and run.
use lattice::{
    core::{config::Config, WindowManager},
    ipc::{socket_path, IpcServer},
    x11rb::{Conn, CoreFontDraw},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> lattice::Result<()> {
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--version" => {
                println!("lattice {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::default();
    info!("connecting to the X server");
    let conn = Conn::new()?;
    let draw = CoreFontDraw::new()?;

    let path = socket_path(config.ipc_socket_path.as_deref());
    info!(?path, "binding IPC socket");
    let ipc = IpcServer::bind(path)?;

    WindowManager::new(config, conn, draw, ipc)?
        .with_config_loader(|| Ok(Config::default()))
        .run()
}
