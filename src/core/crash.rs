//! Fault handling: async-signal-safe flag setting plus the interactive
//! crash popup driven from the normal event path.
//!
//! The signal handlers themselves only record what happened; the main loop
//! notices the flags and runs the UI, so no X calls ever happen in signal
//! context.
use crate::{
    core::State,
    draw::{Draw, TextRun},
    pure::geometry::Rect,
    x::{WinType, XConn, XEvent},
    Result,
};
use nix::sys::signal::{raise, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::os::unix::process::CommandExt;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use tracing::{error, info};

static FAULT_SIGNAL: AtomicI32 = AtomicI32::new(0);
static TERMINATE: AtomicBool = AtomicBool::new(false);
static RELOAD: AtomicBool = AtomicBool::new(false);

extern "C" fn on_fault(sig: i32) {
    FAULT_SIGNAL.store(sig, Ordering::SeqCst);
}

extern "C" fn on_terminate(_: i32) {
    TERMINATE.store(true, Ordering::SeqCst);
}

extern "C" fn on_reload(_: i32) {
    RELOAD.store(true, Ordering::SeqCst);
}

/// Install the SIGSEGV/SIGFPE fault handlers plus the termination and
/// reload handlers.
///
/// SA_RESETHAND means a second fault while we are showing the crash UI
/// takes the process down with the default action instead of looping.
pub fn install_signal_handlers() {
    let fault = SigAction::new(
        SigHandler::Handler(on_fault),
        SaFlags::SA_NODEFER | SaFlags::SA_RESETHAND,
        SigSet::empty(),
    );
    let term = SigAction::new(SigHandler::Handler(on_terminate), SaFlags::empty(), SigSet::empty());
    let reload = SigAction::new(SigHandler::Handler(on_reload), SaFlags::empty(), SigSet::empty());

    unsafe {
        for sig in [Signal::SIGSEGV, Signal::SIGFPE] {
            if let Err(e) = sigaction(sig, &fault) {
                error!(%sig, %e, "unable to install fault handler");
            }
        }
        for sig in [Signal::SIGINT, Signal::SIGTERM] {
            if let Err(e) = sigaction(sig, &term) {
                error!(%sig, %e, "unable to install termination handler");
            }
        }
        if let Err(e) = sigaction(Signal::SIGUSR1, &reload) {
            error!(%e, "unable to install reload handler");
        }
    }
}

/// The pending fault signal, if one arrived since the last check.
pub fn take_fault() -> Option<i32> {
    match FAULT_SIGNAL.swap(0, Ordering::SeqCst) {
        0 => None,
        sig => Some(sig),
    }
}

/// Whether SIGINT/SIGTERM arrived since the last check.
pub fn take_termination_request() -> bool {
    TERMINATE.swap(false, Ordering::SeqCst)
}

/// Whether SIGUSR1 arrived since the last check.
pub fn take_reload_request() -> bool {
    RELOAD.swap(false, Ordering::SeqCst)
}

/// Show the crash popup on every active output and wait for the user's
/// decision: `e` re-raises the fault (core dump), `r` re-executes the
/// running image in place.
pub fn run_crash_ui<X: XConn, D: Draw>(x: &X, d: &D, state: &State, sig: i32) -> Result<()> {
    error!(sig, "fault received, showing crash UI");

    let lines = [
        format!("lattice received signal {sig}"),
        "press 'e' to exit (core dump), 'r' to restart in place".to_string(),
    ];

    let font_h = d.font_height();
    let width = 60 * font_h.max(8);
    let height = 4 * font_h + 8;

    let mut popups = Vec::new();
    for output in state.model.outputs.iter().filter(|o| o.active) {
        let r = Rect::new(0, 0, width.min(output.rect.w), height)
            .centered_in(&output.rect)
            .unwrap_or(output.rect);
        let win = x.create_window(WinType::Popup, r)?;
        x.map(win)?;

        for (i, line) in lines.iter().enumerate() {
            let ucs2: Vec<u16> = line.chars().map(|c| c as u32 as u16).collect();
            d.draw_text(
                win,
                4,
                4 + (i as u32 * (font_h + 2)) as i32,
                crate::Color::new_from_hex(0xffffffff),
                crate::Color::new_from_hex(0x900000ff),
                TextRun::Ucs2(&ucs2),
            )?;
        }
        popups.push(win);
    }
    x.flush();

    if !x.grab_keyboard()? {
        error!("unable to grab keyboard for crash UI");
    }

    let kb = x.keyboard_mapping()?;
    let exit_codes = kb.keycodes_for('e' as u32);
    let restart_codes = kb.keycodes_for('r' as u32);

    let decision = loop {
        match x.next_event()? {
            XEvent::KeyPress(key) if exit_codes.contains(&key.code) => break 'e',
            XEvent::KeyPress(key) if restart_codes.contains(&key.code) => break 'r',
            _ => (),
        }
    };

    x.ungrab_keyboard()?;
    for win in popups {
        let _ = x.destroy_window(win);
    }
    x.flush();

    match decision {
        // the handler was installed with SA_RESETHAND, so raising again
        // runs the default action and produces the core dump
        'e' => {
            info!("re-raising fault signal");
            if let Ok(sig) = Signal::try_from(sig) {
                let _ = raise(sig);
            }
            std::process::exit(1);
        }
        _ => exec_self(),
    }
}

/// Replace the running process image with a fresh copy of ourselves,
/// preserving the command line.
pub fn exec_self() -> ! {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let exe = std::env::current_exe().unwrap_or_else(|_| "/proc/self/exe".into());
    info!(?exe, "re-executing");

    let err = std::process::Command::new(exe).args(args).exec();
    error!(%err, "exec failed");
    std::process::exit(1);
}
