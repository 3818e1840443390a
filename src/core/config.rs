//! The runtime configuration of the window manager.
//!
//! Parsing a config file into this structure is not handled here: the
//! manager consumes an already populated [Config], normally produced by a
//! separate loader, and [Config::default] provides the stock settings.
use crate::{
    core::bindings::{modmask, Binding},
    draw::ColorTriple,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Client decoration palettes per state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClientColors {
    /// Focused client in the focused container
    pub focused: ColorTriple,
    /// Focused client of a container that is not the current one
    pub focused_inactive: ColorTriple,
    /// All other clients
    pub unfocused: ColorTriple,
    /// Clients with the urgency hint set
    pub urgent: ColorTriple,
}

/// Palette of the internal workspace bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarColors {
    /// The workspace shown on the focused output
    pub focused: ColorTriple,
    /// All other workspaces
    pub unfocused: ColorTriple,
    /// Workspaces holding an urgent client
    pub urgent: ColorTriple,
}

/// Border style applied to newly managed clients.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorderStyle {
    /// Titlebar plus border
    #[default]
    Normal,
    /// A one pixel border, no titlebar
    OnePixel,
    /// No decoration at all
    Borderless,
}

/// Where an assignment places matching clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentTarget {
    /// Move the client to this workspace (0-based)
    Workspace(usize),
    /// Start the client floating on its current workspace
    FloatingOnly,
    /// Start the client floating on this workspace (0-based)
    FloatingWith(usize),
}

/// A startup-time rule matching new clients by class/title and routing them
/// to a workspace and/or the floating layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// `"class"` or `"class/title"` pattern; a trailing `*` matches any
    /// suffix
    pub pattern: String,
    /// Where matching clients go
    pub target: AssignmentTarget,
}

impl Assignment {
    /// Whether this assignment matches the given WM_CLASS class and title.
    pub fn matches(&self, class: &str, title: &str) -> bool {
        let (class_pat, title_pat) = match self.pattern.split_once('/') {
            Some((c, t)) => (c, Some(t)),
            None => (self.pattern.as_str(), None),
        };

        glob_match(class_pat, class)
            && title_pat.map(|p| glob_match(p, title)).unwrap_or(true)
    }
}

fn glob_match(pattern: &str, value: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => pattern == value,
    }
}

/// Screen edge for a status bar.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarPosition {
    /// Reserve space at the bottom edge
    #[default]
    Bottom,
    /// Reserve space at the top edge
    Top,
}

/// Settings for one external status bar instance, published over IPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarConfig {
    /// Identifier the bar process uses to request its config
    pub id: String,
    /// Which edge the bar docks to
    pub position: BarPosition,
    /// Command producing status line input, if any
    pub status_command: Option<String>,
    /// Font override for this bar
    pub font: Option<String>,
}

/// The complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// X core font used for decorations and the internal bar
    pub font: String,
    /// Client decoration palettes
    pub colors: ClientColors,
    /// Internal bar palettes
    pub bar_colors: BarColors,
    /// Border style for new clients
    pub default_border: BorderStyle,
    /// Terminal started by the default Return binding
    pub terminal: String,
    /// Path of the IPC socket; the `I3SOCK` environment variable wins over
    /// this when set
    pub ipc_socket_path: Option<String>,
    /// Modifier held to drag / resize floating clients with the mouse
    pub floating_modifier: u16,
    /// Key bindings per binding mode; `"default"` must exist
    pub modes: HashMap<String, Vec<Binding>>,
    /// Window assignment rules, applied in order, first match wins
    pub assignments: Vec<Assignment>,
    /// Preferred output per workspace (0-based workspace number)
    pub workspace_outputs: Vec<(usize, String)>,
    /// External status bar configs served over IPC
    pub bars: Vec<BarConfig>,
    /// Minimum pixel size a tiled track may be resized down to
    pub min_track_px: u32,
}

impl Default for Config {
    fn default() -> Self {
        let triple = |b, bg, t: &str| {
            ColorTriple::from_hex(b, bg, t).expect("valid hex code")
        };

        let mods = modmask::MOD1 as u32;
        let shifted = (modmask::MOD1 | modmask::SHIFT) as u32;

        let mut default_bindings = vec![
            Binding::sym(mods, "Return", "exec x-terminal-emulator"),
            Binding::sym(mods, "f", "f"),
            Binding::sym(shifted, "f", "fg"),
            Binding::sym(mods, "s", "s"),
            Binding::sym(mods, "e", "d"),
            Binding::sym(mods, "w", "T"),
            Binding::sym(shifted, "space", "t"),
            Binding::sym(shifted, "q", "kill"),
            Binding::sym(shifted, "c", "reload"),
            Binding::sym(shifted, "r", "restart"),
            Binding::sym(shifted, "e", "exit"),
        ];

        for (key, dir) in [("h", "h"), ("j", "j"), ("k", "k"), ("l", "l")] {
            default_bindings.push(Binding::sym(mods, key, dir));
            default_bindings.push(Binding::sym(shifted, key, format!("m{dir}")));
        }

        for n in 1..=9usize {
            default_bindings.push(Binding::sym(mods, n.to_string(), n.to_string()));
            default_bindings.push(Binding::sym(shifted, n.to_string(), format!("m{n}")));
        }
        default_bindings.push(Binding::sym(mods, "0", "10"));
        default_bindings.push(Binding::sym(shifted, "0", "m10"));

        let mut modes = HashMap::new();
        modes.insert("default".to_string(), default_bindings);

        Self {
            font: "-misc-fixed-medium-r-normal--13-120-75-75-C-70-iso10646-1".to_string(),
            colors: ClientColors {
                focused: triple("#4c7899", "#285577", "#ffffff"),
                focused_inactive: triple("#333333", "#5f676a", "#ffffff"),
                unfocused: triple("#333333", "#222222", "#888888"),
                urgent: triple("#2f343a", "#900000", "#ffffff"),
            },
            bar_colors: BarColors {
                focused: triple("#4c7899", "#285577", "#ffffff"),
                unfocused: triple("#333333", "#222222", "#888888"),
                urgent: triple("#2f343a", "#900000", "#ffffff"),
            },
            default_border: BorderStyle::Normal,
            terminal: "x-terminal-emulator".to_string(),
            ipc_socket_path: None,
            floating_modifier: modmask::MOD1,
            modes,
            assignments: Vec::new(),
            workspace_outputs: Vec::new(),
            bars: Vec::new(),
            min_track_px: 50,
        }
    }
}

impl Config {
    /// The bindings of the named mode, falling back to `"default"`.
    pub fn bindings_for_mode(&self, mode: &str) -> &[Binding] {
        self.modes
            .get(mode)
            .or_else(|| self.modes.get("default"))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first assignment matching the given class and title, if any.
    pub fn assignment_for(&self, class: &str, title: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.matches(class, title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case("URxvt", "URxvt", "anything", true; "class only")]
    #[test_case("URxvt/irssi", "URxvt", "irssi", true; "class and title")]
    #[test_case("URxvt/irssi", "URxvt", "mutt", false; "title mismatch")]
    #[test_case("URx*", "URxvt", "x", true; "class glob")]
    #[test_case("Gimp", "URxvt", "x", false; "class mismatch")]
    #[test]
    fn assignment_matching(pattern: &str, class: &str, title: &str, expected: bool) {
        let a = Assignment {
            pattern: pattern.to_string(),
            target: AssignmentTarget::Workspace(0),
        };

        assert_eq!(a.matches(class, title), expected);
    }

    #[test]
    fn default_config_has_default_mode() {
        let config = Config::default();

        assert!(!config.bindings_for_mode("default").is_empty());
        // unknown modes fall back to the default bindings
        assert_eq!(
            config.bindings_for_mode("no-such-mode").len(),
            config.bindings_for_mode("default").len()
        );
    }
}
