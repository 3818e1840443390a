//! Key bindings: translating configured keysym bindings into grabbable
//! keycodes and looking up commands for incoming key presses.
use crate::{
    x::{KeyboardMapping, ModifierMapping, XConn},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// A u16 X modifier bitmask
pub type KeyCodeMask = u16;

/// X modifier mask bits by conventional name
pub mod modmask {
    /// Shift
    pub const SHIFT: u16 = 1 << 0;
    /// Caps Lock
    pub const LOCK: u16 = 1 << 1;
    /// Control
    pub const CONTROL: u16 = 1 << 2;
    /// Mod1 (usually Alt)
    pub const MOD1: u16 = 1 << 3;
    /// Mod2 (usually NumLock)
    pub const MOD2: u16 = 1 << 4;
    /// Mod3
    pub const MOD3: u16 = 1 << 5;
    /// Mod4 (usually Super)
    pub const MOD4: u16 = 1 << 6;
    /// Mod5
    pub const MOD5: u16 = 1 << 7;
}

/// Internal modifier bit marking a binding as requiring the Mode_switch
/// group. Deliberately outside the range of the u16 X modifier mask.
pub const BIND_MODE_SWITCH: u32 = 1 << 16;

// X key events carry the active keyboard group in bits 13-14 of the state.
const XKB_GROUP_MASK: u16 = 0x6000;

/// A key press and held modifiers
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct KeyCode {
    /// The held modifier mask
    pub mask: KeyCodeMask,
    /// The key code that was held
    pub code: u8,
}

impl KeyCode {
    /// Create a new [KeyCode] from this one that removes the given mask
    pub fn ignoring_modifier(&self, mask: KeyCodeMask) -> KeyCode {
        KeyCode {
            mask: self.mask & !mask,
            code: self.code,
        }
    }
}

/// The key half of a binding as it appears in the configuration: either a
/// raw keycode or a key symbol name to be translated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingKey {
    /// Bind a raw keycode directly
    Code(u8),
    /// Bind by key symbol name, translated on (re)load and MappingNotify
    Sym(String),
}

/// One configured key binding: a modifier mask (possibly including
/// [BIND_MODE_SWITCH]), a key and the command string to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Modifier mask, with bit 16 carrying the Mode_switch requirement
    pub mods: u32,
    /// Keycode or keysym to bind
    pub key: BindingKey,
    /// The command to run when the binding fires
    pub command: String,
}

impl Binding {
    /// A keysym based binding.
    pub fn sym(mods: u32, name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            mods,
            key: BindingKey::Sym(name.into()),
            command: command.into(),
        }
    }
}

/// The active, translated key table: the product of the configured bindings
/// of the current binding mode and the server's keyboard mapping.
///
/// Rebuilt whenever the bindings change (mode switch, reload) or the server
/// reports a MappingNotify.
#[derive(Debug, Default, Clone)]
pub struct KeyTable {
    numlock_mask: u16,
    commands: HashMap<(u32, u8), String>,
}

impl KeyTable {
    /// Translate `bindings` against the current keyboard and modifier
    /// mappings.
    pub fn translate(bindings: &[Binding], kb: &KeyboardMapping, mm: &ModifierMapping) -> Self {
        let numlock_mask = numlock_mask(kb, mm);
        let mut commands = HashMap::new();

        for b in bindings {
            let codes = match &b.key {
                BindingKey::Code(code) => vec![*code],
                BindingKey::Sym(name) => match keysym_from_name(name) {
                    Some(sym) => kb.keycodes_for(sym),
                    None => {
                        debug!(%name, "ignoring binding with unknown key name");
                        continue;
                    }
                },
            };

            for code in codes {
                trace!(mods = b.mods, code, command = %b.command, "translated binding");
                commands.insert((b.mods, code), b.command.clone());
            }
        }

        Self {
            numlock_mask,
            commands,
        }
    }

    /// The key grabs needed for this table: each binding is grabbed for the
    /// plain mask, mask + NumLock and mask + NumLock + Lock.
    pub fn grab_codes(&self) -> Vec<KeyCode> {
        let mut grabs = Vec::with_capacity(self.commands.len() * 3);

        for &(mods, code) in self.commands.keys() {
            let mask = (mods & 0xffff) as u16;
            grabs.push(KeyCode { mask, code });
            grabs.push(KeyCode {
                mask: mask | self.numlock_mask,
                code,
            });
            grabs.push(KeyCode {
                mask: mask | self.numlock_mask | modmask::LOCK,
                code,
            });
        }

        grabs.sort_by_key(|k| (k.code, k.mask));
        grabs.dedup();

        grabs
    }

    /// Look up the command for an incoming key press.
    ///
    /// When the Mode_switch group is active the lookup first tries the
    /// binding carrying [BIND_MODE_SWITCH]; on a miss it falls back to the
    /// plain state.
    pub fn command_for(&self, key: KeyCode) -> Option<&str> {
        let group_active = key.mask & XKB_GROUP_MASK != 0;
        let state = key
            .ignoring_modifier(self.numlock_mask | modmask::LOCK | XKB_GROUP_MASK)
            .mask as u32;

        if group_active {
            if let Some(cmd) = self.commands.get(&(state | BIND_MODE_SWITCH, key.code)) {
                return Some(cmd);
            }
        }

        self.commands.get(&(state, key.code)).map(String::as_str)
    }
}

/// Re-translate the given bindings and install the matching grabs, releasing
/// any previous ones. Used at startup, on `mode` switches and on
/// MappingNotify.
pub fn regrab<X: XConn>(x: &X, bindings: &[Binding]) -> Result<KeyTable> {
    let kb = x.keyboard_mapping()?;
    let mm = x.modifier_mapping()?;
    let table = KeyTable::translate(bindings, &kb, &mm);

    x.ungrab_keys()?;
    x.grab_keys(&table.grab_codes())?;

    Ok(table)
}

/// Determine the modifier mask NumLock is attached to by scanning the
/// modifier mapping for the Num_Lock keysym.
pub fn numlock_mask(kb: &KeyboardMapping, mm: &ModifierMapping) -> u16 {
    const XK_NUM_LOCK: u32 = 0xff7f;

    kb.keycodes_for(XK_NUM_LOCK)
        .into_iter()
        .find_map(|code| mm.mask_for_keycode(code))
        .unwrap_or(0)
}

/// Translate a key name from the configuration into an X keysym value.
///
/// Single latin-1 characters map directly to their codepoint; everything
/// else goes through the table of named keys.
pub fn keysym_from_name(name: &str) -> Option<u32> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if (c as u32) < 0x100 {
            return Some(c as u32);
        }
    }

    let sym = match name {
        "Return" => 0xff0d,
        "Escape" => 0xff1b,
        "Tab" => 0xff09,
        "BackSpace" => 0xff08,
        "Delete" => 0xffff,
        "Home" => 0xff50,
        "End" => 0xff57,
        "Prior" => 0xff55,
        "Next" => 0xff56,
        "Left" => 0xff51,
        "Up" => 0xff52,
        "Right" => 0xff53,
        "Down" => 0xff54,
        "space" => 0x20,
        "Mode_switch" => 0xff7e,
        "Num_Lock" => 0xff7f,
        "F1" => 0xffbe,
        "F2" => 0xffbf,
        "F3" => 0xffc0,
        "F4" => 0xffc1,
        "F5" => 0xffc2,
        "F6" => 0xffc3,
        "F7" => 0xffc4,
        "F8" => 0xffc5,
        "F9" => 0xffc6,
        "F10" => 0xffc7,
        "F11" => 0xffc8,
        "F12" => 0xffc9,
        _ => return None,
    };

    Some(sym)
}

/// Parse a config binding spec such as `Mod1+Shift+h` into a modifier mask
/// and key name.
pub fn parse_binding_spec(spec: &str) -> Result<(u32, BindingKey)> {
    let mut mods = 0u32;
    let mut key = None;

    for part in spec.split('+') {
        match part {
            "Shift" => mods |= modmask::SHIFT as u32,
            "Control" | "Ctrl" => mods |= modmask::CONTROL as u32,
            "Mod1" => mods |= modmask::MOD1 as u32,
            "Mod2" => mods |= modmask::MOD2 as u32,
            "Mod3" => mods |= modmask::MOD3 as u32,
            "Mod4" => mods |= modmask::MOD4 as u32,
            "Mod5" => mods |= modmask::MOD5 as u32,
            "Mode_switch" => mods |= BIND_MODE_SWITCH,
            name => {
                if key.is_some() {
                    return Err(Error::UnknownKeyName(spec.to_string()));
                }
                key = Some(name.to_string());
            }
        }
    }

    match key {
        Some(name) if keysym_from_name(&name).is_some() => Ok((mods, BindingKey::Sym(name))),
        Some(name) => match name.parse::<u8>() {
            Ok(code) => Ok((mods, BindingKey::Code(code))),
            Err(_) => Err(Error::UnknownKeyName(name)),
        },
        None => Err(Error::UnknownKeyName(spec.to_string())),
    }
}
