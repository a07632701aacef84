//! Parsing and formatting of human-readable hotkey combos such as `Ctrl+Shift+V`.

use crate::error::{Result, TypistError};
use global_hotkey::hotkey::{Code, Modifiers};

/// Canonical key names, in the form `format_combo` emits.
const KEY_TABLE: &[(&str, Code)] = &[
    ("A", Code::KeyA),
    ("B", Code::KeyB),
    ("C", Code::KeyC),
    ("D", Code::KeyD),
    ("E", Code::KeyE),
    ("F", Code::KeyF),
    ("G", Code::KeyG),
    ("H", Code::KeyH),
    ("I", Code::KeyI),
    ("J", Code::KeyJ),
    ("K", Code::KeyK),
    ("L", Code::KeyL),
    ("M", Code::KeyM),
    ("N", Code::KeyN),
    ("O", Code::KeyO),
    ("P", Code::KeyP),
    ("Q", Code::KeyQ),
    ("R", Code::KeyR),
    ("S", Code::KeyS),
    ("T", Code::KeyT),
    ("U", Code::KeyU),
    ("V", Code::KeyV),
    ("W", Code::KeyW),
    ("X", Code::KeyX),
    ("Y", Code::KeyY),
    ("Z", Code::KeyZ),
    ("0", Code::Digit0),
    ("1", Code::Digit1),
    ("2", Code::Digit2),
    ("3", Code::Digit3),
    ("4", Code::Digit4),
    ("5", Code::Digit5),
    ("6", Code::Digit6),
    ("7", Code::Digit7),
    ("8", Code::Digit8),
    ("9", Code::Digit9),
    ("F1", Code::F1),
    ("F2", Code::F2),
    ("F3", Code::F3),
    ("F4", Code::F4),
    ("F5", Code::F5),
    ("F6", Code::F6),
    ("F7", Code::F7),
    ("F8", Code::F8),
    ("F9", Code::F9),
    ("F10", Code::F10),
    ("F11", Code::F11),
    ("F12", Code::F12),
    ("F13", Code::F13),
    ("F14", Code::F14),
    ("F15", Code::F15),
    ("F16", Code::F16),
    ("F17", Code::F17),
    ("F18", Code::F18),
    ("F19", Code::F19),
    ("F20", Code::F20),
    ("F21", Code::F21),
    ("F22", Code::F22),
    ("F23", Code::F23),
    ("F24", Code::F24),
    ("Space", Code::Space),
    ("Enter", Code::Enter),
    ("Tab", Code::Tab),
    ("Escape", Code::Escape),
    ("Backspace", Code::Backspace),
    ("Delete", Code::Delete),
    ("Insert", Code::Insert),
    ("Home", Code::Home),
    ("End", Code::End),
    ("PageUp", Code::PageUp),
    ("PageDown", Code::PageDown),
    ("Up", Code::ArrowUp),
    ("Down", Code::ArrowDown),
    ("Left", Code::ArrowLeft),
    ("Right", Code::ArrowRight),
    ("PrintScreen", Code::PrintScreen),
    ("ScrollLock", Code::ScrollLock),
    ("Pause", Code::Pause),
    ("NumLock", Code::NumLock),
    ("CapsLock", Code::CapsLock),
    ("Minus", Code::Minus),
    ("Equal", Code::Equal),
    ("BracketLeft", Code::BracketLeft),
    ("BracketRight", Code::BracketRight),
    ("Backslash", Code::Backslash),
    ("Semicolon", Code::Semicolon),
    ("Quote", Code::Quote),
    ("Comma", Code::Comma),
    ("Period", Code::Period),
    ("Slash", Code::Slash),
    ("Backquote", Code::Backquote),
];

/// Alternative spellings accepted by `parse_combo`.
const KEY_SYNONYMS: &[(&str, Code)] = &[
    ("Return", Code::Enter),
    ("Esc", Code::Escape),
    ("Del", Code::Delete),
    ("Ins", Code::Insert),
    ("PgUp", Code::PageUp),
    ("PgDn", Code::PageDown),
    ("PageDn", Code::PageDown),
    ("ArrowUp", Code::ArrowUp),
    ("ArrowDown", Code::ArrowDown),
    ("ArrowLeft", Code::ArrowLeft),
    ("ArrowRight", Code::ArrowRight),
    ("PrtSc", Code::PrintScreen),
    ("PrintScrn", Code::PrintScreen),
    ("Break", Code::Pause),
    ("Plus", Code::Equal),
    ("Dot", Code::Period),
    ("Grave", Code::Backquote),
    ("Tilde", Code::Backquote),
    ("-", Code::Minus),
    ("=", Code::Equal),
    ("[", Code::BracketLeft),
    ("]", Code::BracketRight),
    ("\\", Code::Backslash),
    (";", Code::Semicolon),
    ("'", Code::Quote),
    (",", Code::Comma),
    (".", Code::Period),
    ("/", Code::Slash),
    ("`", Code::Backquote),
];

/// Modifiers in the order `format_combo` writes them.
const MODIFIER_NAMES: &[(&str, Modifiers)] = &[
    ("Ctrl", Modifiers::CONTROL),
    ("Alt", Modifiers::ALT),
    ("Shift", Modifiers::SHIFT),
    ("Win", Modifiers::SUPER),
];

fn parse_modifier(token: &str) -> Option<Modifiers> {
    let lower = token.to_ascii_lowercase();
    let modifier = match lower.as_str() {
        "ctrl" | "control" | "ctl" => Modifiers::CONTROL,
        "alt" | "option" | "opt" => Modifiers::ALT,
        "shift" => Modifiers::SHIFT,
        "win" | "windows" | "super" | "meta" | "cmd" | "command" => Modifiers::SUPER,
        _ => return None,
    };
    Some(modifier)
}

fn lookup_key(token: &str) -> Option<Code> {
    KEY_TABLE
        .iter()
        .chain(KEY_SYNONYMS.iter())
        .find(|(name, _)| name.eq_ignore_ascii_case(token))
        .map(|(_, code)| *code)
}

/// Canonical name of a key, if it is in the supported table.
pub fn key_name(code: Code) -> Option<&'static str> {
    KEY_TABLE
        .iter()
        .find(|(_, candidate)| *candidate == code)
        .map(|(name, _)| *name)
}

/// Every key `parse_combo` can produce.
pub fn supported_keys() -> impl Iterator<Item = Code> {
    KEY_TABLE.iter().map(|(_, code)| *code)
}

/// Parse `Modifier(+Modifier)*+Key` into a modifier set and a key.
///
/// All tokens but the last are modifiers; the modifier list may be empty.
pub fn parse_combo(combo: &str) -> Result<(Modifiers, Code)> {
    let trimmed = combo.trim();
    if trimmed.is_empty() {
        return Err(TypistError::invalid_hotkey(combo, "hotkey is empty"));
    }

    let tokens: Vec<&str> = trimmed.split('+').map(str::trim).collect();
    let Some((key_token, modifier_tokens)) = tokens.split_last() else {
        return Err(TypistError::invalid_hotkey(combo, "hotkey is empty"));
    };

    let mut modifiers = Modifiers::empty();
    for token in modifier_tokens {
        if token.is_empty() {
            return Err(TypistError::invalid_hotkey(combo, "empty modifier"));
        }
        let modifier = parse_modifier(token).ok_or_else(|| {
            TypistError::invalid_hotkey(combo, format!("unknown modifier '{}'", token))
        })?;
        modifiers |= modifier;
    }

    if key_token.is_empty() {
        return Err(TypistError::invalid_hotkey(combo, "missing key"));
    }
    let code = lookup_key(key_token)
        .ok_or_else(|| TypistError::invalid_hotkey(combo, format!("unknown key '{}'", key_token)))?;

    Ok((modifiers, code))
}

/// Format a modifier set and key in canonical `Ctrl+Alt+Shift+Win+Key` form.
pub fn format_combo(modifiers: Modifiers, code: Code) -> String {
    let mut parts: Vec<String> = MODIFIER_NAMES
        .iter()
        .filter(|(_, flag)| modifiers.contains(*flag))
        .map(|(name, _)| name.to_string())
        .collect();

    match key_name(code) {
        Some(name) => parts.push(name.to_string()),
        None => parts.push(format!("{:?}", code)),
    }
    parts.join("+")
}

/// Parse and re-format, yielding the canonical spelling of a combo.
pub fn normalize_combo(combo: &str) -> Result<String> {
    let (modifiers, code) = parse_combo(combo)?;
    Ok(format_combo(modifiers, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_combo() {
        let (mods, code) = parse_combo("Ctrl+Shift+V").unwrap();
        assert_eq!(mods, Modifiers::CONTROL | Modifiers::SHIFT);
        assert_eq!(code, Code::KeyV);
    }

    #[test]
    fn modifiers_are_case_insensitive_with_synonyms() {
        let (mods, code) = parse_combo("control+OPTION+cmd+f12").unwrap();
        assert_eq!(mods, Modifiers::CONTROL | Modifiers::ALT | Modifiers::SUPER);
        assert_eq!(code, Code::F12);
    }

    #[test]
    fn key_without_modifiers() {
        assert_eq!(parse_combo("F9").unwrap(), (Modifiers::empty(), Code::F9));
    }

    #[test]
    fn whitespace_around_tokens_is_ignored() {
        assert_eq!(
            parse_combo(" Alt + PgDn ").unwrap(),
            (Modifiers::ALT, Code::PageDown)
        );
    }

    #[test]
    fn punctuation_by_symbol_and_name() {
        assert_eq!(parse_combo("Ctrl+;").unwrap().1, Code::Semicolon);
        assert_eq!(parse_combo("Ctrl+Semicolon").unwrap().1, Code::Semicolon);
        assert_eq!(parse_combo("Ctrl+`").unwrap().1, Code::Backquote);
    }

    #[test]
    fn errors_are_descriptive() {
        let empty = parse_combo("  ").unwrap_err().to_string();
        assert!(empty.contains("empty"), "{}", empty);

        let modifier = parse_combo("Hyper+V").unwrap_err().to_string();
        assert!(modifier.contains("unknown modifier 'Hyper'"), "{}", modifier);

        let key = parse_combo("Ctrl+Banana").unwrap_err().to_string();
        assert!(key.contains("unknown key 'Banana'"), "{}", key);

        let missing = parse_combo("Ctrl+").unwrap_err().to_string();
        assert!(missing.contains("missing key"), "{}", missing);

        assert!(parse_combo("Ctrl++V").is_err());
    }

    #[test]
    fn format_uses_canonical_order() {
        let mods = Modifiers::SUPER | Modifiers::SHIFT | Modifiers::CONTROL;
        assert_eq!(format_combo(mods, Code::KeyK), "Ctrl+Shift+Win+K");
        assert_eq!(format_combo(Modifiers::empty(), Code::Escape), "Escape");
    }

    #[test]
    fn normalize_rewrites_synonyms() {
        assert_eq!(normalize_combo("shift+ctl+return").unwrap(), "Ctrl+Shift+Enter");
    }

    #[test]
    fn round_trip_over_key_table() {
        let all = Modifiers::CONTROL | Modifiers::ALT | Modifiers::SHIFT | Modifiers::SUPER;
        for mods in [Modifiers::empty(), Modifiers::CONTROL | Modifiers::SHIFT, all] {
            for code in supported_keys() {
                let text = format_combo(mods, code);
                assert_eq!(parse_combo(&text).unwrap(), (mods, code), "{}", text);
            }
        }
    }
}
