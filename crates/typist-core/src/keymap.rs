use rdev::Key;

/// Modifier keys tracked by the input monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKey {
    Shift,
    Control,
    Alt,
    Meta,
    CapsLock,
}

/// What a virtual key means for the typing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedKey {
    Char(char),
    Backspace,
    Modifier(ModifierKey),
    /// Any other non-character key (arrows, function keys, escape, ...).
    Named(&'static str),
}

/// Map a virtual key to a character or a named key, US layout.
///
/// With `fold_case` letters are always lowercase regardless of Shift.
pub fn map_key(key: Key, shift: bool, fold_case: bool) -> MappedKey {
    if let Some(modifier) = modifier_of(key) {
        return MappedKey::Modifier(modifier);
    }

    if key == Key::Backspace {
        return MappedKey::Backspace;
    }

    if let Some(letter) = letter_of(key) {
        let c = if shift && !fold_case {
            letter.to_ascii_uppercase()
        } else {
            letter
        };
        return MappedKey::Char(c);
    }

    if let Some((plain, shifted)) = symbol_of(key) {
        return MappedKey::Char(if shift { shifted } else { plain });
    }

    match key {
        Key::Space => MappedKey::Char(' '),
        Key::Tab => MappedKey::Char('\t'),
        Key::Return | Key::KpReturn => MappedKey::Char('\n'),
        Key::Kp0 => MappedKey::Char('0'),
        Key::Kp1 => MappedKey::Char('1'),
        Key::Kp2 => MappedKey::Char('2'),
        Key::Kp3 => MappedKey::Char('3'),
        Key::Kp4 => MappedKey::Char('4'),
        Key::Kp5 => MappedKey::Char('5'),
        Key::Kp6 => MappedKey::Char('6'),
        Key::Kp7 => MappedKey::Char('7'),
        Key::Kp8 => MappedKey::Char('8'),
        Key::Kp9 => MappedKey::Char('9'),
        Key::KpMinus => MappedKey::Char('-'),
        Key::KpPlus => MappedKey::Char('+'),
        Key::KpMultiply => MappedKey::Char('*'),
        Key::KpDivide => MappedKey::Char('/'),
        other => MappedKey::Named(named_key(other)),
    }
}

fn modifier_of(key: Key) -> Option<ModifierKey> {
    match key {
        Key::ShiftLeft | Key::ShiftRight => Some(ModifierKey::Shift),
        Key::ControlLeft | Key::ControlRight => Some(ModifierKey::Control),
        Key::Alt | Key::AltGr => Some(ModifierKey::Alt),
        Key::MetaLeft | Key::MetaRight => Some(ModifierKey::Meta),
        Key::CapsLock => Some(ModifierKey::CapsLock),
        _ => None,
    }
}

fn letter_of(key: Key) -> Option<char> {
    let c = match key {
        Key::KeyA => 'a',
        Key::KeyB => 'b',
        Key::KeyC => 'c',
        Key::KeyD => 'd',
        Key::KeyE => 'e',
        Key::KeyF => 'f',
        Key::KeyG => 'g',
        Key::KeyH => 'h',
        Key::KeyI => 'i',
        Key::KeyJ => 'j',
        Key::KeyK => 'k',
        Key::KeyL => 'l',
        Key::KeyM => 'm',
        Key::KeyN => 'n',
        Key::KeyO => 'o',
        Key::KeyP => 'p',
        Key::KeyQ => 'q',
        Key::KeyR => 'r',
        Key::KeyS => 's',
        Key::KeyT => 't',
        Key::KeyU => 'u',
        Key::KeyV => 'v',
        Key::KeyW => 'w',
        Key::KeyX => 'x',
        Key::KeyY => 'y',
        Key::KeyZ => 'z',
        _ => return None,
    };
    Some(c)
}

/// (unshifted, shifted) characters for digit and punctuation keys.
fn symbol_of(key: Key) -> Option<(char, char)> {
    let pair = match key {
        Key::Num1 => ('1', '!'),
        Key::Num2 => ('2', '@'),
        Key::Num3 => ('3', '#'),
        Key::Num4 => ('4', '$'),
        Key::Num5 => ('5', '%'),
        Key::Num6 => ('6', '^'),
        Key::Num7 => ('7', '&'),
        Key::Num8 => ('8', '*'),
        Key::Num9 => ('9', '('),
        Key::Num0 => ('0', ')'),
        Key::Minus => ('-', '_'),
        Key::Equal => ('=', '+'),
        Key::LeftBracket => ('[', '{'),
        Key::RightBracket => (']', '}'),
        Key::SemiColon => (';', ':'),
        Key::Quote => ('\'', '"'),
        Key::BackQuote => ('`', '~'),
        Key::BackSlash | Key::IntlBackslash => ('\\', '|'),
        Key::Comma => (',', '<'),
        Key::Dot => ('.', '>'),
        Key::Slash => ('/', '?'),
        _ => return None,
    };
    Some(pair)
}

fn named_key(key: Key) -> &'static str {
    match key {
        Key::Delete | Key::KpDelete => "Delete",
        Key::Insert => "Insert",
        Key::Escape => "Escape",
        Key::Home => "Home",
        Key::End => "End",
        Key::PageUp => "PageUp",
        Key::PageDown => "PageDown",
        Key::UpArrow => "Up",
        Key::DownArrow => "Down",
        Key::LeftArrow => "Left",
        Key::RightArrow => "Right",
        Key::PrintScreen => "PrintScreen",
        Key::ScrollLock => "ScrollLock",
        Key::Pause => "Pause",
        Key::NumLock => "NumLock",
        Key::Function => "Fn",
        Key::F1
        | Key::F2
        | Key::F3
        | Key::F4
        | Key::F5
        | Key::F6
        | Key::F7
        | Key::F8
        | Key::F9
        | Key::F10
        | Key::F11
        | Key::F12 => "Function",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_fold_to_lowercase() {
        assert_eq!(map_key(Key::KeyS, true, true), MappedKey::Char('s'));
        assert_eq!(map_key(Key::KeyS, false, true), MappedKey::Char('s'));
    }

    #[test]
    fn letters_keep_case_without_folding() {
        assert_eq!(map_key(Key::KeyS, true, false), MappedKey::Char('S'));
        assert_eq!(map_key(Key::KeyS, false, false), MappedKey::Char('s'));
    }

    #[test]
    fn shifted_symbols() {
        assert_eq!(map_key(Key::Num1, true, true), MappedKey::Char('!'));
        assert_eq!(map_key(Key::SemiColon, true, true), MappedKey::Char(':'));
        assert_eq!(map_key(Key::SemiColon, false, true), MappedKey::Char(';'));
        assert_eq!(map_key(Key::Dot, false, true), MappedKey::Char('.'));
    }

    #[test]
    fn whitespace_keys_are_characters() {
        assert_eq!(map_key(Key::Space, false, true), MappedKey::Char(' '));
        assert_eq!(map_key(Key::Return, false, true), MappedKey::Char('\n'));
        assert_eq!(map_key(Key::Tab, false, true), MappedKey::Char('\t'));
    }

    #[test]
    fn modifiers_and_named_keys() {
        assert_eq!(
            map_key(Key::ShiftLeft, false, true),
            MappedKey::Modifier(ModifierKey::Shift)
        );
        assert_eq!(
            map_key(Key::ControlRight, false, true),
            MappedKey::Modifier(ModifierKey::Control)
        );
        assert_eq!(map_key(Key::Backspace, false, true), MappedKey::Backspace);
        assert_eq!(map_key(Key::LeftArrow, false, true), MappedKey::Named("Left"));
        assert_eq!(map_key(Key::F5, false, true), MappedKey::Named("Function"));
        assert_eq!(map_key(Key::Unknown(999), false, true), MappedKey::Named("Unknown"));
    }
}
