//! rdev key classification.

use rdev::Key;

/// How a key press is forwarded to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyClass {
    /// Typed text, aggregated downstream.
    Printable(char),
    /// Named key recorded as its own step.
    Special(String),
    /// Bare modifier; not forwarded.
    Modifier,
}

impl KeyClass {
    /// `(key, is_special)` as expected by the input sink.
    pub fn into_sink_args(self) -> Option<(String, bool)> {
        match self {
            KeyClass::Printable(ch) => Some((ch.to_string(), false)),
            KeyClass::Special(name) => Some((name, true)),
            KeyClass::Modifier => None,
        }
    }
}

/// Classify a key press. `text` is the character rdev resolved for the press,
/// which already reflects shift and the keyboard layout.
pub fn classify(key: Key, text: Option<&str>) -> KeyClass {
    if is_modifier(key) {
        return KeyClass::Modifier;
    }
    if key == Key::Space {
        return KeyClass::Printable(' ');
    }
    if let Some(name) = special_name(key) {
        return KeyClass::Special(name.to_string());
    }

    let typed = text.and_then(|t| {
        let mut chars = t.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_control() => Some(ch),
            _ => None,
        }
    });
    match typed.or_else(|| fallback_char(key)) {
        Some(ch) => KeyClass::Printable(ch),
        None => match key {
            Key::Unknown(code) => KeyClass::Special(format!("Unknown({code})")),
            other => KeyClass::Special(format!("{other:?}")),
        },
    }
}

fn is_modifier(key: Key) -> bool {
    matches!(
        key,
        Key::Alt
            | Key::AltGr
            | Key::ControlLeft
            | Key::ControlRight
            | Key::ShiftLeft
            | Key::ShiftRight
            | Key::MetaLeft
            | Key::MetaRight
            | Key::CapsLock
            | Key::Function
    )
}

fn special_name(key: Key) -> Option<&'static str> {
    let name = match key {
        Key::Backspace => "Backspace",
        Key::Delete => "Delete",
        Key::DownArrow => "Down",
        Key::End => "End",
        Key::Escape => "Escape",
        Key::F1 => "F1",
        Key::F2 => "F2",
        Key::F3 => "F3",
        Key::F4 => "F4",
        Key::F5 => "F5",
        Key::F6 => "F6",
        Key::F7 => "F7",
        Key::F8 => "F8",
        Key::F9 => "F9",
        Key::F10 => "F10",
        Key::F11 => "F11",
        Key::F12 => "F12",
        Key::Home => "Home",
        Key::LeftArrow => "Left",
        Key::PageDown => "PageDown",
        Key::PageUp => "PageUp",
        Key::Return | Key::KpReturn => "Return",
        Key::RightArrow => "Right",
        Key::Tab => "Tab",
        Key::UpArrow => "Up",
        Key::PrintScreen => "PrintScreen",
        Key::ScrollLock => "ScrollLock",
        Key::Pause => "Pause",
        Key::NumLock => "NumLock",
        Key::Insert => "Insert",
        Key::KpDelete => "Delete",
        _ => return None,
    };
    Some(name)
}

/// Unshifted US-layout character, for platforms that report no text.
fn fallback_char(key: Key) -> Option<char> {
    let ch = match key {
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
        Key::Num0 | Key::Kp0 => '0',
        Key::Num1 | Key::Kp1 => '1',
        Key::Num2 | Key::Kp2 => '2',
        Key::Num3 | Key::Kp3 => '3',
        Key::Num4 | Key::Kp4 => '4',
        Key::Num5 | Key::Kp5 => '5',
        Key::Num6 | Key::Kp6 => '6',
        Key::Num7 | Key::Kp7 => '7',
        Key::Num8 | Key::Kp8 => '8',
        Key::Num9 | Key::Kp9 => '9',
        Key::BackQuote => '`',
        Key::Minus | Key::KpMinus => '-',
        Key::Equal => '=',
        Key::KpPlus => '+',
        Key::KpMultiply => '*',
        Key::KpDivide | Key::Slash => '/',
        Key::LeftBracket => '[',
        Key::RightBracket => ']',
        Key::SemiColon => ';',
        Key::Quote => '\'',
        Key::BackSlash | Key::IntlBackslash => '\\',
        Key::Comma => ',',
        Key::Dot => '.',
        _ => return None,
    };
    Some(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_keys() {
        assert_eq!(classify(Key::Return, Some("\r")), KeyClass::Special("Return".into()));
        assert_eq!(classify(Key::Tab, Some("\t")), KeyClass::Special("Tab".into()));
        assert_eq!(classify(Key::F9, None), KeyClass::Special("F9".into()));
        assert_eq!(classify(Key::Unknown(42), None), KeyClass::Special("Unknown(42)".into()));
    }

    #[test]
    fn test_printable_keys() {
        assert_eq!(classify(Key::KeyA, Some("A")), KeyClass::Printable('A'));
        assert_eq!(classify(Key::KeyQ, None), KeyClass::Printable('q'));
        assert_eq!(classify(Key::Space, Some(" ")), KeyClass::Printable(' '));
        assert_eq!(classify(Key::Num1, Some("!")), KeyClass::Printable('!'));
    }

    #[test]
    fn test_modifiers_are_dropped() {
        assert_eq!(classify(Key::ShiftLeft, None), KeyClass::Modifier);
        assert_eq!(classify(Key::ControlRight, None).into_sink_args(), None);
        assert_eq!(
            classify(Key::Escape, None).into_sink_args(),
            Some(("Escape".to_string(), true))
        );
    }
}
