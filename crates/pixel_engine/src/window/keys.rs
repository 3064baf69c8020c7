//! Keyboard identifiers and GLFW key translation

use crate::present::SurfaceId;

/// Identifiers for keyboard buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyId {
    /// A key this crate has no identifier for
    Undefined,
    /// No key
    None,

    /// Either control key
    Ctrl,
    /// Either alt key
    Alt,
    /// Either shift key
    Shift,

    /// A key
    A,
    /// B key
    B,
    /// C key
    C,
    /// D key
    D,
    /// E key
    E,
    /// F key
    F,
    /// G key
    G,
    /// H key
    H,
    /// I key
    I,
    /// J key
    J,
    /// K key
    K,
    /// L key
    L,
    /// M key
    M,
    /// N key
    N,
    /// O key
    O,
    /// P key
    P,
    /// Q key
    Q,
    /// R key
    R,
    /// S key
    S,
    /// T key
    T,
    /// U key
    U,
    /// V key
    V,
    /// W key
    W,
    /// X key
    X,
    /// Y key
    Y,
    /// Z key
    Z,

    /// 0 on the main row
    Num0,
    /// 1 on the main row
    Num1,
    /// 2 on the main row
    Num2,
    /// 3 on the main row
    Num3,
    /// 4 on the main row
    Num4,
    /// 5 on the main row
    Num5,
    /// 6 on the main row
    Num6,
    /// 7 on the main row
    Num7,
    /// 8 on the main row
    Num8,
    /// 9 on the main row
    Num9,

    /// Function key 1
    F1,
    /// Function key 2
    F2,
    /// Function key 3
    F3,
    /// Function key 4
    F4,
    /// Function key 5
    F5,
    /// Function key 6
    F6,
    /// Function key 7
    F7,
    /// Function key 8
    F8,
    /// Function key 9
    F9,
    /// Function key 10
    F10,
    /// Function key 11
    F11,
    /// Function key 12
    F12,
    /// Function key 13
    F13,
    /// Function key 14
    F14,
    /// Function key 15
    F15,
    /// Function key 16
    F16,
    /// Function key 17
    F17,
    /// Function key 18
    F18,
    /// Function key 19
    F19,
    /// Function key 20
    F20,
    /// Function key 21
    F21,
    /// Function key 22
    F22,
    /// Function key 23
    F23,
    /// Function key 24
    F24,

    /// Left arrow
    Left,
    /// Right arrow
    Right,
    /// Up arrow
    Up,
    /// Down arrow
    Down,

    /// Escape key
    Escape,
}

impl KeyId {
    /// True for Ctrl, Alt and Shift
    pub const fn is_modifier(self) -> bool {
        matches!(self, Self::Ctrl | Self::Alt | Self::Shift)
    }
}

bitflags::bitflags! {
    /// Modifier keys held while a key event happened
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        /// Either control key
        const CTRL = 1 << 0;
        /// Either alt key
        const ALT = 1 << 1;
        /// Either shift key
        const SHIFT = 1 << 2;
    }
}

/// A key press or release on one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Window the event came from
    pub surface: SurfaceId,
    /// The key the event is about
    pub key: KeyId,
    /// Modifiers held at the time
    pub modifiers: KeyModifiers,
}

/// Map a GLFW key to a [`KeyId`]; anything unmapped is [`KeyId::Undefined`]
pub fn translate_key(key: glfw::Key) -> KeyId {
    use glfw::Key;

    match key {
        Key::A => KeyId::A,
        Key::B => KeyId::B,
        Key::C => KeyId::C,
        Key::D => KeyId::D,
        Key::E => KeyId::E,
        Key::F => KeyId::F,
        Key::G => KeyId::G,
        Key::H => KeyId::H,
        Key::I => KeyId::I,
        Key::J => KeyId::J,
        Key::K => KeyId::K,
        Key::L => KeyId::L,
        Key::M => KeyId::M,
        Key::N => KeyId::N,
        Key::O => KeyId::O,
        Key::P => KeyId::P,
        Key::Q => KeyId::Q,
        Key::R => KeyId::R,
        Key::S => KeyId::S,
        Key::T => KeyId::T,
        Key::U => KeyId::U,
        Key::V => KeyId::V,
        Key::W => KeyId::W,
        Key::X => KeyId::X,
        Key::Y => KeyId::Y,
        Key::Z => KeyId::Z,
        Key::Num0 => KeyId::Num0,
        Key::Num1 => KeyId::Num1,
        Key::Num2 => KeyId::Num2,
        Key::Num3 => KeyId::Num3,
        Key::Num4 => KeyId::Num4,
        Key::Num5 => KeyId::Num5,
        Key::Num6 => KeyId::Num6,
        Key::Num7 => KeyId::Num7,
        Key::Num8 => KeyId::Num8,
        Key::Num9 => KeyId::Num9,
        Key::F1 => KeyId::F1,
        Key::F2 => KeyId::F2,
        Key::F3 => KeyId::F3,
        Key::F4 => KeyId::F4,
        Key::F5 => KeyId::F5,
        Key::F6 => KeyId::F6,
        Key::F7 => KeyId::F7,
        Key::F8 => KeyId::F8,
        Key::F9 => KeyId::F9,
        Key::F10 => KeyId::F10,
        Key::F11 => KeyId::F11,
        Key::F12 => KeyId::F12,
        Key::F13 => KeyId::F13,
        Key::F14 => KeyId::F14,
        Key::F15 => KeyId::F15,
        Key::F16 => KeyId::F16,
        Key::F17 => KeyId::F17,
        Key::F18 => KeyId::F18,
        Key::F19 => KeyId::F19,
        Key::F20 => KeyId::F20,
        Key::F21 => KeyId::F21,
        Key::F22 => KeyId::F22,
        Key::F23 => KeyId::F23,
        Key::F24 => KeyId::F24,
        Key::LeftControl | Key::RightControl => KeyId::Ctrl,
        Key::LeftAlt | Key::RightAlt => KeyId::Alt,
        Key::LeftShift | Key::RightShift => KeyId::Shift,
        Key::Left => KeyId::Left,
        Key::Right => KeyId::Right,
        Key::Up => KeyId::Up,
        Key::Down => KeyId::Down,
        Key::Escape => KeyId::Escape,
        _ => KeyId::Undefined,
    }
}

/// Map GLFW modifier flags; super and lock keys are dropped
pub fn translate_modifiers(modifiers: glfw::Modifiers) -> KeyModifiers {
    let mut result = KeyModifiers::empty();
    result.set(KeyModifiers::CTRL, modifiers.contains(glfw::Modifiers::Control));
    result.set(KeyModifiers::ALT, modifiers.contains(glfw::Modifiers::Alt));
    result.set(KeyModifiers::SHIFT, modifiers.contains(glfw::Modifiers::Shift));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_digits_and_function_keys() {
        assert_eq!(translate_key(glfw::Key::A), KeyId::A);
        assert_eq!(translate_key(glfw::Key::Z), KeyId::Z);
        assert_eq!(translate_key(glfw::Key::Num0), KeyId::Num0);
        assert_eq!(translate_key(glfw::Key::Num9), KeyId::Num9);
        assert_eq!(translate_key(glfw::Key::F1), KeyId::F1);
        assert_eq!(translate_key(glfw::Key::F24), KeyId::F24);
    }

    #[test]
    fn test_both_sides_of_modifiers_collapse() {
        assert_eq!(translate_key(glfw::Key::LeftControl), KeyId::Ctrl);
        assert_eq!(translate_key(glfw::Key::RightControl), KeyId::Ctrl);
        assert_eq!(translate_key(glfw::Key::RightAlt), KeyId::Alt);
        assert_eq!(translate_key(glfw::Key::LeftShift), KeyId::Shift);
        assert!(KeyId::Shift.is_modifier());
        assert!(!KeyId::Escape.is_modifier());
    }

    #[test]
    fn test_unmapped_keys_are_undefined() {
        assert_eq!(translate_key(glfw::Key::F25), KeyId::Undefined);
        assert_eq!(translate_key(glfw::Key::Space), KeyId::Undefined);
        assert_eq!(translate_key(glfw::Key::Kp5), KeyId::Undefined);
    }

    #[test]
    fn test_arrows_and_escape() {
        assert_eq!(translate_key(glfw::Key::Left), KeyId::Left);
        assert_eq!(translate_key(glfw::Key::Down), KeyId::Down);
        assert_eq!(translate_key(glfw::Key::Escape), KeyId::Escape);
    }

    #[test]
    fn test_modifier_translation() {
        assert_eq!(translate_modifiers(glfw::Modifiers::empty()), KeyModifiers::empty());
        assert_eq!(
            translate_modifiers(glfw::Modifiers::Control | glfw::Modifiers::Shift),
            KeyModifiers::CTRL | KeyModifiers::SHIFT
        );
        assert_eq!(
            translate_modifiers(glfw::Modifiers::Alt | glfw::Modifiers::Super),
            KeyModifiers::ALT
        );
    }
}
