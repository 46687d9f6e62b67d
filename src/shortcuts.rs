//! Shortcut key configuration.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// All configurable key bindings, one table per screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcuts {
    pub upload: UploadShortcuts,
    pub customize: CustomizeShortcuts,
    pub quote: QuoteShortcuts,
    pub cart: CartShortcuts,
    pub admin: AdminShortcuts,
    pub settings: SettingsShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// Upload screen bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadShortcuts {
    pub quit: Vec<String>,
    pub pick_file: Vec<String>,
    pub customize: Vec<String>,
    pub cart: Vec<String>,
    pub admin: Vec<String>,
    pub settings: Vec<String>,
    pub reset: Vec<String>,
}

/// Customize screen bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomizeShortcuts {
    pub back: Vec<String>,
    pub next_section: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub multi_color: Vec<String>,
    pub details: Vec<String>,
    pub get_quote: Vec<String>,
}

/// Quote screen bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteShortcuts {
    pub back: Vec<String>,
    pub quantity: Vec<String>,
    pub increment: Vec<String>,
    pub decrement: Vec<String>,
    pub multi_part: Vec<String>,
    pub add_to_cart: Vec<String>,
    pub cart: Vec<String>,
}

/// Cart screen bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartShortcuts {
    pub back: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub remove: Vec<String>,
    pub new_upload: Vec<String>,
}

/// Admin screen bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminShortcuts {
    pub back: Vec<String>,
    pub refresh: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub approve: Vec<String>,
    pub reject: Vec<String>,
    pub save_model: Vec<String>,
}

/// Settings screen bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsShortcuts {
    pub cancel: Vec<String>,
    pub save: Vec<String>,
    pub base_url: Vec<String>,
    pub interval: Vec<String>,
    pub max_attempts: Vec<String>,
}

/// Input popup bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

impl Shortcuts {
    /// Load from TOML, falling back to defaults when the file is missing.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let shortcuts: Shortcuts = toml::from_str(&content)?;
            Ok(shortcuts)
        } else {
            Ok(Self::default())
        }
    }

    /// Persist as TOML.
    #[allow(dead_code)]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            upload: UploadShortcuts {
                quit: vec!["q".into()],
                pick_file: vec!["f".into()],
                customize: vec!["Enter".into()],
                cart: vec!["v".into()],
                admin: vec!["j".into()],
                settings: vec!["t".into()],
                reset: vec!["r".into()],
            },
            customize: CustomizeShortcuts {
                back: vec!["Esc".into()],
                next_section: vec!["Tab".into()],
                up: vec!["Up".into(), "k".into()],
                down: vec!["Down".into(), "j".into()],
                multi_color: vec!["m".into()],
                details: vec!["d".into()],
                get_quote: vec!["Enter".into()],
            },
            quote: QuoteShortcuts {
                back: vec!["Esc".into()],
                quantity: vec!["n".into()],
                increment: vec!["+".into()],
                decrement: vec!["-".into()],
                multi_part: vec!["p".into()],
                add_to_cart: vec!["a".into()],
                cart: vec!["v".into()],
            },
            cart: CartShortcuts {
                back: vec!["Esc".into()],
                up: vec!["Up".into(), "k".into()],
                down: vec!["Down".into(), "j".into()],
                remove: vec!["x".into()],
                new_upload: vec!["u".into()],
            },
            admin: AdminShortcuts {
                back: vec!["Esc".into()],
                refresh: vec!["r".into()],
                up: vec!["Up".into(), "k".into()],
                down: vec!["Down".into(), "j".into()],
                approve: vec!["a".into()],
                reject: vec!["x".into()],
                save_model: vec!["s".into()],
            },
            settings: SettingsShortcuts {
                cancel: vec!["Esc".into()],
                save: vec!["Enter".into()],
                base_url: vec!["b".into()],
                interval: vec!["i".into()],
                max_attempts: vec!["m".into()],
            },
            input_box: InputBoxShortcuts {
                confirm: vec!["Enter".into()],
                cancel: vec!["Esc".into()],
                backspace: vec!["Backspace".into()],
                delete: vec!["Delete".into()],
                left: vec!["Left".into()],
                right: vec!["Right".into()],
                home: vec!["Home".into()],
                end: vec!["End".into()],
                clear_line: vec!["Ctrl+u".into()],
            },
        }
    }
}

/// True when the key event matches any of the configured bindings.
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

/// Match one binding string like "a", "Enter" or "Ctrl+u".
fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    let parts: Vec<&str> = shortcut.split('+').collect();

    let (modifiers_str, key_str) = if parts.len() > 1 {
        (&parts[0..parts.len() - 1], parts[parts.len() - 1])
    } else {
        (&[][..], parts[0])
    };

    let mut expected_modifiers = KeyModifiers::empty();
    for modifier in modifiers_str {
        match *modifier {
            "Ctrl" | "ctrl" => expected_modifiers |= KeyModifiers::CONTROL,
            "Alt" | "alt" => expected_modifiers |= KeyModifiers::ALT,
            "Shift" | "shift" => expected_modifiers |= KeyModifiers::SHIFT,
            _ => return false,
        }
    }

    if key.modifiers != expected_modifiers {
        return false;
    }

    match key_str {
        "Enter" | "enter" => key.code == KeyCode::Enter,
        "Esc" | "esc" => key.code == KeyCode::Esc,
        "Tab" | "tab" => key.code == KeyCode::Tab,
        "Backspace" | "backspace" => key.code == KeyCode::Backspace,
        "Delete" | "delete" => key.code == KeyCode::Delete,
        "Up" | "up" => key.code == KeyCode::Up,
        "Down" | "down" => key.code == KeyCode::Down,
        "Left" | "left" => key.code == KeyCode::Left,
        "Right" | "right" => key.code == KeyCode::Right,
        "Home" | "home" => key.code == KeyCode::Home,
        "End" | "end" => key.code == KeyCode::End,
        s if s.len() == 1 => {
            if let Some(c) = s.chars().next() {
                key.code == KeyCode::Char(c)
            } else {
                false
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_shortcut_simple_char() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::empty());
        assert!(matches_shortcut(&key, &[String::from("q")]));
        assert!(!matches_shortcut(&key, &[String::from("w")]));
    }

    #[test]
    fn test_matches_shortcut_special_key() {
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::empty());
        assert!(matches_shortcut(&key, &[String::from("Enter")]));
        assert!(!matches_shortcut(&key, &[String::from("Esc")]));
    }

    #[test]
    fn test_matches_shortcut_with_modifier() {
        let key = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert!(matches_shortcut(&key, &[String::from("Ctrl+u")]));
        assert!(!matches_shortcut(&key, &[String::from("u")]));
    }

    #[test]
    fn test_matches_shortcut_multiple_keys() {
        let key_up = KeyEvent::new(KeyCode::Up, KeyModifiers::empty());
        let key_k = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::empty());
        let shortcuts = vec![String::from("Up"), String::from("k")];

        assert!(matches_shortcut(&key_up, &shortcuts));
        assert!(matches_shortcut(&key_k, &shortcuts));

        let key_j = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::empty());
        assert!(!matches_shortcut(&key_j, &shortcuts));
    }

    #[test]
    fn test_defaults_roundtrip_through_toml() {
        let defaults = Shortcuts::default();
        let serialized = toml::to_string_pretty(&defaults).unwrap();
        let parsed: Shortcuts = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.upload.quit, vec![String::from("q")]);
        assert_eq!(parsed.admin.approve, vec![String::from("a")]);
    }
}
