//! ショートカット設定の管理。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// ショートカット設定の全体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcuts {
    pub form: FormShortcuts,
    pub options: OptionsShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// フォーム画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormShortcuts {
    pub quit: Vec<String>,
    pub next_type: Vec<String>,
    pub prev_type: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub edit: Vec<String>,
    pub options: Vec<String>,
    pub export_png: Vec<String>,
    pub export_svg: Vec<String>,
}

/// カスタマイズ画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsShortcuts {
    pub back: Vec<String>,
    pub grow: Vec<String>,
    pub shrink: Vec<String>,
    pub foreground: Vec<String>,
    pub background: Vec<String>,
}

/// InputBoxのショートカット。
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
    /// TOMLから読み込み、無ければデフォルトを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            form: FormShortcuts {
                quit: keys(&["q"]),
                next_type: keys(&["Tab", "Right"]),
                prev_type: keys(&["BackTab", "Left"]),
                up: keys(&["Up", "k"]),
                down: keys(&["Down", "j"]),
                edit: keys(&["Enter", "e"]),
                options: keys(&["o"]),
                export_png: keys(&["p"]),
                export_svg: keys(&["s"]),
            },
            options: OptionsShortcuts {
                back: keys(&["Esc", "o"]),
                grow: keys(&["+", "=", "Right"]),
                shrink: keys(&["-", "Left"]),
                foreground: keys(&["f"]),
                background: keys(&["b"]),
            },
            input_box: InputBoxShortcuts {
                confirm: keys(&["Enter"]),
                cancel: keys(&["Esc"]),
                backspace: keys(&["Backspace"]),
                delete: keys(&["Delete"]),
                left: keys(&["Left"]),
                right: keys(&["Right"]),
                home: keys(&["Home"]),
                end: keys(&["End"]),
                clear_line: keys(&["Ctrl+u"]),
            },
        }
    }
}

/// KeyEventがいずれかのショートカット文字列と一致するか判定する。
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts
        .iter()
        .filter_map(|s| parse_binding(s))
        .any(|(mods, code)| binding_matches(key, mods, code))
}

/// "Ctrl+u" / "Enter" / "+" のような文字列を修飾キーとキーコードへ分解する。
fn parse_binding(s: &str) -> Option<(KeyModifiers, KeyCode)> {
    // 1文字だけならそのまま文字キー（"+" 自体も含む）。
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some((KeyModifiers::NONE, KeyCode::Char(c)));
    }

    let (mods_part, key_part) = if let Some(m) = s.strip_suffix("++") {
        (Some(m), "+")
    } else {
        match s.rsplit_once('+') {
            Some((m, k)) if !k.is_empty() => (Some(m), k),
            _ => (None, s),
        }
    };

    let mut mods = KeyModifiers::NONE;
    for m in mods_part.into_iter().flat_map(|m| m.split('+')) {
        mods |= match m.to_ascii_lowercase().as_str() {
            "ctrl" => KeyModifiers::CONTROL,
            "alt" => KeyModifiers::ALT,
            "shift" => KeyModifiers::SHIFT,
            _ => return None,
        };
    }

    let code = match key_part.to_ascii_lowercase().as_str() {
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        _ => {
            let mut cs = key_part.chars();
            match (cs.next(), cs.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };
    Some((mods, code))
}

/// 端末によって記号やBackTabにShiftが付くため、Shiftは文字/BackTabでは無視する。
fn binding_matches(key: &KeyEvent, mods: KeyModifiers, code: KeyCode) -> bool {
    if key.code != code {
        return false;
    }
    match code {
        KeyCode::Char(_) | KeyCode::BackTab => {
            key.modifiers.difference(KeyModifiers::SHIFT) == mods.difference(KeyModifiers::SHIFT)
        }
        _ => key.modifiers == mods,
    }
}
