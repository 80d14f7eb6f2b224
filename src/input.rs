//! TUI内での文字列入力コンポーネント（InputBox）。

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::form::FieldId;

/// InputBox入力状態
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// プロンプトメッセージ
    pub prompt: String,
    /// 現在の入力値
    pub value: String,
    /// カーソル位置（文字単位）
    pub cursor: usize,
    /// 入力完了時の反映先
    pub target: InputTarget,
    /// 開いた時点の値（キャンセル時に戻す）
    pub initial: String,
}

/// 入力確定時に値を反映する先
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputTarget {
    /// フォームのフィールド
    Field(FieldId),
    /// 前景色（QRのモジュール色）
    Foreground,
    /// 背景色
    Background,
}

impl InputBoxState {
    /// 既存値を持ち、カーソルを末尾に置いた状態で開く。
    pub fn open(prompt: impl Into<String>, value: &str, target: InputTarget) -> Self {
        Self {
            prompt: prompt.into(),
            value: value.to_string(),
            cursor: value.chars().count(),
            target,
            initial: value.to_string(),
        }
    }

    /// 文字位置をバイト位置へ変換する。
    fn byte_at(&self, char_pos: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_pos)
            .map_or(self.value.len(), |(i, _)| i)
    }

    /// 文字を挿入
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_at(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Backspace（カーソル前の文字を削除）
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_at(self.cursor);
        self.value.remove(at);
    }

    /// Delete（カーソル位置の文字を削除）
    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    /// カーソルを左に移動
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// カーソルを右に移動
    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    /// カーソルを先頭に移動
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// カーソルを末尾に移動
    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// 行全体をクリア
    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// 表示幅に収まる範囲とカーソル記号を含む文字列を返す。
    fn visible_with_cursor(&self, width: usize) -> String {
        // カーソルが右端を越えたら横スクロールさせる。
        let offset = self.cursor.saturating_sub(width.saturating_sub(2));
        let before: String = self
            .value
            .chars()
            .skip(offset)
            .take(self.cursor - offset)
            .collect();
        let after: String = self
            .value
            .chars()
            .skip(self.cursor)
            .take(width.saturating_sub(before.chars().count() + 1))
            .collect();
        format!("{before}|{after}")
    }
}

/// InputBoxをポップアップとして描画
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    // 中央に配置されたポップアップ領域を計算する。
    let popup_area = centered_popup(f.area(), 70, 7);

    // 既存の描画を消してポップアップ用の背景にする。
    f.render_widget(Clear, popup_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Input")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    // プロンプト + 入力欄 + 空行 + ヘルプ。
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(popup_area);

    let prompt = Paragraph::new(state.prompt.clone()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt, rows[0]);

    let text = state.visible_with_cursor(rows[1].width as usize);
    f.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Green)),
        rows[1],
    );

    let help = Paragraph::new("Enter=confirm | Esc=cancel | Ctrl+U=clear")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, rows[3]);
}

/// 中央配置のポップアップ領域を計算
fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(value: &str) -> InputBoxState {
        InputBoxState::open("p", value, InputTarget::Foreground)
    }

    #[test]
    fn edits_multibyte_text_at_cursor() {
        let mut s = boxed("città");
        assert_eq!(s.cursor, 5);
        s.move_left();
        s.backspace();
        assert_eq!(s.value, "cità");
        s.insert_char('t');
        s.insert_char('t');
        assert_eq!(s.value, "citttà");
        s.move_home();
        s.delete();
        assert_eq!(s.value, "itttà");
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut s = boxed("ab");
        s.move_right();
        assert_eq!(s.cursor, 2);
        s.move_home();
        s.move_left();
        s.backspace();
        assert_eq!((s.value.as_str(), s.cursor), ("ab", 0));
        s.move_end();
        s.delete();
        assert_eq!(s.value, "ab");
        s.clear_line();
        assert_eq!((s.value.as_str(), s.cursor), ("", 0));
    }

    #[test]
    fn long_values_scroll_to_keep_cursor_visible() {
        let s = boxed("abcdefghij");
        assert_eq!(s.visible_with_cursor(6), "ghij|");
        let mut s = boxed("abcdefghij");
        s.move_home();
        assert_eq!(s.visible_with_cursor(6), "|abcde");
    }
}
