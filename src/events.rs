//! 画面種別とUI状態。

/// TUIで現在表示中の画面。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// 種別タブと入力フィールドの画面。
    Form,
    /// サイズ・色のカスタマイズ画面。
    Options,
}

/// 描画側と共有するUI状態。
#[derive(Clone, Debug)]
pub struct UiState {
    /// 現在の画面。
    pub screen: Screen,
    /// アクティブ種別内で選択中のフィールド位置。
    pub selected_field: usize,
    /// 右側パネルに表示するログ。
    pub log: Vec<String>,
    /// 画面下部のステータス文言。
    pub status: String,
    /// エラーメッセージ（強調表示用）。
    pub error: Option<String>,
}

impl UiState {
    /// 時刻付きでログを追加する（最新64件まで保持）。
    pub fn push_log(&mut self, msg: impl Into<String>) {
        let line = format!("{} {}", chrono::Local::now().format("%H:%M:%S"), msg.into());
        self.log.push(line);
        if self.log.len() > 64 {
            self.log.remove(0);
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            screen: Screen::Form,
            selected_field: 0,
            log: vec![],
            status: "Ready".into(),
            error: None,
        }
    }
}
