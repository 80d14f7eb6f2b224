//! レイアウト計算のヘルパー関数

use ratatui::prelude::*;

/// メインレイアウトの3つの領域
pub struct MainLayout {
    /// フォーム + プレビューの領域
    pub body: Rect,
    /// HELPバーの領域
    pub help_bar: Rect,
    /// STATUSバーの領域
    pub status_bar: Rect,
}

/// ボディ部の2つの領域
pub struct BodyLayout {
    /// 種別タブ・入力フィールドの領域
    pub form: Rect,
    /// QRプレビューの領域
    pub preview: Rect,
}

/// フォームパネル内の縦分割
pub struct FormLayout {
    /// 種別タブ
    pub tabs: Rect,
    /// フィールド一覧
    pub fields: Rect,
    /// 生成されるペイロード文字列
    pub payload: Rect,
    /// ログ
    pub log: Rect,
}

/// 画面全体を Body + HELP + STATUS に分割
pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    MainLayout {
        body: chunks[0],
        help_bar: chunks[1],
        status_bar: chunks[2],
    }
}

/// Body領域を左右に分割（フォーム 55% + プレビュー 45%）
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    BodyLayout {
        form: chunks[0],
        preview: chunks[1],
    }
}

/// フォームパネルを タブ / フィールド / ペイロード / ログ に分割
pub fn create_form_layout(area: Rect) -> FormLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(6),
            Constraint::Length(6),
        ])
        .split(area);

    FormLayout {
        tabs: chunks[0],
        fields: chunks[1],
        payload: chunks[2],
        log: chunks[3],
    }
}
