//! TUI描画関連の関数。

use image::RgbaImage;
use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
};

use crate::{
    encoder::EC_LEVEL,
    events::Screen,
    form::FieldId,
    input, layout,
    options::{MARGIN_MODULES, MAX_SIZE_PX, MIN_SIZE_PX},
    payload::{self, PayloadType},
    shortcuts::Shortcuts,
};

use super::App;

/// 画面全体のレイアウトを描画する。
pub fn draw(f: &mut Frame, app: &App) {
    // メインレイアウト（Body + HELP + STATUS）を作る。
    let main_layout = layout::create_main_layout(f.area());
    let body_layout = layout::create_body_layout(main_layout.body);
    let form_layout = layout::create_form_layout(body_layout.form);

    // 種別タブ。
    let active = app.form.active_type();
    let tabs = Tabs::new(PayloadType::ALL.iter().map(|t| t.label()))
        .select(PayloadType::ALL.iter().position(|t| *t == active))
        .block(Block::default().borders(Borders::ALL).title("TYPE"))
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(255, 140, 0)) // オレンジ色の背景
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, form_layout.tabs);

    // フィールド一覧、またはカスタマイズ項目。
    let (title, lines) = match app.ui.screen {
        Screen::Form => ("FIELDS", build_field_lines(app)),
        Screen::Options => ("CUSTOMIZE", build_option_lines(app)),
    };
    let fields = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(fields, form_layout.fields);

    // 現在の入力から組み立てたペイロード。
    let payload_text = payload::format(&app.form.active_fields());
    let payload_panel = Paragraph::new(payload_text)
        .block(Block::default().borders(Borders::ALL).title("PAYLOAD"))
        .wrap(Wrap { trim: false });
    f.render_widget(payload_panel, form_layout.payload);

    // 直近のログ。
    let visible = form_layout.log.height.saturating_sub(2) as usize;
    let log_text = app
        .ui
        .log
        .iter()
        .rev()
        .take(visible)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let log_panel = Paragraph::new(log_text)
        .block(Block::default().borders(Borders::ALL).title("LOG"))
        .style(Style::default().fg(Color::Gray));
    f.render_widget(log_panel, form_layout.log);

    draw_preview(f, app, body_layout.preview);

    // HELPバー（画面ごとのショートカット）を描画する。
    let help_text = get_help_text(app.ui.screen, &app.shortcuts);
    let help_bar = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, main_layout.help_bar);

    // STATUSバー（画面名・クォータ・エラー）を描画する。
    let status_bar = build_status_bar(app);
    f.render_widget(status_bar, main_layout.status_bar);

    // 入力ボックスが開いていれば重ねて描画する。
    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

/// アクティブ種別のフィールドを1行ずつ組み立てる。
fn build_field_lines(app: &App) -> Vec<Line<'static>> {
    FieldId::for_type(app.form.active_type())
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let selected = i == app.ui.selected_field;
            let marker = if selected { "→ " } else { "  " };
            let label = Span::styled(
                format!("{marker}{}: ", id.label()),
                if selected {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                },
            );
            let value = if id.is_choice() {
                Span::raw(format!("{} (Enter to cycle)", app.form.wifi_security().as_str()))
            } else {
                match app.form.value(*id) {
                    // 未入力ならプレースホルダを薄く表示する。
                    "" => Span::styled(
                        id.placeholder().to_string(),
                        Style::default().fg(Color::DarkGray),
                    ),
                    v => Span::raw(v.to_string()),
                }
            };
            Line::from(vec![label, value])
        })
        .collect()
}

/// カスタマイズ画面の項目。
fn build_option_lines(app: &App) -> Vec<Line<'static>> {
    let o = &app.options;
    vec![
        Line::from(format!(
            "Size: {} px  ({MIN_SIZE_PX}..{MAX_SIZE_PX})",
            o.size_px()
        )),
        Line::from(format!("Foreground: {}", o.foreground)),
        Line::from(format!("Background: {}", o.background)),
        Line::from(format!("Error correction: {EC_LEVEL:?}")),
        Line::from(format!("Margin: {MARGIN_MODULES} modules")),
        Line::from(format!("Debounce: {} ms", app.cfg.render.debounce_ms)),
        Line::from(""),
        Line::from(format!("Export to: {}", app.exporter.output_dir().display())),
    ]
}

/// プレビューパネルを描画する。
fn draw_preview(f: &mut Frame, app: &App, area: Rect) {
    let title = match app.pipeline.current() {
        Some(p) => format!("PREVIEW #{} {} {}px", p.seq, p.payload_type, p.options.size_px()),
        None => "PREVIEW".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    // 最下行はクォータ表示に使う。
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let body = match &app.preview_image {
        Some(img) => Paragraph::new(half_block_lines(img, rows[0].width, rows[0].height))
            .alignment(Alignment::Center),
        None => Paragraph::new("Generating...").alignment(Alignment::Center),
    };
    f.render_widget(body, rows[0]);

    let quota = match app.quota {
        Some(q) => format!("{} QR generated today", q.used),
        None => String::new(),
    };
    f.render_widget(
        Paragraph::new(quota)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray)),
        rows[1],
    );
}

/// 画像を上下2ピクセル1セルの「▀」で描く（最近傍で縮小）。
fn half_block_lines(img: &RgbaImage, width: u16, height: u16) -> Vec<Line<'static>> {
    let side = u32::from(width).min(u32::from(height) * 2);
    if side == 0 || img.width() == 0 || img.height() == 0 {
        return vec![];
    }
    let sample = |x: u32, y: u32| {
        let px = img.get_pixel(x * img.width() / side, y * img.height() / side);
        Color::Rgb(px[0], px[1], px[2])
    };
    (0..side / 2)
        .map(|row| {
            let spans = (0..side)
                .map(|x| {
                    Span::styled(
                        "▀",
                        Style::default()
                            .fg(sample(x, row * 2))
                            .bg(sample(x, row * 2 + 1)),
                    )
                })
                .collect::<Vec<_>>();
            Line::from(spans)
        })
        .collect()
}

/// ステータスバーを構築する。
fn build_status_bar(app: &App) -> Paragraph<'static> {
    let screen_name = match app.ui.screen {
        Screen::Form => "Form",
        Screen::Options => "Customize",
    };

    // 入力待ち・生成中の表示。
    let pending = app.debouncer.is_pending()
        || app.pipeline.current().map(|p| p.seq) != Some(app.pipeline.latest_issued());
    let render_info = if pending { "updating" } else { "up to date" };

    // エラーの有無でステータス文字列を切り替える。
    let status_text = if let Some(err) = &app.ui.error {
        // 失敗した要求の後は前のプレビューのまま待機する。
        format!("[{}] ERROR: {}", screen_name, err)
    } else {
        format!("[{}] {} | {}", screen_name, render_info, app.ui.status)
    };

    // ステータスバーのウィジェットを生成する。
    let mut status_bar = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true });

    // エラー時は赤色で強調表示する。
    if app.ui.error.is_some() {
        status_bar = status_bar.style(Style::default().fg(Color::Red));
    }

    status_bar
}

/// 現在画面に応じたヘルプ文字列を返す。
fn get_help_text(screen: Screen, shortcuts: &Shortcuts) -> String {
    match screen {
        Screen::Form => format!(
            "{}: quit | {}/{}: type | {}/{}: field | {}: edit | {}: customize | {}: save PNG | {}: save SVG",
            format_keys(&shortcuts.form.quit),
            format_keys(&shortcuts.form.prev_type),
            format_keys(&shortcuts.form.next_type),
            format_keys(&shortcuts.form.up),
            format_keys(&shortcuts.form.down),
            format_keys(&shortcuts.form.edit),
            format_keys(&shortcuts.form.options),
            format_keys(&shortcuts.form.export_png),
            format_keys(&shortcuts.form.export_svg)
        ),
        Screen::Options => format!(
            "{}: larger | {}: smaller | {}: foreground | {}: background | {}: back",
            format_keys(&shortcuts.options.grow),
            format_keys(&shortcuts.options.shrink),
            format_keys(&shortcuts.options.foreground),
            format_keys(&shortcuts.options.background),
            format_keys(&shortcuts.options.back)
        ),
    }
}

/// ショートカットキーの配列を表示用文字列に変換する。
fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn half_blocks_pack_two_rows_per_line() {
        // 上半分が黒、下半分が白の4x4画像。
        let img = RgbaImage::from_fn(4, 4, |_, y| {
            if y < 2 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let lines = half_block_lines(&img, 4, 2);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans.len(), 4);
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Rgb(0, 0, 0)));
        assert_eq!(lines[1].spans[0].style.bg, Some(Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn half_blocks_fit_the_shorter_side() {
        let img = RgbaImage::new(8, 8);
        // 幅10・高さ3なら一辺6ピクセル = 3行 x 6セル。
        let lines = half_block_lines(&img, 10, 3);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.spans.len() == 6));
        assert!(half_block_lines(&img, 0, 3).is_empty());
    }
}
