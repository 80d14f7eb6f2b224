//! キー入力ハンドラー関数。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{
    events::Screen,
    export::ExportFormat,
    form::FieldId,
    input::{InputBoxState, InputTarget},
    shortcuts,
};

use super::{App, mark_dirty};

/// キー入力を1件処理し、終了すべきならtrueを返す。
pub fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 入力ボックスが開いていれば最優先で処理する。
    if app.input_box.is_some() {
        handle_input_box_key(app, k);
        return Ok(false);
    }

    // 画面ごとのハンドラへ委譲する。
    match app.ui.screen {
        Screen::Form => Ok(handle_form_key(app, k)),
        Screen::Options => {
            handle_options_key(app, k);
            Ok(false)
        }
    }
}

/// Ctrl+Cかどうかを判定する。
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// アクティブ種別で選択中のフィールド。
fn selected_field(app: &App) -> Option<FieldId> {
    FieldId::for_type(app.form.active_type())
        .get(app.ui.selected_field)
        .copied()
}

/// フォーム画面のキー処理。
fn handle_form_key(app: &mut App, k: KeyEvent) -> bool {
    // フォーム画面のショートカットを参照する。
    let sc = &app.shortcuts.form;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return true;
    } else if shortcuts::matches_shortcut(&k, &sc.next_type) {
        switch_type(app, app.form.active_type().next());
    } else if shortcuts::matches_shortcut(&k, &sc.prev_type) {
        switch_type(app, app.form.active_type().prev());
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        // 次のフィールドへ移動する。
        let count = FieldId::for_type(app.form.active_type()).len();
        if app.ui.selected_field + 1 < count {
            app.ui.selected_field += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        // 前のフィールドへ移動する。
        app.ui.selected_field = app.ui.selected_field.saturating_sub(1);
    } else if shortcuts::matches_shortcut(&k, &sc.edit) {
        edit_selected(app);
    } else if shortcuts::matches_shortcut(&k, &sc.options) {
        app.ui.screen = Screen::Options;
        app.ui.status = "Customize".into();
    } else if shortcuts::matches_shortcut(&k, &sc.export_png) {
        export(app, ExportFormat::Png);
    } else if shortcuts::matches_shortcut(&k, &sc.export_svg) {
        export(app, ExportFormat::Svg);
    }

    false
}

/// 種別タブを切り替え、選択を先頭に戻す。
fn switch_type(app: &mut App, t: crate::payload::PayloadType) {
    if app.form.set_active(t) {
        app.ui.selected_field = 0;
        tracing::debug!("active type -> {t}");
        mark_dirty(app);
    }
}

/// 選択フィールドを編集する（選択肢なら次の値へ進める）。
fn edit_selected(app: &mut App) {
    let Some(id) = selected_field(app) else {
        return;
    };
    if id.is_choice() {
        let sec = app.form.cycle_wifi_security();
        app.ui.status = format!("Security: {}", sec.as_str());
        mark_dirty(app);
        return;
    }
    app.input_box = Some(InputBoxState::open(
        format!("{}:", id.label()),
        app.form.value(id),
        InputTarget::Field(id),
    ));
}

/// 表示中プレビューを書き出す。
fn export(app: &mut App, format: ExportFormat) {
    // ファイル名は表示中プレビューの種別から決まる。
    match app.exporter.export(app.pipeline.current(), format) {
        Ok(path) => {
            app.ui.error = None;
            app.ui.status = format!("Saved {}", path.display());
            app.ui.push_log(format!("exported {}", path.display()));
        }
        Err(e) => {
            tracing::warn!("export failed: {e:#}");
            app.ui.error = Some(format!("Export failed: {e}"));
        }
    }
}

/// カスタマイズ画面のキー処理。
fn handle_options_key(app: &mut App, k: KeyEvent) {
    // カスタマイズ画面のショートカットを参照する。
    let sc = &app.shortcuts.options;

    if shortcuts::matches_shortcut(&k, &sc.back) {
        app.ui.screen = Screen::Form;
        app.ui.status = "Ready".into();
    } else if shortcuts::matches_shortcut(&k, &sc.grow) {
        if app.options.grow() {
            app.ui.status = format!("Size: {} px", app.options.size_px());
            mark_dirty(app);
        }
    } else if shortcuts::matches_shortcut(&k, &sc.shrink) {
        if app.options.shrink() {
            app.ui.status = format!("Size: {} px", app.options.size_px());
            mark_dirty(app);
        }
    } else if shortcuts::matches_shortcut(&k, &sc.foreground) {
        app.input_box = Some(InputBoxState::open(
            "Foreground color (#RRGGBB):",
            &app.options.foreground,
            InputTarget::Foreground,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.background) {
        app.input_box = Some(InputBoxState::open(
            "Background color (#RRGGBB):",
            &app.options.background,
            InputTarget::Background,
        ));
    }
}

/// 入力値を反映先へ書き込み、変化があれば再生成を予約する。
fn apply_input(app: &mut App, target: InputTarget, value: String) {
    let changed = match target {
        InputTarget::Field(id) => app.form.set_value(id, value),
        InputTarget::Foreground => replace(&mut app.options.foreground, value),
        InputTarget::Background => replace(&mut app.options.background, value),
    };
    if changed {
        mark_dirty(app);
    }
}

fn replace(slot: &mut String, value: String) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// InputBoxのキー処理。フィールド入力は打鍵ごとにプレビューへ反映する。
fn handle_input_box_key(app: &mut App, k: KeyEvent) {
    let Some(mut state) = app.input_box.take() else {
        return;
    };
    let sc = &app.shortcuts.input_box;

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        apply_input(app, state.target, state.value);
        app.ui.status = "Updated".into();
        return;
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        // 開いた時点の値へ戻す。
        apply_input(app, state.target, state.initial);
        return;
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        state.insert_char(c);
    }

    // 色は確定時のみ反映する。
    if let InputTarget::Field(_) = state.target {
        apply_input(app, state.target, state.value.clone());
    }
    app.input_box = Some(state);
}
