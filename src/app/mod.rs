//! TUIのイベントループ、入力処理、状態管理。

mod handlers;
mod render;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use image::{ImageFormat, RgbaImage};
use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    encoder::{QrEncoder, decode_png_data_uri},
    events::UiState,
    export::Exporter,
    form::FormState,
    input::InputBoxState,
    options::RenderOptions,
    pipeline::{Debouncer, Outcome, Pipeline, PipelineEvent, RenderedPreview},
    shortcuts::Shortcuts,
    ui::Tui,
    usage::{HttpUsageClient, NoopSink, QuotaSnapshot, UsageSink},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// 入力処理と描画で共有するアプリ状態。
pub struct App {
    /// メモリ上の現在設定。
    pub cfg: Config,
    /// 選択位置やステータスなどUI固有の状態。
    pub ui: UiState,
    /// 全種別の入力値とアクティブ種別。
    pub form: FormState,
    /// サイズ・色の現在値。
    pub options: RenderOptions,
    /// 生成要求の発行と結果の採否判定。
    pub pipeline: Pipeline,
    /// 生成タスクからの完了通知。
    pub pipeline_rx: mpsc::Receiver<PipelineEvent>,
    /// 入力が落ち着くまで生成を待たせる。
    pub debouncer: Debouncer,
    /// 表示中プレビューをデコードした画像（端末描画用）。
    pub preview_image: Option<RgbaImage>,
    /// PNG/SVGの書き出し。
    pub exporter: Exporter,
    /// 利用状況の送信先（失敗しても無視される）。
    pub usage: Arc<dyn UsageSink>,
    /// クォータ取得結果の受信チャネル。
    pub quota_rx: mpsc::Receiver<QuotaSnapshot>,
    /// 最後に取得できたクォータ。
    pub quota: Option<QuotaSnapshot>,
    /// 入力ボックスの状態（入力中はSome）。
    pub input_box: Option<InputBoxState>,
    /// ショートカットキー設定。
    pub shortcuts: Shortcuts,
}

/// ユーザーが終了するまでメインTUIループを回す。
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    // 設定ファイルを読み込む（初回はデフォルトを生成）。
    let cfg_path = PathBuf::from("config.toml");
    let cfg = Config::load_or_default(&cfg_path)?;

    // ショートカット設定を読み込む（無ければデフォルト）。
    let shortcuts_path = PathBuf::from("shortcut.toml");
    let shortcuts = Shortcuts::load_or_default(&shortcuts_path)?;

    // 生成結果とクォータのチャネルを作る。
    let (tx_ev, rx_ev) = mpsc::channel::<PipelineEvent>(64);
    let (tx_quota, rx_quota) = mpsc::channel::<QuotaSnapshot>(8);

    // 無効化されていればネットワークに一切出ない。
    let usage: Arc<dyn UsageSink> = if cfg.analytics.enabled {
        Arc::new(HttpUsageClient::new(&cfg.analytics, tx_quota)?)
    } else {
        tracing::info!("analytics disabled");
        Arc::new(NoopSink)
    };

    let pipeline = Pipeline::new(Arc::new(QrEncoder), tx_ev);
    let exporter = Exporter::new(&cfg.export.output_dir, Arc::clone(&usage));

    // アプリ状態を初期化する。
    let mut app = App {
        options: cfg.render.initial_options(),
        debouncer: Debouncer::new(cfg.render.debounce()),
        cfg,
        ui: UiState::default(),
        form: FormState::new(),
        pipeline,
        pipeline_rx: rx_ev,
        preview_image: None,
        exporter,
        usage,
        quota_rx: rx_quota,
        quota: None,
        input_box: None,
        shortcuts,
    };

    // セッション開始時の計測とクォータ取得（待たない）。
    app.usage.pageview("/", "");
    app.usage.refresh_quota();

    // 初回プレビューは待たずに生成する。
    request_regeneration(&mut app);

    loop {
        // 現在の状態を描画する。
        terminal.draw(|f| draw(f, &app))?;

        // 入力処理の前に生成結果を消化する。
        while let Ok(ev) = app.pipeline_rx.try_recv() {
            handle_pipeline_event(&mut app, ev);
        }

        // クォータは最新の値だけを保持する。
        while let Ok(q) = app.quota_rx.try_recv() {
            app.quota = Some(q);
        }

        // 入力が落ち着いたら新しい要求を出す。
        if app.debouncer.due(Instant::now()) {
            request_regeneration(&mut app);
        }

        // UIの応答性確保のため短いタイムアウトで入力をポーリングする。
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            // どの画面でもCtrl+Cで終了できるようにする。
            if is_ctrl_c(&k) {
                break;
            }
            if handle_key(&mut app, k)? {
                break;
            }
        }
    }
    Ok(())
}

/// 生成結果をUI状態へ反映する。
fn handle_pipeline_event(app: &mut App, ev: PipelineEvent) {
    match app.pipeline.accept(ev) {
        Outcome::Published { seq } => {
            // 端末描画用に一度だけデコードしておく。
            match app.pipeline.current().map(decode_preview).transpose() {
                Ok(img) => app.preview_image = img,
                Err(e) => tracing::warn!("preview {seq} not drawable: {e:#}"),
            }
            let chars = app
                .pipeline
                .current()
                .map_or(0, |p| p.payload.chars().count());
            app.ui.error = None;
            app.ui.status = format!("Preview #{seq} ready ({chars} chars)");
        }
        Outcome::Superseded { .. } => {}
        Outcome::Failed { seq, error } => {
            // 直前のプレビューはそのまま残す。
            app.ui.push_log(format!("render #{seq} failed: {error}"));
            app.ui.error = Some(error.to_string());
        }
    }
}

/// PNGデータURIをRGBA画像へ戻す。
fn decode_preview(preview: &RenderedPreview) -> Result<RgbaImage> {
    let bytes = decode_png_data_uri(&preview.raster).context("raster is not a PNG data URI")?;
    let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?;
    Ok(img.to_rgba8())
}

/// 現在のフォームとオプションのスナップショットで生成を要求する。
pub fn request_regeneration(app: &mut App) {
    let seq = app
        .pipeline
        .issue(app.form.active_fields(), app.options.clone());
    app.ui.status = format!("Rendering #{seq}...");
}

/// 入力変更を記録し、静止時間後の再生成を予約する。
pub fn mark_dirty(app: &mut App) {
    app.debouncer.touch(Instant::now());
}
