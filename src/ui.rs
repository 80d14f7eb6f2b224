//! TUI用端末の初期化と復元。

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};

/// アプリ全体で使う端末型。
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// 代替画面へ切り替え、rawモードを有効化する。
pub fn init_terminal() -> Result<Tui> {
    install_panic_hook();
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(io::stdout()))?)
}

/// 終了時に端末状態を元に戻す。
pub fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// パニック時も端末を戻してからメッセージを出す。
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        tracing::error!("panic: {info}");
        default_hook(info);
    }));
}
