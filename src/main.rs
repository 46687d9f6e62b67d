mod api;
mod app;
mod catalog;
mod config;
mod events;
mod input;
mod jobs;
mod layout;
mod poller;
mod quote;
mod session;
mod shortcuts;
mod ui;
mod validate;
mod worker;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Log to a file; stdout belongs to the TUI.
    let file_appender = tracing_appender::rolling::never(".", "printquote_tui.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    tracing::info!("printquote_tui starting");

    let mut terminal = ui::init_terminal()?;
    let result = app::run_app(&mut terminal).await;
    ui::restore_terminal()?;

    if let Err(e) = &result {
        eprintln!("error: {e:#}");
    }
    result
}
