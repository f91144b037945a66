use std::io::{self, Write};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use sphere_chat::{
    AppState,
    ask::{Presentation, SubmitOutcome},
    config::Config,
    poller::KeywordBoard,
    reveal::reveal,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they stay out of the conversation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;
    info!(
        api = %config.api_base_url,
        poll_interval_secs = config.poll_interval.as_secs(),
        request_timeout_secs = config.request_timeout.as_secs(),
        "loaded sphere-chat config"
    );
    let state = AppState::new(config)?;

    // Redraw the ranking whenever the poller replaces it
    let mut board_rx = state.keywords.subscribe();
    let board_view = tokio::spawn(async move {
        while board_rx.changed().await.is_ok() {
            let board = board_rx.borrow_and_update().clone();
            print_board(&board);
        }
    });
    state.keywords.start();

    println!("Ask anything... (:clear dismisses the answer, :top shows the ranking, Ctrl-D quits)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":clear" => {
                state.ask.clear_response();
                continue;
            }
            ":top" => {
                print_board(&state.keywords.board());
                continue;
            }
            _ => {}
        }

        state.ask.set_draft(line);
        if state.ask.submit_draft().await == SubmitOutcome::Skipped {
            continue;
        }

        match state.ask.presentation() {
            Presentation::Resolved(answer) => {
                let mut out = std::io::stdout();
                if let Err(err) = type_out(&mut out, &answer, state.config.typing_delay).await {
                    warn!(error = %err, "failed to write answer to stdout");
                    return Err(err.into());
                }
                println!();
            }
            Presentation::Rejected(message) => println!("! {}", message),
            Presentation::Idle | Presentation::Pending => {}
        }
    }

    state.keywords.stop();
    board_view.abort();
    Ok(())
}

/// Writes the answer frame by frame, stopping at the first I/O error.
async fn type_out<W: Write>(out: &mut W, answer: &str, delay: Duration) -> io::Result<()> {
    let mut printed = 0;
    let mut failed = None;
    reveal(answer, delay, |frame| {
        if failed.is_some() {
            return;
        }
        match write!(out, "{}", &frame[printed..]).and_then(|_| out.flush()) {
            Ok(()) => printed = frame.len(),
            Err(err) => failed = Some(err),
        }
    })
    .await;
    failed.map_or(Ok(()), Err)
}

fn print_board(board: &KeywordBoard) {
    println!("-- Most chosen keywords right now --");
    if !board.is_loaded() {
        println!("   loading...");
        return;
    }
    for (rank, item) in board.items.iter().enumerate() {
        let filled = usize::from(item.percentage.value()) / 5;
        println!(
            "{}. {:<20} [{:<20}] {}",
            rank + 1,
            item.keyword,
            "#".repeat(filled),
            item.percentage
        );
    }
}
