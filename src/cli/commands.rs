use std::collections::HashSet;

use chrono::Local;

use crate::app::{AppContext, NotestreamError, Result};
use crate::domain::{FeedDescriptor, Note, RemoteSession};
use crate::feed::{ConnectionState, FeedError, FeedHandle, FeedView, PullOutcome};

pub fn list_servers(ctx: &AppContext) -> Result<()> {
    if ctx.config.servers.is_empty() {
        println!("No servers configured");
        return Ok(());
    }

    let selected = ctx.selection.current();
    for server in &ctx.config.servers {
        let marker = if selected.as_deref() == Some(server.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {:<16} {}", marker, server.name, server.origin);
    }
    Ok(())
}

pub async fn page(
    ctx: &AppContext,
    remote: &RemoteSession,
    descriptor: &FeedDescriptor,
    pages: usize,
) -> Result<()> {
    let handle = ctx.registry.acquire(remote, descriptor)?;
    let mut view = wait_idle(&handle).await?;
    if first_page_missing(&view) {
        if let Some(error) = view.error.take() {
            if !error.is_retryable() {
                return Err(error.into());
            }
            tracing::warn!("First page failed ({}); trying once more", error);
            if let PullOutcome::Failed(error) = handle.load_more().await {
                return Err(error.into());
            }
            view = handle.view();
        }
    }

    let mut printed = HashSet::new();
    print_page(&view.notes, &mut printed);

    for _ in 1..pages {
        match load_more_retrying(&handle).await {
            PullOutcome::Applied { received: 0 } | PullOutcome::Skipped => {
                println!("-- no older notes --");
                break;
            }
            PullOutcome::Applied { .. } => print_page(&handle.view().notes, &mut printed),
            PullOutcome::Failed(error) => return Err(error.into()),
            PullOutcome::Stale => break,
        }
    }

    handle.release();
    Ok(())
}

pub async fn watch(
    ctx: &AppContext,
    remote: &RemoteSession,
    descriptor: &FeedDescriptor,
) -> Result<()> {
    let handle = ctx.registry.acquire(remote, descriptor)?;
    let mut rx = handle.watch();
    let mut printed = HashSet::new();
    let mut connection = ConnectionState::Disconnected;
    let mut last_error: Option<FeedError> = None;

    println!("Watching {} on {} (Ctrl-C to stop)", descriptor, remote.origin);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = rx.borrow_and_update().clone();
                if view.connection != connection {
                    connection = view.connection;
                    log_line(&format!("stream {:?}", connection));
                }
                if view.error != last_error {
                    if let Some(error) = &view.error {
                        log_line(&format!("error: {}", error));
                        if !error.is_retryable() {
                            return Err(error.clone().into());
                        }
                    }
                    last_error = view.error.clone();
                }
                print_live(&view, &mut printed);
            }
            _ = &mut ctrl_c => break,
        }
    }

    handle.release();
    Ok(())
}

async fn wait_idle(handle: &FeedHandle) -> Result<FeedView> {
    let mut rx = handle.watch();
    let view = rx
        .wait_for(|v| !v.is_loading)
        .await
        .map_err(|_| NotestreamError::Other("Feed session closed".into()))?;
    Ok(FeedView::clone(&view))
}

/// Nothing landed and history is not known to be empty.
fn first_page_missing(view: &FeedView) -> bool {
    view.cursor.is_none() && view.has_more
}

/// Pull once more after a failure that a second attempt can fix.
async fn load_more_retrying(handle: &FeedHandle) -> PullOutcome {
    match handle.load_more().await {
        PullOutcome::Failed(error) if error.is_retryable() => {
            tracing::warn!("Pull failed ({}); trying once more", error);
            handle.load_more().await
        }
        outcome => outcome,
    }
}

/// Print notes not yet shown, oldest first.
fn print_page(notes: &[Note], printed: &mut HashSet<String>) {
    for note in notes.iter().rev() {
        if printed.insert(note.id.clone()) {
            print_note(note);
        }
    }
}

fn print_live(view: &FeedView, printed: &mut HashSet<String>) {
    if view.is_loading {
        return;
    }
    print_page(&view.notes, printed);
}

fn print_note(note: &Note) {
    let text = note.display_text().replace('\n', " ");
    println!("[{}] @{}: {}", note.id, note.display_author(), text);
}

fn log_line(msg: &str) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    eprintln!("[{}] {}", timestamp, msg);
}
