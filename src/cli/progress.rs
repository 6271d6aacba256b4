//! Terminal progress display
//!
//! The scan sends [`ProgressEvent`]s over a channel; a display thread owns
//! the stderr terminal and redraws one status line from them.

use console::Term;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::progress::{format_hms, NoProgress, ProgressEvent, ProgressObserver};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Status line for one event
pub fn progress_label(event: &ProgressEvent) -> String {
    let remaining = event
        .remaining
        .map(format_hms)
        .unwrap_or_else(|| "--:--:--".to_string());
    format!(
        "Processed {}/{} files. Elapsed: {}. Remaining: {}.",
        event.processed,
        event.total,
        format_hms(event.elapsed),
        remaining
    )
}

/// Run `f` with an observer that draws progress on stderr
///
/// Nothing is drawn when `quiet` is set or stderr is not a terminal.
pub fn with_terminal_progress<T>(quiet: bool, f: impl FnOnce(&mut dyn ProgressObserver) -> T) -> T {
    let term = Term::stderr();
    if quiet || !term.is_term() {
        return f(&mut NoProgress);
    }

    let (mut sender, receiver) = mpsc::channel();
    let display = thread::spawn(move || draw(term, receiver));
    let result = f(&mut sender);
    drop(sender);
    let _ = display.join();
    result
}

fn draw(term: Term, events: Receiver<ProgressEvent>) {
    let mut last_draw: Option<Instant> = None;
    let mut drawn = false;

    for event in events {
        let finished = event.processed >= event.total;
        let due = last_draw.map_or(true, |t| t.elapsed() >= REDRAW_INTERVAL);
        if !(due || finished) {
            continue;
        }
        let _ = term.clear_line();
        let _ = term.write_str(&progress_label(&event));
        last_draw = Some(Instant::now());
        drawn = true;
    }

    if drawn {
        let _ = term.write_line("");
    }
}
