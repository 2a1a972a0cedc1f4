//! Single-line progress bar for long trial runs.

use std::io::Write;
use std::time::{Duration, Instant};

use tracing::debug;

const BAR_WIDTH: usize = 28;

/// Render one progress line (leading carriage return, no trailing newline).
///
/// ETA is a linear extrapolation from the completed runs and stays at zero
/// until the first run finishes.
pub fn progress_line(done: usize, total: usize, elapsed: Duration) -> String {
    let elapsed = elapsed.as_secs_f64();
    let (pct, filled) = if total == 0 {
        (100.0, BAR_WIDTH)
    } else {
        let fraction = done.min(total) as f64 / total as f64;
        (fraction * 100.0, (fraction * BAR_WIDTH as f64) as usize)
    };
    let eta = if done == 0 {
        0.0
    } else {
        elapsed / done as f64 * total.saturating_sub(done) as f64
    };
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
    format!("\r{bar} {pct:6.2}%  |  {done}/{total}  |  elapsed: {elapsed:5.1}s  eta: {eta:5.1}s")
}

/// Receives progress updates from the randomness check.
pub trait ProgressSink {
    fn update(&mut self, done: usize, total: usize);
    fn finish(&mut self);
}

/// Draws the bar on a writer, usually stdout. Write errors are logged and dropped.
///
/// The clock starts at the first update, so work done before the trials does not
/// count towards elapsed time or the ETA.
pub struct ProgressBar<W: Write> {
    out: W,
    started: Option<Instant>,
}

impl<W: Write> ProgressBar<W> {
    pub fn new(out: W) -> Self {
        Self { out, started: None }
    }

    fn emit(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(err) = result {
            debug!(err = %err, "progress render failed");
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressSink for ProgressBar<W> {
    fn update(&mut self, done: usize, total: usize) {
        let started = *self.started.get_or_insert_with(Instant::now);
        let line = progress_line(done, total, started.elapsed());
        self.emit(&line);
    }

    fn finish(&mut self) {
        self.emit("\n");
    }
}

/// Discards all updates.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _done: usize, _total: usize) {}
    fn finish(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_before_first_run() {
        let line = progress_line(0, 300, Duration::from_millis(40));
        assert_eq!(
            line,
            format!(
                "\r{}   0.00%  |  0/300  |  elapsed:   0.0s  eta:   0.0s",
                "░".repeat(28)
            )
        );
    }

    #[test]
    fn line_halfway_extrapolates_eta() {
        let line = progress_line(150, 300, Duration::from_secs(30));
        assert_eq!(
            line,
            format!(
                "\r{}{}  50.00%  |  150/300  |  elapsed:  30.0s  eta:  30.0s",
                "█".repeat(14),
                "░".repeat(14)
            )
        );
    }

    #[test]
    fn line_when_complete() {
        let line = progress_line(7, 7, Duration::from_secs(2));
        assert!(line.starts_with(&format!("\r{} 100.00%", "█".repeat(28))));
        assert!(line.ends_with("eta:   0.0s"));
    }

    #[test]
    fn bar_writes_updates_and_newline() {
        let mut bar = ProgressBar::new(Vec::new());
        bar.update(1, 4);
        bar.finish();
        let text = String::from_utf8(bar.into_inner()).expect("utf8");
        assert!(text.starts_with('\r'));
        assert!(text.contains("1/4"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn clock_starts_at_first_update() {
        let mut bar = ProgressBar::new(Vec::new());
        std::thread::sleep(Duration::from_millis(300));
        bar.update(0, 10);
        let text = String::from_utf8(bar.into_inner()).expect("utf8");
        assert!(text.contains("elapsed:   0.0s"), "{text}");
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("closed"))
        }
    }

    #[test]
    fn render_failures_are_swallowed() {
        let mut bar = ProgressBar::new(BrokenWriter);
        bar.update(1, 2);
        bar.finish();
    }
}
