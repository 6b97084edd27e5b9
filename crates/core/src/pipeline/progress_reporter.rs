/// Cross-cutting sink for task progress.
///
/// Decouples use cases from where progress ends up (queue progress record,
/// log output, nothing) so the same orchestration code runs under the
/// worker, the CLI and tests.
pub trait ProgressReporter: Send {
    /// Report a human-readable step with an optional completion percentage.
    fn report(&mut self, message: &str, percent: Option<u8>);
}

/// Percentage of `done` out of `total`, 0 when `total` is 0.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done.min(total) * 100) / total) as u8
}

/// Discards every report.
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn report(&mut self, _message: &str, _percent: Option<u8>) {}
}

/// Writes reports to the `log` facade and remembers them.
#[derive(Default)]
pub struct LogProgress {
    messages: Vec<(String, Option<u8>)>,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[(String, Option<u8>)] {
        &self.messages
    }
}

impl ProgressReporter for LogProgress {
    fn report(&mut self, message: &str, percent: Option<u8>) {
        match percent {
            Some(p) => log::info!("[{p:3}%] {message}"),
            None => log::info!("{message}"),
        }
        self.messages.push((message.to_string(), percent));
    }
}
