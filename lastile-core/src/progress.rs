/// Observer for long-running operations. Implementations must not block;
/// reporting is purely observational.
pub trait Notifier {
    fn message(&mut self, text: &str);
    fn error(&mut self, text: &str);
    fn finished(&mut self) {}
}

/// Default notifier routing to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn message(&mut self, text: &str) {
        log::info!("{}", text);
    }

    fn error(&mut self, text: &str) {
        log::error!("{}", text);
    }
}

/// Gate emitting at most one report per `step` percent of advancement.
/// Completion (100%) always passes.
#[derive(Debug)]
pub struct Progress {
    step: f64,
    last: f64,
}

impl Progress {
    pub fn new(step: f64) -> Self {
        Progress {
            step: step.max(0.0),
            last: 0.0,
        }
    }

    /// Feeds the current percentage; returns it when it should be
    /// reported.
    pub fn advance(&mut self, percent: f64) -> Option<f64> {
        if percent - self.last >= self.step || (percent >= 100.0 && self.last < 100.0) {
            self.last = percent;
            Some(percent)
        } else {
            None
        }
    }
}
