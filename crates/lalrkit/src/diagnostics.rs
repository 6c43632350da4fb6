/// Receives human readable construction/parse errors and keeps a running failure count.
/// Callers compare the count before and after a pass to decide whether to continue.
pub trait ErrorSink {
    fn report(&mut self, message: String);
    fn failure_count(&self) -> usize;
}

/// Collects every reported message.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    messages: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

impl ErrorSink for Diagnostics {
    fn report(&mut self, message: String) {
        self.messages.push(message);
    }

    fn failure_count(&self) -> usize {
        self.messages.len()
    }
}

/// Forwards reports to `log::error!`, only keeping the count.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink {
    failures: usize,
}

impl LogSink {
    pub fn new() -> LogSink {
        LogSink::default()
    }
}

impl ErrorSink for LogSink {
    fn report(&mut self, message: String) {
        log::error!("{}", message);
        self.failures += 1;
    }

    fn failure_count(&self) -> usize {
        self.failures
    }
}
