use crate::domain::{DeadLetterQueue, Error};

/// Dead-letter queue that reports rejected operations on stderr, keeping
/// the stdout report machine-readable.
#[derive(Default, Debug)]
pub struct StdErrDLQ {}

impl StdErrDLQ {
    pub fn new() -> Self {
        Self {}
    }
}

impl DeadLetterQueue for StdErrDLQ {
    fn report(&self, error: &Error) {
        eprintln!("DLQ Report - operation rejected: {}", error);
    }
}
