/// Which sync operation is reporting progress
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Fetching records from the remote source
    Loading,
    /// Writing records from a snapshot
    Restoring,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProgressMessage {
    Started {
        phase: ProgressPhase,
        total: usize,
    },
    Progress {
        phase: ProgressPhase,
        current: usize,
        entity: Option<String>,
    },
    Finished {
        phase: ProgressPhase,
    },
}

/// Side channel for progress reports, kept apart from data output
pub trait ProgressSink {
    fn report(&mut self, message: ProgressMessage);
}

/// Discards every report
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _message: ProgressMessage) {}
}

impl ProgressSink for Vec<ProgressMessage> {
    fn report(&mut self, message: ProgressMessage) {
        self.push(message);
    }
}
