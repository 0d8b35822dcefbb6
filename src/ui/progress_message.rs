use crossbeam::channel::Sender;

/// Progress updates are sent at most once per this many records.
const PROGRESS_STRIDE: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProgressPhase {
    Places,
    Visits,
    FromVisits,
}

impl ProgressPhase {
    pub fn label(&self) -> &'static str {
        match self {
            ProgressPhase::Places => "Merging places",
            ProgressPhase::Visits => "Merging visits",
            ProgressPhase::FromVisits => "Updating from_visit",
        }
    }
}

#[derive(Clone, Debug)]
pub enum ProgressMessage {
    Started {
        phase: ProgressPhase,
        total: usize,
    },
    Progress {
        phase: ProgressPhase,
        current: usize,
    },
    Finished {
        phase: ProgressPhase,
    },
    /// Liveness signal from a long source scan
    StillWorking,
    Exit,
}

/// Optional sending end for progress messages.
///
/// A disconnected or absent receiver is ignored.
#[derive(Clone, Debug, Default)]
pub struct ProgressSink {
    tx: Option<Sender<ProgressMessage>>,
}

impl ProgressSink {
    pub fn new(tx: Sender<ProgressMessage>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn send(&self, msg: ProgressMessage) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(msg);
        }
    }

    pub fn started(&self, phase: ProgressPhase, total: usize) {
        self.send(ProgressMessage::Started { phase, total });
    }

    /// Report `current` processed records, throttled
    pub fn progress(&self, phase: ProgressPhase, current: usize, total: usize) {
        if current % PROGRESS_STRIDE == 0 || current == total {
            self.send(ProgressMessage::Progress { phase, current });
        }
    }

    pub fn finished(&self, phase: ProgressPhase) {
        self.send(ProgressMessage::Finished { phase });
    }

    pub fn still_working(&self) {
        self.send(ProgressMessage::StillWorking);
    }
}
