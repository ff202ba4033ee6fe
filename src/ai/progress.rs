//! Progress notifications emitted while a document is generated.

use tokio::sync::mpsc::UnboundedSender;

/// Phase label set when a generation starts.
pub const INITIAL_PHASE: &str = "Initializing";

/// Labels walked through by synthetic progress, with the percentage at
/// which each one takes over.
const PHASES: [(u8, &str); 5] = [
    (0, "Analyzing brief"),
    (20, "Drafting outline"),
    (40, "Writing sections"),
    (70, "Reviewing consistency"),
    (88, "Finalizing"),
];

/// Synthetic progress never claims more than this before the reply lands.
const SYNTHETIC_CAP: u8 = 95;

/// Notification emitted by the generation client while a call is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// New status label (retrying, switching provider, ...)
    Phase(String),
    /// Accumulated text received so far from a streaming backend
    Chunk(String),
}

/// Channel end the client reports events on.
pub type EventSender = UnboundedSender<GenerationEvent>;

/// Coarse progress for backends that answer in one piece.
#[derive(Debug, Clone)]
pub struct SyntheticProgress {
    percent: u8,
    step: u8,
}

impl SyntheticProgress {
    pub fn new() -> Self {
        Self { percent: 0, step: 7 }
    }

    /// Advance one tick and return the new percentage and phase label.
    pub fn tick(&mut self) -> (u8, &'static str) {
        self.percent = self.percent.saturating_add(self.step).min(SYNTHETIC_CAP);
        (self.percent, phase_for(self.percent))
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }
}

impl Default for SyntheticProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn phase_for(percent: u8) -> &'static str {
    PHASES.iter().rev().find(|(from, _)| percent >= *from).map_or(PHASES[0].1, |(_, label)| label)
}
