/// Highest push modification time already processed.
///
/// Starts at `0.0` (beginning of time) and never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Watermark {
    last_modified: f64,
}

impl Watermark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> f64 {
        self.last_modified
    }

    /// Move to `max(current, candidate)`. Returns `true` when the value changed.
    pub fn advance(&mut self, candidate: f64) -> bool {
        if candidate > self.last_modified {
            self.last_modified = candidate;
            true
        } else {
            false
        }
    }
}
