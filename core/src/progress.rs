//! Progress reporting for long-running computations
//!
//! The engine runs a request to completion in one call; callers that want
//! feedback pass a callback that receives values in `[0.0, 1.0]`.

/// Wraps an optional progress callback.
///
/// Reported values are clamped, never go backwards, and repeated values are
/// swallowed so the callback only sees real movement.
pub struct Progress<'a> {
    callback: Option<&'a mut dyn FnMut(f32)>,
    last: Option<f32>,
}

impl<'a> Progress<'a> {
    pub fn new(callback: Option<&'a mut dyn FnMut(f32)>) -> Self {
        Self {
            callback,
            last: None,
        }
    }

    /// A reporter that discards everything.
    pub fn none() -> Self {
        Self::new(None)
    }

    pub fn report(&mut self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        if self.last.is_some_and(|last| value <= last) {
            return;
        }
        self.last = Some(value);
        if let Some(callback) = self.callback.as_mut() {
            callback(value);
        }
    }

    /// Report `done / total` of a phase that spans `[from, to]` of the whole run.
    pub fn report_phase(&mut self, from: f32, to: f32, done: usize, total: usize) {
        let fraction = if total == 0 {
            1.0
        } else {
            done as f32 / total as f32
        };
        self.report(from + (to - from) * fraction);
    }

    pub fn finish(&mut self) {
        self.report(1.0);
    }

    /// Last value handed to the callback.
    pub fn last(&self) -> Option<f32> {
        self.last
    }
}
