/// A monotonic point in time, in milliseconds.
/// The host supplies the clock (e.g. `performance.now()` in the browser),
/// so the engine never reads a wall clock itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Timestamp(f64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0.0);

    pub fn from_millis(ms: f64) -> Self {
        Self(ms)
    }

    pub fn millis(self) -> f64 {
        self.0
    }

    /// A timestamp `ms` milliseconds after this one.
    pub fn advanced_by(self, ms: f64) -> Self {
        Self(self.0 + ms)
    }

    /// Milliseconds elapsed since `earlier`. Never negative.
    pub fn elapsed_millis(self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}
