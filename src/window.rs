//! Bounded read windows.
//!
//! A [`ReadWindow`] describes one read request: a start byte in the V area
//! and a byte count. The count is always clamped into `1..=max` when the
//! window is built, so a window can never ask for more than the caller's
//! display capacity.

/// Maximum byte count of a single-shot read (20 rows × 32 columns = 640 bits).
pub const MAX_READ_BYTES: usize = 80;

/// Maximum byte count of a periodic polling read.
pub const MAX_POLL_BYTES: usize = 4;

/// A clamped `(start, count)` pair.
///
/// Deserialized windows go through the same clamp as
/// [`single_shot`](Self::single_shot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "RawWindow")
)]
pub struct ReadWindow {
    start: u32,
    count: usize,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawWindow {
    start: u32,
    count: i64,
}

#[cfg(feature = "serde")]
impl From<RawWindow> for ReadWindow {
    fn from(raw: RawWindow) -> Self {
        Self::single_shot(raw.start, raw.count)
    }
}

impl ReadWindow {
    /// Creates a window, clamping `count` into `1..=max`.
    ///
    /// Negative or zero counts become 1.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_bitview::{ReadWindow, MAX_READ_BYTES};
    ///
    /// assert_eq!(ReadWindow::clamped(100, 0, MAX_READ_BYTES).count(), 1);
    /// assert_eq!(ReadWindow::clamped(100, 1000, MAX_READ_BYTES).count(), 80);
    /// assert_eq!(ReadWindow::clamped(100, 12, MAX_READ_BYTES).count(), 12);
    /// ```
    pub fn clamped(start: u32, count: i64, max: usize) -> Self {
        let max = max.max(1);
        let count = usize::try_from(count).unwrap_or(0).clamp(1, max);
        Self { start, count }
    }

    /// Creates a single-shot window (at most [`MAX_READ_BYTES`]).
    pub fn single_shot(start: u32, count: i64) -> Self {
        Self::clamped(start, count, MAX_READ_BYTES)
    }

    /// Creates a polling window (at most [`MAX_POLL_BYTES`]).
    pub fn polling(start: u32, count: i64) -> Self {
        Self::clamped(start, count, MAX_POLL_BYTES)
    }

    /// Re-clamps this window to a smaller maximum.
    pub fn limit(self, max: usize) -> Self {
        Self::clamped(self.start, self.count as i64, max)
    }

    /// First byte of the window.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Number of bytes in the window, always at least 1.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of bits covered by the window.
    pub fn bit_len(&self) -> usize {
        self.count * 8
    }
}

impl std::fmt::Display for ReadWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let last = (self.start as u64 + self.count as u64).saturating_sub(1);
        write!(f, "VB{}..VB{}", self.start, last)
    }
}
