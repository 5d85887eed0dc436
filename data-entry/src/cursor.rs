//! Pagination cursor over a datasource

/// Index of the record on screen, bounded to `[min, max]`.
///
/// `None` means no record is selected. The bounds follow the data: once a
/// maximum is known the cursor snaps to it if nothing was selected yet, and
/// moves back inside the range if the data shrank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    min: usize,
    max: Option<usize>,
    value: Option<usize>,
}

impl Cursor {
    /// A cursor with nothing selected.
    pub fn new(min: usize, max: Option<usize>) -> Self {
        Self {
            min,
            max,
            value: None,
        }
    }

    pub fn value(&self) -> Option<usize> {
        self.value
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    /// Update the upper bound, e.g. after the data was reloaded.
    pub fn set_max(&mut self, max: Option<usize>) {
        self.max = max;
        self.value = match (self.value, max) {
            (_, None) => None,
            (None, Some(max)) => Some(max),
            (Some(value), Some(_)) => Some(self.clamp(value as i64)),
        };
    }

    /// Select `value`, clamped into range. Ignored while there is no maximum.
    pub fn set(&mut self, value: Option<usize>) {
        self.value = match (value, self.max) {
            (Some(value), Some(_)) => Some(self.clamp(value as i64)),
            _ => None,
        };
    }

    /// Move by `count`, stopping at either bound. Does nothing when no record is selected.
    pub fn increment_by(&mut self, count: i64) {
        if let Some(value) = self.value {
            self.value = Some(self.clamp(value as i64 + count));
        }
    }

    pub fn increment(&mut self) {
        self.increment_by(1);
    }

    pub fn decrement(&mut self) {
        self.increment_by(-1);
    }

    /// Deselect.
    pub fn clear(&mut self) {
        self.value = None;
    }

    fn clamp(&self, value: i64) -> usize {
        let min = self.min as i64;
        let max = self.max.map_or(min, |max| (max as i64).max(min));
        value.clamp(min, max) as usize
    }
}
