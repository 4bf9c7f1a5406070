//! Min/max-tracking columns.
//!
//! [`Record`] is the building block of the columnar ray buffer: an
//! append-only vector that keeps its running extrema up to date on every
//! push, so a flush can tag the written data with `minValue`/`maxValue`
//! without rescanning the column.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scalar types a [`Record`] can hold.
///
/// `SENTINEL_MIN`/`SENTINEL_MAX` are the type's extreme values used to reset
/// the running extrema: an empty record reports `min() > max()`, which no
/// sequence of real pushes can produce.
pub trait Extrema: Copy + PartialOrd {
    /// Smallest representable value.
    const SENTINEL_MIN: Self;
    /// Largest representable value.
    const SENTINEL_MAX: Self;
}

impl Extrema for f32 {
    const SENTINEL_MIN: Self = f32::MIN;
    const SENTINEL_MAX: Self = f32::MAX;
}

impl Extrema for i32 {
    const SENTINEL_MIN: Self = i32::MIN;
    const SENTINEL_MAX: Self = i32::MAX;
}

impl Extrema for u64 {
    const SENTINEL_MIN: Self = u64::MIN;
    const SENTINEL_MAX: Self = u64::MAX;
}

/// Append-only scalar column with running extrema.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record<T: Extrema> {
    values: Vec<T>,
    min: T,
    max: T,
}

impl<T: Extrema> Default for Record<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Extrema> Record<T> {
    /// Creates an empty record in the sentinel state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            min: T::SENTINEL_MAX,
            max: T::SENTINEL_MIN,
        }
    }

    /// Appends a value and updates the running extrema.
    #[inline]
    pub fn push(&mut self, value: T) {
        if self.min > value {
            self.min = value;
        }
        if self.max < value {
            self.max = value;
        }
        self.values.push(value);
    }

    /// All values pushed since the last clear.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Running minimum; sentinel (`min > max`) when empty.
    #[inline]
    #[must_use]
    pub fn min(&self) -> T {
        self.min
    }

    /// Running maximum; sentinel (`min > max`) when empty.
    #[inline]
    #[must_use]
    pub fn max(&self) -> T {
        self.max
    }

    /// Number of stored values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record holds no values.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at index `i` without advancing anything.
    ///
    /// # Panics
    /// Panics if `i >= len()`.
    #[inline]
    #[must_use]
    pub fn get(&self, i: usize) -> T {
        self.values[i]
    }

    /// Bulk-appends loaded values, folding them into the extrema.
    pub fn extend_from_slice(&mut self, values: &[T]) {
        for &value in values {
            self.push(value);
        }
    }

    /// Empties the column and resets the extrema to the sentinel state.
    pub fn clear(&mut self) {
        self.values.clear();
        self.min = T::SENTINEL_MAX;
        self.max = T::SENTINEL_MIN;
    }
}

impl<T: Extrema> std::ops::Index<usize> for Record<T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.values[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_sentinels() {
        let record: Record<f32> = Record::new();
        assert!(record.is_empty());
        assert!(record.min() > record.max());
    }

    #[test]
    fn test_extrema_track_pushes() {
        let mut record = Record::new();
        for value in [3.0_f32, -1.5, 7.25, 0.0] {
            record.push(value);
        }
        assert_eq!(record.len(), 4);
        assert_eq!(record.min(), -1.5);
        assert_eq!(record.max(), 7.25);
        assert_eq!(record[2], 7.25);
        assert_eq!(record.values(), &[3.0, -1.5, 7.25, 0.0]);
    }

    #[test]
    fn test_single_value_extrema() {
        let mut record = Record::new();
        record.push(42_u64);
        assert_eq!(record.min(), 42);
        assert_eq!(record.max(), 42);
    }

    #[test]
    fn test_clear_resets_sentinels() {
        let mut record = Record::new();
        record.push(-3_i32);
        record.push(9);
        record.clear();
        assert!(record.is_empty());
        assert!(record.min() > record.max());
        record.push(5);
        assert_eq!(record.min(), 5);
        assert_eq!(record.max(), 5);
    }

    #[test]
    fn test_extend_updates_extrema() {
        let mut record = Record::new();
        record.extend_from_slice(&[2.0_f32, -4.0, 1.0]);
        assert_eq!(record.len(), 3);
        assert_eq!(record.min(), -4.0);
        assert_eq!(record.max(), 2.0);
    }
}
