//! Buffer growth configuration.

use crate::error::ConfigError;

/// How a dynamic array sizes its buffer.
///
/// The growth factor is stored as an exact fraction so capacities are
/// computed in integer arithmetic. Results are rounded up, and every
/// growth step adds at least one slot. Validated at construction; all
/// values are immutable after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrowthPolicy {
    initial_capacity: usize,
    numerator: usize,
    denominator: usize,
}

impl GrowthPolicy {
    /// Default number of slots allocated by a freshly constructed array.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 8;

    /// Default growth factor numerator (factor 3/2).
    pub const DEFAULT_FACTOR_NUMERATOR: usize = 3;

    /// Default growth factor denominator (factor 3/2).
    pub const DEFAULT_FACTOR_DENOMINATOR: usize = 2;

    /// Create a validated policy.
    ///
    /// `initial_capacity` must be at least 1 and the factor
    /// `numerator / denominator` must be strictly greater than 1.
    pub fn new(
        initial_capacity: usize,
        numerator: usize,
        denominator: usize,
    ) -> Result<Self, ConfigError> {
        if initial_capacity == 0 {
            return Err(ConfigError::ZeroInitialCapacity);
        }
        if denominator == 0 || numerator <= denominator {
            return Err(ConfigError::InvalidGrowthFactor {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            initial_capacity,
            numerator,
            denominator,
        })
    }

    /// Slots allocated at construction and when growing from zero.
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// The growth factor as a float, for diagnostics only.
    pub fn factor(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Capacity after one growth step from `capacity`.
    ///
    /// Zero grows to the initial capacity. Otherwise the capacity is
    /// multiplied by the factor and rounded up, and the result is always
    /// strictly greater than `capacity`. Returns `None` on overflow.
    pub fn next_capacity(&self, capacity: usize) -> Option<usize> {
        if capacity == 0 {
            return Some(self.initial_capacity);
        }
        let scaled = self.scale_up(capacity)?;
        Some(scaled.max(capacity.checked_add(1)?))
    }

    /// Capacity needed to hold at least `required` slots when growing
    /// from `capacity`: the larger of `required` and one growth step.
    ///
    /// When the growth step overflows, `required` alone is returned.
    pub fn grow_to(&self, capacity: usize, required: usize) -> usize {
        self.next_capacity(capacity)
            .map_or(required, |next| next.max(required))
    }

    /// Capacity for a fresh copy of `len` elements: `len` scaled by the
    /// growth factor, or the initial capacity when `len` is zero.
    /// Returns `None` on overflow.
    pub fn headroom(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return Some(self.initial_capacity);
        }
        self.scale_up(len)
    }

    fn scale_up(&self, n: usize) -> Option<usize> {
        let product = n.checked_mul(self.numerator)?;
        let quotient = product / self.denominator;
        if product % self.denominator == 0 {
            Some(quotient)
        } else {
            quotient.checked_add(1)
        }
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            initial_capacity: Self::DEFAULT_INITIAL_CAPACITY,
            numerator: Self::DEFAULT_FACTOR_NUMERATOR,
            denominator: Self::DEFAULT_FACTOR_DENOMINATOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_is_eight_slots_factor_one_and_a_half() {
        let policy = GrowthPolicy::default();
        assert_eq!(policy.initial_capacity(), 8);
        assert!((policy.factor() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_grows_to_initial_capacity() {
        let policy = GrowthPolicy::default();
        assert_eq!(policy.next_capacity(0), Some(8));
    }

    #[test]
    fn small_capacities_round_up() {
        let policy = GrowthPolicy::default();
        assert_eq!(policy.next_capacity(1), Some(2));
        assert_eq!(policy.next_capacity(2), Some(3));
        assert_eq!(policy.next_capacity(3), Some(5));
        assert_eq!(policy.next_capacity(8), Some(12));
        assert_eq!(policy.next_capacity(12), Some(18));
    }

    #[test]
    fn growth_overflow_returns_none() {
        let policy = GrowthPolicy::default();
        assert_eq!(policy.next_capacity(usize::MAX), None);
        assert_eq!(policy.headroom(usize::MAX / 2), None);
    }

    #[test]
    fn grow_to_honours_larger_request() {
        let policy = GrowthPolicy::default();
        assert_eq!(policy.grow_to(8, 100), 100);
        assert_eq!(policy.grow_to(8, 9), 12);
        assert_eq!(policy.grow_to(usize::MAX, 7), 7);
    }

    #[test]
    fn headroom_of_empty_is_initial_capacity() {
        let policy = GrowthPolicy::default();
        assert_eq!(policy.headroom(0), Some(8));
        assert_eq!(policy.headroom(3), Some(5));
        assert_eq!(policy.headroom(4), Some(6));
    }

    #[test]
    fn rejects_zero_initial_capacity() {
        assert_eq!(
            GrowthPolicy::new(0, 3, 2),
            Err(ConfigError::ZeroInitialCapacity)
        );
    }

    #[test]
    fn rejects_non_growing_factor() {
        assert!(matches!(
            GrowthPolicy::new(8, 2, 2),
            Err(ConfigError::InvalidGrowthFactor { .. })
        ));
        assert!(matches!(
            GrowthPolicy::new(8, 3, 0),
            Err(ConfigError::InvalidGrowthFactor { .. })
        ));
    }

    proptest! {
        #[test]
        fn next_capacity_strictly_grows(
            cap in 0usize..1_000_000,
            initial in 1usize..64,
            den in 1usize..8,
            extra in 1usize..8,
        ) {
            let policy = GrowthPolicy::new(initial, den + extra, den).unwrap();
            let next = policy.next_capacity(cap).unwrap();
            prop_assert!(next > cap);
        }

        #[test]
        fn headroom_never_below_len(len in 0usize..1_000_000) {
            let policy = GrowthPolicy::default();
            prop_assert!(policy.headroom(len).unwrap() >= len);
        }
    }
}
