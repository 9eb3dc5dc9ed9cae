//! Reaction symbol selection.

use parking_lot::Mutex;
use rand::{Rng, RngCore};

// ============================================================================
// SymbolPicker
// ============================================================================

/// Chooses an index into the reaction symbol set.
///
/// Called once per accepted event; implementations keep no memory of past
/// choices beyond their random source.
pub trait SymbolPicker: Send + Sync {
    /// Returns an index in `0..len`. `len` is never zero.
    fn pick(&self, len: usize) -> usize;
}

// ============================================================================
// RandomPicker
// ============================================================================

/// Uniform choice from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPicker;

impl SymbolPicker for RandomPicker {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

// ============================================================================
// RngPicker
// ============================================================================

/// Uniform choice from an owned generator, e.g. a seeded `StdRng`.
#[derive(Debug)]
pub struct RngPicker<R> {
    rng: Mutex<R>,
}

impl<R: RngCore + Send> RngPicker<R> {
    /// Wraps `rng`.
    #[inline]
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl<R: RngCore + Send> SymbolPicker for RngPicker<R> {
    fn pick(&self, len: usize) -> usize {
        self.rng.lock().gen_range(0..len)
    }
}

// ============================================================================
// FixedPicker
// ============================================================================

/// Always picks the same index (wrapped into range).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FixedPicker(pub usize);

impl SymbolPicker for FixedPicker {
    #[inline]
    fn pick(&self, len: usize) -> usize {
        self.0 % len
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_picker_in_range() {
        for _ in 0..200 {
            assert!(RandomPicker.pick(5) < 5);
        }
        assert_eq!(RandomPicker.pick(1), 0);
    }

    #[test]
    fn test_seeded_pickers_agree() {
        let a = RngPicker::new(StdRng::seed_from_u64(7));
        let b = RngPicker::new(StdRng::seed_from_u64(7));

        let first: Vec<usize> = (0..20).map(|_| a.pick(5)).collect();
        let second: Vec<usize> = (0..20).map(|_| b.pick(5)).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|&i| i < 5));
    }

    #[test]
    fn test_fixed_picker_wraps() {
        assert_eq!(FixedPicker(3).pick(5), 3);
        assert_eq!(FixedPicker(7).pick(5), 2);
    }
}
