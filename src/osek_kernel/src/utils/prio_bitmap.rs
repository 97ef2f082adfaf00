//! Provides `OneLevelPrioBitmap`, a bit array structure supporting
//! constant-time "highest set bit" scans.
use core::fmt;

use super::Init;

/// The maximum bit count supported by [`OneLevelPrioBitmap`].
pub const WORD_LEN: usize = u64::BITS as usize;

/// Trait for priority bitmaps.
///
/// All methods panic when the given bit position is out of range.
pub trait PrioBitmap: Init + Send + Sync + Clone + Copy + fmt::Debug + 'static {
    /// Get the bit at the specified position.
    fn get(&self, i: usize) -> bool;

    /// Clear the bit at the specified position.
    fn clear(&mut self, i: usize);

    /// Set the bit at the specified position.
    fn set(&mut self, i: usize);

    /// Get the position of the highest set bit.
    fn find_set(&self) -> Option<usize>;
}

/// Stores `LEN` (≤ [`WORD_LEN`]) entries in a single word.
#[derive(Clone, Copy)]
pub struct OneLevelPrioBitmap<const LEN: usize> {
    bits: u64,
}

impl<const LEN: usize> OneLevelPrioBitmap<LEN> {
    const VALID_LEN: () = assert!(LEN <= WORD_LEN, "too many entries");

    /// Iterate over the positions of the set bits, lowest first.
    fn one_digits(&self) -> impl Iterator<Item = usize> {
        let mut bits = self.bits;
        core::iter::from_fn(move || {
            if bits == 0 {
                None
            } else {
                let i = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(i)
            }
        })
    }
}

impl<const LEN: usize> Init for OneLevelPrioBitmap<LEN> {
    const INIT: Self = {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_LEN;
        Self { bits: 0 }
    };
}

impl<const LEN: usize> fmt::Debug for OneLevelPrioBitmap<LEN> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.one_digits()).finish()
    }
}

impl<const LEN: usize> PrioBitmap for OneLevelPrioBitmap<LEN> {
    fn get(&self, i: usize) -> bool {
        assert!(i < LEN);
        self.bits & (1 << i) != 0
    }

    fn clear(&mut self, i: usize) {
        assert!(i < LEN);
        self.bits &= !(1 << i);
    }

    fn set(&mut self, i: usize) {
        assert!(i < LEN);
        self.bits |= 1 << i;
    }

    #[inline]
    fn find_set(&self) -> Option<usize> {
        if self.bits == 0 {
            None
        } else {
            Some(WORD_LEN - 1 - self.bits.leading_zeros() as usize)
        }
    }
}
