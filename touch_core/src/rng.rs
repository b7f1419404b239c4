//! Default scan-order shuffler.

use touch_traits::RandomSource;

const MODULUS: i64 = 0x7FFF_FFFF;
const ZERO_SEED_SUBSTITUTE: u32 = 123_459_876;

/// Park–Miller "minimal standard" generator (multiplier 16807), computed with
/// Schrage's factorisation.
///
/// This is the sequence classic embedded `random()` implementations produce,
/// so scan orders match those of deployed firmware for the same seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParkMiller {
    state: u32,
}

impl Default for ParkMiller {
    fn default() -> Self {
        Self { state: 1 }
    }
}

impl ParkMiller {
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next value in `0..0x7FFF_FFFF`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn next_u31(&mut self) -> u32 {
        let mut x = i64::from(self.state);
        if x == 0 {
            x = i64::from(ZERO_SEED_SUBSTITUTE);
        }
        let hi = x / 127_773;
        let lo = x % 127_773;
        x = 16_807 * lo - 2_836 * hi;
        if x < 0 {
            x += MODULUS;
        }
        debug_assert!((0..MODULUS).contains(&x));
        self.state = x as u32;
        self.state
    }
}

impl RandomSource for ParkMiller {
    fn seed(&mut self, seed: u32) {
        self.state = seed;
    }

    fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.next_u31() % bound
    }
}
