//! Seeded random number generation
//!
//! A small xorshift PRNG used for parameter initialization and epoch shuffling.
//! The same seed always yields the same network and the same batch order.

use ndarray::Array2;

const FALLBACK_STATE: u64 = 0x9e3779b97f4a7c15;

/// Xorshift generator with a 64-bit state.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed.
    ///
    /// The seed is scrambled first so that small seeds do not start with near-zero draws.
    pub fn new(seed: u64) -> Self {
        let mixed = splitmix64(seed);
        let state = if mixed == 0 { FALLBACK_STATE } else { mixed };
        Self { state }
    }

    /// Basic xorshift step returning the upper 32 bits.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Uniform sample in [0, 1].
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / u32::MAX as f64
    }

    /// Uniform sample in [low, high].
    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Integer sample in [0, upper).
    pub fn gen_usize(&mut self, upper: usize) -> usize {
        if upper == 0 {
            0
        } else {
            (self.next_u32() as usize) % upper
        }
    }

    /// Matrix of independent uniform samples in [low, high], filled row by row.
    pub fn uniform_array(&mut self, rows: usize, cols: usize, low: f64, high: f64) -> Array2<f64> {
        Array2::from_shape_simple_fn((rows, cols), || self.gen_range_f64(low, high))
    }

    /// Fisher-Yates shuffle for index slices.
    pub fn shuffle_usize(&mut self, data: &mut [usize]) {
        if data.len() <= 1 {
            return;
        }
        for i in (1..data.len()).rev() {
            let j = self.gen_usize(i + 1);
            data.swap(i, j);
        }
    }
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}
