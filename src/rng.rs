use rand_core::{Error, RngCore};

// --- Pseudo-Random Number Generator ---
// Algorithm: xoshiro256** (StarStar)
// Reference: https://prng.di.unimi.it/

/// Anything that can hand the pull engine uniform draws in [0.0, 1.0).
pub trait UniformSource {
    fn next_f64(&mut self) -> f64;
}

#[derive(Clone)]
pub struct Rng {
    state: [u64; 4],
}

const GOLDEN_GAMMA: u64 = 0x9e3779b97f4a7c15;

impl Rng {
    pub fn from_seed(mut seed: u64) -> Self {
        // SplitMix64 expands one 64-bit seed into the four xoshiro words.
        let sm64 = |s: &mut u64| -> u64 {
            *s = s.wrapping_add(GOLDEN_GAMMA);
            let mut z = *s;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
            z ^ (z >> 31)
        };

        Rng {
            state: [
                sm64(&mut seed),
                sm64(&mut seed),
                sm64(&mut seed),
                sm64(&mut seed),
            ],
        }
    }

    /// Independent stream for trial `index` of a run seeded with `base_seed`.
    ///
    /// The stream depends only on `(base_seed, index)`, so a trial draws the
    /// same numbers whichever thread (or the sequential fallback) runs it.
    pub fn for_stream(base_seed: u64, index: u64) -> Self {
        let mut mixer = Rng::from_seed(base_seed ^ index.wrapping_mul(GOLDEN_GAMMA));
        Rng::from_seed(mixer.next_u64())
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let result = self.state[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);

        let t = self.state[1] << 17;

        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];

        self.state[2] ^= t;

        self.state[3] = self.state[3].rotate_left(45);

        result
    }

    // (u64 >> 11) * 2^-53
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) * (1.0 / 9007199254740992.0)
    }
}

impl UniformSource for Rng {
    #[inline]
    fn next_f64(&mut self) -> f64 {
        Rng::next_f64(self)
    }
}

impl RngCore for Rng {
    fn next_u32(&mut self) -> u32 {
        (Rng::next_u64(self) >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        Rng::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = Rng::next_u64(self).to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
