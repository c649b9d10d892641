use rand::{RngCore, SeedableRng, rngs::StdRng};

/// Random source for simulated power-on contents and test payloads.
///
/// Remembers its seed so a simulated run can be logged and repeated with
/// `test_ddr --simulate --seed`.
#[derive(Debug)]
pub struct Rng {
    seed: u64,
    rng: StdRng,
}

impl Rng {
    /// Creates a generator whose output is fixed by `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed this generator was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RngCore for Rng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest);
    }
}
