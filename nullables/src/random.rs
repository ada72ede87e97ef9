//! Nullable random: deterministic random number generation.

use rand::RngCore;

/// An `RngCore` that cycles through pre-configured values.
///
/// With `rand`'s uniform sampling, `NullRandom::new(vec![0])` always picks
/// the first candidate.
#[derive(Clone, Debug)]
pub struct NullRandom {
    outputs: Vec<u64>,
    index: usize,
}

impl NullRandom {
    /// Create with a sequence of deterministic values.
    pub fn new(outputs: Vec<u64>) -> Self {
        assert!(!outputs.is_empty(), "NullRandom needs at least one value");
        Self { outputs, index: 0 }
    }

    /// Create with a single value that will be returned for every call.
    pub fn constant(value: u64) -> Self {
        Self::new(vec![value])
    }
}

impl RngCore for NullRandom {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        let value = self.outputs[self.index % self.outputs.len()];
        self.index += 1;
        value
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
