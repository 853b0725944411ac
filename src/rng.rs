use crate::types::Direction;

/// Mulberry32; reproducible across platforms for a given seed.
#[derive(Clone, Debug)]
pub struct Rng {
    seed: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn next_f32(&mut self) -> f32 {
        self.seed = self.seed.wrapping_add(0x6d2b79f5);
        let mut t = self.seed;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);
        (out as f64 / 4_294_967_296.0) as f32
    }

    pub fn bool(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_f32() * len as f32).floor().min((len - 1) as f32) as usize
    }

    pub fn pick_direction(&mut self, candidates: &[Direction]) -> Direction {
        if candidates.is_empty() {
            return Direction::None;
        }
        candidates[self.pick_index(candidates.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::new(7);
        let mut b = Rng::new(7);
        for _ in 0..64 {
            assert_eq!(a.next_f32().to_bits(), b.next_f32().to_bits());
        }
    }

    #[test]
    fn pick_index_stays_in_range() {
        let mut rng = Rng::new(99);
        for _ in 0..1_000 {
            assert!(rng.pick_index(3) < 3);
        }
        assert_eq!(rng.pick_index(0), 0);
    }

    #[test]
    fn pick_direction_handles_empty() {
        let mut rng = Rng::new(1);
        assert_eq!(rng.pick_direction(&[]), Direction::None);
        assert_eq!(rng.pick_direction(&[Direction::Left]), Direction::Left);
    }
}
