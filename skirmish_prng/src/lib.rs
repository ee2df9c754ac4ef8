// Deterministic pseudo-random number generator for host-side effect rolls.
//
// xoshiro256++ (Blackman & Vigna) seeded through SplitMix64. Every random
// decision an effect computer makes (today, the frost bite freeze proc)
// draws from a `BattleRng` owned by the host's `BattleContext`.
// Guests never hold one: they mirror outcomes carried in update envelopes,
// so a guest can never re-roll a number the host already rolled.
//
// The host seeds its generator from the `BattleStart { seed }` message. The
// seed is broadcast so that replays and test harnesses can reconstruct the
// host's roll sequence; guests still do not use it during play.
//
// Probabilities are integer percentages or numerator/denominator pairs, so
// rolls are bit-identical on every platform.

use serde::{Deserialize, Serialize};

/// Host-side xoshiro256++ generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRng {
    s: [u64; 4],
}

impl BattleRng {
    /// Seed a generator. Equal seeds yield equal streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        let s = [
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
        ];
        Self { s }
    }

    pub fn next_u64(&mut self) -> u64 {
        let out = self.s[0]
            .wrapping_add(self.s[3])
            .rotate_left(23)
            .wrapping_add(self.s[0]);
        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        out
    }

    /// Uniform integer in `[0, bound)`. Returns 0 when `bound` is 0.
    ///
    /// Lemire-style rejection keeps the distribution unbiased.
    pub fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        let zone = bound.wrapping_neg() % bound;
        loop {
            let r = self.next_u64();
            let wide = u128::from(r) * u128::from(bound);
            if (wide as u64) >= zone {
                return (wide >> 64) as u64;
            }
        }
    }

    /// `true` with probability `numerator / denominator`. A zero denominator
    /// or zero numerator never succeeds; `numerator >= denominator` always
    /// does.
    pub fn chance(&mut self, numerator: u32, denominator: u32) -> bool {
        if denominator == 0 || numerator == 0 {
            return false;
        }
        if numerator >= denominator {
            return true;
        }
        self.below(u64::from(denominator)) < u64::from(numerator)
    }

    /// `true` with probability `percent / 100`.
    pub fn roll_percent(&mut self, percent: u32) -> bool {
        self.chance(percent, 100)
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = BattleRng::new(7);
        let mut b = BattleRng::new(7);
        for _ in 0..500 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = BattleRng::new(7);
        let mut b = BattleRng::new(8);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn below_stays_in_bounds() {
        let mut rng = BattleRng::new(99);
        for bound in [1u64, 2, 3, 7, 100, 1 << 40] {
            for _ in 0..2_000 {
                assert!(rng.below(bound) < bound);
            }
        }
        assert_eq!(rng.below(0), 0);
    }

    #[test]
    fn chance_extremes() {
        let mut rng = BattleRng::new(1);
        for _ in 0..200 {
            assert!(!rng.chance(0, 10));
            assert!(!rng.chance(3, 0));
            assert!(rng.chance(10, 10));
            assert!(!rng.roll_percent(0));
            assert!(rng.roll_percent(100));
        }
    }

    #[test]
    fn roll_percent_distribution() {
        let mut rng = BattleRng::new(2024);
        let hits = (0..20_000).filter(|_| rng.roll_percent(30)).count();
        let pct = hits * 100 / 20_000;
        assert!((27..=33).contains(&pct), "expected ~30%, got {pct}%");
    }

    #[test]
    fn survives_serde_mid_stream() {
        let mut rng = BattleRng::new(77);
        for _ in 0..50 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: BattleRng = serde_json::from_str(&json).unwrap();
        for _ in 0..50 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }
}
