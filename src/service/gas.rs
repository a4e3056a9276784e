//! Gas limit 放大策略
//!
//! 链上估算值在广播前会漂移，注册交易的 gas limit 取估算值乘以
//! [min, max] 区间内的随机倍数（默认 1.15 ~ 1.30）。
//! 倍数以万分比整数表示，避免 U256 与浮点混算。

use ethers::types::U256;
use rand::Rng;

use crate::config::{DEFAULT_GAS_MULTIPLIER_MAX, DEFAULT_GAS_MULTIPLIER_MIN};

const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasLimitPolicy {
    min_bps: u64,
    max_bps: u64,
}

impl Default for GasLimitPolicy {
    fn default() -> Self {
        Self::from_multipliers(DEFAULT_GAS_MULTIPLIER_MIN, DEFAULT_GAS_MULTIPLIER_MAX)
    }
}

impl GasLimitPolicy {
    /// 倍数按万分比取整；min > max 时交换
    pub fn from_multipliers(min: f64, max: f64) -> Self {
        let to_bps = |m: f64| (m.max(1.0) * BPS_DENOMINATOR as f64).round() as u64;
        let (a, b) = (to_bps(min), to_bps(max));
        Self {
            min_bps: a.min(b),
            max_bps: a.max(b),
        }
    }

    pub fn min_multiplier(&self) -> f64 {
        self.min_bps as f64 / BPS_DENOMINATOR as f64
    }

    pub fn max_multiplier(&self) -> f64 {
        self.max_bps as f64 / BPS_DENOMINATOR as f64
    }

    /// 放大原始估算值，结果向下取整
    pub fn inflate<R: Rng + ?Sized>(&self, raw_estimate: U256, rng: &mut R) -> U256 {
        let bps = rng.gen_range(self.min_bps..=self.max_bps);
        raw_estimate.saturating_mul(U256::from(bps)) / U256::from(BPS_DENOMINATOR)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn test_inflation_stays_in_range() {
        let policy = GasLimitPolicy::default();
        let mut rng = StdRng::seed_from_u64(2024);
        let raw = U256::from(1_000_000u64);

        for _ in 0..1000 {
            let limit = policy.inflate(raw, &mut rng);
            assert!(limit >= U256::from(1_150_000u64), "below range: {limit}");
            assert!(limit <= U256::from(1_300_000u64), "above range: {limit}");
        }
    }

    #[test]
    fn test_inverted_multipliers_are_normalized() {
        let policy = GasLimitPolicy::from_multipliers(1.3, 1.15);
        assert_eq!(policy.min_multiplier(), 1.15);
        assert_eq!(policy.max_multiplier(), 1.3);
    }

    #[test]
    fn test_fixed_multiplier() {
        let policy = GasLimitPolicy::from_multipliers(1.2, 1.2);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            policy.inflate(U256::from(100_000u64), &mut rng),
            U256::from(120_000u64)
        );
    }
}
