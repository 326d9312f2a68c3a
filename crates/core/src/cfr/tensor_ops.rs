//! Backend-generic CFR update primitives.
//!
//! Strategies and regrets are `A x 1` columns over compiled actions (or
//! sequences); information-set structure enters through a sparse
//! `H x A` membership mask and its transpose.

#![allow(clippy::doc_markdown)]

use crate::backend::Backend;

/// Regret matching over information sets.
///
/// Positive regrets are normalized within each information set; sets whose
/// positive regret sums to zero (or to NaN) take the `uniform` value.
///
/// # Arguments
/// * `regrets` - regrets, `A x 1`
/// * `mask` - information set membership, `H x A`
/// * `mask_t` - its transpose, `A x H`
/// * `uniform` - fallback strategy, `A x 1`
pub fn regret_match<B: Backend>(
    backend: &B,
    regrets: &B::Dense,
    mask: &B::Sparse,
    mask_t: &B::Sparse,
    uniform: &B::Dense,
) -> B::Dense {
    let positive = backend.clamp_min(regrets.clone(), 0.0);
    let sums = backend.matmul(mask_t, &backend.matmul(mask, &positive));
    backend.div_or(positive, &sums, uniform)
}

/// CFR+ regret update: `max(regrets + delta, 0)`.
pub fn update_regrets_cfr_plus<B: Backend>(
    backend: &B,
    regrets: B::Dense,
    delta: &B::Dense,
) -> B::Dense {
    backend.clamp_min(backend.add(regrets, delta), 0.0)
}

/// Streaming mean after `count` earlier samples:
/// `mean + (sample - mean) / (count + 1)`.
#[allow(clippy::cast_precision_loss)]
pub fn running_mean<B: Backend>(
    backend: &B,
    mean: B::Dense,
    sample: &B::Dense,
    count: u64,
) -> B::Dense {
    let step = backend.scale(backend.sub(sample.clone(), &mean), 1.0 / (count + 1) as f64);
    backend.add(mean, &step)
}

/// Move `average` toward `current` by a per-entry `weight` in `[0, 1]`:
/// `average + weight * (current - average)`.
pub fn blend_average<B: Backend>(
    backend: &B,
    average: B::Dense,
    current: &B::Dense,
    weight: &B::Dense,
) -> B::Dense {
    let step = backend.mul(backend.sub(current.clone(), &average), weight);
    backend.add(average, &step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use test_macros::timed_test;

    /// Two information sets: {0, 1, 2} and {3, 4}.
    fn masks(cpu: &CpuBackend) -> (<CpuBackend as Backend>::Sparse, <CpuBackend as Backend>::Sparse) {
        let mask = cpu.sparse(2, 5, &[(0, 0, 1.0), (0, 1, 1.0), (0, 2, 1.0), (1, 3, 1.0), (1, 4, 1.0)]);
        let mask_t = cpu.transpose(&mask);
        (mask, mask_t)
    }

    fn uniform(cpu: &CpuBackend) -> <CpuBackend as Backend>::Dense {
        cpu.column(&[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0, 0.5, 0.5])
    }

    #[timed_test]
    fn regret_match_normalizes_positive_regret() {
        let cpu = CpuBackend::cpu();
        let (mask, mask_t) = masks(&cpu);
        let regrets = cpu.column(&[1.0, -2.0, 3.0, 0.5, 1.5]);
        let s = cpu.to_vec(&regret_match(&cpu, &regrets, &mask, &mask_t, &uniform(&cpu)));
        let expected = [0.25, 0.0, 0.75, 0.25, 0.75];
        for (a, e) in s.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{s:?}");
        }
    }

    #[timed_test]
    fn regret_match_falls_back_to_uniform() {
        let cpu = CpuBackend::cpu();
        let (mask, mask_t) = masks(&cpu);
        let regrets = cpu.column(&[-1.0, -2.0, 0.0, 2.0, 0.0]);
        let s = cpu.to_vec(&regret_match(&cpu, &regrets, &mask, &mask_t, &uniform(&cpu)));
        let u = cpu.to_vec(&uniform(&cpu));
        assert_eq!(s[..3], u[..3], "uniform fallback must be exact");
        assert_eq!(s[3..], [1.0, 0.0]);
    }

    #[timed_test]
    fn regret_match_guards_nan() {
        let cpu = CpuBackend::cpu();
        let (mask, mask_t) = masks(&cpu);
        let regrets = cpu.column(&[f64::NAN, 1.0, 1.0, 1.0, 1.0]);
        let s = cpu.to_vec(&regret_match(&cpu, &regrets, &mask, &mask_t, &uniform(&cpu)));
        assert!(s.iter().all(|x| x.is_finite()), "{s:?}");
    }

    #[timed_test]
    fn cfr_plus_floors_updates() {
        let cpu = CpuBackend::cpu();
        let regrets = cpu.column(&[1.0, 2.0, 0.5, 0.0]);
        let delta = cpu.column(&[-2.0, 1.0, -1.0, 0.5]);
        assert_eq!(cpu.to_vec(&update_regrets_cfr_plus(&cpu, regrets, &delta)), vec![0.0, 3.0, 0.0, 0.5]);
    }

    #[timed_test]
    fn running_mean_matches_arithmetic_mean() {
        let cpu = CpuBackend::cpu();
        let samples = [4.0, -2.0, 7.0, 1.0];
        let mut mean = cpu.zeros(1, 1);
        for (t, &x) in samples.iter().enumerate() {
            mean = running_mean(&cpu, mean, &cpu.column(&[x]), t as u64);
        }
        assert!((cpu.to_vec(&mean)[0] - 2.5).abs() < 1e-12);
    }

    #[timed_test]
    fn blend_average_moves_by_weight() {
        let cpu = CpuBackend::cpu();
        let average = cpu.column(&[0.5, 0.5]);
        let current = cpu.column(&[1.0, 0.0]);
        let weight = cpu.column(&[0.25, 0.0]);
        let blended = cpu.to_vec(&blend_average(&cpu, average, &current, &weight));
        assert_eq!(blended, vec![0.625, 0.5]);
    }
}
