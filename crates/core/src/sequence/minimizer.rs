//! Counterfactual regret minimization over one decision process.

use super::process::{CompiledProcess, TreeFormDecisionProcess};
use crate::backend::Backend;
use crate::cfr::tensor_ops::{regret_match, update_regrets_cfr_plus};
use crate::config::{CfrVariant, SequenceFormConfig};

/// CFR / CFR+ regret minimizer whose decisions are realization plans of a
/// [`TreeFormDecisionProcess`].
///
/// Alternate [`next_strategy`](Self::next_strategy) and
/// [`observe_utility`](Self::observe_utility); the utility observed refers to
/// the last strategy returned.
#[derive(Debug, Clone)]
pub struct SequenceFormCfr<B: Backend> {
    process: CompiledProcess<B>,
    variant: CfrVariant,
    averaging_exponent: f64,
    /// Cumulative counterfactual regret, K x 1.
    regrets: B::Dense,
    /// Last behavioral strategy, K x 1.
    behavioral: B::Dense,
    /// Weighted average realization plan, S x 1.
    average: B::Dense,
    weight_sum: f64,
    iteration: u64,
}

impl<B: Backend> SequenceFormCfr<B> {
    #[must_use]
    pub fn new(process: &TreeFormDecisionProcess, backend: &B, config: &SequenceFormConfig) -> Self {
        let process = CompiledProcess::new(process, backend);
        let behavioral = process.uniform_strategy.clone();
        let average = process.behavioral_to_sequence_form(backend, &behavioral);
        Self {
            regrets: backend.zeros(process.num_sequences() - 1, 1),
            behavioral,
            average,
            variant: config.variant,
            averaging_exponent: config.averaging_exponent,
            weight_sum: 0.0,
            iteration: 0,
            process,
        }
    }

    /// Regret-match the next strategy and return its realization plan
    /// (S x 1). The plan enters the average with weight `t^gamma`.
    #[allow(clippy::cast_precision_loss)]
    pub fn next_strategy(&mut self, backend: &B) -> B::Dense {
        let p = &self.process;
        self.behavioral = regret_match(backend, &self.regrets, &p.mask, &p.mask_t, &p.uniform_strategy);
        let plan = p.behavioral_to_sequence_form(backend, &self.behavioral);

        self.iteration += 1;
        let weight = (self.iteration as f64).powf(self.averaging_exponent);
        self.weight_sum += weight;
        let step = backend.scale(backend.sub(plan.clone(), &self.average), weight / self.weight_sum);
        self.average = backend.add(self.average.clone(), &step);
        plan
    }

    /// Accumulate the counterfactual regrets of a utility vector over
    /// sequences (S x 1, empty sequence included).
    pub fn observe_utility(&mut self, backend: &B, utility: &B::Dense) {
        let p = &self.process;
        let counterfactual = p.counterfactual_utilities(backend, &self.behavioral, utility);
        let expected = backend.matmul(
            &p.mask_t,
            &backend.matmul(&p.mask, &backend.mul(self.behavioral.clone(), &counterfactual)),
        );
        let delta = backend.sub(counterfactual, &expected);
        self.regrets = match self.variant {
            CfrVariant::Vanilla => backend.add(self.regrets.clone(), &delta),
            CfrVariant::CfrPlus => update_regrets_cfr_plus(backend, self.regrets.clone(), &delta),
        };
    }

    /// Number of strategies produced so far.
    #[must_use]
    pub fn iteration_count(&self) -> u64 {
        self.iteration
    }

    /// Weighted average realization plan; the uniform plan before the first
    /// strategy.
    #[must_use]
    pub fn average_strategy(&self) -> &B::Dense {
        &self.average
    }

    /// Behavioral strategy behind the last plan.
    #[must_use]
    pub fn behavioral_strategy(&self) -> &B::Dense {
        &self.behavioral
    }

    #[must_use]
    pub fn regrets(&self) -> &B::Dense {
        &self.regrets
    }

    #[must_use]
    pub fn compiled(&self) -> &CompiledProcess<B> {
        &self.process
    }
}
