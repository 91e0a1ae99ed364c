//! 单步发射策略：决定当前标识下发射哪一个迁移。
use std::fmt;

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, RngCore};
use smallvec::SmallVec;

use crate::exam;
use crate::net::{Marking, Net, NetError, PlaceId, TransitionId};

/// Chooses the next transition to fire, or `None` when the run is over.
///
/// Implementations must only return transitions enabled at `marking`.
pub trait FiringPolicy: fmt::Debug {
    fn choose(&self, net: &Net, marking: &Marking, rng: &mut dyn RngCore) -> Option<TransitionId>;
}

/// Picks uniformly among the enabled transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPolicy;

impl FiringPolicy for UniformPolicy {
    fn choose(&self, net: &Net, marking: &Marking, rng: &mut dyn RngCore) -> Option<TransitionId> {
        let enabled = net.enabled_transitions(marking);
        if enabled.is_empty() {
            return None;
        }
        Some(enabled[rng.random_range(0..enabled.len())])
    }
}

pub const SUCCESS_WEIGHT: f64 = 0.7;
pub const RETRY_WEIGHT: f64 = 0.3;

/// Exam workflow policy, checked in order:
///
/// 1. admission fires whenever it is enabled;
/// 2. start fires when enabled and the busy place is empty;
/// 3. while the busy place holds tokens, one of the weighted outcome
///    transitions fires, weights renormalized over the enabled ones;
/// 4. otherwise nothing fires.
///
/// The empty-busy-place guard in rule 2 is not part of the start
/// transition's precondition.
#[derive(Debug, Clone)]
pub struct ExamPolicy {
    admit: TransitionId,
    start: TransitionId,
    busy: PlaceId,
    outcomes: SmallVec<[(TransitionId, f64); 2]>,
}

impl ExamPolicy {
    pub fn new(
        net: &Net,
        admit: TransitionId,
        start: TransitionId,
        busy: PlaceId,
        outcomes: impl IntoIterator<Item = (TransitionId, f64)>,
    ) -> Result<Self, NetError> {
        let outcomes: SmallVec<[(TransitionId, f64); 2]> = outcomes.into_iter().collect();
        for id in [admit, start].into_iter().chain(outcomes.iter().map(|(t, _)| *t)) {
            if net.transition(id).is_none() {
                return Err(NetError::UnknownTransition(format!("{id:?}")));
            }
        }
        if net.place(busy).is_none() {
            return Err(NetError::UnknownPlace(format!("{busy:?}")));
        }
        for &(id, weight) in &outcomes {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(NetError::InvalidWeight {
                    transition: net.transitions()[id].name.clone(),
                    weight,
                });
            }
        }
        Ok(Self {
            admit,
            start,
            busy,
            outcomes,
        })
    }

    /// Resolves the exam transitions by name with the given outcome weights.
    pub fn with_weights(net: &Net, success: f64, retry: f64) -> Result<Self, NetError> {
        Self::new(
            net,
            net.require_transition(exam::ADMIT)?,
            net.require_transition(exam::START)?,
            net.require_place(exam::IN_EXAM)?,
            [
                (net.require_transition(exam::SUCCEED)?, success),
                (net.require_transition(exam::RETRY)?, retry),
            ],
        )
    }

    /// 0.7 success / 0.3 retry.
    pub fn for_exam_net(net: &Net) -> Result<Self, NetError> {
        Self::with_weights(net, SUCCESS_WEIGHT, RETRY_WEIGHT)
    }

    fn weighted_outcome(
        &self,
        net: &Net,
        marking: &Marking,
        rng: &mut dyn RngCore,
    ) -> Option<TransitionId> {
        let candidates: SmallVec<[(TransitionId, f64); 2]> = self
            .outcomes
            .iter()
            .copied()
            .filter(|(id, _)| net.is_enabled(*id, marking))
            .collect();
        match candidates.as_slice() {
            [] => None,
            [(only, _)] => Some(*only),
            _ => {
                let dist = WeightedIndex::new(candidates.iter().map(|(_, w)| *w)).ok()?;
                Some(candidates[dist.sample(rng)].0)
            }
        }
    }
}

impl FiringPolicy for ExamPolicy {
    fn choose(&self, net: &Net, marking: &Marking, rng: &mut dyn RngCore) -> Option<TransitionId> {
        if net.is_enabled(self.admit, marking) {
            return Some(self.admit);
        }
        let busy = marking.get(self.busy).unwrap_or(0);
        if busy == 0 && net.is_enabled(self.start, marking) {
            return Some(self.start);
        }
        if busy > 0 {
            return self.weighted_outcome(net, marking, rng);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::reference_net;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn marking(tokens: [u64; 5]) -> Marking {
        Marking::from_tokens(tokens)
    }

    #[test]
    fn admission_takes_priority_over_start() {
        let net = reference_net().unwrap();
        let policy = ExamPolicy::for_exam_net(&net).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        // W:3 Pr:1 F:1, both TTckt and StEx are enabled
        let choice = policy.choose(&net, &marking([3, 1, 1, 0, 0]), &mut rng);
        assert_eq!(choice, net.transition_id(exam::ADMIT));
    }

    #[test]
    fn start_requires_empty_busy_place() {
        let mut net = Net::empty();
        for name in ["w", "f", "pr", "i"] {
            net.add_place(crate::net::Place::new(name, 0)).unwrap();
        }
        let admit = net
            .add_named_transition("admit", &[("w", 1), ("f", 1)], &[("pr", 1), ("f", 1)])
            .unwrap();
        let start = net
            .add_named_transition("start", &[("pr", 1), ("f", 1)], &[("i", 1)])
            .unwrap();
        let done = net
            .add_named_transition("done", &[("i", 1)], &[("f", 1)])
            .unwrap();
        let busy = net.require_place("i").unwrap();
        let policy = ExamPolicy::new(&net, admit, start, busy, [(done, 1.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        // two examiners: start is enabled by its precondition even while busy
        let busy_marking = Marking::from_tokens([0, 1, 1, 1]);
        assert!(net.is_enabled(start, &busy_marking));
        assert_eq!(policy.choose(&net, &busy_marking, &mut rng), Some(done));

        let idle_marking = Marking::from_tokens([0, 1, 1, 0]);
        assert_eq!(policy.choose(&net, &idle_marking, &mut rng), Some(start));
    }

    #[test]
    fn only_success_or_retry_leave_the_exam() {
        let net = reference_net().unwrap();
        let policy = ExamPolicy::for_exam_net(&net).unwrap();
        let succeed = net.transition_id(exam::SUCCEED);
        let retry = net.transition_id(exam::RETRY);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let choice = policy.choose(&net, &marking([0, 0, 3, 1, 0]), &mut rng);
            assert!(choice == succeed || choice == retry);
        }
    }

    #[test]
    fn terminal_marking_has_no_choice() {
        let net = reference_net().unwrap();
        let policy = ExamPolicy::for_exam_net(&net).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(policy.choose(&net, &marking([0, 1, 0, 0, 4]), &mut rng), None);
        assert_eq!(UniformPolicy.choose(&net, &marking([0, 1, 0, 0, 4]), &mut rng), None);
    }

    #[test]
    fn single_enabled_outcome_fires_with_certainty() {
        let net = reference_net().unwrap();
        let retry = net.require_transition(exam::RETRY).unwrap();
        let admit = net.require_transition(exam::ADMIT).unwrap();
        let start = net.require_transition(exam::START).unwrap();
        let busy = net.require_place(exam::IN_EXAM).unwrap();
        let policy = ExamPolicy::new(&net, admit, start, busy, [(retry, 0.3)]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            assert_eq!(
                policy.choose(&net, &marking([0, 0, 0, 1, 3]), &mut rng),
                Some(retry)
            );
        }
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let net = reference_net().unwrap();
        assert!(matches!(
            ExamPolicy::with_weights(&net, 0.7, 0.0),
            Err(NetError::InvalidWeight { .. })
        ));
        assert!(matches!(
            ExamPolicy::with_weights(&net, f64::NAN, 0.3),
            Err(NetError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn missing_exam_transition_is_reported() {
        let mut net = Net::empty();
        net.add_place(crate::net::Place::new(exam::IN_EXAM, 0)).unwrap();
        assert_eq!(
            ExamPolicy::for_exam_net(&net).unwrap_err(),
            NetError::UnknownTransition(exam::ADMIT.to_owned())
        );
    }

    #[test]
    fn uniform_policy_only_picks_enabled() {
        let net = reference_net().unwrap();
        let m = marking([3, 1, 1, 0, 0]);
        let enabled = net.enabled_transitions(&m);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let choice = UniformPolicy.choose(&net, &m, &mut rng).unwrap();
            assert!(enabled.contains(&choice));
        }
    }
}
