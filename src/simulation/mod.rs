//! 在线仿真：持有当前标识，按策略逐步发射迁移，并可对初始标识做可达性分析。
pub mod policy;

pub use policy::{ExamPolicy, FiringPolicy, UniformPolicy};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;

use crate::analysis::{
    AnalysisError, ExploreConfig, ReachabilityMatrix, ReachabilitySet, ReachabilityTree,
};
use crate::exam;
use crate::net::{FireError, Marking, Net, NetError, TransitionId, Weight};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StepOutcome {
    Fired {
        transition: TransitionId,
        marking: Marking,
    },
    /// The policy found nothing to fire; the marking is unchanged.
    NoEnabledTransition,
}

impl StepOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepOutcome::NoEnabledTransition)
    }
}

/// Live run of a net: the current marking advances by one policy step at a time.
/// Analyses always start from the initial marking, not the current one.
#[derive(Debug)]
pub struct Simulator<R: RngCore = StdRng> {
    net: Net,
    initial: Marking,
    current: Marking,
    policy: Box<dyn FiringPolicy>,
    rng: R,
    explore: ExploreConfig,
}

impl Simulator<StdRng> {
    /// Exam net with the default 0.7 / 0.3 outcome weights.
    pub fn exam(candidates: Weight, examiners: Weight, seed: u64) -> Result<Self, NetError> {
        let net = exam::exam_net(candidates, examiners)?;
        let policy = ExamPolicy::for_exam_net(&net)?;
        Self::seeded(net, Box::new(policy), seed)
    }

    pub fn seeded(net: Net, policy: Box<dyn FiringPolicy>, seed: u64) -> Result<Self, NetError> {
        let initial = net.initial_marking();
        Self::new(net, initial, policy, StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> Simulator<R> {
    pub fn new(
        net: Net,
        initial: Marking,
        policy: Box<dyn FiringPolicy>,
        rng: R,
    ) -> Result<Self, NetError> {
        net.check_marking(&initial)?;
        Ok(Self {
            current: initial.clone(),
            net,
            initial,
            policy,
            rng,
            explore: ExploreConfig::default(),
        })
    }

    pub fn with_explore_config(mut self, explore: ExploreConfig) -> Self {
        self.explore = explore;
        self
    }

    /// Fires the transition chosen by the policy, if any.
    pub fn step(&mut self) -> Result<StepOutcome, FireError> {
        let Some(transition) = self.policy.choose(&self.net, &self.current, &mut self.rng) else {
            log::info!("no enabled transition at {}", self.net.label(&self.current));
            return Ok(StepOutcome::NoEnabledTransition);
        };
        let next = self.net.fire_transition(&self.current, transition)?;
        log::debug!(
            "fired {} -> {}",
            self.net.transitions()[transition].name,
            self.net.label(&next)
        );
        self.current = next.clone();
        Ok(StepOutcome::Fired {
            transition,
            marking: next,
        })
    }

    /// Steps until nothing fires or `max_steps` firings happened.
    /// Returns the fired transitions in order.
    pub fn run(&mut self, max_steps: usize) -> Result<Vec<TransitionId>, FireError> {
        let mut fired = Vec::new();
        while fired.len() < max_steps {
            match self.step()? {
                StepOutcome::Fired { transition, .. } => fired.push(transition),
                StepOutcome::NoEnabledTransition => break,
            }
        }
        if fired.len() == max_steps {
            log::warn!("run stopped after {} steps", max_steps);
        }
        Ok(fired)
    }

    pub fn reset(&mut self) {
        self.current = self.initial.clone();
    }

    pub fn current_marking(&self) -> &Marking {
        &self.current
    }

    pub fn initial_marking(&self) -> &Marking {
        &self.initial
    }

    pub fn net(&self) -> &Net {
        &self.net
    }

    pub fn current_label(&self) -> String {
        self.net.label(&self.current)
    }

    pub fn reachability_set(&self) -> ReachabilitySet {
        ReachabilitySet::with_config(&self.net, &self.initial, &self.explore)
    }

    pub fn reachability_tree(&self, max_depth: usize) -> ReachabilityTree {
        ReachabilityTree::build(&self.net, &self.initial, max_depth)
    }

    pub fn reachability_matrix(&self) -> Result<ReachabilityMatrix, AnalysisError> {
        ReachabilityMatrix::build(&self.reachability_set(), &self.net)
    }
}
