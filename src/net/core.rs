//! 运行时: 网结构、可发生集、发生语义与构造期校验.
use std::collections::HashSet;
use std::fmt::{self, Write as FmtWrite};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::{Marking, Place, Transition, Weight};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FireError {
    #[error("transition `{0}` is not enabled under the supplied marking")]
    Disabled(String),
    #[error("transition {0:?} is out of bounds")]
    OutOfBounds(TransitionId),
    #[error("transition `{transition}` refers to place {place:?} missing from the marking")]
    UnknownPlace {
        transition: String,
        place: PlaceId,
    },
    #[error("token count overflow at place {0:?}")]
    Overflow(PlaceId),
}

#[derive(Debug, Error, PartialEq)]
pub enum NetError {
    #[error("malformed transition `{transition}`: {reason}")]
    MalformedTransition { transition: String, reason: String },
    #[error("duplicate {kind} name `{name}`")]
    DuplicateName { kind: &'static str, name: String },
    #[error("no transition named `{0}`")]
    UnknownTransition(String),
    #[error("no place named `{0}`")]
    UnknownPlace(String),
    #[error("marking has {actual} places, net has {expected}")]
    MarkingShape { expected: usize, actual: usize },
    #[error("invalid weight {weight} for transition `{transition}`")]
    InvalidWeight { transition: String, weight: f64 },
    #[error("label order {order:?} is not a permutation of the {places} places")]
    InvalidLabelOrder { order: Vec<PlaceId>, places: usize },
}

/// Petri 网连通性诊断报告
#[derive(Debug, Clone, Default)]
pub struct DiagnosticReport {
    /// 孤立库所（无任何连接的弧）
    pub isolated_places: Vec<(PlaceId, String)>,
    /// 孤立变迁（无任何连接的弧）
    pub isolated_transitions: Vec<(TransitionId, String)>,
    pub warnings: Vec<String>,
}

impl DiagnosticReport {
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.warnings.is_empty()
    }
}

/// A place/transition net: the fixed place set, the transitions in
/// declaration order and the initial token counts carried by each [`Place`].
///
/// Every arc is validated when the transition is added, so firing through a
/// `Net` can never index a missing place. Deserialization goes through the
/// same checks.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "NetDef")]
pub struct Net {
    places: IndexVec<PlaceId, Place>,
    transitions: IndexVec<TransitionId, Transition>,
    label_order: Vec<PlaceId>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .finish()
    }
}

impl Net {
    pub fn empty() -> Self {
        Self {
            places: IndexVec::new(),
            transitions: IndexVec::new(),
            label_order: Vec::new(),
        }
    }

    pub fn add_place(&mut self, place: Place) -> Result<PlaceId, NetError> {
        if self.place_id(&place.name).is_some() {
            return Err(NetError::DuplicateName {
                kind: "place",
                name: place.name,
            });
        }
        let id = self.places.push(place);
        self.label_order.push(id);
        Ok(id)
    }

    /// Adds a transition after checking that every arc names an existing
    /// place with a positive weight.
    pub fn add_transition(&mut self, transition: Transition) -> Result<TransitionId, NetError> {
        if self.transition_id(&transition.name).is_some() {
            return Err(NetError::DuplicateName {
                kind: "transition",
                name: transition.name,
            });
        }
        for &(place, weight) in transition.pre().iter().chain(transition.post()) {
            if self.places.get(place).is_none() {
                return Err(NetError::MalformedTransition {
                    transition: transition.name.clone(),
                    reason: format!("unknown place {place:?}"),
                });
            }
            if weight == 0 {
                return Err(NetError::MalformedTransition {
                    transition: transition.name.clone(),
                    reason: format!("zero weight on place {place:?}"),
                });
            }
        }
        Ok(self.transitions.push(transition))
    }

    /// Name-based variant of [`Net::add_transition`].
    pub fn add_named_transition(
        &mut self,
        name: &str,
        pre: &[(&str, Weight)],
        post: &[(&str, Weight)],
    ) -> Result<TransitionId, NetError> {
        let resolve = |arcs: &[(&str, Weight)]| -> Result<Vec<(PlaceId, Weight)>, NetError> {
            arcs.iter()
                .map(|&(place, weight)| {
                    self.place_id(place)
                        .map(|id| (id, weight))
                        .ok_or_else(|| NetError::MalformedTransition {
                            transition: name.to_owned(),
                            reason: format!("unknown place `{place}`"),
                        })
                })
                .collect()
        };
        let transition = Transition::new(name, resolve(pre)?, resolve(post)?);
        self.add_transition(transition)
    }

    /// Sets the place order used by [`Net::label`]; must be a permutation of
    /// the places.
    pub fn set_label_order(&mut self, order: Vec<PlaceId>) -> Result<(), NetError> {
        let distinct: HashSet<_> = order.iter().copied().collect();
        if order.len() != self.places_len()
            || distinct.len() != order.len()
            || order.iter().any(|p| self.places.get(*p).is_none())
        {
            return Err(NetError::InvalidLabelOrder {
                order,
                places: self.places_len(),
            });
        }
        self.label_order = order;
        Ok(())
    }

    pub fn places(&self) -> &IndexVec<PlaceId, Place> {
        &self.places
    }

    pub fn transitions(&self) -> &IndexVec<TransitionId, Transition> {
        &self.transitions
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn place(&self, place: PlaceId) -> Option<&Place> {
        self.places.get(place)
    }

    pub fn transition(&self, transition: TransitionId) -> Option<&Transition> {
        self.transitions.get(transition)
    }

    pub fn place_id(&self, name: &str) -> Option<PlaceId> {
        self.places
            .iter_enumerated()
            .find(|(_, place)| place.name == name)
            .map(|(id, _)| id)
    }

    pub fn transition_id(&self, name: &str) -> Option<TransitionId> {
        self.transitions
            .iter_enumerated()
            .find(|(_, transition)| transition.name == name)
            .map(|(id, _)| id)
    }

    pub fn require_place(&self, name: &str) -> Result<PlaceId, NetError> {
        self.place_id(name)
            .ok_or_else(|| NetError::UnknownPlace(name.to_owned()))
    }

    pub fn require_transition(&self, name: &str) -> Result<TransitionId, NetError> {
        self.transition_id(name)
            .ok_or_else(|| NetError::UnknownTransition(name.to_owned()))
    }

    pub fn initial_marking(&self) -> Marking {
        Marking::from_tokens(self.places.iter().map(|p| p.tokens))
    }

    pub fn check_marking(&self, marking: &Marking) -> Result<(), NetError> {
        if marking.len() != self.places_len() {
            return Err(NetError::MarkingShape {
                expected: self.places_len(),
                actual: marking.len(),
            });
        }
        Ok(())
    }

    pub fn is_enabled(&self, transition: TransitionId, marking: &Marking) -> bool {
        self.transitions
            .get(transition)
            .is_some_and(|t| t.enabled(marking))
    }

    /// Enabled transitions in declaration order.
    pub fn enabled_transitions(&self, marking: &Marking) -> Vec<TransitionId> {
        self.transitions
            .iter_enumerated()
            .filter(|(_, transition)| transition.enabled(marking))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn fire_transition(
        &self,
        marking: &Marking,
        transition: TransitionId,
    ) -> Result<Marking, FireError> {
        self.transitions
            .get(transition)
            .ok_or(FireError::OutOfBounds(transition))?
            .fire(marking)
    }

    /// Short marking label, e.g. `W:4, Pr:0, F:1, I:0, D:0`.
    ///
    /// Net drawings, tree nodes and matrix rows all go through this function.
    pub fn label(&self, marking: &Marking) -> String {
        self.label_order
            .iter()
            .map(|&place| {
                format!(
                    "{}:{}",
                    self.places[place].abbrev,
                    marking.get(place).unwrap_or(0)
                )
            })
            .join(", ")
    }

    /// DOT drawing of the net under `marking`: one `●` per token, arc
    /// weights printed only when greater than one.
    pub fn to_dot(&self, marking: &Marking) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph PetriNet {{");
        let _ = writeln!(&mut dot, "    rankdir=LR;");
        let _ = writeln!(&mut dot, "    edge [fontsize=10];");
        let _ = writeln!(&mut dot, "    // {}", self.label(marking));

        for (place_id, place) in self.places.iter_enumerated() {
            let tokens = marking.get(place_id).unwrap_or(0) as usize;
            let label = if tokens == 0 {
                format!("\"{}\"", escape_label(&place.name))
            } else {
                let dots = std::iter::repeat_n("●", tokens).join(" ");
                format!(
                    "<{}<BR/><FONT POINT-SIZE=\"16\">{}</FONT>>",
                    escape_html(&place.name),
                    dots
                )
            };
            let _ = writeln!(
                &mut dot,
                "    place_{} [label={}, shape=circle, fixedsize=true, width=1.2, style=filled, fillcolor=lightblue];",
                place_id.index(),
                label
            );
        }

        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let vertical = transition
                .name
                .chars()
                .map(|c| escape_html(&c.to_string()))
                .join("<BR/>");
            let _ = writeln!(
                &mut dot,
                "    trans_{} [label=<{}>, shape=box, fixedsize=true, width=0.6, height=1.5, style=filled, fillcolor=gray, fontcolor=white];",
                transition_id.index(),
                vertical
            );
            for &(place, weight) in transition.pre() {
                write_arc(
                    &mut dot,
                    &format!("place_{}", place.index()),
                    &format!("trans_{}", transition_id.index()),
                    weight,
                );
            }
            for &(place, weight) in transition.post() {
                write_arc(
                    &mut dot,
                    &format!("trans_{}", transition_id.index()),
                    &format!("place_{}", place.index()),
                    weight,
                );
            }
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    /// 诊断信息：检测孤立节点与永远无法获得 token 的库所
    pub fn diagnose(&self) -> DiagnosticReport {
        let mut report = DiagnosticReport::default();

        for (place_id, place) in self.places.iter_enumerated() {
            let fed = self
                .transitions
                .iter()
                .any(|t| t.output_weight(place_id) > 0);
            let consumed = self
                .transitions
                .iter()
                .any(|t| t.input_weight(place_id) > 0);

            if !fed && !consumed {
                report.isolated_places.push((place_id, place.name.clone()));
            } else if !fed && place.tokens == 0 {
                report.warnings.push(format!(
                    "place `{}` has no input arcs and no initial tokens",
                    place.name
                ));
            }
        }

        for (id, transition) in self.transitions.iter_enumerated() {
            match (transition.pre().is_empty(), transition.post().is_empty()) {
                (true, true) => report
                    .isolated_transitions
                    .push((id, transition.name.clone())),
                (true, false) => report.warnings.push(format!(
                    "transition `{}` has no input places and is always enabled",
                    transition.name
                )),
                _ => {}
            }
        }

        report
    }

    pub fn log_diagnostics(&self) {
        let report = self.diagnose();
        if !report.has_issues() {
            log::info!(
                "net check passed: {} places, {} transitions",
                self.places_len(),
                self.transitions_len()
            );
            return;
        }
        for (id, name) in &report.isolated_places {
            log::warn!("isolated place [{}] {}", id.index(), name);
        }
        for (id, name) in &report.isolated_transitions {
            log::warn!("isolated transition [{}] {}", id.index(), name);
        }
        for warning in &report.warnings {
            log::warn!("{}", warning);
        }
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::empty()
    }
}

/// Unchecked serialized form of [`Net`].
#[derive(Deserialize)]
struct NetDef {
    places: Vec<Place>,
    transitions: Vec<Transition>,
    #[serde(default)]
    label_order: Option<Vec<PlaceId>>,
}

impl TryFrom<NetDef> for Net {
    type Error = NetError;

    fn try_from(def: NetDef) -> Result<Self, Self::Error> {
        let mut net = Net::empty();
        for place in def.places {
            net.add_place(place)?;
        }
        for transition in def.transitions {
            net.add_transition(transition)?;
        }
        if let Some(order) = def.label_order {
            net.set_label_order(order)?;
        }
        Ok(net)
    }
}

fn write_arc(dot: &mut String, from: &str, to: &str, weight: Weight) {
    if weight > 1 {
        let _ = writeln!(dot, "    {} -> {} [label=\"{}\"];", from, to, weight);
    } else {
        let _ = writeln!(dot, "    {} -> {};", from, to);
    }
}

fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
