//! P/T 网静态结构元素：库所、迁移与标识。
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::core::FireError;
use crate::net::ids::PlaceId;
use crate::net::index_vec::IndexVec;

pub type Weight = u64;

/// Weighted arcs of one transition side, keyed by place.
pub type ArcRow = SmallVec<[(PlaceId, Weight); 4]>;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Debug)]
pub struct Place {
    pub name: String,
    /// Short form used in marking labels, e.g. `W` for `Waiting`.
    pub abbrev: String,
    /// Initial token count.
    pub tokens: Weight,
}

impl Place {
    pub fn new(name: impl Into<String>, tokens: Weight) -> Self {
        let name = name.into();
        Self {
            abbrev: name.clone(),
            name,
            tokens,
        }
    }

    pub fn with_abbrev(name: impl Into<String>, abbrev: impl Into<String>, tokens: Weight) -> Self {
        Self {
            name: name.into(),
            abbrev: abbrev.into(),
            tokens,
        }
    }
}

/// A named firing rule with a precondition and a postcondition multiset.
///
/// Places absent from `pre` are unconstrained; places absent from both sides
/// are never touched by [`Transition::fire`].
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Transition {
    pub name: String,
    pre: ArcRow,
    post: ArcRow,
}

impl Transition {
    pub fn new(
        name: impl Into<String>,
        pre: impl IntoIterator<Item = (PlaceId, Weight)>,
        post: impl IntoIterator<Item = (PlaceId, Weight)>,
    ) -> Self {
        Self {
            name: name.into(),
            pre: pre.into_iter().collect(),
            post: post.into_iter().collect(),
        }
    }

    pub fn pre(&self) -> &[(PlaceId, Weight)] {
        &self.pre
    }

    pub fn post(&self) -> &[(PlaceId, Weight)] {
        &self.post
    }

    pub fn input_weight(&self, place: PlaceId) -> Weight {
        sum_weights(&self.pre, place)
    }

    pub fn output_weight(&self, place: PlaceId) -> Weight {
        sum_weights(&self.post, place)
    }

    pub fn touches(&self, place: PlaceId) -> bool {
        self.pre.iter().chain(self.post.iter()).any(|(p, _)| *p == place)
    }

    /// `M[p] >= Pre[p]` for every input place.
    pub fn enabled(&self, marking: &Marking) -> bool {
        self.pre
            .iter()
            .all(|&(place, _)| marking.get(place).unwrap_or(0) >= self.input_weight(place))
    }

    /// Returns `M - Pre + Post`; the argument is left untouched.
    pub fn fire(&self, marking: &Marking) -> Result<Marking, FireError> {
        if !self.enabled(marking) {
            return Err(FireError::Disabled(self.name.clone()));
        }

        let mut next = marking.clone();
        for &(place, weight) in self.pre.iter() {
            let slot = self.slot(&mut next, place)?;
            *slot -= weight;
        }
        for &(place, weight) in self.post.iter() {
            let slot = self.slot(&mut next, place)?;
            *slot = slot.checked_add(weight).ok_or(FireError::Overflow(place))?;
        }
        Ok(next)
    }
}

impl Transition {
    fn slot<'m>(&self, marking: &'m mut Marking, place: PlaceId) -> Result<&'m mut Weight, FireError> {
        marking.0.get_mut(place).ok_or_else(|| FireError::UnknownPlace {
            transition: self.name.clone(),
            place,
        })
    }
}

fn sum_weights(row: &[(PlaceId, Weight)], place: PlaceId) -> Weight {
    row.iter()
        .filter(|(p, _)| *p == place)
        .map(|(_, weight)| *weight)
        .sum()
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("name", &self.name)
            .field("pre", &self.pre)
            .field("post", &self.post)
            .finish()
    }
}

/// Token count for every place of a net, in place declaration order.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Marking(pub IndexVec<PlaceId, Weight>);

impl Marking {
    pub fn new(initial: IndexVec<PlaceId, Weight>) -> Self {
        Self(initial)
    }

    pub fn from_tokens(tokens: impl IntoIterator<Item = Weight>) -> Self {
        Self(tokens.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, &Weight)> {
        self.0.iter_enumerated()
    }

    pub fn get(&self, place: PlaceId) -> Option<Weight> {
        self.0.get(place).copied()
    }

    pub fn tokens(&self, place: PlaceId) -> Weight {
        self.0[place]
    }

    pub fn tokens_mut(&mut self, place: PlaceId) -> &mut Weight {
        &mut self.0[place]
    }

    pub fn total(&self) -> Weight {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[Weight] {
        self.0.as_slice()
    }
}

impl Hash for Marking {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_slice().hash(state);
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter() {
            map.entry(&place, tokens);
        }
        map.finish()
    }
}
