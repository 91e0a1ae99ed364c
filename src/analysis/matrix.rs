//! 可达矩阵：(可达集下标, 迁移) -> 发射结果在可达集中的下标。
use std::fmt;

use serde::Serialize;
use smallvec::SmallVec;

use crate::analysis::AnalysisError;
use crate::analysis::reachability::ReachabilitySet;
use crate::net::{Idx, Net, TransitionId};

type MatrixRow = SmallVec<[Option<usize>; 4]>;

/// Derived, read-only view over a [`ReachabilitySet`]: `None` marks a
/// transition that is disabled at that marking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReachabilityMatrix {
    transitions: Vec<String>,
    labels: Vec<String>,
    rows: Vec<MatrixRow>,
}

impl ReachabilityMatrix {
    pub fn build(set: &ReachabilitySet, net: &Net) -> Result<Self, AnalysisError> {
        let mut rows = Vec::with_capacity(set.len());
        for (source, marking) in set.iter().enumerate() {
            let mut row = MatrixRow::with_capacity(net.transitions_len());
            for (id, transition) in net.transitions().iter_enumerated() {
                if !transition.enabled(marking) {
                    row.push(None);
                    continue;
                }
                let next = transition.fire(marking)?;
                let target = set
                    .index_of(&next)
                    .ok_or_else(|| AnalysisError::MissingMarking {
                        from_index: source,
                        transition: transition.name.clone(),
                        label: net.label(&next),
                    })?;
                log::trace!("matrix[{}][{:?}] = {}", source, id, target);
                row.push(Some(target));
            }
            rows.push(row);
        }

        Ok(Self {
            transitions: net.transitions().iter().map(|t| t.name.clone()).collect(),
            labels: set.labels(net),
            rows,
        })
    }

    pub fn get(&self, marking: usize, transition: TransitionId) -> Option<usize> {
        self.rows
            .get(marking)
            .and_then(|row| row.get(transition.index()).copied().flatten())
    }

    pub fn row(&self, marking: usize) -> Option<&[Option<usize>]> {
        self.rows.get(marking).map(|row| row.as_slice())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn transitions(&self) -> &[String] {
        &self.transitions
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Markings where no transition is enabled.
    pub fn dead_markings(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(Option::is_none))
            .map(|(idx, _)| idx)
            .collect()
    }
}

impl fmt::Display for ReachabilityMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<35}", "Idx | Marking")?;
        for name in &self.transitions {
            write!(f, "| {:^12} ", name)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", "-".repeat(35 + self.transitions.len() * 14))?;

        for (idx, (label, row)) in self.labels.iter().zip(&self.rows).enumerate() {
            write!(f, "{:>3} | {:<30}", idx, label)?;
            for cell in row {
                match cell {
                    Some(target) => write!(f, "| {:^12} ", target)?,
                    None => write!(f, "| {:^12} ", "-")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::reachability::ExploreConfig;
    use crate::exam::{self, reference_net};

    fn reference_matrix() -> (Net, ReachabilitySet, ReachabilityMatrix) {
        let net = reference_net().unwrap();
        let set = ReachabilitySet::explore(&net, &net.initial_marking());
        let matrix = ReachabilityMatrix::build(&set, &net).unwrap();
        (net, set, matrix)
    }

    #[test]
    fn rows_match_bfs_indices() {
        let (net, _, matrix) = reference_matrix();
        let admit = net.require_transition(exam::ADMIT).unwrap();
        let start = net.require_transition(exam::START).unwrap();

        assert_eq!(matrix.len(), 25);
        assert_eq!(matrix.row(0).unwrap(), &[Some(1), None, None, None]);
        assert_eq!(matrix.row(1).unwrap(), &[Some(2), Some(3), None, None]);
        assert_eq!(matrix.row(3).unwrap(), &[None, None, Some(6), Some(1)]);
        assert_eq!(matrix.row(23).unwrap(), &[None, None, Some(24), Some(22)]);
        assert_eq!(matrix.get(7, start), Some(10));
        assert_eq!(matrix.get(7, admit), None);
    }

    #[test]
    fn every_cell_agrees_with_firing() {
        let (net, set, matrix) = reference_matrix();
        for (i, marking) in set.iter().enumerate() {
            for (t, transition) in net.transitions().iter_enumerated() {
                let expected = transition
                    .fire(marking)
                    .ok()
                    .and_then(|next| set.index_of(&next));
                assert_eq!(matrix.get(i, t), expected);
            }
        }
    }

    #[test]
    fn only_the_final_marking_is_dead() {
        let (_, _, matrix) = reference_matrix();
        assert_eq!(matrix.dead_markings(), vec![24]);
        assert_eq!(matrix.labels()[24], "W:0, Pr:0, F:1, I:0, D:4");
    }

    #[test]
    fn truncated_set_reports_missing_marking() {
        let net = reference_net().unwrap();
        let set = ReachabilitySet::with_config(
            &net,
            &net.initial_marking(),
            &ExploreConfig {
                state_limit: Some(2),
            },
        );
        let err = ReachabilityMatrix::build(&set, &net).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingMarking { from_index: 1, .. }));
    }

    #[test]
    fn table_layout() {
        let (_, _, matrix) = reference_matrix();
        let table = matrix.to_string();
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines.len(), 2 + 25);
        assert!(lines[0].starts_with("Idx | Marking"));
        assert!(lines[0].contains("TTckt") && lines[0].contains("ReEx"));
        assert_eq!(lines[1], "-".repeat(35 + 4 * 14));
        assert!(lines[2].starts_with("  0 | W:4, Pr:0, F:1, I:0, D:0"));
        assert!(lines[2].contains("|      -      "));
    }
}
