use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::analysis::{ReachabilityMatrix, ReachabilitySet, ReachabilityTree};
use crate::net::Net;

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub transition: String,
    pub marking: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trajectory {
    pub seed: u64,
    pub initial: String,
    pub steps: Vec<StepRecord>,
    pub final_marking: String,
    /// False when the step cap stopped the run.
    pub terminated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetSummary {
    pub markings: Vec<String>,
    pub truncated: bool,
}

impl SetSummary {
    pub fn new(set: &ReachabilitySet, net: &Net) -> Self {
        Self {
            markings: set.labels(net),
            truncated: set.truncated(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeSummary {
    pub max_depth: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    /// Node paths in pre-order.
    pub paths: Vec<String>,
}

impl TreeSummary {
    pub fn new(tree: &ReachabilityTree) -> Self {
        Self {
            max_depth: tree.max_depth,
            node_count: tree.node_count(),
            leaf_count: tree.leaves(),
            paths: tree.nodes().map(|node| node.path.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AnalysisReport {
    pub net: String,                            // 网名称
    pub trajectory: Option<Trajectory>,         // 仿真轨迹
    pub reachability_set: Option<SetSummary>,   // 可达集
    pub tree: Option<TreeSummary>,              // 可达树统计
    pub matrix: Option<ReachabilityMatrix>,     // 可达矩阵
    pub dead_markings: Vec<usize>,              // 死标识下标
    pub error: Option<String>,                  // 错误信息
}

impl AnalysisReport {
    pub fn new(net: impl Into<String>) -> Self {
        Self {
            net: net.into(),
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// 将报告保存到文件中
    pub fn save_to_file(&self, file_path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut file = std::fs::File::create(file_path)?;
        writeln!(file, "{}", self)
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Petri net: {}", self.net)?;

        if let Some(trajectory) = &self.trajectory {
            writeln!(f, "\nSimulation (seed {})", trajectory.seed)?;
            writeln!(f, "Initial: {}", trajectory.initial)?;
            for step in &trajectory.steps {
                writeln!(
                    f,
                    "Step {}: fire {} -> {}",
                    step.step, step.transition, step.marking
                )?;
            }
            if trajectory.terminated {
                writeln!(f, "No enabled transitions. Final: {}", trajectory.final_marking)?;
            } else {
                writeln!(f, "Step limit reached. Current: {}", trajectory.final_marking)?;
            }
        }

        if let Some(set) = &self.reachability_set {
            writeln!(f, "\nReachability set ({} markings)", set.markings.len())?;
            for (idx, label) in set.markings.iter().enumerate() {
                writeln!(f, "{:>3}: {}", idx, label)?;
            }
            if set.truncated {
                writeln!(f, "(truncated by state limit)")?;
            }
        }

        if let Some(tree) = &self.tree {
            writeln!(
                f,
                "\nReachability tree (depth {}): {} nodes, {} leaves",
                tree.max_depth, tree.node_count, tree.leaf_count
            )?;
        }

        if let Some(matrix) = &self.matrix {
            writeln!(f, "\nReachability matrix")?;
            write!(f, "{}", matrix)?;
            if !self.dead_markings.is_empty() {
                writeln!(f, "Dead markings: {:?}", self.dead_markings)?;
            }
        }

        if let Some(error) = &self.error {
            writeln!(f, "\nError: {}", error)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::reference_net;

    fn full_report() -> AnalysisReport {
        let net = reference_net().unwrap();
        let set = ReachabilitySet::explore(&net, &net.initial_marking());
        let tree = ReachabilityTree::build(&net, &net.initial_marking(), 2);
        let matrix = ReachabilityMatrix::build(&set, &net).unwrap();

        let mut report = AnalysisReport::new("exam");
        report.trajectory = Some(Trajectory {
            seed: 1,
            initial: net.label(&net.initial_marking()),
            steps: vec![StepRecord {
                step: 1,
                transition: "TTckt".to_owned(),
                marking: "W:3, Pr:1, F:1, I:0, D:0".to_owned(),
            }],
            final_marking: "W:3, Pr:1, F:1, I:0, D:0".to_owned(),
            terminated: false,
        });
        report.reachability_set = Some(SetSummary::new(&set, &net));
        report.tree = Some(TreeSummary::new(&tree));
        report.dead_markings = matrix.dead_markings();
        report.matrix = Some(matrix);
        report
    }

    #[test]
    fn text_report_sections() {
        let text = full_report().to_string();
        assert!(text.starts_with("Petri net: exam\n"));
        assert!(text.contains("Step 1: fire TTckt -> W:3, Pr:1, F:1, I:0, D:0"));
        assert!(text.contains("Step limit reached."));
        assert!(text.contains("Reachability set (25 markings)"));
        assert!(text.contains("  0: W:4, Pr:0, F:1, I:0, D:0"));
        assert!(text.contains("Reachability tree (depth 2): 4 nodes, 2 leaves"));
        assert!(text.contains("Dead markings: [24]"));
    }

    #[test]
    fn json_report_fields() {
        let json = full_report().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["net"], "exam");
        assert_eq!(value["reachability_set"]["markings"].as_array().unwrap().len(), 25);
        assert_eq!(value["tree"]["node_count"], 4);
        assert_eq!(value["tree"]["paths"][0], "root");
        assert_eq!(value["matrix"]["rows"][0][0], 1);
        assert!(value["matrix"]["rows"][0][1].is_null());
        assert_eq!(value["dead_markings"][0], 24);
    }

    #[test]
    fn saved_report_matches_display() {
        let report = full_report();
        let path = std::env::temp_dir().join(format!("petri-exam-report-{}.txt", std::process::id()));
        report.save_to_file(&path).unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(saved, format!("{}\n", report));
    }

    #[test]
    fn empty_report_only_has_header() {
        let report = AnalysisReport::new("exam");
        assert_eq!(report.to_string(), "Petri net: exam\n");
    }
}
