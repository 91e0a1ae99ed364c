//! 考试流程参考网：5 个库所、4 个迁移。
//!
//! ```text
//! Waiting + FreeExaminer --TTckt--> Preparing + FreeExaminer
//! Preparing + FreeExaminer --StEx--> InExam
//! InExam --EndEx--> Done + FreeExaminer
//! InExam --ReEx--> Preparing + FreeExaminer
//! ```
use crate::net::{Net, NetError, Place, Weight};

pub const WAITING: &str = "Waiting";
pub const FREE_EXAMINER: &str = "FreeExaminer";
pub const PREPARING: &str = "Preparing";
pub const IN_EXAM: &str = "InExam";
pub const DONE: &str = "Done";

/// Candidate draws a ticket.
pub const ADMIT: &str = "TTckt";
/// Candidate starts answering.
pub const START: &str = "StEx";
/// Exam passed.
pub const SUCCEED: &str = "EndEx";
/// Candidate sent back to prepare again.
pub const RETRY: &str = "ReEx";

pub const DEFAULT_CANDIDATES: Weight = 4;
pub const DEFAULT_EXAMINERS: Weight = 1;

/// Builds the exam net with `candidates` tokens in `Waiting` and
/// `examiners` tokens in `FreeExaminer`.
pub fn exam_net(candidates: Weight, examiners: Weight) -> Result<Net, NetError> {
    let mut net = Net::empty();
    let waiting = net.add_place(Place::with_abbrev(WAITING, "W", candidates))?;
    let free = net.add_place(Place::with_abbrev(FREE_EXAMINER, "F", examiners))?;
    let preparing = net.add_place(Place::with_abbrev(PREPARING, "Pr", 0))?;
    let in_exam = net.add_place(Place::with_abbrev(IN_EXAM, "I", 0))?;
    let done = net.add_place(Place::with_abbrev(DONE, "D", 0))?;

    net.add_named_transition(
        ADMIT,
        &[(WAITING, 1), (FREE_EXAMINER, 1)],
        &[(PREPARING, 1), (FREE_EXAMINER, 1)],
    )?;
    net.add_named_transition(START, &[(PREPARING, 1), (FREE_EXAMINER, 1)], &[(IN_EXAM, 1)])?;
    net.add_named_transition(SUCCEED, &[(IN_EXAM, 1)], &[(DONE, 1), (FREE_EXAMINER, 1)])?;
    net.add_named_transition(RETRY, &[(IN_EXAM, 1)], &[(PREPARING, 1), (FREE_EXAMINER, 1)])?;

    net.set_label_order(vec![waiting, preparing, free, in_exam, done])?;
    Ok(net)
}

/// The reference configuration: four candidates, one examiner.
pub fn reference_net() -> Result<Net, NetError> {
    exam_net(DEFAULT_CANDIDATES, DEFAULT_EXAMINERS)
}
