//! # Petri 网核心定义（Place/Transition Net）
//!
//! 设库所集合 `P` 与迁移集合 `T`。每个迁移 `t` 带有前集 `Pre(t)` 与后集
//! `Post(t)`（库所到正整数权重的映射）。对任意标识 `M ∈ ℕ^{|P|}`：
//!
//! * 迁移 `t` **可激发** 当且仅当 `∀p ∈ Pre(t): M[p] ≥ Pre(t)[p]`；
//! * 迁移 **发射** 后得到新标识 `M' = M - Pre(t) + Post(t)`，原标识不变。
//!
//! 弧在加入网时即校验（未知库所、零权重都会在构造期报错），因此经由
//! [`Net`] 发射永远不会访问不存在的库所。
//!
//! ## 示例
//!
//! ```rust
//! use petri_exam::net::*;
//!
//! let mut net = Net::empty();
//! let p0 = net.add_place(Place::new("p0", 1)).unwrap();
//! let p1 = net.add_place(Place::new("p1", 0)).unwrap();
//! let t0 = net.add_transition(Transition::new("t0", [(p0, 1)], [(p1, 1)])).unwrap();
//!
//! let marking = net.initial_marking();
//! assert_eq!(net.enabled_transitions(&marking), vec![t0]);
//! let next = net.fire_transition(&marking, t0).unwrap();
//! assert_eq!(next.tokens(p0), 0);
//! assert_eq!(next.tokens(p1), 1);
//! ```

pub mod core;
pub mod ids;
pub mod index_vec;
pub mod structure;

pub use self::core::{DiagnosticReport, FireError, Net, NetError};
pub use ids::{PlaceId, TransitionId};
pub use index_vec::{Idx, IndexVec};
pub use structure::{ArcRow, Marking, Place, Transition, Weight};
