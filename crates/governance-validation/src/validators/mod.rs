pub mod admissibility;
pub mod coherence;
pub mod domain;
pub mod effect_safety;
pub mod feasibility;
pub mod identity;
pub mod stateful;
