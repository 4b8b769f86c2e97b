//! purefn_transformers: The guard injection transform.
//!
//! Rewrites every loop body and every function body so that a bounded
//! iteration check runs before any attacker logic in that body. The top-level
//! function's body declares and initializes the counter at entry, so each
//! external invocation starts from zero; every nested construct reaches the
//! same counter by lexical closure, and the ceiling bounds the *sum* of all
//! iterations and calls within one invocation.
//!
//! The transform is pure: it produces new arena-allocated nodes and reuses
//! unchanged subtrees by reference. It runs only on validated trees.

mod factory;
mod guard;

pub use factory::NodeFactory;
pub use guard::{GuardInjector, CHECK_NAME, COUNTER_NAME, ITERATION_LIMIT, LIMIT_BINDING};
