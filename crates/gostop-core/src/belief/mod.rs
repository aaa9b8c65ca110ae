//! Hidden-information handling for one observer.
//!
//! - `knowledge`: what a seat can see, and per-month hold estimates derived from it.
//! - `sampler`: determinization of the opponent hand and deck for rollouts.

mod knowledge;
mod sampler;

pub use knowledge::PublicKnowledge;
pub use sampler::{DeterminizedState, Determinizer, SamplingError, SamplingStats};
