//! Greedy style search: scoring and the option-by-option engine

mod engine;
pub mod score;

pub use engine::{Decision, GreedySearch, OptionOutcome, SearchSettings};
