//! Top-level module for the Markov generation system.
//!
//! This module provides a first-order transition model, including:
//! - The frequency table of observed successors (`FrequencyTable`)
//! - Weighted and best-successor sampling (`sampler`)
//! - An explicit generation state machine (`ChainWalker`)
//! - Walk configuration (`TraverseInput`)
//! - The persisted JSON table format (`codec`)

/// Per-token distribution over observed successors, plus merging.
///
/// Handles sequence ingestion, transition counting, incremental frequency
/// recomputation and model merging.
pub mod freq_table;

/// Transition sampling over a successor distribution.
///
/// Supports weighted stochastic draws tolerant of floating-point drift and
/// deterministic best-successor selection with randomized tie-break.
pub mod sampler;

/// The generation state machine.
///
/// Walks the frequency table one token at a time, restarting from a fresh
/// root when a walk absorbs early.
pub mod walker;

/// Walk parameter structure.
///
/// Stores generation parameters such as the target length, the optional
/// minimum length, the root token and the sampling mode.
pub mod traverse_input;

/// Persisted table format (save/load).
///
/// A JSON document mapping each token to its successor records; totals are
/// rebuilt from persisted counts on load.
pub mod codec;

/// Internal representation of a single token's outgoing transitions.
///
/// Tracks successor counts and frequencies together with the running
/// observation total. This module is not exposed publicly.
mod state;
