//! Trellis utilities: transition table, state labelling, windowing and ACS

pub mod acs;
pub mod labeler;
pub mod segment;
pub mod transition;

pub use acs::{acs_step, argmin, ViterbiDecoder};
pub use labeler::{mimo_states, mimo_states_array, siso_states, state_bits, StateLabeler};
pub use segment::{segment, segment_column, Symbol};
pub use transition::TransitionTable;
