//! Label Index Module
//!
//! Secondary index for label filtering: label key → label value → bucket of
//! resources carrying that pair.
//!
//! Design:
//! - LabelIndex: O(1) bucket lookup per (key, value) pair
//! - Not internally synchronized; the owning store guards it together with
//!   the identity index under one lock
//! - Unknown keys and values resolve to an explicit empty result

mod label_index;

pub use label_index::LabelIndex;
