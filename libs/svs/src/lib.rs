//! # Hourglass SVS - State Vector Sync
//!
//! ## Purpose
//!
//! Timer-driven gossip for distributed sequence-number convergence with
//! suppression. An [`SvsInst`] joins a group at a base prefix, announces
//! its state vector in signed sync Interests, folds received vectors into
//! its own, and tells the application when remote publications are missing
//! locally. Publishing is nothing more than advancing this node's sequence
//! with [`SvsInst::new_data`] and producing the data under the returned
//! number.

pub mod sync;
pub mod tlv;

pub use sync::{OnMissingData, SvsConfig, SvsError, SvsInst};
pub use tlv::{MappingData, MappingEntry, StateVec, StateVecEntry};
