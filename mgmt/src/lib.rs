// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The node agent's controllers. The configuration controller turns the
//! applicable routing intent into one canonical FRR configuration and
//! applies it; the session-state controller publishes FRR's observed
//! per-(peer, VRF) session state back to the cluster store.

#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

mod api_to_config;
mod config_controller;
mod events;
mod node_filter;
mod session_state;

pub use api_to_config::{ConversionError, api_to_frr};
pub use config_controller::{ConfigController, ConfigControllerParams, ControllerError};
pub use node_filter::{SelectorError, matches_node};
pub use session_state::{
    ReconcileError, SessionStateController, SessionStateParams, decode_peer, encode_peer,
};
