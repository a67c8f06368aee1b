// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! FRR configuration handling: the canonical in-memory model, the frr.conf
//! renderer, the reload-driven applier and the runtime-state fetcher.

#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::struct_excessive_bools
)]

mod apply;
mod community;
mod config;
mod reload;
mod renderer;
mod state;

pub use apply::{ApplierWorker, ApplyError, ApplyOutcome, ConfigApplier, FrrPaths};
pub use community::{Community, CommunityError};
pub use config::{
    AllowedIn, AllowedOut, BfdProfileConfig, Config, IncomingFilter, NeighborConfig,
    OutgoingFilter, RouterConfig, neighbor_name,
};
pub use reload::ReloadError;
pub use renderer::render_config;
pub use state::{BfdPeer, FetchError, Neighbor, StateReader, VtyshReader, rename_default_vrf};
