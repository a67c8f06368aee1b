// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Deterministic rendering of the canonical model into frr.conf text.
//! Identical canonical configs render to byte-identical output.

mod bfd;
pub mod builder;
mod neighbor;
mod router;

pub use builder::{ConfigBuilder, MARKER, Render};

use crate::config::Config;

#[must_use]
pub fn render_config(config: &Config) -> String {
    config.render(&()).to_string()
}
