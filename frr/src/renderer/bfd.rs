// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Config renderer: BFD profiles

use crate::config::BfdProfileConfig;
use crate::renderer::builder::{ConfigBuilder, MARKER, Render};

impl Render for BfdProfileConfig {
    type Context = ();
    type Output = ConfigBuilder;

    fn render(&self, (): &Self::Context) -> Self::Output {
        let mut cfg = ConfigBuilder::new();

        cfg += format!(" profile {}", self.name);
        if let Some(v) = self.receive_interval {
            cfg += format!("  receive-interval {v}");
        }
        if let Some(v) = self.transmit_interval {
            cfg += format!("  transmit-interval {v}");
        }
        if let Some(v) = self.detect_multiplier {
            cfg += format!("  detect-multiplier {v}");
        }
        if self.echo_mode {
            cfg += "  echo-mode";
        }
        if let Some(v) = self.echo_interval {
            cfg += format!("  echo-interval {v}");
        }
        if self.passive_mode {
            cfg += "  passive-mode";
        }
        if let Some(v) = self.minimum_ttl {
            cfg += format!("  minimum-ttl {v}");
        }

        cfg
    }
}

impl Render for Vec<BfdProfileConfig> {
    type Context = ();
    type Output = ConfigBuilder;

    fn render(&self, (): &Self::Context) -> Self::Output {
        let mut cfg = ConfigBuilder::new();

        /* don't render an empty bfd section */
        if self.is_empty() {
            return cfg;
        }

        cfg += MARKER;
        cfg += "bfd";

        for p in self {
            cfg += p.render(&());
        }

        cfg += "exit";
        cfg
    }
}
