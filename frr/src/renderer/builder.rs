// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Config renderer: line-oriented builder

use std::fmt::Display;
use std::ops::AddAssign;

/// Section separator in the rendered file.
pub const MARKER: &str = "!";

/// Something that can be rendered as FRR configuration text.
pub trait Render {
    type Context;
    type Output;
    fn render(&self, ctx: &Self::Context) -> Self::Output;
}

/// Accumulates rendered configuration lines.
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    lines: Vec<String>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

impl AddAssign<&str> for ConfigBuilder {
    fn add_assign(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

impl AddAssign<String> for ConfigBuilder {
    fn add_assign(&mut self, line: String) {
        self.lines.push(line);
    }
}

impl AddAssign<ConfigBuilder> for ConfigBuilder {
    fn add_assign(&mut self, other: ConfigBuilder) {
        self.lines.extend(other.lines);
    }
}

impl Display for ConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_lines_in_order() {
        let mut cfg = ConfigBuilder::new();
        cfg += MARKER;
        cfg += "router bgp 65000";
        cfg += format!(" neighbor {} remote-as 65001", "192.0.2.1");
        let mut outer = ConfigBuilder::new();
        outer += cfg;
        outer += "exit";
        assert_eq!(
            outer.to_string(),
            "!\nrouter bgp 65000\n neighbor 192.0.2.1 remote-as 65001\nexit\n"
        );
    }
}
