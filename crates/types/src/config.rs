//! Chain-wide configuration fixed at genesis.

use serde::{Deserialize, Serialize};

/// Default number of tiers in the hierarchy (prime, region, zone).
pub const DEFAULT_HIERARCHY_DEPTH: usize = 3;

/// Default tier this node operates in.
pub const DEFAULT_NETWORK_CONTEXT: usize = 2;

/// Configuration of the chain hierarchy.
///
/// All values are fixed at genesis; changing them underneath a live store
/// invalidates every persisted header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Number of tiers in the hierarchy. Always at least 1.
    pub depth: usize,
    /// The tier whose scalars (number, parent hash, ...) drive this engine.
    pub network_context: usize,
    /// Highest valid region byte of a location, inclusive.
    pub region_max: u8,
    /// Highest valid zone byte of a location, inclusive.
    pub zone_max: u8,
    /// Maximum number of fork tips tracked before the oldest branch is
    /// trimmed away.
    pub max_heads_queue: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_HIERARCHY_DEPTH,
            network_context: DEFAULT_NETWORK_CONTEXT,
            region_max: 3,
            zone_max: 3,
            max_heads_queue: 10,
        }
    }
}

impl ChainConfig {
    /// Panics when the configuration is internally inconsistent. Called once
    /// at engine construction.
    pub fn assert_valid(&self) {
        assert!(self.depth >= 1, "hierarchy depth must be positive");
        assert!(
            self.network_context < self.depth,
            "network context {} outside hierarchy of depth {}",
            self.network_context,
            self.depth
        );
        assert!(self.max_heads_queue >= 1, "heads queue limit must be positive");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ChainConfig::default().assert_valid();
    }

    #[test]
    #[should_panic(expected = "network context")]
    fn context_outside_depth_panics() {
        ChainConfig { depth: 2, network_context: 2, ..Default::default() }.assert_valid();
    }
}
