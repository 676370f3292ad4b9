//! Almanac: which enemy kinds the player has encountered.

use std::collections::BTreeSet;

use citadel_core::enums::EnemyKind;

/// Survives session restarts within one engine; persisting it is up to the host.
#[derive(Debug, Clone, Default)]
pub struct Almanac {
    discovered: BTreeSet<EnemyKind>,
}

impl Almanac {
    /// Record a sighting. Returns true the first time a kind is seen.
    pub fn discover(&mut self, kind: EnemyKind) -> bool {
        self.discovered.insert(kind)
    }

    pub fn is_discovered(&self, kind: EnemyKind) -> bool {
        self.discovered.contains(&kind)
    }

    pub fn discovered(&self) -> Vec<EnemyKind> {
        self.discovered.iter().copied().collect()
    }
}
