//! Fixed-capacity projectile instance pools.
//!
//! Stands in for the presentation layer's instanced-mesh pools: every live
//! projectile holds one slot, and a full pool rejects the shot. Hosts with a
//! real renderer plug in their own `InstancePool`.

use tracing::warn;

use citadel_core::enums::ProjectileKind;
use citadel_core::types::PoolHandle;

/// Capacity bookkeeping for one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub in_use: usize,
}

impl PoolStats {
    pub fn available(&self) -> usize {
        self.capacity - self.in_use
    }
}

pub trait InstancePool: Send {
    /// Reserve a slot for a new projectile. `None` drops the shot.
    fn acquire(&mut self, kind: ProjectileKind) -> Option<PoolHandle>;

    /// Return a slot. Unknown handles are ignored.
    fn release(&mut self, handle: PoolHandle);

    /// Release every slot (session reset).
    fn clear(&mut self);
}

/// Slot allocator with a free list.
#[derive(Debug, Clone)]
pub struct FixedPool {
    label: &'static str,
    capacity: usize,
    free: Vec<u32>,
    in_use: Vec<bool>,
    warned: bool,
}

impl FixedPool {
    pub fn new(label: &'static str, capacity: usize) -> Self {
        Self {
            label,
            capacity,
            free: (0..capacity as u32).rev().collect(),
            in_use: vec![false; capacity],
            warned: false,
        }
    }

    pub fn acquire(&mut self) -> Option<u32> {
        match self.free.pop() {
            Some(slot) => {
                self.in_use[slot as usize] = true;
                Some(slot)
            }
            None => {
                if !self.warned {
                    warn!(pool = self.label, capacity = self.capacity, "instance pool exhausted, dropping shots");
                    self.warned = true;
                }
                None
            }
        }
    }

    pub fn release(&mut self, slot: u32) {
        if let Some(used) = self.in_use.get_mut(slot as usize) {
            if *used {
                *used = false;
                self.free.push(slot);
                self.warned = false;
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.label, self.capacity);
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            in_use: self.capacity - self.free.len(),
        }
    }
}

/// Default pool pair: travelling projectiles and beams. Beam handles are
/// offset past the projectile range so one handle space covers both.
#[derive(Debug, Clone)]
pub struct ProjectilePools {
    projectiles: FixedPool,
    beams: FixedPool,
}

impl ProjectilePools {
    pub fn new(max_projectiles: usize, max_beams: usize) -> Self {
        Self {
            projectiles: FixedPool::new("projectiles", max_projectiles),
            beams: FixedPool::new("beams", max_beams),
        }
    }

    pub fn projectile_stats(&self) -> PoolStats {
        self.projectiles.stats()
    }

    pub fn beam_stats(&self) -> PoolStats {
        self.beams.stats()
    }

    fn beam_offset(&self) -> u32 {
        self.projectiles.capacity as u32
    }
}

impl InstancePool for ProjectilePools {
    fn acquire(&mut self, kind: ProjectileKind) -> Option<PoolHandle> {
        match kind {
            ProjectileKind::Beam => {
                let offset = self.beam_offset();
                self.beams.acquire().map(|slot| PoolHandle(offset + slot))
            }
            ProjectileKind::Single | ProjectileKind::Aoe => self.projectiles.acquire().map(PoolHandle),
        }
    }

    fn release(&mut self, handle: PoolHandle) {
        let offset = self.beam_offset();
        if handle.0 >= offset {
            self.beams.release(handle.0 - offset);
        } else {
            self.projectiles.release(handle.0);
        }
    }

    fn clear(&mut self) {
        self.projectiles.clear();
        self.beams.clear();
    }
}
