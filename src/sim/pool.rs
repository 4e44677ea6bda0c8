//! Projectile pool
//!
//! Live projectiles sit in `active` in launch order; released ones are kept on
//! a free list (up to the pool capacity) and re-armed on the next shot.

use glam::Vec2;

use super::entities::{Projectile, Shot};

#[derive(Debug, Clone)]
pub struct ProjectilePool {
    pub active: Vec<Projectile>,
    free: Vec<Projectile>,
    capacity: usize,
}

impl ProjectilePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            active: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Launch a projectile, reusing a released one when available
    pub fn acquire(&mut self, shot: &Shot, team: usize, color: &str) -> &Projectile {
        let mut projectile = self.free.pop().unwrap_or_default();
        projectile.launch(shot, team, color);
        self.active.push(projectile);
        &self.active[self.active.len() - 1]
    }

    /// Retire the active projectile at `index`
    pub fn release(&mut self, index: usize) {
        if index >= self.active.len() {
            return;
        }
        let projectile = self.active.remove(index);
        if self.free.len() < self.capacity {
            self.free.push(projectile);
        }
    }

    /// Move every projectile and retire those that left the playfield
    pub fn advance(&mut self, dt_ms: f32, bounds: Vec2) {
        let mut i = 0;
        while i < self.active.len() {
            self.active[i].advance(dt_ms);
            if self.active[i].is_out_of_bounds(bounds) {
                self.release(i);
            } else {
                i += 1;
            }
        }
    }

    pub fn clear(&mut self) {
        while !self.active.is_empty() {
            self.release(self.active.len() - 1);
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }
}
