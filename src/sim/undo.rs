//! Undo history
//!
//! The world keeps a snapshot of its last committed state. Committing while
//! everything is at rest pushes that snapshot onto the history when the
//! world has changed since; reverting pops the newest frame back into the
//! world. Snapshots only keep what a player could tell apart: where players
//! stand and face and whether they carry a bow, and the full state of
//! tiles, blocks and interactives. Arrows in flight are not recorded.

use std::collections::VecDeque;

use glam::Vec2;

use super::light::update_lighting;
use super::player::Player;
use super::world::{MapData, World};

#[derive(Debug, Clone, Default)]
pub struct UndoHistory {
    snapshot: Option<MapData>,
    frames: VecDeque<MapData>,
}

impl UndoHistory {
    /// Drop every frame and start over from `snapshot`
    pub fn reset(&mut self, snapshot: MapData) {
        self.frames.clear();
        self.snapshot = Some(snapshot);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn push(&mut self, frame: MapData, limit: usize) {
        if limit == 0 {
            return;
        }
        while self.frames.len() >= limit {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }
}

impl World {
    /// Current state as an undo frame
    pub fn snapshot(&self) -> MapData {
        let mut blocks = self.blocks.clone();
        for block in &mut blocks {
            block.clear_momentum();
        }
        MapData {
            tilemap: self.tilemap.clone(),
            blocks,
            interactives: self.interactives.clone(),
            players: self
                .players
                .iter()
                .map(|p| Player {
                    pos: p.pos,
                    face: p.face,
                    has_bow: p.has_bow,
                    ..Default::default()
                })
                .collect(),
        }
    }

    /// Record the last snapshot if anything changed since
    ///
    /// Nothing is recorded while a block is still moving. Returns whether a
    /// frame was added.
    pub fn undo_commit(&mut self) -> bool {
        if self.blocks.iter().any(|b| b.motion.vel != Vec2::ZERO) {
            return false;
        }
        let current = self.snapshot();
        let Some(previous) = self.undo.snapshot.replace(current.clone()) else {
            return false;
        };
        if previous == current {
            return false;
        }
        self.undo.push(previous, self.config.undo_history_frames);
        log::debug!("Undo frame recorded, {} in history", self.undo.len());
        true
    }

    /// Roll the world back one frame; false when there is nothing to undo
    pub fn undo_revert(&mut self) -> bool {
        self.undo_commit();
        let Some(frame) = self.undo.frames.pop_back() else {
            log::debug!("Nothing to undo");
            return false;
        };
        self.tilemap = frame.tilemap.clone();
        self.blocks = frame.blocks.clone();
        self.interactives = frame.interactives.clone();
        self.players = frame.players.clone();
        self.undo.snapshot = Some(frame);
        self.rebuild_indices();
        update_lighting(self);
        log::info!("Undo, {} frames left", self.undo.len());
        true
    }
}
