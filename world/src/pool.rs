//! Pre-warmed ball pool backing the active trial set.

use std::collections::VecDeque;

use glam::Vec3;
use sorting_board_core::{BallColor, BallId, InteractionState, TrialRecord};

/// Pooled ball entity. A slot is active while it carries a trial record.
#[derive(Clone, Debug)]
pub(crate) struct BallEntity {
    /// Identifier of the pool slot.
    pub(crate) id: BallId,
    /// Interaction state of the ball.
    pub(crate) state: InteractionState,
    /// Board position of the ball.
    pub(crate) position: Vec3,
    /// Color of the ball.
    pub(crate) color: BallColor,
    /// Whether the ball was released and awaits finalization.
    pub(crate) release_pending: bool,
    /// Trial attached to the ball while it is active.
    pub(crate) record: Option<TrialRecord>,
}

impl BallEntity {
    fn dormant(id: BallId) -> Self {
        Self {
            id,
            state: InteractionState::Spawning,
            position: Vec3::ZERO,
            color: BallColor::Red,
            release_pending: false,
            record: None,
        }
    }
}

/// Fixed-capacity pool. Acquiring a slot never allocates.
#[derive(Debug)]
pub(crate) struct BallPool {
    slots: Vec<BallEntity>,
    free: VecDeque<BallId>,
    active: Vec<BallId>,
}

impl BallPool {
    /// Allocates every slot up front.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let slots: Vec<BallEntity> = (0..capacity)
            .map(|index| BallEntity::dormant(BallId::new(index as u32)))
            .collect();
        let free = slots.iter().map(|slot| slot.id).collect();
        Self {
            slots,
            free,
            active: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn available(&self) -> usize {
        self.free.len()
    }

    /// Active balls in spawn order.
    pub(crate) fn active_ids(&self) -> &[BallId] {
        &self.active
    }

    /// Activates a free slot, or returns `None` when the pool is exhausted.
    pub(crate) fn acquire(
        &mut self,
        record: TrialRecord,
        color: BallColor,
        position: Vec3,
    ) -> Option<BallId> {
        let id = self.free.pop_front()?;
        let slot = self.slots.get_mut(id.get() as usize)?;
        slot.state = InteractionState::Spawning;
        slot.position = position;
        slot.color = color;
        slot.release_pending = false;
        slot.record = Some(record);
        self.active.push(id);
        Some(id)
    }

    /// Deactivates a slot. Releasing an inactive slot is a no-op returning `false`.
    pub(crate) fn release(&mut self, id: BallId) -> bool {
        let Some(slot) = self.slots.get_mut(id.get() as usize) else {
            return false;
        };
        if slot.record.is_none() {
            return false;
        }
        *slot = BallEntity::dormant(id);
        self.active.retain(|active| *active != id);
        self.free.push_back(id);
        true
    }

    /// Active ball stored in the slot, if any.
    pub(crate) fn get(&self, id: BallId) -> Option<&BallEntity> {
        self.slots
            .get(id.get() as usize)
            .filter(|slot| slot.record.is_some())
    }

    pub(crate) fn get_mut(&mut self, id: BallId) -> Option<&mut BallEntity> {
        self.slots
            .get_mut(id.get() as usize)
            .filter(|slot| slot.record.is_some())
    }

    /// Active balls in spawn order.
    pub(crate) fn iter_active(&self) -> impl Iterator<Item = &BallEntity> + '_ {
        self.active
            .iter()
            .filter_map(|id| self.slots.get(id.get() as usize))
    }
}
