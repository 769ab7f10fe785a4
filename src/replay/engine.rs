use chrono::{DateTime, Utc};

use crate::operation::Operation;
use crate::world_state::WorldState;

pub fn apply_operations(operations: &mut [Operation], world: &mut WorldState) {
    for operation in operations.iter_mut() {
        operation.redo(world);
    }
}

pub fn rewind_operations(operations: &[Operation], world: &mut WorldState) {
    for operation in operations.iter().rev() {
        operation.undo(world);
    }
}

/// Scrubbing cursor over an operation list. Operations before `cursor` have
/// been redone on the owned world, the rest have not.
#[derive(Debug)]
pub struct ReplayPlayer {
    operations: Vec<Operation>,
    world: WorldState,
    cursor: usize,
}

impl ReplayPlayer {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self::with_world(operations, WorldState::new())
    }

    pub fn with_world(operations: Vec<Operation>, world: WorldState) -> Self {
        Self {
            operations,
            world,
            cursor: 0,
        }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor >= self.operations.len()
    }

    pub fn current_time(&self) -> Option<DateTime<Utc>> {
        self.cursor
            .checked_sub(1)
            .and_then(|index| self.operations.get(index))
            .map(|operation| operation.timestamp)
    }

    pub fn step_forward(&mut self) -> Option<&Operation> {
        let operation = self.operations.get_mut(self.cursor)?;
        operation.redo(&mut self.world);
        self.cursor += 1;
        self.operations.get(self.cursor - 1)
    }

    pub fn step_backward(&mut self) -> Option<&Operation> {
        self.cursor = self.cursor.checked_sub(1)?;
        let operation = self.operations.get(self.cursor)?;
        operation.undo(&mut self.world);
        Some(operation)
    }

    pub fn seek(&mut self, target: usize) {
        let target = target.min(self.operations.len());
        if target > self.cursor {
            apply_operations(&mut self.operations[self.cursor..target], &mut self.world);
        } else if target < self.cursor {
            rewind_operations(&self.operations[target..self.cursor], &mut self.world);
        }
        self.cursor = target;
    }

    /// Applies every operation stamped at or before `timestamp` and nothing
    /// after it.
    pub fn seek_to_time(&mut self, timestamp: DateTime<Utc>) {
        let target = self
            .operations
            .partition_point(|operation| operation.timestamp <= timestamp);
        self.seek(target);
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}
