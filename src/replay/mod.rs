mod builder;
mod engine;
mod summary;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use glam::{Vec3, Vec4};

use crate::operation::Operation;
use crate::world_state::{ActionId, ActorType, NUM_TARGET_EFFECTS};

pub use builder::{build_replay, ReplayBuilder};
pub use engine::{apply_operations, rewind_operations, ReplayPlayer};
pub use summary::{
    read_replay_summary, summary_sidecar_path, write_replay_summary, EncounterSummary,
    ParticipantSummary, ReplaySummary,
};

pub type ParticipantId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub(crate) fn starting_at(start: DateTime<Utc>) -> Self {
        Self { start, end: start }
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    pub id: ActionId,
    pub expected_cast_time: f32,
    pub time: TimeRange,
    pub target: Option<ParticipantId>,
    pub location: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionTarget {
    pub target: Option<ParticipantId>,
    pub pos_rot: Vec4,
    pub effects: [u64; NUM_TARGET_EFFECTS],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub id: ActionId,
    pub timestamp: DateTime<Utc>,
    pub source: Option<ParticipantId>,
    pub source_pos_rot: Vec4,
    pub main_target: Option<ParticipantId>,
    pub main_target_pos_rot: Vec4,
    pub targets: Vec<ActionTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub instance_id: u32,
    pub oid: u32,
    pub actor_type: ActorType,
    pub name: String,
    pub existence: TimeRange,
    pub targetable: Vec<TimeRange>,
    pub casts: Vec<Cast>,
    pub has_any_actions: bool,
    pub has_any_statuses: bool,
    pub is_target_of_any_actions: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub id: u32,
    pub target: Option<ParticipantId>,
    pub source: Option<ParticipantId>,
    pub initial_duration: f32,
    pub time: TimeRange,
    pub starting_extra: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tether {
    pub id: u32,
    pub source: Option<ParticipantId>,
    pub target: Option<ParticipantId>,
    pub time: TimeRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    pub id: u32,
    pub target: Option<ParticipantId>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvControl {
    pub feature: u32,
    pub index: u8,
    pub state: u32,
    pub timestamp: DateTime<Utc>,
}

/// One combat session. The `first_*` fields are offsets into the matching
/// chronological arrays of the owning [`Replay`].
#[derive(Debug, Clone, PartialEq)]
pub struct Encounter {
    pub instance_id: u32,
    pub oid: u32,
    pub time: TimeRange,
    pub zone: u16,
    pub participants: BTreeMap<u32, Vec<ParticipantId>>,
    pub first_action: usize,
    pub first_status: usize,
    pub first_tether: usize,
    pub first_icon: usize,
    pub first_env_control: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Replay {
    pub path: Option<PathBuf>,
    pub operations: Vec<Operation>,
    pub participants: Vec<Participant>,
    pub actions: Vec<Action>,
    pub statuses: Vec<Status>,
    pub tethers: Vec<Tether>,
    pub icons: Vec<Icon>,
    pub env_controls: Vec<EnvControl>,
    pub encounters: Vec<Encounter>,
}

impl Replay {
    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn participants_by_instance(&self, instance_id: u32) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(move |participant| participant.instance_id == instance_id)
    }

    pub fn encounter_actions<'a>(
        &'a self,
        encounter: &'a Encounter,
    ) -> impl Iterator<Item = &'a Action> + 'a {
        self.actions
            .iter()
            .skip(encounter.first_action)
            .take_while(move |action| action.timestamp <= encounter.time.end)
    }

    pub fn encounter_statuses<'a>(
        &'a self,
        encounter: &'a Encounter,
    ) -> impl Iterator<Item = &'a Status> + 'a {
        self.statuses
            .iter()
            .skip(encounter.first_status)
            .take_while(move |status| status.time.start <= encounter.time.end)
    }

    pub fn encounter_tethers<'a>(
        &'a self,
        encounter: &'a Encounter,
    ) -> impl Iterator<Item = &'a Tether> + 'a {
        self.tethers
            .iter()
            .skip(encounter.first_tether)
            .take_while(move |tether| tether.time.start <= encounter.time.end)
    }

    pub fn encounter_icons<'a>(
        &'a self,
        encounter: &'a Encounter,
    ) -> impl Iterator<Item = &'a Icon> + 'a {
        self.icons
            .iter()
            .skip(encounter.first_icon)
            .take_while(move |icon| icon.timestamp <= encounter.time.end)
    }

    pub fn encounter_env_controls<'a>(
        &'a self,
        encounter: &'a Encounter,
    ) -> impl Iterator<Item = &'a EnvControl> + 'a {
        self.env_controls
            .iter()
            .skip(encounter.first_env_control)
            .take_while(move |env_control| env_control.timestamp <= encounter.time.end)
    }
}
