use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{Encounter, Participant, Replay};
use crate::world_state::ActorType;

pub(crate) const REPLAY_SUMMARY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub instance_id: u32,
    pub oid: u32,
    pub actor_type: ActorType,
    pub name: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub cast_count: usize,
    #[serde(default)]
    pub has_any_actions: bool,
    #[serde(default)]
    pub has_any_statuses: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterSummary {
    pub instance_id: u32,
    pub oid: u32,
    pub zone: u16,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub participant_counts: BTreeMap<u32, usize>,
    pub action_count: usize,
    pub status_count: usize,
    pub tether_count: usize,
    pub icon_count: usize,
    pub env_control_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    pub operation_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<ParticipantSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encounters: Vec<EncounterSummary>,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl ParticipantSummary {
    fn from_participant(participant: &Participant) -> Self {
        Self {
            instance_id: participant.instance_id,
            oid: participant.oid,
            actor_type: participant.actor_type,
            name: participant.name.clone(),
            first_seen: participant.existence.start,
            last_seen: participant.existence.end,
            cast_count: participant.casts.len(),
            has_any_actions: participant.has_any_actions,
            has_any_statuses: participant.has_any_statuses,
        }
    }
}

impl EncounterSummary {
    fn from_encounter(replay: &Replay, encounter: &Encounter) -> Self {
        Self {
            instance_id: encounter.instance_id,
            oid: encounter.oid,
            zone: encounter.zone,
            started_at: encounter.time.start,
            ended_at: encounter.time.end,
            duration_seconds: encounter.time.duration_seconds(),
            participant_counts: encounter
                .participants
                .iter()
                .map(|(oid, participants)| (*oid, participants.len()))
                .collect(),
            action_count: replay.encounter_actions(encounter).count(),
            status_count: replay.encounter_statuses(encounter).count(),
            tether_count: replay.encounter_tethers(encounter).count(),
            icon_count: replay.encounter_icons(encounter).count(),
            env_control_count: replay.encounter_env_controls(encounter).count(),
        }
    }
}

impl ReplaySummary {
    pub fn from_replay(replay: &Replay) -> Self {
        let log_file = replay.path.as_deref().map(|path| {
            path.file_name()
                .map(|value| value.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string())
        });

        Self {
            schema_version: REPLAY_SUMMARY_SCHEMA_VERSION,
            log_file,
            operation_count: replay.operations.len(),
            participants: replay
                .participants
                .iter()
                .map(ParticipantSummary::from_participant)
                .collect(),
            encounters: replay
                .encounters
                .iter()
                .map(|encounter| EncounterSummary::from_encounter(replay, encounter))
                .collect(),
        }
    }
}

pub fn summary_sidecar_path(log_path: &Path) -> PathBuf {
    log_path.with_extension("replay.json")
}

pub fn read_replay_summary(log_path: &Path) -> Result<Option<ReplaySummary>, String> {
    let sidecar_path = summary_sidecar_path(log_path);
    let raw_json = match std::fs::read(&sidecar_path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(format!("{}: {error}", sidecar_path.display())),
    };
    serde_json::from_slice(&raw_json)
        .map(Some)
        .map_err(|error| format!("Invalid replay summary '{}': {error}", sidecar_path.display()))
}

pub fn write_replay_summary(log_path: &Path, summary: &ReplaySummary) -> Result<PathBuf, String> {
    let sidecar_path = summary_sidecar_path(log_path);
    let serialized = serde_json::to_vec_pretty(summary)
        .map_err(|error| format!("Failed to serialize replay summary: {error}"))?;
    std::fs::write(&sidecar_path, serialized)
        .map_err(|error| format!("Failed to write '{}': {error}", sidecar_path.display()))?;
    Ok(sidecar_path)
}
