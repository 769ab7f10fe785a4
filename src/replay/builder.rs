use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use glam::Vec4;

use super::{
    Action, ActionTarget, Cast, Encounter, EnvControl, Icon, Participant, ParticipantId, Replay,
    Status, Tether, TimeRange,
};
use crate::operation::{Operation, OperationKind};
use crate::world_state::{
    Actor, ActorType, CastInfo, CastResult, Status as StatusSlot, TetherInfo, WorldState,
};

struct OpenStatus {
    index: usize,
    status_id: u32,
    source_id: u32,
}

/// Builds the replay index by applying operations to a private world and
/// observing the state after each one.
pub struct ReplayBuilder {
    world: WorldState,
    replay: Replay,
    live_participants: HashMap<u32, ParticipantId>,
    open_casts: HashMap<u32, (ParticipantId, usize)>,
    open_targetable: HashMap<u32, (ParticipantId, usize)>,
    open_statuses: HashMap<(u32, usize), OpenStatus>,
    open_tethers: HashMap<u32, usize>,
    open_encounter: Option<usize>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Default for ReplayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayBuilder {
    pub fn new() -> Self {
        Self {
            world: WorldState::new(),
            replay: Replay::default(),
            live_participants: HashMap::new(),
            open_casts: HashMap::new(),
            open_targetable: HashMap::new(),
            open_statuses: HashMap::new(),
            open_tethers: HashMap::new(),
            open_encounter: None,
            last_timestamp: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.replay.path = Some(path.into());
        self
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn push(&mut self, mut operation: Operation) {
        operation.redo(&mut self.world);
        self.observe(&operation);
        self.last_timestamp = Some(operation.timestamp);
        self.replay.operations.push(operation);
    }

    pub fn finish(mut self) -> Replay {
        if let Some(end) = self.last_timestamp {
            let live = self
                .live_participants
                .drain()
                .map(|(_, participant)| participant)
                .collect::<Vec<ParticipantId>>();
            for participant in live {
                self.replay.participants[participant].existence.end = end;
            }
            for (_, (participant, window)) in self.open_targetable.drain() {
                self.replay.participants[participant].targetable[window].end = end;
            }
            for (_, (participant, cast)) in self.open_casts.drain() {
                self.replay.participants[participant].casts[cast].time.end = end;
            }
            for (_, open) in self.open_statuses.drain() {
                self.replay.statuses[open.index].time.end = end;
            }
            for (_, tether) in self.open_tethers.drain() {
                self.replay.tethers[tether].time.end = end;
            }
            if let Some(encounter) = self.open_encounter.take() {
                self.replay.encounters[encounter].time.end = end;
            }
        }

        tracing::debug!(
            operations = self.replay.operations.len(),
            participants = self.replay.participants.len(),
            actions = self.replay.actions.len(),
            statuses = self.replay.statuses.len(),
            encounters = self.replay.encounters.len(),
            "Built replay index"
        );
        self.replay
    }

    fn participant_of(&self, instance_id: u32) -> Option<ParticipantId> {
        if instance_id == 0 {
            return None;
        }
        self.live_participants.get(&instance_id).copied()
    }

    fn observe(&mut self, operation: &Operation) {
        let timestamp = operation.timestamp;
        match &operation.kind {
            OperationKind::EnterExitCombat { value, .. } => {
                if *value {
                    self.open_encounter(timestamp);
                } else {
                    self.close_encounter(timestamp);
                }
            }
            OperationKind::ActorCreate { actor, .. } => self.create_participant(timestamp, actor),
            OperationKind::ActorDestroy { instance_id, .. } => {
                self.destroy_participant(timestamp, *instance_id)
            }
            OperationKind::ActorRename {
                instance_id, name, ..
            } => {
                if let Some(participant) = self.participant_of(*instance_id) {
                    self.replay.participants[participant].name = name.clone();
                }
            }
            OperationKind::ActorTargetable {
                instance_id, value, ..
            } => {
                if *value {
                    self.open_targetable_window(timestamp, *instance_id);
                } else {
                    self.close_targetable_window(timestamp, *instance_id);
                }
            }
            OperationKind::ActorCast {
                instance_id, value, ..
            } => {
                self.close_cast(timestamp, *instance_id);
                if let Some(cast) = value {
                    self.open_cast(timestamp, *instance_id, cast);
                }
            }
            OperationKind::ActorTether {
                instance_id, value, ..
            } => {
                self.close_tether(timestamp, *instance_id);
                if value.id != 0 {
                    self.open_tether(timestamp, *instance_id, value);
                }
            }
            OperationKind::ActorStatus {
                instance_id,
                index,
                value,
                ..
            } => self.record_status(timestamp, *instance_id, *index, value),
            OperationKind::EventCast(result) => self.record_action(timestamp, result),
            OperationKind::EventIcon {
                instance_id,
                icon_id,
            } => {
                let target = self.participant_of(*instance_id);
                self.replay.icons.push(Icon {
                    id: *icon_id,
                    target,
                    timestamp,
                });
            }
            OperationKind::EventEnvControl {
                feature_id,
                index,
                state,
            } => self.replay.env_controls.push(EnvControl {
                feature: *feature_id,
                index: *index,
                state: *state,
                timestamp,
            }),
            OperationKind::ZoneChange { .. }
            | OperationKind::PlayerIdChange { .. }
            | OperationKind::WaymarkChange { .. }
            | OperationKind::ActorClassChange { .. }
            | OperationKind::ActorMove { .. }
            | OperationKind::ActorDead { .. }
            | OperationKind::ActorTarget { .. } => {}
        }
    }

    fn create_participant(&mut self, timestamp: DateTime<Utc>, actor: &Actor) {
        // A create over a live id ends the previous lifetime.
        self.destroy_participant(timestamp, actor.instance_id);

        let participant = self.replay.participants.len();
        self.replay.participants.push(Participant {
            instance_id: actor.instance_id,
            oid: actor.oid,
            actor_type: actor.actor_type,
            name: actor.name.clone(),
            existence: TimeRange::starting_at(timestamp),
            targetable: Vec::new(),
            casts: Vec::new(),
            has_any_actions: false,
            has_any_statuses: false,
            is_target_of_any_actions: false,
        });
        self.live_participants.insert(actor.instance_id, participant);

        if actor.is_targetable {
            self.open_targetable_window(timestamp, actor.instance_id);
        }
        if let Some(cast) = &actor.cast_info {
            self.open_cast(timestamp, actor.instance_id, cast);
        }
        if let Some(encounter) = self.open_encounter {
            self.replay.encounters[encounter]
                .participants
                .entry(actor.oid)
                .or_default()
                .push(participant);
        }
    }

    fn destroy_participant(&mut self, timestamp: DateTime<Utc>, instance_id: u32) {
        let Some(participant) = self.live_participants.get(&instance_id).copied() else {
            return;
        };

        self.close_targetable_window(timestamp, instance_id);
        self.close_cast(timestamp, instance_id);
        self.close_tether(timestamp, instance_id);
        let slots = self
            .open_statuses
            .keys()
            .filter(|(actor_id, _)| *actor_id == instance_id)
            .copied()
            .collect::<Vec<(u32, usize)>>();
        for slot in slots {
            self.close_status(timestamp, slot);
        }

        self.replay.participants[participant].existence.end = timestamp;
        self.live_participants.remove(&instance_id);
    }

    fn open_targetable_window(&mut self, timestamp: DateTime<Utc>, instance_id: u32) {
        if self.open_targetable.contains_key(&instance_id) {
            return;
        }
        let Some(participant) = self.participant_of(instance_id) else {
            return;
        };

        let windows = &mut self.replay.participants[participant].targetable;
        windows.push(TimeRange::starting_at(timestamp));
        self.open_targetable
            .insert(instance_id, (participant, windows.len() - 1));
    }

    fn close_targetable_window(&mut self, timestamp: DateTime<Utc>, instance_id: u32) {
        if let Some((participant, window)) = self.open_targetable.remove(&instance_id) {
            self.replay.participants[participant].targetable[window].end = timestamp;
        }
    }

    fn open_cast(&mut self, timestamp: DateTime<Utc>, instance_id: u32, cast: &CastInfo) {
        let Some(participant) = self.participant_of(instance_id) else {
            return;
        };

        let target_actor = match cast.target_id {
            0 => None,
            target_id => self.world.find_actor(target_id),
        };
        let location = target_actor
            .map(|actor| actor.position)
            .unwrap_or(cast.location);

        let target = self.participant_of(cast.target_id);
        let casts = &mut self.replay.participants[participant].casts;
        casts.push(Cast {
            id: cast.action,
            expected_cast_time: cast.total_time,
            time: TimeRange::starting_at(timestamp),
            target,
            location,
        });
        self.open_casts
            .insert(instance_id, (participant, casts.len() - 1));
    }

    fn close_cast(&mut self, timestamp: DateTime<Utc>, instance_id: u32) {
        if let Some((participant, cast)) = self.open_casts.remove(&instance_id) {
            self.replay.participants[participant].casts[cast].time.end = timestamp;
        }
    }

    fn open_tether(&mut self, timestamp: DateTime<Utc>, instance_id: u32, tether: &TetherInfo) {
        let Some(source) = self.participant_of(instance_id) else {
            return;
        };
        let index = self.replay.tethers.len();
        let target = self.participant_of(tether.target);
        self.replay.tethers.push(Tether {
            id: tether.id,
            source: Some(source),
            target,
            time: TimeRange::starting_at(timestamp),
        });
        self.open_tethers.insert(instance_id, index);
    }

    fn close_tether(&mut self, timestamp: DateTime<Utc>, instance_id: u32) {
        if let Some(index) = self.open_tethers.remove(&instance_id) {
            self.replay.tethers[index].time.end = timestamp;
        }
    }

    fn record_status(
        &mut self,
        timestamp: DateTime<Utc>,
        instance_id: u32,
        index: usize,
        value: &StatusSlot,
    ) {
        let slot = (instance_id, index);
        let refreshed = self.open_statuses.get(&slot).is_some_and(|open| {
            open.status_id == value.id && open.source_id == value.source_id
        });
        if refreshed {
            return;
        }

        self.close_status(timestamp, slot);
        if value.is_empty() {
            return;
        }
        let Some(target) = self.participant_of(instance_id) else {
            return;
        };

        let status_index = self.replay.statuses.len();
        let source = self.participant_of(value.source_id);
        self.replay.statuses.push(Status {
            id: value.id,
            target: Some(target),
            source,
            initial_duration: value.remaining_time,
            time: TimeRange::starting_at(timestamp),
            starting_extra: value.extra,
        });
        self.replay.participants[target].has_any_statuses = true;
        self.open_statuses.insert(
            slot,
            OpenStatus {
                index: status_index,
                status_id: value.id,
                source_id: value.source_id,
            },
        );
    }

    fn close_status(&mut self, timestamp: DateTime<Utc>, slot: (u32, usize)) {
        if let Some(open) = self.open_statuses.remove(&slot) {
            self.replay.statuses[open.index].time.end = timestamp;
        }
    }

    fn pos_rot_of(&self, instance_id: u32) -> Vec4 {
        self.world
            .find_actor(instance_id)
            .map(|actor| actor.position.extend(actor.rotation))
            .unwrap_or(Vec4::ZERO)
    }

    fn record_action(&mut self, timestamp: DateTime<Utc>, result: &CastResult) {
        let source = self.participant_of(result.caster_id);
        let targets = result
            .targets
            .iter()
            .map(|target| ActionTarget {
                target: self.participant_of(target.id),
                pos_rot: self.pos_rot_of(target.id),
                effects: target.effects,
            })
            .collect::<Vec<ActionTarget>>();

        if let Some(source) = source {
            self.replay.participants[source].has_any_actions = true;
        }
        for target in targets.iter().filter_map(|target| target.target) {
            self.replay.participants[target].is_target_of_any_actions = true;
        }
        self.engage_encounter_target(result);

        let action = Action {
            id: result.action,
            timestamp,
            source,
            source_pos_rot: self.pos_rot_of(result.caster_id),
            main_target: self.participant_of(result.main_target_id),
            main_target_pos_rot: self.pos_rot_of(result.main_target_id),
            targets,
        };
        self.replay.actions.push(action);
    }

    /// Encounters opened without a player target adopt the first enemy the
    /// player hits.
    fn engage_encounter_target(&mut self, result: &CastResult) {
        let Some(encounter) = self.open_encounter else {
            return;
        };
        if self.replay.encounters[encounter].instance_id != 0
            || result.caster_id != self.world.player_actor_id
        {
            return;
        }

        let enemy = result.targets.iter().find_map(|target| {
            self.world
                .find_actor(target.id)
                .filter(|actor| actor.actor_type == ActorType::Enemy)
        });
        if let Some(enemy) = enemy {
            let encounter = &mut self.replay.encounters[encounter];
            encounter.instance_id = enemy.instance_id;
            encounter.oid = enemy.oid;
        }
    }

    fn open_encounter(&mut self, timestamp: DateTime<Utc>) {
        if self.open_encounter.is_some() {
            return;
        }

        let engaged = self
            .world
            .find_actor(self.world.player_actor_id)
            .and_then(|player| self.world.find_actor(player.target_id))
            .filter(|target| target.actor_type == ActorType::Enemy);

        let mut participants: BTreeMap<u32, Vec<ParticipantId>> = BTreeMap::new();
        let mut live = self
            .live_participants
            .values()
            .copied()
            .collect::<Vec<ParticipantId>>();
        live.sort_unstable();
        for participant in live {
            participants
                .entry(self.replay.participants[participant].oid)
                .or_default()
                .push(participant);
        }

        let encounter = Encounter {
            instance_id: engaged.map(|actor| actor.instance_id).unwrap_or(0),
            oid: engaged.map(|actor| actor.oid).unwrap_or(0),
            time: TimeRange::starting_at(timestamp),
            zone: self.world.current_zone,
            participants,
            first_action: self
                .replay
                .actions
                .partition_point(|action| action.timestamp < timestamp),
            first_status: self
                .replay
                .statuses
                .partition_point(|status| status.time.start < timestamp),
            first_tether: self
                .replay
                .tethers
                .partition_point(|tether| tether.time.start < timestamp),
            first_icon: self
                .replay
                .icons
                .partition_point(|icon| icon.timestamp < timestamp),
            first_env_control: self
                .replay
                .env_controls
                .partition_point(|env_control| env_control.timestamp < timestamp),
        };
        tracing::debug!(
            zone = encounter.zone,
            instance_id = encounter.instance_id,
            "Encounter started"
        );
        self.open_encounter = Some(self.replay.encounters.len());
        self.replay.encounters.push(encounter);
    }

    fn close_encounter(&mut self, timestamp: DateTime<Utc>) {
        if let Some(encounter) = self.open_encounter.take() {
            self.replay.encounters[encounter].time.end = timestamp;
        }
    }
}

pub fn build_replay(operations: Vec<Operation>) -> Replay {
    let mut builder = ReplayBuilder::new();
    for operation in operations {
        builder.push(operation);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::build_replay;
    use crate::log_parsing::{ActLogNormalizer, NativeLogParser};
    use crate::log_parsing::ParsedLog;
    use crate::operation::{Operation, OperationKind};
    use crate::world_state::{
        ActionId, ActionType, Actor, ActorType, CastInfo, CastResult, CastTarget, Status,
        TetherInfo,
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use glam::Vec3;

    const PLAYER_ID: u32 = 0x1000_0001;
    const BOSS_ID: u32 = 0x4000_0001;
    const ADD_ID: u32 = 0x4000_0002;

    fn at(second: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, 1, 20, 0, 0).unwrap() + Duration::seconds(second)
    }

    fn create(second: i64, instance_id: u32, oid: u32, actor_type: ActorType) -> Operation {
        let mut actor = Actor::new(instance_id, oid, format!("Actor {oid:X}"), actor_type);
        actor.is_targetable = true;
        Operation::new(at(second), OperationKind::actor_create(actor))
    }

    fn cast_event(second: i64, caster_id: u32, target_ids: &[u32]) -> Operation {
        Operation::new(
            at(second),
            OperationKind::EventCast(CastResult {
                caster_id,
                action: ActionId::new(ActionType::Spell, 100 + second as u32),
                main_target_id: target_ids.first().copied().unwrap_or(0),
                animation_lock_time: 0.6,
                max_targets: 8,
                source_sequence: second as u32,
                targets: target_ids
                    .iter()
                    .map(|id| CastTarget {
                        id: *id,
                        effects: [0; 8],
                    })
                    .collect(),
            }),
        )
    }

    fn status(second: i64, instance_id: u32, index: usize, id: u32, source_id: u32) -> Operation {
        Operation::new(
            at(second),
            OperationKind::actor_status(
                instance_id,
                index,
                Status {
                    id,
                    extra: 0,
                    remaining_time: 30.0,
                    source_id,
                },
            ),
        )
    }

    fn scripted_fight() -> Vec<Operation> {
        vec![
            Operation::new(at(0), OperationKind::zone_change(1000)),
            Operation::new(at(0), OperationKind::player_id_change(PLAYER_ID)),
            create(0, PLAYER_ID, 0, ActorType::Player),
            create(0, BOSS_ID, 0x3F2A, ActorType::Enemy),
            cast_event(1, BOSS_ID, &[PLAYER_ID]),
            Operation::new(at(2), OperationKind::actor_target(PLAYER_ID, BOSS_ID)),
            Operation::new(at(3), OperationKind::enter_exit_combat(true)),
            create(4, ADD_ID, 0x3F2B, ActorType::Enemy),
            cast_event(5, PLAYER_ID, &[BOSS_ID]),
            status(5, BOSS_ID, 0, 0xA00, PLAYER_ID),
            Operation::new(
                at(6),
                OperationKind::actor_tether(
                    ADD_ID,
                    TetherInfo {
                        id: 17,
                        target: PLAYER_ID,
                    },
                ),
            ),
            Operation::new(
                at(7),
                OperationKind::EventIcon {
                    instance_id: PLAYER_ID,
                    icon_id: 0x1D6,
                },
            ),
            Operation::new(at(10), OperationKind::enter_exit_combat(false)),
            cast_event(11, PLAYER_ID, &[ADD_ID]),
            Operation::new(at(12), OperationKind::actor_destroy(ADD_ID)),
        ]
    }

    #[test]
    fn encounter_offsets_bound_range_scans() {
        let replay = build_replay(scripted_fight());
        assert_eq!(replay.encounters.len(), 1);

        let encounter = &replay.encounters[0];
        assert_eq!(encounter.time.start, at(3));
        assert_eq!(encounter.time.end, at(10));
        assert_eq!(encounter.zone, 1000);
        assert_eq!(encounter.instance_id, BOSS_ID);
        assert_eq!(encounter.oid, 0x3F2A);
        assert_eq!(encounter.first_action, 1);
        assert_eq!(encounter.first_status, 0);

        let actions = replay.encounter_actions(encounter).collect::<Vec<_>>();
        assert_eq!(actions.len(), 1, "only the mid-fight action is in range");
        assert_eq!(actions[0].timestamp, at(5));
        assert_eq!(replay.encounter_statuses(encounter).count(), 1);
        assert_eq!(replay.encounter_tethers(encounter).count(), 1);
        assert_eq!(replay.encounter_icons(encounter).count(), 1);
        assert_eq!(replay.encounter_env_controls(encounter).count(), 0);

        for action in &replay.actions {
            let inside = replay
                .encounter_actions(encounter)
                .any(|scanned| std::ptr::eq(scanned, action));
            assert_eq!(inside, encounter.time.contains(action.timestamp));
        }
    }

    #[test]
    fn encounter_groups_participants_by_oid() {
        let replay = build_replay(scripted_fight());
        let encounter = &replay.encounters[0];
        let oids = encounter.participants.keys().copied().collect::<Vec<u32>>();
        assert_eq!(oids, vec![0, 0x3F2A, 0x3F2B]);
        let add = encounter.participants[&0x3F2B][0];
        assert_eq!(replay.participants[add].instance_id, ADD_ID);
    }

    #[test]
    fn participants_track_lifetime_and_flags() {
        let replay = build_replay(scripted_fight());
        let add = replay
            .participants_by_instance(ADD_ID)
            .next()
            .expect("Expected add participant");
        assert_eq!(add.existence.start, at(4));
        assert_eq!(add.existence.end, at(12));
        assert_eq!(add.targetable.len(), 1);
        assert_eq!(add.targetable[0].end, at(12));
        assert!(add.is_target_of_any_actions);
        assert!(!add.has_any_actions);

        let boss = replay
            .participants_by_instance(BOSS_ID)
            .next()
            .expect("Expected boss participant");
        assert_eq!(boss.existence.end, at(12), "never destroyed, ends at last op");
        assert!(boss.has_any_actions);
        assert!(boss.has_any_statuses);

        let tether = &replay.tethers[0];
        assert_eq!(tether.time.end, at(12), "tether closes with its source");
    }

    #[test]
    fn casts_snapshot_target_location_and_close_on_stop() {
        let mut player = Actor::new(PLAYER_ID, 0, "Player".to_string(), ActorType::Player);
        player.position = Vec3::new(95.0, 0.0, 105.0);
        let operations = vec![
            Operation::new(at(0), OperationKind::actor_create(player)),
            create(0, BOSS_ID, 0x3F2A, ActorType::Enemy),
            Operation::new(
                at(1),
                OperationKind::actor_cast(
                    BOSS_ID,
                    Some(CastInfo {
                        action: ActionId::new(ActionType::Spell, 33562),
                        target_id: PLAYER_ID,
                        location: Vec3::ZERO,
                        current_time: 0.0,
                        total_time: 4.7,
                    }),
                ),
            ),
            Operation::new(at(6), OperationKind::actor_cast(BOSS_ID, None)),
        ];

        let replay = build_replay(operations);
        let boss = &replay.participants[1];
        assert_eq!(boss.casts.len(), 1);
        let cast = &boss.casts[0];
        assert_eq!(cast.time.start, at(1));
        assert_eq!(cast.time.end, at(6));
        assert_eq!(cast.target, Some(0));
        assert_eq!(cast.location, Vec3::new(95.0, 0.0, 105.0));
        assert_eq!(cast.expected_cast_time, 4.7);
    }

    #[test]
    fn tether_on_missing_actor_is_not_recorded() {
        let ghost_tether = |second: i64| {
            Operation::new(
                at(second),
                OperationKind::actor_tether(
                    0x4000_00FF,
                    TetherInfo {
                        id: 9,
                        target: PLAYER_ID,
                    },
                ),
            )
        };
        let operations = vec![
            create(0, PLAYER_ID, 0, ActorType::Player),
            ghost_tether(1),
            create(2, BOSS_ID, 0x3F2A, ActorType::Enemy),
            ghost_tether(3),
        ];

        let replay = build_replay(operations);
        assert!(replay.tethers.is_empty());
        assert!(replay.participants_by_instance(0x4000_00FF).next().is_none());
    }

    #[test]
    fn status_refresh_keeps_one_interval() {
        let operations = vec![
            create(0, PLAYER_ID, 0, ActorType::Player),
            create(0, BOSS_ID, 0x3F2A, ActorType::Enemy),
            status(1, PLAYER_ID, 2, 0x100, BOSS_ID),
            status(4, PLAYER_ID, 2, 0x100, BOSS_ID),
            status(6, PLAYER_ID, 2, 0, 0),
            status(7, PLAYER_ID, 2, 0x101, BOSS_ID),
        ];

        let replay = build_replay(operations);
        assert_eq!(replay.statuses.len(), 2);
        assert_eq!(replay.statuses[0].time.start, at(1));
        assert_eq!(replay.statuses[0].time.end, at(6));
        assert_eq!(replay.statuses[0].source, Some(1));
        assert_eq!(replay.statuses[1].time.end, at(7));
    }

    #[test]
    fn native_create_then_destroy_closes_lifetime() {
        let lines = [
            "2023-05-01T20:00:00.000+00:00|ACT+|1001/2000/Boss/Enemy/100/0/100/0|0|None|true|5",
            "2023-05-01T20:00:09.000+00:00|ACT-|1001",
        ];
        let ParsedLog { operations, .. } =
            crate::log_parsing::parse_lines(NativeLogParser::new(), lines);

        let replay = build_replay(operations.clone());
        let participant = replay
            .participants_by_instance(0x1001)
            .next()
            .expect("Expected participant for 0x1001");
        assert_eq!(participant.existence.end, operations[1].timestamp);

        let mut world = crate::world_state::WorldState::new();
        let mut operations = operations;
        crate::replay::apply_operations(&mut operations, &mut world);
        assert!(world.find_actor(0x1001).is_none());
    }

    #[test]
    fn act_log_with_synthesized_combat_builds_an_encounter() {
        let mut enemy_add = vec![
            "03".to_string(),
            "2023-05-01T20:00:00.0000000+00:00".to_string(),
            format!("{BOSS_ID:08X}"),
            "Boss".to_string(),
            "0".to_string(),
            "5A".to_string(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            "16170".to_string(),
        ];
        enemy_add.resize(22, String::new());
        let mut player_add = enemy_add.clone();
        player_add[2] = format!("{PLAYER_ID:08X}");
        player_add[3] = "Player".to_string();
        player_add[10] = "0".to_string();

        let mut hit = vec![
            "21".to_string(),
            "2023-05-01T20:00:05.0000000+00:00".to_string(),
            format!("{PLAYER_ID:08X}"),
            "Player".to_string(),
            "1F".to_string(),
            "Attack".to_string(),
            format!("{BOSS_ID:08X}"),
            "Boss".to_string(),
        ];
        hit.resize(30, "0".to_string());
        hit.resize(44, String::new());
        hit.extend(["00000001".to_string(), "0".to_string(), "1".to_string()]);

        let mut remove = vec![
            "04".to_string(),
            "2023-05-01T20:00:30.0000000+00:00".to_string(),
            format!("{BOSS_ID:08X}"),
        ];
        remove.resize(22, String::new());

        let lines = [
            format!("02|2023-05-01T20:00:00.0000000+00:00|{PLAYER_ID:08X}"),
            player_add.join("|"),
            enemy_add.join("|"),
            hit.join("|"),
            remove.join("|"),
        ];
        let parsed = crate::log_parsing::parse_lines(
            ActLogNormalizer::new(0),
            lines.iter().map(String::as_str),
        );
        assert_eq!(parsed.stats.malformed_lines, 0);

        let replay = build_replay(parsed.operations);
        assert_eq!(replay.encounters.len(), 1);
        let encounter = &replay.encounters[0];
        assert_eq!(encounter.instance_id, BOSS_ID);
        assert_eq!(encounter.oid, 16170);
        assert_eq!(encounter.time.start, at(5));
        assert_eq!(encounter.time.end, at(30));
        assert_eq!(replay.encounter_actions(encounter).count(), 1);
    }
}
