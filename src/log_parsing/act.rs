use std::collections::HashMap;

use chrono::{DateTime, Utc};
use glam::{Vec3, Vec4};

use super::fields::{
    dec_u32, field, float, hex_u16, hex_u32, hex_u64, hex_u8, pos_rot, timestamp, FieldError,
};
use super::LineOutcome;
use crate::operation::{Operation, OperationKind};
use crate::world_state::{
    ActionId, ActionType, Actor, ActorType, CastInfo, CastResult, CastTarget, Status, TetherInfo,
    Waymark, WorldState, NUM_TARGET_EFFECTS,
};

const NO_TARGET_ID: u32 = 0xE000_0000;
const CAST_RESULT_MIN_FIELDS: usize = 47;

pub(crate) struct ActDecodeContext<'a> {
    pub(crate) world: &'a WorldState,
    pub(crate) network_delta: i32,
}

#[derive(Debug, Default)]
pub(crate) struct ActDecoded {
    pub(crate) operation: Option<OperationKind>,
    pub(crate) positions: Vec<(u32, Vec4)>,
}

impl ActDecoded {
    fn filtered() -> Self {
        Self::default()
    }

    fn operation(operation: OperationKind) -> Self {
        Self {
            operation: Some(operation),
            positions: Vec::new(),
        }
    }
}

pub(crate) type ActDecoder = fn(&[&str], &ActDecodeContext) -> Result<ActDecoded, FieldError>;

lazy_static::lazy_static! {
    static ref ACT_DECODERS: HashMap<u32, ActDecoder> = {
        let mut decoders: HashMap<u32, ActDecoder> = HashMap::new();
        decoders.insert(1, decode_zone_change);
        decoders.insert(2, decode_player_id_change);
        decoders.insert(3, decode_actor_create);
        decoders.insert(4, decode_actor_destroy);
        decoders.insert(20, decode_cast_start);
        decoders.insert(21, decode_cast_result);
        decoders.insert(22, decode_cast_result);
        decoders.insert(23, decode_cast_stop);
        decoders.insert(24, |fields, _| decode_positions(fields, 13));
        decoders.insert(25, decode_death);
        decoders.insert(26, |fields, context| decode_status(fields, context, true));
        decoders.insert(27, decode_icon);
        decoders.insert(28, decode_waymark);
        decoders.insert(30, |fields, context| decode_status(fields, context, false));
        decoders.insert(34, decode_targetable);
        decoders.insert(35, decode_tether);
        decoders.insert(37, |fields, _| decode_positions(fields, 11));
        decoders.insert(38, |fields, _| decode_positions(fields, 11));
        decoders.insert(39, |fields, _| decode_positions(fields, 10));
        decoders
    };
}

pub(crate) fn act_decoder(code: u32) -> Option<ActDecoder> {
    ACT_DECODERS.get(&code).copied()
}

fn push_position(
    positions: &mut Vec<(u32, Vec4)>,
    instance_id: u32,
    fields: &[&str],
    start_index: usize,
) -> Result<(), FieldError> {
    if let Some(position) = pos_rot(fields, start_index)? {
        positions.push((instance_id, position));
    }
    Ok(())
}

fn decode_zone_change(fields: &[&str], _: &ActDecodeContext) -> Result<ActDecoded, FieldError> {
    Ok(ActDecoded::operation(OperationKind::zone_change(hex_u16(
        fields, 2,
    )?)))
}

fn decode_player_id_change(
    fields: &[&str],
    _: &ActDecodeContext,
) -> Result<ActDecoded, FieldError> {
    Ok(ActDecoded::operation(OperationKind::player_id_change(
        hex_u32(fields, 2)?,
    )))
}

fn infer_actor_type(instance_id: u32, owner_id: u32) -> ActorType {
    if instance_id & 0xF000_0000 == 0x1000_0000 {
        ActorType::Player
    } else if owner_id != 0 {
        ActorType::Pet
    } else {
        ActorType::Enemy
    }
}

fn decode_actor_create(fields: &[&str], _: &ActDecodeContext) -> Result<ActDecoded, FieldError> {
    let instance_id = hex_u32(fields, 2)?;
    let owner_id = hex_u32(fields, 6)?;
    let mut actor = Actor::new(
        instance_id,
        dec_u32(fields, 10)?,
        field(fields, 3)?.to_string(),
        infer_actor_type(instance_id, owner_id),
    );
    actor.class_id = hex_u32(fields, 4)?;
    actor.is_targetable = true;
    if let Some(position) = pos_rot(fields, 17)? {
        actor.position = position.truncate();
        actor.rotation = position.w;
    }
    Ok(ActDecoded::operation(OperationKind::actor_create(actor)))
}

fn decode_actor_destroy(fields: &[&str], _: &ActDecodeContext) -> Result<ActDecoded, FieldError> {
    let instance_id = hex_u32(fields, 2)?;
    let mut decoded = ActDecoded::operation(OperationKind::actor_destroy(instance_id));
    push_position(&mut decoded.positions, instance_id, fields, 17)?;
    Ok(decoded)
}

fn decode_cast_start(fields: &[&str], _: &ActDecodeContext) -> Result<ActDecoded, FieldError> {
    let instance_id = hex_u32(fields, 2)?;
    let cast_time = float(fields, 8)?;
    let cast = CastInfo {
        action: ActionId::new(ActionType::Spell, hex_u32(fields, 4)?),
        target_id: hex_u32(fields, 6)?,
        location: Vec3::ZERO,
        current_time: cast_time,
        total_time: cast_time,
    };
    let mut decoded = ActDecoded::operation(OperationKind::actor_cast(instance_id, Some(cast)));
    push_position(&mut decoded.positions, instance_id, fields, 9)?;
    Ok(decoded)
}

fn decode_cast_stop(fields: &[&str], _: &ActDecodeContext) -> Result<ActDecoded, FieldError> {
    Ok(ActDecoded::operation(OperationKind::actor_cast(
        hex_u32(fields, 2)?,
        None,
    )))
}

/// The top byte of the raw action id selects the action type; only spells are
/// logged with their real id, everything else is shifted by the network delta.
fn decode_action_id(raw: u32, network_delta: i32) -> ActionId {
    let action_type = match ActionType::from_raw((raw >> 24) as u8) {
        ActionType::None => ActionType::Spell,
        action_type => action_type,
    };
    let mut id = raw & 0x00FF_FFFF;
    if action_type != ActionType::Spell {
        id = (id as i32).wrapping_sub(network_delta) as u32;
    }
    ActionId::new(action_type, id)
}

fn decode_cast_result(
    fields: &[&str],
    context: &ActDecodeContext,
) -> Result<ActDecoded, FieldError> {
    if fields.len() < CAST_RESULT_MIN_FIELDS {
        return Err(FieldError::Missing {
            index: fields.len(),
        });
    }

    let mut decoded = ActDecoded::default();
    let caster_id = hex_u32(fields, 2)?;
    let main_target_id = hex_u32(fields, 6)?;
    push_position(&mut decoded.positions, caster_id, fields, 40)?;

    let mut targets = Vec::new();
    if main_target_id != NO_TARGET_ID {
        let mut target = CastTarget {
            id: main_target_id,
            effects: [0; NUM_TARGET_EFFECTS],
        };
        for (slot, effect) in target.effects.iter_mut().enumerate() {
            let low = hex_u64(fields, 8 + 2 * slot)?;
            let high = hex_u64(fields, 9 + 2 * slot)?;
            *effect = (high << 32) | low;
        }
        targets.push(target);
        push_position(&mut decoded.positions, main_target_id, fields, 30)?;
    }

    decoded.operation = Some(OperationKind::EventCast(CastResult {
        caster_id,
        action: decode_action_id(hex_u32(fields, 4)?, context.network_delta),
        main_target_id,
        animation_lock_time: 0.0,
        max_targets: dec_u32(fields, 46)?,
        source_sequence: hex_u32(fields, 44)?,
        targets,
    }));
    Ok(decoded)
}

fn decode_positions(fields: &[&str], start_index: usize) -> Result<ActDecoded, FieldError> {
    let mut decoded = ActDecoded::filtered();
    push_position(&mut decoded.positions, hex_u32(fields, 2)?, fields, start_index)?;
    Ok(decoded)
}

fn decode_death(fields: &[&str], _: &ActDecodeContext) -> Result<ActDecoded, FieldError> {
    Ok(ActDecoded::operation(OperationKind::actor_dead(
        hex_u32(fields, 2)?,
        true,
    )))
}

/// Slot resolution: reuse the slot holding the same `(status, source)` pair,
/// otherwise take the first empty slot for a gain. A gain with no free slot
/// and a loss of a status the actor does not have are both dropped.
fn decode_status(
    fields: &[&str],
    context: &ActDecodeContext,
    gain: bool,
) -> Result<ActDecoded, FieldError> {
    let status_id = hex_u32(fields, 2)?;
    let source_id = hex_u32(fields, 5)?;
    let instance_id = hex_u32(fields, 7)?;
    let value = if gain {
        Status {
            id: status_id,
            extra: hex_u16(fields, 9)?,
            remaining_time: float(fields, 4)?,
            source_id,
        }
    } else {
        Status::default()
    };

    let Some(actor) = context.world.find_actor(instance_id) else {
        return Ok(ActDecoded::filtered());
    };

    let existing_slot = actor.find_status_slot(status_id, source_id);
    let slot = if gain {
        existing_slot.or_else(|| actor.first_empty_status_slot())
    } else {
        existing_slot
    };

    Ok(match slot {
        Some(index) => {
            ActDecoded::operation(OperationKind::actor_status(instance_id, index, value))
        }
        None => ActDecoded::filtered(),
    })
}

fn decode_icon(fields: &[&str], context: &ActDecodeContext) -> Result<ActDecoded, FieldError> {
    let raw_icon = hex_u32(fields, 6)? as i32;
    Ok(ActDecoded::operation(OperationKind::EventIcon {
        instance_id: hex_u32(fields, 2)?,
        icon_id: raw_icon.wrapping_sub(context.network_delta) as u32,
    }))
}

fn decode_waymark(fields: &[&str], _: &ActDecodeContext) -> Result<ActDecoded, FieldError> {
    let index = dec_u32(fields, 3)?;
    let waymark = Waymark::from_index(index).ok_or_else(|| FieldError::UnknownName {
        index: 3,
        kind: "waymark",
        value: index.to_string(),
    })?;
    let position = if field(fields, 2)? == "Add" {
        Some(Vec3::new(
            float(fields, 6)?,
            float(fields, 8)?,
            float(fields, 7)?,
        ))
    } else {
        None
    };
    Ok(ActDecoded::operation(OperationKind::waymark_change(
        waymark, position,
    )))
}

fn decode_targetable(fields: &[&str], _: &ActDecodeContext) -> Result<ActDecoded, FieldError> {
    Ok(ActDecoded::operation(OperationKind::actor_targetable(
        hex_u32(fields, 2)?,
        hex_u8(fields, 6)? != 0,
    )))
}

fn decode_tether(fields: &[&str], _: &ActDecodeContext) -> Result<ActDecoded, FieldError> {
    Ok(ActDecoded::operation(OperationKind::actor_tether(
        hex_u32(fields, 2)?,
        TetherInfo {
            id: hex_u32(fields, 8)?,
            target: hex_u32(fields, 4)?,
        },
    )))
}

fn same_cast_event(previous: &CastResult, next: &CastResult) -> bool {
    previous.caster_id == next.caster_id
        && previous.action == next.action
        && previous.max_targets == next.max_targets
        && previous.source_sequence == next.source_sequence
}

/// Folds Format-B lines into a normalized operation stream.
///
/// The fold owns a private [`WorldState`] that every emitted operation is
/// applied to, so status slots, pending casts and positions can be resolved
/// against the state as of the current line.
pub struct ActLogNormalizer {
    world: WorldState,
    network_delta: i32,
    operations: Vec<Operation>,
    engaged_enemy_id: u32,
}

impl ActLogNormalizer {
    pub fn new(network_delta: i32) -> Self {
        Self {
            world: WorldState::new(),
            network_delta,
            operations: Vec::new(),
            engaged_enemy_id: 0,
        }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    pub(crate) fn consume_fields(&mut self, fields: &[&str]) -> Result<LineOutcome, FieldError> {
        let code = dec_u32(fields, 0)?;
        let line_timestamp = self.clamp_timestamp(timestamp(fields, 1)?);
        let Some(decoder) = act_decoder(code) else {
            return Ok(LineOutcome::UnknownTag);
        };

        let context = ActDecodeContext {
            world: &self.world,
            network_delta: self.network_delta,
        };
        let decoded = decoder(fields, &context)?;
        let emitted_before = self.operations.len();

        let mut merged_cast: Option<Operation> = None;
        match &decoded.operation {
            Some(OperationKind::EventCast(result)) => {
                merged_cast = self.take_mergeable_cast(result);
                self.end_matching_cast(line_timestamp, result);
                self.enter_combat_if_engaging(line_timestamp, result);
            }
            Some(OperationKind::ActorDestroy { instance_id, .. }) => {
                self.exit_combat_if_disengaging(line_timestamp, *instance_id);
            }
            _ => {}
        }

        self.reconcile_positions(line_timestamp, &decoded.positions);

        let primary_pushed = match (merged_cast, decoded.operation) {
            (Some(mut merged), _) => {
                merged.timestamp = line_timestamp;
                self.operations.push(merged);
                true
            }
            (None, Some(kind)) => {
                self.emit(line_timestamp, kind);
                true
            }
            (None, None) => false,
        };

        if primary_pushed || self.operations.len() > emitted_before {
            Ok(LineOutcome::Emitted)
        } else {
            Ok(LineOutcome::Filtered)
        }
    }

    fn clamp_timestamp(&self, line_timestamp: DateTime<Utc>) -> DateTime<Utc> {
        match self.operations.last() {
            Some(last) if last.timestamp > line_timestamp => last.timestamp,
            _ => line_timestamp,
        }
    }

    fn emit(&mut self, timestamp: DateTime<Utc>, kind: OperationKind) {
        let mut operation = Operation::new(timestamp, kind);
        operation.redo(&mut self.world);
        self.operations.push(operation);
    }

    /// Pops the previous cast event when this line is another target fragment
    /// of it. The popped event was already dispatched, so it is re-pushed
    /// without being applied again.
    fn take_mergeable_cast(&mut self, result: &CastResult) -> Option<Operation> {
        let mergeable = matches!(
            self.operations.last(),
            Some(Operation {
                kind: OperationKind::EventCast(previous),
                ..
            }) if same_cast_event(previous, result)
        );
        if !mergeable {
            return None;
        }

        let mut previous = self.operations.pop()?;
        if let OperationKind::EventCast(previous_result) = &mut previous.kind {
            previous_result
                .targets
                .extend(result.targets.first().copied());
        }
        Some(previous)
    }

    fn end_matching_cast(&mut self, timestamp: DateTime<Utc>, result: &CastResult) {
        let casting_same_action = self
            .world
            .find_actor(result.caster_id)
            .and_then(|actor| actor.cast_info.as_ref())
            .map(|cast| cast.action == result.action)
            .unwrap_or(false);

        if casting_same_action {
            self.emit(timestamp, OperationKind::actor_cast(result.caster_id, None));
        }
    }

    fn enter_combat_if_engaging(&mut self, timestamp: DateTime<Utc>, result: &CastResult) {
        if result.caster_id != self.world.player_actor_id || self.engaged_enemy_id != 0 {
            return;
        }

        let Some(first_target) = result.targets.first() else {
            return;
        };
        let target_is_enemy = self
            .world
            .find_actor(first_target.id)
            .map(|actor| actor.actor_type == ActorType::Enemy)
            .unwrap_or(false);
        if !target_is_enemy {
            return;
        }

        self.engaged_enemy_id = first_target.id;
        tracing::trace!(enemy_id = first_target.id, "Synthesized combat start");
        self.emit(timestamp, OperationKind::enter_exit_combat(true));
    }

    fn exit_combat_if_disengaging(&mut self, timestamp: DateTime<Utc>, destroyed_id: u32) {
        if self.engaged_enemy_id == 0 || destroyed_id != self.engaged_enemy_id {
            return;
        }

        self.engaged_enemy_id = 0;
        tracing::trace!(enemy_id = destroyed_id, "Synthesized combat end");
        self.emit(timestamp, OperationKind::enter_exit_combat(false));
    }

    fn reconcile_positions(&mut self, timestamp: DateTime<Utc>, positions: &[(u32, Vec4)]) {
        for (instance_id, position) in positions {
            let Some(actor) = self.world.find_actor(*instance_id) else {
                continue;
            };
            if actor.position.extend(actor.rotation) == *position {
                continue;
            }

            self.emit(
                timestamp,
                OperationKind::actor_move(*instance_id, position.truncate(), position.w),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ActLogNormalizer;
    use crate::log_parsing::{parse_lines, LineOutcome};
    use crate::operation::OperationKind;
    use crate::world_state::{ActionId, ActionType, ActorType};
    use glam::Vec3;

    const PLAYER_ID: u32 = 0x1000_0001;
    const ENEMY_ID: u32 = 0x4000_0010;

    fn feed(normalizer: &mut ActLogNormalizer, line: &str) -> LineOutcome {
        let fields = line.split('|').collect::<Vec<&str>>();
        normalizer
            .consume_fields(&fields)
            .expect("Expected line to decode")
    }

    fn timestamp(second: u32) -> String {
        format!("2023-05-01T20:00:{second:02}.0000000+00:00")
    }

    fn add_combatant_line(second: u32, instance_id: u32, name: &str, x: f32, z: f32) -> String {
        let mut fields = vec![
            "03".to_string(),
            timestamp(second),
            format!("{instance_id:08X}"),
            name.to_string(),
            "15".to_string(),
            "5A".to_string(),
            "0000".to_string(),
            "00".to_string(),
            "0".to_string(),
            "0".to_string(),
            "12345".to_string(),
        ];
        fields.resize(17, "0".to_string());
        fields.extend([
            format!("{x:.2}"),
            format!("{z:.2}"),
            "0.00".to_string(),
            "0.00".to_string(),
        ]);
        fields.push(String::new());
        fields.join("|")
    }

    fn cast_result_line(
        second: u32,
        caster_id: u32,
        action_id: u32,
        target_id: u32,
        sequence: u32,
        target_position: Option<(f32, f32)>,
    ) -> String {
        let mut fields = vec![
            "21".to_string(),
            timestamp(second),
            format!("{caster_id:08X}"),
            "Caster".to_string(),
            format!("{action_id:X}"),
            "Action".to_string(),
            format!("{target_id:08X}"),
            "Target".to_string(),
        ];
        fields.resize(30, "0".to_string());
        match target_position {
            Some((x, z)) => fields.extend([
                format!("{x:.2}"),
                format!("{z:.2}"),
                "0.00".to_string(),
                "0.00".to_string(),
            ]),
            None => fields.extend(std::iter::repeat(String::new()).take(4)),
        }
        fields.resize(40, "0".to_string());
        fields.extend(std::iter::repeat(String::new()).take(4));
        fields.push(format!("{sequence:08X}"));
        fields.push("0".to_string());
        fields.push("8".to_string());
        fields.push("0".to_string());
        fields.join("|")
    }

    fn engaged_normalizer() -> ActLogNormalizer {
        let mut normalizer = ActLogNormalizer::new(0);
        feed(
            &mut normalizer,
            &format!("02|{}|{PLAYER_ID:08X}", timestamp(0)),
        );
        feed(
            &mut normalizer,
            &add_combatant_line(0, PLAYER_ID, "Player One", 100.0, 100.0),
        );
        feed(
            &mut normalizer,
            &add_combatant_line(0, ENEMY_ID, "Striking Dummy", 100.0, 90.0),
        );
        normalizer
    }

    fn labels(normalizer: &ActLogNormalizer) -> Vec<&'static str> {
        normalizer
            .operations()
            .iter()
            .map(|operation| operation.kind.label())
            .collect()
    }

    #[test]
    fn infers_actor_types_from_instance_and_owner() {
        let normalizer = engaged_normalizer();
        assert_eq!(
            normalizer.world().find_actor(PLAYER_ID).map(|actor| actor.actor_type),
            Some(ActorType::Player)
        );
        assert_eq!(
            normalizer.world().find_actor(ENEMY_ID).map(|actor| actor.position),
            Some(Vec3::new(100.0, 0.0, 90.0))
        );
    }

    #[test]
    fn coalesces_cast_fragments_into_one_event() {
        let mut normalizer = engaged_normalizer();
        let second_enemy = ENEMY_ID + 1;
        feed(
            &mut normalizer,
            &add_combatant_line(1, second_enemy, "Second Dummy", 105.0, 90.0),
        );
        let before = normalizer.operations().len();

        feed(
            &mut normalizer,
            &cast_result_line(2, ENEMY_ID, 0x7A1, PLAYER_ID, 0x10, None),
        );
        let outcome = feed(
            &mut normalizer,
            &cast_result_line(2, ENEMY_ID, 0x7A1, second_enemy, 0x10, None),
        );

        assert_eq!(outcome, LineOutcome::Emitted);
        assert_eq!(normalizer.operations().len(), before + 1);
        let Some(OperationKind::EventCast(result)) =
            normalizer.operations().last().map(|operation| &operation.kind)
        else {
            panic!("Expected the merged cast event to be last");
        };
        assert_eq!(result.targets.len(), 2);
        assert_eq!(result.targets[1].id, second_enemy);
    }

    #[test]
    fn merged_cast_fragments_are_not_counted_as_filtered() {
        let second_enemy = ENEMY_ID + 1;
        let lines = [
            format!("02|{}|{PLAYER_ID:08X}", timestamp(0)),
            add_combatant_line(0, PLAYER_ID, "Player One", 100.0, 100.0),
            add_combatant_line(0, ENEMY_ID, "Striking Dummy", 100.0, 90.0),
            add_combatant_line(1, second_enemy, "Second Dummy", 105.0, 90.0),
            cast_result_line(2, ENEMY_ID, 0x7A1, PLAYER_ID, 0x10, None),
            cast_result_line(2, ENEMY_ID, 0x7A1, second_enemy, 0x10, None),
        ];
        let parsed = parse_lines(ActLogNormalizer::new(0), lines.iter().map(String::as_str));

        assert_eq!(parsed.stats.total_lines, 6);
        assert_eq!(parsed.stats.filtered_lines, 0);
        assert_eq!(parsed.stats.malformed_lines, 0);
    }

    #[test]
    fn different_sequence_numbers_are_not_merged() {
        let mut normalizer = engaged_normalizer();
        feed(
            &mut normalizer,
            &cast_result_line(2, ENEMY_ID, 0x7A1, PLAYER_ID, 0x10, None),
        );
        feed(
            &mut normalizer,
            &cast_result_line(3, ENEMY_ID, 0x7A1, PLAYER_ID, 0x11, None),
        );

        let cast_events = labels(&normalizer)
            .into_iter()
            .filter(|label| *label == "EventCast")
            .count();
        assert_eq!(cast_events, 2);
    }

    #[test]
    fn synthesizes_cast_stop_before_resolution() {
        let mut normalizer = engaged_normalizer();
        let mut cast_start = vec![
            "20".to_string(),
            timestamp(1),
            format!("{ENEMY_ID:08X}"),
            "Striking Dummy".to_string(),
            "7A1".to_string(),
            "Action".to_string(),
            format!("{PLAYER_ID:08X}"),
            "Player One".to_string(),
            "2.700".to_string(),
        ];
        cast_start.extend(std::iter::repeat(String::new()).take(4));
        feed(&mut normalizer, &cast_start.join("|"));
        assert!(normalizer
            .world()
            .find_actor(ENEMY_ID)
            .and_then(|actor| actor.cast_info)
            .is_some());

        feed(
            &mut normalizer,
            &cast_result_line(4, ENEMY_ID, 0x7A1, PLAYER_ID, 0x20, None),
        );

        let labels = labels(&normalizer);
        let tail = &labels[labels.len() - 2..];
        assert_eq!(tail, ["ActorCast", "EventCast"]);
        assert!(normalizer
            .world()
            .find_actor(ENEMY_ID)
            .and_then(|actor| actor.cast_info)
            .is_none());
    }

    #[test]
    fn player_attack_on_enemy_brackets_combat_until_enemy_removed() {
        let mut normalizer = engaged_normalizer();
        feed(
            &mut normalizer,
            &cast_result_line(5, PLAYER_ID, 0x1F, ENEMY_ID, 0x30, None),
        );
        assert!(normalizer.world().player_in_combat);

        let mut remove = vec![
            "04".to_string(),
            timestamp(9),
            format!("{ENEMY_ID:08X}"),
        ];
        remove.resize(21, String::new());
        feed(&mut normalizer, &remove.join("|"));

        let labels = labels(&normalizer);
        let enter = labels
            .iter()
            .position(|label| *label == "EnterExitCombat")
            .expect("Expected a combat start");
        assert_eq!(labels[enter + 1], "EventCast");
        assert_eq!(
            &labels[labels.len() - 2..],
            ["EnterExitCombat", "ActorDestroy"]
        );
        assert!(!normalizer.world().player_in_combat);
    }

    #[test]
    fn reconciles_target_position_before_the_cast_event() {
        let mut normalizer = engaged_normalizer();
        feed(
            &mut normalizer,
            &cast_result_line(5, ENEMY_ID, 0x7A2, PLAYER_ID, 0x40, Some((92.5, 101.0))),
        );

        let labels = labels(&normalizer);
        assert_eq!(&labels[labels.len() - 2..], ["ActorMove", "EventCast"]);
        assert_eq!(
            normalizer.world().find_actor(PLAYER_ID).map(|actor| actor.position),
            Some(Vec3::new(92.5, 0.0, 101.0))
        );
    }

    #[test]
    fn status_gain_and_loss_resolve_slots_from_world() {
        let mut normalizer = engaged_normalizer();
        let status_line = |code: &str, second: u32, status: u32| {
            format!(
                "{code}|{}|{status:X}|Status|15.00|{ENEMY_ID:08X}|Dummy|{PLAYER_ID:08X}|Player One|0A|",
                timestamp(second)
            )
        };

        feed(&mut normalizer, &status_line("26", 1, 0x100));
        feed(&mut normalizer, &status_line("26", 1, 0x101));
        let statuses = normalizer
            .world()
            .find_actor(PLAYER_ID)
            .map(|actor| actor.statuses)
            .expect("Expected player to exist");
        assert_eq!(statuses[0].id, 0x100);
        assert_eq!(statuses[1].id, 0x101);
        assert_eq!(statuses[1].extra, 0x0A);

        assert_eq!(
            feed(&mut normalizer, &status_line("30", 2, 0x999)),
            LineOutcome::Filtered
        );
        feed(&mut normalizer, &status_line("30", 2, 0x100));
        let statuses = normalizer
            .world()
            .find_actor(PLAYER_ID)
            .map(|actor| actor.statuses)
            .expect("Expected player to exist");
        assert!(statuses[0].is_empty());
        assert_eq!(statuses[1].id, 0x101);
    }

    #[test]
    fn clamps_backwards_timestamps() {
        let mut normalizer = engaged_normalizer();
        feed(&mut normalizer, &format!("01|{}|3E8", timestamp(30)));
        feed(&mut normalizer, &format!("01|{}|3E9", timestamp(10)));

        let operations = normalizer.operations();
        let last_two = &operations[operations.len() - 2..];
        assert_eq!(last_two[0].timestamp, last_two[1].timestamp);
        assert!(operations
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn non_spell_actions_and_icons_are_shifted_by_network_delta() {
        let mut normalizer = ActLogNormalizer::new(0x10);
        feed(
            &mut normalizer,
            &format!("27|{}|{PLAYER_ID:08X}|Player|0|0|00A0|0|0|0", timestamp(1)),
        );
        feed(
            &mut normalizer,
            &cast_result_line(2, PLAYER_ID, 0x0200_0110, 0xE000_0000, 1, None),
        );

        let kinds = normalizer
            .operations()
            .iter()
            .map(|operation| operation.kind.clone())
            .collect::<Vec<OperationKind>>();
        assert!(matches!(
            kinds[0],
            OperationKind::EventIcon { icon_id: 0x90, .. }
        ));
        let OperationKind::EventCast(result) = &kinds[1] else {
            panic!("Expected a cast event");
        };
        assert_eq!(result.action, ActionId::new(ActionType::Item, 0x100));
        assert!(result.targets.is_empty());
    }

    #[test]
    fn unknown_codes_are_reported_without_error() {
        let mut normalizer = ActLogNormalizer::new(0);
        assert_eq!(
            feed(&mut normalizer, &format!("251|{}|debug", timestamp(0))),
            LineOutcome::UnknownTag
        );
        assert!(normalizer.operations().is_empty());
    }
}
