use std::collections::HashMap;

use glam::Vec3;

use super::fields::{
    action, actor_id, boolean, dec_u16, dec_u32, degrees_to_radians, field, float, hex_u16,
    hex_u32, hex_u8, named, vec3, FieldError,
};
use crate::operation::OperationKind;
use crate::world_state::{
    Actor, ActorRole, ActorType, CastInfo, CastResult, CastTarget, Status, TetherInfo, Waymark,
    NUM_STATUS_SLOTS, NUM_TARGET_EFFECTS,
};

pub(crate) type NativeDecoder = fn(&[&str]) -> Result<Option<OperationKind>, FieldError>;

lazy_static::lazy_static! {
    static ref NATIVE_DECODERS: HashMap<&'static str, NativeDecoder> = {
        let mut decoders: HashMap<&'static str, NativeDecoder> = HashMap::new();
        decoders.insert("ZONE", decode_zone_change);
        decoders.insert("PCOM", decode_enter_exit_combat);
        decoders.insert("PID ", decode_player_id_change);
        decoders.insert("WAY+", |fields| decode_waymark_change(fields, true));
        decoders.insert("WAY-", |fields| decode_waymark_change(fields, false));
        decoders.insert("ACT+", decode_actor_create);
        decoders.insert("ACT-", decode_actor_destroy);
        decoders.insert("NAME", decode_actor_rename);
        decoders.insert("CLSR", decode_actor_class_change);
        decoders.insert("MOVE", decode_actor_move);
        decoders.insert("ATG+", |fields| decode_actor_targetable(fields, true));
        decoders.insert("ATG-", |fields| decode_actor_targetable(fields, false));
        decoders.insert("DIE+", |fields| decode_actor_dead(fields, true));
        decoders.insert("DIE-", |fields| decode_actor_dead(fields, false));
        decoders.insert("TARG", decode_actor_target);
        decoders.insert("CST+", |fields| decode_actor_cast(fields, true));
        decoders.insert("CST-", |fields| decode_actor_cast(fields, false));
        decoders.insert("TET+", |fields| decode_actor_tether(fields, true));
        decoders.insert("TET-", |fields| decode_actor_tether(fields, false));
        decoders.insert("STA+", |fields| decode_actor_status(fields, true));
        decoders.insert("STA-", |fields| decode_actor_status(fields, false));
        decoders.insert("STA!", |fields| decode_actor_status(fields, true));
        decoders.insert("ICON", decode_event_icon);
        decoders.insert("CST!", decode_event_cast);
        decoders.insert("ENVC", decode_event_env_control);
        decoders
    };
}

pub(crate) fn native_decoder(tag: &str) -> Option<NativeDecoder> {
    NATIVE_DECODERS.get(tag).copied()
}

struct ActorIdentity {
    instance_id: u32,
    oid: u32,
    name: String,
    actor_type: ActorType,
    position: Vec3,
    rotation: f32,
}

/// Decodes `instanceId/oid/name/type/x/y/z/rotationDegrees`.
fn actor_identity(fields: &[&str], index: usize) -> Result<ActorIdentity, FieldError> {
    let composite = field(fields, index)?;
    let parts = composite.split('/').collect::<Vec<&str>>();
    if parts.len() < 8 {
        return Err(FieldError::BadComposite {
            index,
            value: composite.to_string(),
        });
    }

    Ok(ActorIdentity {
        instance_id: hex_u32(&parts, 0)?,
        oid: hex_u32(&parts, 1)?,
        name: parts[2].to_string(),
        actor_type: named(&parts, 3, "actor type", ActorType::from_name)?,
        position: Vec3::new(float(&parts, 4)?, float(&parts, 5)?, float(&parts, 6)?),
        rotation: degrees_to_radians(float(&parts, 7)?),
    })
}

fn decode_zone_change(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    Ok(Some(OperationKind::zone_change(dec_u16(fields, 2)?)))
}

fn decode_enter_exit_combat(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    Ok(Some(OperationKind::enter_exit_combat(boolean(fields, 2)?)))
}

fn decode_player_id_change(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    Ok(Some(OperationKind::player_id_change(actor_id(fields, 2)?)))
}

fn decode_waymark_change(
    fields: &[&str],
    set: bool,
) -> Result<Option<OperationKind>, FieldError> {
    let waymark = named(fields, 2, "waymark", Waymark::from_name)?;
    let position = if set { Some(vec3(fields, 3)?) } else { None };
    Ok(Some(OperationKind::waymark_change(waymark, position)))
}

fn decode_actor_create(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    let identity = actor_identity(fields, 2)?;
    let mut actor = Actor::new(
        identity.instance_id,
        identity.oid,
        identity.name,
        identity.actor_type,
    );
    actor.class_id = dec_u32(fields, 3)?;
    actor.role = named(fields, 4, "actor role", ActorRole::from_name)?;
    actor.is_targetable = boolean(fields, 5)?;
    actor.hitbox_radius = float(fields, 6)?;
    actor.position = identity.position;
    actor.rotation = identity.rotation;
    Ok(Some(OperationKind::actor_create(actor)))
}

fn decode_actor_destroy(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    Ok(Some(OperationKind::actor_destroy(actor_id(fields, 2)?)))
}

fn decode_actor_rename(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    let identity = actor_identity(fields, 2)?;
    Ok(Some(OperationKind::actor_rename(
        identity.instance_id,
        identity.name,
    )))
}

fn decode_actor_class_change(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    let instance_id = actor_id(fields, 2)?;
    let class_id = dec_u32(fields, 5)?;
    let role = named(fields, 6, "actor role", ActorRole::from_name)?;
    Ok(Some(OperationKind::actor_class_change(
        instance_id,
        class_id,
        role,
    )))
}

fn decode_actor_move(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    let identity = actor_identity(fields, 2)?;
    Ok(Some(OperationKind::actor_move(
        identity.instance_id,
        identity.position,
        identity.rotation,
    )))
}

fn decode_actor_targetable(
    fields: &[&str],
    targetable: bool,
) -> Result<Option<OperationKind>, FieldError> {
    Ok(Some(OperationKind::actor_targetable(
        actor_id(fields, 2)?,
        targetable,
    )))
}

fn decode_actor_dead(fields: &[&str], dead: bool) -> Result<Option<OperationKind>, FieldError> {
    Ok(Some(OperationKind::actor_dead(actor_id(fields, 2)?, dead)))
}

fn decode_actor_target(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    Ok(Some(OperationKind::actor_target(
        actor_id(fields, 2)?,
        actor_id(fields, 3)?,
    )))
}

fn decode_actor_cast(fields: &[&str], start: bool) -> Result<Option<OperationKind>, FieldError> {
    let instance_id = actor_id(fields, 2)?;
    if !start {
        return Ok(Some(OperationKind::actor_cast(instance_id, None)));
    }

    let timing = field(fields, 6)?.split('/').collect::<Vec<&str>>();
    let cast = CastInfo {
        action: action(fields, 3)?,
        target_id: actor_id(fields, 4)?,
        location: vec3(fields, 5)?,
        current_time: float(&timing, 0)?,
        total_time: float(&timing, 1)?,
    };
    Ok(Some(OperationKind::actor_cast(instance_id, Some(cast))))
}

fn decode_actor_tether(fields: &[&str], tether: bool) -> Result<Option<OperationKind>, FieldError> {
    let instance_id = actor_id(fields, 2)?;
    let value = if tether {
        TetherInfo {
            id: dec_u32(fields, 3)?,
            target: actor_id(fields, 4)?,
        }
    } else {
        TetherInfo::default()
    };
    Ok(Some(OperationKind::actor_tether(instance_id, value)))
}

fn decode_actor_status(fields: &[&str], gain: bool) -> Result<Option<OperationKind>, FieldError> {
    let instance_id = actor_id(fields, 2)?;
    let index = dec_u32(fields, 3)? as usize;
    if index >= NUM_STATUS_SLOTS {
        return Err(FieldError::BadInteger {
            index: 3,
            value: index.to_string(),
        });
    }

    let value = if gain {
        // status id may be followed by its display name
        let status_field = field(fields, 4)?;
        let status_id = status_field.split(' ').collect::<Vec<&str>>();
        Status {
            id: dec_u32(&status_id, 0).map_err(|_| FieldError::BadInteger {
                index: 4,
                value: status_field.to_string(),
            })?,
            extra: hex_u16(fields, 5)?,
            remaining_time: float(fields, 6)?,
            source_id: actor_id(fields, 7)?,
        }
    } else {
        Status::default()
    };
    Ok(Some(OperationKind::actor_status(instance_id, index, value)))
}

fn decode_event_icon(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    Ok(Some(OperationKind::EventIcon {
        instance_id: actor_id(fields, 2)?,
        icon_id: dec_u32(fields, 3)?,
    }))
}

fn decode_event_cast(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    let mut result = CastResult {
        caster_id: actor_id(fields, 2)?,
        action: action(fields, 3)?,
        main_target_id: actor_id(fields, 4)?,
        animation_lock_time: float(fields, 5)?,
        max_targets: dec_u32(fields, 6)?,
        ..CastResult::default()
    };

    for index in 7..fields.len() {
        let parts = fields[index].split('!').collect::<Vec<&str>>();
        let mut target = CastTarget {
            id: actor_id(&parts, 0).map_err(|_| FieldError::BadComposite {
                index,
                value: fields[index].to_string(),
            })?,
            ..CastTarget::default()
        };
        for (slot, effect) in parts.iter().skip(1).take(NUM_TARGET_EFFECTS).enumerate() {
            target.effects[slot] = u64::from_str_radix(effect.trim(), 16).map_err(|_| {
                FieldError::BadComposite {
                    index,
                    value: fields[index].to_string(),
                }
            })?;
        }
        result.targets.push(target);
    }

    Ok(Some(OperationKind::EventCast(result)))
}

fn decode_event_env_control(fields: &[&str]) -> Result<Option<OperationKind>, FieldError> {
    Ok(Some(OperationKind::EventEnvControl {
        feature_id: hex_u32(fields, 2)?,
        index: hex_u8(fields, 3)?,
        state: hex_u32(fields, 4)?,
    }))
}
