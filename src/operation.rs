use chrono::{DateTime, Utc};
use glam::Vec3;

use crate::world_state::{
    Actor, ActorRole, CastInfo, CastResult, Status, TetherInfo, Waymark, WorldEvent, WorldState,
};

/// A single timestamped mutation of the world.
///
/// Stateful kinds keep a `prev` slot that `redo` fills with whatever it
/// overwrote; it stays `None` until the first `redo`, and also when `redo`
/// found no actor to touch, in which case `undo` does nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub timestamp: DateTime<Utc>,
    pub kind: OperationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    ZoneChange {
        zone: u16,
        prev: Option<u16>,
    },
    EnterExitCombat {
        value: bool,
        prev: Option<bool>,
    },
    PlayerIdChange {
        value: u32,
        prev: Option<u32>,
    },
    WaymarkChange {
        waymark: Waymark,
        position: Option<Vec3>,
        prev: Option<Option<Vec3>>,
    },
    ActorCreate {
        actor: Box<Actor>,
        prev: Option<Option<Box<Actor>>>,
    },
    ActorDestroy {
        instance_id: u32,
        prev: Option<Box<Actor>>,
    },
    ActorRename {
        instance_id: u32,
        name: String,
        prev: Option<String>,
    },
    ActorClassChange {
        instance_id: u32,
        class_id: u32,
        role: ActorRole,
        prev: Option<(u32, ActorRole)>,
    },
    ActorMove {
        instance_id: u32,
        position: Vec3,
        rotation: f32,
        prev: Option<(Vec3, f32)>,
    },
    ActorTargetable {
        instance_id: u32,
        value: bool,
        prev: Option<bool>,
    },
    ActorDead {
        instance_id: u32,
        value: bool,
        prev: Option<bool>,
    },
    ActorTarget {
        instance_id: u32,
        target_id: u32,
        prev: Option<u32>,
    },
    ActorCast {
        instance_id: u32,
        value: Option<CastInfo>,
        prev: Option<Option<CastInfo>>,
    },
    ActorTether {
        instance_id: u32,
        value: TetherInfo,
        prev: Option<TetherInfo>,
    },
    ActorStatus {
        instance_id: u32,
        index: usize,
        value: Status,
        prev: Option<Status>,
    },
    EventIcon {
        instance_id: u32,
        icon_id: u32,
    },
    EventCast(CastResult),
    EventEnvControl {
        feature_id: u32,
        index: u8,
        state: u32,
    },
}

impl OperationKind {
    pub fn zone_change(zone: u16) -> Self {
        Self::ZoneChange { zone, prev: None }
    }

    pub fn enter_exit_combat(value: bool) -> Self {
        Self::EnterExitCombat { value, prev: None }
    }

    pub fn player_id_change(value: u32) -> Self {
        Self::PlayerIdChange { value, prev: None }
    }

    pub fn waymark_change(waymark: Waymark, position: Option<Vec3>) -> Self {
        Self::WaymarkChange {
            waymark,
            position,
            prev: None,
        }
    }

    pub fn actor_create(actor: Actor) -> Self {
        Self::ActorCreate {
            actor: Box::new(actor),
            prev: None,
        }
    }

    pub fn actor_destroy(instance_id: u32) -> Self {
        Self::ActorDestroy {
            instance_id,
            prev: None,
        }
    }

    pub fn actor_rename(instance_id: u32, name: String) -> Self {
        Self::ActorRename {
            instance_id,
            name,
            prev: None,
        }
    }

    pub fn actor_class_change(instance_id: u32, class_id: u32, role: ActorRole) -> Self {
        Self::ActorClassChange {
            instance_id,
            class_id,
            role,
            prev: None,
        }
    }

    pub fn actor_move(instance_id: u32, position: Vec3, rotation: f32) -> Self {
        Self::ActorMove {
            instance_id,
            position,
            rotation,
            prev: None,
        }
    }

    pub fn actor_targetable(instance_id: u32, value: bool) -> Self {
        Self::ActorTargetable {
            instance_id,
            value,
            prev: None,
        }
    }

    pub fn actor_dead(instance_id: u32, value: bool) -> Self {
        Self::ActorDead {
            instance_id,
            value,
            prev: None,
        }
    }

    pub fn actor_target(instance_id: u32, target_id: u32) -> Self {
        Self::ActorTarget {
            instance_id,
            target_id,
            prev: None,
        }
    }

    pub fn actor_cast(instance_id: u32, value: Option<CastInfo>) -> Self {
        Self::ActorCast {
            instance_id,
            value,
            prev: None,
        }
    }

    pub fn actor_tether(instance_id: u32, value: TetherInfo) -> Self {
        Self::ActorTether {
            instance_id,
            value,
            prev: None,
        }
    }

    pub fn actor_status(instance_id: u32, index: usize, value: Status) -> Self {
        Self::ActorStatus {
            instance_id,
            index,
            value,
            prev: None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ZoneChange { .. } => "ZoneChange",
            Self::EnterExitCombat { .. } => "EnterExitCombat",
            Self::PlayerIdChange { .. } => "PlayerIdChange",
            Self::WaymarkChange { .. } => "WaymarkChange",
            Self::ActorCreate { .. } => "ActorCreate",
            Self::ActorDestroy { .. } => "ActorDestroy",
            Self::ActorRename { .. } => "ActorRename",
            Self::ActorClassChange { .. } => "ActorClassChange",
            Self::ActorMove { .. } => "ActorMove",
            Self::ActorTargetable { .. } => "ActorTargetable",
            Self::ActorDead { .. } => "ActorDead",
            Self::ActorTarget { .. } => "ActorTarget",
            Self::ActorCast { .. } => "ActorCast",
            Self::ActorTether { .. } => "ActorTether",
            Self::ActorStatus { .. } => "ActorStatus",
            Self::EventIcon { .. } => "EventIcon",
            Self::EventCast(_) => "EventCast",
            Self::EventEnvControl { .. } => "EventEnvControl",
        }
    }
}

impl Operation {
    pub fn new(timestamp: DateTime<Utc>, kind: OperationKind) -> Self {
        Self { timestamp, kind }
    }

    pub fn redo(&mut self, world: &mut WorldState) {
        match &mut self.kind {
            OperationKind::ZoneChange { zone, prev } => {
                *prev = Some(world.current_zone);
                world.current_zone = *zone;
            }
            OperationKind::EnterExitCombat { value, prev } => {
                *prev = Some(world.player_in_combat);
                world.player_in_combat = *value;
            }
            OperationKind::PlayerIdChange { value, prev } => {
                *prev = Some(world.player_actor_id);
                world.player_actor_id = *value;
            }
            OperationKind::WaymarkChange {
                waymark,
                position,
                prev,
            } => {
                *prev = Some(world.waymark(*waymark));
                world.set_waymark(*waymark, *position);
            }
            OperationKind::ActorCreate { actor, prev } => {
                let displaced = world.add_actor((**actor).clone());
                *prev = Some(displaced.map(Box::new));
            }
            OperationKind::ActorDestroy { instance_id, prev } => {
                *prev = world.remove_actor(*instance_id).map(Box::new);
            }
            OperationKind::ActorRename {
                instance_id,
                name,
                prev,
            } => {
                *prev = world
                    .find_actor_mut(*instance_id)
                    .map(|actor| std::mem::replace(&mut actor.name, name.clone()));
            }
            OperationKind::ActorClassChange {
                instance_id,
                class_id,
                role,
                prev,
            } => {
                *prev = world.find_actor_mut(*instance_id).map(|actor| {
                    let previous = (actor.class_id, actor.role);
                    actor.class_id = *class_id;
                    actor.role = *role;
                    previous
                });
            }
            OperationKind::ActorMove {
                instance_id,
                position,
                rotation,
                prev,
            } => {
                *prev = world.find_actor_mut(*instance_id).map(|actor| {
                    let previous = (actor.position, actor.rotation);
                    actor.position = *position;
                    actor.rotation = *rotation;
                    previous
                });
            }
            OperationKind::ActorTargetable {
                instance_id,
                value,
                prev,
            } => {
                *prev = world
                    .find_actor_mut(*instance_id)
                    .map(|actor| std::mem::replace(&mut actor.is_targetable, *value));
            }
            OperationKind::ActorDead {
                instance_id,
                value,
                prev,
            } => {
                *prev = world
                    .find_actor_mut(*instance_id)
                    .map(|actor| std::mem::replace(&mut actor.is_dead, *value));
            }
            OperationKind::ActorTarget {
                instance_id,
                target_id,
                prev,
            } => {
                *prev = world
                    .find_actor_mut(*instance_id)
                    .map(|actor| std::mem::replace(&mut actor.target_id, *target_id));
            }
            OperationKind::ActorCast {
                instance_id,
                value,
                prev,
            } => {
                *prev = world
                    .find_actor_mut(*instance_id)
                    .map(|actor| std::mem::replace(&mut actor.cast_info, *value));
            }
            OperationKind::ActorTether {
                instance_id,
                value,
                prev,
            } => {
                *prev = world
                    .find_actor_mut(*instance_id)
                    .map(|actor| std::mem::replace(&mut actor.tether, *value));
            }
            OperationKind::ActorStatus {
                instance_id,
                index,
                value,
                prev,
            } => {
                *prev = world
                    .find_actor_mut(*instance_id)
                    .and_then(|actor| actor.statuses.get_mut(*index))
                    .map(|slot| std::mem::replace(slot, *value));
            }
            OperationKind::EventIcon {
                instance_id,
                icon_id,
            } => world.dispatch(&WorldEvent::Icon {
                actor_id: *instance_id,
                icon_id: *icon_id,
            }),
            OperationKind::EventCast(result) => world.dispatch(&WorldEvent::Cast(result.clone())),
            OperationKind::EventEnvControl {
                feature_id,
                index,
                state,
            } => world.dispatch(&WorldEvent::EnvControl {
                feature_id: *feature_id,
                index: *index,
                state: *state,
            }),
        }
    }

    pub fn undo(&self, world: &mut WorldState) {
        match &self.kind {
            OperationKind::ZoneChange { prev, .. } => {
                if let Some(prev) = prev {
                    world.current_zone = *prev;
                }
            }
            OperationKind::EnterExitCombat { prev, .. } => {
                if let Some(prev) = prev {
                    world.player_in_combat = *prev;
                }
            }
            OperationKind::PlayerIdChange { prev, .. } => {
                if let Some(prev) = prev {
                    world.player_actor_id = *prev;
                }
            }
            OperationKind::WaymarkChange { waymark, prev, .. } => {
                if let Some(prev) = prev {
                    world.set_waymark(*waymark, *prev);
                }
            }
            OperationKind::ActorCreate { actor, prev } => {
                let Some(displaced) = prev else {
                    return;
                };
                world.remove_actor(actor.instance_id);
                if let Some(displaced) = displaced {
                    world.add_actor((**displaced).clone());
                }
            }
            OperationKind::ActorDestroy { prev, .. } => {
                if let Some(actor) = prev {
                    world.add_actor((**actor).clone());
                }
            }
            OperationKind::ActorRename {
                instance_id, prev, ..
            } => {
                if let (Some(prev), Some(actor)) = (prev, world.find_actor_mut(*instance_id)) {
                    actor.name = prev.clone();
                }
            }
            OperationKind::ActorClassChange {
                instance_id, prev, ..
            } => {
                if let (Some((class_id, role)), Some(actor)) =
                    (prev, world.find_actor_mut(*instance_id))
                {
                    actor.class_id = *class_id;
                    actor.role = *role;
                }
            }
            OperationKind::ActorMove {
                instance_id, prev, ..
            } => {
                if let (Some((position, rotation)), Some(actor)) =
                    (prev, world.find_actor_mut(*instance_id))
                {
                    actor.position = *position;
                    actor.rotation = *rotation;
                }
            }
            OperationKind::ActorTargetable {
                instance_id, prev, ..
            } => {
                if let (Some(prev), Some(actor)) = (prev, world.find_actor_mut(*instance_id)) {
                    actor.is_targetable = *prev;
                }
            }
            OperationKind::ActorDead {
                instance_id, prev, ..
            } => {
                if let (Some(prev), Some(actor)) = (prev, world.find_actor_mut(*instance_id)) {
                    actor.is_dead = *prev;
                }
            }
            OperationKind::ActorTarget {
                instance_id, prev, ..
            } => {
                if let (Some(prev), Some(actor)) = (prev, world.find_actor_mut(*instance_id)) {
                    actor.target_id = *prev;
                }
            }
            OperationKind::ActorCast {
                instance_id, prev, ..
            } => {
                if let (Some(prev), Some(actor)) = (prev, world.find_actor_mut(*instance_id)) {
                    actor.cast_info = *prev;
                }
            }
            OperationKind::ActorTether {
                instance_id, prev, ..
            } => {
                if let (Some(prev), Some(actor)) = (prev, world.find_actor_mut(*instance_id)) {
                    actor.tether = *prev;
                }
            }
            OperationKind::ActorStatus {
                instance_id,
                index,
                prev,
                ..
            } => {
                let Some(prev) = prev else {
                    return;
                };
                if let Some(slot) = world
                    .find_actor_mut(*instance_id)
                    .and_then(|actor| actor.statuses.get_mut(*index))
                {
                    *slot = *prev;
                }
            }
            OperationKind::EventIcon { .. }
            | OperationKind::EventCast(_)
            | OperationKind::EventEnvControl { .. } => {}
        }
    }
}
