use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const NUM_STATUS_SLOTS: usize = 30;
pub const NUM_TARGET_EFFECTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActorType {
    #[default]
    None,
    Player,
    Pet,
    Chocobo,
    Enemy,
    EventNpc,
    EventObj,
    Area,
}

impl ActorType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "None" => Some(Self::None),
            "Player" => Some(Self::Player),
            "Pet" => Some(Self::Pet),
            "Chocobo" => Some(Self::Chocobo),
            "Enemy" => Some(Self::Enemy),
            "EventNpc" => Some(Self::EventNpc),
            "EventObj" => Some(Self::EventObj),
            "Area" => Some(Self::Area),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActorRole {
    #[default]
    None,
    Tank,
    Healer,
    Melee,
    Ranged,
}

impl ActorRole {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "None" => Some(Self::None),
            "Tank" => Some(Self::Tank),
            "Healer" => Some(Self::Healer),
            "Melee" => Some(Self::Melee),
            "Ranged" => Some(Self::Ranged),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ActionType {
    #[default]
    None,
    Spell,
    Item,
    KeyItem,
    Ability,
    General,
    Buddy,
    MainCommand,
    Companion,
    CraftAction,
    PetAction,
    Mount,
    PvPAction,
    Waymark,
    Other(u8),
}

impl ActionType {
    /// Maps the type byte stored in the top 8 bits of a network action id.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Spell,
            2 => Self::Item,
            3 => Self::KeyItem,
            4 => Self::Ability,
            5 => Self::General,
            6 => Self::Buddy,
            7 => Self::MainCommand,
            8 => Self::Companion,
            9 => Self::CraftAction,
            11 => Self::PetAction,
            13 => Self::Mount,
            14 => Self::PvPAction,
            15 => Self::Waymark,
            other => Self::Other(other),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "None" => Some(Self::None),
            "Spell" => Some(Self::Spell),
            "Item" => Some(Self::Item),
            "KeyItem" => Some(Self::KeyItem),
            "Ability" => Some(Self::Ability),
            "General" => Some(Self::General),
            "Buddy" => Some(Self::Buddy),
            "MainCommand" => Some(Self::MainCommand),
            "Companion" => Some(Self::Companion),
            "CraftAction" => Some(Self::CraftAction),
            "PetAction" => Some(Self::PetAction),
            "Mount" => Some(Self::Mount),
            "PvPAction" => Some(Self::PvPAction),
            "Waymark" => Some(Self::Waymark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ActionId {
    pub action_type: ActionType,
    pub id: u32,
}

impl ActionId {
    pub fn new(action_type: ActionType, id: u32) -> Self {
        Self { action_type, id }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.action_type, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Waymark {
    A,
    B,
    C,
    D,
    N1,
    N2,
    N3,
    N4,
}

impl Waymark {
    pub const COUNT: usize = 8;

    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::A),
            1 => Some(Self::B),
            2 => Some(Self::C),
            3 => Some(Self::D),
            4 => Some(Self::N1),
            5 => Some(Self::N2),
            6 => Some(Self::N3),
            7 => Some(Self::N4),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            "N1" => Some(Self::N1),
            "N2" => Some(Self::N2),
            "N3" => Some(Self::N3),
            "N4" => Some(Self::N4),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CastInfo {
    pub action: ActionId,
    pub target_id: u32,
    pub location: Vec3,
    pub current_time: f32,
    pub total_time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TetherInfo {
    pub id: u32,
    pub target: u32,
}

/// One status slot; `id == 0` marks the slot as empty.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Status {
    pub id: u32,
    pub extra: u16,
    pub remaining_time: f32,
    pub source_id: u32,
}

impl Status {
    pub fn is_empty(&self) -> bool {
        self.id == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastTarget {
    pub id: u32,
    pub effects: [u64; NUM_TARGET_EFFECTS],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CastResult {
    pub caster_id: u32,
    pub action: ActionId,
    pub main_target_id: u32,
    pub animation_lock_time: f32,
    pub max_targets: u32,
    pub source_sequence: u32,
    pub targets: Vec<CastTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub instance_id: u32,
    pub oid: u32,
    pub name: String,
    pub actor_type: ActorType,
    pub class_id: u32,
    pub role: ActorRole,
    pub position: Vec3,
    pub rotation: f32,
    pub hitbox_radius: f32,
    pub is_targetable: bool,
    pub is_dead: bool,
    pub target_id: u32,
    pub cast_info: Option<CastInfo>,
    pub tether: TetherInfo,
    pub statuses: [Status; NUM_STATUS_SLOTS],
}

impl Actor {
    pub fn new(instance_id: u32, oid: u32, name: String, actor_type: ActorType) -> Self {
        Self {
            instance_id,
            oid,
            name,
            actor_type,
            class_id: 0,
            role: ActorRole::None,
            position: Vec3::ZERO,
            rotation: 0.0,
            hitbox_radius: 0.0,
            is_targetable: false,
            is_dead: false,
            target_id: 0,
            cast_info: None,
            tether: TetherInfo::default(),
            statuses: [Status::default(); NUM_STATUS_SLOTS],
        }
    }

    pub fn find_status_slot(&self, status_id: u32, source_id: u32) -> Option<usize> {
        self.statuses
            .iter()
            .position(|status| status.id == status_id && status.source_id == source_id)
    }

    pub fn first_empty_status_slot(&self) -> Option<usize> {
        self.statuses.iter().position(Status::is_empty)
    }
}

/// Notifications for events that leave no persistent trace in the world.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Icon { actor_id: u32, icon_id: u32 },
    Cast(CastResult),
    EnvControl { feature_id: u32, index: u8, state: u32 },
}

pub type WorldEventListener = Box<dyn FnMut(&WorldEvent)>;

#[derive(Default)]
pub struct WorldState {
    pub current_zone: u16,
    pub player_in_combat: bool,
    pub player_actor_id: u32,
    waymarks: [Option<Vec3>; Waymark::COUNT],
    actors: BTreeMap<u32, Actor>,
    listeners: Vec<WorldEventListener>,
}

impl fmt::Debug for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldState")
            .field("current_zone", &self.current_zone)
            .field("player_in_combat", &self.player_in_combat)
            .field("player_actor_id", &self.player_actor_id)
            .field("waymarks", &self.waymarks)
            .field("actors", &self.actors.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waymark(&self, waymark: Waymark) -> Option<Vec3> {
        self.waymarks[waymark.index()]
    }

    pub fn set_waymark(&mut self, waymark: Waymark, position: Option<Vec3>) {
        self.waymarks[waymark.index()] = position;
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn find_actor(&self, instance_id: u32) -> Option<&Actor> {
        self.actors.get(&instance_id)
    }

    pub fn find_actor_mut(&mut self, instance_id: u32) -> Option<&mut Actor> {
        self.actors.get_mut(&instance_id)
    }

    pub fn add_actor(&mut self, actor: Actor) -> Option<Actor> {
        self.actors.insert(actor.instance_id, actor)
    }

    pub fn remove_actor(&mut self, instance_id: u32) -> Option<Actor> {
        self.actors.remove(&instance_id)
    }

    pub fn subscribe(&mut self, listener: WorldEventListener) {
        self.listeners.push(listener);
    }

    pub fn dispatch(&mut self, event: &WorldEvent) {
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }
}
