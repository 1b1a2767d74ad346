use std::collections::BTreeMap;

use super::types::{AbilityId, ActorKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ActorDef {
    pub kind: ActorKind,
    pub speed_tiles_per_second: f32,
    pub melee_range: u32,
    /// Bound to ability slots 1..=6 in order.
    pub abilities: Vec<AbilityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityDef {
    pub id: AbilityId,
    /// Zero means the ability resolves without picking a tile.
    pub range_tiles: u32,
}

/// Static data lookup handed to the synchronizer and the input controller.
pub trait ActorStatsResolver {
    fn actor_def(&self, kind: ActorKind) -> Option<&ActorDef>;
    fn ability_def(&self, id: AbilityId) -> Option<&AbilityDef>;
}

impl<T: ActorStatsResolver + ?Sized> ActorStatsResolver for &T {
    fn actor_def(&self, kind: ActorKind) -> Option<&ActorDef> {
        (**self).actor_def(kind)
    }

    fn ability_def(&self, id: AbilityId) -> Option<&AbilityDef> {
        (**self).ability_def(id)
    }
}

#[derive(Debug, Default, Clone)]
pub struct DefDatabase {
    actor_defs: BTreeMap<ActorKind, ActorDef>,
    ability_defs: BTreeMap<AbilityId, AbilityDef>,
}

impl DefDatabase {
    /// Later entries replace earlier ones with the same key.
    pub fn from_defs(
        actor_defs: impl IntoIterator<Item = ActorDef>,
        ability_defs: impl IntoIterator<Item = AbilityDef>,
    ) -> Self {
        Self {
            actor_defs: actor_defs
                .into_iter()
                .map(|def| (def.kind, def))
                .collect(),
            ability_defs: ability_defs
                .into_iter()
                .map(|def| (def.id, def))
                .collect(),
        }
    }

    pub fn actor_defs(&self) -> impl Iterator<Item = &ActorDef> {
        self.actor_defs.values()
    }

    pub fn ability_defs(&self) -> impl Iterator<Item = &AbilityDef> {
        self.ability_defs.values()
    }

    pub fn missing_actor_kinds(&self) -> Vec<ActorKind> {
        ActorKind::ALL
            .into_iter()
            .filter(|kind| !self.actor_defs.contains_key(kind))
            .collect()
    }

    pub fn missing_abilities(&self) -> Vec<AbilityId> {
        AbilityId::ALL
            .into_iter()
            .filter(|id| !self.ability_defs.contains_key(id))
            .collect()
    }
}

impl ActorStatsResolver for DefDatabase {
    fn actor_def(&self, kind: ActorKind) -> Option<&ActorDef> {
        self.actor_defs.get(&kind)
    }

    fn ability_def(&self, id: AbilityId) -> Option<&AbilityDef> {
        self.ability_defs.get(&id)
    }
}
