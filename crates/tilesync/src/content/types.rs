use std::fmt;

/// Class or creature type of an actor, as named by the server's `kind` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActorKind {
    Warrior,
    Mage,
    Ranger,
    Rogue,
    Cleric,
    Paladin,
    Orc,
    Skeleton,
    Goblin,
    Wolf,
    Merchant,
    Spider,
    Ghost,
    Lich,
    Banker,
    Zombie,
    Troll,
    Bat,
    DarkKnight,
    Horse,
}

impl ActorKind {
    pub const ALL: [ActorKind; 20] = [
        ActorKind::Warrior,
        ActorKind::Mage,
        ActorKind::Ranger,
        ActorKind::Rogue,
        ActorKind::Cleric,
        ActorKind::Paladin,
        ActorKind::Orc,
        ActorKind::Skeleton,
        ActorKind::Goblin,
        ActorKind::Wolf,
        ActorKind::Merchant,
        ActorKind::Spider,
        ActorKind::Ghost,
        ActorKind::Lich,
        ActorKind::Banker,
        ActorKind::Zombie,
        ActorKind::Troll,
        ActorKind::Bat,
        ActorKind::DarkKnight,
        ActorKind::Horse,
    ];

    pub const fn token(self) -> &'static str {
        match self {
            ActorKind::Warrior => "warrior",
            ActorKind::Mage => "mage",
            ActorKind::Ranger => "ranger",
            ActorKind::Rogue => "rogue",
            ActorKind::Cleric => "cleric",
            ActorKind::Paladin => "paladin",
            ActorKind::Orc => "orc",
            ActorKind::Skeleton => "skeleton",
            ActorKind::Goblin => "goblin",
            ActorKind::Wolf => "wolf",
            ActorKind::Merchant => "merchant",
            ActorKind::Spider => "spider",
            ActorKind::Ghost => "ghost",
            ActorKind::Lich => "lich",
            ActorKind::Banker => "banker",
            ActorKind::Zombie => "zombie",
            ActorKind::Troll => "troll",
            ActorKind::Bat => "bat",
            ActorKind::DarkKnight => "dark_knight",
            ActorKind::Horse => "horse",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.token() == token)
    }

    pub const fn is_player_class(self) -> bool {
        matches!(
            self,
            ActorKind::Warrior
                | ActorKind::Mage
                | ActorKind::Ranger
                | ActorKind::Rogue
                | ActorKind::Cleric
                | ActorKind::Paladin
        )
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AbilityId {
    WarCry,
    ShieldBash,
    Whirlwind,
    BattleShout,
    Fireball,
    IceBolt,
    Thunderstorm,
    ManaShield,
    FrostNova,
    ArcaneSurge,
    MultiShot,
    PoisonArrow,
    Evasion,
    AimedShot,
    MarkTarget,
    Backstab,
    Stealth,
    Envenom,
    SmokeBomb,
    Hemorrhage,
    HolyStrike,
    Heal,
    DivineShield,
    HolyNova,
    Curse,
    Smite,
    Judgment,
    LayOnHands,
    Consecration,
    AuraOfProtection,
    HolyBolt,
}

impl AbilityId {
    pub const ALL: [AbilityId; 31] = [
        AbilityId::WarCry,
        AbilityId::ShieldBash,
        AbilityId::Whirlwind,
        AbilityId::BattleShout,
        AbilityId::Fireball,
        AbilityId::IceBolt,
        AbilityId::Thunderstorm,
        AbilityId::ManaShield,
        AbilityId::FrostNova,
        AbilityId::ArcaneSurge,
        AbilityId::MultiShot,
        AbilityId::PoisonArrow,
        AbilityId::Evasion,
        AbilityId::AimedShot,
        AbilityId::MarkTarget,
        AbilityId::Backstab,
        AbilityId::Stealth,
        AbilityId::Envenom,
        AbilityId::SmokeBomb,
        AbilityId::Hemorrhage,
        AbilityId::HolyStrike,
        AbilityId::Heal,
        AbilityId::DivineShield,
        AbilityId::HolyNova,
        AbilityId::Curse,
        AbilityId::Smite,
        AbilityId::Judgment,
        AbilityId::LayOnHands,
        AbilityId::Consecration,
        AbilityId::AuraOfProtection,
        AbilityId::HolyBolt,
    ];

    pub const fn token(self) -> &'static str {
        match self {
            AbilityId::WarCry => "war_cry",
            AbilityId::ShieldBash => "shield_bash",
            AbilityId::Whirlwind => "whirlwind",
            AbilityId::BattleShout => "battle_shout",
            AbilityId::Fireball => "fireball",
            AbilityId::IceBolt => "ice_bolt",
            AbilityId::Thunderstorm => "thunderstorm",
            AbilityId::ManaShield => "mana_shield",
            AbilityId::FrostNova => "frost_nova",
            AbilityId::ArcaneSurge => "arcane_surge",
            AbilityId::MultiShot => "multi_shot",
            AbilityId::PoisonArrow => "poison_arrow",
            AbilityId::Evasion => "evasion",
            AbilityId::AimedShot => "aimed_shot",
            AbilityId::MarkTarget => "mark_target",
            AbilityId::Backstab => "backstab",
            AbilityId::Stealth => "stealth",
            AbilityId::Envenom => "envenom",
            AbilityId::SmokeBomb => "smoke_bomb",
            AbilityId::Hemorrhage => "hemorrhage",
            AbilityId::HolyStrike => "holy_strike",
            AbilityId::Heal => "heal",
            AbilityId::DivineShield => "divine_shield",
            AbilityId::HolyNova => "holy_nova",
            AbilityId::Curse => "curse",
            AbilityId::Smite => "smite",
            AbilityId::Judgment => "judgment",
            AbilityId::LayOnHands => "lay_on_hands",
            AbilityId::Consecration => "consecration",
            AbilityId::AuraOfProtection => "aura_of_protection",
            AbilityId::HolyBolt => "holy_bolt",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ability| ability.token() == token)
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn actor_tokens_are_unique_and_round_trip() {
        let tokens = ActorKind::ALL
            .iter()
            .map(|kind| kind.token())
            .collect::<HashSet<_>>();
        assert_eq!(tokens.len(), ActorKind::ALL.len());
        assert_eq!(ActorKind::from_token("dark_knight"), Some(ActorKind::DarkKnight));
        assert_eq!(ActorKind::from_token("dragon"), None);
    }

    #[test]
    fn ability_tokens_are_unique() {
        let tokens = AbilityId::ALL
            .iter()
            .map(|ability| ability.token())
            .collect::<HashSet<_>>();
        assert_eq!(tokens.len(), AbilityId::ALL.len());
        assert_eq!(AbilityId::from_token("lay_on_hands"), Some(AbilityId::LayOnHands));
    }

    #[test]
    fn only_six_kinds_are_player_classes() {
        let classes = ActorKind::ALL
            .iter()
            .filter(|kind| kind.is_player_class())
            .count();
        assert_eq!(classes, 6);
    }
}
