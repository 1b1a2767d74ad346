use tilesync::{ActorKind, Direction, InputAction, TilePos};

pub(crate) const LOCAL_SESSION: &str = "local-player";
pub(crate) const LOCAL_KIND: ActorKind = ActorKind::Ranger;
pub(crate) const LOCAL_SPAWN: TilePos = TilePos::new(3, 3);

pub(crate) const GUARD: &str = "npc-guard";
pub(crate) const MERCHANT: &str = "npc-merchant";
pub(crate) const BAT: &str = "npc-bat";

pub(crate) const MAP_ROWS: [&str; 15] = [
    "####################",
    "#..................#",
    "#..................#",
    "#..................#",
    "#..................#",
    "#..................#",
    "#..................#",
    "#..................#",
    "#..................#",
    "#..................#",
    "#..................#",
    "#..................#",
    "#..................#",
    "#..................#",
    "####################",
];

pub(crate) fn guard_route() -> Vec<TilePos> {
    vec![
        TilePos::new(12, 9),
        TilePos::new(12, 10),
        TilePos::new(12, 11),
        TilePos::new(12, 10),
    ]
}

pub(crate) const MERCHANT_TILE: TilePos = TilePos::new(5, 8);
pub(crate) const BAT_TILE: TilePos = TilePos::new(12, 3);
pub(crate) const BAT_TELEPORT_TILE: TilePos = TilePos::new(16, 12);

/// Server-side changes the script forces at a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorldEvent {
    Teleport(&'static str, TilePos),
    Despawn(&'static str),
    SetLocalStunned(bool),
}

/// What the scripted player does on one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ScriptedFrame {
    pub(crate) hold: Option<Direction>,
    pub(crate) press: Option<InputAction>,
    /// Primary click on the tile currently held by this entity.
    pub(crate) click_entity: Option<&'static str>,
    pub(crate) secondary_click: bool,
    pub(crate) world: Option<WorldEvent>,
}

pub(crate) fn scripted_frame(frame: u32) -> ScriptedFrame {
    let hold = match frame {
        0..=59 => Some(Direction::Right),
        60..=119 => Some(Direction::Down),
        160..=259 => Some(Direction::Left),
        420..=480 => Some(Direction::Up),
        _ => None,
    };
    let mut step = ScriptedFrame {
        hold,
        ..ScriptedFrame::default()
    };
    match frame {
        130 => step.press = Some(InputAction::Attack),
        132 => step.click_entity = Some(GUARD),
        150 => step.press = Some(InputAction::Ability1),
        152 => step.secondary_click = true,
        250 => step.world = Some(WorldEvent::Teleport(BAT, BAT_TELEPORT_TILE)),
        300 => step.press = Some(InputAction::Ability3),
        320 => step.click_entity = Some(MERCHANT),
        400 => step.world = Some(WorldEvent::Despawn(BAT)),
        500 => step.press = Some(InputAction::Ability2),
        505 => step.world = Some(WorldEvent::SetLocalStunned(true)),
        520 => step.world = Some(WorldEvent::SetLocalStunned(false)),
        _ => {}
    }
    step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_rows_share_one_width() {
        assert!(MAP_ROWS.iter().all(|row| row.len() == MAP_ROWS[0].len()));
    }

    #[test]
    fn walks_and_actions_never_overlap() {
        for frame in 0..600 {
            let step = scripted_frame(frame);
            if step.hold.is_some() {
                assert_eq!(step.press, None, "frame {frame}");
                assert_eq!(step.click_entity, None, "frame {frame}");
            }
        }
    }

    #[test]
    fn targeting_is_opened_before_it_is_resolved() {
        assert_eq!(scripted_frame(130).press, Some(InputAction::Attack));
        assert_eq!(scripted_frame(132).click_entity, Some(GUARD));
        assert_eq!(scripted_frame(150).press, Some(InputAction::Ability1));
        assert!(scripted_frame(152).secondary_click);
    }
}
