mod compiler;
mod database;
mod types;

pub use compiler::{
    compile_def_database, ContentCompileError, ContentErrorCode, SourceLocation,
    MAX_ABILITY_SLOTS,
};
pub use database::{AbilityDef, ActorDef, ActorStatsResolver, DefDatabase};
pub use types::{AbilityId, ActorKind};
