pub mod log_parsing;
pub mod operation;
pub mod replay;
pub mod settings;
pub mod world_state;

use std::path::Path;

pub use log_parsing::{parse_log, FieldError, ParseStats, ParsedLog};
pub use operation::{Operation, OperationKind};
pub use replay::{build_replay, Replay, ReplayPlayer, ReplaySummary};
pub use settings::{load_settings, LogFormat, ReplaySettings};
pub use world_state::WorldState;

pub fn load_replay(log_path: &Path, settings: &ReplaySettings) -> (Replay, ParseStats) {
    let parsed = parse_log(log_path, settings);
    let mut builder = replay::ReplayBuilder::new().with_path(log_path);
    for operation in parsed.operations {
        builder.push(operation);
    }
    (builder.finish(), parsed.stats)
}
