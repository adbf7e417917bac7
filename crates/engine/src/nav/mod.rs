mod astar;
mod path;
mod range;

pub use astar::{find_path, PathError};
pub use path::{Path, MAX_PATH_LENGTH};
pub use range::{compute_reachable, MoveRange, RangeTile};
