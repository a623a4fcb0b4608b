use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncOutcome {
    Replaced { count: usize },
    Pushed { attempted: usize, failed: usize },
    Unchanged,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Replaced { count } => {
                write!(f, "replaced local quotes with {count} from the server")
            }
            SyncOutcome::Pushed { attempted, failed: 0 } => {
                write!(f, "sent {attempted} local quote(s) to the server")
            }
            SyncOutcome::Pushed { attempted, failed } => write!(
                f,
                "sent {} of {attempted} local quote(s) to the server ({failed} failed)",
                attempted - failed
            ),
            SyncOutcome::Unchanged => f.write_str("already in sync"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LastSync {
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    pub outcome: SyncOutcome,
}
