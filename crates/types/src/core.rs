use std::fmt;

use serde::{Deserialize, Serialize};

/// How much history a node retains.
///
/// Archive keeps every context since genesis. Full keeps every block but
/// only recent contexts. Rolling additionally prunes old block bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    Archive,
    Full,
    Rolling,
}

impl fmt::Display for HistoryMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            HistoryMode::Archive => "archive",
            HistoryMode::Full => "full",
            HistoryMode::Rolling => "rolling",
        };
        write!(f, "{}", repr)
    }
}
