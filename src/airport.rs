use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Formatter;
use std::sync::Arc;
use tabled::Tabled;

pub type AirportId = Arc<str>;

/// Airport warehouse. Hubs flagged `infinite_source` supply any quantity and
/// never fill up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Tabled)]
pub struct Airport {
    pub id: AirportId,
    pub continent: Arc<str>,
    pub latitude: f64,
    pub longitude: f64,
    /// Whole hours east of UTC.
    #[serde(default)]
    pub utc_offset: i32,
    pub capacity: u32,
    #[serde(default)]
    pub infinite_source: bool,
}

impl Airport {
    pub fn zone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset * 3600).unwrap_or_else(|| Utc.fix())
    }

    pub fn same_continent(&self, other: &Airport) -> bool {
        self.continent == other.continent
    }
}

impl fmt::Display for Airport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
