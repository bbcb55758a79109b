use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Immutable input to one orchestration run.
///
/// `as_of_date` is interpreted as "information available up to and including
/// this date"; analysts must not cite anything later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Query {
    pub symbol: String,
    pub as_of_date: NaiveDate,
}

impl Query {
    pub fn new(symbol: impl Into<String>, as_of_date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            as_of_date,
        }
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.as_of_date)
    }
}
