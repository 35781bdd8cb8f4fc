pub mod client;
pub mod provider;

pub use client::NhlClient;
pub use provider::ScoreFeed;

use chrono::{NaiveDate, Utc};

/// Today by the league's calendar. The score endpoint keys games on the
/// US Eastern date, so a late west-coast game still belongs to "today"
/// after midnight UTC.
pub fn league_today() -> NaiveDate {
    Utc::now()
        .with_timezone(&chrono_tz::America::New_York)
        .date_naive()
}
