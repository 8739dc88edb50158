use super::EpisodeRecord;

/// Season label the provider uses for episodes it has not placed in a season.
pub const UNKNOWN_SEASON: &str = "unknown";

const SPECIALS_SEASON: &str = "0";

/// Moves unplaced episodes into season `0`, numbering them 1, 2, ... in the
/// order they appear. Other records pass through untouched and relative order
/// is preserved.
pub fn normalize_episodes(records: Vec<EpisodeRecord>) -> Vec<EpisodeRecord> {
    let mut unknown_seen = 0u32;

    records
        .into_iter()
        .map(|record| {
            if record.season != UNKNOWN_SEASON {
                return record;
            }

            unknown_seen += 1;
            EpisodeRecord {
                season: SPECIALS_SEASON.to_string(),
                episode: unknown_seen.to_string(),
                ..record
            }
        })
        .collect()
}
