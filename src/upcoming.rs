use crate::state::{FeedEvent, LiveStatus, PREMATCH_STATUS_CODE};

const PRE_MATCH_INFO: [&str; 2] = ["avant le debut", "before start"];
const PRE_MATCH_STATUS: [&str; 2] = ["debut dans", "starts in"];
const IN_PLAY_PHASE: [&str; 5] = ["mi-temps", "jeu termine", "half time", "halftime", "game over"];
const FINISHED_INFO: [&str; 2] = ["match termine", "finished"];

/// True only for matches that start after `now_unix`, show no in-play or
/// finished marker, and carry a positive pre-match signal.
pub fn is_strictly_upcoming(start_unix: i64, live: &LiveStatus, now_unix: i64) -> bool {
    if start_unix <= now_unix {
        return false;
    }

    let info = normalize_text(&live.info_text);
    let status = normalize_text(&live.status_text);
    let phase = normalize_text(&live.phase);

    let in_play = IN_PLAY_PHASE.iter().any(|m| phase.contains(m))
        || FINISHED_INFO.iter().any(|m| info.contains(m));
    if in_play {
        return false;
    }

    live.status_code == Some(PREMATCH_STATUS_CODE)
        || PRE_MATCH_INFO.iter().any(|m| info.contains(m))
        || PRE_MATCH_STATUS.iter().any(|m| status.contains(m))
}

pub fn event_is_upcoming(event: &FeedEvent, now_unix: i64) -> bool {
    is_strictly_upcoming(event.start_unix, &event.live, now_unix)
}

/// Lowercases and strips the diacritics French status strings carry.
pub fn normalize_text(raw: &str) -> String {
    raw.to_lowercase().chars().map(fold_accent).collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}
