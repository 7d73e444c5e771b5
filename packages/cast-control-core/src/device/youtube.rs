//! YouTube URL helpers.
//!
//! The YouTube receiver reports bare video ids as content ids; these helpers
//! turn them back into shareable URLs and recognise YouTube links passed to
//! `OpenUri`.

use url::Url;

const LONG_DOMAIN: &str = "youtube";
const SHORT_HOST: &str = "youtu.be";
const VIDEO_URL: &str = "https://youtube.com/watch?v=";

/// Longest second-level label in a regional suffix (`co.uk`, `com.br`).
const MAX_SECOND_LEVEL_LEN: usize = 3;

/// Whether `url` points at youtu.be or any regional youtube.* host.
pub fn is_youtube_url(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host == SHORT_HOST {
        return true;
    }

    let labels: Vec<&str> = host.split('.').collect();
    let Some(i) = labels.iter().position(|label| *label == LONG_DOMAIN) else {
        return false;
    };
    match &labels[i + 1..] {
        [_tld] => true,
        [second, country] => second.len() <= MAX_SECOND_LEVEL_LEN && country.len() == 2,
        _ => false,
    }
}

/// Builds a watch URL for a bare video id.
pub fn video_url(video_id: &str) -> String {
    format!("{}{}", VIDEO_URL, video_id)
}

/// Content ids from the YouTube receiver are bare ids, not URLs.
pub fn is_bare_video_id(content_id: &str) -> bool {
    !content_id.is_empty() && Url::parse(content_id).is_err()
}
