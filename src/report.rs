//! Result formatting helpers.
//!
//! Small, sink-agnostic formatting used by the CLI's HTML index and by
//! anything else that renders a [`ScanReport`](crate::ScanReport). Rendering
//! itself (HTML, RSS, whatever) is deliberately outside the core.

use std::time::Duration;

/// Format a timestamp as `[H:MM:SS]`.
pub fn format_timestamp(timestamp: Duration) -> String {
    let total = timestamp.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("[{hours}:{minutes:02}:{seconds:02}]")
}

/// Format a match title from the two character identifiers.
pub fn format_title(left: &str, right: &str) -> String {
    format!("{left} vs {right}")
}

/// Extract the video id from a YouTube URL, if it is one.
///
/// Handles `youtu.be/<id>`, `watch?v=<id>` and `/v/<id>` forms.
pub fn video_id(url: &str) -> Option<&str> {
    for marker in ["youtu.be/", "watch?v=", "/v/"] {
        if let Some(index) = url.find(marker) {
            let rest = &url[index + marker.len()..];
            let id = rest.split(['?', '&', '#']).next().unwrap_or(rest);
            if !id.is_empty() {
                return Some(id);
            }
        }
    }
    None
}

/// Strip any existing `t=<seconds>` deep-link parameter from a URL so a
/// fresh one can be appended per match.
pub fn strip_time_parameter(url: &str) -> String {
    let Some(split) = url.find(['?', '#']) else {
        return url.to_string();
    };
    let (base, tail) = url.split_at(split);

    let mut out = String::from(base);
    let mut first_query = true;
    let mut rest = tail;
    while !rest.is_empty() {
        let separator = rest.chars().next().unwrap_or('?');
        let end = rest[1..]
            .find(['&', '#'])
            .map(|offset| offset + 1)
            .unwrap_or(rest.len());
        let token = &rest[1..end];

        let is_time = token
            .strip_prefix("t=")
            .is_some_and(|value| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()));
        if !is_time {
            if separator == '#' {
                out.push('#');
            } else {
                // Renumber query separators so dropping "?t=.." promotes
                // the next parameter to '?'.
                out.push(if first_query { '?' } else { '&' });
                first_query = false;
            }
            out.push_str(token);
        }
        rest = &rest[end..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_formats_hours() {
        assert_eq!(format_timestamp(Duration::from_secs(75)), "[0:01:15]");
        assert_eq!(format_timestamp(Duration::from_secs(3723)), "[1:02:03]");
    }

    #[test]
    fn title_joins_sides() {
        assert_eq!(format_title("sol", "ky"), "sol vs ky");
    }

    #[test]
    fn video_id_forms() {
        assert_eq!(
            video_id("https://youtu.be/fOvG_TfnCVo?si=x"),
            Some("fOvG_TfnCVo")
        );
        assert_eq!(
            video_id("https://www.youtube.com/watch?v=fOvG_TfnCVo&list=PL"),
            Some("fOvG_TfnCVo")
        );
        assert_eq!(
            video_id("https://www.youtube.com/v/fOvG_TfnCVo#t=10"),
            Some("fOvG_TfnCVo")
        );
        assert_eq!(video_id("https://example.com/video.webm"), None);
    }

    #[test]
    fn strips_time_parameters() {
        assert_eq!(
            strip_time_parameter("https://y.tube/watch?v=abc&t=120"),
            "https://y.tube/watch?v=abc"
        );
        assert_eq!(
            strip_time_parameter("https://y.tube/watch?t=120&v=abc"),
            "https://y.tube/watch?v=abc"
        );
        assert_eq!(
            strip_time_parameter("https://y.tube/watch?v=abc#t=9"),
            "https://y.tube/watch?v=abc"
        );
        assert_eq!(
            strip_time_parameter("https://y.tube/watch?v=abc"),
            "https://y.tube/watch?v=abc"
        );
        // No dangling '?' when the time value was the only parameter.
        assert_eq!(
            strip_time_parameter("https://youtu.be/abc?t=99"),
            "https://youtu.be/abc"
        );
        // Non-numeric t values are unrelated parameters.
        assert_eq!(
            strip_time_parameter("https://y.tube/watch?t=abc"),
            "https://y.tube/watch?t=abc"
        );
    }
}
