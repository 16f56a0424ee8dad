// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Track duration normalisation.
//!
//! Catalog durations arrive as display strings ("3:45", "1:02:03") or not at
//! all. They are converted to whole seconds once, when a [`super::Track`] is
//! built, and every other part of the application works with integers.

/// Duration used when neither the catalog nor a lookup knows better.
pub(crate) const DEFAULT_TRACK_SECONDS: u32 = 210;

/// Where a track's duration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DurationSource {
    Catalog,
    Lookup,
    Default,
}

/// Parses "m:ss" or "h:mm:ss" into seconds, never returning zero.
///
/// Returns `None` for empty input, bare numbers, or anything with a
/// non-numeric or missing component.
pub(crate) fn parse_duration(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let parts = text
        .split(':')
        .map(|p| p.trim().parse::<u32>().ok().map(u64::from))
        .collect::<Option<Vec<u64>>>()?;

    let seconds = match parts.as_slice() {
        [minutes, seconds] => minutes * 60 + seconds,
        [hours, minutes, seconds] => hours * 3600 + minutes * 60 + seconds,
        _ => return None,
    };

    u32::try_from(seconds.max(1)).ok()
}

/// Formats seconds as "m:ss", or "h:mm:ss" for an hour or more.
pub(crate) fn format_duration(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let mins = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes_and_seconds() {
        assert_eq!(parse_duration("3:45"), Some(225));
        assert_eq!(parse_duration(" 10:00 "), Some(600));
        assert_eq!(parse_duration("0:00"), Some(1));
    }

    #[test]
    fn parses_hours() {
        assert_eq!(parse_duration("1:02:03"), Some(3723));
    }

    #[test]
    fn rejects_unusable_input() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("245"), None);
        assert_eq!(parse_duration("3:4x"), None);
        assert_eq!(parse_duration("1:2:3:4"), None);
        assert_eq!(parse_duration(":30"), None);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(210), "3:30");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(3723), "1:02:03");
    }
}
