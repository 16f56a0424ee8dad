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

/// Formats a duration in seconds into a human-readable `MM:SS` string.
///
/// This is used for displaying countdown positions and total durations in
/// status output.
///
/// # Arguments
///
/// * `total_seconds` - The duration to format.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_time(65), "01:05");
/// assert_eq!(format_time(3600), "60:00");
/// ```
pub(crate) fn format_time(total_seconds: u64) -> String {
    let mins = total_seconds / 60;
    let secs = total_seconds % 60;
    format!("{:02}:{:02}", mins, secs)
}

/// Renders elapsed time against duration, e.g. `01:05 / 03:30 [####------]`.
pub(crate) fn format_progress(elapsed: u32, duration: u32, width: usize) -> String {
    let filled = if duration == 0 {
        0
    } else {
        (elapsed.min(duration) as usize * width) / duration as usize
    };

    format!(
        "{} / {} [{}{}]",
        format_time(u64::from(elapsed)),
        format_time(u64::from(duration)),
        "#".repeat(filled),
        "-".repeat(width - filled)
    )
}
