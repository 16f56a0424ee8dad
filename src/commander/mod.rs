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

//! Text command parsing.
//!
//! Lines typed at the prompt are split on whitespace and matched against the
//! known command words. Parsing never touches application state; the event
//! loop decides what a [`Command`] does.

use thiserror::Error;

pub(crate) const HELP: &str = "\
Commands:
  load <id|url>            load a release by catalog ID or URL
  search <query>           search the catalog for releases
  page <n>                 show page n of the last search
  pick <n>                 load result n from the last search
  play | pause             start or stop the turntable
  toggle | p               toggle play/pause
  next | n                 skip to the next track
  prev | b                 go back to the previous track
  track <position|number>  jump to a track, e.g. \"track B2\" or \"track 3\"
  tracks                   list the tracks of the current release
  status                   show playback and session status
  signin <user> <password> sign in to Last.fm
  signout                  sign out of Last.fm
  notifications            toggle now playing notifications
  close                    close the current release
  help                     show this help
  quit | q                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Load(String),
    Search(String),
    Page(u32),
    /// 1-based index into the last search page.
    Pick(usize),

    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    /// A catalog position such as "A2", or a 1-based track number.
    Track(String),

    Tracks,
    Status,

    SignIn { username: String, password: String },
    SignOut,

    Notifications,
    Close,
    Help,
    Quit,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub(crate) enum CommandError {
    #[error("unknown command '{0}', type 'help' for a list of commands")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parses one line of input.
///
/// Returns `Ok(None)` for a blank line.
///
/// # Errors
///
/// Returns a [`CommandError`] for an unknown command word or for arguments
/// that do not fit the command.
pub(crate) fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    let command = match parts.as_slice() {
        [] => return Ok(None),

        ["load", target] => Command::Load(target.to_string()),
        ["load", ..] => return Err(CommandError::Usage("load <id|url>")),

        ["search", query_parts @ ..] => {
            if query_parts.is_empty() {
                return Err(CommandError::Usage("search <query>"));
            }
            Command::Search(query_parts.join(" "))
        }
        ["page", page] => Command::Page(parse_number(page, "page <n>")?),
        ["page", ..] => return Err(CommandError::Usage("page <n>")),
        ["pick", n] => Command::Pick(parse_number(n, "pick <n>")?),
        ["pick", ..] => return Err(CommandError::Usage("pick <n>")),

        ["play"] => Command::Play,
        ["pause"] => Command::Pause,
        ["toggle"] | ["p"] => Command::Toggle,
        ["next"] | ["n"] => Command::Next,
        ["prev"] | ["b"] => Command::Previous,
        ["track", target] => Command::Track(target.to_string()),
        ["track", ..] => return Err(CommandError::Usage("track <position|number>")),

        ["tracks"] => Command::Tracks,
        ["status"] => Command::Status,

        ["signin", username, password] => Command::SignIn {
            username: username.to_string(),
            password: password.to_string(),
        },
        ["signin", ..] => return Err(CommandError::Usage("signin <user> <password>")),
        ["signout"] => Command::SignOut,

        ["notifications"] => Command::Notifications,
        ["close"] => Command::Close,
        ["help"] | ["?"] => Command::Help,
        ["quit"] | ["q"] => Command::Quit,

        [cmd, ..] => return Err(CommandError::Unknown(cmd.to_string())),
    };

    Ok(Some(command))
}

/// Parses a positive number.
fn parse_number<T>(value: &str, usage: &'static str) -> Result<T, CommandError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    match value.parse::<T>() {
        Ok(n) if n != T::default() => Ok(n),
        _ => Err(CommandError::Usage(usage)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_is_no_command() {
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("   \t "), Ok(None));
    }

    #[test]
    fn parses_playback_commands_and_aliases() {
        assert_eq!(parse("play"), Ok(Some(Command::Play)));
        assert_eq!(parse("p"), Ok(Some(Command::Toggle)));
        assert_eq!(parse("  n "), Ok(Some(Command::Next)));
        assert_eq!(parse("b"), Ok(Some(Command::Previous)));
        assert_eq!(parse("q"), Ok(Some(Command::Quit)));
        assert_eq!(parse("track B2"), Ok(Some(Command::Track("B2".to_string()))));
    }

    #[test]
    fn load_takes_a_single_target() {
        assert_eq!(
            parse("load https://www.discogs.com/release/8844291-X"),
            Ok(Some(Command::Load(
                "https://www.discogs.com/release/8844291-X".to_string()
            )))
        );
        assert_eq!(parse("load"), Err(CommandError::Usage("load <id|url>")));
    }

    #[test]
    fn search_joins_query_words() {
        assert_eq!(
            parse("search pink  floyd animals"),
            Ok(Some(Command::Search("pink floyd animals".to_string())))
        );
        assert!(matches!(parse("search"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn numbers_must_be_positive() {
        assert_eq!(parse("page 2"), Ok(Some(Command::Page(2))));
        assert_eq!(parse("pick 3"), Ok(Some(Command::Pick(3))));
        assert!(matches!(parse("page 0"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("pick x"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn signin_requires_user_and_password() {
        assert_eq!(
            parse("signin alice secret"),
            Ok(Some(Command::SignIn {
                username: "alice".to_string(),
                password: "secret".to_string(),
            }))
        );
        assert!(matches!(parse("signin alice"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(
            parse("rewind 10"),
            Err(CommandError::Unknown("rewind".to_string()))
        );
    }
}
