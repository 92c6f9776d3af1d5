//! Line-oriented console commands.

use std::path::PathBuf;

use thiserror::Error;

pub const HELP: &str = "\
Commands:
  scan              scan the event listing now
  auto on|off       toggle the weekly automatic scan
  status            show scan status and countdown
  list              list found events
  log               show the activity log
  select <n>|all    toggle selection of event n, or of all events
  clear             clear the selection
  export [path]     write selected (or all) events to an .ics file
  link <n>          print a calendar quick-add link for event n
  key [token]       set the API key; without a token, clear it
  help              show this help
  quit              exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scan,
    Auto(bool),
    Status,
    List,
    Log,
    /// 1-based row number as printed by `list`.
    Select(usize),
    SelectAll,
    Clear,
    Export(Option<PathBuf>),
    Link(usize),
    Key(Option<String>),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{command}' needs {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("'{command}': invalid argument '{value}'")]
    InvalidArgument { command: &'static str, value: String },
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let arg = (!rest.is_empty()).then_some(rest);

    match word.to_ascii_lowercase().as_str() {
        "" => Err(CommandError::Empty),
        "scan" => Ok(Command::Scan),
        "auto" => match arg.map(str::to_ascii_lowercase).as_deref() {
            Some("on") => Ok(Command::Auto(true)),
            Some("off") => Ok(Command::Auto(false)),
            Some(other) => Err(CommandError::InvalidArgument {
                command: "auto",
                value: other.to_string(),
            }),
            None => Err(CommandError::MissingArgument {
                command: "auto",
                expected: "'on' or 'off'",
            }),
        },
        "status" => Ok(Command::Status),
        "list" | "ls" => Ok(Command::List),
        "log" => Ok(Command::Log),
        "select" => match arg {
            Some(all) if all.eq_ignore_ascii_case("all") => Ok(Command::SelectAll),
            Some(n) => row_number("select", n).map(Command::Select),
            None => Err(CommandError::MissingArgument {
                command: "select",
                expected: "an event number or 'all'",
            }),
        },
        "clear" => Ok(Command::Clear),
        "export" => Ok(Command::Export(arg.map(PathBuf::from))),
        "link" => match arg {
            Some(n) => row_number("link", n).map(Command::Link),
            None => Err(CommandError::MissingArgument {
                command: "link",
                expected: "an event number",
            }),
        },
        "key" => Ok(Command::Key(arg.map(str::to_string))),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn row_number(command: &'static str, value: &str) -> Result<usize, CommandError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::InvalidArgument {
            command,
            value: value.to_string(),
        }),
    }
}
