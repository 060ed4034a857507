//! Console commands accepted by the dashboard shell.

use carecrew_bridge::{
    NewNotification,
    alert::{AlertKind, AlertPayload},
};

use crate::views::PageUi;

pub const HELP: &str = "\
commands:
  notify <type> <title> :: <message>   insert a row into the notifications table
  toast <type> <title> :: <message>    show a local alert
  page <screen>                        switch screen (dashboard, personnel, deployments, trainings, documents)
  list                                 list stored notifications
  help                                 show this help
  quit                                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Notify(NewNotification),
    Toast(AlertPayload),
    Page(PageUi),
    List,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}, type `help` for a list")]
    Unknown(String),
    #[error("`{command}` needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("unknown screen {0:?}")]
    UnknownPage(String),
}

/// Splits `<type> <title> :: <message>`; the message part is optional.
fn parse_alert_parts(
    command: &'static str,
    rest: &str,
) -> Result<(String, String, String), CommandError> {
    let (kind, rest) = rest
        .split_once(char::is_whitespace)
        .ok_or(CommandError::MissingArgument {
            command,
            argument: "a type and a title",
        })?;
    let (title, message) = rest.split_once("::").unwrap_or((rest, ""));

    let title = title.trim();
    if title.is_empty() {
        return Err(CommandError::MissingArgument {
            command,
            argument: "a title",
        });
    }

    Ok((
        kind.to_string(),
        title.to_string(),
        message.trim().to_string(),
    ))
}

pub fn parse(line: &str) -> Result<ConsoleCommand, CommandError> {
    let line = line.trim();
    let (name, rest) = line
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((line, ""));

    match name.to_ascii_lowercase().as_str() {
        "" => Err(CommandError::Empty),
        "notify" => {
            let (kind, title, message) = parse_alert_parts("notify", rest)?;
            Ok(ConsoleCommand::Notify(NewNotification {
                title,
                message,
                kind: Some(kind),
            }))
        }
        "toast" => {
            let (kind, title, message) = parse_alert_parts("toast", rest)?;
            Ok(ConsoleCommand::Toast(
                AlertPayload::new(title, message).with_kind(AlertKind::from_lenient(Some(&kind))),
            ))
        }
        "page" if rest.is_empty() => Err(CommandError::MissingArgument {
            command: "page",
            argument: "a screen name",
        }),
        "page" => rest
            .parse()
            .map(ConsoleCommand::Page)
            .map_err(|_| CommandError::UnknownPage(rest.to_string())),
        "list" => Ok(ConsoleCommand::List),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}
