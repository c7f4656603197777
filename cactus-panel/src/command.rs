use std::str::FromStr;

use cactus_common::{CommonError, InstanceSize};

use crate::controller::MAX_REPO_FIELDS;

pub const HELP: &str = "\
commands:
  list              open the instance list and refresh it
  refresh           refresh the instance list
  form              open the creation form
  close             collapse both panels
  env <name>        toggle a python environment
  size <size>       micro | tiny | small | medium | large
  repo [n] <url>    edit repository field n (default 0)
  check             validate repository field 0
  launch            submit the creation form
  delete <id>       delete an instance
  show              print the panel
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    OpenList,
    Refresh,
    OpenForm,
    Close,
    ToggleEnv(String),
    Size(InstanceSize),
    EditRepo { index: usize, value: String },
    Check,
    Launch,
    Delete(String),
    Show,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("repository field {0} out of range (fields 0..{max})", max = MAX_REPO_FIELDS)]
    RepoIndex(usize),
    #[error(transparent)]
    Size(#[from] CommonError),
}

impl FromStr for PanelCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let arg = |name: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument(name))
            } else {
                Ok(rest.to_string())
            }
        };

        match verb.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "list" => Ok(PanelCommand::OpenList),
            "refresh" => Ok(PanelCommand::Refresh),
            "form" => Ok(PanelCommand::OpenForm),
            "close" => Ok(PanelCommand::Close),
            "env" => Ok(PanelCommand::ToggleEnv(arg("env")?)),
            "size" => Ok(PanelCommand::Size(arg("size")?.parse::<InstanceSize>()?)),
            "repo" => parse_repo(rest),
            "check" => Ok(PanelCommand::Check),
            "launch" => Ok(PanelCommand::Launch),
            "delete" => Ok(PanelCommand::Delete(arg("delete")?)),
            "show" => Ok(PanelCommand::Show),
            "help" | "?" => Ok(PanelCommand::Help),
            "quit" | "exit" => Ok(PanelCommand::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

// `repo` with no value clears field 0, matching a cleared input box.
fn parse_repo(rest: &str) -> Result<PanelCommand, CommandError> {
    if let Some((first, value)) = rest.split_once(char::is_whitespace) {
        if let Ok(index) = first.parse::<usize>() {
            if index >= MAX_REPO_FIELDS {
                return Err(CommandError::RepoIndex(index));
            }
            return Ok(PanelCommand::EditRepo {
                index,
                value: value.trim().to_string(),
            });
        }
    }
    Ok(PanelCommand::EditRepo {
        index: 0,
        value: rest.to_string(),
    })
}
