//! Interactive command shell.
//!
//! One command per lifecycle operation, run against a single in-process
//! owner token that `new-user` rotates. Parsing is kept apart from execution
//! so both can be tested without a terminal.

use std::{fmt::Write as _, sync::Arc};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{models::OwnerId, service::LinkService};

pub const HELP: &str = "\
Available commands:
  shorten <url> [limit]        - create a short link (limit is optional)
  open <short_url>             - follow a short link
  list                         - show my links
  delete <short_url>           - delete a link
  edit-limit <short_url> <n>   - change a link's visit limit
  new-user                     - switch to a new owner token
  help                         - show this help
  exit                         - quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Shorten { url: String, limit: Option<i64> },
    Open { target: String },
    List,
    Delete { target: String },
    EditLimit { target: String, limit: i64 },
    NewUser,
    Help,
    Exit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("limit must be a number, got '{0}'")]
    NotANumber(String),

    #[error("unknown command '{0}'; type 'help'")]
    Unknown(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = parts.collect();

        let command = match name.to_lowercase().as_str() {
            "shorten" => match args.as_slice() {
                [url] => Command::Shorten {
                    url: (*url).to_owned(),
                    limit: None,
                },
                [url, limit, ..] => Command::Shorten {
                    url: (*url).to_owned(),
                    limit: Some(number(limit)?),
                },
                [] => return Err(ParseError::Usage("shorten <url> [limit]")),
            },
            "open" => match args.first() {
                Some(target) => Command::Open {
                    target: (*target).to_owned(),
                },
                None => return Err(ParseError::Usage("open <short_code_or_url>")),
            },
            "list" => Command::List,
            "delete" => match args.first() {
                Some(target) => Command::Delete {
                    target: (*target).to_owned(),
                },
                None => return Err(ParseError::Usage("delete <short_code_or_url>")),
            },
            "edit-limit" => match args.as_slice() {
                [target, limit, ..] => Command::EditLimit {
                    target: (*target).to_owned(),
                    limit: number(limit)?,
                },
                _ => return Err(ParseError::Usage("edit-limit <short_code> <new_limit>")),
            },
            "new-user" => Command::NewUser,
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            other => return Err(ParseError::Unknown(other.to_owned())),
        };
        Ok(Some(command))
    }
}

fn number(raw: &str) -> Result<i64, ParseError> {
    raw.parse()
        .map_err(|_| ParseError::NotANumber(raw.to_owned()))
}

/// Text to print after a line, and whether the shell should stop.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub output: String,
    pub exit: bool,
}

impl Step {
    fn say(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            exit: false,
        }
    }
}

pub struct Shell {
    links: Arc<LinkService>,
    owner: OwnerId,
}

impl Shell {
    pub fn new(links: Arc<LinkService>) -> Self {
        Self {
            links,
            owner: OwnerId::generate(),
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Parse and execute one line of input.
    pub fn handle_line(&mut self, line: &str) -> Step {
        match Command::parse(line) {
            Ok(Some(command)) => self.execute(command),
            Ok(None) => Step::default(),
            Err(e) => Step::say(e.to_string()),
        }
    }

    pub fn execute(&mut self, command: Command) -> Step {
        let links = &self.links;
        let outcome = match command {
            Command::Shorten { url, limit } => links
                .create(&url, self.owner, limit)
                .map(|code| format!("Short link: {}", links.short_url(&code))),
            Command::Open { target } => links.resolve(&target).map(|resolved| {
                format!(
                    "Redirecting to: {} (visit {}/{})",
                    resolved.original_url, resolved.visits, resolved.max_visits
                )
            }),
            Command::List => Ok(self.render_list()),
            Command::Delete { target } => links
                .delete(&target, &self.owner)
                .map(|()| "Link deleted.".to_owned()),
            Command::EditLimit { target, limit } => links
                .update_limit(&target, limit, &self.owner)
                .map(|()| format!("Limit updated. New limit: {limit}")),
            Command::NewUser => {
                self.owner = OwnerId::generate();
                tracing::info!("Shell switched to owner {}", self.owner);
                Ok(format!("New user: {}", self.owner))
            }
            Command::Help => Ok(HELP.to_owned()),
            Command::Exit => {
                return Step {
                    output: "Shutting down...".into(),
                    exit: true,
                }
            }
        };

        match outcome {
            Ok(text) => Step::say(text),
            Err(e) => Step::say(format!("Error: {e}")),
        }
    }

    fn render_list(&self) -> String {
        let rows = self.links.summaries_for_owner(&self.owner);
        if rows.is_empty() {
            return "You have no active links.".into();
        }

        let mut out = format!("{:<10} | {:<10} | {:<20}", "Code", "Visits", "Expires");
        for row in rows {
            let visits = format!("{}/{}", row.visits, row.max_visits);
            let _ = write!(
                out,
                "\n{:<10} | {:<10} | {}",
                row.code,
                visits,
                row.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        out
    }

    /// Read commands from `input` until `exit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: tokio::io::AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(input).lines();
        output
            .write_all(
                format!("=== quotalink ===\nYour ID: {}\n{HELP}\n", self.owner).as_bytes(),
            )
            .await?;

        loop {
            output.write_all(b"\n> ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let step = self.handle_line(&line);
            if !step.output.is_empty() {
                output.write_all(step.output.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
            if step.exit {
                break;
            }
        }
        output.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{service::LinkPolicy, store::LinkStore};

    fn shell() -> Shell {
        Shell::new(Arc::new(LinkService::new(
            LinkStore::new(),
            LinkPolicy::default(),
        )))
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("   "), Ok(None));
        assert_eq!(
            Command::parse("shorten https://a.example 3"),
            Ok(Some(Command::Shorten {
                url: "https://a.example".into(),
                limit: Some(3)
            }))
        );
        assert_eq!(
            Command::parse("SHORTEN https://a.example"),
            Ok(Some(Command::Shorten {
                url: "https://a.example".into(),
                limit: None
            }))
        );
        assert_eq!(
            Command::parse("edit-limit clck.ru/abc 9"),
            Ok(Some(Command::EditLimit {
                target: "clck.ru/abc".into(),
                limit: 9
            }))
        );
        assert_eq!(Command::parse("list"), Ok(Some(Command::List)));
    }

    #[test]
    fn reports_parse_errors() {
        assert!(matches!(Command::parse("shorten"), Err(ParseError::Usage(_))));
        assert!(matches!(Command::parse("open"), Err(ParseError::Usage(_))));
        assert_eq!(
            Command::parse("edit-limit abc many"),
            Err(ParseError::NotANumber("many".into()))
        );
        assert_eq!(
            Command::parse("frobnicate"),
            Err(ParseError::Unknown("frobnicate".into()))
        );
    }

    #[test]
    fn shorten_open_list_flow() {
        let mut shell = shell();
        let step = shell.handle_line("shorten https://example.com 1");
        let short_url = step.output.strip_prefix("Short link: ").unwrap().to_owned();
        assert!(short_url.starts_with("clck.ru/"));

        let opened = shell.handle_line(&format!("open https://{short_url}"));
        assert_eq!(
            opened.output,
            "Redirecting to: https://example.com (visit 1/1)"
        );

        let refused = shell.handle_line(&format!("open {short_url}"));
        assert!(refused.output.starts_with("Error:"));
        assert!(refused.output.contains("visit limit"));

        let listing = shell.handle_line("list");
        assert!(listing.output.contains("1/1"));
    }

    #[test]
    fn new_user_loses_access_to_previous_links() {
        let mut shell = shell();
        let step = shell.handle_line("shorten https://example.com");
        let short_url = step.output.strip_prefix("Short link: ").unwrap().to_owned();
        let first_owner = shell.owner();

        shell.handle_line("new-user");
        assert_ne!(shell.owner(), first_owner);
        assert_eq!(shell.handle_line("list").output, "You have no active links.");

        let denied = shell.handle_line(&format!("delete {short_url}"));
        assert!(denied.output.contains("not the owner"));
    }

    #[test]
    fn exit_stops_the_loop() {
        let mut shell = shell();
        assert!(shell.handle_line("exit").exit);
        assert!(!shell.handle_line("help").exit);
    }

    #[tokio::test]
    async fn run_processes_input_until_exit() {
        let mut shell = shell();
        let input: &[u8] = b"shorten https://example.com\nlist\nexit\nlist\n";
        let mut output = Vec::new();
        shell.run(input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Short link: clck.ru/"));
        assert!(text.contains("0/5"));
        assert!(text.ends_with("Shutting down...\n"));
    }
}
