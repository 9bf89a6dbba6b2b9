//! Command-line parsing and execution.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use fbconnect_core::{ApiError, Session, SessionEvent};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

pub const USAGE: &str = "\
Usage: fbconnect <command> [args]

Commands:
  login                      Log in (reuses the stored session if still valid)
  whoami                     Print the uid of the logged-in user
  logout                     Expire the session and forget it
  forget                     Delete the stored session without contacting the server
  query <fql>                Run an FQL query
  multiquery <name=fql>...   Run several named FQL queries in one call
  call <method> [key=value]  Call an API method
  configure <key> <secret>   Save the application key and secret to the config file
  help                       Show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login,
    Whoami,
    Logout,
    Forget,
    Query(String),
    Multiquery(BTreeMap<String, String>),
    Call {
        method: String,
        arguments: BTreeMap<String, String>,
    },
    Configure {
        api_key: String,
        app_secret: String,
    },
    Help,
}

/// Parse `key=value` words into a map
fn parse_pairs(words: &[String]) -> Result<BTreeMap<String, String>> {
    words
        .iter()
        .map(|word| {
            let (key, value) = word
                .split_once('=')
                .with_context(|| format!("Expected key=value, got '{}'", word))?;
            if key.is_empty() {
                bail!("Empty key in '{}'", word);
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

impl Command {
    /// Parse the arguments following the program name
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };

        Ok(match name.as_str() {
            "login" => Command::Login,
            "whoami" => Command::Whoami,
            "logout" => Command::Logout,
            "forget" => Command::Forget,
            "query" => {
                if rest.is_empty() {
                    bail!("query needs an FQL statement");
                }
                Command::Query(rest.join(" "))
            }
            "multiquery" => {
                if rest.is_empty() {
                    bail!("multiquery needs at least one name=fql pair");
                }
                Command::Multiquery(parse_pairs(rest)?)
            }
            "call" => {
                let (method, pairs) = rest.split_first().context("call needs a method name")?;
                Command::Call {
                    method: method.clone(),
                    arguments: parse_pairs(pairs)?,
                }
            }
            "configure" => match rest {
                [api_key, app_secret] => Command::Configure {
                    api_key: api_key.clone(),
                    app_secret: app_secret.clone(),
                },
                _ => bail!("configure needs an application key and secret"),
            },
            "help" | "-h" | "--help" => Command::Help,
            other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
        })
    }
}

/// Drives a `Session` for one command, waiting on its delegate events
pub struct Runner {
    session: Session,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Runner {
    pub fn new(session: Session, events: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        Self { session, events }
    }

    pub async fn run(mut self, command: Command) -> Result<()> {
        match command {
            Command::Help | Command::Configure { .. } => println!("{}", USAGE),
            Command::Login => {
                let uid = self.login().await?;
                let source = if self.session.using_saved_session() {
                    "stored session"
                } else {
                    "new session"
                };
                println!("Logged in as {} ({})", uid, source);
            }
            Command::Whoami => {
                let uid = self.login().await?;
                println!("{}", uid);
            }
            Command::Logout => self.logout().await?,
            Command::Forget => {
                self.session.clear_stored_session()?;
                println!("Stored session removed");
            }
            Command::Query(fql) => {
                self.login().await?;
                let (tx, rx) = oneshot::channel();
                self.session.send_fql_query(&fql, move |r| {
                    let _ = tx.send(r);
                })?;
                print_json(&Self::wait(rx).await?)?;
            }
            Command::Multiquery(queries) => {
                self.login().await?;
                let (tx, rx) = oneshot::channel();
                self.session.send_fql_multiquery(queries, move |r| {
                    let _ = tx.send(r);
                })?;
                let results = Self::wait(rx).await?;
                print_json(&serde_json::to_value(results)?)?;
            }
            Command::Call { method, arguments } => {
                self.login().await?;
                let (tx, rx) = oneshot::channel();
                self.session.call_method(&method, arguments, move |r| {
                    let _ = tx.send(r);
                })?;
                print_json(&Self::wait(rx).await?)?;
            }
        }
        Ok(())
    }

    async fn login(&mut self) -> Result<String> {
        self.session.start_login()?;
        match self.events.recv().await {
            Some(SessionEvent::LoginCompleted { uid, .. }) => {
                let uid = uid.context("Login completed without a uid")?;
                info!(uid = %uid, "Logged in");
                Ok(uid)
            }
            Some(SessionEvent::LoginFailed(e)) => {
                bail!("Login failed [{}]: {}", e.domain(), e.message())
            }
            Some(other) => bail!("Unexpected session event: {:?}", other),
            None => bail!("Session closed before login finished"),
        }
    }

    async fn logout(&mut self) -> Result<()> {
        // The logout session has no login surface, so this only adopts a stored session
        self.session.start_login()?;
        let logged_in = matches!(
            self.events.recv().await,
            Some(SessionEvent::LoginCompleted { .. })
        );
        if !logged_in {
            println!("Not logged in");
            return Ok(());
        }

        self.session.logout()?;
        match self.events.recv().await {
            Some(SessionEvent::LogoutCompleted) => {
                println!("Logged out");
                Ok(())
            }
            Some(SessionEvent::LogoutFailed(e)) => {
                bail!("Logout failed [{}]: {}", e.domain(), e.message())
            }
            Some(other) => bail!("Unexpected session event: {:?}", other),
            None => bail!("Session closed before logout finished"),
        }
    }

    async fn wait<T>(rx: oneshot::Receiver<Result<T, ApiError>>) -> Result<T> {
        match rx.await.context("Request dropped without a result")? {
            Ok(value) => Ok(value),
            Err(e) => match e.code() {
                Some(code) => bail!("Request failed [{} {}]: {}", e.domain(), code, e.message()),
                None => bail!("Request failed [{}]: {}", e.domain(), e.message()),
            },
        }
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
