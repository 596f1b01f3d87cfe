//! Command dispatch on the remote unit.
//!
//! One inbound line is one transaction: the first whitespace token
//! (case-insensitive) picks a [`Command`], which answers through the
//! [`Link`] with zero or more responses. The dispatcher then closes the
//! transaction with exactly one [`FINAL_TOKEN`](crate::frame::FINAL_TOKEN),
//! whatever the handler did, so the station never waits on a hung
//! transaction.
//!
//! | Verb       | Module          |
//! |------------|-----------------|
//! | `STATUS`   | [`builtin`]     |
//! | `STOP`     | [`builtin`]     |
//! | `HELP`     | [`builtin`]     |
//! | `HISTORY`  | [`builtin`]     |
//! | `ECHO`     | [`builtin`]     |
//! | `RESEND`   | [`builtin`]     |
//! | `CONFIG`   | [`config`]      |
//! | `CAMERA`   | [`capture`]     |
//! | `DETECT`   | [`capture`]     |
//! | `SCREENSHOT` | [`capture`]   |
//! | `RUN`      | [`run`]         |

pub mod builtin;
pub mod capture;
pub mod config;
pub mod peripherals;
pub mod run;

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{FeatherError, Result};
use crate::link::Link;

pub use builtin::{EchoCommand, HelpCommand, HistoryCommand, ResendCommand, StatusCommand, StopCommand};
pub use capture::{CameraCommand, DetectCommand, ScreenshotCommand};
pub use config::ConfigCommand;
pub use peripherals::{Camera, CaptureSettings, CommandCamera, CommandDetector, Detector};
pub use run::RunCommand;

// ── Command ──────────────────────────────────────────────────────

/// What a handler can reach while it runs.
pub struct CommandContext<'a> {
    pub link: &'a mut Link,
    /// Every registered verb, sorted.
    pub verbs: &'a [&'static str],
}

/// A single verb.
///
/// Handlers send their own responses but never the final token. Returning
/// an error is enough to have it reported to the station: a
/// [`FeatherError::Usage`] is sent verbatim, anything else as
/// `[ERROR] <VERB> failed: <reason>`.
#[async_trait]
pub trait Command: Send + Sync {
    /// Upper-case verb this command answers to.
    fn name(&self) -> &'static str;

    async fn execute(&self, args: &[String], ctx: &mut CommandContext<'_>) -> Result<()>;
}

// ── Dispatcher ───────────────────────────────────────────────────

/// Verb registry.
#[derive(Default)]
pub struct Dispatcher {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
}

impl Dispatcher {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every command that needs no external collaborator:
    /// STATUS, STOP, HELP, HISTORY, ECHO, RESEND, CONFIG and RUN.
    pub fn with_builtins() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(StatusCommand);
        dispatcher.register(StopCommand);
        dispatcher.register(HelpCommand);
        dispatcher.register(HistoryCommand);
        dispatcher.register(EchoCommand);
        dispatcher.register(ResendCommand);
        dispatcher.register(ConfigCommand);
        dispatcher.register(RunCommand::default());
        dispatcher
    }

    /// Add or replace a command under its own name.
    pub fn register(&mut self, command: impl Command + 'static) {
        self.commands.insert(command.name(), Box::new(command));
    }

    pub fn verbs(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    /// Run one command line as a complete transaction.
    ///
    /// Blank lines are ignored. The only error returned is a failure to
    /// deliver the final token.
    pub async fn dispatch(&self, link: &mut Link, line: &str) -> Result<()> {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            return Ok(());
        };
        let verb = first.to_ascii_uppercase();
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let outcome = match self.commands.get(verb.as_str()) {
            Some(command) => {
                info!("executing {verb} {args:?}");
                let verbs = self.verbs();
                let mut ctx = CommandContext {
                    link: &mut *link,
                    verbs: &verbs,
                };
                command.execute(&args, &mut ctx).await
            }
            None => {
                info!("unknown command {verb}");
                link.respond(format!("[UNIMPLEMENTED COMMAND] {verb}"))
                    .await
                    .map(|_| ())
            }
        };

        if let Err(e) = outcome {
            let report = match e {
                FeatherError::Usage(message) => message,
                other => {
                    warn!("{verb} failed: {other}");
                    format!("[ERROR] {verb} failed: {other}")
                }
            };
            if let Err(e) = link.respond(report).await {
                warn!("could not report {verb} failure: {e}");
            }
        }

        link.send_final_token().await
    }
}

/// Parse a positive count argument.
pub(crate) fn parse_count(arg: Option<&String>) -> Option<usize> {
    arg.and_then(|a| a.parse::<usize>().ok()).filter(|n| *n > 0)
}
