//! `CONFIG <PARAM> <VALUE>` / `CONFIG HELP`.

use async_trait::async_trait;
use tracing::info;

use crate::command::{Command, CommandContext};
use crate::error::{FeatherError, Result};
use crate::link::parse_flag;

const OPTIONS: &str = "CONFIG OPTIONS:\n\
    - OUTPUT_LENGTH <32-252>\n\
    - LOGGING <true|false>\n\
    - TIMESTAMP <true|false>\n\
    - CHUNKING <true|false>";

/// Changes the runtime link settings for every later send.
pub struct ConfigCommand;

#[async_trait]
impl Command for ConfigCommand {
    fn name(&self) -> &'static str {
        "CONFIG"
    }

    async fn execute(&self, args: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
        if args.len() == 1 && args[0].eq_ignore_ascii_case("HELP") {
            ctx.link.respond(OPTIONS).await?;
            return Ok(());
        }
        let [param, value, ..] = args else {
            return Err(FeatherError::Usage("Usage: CONFIG <PARAM> <VALUE>".into()));
        };
        let param = param.to_ascii_uppercase();
        let config = ctx.link.config_mut();

        let response = match param.as_str() {
            "OUTPUT_LENGTH" => {
                let size: usize = value.parse().map_err(|_| {
                    FeatherError::Usage(format!("Invalid OUTPUT_LENGTH: {value} (must be 32-252)"))
                })?;
                config.set_max_packet_size(size)?;
                format!("Set OUTPUT_LENGTH to {size} bytes")
            }
            "LOGGING" => {
                config.logging_enabled = parse_flag(value);
                toggled(config.logging_enabled, &param)
            }
            "TIMESTAMP" => {
                config.timestamp_enabled = parse_flag(value);
                toggled(config.timestamp_enabled, &param)
            }
            "CHUNKING" => {
                config.chunking_enabled = parse_flag(value);
                toggled(config.chunking_enabled, &param)
            }
            _ => {
                return Err(FeatherError::Usage(format!(
                    "Unknown CONFIG parameter: {param}"
                )));
            }
        };

        info!("link config changed: {response}");
        ctx.link.respond(response).await?;
        Ok(())
    }
}

fn toggled(enabled: bool, param: &str) -> String {
    format!("{} {param}", if enabled { "Enabled" } else { "Disabled" })
}
