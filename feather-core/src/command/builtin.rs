//! Commands that only need the link itself.

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::command::{Command, CommandContext, parse_count};
use crate::error::{FeatherError, Result};

// ── STATUS / STOP / HELP ─────────────────────────────────────────

pub struct StatusCommand;

#[async_trait]
impl Command for StatusCommand {
    fn name(&self) -> &'static str {
        "STATUS"
    }

    async fn execute(&self, _args: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
        ctx.link.respond("→ Drone is online and ready").await?;
        Ok(())
    }
}

pub struct StopCommand;

#[async_trait]
impl Command for StopCommand {
    fn name(&self) -> &'static str {
        "STOP"
    }

    async fn execute(&self, _args: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
        ctx.link.respond("→ Stopping all activity").await?;
        Ok(())
    }
}

pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "HELP"
    }

    async fn execute(&self, _args: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
        let listing = format!("Valid commands: {}", ctx.verbs.join(", "));
        ctx.link.respond(listing).await?;
        Ok(())
    }
}

// ── HISTORY ──────────────────────────────────────────────────────

/// `HISTORY <n>`: replay the last `n` recorded frames.
pub struct HistoryCommand;

#[async_trait]
impl Command for HistoryCommand {
    fn name(&self) -> &'static str {
        "HISTORY"
    }

    async fn execute(&self, args: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
        let count = parse_count(args.first())
            .ok_or_else(|| FeatherError::Usage("Usage: HISTORY (# of packets)".into()))?;

        // Snapshot first so the announcement itself is not replayed.
        let frames = ctx.link.history().last(count);
        ctx.link
            .respond(format!("→ Resending last {} packets", frames.len()))
            .await?;
        ctx.link.replay(&frames).await?;
        Ok(())
    }
}

// ── ECHO ─────────────────────────────────────────────────────────

/// `ECHO <n> [message...]`: link throughput and latency probe.
pub struct EchoCommand;

#[async_trait]
impl Command for EchoCommand {
    fn name(&self) -> &'static str {
        "ECHO"
    }

    async fn execute(&self, args: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
        let times = parse_count(args.first())
            .ok_or_else(|| FeatherError::Usage("Usage: ECHO (# of packets) (message)".into()))?;
        let message = args[1..].join(" ");

        let start = Instant::now();
        let mut total_bytes = 0;
        for _ in 0..times {
            total_bytes += ctx.link.respond(&message).await?;
        }
        let elapsed = start.elapsed().as_secs_f64();

        let throughput = if elapsed > 0.0 {
            total_bytes as f64 / elapsed
        } else {
            0.0
        };
        let latency = elapsed / times as f64;
        debug!("echo: {total_bytes} bytes in {elapsed:.3}s");

        ctx.link
            .respond(format!(
                "[THROUGHPUT] {throughput:.2} bytes/sec | [LATENCY] {latency:.4} sec/packet"
            ))
            .await?;
        Ok(())
    }
}

// ── RESEND ───────────────────────────────────────────────────────

/// `RESEND <idx[,idx...]>`: retransmit specific history entries.
pub struct ResendCommand;

const RESEND_USAGE: &str = "Usage: RESEND <packet numbers, comma separated>";

/// Pull packet indices out of `0,2, 5` / `0 2 5` / `0:2` style arguments.
fn parse_indices(args: &[String]) -> Vec<usize> {
    args.join(" ")
        .replace(':', "")
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|t| t.parse().ok())
        .collect()
}

#[async_trait]
impl Command for ResendCommand {
    fn name(&self) -> &'static str {
        "RESEND"
    }

    async fn execute(&self, args: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
        if args.is_empty() {
            return Err(FeatherError::Usage(RESEND_USAGE.into()));
        }
        let indices = parse_indices(args);
        if indices.is_empty() {
            return Err(FeatherError::Usage(
                "No valid packet indices provided for RESEND.".into(),
            ));
        }
        let report = ctx.link.resend(&indices).await?;
        debug!(
            "resend: {} resent, {} missing",
            report.resent.len(),
            report.missing.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Dispatcher;
    use crate::frame::FINAL_TOKEN;
    use crate::link::{Link, LinkConfig};
    use crate::radio::MemoryRadio;
    use std::sync::Arc;
    use std::time::Duration;

    fn session(max: usize) -> (Link, MemoryRadio) {
        let (drone, station) = MemoryRadio::pair();
        let config = LinkConfig {
            max_packet_size: max,
            ..LinkConfig::default()
        };
        let link = Link::new(Arc::new(drone), config).with_frame_delay(Duration::ZERO);
        (link, station)
    }

    async fn lines(station: &MemoryRadio) -> Vec<String> {
        station
            .drain()
            .await
            .into_iter()
            .map(|f| String::from_utf8(f).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn echo_sends_payloads_summary_then_token() {
        let (mut link, station) = session(32);
        Dispatcher::with_builtins()
            .dispatch(&mut link, "ECHO 3 hi")
            .await
            .unwrap();

        let got = lines(&station).await;
        assert_eq!(got.len(), 5);
        assert_eq!(&got[..3], &["hi", "hi", "hi"]);
        assert!(got[3].starts_with("[THROUGHPUT] "), "{}", got[3]);
        assert!(got[3].contains(" bytes/sec | [LATENCY] "));
        assert!(got[3].ends_with(" sec/packet"));
        assert_eq!(got[4], FINAL_TOKEN);
    }

    #[tokio::test]
    async fn echo_joins_message_words() {
        let (mut link, station) = session(128);
        Dispatcher::with_builtins()
            .dispatch(&mut link, "echo 1 hello there")
            .await
            .unwrap();
        assert_eq!(lines(&station).await[0], "hello there");
    }

    #[tokio::test]
    async fn echo_rejects_bad_count() {
        for line in ["ECHO", "ECHO 0 hi", "ECHO many hi"] {
            let (mut link, station) = session(128);
            Dispatcher::with_builtins()
                .dispatch(&mut link, line)
                .await
                .unwrap();
            assert_eq!(
                lines(&station).await,
                vec!["Usage: ECHO (# of packets) (message)", FINAL_TOKEN],
                "{line}"
            );
        }
    }

    #[tokio::test]
    async fn resend_valid_and_missing_indices() {
        let (mut link, station) = session(128);
        for word in ["a", "b", "c", "d", "e"] {
            link.respond(word).await.unwrap();
        }
        station.drain().await;

        Dispatcher::with_builtins()
            .dispatch(&mut link, "RESEND 0,99")
            .await
            .unwrap();
        assert_eq!(
            lines(&station).await,
            vec!["a", "Packet 99 not found in history.", FINAL_TOKEN]
        );
    }

    #[tokio::test]
    async fn resend_without_indices_is_usage() {
        let (mut link, station) = session(128);
        let dispatcher = Dispatcher::with_builtins();
        dispatcher.dispatch(&mut link, "RESEND").await.unwrap();
        dispatcher.dispatch(&mut link, "RESEND x,y").await.unwrap();
        assert_eq!(
            lines(&station).await,
            vec![
                RESEND_USAGE,
                FINAL_TOKEN,
                "No valid packet indices provided for RESEND.",
                FINAL_TOKEN
            ]
        );
    }

    #[test]
    fn index_parsing() {
        let args = |s: &str| s.split_whitespace().map(String::from).collect::<Vec<_>>();
        assert_eq!(parse_indices(&args("0,2,5")), vec![0, 2, 5]);
        assert_eq!(parse_indices(&args("0, 2 5")), vec![0, 2, 5]);
        assert_eq!(parse_indices(&args("1:2,x,-3")), vec![12]);
        assert!(parse_indices(&args("abc")).is_empty());
    }

    #[tokio::test]
    async fn history_replays_frames_sent_before_it() {
        let (mut link, station) = session(128);
        for word in ["one", "two", "three"] {
            link.respond(word).await.unwrap();
        }
        station.drain().await;

        Dispatcher::with_builtins()
            .dispatch(&mut link, "HISTORY 2")
            .await
            .unwrap();
        assert_eq!(
            lines(&station).await,
            vec!["→ Resending last 2 packets", "two", "three", FINAL_TOKEN]
        );
    }

    #[tokio::test]
    async fn help_lists_verbs() {
        let (mut link, station) = session(252);
        Dispatcher::with_builtins()
            .dispatch(&mut link, "HELP")
            .await
            .unwrap();
        assert_eq!(
            lines(&station).await[0],
            "Valid commands: CONFIG, ECHO, HELP, HISTORY, RESEND, RUN, STATUS, STOP"
        );
    }
}
