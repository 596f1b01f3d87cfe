//! Interactive operator console.
//!
//! Typed lines go to the drone as commands. A few verbs are handled
//! locally instead:
//!
//! ```text
//! EXIT | QUIT             leave the console
//! RECONSTRUCT | DISPLAY   rebuild an image from the transcript
//! CAPTURE                 CAMERA text, wait, then reconstruct
//! SCRIPT <file>           run a command script
//! ```

use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use feather_core::{Reconstruction, Result};

use crate::station::Station;

const PROMPT: &str = ">> ";

/// What the console does with one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action<'a> {
    Skip,
    Exit,
    Reconstruct,
    Capture,
    Script(Option<&'a str>),
    Send(&'a str),
}

fn classify(line: &str) -> Action<'_> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Action::Skip;
    };
    match verb.to_ascii_uppercase().as_str() {
        "EXIT" | "QUIT" => Action::Exit,
        "RECONSTRUCT" | "DISPLAY" => Action::Reconstruct,
        "CAPTURE" => Action::Capture,
        "SCRIPT" => Action::Script(words.next()),
        _ => Action::Send(line),
    }
}

fn describe(result: &Reconstruction) -> String {
    match result {
        Reconstruction::Text {
            path,
            width,
            height,
        } => format!("[INFO] Reconstructed {width}x{height} image to {}", path.display()),
        Reconstruction::Binary { path, bytes } => {
            format!("[INFO] Reconstructed {bytes}-byte image to {}", path.display())
        }
    }
}

/// Read commands from `input` until EOF or EXIT, reporting to `output`.
///
/// Failures of individual lines are reported and the console carries on;
/// only I/O errors on `output` end it early.
pub async fn run<R, W>(station: &Station, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output
        .write_all(b">> Type commands to send to the drone (type 'exit' to quit):\n")
        .await?;

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let report = match classify(&line) {
            Action::Skip => continue,
            Action::Exit => {
                info!("leaving console");
                break;
            }
            Action::Reconstruct => match station.reconstruct().await {
                Ok(result) => describe(&result),
                Err(e) => format!("[ERROR] Reconstruction failed: {e}"),
            },
            Action::Capture => match station.capture().await {
                Ok(result) => describe(&result),
                Err(e) => format!("[ERROR] Capture failed: {e}"),
            },
            Action::Script(None) => "[ERROR] SCRIPT command requires a filename.".to_string(),
            Action::Script(Some(file)) => match station.run_script(Path::new(file)).await {
                Ok(sent) => format!("[INFO] Script {file} sent {sent} commands"),
                Err(e) => format!("[ERROR] Script {file} failed: {e}"),
            },
            Action::Send(command) => match station.transact(command).await {
                Ok(()) => continue,
                Err(e) => format!("[ERROR] {command}: {e}"),
            },
        };
        output.write_all(report.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }

    output.flush().await?;
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────
