//! Image-producing commands: CAMERA, DETECT and SCREENSHOT.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::command::peripherals::{Camera, CaptureSettings, Detector};
use crate::command::{Command, CommandContext};
use crate::error::{FeatherError, Result};
use crate::imaging::{Grayscale, encode_binary, encode_text};
use crate::link::Link;

/// Keep asking the camera until it produces a picture.
async fn capture_until_ready(camera: &dyn Camera, settings: &CaptureSettings) -> PathBuf {
    loop {
        if let Some(path) = camera.capture().await {
            return path;
        }
        warn!("capture failed, retrying in {:?}", settings.retry_delay);
        tokio::time::sleep(settings.retry_delay).await;
    }
}

/// Load `path` and run it through the text pipeline.
fn encode_file(path: &Path, settings: &CaptureSettings) -> Result<String> {
    let image = Grayscale::load(path)?;
    Ok(encode_text(&image, settings.format, settings.dither)?)
}

fn announcement(settings: &CaptureSettings) -> String {
    let f = settings.format;
    format!("Sending a {}x{} {}bpp image", f.width, f.height, f.bit_depth)
}

/// Wall-clock stamp for DETECT progress lines.
fn stamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}

// ── CAMERA ───────────────────────────────────────────────────────

/// `CAMERA [text|binary]`: capture and send one picture.
///
/// `text` (default) sends the bit-packed base64 form at the configured depth
/// and size; `binary` sends the captured file itself, compressed and
/// hex-encoded.
pub struct CameraCommand {
    camera: Arc<dyn Camera>,
    settings: CaptureSettings,
}

impl CameraCommand {
    pub fn new(camera: Arc<dyn Camera>, settings: CaptureSettings) -> Self {
        Self { camera, settings }
    }
}

#[async_trait]
impl Command for CameraCommand {
    fn name(&self) -> &'static str {
        "CAMERA"
    }

    async fn execute(&self, args: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
        let binary = match args.first().map(|a| a.to_ascii_lowercase()).as_deref() {
            None | Some("text") => false,
            Some("binary") => true,
            Some(_) => return Err(FeatherError::Usage("Usage: CAMERA [text|binary]".into())),
        };

        let path = capture_until_ready(self.camera.as_ref(), &self.settings).await;
        info!("captured {}", path.display());

        if binary {
            let raw = tokio::fs::read(&path).await?;
            let payload = encode_binary(&raw)?;
            ctx.link
                .respond(format!("Sending a {}-byte binary image", raw.len()))
                .await?;
            ctx.link.send(payload.as_bytes()).await?;
        } else {
            let payload = encode_file(&path, &self.settings)?;
            ctx.link.respond(announcement(&self.settings)).await?;
            ctx.link.send(payload.as_bytes()).await?;
        }
        ctx.link.respond("SCREENSHOT SENT").await?;
        Ok(())
    }
}

// ── DETECT ───────────────────────────────────────────────────────

/// `DETECT`: capture, run person detection, send every crop.
pub struct DetectCommand {
    camera: Arc<dyn Camera>,
    detector: Arc<dyn Detector>,
    settings: CaptureSettings,
}

impl DetectCommand {
    pub fn new(camera: Arc<dyn Camera>, detector: Arc<dyn Detector>, settings: CaptureSettings) -> Self {
        Self {
            camera,
            detector,
            settings,
        }
    }
}

#[async_trait]
impl Command for DetectCommand {
    fn name(&self) -> &'static str {
        "DETECT"
    }

    async fn execute(&self, _args: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
        let start = Instant::now();

        let path = capture_until_ready(self.camera.as_ref(), &self.settings).await;
        ctx.link
            .respond(format!("[TIMESTAMP] Image captured at {}", stamp()))
            .await?;

        ctx.link
            .respond(format!("[TIMESTAMP] Inference started at {}", stamp()))
            .await?;
        let crops = self.detector.infer(&path).await?;
        ctx.link
            .respond(format!("[TIMESTAMP] Inference finished at {}", stamp()))
            .await?;
        info!("{} detection(s)", crops.len());

        if crops.is_empty() {
            ctx.link.respond("[RESULT] No persons detected").await?;
        }
        for (i, crop) in crops.iter().enumerate() {
            send_crop(ctx.link, crop, i + 1, crops.len(), &self.settings).await?;
        }

        ctx.link
            .respond(format!(
                "[TIMESTAMP] Total duration: {:.2} sec",
                start.elapsed().as_secs_f64()
            ))
            .await?;
        Ok(())
    }
}

async fn send_crop(
    link: &mut Link,
    crop: &Path,
    index: usize,
    total: usize,
    settings: &CaptureSettings,
) -> Result<()> {
    let name = crop
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| crop.display().to_string());
    let payload = encode_file(crop, settings)?;
    debug!("crop {name}: {} encoded bytes", payload.len());

    link.respond(format!(
        "[TIMESTAMP] Sending {name} ({index}/{total}) at {}",
        stamp()
    ))
    .await?;
    link.send(payload.as_bytes()).await?;
    link.respond(format!("[TIMESTAMP] Sent {name} at {}", stamp()))
        .await?;
    Ok(())
}

// ── SCREENSHOT ───────────────────────────────────────────────────

/// `SCREENSHOT <file> [packet_size]`: send a stored image, optionally with
/// a one-off packet size.
pub struct ScreenshotCommand {
    image_dir: PathBuf,
    settings: CaptureSettings,
}

impl ScreenshotCommand {
    pub fn new(image_dir: impl Into<PathBuf>, settings: CaptureSettings) -> Self {
        Self {
            image_dir: image_dir.into(),
            settings,
        }
    }

    /// Only plain relative names inside the image directory are served.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let rel = Path::new(name);
        let plain = rel.components().all(|c| matches!(c, Component::Normal(_)));
        (plain && !name.is_empty()).then(|| self.image_dir.join(rel))
    }
}

const SCREENSHOT_USAGE: &str = "Usage: SCREENSHOT <file> [packet size]";

#[async_trait]
impl Command for ScreenshotCommand {
    fn name(&self) -> &'static str {
        "SCREENSHOT"
    }

    async fn execute(&self, args: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
        let path = args
            .first()
            .and_then(|name| self.resolve(name))
            .ok_or_else(|| FeatherError::Usage(SCREENSHOT_USAGE.into()))?;
        let packet_size = match args.get(1) {
            Some(arg) => Some(arg.parse::<usize>().map_err(|_| {
                FeatherError::Usage("Invalid packet size. Must be an integer.".into())
            })?),
            None => None,
        };

        let payload = encode_file(&path, &self.settings)?;

        let original = ctx.link.config().max_packet_size;
        if let Some(size) = packet_size {
            ctx.link.config_mut().set_max_packet_size(size)?;
        }
        let chunk = ctx.link.config().max_packet_size;

        let sent = async {
            ctx.link
                .respond(format!("{} in {chunk}-byte chunks", announcement(&self.settings)))
                .await?;
            ctx.link.send(payload.as_bytes()).await?;
            ctx.link.respond("SCREENSHOT SENT").await
        }
        .await;

        // The override applies to this transfer only.
        ctx.link.config_mut().max_packet_size = original;
        sent.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Dispatcher;
    use crate::frame::FINAL_TOKEN;
    use crate::imaging::{ImageFormat, decode_binary, decode_text};
    use crate::link::LinkConfig;
    use crate::radio::MemoryRadio;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Fails `failures` times, then returns a fixed file.
    struct FlakyCamera {
        path: PathBuf,
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Camera for FlakyCamera {
        async fn capture(&self) -> Option<PathBuf> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            (call >= self.failures).then(|| self.path.clone())
        }
    }

    struct FixedDetector(Vec<PathBuf>);

    #[async_trait]
    impl Detector for FixedDetector {
        async fn infer(&self, _image: &Path) -> Result<Vec<PathBuf>> {
            Ok(self.0.clone())
        }
    }

    fn write_png(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        let pixels = (0..16 * 16).map(|i| (i % 256) as u8).collect();
        Grayscale::new(16, 16, pixels).unwrap().save(&path).unwrap();
        path
    }

    fn settings() -> CaptureSettings {
        CaptureSettings {
            format: ImageFormat::new(4, 8, 8),
            dither: false,
            retry_delay: Duration::from_millis(1),
        }
    }

    fn session() -> (Link, MemoryRadio) {
        let (drone, station) = MemoryRadio::pair();
        let link = Link::new(Arc::new(drone), LinkConfig::default()).with_frame_delay(Duration::ZERO);
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
    async fn camera_text_retries_then_sends() {
        let dir = tempfile::tempdir().unwrap();
        let camera = Arc::new(FlakyCamera {
            path: write_png(&dir, "shot.png"),
            failures: 2,
            calls: AtomicUsize::new(0),
        });
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(CameraCommand::new(camera.clone(), settings()));

        let (mut link, station) = session();
        dispatcher.dispatch(&mut link, "CAMERA").await.unwrap();
        assert_eq!(camera.calls.load(Ordering::SeqCst), 3);

        let got = lines(&station).await;
        assert_eq!(got[0], "Sending a 8x8 4bpp image");
        assert_eq!(got[got.len() - 2], "SCREENSHOT SENT");
        assert_eq!(got[got.len() - 1], FINAL_TOKEN);

        let encoded = got[1..got.len() - 2].concat();
        let image = decode_text(&encoded, settings().format).unwrap();
        assert_eq!((image.width(), image.height()), (8, 8));
    }

    #[tokio::test]
    async fn camera_binary_sends_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "shot.png");
        let raw = std::fs::read(&path).unwrap();
        let camera = Arc::new(FlakyCamera {
            path,
            failures: 0,
            calls: AtomicUsize::new(0),
        });
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(CameraCommand::new(camera, settings()));

        let (mut link, station) = session();
        dispatcher.dispatch(&mut link, "camera BINARY").await.unwrap();
        let got = lines(&station).await;
        assert_eq!(got[0], format!("Sending a {}-byte binary image", raw.len()));
        let hex = got[1..got.len() - 2].concat();
        assert_eq!(decode_binary(&hex).unwrap(), raw);
    }

    #[tokio::test]
    async fn camera_rejects_unknown_mode() {
        let camera = Arc::new(FlakyCamera {
            path: PathBuf::from("unused.png"),
            failures: 0,
            calls: AtomicUsize::new(0),
        });
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(CameraCommand::new(camera.clone(), settings()));

        let (mut link, station) = session();
        dispatcher.dispatch(&mut link, "CAMERA video").await.unwrap();
        assert_eq!(
            lines(&station).await,
            vec!["Usage: CAMERA [text|binary]", FINAL_TOKEN]
        );
        assert_eq!(camera.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn detect_without_people() {
        let dir = tempfile::tempdir().unwrap();
        let camera = Arc::new(FlakyCamera {
            path: write_png(&dir, "frame.png"),
            failures: 0,
            calls: AtomicUsize::new(0),
        });
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(DetectCommand::new(
            camera,
            Arc::new(FixedDetector(vec![])),
            settings(),
        ));

        let (mut link, station) = session();
        dispatcher.dispatch(&mut link, "DETECT").await.unwrap();
        let got = lines(&station).await;
        assert_eq!(got.len(), 6);
        assert!(got[0].starts_with("[TIMESTAMP] Image captured at "));
        assert!(got[1].starts_with("[TIMESTAMP] Inference started at "));
        assert!(got[2].starts_with("[TIMESTAMP] Inference finished at "));
        assert_eq!(got[3], "[RESULT] No persons detected");
        assert!(got[4].starts_with("[TIMESTAMP] Total duration: "));
        assert_eq!(got[5], FINAL_TOKEN);
    }

    #[tokio::test]
    async fn detect_sends_each_crop() {
        let dir = tempfile::tempdir().unwrap();
        let camera = Arc::new(FlakyCamera {
            path: write_png(&dir, "frame.png"),
            failures: 0,
            calls: AtomicUsize::new(0),
        });
        let crops = vec![write_png(&dir, "crop_0.png"), write_png(&dir, "crop_1.png")];
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(DetectCommand::new(
            camera,
            Arc::new(FixedDetector(crops)),
            settings(),
        ));

        let (mut link, station) = session();
        dispatcher.dispatch(&mut link, "DETECT").await.unwrap();
        let got = lines(&station).await;
        let sending: Vec<_> = got
            .iter()
            .filter(|l| l.starts_with("[TIMESTAMP] Sending "))
            .collect();
        assert_eq!(sending.len(), 2);
        assert!(sending[0].starts_with("[TIMESTAMP] Sending crop_0.png (1/2) at "));
        assert!(got.iter().any(|l| l.starts_with("[TIMESTAMP] Sent crop_1.png at ")));
        assert!(!got.iter().any(|l| l.contains("No persons")));
    }

    #[tokio::test]
    async fn screenshot_overrides_packet_size_once() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir, "stored.png");
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(ScreenshotCommand::new(dir.path(), settings()));

        let (mut link, station) = session();
        dispatcher
            .dispatch(&mut link, "SCREENSHOT stored.png 48")
            .await
            .unwrap();
        let got = lines(&station).await;
        assert_eq!(got[0], "Sending a 8x8 4bpp image in 48-byte chunks");
        assert!(got[1..got.len() - 1].iter().all(|l| l.len() <= 48));
        assert_eq!(link.config().max_packet_size, 128);
    }

    #[tokio::test]
    async fn screenshot_refuses_paths_outside_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(ScreenshotCommand::new(dir.path(), settings()));

        let (mut link, station) = session();
        dispatcher
            .dispatch(&mut link, "SCREENSHOT ../etc/passwd")
            .await
            .unwrap();
        assert_eq!(lines(&station).await, vec![SCREENSHOT_USAGE, FINAL_TOKEN]);
    }
}
