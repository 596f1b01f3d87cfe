//! Drone worker service.
//!
//! Connects to the station's radio bridge and runs the single worker loop:
//! receive one command frame, dispatch it as a complete transaction, wait
//! for the next. Commands never overlap, so the link session (history and
//! runtime configuration) needs no locking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use feather_core::command::{CameraCommand, DetectCommand, RunCommand, ScreenshotCommand};
use feather_core::{Dispatcher, FeatherError, Link, Radio, TcpRadio};

use crate::config::DroneConfig;

/// Pause before reconnecting to the bridge.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

// ── DroneService ─────────────────────────────────────────────────

/// The top-level drone service.
pub struct DroneService {
    config: DroneConfig,
    dispatcher: Dispatcher,
    running: Arc<AtomicBool>,
}

impl DroneService {
    /// Create a service and register every command the config enables.
    pub fn new(config: DroneConfig) -> Self {
        let dispatcher = build_dispatcher(&config);
        Self {
            config,
            dispatcher,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn verbs(&self) -> Vec<&'static str> {
        self.dispatcher.verbs()
    }

    /// Run until stopped, reconnecting whenever the bridge drops.
    ///
    /// Each connection starts a fresh link session from the configured
    /// `[link]` settings.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.running.store(true, Ordering::SeqCst);
        let addr = self.config.network.station_addr.clone();

        while self.is_running() {
            let radio = match TcpRadio::connect(addr.as_str(), self.config.ack_timeout()).await {
                Ok(radio) => radio,
                Err(e) => {
                    warn!("cannot reach station at {addr}: {e}");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
            };
            info!("connected to station at {addr}");

            match self.serve(Arc::new(radio)).await {
                Ok(()) => break,
                Err(FeatherError::ChannelClosed) => {
                    warn!("station link closed; reconnecting");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("drone service stopped");
        Ok(())
    }

    /// Worker loop over one radio. Returns `Ok` once stopped and
    /// [`FeatherError::ChannelClosed`] when the peer goes away.
    pub async fn serve(&self, radio: Arc<dyn Radio>) -> feather_core::Result<()> {
        let mut link = Link::new(Arc::clone(&radio), self.config.link_config())
            .with_frame_delay(self.config.frame_delay());
        let poll = self.config.poll_interval();

        while self.is_running() {
            let Some(frame) = radio.receive(poll).await? else {
                continue;
            };
            let line = String::from_utf8_lossy(&frame);
            debug!("received command frame: {line}");
            if let Err(e) = self.dispatcher.dispatch(&mut link, &line).await {
                // The station will time out waiting; keep serving.
                warn!("transaction for {:?} not finished: {e}", line.trim());
            }
        }
        Ok(())
    }
}

/// Builtins plus the peripheral commands.
///
/// DETECT is only registered when a detector program is configured; an
/// unconfigured drone answers it as an unimplemented command.
fn build_dispatcher(config: &DroneConfig) -> Dispatcher {
    let settings = config.capture_settings();
    let camera = Arc::new(config.camera());

    let mut dispatcher = Dispatcher::with_builtins();
    dispatcher.register(RunCommand::new(config.run_timeout()));
    dispatcher.register(CameraCommand::new(camera.clone(), settings));
    dispatcher.register(ScreenshotCommand::new(
        config.camera.image_dir.clone(),
        settings,
    ));
    if let Some(detector) = config.detector() {
        dispatcher.register(DetectCommand::new(camera, Arc::new(detector), settings));
    }
    dispatcher
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use feather_core::{FINAL_TOKEN, MemoryRadio};
    use tokio::net::TcpListener;

    fn quiet_config() -> DroneConfig {
        let mut config = DroneConfig::default();
        config.link.frame_delay_ms = 0;
        config.network.poll_interval_ms = 20;
        config
    }

    async fn collect_transaction(radio: &dyn Radio) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let frame = radio
                .receive(Duration::from_secs(5))
                .await
                .unwrap()
                .expect("frame before timeout");
            let text = String::from_utf8(frame).unwrap();
            let done = text == FINAL_TOKEN;
            lines.push(text);
            if done {
                return lines;
            }
        }
    }

    #[test]
    fn detect_needs_a_detector() {
        let service = DroneService::new(DroneConfig::default());
        let verbs = service.verbs();
        assert!(verbs.contains(&"CAMERA"));
        assert!(verbs.contains(&"SCREENSHOT"));
        assert!(verbs.contains(&"RUN"));
        assert!(!verbs.contains(&"DETECT"));

        let mut config = DroneConfig::default();
        config.detector.program = "detect-people".into();
        assert!(DroneService::new(config).verbs().contains(&"DETECT"));
    }

    #[tokio::test]
    async fn serves_until_stopped() {
        let service = Arc::new(DroneService::new(quiet_config()));
        let (drone, station) = MemoryRadio::pair();
        service.running.store(true, Ordering::SeqCst);

        let worker = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.serve(Arc::new(drone)).await })
        };

        station.send_with_ack(b"status").await.unwrap();
        assert_eq!(
            collect_transaction(&station).await,
            vec!["→ Drone is online and ready".to_string(), FINAL_TOKEN.to_string()]
        );

        service.stop();
        worker.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn closed_link_ends_serve() {
        let service = DroneService::new(quiet_config());
        let (drone, station) = MemoryRadio::pair();
        service.running.store(true, Ordering::SeqCst);
        drop(station);

        let err = service.serve(Arc::new(drone)).await.unwrap_err();
        assert!(matches!(err, FeatherError::ChannelClosed));
    }

    #[tokio::test]
    async fn connects_to_station_bridge() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = quiet_config();
        config.network.station_addr = listener.local_addr().unwrap().to_string();

        let service = Arc::new(DroneService::new(config));
        let stop = service.stop_handle();
        let worker = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.run().await.map_err(|e| e.to_string()) })
        };

        let (stream, _) = listener.accept().await.unwrap();
        let station = TcpRadio::new(stream, Duration::from_secs(2));
        station.send_with_ack(b"HELP").await.unwrap();
        let lines = collect_transaction(&station).await;
        assert!(lines[0].starts_with("Valid commands: "));
        assert!(lines[0].contains("SCREENSHOT"));

        stop.store(false, Ordering::SeqCst);
        worker.await.unwrap().unwrap();
    }
}
