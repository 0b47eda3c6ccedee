//! Tokio driver for the HUD runtime
//!
//! Ticks the runtime on an interval and fulfils its requests on spawned
//! tasks, so camera and model loads never hold up a frame. Results are
//! posted back into the runtime inbox.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use aether_core::CaptureDevice;
use aether_time::FrameClock;

use crate::{DetectorLoader, HudCommand, HudInbox, HudRequest, HudRuntime, RuntimeStats};

/// Platform capabilities the runtime asks for
pub struct HudServices<C> {
    pub loader: Arc<dyn DetectorLoader>,
    pub camera: Arc<Mutex<C>>,
}

impl<C: CaptureDevice + 'static> HudServices<C> {
    pub fn new(loader: Arc<dyn DetectorLoader>, camera: C) -> Self {
        HudServices {
            loader,
            camera: Arc::new(Mutex::new(camera)),
        }
    }

    /// Start every request on its own task
    pub fn dispatch(&self, requests: Vec<HudRequest>, inbox: &HudInbox) {
        for request in requests {
            let inbox = inbox.clone();
            match request {
                HudRequest::LoadDetector { generation } => {
                    let load = self.loader.load();
                    tokio::spawn(async move {
                        let result = load.await;
                        if !inbox.send(HudCommand::DetectorLoaded { generation, result }) {
                            tracing::debug!(generation, "runtime gone before model load finished");
                        }
                    });
                }
                HudRequest::AcquireCamera {
                    generation,
                    constraints,
                } => {
                    let camera = Arc::clone(&self.camera);
                    tokio::spawn(async move {
                        let result = camera.lock().await.acquire(constraints).await;
                        // A stream nobody receives is dropped here, which stops it
                        if !inbox.send(HudCommand::CameraAcquired { generation, result }) {
                            tracing::debug!(generation, "runtime gone before camera opened");
                        }
                    });
                }
            }
        }
    }
}

/// Tick `runtime` every `tick_interval` until `shutdown` resolves, then
/// tear it down. Returns the final stats.
pub async fn run_hud<C, F>(
    mut runtime: HudRuntime,
    services: HudServices<C>,
    tick_interval: Duration,
    shutdown: F,
) -> RuntimeStats
where
    C: CaptureDevice + 'static,
    F: Future<Output = ()>,
{
    let inbox = runtime.inbox();
    let mut clock = FrameClock::new();
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    tracing::info!(tick_interval = ?tick_interval, "hud driver started");
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                services.dispatch(runtime.take_requests(), &inbox);
                runtime.tick(clock.tick());
            }
        }
    }

    runtime.shutdown();
    let stats = runtime.stats().clone();
    tracing::info!(ticks = stats.ticks, detections = stats.detections, "hud driver stopped");
    stats
}
