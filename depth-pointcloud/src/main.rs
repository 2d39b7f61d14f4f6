//! Depth Point Cloud - Synthetic Capture Demo
//!
//! Runs a fake depth sensor on a background thread and assembles a point cloud
//! from the newest frame on the main thread, the way an AR session hands depth
//! to its renderer. Usage: `depth-pointcloud [config.json]`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use depth_pointcloud::{
    AnchorHandle, AnchorId, CameraIntrinsics, CaptureCamera, ConfidenceImage, DepthImage,
    FrameInputs, FrameSource, NotYetAvailable, PointCloudAssembler, PointCloudConfig, Pose,
    ProduceResult, TrackingState,
};
use glam::{Quat, Vec3};
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use rand::Rng;

const DEPTH_WIDTH: u32 = 160;
const DEPTH_HEIGHT: u32 = 120;
const COLOR_WIDTH: u32 = 640;
const COLOR_HEIGHT: u32 = 480;
const CAPTURE_FPS: u64 = 30;
const PROCESS_FPS: u64 = 60;
/// Frames reported before tracking converges
const WARMUP_FRAMES: u64 = 15;
const RUN_TIME: Duration = Duration::from_secs(4);
const LOG_EVERY: u64 = 30;

/// One frame from the synthetic sensor
struct CapturedFrame {
    depth: Vec<u16>,
    /// 0-255 confidence codes
    confidence: Vec<u8>,
    color: RgbImage,
    camera: CaptureCamera,
    frame_number: u64,
    timestamp_ns: u64,
}

impl CapturedFrame {
    /// Render frame `frame_number`: a wall two meters out with a sphere
    /// drifting across it, plus sensor noise and dropouts.
    fn synthesize(frame_number: u64, timestamp_ns: u64, rng: &mut impl Rng) -> Self {
        let pixels = (DEPTH_WIDTH * DEPTH_HEIGHT) as usize;
        let mut depth = Vec::with_capacity(pixels);
        let mut confidence = Vec::with_capacity(pixels);

        let sphere_x = (frame_number as f32 * 0.02).sin() * 0.25;
        for row in 0..DEPTH_HEIGHT {
            for col in 0..DEPTH_WIDTH {
                if rng.random_bool(0.02) {
                    depth.push(0);
                    confidence.push(0);
                    continue;
                }
                let u = col as f32 / DEPTH_WIDTH as f32 - 0.5 - sphere_x;
                let v = row as f32 / DEPTH_HEIGHT as f32 - 0.5;
                let r2 = (u * u + v * v) / 0.04;
                let bump = if r2 < 1.0 { 600.0 * (1.0 - r2).sqrt() } else { 0.0 };
                let jitter = rng.random_range(-5.0..=5.0);
                depth.push((2000.0 - bump + jitter) as u16);
                confidence.push(if bump > 0.0 { 200 } else { 255 });
            }
        }

        let tint = (frame_number % 256) as u8;
        let color = RgbImage::from_fn(COLOR_WIDTH, COLOR_HEIGHT, |x, y| {
            Rgb([
                (x * 255 / COLOR_WIDTH) as u8,
                (y * 255 / COLOR_HEIGHT) as u8,
                tint,
            ])
        });

        // Intrinsics come in at color resolution
        let intrinsics = CameraIntrinsics::new(
            500.0,
            500.0,
            COLOR_WIDTH as f32 / 2.0,
            COLOR_HEIGHT as f32 / 2.0,
            COLOR_WIDTH,
            COLOR_HEIGHT,
        )
        .scaled_to(DEPTH_WIDTH, DEPTH_HEIGHT);
        let angle = frame_number as f32 * 0.01;
        let pose = Pose::new(
            Quat::from_rotation_y(angle),
            Vec3::new(angle.sin() * 0.5, 1.5, angle.cos() * 0.5),
        );

        Self {
            depth,
            confidence,
            color,
            camera: CaptureCamera::new(intrinsics, pose),
            frame_number,
            timestamp_ns,
        }
    }

    fn tracking_state(&self) -> TrackingState {
        if self.frame_number < WARMUP_FRAMES {
            TrackingState::Paused
        } else {
            TrackingState::Tracking
        }
    }

    /// Inputs for this frame, anchored at the capture camera pose.
    fn inputs(&self) -> depth_pointcloud::Result<FrameInputs<'_, RgbImage>> {
        Ok(FrameInputs {
            depth: DepthImage::new(DEPTH_WIDTH, DEPTH_HEIGHT, &self.depth)?,
            confidence: ConfidenceImage::raw8(DEPTH_WIDTH, DEPTH_HEIGHT, &self.confidence)?,
            color: &self.color,
            camera: self.camera,
            anchor: AnchorHandle::new(
                AnchorId(self.frame_number),
                &self.camera.pose,
                self.tracking_state(),
            ),
            timestamp_ns: self.timestamp_ns,
        })
    }
}

/// What the session has for this tick
enum SessionFrame<'a> {
    /// Sensor has not delivered anything yet
    Pending,
    Captured(FrameInputs<'a, RgbImage>),
}

impl<'a> SessionFrame<'a> {
    fn captured(&self) -> Result<&FrameInputs<'a, RgbImage>, NotYetAvailable> {
        match self {
            SessionFrame::Captured(inputs) => Ok(inputs),
            SessionFrame::Pending => Err(NotYetAvailable),
        }
    }
}

impl FrameSource for SessionFrame<'_> {
    type Color = RgbImage;

    fn timestamp_ns(&self) -> u64 {
        self.captured().map_or(0, |inputs| inputs.timestamp_ns)
    }

    fn depth(&self) -> Result<DepthImage<'_>, NotYetAvailable> {
        self.captured()?.depth()
    }

    fn confidence(&self) -> Result<ConfidenceImage<'_>, NotYetAvailable> {
        self.captured()?.confidence()
    }

    fn color(&self) -> Result<&RgbImage, NotYetAvailable> {
        self.captured()?.color()
    }

    fn camera(&self) -> Result<CaptureCamera, NotYetAvailable> {
        self.captured()?.camera()
    }

    fn anchor(&self) -> Result<AnchorHandle<'_>, NotYetAvailable> {
        self.captured()?.anchor()
    }
}

/// Background sensor publishing into a latest-frame slot
struct SyntheticCapture {
    /// Newest frame, older ones are overwritten
    latest: Arc<Mutex<Option<Arc<CapturedFrame>>>>,
    running: Arc<AtomicBool>,
    frame_count: Arc<AtomicU64>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl SyntheticCapture {
    fn start() -> anyhow::Result<Self> {
        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let frame_count = Arc::new(AtomicU64::new(0));

        let latest_clone = latest.clone();
        let running_clone = running.clone();
        let frame_count_clone = frame_count.clone();

        let thread_handle = std::thread::Builder::new()
            .name("depth-capture".to_string())
            .spawn(move || Self::capture_thread(latest_clone, running_clone, frame_count_clone))
            .context("Failed to spawn capture thread")?;

        Ok(Self {
            latest,
            running,
            frame_count,
            thread_handle: Some(thread_handle),
        })
    }

    fn capture_thread(
        latest: Arc<Mutex<Option<Arc<CapturedFrame>>>>,
        running: Arc<AtomicBool>,
        frame_count: Arc<AtomicU64>,
    ) {
        log::info!("Starting synthetic depth capture ({}x{})", DEPTH_WIDTH, DEPTH_HEIGHT);

        let period = Duration::from_nanos(1_000_000_000 / CAPTURE_FPS);
        let started = Instant::now();
        let mut rng = rand::rng();

        // Sensor start-up latency before the first frame
        std::thread::sleep(period * 3);

        while running.load(Ordering::Acquire) {
            let tick = Instant::now();
            let frame_number = frame_count.load(Ordering::Relaxed);
            let timestamp_ns = started.elapsed().as_nanos() as u64;
            let frame = CapturedFrame::synthesize(frame_number, timestamp_ns, &mut rng);

            *latest.lock() = Some(Arc::new(frame));
            frame_count.fetch_add(1, Ordering::Relaxed);

            if let Some(remaining) = period.checked_sub(tick.elapsed()) {
                std::thread::sleep(remaining);
            }
        }

        log::info!("Synthetic depth capture stopped");
    }

    fn latest_frame(&self) -> Option<Arc<CapturedFrame>> {
        self.latest.lock().clone()
    }

    fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SyntheticCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn load_config() -> anyhow::Result<PointCloudConfig> {
    match std::env::args_os().nth(1) {
        Some(path) => {
            let path = Path::new(&path);
            PointCloudConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))
        }
        None => Ok(PointCloudConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Depth Point Cloud v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    log::info!(
        "max_points={} min_confidence={} point_space={:?} parallel={}",
        config.max_points,
        config.min_confidence,
        config.point_space,
        config.parallel
    );
    let assembler = PointCloudAssembler::new(config)?;

    let mut capture = SyntheticCapture::start()?;
    let tick = Duration::from_nanos(1_000_000_000 / PROCESS_FPS);
    let started = Instant::now();

    let mut last_frame_number = None;
    let mut produced = 0u64;
    let mut not_ready = 0u64;
    let mut errors = 0u64;

    while started.elapsed() < RUN_TIME {
        let captured = capture.latest_frame();
        let frame_number = captured.as_ref().map(|frame| frame.frame_number);
        if frame_number.is_some() && frame_number == last_frame_number {
            std::thread::sleep(tick);
            continue;
        }
        last_frame_number = frame_number;

        let source = match &captured {
            Some(frame) => SessionFrame::Captured(frame.inputs()?),
            None => SessionFrame::Pending,
        };

        match assembler.produce(&source) {
            ProduceResult::Frame(cloud) => {
                produced += 1;
                if produced % LOG_EVERY == 1 {
                    let stats = cloud.stats();
                    let anchor = cloud.anchor().pose.translation;
                    // Re-pose against the newest camera, as a renderer would
                    // once tracking has moved on.
                    let current = capture
                        .latest_frame()
                        .map_or(cloud.anchor().pose, |latest| latest.camera.pose);
                    let model = cloud.model_matrix_for(&current);
                    log::info!(
                        "Frame {:?}: {} points (sampled {}, invalid {}, low confidence {}), anchor [{:.3}, {:.3}, {:.3}], drift [{:.3}, {:.3}, {:.3}]",
                        frame_number,
                        cloud.len(),
                        stats.sampled,
                        stats.invalid_depth,
                        stats.low_confidence,
                        anchor.x,
                        anchor.y,
                        anchor.z,
                        model[12],
                        model[13],
                        model[14]
                    );
                }
            }
            ProduceResult::NotReady => not_ready += 1,
            ProduceResult::Error(err) => {
                errors += 1;
                log::error!("Point cloud assembly failed: {}", err);
            }
        }

        std::thread::sleep(tick);
    }

    capture.stop();
    log::info!(
        "Captured {} frames: {} clouds, {} not ready, {} errors",
        capture.frame_count(),
        produced,
        not_ready,
        errors
    );

    Ok(())
}
