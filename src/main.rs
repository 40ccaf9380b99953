//! Sentinel Engine - Real-Time Face-Recognition Surveillance Pipeline
//!
//! A multi-stage concurrent video-recognition engine built with Rust.
//!
//! # Architecture
//!
//! This application follows Clean Architecture principles:
//! - **Domain**: Core business entities and rules
//! - **Application**: Pipeline stages and supporting services
//! - **Infrastructure**: External interfaces (camera, models, filesystem alerts)
//!
//! # References
//!
//! - Clean Architecture: https://blog.cleancoder.com/uncle-bob/2012/08/13/the-clean-architecture.html
//! - SOLID Principles: https://en.wikipedia.org/wiki/SOLID
//! - Object Calisthenics: https://williamdurand.fr/2013/06/03/object-calisthenics/

mod application;
mod domain;
mod infrastructure;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::pipeline::{Engine, PipelineMode, SystemClock};
use domain::ports::{FaceModel, NullDetectionLogSink, ThreatModel};
use infrastructure::alerts::FsAlertStore;
use infrastructure::camera::WebcamFrameSource;
use infrastructure::config::EngineConfig;
use infrastructure::models::{ArcFaceOnnxModel, DlibOnnxModel, YoloWeaponModel};

fn main() -> Result<()> {
    init_tracing();

    info!("starting sentinel-engine v{}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load()?;
    let camera_index: u32 = env_or("CAMERA_INDEX", 0);
    let clock = Arc::new(SystemClock::new());
    let frame_source = Arc::new(WebcamFrameSource::new(camera_index, clock.clone()));

    let alert_sink = Arc::new(FsAlertStore::new(&config).context("failed to initialise alert store")?);
    let detection_log_sink = Arc::new(NullDetectionLogSink);

    let mode = build_pipeline_mode()?;

    let engine = Engine::new(&config, frame_source, mode, alert_sink, detection_log_sink)
        .context("failed to construct engine")?;

    let engine = Arc::new(engine);
    let stopping = Arc::new(AtomicBool::new(false));
    {
        let engine = engine.clone();
        let stopping = stopping.clone();
        ctrlc::set_handler(move || {
            if !stopping.swap(true, Ordering::SeqCst) {
                info!("shutdown signal received");
                engine.stop();
            }
        })
        .context("failed to install signal handler")?;
    }

    engine.start();

    while !stopping.load(Ordering::SeqCst) {
        std::thread::park();
    }

    Ok(())
}

/// Selects the face-recognition or weapon-detection variant from
/// `PIPELINE_MODE` (`face` by default, or `weapon`), loading the
/// corresponding ONNX model(s) from the paths named by the matching
/// `*_MODEL_PATH` environment variables.
fn build_pipeline_mode() -> Result<PipelineMode> {
    let mode = std::env::var("PIPELINE_MODE").unwrap_or_else(|_| "face".to_string());
    match mode.as_str() {
        "weapon" => {
            let model_path = model_path_env("YOLO_WEAPON_MODEL_PATH")?;
            let threat_model: Arc<dyn ThreatModel> =
                Arc::new(YoloWeaponModel::load(&model_path).context("failed to load weapon model")?);
            Ok(PipelineMode::WeaponDetection { threat_model })
        }
        "face" | "" => {
            let family = std::env::var("FACE_MODEL_FAMILY").unwrap_or_else(|_| "dlib".to_string());
            let face_model: Arc<dyn FaceModel> = match family.as_str() {
                "arcface" => {
                    let detector_path = model_path_env("ARCFACE_DETECTOR_MODEL_PATH")?;
                    let embedder_path = model_path_env("ARCFACE_EMBEDDER_MODEL_PATH")?;
                    Arc::new(
                        ArcFaceOnnxModel::load(&detector_path, &embedder_path)
                            .context("failed to load arcface model")?,
                    )
                }
                _ => {
                    let detector_path = model_path_env("DLIB_DETECTOR_MODEL_PATH")?;
                    let embedder_path = model_path_env("DLIB_EMBEDDER_MODEL_PATH")?;
                    Arc::new(
                        DlibOnnxModel::load(&detector_path, &embedder_path)
                            .context("failed to load dlib model")?,
                    )
                }
            };
            Ok(PipelineMode::FaceRecognition { face_model })
        }
        other => anyhow::bail!("unknown PIPELINE_MODE {other:?}, expected \"face\" or \"weapon\""),
    }
}

fn model_path_env(name: &str) -> Result<PathBuf> {
    std::env::var(name)
        .map(PathBuf::from)
        .with_context(|| format!("{name} must be set to a valid model file path"))
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sentinel_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
