//! Pipeline
//!
//! The concurrent core: job types, the three dedicated-thread stages
//! (detection, embedding, matching), the weapon-detector variant, and the
//! `Engine` that owns and wires all of them together.

pub mod clock;
pub mod detection_stage;
pub mod embedding_stage;
pub mod engine;
pub mod jobs;
pub mod matching_stage;
pub mod weapon_stage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use detection_stage::DetectionStage;
pub use embedding_stage::EmbeddingStage;
pub use engine::{Engine, PipelineMode};
pub use jobs::{EmbeddingJob, FaceJob};
pub use matching_stage::MatchingStage;
pub use weapon_stage::WeaponStage;
