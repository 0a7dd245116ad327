// ABOUTME: Incremental replication engine moving rows between tiers table by table
// ABOUTME: Watermark resolution, windowed extraction, swap-load merge and batch driving

pub mod batch;
pub mod extract;
pub mod merge;
pub mod orchestrator;
pub mod watermark;
pub mod window;

pub use batch::{run_batch, BatchStats, Selection};
pub use extract::{duration_text, extract, normalize_durations, strip_day_prefix};
pub use merge::{swap_load, STAGING_CHUNK_ROWS};
pub use orchestrator::{replicate, Edge, TableOutcome};
pub use watermark::{resolve_watermark, WATERMARK_CLOCK_SKEW_HOURS};
pub use window::{ReplicationWindow, Watermark, WatermarkKind, ID_BATCH_SIZE};
