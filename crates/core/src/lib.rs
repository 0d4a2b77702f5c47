pub mod config;
pub mod engine;
pub mod level;
pub mod logsink;
pub mod orchestrator;
pub mod session;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ServerConfig,
};
pub use engine::{EngineConfig, EngineError, FfmpegEngine, TranscodeEngine};
pub use level::CompressionLevel;
pub use logsink::{LogLine, LogSink};
pub use orchestrator::{
    ConversionConfig, ConversionPhase, ConversionReport, ConvertError, Orchestrator,
    OrchestratorStatus, StatusCallback,
};
pub use session::{size_label_mb, Artifact, FileInfo, IntakeConfig, IntakeError, Session};
