//! Testing utilities and mock implementations.
//!
//! Provides a controllable engine binding so the pipeline and the HTTP
//! surface can be exercised end to end without a real ffmpeg install.
//!
//! # Example
//!
//! ```rust,ignore
//! use wavepress_core::testing::MockEngine;
//!
//! let engine = MockEngine::new();
//! engine.set_exec_output("output.mp3", vec![0u8; 4096]).await;
//! engine.fail_next_exec(EngineError::exec_failed("boom", None)).await;
//! ```

mod mock_engine;

pub use mock_engine::{EngineCall, MockEngine};
