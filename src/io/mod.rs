// ============================================================================
// src/io/mod.rs - I/O Subsystem
// ============================================================================
//!
//! I/O サブシステム。
//!
//! - `audio`: HD Audio コーデック
//! - `log`: 診断リングへのロギング

pub mod audio;
pub mod log;
