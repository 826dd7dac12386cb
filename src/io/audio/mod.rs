// ============================================================================
// src/io/audio/mod.rs - Audio Subsystem Module
// ============================================================================
//!
//! # オーディオサブシステム
//!
//! ## モジュール
//! - `hda`: HD Audio コーデックの経路解決と制御
//! - `regs`: コーデック動詞・パラメータ定義

pub mod hda;
pub mod regs;

pub use hda::{CodecBus, HdaConfig, HdaDevice};
