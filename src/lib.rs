// ============================================================================
// src/lib.rs - HD Audio Codec Control-Path Resolver
// ============================================================================
//!
//! # HD Audio コーデック制御パスリゾルバ
//!
//! コーデックから読み出したウィジェットグラフを元に、論理ジャック（アソシエーション）
//! を組み立て、DAC/ADC への経路をバックトラッキング探索で確定し、
//! 使われないノードと接続を刈り込み、ミキサーコントロールを OSS 風の
//! 論理デバイスへ割り当てる。
//!
//! ## モジュール
//! - `error`: 統一エラー型
//! - `io::log`: `log` クレート向け診断リングロガー
//! - `io::audio`: 動詞/パラメータ定義と HDA コーデック処理本体

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod error;
pub mod io;

pub use error::{ConfigError, HdaError, HdaResult};
