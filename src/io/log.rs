// ============================================================================
// src/io/log.rs - Diagnostic Ring Logger using the `log` crate
// ============================================================================
//!
//! コーデック処理用ロギングシステム。
//!
//! ## 機能
//! - `log`クレートを使用した標準的なログインターフェース
//! - 上限付き診断リングへの蓄積（満杯になったら以降は破棄して件数のみ数える）
//! - コンパイル時のログレベルフィルタリング
//! - マルチコア安全なSpinlock保護
//!
//! ## 使用方法
//! ```ignore
//! use log::{info, debug, warn, error};
//!
//! info!("codec probed");
//! let text = hda_codec::io::log::snapshot();
//! ```

use alloc::string::String;
use core::fmt::Write;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

// ============================================================================
// 定数定義
// ============================================================================

/// 診断リングの既定容量（バイト）
pub const DEFAULT_RING_CAPACITY: usize = 64 * 1024;

/// 1レコードに確保する余白。残りがこれを下回ったら新規レコードを受け付けない
const RECORD_HEADROOM: usize = 255;

// ============================================================================
// ログレベル定義
// ============================================================================

/// コンパイル時のログレベル（featureで変更可能）
#[cfg(feature = "verbose_logging")]
const MAX_LOG_LEVEL: LevelFilter = LevelFilter::Trace;

#[cfg(not(feature = "verbose_logging"))]
const MAX_LOG_LEVEL: LevelFilter = LevelFilter::Info;

// ============================================================================
// ロガー状態管理
// ============================================================================

/// ロガーの初期化状態
static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// 現在のログレベル（実行時変更可能）
static CURRENT_LOG_LEVEL: AtomicU8 = AtomicU8::new(LevelFilter::Info as u8);

/// 破棄したレコード数
static DROPPED: AtomicUsize = AtomicUsize::new(0);

// ============================================================================
// 診断リング
// ============================================================================

/// 上限付き診断バッファ
///
/// 残り容量が [`RECORD_HEADROOM`] を下回った時点で追記を止める。
/// 古いレコードを上書きはしない（最初の障害の記録を残すため）。
pub struct DiagRing {
    buf: String,
    cap: usize,
}

impl DiagRing {
    pub const fn new(cap: usize) -> Self {
        Self {
            buf: String::new(),
            cap,
        }
    }

    /// 受け付け可能か
    pub fn has_room(&self) -> bool {
        self.buf.len() + RECORD_HEADROOM <= self.cap
    }

    /// 1レコード追記。受け付けなかった場合は false
    pub fn push_record(&mut self, level: Level, module: Option<&str>, args: &core::fmt::Arguments) -> bool {
        if !self.has_room() {
            return false;
        }
        let _ = write!(self.buf, "{}", level_prefix(level));
        if let Some(module) = module {
            let _ = write!(self.buf, "[{}] ", module);
        }
        let _ = write!(self.buf, "{}", args);
        // 長すぎるレコードは容量に収まるよう切り詰める
        if self.buf.len() + 1 > self.cap {
            let mut end = self.cap.saturating_sub(1);
            while !self.buf.is_char_boundary(end) {
                end -= 1;
            }
            self.buf.truncate(end);
        }
        self.buf.push('\n');
        true
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// ログレベルのプレフィックスを取得
fn level_prefix(level: Level) -> &'static str {
    match level {
        Level::Error => "[ERROR] ",
        Level::Warn => "[WARN]  ",
        Level::Info => "[INFO]  ",
        Level::Debug => "[DEBUG] ",
        Level::Trace => "[TRACE] ",
    }
}

static RING: Mutex<DiagRing> = Mutex::new(DiagRing::new(DEFAULT_RING_CAPACITY));

// ============================================================================
// ロガー実装
// ============================================================================

/// 診断リングロガー
struct DiagLogger;

impl Log for DiagLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= current_log_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut ring = RING.lock();
        if !ring.push_record(record.level(), record.module_path(), record.args()) {
            DROPPED.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn flush(&self) {}
}

/// グローバルロガーインスタンス
static LOGGER: DiagLogger = DiagLogger;

// ============================================================================
// 公開API
// ============================================================================

/// ロギングシステムを初期化
pub fn init() -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(MAX_LOG_LEVEL);
    CURRENT_LOG_LEVEL.store(MAX_LOG_LEVEL as u8, Ordering::SeqCst);
    LOGGER_INITIALIZED.store(true, Ordering::SeqCst);
    Ok(())
}

/// 実行時にログレベルを変更
pub fn set_log_level(level: LevelFilter) {
    CURRENT_LOG_LEVEL.store(level as u8, Ordering::SeqCst);
    log::set_max_level(level);
}

/// 現在のログレベルを取得
pub fn current_log_level() -> LevelFilter {
    LevelFilter::iter()
        .nth(CURRENT_LOG_LEVEL.load(Ordering::Relaxed) as usize)
        .unwrap_or(LevelFilter::Info)
}

/// ロガーが初期化済みかどうか
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.load(Ordering::Relaxed)
}

/// 診断リングの内容を複製して返す
pub fn snapshot() -> String {
    String::from(RING.lock().as_str())
}

/// 診断リングを空にする
pub fn clear() {
    RING.lock().clear();
    DROPPED.store(0, Ordering::Relaxed);
}

/// 容量超過で破棄したレコード数
pub fn dropped() -> usize {
    DROPPED.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_formats_record() {
        let mut ring = DiagRing::new(1024);
        assert!(ring.push_record(Level::Warn, Some("hda"), &format_args!("nid {} ghost", 7)));
        assert_eq!(ring.as_str(), "[WARN]  [hda] nid 7 ghost\n");
    }

    #[test]
    fn test_ring_stops_when_full() {
        let mut ring = DiagRing::new(260);
        assert!(ring.push_record(Level::Info, None, &format_args!("first")));
        let len = ring.len();
        assert!(!ring.push_record(Level::Info, None, &format_args!("second")));
        assert_eq!(ring.len(), len);
        ring.clear();
        assert!(ring.is_empty());
    }

    #[test]
    fn test_ring_truncates_long_record() {
        let mut ring = DiagRing::new(300);
        let long = "あ".repeat(200);
        assert!(ring.push_record(Level::Debug, Some("hda"), &format_args!("{}", long)));
        assert!(ring.len() <= 300);
        assert!(ring.as_str().starts_with("[DEBUG] [hda] "));
        assert!(ring.as_str().ends_with('\n'));
        assert!(!ring.has_room());
    }
}
