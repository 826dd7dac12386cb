//! 統一エラーハンドリングモジュール
//!
//! コーデック処理全体で使用されるエラー型を定義し、
//! 設定文字列の解析エラーからの変換を提供します。
//!
//! プローブ中のハードウェア異常はエラーとして返さずログに記録して継続する。
//! `Result` を返すのは設定の解析と公開レジストリ API のみ。

use alloc::string::String;
use core::fmt;

use crate::io::audio::hda::Nid;

/// HDA コーデック処理の統一エラー型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HdaError {
    /// デバイスが登録されていない
    NoDevice,
    /// 応答するコーデックがない
    NoCodec,
    /// コーデックが応答しない（コーデックアドレス）
    CodecNotResponding(u8),
    /// オーディオファンクショングループがない（コーデックアドレス）
    NoFunctionGroup(u8),
    /// 無効なノード
    InvalidNode(Nid),
    /// 設定文字列の解析エラー
    Config(ConfigError),
    /// 無効な設定値
    InvalidConfig(String),
    /// メモリ確保失敗
    AllocFailed,
    /// レジストリ未初期化
    NotInitialized,
    /// 対応するハードウェアがない操作
    NotSupported(&'static str),
}

/// 設定文字列の解析エラーの種類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 未知のキー
    UnknownKey(String),
    /// 数値として解釈できない
    BadNumber(String),
    /// 未知のクワーク名
    UnknownQuirk(String),
    /// 対象ノードの指定がない
    MissingNode,
}

pub type HdaResult<T> = Result<T, HdaError>;

// ===== Display implementations =====

impl fmt::Display for HdaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HdaError::NoDevice => write!(f, "no HD Audio device"),
            HdaError::NoCodec => write!(f, "no codec responded"),
            HdaError::CodecNotResponding(cad) => write!(f, "codec {} is not responding", cad),
            HdaError::NoFunctionGroup(cad) => {
                write!(f, "codec {} has no audio function group", cad)
            }
            HdaError::InvalidNode(nid) => write!(f, "invalid node {}", nid),
            HdaError::Config(e) => write!(f, "config error: {}", e),
            HdaError::InvalidConfig(s) => write!(f, "invalid config: {}", s),
            HdaError::AllocFailed => write!(f, "allocation failed"),
            HdaError::NotInitialized => write!(f, "device not initialized"),
            HdaError::NotSupported(what) => write!(f, "not supported: {}", what),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownKey(k) => write!(f, "unknown key '{}'", k),
            ConfigError::BadNumber(v) => write!(f, "bad number '{}'", v),
            ConfigError::UnknownQuirk(q) => write!(f, "unknown quirk '{}'", q),
            ConfigError::MissingNode => write!(f, "missing node"),
        }
    }
}

// ===== From implementations =====

impl From<ConfigError> for HdaError {
    fn from(e: ConfigError) -> Self {
        HdaError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_display() {
        assert_eq!(
            HdaError::CodecNotResponding(2).to_string(),
            "codec 2 is not responding"
        );
        let e: HdaError = ConfigError::UnknownKey("foo".into()).into();
        assert_eq!(e.to_string(), "config error: unknown key 'foo'");
    }
}
