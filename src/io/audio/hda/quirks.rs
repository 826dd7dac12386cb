// ============================================================================
// src/io/audio/hda/quirks.rs - Vendor Quirk Tables
// ============================================================================
//!
//! ベンダー/サブシステム別のクワーク。
//!
//! ## 機能
//! - 名前付きクワークビット（`QuirkSet`）
//! - (サブシステム ID, コーデック ID) による静的クワーク表
//! - 設定文字列 `"gpio0, nofixedrate"` の解析

use alloc::string::String;
use core::fmt;

use bitflags::bitflags;
use hashbrown::HashMap;
use lazy_static::lazy_static;
use log::warn;

use super::ids::*;
use crate::error::ConfigError;

bitflags! {
    /// クワークビット集合
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct QuirkSet: u32 {
        const GPIO0 = 1 << 0;
        const GPIO1 = 1 << 1;
        const GPIO2 = 1 << 2;
        const GPIO3 = 1 << 3;
        const GPIO4 = 1 << 4;
        const GPIO5 = 1 << 5;
        const GPIO6 = 1 << 6;
        const GPIO7 = 1 << 7;
        const GPIOFLUSH = 1 << 8;
        const SOFTPCMVOL = 1 << 9;
        const FIXEDRATE = 1 << 10;
        const FORCESTEREO = 1 << 11;
        const EAPDINV = 1 << 12;
        const DMAPOS = 1 << 13;
        const SENSEINV = 1 << 14;
        const IVREF50 = 1 << 26;
        const IVREF80 = 1 << 27;
        const IVREF100 = 1 << 28;
        const OVREF50 = 1 << 29;
        const OVREF80 = 1 << 30;
        const OVREF100 = 1 << 31;

        const IVREF = Self::IVREF50.bits() | Self::IVREF80.bits() | Self::IVREF100.bits();
        const OVREF = Self::OVREF50.bits() | Self::OVREF80.bits() | Self::OVREF100.bits();
        const VREF = Self::IVREF.bits() | Self::OVREF.bits();
    }
}

/// 名前とビットの対応（表示順）
const QUIRK_NAMES: &[(&str, QuirkSet)] = &[
    ("gpio0", QuirkSet::GPIO0),
    ("gpio1", QuirkSet::GPIO1),
    ("gpio2", QuirkSet::GPIO2),
    ("gpio3", QuirkSet::GPIO3),
    ("gpio4", QuirkSet::GPIO4),
    ("gpio5", QuirkSet::GPIO5),
    ("gpio6", QuirkSet::GPIO6),
    ("gpio7", QuirkSet::GPIO7),
    ("gpioflush", QuirkSet::GPIOFLUSH),
    ("softpcmvol", QuirkSet::SOFTPCMVOL),
    ("fixedrate", QuirkSet::FIXEDRATE),
    ("forcestereo", QuirkSet::FORCESTEREO),
    ("eapdinv", QuirkSet::EAPDINV),
    ("dmapos", QuirkSet::DMAPOS),
    ("senseinv", QuirkSet::SENSEINV),
    ("ivref50", QuirkSet::IVREF50),
    ("ivref80", QuirkSet::IVREF80),
    ("ivref100", QuirkSet::IVREF100),
    ("ovref50", QuirkSet::OVREF50),
    ("ovref80", QuirkSet::OVREF80),
    ("ovref100", QuirkSet::OVREF100),
    ("ivref", QuirkSet::IVREF),
    ("ovref", QuirkSet::OVREF),
    ("vref", QuirkSet::VREF),
];

lazy_static! {
    static ref QUIRK_NAME_MAP: HashMap<&'static str, QuirkSet> = QUIRK_NAMES.iter().copied().collect();
}

impl QuirkSet {
    /// 名前からクワークを引く（大文字小文字は区別しない）
    pub fn by_name(name: &str) -> Result<QuirkSet, ConfigError> {
        let lower = name.to_ascii_lowercase();
        QUIRK_NAME_MAP
            .get(lower.as_str())
            .copied()
            .ok_or_else(|| ConfigError::UnknownQuirk(String::from(name)))
    }

    /// 設定文字列を (有効化, 無効化) の組に解析する
    ///
    /// 区切りはカンマまたは空白。`no` 接頭辞で無効化側に入る。
    /// 未知の名前は警告を出して無視する。
    pub fn parse_config(s: &str) -> (QuirkSet, QuirkSet) {
        let mut on = QuirkSet::empty();
        let mut off = QuirkSet::empty();
        for token in s
            .split(|c: char| c == ',' || c.is_ascii_whitespace())
            .filter(|t| !t.is_empty())
        {
            let lower = token.to_ascii_lowercase();
            if let Some(rest) = lower.strip_prefix("no") {
                if let Ok(q) = QuirkSet::by_name(rest) {
                    off |= q;
                    on &= !q;
                    continue;
                }
            }
            match QuirkSet::by_name(&lower) {
                Ok(q) => {
                    on |= q;
                    off &= !q;
                }
                Err(e) => warn!("quirk config: {}", e),
            }
        }
        (on, off)
    }
}

impl fmt::Display for QuirkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        // グループ名は個別ビットと重複するので出さない
        for (name, q) in QUIRK_NAMES.iter().filter(|(_, q)| q.bits().count_ones() == 1) {
            if self.contains(*q) {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Static Quirk Table
// ============================================================================

/// 静的クワーク表の1エントリ
#[derive(Debug, Clone, Copy)]
pub struct QuirkEntry {
    pub subvendor: u32,
    pub codec: u32,
    pub set: QuirkSet,
    pub unset: QuirkSet,
}

const fn quirk(subvendor: u32, codec: u32, set: QuirkSet, unset: QuirkSet) -> QuirkEntry {
    QuirkEntry {
        subvendor,
        codec,
        set,
        unset,
    }
}

pub const QUIRK_TABLE: &[QuirkEntry] = &[
    quirk(HP_V3000_SUBVENDOR, HDA_CODEC_CX20549, QuirkSet::GPIO0, QuirkSet::empty()),
    quirk(HP_XW4300_SUBVENDOR, HDA_CODEC_ALC260, QuirkSet::GPIO3, QuirkSet::empty()),
    quirk(HP_DV5000_SUBVENDOR, HDA_CODEC_CX20551, QuirkSet::EAPDINV, QuirkSet::empty()),
    quirk(ASUS_W6F_SUBVENDOR, HDA_CODEC_ALC861, QuirkSet::EAPDINV, QuirkSet::empty()),
    quirk(ASUS_A8X_SUBVENDOR, HDA_CODEC_AD1986A, QuirkSet::EAPDINV, QuirkSet::empty()),
    quirk(ASUS_M5200_SUBVENDOR, HDA_CODEC_ALC880, QuirkSet::GPIO0, QuirkSet::empty()),
    quirk(
        APPLE_MB3_SUBVENDOR,
        HDA_CODEC_ALC885,
        QuirkSet::GPIO0.union(QuirkSet::OVREF50),
        QuirkSet::empty(),
    ),
    quirk(
        APPLE_INTEL_MAC_SUBVENDOR,
        HDA_CODEC_STAC9221,
        QuirkSet::GPIO0.union(QuirkSet::GPIO1),
        QuirkSet::empty(),
    ),
    quirk(
        HDA_MATCH_ALL,
        HDA_CODEC_AD1988,
        QuirkSet::IVREF80,
        QuirkSet::IVREF50.union(QuirkSet::IVREF100),
    ),
    quirk(HDA_MATCH_ALL, HDA_CODEC_CX20549, QuirkSet::empty(), QuirkSet::FORCESTEREO),
];

/// 表を順に適用したクワークを返す
pub fn apply_quirk_table(table: &[QuirkEntry], subvendor: u32, codec: u32, mut quirks: QuirkSet) -> QuirkSet {
    for entry in table
        .iter()
        .filter(|e| hda_dev_match(e.subvendor, subvendor) && hda_dev_match(e.codec, codec))
    {
        quirks |= entry.set;
        quirks &= !entry.unset;
    }
    quirks
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_parse_config() {
        let (on, off) = QuirkSet::parse_config("gpio0, nofixedrate  ovref50,bogus");
        assert_eq!(on, QuirkSet::GPIO0 | QuirkSet::OVREF50);
        assert_eq!(off, QuirkSet::FIXEDRATE);
    }

    #[test]
    fn test_group_names() {
        let (on, off) = QuirkSet::parse_config("vref noivref");
        assert_eq!(on, QuirkSet::OVREF);
        assert_eq!(off, QuirkSet::IVREF);
        assert!(QuirkSet::by_name("senseINV").is_ok());
        assert_eq!(
            QuirkSet::by_name("nope"),
            Err(ConfigError::UnknownQuirk("nope".into()))
        );
        // フラグ名そのものでの検索（bitflags 側）とは別物
        assert_eq!(QuirkSet::from_name("SENSEINV"), Some(QuirkSet::SENSEINV));
        assert_eq!(QuirkSet::from_name("senseinv"), None);
        assert_eq!(QuirkSet::by_name("ivref"), Ok(QuirkSet::IVREF));
    }

    #[test]
    fn test_table_lookup() {
        let q = apply_quirk_table(QUIRK_TABLE, APPLE_MB3_SUBVENDOR, HDA_CODEC_ALC885, QuirkSet::empty());
        assert_eq!(q, QuirkSet::GPIO0 | QuirkSet::OVREF50);

        let q = apply_quirk_table(QUIRK_TABLE, 0x1234_5678, HDA_CODEC_AD1988, QuirkSet::IVREF);
        assert_eq!(q, QuirkSet::IVREF80);

        let q = apply_quirk_table(QUIRK_TABLE, 0x1234_5678, HDA_CODEC_CX20549, QuirkSet::FORCESTEREO);
        assert!(q.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!((QuirkSet::GPIO1 | QuirkSet::SENSEINV).to_string(), "gpio1 senseinv");
    }
}
