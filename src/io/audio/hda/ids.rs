// ============================================================================
// src/io/audio/hda/ids.rs - Codec and Subsystem Identifiers
// ============================================================================
//!
//! コーデック ID・サブシステム ID と名前テーブル。

use hashbrown::HashMap;
use lazy_static::lazy_static;

/// 全 ID に一致するワイルドカード
pub const HDA_MATCH_ALL: u32 = 0xFFFF_FFFF;

/// ワイルドカード込みの ID 比較
///
/// 上位 16 ビットが全て 1 なら下位のみ、下位 16 ビットが全て 1 なら上位のみ比較する。
pub fn hda_dev_match(fl: u32, v: u32) -> bool {
    fl == HDA_MATCH_ALL
        || fl == v
        || ((fl & 0xFFFF_0000) == 0xFFFF_0000 && (fl & 0x0000_FFFF) == (v & 0x0000_FFFF))
        || ((fl & 0x0000_FFFF) == 0x0000_FFFF && (fl & 0xFFFF_0000) == (v & 0xFFFF_0000))
}

// ============================================================================
// Codec IDs
// ============================================================================

// Realtek
pub const HDA_CODEC_ALC260: u32 = 0x10ec_0260;
pub const HDA_CODEC_ALC262: u32 = 0x10ec_0262;
pub const HDA_CODEC_ALC268: u32 = 0x10ec_0268;
pub const HDA_CODEC_ALC269: u32 = 0x10ec_0269;
pub const HDA_CODEC_ALC662: u32 = 0x10ec_0662;
pub const HDA_CODEC_ALC861: u32 = 0x10ec_0861;
pub const HDA_CODEC_ALC880: u32 = 0x10ec_0880;
pub const HDA_CODEC_ALC882: u32 = 0x10ec_0882;
pub const HDA_CODEC_ALC883: u32 = 0x10ec_0883;
pub const HDA_CODEC_ALC885: u32 = 0x10ec_0885;
pub const HDA_CODEC_ALC888: u32 = 0x10ec_0888;
pub const HDA_CODEC_ALC889: u32 = 0x10ec_0889;

// Analog Devices
pub const HDA_CODEC_AD1882: u32 = 0x11d4_1882;
pub const HDA_CODEC_AD1883: u32 = 0x11d4_1883;
pub const HDA_CODEC_AD1984: u32 = 0x11d4_1984;
pub const HDA_CODEC_AD1984A: u32 = 0x11d4_194a;
pub const HDA_CODEC_AD1984B: u32 = 0x11d4_194b;
pub const HDA_CODEC_AD1986A: u32 = 0x11d4_1986;
pub const HDA_CODEC_AD1987: u32 = 0x11d4_1987;
pub const HDA_CODEC_AD1988: u32 = 0x11d4_1988;
pub const HDA_CODEC_AD1988B: u32 = 0x11d4_198b;
pub const HDA_CODEC_AD1989B: u32 = 0x11d4_989b;

// SigmaTel
pub const HDA_CODEC_STAC9221: u32 = 0x8384_7680;
pub const HDA_CODEC_STAC9228X: u32 = 0x8384_7616;

// Conexant
pub const HDA_CODEC_CX20549: u32 = 0x14f1_5045;
pub const HDA_CODEC_CX20551: u32 = 0x14f1_5047;

// ============================================================================
// Subsystem IDs
// ============================================================================

pub const HP_V3000_SUBVENDOR: u32 = 0x30b5_103c;
pub const HP_XW4300_SUBVENDOR: u32 = 0x3013_103c;
pub const HP_DV5000_SUBVENDOR: u32 = 0x30a5_103c;
pub const ASUS_W6F_SUBVENDOR: u32 = 0x1263_1043;
pub const ASUS_A8X_SUBVENDOR: u32 = 0x1043_1153;
pub const ASUS_M5200_SUBVENDOR: u32 = 0x1993_1043;
pub const APPLE_MB3_SUBVENDOR: u32 = 0x00a3_106b;
pub const APPLE_INTEL_MAC_SUBVENDOR: u32 = super::regs::APPLE_INTEL_MAC;

// ============================================================================
// Name Tables
// ============================================================================

const CODEC_NAMES: &[(u32, &str)] = &[
    (HDA_CODEC_ALC260, "Realtek ALC260"),
    (HDA_CODEC_ALC262, "Realtek ALC262"),
    (HDA_CODEC_ALC268, "Realtek ALC268"),
    (HDA_CODEC_ALC269, "Realtek ALC269"),
    (HDA_CODEC_ALC662, "Realtek ALC662"),
    (HDA_CODEC_ALC861, "Realtek ALC861"),
    (HDA_CODEC_ALC880, "Realtek ALC880"),
    (HDA_CODEC_ALC882, "Realtek ALC882"),
    (HDA_CODEC_ALC883, "Realtek ALC883"),
    (HDA_CODEC_ALC885, "Realtek ALC885"),
    (HDA_CODEC_ALC888, "Realtek ALC888"),
    (HDA_CODEC_ALC889, "Realtek ALC889"),
    (HDA_CODEC_AD1882, "Analog Devices AD1882"),
    (HDA_CODEC_AD1883, "Analog Devices AD1883"),
    (HDA_CODEC_AD1984, "Analog Devices AD1984"),
    (HDA_CODEC_AD1984A, "Analog Devices AD1984A"),
    (HDA_CODEC_AD1984B, "Analog Devices AD1984B"),
    (HDA_CODEC_AD1986A, "Analog Devices AD1986A"),
    (HDA_CODEC_AD1987, "Analog Devices AD1987"),
    (HDA_CODEC_AD1988, "Analog Devices AD1988"),
    (HDA_CODEC_AD1988B, "Analog Devices AD1988B"),
    (HDA_CODEC_AD1989B, "Analog Devices AD1989B"),
    (HDA_CODEC_STAC9221, "Sigmatel STAC9221"),
    (HDA_CODEC_STAC9228X, "Sigmatel STAC9228X"),
    (HDA_CODEC_CX20549, "Conexant CX20549 (Venice)"),
    (HDA_CODEC_CX20551, "Conexant CX20551 (Waikiki)"),
];

const VENDOR_NAMES: &[(u16, &str)] = &[
    (0x10ec, "Realtek (Unknown)"),
    (0x11d4, "Analog Devices (Unknown)"),
    (0x8384, "Sigmatel (Unknown)"),
    (0x111d, "IDT (Unknown)"),
    (0x14f1, "Conexant (Unknown)"),
    (0x8086, "Intel (Unknown)"),
    (0x10de, "NVIDIA (Unknown)"),
    (0x1002, "ATI (Unknown)"),
    (0x1106, "VIA (Unknown)"),
    (0x1013, "Cirrus Logic (Unknown)"),
];

lazy_static! {
    static ref CODEC_NAME_MAP: HashMap<u32, &'static str> = CODEC_NAMES.iter().copied().collect();
    static ref VENDOR_NAME_MAP: HashMap<u16, &'static str> = VENDOR_NAMES.iter().copied().collect();
}

/// コーデック ID から表示名を引く
pub fn find_codec_name(id: u32) -> &'static str {
    if let Some(name) = CODEC_NAME_MAP.get(&id) {
        return *name;
    }
    if let Some(name) = VENDOR_NAME_MAP.get(&((id >> 16) as u16)) {
        return *name;
    }
    if id == 0 { "NULL Codec" } else { "Unknown Codec" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_match() {
        assert!(hda_dev_match(HDA_MATCH_ALL, 0x1234_5678));
        assert!(hda_dev_match(0x1234_5678, 0x1234_5678));
        assert!(hda_dev_match(0xFFFF_5678, 0xABCD_5678));
        assert!(hda_dev_match(0x1234_FFFF, 0x1234_0001));
        assert!(!hda_dev_match(0x1234_FFFF, 0x4321_0001));
        assert!(!hda_dev_match(0x1234_5678, 0x1234_5679));
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(find_codec_name(HDA_CODEC_ALC885), "Realtek ALC885");
        assert_eq!(find_codec_name(0x10ec_0999), "Realtek (Unknown)");
        assert_eq!(find_codec_name(0), "NULL Codec");
        assert_eq!(find_codec_name(0xdead_beef), "Unknown Codec");
    }
}
