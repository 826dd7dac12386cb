// ============================================================================
// src/io/audio/hda/types.rs - HDA Types and Data Structures
// ============================================================================
//!
//! HDA コーデック処理で使用される型定義。
//!
//! - CORBエントリ生成
//! - 型付きインデックス（WidgetId / AssocId / ControlId / ChannelId）
//! - ウィジェット種別（ピンはペイロード付き）
//! - バインディング状態、方向
//! - OSS 論理デバイス ID とビットマスク

use bitflags::bitflags;

use super::regs::*;

/// ファンクショングループ内のノード番号
pub type Nid = u16;

// ============================================================================
// CORB Entry
// ============================================================================

/// Build a CORB command entry
/// Format: [Codec Address (4)] [Node ID (8)] [Verb (20)]
#[inline]
pub fn make_corb_entry(codec_addr: u8, node_id: Nid, verb: u32) -> u32 {
    ((codec_addr as u32 & 0x0F) << 28) | ((node_id as u32 & 0xFF) << 20) | (verb & 0xFFFFF)
}

// ============================================================================
// Typed Indices
// ============================================================================

/// ウィジェット表のインデックス（`nid - start`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetId(pub usize);

/// アソシエーション表のインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssocId(pub usize);

/// コントロール表のインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControlId(pub usize);

/// チャネル表のインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub usize);

// ============================================================================
// Widget Kind
// ============================================================================

/// ピンコンプレックス固有データ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinInfo {
    /// Configuration Default
    pub config: u32,
    /// Pin Capabilities
    pub cap: u32,
    /// Pin Widget Control
    pub ctrl: u32,
}

impl PinInfo {
    pub fn sequence(&self) -> u32 {
        (self.config & CONFIG_SEQUENCE_MASK) >> CONFIG_SEQUENCE_SHIFT
    }

    pub fn association(&self) -> u32 {
        (self.config & CONFIG_ASSOCIATION_MASK) >> CONFIG_ASSOCIATION_SHIFT
    }

    pub fn misc(&self) -> u32 {
        (self.config & CONFIG_MISC_MASK) >> CONFIG_MISC_SHIFT
    }

    pub fn color(&self) -> u32 {
        (self.config & CONFIG_COLOR_MASK) >> CONFIG_COLOR_SHIFT
    }

    pub fn connection_type(&self) -> u32 {
        (self.config & CONFIG_CONNECTION_TYPE_MASK) >> CONFIG_CONNECTION_TYPE_SHIFT
    }

    pub fn device(&self) -> u32 {
        (self.config & CONFIG_DEVICE_MASK) >> CONFIG_DEVICE_SHIFT
    }

    pub fn location(&self) -> u32 {
        (self.config & CONFIG_LOCATION_MASK) >> CONFIG_LOCATION_SHIFT
    }

    pub fn connectivity(&self) -> u32 {
        (self.config & CONFIG_CONNECTIVITY_MASK) >> CONFIG_CONNECTIVITY_SHIFT
    }

    /// デフォルトデバイスが出力側か
    pub fn is_output_device(&self) -> bool {
        matches!(
            self.device(),
            CONFIG_DEVICE_LINE_OUT
                | CONFIG_DEVICE_SPEAKER
                | CONFIG_DEVICE_HP_OUT
                | CONFIG_DEVICE_SPDIF_OUT
                | CONFIG_DEVICE_DIGITAL_OTHER_OUT
        )
    }

    pub fn has_cap(&self, bit: u32) -> bool {
        self.cap & bit != 0
    }
}

/// ウィジェット種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    AudioOutput,
    AudioInput,
    Mixer,
    Selector,
    PinComplex(PinInfo),
    Power,
    VolumeKnob,
    Beep,
    Vendor(u8),
}

impl WidgetKind {
    /// 生の種別値から変換する。ピンは空のピン情報で作られる
    pub fn from_raw(t: u8) -> Self {
        match t {
            WIDGET_TYPE_AUDIO_OUTPUT => WidgetKind::AudioOutput,
            WIDGET_TYPE_AUDIO_INPUT => WidgetKind::AudioInput,
            WIDGET_TYPE_AUDIO_MIXER => WidgetKind::Mixer,
            WIDGET_TYPE_AUDIO_SELECTOR => WidgetKind::Selector,
            WIDGET_TYPE_PIN_COMPLEX => WidgetKind::PinComplex(PinInfo::default()),
            WIDGET_TYPE_POWER => WidgetKind::Power,
            WIDGET_TYPE_VOLUME_KNOB => WidgetKind::VolumeKnob,
            WIDGET_TYPE_BEEP_GEN => WidgetKind::Beep,
            other => WidgetKind::Vendor(other),
        }
    }

    pub fn raw(&self) -> u8 {
        match self {
            WidgetKind::AudioOutput => WIDGET_TYPE_AUDIO_OUTPUT,
            WidgetKind::AudioInput => WIDGET_TYPE_AUDIO_INPUT,
            WidgetKind::Mixer => WIDGET_TYPE_AUDIO_MIXER,
            WidgetKind::Selector => WIDGET_TYPE_AUDIO_SELECTOR,
            WidgetKind::PinComplex(_) => WIDGET_TYPE_PIN_COMPLEX,
            WidgetKind::Power => WIDGET_TYPE_POWER,
            WidgetKind::VolumeKnob => WIDGET_TYPE_VOLUME_KNOB,
            WidgetKind::Beep => WIDGET_TYPE_BEEP_GEN,
            WidgetKind::Vendor(t) => *t,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WidgetKind::AudioOutput => "audio output",
            WidgetKind::AudioInput => "audio input",
            WidgetKind::Mixer => "audio mixer",
            WidgetKind::Selector => "audio selector",
            WidgetKind::PinComplex(_) => "pin",
            WidgetKind::Power => "power widget",
            WidgetKind::VolumeKnob => "volume widget",
            WidgetKind::Beep => "beep widget",
            WidgetKind::Vendor(_) => "vendor widget",
        }
    }
}

// ============================================================================
// Binding and Direction
// ============================================================================

/// ウィジェットの経路への割り当て状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    #[default]
    Unbound,
    /// ビープやモニタミキサーのような、アソシエーションを持たない予約経路
    Extra,
    Assoc(AssocId),
}

impl Binding {
    pub fn assoc(&self) -> Option<AssocId> {
        match self {
            Binding::Assoc(a) => Some(*a),
            _ => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self, Binding::Unbound)
    }
}

/// アソシエーションの方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// アンプの方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmpDir {
    In,
    Out,
}

/// チャネルの向き
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDir {
    Play,
    Rec,
}

bitflags! {
    /// 左右ミュート状態
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MuteFlags: u32 {
        const LEFT = 0x1;
        const RIGHT = 0x2;
        const ALL = Self::LEFT.bits() | Self::RIGHT.bits();
    }
}

bitflags! {
    /// ウィジェット属性フラグ
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WidgetFlags: u32 {
        /// 入力アソシエーションに属しつつ出力へ届くミキサー（入力モニタ）
        const ADC_MONITOR = 0x1;
    }
}

// ============================================================================
// OSS Logical Devices
// ============================================================================

/// OSS 風の論理ミキサーデバイス
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum OssDev {
    Volume = 0,
    Bass,
    Treble,
    Synth,
    Pcm,
    Speaker,
    Line,
    Mic,
    Cd,
    Imix,
    AltPcm,
    RecLev,
    IGain,
    OGain,
    Line1,
    Line2,
    Line3,
    Digital1,
    Digital2,
    Digital3,
    PhoneIn,
    PhoneOut,
    Video,
    Radio,
    Monitor,
}

/// 論理デバイス数
pub const OSS_DEVICE_COUNT: usize = 25;

const OSS_NAMES: [&str; OSS_DEVICE_COUNT] = [
    "vol", "bass", "treble", "synth", "pcm", "speaker", "line", "mic", "cd", "mix", "pcm2",
    "rec", "igain", "ogain", "line1", "line2", "line3", "dig1", "dig2", "dig3", "phin", "phout",
    "video", "radio", "monitor",
];

impl OssDev {
    pub const ALL: [OssDev; OSS_DEVICE_COUNT] = [
        OssDev::Volume,
        OssDev::Bass,
        OssDev::Treble,
        OssDev::Synth,
        OssDev::Pcm,
        OssDev::Speaker,
        OssDev::Line,
        OssDev::Mic,
        OssDev::Cd,
        OssDev::Imix,
        OssDev::AltPcm,
        OssDev::RecLev,
        OssDev::IGain,
        OssDev::OGain,
        OssDev::Line1,
        OssDev::Line2,
        OssDev::Line3,
        OssDev::Digital1,
        OssDev::Digital2,
        OssDev::Digital3,
        OssDev::PhoneIn,
        OssDev::PhoneOut,
        OssDev::Video,
        OssDev::Radio,
        OssDev::Monitor,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn name(self) -> &'static str {
        OSS_NAMES[self.index()]
    }

    pub fn mask(self) -> OssMask {
        OssMask::from_bits_retain(1 << self as u32)
    }
}

bitflags! {
    /// OSS 論理デバイスのビットマスク
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OssMask: u32 {
        const VOLUME = 1 << 0;
        const BASS = 1 << 1;
        const TREBLE = 1 << 2;
        const SYNTH = 1 << 3;
        const PCM = 1 << 4;
        const SPEAKER = 1 << 5;
        const LINE = 1 << 6;
        const MIC = 1 << 7;
        const CD = 1 << 8;
        const IMIX = 1 << 9;
        const ALTPCM = 1 << 10;
        const RECLEV = 1 << 11;
        const IGAIN = 1 << 12;
        const OGAIN = 1 << 13;
        const LINE1 = 1 << 14;
        const LINE2 = 1 << 15;
        const LINE3 = 1 << 16;
        const DIGITAL1 = 1 << 17;
        const DIGITAL2 = 1 << 18;
        const DIGITAL3 = 1 << 19;
        const PHONEIN = 1 << 20;
        const PHONEOUT = 1 << 21;
        const VIDEO = 1 << 22;
        const RADIO = 1 << 23;
        const MONITOR = 1 << 24;

        /// 既定の録音ソース
        const INPUT = Self::LINE.bits() | Self::MIC.bits() | Self::CD.bits() | Self::MONITOR.bits();
    }
}

impl OssMask {
    /// 含まれる論理デバイスを昇順に列挙する
    pub fn devices(self) -> impl Iterator<Item = OssDev> {
        OssDev::ALL.into_iter().filter(move |d| self.contains(d.mask()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corb_entry() {
        assert_eq!(make_corb_entry(2, 0x14, VERB_SET_PIN_CTL | 0x40), 0x2147_0740);
    }

    #[test]
    fn test_pin_fields() {
        let pin = PinInfo {
            config: 0x0121_4010,
            cap: 0,
            ctrl: 0,
        };
        assert_eq!(pin.sequence(), 0);
        assert_eq!(pin.association(), 1);
        assert_eq!(pin.color(), 4);
        assert_eq!(pin.connection_type(), 1);
        assert_eq!(pin.device(), CONFIG_DEVICE_HP_OUT);
        assert_eq!(pin.location(), 1);
        assert_eq!(pin.connectivity(), CONFIG_CONNECTIVITY_JACK);
        assert!(pin.is_output_device());
    }

    #[test]
    fn test_oss_mask_devices() {
        let mask = OssMask::VOLUME | OssMask::MIC;
        let devs: alloc::vec::Vec<_> = mask.devices().collect();
        assert_eq!(devs, [OssDev::Volume, OssDev::Mic]);
        assert_eq!(OssDev::Monitor.mask(), OssMask::MONITOR);
        assert_eq!(OssDev::Imix.name(), "mix");
    }
}
