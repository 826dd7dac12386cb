// ============================================================================
// src/io/audio/regs.rs - Intel High Definition Audio Codec Definitions
// ============================================================================
//!
//! # Intel HD Audio コーデック定義
//!
//! Intel High Definition Audio Specification Rev 1.0a に基づく
//! コーデック動詞・パラメータ・各種ビットフィールド定義。

#![allow(dead_code)]

// ============================================================================
// Command Response
// ============================================================================

/// 応答なし/タイムアウト時にバスが返す値
pub const HDA_INVALID: u32 = 0xFFFF_FFFF;

/// Apple 製マシンのサブシステム ID
pub const APPLE_INTEL_MAC: u32 = 0x7680_8384;

// ============================================================================
// Codec Command/Response Verbs
// ============================================================================

/// Get Parameter verb
pub const VERB_GET_PARAM: u32 = 0xF0000;

/// Set Connection Select Control verb
pub const VERB_SET_CONN_SEL: u32 = 0x70100;

/// Get Connection List Entry verb
pub const VERB_GET_CONN_LIST: u32 = 0xF0200;

/// Get Amplifier Gain/Mute verb (4-bit verb, 16-bit payload)
pub const VERB_GET_AMP_GAIN: u32 = 0xB0000;

/// Set Amplifier Gain/Mute verb (4-bit verb, 16-bit payload)
pub const VERB_SET_AMP_GAIN: u32 = 0x30000;

/// Set Power State verb
pub const VERB_SET_POWER: u32 = 0x70500;

/// Get Pin Widget Control verb
pub const VERB_GET_PIN_CTL: u32 = 0xF0700;

/// Set Pin Widget Control verb
pub const VERB_SET_PIN_CTL: u32 = 0x70700;

/// Set Unsolicited Response verb
pub const VERB_SET_UNSOL: u32 = 0x70800;

/// Get Pin Sense verb
pub const VERB_GET_PIN_SENSE: u32 = 0xF0900;

/// Get EAPD/BTL Enable verb
pub const VERB_GET_EAPD: u32 = 0xF0C00;

/// Set EAPD/BTL Enable verb
pub const VERB_SET_EAPD: u32 = 0x70C00;

/// Get GPIO Data verb
pub const VERB_GET_GPIO_DATA: u32 = 0xF1500;

/// Set GPIO Data verb
pub const VERB_SET_GPIO_DATA: u32 = 0x71500;

/// Get GPIO Enable Mask verb
pub const VERB_GET_GPIO_EN: u32 = 0xF1600;

/// Set GPIO Enable Mask verb
pub const VERB_SET_GPIO_EN: u32 = 0x71600;

/// Get GPIO Direction verb
pub const VERB_GET_GPIO_DIR: u32 = 0xF1700;

/// Set GPIO Direction verb
pub const VERB_SET_GPIO_DIR: u32 = 0x71700;

/// Get Configuration Default verb
pub const VERB_GET_CONFIG_DEFAULT: u32 = 0xF1C00;

/// Apple 固有の初期化動詞
pub const VERB_APPLE_INIT: u32 = 0x7E700;

// ============================================================================
// Parameters (for GET_PARAM verb)
// ============================================================================

/// Vendor ID
pub const PARAM_VENDOR_ID: u8 = 0x00;

/// Revision ID
pub const PARAM_REVISION_ID: u8 = 0x02;

/// Subordinate Node Count
pub const PARAM_SUB_NODE_COUNT: u8 = 0x04;

/// Function Group Type
pub const PARAM_FUNC_GROUP_TYPE: u8 = 0x05;

/// Audio Widget Capabilities
pub const PARAM_WIDGET_CAPS: u8 = 0x09;

/// Supported PCM Size, Rates
pub const PARAM_PCM_CAPS: u8 = 0x0A;

/// Supported Stream Formats
pub const PARAM_STREAM_FORMATS: u8 = 0x0B;

/// Pin Capabilities
pub const PARAM_PIN_CAPS: u8 = 0x0C;

/// Input Amplifier Capabilities
pub const PARAM_IN_AMP_CAPS: u8 = 0x0D;

/// Connection List Length
pub const PARAM_CONN_LIST_LEN: u8 = 0x0E;

/// GPIO Count
pub const PARAM_GPIO_COUNT: u8 = 0x11;

/// Output Amplifier Capabilities
pub const PARAM_OUT_AMP_CAPS: u8 = 0x12;

/// Sub node count: start node (bits 16-23)
pub const fn sub_node_start(v: u32) -> u32 {
    (v >> 16) & 0xFF
}

/// Sub node count: total (bits 0-7)
pub const fn sub_node_total(v: u32) -> u32 {
    v & 0xFF
}

/// Function group type: Audio
pub const FG_TYPE_AUDIO: u32 = 0x01;

/// Function group type: Modem
pub const FG_TYPE_MODEM: u32 = 0x02;

/// Connection list length: long form (bit 7)
pub const CONN_LIST_LONG_FORM: u32 = 1 << 7;

/// Connection list length: entry count (bits 0-6)
pub const CONN_LIST_LEN_MASK: u32 = 0x7F;

/// GPIO count: number of GPIOs (bits 0-7)
pub const GPIO_COUNT_MASK: u32 = 0xFF;

// ============================================================================
// Widget Types (from Audio Widget Capabilities Parameter)
// ============================================================================

/// Widget Type: Audio Output
pub const WIDGET_TYPE_AUDIO_OUTPUT: u8 = 0x00;

/// Widget Type: Audio Input
pub const WIDGET_TYPE_AUDIO_INPUT: u8 = 0x01;

/// Widget Type: Audio Mixer
pub const WIDGET_TYPE_AUDIO_MIXER: u8 = 0x02;

/// Widget Type: Audio Selector
pub const WIDGET_TYPE_AUDIO_SELECTOR: u8 = 0x03;

/// Widget Type: Pin Complex
pub const WIDGET_TYPE_PIN_COMPLEX: u8 = 0x04;

/// Widget Type: Power Widget
pub const WIDGET_TYPE_POWER: u8 = 0x05;

/// Widget Type: Volume Knob
pub const WIDGET_TYPE_VOLUME_KNOB: u8 = 0x06;

/// Widget Type: Beep Generator
pub const WIDGET_TYPE_BEEP_GEN: u8 = 0x07;

/// Widget Type: Vendor Defined
pub const WIDGET_TYPE_VENDOR: u8 = 0x0F;

// ============================================================================
// Audio Widget Capability Bits
// ============================================================================

/// Widget type field (bits 20-23)
pub const fn widget_cap_type(caps: u32) -> u8 {
    ((caps >> 20) & 0x0F) as u8
}

/// Stereo (bit 0)
pub const WCAP_STEREO: u32 = 1 << 0;

/// Input amplifier present (bit 1)
pub const WCAP_IN_AMP: u32 = 1 << 1;

/// Output amplifier present (bit 2)
pub const WCAP_OUT_AMP: u32 = 1 << 2;

/// Amplifier parameter override (bit 3)
pub const WCAP_AMP_OVERRIDE: u32 = 1 << 3;

/// Format override (bit 4)
pub const WCAP_FORMAT_OVERRIDE: u32 = 1 << 4;

/// Unsolicited response capable (bit 7)
pub const WCAP_UNSOL: u32 = 1 << 7;

/// Connection list present (bit 8)
pub const WCAP_CONN_LIST: u32 = 1 << 8;

/// Digital (bit 9)
pub const WCAP_DIGITAL: u32 = 1 << 9;

// ============================================================================
// Pin Capability Bits
// ============================================================================

/// Presence detect capable (bit 2)
pub const PINCAP_PRESENCE_DETECT: u32 = 1 << 2;

/// Headphone drive capable (bit 3)
pub const PINCAP_HEADPHONE: u32 = 1 << 3;

/// Output capable (bit 4)
pub const PINCAP_OUTPUT: u32 = 1 << 4;

/// Input capable (bit 5)
pub const PINCAP_INPUT: u32 = 1 << 5;

/// VREF 50% (bit 9)
pub const PINCAP_VREF_50: u32 = 1 << 9;

/// VREF 80% (bit 12)
pub const PINCAP_VREF_80: u32 = 1 << 12;

/// VREF 100% (bit 13)
pub const PINCAP_VREF_100: u32 = 1 << 13;

/// EAPD capable (bit 16)
pub const PINCAP_EAPD: u32 = 1 << 16;

// ============================================================================
// Pin Widget Control Bits
// ============================================================================

/// Headphone Enable (HPHN) - Bit 7
pub const PIN_CTL_HP_EN: u32 = 1 << 7;

/// Output Enable (OUT) - Bit 6
pub const PIN_CTL_OUT_EN: u32 = 1 << 6;

/// Input Enable (IN) - Bit 5
pub const PIN_CTL_IN_EN: u32 = 1 << 5;

/// VREF Enable mask (bits 0-2)
pub const PIN_CTL_VREF_MASK: u32 = 0x07;

/// VREF values
pub const PIN_VREF_50: u32 = 0x01;
pub const PIN_VREF_80: u32 = 0x04;
pub const PIN_VREF_100: u32 = 0x05;

/// Pin Sense: presence detect (bit 31)
pub const PIN_SENSE_PRESENCE: u32 = 1 << 31;

// ============================================================================
// Configuration Default Fields
// ============================================================================

pub const CONFIG_SEQUENCE_MASK: u32 = 0x0000_000F;
pub const CONFIG_SEQUENCE_SHIFT: u32 = 0;
pub const CONFIG_ASSOCIATION_MASK: u32 = 0x0000_00F0;
pub const CONFIG_ASSOCIATION_SHIFT: u32 = 4;
pub const CONFIG_MISC_MASK: u32 = 0x0000_0F00;
pub const CONFIG_MISC_SHIFT: u32 = 8;
pub const CONFIG_COLOR_MASK: u32 = 0x0000_F000;
pub const CONFIG_COLOR_SHIFT: u32 = 12;
pub const CONFIG_CONNECTION_TYPE_MASK: u32 = 0x000F_0000;
pub const CONFIG_CONNECTION_TYPE_SHIFT: u32 = 16;
pub const CONFIG_DEVICE_MASK: u32 = 0x00F0_0000;
pub const CONFIG_DEVICE_SHIFT: u32 = 20;
pub const CONFIG_LOCATION_MASK: u32 = 0x3F00_0000;
pub const CONFIG_LOCATION_SHIFT: u32 = 24;
pub const CONFIG_CONNECTIVITY_MASK: u32 = 0xC000_0000;
pub const CONFIG_CONNECTIVITY_SHIFT: u32 = 30;

/// Misc: jack detect override (bit 0 of the misc field)
pub const CONFIG_MISC_NO_JACK: u32 = 0x1;

/// Default device values
pub const CONFIG_DEVICE_LINE_OUT: u32 = 0x0;
pub const CONFIG_DEVICE_SPEAKER: u32 = 0x1;
pub const CONFIG_DEVICE_HP_OUT: u32 = 0x2;
pub const CONFIG_DEVICE_CD: u32 = 0x3;
pub const CONFIG_DEVICE_SPDIF_OUT: u32 = 0x4;
pub const CONFIG_DEVICE_DIGITAL_OTHER_OUT: u32 = 0x5;
pub const CONFIG_DEVICE_MODEM_LINE: u32 = 0x6;
pub const CONFIG_DEVICE_MODEM_HANDSET: u32 = 0x7;
pub const CONFIG_DEVICE_LINE_IN: u32 = 0x8;
pub const CONFIG_DEVICE_AUX: u32 = 0x9;
pub const CONFIG_DEVICE_MIC_IN: u32 = 0xA;
pub const CONFIG_DEVICE_TELEPHONY: u32 = 0xB;
pub const CONFIG_DEVICE_SPDIF_IN: u32 = 0xC;
pub const CONFIG_DEVICE_DIGITAL_OTHER_IN: u32 = 0xD;
pub const CONFIG_DEVICE_OTHER: u32 = 0xF;

/// Port connectivity values
pub const CONFIG_CONNECTIVITY_JACK: u32 = 0x0;
pub const CONFIG_CONNECTIVITY_NONE: u32 = 0x1;
pub const CONFIG_CONNECTIVITY_FIXED: u32 = 0x2;
pub const CONFIG_CONNECTIVITY_BOTH: u32 = 0x3;

/// Location values with a dedicated name
pub const CONFIG_LOCATION_FRONT: u32 = 0x02;
pub const CONFIG_LOCATION_HDMI: u32 = 0x18;
pub const CONFIG_LOCATION_ATAPI: u32 = 0x19;

// ============================================================================
// EAPD/BTL Enable Bits
// ============================================================================

/// EAPD Enable - Bit 1
pub const EAPD_EAPD: u32 = 1 << 1;

/// EAPD readback bits kept on parse (BTL, EAPD, L/R swap)
pub const EAPD_MASK: u32 = 0x07;

// ============================================================================
// Power States
// ============================================================================

/// Power State: D0 (Fully On)
pub const POWER_D0: u32 = 0x00;

/// Power State: D3 (Off)
pub const POWER_D3: u32 = 0x03;

// ============================================================================
// Unsolicited Response
// ============================================================================

/// Unsolicited response enable (bit 7), tag in bits 0-5
pub const UNSOL_ENABLE: u32 = 1 << 7;

/// Tag used for jack-sense events
pub const UNSOL_TAG_JACK: u32 = 0;

// ============================================================================
// Amplifier Capabilities
// ============================================================================

/// Mute capable (bit 31)
pub const AMP_CAP_MUTE: u32 = 1 << 31;

pub const fn amp_cap_offset(cap: u32) -> u32 {
    cap & 0x7F
}

pub const fn amp_cap_steps(cap: u32) -> u32 {
    (cap >> 8) & 0x7F
}

pub const fn amp_cap_step_size(cap: u32) -> u32 {
    (cap >> 16) & 0x7F
}

// ============================================================================
// Amplifier Gain/Mute Bits
// ============================================================================

/// Gain value mask (bits 0-6)
pub const AMP_GAIN_MASK: u32 = 0x7F;

/// Mute bit (bit 7)
pub const AMP_MUTE: u32 = 1 << 7;

/// Index value shift (bits 8-11)
pub const AMP_INDEX_SHIFT: u32 = 8;

/// Output amplifier select for GET verb (bit 15, clear for input)
pub const AMP_GET_OUTPUT: u32 = 1 << 15;

/// Set Output amplifier (bit 15) for SET verb
pub const AMP_SET_OUTPUT: u32 = 1 << 15;

/// Set Input amplifier (bit 14) for SET verb
pub const AMP_SET_INPUT: u32 = 1 << 14;

/// Set Left (bit 13) for set
pub const AMP_SET_LEFT: u32 = 1 << 13;

/// Set Right (bit 12) for set
pub const AMP_SET_RIGHT: u32 = 1 << 12;

// ============================================================================
// Supported Stream Formats / PCM Size and Rates
// ============================================================================

/// Stream format: PCM (bit 0)
pub const STREAM_FORMAT_PCM: u32 = 1 << 0;

/// Stream format: Float32 (bit 1)
pub const STREAM_FORMAT_FLOAT32: u32 = 1 << 1;

/// Stream format: AC3 (bit 2)
pub const STREAM_FORMAT_AC3: u32 = 1 << 2;

/// Sample size bits
pub const PCM_SIZE_8: u32 = 1 << 16;
pub const PCM_SIZE_16: u32 = 1 << 17;
pub const PCM_SIZE_20: u32 = 1 << 18;
pub const PCM_SIZE_24: u32 = 1 << 19;
pub const PCM_SIZE_32: u32 = 1 << 20;

/// Sample rate bit positions paired with their rates, ascending.
/// 48 kHz (bit 6) is mandatory and handled separately.
pub const PCM_RATE_BITS: [(u32, u32); 10] = [
    (0, 8000),
    (1, 11025),
    (2, 16000),
    (3, 22050),
    (4, 32000),
    (5, 44100),
    (7, 88200),
    (8, 96000),
    (9, 176400),
    (10, 192000),
];

/// Mandatory rate
pub const PCM_RATE_48K: u32 = 48000;

// ============================================================================
// Host Stream Format Identifiers
// ============================================================================

pub const AFMT_S16_LE: u32 = 0x0000_0010;
pub const AFMT_AC3: u32 = 0x0000_0400;
pub const AFMT_S32_LE: u32 = 0x0000_1000;
pub const AFMT_STEREO: u32 = 0x1000_0000;

// ============================================================================
// Limits
// ============================================================================

/// Max connection list entries per widget
pub const MAX_CONNS: usize = 32;

/// Max pins per association (one per sequence number)
pub const MAX_ASSOC_PINS: usize = 16;

/// Max converters per channel
pub const MAX_CHANNEL_IO: usize = 15;

/// Max recursion depth for path and control walks
pub const MAX_PATH_DEPTH: usize = 10;

/// Max GPIO pins usable by quirks
pub const MAX_GPIO: u32 = 8;
