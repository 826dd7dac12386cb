// ============================================================================
// src/io/audio/hda/mod.rs - HD Audio Codec Control-Path Resolver
// ============================================================================
//!
//! # HD Audio コーデック処理
//!
//! コーデックのウィジェットグラフを読み出し、ピンをアソシエーションに束ね、
//! 変換器までの経路を確定してミキサーコントロールと PCM デバイスを組み立てる。
//!
//! ## 処理の流れ
//! 1. `codec` - コーデック検出とウィジェット解析
//! 2. `patch` / `quirks` - ノード上書き表とクワーク
//! 3. `assoc` - ピンのアソシエーション化
//! 4. `trace` - バックトラッキング付き経路探索
//! 5. `prune` - 不要ノード・接続の刈り込み
//! 6. `resolve` - OSS 論理デバイスへのコントロール割り当て
//! 7. `pcm` / `mixer` - チャネルと PCM デバイス、OSS ミキサー
//! 8. `commit` / `jack` - ハードウェアへの書き込みとジャック検出
//! 9. `global` - デバイス登録とサスペンド/レジューム

#![allow(dead_code)]

mod assoc;
mod codec;
mod commit;
mod control;
mod global;
mod group;
mod ids;
mod jack;
mod mixer;
mod naming;
mod patch;
mod pcm;
mod prune;
mod quirks;
mod resolve;
mod trace;
mod types;
mod widget;

#[cfg(test)]
mod fake;

// 親モジュールの動詞/パラメータ定義を使用
use super::regs;

// 型の再エクスポート
pub use types::{
    make_corb_entry, AmpDir, AssocId, Binding, ChannelDir, ChannelId, ControlId, Direction, MuteFlags,
    Nid, OssDev, OssMask, PinInfo, WidgetFlags, WidgetId, WidgetKind,
};

pub use assoc::Association;
pub use codec::{probe_codec, Codec, CodecBus};
pub use control::AudioControl;
pub use group::FunctionGroup;
pub use mixer::{MixerState, VolumeFixes};
pub use patch::NodePatch;
pub use pcm::{Channel, PcmDevice};
pub use quirks::QuirkSet;
pub use widget::{Connection, Widget};

// 公開API関数の再エクスポート
pub use global::{
    get_unsolicited_count, handle_unsolicited, init, release, resume, set_mixer, suspend, with_device,
    with_device_mut, BoxedBus, HdaConfig, HdaDevice, HDA_CODEC_MAX,
};
