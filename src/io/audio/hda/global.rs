// ============================================================================
// src/io/audio/hda/global.rs - Global Device Instance and Public API
// ============================================================================
//!
//! HDA デバイスのグローバルインスタンスと公開API。
//!
//! - プローブ前の設定（`HdaConfig`）
//! - コーデック群を所有する `HdaDevice`
//! - 単一の粗いロック越しの初期化・サスペンド・レジューム
//! - 非送信要求（ジャック検出）の受け口

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use log::{info, warn};
use spin::Mutex;

use super::codec::{probe_codec, powerup, Codec, CodecBus};
use super::commit::{audio_commit, prepare_pin_ctrl};
use super::group::FunctionGroup;
use super::jack::{switch_handler, switch_init};
use super::mixer::{mixer_init, mixer_set, set_all_defaults, VolumeFixes};
use super::patch::NodePatch;
use super::quirks::QuirkSet;
use super::regs::*;
use super::types::*;
use crate::error::{ConfigError, HdaError, HdaResult};

/// コーデックアドレスの上限
pub const HDA_CODEC_MAX: u8 = 15;

// ============================================================================
// Configuration
// ============================================================================

/// プローブ前に組み立てる設定
#[derive(Debug, Clone, Default)]
pub struct HdaConfig {
    /// PCI サブシステム ID
    pub subvendor: u32,
    pub quirks_on: QuirkSet,
    pub quirks_off: QuirkSet,
    /// ノード上書き表
    pub patches: Vec<NodePatch>,
    pub volume_fixes: VolumeFixes,
}

impl HdaConfig {
    pub fn new(subvendor: u32) -> Self {
        Self {
            subvendor,
            ..Self::default()
        }
    }

    /// `"gpio0, nofixedrate"` 形式のクワーク指定を加える
    pub fn with_quirks(mut self, s: &str) -> Self {
        let (on, off) = QuirkSet::parse_config(s);
        self.quirks_on |= on;
        self.quirks_off |= off;
        self
    }

    /// 音量スライダー補正を設定する
    pub fn with_volume_fixes(mut self, fixes: VolumeFixes) -> Self {
        self.volume_fixes = fixes;
        self
    }

    /// 1行1レコードのノード上書き表を加える
    pub fn with_patches(mut self, text: &str) -> Result<Self, ConfigError> {
        self.patches.extend(NodePatch::parse_table(text)?);
        Ok(self)
    }
}

// ============================================================================
// Device
// ============================================================================

/// バスと検出済みコーデックを所有するデバイス
pub struct HdaDevice<B: CodecBus> {
    pub bus: B,
    pub config: HdaConfig,
    pub codecs: Vec<Codec>,
}

impl<B: CodecBus> HdaDevice<B> {
    /// `codec_mask` のビットが立ったアドレスのコーデックを検出する
    pub fn probe(mut bus: B, config: HdaConfig, codec_mask: u16) -> HdaResult<Self> {
        let mut codecs = Vec::new();
        for cad in 0..HDA_CODEC_MAX {
            if codec_mask & (1 << cad) == 0 {
                continue;
            }
            if let Some(codec) = probe_codec(&mut bus, cad, &config) {
                if codec.groups.is_empty() {
                    warn!("{}", HdaError::NoFunctionGroup(cad));
                }
                codecs.push(codec);
            }
        }
        if codecs.is_empty() {
            return Err(HdaError::NoCodec);
        }
        Ok(Self { bus, config, codecs })
    }

    pub fn codec(&self, cad: u8) -> Option<&Codec> {
        self.codecs.iter().find(|c| c.cad == cad)
    }

    fn codec_mut(&mut self, cad: u8) -> HdaResult<&mut Codec> {
        self.codecs
            .iter_mut()
            .find(|c| c.cad == cad)
            .ok_or(HdaError::CodecNotResponding(cad))
    }

    /// 全ファンクショングループを D3 にする
    pub fn suspend(&mut self) {
        for codec in &self.codecs {
            let nids = codec.groups.iter().map(|g| g.nid).chain(codec.other_groups.iter().copied());
            for nid in nids {
                self.bus
                    .send_command(make_corb_entry(codec.cad, nid, VERB_SET_POWER | POWER_D3), codec.cad);
            }
        }
    }

    /// 電源投入と確定済み設定の再書き込み。経路探索はやり直さない
    pub fn resume(&mut self) {
        for codec in self.codecs.iter_mut() {
            for &nid in &codec.other_groups {
                info!("power down non-audio FG cad={} nid={} to D3", codec.cad, nid);
                self.bus
                    .send_command(make_corb_entry(codec.cad, nid, VERB_SET_POWER | POWER_D3), codec.cad);
            }
            for fg in codec.groups.iter_mut() {
                resume_group(fg, &mut self.bus);
            }
        }
    }

    /// 非送信要求を処理する
    pub fn handle_unsolicited(&mut self, cad: u8, tag: u32) -> HdaResult<()> {
        let bus: &mut dyn CodecBus = &mut self.bus;
        let codec = self
            .codecs
            .iter_mut()
            .find(|c| c.cad == cad)
            .ok_or(HdaError::CodecNotResponding(cad))?;
        if tag != UNSOL_TAG_JACK {
            warn!("unknown unsolicited tag {:#x} from codec {}", tag, cad);
            return Ok(());
        }
        for fg in codec.groups.iter_mut().filter(|g| g.jack_switch) {
            switch_handler(fg, bus);
        }
        Ok(())
    }

    /// コーデック内の PCM デバイス（グループをまたいだ通し番号）に音量を設定する
    pub fn set_mixer(&mut self, cad: u8, pcm: usize, dev: OssDev, left: u32, right: u32) -> HdaResult<u32> {
        let bus: &mut dyn CodecBus = &mut self.bus;
        let codec = self
            .codecs
            .iter_mut()
            .find(|c| c.cad == cad)
            .ok_or(HdaError::CodecNotResponding(cad))?;
        let mut index = pcm;
        for fg in codec.groups.iter_mut() {
            if index < fg.pcms.len() {
                return mixer_set(fg, bus, index, dev, left, right);
            }
            index -= fg.pcms.len();
        }
        Err(HdaError::NoDevice)
    }

    /// ファンクショングループへの参照
    pub fn group(&mut self, cad: u8, index: usize) -> HdaResult<&mut FunctionGroup> {
        self.codec_mut(cad)?
            .groups
            .get_mut(index)
            .ok_or(HdaError::NoFunctionGroup(cad))
    }
}

/// オーディオファンクショングループ1つのレジューム
///
/// ミキサーは初期化し直してから既定値を書くので、書き込み列はアタッチ時と一致する。
pub fn resume_group(fg: &mut FunctionGroup, bus: &mut dyn CodecBus) {
    powerup(fg, bus);
    prepare_pin_ctrl(fg);
    audio_commit(fg, bus);
    for pcm in 0..fg.pcms.len() {
        mixer_init(fg, pcm);
    }
    set_all_defaults(fg, bus);
    switch_init(fg, bus);
}

// ============================================================================
// Global HDA Device Instance
// ============================================================================

/// グローバルに保持するバス
pub type BoxedBus = Box<dyn CodecBus + Send>;

static HDA_DEVICE: Mutex<Option<HdaDevice<BoxedBus>>> = Mutex::new(None);

/// 非送信要求の受信数（デバッグ用）
static HDA_UNSOL_COUNT: AtomicU64 = AtomicU64::new(0);

/// コーデックを検出してグローバルインスタンスに登録する
///
/// 検出できたコーデック数を返す。
pub fn init(bus: BoxedBus, config: HdaConfig, codec_mask: u16) -> HdaResult<usize> {
    info!("probing HD Audio codecs (mask {:#06x})", codec_mask);
    let device = HdaDevice::probe(bus, config, codec_mask)?;
    let count = device.codecs.len();
    *HDA_DEVICE.lock() = Some(device);
    Ok(count)
}

/// グローバルインスタンスを取り外す
pub fn release() -> Option<HdaDevice<BoxedBus>> {
    HDA_DEVICE.lock().take()
}

/// Access the HDA device
pub fn with_device<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&HdaDevice<BoxedBus>) -> R,
{
    HDA_DEVICE.lock().as_ref().map(f)
}

/// Access the HDA device mutably
pub fn with_device_mut<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut HdaDevice<BoxedBus>) -> R,
{
    HDA_DEVICE.lock().as_mut().map(f)
}

pub fn suspend() -> HdaResult<()> {
    with_device_mut(|d| d.suspend()).ok_or(HdaError::NotInitialized)
}

pub fn resume() -> HdaResult<()> {
    with_device_mut(|d| d.resume()).ok_or(HdaError::NotInitialized)
}

/// 非送信要求ハンドラ
pub fn handle_unsolicited(cad: u8, tag: u32) -> HdaResult<()> {
    HDA_UNSOL_COUNT.fetch_add(1, Ordering::Relaxed);
    with_device_mut(|d| d.handle_unsolicited(cad, tag)).ok_or(HdaError::NotInitialized)?
}

pub fn set_mixer(cad: u8, pcm: usize, dev: OssDev, left: u32, right: u32) -> HdaResult<u32> {
    with_device_mut(|d| d.set_mixer(cad, pcm, dev, left, right)).ok_or(HdaError::NotInitialized)?
}

/// 非送信要求の受信数を取得
pub fn get_unsolicited_count() -> u64 {
    HDA_UNSOL_COUNT.load(Ordering::Relaxed)
}
