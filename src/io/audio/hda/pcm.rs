// ============================================================================
// src/io/audio/hda/pcm.rs - Channels and PCM Devices
// ============================================================================
//!
//! アソシエーションごとのチャネルと、外部に見せる PCM デバイス。
//!
//! ## 機能
//! - チャネル: アソシエーションの DAC/ADC を集め、フォーマット・レートの共通部分を求める
//! - PCM デバイス: 同じデジタル区分の再生と録音チャネルを1つずつ組にする

use alloc::vec;
use alloc::vec::Vec;
use log::{debug, info};

use super::group::FunctionGroup;
use super::mixer::{MixerState, mixer_init};
use super::quirks::QuirkSet;
use super::regs::*;
use super::types::*;

/// アソシエーションに対応するストリームチャネル
#[derive(Debug, Clone)]
pub struct Channel {
    pub assoc: AssocId,
    pub dir: ChannelDir,
    /// 使用するコンバータ（シーケンス順、重複なし）
    pub io: Vec<Nid>,
    /// ホスト側フォーマット（`AFMT_*`）
    pub formats: Vec<u32>,
    /// 昇順のサンプルレート
    pub rates: Vec<u32>,
    /// コンバータ間で共通の Stream Formats
    pub fmtcap: u32,
    /// コンバータ間で共通の PCM Size/Rates
    pub pcmcap: u32,
    pub pcm: Option<usize>,
}

impl Channel {
    fn new(assoc: AssocId, dir: ChannelDir) -> Self {
        Self {
            assoc,
            dir,
            io: Vec::new(),
            formats: vec![AFMT_S16_LE | AFMT_STEREO],
            rates: vec![PCM_RATE_48K],
            fmtcap: 0,
            pcmcap: 0,
            pcm: None,
        }
    }

    pub fn min_rate(&self) -> u32 {
        self.rates.first().copied().unwrap_or(PCM_RATE_48K)
    }

    pub fn max_rate(&self) -> u32 {
        self.rates.last().copied().unwrap_or(PCM_RATE_48K)
    }
}

/// 再生・録音チャネルの組
#[derive(Debug, Clone)]
pub struct PcmDevice {
    pub index: usize,
    /// まだ区分が決まっていなければ `None`
    pub digital: Option<bool>,
    pub play: Option<ChannelId>,
    pub rec: Option<ChannelId>,
    pub mixer: MixerState,
}

impl PcmDevice {
    fn new(index: usize) -> Self {
        Self {
            index,
            digital: None,
            play: None,
            rec: None,
            mixer: MixerState::default(),
        }
    }
}

// ============================================================================
// Channel Setup
// ============================================================================

/// 有効なアソシエーションごとにチャネルを作る
pub fn bind_association(fg: &mut FunctionGroup) {
    fg.channels.clear();
    for a in 0..fg.assocs.len() {
        if !fg.assocs[a].enabled {
            continue;
        }
        let dir = match fg.assocs[a].dir {
            Direction::In => ChannelDir::Rec,
            Direction::Out => ChannelDir::Play,
        };
        let id = ChannelId(fg.channels.len());
        fg.channels.push(Channel::new(AssocId(a), dir));
        fg.assocs[a].chan = Some(id);
        pcm_channel_setup(fg, id);
    }
}

/// チャネルのコンバータとフォーマット・レートを決める
///
/// 採用したコンバータ数を返す。
pub fn pcm_channel_setup(fg: &mut FunctionGroup, id: ChannelId) -> usize {
    let assoc = fg.channels[id.0].assoc;
    let mut io: Vec<Nid> = Vec::new();
    let mut fmtcap = fg.formats;
    let mut pcmcap = fg.pcm;

    for dac in fg.assocs[assoc.0].dacs.iter().flatten().copied() {
        if io.len() >= MAX_CHANNEL_IO {
            break;
        }
        if io.contains(&dac) {
            continue;
        }
        let Some(w) = fg.enabled_widget(dac) else {
            continue;
        };
        if !w.is_stereo() {
            continue;
        }
        let mut cap = w.formats;
        if cap & (STREAM_FORMAT_PCM | STREAM_FORMAT_AC3) == 0 {
            continue;
        }
        // S/PDIF は AC3 を申告しないことが多い
        if w.is_digital() {
            cap |= STREAM_FORMAT_AC3;
        }
        if io.is_empty() {
            fmtcap = cap;
            pcmcap = w.pcm;
        } else {
            fmtcap &= cap;
            pcmcap &= w.pcm;
        }
        io.push(dac);
    }

    let forcestereo = fg.quirks.contains(QuirkSet::FORCESTEREO);
    let fixedrate = fg.quirks.contains(QuirkSet::FIXEDRATE);
    let count = io.len();
    let ch = &mut fg.channels[id.0];
    ch.io = io;
    ch.fmtcap = fmtcap;
    ch.pcmcap = pcmcap;

    if count > 0 {
        let mut formats = Vec::new();
        if fmtcap & STREAM_FORMAT_PCM != 0 {
            if !forcestereo {
                formats.push(AFMT_S16_LE);
            }
            formats.push(AFMT_S16_LE | AFMT_STEREO);
            if pcmcap & (PCM_SIZE_32 | PCM_SIZE_24 | PCM_SIZE_20) != 0 {
                if !forcestereo {
                    formats.push(AFMT_S32_LE);
                }
                formats.push(AFMT_S32_LE | AFMT_STEREO);
            }
        }
        if fmtcap & STREAM_FORMAT_AC3 != 0 {
            formats.push(AFMT_AC3);
        }
        ch.formats = formats;
        ch.rates = supported_rates(pcmcap);
    }
    if fixedrate {
        ch.rates = vec![PCM_RATE_48K];
    }

    debug!(
        "channel {} ({:?}): {} converters {:?}, rates {}..{}",
        id.0,
        ch.dir,
        count,
        ch.io,
        ch.min_rate(),
        ch.max_rate()
    );
    count
}

/// PCM Size/Rates のビットから昇順のレート表を作る。48kHz は常に含む
fn supported_rates(pcmcap: u32) -> Vec<u32> {
    let mut rates: Vec<u32> = PCM_RATE_BITS
        .iter()
        .filter(|(bit, _)| pcmcap & (1 << bit) != 0)
        .map(|&(_, rate)| rate)
        .collect();
    let pos = rates.partition_point(|&r| r < PCM_RATE_48K);
    rates.insert(pos, PCM_RATE_48K);
    rates
}

// ============================================================================
// PCM Devices
// ============================================================================

/// チャネルを PCM デバイスへ振り分け、ミキサーを初期化する
pub fn create_pcms(fg: &mut FunctionGroup) {
    let (mut ar, mut ap, mut dr, mut dp) = (0usize, 0usize, 0usize, 0usize);
    for a in fg.assocs.iter().filter(|a| a.enabled) {
        match (a.dir, a.digital) {
            (Direction::In, true) => dr += 1,
            (Direction::In, false) => ar += 1,
            (Direction::Out, true) => dp += 1,
            (Direction::Out, false) => ap += 1,
        }
    }
    let count = ar.max(ap) + dr.max(dp);
    fg.pcms = (0..count).map(PcmDevice::new).collect();

    for a in 0..fg.assocs.len() {
        let assoc = &fg.assocs[a];
        let Some(chan) = assoc.chan.filter(|_| assoc.enabled) else {
            continue;
        };
        let (dir, digital) = (assoc.dir, assoc.digital);

        let slot = fg.pcms.iter().position(|p| {
            p.digital.is_none_or(|d| d == digital)
                && match dir {
                    Direction::In => p.rec.is_none(),
                    Direction::Out => p.play.is_none(),
                }
        });
        let Some(j) = slot else {
            continue;
        };
        let pcm = &mut fg.pcms[j];
        match dir {
            Direction::In => pcm.rec = Some(chan),
            Direction::Out => pcm.play = Some(chan),
        }
        pcm.digital = Some(digital);
        fg.channels[chan.0].pcm = Some(j);
    }

    for j in 0..fg.pcms.len() {
        mixer_init(fg, j);
        let p = &fg.pcms[j];
        info!(
            "pcm{}: play {:?} rec {:?} {}",
            j,
            p.play.map(|c| c.0),
            p.rec.map(|c| c.0),
            if p.digital == Some(true) { "digital" } else { "analog" }
        );
    }
}
