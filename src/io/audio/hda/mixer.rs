// ============================================================================
// src/io/audio/hda/mixer.rs - OSS-style Mixer
// ============================================================================
//!
//! PCM デバイスごとの OSS 風ミキサー。
//!
//! ## 機能
//! - 論理デバイスマスクと録音ソースマスクの宣言
//! - 論理デバイス単位の音量設定（0..100%）をアンプへ反映
//! - 録音ソースの切替（ミキサー入力のミュート、セレクタの選択）
//! - 既定音量の適用

use log::{debug, warn};

use super::codec::CodecBus;
use super::control::{amp_get, amp_set, connection_select};
use super::group::FunctionGroup;
use super::quirks::QuirkSet;
use super::regs::*;
use super::types::*;
use crate::error::{HdaError, HdaResult};

/// 論理デバイスごとの既定音量（%）
pub const MIXER_DEFAULTS: [u32; OSS_DEVICE_COUNT] = [
    75, // vol
    50, // bass
    50, // treble
    75, // synth
    75, // pcm
    75, // speaker
    75, // line
    0,  // mic
    75, // cd
    0,  // mix
    0,  // pcm2
    75, // rec
    0,  // igain
    50, // ogain
    75, // line1
    0,  // line2
    0,  // line3
    0,  // dig1
    0,  // dig2
    0,  // dig3
    0,  // phin
    0,  // phout
    75, // video
    0,  // radio
    75, // monitor
];

/// 音量スライダーの補正
///
/// 有効な論理デバイスでは、ゲインをオフセット（0dB 点）の半分から
/// オフセットまでの範囲に写す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VolumeFixes {
    /// 主音量を後半の範囲に写す（`volume_change` のときは PCM）
    pub half_volume: bool,
    /// マイク音量を後半の範囲に写す
    pub half_mic_volume: bool,
    /// 半分補正の対象を VOLUME から PCM に移す
    pub volume_change: bool,
}

impl VolumeFixes {
    pub fn applies_to(&self, dev: OssDev) -> bool {
        match dev {
            OssDev::Volume => self.half_volume && !self.volume_change,
            OssDev::Pcm => self.half_volume && self.volume_change,
            OssDev::Mic => self.half_mic_volume,
            _ => false,
        }
    }
}

/// 0..100% をアンプのステップ値に換算する
fn scale_gain(vol: u32, steps: u32, offset: u32, half: bool) -> u32 {
    let raw = (vol * steps + 50) / 100;
    if !half {
        return raw;
    }
    if offset == 0 {
        return 0;
    }
    let low = offset >> 1;
    low + raw * (offset - low) / offset
}

/// ミキサー状態
#[derive(Debug, Clone, Default)]
pub struct MixerState {
    pub left: [u32; OSS_DEVICE_COUNT],
    pub right: [u32; OSS_DEVICE_COUNT],
    /// 操作できる論理デバイス
    pub dev_mask: OssMask,
    /// 録音ソースに選べる論理デバイス
    pub rec_dev_mask: OssMask,
    /// 現在の録音ソース
    pub rec_src: OssMask,
    /// PCM 音量をソフトウェアで処理する
    pub soft_pcm_vol: bool,
}

/// PCM デバイスが持つアソシエーション（再生, 録音）
fn pcm_assocs(fg: &FunctionGroup, pcm: usize) -> (Option<AssocId>, Option<AssocId>) {
    let p = &fg.pcms[pcm];
    (
        p.play.map(|c| fg.channels[c.0].assoc),
        p.rec.map(|c| fg.channels[c.0].assoc),
    )
}

/// バインドが PCM デバイスの管理下か。予約経路は `extra` が真のときだけ含める
fn owned_by(binding: Binding, play: Option<AssocId>, rec: Option<AssocId>, extra: bool) -> bool {
    match binding {
        Binding::Assoc(a) => Some(a) == play || Some(a) == rec,
        Binding::Extra => extra,
        Binding::Unbound => false,
    }
}

/// デバイスマスクを宣言する（ハードウェアには触れない）
pub fn mixer_init(fg: &mut FunctionGroup, pcm: usize) {
    let (play, rec) = pcm_assocs(fg, pcm);
    let index = fg.pcms[pcm].index;
    let mut mask = OssMask::empty();
    let mut recmask = OssMask::empty();

    // EAPD を ogain として見せる
    if let Some(pa) = play {
        let has_eapd = fg
            .widgets
            .iter()
            .any(|w| w.enabled && w.is_pin() && w.eapd.is_some() && w.binding == Binding::Assoc(pa));
        if has_eapd {
            mask |= OssMask::OGAIN;
        }
    }

    for ctl in fg.controls.iter().filter(|c| c.enabled) {
        let binding = fg.widgets[ctl.widget.0].binding;
        if owned_by(binding, play, rec, index == 0) {
            mask |= ctl.ossmask;
        }
    }

    if let Some(rc) = fg.pcms[pcm].rec {
        for &adc in &fg.channels[rc.0].io {
            let Some(w) = fg.enabled_widget(adc) else {
                continue;
            };
            for c in w.conns.iter().filter(|c| c.enabled) {
                let Some(child) = fg.enabled_widget(c.nid) else {
                    continue;
                };
                if child.binding == Binding::Extra || child.binding.assoc() == rec {
                    recmask |= child.ossmask;
                }
            }
        }
    }

    let mut soft_pcm_vol = false;
    if play.is_some() && fg.pcms[pcm].digital != Some(true) {
        soft_pcm_vol = !mask.contains(OssMask::PCM) || fg.quirks.contains(QuirkSet::SOFTPCMVOL);
        if soft_pcm_vol {
            mask |= OssMask::PCM;
        } else {
            let hard = fg.controls.iter().any(|c| {
                c.enabled
                    && owned_by(fg.widgets[c.widget.0].binding, play, None, index == 0)
                    && c.ossmask.contains(OssMask::PCM)
                    && c.steps > 0
            });
            soft_pcm_vol = !hard;
        }
        if soft_pcm_vol {
            debug!("pcm{}: soft PCM volume", pcm);
        }
    }

    if play.is_some() && mask & (OssMask::VOLUME | OssMask::PCM) == OssMask::PCM {
        mask |= OssMask::VOLUME;
    }

    let state = &mut fg.pcms[pcm].mixer;
    // ソフト音量がミュートのまま残らないように
    state.left = [100; OSS_DEVICE_COUNT];
    state.right = [100; OSS_DEVICE_COUNT];
    state.dev_mask = mask;
    state.rec_dev_mask = recmask;
    state.soft_pcm_vol = soft_pcm_vol;
    debug!(
        "pcm{}: mixer devs {:#x} rec devs {:#x}",
        pcm,
        mask.bits(),
        recmask.bits()
    );
}

/// 論理デバイスの音量を設定する
///
/// `left`/`right` は 0..100。戻り値は OSS 形式の `left | right << 8`。
pub fn mixer_set(
    fg: &mut FunctionGroup,
    bus: &mut dyn CodecBus,
    pcm: usize,
    dev: OssDev,
    left: u32,
    right: u32,
) -> HdaResult<u32> {
    let (left, right) = (left.min(100), right.min(100));
    {
        let state = &mut fg.pcms[pcm].mixer;
        state.left[dev.index()] = left;
        state.right[dev.index()] = right;
    }

    // ogain は EAPD で実装する
    if dev == OssDev::OGain {
        let nid = fg
            .widgets
            .iter()
            .find(|w| w.enabled && w.is_pin() && w.eapd.is_some())
            .map(|w| w.nid)
            .ok_or(HdaError::NotSupported("ogain without EAPD"))?;
        let inv = fg.quirks.contains(QuirkSet::EAPDINV);
        let Some(w) = fg.widget_mut(nid) else {
            return Err(HdaError::InvalidNode(nid));
        };
        let orig = w.eapd.unwrap_or(0);
        let val = if left == 0 { orig & !EAPD_EAPD } else { orig | EAPD_EAPD };
        w.eapd = Some(val);
        if val != orig {
            let out = if inv { val ^ EAPD_EAPD } else { val };
            fg.send(bus, nid, VERB_SET_EAPD | (out & 0xFF));
        }
        return Ok(left | (left << 8));
    }

    let (play, rec) = pcm_assocs(fg, pcm);
    let half = fg.volume_fixes.applies_to(dev);
    let (lvals, rvals) = {
        let state = &fg.pcms[pcm].mixer;
        (state.left, state.right)
    };

    for i in 0..fg.controls.len() {
        let ctl = &fg.controls[i];
        if !ctl.enabled || !ctl.ossmask.contains(dev.mask()) {
            continue;
        }
        if !owned_by(fg.widgets[ctl.widget.0].binding, play, rec, true) {
            continue;
        }

        let (mut lvol, mut rvol) = (100u32, 100u32);
        for d in ctl.ossmask.devices() {
            lvol = lvol * lvals[d.index()] / 100;
            rvol = rvol * rvals[d.index()] / 100;
        }
        let mut mute = MuteFlags::empty();
        if lvol == 0 {
            mute |= MuteFlags::LEFT;
        }
        if rvol == 0 {
            mute |= MuteFlags::RIGHT;
        }
        let l = scale_gain(lvol, ctl.steps, ctl.offset, half);
        let r = scale_gain(rvol, ctl.steps, ctl.offset, half);
        amp_set(fg, bus, ControlId(i), Some(mute), Some(l), Some(r));
    }

    Ok(left | (right << 8))
}

// ============================================================================
// Record Source
// ============================================================================

/// 録音ソースを切り替え、実際に選ばれたソースを返す
pub fn set_rec_src(fg: &mut FunctionGroup, bus: &mut dyn CodecBus, pcm: usize, src: OssMask) -> OssMask {
    let Some(rc) = fg.pcms[pcm].rec else {
        return OssMask::empty();
    };
    let adcs = fg.channels[rc.0].io.clone();
    let mut ret: Option<OssMask> = None;
    for adc in adcs {
        if fg.enabled_widget(adc).is_none() {
            continue;
        }
        let res = rec_sel_comm(fg, bus, src, adc, 0);
        ret = Some(ret.map_or(res, |r| r & res));
    }
    let ret = ret.unwrap_or(OssMask::empty());
    fg.pcms[pcm].mixer.rec_src = ret;
    ret
}

/// 指定ソースへ届くように経路を切り替える
pub fn rec_sel_comm(
    fg: &mut FunctionGroup,
    bus: &mut dyn CodecBus,
    src: OssMask,
    nid: Nid,
    depth: usize,
) -> OssMask {
    if depth > MAX_PATH_DEPTH {
        return OssMask::empty();
    }
    let Some(w) = fg.enabled_widget(nid) else {
        return OssMask::empty();
    };
    let kind = w.kind;
    let conns: alloc::vec::Vec<(usize, Nid)> = w
        .conns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.enabled)
        .map(|(i, c)| (i, c.nid))
        .collect();

    let mut res = OssMask::empty();
    for (i, cnid) in conns {
        let Some(child) = fg.enabled_widget(cnid) else {
            continue;
        };
        if !child.binding.is_bound() {
            continue;
        }
        let (cmask, cdev) = (child.ossmask, child.ossdev);
        let carries = src.intersects(cmask);

        if carries {
            if cdev.is_none() {
                res |= rec_sel_comm(fg, bus, src, cnid, depth + 1);
            } else {
                res |= cmask;
            }
        }

        match kind {
            WidgetKind::Mixer => {
                let Some(id) = amp_get(fg, nid, AmpDir::In, Some(i)) else {
                    continue;
                };
                let muted = !carries;
                if fg.controls[id.0].forcemute != muted {
                    fg.controls[id.0].forcemute = muted;
                    amp_set(fg, bus, id, None, None, None);
                }
                debug!(
                    "recsel ({}): nid {} source {} {}",
                    super::naming::mask_to_string(src),
                    nid,
                    i,
                    if muted { "mute" } else { "unmute" }
                );
            }
            WidgetKind::Selector => {
                if !carries {
                    continue;
                }
                connection_select(fg, bus, nid, i);
                debug!("recsel: nid {} source {} select", nid, i);
                break;
            }
            _ => {}
        }
    }
    res
}

// ============================================================================
// Defaults
// ============================================================================

/// 既定音量と既定の録音ソースを適用する
pub fn set_defaults(fg: &mut FunctionGroup, bus: &mut dyn CodecBus, pcm: usize) {
    for dev in OssDev::ALL {
        let level = MIXER_DEFAULTS[dev.index()];
        if let Err(e) = mixer_set(fg, bus, pcm, dev, level, level) {
            debug!("pcm{}: {} default skipped: {}", pcm, dev.name(), e);
        }
    }
    if fg.pcms[pcm].rec.is_some() && set_rec_src(fg, bus, pcm, OssMask::INPUT).is_empty() {
        warn!("pcm{}: couldn't set recording source to input", pcm);
    }
}

/// 全 PCM デバイスに既定値を適用する
pub fn set_all_defaults(fg: &mut FunctionGroup, bus: &mut dyn CodecBus) {
    for pcm in 0..fg.pcms.len() {
        set_defaults(fg, bus, pcm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::audio::hda::assoc::Association;
    use crate::io::audio::hda::control::ctl_parse;
    use crate::io::audio::hda::fake::{FakeCodec, TopologyBuilder};
    use crate::io::audio::hda::pcm::{bind_association, create_pcms};

    const AMP: u32 = AMP_CAP_MUTE | (0x1F << 8) | 0x1F;

    /// DAC 2 (out amp) -> pin 3 (EAPD), 録音は ADC 4 <- セレクタ 5 <- ピン 6 / ピン 7
    fn topology() -> FunctionGroup {
        let mut fg = TopologyBuilder::new(2, 6)
            .dac(2)
            .out_amp(2, AMP)
            .pin(3, 0x0101_4010, PINCAP_OUTPUT | PINCAP_EAPD, &[2])
            .adc(4, &[5])
            .selector(5, &[6, 7])
            .pin(6, 0x01a1_9020, PINCAP_INPUT, &[])
            .pin(7, 0x0181_3021, PINCAP_INPUT, &[])
            .build();
        fg.widget_mut(3).unwrap().eapd = Some(EAPD_EAPD);

        let mut out = Association::new(1);
        out.enabled = true;
        out.dacs[0] = Some(2);
        let mut inp = Association::new(2);
        inp.enabled = true;
        inp.dir = Direction::In;
        inp.dacs[0] = Some(4);
        inp.dacs[1] = Some(4);
        fg.assocs.push(out);
        fg.assocs.push(inp);

        for (nid, a) in [(2, 0), (3, 0), (4, 1), (5, 1), (6, 1), (7, 1)] {
            let w = fg.widget_mut(nid).unwrap();
            w.binding = Binding::Assoc(AssocId(a));
            w.seqmask = 1;
        }
        let set = |fg: &mut FunctionGroup, nid: Nid, dev: OssDev| {
            let w = fg.widget_mut(nid).unwrap();
            w.ossdev = Some(dev);
            w.ossmask = dev.mask();
        };
        set(&mut fg, 2, OssDev::Pcm);
        set(&mut fg, 6, OssDev::Mic);
        set(&mut fg, 7, OssDev::Line);
        fg.widget_mut(5).unwrap().ossmask = OssMask::MIC | OssMask::LINE;

        ctl_parse(&mut fg);
        fg.controls[0].ossmask = OssMask::PCM | OssMask::VOLUME;
        bind_association(&mut fg);
        create_pcms(&mut fg);
        fg
    }

    #[test]
    fn test_init_masks() {
        let fg = topology();
        assert_eq!(fg.pcms.len(), 1);
        let m = &fg.pcms[0].mixer;
        assert_eq!(m.dev_mask, OssMask::OGAIN | OssMask::PCM | OssMask::VOLUME);
        assert_eq!(m.rec_dev_mask, OssMask::MIC | OssMask::LINE);
        assert!(!m.soft_pcm_vol);
        assert_eq!(m.left[OssDev::Mic.index()], 100);
    }

    #[test]
    fn test_soft_pcm_volume_without_control() {
        let mut fg = topology();
        fg.controls[0].ossmask = OssMask::VOLUME;
        mixer_init(&mut fg, 0);
        let m = &fg.pcms[0].mixer;
        assert!(m.soft_pcm_vol);
        assert!(m.dev_mask.contains(OssMask::PCM | OssMask::VOLUME));
    }

    #[test]
    fn test_set_multiplies_devices() {
        let mut fg = topology();
        let mut bus = FakeCodec::new(0, 0x10ec_0262, 2, 6);
        mixer_set(&mut fg, &mut bus, 0, OssDev::Volume, 50, 0).unwrap();
        let ret = mixer_set(&mut fg, &mut bus, 0, OssDev::Pcm, 50, 100).unwrap();
        assert_eq!(ret, 50 | (100 << 8));

        // 左: 50% * 50% = 25% → (25*31+50)/100 = 8、右: 0% → ミュート
        let c = &fg.controls[0];
        assert_eq!(c.left, 8);
        assert_eq!(c.right, 0);
        assert_eq!(c.muted, MuteFlags::RIGHT);
    }

    #[test]
    fn test_half_volume_maps_to_upper_range() {
        let mut fg = topology();
        let mut bus = FakeCodec::new(0, 0x10ec_0262, 2, 6);
        fg.volume_fixes.half_volume = true;
        mixer_set(&mut fg, &mut bus, 0, OssDev::Volume, 50, 0).unwrap();

        // raw = (50*31+50)/100 = 16 → 15 + 16*16/31 = 23
        let c = &fg.controls[0];
        assert_eq!(c.left, 23);
        assert!(c.left >= c.offset / 2 && c.left <= c.offset);
        // 0% でもミュートされたうえで下限値
        assert_eq!(c.right, 15);
        assert_eq!(c.muted, MuteFlags::RIGHT);

        // 対象を PCM に移すと VOLUME は素の換算に戻る
        fg.volume_fixes.volume_change = true;
        mixer_set(&mut fg, &mut bus, 0, OssDev::Volume, 50, 50).unwrap();
        assert_eq!(fg.controls[0].left, 16);
        mixer_set(&mut fg, &mut bus, 0, OssDev::Pcm, 100, 100).unwrap();
        assert_eq!(fg.controls[0].left, 23);
    }

    #[test]
    fn test_volume_fix_targets() {
        let fixes = VolumeFixes {
            half_volume: true,
            half_mic_volume: true,
            volume_change: false,
        };
        assert!(fixes.applies_to(OssDev::Volume));
        assert!(!fixes.applies_to(OssDev::Pcm));
        assert!(fixes.applies_to(OssDev::Mic));
        assert!(!fixes.applies_to(OssDev::Line));
        assert!(!VolumeFixes::default().applies_to(OssDev::Volume));
        assert_eq!(scale_gain(100, 31, 0, true), 0);
        assert_eq!(scale_gain(100, 31, 31, true), 31);
    }

    #[test]
    fn test_ogain_toggles_eapd() {
        let mut fg = topology();
        let mut bus = FakeCodec::new(0, 0x10ec_0262, 2, 6);
        mixer_set(&mut fg, &mut bus, 0, OssDev::OGain, 0, 0).unwrap();
        assert_eq!(fg.widget(3).unwrap().eapd, Some(0));
        assert_eq!(
            FakeCodec::writes(&bus.log),
            [make_corb_entry(0, 3, VERB_SET_EAPD)]
        );
        // 変化がなければ送らない
        mixer_set(&mut fg, &mut bus, 0, OssDev::OGain, 0, 0).unwrap();
        assert_eq!(FakeCodec::writes(&bus.log).len(), 1);

        fg.widget_mut(3).unwrap().eapd = None;
        assert_eq!(
            mixer_set(&mut fg, &mut bus, 0, OssDev::OGain, 50, 50),
            Err(HdaError::NotSupported("ogain without EAPD"))
        );
    }

    #[test]
    fn test_rec_src_selects_first_carrier() {
        let mut fg = topology();
        let mut bus = FakeCodec::new(0, 0x10ec_0262, 2, 6);
        let got = set_rec_src(&mut fg, &mut bus, 0, OssMask::LINE);
        assert_eq!(got, OssMask::LINE);
        assert_eq!(fg.widget(5).unwrap().selconn, Some(1));

        let got = set_rec_src(&mut fg, &mut bus, 0, OssMask::INPUT);
        assert_eq!(got, OssMask::MIC);
        assert_eq!(fg.widget(5).unwrap().selconn, Some(0));
        assert_eq!(fg.pcms[0].mixer.rec_src, OssMask::MIC);
    }

    #[test]
    fn test_defaults_table() {
        assert_eq!(MIXER_DEFAULTS[OssDev::Volume.index()], 75);
        assert_eq!(MIXER_DEFAULTS[OssDev::Mic.index()], 0);
        assert_eq!(MIXER_DEFAULTS[OssDev::OGain.index()], 50);
        assert_eq!(MIXER_DEFAULTS[OssDev::Monitor.index()], 75);
    }
}
