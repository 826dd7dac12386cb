// ============================================================================
// src/io/audio/hda/codec.rs - Codec Probe and Parse
// ============================================================================
//!
//! コーデックの検出とオーディオファンクショングループの解析。
//!
//! ## 機能
//! - バス境界（`CodecBus`）
//! - ルートノードからのファンクショングループ列挙
//! - ウィジェット・接続表・ピンの読み出し
//! - 解析からコミットまでのパイプライン

use alloc::string::ToString;
use alloc::vec::Vec;
use log::{debug, error, info, warn};

use super::assoc::association_parse;
use super::commit::{audio_commit, prepare_pin_ctrl};
use super::control::ctl_parse;
use super::global::HdaConfig;
use super::group::FunctionGroup;
use super::ids::*;
use super::jack::switch_init;
use super::mixer::set_all_defaults;
use super::naming::{assign_names, pin_name};
use super::patch::apply_node_patches;
use super::pcm::{bind_association, create_pcms};
use super::prune::*;
use super::quirks::{apply_quirk_table, QUIRK_TABLE};
use super::regs::*;
use super::resolve::assign_mixers;
use super::trace::build_tree;
use super::types::*;
use crate::error::{HdaError, HdaResult};

// ============================================================================
// Bus Boundary
// ============================================================================

/// コマンド/レスポンスリングへの同期的な窓口
///
/// 失敗・タイムアウト時は [`HDA_INVALID`] を返す。
pub trait CodecBus {
    /// CORB エントリを送り、応答を返す
    fn send_command(&mut self, verb: u32, cad: u8) -> u32;

    /// 電源投入後の待ち
    fn delay_us(&mut self, _us: u32) {}
}

impl<B: CodecBus + ?Sized> CodecBus for alloc::boxed::Box<B> {
    fn send_command(&mut self, verb: u32, cad: u8) -> u32 {
        (**self).send_command(verb, cad)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

// ============================================================================
// Codec
// ============================================================================

/// 検出済みコーデック
#[derive(Debug, Clone)]
pub struct Codec {
    pub cad: u8,
    /// Vendor ID パラメータ（上位16bit ベンダー、下位16bit デバイス）
    pub vendor_id: u32,
    pub revision_id: u32,
    /// オーディオファンクショングループ
    pub groups: Vec<FunctionGroup>,
    /// オーディオ以外のファンクショングループのノード番号
    pub other_groups: Vec<Nid>,
}

impl Codec {
    pub fn name(&self) -> &'static str {
        find_codec_name(self.vendor_id)
    }
}

fn get_param(bus: &mut dyn CodecBus, cad: u8, nid: Nid, param: u8) -> u32 {
    bus.send_command(make_corb_entry(cad, nid, VERB_GET_PARAM | param as u32), cad)
}

/// コーデックを検出してファンクショングループを解析する
///
/// 応答しないコーデックは `None`。
pub fn probe_codec(bus: &mut dyn CodecBus, cad: u8, config: &HdaConfig) -> Option<Codec> {
    debug!("probing codec #{}", cad);
    let vendor_id = get_param(bus, cad, 0, PARAM_VENDOR_ID);
    let revision_id = get_param(bus, cad, 0, PARAM_REVISION_ID);
    if vendor_id == HDA_INVALID && revision_id == HDA_INVALID {
        error!("{}, probing aborted", HdaError::CodecNotResponding(cad));
        return None;
    }

    let mut codec = Codec {
        cad,
        vendor_id,
        revision_id,
        groups: Vec::new(),
        other_groups: Vec::new(),
    };
    info!(
        "HDA codec #{}: {} (id {:#010x}, revision {:#x}, subvendor {:#010x})",
        cad,
        codec.name(),
        vendor_id,
        revision_id,
        config.subvendor
    );

    let sub = get_param(bus, cad, 0, PARAM_SUB_NODE_COUNT);
    let start = sub_node_start(sub) as Nid;
    let end = start + sub_node_total(sub) as Nid;
    debug!("function groups {}..{}", start, end);

    for nid in start..end {
        if let Err(e) = probe_function(bus, &mut codec, nid, config) {
            warn!("codec #{} nid {}: {}", cad, nid, e);
        }
    }
    Some(codec)
}

/// ファンクショングループ1つを解析する
fn probe_function(bus: &mut dyn CodecBus, codec: &mut Codec, nid: Nid, config: &HdaConfig) -> HdaResult<()> {
    let cad = codec.cad;
    let kind = get_param(bus, cad, nid, PARAM_FUNC_GROUP_TYPE) & 0xFF;
    let sub = get_param(bus, cad, nid, PARAM_SUB_NODE_COUNT);
    let start = sub_node_start(sub) as Nid;
    let count = sub_node_total(sub) as usize;

    let kind_name = match kind {
        FG_TYPE_AUDIO => "audio",
        FG_TYPE_MODEM => "modem",
        _ => "unknown",
    };
    debug!(
        "found {} FG nid={} start={} end={} total={}",
        kind_name,
        nid,
        start,
        start as usize + count,
        count
    );

    if count == 0 {
        return Err(HdaError::InvalidConfig("no nodes present in function group".to_string()));
    }

    if kind != FG_TYPE_AUDIO {
        debug!("powering down {} FG nid={}", kind_name, nid);
        bus.send_command(make_corb_entry(cad, nid, VERB_SET_POWER | POWER_D3), cad);
        codec.other_groups.push(nid);
        return Ok(());
    }

    let mut fg = FunctionGroup::try_new(cad, nid, start, count)?;
    fg.vendor_id = codec.vendor_id;
    fg.revision_id = codec.revision_id;
    fg.subvendor = config.subvendor;
    fg.volume_fixes = config.volume_fixes;
    probe_audio_group(bus, &mut fg, config);
    codec.groups.push(fg);
    Ok(())
}

/// 解析からジャック切替初期化までを順に実行する
pub fn probe_audio_group(bus: &mut dyn CodecBus, fg: &mut FunctionGroup, config: &HdaConfig) {
    debug!("powering up...");
    powerup(fg, bus);
    debug!("parsing audio FG...");
    audio_parse(fg, bus);
    debug!("parsing vendor patch...");
    vendor_patch_parse(fg, config);
    fg.quirks |= config.quirks_on;
    fg.quirks &= !config.quirks_off;
    debug!("parsing controls...");
    ctl_parse(fg);
    debug!("disabling nonaudio...");
    disable_non_audio(fg);
    debug!("disabling useless...");
    disable_useless(fg);
    debug!("parsing pin associations...");
    association_parse(fg);
    debug!("building AFG tree...");
    build_tree(fg);
    debug!("disabling unassociated widgets...");
    disable_unassociated(fg);
    debug!("disabling nonselected inputs...");
    disable_non_selected(fg);
    debug!("disabling useless...");
    disable_useless(fg);
    debug!("disabling crossassociated connections...");
    disable_cross_associations(fg);
    debug!("disabling useless...");
    disable_useless(fg);
    debug!("binding associations to channels...");
    bind_association(fg);
    debug!("assigning names to signal sources...");
    assign_names(fg);
    debug!("assigning mixers to the tree...");
    assign_mixers(fg);
    debug!("preparing pin controls...");
    prepare_pin_ctrl(fg);
    debug!("AFG commit...");
    audio_commit(fg, bus);
    debug!("creating PCM devices...");
    create_pcms(fg);
    set_all_defaults(fg, bus);
    if !fg.quirks.is_empty() {
        debug!("FG config/quirks: {}", fg.quirks);
    }
    debug!("HP switch init...");
    switch_init(fg, bus);
    dump_controls(fg);
}

fn dump_controls(fg: &FunctionGroup) {
    for (i, c) in fg.controls.iter().enumerate() {
        debug!(
            "{:3}: nid {:3} {} ({}) index {} cnid {:?} ossmask={:#010x} mute: {} step: {:3} size: {:3} off: {:3}{}",
            i,
            fg.nid_of(c.widget),
            if c.ndir == AmpDir::In { "in " } else { "out" },
            if c.dir == AmpDir::In { "in " } else { "out" },
            c.index,
            c.child.map(|w| fg.nid_of(w)),
            c.ossmask.bits(),
            c.mute_cap,
            c.steps,
            c.step_size,
            c.offset,
            if !c.enabled {
                " [DISABLED]"
            } else if c.ossmask.is_empty() {
                " [UNUSED]"
            } else {
                ""
            }
        );
    }
}

// ============================================================================
// Parse
// ============================================================================

/// AFG と全ノードを D0 にする
pub fn powerup(fg: &FunctionGroup, bus: &mut dyn CodecBus) {
    fg.send(bus, fg.nid, VERB_SET_POWER | POWER_D0);
    bus.delay_us(100);
    for nid in fg.nids() {
        fg.send(bus, nid, VERB_SET_POWER | POWER_D0);
    }
    bus.delay_us(1000);
}

/// AFG の能力を読み、全ウィジェットを初期化して解析する
pub fn audio_parse(fg: &mut FunctionGroup, bus: &mut dyn CodecBus) {
    fg.gpio = fg.get_param(bus, fg.nid, PARAM_GPIO_COUNT);
    debug!("GPIO: {:#010x} NumGPIO={}", fg.gpio, fg.gpio & GPIO_COUNT_MASK);
    fg.formats = fg.get_param(bus, fg.nid, PARAM_STREAM_FORMATS);
    fg.pcm = fg.get_param(bus, fg.nid, PARAM_PCM_CAPS);
    fg.out_amp_cap = fg.get_param(bus, fg.nid, PARAM_OUT_AMP_CAPS);
    fg.in_amp_cap = fg.get_param(bus, fg.nid, PARAM_IN_AMP_CAPS);

    for nid in fg.nids() {
        if let Some(w) = fg.widget_mut(nid) {
            *w = super::widget::Widget::new(nid);
        }
        widget_parse(fg, bus, nid);
    }
}

/// ビープ発生器なのにピンとして申告されるノード
fn beeper_nid(codec_id: u32) -> Option<Nid> {
    match codec_id {
        HDA_CODEC_AD1882 | HDA_CODEC_AD1883 | HDA_CODEC_AD1984 | HDA_CODEC_AD1984A
        | HDA_CODEC_AD1984B | HDA_CODEC_AD1987 | HDA_CODEC_AD1988 | HDA_CODEC_AD1988B
        | HDA_CODEC_AD1989B => Some(26),
        HDA_CODEC_ALC260 => Some(23),
        HDA_CODEC_ALC262 | HDA_CODEC_ALC268 | HDA_CODEC_ALC880 | HDA_CODEC_ALC882
        | HDA_CODEC_ALC883 | HDA_CODEC_ALC885 | HDA_CODEC_ALC888 | HDA_CODEC_ALC889 => Some(29),
        HDA_CODEC_STAC9228X => Some(0x23),
        _ => None,
    }
}

/// ウィジェット1つを読み出す
pub fn widget_parse(fg: &mut FunctionGroup, bus: &mut dyn CodecBus, nid: Nid) {
    let mut caps = fg.get_param(bus, nid, PARAM_WIDGET_CAPS);
    let mut waspin = false;
    if beeper_nid(fg.vendor_id) == Some(nid) {
        let orig = caps;
        caps = (caps & !(0xF << 20)) | ((WIDGET_TYPE_BEEP_GEN as u32) << 20);
        waspin = true;
        debug!("patching widget caps nid={} {:#010x} -> {:#010x}", nid, orig, caps);
    }
    let kind = WidgetKind::from_raw(widget_cap_type(caps));

    let conns = connection_parse(fg, bus, nid);

    let out_amp_cap = if caps & WCAP_OUT_AMP == 0 {
        0
    } else if caps & WCAP_AMP_OVERRIDE != 0 {
        fg.get_param(bus, nid, PARAM_OUT_AMP_CAPS)
    } else {
        fg.out_amp_cap
    };
    let in_amp_cap = if caps & WCAP_IN_AMP == 0 {
        0
    } else if caps & WCAP_AMP_OVERRIDE != 0 {
        fg.get_param(bus, nid, PARAM_IN_AMP_CAPS)
    } else {
        fg.in_amp_cap
    };

    let (formats, pcm) = match kind {
        WidgetKind::AudioOutput | WidgetKind::AudioInput if caps & WCAP_FORMAT_OVERRIDE != 0 => {
            let f = fg.get_param(bus, nid, PARAM_STREAM_FORMATS);
            let p = fg.get_param(bus, nid, PARAM_PCM_CAPS);
            (
                if f != 0 { f } else { fg.formats },
                if p != 0 { p } else { fg.pcm },
            )
        }
        WidgetKind::AudioOutput | WidgetKind::AudioInput => (fg.formats, fg.pcm),
        _ => (0, 0),
    };

    let (kind, eapd) = match kind {
        WidgetKind::PinComplex(_) => {
            let (pin, eapd) = pin_parse(fg, bus, nid);
            (WidgetKind::PinComplex(pin), eapd)
        }
        k => (k, None),
    };

    if let Some(w) = fg.widget_mut(nid) {
        w.caps = caps;
        w.waspin = waspin;
        w.kind = kind;
        w.set_conns(&conns);
        w.out_amp_cap = out_amp_cap;
        w.in_amp_cap = in_amp_cap;
        w.formats = formats;
        w.pcm = pcm;
        w.eapd = eapd;
        w.name = match w.pin() {
            Some(pin) => pin_name(pin),
            None => kind.name().to_string(),
        };
    }
}

/// 接続表を読み出す
///
/// 範囲エントリは展開する。上限を超えた分は捨てる。
pub fn connection_parse(fg: &FunctionGroup, bus: &mut dyn CodecBus, nid: Nid) -> Vec<Nid> {
    let mut conns: Vec<Nid> = Vec::new();
    let res = fg.get_param(bus, nid, PARAM_CONN_LIST_LEN);
    let ents = (res & CONN_LIST_LEN_MASK) as usize;
    if ents < 1 {
        return conns;
    }

    let entnum = if res & CONN_LIST_LONG_FORM != 0 { 2 } else { 4 };
    let bits = 32 / entnum;
    let rmask: u32 = 1 << (bits - 1);
    let nmask: u32 = rmask - 1;
    let mut prev: Nid = 0;

    let mut i = 0;
    while i < ents {
        let res = fg.send(bus, nid, VERB_GET_CONN_LIST | i as u32);
        for j in 0..entnum {
            let val = res >> (bits * j);
            let cnid = (val & nmask) as Nid;
            if cnid == 0 {
                if conns.len() < ents {
                    warn!(
                        "nid={} zero cnid entnum={} j={} index={} entries={} found={} res={:#010x}",
                        nid,
                        entnum,
                        j,
                        i,
                        ents,
                        conns.len(),
                        res
                    );
                } else {
                    return conns;
                }
            }
            if cnid < fg.start || cnid >= fg.end() {
                debug!("GHOST: nid={} j={} entnum={} index={} res={:#010x}", nid, j, entnum, i, res);
            }
            let first = if val & rmask == 0 {
                cnid
            } else if prev == 0 || prev >= cnid {
                warn!(
                    "invalid child range nid={} index={} j={} prevcnid={} cnid={}",
                    nid, i, j, prev, cnid
                );
                cnid
            } else {
                prev + 1
            };
            for add in first..=cnid {
                if conns.len() >= MAX_CONNS {
                    warn!("adding {} (nid={}): max connection reached ({})", add, nid, MAX_CONNS);
                    return conns;
                }
                conns.push(add);
            }
            prev = cnid;
        }
        i += entnum;
    }
    conns
}

/// ピンの Configuration Default・能力・制御値・EAPD を読む
pub fn pin_parse(fg: &FunctionGroup, bus: &mut dyn CodecBus, nid: Nid) -> (PinInfo, Option<u32>) {
    let config = fg.send(bus, nid, VERB_GET_CONFIG_DEFAULT);
    let cap = fg.get_param(bus, nid, PARAM_PIN_CAPS);
    let ctrl = fg.send(bus, nid, VERB_GET_PIN_CTL);
    debug!("nid {} config {:#010x} cap {:#010x} ctrl {:#04x}", nid, config, cap, ctrl);

    let eapd = if cap & PINCAP_EAPD != 0 {
        let v = fg.send(bus, nid, VERB_GET_EAPD);
        Some((v & EAPD_MASK) | EAPD_EAPD)
    } else {
        None
    };
    (PinInfo { config, cap, ctrl }, eapd)
}

/// 静的クワーク表とノード上書き表を適用する
pub fn vendor_patch_parse(fg: &mut FunctionGroup, config: &HdaConfig) {
    fg.quirks = apply_quirk_table(QUIRK_TABLE, fg.subvendor, fg.vendor_id, fg.quirks);
    apply_node_patches(fg, &config.patches);

    for w in fg.widgets.iter().filter(|w| w.enabled) {
        let pin = w.pin().copied().unwrap_or_default();
        debug!(
            "nid={} config={:08x} type={:x} cap={:08x} ctrl={:08x} conns={:?}",
            w.nid,
            pin.config,
            w.kind.raw(),
            pin.cap,
            pin.ctrl,
            w.conns.iter().filter(|c| c.enabled).map(|c| c.nid).collect::<Vec<_>>()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::audio::hda::fake::FakeCodec;

    fn fg_for(bus: &FakeCodec) -> FunctionGroup {
        let sub = bus.nodes[&1].params[&PARAM_SUB_NODE_COUNT];
        FunctionGroup::new(0, 1, sub_node_start(sub) as Nid, sub_node_total(sub) as usize)
    }

    #[test]
    fn test_not_responding() {
        let mut bus = FakeCodec::new(0, 0x10ec_0262, 2, 1);
        let cfg = HdaConfig::default();
        assert!(probe_codec(&mut bus, 3, &cfg).is_none());
    }

    #[test]
    fn test_connection_range_expands() {
        // 2, 4 (範囲) -> 2,3,4 ; 7
        let mut bus = FakeCodec::new(0, 0, 2, 8).widget(9, WIDGET_TYPE_AUDIO_MIXER, 0, &[2, 0x84, 7]);
        let fg = fg_for(&bus);
        assert_eq!(connection_parse(&fg, &mut bus, 9), [2, 3, 4, 7]);
    }

    #[test]
    fn test_connection_bad_range_and_cap() {
        // 先頭が範囲 -> 5 のみ
        let mut bus = FakeCodec::new(0, 0, 2, 8).widget(9, WIDGET_TYPE_AUDIO_MIXER, 0, &[0x85]);
        let fg = fg_for(&bus);
        assert_eq!(connection_parse(&fg, &mut bus, 9), [5]);

        // 1..=40 の範囲は 32 で切られる
        let mut bus = FakeCodec::new(0, 0, 2, 8).widget(9, WIDGET_TYPE_AUDIO_MIXER, 0, &[1, 0x80 | 40]);
        let fg = fg_for(&bus);
        let conns = connection_parse(&fg, &mut bus, 9);
        assert_eq!(conns.len(), MAX_CONNS);
        assert_eq!(conns[31], 32);
    }

    #[test]
    fn test_beeper_override() {
        let mut bus = FakeCodec::new(0, HDA_CODEC_ALC262, 0x14, 10).pin(
            29,
            0,
            PINCAP_INPUT,
            0x4000_0000,
            &[],
        );
        let mut fg = fg_for(&bus);
        fg.vendor_id = HDA_CODEC_ALC262;
        widget_parse(&mut fg, &mut bus, 29);
        let w = fg.widget(29).unwrap();
        assert_eq!(w.kind, WidgetKind::Beep);
        assert!(w.waspin);
        assert_eq!(w.name, "beep widget");
    }

    #[test]
    fn test_pin_eapd_and_amp_from_afg() {
        let mut bus = FakeCodec::new(0, 0, 2, 4)
            .param(1, PARAM_OUT_AMP_CAPS, 0x8000_2727)
            .pin(3, WCAP_OUT_AMP, PINCAP_OUTPUT | PINCAP_EAPD, 0x0101_4010, &[2]);
        let mut fg = fg_for(&bus);
        audio_parse(&mut fg, &mut bus);
        let w = fg.widget(3).unwrap();
        assert_eq!(w.out_amp_cap, 0x8000_2727);
        assert_eq!(w.eapd, Some(EAPD_EAPD));
        assert_eq!(w.pin().unwrap().config, 0x0101_4010);
        assert_eq!(w.name, "pin: Line-out (Green Rear)");
    }
}
