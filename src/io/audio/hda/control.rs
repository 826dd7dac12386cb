// ============================================================================
// src/io/audio/hda/control.rs - Audio Controls (Amplifiers)
// ============================================================================
//!
//! アンプ（ゲイン/ミュート）コントロール。
//!
//! - ウィジェットのアンプ能力からのコントロール生成
//! - `amp_get`: ノード・自然方向・接続インデックスでの検索
//! - `amp_set`: 値を保存してハードウェアへ Set Amplifier Gain/Mute を発行

use log::debug;

use super::codec::CodecBus;
use super::group::FunctionGroup;
use super::regs::*;
use super::types::*;

/// アンプコントロール
#[derive(Debug, Clone)]
pub struct AudioControl {
    pub enabled: bool,
    pub widget: WidgetId,
    /// ミキサー/セレクタの入力コントロールが対応する上流ウィジェット
    pub child: Option<WidgetId>,
    /// 接続インデックス（入力アンプ用）
    pub index: usize,
    /// ハードウェア上の方向
    pub dir: AmpDir,
    /// 信号経路上の自然な方向
    pub ndir: AmpDir,
    pub mute_cap: bool,
    pub steps: u32,
    pub step_size: u32,
    pub offset: u32,
    pub left: u32,
    pub right: u32,
    pub muted: MuteFlags,
    pub forcemute: bool,
    pub ossmask: OssMask,
    pub possmask: OssMask,
}

impl AudioControl {
    fn new(widget: WidgetId, cap: u32, dir: AmpDir, ndir: AmpDir) -> Self {
        let offset = amp_cap_offset(cap);
        Self {
            enabled: true,
            widget,
            child: None,
            index: 0,
            dir,
            ndir,
            mute_cap: cap & AMP_CAP_MUTE != 0,
            steps: amp_cap_steps(cap),
            step_size: amp_cap_step_size(cap),
            offset,
            left: offset,
            right: offset,
            muted: MuteFlags::empty(),
            forcemute: false,
            ossmask: OssMask::empty(),
            possmask: OssMask::empty(),
        }
    }

    /// 強制ミュートして無効化する
    pub fn kill(&mut self) {
        self.forcemute = true;
        self.muted = MuteFlags::ALL;
        self.left = 0;
        self.right = 0;
        self.enabled = false;
    }
}

// ============================================================================
// Control Parse
// ============================================================================

/// 有効なウィジェットのアンプ能力からコントロール表を作る
pub fn ctl_parse(fg: &mut FunctionGroup) {
    let mut controls = alloc::vec::Vec::new();

    for (i, w) in fg.widgets.iter().enumerate() {
        if !w.enabled {
            continue;
        }
        let id = WidgetId(i);

        if w.out_amp_cap != 0 {
            let ndir = if w.is_pin() || w.is_mixer() || w.waspin {
                AmpDir::In
            } else {
                AmpDir::Out
            };
            controls.push(AudioControl::new(id, w.out_amp_cap, AmpDir::Out, ndir));
        }

        if w.in_amp_cap != 0 {
            if w.is_mixer_or_selector() {
                for (j, c) in w.conns.iter().enumerate() {
                    let child = match fg.widget_id(c.nid) {
                        Some(cid) if fg.widgets[cid.0].enabled => cid,
                        _ => continue,
                    };
                    let mut ctl = AudioControl::new(id, w.in_amp_cap, AmpDir::In, AmpDir::In);
                    ctl.child = Some(child);
                    ctl.index = j;
                    controls.push(ctl);
                }
            } else {
                let ndir = if w.is_pin() { AmpDir::Out } else { AmpDir::In };
                controls.push(AudioControl::new(id, w.in_amp_cap, AmpDir::In, ndir));
            }
        }
    }

    debug!("nid {}: {} controls", fg.nid, controls.len());
    fg.controls = controls;
}

// ============================================================================
// Lookup
// ============================================================================

/// 有効なコントロールを (ノード, 自然方向, 接続インデックス) で探す
///
/// `index` は入力側のコントロール（`ndir == dir == In`）にのみ適用される。
pub fn amp_get(fg: &FunctionGroup, nid: Nid, ndir: AmpDir, index: Option<usize>) -> Option<ControlId> {
    fg.controls
        .iter()
        .enumerate()
        .find(|(_, c)| {
            c.enabled
                && fg.nid_of(c.widget) == nid
                && c.ndir == ndir
                && match index {
                    Some(idx) if c.ndir == AmpDir::In && c.dir == c.ndir => c.index == idx,
                    _ => true,
                }
        })
        .map(|(i, _)| ControlId(i))
}

/// `amp_get` で見つかったコントロールを無効化する
pub fn kill_amp(fg: &mut FunctionGroup, nid: Nid, ndir: AmpDir, index: Option<usize>) {
    if let Some(id) = amp_get(fg, nid, ndir, index) {
        fg.controls[id.0].kill();
    }
}

// ============================================================================
// Hardware Access
// ============================================================================

fn amp_set_internal(
    fg: &FunctionGroup,
    bus: &mut dyn CodecBus,
    nid: Nid,
    index: usize,
    (lmute, rmute): (bool, bool),
    (left, right): (u32, u32),
    dir: AmpDir,
) {
    let sel = match dir {
        AmpDir::Out => AMP_SET_OUTPUT,
        AmpDir::In => AMP_SET_INPUT,
    };
    let base = sel | ((index as u32 & 0xF) << AMP_INDEX_SHIFT);
    let side = |mute: bool, gain: u32| (if mute { AMP_MUTE } else { 0 }) | (gain & AMP_GAIN_MASK);

    if left != right || lmute != rmute {
        fg.send(bus, nid, VERB_SET_AMP_GAIN | base | AMP_SET_LEFT | side(lmute, left));
        fg.send(bus, nid, VERB_SET_AMP_GAIN | base | AMP_SET_RIGHT | side(rmute, right));
    } else {
        fg.send(
            bus,
            nid,
            VERB_SET_AMP_GAIN | base | AMP_SET_LEFT | AMP_SET_RIGHT | side(lmute, left),
        );
    }
}

/// 値を保存し（`None` は現状維持）、実効値をハードウェアへ書く
///
/// `forcemute` が立っていれば左右ともミュート・ゲイン 0 で書く。
pub fn amp_set(
    fg: &mut FunctionGroup,
    bus: &mut dyn CodecBus,
    id: ControlId,
    mute: Option<MuteFlags>,
    left: Option<u32>,
    right: Option<u32>,
) {
    let ctl = &mut fg.controls[id.0];
    if let Some(m) = mute {
        ctl.muted = m & MuteFlags::ALL;
    }
    if let Some(l) = left {
        ctl.left = l & AMP_GAIN_MASK;
    }
    if let Some(r) = right {
        ctl.right = r & AMP_GAIN_MASK;
    }

    let (mutes, gains) = if ctl.forcemute {
        ((true, true), (0, 0))
    } else {
        (
            (
                ctl.muted.contains(MuteFlags::LEFT),
                ctl.muted.contains(MuteFlags::RIGHT),
            ),
            (ctl.left, ctl.right),
        )
    };
    let (index, dir, widget) = (ctl.index, ctl.dir, ctl.widget);
    let nid = fg.nid_of(widget);
    amp_set_internal(fg, bus, nid, index, mutes, gains, dir);
}

/// ハードウェアから現在のゲイン/ミュートを読み戻す
pub fn amp_read(fg: &mut FunctionGroup, bus: &mut dyn CodecBus, id: ControlId) {
    let ctl = &fg.controls[id.0];
    let nid = fg.nid_of(ctl.widget);
    let sel = match ctl.dir {
        AmpDir::Out => AMP_GET_OUTPUT,
        AmpDir::In => 0,
    };
    // 左は bit 13、右はクリア
    let base = VERB_GET_AMP_GAIN | sel | (ctl.index as u32 & 0xF);
    let l = fg.send(bus, nid, base | AMP_SET_LEFT);
    let r = fg.send(bus, nid, base);

    let ctl = &mut fg.controls[id.0];
    ctl.left = l & AMP_GAIN_MASK;
    ctl.right = r & AMP_GAIN_MASK;
    let mut muted = MuteFlags::empty();
    if l & AMP_MUTE != 0 {
        muted |= MuteFlags::LEFT;
    }
    if r & AMP_MUTE != 0 {
        muted |= MuteFlags::RIGHT;
    }
    ctl.muted = muted;
}

/// 接続を選択して `selconn` を更新する。範囲外は無視
pub fn connection_select(fg: &mut FunctionGroup, bus: &mut dyn CodecBus, nid: Nid, index: usize) {
    let nconns = match fg.widget(nid) {
        Some(w) => w.conns.len(),
        None => return,
    };
    if index >= nconns {
        return;
    }
    fg.send(bus, nid, VERB_SET_CONN_SEL | (index as u32 & 0xFF));
    if let Some(w) = fg.widget_mut(nid) {
        w.selconn = Some(index);
    }
}
