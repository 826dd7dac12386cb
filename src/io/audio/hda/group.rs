// ============================================================================
// src/io/audio/hda/group.rs - Audio Function Group
// ============================================================================
//!
//! オーディオファンクショングループ。
//!
//! ウィジェット・アソシエーション・コントロール・チャネル・PCM デバイスを
//! それぞれ密な `Vec` に持ち、相互参照は型付きインデックスで行う。
//! ウィジェットは `nid - start` で引く。

use alloc::vec::Vec;

use super::assoc::Association;
use super::codec::CodecBus;
use super::control::AudioControl;
use super::mixer::VolumeFixes;
use super::pcm::{Channel, PcmDevice};
use super::quirks::QuirkSet;
use super::regs::*;
use super::types::*;
use super::widget::Widget;
use crate::error::{HdaError, HdaResult};

/// オーディオファンクショングループ
#[derive(Debug, Clone)]
pub struct FunctionGroup {
    /// コーデックアドレス
    pub cad: u8,
    /// ファンクショングループのノード番号
    pub nid: Nid,
    pub vendor_id: u32,
    pub revision_id: u32,
    pub subvendor: u32,
    /// 先頭ウィジェットのノード番号
    pub start: Nid,
    pub widgets: Vec<Widget>,
    pub assocs: Vec<Association>,
    pub controls: Vec<AudioControl>,
    pub channels: Vec<Channel>,
    pub pcms: Vec<PcmDevice>,
    pub quirks: QuirkSet,
    /// GPIO Count パラメータ
    pub gpio: u32,
    pub formats: u32,
    pub pcm: u32,
    pub in_amp_cap: u32,
    pub out_amp_cap: u32,
    /// ジャック検出による切替が有効か
    pub jack_switch: bool,
    pub volume_fixes: VolumeFixes,
}

impl FunctionGroup {
    pub fn new(cad: u8, nid: Nid, start: Nid, count: usize) -> Self {
        let widgets = (0..count).map(|i| Widget::new(start + i as Nid)).collect();
        Self::with_widgets(cad, nid, start, widgets)
    }

    fn with_widgets(cad: u8, nid: Nid, start: Nid, widgets: Vec<Widget>) -> Self {
        Self {
            cad,
            nid,
            vendor_id: 0,
            revision_id: 0,
            subvendor: 0,
            start,
            widgets,
            assocs: Vec::new(),
            controls: Vec::new(),
            channels: Vec::new(),
            pcms: Vec::new(),
            quirks: QuirkSet::empty(),
            gpio: 0,
            formats: 0,
            pcm: 0,
            in_amp_cap: 0,
            out_amp_cap: 0,
            jack_switch: false,
            volume_fixes: VolumeFixes::default(),
        }
    }

    /// ウィジェット表の確保に失敗したら `AllocFailed`
    pub fn try_new(cad: u8, nid: Nid, start: Nid, count: usize) -> HdaResult<Self> {
        let mut widgets = Vec::new();
        widgets
            .try_reserve_exact(count)
            .map_err(|_| HdaError::AllocFailed)?;
        widgets.extend((0..count).map(|i| Widget::new(start + i as Nid)));
        Ok(Self::with_widgets(cad, nid, start, widgets))
    }

    /// 最終ウィジェットの次のノード番号
    pub fn end(&self) -> Nid {
        self.start + self.widgets.len() as Nid
    }

    pub fn widget_id(&self, nid: Nid) -> Option<WidgetId> {
        if nid >= self.start && nid < self.end() {
            Some(WidgetId((nid - self.start) as usize))
        } else {
            None
        }
    }

    pub fn nid_of(&self, id: WidgetId) -> Nid {
        self.start + id.0 as Nid
    }

    pub fn widget(&self, nid: Nid) -> Option<&Widget> {
        self.widget_id(nid).map(|id| &self.widgets[id.0])
    }

    pub fn widget_mut(&mut self, nid: Nid) -> Option<&mut Widget> {
        self.widget_id(nid).map(move |id| &mut self.widgets[id.0])
    }

    /// 有効なウィジェットのみ返す
    pub fn enabled_widget(&self, nid: Nid) -> Option<&Widget> {
        self.widget(nid).filter(|w| w.enabled)
    }

    pub fn assoc(&self, id: AssocId) -> &Association {
        &self.assocs[id.0]
    }

    pub fn assoc_mut(&mut self, id: AssocId) -> &mut Association {
        &mut self.assocs[id.0]
    }

    /// ウィジェットの属するアソシエーション
    pub fn widget_assoc(&self, nid: Nid) -> Option<&Association> {
        self.widget(nid)
            .and_then(|w| w.binding.assoc())
            .map(|a| &self.assocs[a.0])
    }

    /// 全ウィジェットのノード番号
    pub fn nids(&self) -> core::ops::Range<Nid> {
        self.start..self.end()
    }

    /// `nid` を接続表に持つ有効なウィジェットと接続インデックス
    pub fn consumers(&self, nid: Nid) -> Vec<(Nid, usize)> {
        let mut out = Vec::new();
        for w in self.widgets.iter().filter(|w| w.enabled) {
            for (j, c) in w.conns.iter().enumerate() {
                if c.enabled && c.nid == nid {
                    out.push((w.nid, j));
                }
            }
        }
        out
    }

    /// 動詞を送る
    pub fn send(&self, bus: &mut dyn CodecBus, nid: Nid, verb: u32) -> u32 {
        bus.send_command(make_corb_entry(self.cad, nid, verb), self.cad)
    }

    /// パラメータを読む
    pub fn get_param(&self, bus: &mut dyn CodecBus, nid: Nid, param: u8) -> u32 {
        self.send(bus, nid, VERB_GET_PARAM | param as u32)
    }
}
