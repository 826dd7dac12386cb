// ============================================================================
// src/io/audio/hda/fake.rs - Test Doubles
// ============================================================================
//!
//! テスト用のコーデックとトポロジー構築ヘルパー。

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use super::codec::CodecBus;
use super::group::FunctionGroup;
use super::regs::*;
use super::types::*;

/// AFG のノード番号
pub const AFG_NID: Nid = 1;

/// 既定のコンバータ能力（16bit, 44.1k/48k, PCM）
pub const DEFAULT_PCM: u32 = PCM_SIZE_16 | (1 << 5) | (1 << 6);

// ============================================================================
// TopologyBuilder
// ============================================================================

/// バスを介さずに `FunctionGroup` を組み立てる
pub struct TopologyBuilder {
    fg: FunctionGroup,
    touched: Vec<bool>,
}

impl TopologyBuilder {
    pub fn new(start: Nid, count: usize) -> Self {
        Self {
            fg: FunctionGroup::new(0, AFG_NID, start, count),
            touched: alloc::vec![false; count],
        }
    }

    fn with(mut self, nid: Nid, f: impl FnOnce(&mut super::widget::Widget)) -> Self {
        let id = self.fg.widget_id(nid).expect("nid outside group");
        self.touched[id.0] = true;
        f(&mut self.fg.widgets[id.0]);
        self
    }

    pub fn kind(self, nid: Nid, kind: WidgetKind) -> Self {
        self.with(nid, |w| w.kind = kind)
    }

    pub fn dac(self, nid: Nid) -> Self {
        self.with(nid, |w| {
            w.kind = WidgetKind::AudioOutput;
            w.caps |= WCAP_STEREO;
            w.formats = STREAM_FORMAT_PCM;
            w.pcm = DEFAULT_PCM;
        })
    }

    pub fn adc(self, nid: Nid, conns: &[Nid]) -> Self {
        self.with(nid, |w| {
            w.kind = WidgetKind::AudioInput;
            w.caps |= WCAP_STEREO;
            w.formats = STREAM_FORMAT_PCM;
            w.pcm = DEFAULT_PCM;
            w.set_conns(conns);
        })
    }

    pub fn mixer(self, nid: Nid, conns: &[Nid]) -> Self {
        self.with(nid, |w| {
            w.kind = WidgetKind::Mixer;
            w.set_conns(conns);
        })
    }

    pub fn selector(self, nid: Nid, conns: &[Nid]) -> Self {
        self.with(nid, |w| {
            w.kind = WidgetKind::Selector;
            w.set_conns(conns);
        })
    }

    pub fn pin(self, nid: Nid, config: u32, cap: u32, conns: &[Nid]) -> Self {
        self.with(nid, |w| {
            w.kind = WidgetKind::PinComplex(PinInfo {
                config,
                cap,
                ctrl: 0,
            });
            w.set_conns(conns);
        })
    }

    pub fn beep(self, nid: Nid) -> Self {
        self.with(nid, |w| w.kind = WidgetKind::Beep)
    }

    pub fn caps(self, nid: Nid, caps: u32) -> Self {
        self.with(nid, |w| w.caps |= caps)
    }

    pub fn in_amp(self, nid: Nid, cap: u32) -> Self {
        self.with(nid, |w| {
            w.caps |= WCAP_IN_AMP;
            w.in_amp_cap = cap;
        })
    }

    pub fn out_amp(self, nid: Nid, cap: u32) -> Self {
        self.with(nid, |w| {
            w.caps |= WCAP_OUT_AMP;
            w.out_amp_cap = cap;
        })
    }

    /// 触れていないノードは無効のまま返す
    pub fn build(mut self) -> FunctionGroup {
        for (w, touched) in self.fg.widgets.iter_mut().zip(self.touched) {
            w.enabled = touched;
        }
        self.fg
    }
}

// ============================================================================
// FakeCodec
// ============================================================================

/// 宣言的なノード表
#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    pub params: BTreeMap<u8, u32>,
    pub config: u32,
    pub conns: Vec<Nid>,
    pub pin_ctl: u32,
    pub sense: u32,
    pub eapd: u32,
}

/// 受け取った動詞を記録し、ノード表から応答するコーデック
#[derive(Debug, Clone)]
pub struct FakeCodec {
    pub cad: u8,
    pub nodes: BTreeMap<Nid, FakeNode>,
    pub gpio_data: u32,
    pub gpio_mask: u32,
    pub gpio_dir: u32,
    /// 受信した CORB エントリ
    pub log: Vec<u32>,
}

impl FakeCodec {
    /// ルートノードと AFG（ウィジェット `start..start+count`）を持つコーデック
    pub fn new(cad: u8, vendor_id: u32, start: Nid, count: u32) -> Self {
        let mut nodes = BTreeMap::new();
        let mut root = FakeNode::default();
        root.params.insert(PARAM_VENDOR_ID, vendor_id);
        root.params.insert(PARAM_REVISION_ID, 0x0010_0100);
        root.params.insert(PARAM_SUB_NODE_COUNT, (AFG_NID as u32) << 16 | 1);
        nodes.insert(0, root);

        let mut afg = FakeNode::default();
        afg.params.insert(PARAM_FUNC_GROUP_TYPE, FG_TYPE_AUDIO);
        afg.params.insert(PARAM_SUB_NODE_COUNT, (start as u32) << 16 | count);
        afg.params.insert(PARAM_STREAM_FORMATS, STREAM_FORMAT_PCM);
        afg.params.insert(PARAM_PCM_CAPS, DEFAULT_PCM);
        nodes.insert(AFG_NID, afg);

        Self {
            cad,
            nodes,
            gpio_data: 0,
            gpio_mask: 0,
            gpio_dir: 0,
            log: Vec::new(),
        }
    }

    fn node(&mut self, nid: Nid) -> &mut FakeNode {
        self.nodes.entry(nid).or_default()
    }

    pub fn param(mut self, nid: Nid, param: u8, value: u32) -> Self {
        self.node(nid).params.insert(param, value);
        self
    }

    /// 汎用ウィジェット。`caps` の種別ビットは `kind` から作る
    pub fn widget(mut self, nid: Nid, kind: u8, caps: u32, conns: &[Nid]) -> Self {
        let mut caps = caps | (kind as u32) << 20;
        if !conns.is_empty() {
            caps |= WCAP_CONN_LIST;
        }
        let node = self.node(nid);
        node.params.insert(PARAM_WIDGET_CAPS, caps);
        node.params.insert(PARAM_CONN_LIST_LEN, conns.len() as u32);
        node.conns = conns.to_vec();
        self
    }

    pub fn pin(self, nid: Nid, caps: u32, pincap: u32, config: u32, conns: &[Nid]) -> Self {
        let mut s = self.widget(nid, WIDGET_TYPE_PIN_COMPLEX, caps, conns);
        let node = s.node(nid);
        node.params.insert(PARAM_PIN_CAPS, pincap);
        node.config = config;
        s
    }

    pub fn sense(mut self, nid: Nid, present: bool) -> Self {
        self.node(nid).sense = if present { PIN_SENSE_PRESENCE } else { 0 };
        self
    }

    /// 記録を消す
    pub fn take_log(&mut self) -> Vec<u32> {
        core::mem::take(&mut self.log)
    }

    /// 記録のうち Set 系（0x7xx と 0x3 アンプ）のみ
    pub fn writes(log: &[u32]) -> Vec<u32> {
        log.iter()
            .copied()
            .filter(|e| {
                let verb = e & 0xFFFFF;
                verb >> 16 == 0x7 || verb >> 16 == 0x3
            })
            .collect()
    }
}

impl CodecBus for FakeCodec {
    fn send_command(&mut self, verb: u32, cad: u8) -> u32 {
        self.log.push(verb);
        if cad != self.cad || (verb >> 28) as u8 != self.cad {
            return HDA_INVALID;
        }
        let nid = ((verb >> 20) & 0xFF) as Nid;
        let v = verb & 0xFFFFF;
        // 存在しないノードは 0 を返す
        let Some(node) = self.nodes.get_mut(&nid) else {
            return 0;
        };

        if v >> 16 == 0xB {
            return 0;
        }
        let payload = v & 0xFF;
        match v & 0xFFF00 {
            VERB_GET_PARAM => node.params.get(&(payload as u8)).copied().unwrap_or(0),
            VERB_GET_CONFIG_DEFAULT => node.config,
            VERB_GET_CONN_LIST => {
                let base = payload as usize;
                (0..4)
                    .map(|k| node.conns.get(base + k).copied().unwrap_or(0) as u32 & 0xFF)
                    .enumerate()
                    .fold(0, |acc, (k, c)| acc | c << (8 * k))
            }
            VERB_GET_PIN_CTL => node.pin_ctl,
            VERB_SET_PIN_CTL => {
                node.pin_ctl = payload;
                0
            }
            VERB_GET_PIN_SENSE => node.sense,
            VERB_GET_EAPD => node.eapd,
            VERB_SET_EAPD => {
                node.eapd = payload;
                0
            }
            VERB_GET_GPIO_DATA => self.gpio_data,
            VERB_GET_GPIO_EN => self.gpio_mask,
            VERB_GET_GPIO_DIR => self.gpio_dir,
            VERB_SET_GPIO_DATA => {
                self.gpio_data = payload;
                0
            }
            VERB_SET_GPIO_EN => {
                self.gpio_mask = payload;
                0
            }
            VERB_SET_GPIO_DIR => {
                self.gpio_dir = payload;
                0
            }
            _ => 0,
        }
    }
}
