// ============================================================================
// src/io/audio/hda/widget.rs - Widget and Connection Table
// ============================================================================
//!
//! ウィジェット（ノード）と接続表。
//!
//! - 接続ごとの有効フラグ（有効数は常にフラグから数える）
//! - セレクタの選択インデックス
//! - 経路へのバインド状態（アソシエーション・シーケンスマスク）

use alloc::string::String;
use alloc::vec::Vec;

use super::regs::*;
use super::types::*;

/// 接続表の1エントリ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub nid: Nid,
    pub enabled: bool,
}

/// ウィジェット
#[derive(Debug, Clone)]
pub struct Widget {
    pub nid: Nid,
    pub kind: WidgetKind,
    pub enabled: bool,
    /// Audio Widget Capabilities
    pub caps: u32,
    /// ビープ用に再分類された元ピン
    pub waspin: bool,
    pub conns: Vec<Connection>,
    /// 排他セレクタで選ばれている接続
    pub selconn: Option<usize>,
    pub binding: Binding,
    /// 共有しているアソシエーション内シーケンスのビット集合
    pub seqmask: u16,
    pub ossdev: Option<OssDev>,
    pub ossmask: OssMask,
    pub flags: WidgetFlags,
    /// EAPD 値（EAPD 対応ピンのみ）
    pub eapd: Option<u32>,
    pub in_amp_cap: u32,
    pub out_amp_cap: u32,
    /// Supported Stream Formats
    pub formats: u32,
    /// Supported PCM Size, Rates
    pub pcm: u32,
    pub name: String,
}

impl Widget {
    pub fn new(nid: Nid) -> Self {
        Self {
            nid,
            kind: WidgetKind::Vendor(WIDGET_TYPE_VENDOR),
            enabled: true,
            caps: 0,
            waspin: false,
            conns: Vec::new(),
            selconn: None,
            binding: Binding::Unbound,
            seqmask: 0,
            ossdev: None,
            ossmask: OssMask::empty(),
            flags: WidgetFlags::empty(),
            eapd: None,
            in_amp_cap: 0,
            out_amp_cap: 0,
            formats: 0,
            pcm: 0,
            name: String::new(),
        }
    }

    pub fn pin(&self) -> Option<&PinInfo> {
        match &self.kind {
            WidgetKind::PinComplex(p) => Some(p),
            _ => None,
        }
    }

    pub fn pin_mut(&mut self) -> Option<&mut PinInfo> {
        match &mut self.kind {
            WidgetKind::PinComplex(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_pin(&self) -> bool {
        matches!(self.kind, WidgetKind::PinComplex(_))
    }

    pub fn is_mixer(&self) -> bool {
        self.kind == WidgetKind::Mixer
    }

    pub fn is_selector(&self) -> bool {
        self.kind == WidgetKind::Selector
    }

    pub fn is_mixer_or_selector(&self) -> bool {
        self.is_mixer() || self.is_selector()
    }

    pub fn is_stereo(&self) -> bool {
        self.caps & WCAP_STEREO != 0
    }

    pub fn is_digital(&self) -> bool {
        self.caps & WCAP_DIGITAL != 0
    }

    pub fn has_unsol(&self) -> bool {
        self.caps & WCAP_UNSOL != 0
    }

    pub fn has_in_amp(&self) -> bool {
        self.caps & WCAP_IN_AMP != 0
    }

    pub fn has_out_amp(&self) -> bool {
        self.caps & WCAP_OUT_AMP != 0
    }

    /// 有効な接続数
    pub fn enabled_conns(&self) -> usize {
        self.conns.iter().filter(|c| c.enabled).count()
    }

    /// 指定ノードへの最初の接続インデックス
    pub fn conn_index(&self, nid: Nid) -> Option<usize> {
        self.conns.iter().position(|c| c.nid == nid)
    }

    /// 接続を無効化する。状態が変わったら true
    pub fn disable_conn(&mut self, index: usize) -> bool {
        match self.conns.get_mut(index) {
            Some(c) if c.enabled => {
                c.enabled = false;
                true
            }
            _ => false,
        }
    }

    /// 接続表を置き換える。全エントリ有効、上限で切り詰め
    pub fn set_conns(&mut self, nids: &[Nid]) {
        self.conns = nids
            .iter()
            .take(MAX_CONNS)
            .map(|&nid| Connection { nid, enabled: true })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_count_follows_flags() {
        let mut w = Widget::new(10);
        w.set_conns(&[2, 3, 4]);
        assert_eq!(w.enabled_conns(), 3);
        assert!(w.disable_conn(1));
        assert!(!w.disable_conn(1));
        assert!(!w.disable_conn(9));
        assert_eq!(w.enabled_conns(), 2);
        assert_eq!(w.conn_index(4), Some(2));
    }

    #[test]
    fn test_conn_table_capped() {
        let mut w = Widget::new(10);
        let many: Vec<Nid> = (1..=40).collect();
        w.set_conns(&many);
        assert_eq!(w.conns.len(), MAX_CONNS);
    }
}
