// ============================================================================
// src/io/audio/hda/jack.rs - Jack Sense Switching
// ============================================================================
//!
//! ジャック検出による出力/入力の切替。
//!
//! 確定済みのバインド情報だけを使い、経路探索や刈り込みはやり直さない。
//!
//! - 出力系（ヘッドホン等）: 挿されたピンを生かし、同じアソシエーションの他ピンを止める
//! - 入力系（マイク等）: ミキサー入力のミュートとセレクタの選択を切り替える

use log::{debug, info, warn};

use super::codec::CodecBus;
use super::control::{amp_get, amp_set, connection_select};
use super::group::FunctionGroup;
use super::quirks::QuirkSet;
use super::regs::*;
use super::types::*;

/// ジャック検出の対象ピンか
fn jack_eligible(fg: &FunctionGroup, nid: Nid) -> bool {
    let Some(w) = fg.enabled_widget(nid) else {
        return false;
    };
    let Some(pin) = w.pin() else {
        return false;
    };
    if !pin.has_cap(PINCAP_PRESENCE_DETECT) || pin.misc() & CONFIG_MISC_NO_JACK != 0 {
        return false;
    }
    w.binding
        .assoc()
        .is_some_and(|a| fg.assoc(a).hpredir.is_some())
}

/// 出力系デバイスか
fn is_output_jack(fg: &FunctionGroup, nid: Nid) -> bool {
    fg.widget(nid)
        .and_then(|w| w.pin())
        .is_some_and(|p| p.is_output_device())
}

/// 対象ピンで非送信要求を有効にし、初回の切替を行う
pub fn switch_init(fg: &mut FunctionGroup, bus: &mut dyn CodecBus) {
    let mut enable = false;
    let mut poll = false;

    for nid in fg.nids() {
        if !jack_eligible(fg, nid) {
            continue;
        }
        enable = true;
        let unsol = fg.widget(nid).is_some_and(|w| w.has_unsol());
        if unsol {
            fg.send(bus, nid, VERB_SET_UNSOL | UNSOL_ENABLE | UNSOL_TAG_JACK);
        } else {
            poll = true;
        }
        if is_output_jack(fg, nid) {
            info!("enabling headphone/speaker audio routing switching at node {}", nid);
        } else {
            info!("enabling mic/monitor audio routing switching at node {}", nid);
        }
    }

    fg.jack_switch = enable;
    if enable {
        switch_handler(fg, bus);
        if poll {
            warn!("poll based jack detection unsupported");
        }
    }
}

/// 全対象ピンのセンスを読み、切替を反映する
pub fn switch_handler(fg: &mut FunctionGroup, bus: &mut dyn CodecBus) {
    let senseinv = fg.quirks.contains(QuirkSet::SENSEINV);
    for nid in fg.nids() {
        if !jack_eligible(fg, nid) {
            continue;
        }
        let res = fg.send(bus, nid, VERB_GET_PIN_SENSE);
        let present = (res & PIN_SENSE_PRESENCE != 0) ^ senseinv;
        info!("pin sense: cad {} nid {} res {:#010x}", fg.cad, nid, res);

        if is_output_jack(fg, nid) {
            hp_switch(fg, bus, nid, present);
        } else {
            mic_switch(fg, bus, nid, present);
        }
    }
}

/// ピン出力を1本切り替える。ミュート可能なアンプがあればそちらを使う
fn pin_output(fg: &mut FunctionGroup, bus: &mut dyn CodecBus, nid: Nid, on: bool) {
    if let Some(id) = amp_get(fg, nid, AmpDir::In, None).filter(|id| fg.controls[id.0].mute_cap) {
        if fg.controls[id.0].forcemute == on {
            fg.controls[id.0].forcemute = !on;
            amp_set(fg, bus, id, None, None, None);
        }
        return;
    }

    let Some(pin) = fg.widget_mut(nid).and_then(|w| w.pin_mut()) else {
        return;
    };
    let val = if on {
        pin.ctrl | PIN_CTL_OUT_EN
    } else {
        pin.ctrl & !PIN_CTL_OUT_EN
    };
    if val != pin.ctrl {
        pin.ctrl = val;
        fg.send(bus, nid, VERB_SET_PIN_CTL | (val & 0xFF));
    }
}

/// ヘッドホン/スピーカーの切替
pub fn hp_switch(fg: &mut FunctionGroup, bus: &mut dyn CodecBus, nid: Nid, present: bool) {
    let Some(a) = fg.enabled_widget(nid).and_then(|w| w.binding.assoc()) else {
        return;
    };
    pin_output(fg, bus, nid, present);

    let others: alloc::vec::Vec<Nid> = fg
        .assoc(a)
        .pins
        .iter()
        .flatten()
        .copied()
        .filter(|&p| p != nid)
        .collect();
    for pin in others {
        pin_output(fg, bus, pin, !present);
    }
}

/// ミキサー入力のミュート解除、またはセレクタの選択
fn enable_input(fg: &mut FunctionGroup, bus: &mut dyn CodecBus, nid: Nid, index: usize, on: bool) {
    let Some(kind) = fg.enabled_widget(nid).map(|w| w.kind) else {
        return;
    };
    match kind {
        WidgetKind::Mixer => {
            let Some(id) = amp_get(fg, nid, AmpDir::In, Some(index)) else {
                return;
            };
            if fg.controls[id.0].forcemute == on {
                fg.controls[id.0].forcemute = !on;
                amp_set(fg, bus, id, None, None, None);
            }
        }
        WidgetKind::Selector if on => connection_select(fg, bus, nid, index),
        _ => {}
    }
}

/// マイク/モニタの切替
pub fn mic_switch(fg: &mut FunctionGroup, bus: &mut dyn CodecBus, nid: Nid, present: bool) {
    let Some(w) = fg.enabled_widget(nid).filter(|w| w.is_pin()) else {
        return;
    };
    let Some(a) = w.binding.assoc() else {
        return;
    };
    let mask_jack = w.seqmask;
    let assoc = fg.assoc(a);
    let mask_def = assoc
        .default_pin
        .and_then(|s| assoc.pins[s])
        .and_then(|p| fg.widget(p))
        .map_or(0, |w| w.seqmask);

    for j in fg.nids() {
        let Some(w) = fg.enabled_widget(j) else {
            continue;
        };
        if w.binding != Binding::Assoc(a) || w.enabled_conns() < 2 {
            continue;
        }
        let is_mixer = w.is_mixer();
        let conns: alloc::vec::Vec<(usize, Nid)> = w
            .conns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.enabled)
            .map(|(i, c)| (i, c.nid))
            .collect();

        for (i, cnid) in conns {
            let Some(child) = fg.widget(cnid) else {
                continue;
            };
            // 子ミキサーは止めない
            if child.is_mixer() {
                continue;
            }
            let cmask = child.seqmask;
            let on = if cmask & mask_jack != 0 { present } else { !present };
            enable_input(fg, bus, j, i, on);
            debug!("switch nid {} conn {} {}", j, i, if on { "on" } else { "off" });

            if is_mixer {
                let on = if cmask & mask_def != 0 { !present } else { present };
                enable_input(fg, bus, j, i, on);
                debug!("mute nid {} conn {} {}", j, i, if on { "on" } else { "off" });
            }
        }
    }
}
