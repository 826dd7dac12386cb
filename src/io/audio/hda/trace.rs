// ============================================================================
// src/io/audio/hda/trace.rs - Path Tracer
// ============================================================================
//!
//! DAC/ADC への経路探索。
//!
//! ## 機能
//! - 出力アソシエーション: ピンごとに最小 nid の DAC を探し、後続ピンが失敗したら
//!   より大きい DAC でやり直すバックトラッキング
//! - 探索（Probe）と確定（Commit）は同じ走査をモード違いで2回行う
//! - 入力アソシエーション: 全ピンに届く最初の ADC を採用
//! - 入力モニタミキサーとビープの予約経路（Extra）

use alloc::vec::Vec;
use log::{debug, info};

use super::group::FunctionGroup;
use super::regs::*;
use super::types::*;

/// 走査モード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    /// 副作用なしで候補を探す
    Probe,
    /// 指定した変換器への経路をバインドする
    Commit(Nid),
}

impl TraceMode {
    fn only(self) -> Option<Nid> {
        match self {
            TraceMode::Probe => None,
            TraceMode::Commit(nid) => Some(nid),
        }
    }
}

/// 1回の DAC 探索の条件
#[derive(Debug, Clone, Copy)]
struct DacQuery {
    assoc: AssocId,
    seq: usize,
    /// ヘッドホン複製で再利用してよい先頭ピンのシーケンス
    dupseq: Option<usize>,
    min: Nid,
    mode: TraceMode,
}

/// 複数入力のうちどれを選択状態として記録するか
fn records_selection(w_is_mixer: bool, w_is_selector: bool, nconns: usize) -> bool {
    (nconns > 1 && !w_is_mixer) || w_is_selector
}

/// `nid` から上流へたどって到達可能な DAC を探す
fn trace_dac(fg: &mut FunctionGroup, q: &DacQuery, nid: Nid, depth: usize) -> Option<Nid> {
    if depth > MAX_PATH_DEPTH {
        return None;
    }
    let w = fg.enabled_widget(nid)?;
    if let Binding::Assoc(a) = w.binding {
        if a != q.assoc {
            if q.mode == TraceMode::Probe {
                debug!("{:depth$}nid {} busy by association {}", "", nid, a.0, depth = depth + 1);
            }
            return None;
        }
    }
    let mask = w.seqmask;
    let busy = match q.dupseq {
        None => mask != 0 && mask & (1 << q.seq) == 0,
        Some(dup) => mask != 0 && mask & (1 << dup) == 0,
    };
    if busy {
        if q.mode == TraceMode::Probe {
            debug!("{:depth$}nid {} busy by seqmask {:#x}", "", nid, mask, depth = depth + 1);
        }
        return None;
    }

    let mut m: Option<Nid> = None;
    match w.kind {
        // 入力変換器の先はたどらない
        WidgetKind::AudioInput => {}
        WidgetKind::AudioOutput => {
            let only_ok = q.mode.only().is_none_or(|only| only == nid);
            let dup_ok = match q.dupseq {
                None => true,
                Some(dup) => fg.assoc(q.assoc).dacs[dup] == Some(nid),
            };
            if only_ok && nid >= q.min && dup_ok {
                m = Some(nid);
            }
        }
        WidgetKind::PinComplex(_) if depth > 0 => {}
        _ => {
            let selconn = w.selconn;
            let conns: Vec<(usize, Nid)> = w
                .conns
                .iter()
                .enumerate()
                .filter(|(i, c)| c.enabled && selconn.is_none_or(|s| s == *i))
                .map(|(i, c)| (i, c.nid))
                .collect();
            let (is_mixer, is_selector, nconns) = (w.is_mixer(), w.is_selector(), w.conns.len());

            let mut im = None;
            for (i, cnid) in conns {
                if let Some(ret) = trace_dac(fg, q, cnid, depth + 1) {
                    if m.is_none_or(|cur| ret < cur) {
                        m = Some(ret);
                        im = Some(i);
                    }
                    if q.mode != TraceMode::Probe || q.dupseq.is_some() {
                        break;
                    }
                }
            }
            if m.is_some()
                && q.mode != TraceMode::Probe
                && records_selection(is_mixer, is_selector, nconns)
            {
                if let Some(w) = fg.widget_mut(nid) {
                    w.selconn = im;
                }
            }
        }
    }

    if m.is_some() && q.mode != TraceMode::Probe {
        if let Some(w) = fg.widget_mut(nid) {
            w.binding = Binding::Assoc(q.assoc);
            w.seqmask |= 1 << q.seq;
        }
    }
    if q.mode == TraceMode::Probe {
        debug!("{:depth$}nid {} returned {:?}", "", nid, m, depth = depth + 1);
    }
    m
}

/// ピンから下流へたどって `adc` に届くか調べ、届いた経路をバインドする
fn trace_adc(fg: &mut FunctionGroup, assoc: AssocId, seq: usize, nid: Nid, adc: Nid, depth: usize) -> bool {
    if depth > MAX_PATH_DEPTH {
        return false;
    }
    let w = match fg.enabled_widget(nid) {
        Some(w) => w,
        None => return false,
    };
    if let Binding::Assoc(a) = w.binding {
        if a != assoc {
            debug!("{:depth$}nid {} busy by association {}", "", nid, a.0, depth = depth + 1);
            return false;
        }
    }

    let mut res = false;
    match w.kind {
        WidgetKind::AudioInput => res = adc == nid,
        WidgetKind::PinComplex(_) if depth > 0 => {}
        _ => {
            for (wc, i) in fg.consumers(nid) {
                if trace_adc(fg, assoc, seq, wc, adc, depth + 1) {
                    res = true;
                    if let Some(wc) = fg.widget_mut(wc) {
                        if records_selection(wc.is_mixer(), wc.is_selector(), wc.conns.len())
                            && wc.selconn.is_none()
                        {
                            wc.selconn = Some(i);
                        }
                    }
                }
            }
        }
    }

    if res {
        if let Some(w) = fg.widget_mut(nid) {
            w.binding = Binding::Assoc(assoc);
            w.seqmask |= 1 << seq;
        }
    }
    debug!("{:depth$}nid {} returned {}", "", nid, res, depth = depth + 1);
    res
}

/// アソシエーションの経路を取り消す。`seq` が `None` なら全シーケンス
pub fn undo_trace(fg: &mut FunctionGroup, assoc: AssocId, seq: Option<usize>) {
    for w in fg.widgets.iter_mut().filter(|w| w.enabled) {
        if w.binding != Binding::Assoc(assoc) {
            continue;
        }
        match seq {
            Some(s) => {
                w.seqmask &= !(1 << s);
                if w.seqmask == 0 {
                    w.binding = Binding::Unbound;
                    w.selconn = None;
                }
            }
            None => {
                w.binding = Binding::Unbound;
                w.seqmask = 0;
                w.selconn = None;
            }
        }
    }
}

/// 出力アソシエーションのシーケンス `seq` 以降を DAC に結ぶ
pub fn trace_assoc_out(fg: &mut FunctionGroup, assoc: AssocId, seq: usize) -> bool {
    let a = fg.assoc(assoc);
    let i = match (seq..MAX_ASSOC_PINS).find(|&i| a.pins[i].is_some()) {
        Some(i) => i,
        None => return true,
    };
    let pin = match a.pins[i] {
        Some(p) => p,
        None => return true,
    };
    let dupseq = if i == MAX_ASSOC_PINS - 1 && !a.fakeredir {
        a.hpredir
    } else {
        None
    };

    let mut min: Nid = 0;
    loop {
        debug!("tracing pin {} with min nid {} hpredir {:?}", pin, min, dupseq);
        let probe = DacQuery {
            assoc,
            seq: i,
            dupseq,
            min,
            mode: TraceMode::Probe,
        };
        let res = match trace_dac(fg, &probe, pin, 0) {
            Some(res) => res,
            None => {
                debug!("unable to trace pin {} seq {} with min nid {}", pin, i, min);
                return false;
            }
        };
        debug!(
            "pin {} traced to DAC {}{}",
            pin,
            res,
            if fg.assoc(assoc).fakeredir { " with fake redirection" } else { "" }
        );
        let commit = DacQuery {
            mode: TraceMode::Commit(res),
            ..probe
        };
        trace_dac(fg, &commit, pin, 0);
        fg.assoc_mut(assoc).dacs[i] = Some(res);

        if trace_assoc_out(fg, assoc, i + 1) {
            return true;
        }
        // 後続が失敗したので、より大きい DAC でやり直す
        undo_trace(fg, assoc, Some(i));
        fg.assoc_mut(assoc).dacs[i] = None;
        min = res + 1;
    }
}

/// 入力アソシエーションの全ピンが届く ADC を探す
pub fn trace_assoc_in(fg: &mut FunctionGroup, assoc: AssocId) -> bool {
    let adcs: Vec<Nid> = fg
        .widgets
        .iter()
        .filter(|w| w.enabled && w.kind == WidgetKind::AudioInput)
        .filter(|w| w.binding.assoc().is_none_or(|a| a == assoc))
        .map(|w| w.nid)
        .collect();
    let pins: Vec<(usize, Nid)> = fg
        .assoc(assoc)
        .pins
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.map(|p| (i, p)))
        .collect();

    for adc in adcs {
        let mut ok = true;
        for &(i, pin) in &pins {
            debug!("tracing pin {} to ADC {}", pin, adc);
            if !trace_adc(fg, assoc, i, pin, adc, 0) {
                debug!("unable to trace pin {} to ADC {}, undo traces", pin, adc);
                undo_trace(fg, assoc, None);
                fg.assoc_mut(assoc).dacs = [None; MAX_ASSOC_PINS];
                ok = false;
                break;
            }
            fg.assoc_mut(assoc).dacs[i] = Some(adc);
        }
        if ok {
            return true;
        }
    }
    false
}

/// モニタ/ビープ経路が出力側へ届くか調べ、届いた経路を Extra にする
fn trace_to_out(fg: &mut FunctionGroup, nid: Nid, depth: usize) -> bool {
    if depth > MAX_PATH_DEPTH {
        return false;
    }
    let w = match fg.enabled_widget(nid) {
        Some(w) => w,
        None => return false,
    };
    if depth > 0 && w.binding != Binding::Unbound {
        return match w.binding {
            Binding::Assoc(a) if fg.assoc(a).dir == Direction::In => {
                debug!("{:depth$}nid {} busy by input association {}", "", nid, a.0, depth = depth + 1);
                false
            }
            _ => {
                debug!("{:depth$}nid {} found output association", "", nid, depth = depth + 1);
                true
            }
        };
    }

    let mut res = false;
    match w.kind {
        WidgetKind::AudioInput => {}
        WidgetKind::PinComplex(_) if depth > 0 => {}
        _ => {
            for (wc, i) in fg.consumers(nid) {
                if trace_to_out(fg, wc, depth + 1) {
                    res = true;
                    if let Some(wc) = fg.widget_mut(wc) {
                        if wc.is_selector() && wc.selconn.is_none() {
                            wc.selconn = Some(i);
                        }
                    }
                }
            }
        }
    }
    if res {
        if let Some(w) = fg.widget_mut(nid) {
            w.binding = Binding::Extra;
        }
    }
    res
}

/// 入力モニタとビープの予約経路を張る
pub fn trace_assoc_extra(fg: &mut FunctionGroup) {
    debug!("tracing input monitor");
    for nid in fg.nids() {
        let is_monitor_candidate = match fg.enabled_widget(nid) {
            Some(w) if w.is_mixer() => match w.binding {
                Binding::Assoc(a) => fg.assoc(a).dir == Direction::In,
                _ => false,
            },
            _ => false,
        };
        if !is_monitor_candidate {
            continue;
        }
        if trace_to_out(fg, nid, 0) {
            info!("nid {} is input monitor", nid);
            if let Some(w) = fg.widget_mut(nid) {
                w.flags |= WidgetFlags::ADC_MONITOR;
                w.ossdev = Some(OssDev::Imix);
            }
        }
    }

    debug!("tracing beeper");
    for nid in fg.nids() {
        if !fg.enabled_widget(nid).is_some_and(|w| w.kind == WidgetKind::Beep) {
            continue;
        }
        if trace_to_out(fg, nid, 0) {
            debug!("nid {} traced to out", nid);
        }
        if let Some(w) = fg.widget_mut(nid) {
            w.binding = Binding::Extra;
        }
    }
}

/// 全アソシエーションの経路を確定する
pub fn build_tree(fg: &mut FunctionGroup) {
    for j in 0..fg.assocs.len() {
        let id = AssocId(j);
        if !fg.assoc(id).enabled {
            continue;
        }
        debug!("tracing association {} ({})", j, fg.assoc(id).index);
        let res = if fg.assoc(id).dir == Direction::Out {
            let mut res = trace_assoc_out(fg, id, 0);
            let a = fg.assoc(id);
            if !res && a.hpredir.is_some() && !a.fakeredir {
                // アナログ複製できないので DAC をもう1つ使って再試行
                fg.assoc_mut(id).fakeredir = true;
                res = trace_assoc_out(fg, id, 0);
            }
            res
        } else {
            trace_assoc_in(fg, id)
        };
        if res {
            debug!("association {} ({}) trace succeeded", j, fg.assoc(id).index);
        } else {
            debug!("association {} ({}) trace failed", j, fg.assoc(id).index);
            fg.assoc_mut(id).enabled = false;
        }
    }

    trace_assoc_extra(fg);
}
