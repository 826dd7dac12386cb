// ============================================================================
// src/io/audio/hda/prune.rs - Prune Engine
// ============================================================================
//!
//! 使われないウィジェット・接続・コントロールの無効化。
//!
//! 無効化は単調で、一度無効にしたものは再び有効にしない。
//! `disable_useless` は1周で変化がなくなるまで繰り返す。

use alloc::vec::Vec;
use log::debug;

use super::control::kill_amp;
use super::group::FunctionGroup;
use super::regs::*;
use super::types::*;

/// 電源・ボリュームノブなど信号を通さないウィジェットを無効化する
pub fn disable_non_audio(fg: &mut FunctionGroup) {
    for w in fg.widgets.iter_mut().filter(|w| w.enabled) {
        if matches!(w.kind, WidgetKind::Power | WidgetKind::VolumeKnob) {
            w.enabled = false;
            debug!("disabling nid {} due to its non-audio type", w.nid);
        }
    }
}

/// 不要なピン・コントロール・接続・ウィジェットを収束するまで無効化する
///
/// 何か変化があれば true を返す。
pub fn disable_useless(fg: &mut FunctionGroup) -> bool {
    let mut changed = false;

    for w in fg.widgets.iter_mut().filter(|w| w.enabled) {
        let config = match w.pin() {
            Some(p) => p.config,
            None => continue,
        };
        if (config & CONFIG_CONNECTIVITY_MASK) >> CONFIG_CONNECTIVITY_SHIFT == CONFIG_CONNECTIVITY_NONE {
            w.enabled = false;
            changed = true;
            debug!("disabling pin nid {} due to None connectivity", w.nid);
        } else if config & CONFIG_ASSOCIATION_MASK == 0 {
            w.enabled = false;
            changed = true;
            debug!("disabling unassociated pin nid {}", w.nid);
        }
    }

    loop {
        let mut done = true;

        // 無効ウィジェットに属するコントロール
        for i in 0..fg.controls.len() {
            let ctl = &fg.controls[i];
            if !ctl.enabled {
                continue;
            }
            let widget_off = !fg.widgets[ctl.widget.0].enabled;
            let child_off = ctl.child.is_some_and(|c| !fg.widgets[c.0].enabled);
            if !(widget_off || child_off) {
                continue;
            }
            let (wid, child, ndir, index) = (ctl.widget, ctl.child, ctl.ndir, ctl.index);
            fg.controls[i].kill();
            if ndir == AmpDir::In {
                fg.widgets[wid.0].disable_conn(index);
            }
            done = false;
            debug!(
                "disabling control {} nid {} cnid {:?} due to disabled widget",
                i,
                fg.nid_of(wid),
                child.map(|c| fg.nid_of(c))
            );
        }

        for i in 0..fg.widgets.len() {
            if !fg.widgets[i].enabled {
                continue;
            }
            // 無効な子への接続
            let dead: Vec<usize> = fg.widgets[i]
                .conns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.enabled && fg.enabled_widget(c.nid).is_none())
                .map(|(j, _)| j)
                .collect();
            let nid = fg.widgets[i].nid;
            for j in dead {
                fg.widgets[i].disable_conn(j);
                changed = true;
                debug!("disabling nid {} connection {} due to disabled child widget", nid, j);
            }

            if !fg.widgets[i].is_mixer_or_selector() {
                continue;
            }
            if fg.widgets[i].enabled_conns() == 0 {
                fg.widgets[i].enabled = false;
                done = false;
                debug!("disabling nid {} due to all its inputs disabled", nid);
            }
            if fg.consumers(nid).is_empty() {
                fg.widgets[i].enabled = false;
                done = false;
                debug!("disabling nid {} due to all its consumers disabled", nid);
            }
        }

        if done {
            break;
        }
        changed = true;
    }
    changed
}

/// どのアソシエーションにも属さないウィジェットと、ピンの逆向き接続を無効化する
pub fn disable_unassociated(fg: &mut FunctionGroup) {
    for w in fg.widgets.iter_mut().filter(|w| w.enabled) {
        if w.binding == Binding::Unbound {
            w.enabled = false;
            debug!("disabling unassociated nid {}", w.nid);
        }
    }

    for i in 0..fg.widgets.len() {
        let w = &fg.widgets[i];
        if !w.enabled || !w.is_pin() {
            continue;
        }
        let assoc = match w.binding.assoc() {
            Some(a) => a,
            None => continue,
        };
        let nid = w.nid;

        if fg.assoc(assoc).dir == Direction::In {
            let w = &mut fg.widgets[i];
            for j in 0..w.conns.len() {
                if w.disable_conn(j) {
                    debug!("disabling connection to input pin nid {} conn {}", nid, j);
                }
            }
            kill_amp(fg, nid, AmpDir::In, None);
        } else {
            kill_amp(fg, nid, AmpDir::Out, None);
            for (k, j) in fg.consumers(nid) {
                let Some(cw) = fg.widget_mut(k) else {
                    continue;
                };
                cw.disable_conn(j);
                debug!("disabling connection from output pin nid {} conn {} cnid {}", k, j, nid);
                if cw.is_pin() && cw.conns.len() > 1 {
                    continue;
                }
                kill_amp(fg, k, AmpDir::In, Some(j));
            }
        }
    }
}

/// 再生経路上のセレクタで選ばれていない入力を無効化する
pub fn disable_non_selected(fg: &mut FunctionGroup) {
    for i in 0..fg.widgets.len() {
        let w = &fg.widgets[i];
        if !w.enabled || w.conns.len() <= 1 || w.is_mixer() {
            continue;
        }
        match w.binding.assoc() {
            Some(a) if fg.assoc(a).dir == Direction::Out => {}
            _ => continue,
        }
        let Some(sel) = w.selconn else {
            continue;
        };
        let w = &mut fg.widgets[i];
        for j in 0..w.conns.len() {
            if j != sel && w.disable_conn(j) {
                debug!("disabling unselected connection nid {} conn {}", w.nid, j);
            }
        }
    }
}

/// 異なるアソシエーション/シーケンスをまたぐ接続とコントロールを無効化する
pub fn disable_cross_associations(fg: &mut FunctionGroup) {
    for i in 0..fg.widgets.len() {
        let w = &fg.widgets[i];
        if !w.enabled || w.conns.len() <= 1 || w.is_mixer() || w.binding == Binding::Extra {
            continue;
        }
        let (binding, seqmask, nid) = (w.binding, w.seqmask, w.nid);
        let cross: Vec<(usize, Nid)> = w
            .conns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.enabled)
            .filter_map(|(j, c)| {
                let cw = fg.widget(c.nid)?;
                if cw.binding == Binding::Extra {
                    return None;
                }
                if binding == cw.binding && seqmask & cw.seqmask != 0 {
                    return None;
                }
                Some((j, c.nid))
            })
            .collect();
        for (j, cnid) in cross {
            fg.widgets[i].disable_conn(j);
            debug!("disabling crossassociated connection nid {} conn {} cnid {}", nid, j, cnid);
        }
    }

    for i in 0..fg.controls.len() {
        let ctl = &fg.controls[i];
        let Some(child) = ctl.child else {
            continue;
        };
        if !ctl.enabled {
            continue;
        }
        let (w, cw) = (&fg.widgets[ctl.widget.0], &fg.widgets[child.0]);
        if w.binding == Binding::Extra || cw.binding == Binding::Extra {
            continue;
        }
        if w.binding == cw.binding && w.seqmask & cw.seqmask != 0 {
            continue;
        }
        let (wid, ndir, index) = (ctl.widget, ctl.ndir, ctl.index);
        fg.controls[i].kill();
        if ndir == AmpDir::In {
            fg.widgets[wid.0].disable_conn(index);
        }
        debug!(
            "disabling crossassociated control {} nid {} cnid {}",
            i,
            fg.nid_of(wid),
            fg.nid_of(child)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::audio::hda::control::ctl_parse;
    use crate::io::audio::hda::fake::TopologyBuilder;

    const OUT_JACK: u32 = 0x0101_4010;

    #[test]
    fn test_non_audio_disabled() {
        let mut fg = TopologyBuilder::new(2, 3)
            .kind(2, WidgetKind::Power)
            .kind(3, WidgetKind::VolumeKnob)
            .dac(4)
            .build();
        disable_non_audio(&mut fg);
        assert!(!fg.widget(2).unwrap().enabled);
        assert!(!fg.widget(3).unwrap().enabled);
        assert!(fg.widget(4).unwrap().enabled);
    }

    #[test]
    fn test_none_connectivity_and_zero_assoc_pins() {
        let mut fg = TopologyBuilder::new(2, 4)
            .dac(2)
            .pin(3, 0x4001_4010, PINCAP_OUTPUT, &[2])
            .pin(4, 0x0101_4000, PINCAP_OUTPUT, &[2])
            .pin(5, OUT_JACK, PINCAP_OUTPUT, &[2])
            .build();
        disable_useless(&mut fg);
        assert!(!fg.widget(3).unwrap().enabled);
        assert!(!fg.widget(4).unwrap().enabled);
        assert!(fg.widget(5).unwrap().enabled);
    }

    #[test]
    fn test_mixer_without_consumers_cascades() {
        // 2 -> mixer 3 -> selector 4 (誰も使わない)
        let mut fg = TopologyBuilder::new(2, 4)
            .dac(2)
            .mixer(3, &[2])
            .selector(4, &[3])
            .pin(5, OUT_JACK, PINCAP_OUTPUT, &[2])
            .in_amp(3, AMP_CAP_MUTE | 0x0505)
            .build();
        ctl_parse(&mut fg);
        assert!(disable_useless(&mut fg));
        assert!(!fg.widget(4).unwrap().enabled);
        assert!(!fg.widget(3).unwrap().enabled);
        assert!(fg.controls.iter().all(|c| !c.enabled && c.forcemute));
        assert!(fg.widget(2).unwrap().enabled);
    }

    #[test]
    fn test_disable_useless_is_idempotent() {
        let mut fg = TopologyBuilder::new(2, 5)
            .dac(2)
            .dac(3)
            .mixer(4, &[2, 3, 9])
            .pin(5, OUT_JACK, PINCAP_OUTPUT, &[4])
            .pin(6, 0x4001_4011, PINCAP_OUTPUT, &[4])
            .build();
        ctl_parse(&mut fg);
        disable_non_audio(&mut fg);
        disable_useless(&mut fg);
        let snapshot: Vec<(bool, Vec<bool>)> = fg
            .widgets
            .iter()
            .map(|w| (w.enabled, w.conns.iter().map(|c| c.enabled).collect()))
            .collect();
        assert!(!disable_useless(&mut fg));
        let again: Vec<(bool, Vec<bool>)> = fg
            .widgets
            .iter()
            .map(|w| (w.enabled, w.conns.iter().map(|c| c.enabled).collect()))
            .collect();
        assert_eq!(snapshot, again);
        // 範囲外の接続先 9 は無効化される
        assert!(!fg.widget(4).unwrap().conns[2].enabled);
    }

    #[test]
    fn test_non_selected_only_on_playback() {
        let mut fg = TopologyBuilder::new(2, 4)
            .dac(2)
            .dac(3)
            .selector(4, &[2, 3])
            .pin(5, OUT_JACK, PINCAP_OUTPUT, &[4])
            .build();
        fg.assocs.push(crate::io::audio::hda::assoc::Association::new(1));
        let w = fg.widget_mut(4).unwrap();
        w.binding = Binding::Assoc(AssocId(0));
        w.seqmask = 1;
        w.selconn = Some(1);
        disable_non_selected(&mut fg);
        let w = fg.widget(4).unwrap();
        assert!(!w.conns[0].enabled);
        assert!(w.conns[1].enabled);
    }

    #[test]
    fn test_cross_association_connection() {
        let mut fg = TopologyBuilder::new(2, 3)
            .dac(2)
            .dac(3)
            .selector(4, &[2, 3])
            .build();
        fg.assocs.push(crate::io::audio::hda::assoc::Association::new(1));
        fg.assocs.push(crate::io::audio::hda::assoc::Association::new(2));
        for (nid, a) in [(2, 0), (3, 1), (4, 0)] {
            let w = fg.widget_mut(nid).unwrap();
            w.binding = Binding::Assoc(AssocId(a));
            w.seqmask = 1;
        }
        disable_cross_associations(&mut fg);
        let w = fg.widget(4).unwrap();
        assert!(w.conns[0].enabled);
        assert!(!w.conns[1].enabled);
    }
}
