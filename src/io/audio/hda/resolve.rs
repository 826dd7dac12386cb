// ============================================================================
// src/io/audio/hda/resolve.rs - Control Resolver
// ============================================================================
//!
//! アンプコントロールを OSS 論理デバイスへ割り当てる。
//!
//! ## 機能
//! - ソース側の探索: DAC/ビープ/モニタ/入力ピンから下流へ
//! - デスティネーション側の探索: ADC/出力ピンから上流へ
//! - `need` は「まだ実効的なコントロールが必要」を表す1ビット。最初に満たした
//!   コントロールが `ossmask` を取り、以降は `possmask` にだけ記録する
//! - 最後に `ossmask` が空のコントロールは `possmask` で代用する

use super::control::amp_get;
use super::group::FunctionGroup;
use super::regs::*;
use super::types::*;

/// コントロールに論理デバイスを記録し、残りの `need` を返す
fn claim(fg: &mut FunctionGroup, id: Option<ControlId>, dev: OssDev, need: bool) -> bool {
    let Some(id) = id else {
        return need;
    };
    let ctl = &mut fg.controls[id.0];
    let gives = ctl.steps != 0;
    if gives && need {
        ctl.ossmask |= dev.mask();
    } else {
        ctl.possmask |= dev.mask();
    }
    need && !gives
}

/// 信号源から下流へたどってコントロールを割り当てる
///
/// まだ実効的なコントロールが必要なら true を返す。
pub fn source_amp(
    fg: &mut FunctionGroup,
    nid: Nid,
    index: Option<usize>,
    dev: OssDev,
    mut controllable: bool,
    depth: usize,
    mut need: bool,
) -> bool {
    if depth > MAX_PATH_DEPTH {
        return need;
    }
    let Some(w) = fg.enabled_widget(nid) else {
        return need;
    };

    let conns = if depth > 0 { w.enabled_conns() } else { 0 };
    let is_pin = w.is_pin();
    let stops = depth > 0 && (w.ossdev.is_some() || is_pin || w.kind == WidgetKind::AudioInput);

    // ピンの入力コントロールは共有なので、入力が1本のときだけ使う
    if depth > 0 && controllable && (conns == 1 || !is_pin) {
        let id = amp_get(fg, nid, AmpDir::In, index);
        need = claim(fg, id, dev, need);
    }

    // 自前の論理デバイスを持つノードはそちらでたどる
    if stops {
        return need;
    }

    if let Some(w) = fg.widget_mut(nid) {
        w.ossmask |= dev.mask();
    }

    if conns > 1 {
        controllable = false;
    }
    if controllable {
        let id = amp_get(fg, nid, AmpDir::Out, None);
        need = claim(fg, id, dev, need);
    }

    let mut rneed = false;
    for (wc, j) in fg.consumers(nid) {
        rneed |= source_amp(fg, wc, Some(j), dev, controllable, depth + 1, need);
    }
    rneed && need
}

/// 出力先から上流へたどってコントロールを割り当てる
pub fn dest_amp(fg: &mut FunctionGroup, nid: Nid, dev: OssDev, depth: usize, mut need: bool) {
    if depth > MAX_PATH_DEPTH {
        return;
    }
    let Some(w) = fg.enabled_widget(nid) else {
        return;
    };
    let (binding, seqmask, is_pin) = (w.binding, w.seqmask, w.is_pin());
    let conns: alloc::vec::Vec<(usize, Nid)> = w
        .conns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.enabled)
        .map(|(i, c)| (i, c.nid))
        .collect();

    if depth > 0 {
        // 複数の出力先を持つノードは触れない。ヘッドホン複製の分岐点は例外
        let consumers = fg.consumers(nid).len();
        let dup_point = match binding {
            Binding::Assoc(a) => {
                let a = fg.assoc(a);
                a.hpredir.is_some() && !a.fakeredir && seqmask & (1 << 15) != 0
            }
            _ => false,
        };
        if consumers > 2 || (consumers == 2 && !dup_point) {
            return;
        }

        let id = amp_get(fg, nid, AmpDir::Out, None);
        need = claim(fg, id, dev, need);
    }

    if is_pin && depth > 0 {
        return;
    }

    for (i, cnid) in conns {
        let id = amp_get(fg, nid, AmpDir::In, Some(i));
        let tneed = claim(fg, id, dev, need);
        dest_amp(fg, cnid, dev, depth + 1, tneed);
    }
}

/// 全信号源・出力先からコントロールを割り当てる
pub fn assign_mixers(fg: &mut FunctionGroup) {
    for nid in fg.nids() {
        let Some(w) = fg.enabled_widget(nid) else {
            continue;
        };
        let assoc_dir = w.binding.assoc().map(|a| fg.assoc(a).dir);
        let (kind, ossdev, monitor) = (w.kind, w.ossdev, w.flags.contains(WidgetFlags::ADC_MONITOR));

        match kind {
            WidgetKind::AudioOutput | WidgetKind::Beep => {
                if let Some(dev) = ossdev {
                    source_amp(fg, nid, None, dev, true, 0, true);
                }
            }
            WidgetKind::PinComplex(_) if assoc_dir == Some(Direction::In) => {
                if let Some(dev) = ossdev {
                    source_amp(fg, nid, None, dev, true, 0, true);
                }
            }
            _ if monitor => {
                if let Some(dev) = ossdev {
                    // ソースとして制御できなければ出力先として扱う
                    if source_amp(fg, nid, None, dev, true, 0, true) {
                        dest_amp(fg, nid, dev, 0, true);
                    }
                }
            }
            WidgetKind::AudioInput => dest_amp(fg, nid, OssDev::RecLev, 0, true),
            WidgetKind::PinComplex(_) if assoc_dir == Some(Direction::Out) => {
                dest_amp(fg, nid, OssDev::Volume, 0, true)
            }
            _ => {}
        }
    }

    for ctl in fg.controls.iter_mut() {
        if ctl.ossmask.is_empty() {
            ctl.ossmask = ctl.possmask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::audio::hda::assoc::Association;
    use crate::io::audio::hda::control::ctl_parse;
    use crate::io::audio::hda::fake::TopologyBuilder;

    const AMP: u32 = AMP_CAP_MUTE | 0x1F00 | 0x10;
    const MUTE_ONLY: u32 = AMP_CAP_MUTE;

    fn bind(fg: &mut FunctionGroup, nids: &[Nid], a: usize) {
        for &nid in nids {
            let w = fg.widget_mut(nid).unwrap();
            w.binding = Binding::Assoc(AssocId(a));
            w.seqmask = 1;
        }
    }

    fn out_assoc() -> Association {
        let mut a = Association::new(1);
        a.enabled = true;
        a.dir = Direction::Out;
        a
    }

    #[test]
    fn test_dac_out_amp_claims_pcm() {
        // DAC 2 (out amp) -> pin 3
        let mut fg = TopologyBuilder::new(2, 2)
            .dac(2)
            .out_amp(2, AMP)
            .pin(3, 0x0101_4010, PINCAP_OUTPUT, &[2])
            .build();
        fg.assocs.push(out_assoc());
        bind(&mut fg, &[2, 3], 0);
        fg.widget_mut(2).unwrap().ossdev = Some(OssDev::Pcm);
        ctl_parse(&mut fg);
        assign_mixers(&mut fg);

        let c = &fg.controls[0];
        assert!(c.ossmask.contains(OssMask::PCM));
        // 出力ピンからの VOLUME はステップを持つ唯一の DAC アンプへ
        assert!(c.ossmask.contains(OssMask::VOLUME));
        assert!(fg.widget(2).unwrap().ossmask.contains(OssMask::PCM));
    }

    #[test]
    fn test_mute_only_falls_back_to_possible() {
        let mut fg = TopologyBuilder::new(2, 2)
            .dac(2)
            .out_amp(2, MUTE_ONLY)
            .pin(3, 0x0101_4010, PINCAP_OUTPUT, &[2])
            .build();
        fg.assocs.push(out_assoc());
        bind(&mut fg, &[2, 3], 0);
        fg.widget_mut(2).unwrap().ossdev = Some(OssDev::Pcm);
        ctl_parse(&mut fg);
        assign_mixers(&mut fg);
        // ステップ 0 のアンプは possmask だけに記録され、最後に ossmask へ
        let c = &fg.controls[0];
        assert_eq!(c.possmask, OssMask::PCM | OssMask::VOLUME);
        assert_eq!(c.ossmask, c.possmask);
    }

    #[test]
    fn test_shared_mixer_not_controllable_downstream() {
        // DAC 2, DAC 3 -> mixer 4 (in amps) -> selector 5 (out amp) -> pin 6
        let mut fg = TopologyBuilder::new(2, 5)
            .dac(2)
            .dac(3)
            .mixer(4, &[2, 3])
            .in_amp(4, AMP)
            .selector(5, &[4])
            .out_amp(5, AMP)
            .pin(6, 0x0101_4010, PINCAP_OUTPUT, &[5])
            .build();
        fg.assocs.push(out_assoc());
        bind(&mut fg, &[2, 3, 4, 5, 6], 0);
        fg.widget_mut(2).unwrap().ossdev = Some(OssDev::Pcm);
        ctl_parse(&mut fg);
        assign_mixers(&mut fg);

        let input_for_2 = amp_get(&fg, 4, AmpDir::In, Some(0)).unwrap();
        assert!(fg.controls[input_for_2.0].ossmask.contains(OssMask::PCM));
        // 2入力のミキサーより先は PCM 専用にならない
        let out = amp_get(&fg, 5, AmpDir::Out, None).unwrap();
        assert!(!fg.controls[out.0].ossmask.contains(OssMask::PCM));
        assert!(fg.controls[out.0].ossmask.contains(OssMask::VOLUME));
        assert!(fg.widget(5).unwrap().ossmask.contains(OssMask::PCM));
    }
}
