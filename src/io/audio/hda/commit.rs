// ============================================================================
// src/io/audio/hda/commit.rs - Pin Control Preparation and Commit
// ============================================================================
//!
//! 解決済みの経路をハードウェアへ書き込む。
//!
//! ## 手順
//! 1. Apple 機のみ AFG へ初期化動詞
//! 2. コントロール: ミキサー管理下と無効なものはミュート、それ以外は 0dB
//! 3. 全ウィジェット: 接続選択、ピン制御、EAPD
//! 4. クワーク指定の GPIO

use log::debug;

use super::codec::CodecBus;
use super::control::{amp_set, connection_select};
use super::group::FunctionGroup;
use super::quirks::QuirkSet;
use super::regs::*;
use super::types::*;

/// VREF 候補（クワーク, ピン能力, 制御値）を優先順に
const IVREF_ORDER: [(QuirkSet, u32, u32); 3] = [
    (QuirkSet::IVREF100, PINCAP_VREF_100, PIN_VREF_100),
    (QuirkSet::IVREF80, PINCAP_VREF_80, PIN_VREF_80),
    (QuirkSet::IVREF50, PINCAP_VREF_50, PIN_VREF_50),
];

const OVREF_ORDER: [(QuirkSet, u32, u32); 3] = [
    (QuirkSet::OVREF100, PINCAP_VREF_100, PIN_VREF_100),
    (QuirkSet::OVREF80, PINCAP_VREF_80, PIN_VREF_80),
    (QuirkSet::OVREF50, PINCAP_VREF_50, PIN_VREF_50),
];

fn vref(quirks: QuirkSet, cap: u32, order: &[(QuirkSet, u32, u32); 3]) -> u32 {
    order
        .iter()
        .find(|(q, c, _)| quirks.contains(*q) && cap & c != 0)
        .map_or(0, |&(_, _, v)| v)
}

/// 全ピンの Pin Widget Control 値を決める（送信はしない）
pub fn prepare_pin_ctrl(fg: &mut FunctionGroup) {
    let quirks = fg.quirks;
    for i in 0..fg.widgets.len() {
        let w = &fg.widgets[i];
        let dir = match (w.enabled, w.binding.assoc()) {
            (true, Some(a)) if fg.assocs[a.0].enabled => Some(fg.assocs[a.0].dir),
            _ => None,
        };
        let Some(pin) = fg.widgets[i].pin_mut() else {
            continue;
        };

        pin.ctrl &= !(PIN_CTL_HP_EN | PIN_CTL_OUT_EN | PIN_CTL_IN_EN | PIN_CTL_VREF_MASK);

        match dir {
            None => {}
            Some(Direction::In) => {
                if pin.has_cap(PINCAP_INPUT) {
                    pin.ctrl |= PIN_CTL_IN_EN;
                }
                pin.ctrl |= vref(quirks, pin.cap, &IVREF_ORDER);
            }
            Some(Direction::Out) => {
                if pin.has_cap(PINCAP_OUTPUT) {
                    pin.ctrl |= PIN_CTL_OUT_EN;
                }
                if pin.has_cap(PINCAP_HEADPHONE) && pin.device() == CONFIG_DEVICE_HP_OUT {
                    pin.ctrl |= PIN_CTL_HP_EN;
                }
                pin.ctrl |= vref(quirks, pin.cap, &OVREF_ORDER);
            }
        }
    }
}

/// コントロールの初期値を書く
///
/// 実行時の切替で付いた強制ミュートはここで外す。
pub fn ctl_commit(fg: &mut FunctionGroup, bus: &mut dyn CodecBus) {
    for i in 0..fg.controls.len() {
        let ctl = &mut fg.controls[i];
        if !ctl.enabled || !ctl.ossmask.is_empty() {
            if ctl.enabled {
                ctl.forcemute = false;
            }
            amp_set(fg, bus, ControlId(i), Some(MuteFlags::ALL), Some(0), Some(0));
            continue;
        }
        ctl.forcemute = false;
        let z = ctl.offset.min(ctl.steps);
        amp_set(fg, bus, ControlId(i), Some(MuteFlags::empty()), Some(z), Some(z));
    }
}

/// 解決済みの設定をコーデックへ書き込む
pub fn audio_commit(fg: &mut FunctionGroup, bus: &mut dyn CodecBus) {
    if fg.subvendor == APPLE_INTEL_MAC {
        fg.send(bus, fg.nid, VERB_APPLE_INIT);
    }

    ctl_commit(fg, bus);

    for nid in fg.nids() {
        let Some(w) = fg.widget_mut(nid) else {
            continue;
        };
        let sel = *w.selconn.get_or_insert(0);
        let has_conns = !w.conns.is_empty();
        let pin_ctrl = w.pin().map(|p| p.ctrl);
        let eapd = w.eapd;

        if has_conns {
            connection_select(fg, bus, nid, sel);
        }
        if let Some(ctrl) = pin_ctrl {
            fg.send(bus, nid, VERB_SET_PIN_CTL | (ctrl & 0xFF));
        }
        if let Some(mut val) = eapd {
            if fg.quirks.contains(QuirkSet::EAPDINV) {
                val ^= EAPD_EAPD;
            }
            fg.send(bus, nid, VERB_SET_EAPD | (val & 0xFF));
        }
    }

    gpio_commit(fg, bus);
}

fn gpio_commit(fg: &FunctionGroup, bus: &mut dyn CodecBus) {
    let numgpio = fg.gpio & GPIO_COUNT_MASK;
    let (mut data, mut mask, mut dir) = (0u32, 0u32, 0u32);
    let mut commit = false;

    if fg.quirks.contains(QuirkSet::GPIOFLUSH) {
        commit = numgpio > 0;
    } else {
        for i in 0..numgpio.min(MAX_GPIO) {
            if !fg.quirks.contains(QuirkSet::from_bits_retain(1 << i)) {
                continue;
            }
            if !commit {
                commit = true;
                let d = fg.send(bus, fg.nid, VERB_GET_GPIO_DATA);
                let m = fg.send(bus, fg.nid, VERB_GET_GPIO_EN);
                let r = fg.send(bus, fg.nid, VERB_GET_GPIO_DIR);
                debug!("GPIO init: data={:#010x} mask={:#010x} dir={:#010x}", d, m, r);
            }
            data |= 1 << i;
            mask |= 1 << i;
            dir |= 1 << i;
        }
    }

    if commit {
        debug!("GPIO commit: data={:#010x} mask={:#010x} dir={:#010x}", data, mask, dir);
        fg.send(bus, fg.nid, VERB_SET_GPIO_EN | (mask & 0xFF));
        fg.send(bus, fg.nid, VERB_SET_GPIO_DIR | (dir & 0xFF));
        fg.send(bus, fg.nid, VERB_SET_GPIO_DATA | (data & 0xFF));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::audio::hda::assoc::Association;
    use crate::io::audio::hda::control::ctl_parse;
    use crate::io::audio::hda::fake::{FakeCodec, TopologyBuilder};

    const ALL_PINCAPS: u32 = PINCAP_INPUT
        | PINCAP_OUTPUT
        | PINCAP_HEADPHONE
        | PINCAP_VREF_50
        | PINCAP_VREF_80
        | PINCAP_VREF_100;

    fn two_pins() -> FunctionGroup {
        // 出力ピン 3 (ヘッドホン) と入力ピン 4
        let mut fg = TopologyBuilder::new(2, 3)
            .dac(2)
            .pin(3, 0x0221_4010, ALL_PINCAPS, &[2])
            .pin(4, 0x01a1_9020, ALL_PINCAPS, &[])
            .build();
        let mut out = Association::new(1);
        out.enabled = true;
        out.dir = Direction::Out;
        let mut inp = Association::new(2);
        inp.enabled = true;
        inp.dir = Direction::In;
        fg.assocs.push(out);
        fg.assocs.push(inp);
        fg.widget_mut(3).unwrap().binding = Binding::Assoc(AssocId(0));
        fg.widget_mut(4).unwrap().binding = Binding::Assoc(AssocId(1));
        fg
    }

    fn ctrl(fg: &FunctionGroup, nid: Nid) -> u32 {
        fg.widget(nid).unwrap().pin().unwrap().ctrl
    }

    #[test]
    fn test_prepare_pin_directions() {
        let mut fg = two_pins();
        fg.widget_mut(4).unwrap().pin_mut().unwrap().ctrl = PIN_CTL_OUT_EN | PIN_CTL_HP_EN;
        prepare_pin_ctrl(&mut fg);
        assert_eq!(ctrl(&fg, 3), PIN_CTL_OUT_EN | PIN_CTL_HP_EN);
        assert_eq!(ctrl(&fg, 4), PIN_CTL_IN_EN);
    }

    #[test]
    fn test_prepare_vref_priority() {
        let mut fg = two_pins();
        fg.quirks = QuirkSet::IVREF50 | QuirkSet::IVREF80 | QuirkSet::OVREF50;
        prepare_pin_ctrl(&mut fg);
        assert_eq!(ctrl(&fg, 4), PIN_CTL_IN_EN | PIN_VREF_80);
        assert_eq!(ctrl(&fg, 3) & PIN_CTL_VREF_MASK, PIN_VREF_50);
    }

    #[test]
    fn test_prepare_unused_pin_cleared() {
        let mut fg = two_pins();
        fg.assocs[1].enabled = false;
        fg.widget_mut(4).unwrap().pin_mut().unwrap().ctrl = PIN_CTL_IN_EN | PIN_VREF_100 | 0x100;
        prepare_pin_ctrl(&mut fg);
        // 管理外のビットは残る
        assert_eq!(ctrl(&fg, 4), 0x100);
    }

    #[test]
    fn test_ctl_commit_levels() {
        let mut fg = TopologyBuilder::new(2, 2)
            .dac(2)
            .out_amp(2, AMP_CAP_MUTE | (0x1F << 8) | 0x17)
            .pin(3, 0x0101_4010, PINCAP_OUTPUT, &[2])
            .out_amp(3, 0x0000_0003 << 8 | 0x05)
            .build();
        ctl_parse(&mut fg);
        fg.controls[0].ossmask = OssMask::PCM;
        let mut bus = FakeCodec::new(0, 0x10ec_0262, 2, 2);
        ctl_commit(&mut fg, &mut bus);

        let writes = FakeCodec::writes(&bus.log);
        // DAC: ミキサー管理下なのでミュート、ピン: offset をステップ数で頭打ち
        assert_eq!(writes[0], make_corb_entry(0, 2, VERB_SET_AMP_GAIN | AMP_SET_OUTPUT | AMP_SET_LEFT | AMP_SET_RIGHT | AMP_MUTE));
        assert_eq!(writes[1], make_corb_entry(0, 3, VERB_SET_AMP_GAIN | AMP_SET_OUTPUT | AMP_SET_LEFT | AMP_SET_RIGHT | 3));
        assert_eq!(fg.controls[1].left, 3);
    }

    #[test]
    fn test_commit_eapd_and_selection() {
        let mut fg = two_pins();
        fg.widget_mut(3).unwrap().eapd = Some(EAPD_EAPD);
        fg.quirks = QuirkSet::EAPDINV;
        prepare_pin_ctrl(&mut fg);
        let mut bus = FakeCodec::new(0, 0x10ec_0262, 2, 3);
        audio_commit(&mut fg, &mut bus);

        let writes = FakeCodec::writes(&bus.log);
        assert_eq!(
            writes,
            [
                make_corb_entry(0, 3, VERB_SET_CONN_SEL),
                make_corb_entry(0, 3, VERB_SET_PIN_CTL | PIN_CTL_OUT_EN | PIN_CTL_HP_EN),
                make_corb_entry(0, 3, VERB_SET_EAPD),
                make_corb_entry(0, 4, VERB_SET_PIN_CTL | PIN_CTL_IN_EN),
            ]
        );
        assert_eq!(fg.widget(3).unwrap().selconn, Some(0));
        assert_eq!(fg.widget(2).unwrap().selconn, Some(0));
    }

    #[test]
    fn test_commit_gpio_quirks() {
        let mut fg = TopologyBuilder::new(2, 1).dac(2).build();
        fg.gpio = 2;
        // GPIO3 は GPIO 数を超えるので無視
        fg.quirks = QuirkSet::GPIO1 | QuirkSet::GPIO3;
        let mut bus = FakeCodec::new(0, 0x10ec_0262, 2, 1);
        bus.gpio_data = 0xF0;
        audio_commit(&mut fg, &mut bus);
        assert_eq!(bus.gpio_mask, 0x2);
        assert_eq!(bus.gpio_dir, 0x2);
        assert_eq!(bus.gpio_data, 0x2);
    }

    #[test]
    fn test_commit_apple_init() {
        let mut fg = TopologyBuilder::new(2, 1).dac(2).build();
        fg.subvendor = APPLE_INTEL_MAC;
        let mut bus = FakeCodec::new(0, 0x8384_7680, 2, 1);
        audio_commit(&mut fg, &mut bus);
        assert_eq!(bus.log[0], make_corb_entry(0, 1, VERB_APPLE_INIT));
    }
}
