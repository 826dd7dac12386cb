// ============================================================================
// src/io/audio/hda/naming.rs - Naming
// ============================================================================
//!
//! ピン名の合成と OSS 論理デバイスの割り当て。

use alloc::format;
use alloc::string::String;

use super::group::FunctionGroup;
use super::regs::*;
use super::types::*;

pub const COLOR_NAMES: [&str; 16] = [
    "Unknown", "Black", "Grey", "Blue", "Green", "Red", "Orange", "Yellow", "Purple", "Pink",
    "Res.A", "Res.B", "Res.C", "Res.D", "White", "Other",
];

pub const DEVICE_NAMES: [&str; 16] = [
    "Line-out",
    "Speaker",
    "Headphones",
    "CD",
    "SPDIF-out",
    "Digital-out",
    "Modem-line",
    "Modem-handset",
    "Line-in",
    "AUX",
    "Microphone",
    "Telephony",
    "SPDIF-in",
    "Digital-in",
    "Res.E",
    "Other",
];

pub const CONNECTIVITY_NAMES: [&str; 4] = ["Jack", "None", "Fixed", "Both"];

pub const JACK_NAMES: [&str; 11] = [
    "Unknown", "1/8", "1/4", "ATAPI", "RCA", "Optic", "Digital", "Analog", "Multi", "XLR", "RJ-11",
];

/// `"pin: Headphones (Green Front)"` 形式の名前
pub fn pin_name(pin: &PinInfo) -> String {
    let conn = pin.connectivity();
    let color = pin.color();
    let location = pin.location();

    let place = match location {
        CONFIG_LOCATION_HDMI => "HDMI",
        CONFIG_LOCATION_ATAPI => "CD",
        _ => match conn {
            CONFIG_CONNECTIVITY_JACK if location == CONFIG_LOCATION_FRONT => "Front",
            CONFIG_CONNECTIVITY_JACK => "Rear",
            CONFIG_CONNECTIVITY_FIXED => JACK_NAMES
                .get(pin.connection_type() as usize)
                .copied()
                .unwrap_or("Unknown"),
            other => CONNECTIVITY_NAMES[other as usize & 3],
        },
    };

    let device = DEVICE_NAMES[pin.device() as usize & 0xF];
    if conn == CONFIG_CONNECTIVITY_JACK && color != 0 && color != 15 {
        format!("pin: {} ({} {})", device, COLOR_NAMES[color as usize & 0xF], place)
    } else {
        format!("pin: {} ({})", device, place)
    }
}

/// 論理デバイス名を `", "` で連結する
pub fn mask_to_string(mask: OssMask) -> String {
    let mut out = String::new();
    for dev in mask.devices() {
        if !out.is_empty() {
            out.push_str(", ");
        }
        out.push_str(dev.name());
    }
    out
}

const LINE: &[OssDev] = &[OssDev::Line, OssDev::Line1, OssDev::Line2, OssDev::Line3];
const INT_MIC: &[OssDev] = &[OssDev::Monitor, OssDev::Mic];
const EXT_MIC: &[OssDev] = &[OssDev::Mic, OssDev::Monitor];
const CD: &[OssDev] = &[OssDev::Cd];
const SPEAKER: &[OssDev] = &[OssDev::Speaker];
const DIGITAL: &[OssDev] = &[OssDev::Digital1, OssDev::Digital2, OssDev::Digital3];
const OTHERS: &[OssDev] = &[
    OssDev::Line,
    OssDev::Line1,
    OssDev::Line2,
    OssDev::Line3,
    OssDev::PhoneIn,
    OssDev::PhoneOut,
    OssDev::Video,
    OssDev::Radio,
    OssDev::Digital1,
    OssDev::Digital2,
    OssDev::Digital3,
    OssDev::Monitor,
];

fn first_unused(list: &[OssDev], used: OssMask) -> Option<OssDev> {
    list.iter().copied().find(|d| !used.contains(d.mask()))
}

/// 入力アソシエーションに属する有効なピンか
fn is_input_pin(fg: &FunctionGroup, nid: Nid) -> Option<PinInfo> {
    let w = fg.enabled_widget(nid)?;
    let pin = *w.pin()?;
    match w.binding {
        Binding::Assoc(a) if fg.assoc(a).dir == Direction::In => Some(pin),
        _ => None,
    }
}

/// 入力ピン・DAC・ビープに論理デバイスを割り当てる
pub fn assign_names(fg: &mut FunctionGroup) {
    let mut used = OssMask::empty();

    // 確実にわかるもの
    for nid in fg.nids() {
        let Some(w) = fg.enabled_widget(nid) else {
            continue;
        };
        if w.binding == Binding::Unbound {
            continue;
        }
        let dev = match w.kind {
            WidgetKind::PinComplex(_) => {
                let Some(pin) = is_input_pin(fg, nid) else {
                    continue;
                };
                let list = match pin.device() {
                    CONFIG_DEVICE_LINE_IN => LINE,
                    CONFIG_DEVICE_MIC_IN if pin.connectivity() == CONFIG_CONNECTIVITY_JACK => EXT_MIC,
                    CONFIG_DEVICE_MIC_IN => INT_MIC,
                    CONFIG_DEVICE_CD => CD,
                    CONFIG_DEVICE_SPEAKER => SPEAKER,
                    CONFIG_DEVICE_SPDIF_IN | CONFIG_DEVICE_DIGITAL_OTHER_IN => DIGITAL,
                    _ => continue,
                };
                first_unused(list, used)
            }
            WidgetKind::AudioOutput => Some(OssDev::Pcm),
            WidgetKind::Beep => Some(OssDev::Speaker),
            _ => None,
        };
        if let Some(dev) = dev {
            if let Some(w) = fg.widget_mut(nid) {
                w.ossdev = Some(dev);
            }
            used |= dev.mask();
        }
    }

    // 種別から推測できるもの
    for nid in fg.nids() {
        if fg.widget(nid).is_some_and(|w| w.ossdev.is_some()) {
            continue;
        }
        let Some(pin) = is_input_pin(fg, nid) else {
            continue;
        };
        let list = match pin.device() {
            CONFIG_DEVICE_LINE_OUT | CONFIG_DEVICE_SPEAKER | CONFIG_DEVICE_HP_OUT | CONFIG_DEVICE_AUX => {
                LINE
            }
            CONFIG_DEVICE_MIC_IN => EXT_MIC,
            CONFIG_DEVICE_SPDIF_OUT | CONFIG_DEVICE_DIGITAL_OTHER_OUT => DIGITAL,
            _ => continue,
        };
        if let Some(dev) = first_unused(list, used) {
            if let Some(w) = fg.widget_mut(nid) {
                w.ossdev = Some(dev);
            }
            used |= dev.mask();
        }
    }

    // 残り
    for nid in fg.nids() {
        if fg.widget(nid).is_some_and(|w| w.ossdev.is_some()) || is_input_pin(fg, nid).is_none() {
            continue;
        }
        if let Some(dev) = first_unused(OTHERS, used) {
            if let Some(w) = fg.widget_mut(nid) {
                w.ossdev = Some(dev);
            }
            used |= dev.mask();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::audio::hda::assoc::Association;
    use crate::io::audio::hda::fake::TopologyBuilder;

    fn pin(config: u32) -> PinInfo {
        PinInfo {
            config,
            cap: 0,
            ctrl: 0,
        }
    }

    #[test]
    fn test_pin_names() {
        // Headphones, Green, Jack, Front
        assert_eq!(pin_name(&pin(0x0221_4020)), "pin: Headphones (Green Front)");
        // Speaker, Fixed, Analog
        assert_eq!(pin_name(&pin(0x9017_0110)), "pin: Speaker (Analog)");
        // Line-out, Green, Rear
        assert_eq!(pin_name(&pin(0x0101_4010)), "pin: Line-out (Green Rear)");
        // HDMI location overrides
        assert_eq!(pin_name(&pin(0x1856_0010)), "pin: Digital-out (HDMI)");
        // None connectivity
        assert_eq!(pin_name(&pin(0x4000_0000)), "pin: Line-out (None)");
    }

    #[test]
    fn test_mask_to_string() {
        assert_eq!(mask_to_string(OssMask::VOLUME | OssMask::PCM | OssMask::MIC), "vol, pcm, mic");
        assert_eq!(mask_to_string(OssMask::empty()), "");
    }

    #[test]
    fn test_assign_names() {
        let mut fg = TopologyBuilder::new(2, 6)
            .dac(2)
            .pin(3, 0x0101_4010, PINCAP_OUTPUT, &[2])
            .pin(4, 0x01A1_9020, PINCAP_INPUT, &[])
            .pin(5, 0x90A7_0121, PINCAP_INPUT, &[])
            .pin(6, 0x0181_3022, PINCAP_INPUT, &[])
            .pin(7, 0x0121_4023, PINCAP_INPUT, &[])
            .build();
        let mut out = Association::new(1);
        out.dir = Direction::Out;
        let mut inp = Association::new(2);
        inp.dir = Direction::In;
        fg.assocs.push(out);
        fg.assocs.push(inp);
        for nid in [2, 3] {
            fg.widget_mut(nid).unwrap().binding = Binding::Assoc(AssocId(0));
        }
        for nid in [4, 5, 6, 7] {
            fg.widget_mut(nid).unwrap().binding = Binding::Assoc(AssocId(1));
        }
        assign_names(&mut fg);

        assert_eq!(fg.widget(2).unwrap().ossdev, Some(OssDev::Pcm));
        // 出力ピンには付かない
        assert_eq!(fg.widget(3).unwrap().ossdev, None);
        // 外部マイク
        assert_eq!(fg.widget(4).unwrap().ossdev, Some(OssDev::Mic));
        // 内蔵マイクは MONITOR から
        assert_eq!(fg.widget(5).unwrap().ossdev, Some(OssDev::Monitor));
        assert_eq!(fg.widget(6).unwrap().ossdev, Some(OssDev::Line));
        // 入力側の Headphones は2周目で line リストの次
        assert_eq!(fg.widget(7).unwrap().ossdev, Some(OssDev::Line1));
    }
}
