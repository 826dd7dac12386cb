// ============================================================================
// src/io/audio/hda/patch.rs - Node Override Table
// ============================================================================
//!
//! 外部から与えられるノード単位の上書き表。
//!
//! 1行1レコードで、存在するキーごとに有効マスクのビットが立つ。
//!
//! ```text
//! cad=0 node=20 config=0x01014010 conns=12,13 type=4 cap=0x3f enable=1 ctrl=0x40
//! cad=0 node=21 pin="as=1 seq=15 device=Headphones conn=Jack"
//! ```
//!
//! 適用はプルーニングの前に行い、ハードウェアが返した値と同じ扱いになる。

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use bitflags::bitflags;
use log::{debug, warn};

use super::group::FunctionGroup;
use super::naming::{pin_name, COLOR_NAMES, CONNECTIVITY_NAMES, DEVICE_NAMES};
use super::regs::*;
use super::types::*;
use crate::error::ConfigError;

bitflags! {
    /// レコード内で有効なフィールド
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PatchMask: u32 {
        const CONFIG = 0x01;
        const CONNS = 0x02;
        const TYPE = 0x04;
        const CAP = 0x08;
        const ENABLE = 0x10;
        const CTRL = 0x20;
    }
}

/// ノード上書きレコード
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub cad: u8,
    pub nid: Nid,
    pub mask: PatchMask,
    pub config: u32,
    /// `config` の代わりにハードウェア値へ適用するテキスト
    pub pin_text: Option<String>,
    pub conns: Vec<Nid>,
    pub kind: u8,
    pub cap: u32,
    pub enable: bool,
    pub ctrl: u32,
}

/// 10進または `0x` 付き16進
pub fn parse_number(s: &str) -> Result<u32, ConfigError> {
    let r = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    r.map_err(|_| ConfigError::BadNumber(s.to_string()))
}

/// 空白区切り。ダブルクォート内の空白は区切らない
fn tokenize(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = None;
    let mut quoted = false;
    for (i, ch) in line.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if let Some(s) = start.take() {
                    out.push(&line[s..i]);
                }
            }
            _ => {
                if start.is_none() {
                    start = Some(i);
                }
            }
        }
        if ch == '"' && start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push(&line[s..]);
    }
    out
}

impl NodePatch {
    /// 1行を解析する
    pub fn parse(line: &str) -> Result<Self, ConfigError> {
        let mut patch = NodePatch::default();
        let mut have_node = false;

        for token in tokenize(line) {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| ConfigError::UnknownKey(token.to_string()))?;
            match key {
                "cad" => patch.cad = parse_number(value)? as u8,
                "node" => {
                    patch.nid = parse_number(value)? as Nid;
                    have_node = true;
                }
                "config" => {
                    patch.config = parse_number(value)?;
                    patch.mask |= PatchMask::CONFIG;
                }
                "pin" => {
                    patch.pin_text = Some(value.trim_matches('"').to_string());
                    patch.mask |= PatchMask::CONFIG;
                }
                "conns" => {
                    patch.conns = value
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(|s| parse_number(s).map(|n| n as Nid))
                        .collect::<Result<_, _>>()?;
                    patch.mask |= PatchMask::CONNS;
                }
                "type" => {
                    patch.kind = parse_number(value)? as u8;
                    patch.mask |= PatchMask::TYPE;
                }
                "cap" => {
                    patch.cap = parse_number(value)?;
                    patch.mask |= PatchMask::CAP;
                }
                "enable" => {
                    patch.enable = parse_number(value)? != 0;
                    patch.mask |= PatchMask::ENABLE;
                }
                "ctrl" => {
                    patch.ctrl = parse_number(value)?;
                    patch.mask |= PatchMask::CTRL;
                }
                other => return Err(ConfigError::UnknownKey(other.to_string())),
            }
        }

        if !have_node {
            return Err(ConfigError::MissingNode);
        }
        Ok(patch)
    }

    /// 複数行をまとめて解析する。空行と `#` コメントは読み飛ばす
    pub fn parse_table(text: &str) -> Result<Vec<Self>, ConfigError> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(Self::parse)
            .collect()
    }
}

fn set_field(config: u32, mask: u32, shift: u32, value: u32) -> u32 {
    (config & !mask) | ((value << shift) & mask)
}

fn lookup(table: &[&str], value: &str) -> Option<u32> {
    table
        .iter()
        .position(|name| name.eq_ignore_ascii_case(value))
        .map(|i| i as u32)
}

/// 数値、または表の名前（大文字小文字を区別しない）
fn number_or_name(table: &[&str], value: &str) -> Result<u32, ConfigError> {
    parse_number(value).or_else(|e| lookup(table, value).ok_or(e))
}

/// Configuration Default をテキストで書き換える
pub fn pin_patch(mut config: u32, text: &str) -> Result<u32, ConfigError> {
    for token in text.split_whitespace() {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| ConfigError::UnknownKey(token.to_string()))?;
        config = match key {
            "seq" => set_field(config, CONFIG_SEQUENCE_MASK, CONFIG_SEQUENCE_SHIFT, parse_number(value)?),
            "as" => set_field(
                config,
                CONFIG_ASSOCIATION_MASK,
                CONFIG_ASSOCIATION_SHIFT,
                parse_number(value)?,
            ),
            "misc" => set_field(config, CONFIG_MISC_MASK, CONFIG_MISC_SHIFT, parse_number(value)?),
            "color" => set_field(
                config,
                CONFIG_COLOR_MASK,
                CONFIG_COLOR_SHIFT,
                number_or_name(&COLOR_NAMES, value)?,
            ),
            "ctype" => set_field(
                config,
                CONFIG_CONNECTION_TYPE_MASK,
                CONFIG_CONNECTION_TYPE_SHIFT,
                parse_number(value)?,
            ),
            "device" => set_field(
                config,
                CONFIG_DEVICE_MASK,
                CONFIG_DEVICE_SHIFT,
                number_or_name(&DEVICE_NAMES, value)?,
            ),
            "loc" => set_field(config, CONFIG_LOCATION_MASK, CONFIG_LOCATION_SHIFT, parse_number(value)?),
            "conn" => set_field(
                config,
                CONFIG_CONNECTIVITY_MASK,
                CONFIG_CONNECTIVITY_SHIFT,
                number_or_name(&CONNECTIVITY_NAMES, value)?,
            ),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
    }
    Ok(config)
}

/// コーデックアドレスが一致するレコードを適用する
///
/// ノード 0、範囲外、無効なウィジェットは対象外。種別を先に変えてから
/// 他のフィールドを書くので、ピン化と同時に Configuration Default を与えられる。
pub fn apply_node_patches(fg: &mut FunctionGroup, patches: &[NodePatch]) {
    let cad = fg.cad;
    for p in patches.iter().filter(|p| p.cad == cad && p.nid != 0) {
        let Some(w) = fg.widget_mut(p.nid).filter(|w| w.enabled) else {
            continue;
        };

        if p.mask.contains(PatchMask::TYPE) {
            let kind = WidgetKind::from_raw(p.kind);
            w.kind = match (kind, w.kind) {
                // ピンのままならピン情報は残す
                (WidgetKind::PinComplex(_), WidgetKind::PinComplex(old)) => WidgetKind::PinComplex(old),
                (k, _) => k,
            };
        }
        if p.mask.contains(PatchMask::CONFIG) {
            if let Some(pin) = w.pin_mut() {
                match &p.pin_text {
                    Some(text) => match pin_patch(pin.config, text) {
                        Ok(config) => pin.config = config,
                        Err(e) => warn!("nid {}: bad pin patch \"{}\": {}", p.nid, text, e),
                    },
                    None => pin.config = p.config,
                }
                let pin = *pin;
                w.name = pin_name(&pin);
            }
        }
        if p.mask.contains(PatchMask::CONNS) {
            w.set_conns(&p.conns);
        }
        if p.mask.contains(PatchMask::CAP) {
            if let Some(pin) = w.pin_mut() {
                pin.cap = p.cap;
            }
        }
        if p.mask.contains(PatchMask::ENABLE) && !p.enable {
            w.enabled = false;
        }
        if p.mask.contains(PatchMask::CTRL) {
            if let Some(pin) = w.pin_mut() {
                pin.ctrl = p.ctrl;
            }
        }
        debug!("nid {} patched ({:?})", p.nid, p.mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::audio::hda::fake::TopologyBuilder;

    #[test]
    fn test_parse_line() {
        let p = NodePatch::parse("cad=0 node=20 config=0x01014010 conns=12,13 type=4 enable=1").unwrap();
        assert_eq!(p.nid, 20);
        assert_eq!(p.config, 0x0101_4010);
        assert_eq!(p.conns, [12, 13]);
        assert_eq!(p.kind, 4);
        assert!(p.enable);
        assert_eq!(
            p.mask,
            PatchMask::CONFIG | PatchMask::CONNS | PatchMask::TYPE | PatchMask::ENABLE
        );
    }

    #[test]
    fn test_parse_quoted_pin() {
        let p = NodePatch::parse("node=21 pin=\"as=1 seq=15 device=Headphones\" ctrl=0xc0").unwrap();
        assert_eq!(p.pin_text.as_deref(), Some("as=1 seq=15 device=Headphones"));
        assert!(p.mask.contains(PatchMask::CONFIG | PatchMask::CTRL));
        assert_eq!(p.ctrl, 0xC0);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(NodePatch::parse("cad=0 config=1"), Err(ConfigError::MissingNode));
        assert_eq!(
            NodePatch::parse("node=2 sel=1"),
            Err(ConfigError::UnknownKey("sel".into()))
        );
        assert_eq!(
            NodePatch::parse("node=zz"),
            Err(ConfigError::BadNumber("zz".into()))
        );
    }

    #[test]
    fn test_parse_table_skips_comments() {
        let t = NodePatch::parse_table("# header\n\nnode=5 enable=0\n  node=6 type=7\n").unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t[1].kind, 7);
    }

    #[test]
    fn test_pin_patch() {
        let c = pin_patch(0, "as=1 seq=15 device=headphones conn=Jack color=green").unwrap();
        assert_eq!(c, 0x0020_401F);
        let c = pin_patch(0x4000_0000, "conn=2 loc=0x18").unwrap();
        assert_eq!(c, 0x9800_0000);
        assert!(pin_patch(0, "device=Toaster").is_err());
        assert!(pin_patch(0, "volume=3").is_err());
    }

    #[test]
    fn test_apply_requires_cad_and_enabled() {
        let mut fg = TopologyBuilder::new(2, 3).dac(2).dac(3).build();
        let patches = [
            NodePatch::parse("cad=1 node=2 enable=0").unwrap(),
            NodePatch::parse("cad=0 node=4 enable=0").unwrap(),
            NodePatch::parse("cad=0 node=3 enable=0").unwrap(),
        ];
        apply_node_patches(&mut fg, &patches);
        assert!(fg.widget(2).unwrap().enabled);
        assert!(!fg.widget(3).unwrap().enabled);
        // 4 は元々無効なので触れない
        assert!(!fg.widget(4).unwrap().enabled);
    }

    #[test]
    fn test_type_then_config() {
        let mut fg = TopologyBuilder::new(2, 3).dac(2).mixer(3, &[2]).build();
        let p = NodePatch::parse("node=3 type=4 config=0x90170110 cap=0x10").unwrap();
        apply_node_patches(&mut fg, &[p]);
        let w = fg.widget(3).unwrap();
        let pin = w.pin().unwrap();
        assert_eq!(pin.config, 0x9017_0110);
        assert_eq!(pin.cap, 0x10);
        assert_eq!(w.name, "pin: Speaker (Analog)");
    }
}
