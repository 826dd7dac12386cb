// ============================================================================
// src/io/audio/hda/assoc.rs - Association Builder
// ============================================================================
//!
//! ピンを論理ジャック（アソシエーション）にまとめる。
//!
//! ## 機能
//! - Configuration Default のアソシエーション番号 1..14 でグループ化
//! - 番号 15 はピンごとに単独のアソシエーション
//! - シーケンス重複・方向不一致のアソシエーションは無効化
//! - デフォルトピン/ジャックピン、ヘッドホン複製（hpredir）の決定

use alloc::vec::Vec;
use log::{debug, warn};

use super::group::FunctionGroup;
use super::regs::*;
use super::types::*;

/// 単独ピン扱いになるアソシエーション番号
pub const ASSOC_UNASSOCIATED: u32 = 15;

/// アソシエーション（論理ジャック）
#[derive(Debug, Clone)]
pub struct Association {
    pub enabled: bool,
    /// ハードウェア上のアソシエーション番号
    pub index: u32,
    pub dir: Direction,
    /// シーケンス番号ごとのピン
    pub pins: [Option<Nid>; MAX_ASSOC_PINS],
    pub pincnt: usize,
    /// 全ピンがデジタル対応か
    pub digital: bool,
    /// 最終シーケンスで複製する先頭ピンのシーケンス
    pub hpredir: Option<usize>,
    /// 複製に失敗して別 DAC を使う再試行中
    pub fakeredir: bool,
    pub default_pin: Option<usize>,
    pub jack_pin: Option<usize>,
    /// 経路確定後、シーケンスごとの DAC/ADC
    pub dacs: [Option<Nid>; MAX_ASSOC_PINS],
    pub chan: Option<ChannelId>,
}

impl Association {
    pub fn new(index: u32) -> Self {
        Self {
            enabled: false,
            index,
            dir: Direction::Out,
            pins: [None; MAX_ASSOC_PINS],
            pincnt: 0,
            digital: false,
            hpredir: None,
            fakeredir: false,
            default_pin: None,
            jack_pin: None,
            dacs: [None; MAX_ASSOC_PINS],
            chan: None,
        }
    }

    /// ピンのあるシーケンスを昇順に
    pub fn seqs(&self) -> impl Iterator<Item = usize> + '_ {
        self.pins
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_some())
            .map(|(i, _)| i)
    }

    pub fn first_seq(&self) -> Option<usize> {
        self.seqs().next()
    }
}

/// 有効なピンからアソシエーション表を作る
pub fn association_parse(fg: &mut FunctionGroup) {
    let mut assocs = Vec::new();

    for tag in 1..=ASSOC_UNASSOCIATED {
        let mut cur = Association::new(tag);

        for w in fg.widgets.iter().filter(|w| w.enabled) {
            let pin = match w.pin() {
                Some(p) if p.association() == tag => *p,
                _ => continue,
            };
            let seq = pin.sequence() as usize;
            let dir = if pin.is_output_device() {
                Direction::Out
            } else {
                Direction::In
            };

            if cur.pincnt == 0 {
                cur.enabled = true;
                cur.dir = dir;
                cur.digital = true;
            }
            if cur.pins[seq].is_some() {
                warn!(
                    "duplicate pin {} (seq {}) in association {}, disabling association",
                    w.nid, seq, tag
                );
                cur.enabled = false;
            }
            if dir != cur.dir {
                warn!(
                    "pin {} has wrong direction for association {}, disabling association",
                    w.nid, tag
                );
                cur.enabled = false;
            }
            if !w.is_digital() {
                cur.digital = false;
            }
            if pin.misc() & CONFIG_MISC_NO_JACK != 0 {
                cur.default_pin = Some(seq);
            } else {
                cur.jack_pin = Some(seq);
            }
            cur.pins[seq] = Some(w.nid);
            cur.pincnt += 1;

            if tag == ASSOC_UNASSOCIATED {
                assocs.push(core::mem::replace(&mut cur, Association::new(tag)));
            }
        }

        if tag != ASSOC_UNASSOCIATED && cur.pincnt > 0 {
            let first = cur.first_seq();
            if cur.jack_pin.is_some() && cur.pincnt > 1 {
                cur.hpredir = first;
            }
            if cur.default_pin.is_none() {
                cur.default_pin = first;
            }
            assocs.push(cur);
        }
    }

    for (i, a) in assocs.iter().enumerate() {
        debug!(
            "association {} (tag {}) {:?} enabled={} pins={} digital={} hpredir={:?}",
            i, a.index, a.dir, a.enabled, a.pincnt, a.digital, a.hpredir
        );
    }
    fg.assocs = assocs;
}
