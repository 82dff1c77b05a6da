use crate::model::Token;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-sheet reference point: the left-most `x1` and the top-most `y1`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SheetAnchor {
    pub min_x: f64,
    pub max_y: f64,
}

impl SheetAnchor {
    /// Fallback for sheets that have no resolved anchor.
    pub const ZERO: SheetAnchor = SheetAnchor {
        min_x: 0.0,
        max_y: 0.0,
    };

    pub fn new(min_x: f64, max_y: f64) -> Self {
        SheetAnchor { min_x, max_y }
    }
}

/// Anchors for every sheet that has at least one token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetAnchors {
    by_sheet: BTreeMap<u32, SheetAnchor>,
}

impl SheetAnchors {
    pub fn get(&self, sheet: u32) -> Option<SheetAnchor> {
        self.by_sheet.get(&sheet).copied()
    }

    /// The anchor for `sheet`, or [`SheetAnchor::ZERO`] when none was resolved.
    ///
    /// The zero fallback can produce matches near the page origin; callers
    /// that care should check [`SheetAnchors::get`] first.
    pub fn anchor_for(&self, sheet: u32) -> SheetAnchor {
        self.get(sheet).unwrap_or(SheetAnchor::ZERO)
    }

    pub fn len(&self) -> usize {
        self.by_sheet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sheet.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, SheetAnchor)> + '_ {
        self.by_sheet.iter().map(|(s, a)| (*s, *a))
    }
}

impl FromIterator<(u32, SheetAnchor)> for SheetAnchors {
    fn from_iter<I: IntoIterator<Item = (u32, SheetAnchor)>>(iter: I) -> Self {
        SheetAnchors {
            by_sheet: iter.into_iter().collect(),
        }
    }
}

/// Resolve one anchor per sheet from the full token set of a document.
///
/// Non-finite coordinates count as 0, the same as missing ones.
pub fn resolve<'a, I>(tokens: I) -> SheetAnchors
where
    I: IntoIterator<Item = &'a Token>,
{
    let mut by_sheet: BTreeMap<u32, SheetAnchor> = BTreeMap::new();

    for token in tokens {
        let x1 = finite_or_zero(token.bbox.x1);
        let y1 = finite_or_zero(token.bbox.y1);
        by_sheet
            .entry(token.sheet)
            .and_modify(|a| {
                a.min_x = a.min_x.min(x1);
                a.max_y = a.max_y.max(y1);
            })
            .or_insert(SheetAnchor::new(x1, y1));
    }

    SheetAnchors { by_sheet }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
