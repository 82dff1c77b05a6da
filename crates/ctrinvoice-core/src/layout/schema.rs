use crate::model::Field;
use serde::{Deserialize, Serialize};

/// A page layout: the ordered window rules used to tag tokens on a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    /// Fields a well-formed document is expected to yield.
    #[serde(default)]
    pub required: Vec<Field>,
    /// Evaluated in order; the first rule that matches a token wins.
    pub rules: Vec<WindowRuleDef>,
}

impl LayoutDef {
    /// Rules that apply to tokens on `sheet`, in priority order.
    pub fn rules_for_sheet(&self, sheet: u32) -> impl Iterator<Item = &WindowRuleDef> {
        self.rules.iter().filter(move |r| r.sheet == sheet)
    }
}

/// A single classification window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowRuleDef {
    /// 1-based sheet this rule applies to.
    pub sheet: u32,
    pub field: Field,
    pub window: Window,
    #[serde(default)]
    pub text: Option<TextMatch>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Geometric test on a token relative to its sheet anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Window {
    /// Absolute offsets `|minX - x1|` and `|maxY - y1|` inside closed intervals.
    Offset { dx: Interval, dy: Interval },
    /// Signed offsets from the anchor, all bounds strict:
    /// `x1 > minX+left`, `x2 < minX+right`, `y1 > maxY+bottom`, `y2 < maxY+top`.
    Rect {
        left: f64,
        right: f64,
        bottom: f64,
        top: f64,
    },
}

/// Closed numeric interval, written as `[min, max]` in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(min: f64, max: f64) -> Self {
        Interval { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

impl From<[f64; 2]> for Interval {
    fn from([min, max]: [f64; 2]) -> Self {
        Interval { min, max }
    }
}

impl From<Interval> for [f64; 2] {
    fn from(i: Interval) -> Self {
        [i.min, i.max]
    }
}

/// Test on the token's trimmed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Exact, case-sensitive match against any of the listed values.
    OneOf(Vec<String>),
}

impl TextMatch {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            TextMatch::OneOf(values) => values.iter().any(|v| v == text),
        }
    }
}
