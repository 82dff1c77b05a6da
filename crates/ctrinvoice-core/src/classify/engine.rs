use crate::classify::anchor::SheetAnchor;
use crate::layout::schema::{LayoutDef, Window, WindowRuleDef};
use crate::model::{Field, Token};

/// Classify a token against the layout, relative to its sheet anchor.
///
/// Only rules for the token's sheet are considered; the first matching rule
/// wins. Returns `None` when no rule matches.
pub fn classify(token: &Token, anchor: &SheetAnchor, layout: &LayoutDef) -> Option<Field> {
    matching_rule(token, anchor, layout).map(|rule| rule.field)
}

/// The rule that tags this token, if any.
pub fn matching_rule<'a>(
    token: &Token,
    anchor: &SheetAnchor,
    layout: &'a LayoutDef,
) -> Option<&'a WindowRuleDef> {
    let text = token.text.trim();
    layout
        .rules_for_sheet(token.sheet)
        .find(|rule| rule_matches(rule, token, text, anchor))
}

fn rule_matches(rule: &WindowRuleDef, token: &Token, text: &str, anchor: &SheetAnchor) -> bool {
    if !window_contains(&rule.window, token, anchor) {
        return false;
    }
    rule.text.as_ref().map_or(true, |t| t.matches(text))
}

fn window_contains(window: &Window, token: &Token, anchor: &SheetAnchor) -> bool {
    let b = &token.bbox;
    match window {
        Window::Offset { dx, dy } => {
            let off_x = (anchor.min_x - b.x1).abs();
            let off_y = (anchor.max_y - b.y1).abs();
            dx.contains(off_x) && dy.contains(off_y)
        }
        Window::Rect {
            left,
            right,
            bottom,
            top,
        } => {
            b.x1 > anchor.min_x + left
                && b.x2 < anchor.min_x + right
                && b.y1 > anchor.max_y + bottom
                && b.y2 < anchor.max_y + top
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::builtin::load_preset;
    use crate::model::BBox;

    const ANCHOR: SheetAnchor = SheetAnchor {
        min_x: 100.0,
        max_y: 500.0,
    };

    fn tok(sheet: u32, text: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> Token {
        Token::new(sheet, text, BBox::new(x1, y1, x2, y2))
    }

    fn bmcd() -> LayoutDef {
        load_preset("bmcd-invoice").unwrap()
    }

    #[test]
    fn test_invoice_number_offset() {
        // dx = 441, dy = 98
        let t = tok(1, "INV-1001", 541.0, 598.0, 560.0, 604.0);
        assert_eq!(classify(&t, &ANCHOR, &bmcd()), Some(Field::InvoiceNumber));
    }

    #[test]
    fn test_offset_rows_in_priority_order() {
        let layout = bmcd();
        let cases = [
            (97.0, Field::InvoiceNumber),
            (106.0, Field::FederalId),
            (115.0, Field::ClientContract),
            (124.0, Field::ClientDpn),
        ];
        for (dy, expected) in cases {
            // Token above and below the anchor line give the same absolute offset.
            let below = tok(1, "x", 542.0, 500.0 - dy, 580.0, 500.0 - dy + 8.0);
            let above = tok(1, "x", 542.0, 500.0 + dy, 580.0, 500.0 + dy + 8.0);
            assert_eq!(classify(&below, &ANCHOR, &layout), Some(expected));
            assert_eq!(classify(&above, &ANCHOR, &layout), Some(expected));
        }
    }

    #[test]
    fn test_offset_bounds_are_closed() {
        let layout = bmcd();
        for x1 in [540.0, 544.0] {
            let t = tok(1, "x", x1, 403.0, x1 + 20.0, 410.0);
            assert_eq!(classify(&t, &ANCHOR, &layout), Some(Field::InvoiceNumber));
        }
        for dy in [95.0, 99.0] {
            let t = tok(1, "x", 542.0, 500.0 - dy, 560.0, 410.0);
            assert_eq!(classify(&t, &ANCHOR, &layout), Some(Field::InvoiceNumber));
        }
    }

    #[test]
    fn test_offset_just_outside_interval() {
        let layout = bmcd();
        // dx = 439.99 and dx = 444.01 with dy = 98
        for x1 in [539.99, 544.01] {
            let t = tok(1, "x", x1, 402.0, x1 + 20.0, 410.0);
            assert_eq!(classify(&t, &ANCHOR, &layout), None);
        }
        // Gap between invoice_number and federal_id rows
        let t = tok(1, "x", 542.0, 500.0 - 101.5, 560.0, 410.0);
        assert_eq!(classify(&t, &ANCHOR, &layout), None);
    }

    #[test]
    fn test_invoice_end_date_rect() {
        // x1 > 200, x2 < 260, y1 > 210, y2 < 235
        let t = tok(1, "31-Jan-2025", 205.0, 215.0, 255.0, 230.0);
        assert_eq!(classify(&t, &ANCHOR, &bmcd()), Some(Field::InvoiceEndDate));
    }

    #[test]
    fn test_rect_bounds_are_strict() {
        let layout = bmcd();
        let on_left_edge = tok(1, "31-Jan-2025", 200.0, 215.0, 255.0, 230.0);
        let on_top_edge = tok(1, "31-Jan-2025", 205.0, 215.0, 255.0, 235.0);
        assert_eq!(classify(&on_left_edge, &ANCHOR, &layout), None);
        assert_eq!(classify(&on_top_edge, &ANCHOR, &layout), None);
    }

    #[test]
    fn test_state_requires_jurisdiction_code() {
        let layout = bmcd();
        // x1 > 100, x2 < 370, y1 > 267, y2 < 347
        let ky = tok(1, "KY", 150.0, 300.0, 200.0, 320.0);
        let tx = tok(1, "TX", 150.0, 300.0, 200.0, 320.0);
        assert_eq!(classify(&ky, &ANCHOR, &layout), Some(Field::State));
        assert_eq!(classify(&tx, &ANCHOR, &layout), None);
    }

    #[test]
    fn test_state_text_is_trimmed_and_case_sensitive() {
        let layout = bmcd();
        let padded = tok(1, "  OH ", 150.0, 300.0, 200.0, 320.0);
        let lower = tok(1, "oh", 150.0, 300.0, 200.0, 320.0);
        assert_eq!(classify(&padded, &ANCHOR, &layout), Some(Field::State));
        assert_eq!(classify(&lower, &ANCHOR, &layout), None);
    }

    #[test]
    fn test_state_outside_rect() {
        // y2 = 420 is above maxY - 153
        let t = tok(1, "KY", 150.0, 400.0, 200.0, 420.0);
        assert_eq!(classify(&t, &ANCHOR, &bmcd()), None);
    }

    #[test]
    fn test_other_sheets_never_classify() {
        let layout = bmcd();
        let candidates = [
            tok(2, "INV-1001", 541.0, 598.0, 560.0, 604.0),
            tok(2, "KY", 150.0, 300.0, 200.0, 320.0),
            tok(7, "31-Jan-2025", 205.0, 215.0, 255.0, 230.0),
            tok(0, "KY", 150.0, 300.0, 200.0, 320.0),
        ];
        for t in &candidates {
            assert_eq!(classify(t, &ANCHOR, &layout), None);
        }
    }

    #[test]
    fn test_zero_anchor_classifies_near_origin() {
        // dx = 442, dy = 97 measured from (0, 0)
        let t = tok(1, "x", 442.0, 97.0, 460.0, 104.0);
        assert_eq!(
            classify(&t, &SheetAnchor::ZERO, &bmcd()),
            Some(Field::InvoiceNumber)
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let json = r#"{
            "name": "Overlap",
            "version": "1",
            "rules": [
                { "sheet": 1, "field": "client_dpn",
                  "window": { "kind": "rect", "left": 0, "right": 1000, "bottom": -1000, "top": 1000 },
                  "text": { "one_of": ["DPN"] } },
                { "sheet": 1, "field": "state",
                  "window": { "kind": "rect", "left": 0, "right": 1000, "bottom": -1000, "top": 1000 } }
            ]
        }"#;
        let layout = crate::layout::parse_layout_str(json).unwrap();
        let dpn = tok(1, "DPN", 150.0, 300.0, 200.0, 320.0);
        let other = tok(1, "other", 150.0, 300.0, 200.0, 320.0);
        assert_eq!(classify(&dpn, &ANCHOR, &layout), Some(Field::ClientDpn));
        assert_eq!(classify(&other, &ANCHOR, &layout), Some(Field::State));
        assert_eq!(
            matching_rule(&dpn, &ANCHOR, &layout).map(|r| r.field),
            Some(Field::ClientDpn)
        );
    }

    #[test]
    fn test_rules_on_other_sheets() {
        let json = r#"{
            "name": "Two pages",
            "version": "1",
            "rules": [
                { "sheet": 2, "field": "client_contract",
                  "window": { "kind": "offset", "dx": [10, 12], "dy": [20, 22] } }
            ]
        }"#;
        let layout = crate::layout::parse_layout_str(json).unwrap();
        let on_two = tok(2, "C-77", 111.0, 479.0, 130.0, 487.0);
        let on_one = tok(1, "C-77", 111.0, 479.0, 130.0, 487.0);
        assert_eq!(classify(&on_two, &ANCHOR, &layout), Some(Field::ClientContract));
        assert_eq!(classify(&on_one, &ANCHOR, &layout), None);
    }
}
