use crate::classify::anchor::{self, SheetAnchor};
use crate::classify::engine::classify;
use crate::classify::outcome::{FieldHits, PassSummary, SheetSummary};
use crate::error::CtrError;
use crate::layout::schema::LayoutDef;
use crate::store::TagStore;

/// Tag every token in the store against `layout`.
///
/// Tokens are visited sheet by sheet (ascending), top to bottom within a
/// sheet. Anchors are resolved once from the same token set before any tag
/// is written. All tag updates go through a single transaction: an error
/// anywhere leaves the store exactly as it was.
pub fn run_pass(store: &mut TagStore, layout: &LayoutDef) -> Result<PassSummary, CtrError> {
    let tx = store.transaction()?;
    let tokens = tx.tokens_in_pass_order()?;
    let anchors = anchor::resolve(tokens.iter().map(|t| &t.token));

    let mut summary = PassSummary {
        layout_name: layout.name.clone(),
        tokens: tokens.len(),
        ..Default::default()
    };

    let mut current: Option<SheetSummary> = None;
    let mut current_anchor = SheetAnchor::ZERO;
    let mut hits = FieldHits::default();

    for stored in &tokens {
        let sheet = stored.token.sheet;

        if current.as_ref().map_or(true, |s| s.sheet != sheet) {
            if let Some(done) = current.take() {
                close_sheet(&mut summary, done, &hits);
            }
            hits.clear();

            let resolved = anchors.get(sheet);
            if resolved.is_none() {
                tracing::warn!("sheet {sheet} has no anchor, classifying against (0, 0)");
            }
            current_anchor = resolved.unwrap_or(SheetAnchor::ZERO);
            tracing::debug!(
                "sheet {sheet}: anchor min_x={} max_y={}",
                current_anchor.min_x,
                current_anchor.max_y
            );
            current = Some(SheetSummary {
                sheet,
                anchor: resolved,
                ..Default::default()
            });
        }

        if let Some(s) = current.as_mut() {
            s.tokens += 1;
        }

        if let Some(field) = classify(&stored.token, &current_anchor, layout) {
            tx.set_tag(stored.id, field)?;
            hits.record(field, stored.id);
            summary.tagged += 1;
            tracing::debug!(
                "row {} on sheet {sheet}: '{}' -> {field}",
                stored.id,
                stored.token.text
            );
        }
    }

    if let Some(done) = current.take() {
        close_sheet(&mut summary, done, &hits);
    }

    tx.commit()?;

    let found = summary.fields();
    summary.missing_required = layout
        .required
        .iter()
        .filter(|f| !found.contains(f))
        .copied()
        .collect();

    for dup in &summary.duplicates {
        tracing::warn!(
            "field {} tagged {} times on sheet {}; the last one in store order is projected",
            dup.field,
            dup.row_ids.len(),
            dup.sheet
        );
    }
    if !summary.missing_required.is_empty() {
        let names: Vec<&str> = summary.missing_required.iter().map(|f| f.as_str()).collect();
        tracing::warn!("required fields not found: {}", names.join(", "));
    }
    tracing::info!(
        "layout '{}' tagged {} of {} tokens",
        layout.name,
        summary.tagged,
        summary.tokens
    );

    Ok(summary)
}

fn close_sheet(summary: &mut PassSummary, mut sheet: SheetSummary, hits: &FieldHits) {
    sheet.fields = hits.fields();
    summary.duplicates.extend(hits.duplicates(sheet.sheet));
    summary.sheets.push(sheet);
}
