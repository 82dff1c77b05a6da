use crate::error::CtrError;
use crate::extraction::TokenSource;
use crate::model::{BBox, Token};
use std::io::Write;
use std::process::Command;

/// Token source backed by `pdftotext -bbox` (from poppler-utils).
///
/// pdftotext reports word boxes with a top-left origin; tokens are converted
/// to a bottom-left origin using the page height, so the top-most word on a
/// page has the largest `y1`.
pub struct PdftotextSource;

impl PdftotextSource {
    pub fn new() -> Self {
        PdftotextSource
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource for PdftotextSource {
    fn extract_tokens(&self, pdf_bytes: &[u8]) -> Result<Vec<Token>, CtrError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| CtrError::Extraction(e.to_string()))?;
        tmpfile
            .write_all(pdf_bytes)
            .map_err(|e| CtrError::Extraction(e.to_string()))?;

        let output = Command::new("pdftotext")
            .arg("-bbox")
            .arg(tmpfile.path())
            .arg("-") // output to stdout
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CtrError::PdftotextNotFound
                } else {
                    CtrError::Extraction(format!("pdftotext -bbox failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(CtrError::PdftotextFailed { code, stderr });
        }

        let xml = String::from_utf8_lossy(&output.stdout);
        let tokens = parse_bbox_xml(&xml);
        tracing::debug!("pdftotext extracted {} word tokens", tokens.len());
        Ok(tokens)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

/// Parse `pdftotext -bbox` output into tokens, numbering pages from 1.
fn parse_bbox_xml(xml: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut sheet: u32 = 0;
    let mut page_height: f64 = 0.0;

    for raw in xml.lines() {
        let line = raw.trim();

        if line.starts_with("<page ") || line == "<page>" {
            sheet += 1;
            page_height = parse_attr_f64(line, "height").unwrap_or(0.0);
            continue;
        }

        if line.starts_with("<word ") && sheet > 0 {
            let Some(text) = parse_word_text(line) else {
                continue;
            };
            let text = decode_xml_entities(&text).trim().to_string();
            let (Some(x_min), Some(y_min), Some(x_max), Some(y_max)) = (
                parse_attr_f64(line, "xMin"),
                parse_attr_f64(line, "yMin"),
                parse_attr_f64(line, "xMax"),
                parse_attr_f64(line, "yMax"),
            ) else {
                tracing::debug!("skipping word without a full bounding box: {line}");
                continue;
            };
            out.push(Token {
                sheet,
                text,
                bbox: BBox::new(x_min, page_height - y_max, x_max, page_height - y_min),
            });
        }
    }

    out
}

fn parse_attr_f64(tag: &str, name: &str) -> Option<f64> {
    parse_attr(tag, name)?.parse().ok()
}

fn parse_attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!(" {}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let rest = &tag[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

fn parse_word_text(word_tag: &str) -> Option<String> {
    let start = word_tag.find('>')? + 1;
    let end = word_tag.rfind("</word>")?;
    if end < start {
        return None;
    }
    Some(word_tag[start..end].to_string())
}

fn decode_xml_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title></title>
</head>
<body>
<doc>
  <page width="612.000000" height="792.000000">
    <word xMin="36.000000" yMin="40.000000" xMax="90.000000" yMax="52.000000">Burns</word>
    <word xMin="478.000000" yMin="138.000000" xMax="540.000000" yMax="146.000000">INV&amp;42</word>
  </page>
  <page width="612.000000" height="792.000000">
    <word xMin="50.000000" yMin="60.000000" xMax="70.000000" yMax="70.000000">Page</word>
  </page>
</doc>
</body>
</html>
"#;

    #[test]
    fn test_parse_words_per_page() {
        let tokens = parse_bbox_xml(SAMPLE);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].sheet, 1);
        assert_eq!(tokens[0].text, "Burns");
        assert_eq!(tokens[1].text, "INV&42");
        assert_eq!(tokens[2].sheet, 2);
    }

    #[test]
    fn test_coordinates_flipped_to_bottom_left() {
        let tokens = parse_bbox_xml(SAMPLE);
        assert_eq!(tokens[0].bbox, BBox::new(36.0, 740.0, 90.0, 752.0));
        // Top-most word has the largest y1.
        assert!(tokens[0].bbox.y1 > tokens[1].bbox.y1);
    }

    #[test]
    fn test_word_without_bbox_is_skipped() {
        let xml = r#"<page width="612" height="792">
<word xMin="1" yMin="2" xMax="3">broken</word>
<word xMin="1" yMin="2" xMax="3" yMax="4">ok</word>
</page>"#;
        let tokens = parse_bbox_xml(xml);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "ok");
    }

    #[test]
    fn test_parse_attr_does_not_match_suffix() {
        let tag = r#"<word xMin="1" yMin="2" xMax="3" yMax="4">w</word>"#;
        assert_eq!(parse_attr(tag, "Min"), None);
        assert_eq!(parse_attr(tag, "yMin"), Some("2"));
    }
}
