use crate::error::CtrError;
use crate::extraction::TokenSource;
use crate::model::Token;
use std::path::Path;

/// Token source for pre-extracted tokens stored as a JSON array.
///
/// Each element is `{ "sheet", "text", "x1", "y1", "x2", "y2" }`; missing
/// fields default to 0 or the empty string.
pub struct JsonTokenSource;

impl TokenSource for JsonTokenSource {
    fn extract_tokens(&self, document: &[u8]) -> Result<Vec<Token>, CtrError> {
        parse_tokens(document)
    }

    fn backend_name(&self) -> &str {
        "json"
    }
}

pub fn parse_tokens(bytes: &[u8]) -> Result<Vec<Token>, CtrError> {
    let tokens: Vec<Token> = serde_json::from_slice(bytes)?;
    Ok(tokens)
}

/// Load a token file written by `ctrinvoice extract`.
pub fn load_tokens(path: &Path) -> Result<Vec<Token>, CtrError> {
    if !path.exists() {
        return Err(CtrError::SourceNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    parse_tokens(&bytes)
}

/// Write tokens as pretty-printed JSON.
pub fn save_tokens(path: &Path, tokens: &[Token]) -> Result<(), CtrError> {
    let json = serde_json::to_string_pretty(tokens)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    #[test]
    fn test_parse_tokens_with_defaults() {
        let json = br#"[
            { "sheet": 1, "text": "OH", "x1": 150, "y1": 500, "x2": 170, "y2": 510 },
            { "x1": 3.5 }
        ]"#;
        let tokens = JsonTokenSource.extract_tokens(json).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].bbox, BBox::new(150.0, 500.0, 170.0, 510.0));
        assert_eq!(tokens[1].sheet, 0);
        assert_eq!(tokens[1].text, "");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let tokens = vec![Token::new(2, "KY", BBox::new(1.0, 2.0, 3.0, 4.0))];
        save_tokens(&path, &tokens).unwrap();
        assert_eq!(load_tokens(&path).unwrap(), tokens);
    }

    #[test]
    fn test_missing_file_is_source_not_found() {
        let err = load_tokens(Path::new("/nonexistent/tokens.json")).unwrap_err();
        assert!(err.is_source_missing());
    }

    #[test]
    fn test_malformed_json() {
        assert!(parse_tokens(b"{ not json").is_err());
    }
}
