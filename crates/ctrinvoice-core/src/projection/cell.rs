use std::fmt;

/// A1-style cell address, 1-based. Orders row-major, the order cells appear
/// in a worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        CellRef { row, col }
    }

    /// Parse an address such as `F4` or `aa12`. Absolute markers (`$F$4`) are accepted.
    pub fn parse(s: &str) -> Option<CellRef> {
        let s = s.trim().replace('$', "");
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        let col = letters
            .chars()
            .fold(0u32, |acc, c| acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1));
        let row: u32 = digits.parse().ok()?;
        if row == 0 || col > 16_384 || row > 1_048_576 {
            return None;
        }
        Some(CellRef { row, col })
    }

    pub fn column_name(&self) -> String {
        let mut n = self.col;
        let mut name = Vec::new();
        while n > 0 {
            let rem = ((n - 1) % 26) as u8;
            name.push((b'A' + rem) as char);
            n = (n - 1) / 26;
        }
        name.iter().rev().collect()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_name(), self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(CellRef::parse("F4"), Some(CellRef::new(4, 6)));
        assert_eq!(CellRef::parse("a1"), Some(CellRef::new(1, 1)));
        assert_eq!(CellRef::parse("$B$4"), Some(CellRef::new(4, 2)));
        assert_eq!(CellRef::parse("AA12"), Some(CellRef::new(12, 27)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "4", "F", "F0", "F-1", "4F", "ABCD1", "F4G"] {
            assert_eq!(CellRef::parse(bad), None, "{bad}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(CellRef::new(4, 1).to_string(), "A4");
        assert_eq!(CellRef::new(9, 26).to_string(), "Z9");
        assert_eq!(CellRef::new(12, 27).to_string(), "AA12");
        assert_eq!(CellRef::new(1, 702).to_string(), "ZZ1");
    }

    #[test]
    fn test_row_major_order() {
        assert!(CellRef::new(4, 6) < CellRef::new(5, 1));
        assert!(CellRef::new(4, 1) < CellRef::new(4, 2));
    }
}
