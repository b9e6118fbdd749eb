//! A1-style cell addresses and rectangular ranges

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address such as `B7` or `$B$7`.
///
/// `row` and `col` are 0-based. The `$` anchors are carried along so an
/// address prints back the way it was written; use
/// [`CellAddress::unanchored`] when two spellings of one cell must compare
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
    pub row_absolute: bool,
    pub col_absolute: bool,
}

/// Split a leading `$` off `s`
fn take_anchor(s: &str) -> (bool, &str) {
    match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

/// `A` -> 0, `Z` -> 25, `AA` -> 26; at most three letters, up to `XFD`
fn column_index(letters: &str) -> Result<u16> {
    if letters.is_empty() || letters.len() > 3 {
        return Err(Error::InvalidAddress(format!(
            "bad column letters '{}'",
            letters
        )));
    }
    let mut number = 0u32;
    for b in letters.bytes() {
        number = number * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1;
    }
    let index = number - 1;
    if index >= u32::from(MAX_COLS) {
        return Err(Error::ColumnOutOfBounds(index as u16, MAX_COLS - 1));
    }
    Ok(index as u16)
}

/// 0 -> `A`, 26 -> `AA`, 16383 -> `XFD`
fn column_name(col: u16) -> String {
    let mut letters = Vec::with_capacity(3);
    let mut n = u32::from(col) + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

impl CellAddress {
    /// A relative address at 0-based `row`/`col`
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Parse `A1`, `$A1`, `A$1` or `$A$1`. Column letters are
    /// case-insensitive.
    ///
    /// ```
    /// use sheet_lineage_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$C$12").unwrap();
    /// assert_eq!((addr.row, addr.col), (11, 2));
    /// assert!(addr.row_absolute && addr.col_absolute);
    /// assert_eq!(addr.to_string(), "$C$12");
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        let invalid = |why: &str| Error::InvalidAddress(format!("{} in '{}'", why, text));

        let (col_absolute, rest) = take_anchor(text);
        let split = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (letters, rest) = rest.split_at(split);
        if letters.is_empty() {
            return Err(invalid("no column letters"));
        }
        let col = column_index(letters)?;

        let (row_absolute, digits) = take_anchor(rest);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("no row number"));
        }
        let row: u32 = digits.parse().map_err(|_| invalid("row number too large"))?;
        if row == 0 {
            return Err(invalid("row 0"));
        }
        if row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row - 1, MAX_ROWS - 1));
        }

        Ok(Self {
            row: row - 1,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// 1-based row number, as `ROW()` reports it
    pub fn row_number(&self) -> u32 {
        self.row + 1
    }

    /// 1-based column number, as `COLUMN()` reports it
    pub fn column_number(&self) -> u32 {
        u32::from(self.col) + 1
    }

    /// The same cell with both `$` anchors dropped
    pub fn unanchored(&self) -> Self {
        Self::new(self.row, self.col)
    }

    /// Shift by whole rows and columns, keeping the anchors. `None` if the
    /// result is off the sheet.
    pub fn offset(&self, rows: i64, cols: i64) -> Option<Self> {
        let row = u32::try_from(i64::from(self.row) + rows).ok()?;
        let col = u16::try_from(i64::from(self.col) + cols).ok()?;
        if row >= MAX_ROWS || col >= MAX_COLS {
            return None;
        }
        Some(Self { row, col, ..*self })
    }

    /// `$B$7` style text
    pub fn to_a1_string(&self) -> String {
        let anchor = |on: bool| if on { "$" } else { "" };
        format!(
            "{}{}{}{}",
            anchor(self.col_absolute),
            column_name(self.col),
            anchor(self.row_absolute),
            self.row_number()
        )
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CellAddress {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A rectangle of cells, `start` top-left and `end` bottom-right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Build a range from two corners in any order. Each corner keeps its
    /// own anchors.
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress {
                row: a.row.min(b.row),
                col: a.col.min(b.col),
                ..a
            },
            end: CellAddress {
                row: a.row.max(b.row),
                col: a.col.max(b.col),
                ..b
            },
        }
    }

    /// Parse `A1:C3`; a lone address is a one-cell range
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().split_once(':') {
            Some((a, b)) => Ok(Self::new(CellAddress::parse(a)?, CellAddress::parse(b)?)),
            None => {
                let addr = CellAddress::parse(s)?;
                Ok(Self::new(addr, addr))
            }
        }
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    pub fn cell_count(&self) -> u64 {
        u64::from(self.row_count()) * u64::from(self.col_count())
    }

    /// Rows of the range, top to bottom; each row yields its cells left to
    /// right as relative addresses
    pub fn rows(&self) -> impl Iterator<Item = impl Iterator<Item = CellAddress>> {
        let cols = self.start.col..=self.end.col;
        let rows = self.start.row..=self.end.row;
        rows.map(move |row| cols.clone().map(move |col| CellAddress::new(row, col)))
    }

    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start, self.end)
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}
