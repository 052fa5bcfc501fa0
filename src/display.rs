//! Helpers for the presentation layer.
//!
//! The front end itself is not part of this crate. These helpers cover the
//! parts of it that have fixed rules:
//!
//! - [`BitGrid`] lays bits out on the 20 × 32 grid (`row = i / 32`, `col = i % 32`)
//! - [`format_words`] renders the word projection as comma separated decimals
//! - [`parse_host`], [`parse_field`], [`parse_address`] and [`parse_length`] validate text
//!   fields before anything reaches the session
//!
//! # Example
//!
//! ```
//! use s7_bitview::display::{format_words, BitGrid, Cell};
//! use s7_bitview::codec::{to_bits, to_words};
//!
//! let data = [0x01, 0x02, 0x03];
//! assert_eq!(format_words(&to_words(&data)), "258, 3");
//!
//! let grid = BitGrid::from_bits(&to_bits(&data));
//! assert_eq!(grid.cell(0, 7), Some(Cell::On));
//! assert_eq!(grid.cell(0, 24), Some(Cell::Unused));
//! ```

use crate::error::{Result, ViewerError};

/// Rows of the bit grid.
pub const GRID_ROWS: usize = 20;

/// Columns of the bit grid.
pub const GRID_COLS: usize = 32;

/// State of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    /// Bit is set.
    On,
    /// Bit is clear.
    Off,
    /// No bit was read for this cell.
    #[default]
    Unused,
}

impl Cell {
    /// Character used by the text rendering of a [`BitGrid`].
    pub fn symbol(self) -> char {
        match self {
            Cell::On => '1',
            Cell::Off => '0',
            Cell::Unused => '.',
        }
    }
}

/// A fixed 20 × 32 grid of bit cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitGrid {
    cells: Vec<Cell>,
    used: usize,
}

impl Default for BitGrid {
    fn default() -> Self {
        Self {
            cells: vec![Cell::Unused; GRID_ROWS * GRID_COLS],
            used: 0,
        }
    }
}

impl BitGrid {
    /// Creates a grid with every cell unused.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lays `bits` out row by row. Bits beyond the grid capacity are ignored.
    pub fn from_bits(bits: &[bool]) -> Self {
        let mut grid = Self::new();
        grid.update(bits);
        grid
    }

    /// Replaces the grid contents with `bits`; remaining cells become unused.
    pub fn update(&mut self, bits: &[bool]) {
        self.used = bits.len().min(self.cells.len());
        for (i, cell) in self.cells.iter_mut().enumerate() {
            *cell = match bits.get(i) {
                Some(true) => Cell::On,
                Some(false) => Cell::Off,
                None => Cell::Unused,
            };
        }
    }

    /// Returns the cell at `row`, `col`, or `None` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        if row >= GRID_ROWS || col >= GRID_COLS {
            return None;
        }
        self.cells.get(row * GRID_COLS + col).copied()
    }

    /// Number of cells holding a bit.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Iterates over the rows of the grid.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(GRID_COLS)
    }
}

impl std::fmt::Display for BitGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, row) in self.rows().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            for (col, cell) in row.iter().enumerate() {
                if col > 0 && col % 8 == 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", cell.symbol())?;
            }
        }
        Ok(())
    }
}

/// Formats words as decimal values separated by `", "`.
///
/// # Example
///
/// ```
/// use s7_bitview::display::format_words;
///
/// assert_eq!(format_words(&[258, 3]), "258, 3");
/// assert_eq!(format_words(&[]), "");
/// ```
pub fn format_words(words: &[u16]) -> String {
    words
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validates the host field.
///
/// # Errors
///
/// Returns [`ViewerError::Input`] if the text is blank.
pub fn parse_host(text: &str) -> Result<String> {
    let host = text.trim();
    if host.is_empty() {
        return Err(ViewerError::input("host", "PLC address is empty"));
    }
    Ok(host.to_owned())
}

/// Parses the start address field (a V byte number).
///
/// # Errors
///
/// Returns [`ViewerError::Input`] for text that is not a non-negative integer.
///
/// # Example
///
/// ```
/// use s7_bitview::display::parse_address;
///
/// assert_eq!(parse_address(" 100 ").unwrap(), 100);
/// assert!(parse_address("-1").is_err());
/// assert!(parse_address("V100").is_err());
/// ```
pub fn parse_address(text: &str) -> Result<u32> {
    text.trim()
        .parse::<u32>()
        .map_err(|e| ViewerError::input("address", format!("{:?}: {}", text.trim(), e)))
}

/// Parses an integer text field named `name`.
///
/// # Errors
///
/// Returns [`ViewerError::Input`] naming the field for text that is not an
/// integer.
///
/// # Example
///
/// ```
/// use s7_bitview::display::parse_field;
///
/// assert_eq!(parse_field("length", " 12 ").unwrap(), 12);
/// assert_eq!(
///     parse_field("length", "12b").unwrap_err().to_string(),
///     "invalid length: \"12b\": invalid digit found in string"
/// );
/// ```
pub fn parse_field(name: &str, text: &str) -> Result<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|e| ViewerError::input(name, format!("{:?}: {}", text.trim(), e)))
}

/// Parses the length field.
///
/// Any integer is accepted; the read window clamps it later.
///
/// # Errors
///
/// Returns [`ViewerError::Input`] for text that is not an integer.
pub fn parse_length(text: &str) -> Result<i64> {
    parse_field("length", text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::to_bits;

    #[test]
    fn test_empty_grid_is_unused() {
        let grid = BitGrid::new();
        assert_eq!(grid.used(), 0);
        assert!(grid.rows().flatten().all(|&cell| cell == Cell::Unused));
        assert_eq!(grid.rows().count(), GRID_ROWS);
    }

    #[test]
    fn test_grid_layout_row_major() {
        let bits = to_bits(&[0x00, 0x00, 0x00, 0x00, 0x80]);
        let grid = BitGrid::from_bits(&bits);

        assert_eq!(grid.used(), 40);
        assert_eq!(grid.cell(0, 31), Some(Cell::Off));
        assert_eq!(grid.cell(1, 0), Some(Cell::On));
        assert_eq!(grid.cell(1, 7), Some(Cell::Off));
        assert_eq!(grid.cell(1, 8), Some(Cell::Unused));
        assert_eq!(grid.cell(20, 0), None);
        assert_eq!(grid.cell(0, 32), None);
    }

    #[test]
    fn test_grid_full_and_overflow() {
        let grid = BitGrid::from_bits(&vec![true; 700]);
        assert_eq!(grid.used(), GRID_ROWS * GRID_COLS);
        assert_eq!(grid.cell(19, 31), Some(Cell::On));
    }

    #[test]
    fn test_update_resets_tail() {
        let mut grid = BitGrid::from_bits(&[true; 16]);
        grid.update(&[false; 8]);
        assert_eq!(grid.cell(0, 0), Some(Cell::Off));
        assert_eq!(grid.cell(0, 8), Some(Cell::Unused));
    }

    #[test]
    fn test_grid_text_rendering() {
        let grid = BitGrid::from_bits(&to_bits(&[0xA0]));
        let text = grid.to_string();
        let first = text.lines().next().unwrap();
        assert_eq!(first, "10100000 ........ ........ ........");
        assert_eq!(text.lines().count(), GRID_ROWS);
    }

    #[test]
    fn test_parse_field_names_the_field() {
        assert_eq!(parse_field("start", "-7").unwrap(), -7);
        match parse_field("start", "x") {
            Err(ViewerError::Input { field, .. }) => assert_eq!(field, "start"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_host() {
        assert_eq!(parse_host(" 192.168.1.11 ").unwrap(), "192.168.1.11");
        assert!(matches!(parse_host("   "), Err(ViewerError::Input { .. })));
    }

    #[test]
    fn test_parse_length_accepts_any_integer() {
        assert_eq!(parse_length("0").unwrap(), 0);
        assert_eq!(parse_length("-4").unwrap(), -4);
        assert_eq!(parse_length("1000").unwrap(), 1000);
        let err = parse_length("ten").unwrap_err();
        assert!(err.to_string().starts_with("invalid length"));
    }
}
