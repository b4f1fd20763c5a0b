use thiserror::Error;

use crate::codec::{Cell, DecodeError, EMPTY, ParseError};

/// A fixed-size grid of encoded instructions with a wrapping cursor.
///
/// Cells are stored column-major: program text fills the first column top to
/// bottom, then the next. The cursor walks the same order, so sequential
/// execution runs down each column before moving right.
///
/// `advance` never skips empty cells; what actually executes is decided by
/// the machine's seek. `jump` does skip, landing on a programmed cell:
/// a relative jump means "the next real instruction near here".
#[derive(Debug, Clone)]
pub struct ProgramGrid {
    cells: Vec<u8>,
    width: usize,
    height: usize,
    cursor: usize,
}

/// A program line that failed to parse, with its grid coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column {column}, row {row}: {source}: `{line}`")]
pub struct LoadError {
    pub column: usize,
    pub row: usize,
    pub line: String,
    pub source: ParseError,
}

impl ProgramGrid {
    /// A grid of `width * height` empty cells, cursor at 0.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![EMPTY; width * height],
            width,
            height,
            cursor: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Blank every cell, then refill column-major from program text, one
    /// line per cell. Missing lines leave their cells empty; lines beyond
    /// the grid capacity are ignored. The first bad line aborts the load,
    /// leaving the grid partially filled; callers must not run it.
    pub fn load_from_text(&mut self, text: &str) -> Result<(), LoadError> {
        self.cells.fill(EMPTY);
        for (i, line) in text.lines().take(self.size()).enumerate() {
            let cell = Cell::parse(line).map_err(|source| LoadError {
                column: i / self.height,
                row: i % self.height,
                line: line.to_string(),
                source,
            })?;
            self.cells[i] = cell.encode();
        }
        Ok(())
    }

    /// One step forward, wrapping at the end of the grid.
    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.size();
    }

    /// Relative move, wrapping in both directions, then forward past any
    /// empty cells so the cursor lands on a programmed one.
    ///
    /// The forward scan stops after one full revolution; on a grid with no
    /// programmed cells the cursor stays where the offset landed.
    pub fn jump(&mut self, offset: i32) {
        let size = self.size() as i32;
        self.cursor = (self.cursor as i32 + offset).rem_euclid(size) as usize;
        for _ in 0..self.size() {
            if self.cells[self.cursor] != EMPTY {
                break;
            }
            self.advance();
        }
    }

    /// Set the cursor directly. No empty-cell skip.
    pub fn move_to(&mut self, position: usize) {
        self.cursor = position % self.size();
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Decoded cell under the cursor.
    pub fn current(&self) -> Result<Cell, DecodeError> {
        Cell::decode(self.cells[self.cursor])
    }

    /// Whether the cell under the cursor is unprogrammed.
    pub fn is_current_empty(&self) -> bool {
        self.cells[self.cursor] == EMPTY
    }

    /// Decoded cell at an arbitrary index, for renderers.
    pub fn cell_at(&self, index: usize) -> Result<Cell, DecodeError> {
        Cell::decode(self.cells[index % self.size()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Conditional, Instruction, Op};

    fn instr(conditional: Conditional, op: Op) -> Cell {
        Cell::Instr(Instruction { conditional, op })
    }

    #[test]
    fn new_grid_is_empty() {
        let grid = ProgramGrid::new(8, 8);
        assert_eq!(grid.size(), 64);
        assert_eq!(grid.cursor(), 0);
        for i in 0..64 {
            assert_eq!(grid.cell_at(i), Ok(Cell::Empty));
        }
    }

    #[test]
    fn load_fills_column_major() {
        let mut grid = ProgramGrid::new(8, 8);
        // Nine lines: the first eight fill column 0, the ninth starts column 1.
        let text = "I MVR\n\n\n\n\n\n\nO HLT\nI SWP";
        grid.load_from_text(text).expect("valid program");
        assert_eq!(grid.cell_at(0), Ok(instr(Conditional::Input, Op::MoveRight)));
        assert_eq!(grid.cell_at(7), Ok(instr(Conditional::Output, Op::Halt)));
        assert_eq!(grid.cell_at(8), Ok(instr(Conditional::Input, Op::Swap)));
        assert_eq!(grid.cell_at(1), Ok(Cell::Empty));
    }

    #[test]
    fn load_error_reports_grid_coordinates() {
        let mut grid = ProgramGrid::new(8, 8);
        // Line index 10 = column 1, row 2.
        let mut lines = vec![""; 10];
        lines.push("I BOGUS");
        let err = grid.load_from_text(&lines.join("\n")).unwrap_err();
        assert_eq!(err.column, 1);
        assert_eq!(err.row, 2);
        assert_eq!(err.line, "I BOGUS");
    }

    #[test]
    fn load_replaces_previous_program() {
        let mut grid = ProgramGrid::new(8, 8);
        grid.load_from_text("I MVR\nI MVL").expect("valid program");
        grid.load_from_text("O SWP").expect("valid program");
        assert_eq!(grid.cell_at(0), Ok(instr(Conditional::Output, Op::Swap)));
        assert_eq!(grid.cell_at(1), Ok(Cell::Empty));
    }

    #[test]
    fn load_ignores_lines_beyond_capacity() {
        let mut grid = ProgramGrid::new(2, 2);
        let text = "I MVR\nI MVL\nO MVR\nO MVL\nthis line is dropped";
        grid.load_from_text(text).expect("extra lines are ignored");
        assert_eq!(grid.cell_at(3), Ok(instr(Conditional::Output, Op::MoveLeft)));
    }

    #[test]
    fn advance_wraps() {
        let mut grid = ProgramGrid::new(8, 8);
        grid.move_to(63);
        grid.advance();
        assert_eq!(grid.cursor(), 0);
    }

    #[test]
    fn advance_does_not_skip_empty_cells() {
        let mut grid = ProgramGrid::new(8, 8);
        grid.load_from_text("I MVR").expect("valid program");
        grid.advance();
        assert!(grid.is_current_empty());
        assert_eq!(grid.cursor(), 1);
    }

    #[test]
    fn jump_normalizes_negative_offsets() {
        let mut grid = ProgramGrid::new(8, 8);
        grid.load_from_text("I MVR").expect("valid program");
        grid.move_to(6);
        // -7 from 6 is -1, which wraps to 63; 63 is empty so the skip scans
        // forward and wraps to the programmed cell at 0.
        grid.jump(-7);
        assert_eq!(grid.cursor(), 0);
    }

    #[test]
    fn jump_skips_forward_past_empty_cells() {
        let mut grid = ProgramGrid::new(8, 8);
        grid.load_from_text("I MVR\n\nI MVL").expect("valid program");
        grid.jump(1);
        assert_eq!(grid.cursor(), 2);
    }

    #[test]
    fn jump_lands_directly_on_programmed_cell() {
        let mut grid = ProgramGrid::new(8, 8);
        grid.load_from_text("I MVR\nI MVL").expect("valid program");
        grid.jump(1);
        assert_eq!(grid.cursor(), 1);
    }

    #[test]
    fn jump_on_empty_grid_stays_put() {
        let mut grid = ProgramGrid::new(8, 8);
        grid.jump(5);
        assert_eq!(grid.cursor(), 5);
    }

    #[test]
    fn move_to_does_not_skip() {
        let mut grid = ProgramGrid::new(8, 8);
        grid.load_from_text("I MVR").expect("valid program");
        grid.move_to(3);
        assert_eq!(grid.cursor(), 3);
        assert!(grid.is_current_empty());
    }

    #[test]
    fn reset_returns_cursor_to_origin() {
        let mut grid = ProgramGrid::new(8, 8);
        grid.move_to(17);
        grid.reset();
        assert_eq!(grid.cursor(), 0);
    }
}
