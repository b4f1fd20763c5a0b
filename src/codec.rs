use std::fmt;

use thiserror::Error;

/// Byte marking an unprogrammed grid cell.
///
/// All value bits set on a valueless opcode is an encoding no real
/// instruction produces, so the sentinel never collides with one.
pub const EMPTY: u8 = 0x0F;

/// Which of the two data tapes an instruction is tagged for.
///
/// The machine executes only instructions tagged for the currently selected
/// tape; the other tape's instructions are invisible to the seek loop until
/// a `SWP` (or a successful `SEQ`) flips the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conditional {
    Input,
    Output,
}

impl Conditional {
    /// The other tape.
    pub fn flipped(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }

    /// One-letter source form (`I` / `O`).
    pub fn letter(self) -> char {
        match self {
            Self::Input => 'I',
            Self::Output => 'O',
        }
    }
}

impl fmt::Display for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// One operation, carrying its operand where the operation takes one.
///
/// `SEQ` and `JMP` have a 4-bit operand; the other six take none. Keeping
/// the operand inside the variant makes a value on `MVR`, or a missing value
/// on `JMP`, unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Stop; the output tape is judged against the reference tape.
    Halt,
    /// Move the selected tape head right.
    MoveRight,
    /// Move the selected tape head left.
    MoveLeft,
    /// Select the other tape.
    Swap,
    /// Select the other tape if the current cell equals the operand.
    SetOnEqual(u8),
    /// Add the other tape's current cell into this one, mod 16.
    Add,
    /// Subtract the other tape's current cell from this one, mod 16.
    Subtract,
    /// Move the program cursor by a signed 4-bit offset.
    Jump(u8),
}

impl Op {
    /// Opcode number (bits 6-4 of the encoded byte).
    fn code(self) -> u8 {
        match self {
            Self::Halt => 0,
            Self::MoveRight => 1,
            Self::MoveLeft => 2,
            Self::Swap => 3,
            Self::SetOnEqual(_) => 4,
            Self::Add => 5,
            Self::Subtract => 6,
            Self::Jump(_) => 7,
        }
    }

    /// Source mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Halt => "HLT",
            Self::MoveRight => "MVR",
            Self::MoveLeft => "MVL",
            Self::Swap => "SWP",
            Self::SetOnEqual(_) => "SEQ",
            Self::Add => "ADD",
            Self::Subtract => "SUB",
            Self::Jump(_) => "JMP",
        }
    }

    /// The 4-bit operand, for the two operations that carry one.
    pub fn value(self) -> Option<u8> {
        match self {
            Self::SetOnEqual(v) | Self::Jump(v) => Some(v),
            _ => None,
        }
    }
}

/// A single decoded instruction: a tape tag plus an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub conditional: Conditional,
    pub op: Op,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.conditional.letter(), self.op.mnemonic())?;
        if let Some(v) = self.op.value() {
            write!(f, " {v:X}")?;
        }
        Ok(())
    }
}

/// The decoded view of one program-grid byte: a real instruction or an
/// unprogrammed slot.
///
/// The byte layout is `C OOO VVVV`: bit 7 the tape tag, bits 6-4 the opcode
/// number, bits 3-0 the operand. Operations without an operand encode their
/// value bits as zero, which keeps [`EMPTY`] (`0x0F`) out of the space of
/// real instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Instr(Instruction),
}

/// A stored byte that is not a valid instruction encoding.
///
/// The codec is the only writer of grid bytes, so this should be
/// unreachable; it is reported rather than papered over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("byte {0:#04X} is not a valid instruction encoding")]
pub struct DecodeError(pub u8);

/// A program line that does not match `<I|O> <MNEMONIC> [<hexdigit>]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown tape selector `{0}`")]
    UnknownSelector(String),
    #[error("missing mnemonic")]
    MissingMnemonic,
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("{0} takes no value")]
    UnexpectedValue(&'static str),
    #[error("{0} requires a value")]
    MissingValue(&'static str),
    #[error("`{0}` is not a single hex digit")]
    BadValue(String),
    #[error("trailing input `{0}`")]
    Trailing(String),
}

impl Cell {
    /// Decode one grid byte.
    pub fn decode(byte: u8) -> Result<Cell, DecodeError> {
        if byte == EMPTY {
            return Ok(Cell::Empty);
        }
        let conditional = if byte & 0x80 != 0 {
            Conditional::Output
        } else {
            Conditional::Input
        };
        let value = byte & 0x0F;
        let op = match (byte >> 4) & 0x07 {
            0 => Op::Halt,
            1 => Op::MoveRight,
            2 => Op::MoveLeft,
            3 => Op::Swap,
            4 => Op::SetOnEqual(value),
            5 => Op::Add,
            6 => Op::Subtract,
            7 => Op::Jump(value),
            _ => unreachable!(),
        };
        if op.value().is_none() && value != 0 {
            return Err(DecodeError(byte));
        }
        Ok(Cell::Instr(Instruction { conditional, op }))
    }

    /// Inverse of [`Cell::decode`].
    pub fn encode(self) -> u8 {
        match self {
            Cell::Empty => EMPTY,
            Cell::Instr(Instruction { conditional, op }) => {
                let c = match conditional {
                    Conditional::Input => 0x00,
                    Conditional::Output => 0x80,
                };
                c | (op.code() << 4) | op.value().unwrap_or(0)
            }
        }
    }

    /// Parse one source line. Blank lines are empty cells; whitespace runs
    /// are collapsed and everything is case-insensitive.
    pub fn parse(line: &str) -> Result<Cell, ParseError> {
        let mut tokens = line.split_whitespace();
        let Some(selector) = tokens.next() else {
            return Ok(Cell::Empty);
        };
        let conditional = match selector.to_ascii_uppercase().as_str() {
            "I" => Conditional::Input,
            "O" => Conditional::Output,
            _ => return Err(ParseError::UnknownSelector(selector.to_string())),
        };

        let mnemonic = tokens.next().ok_or(ParseError::MissingMnemonic)?;
        let value = tokens.next().map(hex_digit).transpose()?;
        if let Some(extra) = tokens.next() {
            return Err(ParseError::Trailing(extra.to_string()));
        }

        let op = match mnemonic.to_ascii_uppercase().as_str() {
            "HLT" => Op::Halt,
            "MVR" => Op::MoveRight,
            "MVL" => Op::MoveLeft,
            "SWP" => Op::Swap,
            "SEQ" => Op::SetOnEqual(0),
            "ADD" => Op::Add,
            "SUB" => Op::Subtract,
            "JMP" => Op::Jump(0),
            _ => return Err(ParseError::UnknownMnemonic(mnemonic.to_string())),
        };
        let op = match (op, value) {
            (Op::SetOnEqual(_), Some(v)) => Op::SetOnEqual(v),
            (Op::Jump(_), Some(v)) => Op::Jump(v),
            (Op::SetOnEqual(_) | Op::Jump(_), None) => {
                return Err(ParseError::MissingValue(op.mnemonic()));
            }
            (op, None) => op,
            (op, Some(_)) => return Err(ParseError::UnexpectedValue(op.mnemonic())),
        };

        Ok(Cell::Instr(Instruction { conditional, op }))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Instr(instr) => instr.fmt(f),
        }
    }
}

/// Parse a token as exactly one hex digit.
fn hex_digit(token: &str) -> Result<u8, ParseError> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c
            .to_digit(16)
            .map(|d| d as u8)
            .ok_or_else(|| ParseError::BadValue(token.to_string())),
        _ => Err(ParseError::BadValue(token.to_string())),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_instruction() -> impl Strategy<Value = Instruction> {
        (any::<bool>(), 0u8..8, 0u8..16).prop_map(|(output, code, value)| {
            let conditional = if output {
                Conditional::Output
            } else {
                Conditional::Input
            };
            let op = match code {
                0 => Op::Halt,
                1 => Op::MoveRight,
                2 => Op::MoveLeft,
                3 => Op::Swap,
                4 => Op::SetOnEqual(value),
                5 => Op::Add,
                6 => Op::Subtract,
                _ => Op::Jump(value),
            };
            Instruction { conditional, op }
        })
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(instr in arb_instruction()) {
            let cell = Cell::Instr(instr);
            prop_assert_eq!(Cell::decode(cell.encode()), Ok(cell));
        }

        #[test]
        fn format_parse_round_trip(instr in arb_instruction()) {
            let cell = Cell::Instr(instr);
            prop_assert_eq!(Cell::parse(&cell.to_string()), Ok(cell));
        }

        #[test]
        fn decode_is_left_inverse_of_encode(byte in any::<u8>()) {
            if let Ok(cell) = Cell::decode(byte) {
                prop_assert_eq!(cell.encode(), byte);
            }
        }
    }
}
