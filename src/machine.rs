use thiserror::Error;
use tracing::{debug, trace};

use crate::codec::{Cell, Conditional, DecodeError, Instruction, Op};
use crate::grid::{LoadError, ProgramGrid};
use crate::puzzle::Puzzle;
use crate::tape::DataTape;

/// Program grid dimensions.
pub const GRID_WIDTH: usize = 8;
pub const GRID_HEIGHT: usize = 8;

/// Whether the machine is being programmed or stepped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Editing,
    Running,
}

/// Outcome of one successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// An instruction ran; the cursor rests on the next runnable one.
    Continued,
    /// `HLT` ran; `passed` is the output-vs-reference comparison.
    Halted { passed: bool },
}

/// A step that could not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StepError {
    /// The program has no non-empty cell tagged for the selected tape, so
    /// the seek would scan forever; surfaced after one full sweep instead.
    #[error("no executable {0} instruction in the program")]
    NoExecutableInstruction(Conditional),
    /// A grid byte failed to decode. The codec is the only writer of grid
    /// bytes, so this means corruption, not a user error.
    #[error(transparent)]
    Corrupt(#[from] DecodeError),
}

/// The micro-machine: an 8x8 program grid, an input tape, an output tape,
/// and a read-only reference tape the output is judged against at halt.
///
/// The machine is synchronous and single-threaded. Callers drive it by
/// invoking [`Machine::step`] at whatever cadence they like: a timer, a
/// zero-delay loop, a single-step key. One call applies exactly one
/// instruction; there are no partial effects to observe between calls, and
/// the machine never blocks or performs I/O.
pub struct Machine {
    program: ProgramGrid,
    input: DataTape,
    output: DataTape,
    reference: DataTape,
    conditional: Conditional,
    mode: Mode,
    puzzle: Puzzle,
}

impl Machine {
    /// A machine set up for `puzzle`, in editing mode with a blank program.
    pub fn new(puzzle: Puzzle) -> Self {
        let mut machine = Self {
            program: ProgramGrid::new(GRID_WIDTH, GRID_HEIGHT),
            input: DataTape::new(),
            output: DataTape::new(),
            reference: DataTape::new(),
            conditional: Conditional::Input,
            mode: Mode::Editing,
            puzzle,
        };
        machine.load_puzzle_tapes();
        machine
    }

    /// Swap in a different puzzle: input and reference values are
    /// re-initialized, the output cleared, the program blanked, and the
    /// machine returns to editing mode.
    pub fn load_puzzle(&mut self, puzzle: Puzzle) {
        self.puzzle = puzzle;
        self.program = ProgramGrid::new(GRID_WIDTH, GRID_HEIGHT);
        self.load_puzzle_tapes();
        self.begin_editing();
    }

    fn load_puzzle_tapes(&mut self) {
        self.input.clear();
        self.input
            .load_hex(self.puzzle.input())
            .expect("puzzle strings are validated at construction");
        self.reference.clear();
        self.reference
            .load_hex(self.puzzle.output())
            .expect("puzzle strings are validated at construction");
        self.output.clear_and_reset();
    }

    /// Return to editing: program and tape heads rewound, output wiped.
    /// Input and reference values are kept.
    pub fn begin_editing(&mut self) {
        debug!("editing");
        self.mode = Mode::Editing;
        self.program.reset();
        self.input.reset();
        self.reference.reset();
        self.output.clear_and_reset();
    }

    /// Parse `program_text` into the grid and start running it.
    ///
    /// On a parse error the machine stays in editing mode and no tape is
    /// touched. On success the input tape is re-initialized from the
    /// puzzle, the output wiped, all heads rewound, and the input tape
    /// selected.
    pub fn begin_running(&mut self, program_text: &str) -> Result<(), LoadError> {
        self.program.load_from_text(program_text)?;
        debug!("running");
        self.mode = Mode::Running;
        self.conditional = Conditional::Input;
        self.input.clear();
        self.input
            .load_hex(self.puzzle.input())
            .expect("puzzle strings are validated at construction");
        self.program.reset();
        self.output.clear_and_reset();
        self.reference.reset();
        Ok(())
    }

    /// Run one instruction and leave the cursor on the next runnable one.
    pub fn step(&mut self) -> Result<StepResult, StepError> {
        let instr = self.seek()?;
        trace!(cursor = self.program.cursor(), instruction = %instr, "step");

        let (main, other) = match self.conditional {
            Conditional::Input => (&mut self.input, &mut self.output),
            Conditional::Output => (&mut self.output, &mut self.input),
        };

        let mut advance = true;
        match instr.op {
            Op::Halt => {
                let passed = self.reference.contents_equal(&self.output);
                self.reference.move_to(self.output.cursor());
                debug!(passed, "halt");
                return Ok(StepResult::Halted { passed });
            }
            Op::MoveRight => main.shift(1),
            Op::MoveLeft => main.shift(-1),
            Op::Swap => self.conditional = self.conditional.flipped(),
            Op::SetOnEqual(v) => {
                if main.current() == v {
                    self.conditional = self.conditional.flipped();
                }
            }
            Op::Add => main.set_current(main.current().wrapping_add(other.current())),
            Op::Subtract => main.set_current(main.current().wrapping_sub(other.current())),
            Op::Jump(v) => {
                self.program.jump(signed_offset(v));
                advance = false;
            }
        }

        // The reference head shadows the output head so the halt comparison
        // lines up position-wise.
        self.reference.move_to(self.output.cursor());

        if advance {
            self.program.advance();
            self.seek()?;
        }
        Ok(StepResult::Continued)
    }

    /// Advance the cursor until it rests on a non-empty instruction tagged
    /// for the selected tape, and return that instruction.
    ///
    /// Stops after scanning the whole grid once: a program with nothing for
    /// the selected tape would otherwise spin forever.
    fn seek(&mut self) -> Result<Instruction, StepError> {
        for _ in 0..self.program.size() {
            if let Cell::Instr(instr) = self.program.current()? {
                if instr.conditional == self.conditional {
                    return Ok(instr);
                }
            }
            self.program.advance();
        }
        Err(StepError::NoExecutableInstruction(self.conditional))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The currently selected tape.
    pub fn conditional(&self) -> Conditional {
        self.conditional
    }

    pub fn puzzle(&self) -> &Puzzle {
        &self.puzzle
    }

    pub fn program(&self) -> &ProgramGrid {
        &self.program
    }

    pub fn input(&self) -> &DataTape {
        &self.input
    }

    pub fn output(&self) -> &DataTape {
        &self.output
    }

    pub fn reference(&self) -> &DataTape {
        &self.reference
    }
}

/// Sign-extend a 4-bit jump operand into [-8, 7].
fn signed_offset(value: u8) -> i32 {
    let v = i32::from(value & 0x0F);
    if v & 0x08 != 0 { v - 16 } else { v }
}
