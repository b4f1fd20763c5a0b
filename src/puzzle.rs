use crate::tape::HexError;

/// One goal for the machine: an input tape, the expected output tape, and a
/// human-readable description.
///
/// Tape strings are hex digits, one cell per character starting at index 0.
/// Construction validates them, so a `Puzzle` always holds loadable tapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    description: String,
    input: String,
    output: String,
}

impl Puzzle {
    pub fn new(
        description: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Result<Self, HexError> {
        let input = input.into();
        let output = output.into();
        for s in [&input, &output] {
            if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
                return Err(HexError(c));
            }
        }
        Ok(Self {
            description: description.into(),
            input,
            output,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}

/// The built-in puzzle set, easiest first.
pub fn builtin() -> Vec<Puzzle> {
    let puzzle = |description: &str, input: &str, output: &str| Puzzle {
        description: description.to_string(),
        input: input.to_string(),
        output: output.to_string(),
    };
    vec![
        puzzle(
            "Copy input to output then halt",
            "123456789ABCDEF",
            "123456789ABCDEF",
        ),
        puzzle(
            "Add each pair of inputs then halt",
            "12345678765432",
            "37BFD95",
        ),
        puzzle(
            "Copy the input to the output reversed",
            "123456789ABCDEF",
            "FEDCBA987654321",
        ),
        puzzle(
            "Add each F-delimited subsequence from input into output",
            "12F1F12345F722F",
            "31FB",
        ),
        puzzle(
            "Read a number and output the next one that number of times",
            "1F23F7663B",
            "F33777777777777777666666BBB",
        ),
    ]
}
