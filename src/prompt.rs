use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use crate::error::Result;

/// The only answer that lets a destructive operation go on.
pub const AFFIRMATIVE: &str = "y";

/// Asks the user whether a destructive operation may continue.
pub trait Confirmation: Send {
    fn confirm(&mut self, warning: &str) -> Result<bool>;
}

/// Confirmation read from a line of console input.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R, W> Confirmation for ConsolePrompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    /// Anything other than `y` (surrounding whitespace ignored) declines,
    /// including end of input.
    fn confirm(&mut self, warning: &str) -> Result<bool> {
        write!(
            self.output,
            "WARNING: {warning}\nDo you really want to continue?\n(anything other than '{AFFIRMATIVE}' will cancel) > "
        )?;
        self.output.flush()?;

        let mut input = String::new();
        self.input.read_line(&mut input)?;
        Ok(input.trim() == AFFIRMATIVE)
    }
}
