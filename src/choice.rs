//! Interactive selection of one candidate out of a numbered table.
//!
//! [`ChoiceResolver`] is the single "list → render → read → validate →
//! return" loop shared by every resource kind. It is generic over its input
//! and output streams so it can be driven by stdin/stdout in production and
//! by in-memory buffers in tests.

use std::io::{self, BufRead, Write};

use crate::catalog::ResourceKind;
use crate::error::KnifebootError;
use crate::table;

/// Something the operator may pick: display columns plus the value returned
/// when it is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<T> {
    pub columns: Vec<String>,
    pub value: T,
}

impl<T> Candidate<T> {
    pub fn new(columns: Vec<String>, value: T) -> Self {
        Self { columns, value }
    }
}

impl Candidate<String> {
    /// A single-column candidate whose value is its label.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            columns: vec![name.clone()],
            value: name,
        }
    }
}

/// Parses a trimmed selection against `count` candidates, returning a 0-based index.
pub fn parse_selection(input: &str, count: usize) -> Result<usize, KnifebootError> {
    let input = input.trim();
    match input.parse::<usize>() {
        Ok(index) if (1..=count).contains(&index) => Ok(index - 1),
        _ => Err(KnifebootError::InvalidSelection {
            input: input.to_string(),
            count,
        }),
    }
}

/// Prompts the operator to pick from numbered tables.
pub struct ChoiceResolver<R, W> {
    input: R,
    output: W,
    attempts: usize,
}

impl ChoiceResolver<io::StdinLock<'static>, io::Stdout> {
    /// Resolver bound to the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ChoiceResolver<R, W> {
    /// Creates a resolver that asks once and fails on bad input.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            attempts: 1,
        }
    }

    /// Allows up to `attempts` tries per selection (minimum 1).
    #[must_use]
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Gives back the output stream, e.g. to inspect what was rendered.
    pub fn into_output(self) -> W {
        self.output
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.output
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, KnifebootError> {
        write!(self.output, "{}: ", prompt)
            .and_then(|_| self.output.flush())
            .map_err(|e| KnifebootError::io("failed to write prompt", e))?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| KnifebootError::io("failed to read from stdin", e))?;
        Ok((read > 0).then_some(line))
    }

    /// Renders `candidates` as a numbered table and returns the chosen value.
    pub fn resolve<T>(
        &mut self,
        kind: ResourceKind,
        candidates: Vec<Candidate<T>>,
    ) -> Result<T, KnifebootError> {
        if candidates.is_empty() {
            return Err(KnifebootError::NoCandidates(kind));
        }

        let mut headers = vec![""];
        headers.extend_from_slice(kind.headers());
        let rows: Vec<Vec<String>> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut cells = vec![(i + 1).to_string()];
                cells.extend(c.columns.iter().cloned());
                cells
            })
            .collect();
        table::render(&mut self.output, &headers, &rows)
            .map_err(|e| KnifebootError::io("failed to render table", e))?;

        let mut attempt = 0;
        let index = loop {
            attempt += 1;
            let Some(line) = self.read_line(kind.label())? else {
                return Err(KnifebootError::InvalidSelection {
                    input: String::new(),
                    count: candidates.len(),
                });
            };
            match parse_selection(&line, candidates.len()) {
                Ok(index) => break index,
                Err(e) if attempt < self.attempts => {
                    tracing::warn!("{}", e);
                }
                Err(e) => return Err(e),
            }
        };

        tracing::debug!("selected {} #{}", kind, index + 1);
        let mut candidates = candidates;
        Ok(candidates.swap_remove(index).value)
    }

    /// Reads a free-text answer, trimmed. EOF yields an empty string.
    pub fn prompt_text(&mut self, prompt: &str) -> Result<String, KnifebootError> {
        Ok(self
            .read_line(prompt)?
            .map(|line| line.trim().to_string())
            .unwrap_or_default())
    }
}
