//! Console stand-ins for the microphone and speakers

use std::io::Write as _;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::pipeline::{Heard, Speaker, UtteranceSource};
use crate::Result;

/// Reads utterances from stdin, one per line
pub struct ConsoleInput {
    lines: Lines<BufReader<Stdin>>,
}

impl ConsoleInput {
    /// Read from the process's stdin
    #[must_use]
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for ConsoleInput {
    fn default() -> Self {
        Self::stdin()
    }
}

#[async_trait(?Send)]
impl UtteranceSource for ConsoleInput {
    async fn listen(&mut self) -> Heard {
        print!("you> ");
        let _ = std::io::stdout().flush();

        match self.lines.next_line().await {
            Ok(Some(line)) => {
                let utterance = line.trim().to_lowercase();
                if utterance.is_empty() {
                    Heard::Nothing
                } else {
                    Heard::Utterance(utterance)
                }
            }
            Ok(None) => Heard::Closed,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                Heard::Closed
            }
        }
    }
}

/// Prints replies instead of speaking them
#[derive(Debug, Default)]
pub struct ConsoleSpeaker;

#[async_trait(?Send)]
impl Speaker for ConsoleSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "assistant> {text}")?;
        stdout.flush()?;
        Ok(())
    }
}
