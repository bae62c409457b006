//! Console adapter for development/testing

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::application::messaging::{CommandDispatcher, Reply};

/// Line-oriented request surface over any reader/writer pair
pub struct ConsoleAdapter {
    prompt: String,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            prompt: "> ".to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Serves stdin/stdout until `/quit` or end of input.
    pub async fn run_stdio(&self, dispatcher: &CommandDispatcher) -> std::io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run(dispatcher, stdin, stdout).await
    }

    pub async fn run<R, W>(&self, dispatcher: &CommandDispatcher, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("Starting console session (dev mode)");
        let mut lines = input.lines();

        loop {
            output.write_all(self.prompt.as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match dispatcher.process_line(&line).await {
                Reply::Text(text) => {
                    output.write_all(text.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                }
                Reply::Quit => break,
            }
        }

        output.flush().await?;
        tracing::info!("Console session closed");
        Ok(())
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}
