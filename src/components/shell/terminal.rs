use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin,
    Stdout,
};

/// Line-oriented console used by every screen
pub struct Terminal<R, W> {
    input: Lines<R>,
    output: W,
}

impl Terminal<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: input.lines(),
            output,
        }
    }

    /// Show `label` and read one trimmed line; `None` once input is closed
    pub async fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        self.output.write_all(label.as_bytes()).await?;
        self.output.flush().await?;

        let line = self.input.next_line().await?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    pub async fn print(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}
