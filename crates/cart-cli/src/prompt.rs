//! Terminal confirmation for mixed carts

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use cart_checkout::{Confirmation, MixedCartPrompt};

/// Asks on stdout and reads a y/N answer from stdin
pub struct StdinConfirmation;

#[async_trait]
impl Confirmation for StdinConfirmation {
    async fn confirm(&self, prompt: &MixedCartPrompt) -> bool {
        let mut stdout = tokio::io::stdout();
        let question = format!("{}\nProceed? [y/N] ", prompt.message());
        if stdout.write_all(question.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            return false;
        }

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(_) => is_yes(&line),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read answer");
                false
            }
        }
    }
}

/// Anything but an explicit yes declines
fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
