//! History command: stored sessions and their messages.

use crate::chat::display_history;
use crate::cli::Output;
use crate::config::Settings;
use crate::memory::create_checkpointer;
use anyhow::Result;

/// List stored sessions, or print one session's displayed history.
pub async fn run_history(session: Option<&str>, settings: Settings) -> Result<()> {
    let checkpointer = create_checkpointer(&settings)?;

    let Some(id) = session else {
        let threads = checkpointer.list_threads().await?;
        if threads.is_empty() {
            Output::info("No stored sessions.");
            return Ok(());
        }
        Output::header("Sessions");
        for thread in threads {
            Output::list_item(&format!(
                "{} ({} messages, updated {})",
                thread.thread_id,
                thread.message_count,
                thread.updated_at.format("%Y-%m-%d %H:%M")
            ));
        }
        return Ok(());
    };

    match checkpointer.get(id).await? {
        Some(checkpoint) => {
            Output::header(&format!("Session {}", id));
            for message in display_history(&checkpoint.messages) {
                Output::turn(&message);
            }
            Ok(())
        }
        None => {
            Output::error(&format!("Session not found: {}", id));
            anyhow::bail!("Session not found: {}", id)
        }
    }
}
