use std::io::BufRead;

use tokio::task::JoinHandle;

use super::{CaptureWidget, WidgetCallbacks, WidgetConfig, WidgetHandle};

/// Capture hand-off for terminal sessions.
///
/// Document and selfie capture happen in the provider's hosted flow; this
/// widget prints the session details and waits for the operator to confirm
/// on stdin. Must be mounted from within a tokio runtime.
///
/// The reply is read through the process-wide std stdin handle, the same
/// buffer the CLI prompts use, so piped input is consumed one line at a time.
pub struct TerminalWidget;

impl CaptureWidget for TerminalWidget {
    fn init(
        &self,
        config: WidgetConfig,
        callbacks: WidgetCallbacks,
    ) -> anyhow::Result<Box<dyn WidgetHandle>> {
        println!("\n--- Verify your identity ---");
        println!("Workflow run:  {}", config.workflow_run_id);
        println!("Session token: {}", config.token);
        println!("Complete document and selfie capture with this session,");
        println!("then press Enter. Type 'cancel' to abort.");

        let task = tokio::task::spawn_blocking(move || {
            match read_reply(&mut std::io::stdin().lock()) {
                Ok(Reply::Done) => callbacks.on_complete(),
                Ok(Reply::Cancel) => callbacks.on_error("Capture cancelled by user"),
                Err(message) => callbacks.on_error(message),
            }
        });

        Ok(Box::new(TerminalHandle { task: Some(task) }))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Done,
    Cancel,
}

/// Read exactly one line of `input`; anything after it is left for the next
/// reader of the same handle.
fn read_reply(input: &mut impl BufRead) -> Result<Reply, String> {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => Err("Input closed before capture finished".to_string()),
        Ok(_) => Ok(parse_reply(&line)),
        Err(e) => Err(format!("Could not read input: {e}")),
    }
}

fn parse_reply(line: &str) -> Reply {
    match line.trim().to_ascii_lowercase().as_str() {
        "cancel" | "q" | "quit" | "abort" => Reply::Cancel,
        _ => Reply::Done,
    }
}

struct TerminalHandle {
    task: Option<JoinHandle<()>>,
}

impl WidgetHandle for TerminalHandle {
    fn tear_down(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply() {
        assert_eq!(parse_reply(""), Reply::Done);
        assert_eq!(parse_reply("done"), Reply::Done);
        assert_eq!(parse_reply(" Cancel "), Reply::Cancel);
        assert_eq!(parse_reply("q"), Reply::Cancel);
    }

    #[test]
    fn test_read_reply_leaves_later_lines() {
        let mut input = std::io::Cursor::new("\ny\n");
        assert_eq!(read_reply(&mut input), Ok(Reply::Done));

        let mut next = String::new();
        input.read_line(&mut next).unwrap();
        assert_eq!(next, "y\n");

        assert_eq!(
            read_reply(&mut input),
            Err("Input closed before capture finished".to_string())
        );
    }

    #[tokio::test]
    async fn test_tear_down_twice() {
        let mut handle = TerminalHandle {
            task: Some(tokio::spawn(std::future::pending::<()>())),
        };
        handle.tear_down();
        handle.tear_down();
        assert!(handle.task.is_none());
    }
}
