//! Dedicated OS-thread stdin reader.
//!
//! Blocking line reads cannot live inside a tokio task, so
//! [`CommandReader`] owns a thread that parses each line and forwards
//! recognised commands.  The thread ends on EOF, on
//! [`ConsoleCommand::Quit`], or when the receiving side is dropped.

use std::io::BufRead;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use super::{parse_command, ConsoleCommand, HELP};

/// Handle to a running reader thread.  The thread is detached when the
/// handle drops; a blocked `read_line` cannot be interrupted.
pub struct CommandReader {
    _thread: JoinHandle<()>,
}

impl CommandReader {
    /// Spawn the reader thread over `input`.
    ///
    /// Unrecognised lines are answered with the help text on stderr.  EOF is
    /// forwarded as [`ConsoleCommand::Quit`] so the app exits when stdin
    /// closes.
    pub fn start<R>(input: R, tx: mpsc::Sender<ConsoleCommand>) -> std::io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let thread = std::thread::Builder::new()
            .name("console-input".into())
            .spawn(move || {
                for line in input.lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            log::warn!("console: failed to read input: {e}");
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let Some(command) = parse_command(&line) else {
                        eprintln!("unknown command `{}`; {HELP}", line.trim());
                        continue;
                    };
                    if tx.blocking_send(command).is_err() || command == ConsoleCommand::Quit {
                        return;
                    }
                }
                let _ = tx.blocking_send(ConsoleCommand::Quit);
            })?;

        Ok(Self { _thread: thread })
    }
}
