//! Forwarding of a child's stdout/stderr into the log while it runs.

use std::any::Any;
use std::io::{BufRead, BufReader, Read};

use strum::Display;

#[derive(Clone, Copy, Debug, Display)]
#[strum(serialize_all = "lowercase")]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

/// Text of a reader thread's panic payload.
pub(super) fn panic_message(err: &(dyn Any + Send)) -> &str {
    if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else if let Some(s) = err.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

/// Logs every line `tool` writes to `pipe` until EOF.
///
/// knife reports server creation and bootstrap progress on stdout (INFO);
/// stderr goes to WARN. A read error ends forwarding but not the command,
/// whose exit status alone decides success.
pub(super) fn read_pipe_to_log<R: Read>(tool: &str, pipe: Option<R>, stream: StreamType) {
    let Some(pipe) = pipe else {
        tracing::error!(tool = tool, %stream, "no pipe attached, output will not be logged");
        return;
    };

    for line in BufReader::new(pipe).split(b'\n') {
        match line {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let text = text.trim_end_matches('\r');
                match stream {
                    StreamType::Stdout => tracing::info!(tool = tool, "{}", text),
                    StreamType::Stderr => tracing::warn!(tool = tool, "{}", text),
                }
            }
            Err(e) => {
                tracing::error!(tool = tool, %stream, "read failed, no further output: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*boxed), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*boxed), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }

    #[test]
    fn test_stream_type_display() {
        assert_eq!(StreamType::Stdout.to_string(), "stdout");
        assert_eq!(StreamType::Stderr.to_string(), "stderr");
    }

    #[test]
    fn test_read_pipe_to_log_consumes_input() {
        let input: &[u8] = b"Creating server web01\r\nBootstrapping\n\xff tail";
        read_pipe_to_log("knife", Some(input), StreamType::Stdout);
        read_pipe_to_log::<&[u8]>("knife", None, StreamType::Stderr);
    }
}
