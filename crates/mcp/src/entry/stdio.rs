#![forbid(unsafe_code)]

use super::framing::{TransportMode, parse_request, read_content_length_frame};
use crate::{McpServer, SessionLog};
use std::io::{BufRead, BufReader, Write};

/// Serves requests from stdin until EOF. The framing is detected once per process so
/// responses never interleave two framing styles.
pub(crate) fn run_stdio(
    server: &mut McpServer,
    session: &mut SessionLog,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut stdout = std::io::stdout().lock();
    let mut mode: Option<TransportMode> = None;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            session.note_exit("stdin closed");
            break;
        }

        let current = match mode {
            Some(current) => current,
            None => {
                let Some(detected) = TransportMode::detect(&line) else {
                    continue;
                };
                tracing::debug!(mode = detected.as_str(), "transport framing detected");
                session.note_mode(detected.as_str(), &line);
                mode = Some(detected);
                detected
            }
        };

        let body = match current {
            TransportMode::NewlineJson => {
                let raw = line.trim();
                if raw.is_empty() {
                    continue;
                }
                raw.as_bytes().to_vec()
            }
            TransportMode::ContentLength => {
                if line.trim().is_empty() {
                    continue;
                }
                match read_content_length_frame(&mut reader, line) {
                    Ok(Some(body)) => body,
                    Ok(None) => {
                        session.note_exit("stdin closed mid-frame");
                        break;
                    }
                    Err(err) => {
                        session.note_error(&err.to_string());
                        session.note_exit("framing error");
                        return Err(err.into());
                    }
                }
            }
        };

        let resp = match parse_request(&body) {
            Ok(request) => {
                session.note_method(&request.method);
                server.handle(request)
            }
            Err(resp) => {
                session.note_error("malformed request");
                Some(resp)
            }
        };
        if let Some(resp) = resp {
            current.write(&mut stdout, &resp)?;
        }
    }

    stdout.flush()?;
    Ok(())
}
