//! Cross-process cursor transport.
//!
//! The helper process (`greendot bridge`) owns the real cursor service and
//! answers one JSON object per line on stdout for every request line it reads
//! on stdin. [`BridgeCursor`] is the caller's side of that pipe and implements
//! [`CursorService`] like any local backend.

use crate::config::EdgePolicy;
use crate::cursor::{CursorService, Position};
use crate::error::{CursorError, GreenDotError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines,
};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeRequest {
    Position,
    MoveTo { x: i32, y: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BridgeResponse {
    Position { x: i32, y: i32 },
    Moved,
    Error { error: CursorError },
    /// The request line could not be understood.
    Rejected { message: String },
}

/// Serve `service` over a line-delimited JSON pipe until `reader` hits EOF.
///
/// A malformed line is answered with `Rejected` and the loop keeps going.
pub async fn serve<S, R, W>(service: &mut S, reader: R, mut writer: W) -> Result<()>
where
    S: CursorService + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<BridgeRequest>(&line) {
            Ok(request) => handle(service, request).await,
            Err(e) => {
                warn!(error = %e, "rejected bridge request");
                BridgeResponse::Rejected {
                    message: e.to_string(),
                }
            }
        };

        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
    }

    debug!("bridge input closed");
    Ok(())
}

async fn handle<S>(service: &mut S, request: BridgeRequest) -> BridgeResponse
where
    S: CursorService + ?Sized,
{
    let outcome = match request {
        BridgeRequest::Position => service
            .position()
            .await
            .map(|p| BridgeResponse::Position { x: p.x, y: p.y }),
        BridgeRequest::MoveTo { x, y } => service
            .move_to(Position::new(x, y))
            .await
            .map(|()| BridgeResponse::Moved),
    };
    outcome.unwrap_or_else(|error| BridgeResponse::Error { error })
}

/// Caller side of the bridge.
pub struct BridgeCursor<W = ChildStdin, R = ChildStdout> {
    writer: W,
    reader: Lines<BufReader<R>>,
    // Held so the helper is killed when the cursor is dropped.
    _child: Option<Child>,
}

impl BridgeCursor {
    /// Start `<current exe> bridge` and talk to it over its stdio.
    pub fn spawn(edge_policy: EdgePolicy) -> Result<Self> {
        let exe = std::env::current_exe()?;
        let edge = match edge_policy {
            EdgePolicy::Clamp => "clamp",
            EdgePolicy::Reject => "reject",
        };

        let mut child = Command::new(&exe)
            .args(["bridge", "--edge", edge])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GreenDotError::bridge(format!("failed to start {}: {e}", exe.display())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GreenDotError::bridge("helper stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GreenDotError::bridge("helper stdout not captured"))?;

        debug!(pid = child.id(), "started cursor bridge helper");
        let mut cursor = Self::from_streams(stdin, stdout);
        cursor._child = Some(child);
        Ok(cursor)
    }
}

impl<W, R> BridgeCursor<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    pub fn from_streams(writer: W, reader: R) -> Self {
        Self {
            writer,
            reader: BufReader::new(reader).lines(),
            _child: None,
        }
    }

    async fn request(
        &mut self,
        request: &BridgeRequest,
    ) -> std::result::Result<BridgeResponse, CursorError> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| CursorError::device_unavailable(format!("bridge encode: {e}")))?;
        line.push('\n');

        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(pipe_closed)?;
        self.writer.flush().await.map_err(pipe_closed)?;

        let reply = self
            .reader
            .next_line()
            .await
            .map_err(pipe_closed)?
            .ok_or_else(|| CursorError::device_unavailable("bridge closed the pipe"))?;

        serde_json::from_str(&reply)
            .map_err(|e| CursorError::device_unavailable(format!("malformed bridge reply: {e}")))
    }
}

fn pipe_closed(e: std::io::Error) -> CursorError {
    CursorError::device_unavailable(format!("bridge pipe: {e}"))
}

fn unexpected(response: BridgeResponse) -> CursorError {
    match response {
        BridgeResponse::Error { error } => error,
        BridgeResponse::Rejected { message } => {
            CursorError::device_unavailable(format!("bridge rejected request: {message}"))
        }
        other => CursorError::device_unavailable(format!("unexpected bridge reply: {other:?}")),
    }
}

#[async_trait(?Send)]
impl<W, R> CursorService for BridgeCursor<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    async fn position(&mut self) -> std::result::Result<Position, CursorError> {
        match self.request(&BridgeRequest::Position).await? {
            BridgeResponse::Position { x, y } => Ok(Position::new(x, y)),
            other => Err(unexpected(other)),
        }
    }

    async fn move_to(&mut self, target: Position) -> std::result::Result<(), CursorError> {
        let request = BridgeRequest::MoveTo {
            x: target.x,
            y: target.y,
        };
        match self.request(&request).await? {
            BridgeResponse::Moved => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::fake::FakeCursor;
    use tokio::io::duplex;

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&BridgeRequest::MoveTo { x: 5, y: 6 }).unwrap();
        assert_eq!(json, r#"{"op":"move_to","x":5,"y":6}"#);

        let reply: BridgeResponse =
            serde_json::from_str(r#"{"status":"error","error":{"device_unavailable":"gone"}}"#)
                .unwrap();
        assert_eq!(
            reply,
            BridgeResponse::Error {
                error: CursorError::device_unavailable("gone")
            }
        );
    }

    #[tokio::test]
    async fn test_serve_rejects_garbage_and_continues() {
        let mut fake = FakeCursor::at(500, 300);
        let input: &[u8] = b"garbage\n\n{\"op\":\"position\"}\n";
        let mut output = Vec::new();

        serve(&mut fake, input, &mut output).await.unwrap();

        let replies: Vec<BridgeResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 2);
        assert!(matches!(replies[0], BridgeResponse::Rejected { .. }));
        assert_eq!(replies[1], BridgeResponse::Position { x: 500, y: 300 });
    }

    #[tokio::test]
    async fn test_client_round_trip_through_pipe() {
        let (client_out, server_in) = duplex(1024);
        let (server_out, client_in) = duplex(1024);
        let mut fake = FakeCursor::at(500, 300);

        let client = async {
            let mut cursor = BridgeCursor::from_streams(client_out, client_in);
            let position = cursor.position().await;
            let moved = cursor.move_to(Position::new(500, 400)).await;
            drop(cursor);
            (position, moved)
        };
        let server = serve(&mut fake, BufReader::new(server_in), server_out);

        let ((position, moved), served) = tokio::join!(client, server);
        assert_eq!(position, Ok(Position::new(500, 300)));
        assert_eq!(moved, Ok(()));
        assert!(served.is_ok());
        assert_eq!(fake.moves, vec![Position::new(500, 400)]);
    }

    #[tokio::test]
    async fn test_client_surfaces_remote_failure() {
        let (client_out, server_in) = duplex(1024);
        let (server_out, client_in) = duplex(1024);
        let mut fake = FakeCursor::failing(CursorError::permission_denied("accessibility off"));

        let client = async {
            let mut cursor = BridgeCursor::from_streams(client_out, client_in);
            cursor.position().await
        };
        let server = serve(&mut fake, BufReader::new(server_in), server_out);

        let (position, _) = tokio::join!(client, server);
        assert_eq!(
            position,
            Err(CursorError::permission_denied("accessibility off"))
        );
    }

    #[tokio::test]
    async fn test_closed_pipe_is_device_unavailable() {
        let (client_out, server_in) = duplex(64);
        let (server_out, client_in) = duplex(64);
        drop(server_out);
        let mut cursor = BridgeCursor::from_streams(client_out, client_in);

        let err = cursor.position().await.unwrap_err();
        assert!(matches!(err, CursorError::DeviceUnavailable(_)));
        drop(server_in);
    }
}
