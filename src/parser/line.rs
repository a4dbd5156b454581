//! CRLF line reader.

use tokio::io::{AsyncRead, AsyncReadExt};

/// Initial capacity of a line buffer.
const LINE_CAPACITY: usize = 128;

/// Result of reading one header-section line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// A complete line, without its CRLF terminator.
    Line(String),
    /// The stream ended before a terminator. `partial` is set when some bytes
    /// of the line had already been read.
    EndOfStream { partial: bool },
    /// A bare CR or bare LF was seen. Carries the offending character name.
    ProtocolViolation(&'static str),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LineState {
    None,
    SawCr,
    SawCrLf,
}

/// Read a CRLF-terminated line one byte at a time.
///
/// Bytes are mapped to characters one-to-one (Latin-1). Only I/O failures are
/// returned as `Err`; end of stream and malformed terminators are data.
///
/// Line length is not bounded.
pub async fn read_line<R>(reader: &mut R) -> std::io::Result<LineRead>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut state = LineState::None;
    let mut line = String::with_capacity(LINE_CAPACITY);
    let mut consumed = false;
    let mut byte = [0u8; 1];

    while state != LineState::SawCrLf {
        if reader.read(&mut byte).await? == 0 {
            return Ok(LineRead::EndOfStream { partial: consumed });
        }
        consumed = true;
        state = match (byte[0], state) {
            (b'\r', LineState::None) => LineState::SawCr,
            (b'\r', _) => return Ok(LineRead::ProtocolViolation("CR")),
            (b'\n', LineState::SawCr) => LineState::SawCrLf,
            (b'\n', _) => return Ok(LineRead::ProtocolViolation("LF")),
            (b, _) => {
                line.push(char::from(b));
                LineState::None
            }
        };
    }

    Ok(LineRead::Line(line))
}
