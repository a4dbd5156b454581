//! Response serialization onto a connection stream.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::server::response::HttpResponse;

/// Write `response` to `writer` without closing it.
///
/// The header block is written and flushed before any body byte goes out.
pub async fn write_response<W>(writer: &mut W, response: &HttpResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(response.head().as_bytes()).await?;
    writer.flush().await?;

    if let Some(content) = &response.content {
        writer.write_all(&content.body).await?;
        writer.flush().await?;
    }

    Ok(())
}
