//! Byte-range resolution and chunked document delivery.
//!
//! The streaming path has two halves: resolving an HTTP `Range` header
//! into a concrete byte interval, and producing that interval from a
//! seekable source as a lazy sequence of bounded chunks. Only the exact
//! single-range form `bytes=<start>-<end>` is accepted; open-ended,
//! suffix, and multi-range requests are rejected rather than guessed at.
//!
//! The chunk producer owns its source for the lifetime of the stream, so
//! abandoning the stream (a client disconnect) releases the file handle
//! without any extra bookkeeping.

use std::io::{self, SeekFrom};

use bytes::Bytes;
use futures::Stream;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Largest chunk read from disk and handed to the transport in one step.
pub const CHUNK_CAP: usize = 1024 * 1024;

/// Inclusive byte interval into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// Errors from resolving a `Range` header.
#[derive(Debug, Error)]
pub enum RangeError {
    #[error("malformed Range header, expected bytes=<start>-<end>")]
    Malformed,

    #[error("range start {start} is beyond the document size {size}")]
    Unsatisfiable { start: u64, size: u64 },
}

/// Resolve an optional `Range` header value against a known document size.
///
/// An absent header resolves to the whole document, `[0, file_size - 1]`.
/// A present header must match `bytes=<start>-<end>` exactly: the fixed
/// `bytes=` prefix, one `-`, an integer on each side. Anything else is
/// [`RangeError::Malformed`].
///
/// `end` is not checked against `file_size`; the chunk reader stops at
/// end-of-file on its own, and the responder clamps the headers to what is
/// actually served. Two cases can never be satisfied and are rejected
/// here, since committing headers for them would overstate the delivered
/// bytes: an inverted interval (`start > end`), and a `start` at or past
/// the end of the document.
///
/// `file_size` must be positive; callers handle empty documents before
/// resolution.
pub fn resolve_range(header: Option<&str>, file_size: u64) -> Result<ByteRange, RangeError> {
    let Some(header) = header else {
        return Ok(ByteRange {
            start: 0,
            end: file_size.saturating_sub(1),
        });
    };

    let spec = header.strip_prefix("bytes=").ok_or(RangeError::Malformed)?;
    let (start, end) = spec.split_once('-').ok_or(RangeError::Malformed)?;
    let start: u64 = start.parse().map_err(|_| RangeError::Malformed)?;
    let end: u64 = end.parse().map_err(|_| RangeError::Malformed)?;

    if start > end {
        return Err(RangeError::Malformed);
    }
    if start >= file_size {
        return Err(RangeError::Unsatisfiable {
            start,
            size: file_size,
        });
    }

    Ok(ByteRange { start, end })
}

/// Produce the bytes in `[start, end]` of `source` as a lazy stream of
/// chunks no larger than [`CHUNK_CAP`].
///
/// Chunks arrive in strictly increasing offset order with no gaps or
/// overlaps, so their concatenation is exactly the requested interval.
/// Reaching end-of-file before `end` terminates the stream without error.
/// `start > end` yields an empty stream. The source is dropped when the
/// stream completes or is abandoned, whichever comes first.
pub fn chunked_range<R>(
    source: R,
    start: u64,
    end: u64,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    R: AsyncRead + AsyncSeek + Unpin + Send + 'static,
{
    async_stream::try_stream! {
        let mut source = source;
        // An inverted interval produces nothing; don't touch the source.
        if start <= end {
            source.seek(SeekFrom::Start(start)).await?;
            let mut pos = start;
            while pos <= end {
                let want = (end - pos).saturating_add(1).min(CHUNK_CAP as u64) as usize;
                let mut buf = vec![0u8; want];
                let n = source.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                buf.truncate(n);
                pos += n as u64;
                yield Bytes::from(buf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    // -- resolve_range --

    #[test]
    fn absent_header_resolves_to_whole_document() {
        let range = resolve_range(None, 10).unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 9 });
    }

    #[test]
    fn exact_single_range_parses() {
        let range = resolve_range(Some("bytes=1000000-2999999"), 5_000_000).unwrap();
        assert_eq!(
            range,
            ByteRange {
                start: 1_000_000,
                end: 2_999_999
            }
        );
    }

    #[test]
    fn single_byte_range_parses() {
        let range = resolve_range(Some("bytes=0-0"), 10).unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 0 });
    }

    #[test]
    fn end_past_document_size_is_permitted() {
        // The reader degrades at EOF; resolution stays permissive.
        let range = resolve_range(Some("bytes=2-999"), 10).unwrap();
        assert_eq!(range, ByteRange { start: 2, end: 999 });
    }

    #[test]
    fn malformed_headers_are_rejected() {
        for header in [
            "bytes=",
            "0-5",
            "bytes=0",
            "bytes=-500",
            "bytes=0-",
            "bytes=a-b",
            "bytes=0-1,5-9",
            "bytes= 0-5",
            "bytes=0 -5",
            "bytes=5-2x",
            "bytes=5-2",
        ] {
            let result = resolve_range(Some(header), 100);
            assert!(
                matches!(result, Err(RangeError::Malformed)),
                "expected Malformed for {header:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn start_at_or_past_size_is_unsatisfiable() {
        assert!(matches!(
            resolve_range(Some("bytes=10-15"), 10),
            Err(RangeError::Unsatisfiable { start: 10, size: 10 })
        ));
        assert!(matches!(
            resolve_range(Some("bytes=999-1000"), 10),
            Err(RangeError::Unsatisfiable { .. })
        ));
    }

    // -- chunked_range --

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    async fn collect(
        stream: impl Stream<Item = io::Result<Bytes>>,
    ) -> (Vec<usize>, Vec<u8>) {
        futures::pin_mut!(stream);
        let mut sizes = Vec::new();
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            sizes.push(chunk.len());
            bytes.extend_from_slice(&chunk);
        }
        (sizes, bytes)
    }

    #[tokio::test]
    async fn concatenation_matches_source_interval() {
        let data = patterned(2_500_000);
        let (start, end) = (100u64, 2_200_000u64);

        let stream = chunked_range(Cursor::new(data.clone()), start, end);
        let (sizes, bytes) = collect(stream).await;

        assert_eq!(bytes, &data[start as usize..=end as usize]);
        assert!(sizes.iter().all(|&s| s <= CHUNK_CAP));
        assert_eq!(sizes.iter().sum::<usize>(), (end - start + 1) as usize);
    }

    #[tokio::test]
    async fn two_megabyte_range_arrives_in_two_capped_chunks() {
        let data = patterned(5_000_000);
        let stream = chunked_range(Cursor::new(data.clone()), 1_000_000, 2_999_999);
        let (sizes, bytes) = collect(stream).await;

        assert_eq!(sizes, vec![CHUNK_CAP, CHUNK_CAP]);
        assert_eq!(bytes.len(), 2_000_000);
        assert_eq!(bytes, &data[1_000_000..3_000_000]);
    }

    #[tokio::test]
    async fn equal_start_and_end_yields_one_single_byte_chunk() {
        let data = patterned(10);
        let stream = chunked_range(Cursor::new(data.clone()), 4, 4);
        let (sizes, bytes) = collect(stream).await;

        assert_eq!(sizes, vec![1]);
        assert_eq!(bytes, vec![data[4]]);
    }

    #[tokio::test]
    async fn inverted_range_yields_empty_stream() {
        let stream = chunked_range(Cursor::new(patterned(10)), 5, 2);
        let (sizes, bytes) = collect(stream).await;

        assert!(sizes.is_empty());
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn end_past_eof_terminates_quietly() {
        let data = patterned(10);
        let stream = chunked_range(Cursor::new(data.clone()), 2, 999);
        let (sizes, bytes) = collect(stream).await;

        assert_eq!(sizes, vec![8]);
        assert_eq!(bytes, &data[2..]);
    }

    #[tokio::test]
    async fn huge_end_does_not_overflow() {
        let data = patterned(16);
        let stream = chunked_range(Cursor::new(data.clone()), 0, u64::MAX);
        let (_, bytes) = collect(stream).await;
        assert_eq!(bytes, data);
    }

    // Resource-tracking double: a cursor that records its own drop, so the
    // tests can observe handle release.
    struct TrackedSource {
        inner: Cursor<Vec<u8>>,
        released: Arc<AtomicBool>,
    }

    impl TrackedSource {
        fn new(data: Vec<u8>) -> (Self, Arc<AtomicBool>) {
            let released = Arc::new(AtomicBool::new(false));
            (
                Self {
                    inner: Cursor::new(data),
                    released: released.clone(),
                },
                released,
            )
        }
    }

    impl Drop for TrackedSource {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    impl AsyncRead for TrackedSource {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
        }
    }

    impl AsyncSeek for TrackedSource {
        fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
            Pin::new(&mut self.get_mut().inner).start_seek(position)
        }

        fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
            Pin::new(&mut self.get_mut().inner).poll_complete(cx)
        }
    }

    #[tokio::test]
    async fn source_is_released_when_stream_is_exhausted() {
        let (source, released) = TrackedSource::new(patterned(64));
        let stream = chunked_range(source, 0, 63);
        futures::pin_mut!(stream);

        while stream.next().await.is_some() {}

        // Exhaustion alone releases the source; the stream value still exists.
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn source_is_released_when_stream_is_abandoned() {
        let (source, released) = TrackedSource::new(patterned(4 * CHUNK_CAP));
        {
            let stream = chunked_range(source, 0, (4 * CHUNK_CAP - 1) as u64);
            futures::pin_mut!(stream);

            let first = stream.next().await.unwrap().unwrap();
            assert_eq!(first.len(), CHUNK_CAP);
            assert!(!released.load(Ordering::SeqCst));
            // Stream dropped here with three chunks unread
        }

        assert!(released.load(Ordering::SeqCst));
    }
}
