//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};

/// Trait for serial port I/O operations
///
/// Implemented for every async byte stream, so the real
/// `tokio_serial::SerialStream` and `tokio_test::io::Mock` both qualify.
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Read up to `buf.len()` bytes, giving up after `timeout`
    ///
    /// Returns the number of bytes read, which is short if the deadline
    /// passed or the stream ended part way. A stream that ends before any
    /// byte arrives is an [`io::ErrorKind::UnexpectedEof`] error, so a
    /// hung-up port can be told apart from a silent one.
    async fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

#[async_trait]
impl<T> SerialPortIO for T
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(self, data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        AsyncWriteExt::flush(self).await
    }

    async fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut filled = 0;

        while filled < buf.len() {
            match timeout_at(deadline, AsyncReadExt::read(self, &mut buf[filled..])).await {
                Ok(Ok(0)) if filled == 0 => {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "port hung up"));
                }
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => filled += n,
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => break,
            }
        }

        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_write_and_flush() {
        let mut port = Builder::new().write(&[0x55, 0x0d]).build();
        SerialPortIO::write_all(&mut port, &[0x55, 0x0d]).await.unwrap();
        SerialPortIO::flush(&mut port).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_timeout_assembles_chunks() {
        let mut port = Builder::new().read(&[1, 2]).read(&[3]).read(&[4, 5]).build();

        let mut buf = [0u8; 5];
        let n = port.read_timeout(&mut buf, TIMEOUT).await.unwrap();
        assert_eq!(n, 5);
        assert_eq!(buf, [1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_read_timeout_short_on_eof() {
        let mut port = Builder::new().read(&[1, 2]).build();

        let mut buf = [0u8; 4];
        let n = port.read_timeout(&mut buf, TIMEOUT).await.unwrap();
        assert_eq!(n, 2);
    }

    #[tokio::test]
    async fn test_read_timeout_eof_before_data() {
        let mut port = Builder::new().build();

        let mut buf = [0u8; 1];
        let err = port.read_timeout(&mut buf, TIMEOUT).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout_silent_port_reads_nothing() {
        let mut port = Builder::new().wait(Duration::from_secs(5)).build();

        let mut buf = [0u8; 1];
        assert_eq!(port.read_timeout(&mut buf, TIMEOUT).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout_gives_up_after_deadline() {
        // Second chunk arrives long after the deadline
        let mut port = Builder::new()
            .read(&[1])
            .wait(Duration::from_secs(5))
            .build();

        let mut buf = [0u8; 2];
        let n = port.read_timeout(&mut buf, TIMEOUT).await.unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn test_read_timeout_propagates_io_error() {
        let mut port = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            .build();

        let mut buf = [0u8; 1];
        let err = port.read_timeout(&mut buf, TIMEOUT).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
