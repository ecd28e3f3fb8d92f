//! Single-slot frame transport between the source and relay stages.
//!
//! Every Line crosses the transport as one fixed-size [`Frame`]:
//!
//! ```text
//!   +----------------+----------------------+-----------------+
//!   | len: u32 (LE)  | payload (len bytes)  | zero padding    |
//!   +----------------+----------------------+-----------------+
//!   |<------------------ frame_size(max_line_len) ----------->|
//! ```
//!
//! The top bit of the length word marks a continuation chunk of a split
//! line; the remaining 31 bits hold the payload length.
//!
//! The padding is transport-internal; only `len` payload bytes come back
//! out of [`Frame::decode`].

use crate::error::TransportError;
use crate::line::Line;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{self, Read, Write};

/// Bytes taken by the length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

/// Length-word bit set on continuation chunks.
pub const CONTINUATION_BIT: u32 = 1 << 31;

/// Total frame size for a given maximum Line length.
#[inline]
pub const fn frame_size(max_line_len: usize) -> usize {
    FRAME_HEADER_LEN + max_line_len
}

/// One fixed-size transfer unit.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Box<[u8]>,
}

impl Frame {
    /// Pack a Line into a frame of exactly `frame_size` bytes.
    pub fn encode(line: &Line, frame_size: usize) -> Result<Self, TransportError> {
        let payload = line.as_bytes();
        let capacity = frame_size.saturating_sub(FRAME_HEADER_LEN);
        if payload.len() > capacity || frame_size < FRAME_HEADER_LEN {
            return Err(TransportError::Malformed(format!(
                "line of {} bytes does not fit a {} byte frame",
                payload.len(),
                frame_size
            )));
        }
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|len| len & CONTINUATION_BIT == 0)
            .ok_or_else(|| {
                TransportError::Malformed(format!("line of {} bytes is too large", payload.len()))
            })?;
        let word = if line.is_continuation() {
            len | CONTINUATION_BIT
        } else {
            len
        };

        let mut bytes = vec![0u8; frame_size].into_boxed_slice();
        bytes[..FRAME_HEADER_LEN].copy_from_slice(&word.to_le_bytes());
        bytes[FRAME_HEADER_LEN..FRAME_HEADER_LEN + payload.len()].copy_from_slice(payload);
        Ok(Self { bytes })
    }

    /// Wrap raw bytes received from a byte-stream transport.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Unpack the Line, checking the frame against the expected size.
    pub fn decode(&self, frame_size: usize) -> Result<Line, TransportError> {
        if self.bytes.len() != frame_size {
            return Err(TransportError::Malformed(format!(
                "expected a {} byte frame, got {} bytes",
                frame_size,
                self.bytes.len()
            )));
        }
        let mut header = [0u8; FRAME_HEADER_LEN];
        header.copy_from_slice(&self.bytes[..FRAME_HEADER_LEN]);
        let word = u32::from_le_bytes(header);
        let len = (word & !CONTINUATION_BIT) as usize;
        let payload = &self.bytes[FRAME_HEADER_LEN..];
        if len > payload.len() {
            return Err(TransportError::Malformed(format!(
                "declared length {} exceeds frame capacity {}",
                len,
                payload.len()
            )));
        }
        let bytes = payload[..len].to_vec();
        if word & CONTINUATION_BIT != 0 {
            Ok(Line::continuation(bytes))
        } else {
            Ok(Line::new(bytes))
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame").field("size", &self.bytes.len()).finish()
    }
}

/// Sending half, owned by the source stage.
pub trait FrameSender: Send {
    fn send_frame(&mut self, frame: Frame) -> Result<(), TransportError>;
}

/// Receiving half, owned by the relay stage.
pub trait FrameReceiver: Send {
    /// Block until the next frame arrives.
    fn recv_frame(&mut self) -> Result<Frame, TransportError>;
}

/// In-process sender backed by a one-slot channel.
#[derive(Debug)]
pub struct ChannelSender {
    tx: Sender<Frame>,
}

/// In-process receiver backed by a one-slot channel.
#[derive(Debug)]
pub struct ChannelReceiver {
    rx: Receiver<Frame>,
}

/// Create the default in-process transport.
///
/// The slot holds one frame. A zero-capacity rendezvous would deadlock:
/// the source only passes its permission after `send_frame` returns, and
/// the relay only receives once it holds its own permission.
pub fn channel() -> (ChannelSender, ChannelReceiver) {
    let (tx, rx) = bounded(1);
    (ChannelSender { tx }, ChannelReceiver { rx })
}

impl FrameSender for ChannelSender {
    fn send_frame(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.tx
            .send(frame)
            .map_err(|_| TransportError::Disconnected)
    }
}

impl FrameReceiver for ChannelReceiver {
    fn recv_frame(&mut self) -> Result<Frame, TransportError> {
        self.rx.recv().map_err(|_| TransportError::Disconnected)
    }
}

/// Sender that writes frames to any byte stream, e.g. the write end of a pipe.
pub struct IoFrameSender<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> IoFrameSender<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> FrameSender for IoFrameSender<W> {
    fn send_frame(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.writer.write_all(frame.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Receiver that reads whole frames from any byte stream.
pub struct IoFrameReceiver<R: Read + Send> {
    reader: R,
    frame_size: usize,
}

impl<R: Read + Send> IoFrameReceiver<R> {
    pub fn new(reader: R, frame_size: usize) -> Self {
        Self { reader, frame_size }
    }
}

impl<R: Read + Send> FrameReceiver for IoFrameReceiver<R> {
    fn recv_frame(&mut self) -> Result<Frame, TransportError> {
        let mut bytes = vec![0u8; self.frame_size];
        let mut filled = 0;
        while filled < bytes.len() {
            match self.reader.read(&mut bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Io(e)),
            }
        }
        match filled {
            0 => Err(TransportError::Disconnected),
            n if n < self.frame_size => Err(TransportError::Truncated {
                expected: self.frame_size,
                actual: n,
            }),
            _ => Ok(Frame::from_bytes(bytes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_frame_is_fully_sized() {
        let size = frame_size(16);
        let frame = Frame::encode(&Line::from("hello\n"), size).unwrap();
        assert_eq!(frame.len(), 20);
        assert_eq!(&frame.as_bytes()[..4], &6u32.to_le_bytes());
        assert_eq!(&frame.as_bytes()[4..10], b"hello\n");
        assert!(frame.as_bytes()[10..].iter().all(|&b| b == 0));
        assert_eq!(frame.decode(size).unwrap(), Line::from("hello\n"));
    }

    #[test]
    fn test_continuation_flag_survives_transport() {
        let size = frame_size(16);
        let frame = Frame::encode(&Line::continuation(b"end_header\n".to_vec()), size).unwrap();
        assert_eq!(
            &frame.as_bytes()[..4],
            &(11u32 | CONTINUATION_BIT).to_le_bytes()
        );

        let line = frame.decode(size).unwrap();
        assert!(line.is_continuation());
        assert_eq!(line.as_bytes(), b"end_header\n");

        let whole = Frame::encode(&Line::from("end_header\n"), size).unwrap();
        assert!(!whole.decode(size).unwrap().is_continuation());
    }

    #[test]
    fn test_empty_and_full_payloads() {
        let size = frame_size(4);
        let empty = Frame::encode(&Line::from(""), size).unwrap();
        assert!(empty.decode(size).unwrap().is_empty());

        let full = Frame::encode(&Line::from("abc\n"), size).unwrap();
        assert_eq!(full.decode(size).unwrap().as_bytes(), b"abc\n");

        assert!(Frame::encode(&Line::from("abcd\n"), size).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        let frame = Frame::encode(&Line::from("x"), frame_size(8)).unwrap();
        assert!(matches!(
            frame.decode(frame_size(9)),
            Err(TransportError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_length() {
        let mut bytes = vec![0u8; frame_size(4)];
        bytes[..4].copy_from_slice(&5u32.to_le_bytes());
        let frame = Frame::from_bytes(bytes);
        assert!(matches!(
            frame.decode(frame_size(4)),
            Err(TransportError::Malformed(_))
        ));

        let empty = Frame::from_bytes(Vec::new());
        assert!(empty.is_empty());
        assert!(matches!(
            empty.decode(frame_size(4)),
            Err(TransportError::Malformed(_))
        ));
    }

    #[test]
    fn test_channel_holds_one_frame() {
        let (mut tx, mut rx) = channel();
        let size = frame_size(8);
        tx.send_frame(Frame::encode(&Line::from("a\n"), size).unwrap())
            .unwrap();
        let frame = rx.recv_frame().unwrap();
        assert_eq!(frame.decode(size).unwrap().as_bytes(), b"a\n");

        drop(tx);
        assert!(matches!(rx.recv_frame(), Err(TransportError::Disconnected)));
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (mut tx, rx) = channel();
        drop(rx);
        let frame = Frame::encode(&Line::from("a\n"), frame_size(8)).unwrap();
        assert!(matches!(
            tx.send_frame(frame),
            Err(TransportError::Disconnected)
        ));
    }

    #[test]
    fn test_io_transport() {
        let size = frame_size(8);
        let mut tx = IoFrameSender::new(Vec::new());
        tx.send_frame(Frame::encode(&Line::from("one\n"), size).unwrap())
            .unwrap();
        tx.send_frame(Frame::encode(&Line::from("two"), size).unwrap())
            .unwrap();
        let wire = tx.into_inner();
        assert_eq!(wire.len(), 2 * size);

        let mut rx = IoFrameReceiver::new(Cursor::new(wire), size);
        let first = rx.recv_frame().unwrap();
        assert!(!first.is_empty());
        assert_eq!(first.len(), size);
        assert_eq!(first.decode(size).unwrap().as_bytes(), b"one\n");
        assert_eq!(rx.recv_frame().unwrap().decode(size).unwrap().as_bytes(), b"two");
        assert!(matches!(rx.recv_frame(), Err(TransportError::Disconnected)));
    }

    #[test]
    fn test_io_transport_truncated_frame() {
        let size = frame_size(8);
        let mut rx = IoFrameReceiver::new(Cursor::new(vec![1u8; 5]), size);
        match rx.recv_frame() {
            Err(TransportError::Truncated { expected, actual }) => {
                assert_eq!(expected, 12);
                assert_eq!(actual, 5);
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
    }
}
