//! Entry playback streams
//!
//! Every opened entry reads through the same layering: a [`SharedCursor`]
//! gives it a private position over the archive's base stream, a
//! [`SubStream`] bounds it to the payload bytes, a `BufReader` keeps the
//! per-read locking and seeking off the hot path, and for compressed
//! entries a dedicated [`DecompressorState`] sits on top. Any number of
//! entry streams can be open at once, from any thread, without disturbing
//! each other.

use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::common::SCRATCH_LEN;
use crate::decompress::DecompressorState;

/// An independent cursor over a stream shared behind `Arc<Mutex<_>>`.
///
/// Each cursor tracks its own position and re-seeks the base stream under
/// the lock on every read, so interleaved readers cannot corrupt each
/// other's positions.
#[derive(Debug)]
pub(crate) struct SharedCursor<R> {
    base: Arc<Mutex<R>>,
    pos: u64,
}

impl<R> SharedCursor<R> {
    pub(crate) fn new(base: Arc<Mutex<R>>) -> Self {
        SharedCursor { base, pos: 0 }
    }
}

impl<R> Clone for SharedCursor<R> {
    fn clone(&self) -> Self {
        SharedCursor {
            base: Arc::clone(&self.base),
            pos: self.pos,
        }
    }
}

fn lock_base<R>(base: &Mutex<R>) -> io::Result<MutexGuard<'_, R>> {
    base.lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "package stream lock poisoned"))
}

impl<R: Read + Seek> Read for SharedCursor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut base = lock_base(&self.base)?;
        base.seek(SeekFrom::Start(self.pos))?;
        let n = base.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for SharedCursor<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.pos) + i128::from(delta),
            SeekFrom::End(delta) => {
                let mut base = lock_base(&self.base)?;
                let end = base.seek(SeekFrom::End(0))?;
                i128::from(end) + i128::from(delta)
            }
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before stream start",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

/// A window `[start, start + len)` over a seekable stream, addressed with
/// positions relative to `start`. Reads clamp at the window end; seeking
/// past it is allowed and reads there return nothing, per usual stream
/// rules.
#[derive(Debug)]
pub(crate) struct SubStream<S> {
    inner: S,
    start: u64,
    len: u64,
    pos: u64,
}

impl<S: Seek> SubStream<S> {
    /// Bound `inner` to the window and position at its start.
    pub(crate) fn new(mut inner: S, start: u64, len: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(SubStream {
            inner,
            start,
            len,
            pos: 0,
        })
    }

    /// Window length in bytes.
    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    /// Current position relative to the window start, without a syscall.
    pub(crate) fn position(&self) -> u64 {
        self.pos
    }
}

impl<S: Read + Seek> Read for SubStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let cap = (buf.len() as u64).min(remaining) as usize;
        let n = self.inner.read(&mut buf[..cap])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<S: Read + Seek> Seek for SubStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.pos) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.len) + i128::from(delta),
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before window start",
            ));
        }
        let target = target as u64;
        self.inner.seek(SeekFrom::Start(self.start + target))?;
        self.pos = target;
        Ok(self.pos)
    }
}

/// Read + Seek view of one archive entry.
///
/// Stored entries seek natively. Compressed entries only ever decode
/// forward, so a backward seek rewinds to the payload start, resets the
/// decoder and replays up to the target; a forward seek decodes into a
/// scratch buffer and discards. Seeking to exactly the entry size is
/// recognized without decoding anything.
///
/// A read that comes up short against the entry's size latches the error
/// flag and later reads return nothing until [`clear_err`](Self::clear_err);
/// rewinding resets the decoder and can genuinely recover. Reads clipped
/// by the end of the entry latch the separate end-of-stream flag, which
/// any successful seek clears.
#[derive(Debug)]
pub struct EntryStream<R> {
    source: BufReader<SubStream<SharedCursor<R>>>,
    decoder: Option<Box<DecompressorState>>,
    size: u64,
    pos: u64,
    eos: bool,
    err: bool,
}

impl<R: Read + Seek> EntryStream<R> {
    pub(crate) fn open(
        base: Arc<Mutex<R>>,
        data_start: u64,
        data_span: u64,
        size: u64,
        compressed: bool,
    ) -> io::Result<Self> {
        let sub = SubStream::new(SharedCursor::new(base), data_start, data_span)?;
        Ok(EntryStream {
            source: BufReader::new(sub),
            decoder: compressed.then(|| Box::new(DecompressorState::new())),
            size,
            pos: 0,
            eos: false,
            err: false,
        })
    }

    /// Decompressed size of the entry.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether a read has been clipped by the end of the entry.
    pub fn eos(&self) -> bool {
        self.eos
    }

    /// Whether a decode or source failure is latched.
    pub fn err(&self) -> bool {
        self.err
    }

    /// Clear the latched end-of-stream and error flags.
    pub fn clear_err(&mut self) {
        self.eos = false;
        self.err = false;
    }

    /// Reposition a compressed entry by rewind or decode-ahead.
    fn seek_decoded(&mut self, target: u64) -> io::Result<()> {
        if target == self.pos {
            return Ok(());
        }
        if target == self.size {
            self.pos = self.size;
            return Ok(());
        }
        if target < self.pos {
            self.source.seek(SeekFrom::Start(0))?;
            if let Some(state) = self.decoder.as_mut() {
                state.reset();
            }
            self.pos = 0;
        }
        self.skip_decoded(target - self.pos)
    }

    /// Decode and discard `count` bytes.
    fn skip_decoded(&mut self, mut count: u64) -> io::Result<()> {
        let Some(state) = self.decoder.as_mut() else {
            return Ok(());
        };
        let mut scratch = [0u8; SCRATCH_LEN];
        while count > 0 {
            let want = count.min(scratch.len() as u64) as usize;
            let got = state.decompress(&mut self.source, &mut scratch[..want]);
            self.pos += got as u64;
            if got < want {
                self.err = true;
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "entry payload ended mid-seek",
                ));
            }
            count -= got as u64;
        }
        Ok(())
    }
}

impl<R: Read + Seek> Read for EntryStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.err {
            return Ok(0);
        }
        let remaining = self.size - self.pos;
        if !buf.is_empty() && buf.len() as u64 > remaining {
            self.eos = true;
        }
        let want = (buf.len() as u64).min(remaining) as usize;
        if want == 0 {
            return Ok(0);
        }
        let got = match self.decoder.as_mut() {
            Some(state) => state.decompress(&mut self.source, &mut buf[..want]),
            None => match read_raw(&mut self.source, &mut buf[..want]) {
                Ok(n) => n,
                Err(e) => {
                    self.err = true;
                    return Err(e);
                }
            },
        };
        self.pos += got as u64;
        if got < want {
            self.err = true;
        }
        Ok(got)
    }
}

impl<R: Read + Seek> Seek for EntryStream<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.pos) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.size) + i128::from(delta),
        };
        if target < 0 || target > i128::from(self.size) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek outside the entry",
            ));
        }
        let target = target as u64;
        if self.decoder.is_some() {
            self.seek_decoded(target)?;
        } else if target != self.pos {
            self.source.seek(SeekFrom::Start(target))?;
            self.pos = target;
        }
        self.eos = false;
        Ok(self.pos)
    }
}

/// Fill `buf` as far as the source allows, pushing through partial reads.
fn read_raw<S: Read>(source: &mut S, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
