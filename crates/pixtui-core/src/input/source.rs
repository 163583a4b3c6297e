#![forbid(unsafe_code)]

//! Byte sources feeding the input decoder.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// Something the decoder can read terminal bytes from.
pub trait ByteSource {
    /// Read available bytes into `buf`, waiting at most `timeout`.
    ///
    /// `Ok(0)` means nothing arrived in time (or the wait was interrupted).
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// New terminal size, if a resize happened since the last call.
    fn take_resize(&mut self) -> Option<(u16, u16)> {
        None
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).read_timeout(buf, timeout)
    }

    fn take_resize(&mut self) -> Option<(u16, u16)> {
        (**self).take_resize()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Bytes(Vec<u8>),
    Resize(u16, u16),
}

/// A headless source that replays a fixed script of chunks and resizes.
///
/// Each `bytes` step is returned by exactly one read (split only if the
/// caller's buffer is too small), so tests can reproduce sequences torn
/// across reads. An exhausted script behaves like an idle terminal.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    steps: VecDeque<Step>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one read's worth of bytes.
    #[must_use]
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.push_bytes(bytes);
        self
    }

    /// Queue a resize notification.
    #[must_use]
    pub fn resize(mut self, width: u16, height: u16) -> Self {
        self.steps.push_back(Step::Resize(width, height));
        self
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.steps.push_back(Step::Bytes(bytes.to_vec()));
        }
    }

    /// True once every step has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.steps.is_empty()
    }
}

impl ByteSource for ScriptedSource {
    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        let Some(Step::Bytes(bytes)) = self.steps.front_mut() else {
            return Ok(0);
        };
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        if n == bytes.len() {
            self.steps.pop_front();
        } else {
            bytes.drain(..n);
        }
        Ok(n)
    }

    fn take_resize(&mut self) -> Option<(u16, u16)> {
        match self.steps.front() {
            Some(&Step::Resize(w, h)) => {
                self.steps.pop_front();
                Some((w, h))
            }
            _ => None,
        }
    }
}

#[cfg(unix)]
pub use tty::TtySource;

#[cfg(unix)]
mod tty {
    use std::fs::File;
    use std::io::{self, Read, Write};
    use std::os::fd::AsFd;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use signal_hook::SigId;
    use signal_hook::consts::signal::SIGWINCH;

    use super::ByteSource;
    use crate::logging;

    /// The controlling terminal, read with `poll(2)`.
    ///
    /// Resize notifications arrive through a SIGWINCH flag and are reported
    /// on the next [`ByteSource::take_resize`], with the size re-queried from
    /// the terminal.
    #[derive(Debug)]
    pub struct TtySource {
        tty: File,
        resized: Arc<AtomicBool>,
        sigwinch: Option<SigId>,
    }

    impl TtySource {
        /// Open `/dev/tty` for reading and writing.
        pub fn open() -> io::Result<Self> {
            let tty = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open("/dev/tty")?;
            let resized = Arc::new(AtomicBool::new(false));
            let sigwinch = match signal_hook::flag::register(SIGWINCH, Arc::clone(&resized)) {
                Ok(id) => Some(id),
                Err(_err) => {
                    logging::warn!(error = %_err, "SIGWINCH registration failed; resizes will not be reported");
                    None
                }
            };
            Ok(Self {
                tty,
                resized,
                sigwinch,
            })
        }

        /// The underlying terminal file (used for termios and probe writes).
        pub fn file(&self) -> &File {
            &self.tty
        }

        /// Write directly to the terminal, bypassing stdout.
        pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.tty.write_all(bytes)?;
            self.tty.flush()
        }
    }

    impl ByteSource for TtySource {
        fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
            let ready = {
                let mut fds = [nix::poll::PollFd::new(
                    self.tty.as_fd(),
                    nix::poll::PollFlags::POLLIN,
                )];
                let timeout_ms: u16 = timeout.as_millis().try_into().unwrap_or(u16::MAX);
                match nix::poll::poll(&mut fds, nix::poll::PollTimeout::from(timeout_ms)) {
                    Ok(n) => n,
                    Err(nix::errno::Errno::EINTR) => return Ok(0),
                    Err(e) => return Err(io::Error::other(e)),
                }
            };
            if ready == 0 {
                return Ok(0);
            }
            match self.tty.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                    Ok(0)
                }
                Err(e) => Err(e),
            }
        }

        fn take_resize(&mut self) -> Option<(u16, u16)> {
            if !self.resized.swap(false, Ordering::Relaxed) {
                return None;
            }
            crossterm::terminal::size().ok()
        }
    }

    impl Drop for TtySource {
        fn drop(&mut self) {
            if let Some(id) = self.sigwinch.take() {
                signal_hook::low_level::unregister(id);
            }
        }
    }
}
