//! Streaming secret scrubber.
//!
//! A [`Redactor`] sits between a job's output and its log sink. Every byte
//! written through it is scanned for secret values, and each occurrence is
//! replaced with a mask token before it reaches the sink.
//!
//! Output usually arrives in arbitrary chunks, so a secret can straddle two
//! writes. The redactor holds back the shortest tail of each write that
//! could still be the start of a secret (never more than the longest secret
//! minus one byte) and re-examines it when the next write arrives. The
//! result is identical however the input is split, once the stream is
//! finished with [`Redactor::finish`] or [`Redactor::flush_carry`].
//!
//! Known limits:
//! - A secret whose trailing bytes never arrive cannot be recognised.
//! - A secret that occurs inside the mask token itself is not handled.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Default replacement for secret values.
pub const DEFAULT_MASK: &str = "[REDACTED]";

/// Outcome of probing one position of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchAt {
    /// A secret of this many bytes starts here.
    Hit(usize),
    /// More input is needed before this position can be decided.
    Pending,
    Miss,
}

/// Set of secret values prepared for substring search.
///
/// Values are deduplicated, empty values are dropped and the rest are
/// ordered longest-first, so a secret that is a substring of another never
/// unmasks part of the longer one.
#[derive(Debug, Clone)]
pub struct SecretMatcher {
    needles: Vec<Vec<u8>>,
    max_len: usize,
    first_bytes: Box<[bool]>,
}

impl SecretMatcher {
    pub fn new<S: AsRef<str>>(values: &[S]) -> Self {
        let mut needles: Vec<Vec<u8>> = values
            .iter()
            .map(|v| v.as_ref().as_bytes().to_vec())
            .filter(|v| !v.is_empty())
            .collect();
        needles.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        needles.dedup();

        let mut first_bytes = vec![false; 256].into_boxed_slice();
        for needle in &needles {
            first_bytes[usize::from(needle[0])] = true;
        }
        let max_len = needles.first().map_or(0, Vec::len);

        Self {
            needles,
            max_len,
            first_bytes,
        }
    }

    /// Returns whether there is nothing to scrub.
    pub fn is_empty(&self) -> bool {
        self.needles.is_empty()
    }

    /// Number of distinct secrets.
    pub fn len(&self) -> usize {
        self.needles.len()
    }

    /// Length in bytes of the longest secret.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    fn match_at(&self, rest: &[u8], at_eof: bool) -> MatchAt {
        for needle in &self.needles {
            if rest.len() >= needle.len() {
                if rest.starts_with(needle) {
                    return MatchAt::Hit(needle.len());
                }
            } else if !at_eof && needle.starts_with(rest) {
                return MatchAt::Pending;
            }
        }
        MatchAt::Miss
    }

    /// Scrub `data` into `out`.
    ///
    /// Returns the offset of the first byte that could not be decided yet;
    /// everything from there on was not written and must be carried over.
    /// With `at_eof` set every byte is decided.
    fn scrub_into(&self, data: &[u8], mask: &[u8], out: &mut Vec<u8>, at_eof: bool) -> usize {
        let mut i = 0;
        let mut plain_start = 0;

        while i < data.len() {
            if !self.first_bytes[usize::from(data[i])] {
                i += 1;
                continue;
            }
            match self.match_at(&data[i..], at_eof) {
                MatchAt::Hit(len) => {
                    out.extend_from_slice(&data[plain_start..i]);
                    out.extend_from_slice(mask);
                    i += len;
                    plain_start = i;
                }
                MatchAt::Pending => {
                    out.extend_from_slice(&data[plain_start..i]);
                    return i;
                }
                MatchAt::Miss => i += 1,
            }
        }

        out.extend_from_slice(&data[plain_start..]);
        data.len()
    }

    /// Scrub a complete byte string.
    pub fn redact_bytes(&self, data: &[u8], mask: &str) -> Vec<u8> {
        if self.is_empty() {
            return data.to_vec();
        }
        let mut out = Vec::with_capacity(data.len());
        self.scrub_into(data, mask.as_bytes(), &mut out, true);
        out
    }

    /// Scrub a complete string.
    pub fn redact_str(&self, text: &str, mask: &str) -> String {
        if self.is_empty() {
            return text.to_string();
        }
        match String::from_utf8(self.redact_bytes(text.as_bytes(), mask)) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

/// Output sink wrapper that masks secret values.
///
/// Not meant to be shared between threads directly; wrap it in a
/// [`SharedRedactor`] when several producers write to the same log.
pub struct Redactor<W: Write> {
    inner: Option<W>,
    matcher: SecretMatcher,
    mask: String,
    carry: Vec<u8>,
    scratch: Vec<u8>,
}

impl<W: Write> Redactor<W> {
    /// Wrap `inner`, masking `secrets` with [`DEFAULT_MASK`].
    pub fn new<S: AsRef<str>>(inner: W, secrets: &[S]) -> Self {
        Self::with_mask(inner, secrets, DEFAULT_MASK)
    }

    /// Wrap `inner`, masking `secrets` with a custom token.
    pub fn with_mask<S: AsRef<str>>(inner: W, secrets: &[S], mask: &str) -> Self {
        Self {
            inner: Some(inner),
            matcher: SecretMatcher::new(secrets),
            mask: mask.to_string(),
            carry: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Replace the secret set.
    ///
    /// Bytes already held back are re-examined against the new set on the
    /// next write or flush.
    pub fn reset<S: AsRef<str>>(&mut self, secrets: &[S]) {
        self.matcher = SecretMatcher::new(secrets);
    }

    /// The prepared secret set.
    pub fn matcher(&self) -> &SecretMatcher {
        &self.matcher
    }

    /// Mask token.
    pub fn mask(&self) -> &str {
        &self.mask
    }

    /// Number of bytes currently held back.
    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }

    /// Scrub a string that is not part of the stream.
    pub fn redact_str(&self, text: &str) -> String {
        self.matcher.redact_str(text, &self.mask)
    }

    /// Borrow the wrapped sink.
    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Emit the held-back bytes as end of stream.
    ///
    /// Complete secrets inside the carry-over are still masked. Call this
    /// only when no more output will follow; writing afterwards is allowed
    /// but a secret split across the flush will not be recognised.
    pub fn flush_carry(&mut self) -> io::Result<()> {
        let inner = self.inner.as_mut().ok_or_else(finished_error)?;
        if self.carry.is_empty() {
            return inner.flush();
        }

        self.scratch.clear();
        self.matcher
            .scrub_into(&self.carry, self.mask.as_bytes(), &mut self.scratch, true);
        inner.write_all(&self.scratch)?;
        self.carry.clear();
        inner.flush()
    }

    /// Finish the stream and return the wrapped sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.flush_carry()?;
        self.inner.take().ok_or_else(finished_error)
    }
}

fn finished_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "redactor already finished")
}

impl<W: Write> Write for Redactor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = self.inner.as_mut().ok_or_else(finished_error)?;

        if self.matcher.is_empty() {
            if !self.carry.is_empty() {
                inner.write_all(&self.carry)?;
                self.carry.clear();
            }
            return inner.write(buf);
        }

        let mut data = std::mem::take(&mut self.carry);
        let held = data.len();
        data.extend_from_slice(buf);

        self.scratch.clear();
        let keep_from = self
            .matcher
            .scrub_into(&data, self.mask.as_bytes(), &mut self.scratch, false);

        // `buf` is only consumed once the sink has taken the scrubbed prefix.
        if let Err(err) = inner.write_all(&self.scratch) {
            data.truncate(held);
            self.carry = data;
            return Err(err);
        }
        data.drain(..keep_from);
        self.carry = data;
        Ok(buf.len())
    }

    /// Flushes the wrapped sink. Held-back bytes stay held back.
    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for Redactor<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            if let Err(err) = self.flush_carry() {
                tracing::warn!(error = %err, "failed to flush redactor on drop");
            }
        }
    }
}

impl<W: Write> std::fmt::Debug for Redactor<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.matcher.len())
            .field("carry_len", &self.carry.len())
            .field("finished", &self.inner.is_none())
            .finish()
    }
}

/// Cloneable handle that serialises writes from several producers.
pub struct SharedRedactor<W: Write> {
    inner: Arc<Mutex<Redactor<W>>>,
}

impl<W: Write> Clone for SharedRedactor<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> SharedRedactor<W> {
    pub fn new(redactor: Redactor<W>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(redactor)),
        }
    }

    fn with_lock<T>(&self, f: impl FnOnce(&mut Redactor<W>) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "redactor lock poisoned"))?;
        f(&mut *guard)
    }

    /// Replace the secret set for every handle.
    pub fn reset<S: AsRef<str>>(&self, secrets: &[S]) -> io::Result<()> {
        self.with_lock(|r| {
            r.reset(secrets);
            Ok(())
        })
    }

    /// End-of-stream flush, see [`Redactor::flush_carry`].
    pub fn flush_carry(&self) -> io::Result<()> {
        self.with_lock(Redactor::flush_carry)
    }

    /// Scrub a string that is not part of the stream.
    pub fn redact_str(&self, text: &str) -> io::Result<String> {
        self.with_lock(|r| Ok(r.redact_str(text)))
    }

    /// Recover the redactor once every other handle is gone.
    pub fn into_inner(self) -> Option<Redactor<W>> {
        Arc::try_unwrap(self.inner)
            .ok()
            .and_then(|m| m.into_inner().ok())
    }
}

impl<W: Write> Write for SharedRedactor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_lock(|r| r.write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.with_lock(|r| r.write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_lock(|r| r.flush())
    }
}
