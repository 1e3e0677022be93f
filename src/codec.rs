//! Checkpoint encoding
//!
//! Layout, every field an unsigned 32-bit word in native byte order with no
//! padding and no version tag:
//!
//! ```text
//! sorted | n | arr[0..n) | stack[0..n) | top | p | i | j | l | c
//! ```

use crate::error::{SortContext, SortError, SortResult};
use crate::state::{Comparison, QuickSortState, Side};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

const WORD: usize = std::mem::size_of::<u32>();

/// Scalar fields besides the two arrays
const SCALAR_WORDS: u64 = 8;

/// Size in bytes of an encoded state with `n` elements
pub fn encoded_len(n: u32) -> u64 {
    (SCALAR_WORDS + 2 * u64::from(n)) * WORD as u64
}

/// Encode a state; nothing is produced for an invalid one
pub fn encode(state: &QuickSortState) -> SortResult<Vec<u8>> {
    state.validate()?;

    let mut out = Vec::with_capacity(encoded_len(state.n) as usize);
    let mut put = |word: u32| out.extend_from_slice(&word.to_ne_bytes());

    put(u32::from(state.sorted));
    put(state.n);
    state.arr.iter().for_each(|&id| put(id));
    state.stack.iter().for_each(|&slot| put(slot));
    put(state.top);
    put(state.p);
    put(state.i);
    put(state.j);
    put(state.l.code());
    put(state.c.code());

    Ok(out)
}

/// Decode a state; bytes past the last field are ignored
pub fn decode(bytes: &[u8]) -> SortResult<QuickSortState> {
    let mut words = Words::new(bytes);

    let sorted = match words.next()? {
        0 => false,
        1 => true,
        other => {
            return Err(SortError::invalid_state(&format!(
                "sorted flag {other} is neither 0 nor 1"
            )))
        }
    };
    let n = words.next()?;
    if n == 0 {
        return Err(SortError::invalid_state("element count is zero"));
    }

    let needed = usize::try_from(encoded_len(n))
        .map_err(|_| SortError::invalid_state("element count too large for this platform"))?;
    if bytes.len() < needed {
        return Err(SortError::truncated(needed, bytes.len()));
    }

    let arr = words.take(n as usize)?;
    let stack = words.take(n as usize)?;
    let top = words.next()?;
    let p = words.next()?;
    let i = words.next()?;
    let j = words.next()?;
    let l = Side::try_from(words.next()?)?;
    let c = Comparison::try_from(words.next()?)?;

    Ok(QuickSortState {
        sorted,
        n,
        arr,
        stack,
        top,
        p,
        i,
        j,
        l,
        c,
    })
}

/// Persist a state to `path`.
///
/// The state is validated before the file system is touched, and the bytes
/// go to a temporary file in the same directory that then replaces `path`,
/// so a failure never leaves a partial checkpoint behind.
pub fn save<P: AsRef<Path>>(path: P, state: &QuickSortState) -> SortResult<()> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let bytes = encode(state)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).with_file_context(&name)?;
    tmp.write_all(&bytes).with_file_context(&name)?;
    tmp.as_file().sync_all().with_file_context(&name)?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_file_context(&name)?;

    debug!(path = %name, n = state.n, bytes = bytes.len(), "checkpoint saved");
    Ok(())
}

/// Recover a state from `path`
pub fn load<P: AsRef<Path>>(path: P) -> SortResult<QuickSortState> {
    let path = path.as_ref();
    let name = path.display().to_string();

    let file = File::open(path).with_file_context(&name)?;
    let mut bytes = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut bytes)
        .with_file_context(&name)?;

    let state = decode(&bytes)?;
    debug!(path = %name, n = state.n, sorted = state.sorted, "checkpoint loaded");
    Ok(state)
}

/// Fixed-width word cursor over a byte slice
struct Words<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Words<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn next(&mut self) -> SortResult<u32> {
        let end = self.pos + WORD;
        let chunk = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| SortError::truncated(end, self.bytes.len()))?;
        let mut word = [0u8; WORD];
        word.copy_from_slice(chunk);
        self.pos = end;
        Ok(u32::from_ne_bytes(word))
    }

    fn take(&mut self, count: usize) -> SortResult<Vec<u32>> {
        (0..count).map(|_| self.next()).collect()
    }
}
