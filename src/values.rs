//! Newline-delimited value files and the comparator used to answer requests
//!
//! The sort core never looks at values; this is the caller side the CLI
//! plugs in. Element identifier `k` is the `k`-th line of the file.

use crate::config::CompareMode;
use crate::error::{SortContext, SortError, SortResult};
use memmap2::Mmap;
use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, Read};
use std::ops::Range;
use std::path::Path;

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Mapped(mmap) => &mmap[..],
            Backing::Owned(data) => data.as_slice(),
        }
    }
}

/// Lines of one input, addressed by element identifier
pub struct ValueFile {
    name: String,
    data: Backing,
    lines: Vec<Range<usize>>,
}

impl ValueFile {
    /// Map a file, or read stdin for `-`
    pub fn open(name: &str) -> SortResult<Self> {
        if name == "-" {
            let mut data = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut data)
                .with_context(|| "reading standard input".to_string())?;
            return Ok(Self::from_bytes(name, data));
        }

        let path = Path::new(name);
        let file = File::open(path).with_file_context(name)?;
        if file.metadata().with_file_context(name)?.len() == 0 {
            return Ok(Self::from_bytes(name, Vec::new()));
        }
        // SAFETY: the map is read-only and lives as long as `self`; the file
        // is not expected to be truncated while a sort over it runs.
        let mmap = unsafe { Mmap::map(&file) }.with_file_context(name)?;
        let lines = split_lines(&mmap);
        Ok(Self {
            name: name.to_string(),
            data: Backing::Mapped(mmap),
            lines,
        })
    }

    /// In-memory value list
    pub fn from_bytes(name: &str, data: Vec<u8>) -> Self {
        let lines = split_lines(&data);
        Self {
            name: name.to_string(),
            data: Backing::Owned(data),
            lines,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Element count as stored in a sort state
    pub fn count(&self) -> SortResult<u32> {
        u32::try_from(self.lines.len()).map_err(|_| {
            SortError::parse_error(&format!("{}: too many lines for one sort", self.name))
        })
    }

    /// Bytes of element `id`, without the line terminator
    pub fn get(&self, id: u32) -> &[u8] {
        self.lines
            .get(id as usize)
            .map(|range| &self.data.bytes()[range.clone()])
            .unwrap_or(&[])
    }

    /// Order element `a` against element `b`
    pub fn compare(&self, a: u32, b: u32, mode: CompareMode) -> Ordering {
        compare_values(self.get(a), self.get(b), mode)
    }
}

/// Compare two raw values under `mode`
pub fn compare_values(a: &[u8], b: &[u8], mode: CompareMode) -> Ordering {
    match mode {
        CompareMode::Lexicographic => a.cmp(b),
        CompareMode::Numeric => compare_general_numeric(a, b),
    }
}

fn split_lines(data: &[u8]) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut start = 0;

    for (i, &byte) in data.iter().enumerate() {
        if byte == b'\n' {
            lines.push(start..i);
            start = i + 1;
        }
    }

    // Last line without a trailing newline
    if start < data.len() {
        lines.push(start..data.len());
    }

    lines
}

/// Parse as general numeric (supports scientific notation, inf, nan)
fn parse_general_numeric(bytes: &[u8]) -> f64 {
    let Ok(s) = std::str::from_utf8(bytes) else {
        return f64::NEG_INFINITY;
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed.parse::<f64>() {
        Ok(val) => val,
        // Non-numeric strings sort to the beginning
        Err(_) => f64::NEG_INFINITY,
    }
}

/// NaN sorts last; equal values fall back to byte order
fn compare_general_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let x = parse_general_numeric(a);
    let y = parse_general_numeric(b);

    match (x.is_nan(), y.is_nan()) {
        (true, true) => a.cmp(b),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match x.total_cmp(&y) {
            Ordering::Equal => a.cmp(b),
            other => other,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_split_lines() {
        let values = ValueFile::from_bytes("mem", b"b\na\n\nc".to_vec());
        assert_eq!(values.len(), 4);
        assert_eq!(values.get(0), b"b");
        assert_eq!(values.get(2), b"");
        assert_eq!(values.get(3), b"c");
        assert_eq!(values.get(9), b"");
    }

    #[test]
    fn test_open_mapped_and_empty() -> SortResult<()> {
        let temp_dir = TempDir::new()?;
        let full = temp_dir.path().join("values.txt");
        let empty = temp_dir.path().join("empty.txt");
        fs::write(&full, "4.8\n10.0\n1.0\n2.5\n5.0\n")?;
        fs::write(&empty, "")?;

        let values = ValueFile::open(&full.to_string_lossy())?;
        assert_eq!(values.count()?, 5);
        assert_eq!(values.get(1), b"10.0");

        let values = ValueFile::open(&empty.to_string_lossy())?;
        assert!(values.is_empty());
        Ok(())
    }

    #[test]
    fn test_open_missing_file() {
        let result = ValueFile::open("/nonexistent/values.txt");
        assert!(matches!(result, Err(SortError::FileNotFound { .. })));
    }

    #[test]
    fn test_numeric_comparison() {
        let values = ValueFile::from_bytes("mem", b"10\n9\n1e1\nnan\nabc\n".to_vec());
        assert_eq!(values.compare(0, 1, CompareMode::Numeric), Ordering::Greater);
        assert_eq!(values.compare(0, 1, CompareMode::Lexicographic), Ordering::Less);
        // Equal magnitude, byte order decides
        assert_eq!(values.compare(0, 2, CompareMode::Numeric), Ordering::Less);
        assert_eq!(values.compare(3, 0, CompareMode::Numeric), Ordering::Greater);
        assert_eq!(values.compare(4, 1, CompareMode::Numeric), Ordering::Less);
    }
}
