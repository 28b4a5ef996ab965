//! Byte-level FASTQ record scanning.
//!
//! The scanner never materializes sequences; it only locates record
//! boundaries so partitions can be expressed as byte ranges of the
//! original files. Records are the classic four-line layout (`@name`,
//! sequence, `+`, quality); multi-line sequence wrapping is rejected.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use meros_core::{MerosError, MerosResult, ReadRange};

/// Location of one record in its file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSpan {
    /// Zero-based record ordinal
    pub index: u64,
    /// Byte offset of the `@` header line
    pub offset: u64,
    /// Length in bytes including all four line terminators
    pub len: u64,
}

impl RecordSpan {
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Streaming record-boundary scanner over any buffered reader
pub struct FastqScanner<R: BufRead> {
    reader: R,
    source: String,
    offset: u64,
    next_index: u64,
    trailing_blank: bool,
    line: Vec<u8>,
    name: Vec<u8>,
}

impl FastqScanner<BufReader<File>> {
    pub fn open(path: &Path) -> MerosResult<Self> {
        let file = File::open(path).map_err(|e| {
            MerosError::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
        })?;
        Ok(Self::new(
            BufReader::with_capacity(1 << 20, file),
            path.display().to_string(),
        ))
    }
}

impl<R: BufRead> FastqScanner<R> {
    /// Wrap a reader; `source` names the input in error messages
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            source: source.into(),
            offset: 0,
            next_index: 0,
            trailing_blank: false,
            line: Vec::with_capacity(512),
            name: Vec::with_capacity(128),
        }
    }

    /// Number of complete records scanned so far
    pub fn records_read(&self) -> u64 {
        self.next_index
    }

    /// Read name of the most recently scanned record (header without `@`)
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Scan the next record, or `None` at end of input
    pub fn next_record(&mut self) -> MerosResult<Option<RecordSpan>> {
        let index = self.next_index;

        let header_len = loop {
            let n = self.read_line()?;
            if n == 0 {
                return Ok(None);
            }
            if !trim_eol(&self.line).is_empty() {
                break n;
            }
            self.trailing_blank = true;
        };
        let start = self.offset - header_len as u64;

        if self.trailing_blank {
            return Err(self.malformed(index, start, "blank line between records"));
        }
        if self.line.first() != Some(&b'@') {
            return Err(self.malformed(index, start, "expected '@' at start of record"));
        }
        self.name.clear();
        self.name.extend_from_slice(&trim_eol(&self.line)[1..]);

        if self.read_line()? == 0 {
            return Err(self.malformed(index, start, "truncated before sequence line"));
        }
        let seq_len = trim_eol(&self.line).len();

        if self.read_line()? == 0 {
            return Err(self.malformed(index, start, "truncated before '+' line"));
        }
        if self.line.first() != Some(&b'+') {
            return Err(self.malformed(index, start, "expected '+' separator line"));
        }

        if self.read_line()? == 0 {
            return Err(self.malformed(index, start, "truncated before quality line"));
        }
        let qual_len = trim_eol(&self.line).len();
        if qual_len != seq_len {
            return Err(self.malformed(
                index,
                start,
                &format!("quality length {} does not match sequence length {}", qual_len, seq_len),
            ));
        }

        self.next_index += 1;
        Ok(Some(RecordSpan {
            index,
            offset: start,
            len: self.offset - start,
        }))
    }

    fn read_line(&mut self) -> MerosResult<usize> {
        self.line.clear();
        let n = self.reader.read_until(b'\n', &mut self.line)?;
        self.offset += n as u64;
        Ok(n)
    }

    fn malformed(&self, index: u64, offset: u64, what: &str) -> MerosError {
        MerosError::malformed(format!(
            "{}: record {} at byte {}: {}",
            self.source, index, offset, what
        ))
    }
}

fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Read name shared by both mates: text before the first whitespace, minus a `/1` or `/2` suffix
pub fn mate_stem(name: &[u8]) -> &[u8] {
    let end = name
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(name.len());
    let id = &name[..end];
    id.strip_suffix(b"/1")
        .or_else(|| id.strip_suffix(b"/2"))
        .unwrap_or(id)
}

/// Copy the bytes of `range` into a new file at `dest`, returning the byte count
pub fn extract_range(range: &ReadRange, dest: &Path) -> io::Result<u64> {
    let mut source = File::open(&range.path)?;
    source.seek(SeekFrom::Start(range.start))?;

    let mut writer = BufWriter::new(File::create(dest)?);
    let copied = io::copy(&mut source.take(range.byte_len()), &mut writer)?;
    writer.flush()?;

    if copied != range.byte_len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "{} ended after {} of {} bytes",
                range.path.display(),
                copied,
                range.byte_len()
            ),
        ));
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn scan_all(data: &[u8]) -> MerosResult<Vec<RecordSpan>> {
        let mut scanner = FastqScanner::new(Cursor::new(data.to_vec()), "test.fq");
        let mut spans = Vec::new();
        while let Some(span) = scanner.next_record()? {
            spans.push(span);
        }
        Ok(spans)
    }

    #[test]
    fn test_scans_record_offsets() {
        let data = b"@r0\nACGT\n+\nIIII\n@r1\nAC\n+r1\nII\n";
        let spans = scan_all(data).unwrap();
        assert_eq!(
            spans,
            vec![
                RecordSpan { index: 0, offset: 0, len: 16 },
                RecordSpan { index: 1, offset: 16, len: 14 },
            ]
        );
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let data = b"@r0\r\nACGT\r\n+\r\nIIII\r\n@r1\nAC\n+\nII";
        let spans = scan_all(data).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].end(), data.len() as u64);
    }

    #[test]
    fn test_trailing_blank_lines_are_ignored() {
        let data = b"@r0\nACGT\n+\nIIII\n\n\n";
        assert_eq!(scan_all(data).unwrap().len(), 1);
    }

    #[test]
    fn test_blank_line_between_records_is_malformed() {
        let data = b"@r0\nACGT\n+\nIIII\n\n@r1\nAC\n+\nII\n";
        let err = scan_all(data).unwrap_err();
        assert!(err.to_string().contains("blank line between records"));
    }

    #[test]
    fn test_not_record_aligned() {
        // Starts in the middle of a record
        let data = b"ACGT\n+\nIIII\n@r1\nAC\n+\nII\n";
        let err = scan_all(data).unwrap_err();
        assert!(matches!(err, MerosError::MalformedInput(_)));
        assert!(err.to_string().contains("record 0 at byte 0"));
    }

    #[test]
    fn test_missing_separator() {
        let data = b"@r0\nACGT\nIIII\n@r1\n";
        let err = scan_all(data).unwrap_err();
        assert!(err.to_string().contains("'+' separator"));
    }

    #[test]
    fn test_quality_length_mismatch() {
        let data = b"@r0\nACGT\n+\nIII\n";
        let err = scan_all(data).unwrap_err();
        assert!(err.to_string().contains("quality length 3"));
    }

    #[test]
    fn test_truncated_record() {
        let data = b"@r0\nACGT\n+\nIIII\n@r1\nACGT\n";
        let err = scan_all(data).unwrap_err();
        assert!(err.to_string().contains("record 1 at byte 16"));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_name_and_mate_stem() {
        let mut scanner =
            FastqScanner::new(Cursor::new(b"@frag7/2 extra words\nA\n+\nI\n".to_vec()), "t");
        scanner.next_record().unwrap();
        assert_eq!(scanner.name(), b"frag7/2 extra words");
        assert_eq!(mate_stem(scanner.name()), b"frag7");
        assert_eq!(mate_stem(b"frag7 1:N:0:ATCACG"), b"frag7");
        assert_eq!(mate_stem(b"frag7/3"), b"frag7/3");
    }

    #[test]
    fn test_extract_range() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.fq");
        std::fs::write(&input, b"@r0\nACGT\n+\nIIII\n@r1\nAC\n+\nII\n").unwrap();

        let range = ReadRange {
            path: input,
            start: 16,
            end: 28,
            first_record: 1,
            record_count: 1,
        };
        let dest = dir.path().join("part.fq");
        assert_eq!(extract_range(&range, &dest).unwrap(), 12);
        assert_eq!(std::fs::read(&dest).unwrap(), b"@r1\nAC\n+\nII\n");
    }

    #[test]
    fn test_extract_range_past_end_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.fq");
        std::fs::write(&input, b"@r0\nACGT\n+\nIIII\n").unwrap();

        let range = ReadRange {
            path: input,
            start: 0,
            end: 64,
            first_record: 0,
            record_count: 4,
        };
        let err = extract_range(&range, &dir.path().join("out.fq")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
