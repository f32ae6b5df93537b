use std::io::BufRead;

use crate::error::{Result, TailmapError};

#[derive(Debug, Clone)]
pub struct FastqRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

/// 流式 FASTQ 解析器，四行一条；不支持折行序列。
/// 格式错误返回 `BadInput`，调用方可以计数后跳过继续读下一条。
pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), done: false }
    }

    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        if self.done {
            return Ok(None);
        }

        // header line starting with '@'; tolerate blank lines between records
        let header = loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf)?;
            if n == 0 {
                self.done = true;
                return Ok(None);
            }
            let line = self.buf.trim_end();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix('@') {
                break rest.to_string();
            }
            return Err(TailmapError::BadInput(format!(
                "FASTQ header not starting with '@': {:?}",
                line
            )));
        };
        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        // sequence line
        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 {
            return Err(TailmapError::BadInput("unexpected EOF after FASTQ header".into()));
        }
        let seq = self.buf.trim_end().as_bytes().to_vec();

        // plus line
        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 || !self.buf.starts_with('+') {
            return Err(TailmapError::BadInput("missing '+' line".into()));
        }

        // quality line
        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 {
            return Err(TailmapError::BadInput("missing quality line".into()));
        }
        let qual = self.buf.trim_end().as_bytes().to_vec();

        if qual.len() != seq.len() {
            return Err(TailmapError::BadInput(format!(
                "seq/qual length mismatch for read {:?}",
                id
            )));
        }

        Ok(Some(FastqRecord { id, desc, seq, qual }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_simple_fastq() {
        let data = b"@r1 desc\nACGT\n+\nIIII\n@r2\nAA\n+\nII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "r1");
        assert_eq!(r1.desc.as_deref(), Some("desc"));
        assert_eq!(r1.seq, b"ACGT");
        assert_eq!(r1.qual, b"IIII");

        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "r2");
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn length_mismatch_is_bad_input() {
        let data = b"@r1\nACGT\n+\nII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        assert!(matches!(r.next_record(), Err(TailmapError::BadInput(_))));
    }

    #[test]
    fn missing_plus_is_bad_input() {
        let data = b"@r1\nACGT\nIIII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        assert!(matches!(r.next_record(), Err(TailmapError::BadInput(_))));
    }

    #[test]
    fn parse_continues_after_bad_record() {
        let data = b"@r1\nACGT\n+\nII\n@r2\nAA\n+\nII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        assert!(r.next_record().is_err());
        // the reader stays usable; the next pull resynchronizes on the following '@'
        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "r2");
    }
}
