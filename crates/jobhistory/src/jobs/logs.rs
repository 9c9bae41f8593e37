use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{HistoryError, Result};

pub const DEFAULT_LOG_TAIL_LINES: usize = 100;

const CHUNK_SIZE: usize = 8 * 1024;

/// Returns the last lines of an attempt log, oldest first.
#[async_trait]
pub trait LogTailReader: Send + Sync {
    async fn read_tail(&self, path: &Path, max_lines: usize) -> Result<Vec<String>>;
}

/// Reads attempt logs from the local filesystem.
///
/// Relative log paths are resolved against `root` when one is configured.
#[derive(Debug, Clone, Default)]
pub struct FsLogTailReader {
    root: Option<PathBuf>,
}

impl FsLogTailReader {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl LogTailReader for FsLogTailReader {
    async fn read_tail(&self, path: &Path, max_lines: usize) -> Result<Vec<String>> {
        let path = self.resolve(path);

        // not cancellable once started; a dropped caller only stops waiting
        let blocking_path = path.clone();
        let lines = tokio::task::spawn_blocking(move || {
            let file = File::open(&blocking_path)?;
            tail_lines(file, max_lines)
        })
        .await
        .map_err(|e| HistoryError::log_unavailable(&path, io::Error::other(e)))?
        .map_err(|e| HistoryError::log_unavailable(&path, e))?;

        tracing::trace!(path = %path.display(), lines = lines.len(), "read log tail");
        Ok(lines)
    }
}

/// Last `max_lines` lines of `reader`, reading backwards from the end so the
/// cost follows the size of the tail rather than the whole log.
pub fn tail_lines<R: Read + Seek>(reader: R, max_lines: usize) -> io::Result<Vec<String>> {
    tail_lines_chunked(reader, max_lines, CHUNK_SIZE)
}

fn tail_lines_chunked<R: Read + Seek>(
    mut reader: R,
    max_lines: usize,
    chunk_size: usize,
) -> io::Result<Vec<String>> {
    if max_lines == 0 {
        return Ok(Vec::new());
    }

    let len = reader.seek(SeekFrom::End(0))?;
    let mut pos = len;
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    // newlines seen, not counting one that terminates the file
    let mut newlines = 0usize;

    while pos > 0 && newlines < max_lines {
        let read_len = (chunk_size as u64).min(pos) as usize;
        pos -= read_len as u64;

        let mut chunk = vec![0u8; read_len];
        reader.seek(SeekFrom::Start(pos))?;
        reader.read_exact(&mut chunk)?;

        let mut counted = chunk.iter().filter(|b| **b == b'\n').count();
        if chunks.is_empty() && chunk.last() == Some(&b'\n') {
            counted -= 1;
        }
        newlines += counted;
        chunks.push(chunk);
    }

    let bytes: Vec<u8> = chunks.into_iter().rev().flatten().collect();
    let text = String::from_utf8_lossy(&bytes);

    // when the read stopped early the first segment may be a partial line,
    // but at least `max_lines` complete lines follow it
    let lines: Vec<&str> = text.lines().collect();
    let skip = lines.len().saturating_sub(max_lines);
    Ok(lines[skip..].iter().map(|l| l.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn keeps_last_lines_in_order() {
        let out = tail_lines(Cursor::new(numbered(150)), 100).unwrap();
        assert_eq!(out.len(), 100);
        assert_eq!(out.first().unwrap(), "line 51");
        assert_eq!(out.last().unwrap(), "line 150");
    }

    #[test]
    fn short_log_is_returned_whole() {
        let out = tail_lines(Cursor::new(numbered(3)), 100).unwrap();
        assert_eq!(out, vec!["line 1", "line 2", "line 3"]);
    }

    #[test]
    fn missing_final_newline_keeps_last_line() {
        let out = tail_lines(Cursor::new("a\nb\nc"), 2).unwrap();
        assert_eq!(out, vec!["b", "c"]);
    }

    #[test]
    fn empty_log_has_no_lines() {
        assert!(tail_lines(Cursor::new(""), 100).unwrap().is_empty());
        assert!(tail_lines(Cursor::new(numbered(5)), 0).unwrap().is_empty());
    }

    #[test]
    fn strips_carriage_returns() {
        let out = tail_lines(Cursor::new("one\r\ntwo\r\n"), 10).unwrap();
        assert_eq!(out, vec!["one", "two"]);
    }

    #[test]
    fn small_chunks_do_not_split_lines() {
        let log = numbered(40);
        for chunk_size in [1, 3, 7, 16] {
            let out = tail_lines_chunked(Cursor::new(log.clone()), 5, chunk_size).unwrap();
            assert_eq!(
                out,
                vec!["line 36", "line 37", "line 38", "line 39", "line 40"],
                "chunk size {chunk_size}"
            );
        }
    }

    #[test]
    fn chunk_larger_than_log_reads_it_whole() {
        let out = tail_lines_chunked(Cursor::new(numbered(3)), 10, usize::MAX).unwrap();
        assert_eq!(out, vec!["line 1", "line 2", "line 3"]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let out = tail_lines(Cursor::new(b"ok\n\xff\xfe bad\n".to_vec()), 10).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], "ok");
        assert!(out[1].ends_with(" bad"));
    }

    #[tokio::test]
    async fn fs_reader_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("attempt.log")).unwrap();
        write!(f, "{}", numbered(2)).unwrap();

        let reader = FsLogTailReader::new(Some(dir.path().to_path_buf()));
        let out = reader.read_tail(Path::new("attempt.log"), 10).await.unwrap();
        assert_eq!(out, vec!["line 1", "line 2"]);
    }

    #[tokio::test]
    async fn fs_reader_reports_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.log");

        let err = FsLogTailReader::default()
            .read_tail(&missing, 10)
            .await
            .unwrap_err();
        match err {
            HistoryError::LogUnavailable { path, source } => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
