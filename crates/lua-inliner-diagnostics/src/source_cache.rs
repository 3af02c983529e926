//! Source file cache for diagnostic rendering.

use crate::span::{FileId, Location, Span};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A registered source file with precomputed line starts.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub source: String,
    /// Byte offset of the first character of every line.
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(id: FileId, path: PathBuf, source: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                source
                    .bytes()
                    .enumerate()
                    .filter(|&(_, b)| b == b'\n')
                    .map(|(i, _)| (i + 1) as u32),
            )
            .collect();
        Self {
            id,
            path,
            source,
            line_starts,
        }
    }

    /// 1-based line and column of a byte offset. Columns count bytes.
    pub fn line_column(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);
        let index = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[index];
        ((index + 1) as u32, offset - line_start + 1)
    }

    /// Text of a 1-based line without its line terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let index = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(index)? as usize;
        let end = self
            .line_starts
            .get(index + 1)
            .map_or(self.source.len(), |&end| end as usize);
        Some(self.source[start..end].trim_end_matches(['\n', '\r']))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn slice(&self, start: u32, end: u32) -> Option<&str> {
        self.source.get(start as usize..end as usize)
    }
}

/// Every file that has been read during a run, keyed by [`FileId`].
#[derive(Debug, Default)]
pub struct SourceCache {
    files: HashMap<FileId, SourceFile>,
    by_path: HashMap<PathBuf, FileId>,
    next_id: u32,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id.
    ///
    /// Adding the same path twice replaces the text but keeps the id, so a
    /// file rewritten in place and re-checked still resolves locations
    /// against its current contents.
    pub fn add_file(&mut self, path: impl AsRef<Path>, source: String) -> FileId {
        let path = path.as_ref().to_path_buf();
        let id = match self.by_path.get(&path) {
            Some(&id) => id,
            None => {
                let id = FileId(self.next_id);
                self.next_id += 1;
                self.by_path.insert(path.clone(), id);
                id
            }
        };
        self.files.insert(id, SourceFile::new(id, path, source));
        id
    }

    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(&id)
    }

    pub fn get_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        self.by_path.get(path.as_ref()).copied()
    }

    /// Resolve the start of a span. Dummy spans never resolve.
    pub fn location(&self, span: Span) -> Option<Location> {
        if span.is_dummy() {
            return None;
        }
        let file = self.files.get(&span.file_id)?;
        let (line, column) = file.line_column(span.start);
        Some(Location {
            file: file.path.to_string_lossy().into_owned(),
            line,
            column,
        })
    }

    /// Source text covered by a span.
    pub fn source_text(&self, span: Span) -> Option<&str> {
        if span.is_dummy() {
            return None;
        }
        self.files.get(&span.file_id)?.slice(span.start, span.end)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("main.lua", "local a = 1\nreturn a\n".to_string());
        let file = cache.get_file(id).unwrap();

        assert_eq!(file.line_count(), 3);
        assert_eq!(file.line_column(0), (1, 1));
        assert_eq!(file.line_column(6), (1, 7));
        assert_eq!(file.line_column(12), (2, 1));
        assert_eq!(file.line_column(19), (2, 8));
        // Past the end clamps to the final position.
        assert_eq!(file.line_column(500), (3, 1));
    }

    #[test]
    fn test_line_text_strips_crlf() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("crlf.lua", "print(1)\r\nprint(2)".to_string());
        let file = cache.get_file(id).unwrap();

        assert_eq!(file.line_text(1), Some("print(1)"));
        assert_eq!(file.line_text(2), Some("print(2)"));
        assert_eq!(file.line_text(3), None);
        assert_eq!(file.line_text(0), None);
    }

    #[test]
    fn test_location_and_source_text() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("lib/util.lua", "local x = 42\nlocal y = x".to_string());

        let loc = cache.location(Span::new(id, 19, 20)).unwrap();
        assert_eq!(loc.to_string(), "lib/util.lua:2:7");
        assert_eq!(cache.source_text(Span::new(id, 6, 7)), Some("x"));
        assert_eq!(cache.location(Span::DUMMY), None);
    }

    #[test]
    fn test_re_adding_a_path_keeps_the_id() {
        let mut cache = SourceCache::new();
        let first = cache.add_file("a.lua", "return 1".to_string());
        let other = cache.add_file("b.lua", "return 2".to_string());
        let again = cache.add_file("a.lua", "return 3".to_string());

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_file(first).unwrap().source, "return 3");
        assert_eq!(cache.get_id("b.lua"), Some(other));
    }
}
