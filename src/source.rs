use crate::error::{Error, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

const LARGE_FILE_THRESHOLD: usize = 1024 * 1024;

pub struct MmapFileReader {
    _file: File,
    mmap: Mmap,
}

impl MmapFileReader {
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the map is read once into an owned String and dropped; a
        // concurrent writer can at worst produce invalid UTF-8, which is checked.
        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Self { _file: file, mmap })
    }

    pub fn as_str(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.mmap)
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn is_large_file(&self) -> bool {
        self.len() > LARGE_FILE_THRESHOLD
    }
}

const BYTE_ORDER_MARK: char = '\u{feff}';

/// The text of a source file, without the byte order mark it may have had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub text: String,
    pub has_bom: bool,
}

impl SourceFile {
    pub fn new(content: String) -> Self {
        match content.strip_prefix(BYTE_ORDER_MARK) {
            Some(stripped) => Self {
                text: stripped.to_string(),
                has_bom: true,
            },
            None => Self {
                text: content,
                has_bom: false,
            },
        }
    }

    /// File contents for `text`, with the byte order mark restored if the
    /// file was read with one.
    pub fn contents(&self, text: &str) -> String {
        if self.has_bom {
            let mut contents = String::with_capacity(text.len() + BYTE_ORDER_MARK.len_utf8());
            contents.push(BYTE_ORDER_MARK);
            contents.push_str(text);
            contents
        } else {
            text.to_string()
        }
    }
}

/// Reads a source file, through a memory map when it is large and
/// `memory_mapped` is set.
pub fn read_source_file(path: &Path, memory_mapped: bool) -> Result<SourceFile> {
    let content = match memory_mapped.then(|| MmapFileReader::new(path)) {
        Some(Ok(reader)) if reader.is_large_file() => reader
            .as_str()
            .map(str::to_string)
            .map_err(|e| Error::io(path, io::Error::new(io::ErrorKind::InvalidData, e)))?,
        _ => std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?,
    };

    Ok(SourceFile::new(content))
}
