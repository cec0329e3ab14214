use crate::utils::error::Result;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

pub const ARCHIVE_FILE_NAME: &str = "output_images.zip";

/// 記憶體中的橫幅壓縮檔
pub struct BannerArchive {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
}

impl BannerArchive {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
        }
    }

    /// 新增一個項目；`name` 已存在時不寫入並回傳 `false`
    pub fn add(&mut self, name: &str, data: &[u8]) -> Result<bool> {
        if !self.names.insert(name.to_string()) {
            return Ok(false);
        }

        // PNG 本身已壓縮
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.zip.start_file(name, options)?;
        self.zip.write_all(data)?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let cursor = self.zip.finish()?;
        Ok(cursor.into_inner())
    }
}

impl Default for BannerArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_entries_are_written_in_order() {
        let mut archive = BannerArchive::new();
        assert!(archive.add("b.com/b.com_1200x1200.png", b"one").unwrap());
        assert!(archive.add("a.com/a.com_1200x628.png", b"two").unwrap());

        let bytes = archive.finish().unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 2);
        assert_eq!(zip.by_index(0).unwrap().name(), "b.com/b.com_1200x1200.png");

        let mut content = String::new();
        zip.by_name("a.com/a.com_1200x628.png")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "two");
    }

    #[test]
    fn test_duplicate_entry_is_skipped() {
        let mut archive = BannerArchive::new();
        assert!(archive.add("a.com/a.com_1200x628.png", b"first").unwrap());
        assert!(!archive.add("a.com/a.com_1200x628.png", b"second").unwrap());
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_empty_archive_is_valid_zip() {
        let archive = BannerArchive::new();
        assert!(archive.is_empty());
        let bytes = archive.finish().unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 0);
    }
}
