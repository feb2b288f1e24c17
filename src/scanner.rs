//! 誤答写真のスキャン

use crate::error::{MistakeReviewError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
}

impl ImageInfo {
    /// 単一ファイルから作成（拡張子が画像でなければエラー）
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(MistakeReviewError::FileNotFound(path.display().to_string()));
        }
        if !has_image_extension(path) {
            return Err(MistakeReviewError::NoImagesFound(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            file_name: file_name_of(path),
        })
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// フォルダ内の画像を列挙（ファイル名順）
///
/// `recursive` が false の場合は直下のみ。
pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<ImageInfo>> {
    if !folder.is_dir() {
        return Err(MistakeReviewError::FolderNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut images: Vec<ImageInfo> = WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_image_extension(e.path()))
        .map(|e| ImageInfo {
            path: e.path().to_path_buf(),
            file_name: file_name_of(e.path()),
        })
        .collect();

    images.sort_by(|a, b| a.file_name.cmp(&b.file_name).then_with(|| a.path.cmp(&b.path)));

    Ok(images)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_has_image_extension() {
        assert!(has_image_extension(Path::new("a.jpg")));
        assert!(has_image_extension(Path::new("a.JPG")));
        assert!(has_image_extension(Path::new("a.jpeg")));
        assert!(has_image_extension(Path::new("a.png")));
        assert!(!has_image_extension(Path::new("a.txt")));
        assert!(!has_image_extension(Path::new("a.pdf")));
        assert!(!has_image_extension(Path::new("noext")));
    }

    #[test]
    fn test_scan_folder_not_found() {
        let result = scan_folder(Path::new("/nonexistent/folder"), false);
        assert!(matches!(result, Err(MistakeReviewError::FolderNotFound(_))));
    }

    #[test]
    fn test_scan_folder_with_images() {
        let dir = tempdir().unwrap();

        File::create(dir.path().join("test1.jpg")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("test2.JPG")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("test3.png")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("readme.txt")).unwrap().write_all(b"text").unwrap();

        let result = scan_folder(dir.path(), false).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].file_name, "test1.jpg");
        assert_eq!(result[1].file_name, "test2.JPG");
        assert_eq!(result[2].file_name, "test3.png");
    }

    #[test]
    fn test_scan_folder_recursive() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("week2");
        fs::create_dir_all(&sub).unwrap();

        File::create(dir.path().join("b.jpg")).unwrap();
        File::create(sub.join("a.jpg")).unwrap();

        assert_eq!(scan_folder(dir.path(), false).unwrap().len(), 1);

        let result = scan_folder(dir.path(), true).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].file_name, "a.jpg");
        assert_eq!(result[1].file_name, "b.jpg");
    }

    #[test]
    fn test_image_info_from_path() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("q.png");
        let text = dir.path().join("q.txt");
        File::create(&image).unwrap();
        File::create(&text).unwrap();

        assert_eq!(ImageInfo::from_path(&image).unwrap().file_name, "q.png");
        assert!(matches!(ImageInfo::from_path(&text), Err(MistakeReviewError::NoImagesFound(_))));
        assert!(matches!(
            ImageInfo::from_path(&dir.path().join("missing.jpg")),
            Err(MistakeReviewError::FileNotFound(_))
        ));
    }
}
