use std::path::{Path, PathBuf};

use tokio::fs;

/// List the files directly inside `folder` whose extension is in `extensions`
/// (lower-case, no dot), sorted by file name. An empty `extensions` lists
/// every file.
pub async fn scan_folder(folder: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, std::io::Error> {
  let mut entries = fs::read_dir(folder).await?;
  let mut files = Vec::new();

  while let Some(entry) = entries.next_entry().await? {
    if !entry.file_type().await?.is_file() {
      continue;
    }

    let path = entry.path();
    let matches = extensions.is_empty()
      || path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| ext.eq_ignore_ascii_case(wanted)));

    if matches {
      files.push(path);
    }
  }

  files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
  Ok(files)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_scan_filters_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.PNG", "a.jpg", "notes.txt", "c.png"] {
      std::fs::write(dir.path().join(name), b"x").unwrap();
    }
    std::fs::create_dir(dir.path().join("nested.png")).unwrap();

    let files = scan_folder(dir.path(), &["png".to_string(), "jpg".to_string()])
      .await
      .unwrap();
    let names: Vec<String> = files
      .iter()
      .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
      .collect();

    assert_eq!(names, vec!["a.jpg", "b.PNG", "c.png"]);
  }

  #[tokio::test]
  async fn test_scan_without_extensions_lists_all_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("z.txt"), b"x").unwrap();
    std::fs::write(dir.path().join("README"), b"x").unwrap();

    let files = scan_folder(dir.path(), &[]).await.unwrap();

    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("README"));
  }

  #[tokio::test]
  async fn test_scan_missing_folder() {
    let dir = tempfile::tempdir().unwrap();
    assert!(scan_folder(&dir.path().join("missing"), &[]).await.is_err());
  }
}
