//! Non-recursive directory listing.

use std::io;
use std::path::{Path, PathBuf};

use super::ExecError;

const DIRECTORY_MARKER: &str = "📁";
const FILE_MARKER: &str = "📄";
const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB"];

/// Render a byte count with one decimal, dividing by 1024 per unit step.
pub fn format_size(size: u64) -> String {
    let mut size = size as f64;
    for unit in SIZE_UNITS {
        if size < 1024.0 {
            return format!("{size:.1}{unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1}TB")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_directory: bool,
    /// `None` for directories.
    pub size_bytes: Option<u64>,
}

impl ListingEntry {
    pub fn label(&self) -> String {
        match self.size_bytes {
            _ if self.is_directory => format!("{DIRECTORY_MARKER} {}/", self.name),
            Some(size) => format!("{FILE_MARKER} {} ({})", self.name, format_size(size)),
            None => format!("{FILE_MARKER} {}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingBody {
    Entries(Vec<ListingEntry>),
    PermissionDenied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    pub absolute_path: PathBuf,
    pub body: ListingBody,
}

impl DirectoryListing {
    pub fn render(&self) -> String {
        let mut out = format!("Directory listing: {}\n", self.absolute_path.display());
        out.push_str(&"=".repeat(50));
        out.push('\n');

        match &self.body {
            ListingBody::PermissionDenied => {
                out.push_str("No permission to access this directory.");
            }
            ListingBody::Entries(entries) if entries.is_empty() => {
                out.push_str("(empty directory)");
            }
            ListingBody::Entries(entries) => {
                let mut labels: Vec<String> = entries.iter().map(ListingEntry::label).collect();
                labels.sort();
                out.push_str(&labels.join("\n"));
            }
        }
        out
    }
}

/// Resolve `path` and read its direct children. A blank path lists `.`.
pub async fn read_listing(path: &str) -> Result<DirectoryListing, ExecError> {
    let path = if path.trim().is_empty() { "." } else { path };
    let absolute_path = std::path::absolute(Path::new(path))?;

    let metadata = match tokio::fs::metadata(&absolute_path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ExecError::PathNotFound(path.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_dir() {
        return Err(ExecError::NotADirectory(path.to_string()));
    }

    let body = match read_entries(&absolute_path).await {
        Ok(entries) => ListingBody::Entries(entries),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            log::warn!("Permission denied listing {}", absolute_path.display());
            ListingBody::PermissionDenied
        }
        Err(e) => return Err(e.into()),
    };

    Ok(DirectoryListing {
        absolute_path,
        body,
    })
}

async fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        // Follow symlinks like a shell listing would; dangling links fall back
        // to the link itself.
        let metadata = match tokio::fs::metadata(entry.path()).await {
            Ok(metadata) => metadata,
            Err(_) => entry.metadata().await?,
        };

        let is_directory = metadata.is_dir();
        entries.push(ListingEntry {
            name,
            is_directory,
            size_bytes: (!is_directory).then_some(metadata.len()),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0.0B");
        assert_eq!(format_size(1023), "1023.0B");
        assert_eq!(format_size(1024), "1.0KB");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(1_048_576), "1.0MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0GB");
        assert_eq!(format_size(3 * 1024_u64.pow(4)), "3.0TB");
        assert_eq!(format_size(2048 * 1024_u64.pow(4)), "2048.0TB");
    }

    #[tokio::test]
    async fn test_listing_renders_sizes_and_sorts_labels() {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, size) in [("d.bin", 1_048_576), ("a.txt", 0), ("c.bin", 1024), ("b.txt", 1023)] {
            std::fs::write(dir.path().join(name), vec![0u8; size]).expect("write");
        }
        std::fs::create_dir(dir.path().join("zeta")).expect("mkdir");
        std::fs::create_dir(dir.path().join("alpha")).expect("mkdir");

        let listing = read_listing(dir.path().to_str().expect("utf-8 path"))
            .await
            .expect("listing");
        let rendered = listing.render();
        let body: Vec<&str> = rendered.lines().skip(2).collect();

        assert_eq!(
            body,
            vec![
                "📁 alpha/",
                "📁 zeta/",
                "📄 a.txt (0.0B)",
                "📄 b.txt (1023.0B)",
                "📄 c.bin (1.0KB)",
                "📄 d.bin (1.0MB)",
            ]
        );
        assert!(rendered.starts_with("Directory listing: "));
        assert_eq!(rendered.lines().nth(1), Some("=".repeat(50).as_str()));
    }

    #[tokio::test]
    async fn test_listing_is_not_recursive() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("nested")).expect("mkdir");
        std::fs::write(dir.path().join("nested").join("hidden.txt"), b"x").expect("write");

        let listing = read_listing(dir.path().to_str().expect("utf-8 path"))
            .await
            .expect("listing");
        let ListingBody::Entries(entries) = &listing.body else {
            panic!("expected entries");
        };
        assert_eq!(entries.len(), 1);
        assert!(!listing.render().contains("hidden.txt"));
    }

    #[tokio::test]
    async fn test_empty_directory_is_explicit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let listing = read_listing(dir.path().to_str().expect("utf-8 path"))
            .await
            .expect("listing");
        assert!(listing.render().ends_with("(empty directory)"));
    }

    #[tokio::test]
    async fn test_missing_path_and_file_path_are_distinct_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing");
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"data").expect("write");

        let missing_err = read_listing(missing.to_str().expect("utf-8 path"))
            .await
            .expect_err("missing path");
        let file_err = read_listing(file.to_str().expect("utf-8 path"))
            .await
            .expect_err("file path");

        assert!(matches!(missing_err, ExecError::PathNotFound(_)));
        assert!(matches!(file_err, ExecError::NotADirectory(_)));
        assert_ne!(missing_err.to_string(), file_err.to_string());
    }

    #[test]
    fn test_permission_denied_keeps_header() {
        let listing = DirectoryListing {
            absolute_path: PathBuf::from("/root/secret"),
            body: ListingBody::PermissionDenied,
        };
        let rendered = listing.render();
        assert!(rendered.starts_with("Directory listing: /root/secret\n"));
        assert!(rendered.ends_with("No permission to access this directory."));
    }

    #[tokio::test]
    async fn test_blank_path_lists_current_directory() {
        let cwd = std::env::current_dir().expect("cwd");
        let listing = read_listing("").await.expect("listing");
        assert_eq!(listing.absolute_path, cwd);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_directory_renders_permission_note() {
        use std::os::unix::fs::PermissionsExt;

        // SAFETY: geteuid has no preconditions.
        if unsafe { libc::geteuid() } == 0 {
            // root bypasses directory permissions
            return;
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).expect("mkdir");
        std::fs::write(locked.join("inside.txt"), b"x").expect("write");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).expect("chmod");

        let result = read_listing(locked.to_str().expect("utf-8 path")).await;

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let listing = result.expect("listing");
        assert_eq!(listing.body, ListingBody::PermissionDenied);
        let rendered = listing.render();
        assert!(
            rendered.starts_with(&format!("Directory listing: {}\n", locked.display())),
            "{rendered}"
        );
        assert!(rendered.ends_with("No permission to access this directory."), "{rendered}");
        assert!(!rendered.contains("inside.txt"));
    }
}
