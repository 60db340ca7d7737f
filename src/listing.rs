//! Directory listing model.

use crate::fs::ChildEntry;

const SIZE_UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One row of a listing. Directories carry no size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: Option<String>,
}

/// Immediate children of one directory: directories first, then files, each
/// group ordered by byte-wise name comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    path: String,
    dirs: Vec<ListingEntry>,
    files: Vec<ListingEntry>,
}

impl DirectoryListing {
    pub fn build(path: impl Into<String>, children: impl IntoIterator<Item = ChildEntry>) -> Self {
        let (mut dirs, mut files): (Vec<_>, Vec<_>) =
            children.into_iter().partition(|child| child.is_dir);

        // `str` ordering is byte-wise: no locale, no case folding.
        dirs.sort_by(|a, b| a.name.cmp(&b.name));
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            path: path.into(),
            dirs: dirs
                .into_iter()
                .map(|child| ListingEntry {
                    name: child.name,
                    kind: EntryKind::Directory,
                    size: None,
                })
                .collect(),
            files: files
                .into_iter()
                .map(|child| ListingEntry {
                    size: Some(format_size(child.size)),
                    name: child.name,
                    kind: EntryKind::File,
                })
                .collect(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn dirs(&self) -> &[ListingEntry] {
        &self.dirs
    }

    pub fn files(&self) -> &[ListingEntry] {
        &self.files
    }

    /// All entries in display order.
    pub fn entries(&self) -> impl Iterator<Item = &ListingEntry> {
        self.dirs.iter().chain(self.files.iter())
    }
}

/// Human-readable size using decimal (1000-based) units.
///
/// Values below ten units keep one decimal place (`1.5 MB`), larger values
/// are rounded to a whole number (`12 kB`); plain byte counts are exact.
pub fn format_size(bytes: u64) -> String {
    let mut exponent = 0;
    let mut unit = 1u64;
    while exponent + 1 < SIZE_UNITS.len() && bytes / unit >= 1000 {
        unit *= 1000;
        exponent += 1;
    }

    if exponent == 0 {
        return format!("{} B", bytes);
    }

    let value = (bytes as f64 / unit as f64 * 10.0 + 0.5).floor() / 10.0;
    if value < 10.0 {
        format!("{:.1} {}", value, SIZE_UNITS[exponent])
    } else {
        format!("{:.0} {}", value, SIZE_UNITS[exponent])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[ListingEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(999), "999 B");
        assert_eq!(format_size(1000), "1.0 kB");
        assert_eq!(format_size(1500), "1.5 kB");
        assert_eq!(format_size(12_345), "12 kB");
        assert_eq!(format_size(1_500_000), "1.5 MB");
        assert_eq!(format_size(1_000_000_000), "1.0 GB");
        assert_eq!(format_size(u64::MAX), "18 EB");
    }

    #[test]
    fn test_directories_first_then_bytewise_names() {
        let listing = DirectoryListing::build(
            "/",
            vec![
                ChildEntry::file("b.txt", 1),
                ChildEntry::file("a.txt", 2),
                ChildEntry::file("Z", 3),
                ChildEntry::file("A", 4),
                ChildEntry::directory("m"),
            ],
        );

        let order: Vec<&str> = listing.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(order, vec!["m", "A", "Z", "a.txt", "b.txt"]);
        assert_eq!(names(listing.dirs()), vec!["m"]);
        assert_eq!(names(listing.files()), vec!["A", "Z", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_only_files_have_sizes() {
        let listing = DirectoryListing::build(
            "/docs",
            vec![ChildEntry::directory("sub"), ChildEntry::file("readme.txt", 500)],
        );

        assert_eq!(listing.path(), "/docs");
        assert_eq!(
            listing.dirs(),
            &[ListingEntry {
                name: "sub".to_string(),
                kind: EntryKind::Directory,
                size: None,
            }]
        );
        assert_eq!(listing.files()[0].kind, EntryKind::File);
        assert_eq!(listing.files()[0].size.as_deref(), Some("500 B"));
    }

    #[test]
    fn test_empty_directory() {
        let listing = DirectoryListing::build("/empty", Vec::new());
        assert!(listing.dirs().is_empty());
        assert!(listing.files().is_empty());
    }

    #[test]
    fn test_ordering_is_independent_of_input_order() {
        let children = vec![
            ChildEntry::file("c", 1),
            ChildEntry::directory("b"),
            ChildEntry::file("a", 1),
            ChildEntry::directory("B"),
        ];
        let mut reversed = children.clone();
        reversed.reverse();

        assert_eq!(
            DirectoryListing::build("/", children),
            DirectoryListing::build("/", reversed)
        );
    }
}
