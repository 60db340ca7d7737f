//! HTML rendering of directory listings.
//!
//! Rendering is a pure function of the [`DirectoryListing`]; the same listing
//! always produces the same bytes.

use askama::Template;

use crate::listing::{DirectoryListing, ListingEntry};

struct Row<'a> {
    name: &'a str,
    /// Absolute, percent-encoded link target.
    href: String,
    size: &'a str,
}

#[derive(Template)]
#[template(path = "directory.html")]
struct DirectoryPage<'a> {
    path: &'a str,
    parent: Option<String>,
    dirs: Vec<Row<'a>>,
    files: Vec<Row<'a>>,
}

pub fn render_listing(listing: &DirectoryListing) -> Result<String, askama::Error> {
    let base = encode_path(listing.path());

    let page = DirectoryPage {
        path: listing.path(),
        parent: parent_href(listing.path()),
        dirs: listing
            .dirs()
            .iter()
            .map(|entry| row(&base, entry, "/"))
            .collect(),
        files: listing
            .files()
            .iter()
            .map(|entry| row(&base, entry, ""))
            .collect(),
    };

    page.render()
}

fn row<'a>(base: &str, entry: &'a ListingEntry, suffix: &str) -> Row<'a> {
    Row {
        name: &entry.name,
        href: format!("{}/{}{}", base, urlencoding::encode(&entry.name), suffix),
        size: entry.size.as_deref().unwrap_or_default(),
    }
}

/// Percent-encode each segment of a `/`-separated path, without a trailing
/// slash (the root encodes to the empty string).
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("/{}", urlencoding::encode(segment)))
        .collect()
}

fn parent_href(path: &str) -> Option<String> {
    let (parent, _) = path.trim_end_matches('/').rsplit_once('/')?;
    Some(format!("{}/", encode_path(parent)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ChildEntry;

    fn sample() -> DirectoryListing {
        DirectoryListing::build(
            "/",
            vec![
                ChildEntry::file("readme.txt", 500),
                ChildEntry::directory("docs"),
            ],
        )
    }

    #[test]
    fn test_render_sections_in_order() {
        let html = render_listing(&sample()).unwrap();

        let title = html.find("Index of /").unwrap();
        let dirs = html.find("id=\"directories\"").unwrap();
        let docs = html.find(">docs/<").unwrap();
        let files = html.find("id=\"files\"").unwrap();
        let readme = html.find(">readme.txt<").unwrap();

        assert!(title < dirs);
        assert!(dirs < docs);
        assert!(docs < files);
        assert!(files < readme);
        assert!(html.contains("500 B"));
        assert!(html.contains("href=\"/docs/\""));
        assert!(html.contains("href=\"/readme.txt\""));
    }

    #[test]
    fn test_root_has_no_parent_link() {
        let html = render_listing(&sample()).unwrap();
        assert!(!html.contains("Parent directory"));
    }

    #[test]
    fn test_nested_listing_links() {
        let listing = DirectoryListing::build(
            "/docs/my notes",
            vec![ChildEntry::file("a&b.txt", 1)],
        );
        let html = render_listing(&listing).unwrap();

        assert!(html.contains("href=\"/docs/\""));
        assert!(html.contains("href=\"/docs/my%20notes/a%26b.txt\""));
        assert!(html.contains(">a&amp;b.txt<"));
    }

    #[test]
    fn test_names_are_escaped() {
        let listing = DirectoryListing::build(
            "/",
            vec![ChildEntry::file("<script>alert(1)</script>", 1)],
        );
        let html = render_listing(&listing).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let first = render_listing(&sample()).unwrap();
        let second = render_listing(&sample()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parent_href() {
        assert_eq!(parent_href("/"), None);
        assert_eq!(parent_href("/docs"), Some("/".to_string()));
        assert_eq!(parent_href("/docs/sub"), Some("/docs/".to_string()));
        assert_eq!(parent_href("/a b/c"), Some("/a%20b/".to_string()));
    }
}
