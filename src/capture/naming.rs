//! Output file layout: `<root>/<YYYY-MM-DD>/<HH-MM-SS>-<title>.jpg`.
//!
//! The time is written with dashes. Existing screenshot folders use this form,
//! so keep it when touching the format strings.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Characters that cannot appear in a Windows path component.
const RESERVED_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

const UNTITLED: &str = "untitled";

pub const SCREENSHOT_EXTENSION: &str = "jpg";

/// Strips filesystem-reserved and control characters from a window title.
///
/// Trailing dots and spaces are trimmed as well since Windows drops them from
/// file names. Titles that end up empty become `untitled`.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !RESERVED_CHARS.contains(c) && !c.is_control())
        .collect();
    let cleaned = cleaned.trim_end_matches(['.', ' ']).trim_start();
    if cleaned.is_empty() {
        UNTITLED.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Directory holding all screenshots taken on the local date of `at`.
pub fn date_dir(root: &Path, at: &DateTime<Local>) -> PathBuf {
    root.join(at.format("%Y-%m-%d").to_string())
}

/// Full path of the screenshot of a window titled `title` taken at `at`.
pub fn screenshot_path(root: &Path, at: &DateTime<Local>, title: &str) -> PathBuf {
    date_dir(root, at).join(format!(
        "{}-{}.{}",
        at.format("%H-%M-%S"),
        sanitize_title(title),
        SCREENSHOT_EXTENSION
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_removes_reserved() {
        assert_eq!(sanitize_title("My/Game:Test"), "MyGameTest");
        assert_eq!(
            sanitize_title(r#"a\b/c*d?e:f"g<h>i|j"#),
            "abcdefghij"
        );
    }

    #[test]
    fn test_sanitize_every_reserved_char_alone() {
        for c in RESERVED_CHARS {
            let title = format!("Game{}Name", c);
            let sanitized = sanitize_title(&title);
            assert_eq!(sanitized, "GameName", "failed for {:?}", c);
        }
    }

    #[test]
    fn test_sanitize_keeps_unicode_and_spaces() {
        assert_eq!(sanitize_title("学園アイドルマスター"), "学園アイドルマスター");
        assert_eq!(sanitize_title("Half-Life 2"), "Half-Life 2");
    }

    #[test]
    fn test_sanitize_trims_and_strips_control() {
        assert_eq!(sanitize_title("Game\tTitle\n"), "GameTitle");
        assert_eq!(sanitize_title("Loading..."), "Loading");
        assert_eq!(sanitize_title("  Menu  "), "Menu");
    }

    #[test]
    fn test_sanitize_empty_title() {
        assert_eq!(sanitize_title(""), "untitled");
        assert_eq!(sanitize_title("???"), "untitled");
        assert_eq!(sanitize_title("<>|"), "untitled");
    }

    #[test]
    fn test_screenshot_path_layout() {
        let at = Local.with_ymd_and_hms(2024, 1, 5, 9, 3, 7).unwrap();
        let path = screenshot_path(Path::new("shots"), &at, "My/Game:Test");
        assert_eq!(
            path,
            Path::new("shots")
                .join("2024-01-05")
                .join("09-03-07-MyGameTest.jpg")
        );
    }

    #[test]
    fn test_screenshot_path_is_single_component() {
        let at = Local.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let root = Path::new("out");
        let path = screenshot_path(root, &at, r#"C:\Games\a/b"#);
        assert_eq!(path.parent(), Some(date_dir(root, &at).as_path()));
    }
}
