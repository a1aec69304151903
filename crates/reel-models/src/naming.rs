//! Output filename generation.

/// Maximum slug length in characters.
const MAX_SLUG_LEN: usize = 50;

/// Output container extension for rendered reels.
pub const REEL_EXTENSION: &str = "mp4";

/// Filesystem-safe slug of a highlight title.
///
/// Keeps alphanumerics, spaces, `-` and `_`, collapses runs of whitespace into
/// a single underscore and drops leading/trailing whitespace. Case is kept.
pub fn slug_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_SLUG_LEN)
        .collect()
}

/// Filename for the `index`-th (1-based) highlight of a batch:
/// `reel_<index>_<slug>.mp4`.
///
/// A title that slugs to nothing falls back to `highlight_<index>`, so names
/// stay unique within a batch.
pub fn batch_output_filename(index: usize, title: &str) -> String {
    let slug = slug_title(title);
    let slug = if slug.is_empty() {
        format!("highlight_{}", index)
    } else {
        slug
    };
    format!("reel_{}_{}.{}", index, slug, REEL_EXTENSION)
}

/// Filename for a single ad-hoc render: `reel_<floor(start)>_<floor(end)>_<suffix>.mp4`.
pub fn adhoc_output_filename(start: f64, end: f64, suffix: &str) -> String {
    format!(
        "reel_{}_{}_{}.{}",
        start.floor() as u64,
        end.floor() as u64,
        suffix,
        REEL_EXTENSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_strips_punctuation() {
        let slug = slug_title("Epic Save! #1");
        assert_eq!(slug, "Epic_Save_1");
        assert!(!slug.contains('!'));
        assert!(!slug.contains('#'));
        assert!(!slug.contains(' '));
    }

    #[test]
    fn test_slug_trims_and_collapses() {
        assert_eq!(slug_title("  The   Big-Moment_ "), "The_Big-Moment_");
        assert_eq!(slug_title("a/b\\c:d"), "abcd");
    }

    #[test]
    fn test_slug_truncates() {
        let long = "x".repeat(80);
        assert_eq!(slug_title(&long).len(), 50);
    }

    #[test]
    fn test_batch_filename() {
        assert_eq!(batch_output_filename(1, "Intro"), "reel_1_Intro.mp4");
        assert_eq!(batch_output_filename(3, "Epic Save! #1"), "reel_3_Epic_Save_1.mp4");
        assert_eq!(batch_output_filename(2, "!!!"), "reel_2_highlight_2.mp4");
    }

    #[test]
    fn test_adhoc_filename_floors_times() {
        assert_eq!(adhoc_output_filename(12.9, 27.2, "a1b2c3d4"), "reel_12_27_a1b2c3d4.mp4");
    }
}
