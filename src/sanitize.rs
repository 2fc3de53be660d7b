//! Filesystem-safe file and directory names

/// Characters rejected by at least one common filesystem.
pub const RESERVED: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Turns arbitrary attachment names and sender strings into names that
/// are safe to create on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilenameSanitizer {
    /// Maximum length in characters, extension included.
    pub max_length: usize,
    pub replace_spaces: bool,
}

impl FilenameSanitizer {
    #[must_use]
    pub const fn new(max_length: usize) -> Self {
        Self {
            max_length,
            replace_spaces: false,
        }
    }

    #[must_use]
    pub const fn replace_spaces(mut self, replace: bool) -> Self {
        self.replace_spaces = replace;
        self
    }

    /// Replace reserved characters with `_` and enforce the length
    /// limit, keeping the extension when there is room for it. The
    /// result is always one normal path component.
    #[must_use]
    pub fn sanitize(&self, name: &str) -> String {
        let cleaned: String = name
            .chars()
            .map(|c| {
                if RESERVED.contains(&c) || (self.replace_spaces && c == ' ') {
                    '_'
                } else {
                    c
                }
            })
            .collect();

        let out = truncate(&cleaned, self.max_length);
        // "", "." and ".." are not usable as a single path component.
        if out.chars().all(|c| c == '.') {
            return "_".repeat(out.len().max(1));
        }
        out
    }
}

fn truncate(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }

    if let Some((stem, ext)) = name.rsplit_once('.') {
        let ext_len = ext.chars().count();
        // Room for at least one stem character plus the dot.
        if ext_len + 2 <= max {
            let keep = max - ext_len - 1;
            let stem: String = stem.chars().take(keep).collect();
            return format!("{stem}.{ext}");
        }
    }

    name.chars().take(max).collect()
}
