/// URL-safe slug: lowercase ASCII alphanumerics, every other run of
/// characters collapsed to a single `-`, no leading or trailing `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_world() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
    }

    #[test]
    fn collapses_runs_and_trims() {
        assert_eq!(slugify("  --Rust   &  SQLite--  "), "rust-sqlite");
        assert_eq!(slugify("a__b..c"), "a-b-c");
    }

    #[test]
    fn drops_non_ascii() {
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
    }

    #[test]
    fn punctuation_only_is_empty() {
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn is_idempotent() {
        for title in ["Hello, World!", "Rust 2024: what's new?", "  x  ", "ÄÖÜ 42", ""] {
            let once = slugify(title);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn case_and_punctuation_variants_collide() {
        assert_eq!(slugify("Hello World"), slugify("hello, world!!"));
    }
}
