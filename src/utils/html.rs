use std::collections::HashSet;

/// Longest chain of sanitize passes before a body is given up on.
const MAX_PASSES: usize = 8;

/// Turn a submitted comment body into the plain text that is stored.
///
/// All markup is removed: `<script>` and `<style>` together with their content, every
/// other tag leaving its text behind. The text itself is kept as typed, so `fish & chips <3`
/// is stored and returned unchanged rather than as HTML entities. Passes repeat until the
/// text is stable, which makes the result idempotent: feeding a stored body back through
/// an edit stores the same string again.
///
/// Returns `None` when nothing but whitespace is left, or when the text never settles.
pub fn clean_comment_body(input: &str) -> Option<String> {
    let mut builder = ammonia::Builder::empty();
    builder
        .clean_content_tags(HashSet::from(["script", "style"]))
        .strip_comments(true);

    let mut current = input.trim().to_string();
    for _ in 0..MAX_PASSES {
        let next = decode_text_entities(&builder.clean(&current).to_string());
        let next = next.trim();

        if next.is_empty() {
            return None;
        }
        if next == current {
            return Some(current);
        }
        current = next.to_string();
    }

    tracing::warn!("Comment body did not settle after {} sanitize passes", MAX_PASSES);
    None
}

/// Undo the escaping html5ever applies to text nodes.
fn decode_text_entities(text: &str) -> String {
    // `&amp;` last, so an escaped entity name is not decoded twice.
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_kept() {
        assert_eq!(clean_comment_body("  nice trip ").as_deref(), Some("nice trip"));
    }

    #[test]
    fn scripts_are_stripped() {
        assert_eq!(
            clean_comment_body("<script>alert(1)</script>agreed").as_deref(),
            Some("agreed")
        );
    }

    #[test]
    fn markup_only_body_is_empty() {
        assert_eq!(clean_comment_body("<script>alert(1)</script>"), None);
        assert_eq!(clean_comment_body("<style>p{}</style>  "), None);
    }

    #[test]
    fn tags_are_dropped_but_their_text_stays() {
        assert_eq!(
            clean_comment_body("<b>bold</b> move, <i>really</i>").as_deref(),
            Some("bold move, really")
        );
    }

    #[test]
    fn ampersands_and_angle_brackets_are_not_encoded() {
        for text in ["fish & chips <3", "a < b", "x > y && y > z", "R&D"] {
            assert_eq!(clean_comment_body(text).as_deref(), Some(text), "{text}");
        }
    }

    #[test]
    fn cleaning_is_idempotent() {
        for input in [
            "fish & chips <3",
            "<p>a < b</p>",
            "&lt;script&gt;alert(1)&lt;/script&gt;hi",
            "tom &amp; jerry",
        ] {
            let once = clean_comment_body(input).unwrap();
            assert_eq!(clean_comment_body(&once).as_deref(), Some(once.as_str()), "{input}");
        }
    }

    #[test]
    fn escaped_markup_does_not_come_back_as_tags() {
        assert_eq!(
            clean_comment_body("&lt;script&gt;alert(1)&lt;/script&gt;hi").as_deref(),
            Some("hi")
        );
    }

    #[test]
    fn cleaned_text_is_never_longer_than_submitted() {
        for input in ["&".repeat(1000), "<".repeat(1000), format!("<b>{}</b>", "x".repeat(990))] {
            let cleaned = clean_comment_body(&input).unwrap();
            assert!(cleaned.chars().count() <= input.chars().count());
        }
    }
}
