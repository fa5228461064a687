use std::collections::HashSet;

/// Strips markup from a player-chosen display name.
///
/// Names are rendered on the leaderboard and in the review panel, so no tags
/// are allowed at all. Script and style bodies are dropped with their tags.
/// The result is plain text for JSON, not HTML: entities ammonia emits are
/// decoded again and any angle brackets left over are removed.
pub fn sanitize_display_name(input: &str) -> String {
    let mut builder = ammonia::Builder::empty();
    builder.clean_content_tags(HashSet::from(["script", "style"]));
    let cleaned = builder.clean(input).to_string();

    decode_entities(&cleaned)
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Reverses the escaping applied when ammonia serializes text nodes.
/// `&amp;` goes last so an escaped entity is not decoded twice.
fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
