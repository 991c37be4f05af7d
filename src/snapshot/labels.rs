/// Normalize a Flickr size label ("Large 1024") into a JSON-friendly key
/// ("large-1024"): lower-cased, trimmed, spaces replaced with hyphens.
pub fn label_key(raw: &str) -> String {
    raw.to_lowercase().trim().replace(' ', "-")
}
