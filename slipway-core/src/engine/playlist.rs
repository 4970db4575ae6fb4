use crate::engine::codec::UrlWrapper;

/// Rewrites every URI line of an HLS (`.m3u8`) playlist.
///
/// Comment/tag lines (`#...`) and blank lines pass through byte for byte.
/// Line endings, including `\r\n`, are preserved. Lines that do not resolve
/// against the playlist URL are left as they were.
pub fn rewrite_playlist(text: &str, wrapper: &UrlWrapper<'_>) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 2);

    for line in text.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        let ending = &line[body.len()..];
        let uri = body.trim();

        if uri.is_empty() || uri.starts_with('#') {
            out.push_str(line);
            continue;
        }

        match wrapper.wrap(uri) {
            Ok(Some(wrapped)) => {
                out.push_str(&wrapped);
                out.push_str(ending);
            }
            _ => out.push_str(line),
        }
    }

    out
}

/// True when either the content type or the URL marks an HLS playlist.
pub fn is_playlist(content_type: Option<&str>, path: &str) -> bool {
    let by_type = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("mpegurl"));
    let path = path.to_ascii_lowercase();
    by_type || path.ends_with(".m3u8") || path.ends_with(".m3u")
}
