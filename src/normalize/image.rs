use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]+\bsrc=["']([^"']+)["']"#).unwrap());

const ABSOLUTE_PREFIXES: [&str; 2] = ["http://", "https://"];

/// Picks the lead image of a post from its HTML fragments.
///
/// Candidates are searched in order and the first `<img src>` found wins. Relative
/// sources are resolved against the scheme and host of `post_link`.
pub fn pull_post_image_url(post_link: Option<&str>, candidates: &[Option<&str>]) -> Option<String> {
    let post_link = post_link?;

    candidates
        .iter()
        .flatten()
        .find_map(|html| find_image_src(html))
        .and_then(|src| resolve_against(post_link, src))
}

fn find_image_src(html: &str) -> Option<&str> {
    IMG_SRC
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|src| src.as_str())
}

fn resolve_against(owner_link: &str, src: &str) -> Option<String> {
    if ABSOLUTE_PREFIXES.iter().any(|prefix| src.starts_with(prefix)) {
        return Some(src.to_string());
    }

    let mut url = match Url::parse(owner_link) {
        Ok(url) => url,
        Err(e) => {
            debug!("Cannot resolve image '{}' against '{}': {}", src, owner_link, e);
            return None;
        }
    };

    if let Some(rest) = src.strip_prefix("//") {
        return Some(format!("{}://{}", url.scheme(), rest));
    }

    let (path, query) = match src.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (src, None),
    };
    url.set_path(path);
    url.set_query(query);
    url.set_fragment(None);

    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_src_uses_link_host() {
        let result = pull_post_image_url(
            Some("http://example.com/a"),
            &[Some("<img src='/img.png'>")],
        );
        assert_eq!(result, Some("http://example.com/img.png".to_string()));
    }

    #[test]
    fn test_absolute_src_passes_through() {
        let result = pull_post_image_url(
            Some("http://example.com/a"),
            &[Some(r#"<p><img class="lead" src="https://cdn.example.org/x/y.jpg"></p>"#)],
        );
        assert_eq!(result, Some("https://cdn.example.org/x/y.jpg".to_string()));
    }

    #[test]
    fn test_first_candidate_wins() {
        let result = pull_post_image_url(
            Some("https://example.com/post"),
            &[
                Some(r#"<img src="https://example.com/first.png">"#),
                Some(r#"<img src="https://example.com/second.png">"#),
            ],
        );
        assert_eq!(result, Some("https://example.com/first.png".to_string()));
    }

    #[test]
    fn test_falls_back_to_second_candidate() {
        let result = pull_post_image_url(
            Some("https://example.com/post"),
            &[
                Some("<p>no pictures</p>"),
                Some(r#"<figure><img alt="x" src="/media/2.png"/></figure>"#),
            ],
        );
        assert_eq!(result, Some("https://example.com/media/2.png".to_string()));
    }

    #[test]
    fn test_missing_candidate_is_skipped() {
        let result = pull_post_image_url(
            Some("https://example.com/post"),
            &[None, Some(r#"<img src="https://example.com/c.png">"#)],
        );
        assert_eq!(result, Some("https://example.com/c.png".to_string()));
    }

    #[test]
    fn test_no_link_means_no_image() {
        let result = pull_post_image_url(None, &[Some(r#"<img src="https://example.com/a.png">"#)]);
        assert_eq!(result, None);
    }

    #[test]
    fn test_no_img_tag_means_no_image() {
        let result = pull_post_image_url(Some("https://example.com/post"), &[Some("just text")]);
        assert_eq!(result, None);
    }

    #[test]
    fn test_protocol_relative_src_takes_link_scheme() {
        let result = pull_post_image_url(
            Some("https://example.com/post"),
            &[Some(r#"<img src="//cdn.example.com/a.png">"#)],
        );
        assert_eq!(result, Some("https://cdn.example.com/a.png".to_string()));
    }

    #[test]
    fn test_link_query_is_not_carried_over() {
        let result = pull_post_image_url(
            Some("https://example.com/post?id=7#top"),
            &[Some(r#"<img src="/thumb.png?w=200">"#)],
        );
        assert_eq!(result, Some("https://example.com/thumb.png?w=200".to_string()));
    }

    #[test]
    fn test_unparseable_link_means_no_image() {
        let result = pull_post_image_url(Some("not a url"), &[Some(r#"<img src="/a.png">"#)]);
        assert_eq!(result, None);
    }
}
