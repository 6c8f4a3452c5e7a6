use serde::de::DeserializeOwned;

use crate::error::SubFetchError;
use crate::github::auth::AuthContext;
use crate::github::client::GitHubClient;

/// Items gathered across pages. A failing page ends pagination without
/// discarding what was already collected; the failure is kept in
/// `stopped_by` for the caller to record.
#[derive(Debug)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub pages: usize,
    pub stopped_by: Option<SubFetchError>,
}

impl<T> Paged<T> {
    pub fn is_complete(&self) -> bool {
        self.stopped_by.is_none()
    }
}

pub struct Paginator<'a> {
    client: &'a GitHubClient,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Follows `rel="next"` until it is absent or `max_pages` pages were read.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        auth: &AuthContext,
        url: &str,
        max_pages: usize,
    ) -> Paged<T> {
        let mut paged = Paged {
            items: Vec::new(),
            pages: 0,
            stopped_by: None,
        };
        let mut next = Some(url.to_string());

        while let Some(current) = next.take() {
            if paged.pages >= max_pages {
                break;
            }

            let response = match self.client.get(auth, &current).await {
                Ok(response) => response,
                Err(e) => {
                    paged.stopped_by = Some(e);
                    break;
                }
            };

            let items: Vec<T> = match response.json(&current) {
                Ok(items) => items,
                Err(e) => {
                    tracing::debug!("Pagination of {} stopped: {}", url, e);
                    paged.stopped_by = Some(e);
                    break;
                }
            };

            paged.items.extend(items);
            paged.pages += 1;
            next = response.meta.link.as_deref().and_then(parse_next_link);
        }

        paged
    }
}

/// Extracts the `rel="next"` target from an RFC 5988 `Link` header.
pub fn parse_next_link(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let mut sections = part.split(';');
        let target = sections.next()?.trim();
        let is_next = sections.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::client::ResponseMeta;
    use crate::github::testing::ScriptedTransport;
    use serde_json::json;

    #[test]
    fn test_parse_next_link() {
        let header = r#"<https://api.github.com/user/repos?page=2>; rel="next", <https://api.github.com/user/repos?page=5>; rel="last""#;
        assert_eq!(
            parse_next_link(header),
            Some("https://api.github.com/user/repos?page=2".to_string())
        );

        let last_page = r#"<https://api.github.com/user/repos?page=1>; rel="prev", <https://api.github.com/user/repos?page=1>; rel="first""#;
        assert_eq!(parse_next_link(last_page), None);
        assert_eq!(parse_next_link(""), None);
    }

    fn link_to(url: &str) -> ResponseMeta {
        ResponseMeta {
            link: Some(format!("<{}>; rel=\"next\"", url)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_follows_next_until_absent() {
        let transport = ScriptedTransport::new()
            .route_with_meta("https://api.test/items?start", 200, json!([1, 2]), link_to("https://api.test/items?page=2"))
            .route_with_meta("https://api.test/items?page=2", 200, json!([3]), link_to("https://api.test/items?page=3"))
            .route("https://api.test/items?page=3", 200, json!([4]));
        let client = GitHubClient::with_transport(transport, "https://api.test");
        let auth = AuthContext::new("t").unwrap();

        let paged: Paged<u32> = client.get_all_pages(&auth, "/items?start", 10).await;
        assert_eq!(paged.items, vec![1, 2, 3, 4]);
        assert_eq!(paged.pages, 3);
        assert!(paged.is_complete());
    }

    #[tokio::test]
    async fn test_stops_at_max_pages() {
        let transport = ScriptedTransport::new()
            .route_with_meta("https://api.test/items?start", 200, json!([1]), link_to("https://api.test/items?page=2"))
            .route_with_meta("https://api.test/items?page=2", 200, json!([2]), link_to("https://api.test/items?page=3"))
            .route("https://api.test/items?page=3", 200, json!([3]));
        let client = GitHubClient::with_transport(transport, "https://api.test");
        let auth = AuthContext::new("t").unwrap();

        let paged: Paged<u32> = client.get_all_pages(&auth, "/items?start", 2).await;
        assert_eq!(paged.items, vec![1, 2]);
        assert!(paged.is_complete());
    }

    #[tokio::test]
    async fn test_failed_page_keeps_earlier_items() {
        let transport = ScriptedTransport::new()
            .route_with_meta("https://api.test/items?start", 200, json!([1, 2]), link_to("https://api.test/items?page=2"))
            .route("https://api.test/items?page=2", 500, json!({"message": "boom"}));
        let client = GitHubClient::with_transport(transport, "https://api.test");
        let auth = AuthContext::new("t").unwrap();

        let paged: Paged<u32> = client.get_all_pages(&auth, "/items?start", 10).await;
        assert_eq!(paged.items, vec![1, 2]);
        assert_eq!(paged.pages, 1);
        assert_eq!(paged.stopped_by, Some(SubFetchError::Status(500)));
    }
}
