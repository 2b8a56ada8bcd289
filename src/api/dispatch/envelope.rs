//! Success envelope and pagination links.

use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Navigation links. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// `{"links": {...}, "items"?: [...]}`
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub links: Links,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Value>>,
}

/// Rebuilds request URLs with a substituted `page` parameter.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: Url,
    query: Vec<(String, String)>,
}

impl LinkBuilder {
    /// `base` is the absolute request URL without query; `query` holds the
    /// decoded request parameters in their original order.
    pub fn new(base: Url, query: Vec<(String, String)>) -> Self {
        Self { base, query }
    }

    /// The request URL with its query reproduced.
    pub fn current(&self) -> String {
        self.build(None)
    }

    /// The request URL with `page` replaced, or appended when absent.
    pub fn with_page(&self, page: u32) -> String {
        self.build(Some(page))
    }

    fn build(&self, page: Option<u32>) -> String {
        let mut url = self.base.clone();
        url.set_query(None);

        if !self.query.is_empty() || page.is_some() {
            let mut pairs = url.query_pairs_mut();
            let mut substituted = false;
            for (key, value) in &self.query {
                match page {
                    Some(p) if key == "page" => {
                        if !substituted {
                            pairs.append_pair("page", &p.to_string());
                            substituted = true;
                        }
                    }
                    _ => {
                        pairs.append_pair(key, value);
                    }
                }
            }
            if let Some(p) = page
                && !substituted
            {
                pairs.append_pair("page", &p.to_string());
            }
        }

        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(query: &[(&str, &str)]) -> LinkBuilder {
        LinkBuilder::new(
            Url::parse("http://api.test/users").unwrap(),
            query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_current_without_query() {
        assert_eq!(builder(&[]).current(), "http://api.test/users");
    }

    #[test]
    fn test_current_reproduces_query_in_order() {
        let links = builder(&[("sort", "-name"), ("limit", "10")]);
        assert_eq!(links.current(), "http://api.test/users?sort=-name&limit=10");
    }

    #[test]
    fn test_page_is_substituted_in_place() {
        let links = builder(&[("page", "2"), ("limit", "10")]);
        assert_eq!(links.with_page(3), "http://api.test/users?page=3&limit=10");
    }

    #[test]
    fn test_page_is_appended_when_missing() {
        let links = builder(&[("limit", "10")]);
        assert_eq!(links.with_page(2), "http://api.test/users?limit=10&page=2");
    }

    #[test]
    fn test_links_serialize_in_fixed_order() {
        let links = Links {
            self_: "s".into(),
            prev: Some("p".into()),
            next: Some("n".into()),
        };
        assert_eq!(
            serde_json::to_string(&links).unwrap(),
            r#"{"self":"s","prev":"p","next":"n"}"#
        );
    }

    #[test]
    fn test_envelope_omits_absent_items() {
        let envelope = Envelope {
            links: Links {
                self_: "s".into(),
                prev: None,
                next: None,
            },
            items: None,
        };
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"links":{"self":"s"}}"#
        );
    }
}
