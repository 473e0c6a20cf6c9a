//! Supabase Storage adapter over its REST API.
//!
//! - list:     `POST {base}/storage/v1/object/list/{bucket}`
//! - download: `GET  {base}/storage/v1/object/{bucket}/{key}`
//! - upload:   `POST {base}/storage/v1/object/{bucket}/{key}` with `x-upsert: true`

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::shared::constants::LIST_LIMIT;
use crate::storage::domain::blob_store::{BlobStore, StoreError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SupabaseBlobStore {
    client: Client,
    base_url: Url,
    bucket: String,
}

#[derive(Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    #[serde(rename = "sortBy")]
    sort_by: SortBy,
}

#[derive(Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Deserialize)]
struct ListEntry {
    name: String,
}

impl SupabaseBlobStore {
    /// `base_url` is the project URL (`https://<ref>.supabase.co`); `api_key`
    /// is sent both as `apikey` and as the bearer token. `timeout` bounds
    /// every individual request.
    pub fn new(
        base_url: &str,
        api_key: &str,
        bucket: &str,
        timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(format!("Supabase URL cannot be a base: {base_url}").into());
        }

        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(api_key)?;
        key_value.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", key_value);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            bucket: bucket.to_string(),
        })
    }

    fn list_url(&self) -> Result<Url, StoreError> {
        endpoint(&self.base_url, &["object", "list", &self.bucket], "")
    }

    fn object_url(&self, key: &str) -> Result<Url, StoreError> {
        endpoint(&self.base_url, &["object", &self.bucket], key)
    }
}

impl BlobStore for SupabaseBlobStore {
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let body = ListRequest {
            prefix,
            limit: LIST_LIMIT,
            offset: 0,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };
        let response = self
            .client
            .post(self.list_url()?)
            .json(&body)
            .send()
            .map_err(|e| request_error(prefix, e))?;
        let status = response.status();
        let text = response.text().map_err(|e| request_error(prefix, e))?;
        if !status.is_success() {
            return Err(status_error(prefix, status, text));
        }
        parse_list_response(prefix, &text)
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get(self.object_url(key)?)
            .send()
            .map_err(|e| request_error(key, e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(status_error(key, status, text));
        }
        let bytes = response.bytes().map_err(|e| request_error(key, e))?;
        Ok(bytes.to_vec())
    }

    fn upload(&self, key: &str, content: &[u8]) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.object_url(key)?)
            .header("x-upsert", "true")
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content.to_vec())
            .send()
            .map_err(|e| request_error(key, e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(status_error(key, status, text));
        }
        Ok(())
    }
}

/// `{base}/storage/v1/{fixed...}/{key segments...}` with each segment
/// percent-encoded.
fn endpoint(base: &Url, fixed: &[&str], key: &str) -> Result<Url, StoreError> {
    let mut url = base.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|_| StoreError::Response {
            key: key.to_string(),
            reason: format!("base URL {base} cannot be a base"),
        })?;
        segments.pop_if_empty().extend(["storage", "v1"]).extend(fixed);
        segments.extend(key.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}

fn parse_list_response(prefix: &str, body: &str) -> Result<Vec<String>, StoreError> {
    let entries: Vec<ListEntry> =
        serde_json::from_str(body).map_err(|e| StoreError::Response {
            key: prefix.to_string(),
            reason: format!("invalid listing JSON: {e}"),
        })?;
    let mut names: Vec<String> = entries.into_iter().map(|entry| entry.name).collect();
    names.sort();
    Ok(names)
}

fn request_error(key: &str, source: reqwest::Error) -> StoreError {
    StoreError::Request {
        key: key.to_string(),
        source,
    }
}

/// Older Storage versions answer a missing object with
/// `400 {"statusCode":"404","error":"not_found"}`; newer ones with 404.
fn status_error(key: &str, status: StatusCode, body: String) -> StoreError {
    let missing = status == StatusCode::NOT_FOUND
        || (status == StatusCode::BAD_REQUEST
            && (body.contains("not_found") || body.contains("\"404\"")));
    if missing {
        return StoreError::NotFound(key.to_string());
    }
    StoreError::Status {
        key: key.to_string(),
        status: status.as_u16(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://project.supabase.co").unwrap()
    }

    #[test]
    fn test_object_url() {
        let url = endpoint(&base(), &["object", "mira"], "mahasiswa/2101/a b.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/storage/v1/object/mira/mahasiswa/2101/a%20b.jpg"
        );
    }

    #[test]
    fn test_list_url_with_trailing_slash_base() {
        let base = Url::parse("https://project.supabase.co/").unwrap();
        let url = endpoint(&base, &["object", "list", "mira"], "").unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/storage/v1/object/list/mira"
        );
    }

    #[test]
    fn test_parse_list_response_sorts_names() {
        let body = r#"[
            {"name": "b.png", "id": "2", "metadata": {}},
            {"name": "a.jpg", "id": "1", "metadata": {}},
            {"name": "2101_encoding.bin", "id": null, "metadata": null}
        ]"#;
        let names = parse_list_response("mahasiswa/2101", body).unwrap();
        assert_eq!(names, vec!["2101_encoding.bin", "a.jpg", "b.png"]);
    }

    #[test]
    fn test_parse_list_response_rejects_non_array() {
        let result = parse_list_response("p", r#"{"error": "unauthorized"}"#);
        assert!(matches!(result, Err(StoreError::Response { .. })));
    }

    #[test]
    fn test_status_error_maps_missing_objects() {
        assert!(matches!(
            status_error("k", StatusCode::NOT_FOUND, String::new()),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            status_error(
                "k",
                StatusCode::BAD_REQUEST,
                r#"{"statusCode":"404","error":"not_found","message":"Object not found"}"#.into()
            ),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn test_status_error_keeps_other_failures() {
        match status_error("k", StatusCode::FORBIDDEN, "denied".into()) {
            StoreError::Status { status, body, .. } => {
                assert_eq!(status, 403);
                assert_eq!(body, "denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        assert!(SupabaseBlobStore::new("not a url", "key", "mira", DEFAULT_TIMEOUT).is_err());
    }
}
