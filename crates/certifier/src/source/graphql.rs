//! GraphQL source listing over HTTP

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use chainwarden_core::BoxFuture;

use super::{SourceClient, SourcePage, SourceRecord};
use crate::error::CertifierError;

const SOURCES_LIST_QUERY: &str = r#"query SourcesList($after: ID, $first: Int) {
  sourcesList(sourceSpec: {}, after: $after, first: $first) {
    edges {
      node {
        id
        type
        namespaces {
          namespace
          names { id name tag commit hasScorecard }
        }
      }
    }
    pageInfo { endCursor hasNextPage }
  }
}"#;

/// [`SourceClient`] backed by the knowledge graph's GraphQL endpoint
///
/// Extra headers (auth tokens and the like) belong on the `reqwest::Client`
/// passed in.
#[derive(Debug, Clone)]
pub struct GraphqlSourceClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GraphqlSourceClient {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn fetch(&self, after: Option<&str>, first: usize) -> Result<SourcePage, CertifierError> {
        let body = json!({
            "operationName": "SourcesList",
            "query": SOURCES_LIST_QUERY,
            "variables": { "after": after, "first": first },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| CertifierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CertifierError::Transport(format!(
                "{} answered {status}: {text}",
                self.endpoint
            )));
        }

        let parsed: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| CertifierError::Decode(e.to_string()))?;

        if !parsed.errors.is_empty() {
            let messages: Vec<_> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(CertifierError::Transport(messages.join("; ")));
        }

        let connection = parsed
            .data
            .ok_or_else(|| CertifierError::Decode("response carries no data".to_owned()))?
            .sources_list;

        let sources: Vec<SourceRecord> = connection
            .edges
            .into_iter()
            .flat_map(|edge| flatten(edge.node))
            .collect();
        debug!(
            sources = sources.len(),
            has_next = connection.page_info.has_next_page,
            "sources page decoded"
        );

        let next_cursor = if connection.page_info.has_next_page {
            connection.page_info.end_cursor
        } else {
            None
        };

        Ok(SourcePage {
            sources,
            next_cursor,
        })
    }
}

impl SourceClient for GraphqlSourceClient {
    fn fetch_page<'a>(
        &'a self,
        after: Option<&'a str>,
        first: usize,
    ) -> BoxFuture<'a, Result<SourcePage, CertifierError>> {
        Box::pin(self.fetch(after, first))
    }
}

/// One record per `type/namespace/name` leaf.
fn flatten(node: SourceNode) -> Vec<SourceRecord> {
    let source_type = node.source_type;
    node.namespaces
        .into_iter()
        .flat_map(|ns| {
            let source_type = source_type.clone();
            ns.names.into_iter().map(move |n| SourceRecord {
                id: n.id,
                source_type: source_type.clone(),
                namespace: ns.namespace.clone(),
                name: n.name,
                tag: n.tag,
                commit: n.commit,
                has_scorecard: n.has_scorecard,
            })
        })
        .collect()
}

// --- wire types ---

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<SourcesListData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourcesListData {
    sources_list: SourcesConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourcesConnection {
    #[serde(default)]
    edges: Vec<SourceEdge>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct SourceEdge {
    node: SourceNode,
}

#[derive(Debug, Deserialize)]
struct SourceNode {
    #[serde(rename = "type")]
    source_type: String,
    #[serde(default)]
    namespaces: Vec<NamespaceNode>,
}

#[derive(Debug, Deserialize)]
struct NamespaceNode {
    namespace: String,
    #[serde(default)]
    names: Vec<NameNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NameNode {
    id: String,
    name: String,
    tag: Option<String>,
    commit: Option<String>,
    #[serde(default)]
    has_scorecard: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    end_cursor: Option<String>,
    has_next_page: bool,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn page_body(has_next: bool) -> serde_json::Value {
        json!({
            "data": {
                "sourcesList": {
                    "edges": [{
                        "node": {
                            "id": "src-1",
                            "type": "git",
                            "namespaces": [{
                                "namespace": "github.com/acme",
                                "names": [
                                    { "id": "n-1", "name": "app", "tag": null, "commit": "abc", "hasScorecard": false },
                                    { "id": "n-2", "name": "lib", "tag": "v2", "commit": null, "hasScorecard": true }
                                ]
                            }]
                        }
                    }],
                    "pageInfo": { "endCursor": "cursor-1", "hasNextPage": has_next }
                }
            }
        })
    }

    #[tokio::test]
    async fn decodes_and_flattens_a_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(json!({ "variables": { "first": 50 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(true)))
            .expect(1)
            .mount(&server)
            .await;

        let client = GraphqlSourceClient::new(reqwest::Client::new(), format!("{}/query", server.uri()));
        let page = client.fetch_page(None, 50).await.unwrap();

        assert_eq!(page.sources.len(), 2);
        assert_eq!(page.sources[0].namespace, "github.com/acme");
        assert_eq!(page.sources[0].commit.as_deref(), Some("abc"));
        assert!(page.sources[1].has_scorecard);
        assert_eq!(page.next_cursor.as_deref(), Some("cursor-1"));
    }

    #[tokio::test]
    async fn last_page_has_no_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(false)))
            .mount(&server)
            .await;

        let client = GraphqlSourceClient::new(reqwest::Client::new(), server.uri());
        let page = client.fetch_page(Some("cursor-1"), 10).await.unwrap();
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn unauthorized_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("no token"))
            .mount(&server)
            .await;

        let client = GraphqlSourceClient::new(reqwest::Client::new(), server.uri());
        let err = client.fetch_page(None, 10).await.unwrap_err();
        assert!(matches!(err, CertifierError::Transport(ref m) if m.contains("401")));
    }

    #[tokio::test]
    async fn graphql_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": null, "errors": [{ "message": "bad spec" }] })),
            )
            .mount(&server)
            .await;

        let client = GraphqlSourceClient::new(reqwest::Client::new(), server.uri());
        let err = client.fetch_page(None, 10).await.unwrap_err();
        assert!(err.to_string().contains("bad spec"));
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = GraphqlSourceClient::new(reqwest::Client::new(), server.uri());
        let err = client.fetch_page(None, 10).await.unwrap_err();
        assert!(matches!(err, CertifierError::Decode(_)));
    }
}
