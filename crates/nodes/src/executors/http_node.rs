//! `http` — a guarded outbound HTTP call.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::data::NodeData;
use crate::error::NodeError;
use crate::http::HttpClient;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct HttpExecutor {
    client: HttpClient,
}

impl HttpExecutor {
    pub fn new() -> Self {
        HttpExecutor { client: HttpClient::new() }
    }
}

impl Default for HttpExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutableNode for HttpExecutor {
    fn type_tag(&self) -> &'static str {
        "http"
    }

    fn validate(&self, data: &NodeData) -> Result<(), NodeError> {
        match data {
            NodeData::Http(d) if d.url.trim().is_empty() => {
                Err(NodeError::BadConfig("http node has an empty url".into()))
            }
            NodeData::Http(_) => Ok(()),
            _ => Err(NodeError::BadConfig("http executor received mismatched data".into())),
        }
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Http(d) => d,
            _ => return Err(NodeError::BadConfig("http executor received mismatched data".into())),
        };

        ctx.charge_http_call()?;

        let url = ctx.interpolate(&d.url);
        let method = d.method.clone().unwrap_or_else(|| "GET".into());
        let headers: HashMap<String, String> = d
            .headers
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, ctx.interpolate(&v)))
            .collect();

        self.client
            .guarded_request(&method, &url, &headers, d.body.as_ref(), ctx.http_policy())
            .await
    }
}
