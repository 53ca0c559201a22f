// SPDX-License-Identifier: MIT

use crate::adk::tool::Tool;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;
use std::error::Error;

pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
const DEFAULT_MAX_RESULTS: u32 = 3;

static TAVILY_SEARCH_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "input": {
                "type": "string",
                "description": "The search query"
            }
        },
        "required": ["input"]
    })
});

#[derive(Debug, Serialize, Deserialize)]
pub struct TavilySearchArgs {
    pub input: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

/// Web search through the Tavily API
pub struct TavilySearchTool {
    client: Client,
    api_key: String,
    endpoint: String,
    max_results: u32,
}

impl TavilySearchTool {
    /// Reads `TAVILY_API_KEY` from the environment
    pub fn new() -> Result<Self, Box<dyn Error + Send + Sync>> {
        let api_key = env::var("TAVILY_API_KEY").map_err(|_| "TAVILY_API_KEY must be set")?;
        Ok(Self::with_api_key(api_key))
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: TAVILY_SEARCH_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

fn parse_results(body: &Value) -> Result<Vec<SearchResult>, Box<dyn Error + Send + Sync>> {
    let results = body
        .get("results")
        .ok_or("Invalid response format: missing results")?;
    Ok(serde_json::from_value(results.clone())?)
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        "tavily_search_results_json"
    }

    fn description(&self) -> &str {
        "A search engine optimized for comprehensive, accurate, and trusted results. Useful for when you need to answer questions about current events. Input should be a search query."
    }

    fn schema(&self) -> &Value {
        &TAVILY_SEARCH_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let args: TavilySearchArgs = serde_json::from_value(input)?;
        log::debug!("Tavily search: {}", args.input);

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&TavilyRequest {
                api_key: &self.api_key,
                query: &args.input,
                max_results: self.max_results,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(format!("Tavily API error: {}", text).into());
        }

        let body: Value = resp.json().await?;
        let results = parse_results(&body)?;
        Ok(serde_json::to_value(results)?)
    }
}
