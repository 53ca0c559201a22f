// SPDX-License-Identifier: MIT

use crate::adk::error::LatticeError;
use crate::adk::tool::Tool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared tool table handed to the agent workflows
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register `tool`, replacing any tool of the same name
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let mut tools = self.tools.write().await;
        let name = tool.name().to_string();
        if tools.insert(name.clone(), tool).is_some() {
            log::warn!("Tool '{}' was already registered; replaced", name);
        }
    }

    pub async fn register_all(&self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) {
        let mut map = self.tools.write().await;
        for tool in tools {
            map.insert(tool.name().to_string(), tool);
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.get(name).cloned()
    }

    /// Registered names, sorted
    pub async fn names(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up every tool in `names`, failing on the first unknown one
    pub async fn resolve(&self, names: &[&str]) -> Result<Vec<Arc<dyn Tool>>, LatticeError> {
        let tools = self.tools.read().await;
        names
            .iter()
            .map(|name| {
                tools
                    .get(*name)
                    .cloned()
                    .ok_or_else(|| LatticeError::tool_not_found(*name))
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
