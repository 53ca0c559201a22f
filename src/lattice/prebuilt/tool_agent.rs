// SPDX-License-Identifier: MIT

//! Tool-calling agent - the two-node `agent` ⇄ `tools` loop
//!
//! The model node answers; while its reply requests tools the tool node
//! runs them and hands control back. With a [`MemorySaver`] attached the
//! history of a thread carries over between invocations.

use super::tool_node::{tools_condition, ToolNode, TOOLS_NODE};
use crate::adk::agent::{Agent, AgentEvent};
use crate::adk::error::LatticeError;
use crate::adk::model::{ChatModel, Message, Part, ToolBoundModel};
use crate::adk::tool::Tool;
use crate::lattice::workflow::checkpoint::MemorySaver;
use crate::lattice::workflow::graph::{
    node_fn, CompiledGraph, StateGraph, WorkflowEvent, END, START,
};
use crate::lattice::workflow::state::{StateSchema, StateUpdate, WorkflowState};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Node name of the model call
pub const AGENT_NODE: &str = "agent";

pub struct ToolCallingAgent {
    name: String,
    graph: CompiledGraph,
    checkpointer: Option<MemorySaver>,
    thread_id: Option<String>,
}

impl ToolCallingAgent {
    /// Fails with `MissingCapability` when `model` cannot bind tools
    pub fn new(
        name: impl Into<String>,
        model: ChatModel,
        tools: Vec<Arc<dyn Tool>>,
        instruction: impl Into<String>,
    ) -> Result<Self, LatticeError> {
        let name = name.into();
        let bound = model.bind_tools(tools.clone())?;
        let graph = agent_graph(&name, bound, ToolNode::new(tools), instruction.into())?;
        Ok(Self {
            name,
            graph,
            checkpointer: None,
            thread_id: None,
        })
    }

    pub fn with_checkpointer(mut self, saver: MemorySaver) -> Self {
        self.checkpointer = Some(saver);
        self
    }

    /// Thread used by [`Agent::run`] and [`Agent::run_stream`]
    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    /// Run the loop on `messages`, continuing `thread_id` when a checkpointer is set.
    ///
    /// Returns the full history of the thread after the run.
    pub async fn invoke(
        &self,
        messages: Vec<Message>,
        thread_id: Option<&str>,
    ) -> Result<Vec<Message>, LatticeError> {
        self.invoke_inner(messages, thread_id, None).await
    }

    async fn invoke_inner(
        &self,
        messages: Vec<Message>,
        thread_id: Option<&str>,
        events: Option<mpsc::Sender<WorkflowEvent>>,
    ) -> Result<Vec<Message>, LatticeError> {
        let saver = self.checkpointer.as_ref().zip(thread_id);
        let _turn = match saver {
            Some((saver, thread)) => Some(saver.lock_thread(thread).await),
            None => None,
        };
        let mut history = match saver {
            Some((saver, thread)) => saver.load(thread).await,
            None => Vec::new(),
        };
        history.extend(messages);

        let input = StateUpdate::messages(history);
        let state = match events {
            Some(tx) => self.graph.invoke_with_events(input, tx).await?,
            None => self.graph.invoke(input).await?,
        };
        let history = state.messages()?;

        if let Some((saver, thread)) = saver {
            saver.save(thread, history.clone()).await;
        }
        Ok(history)
    }
}

/// Build the `agent` ⇄ `tools` graph around an already bound model
pub fn agent_graph(
    name: &str,
    model: ToolBoundModel,
    tools: ToolNode,
    instruction: String,
) -> Result<CompiledGraph, LatticeError> {
    let call_model = node_fn(move |state: WorkflowState| {
        let model = model.clone();
        let instruction = instruction.clone();
        async move {
            let mut history = Vec::new();
            if !instruction.is_empty() {
                history.push(Message::system(instruction));
            }
            history.extend(state.messages()?);
            let reply = model.invoke(&history).await?;
            Ok(StateUpdate::messages(vec![reply]))
        }
    });

    StateGraph::new(name, StateSchema::messages())
        .add_node(AGENT_NODE, call_model)
        .add_node(TOOLS_NODE, tools)
        .add_edge(START, AGENT_NODE)
        .add_conditional_edges(
            AGENT_NODE,
            tools_condition,
            &[(TOOLS_NODE, TOOLS_NODE), (END, END)],
        )
        .add_edge(TOOLS_NODE, AGENT_NODE)
        .compile()
}

/// Agent events carried by one engine event
fn agent_events(event: &WorkflowEvent) -> Vec<AgentEvent> {
    let WorkflowEvent::NodeCompleted { update, .. } = event else {
        return Vec::new();
    };
    let messages: Vec<Message> = update
        .get("messages")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    messages
        .iter()
        .flat_map(|m| m.parts.iter())
        .filter_map(|part| match part {
            Part::ToolCall(call) => Some(AgentEvent::ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                args: call.args.clone(),
            }),
            Part::ToolResult(result) => Some(AgentEvent::ToolResult {
                call_id: result.call_id.clone(),
                name: result.name.clone(),
                result: result.content.clone(),
            }),
            Part::Text { .. } => None,
        })
        .collect()
}

fn final_answer(history: &[Message]) -> String {
    history.last().map(Message::text).unwrap_or_default()
}

#[async_trait]
impl Agent for ToolCallingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: String) -> Result<String, LatticeError> {
        let history = self
            .invoke(vec![Message::user(input)], self.thread_id.as_deref())
            .await?;
        Ok(final_answer(&history))
    }

    async fn run_stream(
        &self,
        input: String,
        tx: mpsc::Sender<AgentEvent>,
    ) -> Result<String, LatticeError> {
        let (events_tx, mut events_rx) = mpsc::channel(32);

        let run = self.invoke_inner(
            vec![Message::user(input)],
            self.thread_id.as_deref(),
            Some(events_tx),
        );
        let forward = async {
            while let Some(event) = events_rx.recv().await {
                for agent_event in agent_events(&event) {
                    let _ = tx.send(agent_event).await;
                }
            }
        };
        let (result, ()) = tokio::join!(run, forward);

        match result {
            Ok(history) => {
                let answer = final_answer(&history);
                let _ = tx.send(AgentEvent::Answer(answer.clone())).await;
                Ok(answer)
            }
            Err(e) => {
                log::error!("Agent {} failed: {}", self.name, e);
                let _ = tx.send(AgentEvent::Error(e.to_string())).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::testing::ScriptedModel;
    use crate::adk::model::{Role, ToolCall};
    use crate::lattice::tools::create_tools;
    use serde_json::json;

    fn multiply_call(id: &str) -> Message {
        Message::tool_calls_request(vec![ToolCall {
            id: id.to_string(),
            name: "multiply".to_string(),
            args: json!({"a": 3, "b": 4}),
        }])
    }

    fn calculator(replies: Vec<Message>) -> (ToolCallingAgent, Arc<ScriptedModel>) {
        let (chat, scripted) = ScriptedModel::new(replies).into_chat();
        let agent = ToolCallingAgent::new("calculator", chat, create_tools(), "Do arithmetic.")
            .unwrap();
        (agent, scripted)
    }

    #[tokio::test]
    async fn test_loop_runs_tools_until_plain_answer() {
        let (agent, scripted) =
            calculator(vec![multiply_call("call_1"), Message::assistant("12")]);

        let history = agent
            .invoke(vec![Message::user("Multiply 3 and 4.")], None)
            .await
            .unwrap();

        assert_eq!(history.len(), 4);
        assert_eq!(history[2].role, Role::Tool);
        match &history[2].parts[0] {
            Part::ToolResult(result) => {
                assert_eq!(result.call_id, "call_1");
                assert_eq!(result.content, json!(12.0));
            }
            other => panic!("expected tool result, got {:?}", other),
        }
        assert_eq!(history[3].text(), "12");

        // The instruction is sent on every call but never stored
        let seen = scripted.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1][0], Message::system("Do arithmetic."));
        assert!(history.iter().all(|m| m.role != Role::System));
    }

    #[tokio::test]
    async fn test_model_without_tools_is_rejected() {
        let (chat, _) = ScriptedModel::texts(&[]).without_capabilities().into_chat();
        let err = ToolCallingAgent::new("calc", chat, create_tools(), "")
            .err()
            .unwrap();
        assert!(matches!(err, LatticeError::MissingCapability { .. }));
    }

    #[tokio::test]
    async fn test_checkpointer_continues_thread() {
        let saver = MemorySaver::new();
        let (agent, scripted) = calculator(vec![
            Message::assistant("It is sunny in sf"),
            Message::assistant("It is raining in ny"),
        ]);
        let agent = agent.with_checkpointer(saver.clone());

        agent
            .invoke(vec![Message::user("what is the weather in sf")], Some("42"))
            .await
            .unwrap();
        let history = agent
            .invoke(vec![Message::user("what about ny")], Some("42"))
            .await
            .unwrap();

        assert_eq!(history.len(), 4);
        assert_eq!(saver.load("42").await, history);
        // Second call saw the first turn
        assert_eq!(scripted.seen.lock().unwrap()[1].len(), 4);

        let fresh = agent
            .invoke(vec![Message::user("hello")], Some("7"))
            .await
            .unwrap();
        assert_eq!(fresh.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_thread_keep_both() {
        let saver = MemorySaver::new();
        let (agent, scripted) = calculator(Vec::new());
        let agent = agent.with_checkpointer(saver.clone());

        let (one, two) = tokio::join!(
            agent.invoke(vec![Message::user("one")], Some("t")),
            agent.invoke(vec![Message::user("two")], Some("t")),
        );
        one.unwrap();
        two.unwrap();

        let history = saver.load("t").await;
        assert_eq!(history.len(), 4);
        let users: Vec<String> = history
            .iter()
            .filter(|m| m.role == Role::User)
            .map(Message::text)
            .collect();
        assert_eq!(users.len(), 2);
        assert!(users.contains(&"one".to_string()));
        assert!(users.contains(&"two".to_string()));

        assert_eq!(saver.get("t").await.unwrap().invocations, 2);
        // The later turn saw the earlier one: system, user, reply, user
        assert_eq!(scripted.seen.lock().unwrap()[1].len(), 4);
    }

    #[tokio::test]
    async fn test_run_stream_reports_tool_round_trip() {
        let (agent, _) = calculator(vec![multiply_call("call_7"), Message::assistant("12")]);
        let (tx, mut rx) = mpsc::channel(16);

        let answer = agent.run_stream("Multiply 3 and 4.".to_string(), tx).await.unwrap();
        assert_eq!(answer, "12");

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                AgentEvent::ToolCall {
                    id: "call_7".to_string(),
                    name: "multiply".to_string(),
                    args: json!({"a": 3, "b": 4}),
                },
                AgentEvent::ToolResult {
                    call_id: "call_7".to_string(),
                    name: "multiply".to_string(),
                    result: json!(12.0),
                },
                AgentEvent::Answer("12".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_aborts_run() {
        let (agent, _) = calculator(vec![Message::tool_calls_request(vec![ToolCall {
            id: "call_x".to_string(),
            name: "search".to_string(),
            args: json!({}),
        }])]);

        let err = agent.run("look it up".to_string()).await.unwrap_err();
        assert_eq!(err.node_name(), Some("tools"));
        assert!(matches!(err.root(), LatticeError::ToolNotFound { .. }));
    }
}
