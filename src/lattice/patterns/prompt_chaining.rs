// SPDX-License-Identifier: MIT

//! Joke chain with a punchline gate between the first two calls

use super::{prompt_node, text_field};
use crate::adk::error::LatticeError;
use crate::adk::model::ChatModel;
use crate::lattice::workflow::graph::{CompiledGraph, StateGraph, END, START};
use crate::lattice::workflow::state::{FieldType, StateSchema, StateUpdate, WorkflowState};

pub const TOPIC: &str = "cats";

const SEPARATOR: &str = "\n\n--- --- ---\n\n";

fn schema() -> StateSchema {
    StateSchema::new()
        .field("topic", FieldType::String)
        .field("joke", FieldType::String)
        .field("improved_joke", FieldType::String)
        .field("final_joke", FieldType::String)
}

/// Pass when the joke has a punchline mark
fn check_punchline(state: &WorkflowState) -> &'static str {
    let joke = state.get_str("joke").unwrap_or_default();
    if joke.contains('?') || joke.contains('!') {
        "Pass"
    } else {
        "Fail"
    }
}

pub fn build(chat: &ChatModel) -> Result<CompiledGraph, LatticeError> {
    StateGraph::new("prompt_chaining", schema())
        .add_node(
            "generate_joke",
            prompt_node(chat, "joke", |s| {
                format!("Write a short joke about {}", text_field(s, "topic"))
            }),
        )
        .add_node(
            "improve_joke",
            prompt_node(chat, "improved_joke", |s| {
                format!("Make this joke funnier by adding wordplay: {}", text_field(s, "joke"))
            }),
        )
        .add_node(
            "polish_joke",
            prompt_node(chat, "final_joke", |s| {
                format!("Add a surprising twist to this joke: {}", text_field(s, "improved_joke"))
            }),
        )
        .add_edge(START, "generate_joke")
        .add_conditional_edges(
            "generate_joke",
            check_punchline,
            &[("Pass", "improve_joke"), ("Fail", END)],
        )
        .add_edge("improve_joke", "polish_joke")
        .add_edge("polish_joke", END)
        .compile()
}

pub async fn run(chat: &ChatModel) -> Result<String, LatticeError> {
    let state = build(chat)?
        .invoke(StateUpdate::new().set("topic", TOPIC))
        .await?;

    let mut report = format!("Initial joke:\n{}{}", text_field(&state, "joke"), SEPARATOR);
    match state.get_str("improved_joke") {
        Some(improved) => {
            report.push_str(&format!("Improved joke:\n{}{}", improved, SEPARATOR));
            report.push_str(&format!("Final joke:\n{}", text_field(&state, "final_joke")));
        }
        None => report.push_str("Joke failed quality gate - no punchline detected!"),
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::testing::ScriptedModel;

    #[tokio::test]
    async fn test_punchline_runs_full_chain() {
        let (chat, scripted) = ScriptedModel::texts(&[
            "Why did the cat sit on the computer? To keep an eye on the mouse!",
            "improved",
            "polished",
        ])
        .into_chat();

        let report = run(&chat).await.unwrap();

        assert!(report.ends_with("Final joke:\npolished"));
        let seen = scripted.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0][0].text(), "Write a short joke about cats");
        assert!(seen[2][0].text().ends_with("improved"));
    }

    #[tokio::test]
    async fn test_flat_joke_fails_gate() {
        let (chat, scripted) = ScriptedModel::texts(&["Cats are cats."]).into_chat();

        let report = run(&chat).await.unwrap();

        assert_eq!(
            report,
            "Initial joke:\nCats are cats.\n\n--- --- ---\n\nJoke failed quality gate - no punchline detected!"
        );
        assert_eq!(scripted.seen.lock().unwrap().len(), 1);
    }
}
