//! Prompt text: the system instruction and the corrective observations the
//! loop feeds back when a step cannot be carried out.

use reagent_core::{ParseError, ToolError, ToolRegistry};

/// Build the system instruction from the registered tools.
///
/// The registry iterates in name order, so the same tool set always yields
/// the same prompt.
pub fn system_prompt(tools: &ToolRegistry) -> String {
    let mut out = String::from(
        "You are a helpful assistant that answers questions by reasoning step by step \
         and calling tools when you need information you do not have.\n\n",
    );

    if tools.is_empty() {
        out.push_str("No tools are available. Answer directly.\n\n");
        out.push_str("Use the following format:\n\n");
        out.push_str("Thought: your reasoning\n");
        out.push_str("Final Answer: the answer to the original question\n");
        return out;
    }

    out.push_str("You have access to the following tools:\n");
    for (name, description) in tools.descriptions() {
        out.push_str(&format!("- {name}: {description}\n"));
    }

    let names = tools.names().join(", ");
    out.push_str(&format!(
        "\nUse the following format:\n\n\
         Thought: reason about what to do next\n\
         Action: the tool to use, exactly one of [{names}]\n\
         Action Input: the input to the tool\n\
         Observation: the result of the tool\n\
         ... (Thought/Action/Action Input/Observation can repeat)\n\
         Thought: I now know the final answer\n\
         Final Answer: the answer to the original question\n\n\
         Observations are written for you. Never write an Observation yourself, \
         and never give an Action and a Final Answer in the same reply.\n\n\
         Instead of the lines above you may reply with a fenced JSON block, either\n\
         ```json\n{{\"thought\": \"...\", \"action\": \"tool name\", \"action_input\": \"...\"}}\n```\n\
         or\n\
         ```json\n{{\"thought\": \"...\", \"final_answer\": \"...\"}}\n```\n"
    ));
    out
}

/// Observation fed back after a reply that could not be parsed.
pub fn malformed_observation(err: &ParseError) -> String {
    format!(
        "Your last reply could not be understood ({err}). Reply with a Thought followed by \
         either an Action and an Action Input, or a Final Answer."
    )
}

/// Observation fed back when the model names a tool that is not registered.
pub fn unknown_tool_observation(tool: &str, available: &[&str]) -> String {
    if available.is_empty() {
        format!("'{tool}' is not a valid tool and no tools are available. Give a Final Answer.")
    } else {
        format!(
            "'{tool}' is not a valid tool. Choose one of: {}.",
            available.join(", ")
        )
    }
}

/// Observation fed back when a tool fails, times out, or panics.
pub fn tool_failure_observation(err: &ToolError) -> String {
    format!("{err}. Try a different input or another tool.")
}

/// Degraded answer returned when the step budget runs out.
pub fn exhausted_answer(max_steps: u32, last_observation: Option<&str>) -> String {
    let mut answer = format!(
        "I've reached the maximum number of reasoning steps ({max_steps}) without reaching a \
         final answer."
    );
    if let Some(obs) = last_observation.map(str::trim).filter(|o| !o.is_empty()) {
        answer.push_str(" Here's what I found so far: ");
        answer.push_str(obs);
    }
    answer
}

/// Degraded answer returned when the budget runs out and not a single reply
/// could be parsed.
pub fn unparseable_answer(max_steps: u32) -> String {
    format!(
        "I couldn't produce an answer: none of the model's {max_steps} replies could be parsed \
         as a Thought with an Action or a Final Answer."
    )
}
