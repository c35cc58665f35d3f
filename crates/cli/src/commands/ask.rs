//! `reagent ask`: Answer one question.

use reagent_agent::{ExecutionResult, ReactAgent};
use reagent_config::AppConfig;
use std::sync::Arc;

pub async fn run(
    config: AppConfig,
    query: &str,
    show_trace: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = reagent_providers::build_from_config(&config)?;
    let tools = Arc::new(reagent_tools::default_registry(&config.tools));
    let agent = ReactAgent::from_config(provider, tools, &config.agent);

    let result = agent.execute(query, &[]).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render(&result, show_trace));
    }

    Ok(())
}

/// Plain-text rendering: optional trace lines, then the answer.
fn render(result: &ExecutionResult, show_trace: bool) -> String {
    let mut out = String::new();

    if show_trace {
        for entry in &result.trace {
            out.push_str(&format!("{entry}\n"));
        }
        out.push('\n');
    }

    out.push_str(result.final_answer.trim());
    out.push('\n');

    if !result.converged {
        out.push_str(&format!(
            "\n(stopped after {} model calls without a final answer)\n",
            result.model_calls
        ));
    }

    out
}
