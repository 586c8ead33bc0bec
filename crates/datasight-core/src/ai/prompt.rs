//! Insight prompt construction

use std::time::Duration;

use serde::Serialize;

use super::types::{ChatCompletionRequest, ChatMessage};
use crate::models::{AnalysisResult, SampleRow, VisualizationSpec};

const SYSTEM_PROMPT: &str = "You are a careful data analyst. You receive descriptive statistics \
for a tabular dataset, optionally a chart description and a few sample rows. Write 3 to 6 short, \
factual insights as a bulleted list. Only use numbers that appear in the input. Finish with one \
suggested next step for analysis.";

/// Chart semantics passed to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSemantics {
    pub kind: String,
    pub x: String,
    pub y: String,
    pub agg: String,
}

impl From<&VisualizationSpec> for ChartSemantics {
    fn from(spec: &VisualizationSpec) -> Self {
        Self {
            kind: spec.kind_label(),
            x: spec.x.clone(),
            y: spec.y.clone(),
            agg: spec.agg.as_str().to_string(),
        }
    }
}

/// Normalized payload for one insight call, identical on every retry
#[derive(Debug, Clone, PartialEq)]
pub struct InsightRequest {
    pub analysis: AnalysisResult,
    pub chart: Option<ChartSemantics>,
    pub sample_rows: Vec<SampleRow>,
    pub model: String,
    /// Per-attempt timeout resolved for this call
    pub timeout: Duration,
}

impl InsightRequest {
    pub fn new(
        analysis: &AnalysisResult,
        viz: Option<&VisualizationSpec>,
        sample_rows: Vec<SampleRow>,
        model: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            analysis: analysis.clone(),
            chart: viz.map(ChartSemantics::from),
            sample_rows,
            model: model.to_string(),
            timeout,
        }
    }

    /// User message body
    pub fn user_prompt(&self) -> String {
        let mut prompt = String::from("Dataset summary (JSON):\n");
        prompt.push_str(
            &serde_json::to_string_pretty(&self.analysis).unwrap_or_else(|_| "{}".to_string()),
        );

        if let Some(chart) = &self.chart {
            prompt.push_str(&format!(
                "\n\nChart: {} showing {}({}) grouped by {}.",
                chart.kind, chart.agg, chart.y, chart.x
            ));
        }

        if !self.sample_rows.is_empty() {
            prompt.push_str("\n\nSample rows (JSON):\n");
            prompt.push_str(
                &serde_json::to_string(&self.sample_rows).unwrap_or_else(|_| "[]".to_string()),
            );
        }

        prompt.push_str("\n\nWrite the insights now.");
        prompt
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(self.user_prompt())]
    }

    pub fn to_chat_request(&self, temperature: f32) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: self.messages(),
            temperature,
        }
    }
}
