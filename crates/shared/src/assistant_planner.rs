use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl From<String> for TaskPriority {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: TaskPriority,
    #[serde(default)]
    pub estimated_time: String,
}

fn default_priority() -> TaskPriority {
    TaskPriority::Medium
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPlan {
    pub tasks: Vec<PlannedTask>,
    pub suggestions: String,
}

/// Splits a model reply into the task array it was asked to emit and the
/// free-form suggestions around it. The task array is the span from the first
/// `[` to the first `]` after it; if that span is missing or does not parse,
/// the whole reply becomes suggestions.
pub fn parse_plan_response(response: &str) -> DailyPlan {
    let Some((start, end)) = first_bracket_span(response) else {
        return suggestions_only(response);
    };

    let span = &response[start..end];
    match serde_json::from_str::<Vec<PlannedTask>>(span) {
        Ok(tasks) => {
            let mut remainder = String::with_capacity(response.len() - span.len());
            remainder.push_str(&response[..start]);
            remainder.push_str(&response[end..]);
            DailyPlan {
                tasks,
                suggestions: remainder.trim().to_string(),
            }
        }
        Err(err) => {
            debug!("plan task array did not parse: {err}");
            suggestions_only(response)
        }
    }
}

/// Text read aloud after a plan is generated.
pub fn spoken_plan_summary(plan: &DailyPlan) -> String {
    if plan.tasks.is_empty() {
        return truncate_chars(&plan.suggestions, 300).to_string();
    }

    format!(
        "I've created a plan with {} tasks for you. {}...",
        plan.tasks.len(),
        truncate_chars(&plan.suggestions, 200)
    )
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn first_bracket_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find('[')?;
    let close = text[start..].find(']')?;
    Some((start, start + close + 1))
}

fn suggestions_only(response: &str) -> DailyPlan {
    DailyPlan {
        tasks: Vec::new(),
        suggestions: response.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tasks_and_remaining_suggestions() {
        let response = r#"Here is your plan:
[
  {"title": "Write report", "description": "Draft section 1", "priority": "high", "estimatedTime": "90 minutes"},
  {"title": "Walk", "description": "Clear your head", "priority": "LOW", "estimatedTime": "20 minutes"}
]
Take breaks every hour."#;

        let plan = parse_plan_response(response);

        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[0].title, "Write report");
        assert_eq!(plan.tasks[0].priority, TaskPriority::High);
        assert_eq!(plan.tasks[0].estimated_time, "90 minutes");
        assert_eq!(plan.tasks[1].priority, TaskPriority::Low);
        assert_eq!(plan.suggestions, "Here is your plan:\n\nTake breaks every hour.");
    }

    #[test]
    fn unknown_priority_becomes_medium() {
        let plan = parse_plan_response(r#"[{"title": "Email", "priority": "urgent"}]"#);
        assert_eq!(plan.tasks[0].priority, TaskPriority::Medium);
        assert_eq!(plan.tasks[0].description, "");
        assert_eq!(plan.suggestions, "");
    }

    #[test]
    fn reply_without_array_is_all_suggestions() {
        let plan = parse_plan_response("Focus on one thing at a time.");
        assert!(plan.tasks.is_empty());
        assert_eq!(plan.suggestions, "Focus on one thing at a time.");
    }

    #[test]
    fn unparseable_array_is_all_suggestions() {
        let response = "Tasks: [not, json] and more";
        let plan = parse_plan_response(response);
        assert!(plan.tasks.is_empty());
        assert_eq!(plan.suggestions, response);
    }

    #[test]
    fn spoken_summary_mentions_task_count_or_truncates() {
        let with_tasks = DailyPlan {
            tasks: vec![PlannedTask {
                title: "A".to_string(),
                description: String::new(),
                priority: TaskPriority::High,
                estimated_time: String::new(),
            }],
            suggestions: "x".repeat(500),
        };
        let spoken = spoken_plan_summary(&with_tasks);
        assert!(spoken.starts_with("I've created a plan with 1 tasks for you. "));
        assert!(spoken.ends_with("..."));
        assert_eq!(spoken.chars().filter(|ch| *ch == 'x').count(), 200);

        let without_tasks = DailyPlan {
            tasks: Vec::new(),
            suggestions: "é".repeat(400),
        };
        assert_eq!(spoken_plan_summary(&without_tasks).chars().count(), 300);
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
