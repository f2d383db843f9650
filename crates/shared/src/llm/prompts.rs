use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteTemplateId {
    Blog,
    Social,
    Email,
    Resume,
    Cover,
}

impl WriteTemplateId {
    pub const ALL: [Self; 5] = [
        Self::Blog,
        Self::Social,
        Self::Email,
        Self::Resume,
        Self::Cover,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Social => "social",
            Self::Email => "email",
            Self::Resume => "resume",
            Self::Cover => "cover",
        }
    }
}

impl FromStr for WriteTemplateId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateField {
    pub name: &'static str,
    pub label: &'static str,
}

const fn field(name: &'static str, label: &'static str) -> TemplateField {
    TemplateField { name, label }
}

#[derive(Debug, Clone, Copy)]
pub struct WriteTemplate {
    pub id: WriteTemplateId,
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [TemplateField],
}

const BLOG_FIELDS: &[TemplateField] = &[
    field("topic", "Topic"),
    field("audience", "Target Audience"),
    field("tone", "Tone"),
    field("length", "Length"),
];
const SOCIAL_FIELDS: &[TemplateField] = &[
    field("platform", "Platform"),
    field("topic", "Topic/Message"),
    field("cta", "Call to Action"),
    field("hashtags", "Include Hashtags"),
];
const EMAIL_FIELDS: &[TemplateField] = &[
    field("type", "Email Type"),
    field("recipient", "Recipient"),
    field("purpose", "Purpose"),
    field("tone", "Tone"),
];
const RESUME_FIELDS: &[TemplateField] = &[
    field("section", "Section"),
    field("role", "Target Role"),
    field("experience", "Your Background"),
    field("industry", "Industry"),
];
const COVER_FIELDS: &[TemplateField] = &[
    field("company", "Company Name"),
    field("position", "Position"),
    field("experience", "Relevant Experience"),
    field("motivation", "Why This Company?"),
];

pub fn write_template(id: WriteTemplateId) -> WriteTemplate {
    let (name, description, fields) = match id {
        WriteTemplateId::Blog => ("Blog Post", "Create engaging blog content", BLOG_FIELDS),
        WriteTemplateId::Social => (
            "Social Media Post",
            "Craft engaging social content",
            SOCIAL_FIELDS,
        ),
        WriteTemplateId::Email => ("Email", "Professional email templates", EMAIL_FIELDS),
        WriteTemplateId::Resume => (
            "Resume Section",
            "Professional resume content",
            RESUME_FIELDS,
        ),
        WriteTemplateId::Cover => ("Cover Letter", "Compelling cover letters", COVER_FIELDS),
    };

    WriteTemplate {
        id,
        name,
        description,
        fields,
    }
}

impl WriteTemplate {
    /// Labels of required fields that are absent or blank, in declaration order.
    pub fn missing_fields(&self, values: &HashMap<String, String>) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|field| {
                values
                    .get(field.name)
                    .is_none_or(|value| value.trim().is_empty())
            })
            .map(|field| field.label)
            .collect()
    }

    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let get = |name: &str| values.get(name).map(String::as_str).unwrap_or_default();
        let lower = |name: &str| get(name).to_lowercase();

        match self.id {
            WriteTemplateId::Blog => format!(
                "Write a {} blog post about \"{}\" for {}. The post should be {}. Include an engaging introduction, main points with examples, and a compelling conclusion.",
                lower("tone"),
                get("topic"),
                get("audience"),
                lower("length"),
            ),
            WriteTemplateId::Social => {
                let hashtags = if get("hashtags").trim().eq_ignore_ascii_case("yes") {
                    "Include relevant hashtags."
                } else {
                    "Do not include hashtags."
                };
                format!(
                    "Create a {} post about \"{}\". Include a call to action: \"{}\". {hashtags} Make it engaging and platform-appropriate.",
                    get("platform"),
                    get("topic"),
                    get("cta"),
                )
            }
            WriteTemplateId::Email => format!(
                "Write a {} {} email to {}. The purpose is: {}. Include appropriate subject line, greeting, body, and closing.",
                lower("tone"),
                lower("type"),
                get("recipient"),
                get("purpose"),
            ),
            WriteTemplateId::Resume => format!(
                "Write a professional {} for a resume targeting a {} position in the {} industry. Based on this background: {}. Make it compelling and ATS-friendly.",
                lower("section"),
                get("role"),
                get("industry"),
                get("experience"),
            ),
            WriteTemplateId::Cover => format!(
                "Write a professional cover letter for the {} position at {}. Highlight this experience: {}. Explain motivation: {}. Make it personalized and compelling.",
                get("position"),
                get("company"),
                get("experience"),
                get("motivation"),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanRequest {
    pub goals: String,
    pub time_available: Option<String>,
    pub priorities: Option<String>,
    pub constraints: Option<String>,
}

impl PlanRequest {
    pub fn prompt(&self) -> String {
        format!(
            "Create a detailed daily plan based on these inputs:

Goals: {goals}
Available Time: {time}
Priorities: {priorities}
Constraints: {constraints}

Please provide:
1. A list of specific, actionable tasks with estimated time for each
2. Priority levels (high/medium/low) for each task
3. Brief descriptions for each task
4. General suggestions and tips for the day

Format the tasks as a JSON array with this structure:
[
  {{
    \"title\": \"Task title\",
    \"description\": \"Brief description\",
    \"priority\": \"high|medium|low\",
    \"estimatedTime\": \"30 minutes\"
  }}
]

After the JSON, provide general suggestions and tips.",
            goals = self.goals,
            time = non_blank_or(self.time_available.as_deref(), "Full day"),
            priorities = non_blank_or(self.priorities.as_deref(), "Not specified"),
            constraints = non_blank_or(self.constraints.as_deref(), "None"),
        )
    }
}

pub fn summary_prompt(text: &str) -> String {
    format!(
        "Please provide a comprehensive summary of the following text. Include:
1. Main points and key ideas
2. Important details and supporting information
3. Conclusions or outcomes
4. Overall theme or message

Text to summarize:
{text}"
    )
}

pub fn document_question_prompt(text: &str, question: &str) -> String {
    format!(
        "Based on the following text, please answer this question: \"{question}\"

Provide a detailed answer based only on the information in the text. If the answer cannot be found in the text, please say so.

Text:
{text}"
    )
}

fn non_blank_or<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
}
