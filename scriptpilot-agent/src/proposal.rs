//! Parsing model replies into script proposals

const FENCE: &str = "```";

/// What the model suggested for the current transcript.
///
/// Either part may be missing; both missing means there is nothing to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptProposal {
    pub message: Option<String>,
    pub script: Option<String>,
}

impl ScriptProposal {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: non_empty(text.into()),
            script: None,
        }
    }

    pub fn script(script: impl Into<String>) -> Self {
        Self {
            message: None,
            script: non_empty(script.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.script.is_none()
    }

    /// Split a raw model reply into prose and a fenced script.
    ///
    /// With fewer than two fences the whole reply is prose. Otherwise the
    /// prose is the text before the first fence plus the text after the last
    /// one, and the script is everything in between (inner fences kept).
    pub fn parse(response: &str) -> Self {
        if response.matches(FENCE).count() < 2 {
            return Self::message(response.trim());
        }

        let segments: Vec<&str> = response.split(FENCE).collect();
        let (first, last) = (segments[0].trim(), segments[segments.len() - 1].trim());
        let message = match (first.is_empty(), last.is_empty()) {
            (true, true) => String::new(),
            (false, true) => first.to_string(),
            (true, false) => last.to_string(),
            (false, false) => format!("{}\n{}", first, last),
        };

        let body = segments[1..segments.len() - 1].join(FENCE);
        let script = strip_language_tag(body.trim());
        let script = decode_json_string(script.trim()).unwrap_or_else(|| script.trim().to_string());

        Self {
            message: non_empty(message),
            script: non_empty(script.trim().to_string()),
        }
    }
}

/// Drop a leading ```python / ```py info string.
fn strip_language_tag(body: &str) -> &str {
    let (first_line, rest) = body.split_once('\n').unwrap_or((body, ""));
    let tag = first_line.trim();
    if ["python", "python3", "py"].iter().any(|t| tag.eq_ignore_ascii_case(t)) {
        rest
    } else {
        body
    }
}

/// Some models wrap the script in a JSON string literal.
fn decode_json_string(body: &str) -> Option<String> {
    if !body.starts_with('"') {
        return None;
    }
    serde_json::from_str::<String>(body).ok()
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
