//! Configuration validation with unknown field detection.

use serde_json::Value;

/// Known top-level config field names.
const KNOWN_TOP_LEVEL: &[&str] = &["agent", "provider", "server", "tools", "logging"];

const KNOWN_AGENT: &[&str] = &[
    "model",
    "max_tokens",
    "temperature",
    "max_tool_iterations",
    "max_messages",
    "system_prompt",
    "system_prompt_file",
];

const KNOWN_PROVIDER: &[&str] = &["api_key", "api_base", "timeout_secs"];

const KNOWN_SERVER: &[&str] = &["host", "port", "session_cookie", "secure_cookies"];

const KNOWN_TOOLS: &[&str] = &["weather", "instructions"];

const KNOWN_TOOLS_WEATHER: &[&str] = &["geocoding_url", "forecast_url", "timeout_secs"];

const KNOWN_TOOLS_INSTRUCTIONS: &[&str] = &["template_path"];

const KNOWN_LOGGING: &[&str] = &["format", "level", "file"];

/// Nested sections checked for unknown keys, by dotted path.
const SECTIONS: &[(&str, &[&str])] = &[
    ("agent", KNOWN_AGENT),
    ("provider", KNOWN_PROVIDER),
    ("server", KNOWN_SERVER),
    ("tools", KNOWN_TOOLS),
    ("tools.weather", KNOWN_TOOLS_WEATHER),
    ("tools.instructions", KNOWN_TOOLS_INSTRUCTIONS),
    ("logging", KNOWN_LOGGING),
];

/// A validation diagnostic.
#[derive(Debug)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: String,
    pub message: String,
}

#[derive(Debug, PartialEq)]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
}

impl Diagnostic {
    fn new(level: DiagnosticLevel, path: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            DiagnosticLevel::Ok => "[OK]",
            DiagnosticLevel::Warn => "[WARN]",
            DiagnosticLevel::Error => "[ERROR]",
        };
        if self.path.is_empty() {
            write!(f, "{} {}", prefix, self.message)
        } else {
            write!(f, "{} {}: {}", prefix, self.path, self.message)
        }
    }
}

/// Simple Levenshtein distance for "did you mean?" suggestions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in matrix[0].iter_mut().enumerate() {
        *val = j;
    }

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            matrix[i + 1][j + 1] = std::cmp::min(
                std::cmp::min(matrix[i][j + 1] + 1, matrix[i + 1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }
    matrix[a.len()][b.len()]
}

/// Suggest the closest known field name (if distance <= 3).
pub fn suggest_field(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| format!("did you mean '{}'?", k))
}

fn lookup<'a>(root: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted.split('.').try_fold(root, |v, key| v.get(key))
}

fn check_unknown(
    obj: &serde_json::Map<String, Value>,
    prefix: &str,
    known: &[&str],
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let mut has_unknown = false;
    for key in obj.keys() {
        if known.contains(&key.as_str()) {
            continue;
        }
        has_unknown = true;
        let message = match suggest_field(key, known) {
            Some(suggestion) => format!("Unknown field '{}'; {}", key, suggestion),
            None => format!("Unknown field '{}'", key),
        };
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        diagnostics.push(Diagnostic::new(DiagnosticLevel::Error, &path, message));
    }
    has_unknown
}

/// Validate a raw JSON config value: unknown field names and out-of-range values.
pub fn validate_config(raw: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match raw.as_object() {
        Some(o) => o,
        None => {
            diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Error,
                "",
                "Config must be a JSON object",
            ));
            return diagnostics;
        }
    };

    diagnostics.push(Diagnostic::new(DiagnosticLevel::Ok, "", "Valid JSON"));

    let mut has_unknown = check_unknown(obj, "", KNOWN_TOP_LEVEL, &mut diagnostics);
    for (path, known) in SECTIONS {
        if let Some(section) = lookup(raw, path).and_then(|v| v.as_object()) {
            has_unknown |= check_unknown(section, path, known, &mut diagnostics);
        }
    }

    if !has_unknown {
        diagnostics.push(Diagnostic::new(
            DiagnosticLevel::Ok,
            "",
            "All fields recognized",
        ));
    }

    if let Some(n) = lookup(raw, "agent.max_messages").and_then(Value::as_u64) {
        if n == 0 {
            diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Error,
                "agent.max_messages",
                "must be at least 1",
            ));
        }
    }

    if let Some(n) = lookup(raw, "agent.max_tool_iterations").and_then(Value::as_u64) {
        if n == 0 {
            diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Warn,
                "agent.max_tool_iterations",
                "0 disables tool calling entirely",
            ));
        }
    }

    if let Some(t) = lookup(raw, "agent.temperature").and_then(Value::as_f64) {
        if !(0.0..=2.0).contains(&t) {
            diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Error,
                "agent.temperature",
                format!("{} is outside the range 0.0 - 2.0", t),
            ));
        }
    }

    if let Some(port) = lookup(raw, "server.port").and_then(Value::as_u64) {
        if port == 0 || port > u16::MAX as u64 {
            diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Error,
                "server.port",
                format!("{} is not a usable port", port),
            ));
        }
    }

    if let (Some(inline), Some(_)) = (
        lookup(raw, "agent.system_prompt").and_then(Value::as_str),
        lookup(raw, "agent.system_prompt_file").and_then(Value::as_str),
    ) {
        if !inline.is_empty() {
            diagnostics.push(Diagnostic::new(
                DiagnosticLevel::Warn,
                "agent.system_prompt_file",
                "ignored because agent.system_prompt is set",
            ));
        }
    }

    if lookup(raw, "provider.api_key")
        .and_then(Value::as_str)
        .is_some()
    {
        diagnostics.push(Diagnostic::new(
            DiagnosticLevel::Warn,
            "provider.api_key",
            "API key stored in plain text; prefer CHATLINE_PROVIDER_API_KEY",
        ));
    }

    diagnostics
}
