//! ANSI color helpers for terminal output

use colored::Colorize;

/// Get colored stage name
pub fn stage(name: &str) -> String {
    name.cyan().bold().to_string()
}

/// Get colored location
pub fn location(name: &str) -> String {
    name.blue().to_string()
}

/// Get colored header
pub fn header(text: &str) -> String {
    text.bold().underline().to_string()
}

/// Get colored label
pub fn label(text: &str) -> String {
    text.white().dimmed().to_string()
}

/// Get colored value
pub fn value(text: &str) -> String {
    text.white().to_string()
}

/// Get colored success message
pub fn success(text: &str) -> String {
    format!("{} {}", "✓".green(), text)
}

/// Get colored warning message
pub fn warning(text: &str) -> String {
    format!("{} {}", "⚠".yellow(), text)
}

/// Get colored error message
pub fn error(text: &str) -> String {
    format!("{} {}", "✗".red(), text)
}

/// Format count with comma separators
pub fn format_count(n: i64) -> String {
    let s = n.unsigned_abs().to_string();
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::new();
    if n < 0 {
        result.push('-');
    }

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}
