use chrono::SecondsFormat;

use crate::platform::ChatMessage;

// "<timestamp> | <author>: <content>", or nothing for blank messages.
pub fn format_message(message: &ChatMessage) -> Option<String> {
    if message.content.trim().is_empty() {
        return None;
    }
    Some(format!(
        "{} | {}: {}",
        message
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        message.author.name,
        message.content
    ))
}

pub fn format_messages(messages: &[ChatMessage]) -> Vec<String> {
    messages.iter().filter_map(format_message).collect()
}

pub fn channel_header(name: &str) -> String {
    format!("Channel: #{name}")
}

pub fn channel_section(name: &str, lines: &[String]) -> Option<String> {
    if lines.is_empty() {
        return None;
    }
    let mut section = channel_header(name);
    for line in lines {
        section.push('\n');
        section.push_str(line);
    }
    Some(section)
}
