use crate::domain::event::Event;

/// The message every confirmed subscriber receives when an event is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub text_body: String,
}

impl Notification {
    pub fn for_event(event: &Event) -> Notification {
        let subject = format!("[New Event] {}", event.title);
        let text_body = format!(
            "New event: {}\n  - Category: {}\n  - When: {} at {}\n  - Where: {}\n  - Description: {}",
            event.title,
            event.category,
            event.formatted_date(),
            event.formatted_time(),
            event.location,
            event.description
        );

        Notification { subject, text_body }
    }

    pub fn html_body(&self) -> String {
        let lines: Vec<String> = self
            .text_body
            .lines()
            .map(|line| format!("<p>{}</p>", escape_html(line.trim())))
            .collect();

        format!("<div>{}</div>", lines.join(""))
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for char in text.chars() {
        match char {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(char),
        }
    }

    escaped
}
