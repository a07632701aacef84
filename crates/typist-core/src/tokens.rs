//! Template tokens inside shortcut content.
//!
//! Recognized tokens are `{date}`, `{time}`, `{clipboard}` and
//! `{prompt:Name}`. Anything else between braces, including unterminated or
//! malformed tokens, is copied to the output unchanged.

use crate::clipboard::ClipboardGateway;
use crate::config::Settings;
use crate::prompt::ValuePrompt;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Local, Timelike};
use std::collections::HashMap;
use tracing::debug;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Patterns used for `{date}` and `{time}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormats {
    pub date: String,
    pub time: String,
}

impl From<&Settings> for DateFormats {
    fn from(settings: &Settings) -> Self {
        Self {
            date: settings.date_format.clone(),
            time: settings.time_format.clone(),
        }
    }
}

pub struct TokenExpander {
    clock: Box<dyn Clock + Send>,
    prompt: Box<dyn ValuePrompt + Send>,
}

impl TokenExpander {
    pub fn new(clock: Box<dyn Clock + Send>, prompt: Box<dyn ValuePrompt + Send>) -> Self {
        Self { clock, prompt }
    }

    /// Resolve every token in `template` in a single left-to-right pass.
    ///
    /// Blocks the calling thread while a `{prompt:...}` is answered. A field
    /// that appears more than once is only asked for once.
    pub fn expand(
        &self,
        template: &str,
        formats: &DateFormats,
        clipboard: &mut dyn ClipboardGateway,
    ) -> String {
        let mut out = String::with_capacity(template.len());
        let mut answers: HashMap<String, String> = HashMap::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            match after.find('}') {
                Some(close) => {
                    let inner = &after[..close];
                    match self.resolve(inner, formats, clipboard, &mut answers) {
                        Some(value) => out.push_str(&value),
                        None => {
                            out.push('{');
                            out.push_str(inner);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }

    fn resolve(
        &self,
        inner: &str,
        formats: &DateFormats,
        clipboard: &mut dyn ClipboardGateway,
        answers: &mut HashMap<String, String>,
    ) -> Option<String> {
        match inner {
            "date" => Some(format_datetime(&self.clock.now(), &formats.date)),
            "time" => Some(format_datetime(&self.clock.now(), &formats.time)),
            "clipboard" => Some(match clipboard.read_text() {
                Ok(text) => text.unwrap_or_default(),
                Err(err) => {
                    debug!(error = %err, "Clipboard unavailable for {{clipboard}} token");
                    String::new()
                }
            }),
            _ => {
                let field = inner.strip_prefix("prompt:")?;
                if field.is_empty() {
                    return None;
                }
                if let Some(answer) = answers.get(field) {
                    return Some(answer.clone());
                }
                let answer = self
                    .prompt
                    .request(field)
                    .blocking_recv()
                    .ok()
                    .flatten()
                    .unwrap_or_default();
                answers.insert(field.to_string(), answer.clone());
                Some(answer)
            }
        }
    }
}

/// Format `dt` with a .NET-style pattern (`yyyy-MM-dd`, `HH:mm`, `dddd`, `tt`)
/// or, when the pattern contains `%`, a strftime pattern. An invalid strftime
/// pattern is returned as-is.
pub fn format_datetime(dt: &DateTime<Local>, pattern: &str) -> String {
    if pattern.contains('%') {
        if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
            return pattern.to_string();
        }
        return dt.format(pattern).to_string();
    }

    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' || c == '"' {
            let end = chars[i + 1..]
                .iter()
                .position(|&q| q == c)
                .map(|p| i + 1 + p)
                .unwrap_or(chars.len());
            out.extend(&chars[i + 1..end]);
            i = end + 1;
            continue;
        }

        if c == '\\' {
            if let Some(&next) = chars.get(i + 1) {
                out.push(next);
            }
            i += 2;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&r| r == c).count();
        match c {
            'y' => match run {
                1 => out.push_str(&(dt.year() % 100).to_string()),
                2 => out.push_str(&format!("{:02}", dt.year() % 100)),
                n => out.push_str(&format!("{:0width$}", dt.year(), width = n)),
            },
            'M' => match run {
                1 => out.push_str(&dt.month().to_string()),
                2 => out.push_str(&format!("{:02}", dt.month())),
                3 => out.push_str(&dt.format("%b").to_string()),
                _ => out.push_str(&dt.format("%B").to_string()),
            },
            'd' => match run {
                1 => out.push_str(&dt.day().to_string()),
                2 => out.push_str(&format!("{:02}", dt.day())),
                3 => out.push_str(&dt.format("%a").to_string()),
                _ => out.push_str(&dt.format("%A").to_string()),
            },
            'H' => out.push_str(&pad(dt.hour(), run)),
            'h' => out.push_str(&pad(dt.hour12().1, run)),
            'm' => out.push_str(&pad(dt.minute(), run)),
            's' => out.push_str(&pad(dt.second(), run)),
            'f' => {
                let digits = format!("{:09}", dt.nanosecond() % 1_000_000_000);
                out.push_str(&digits[..run.min(9)]);
            }
            't' => {
                let marker = if dt.hour12().0 { "PM" } else { "AM" };
                out.push_str(if run == 1 { &marker[..1] } else { marker });
            }
            'z' => {
                let offset = dt.offset().local_minus_utc();
                let sign = if offset < 0 { '-' } else { '+' };
                let hours = offset.abs() / 3600;
                let minutes = (offset.abs() % 3600) / 60;
                match run {
                    1 => out.push_str(&format!("{}{}", sign, hours)),
                    2 => out.push_str(&format!("{}{:02}", sign, hours)),
                    _ => out.push_str(&format!("{}{:02}:{:02}", sign, hours, minutes)),
                }
            }
            _ => {
                out.extend(std::iter::repeat(c).take(run));
            }
        }
        i += run;
    }

    out
}

fn pad(value: u32, run: usize) -> String {
    if run == 1 {
        value.to_string()
    } else {
        format!("{:02}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ClipboardContent;
    use crate::error::Result;
    use crate::prompt::NoPrompt;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    struct StaticClipboard(Option<String>);

    impl ClipboardGateway for StaticClipboard {
        fn read(&mut self) -> Result<ClipboardContent> {
            Ok(ClipboardContent {
                plain_text: self.0.clone(),
                ..ClipboardContent::default()
            })
        }

        fn write(&mut self, _content: &ClipboardContent) -> Result<()> {
            panic!("token expansion must not write the clipboard");
        }
    }

    struct CountingPrompt {
        answer: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl ValuePrompt for CountingPrompt {
        fn request(&self, _field: &str) -> oneshot::Receiver<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(self.answer.map(str::to_string));
            rx
        }
    }

    struct DroppedPrompt;

    impl ValuePrompt for DroppedPrompt {
        fn request(&self, _field: &str) -> oneshot::Receiver<Option<String>> {
            let (_tx, rx) = oneshot::channel();
            rx
        }
    }

    fn instant() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 14, 5, 9).unwrap()
    }

    fn formats() -> DateFormats {
        DateFormats {
            date: "yyyy-MM-dd".to_string(),
            time: "HH:mm".to_string(),
        }
    }

    fn expander() -> TokenExpander {
        TokenExpander::new(Box::new(FixedClock(instant())), Box::new(NoPrompt))
    }

    fn expand(expander: &TokenExpander, template: &str) -> String {
        let mut clipboard = StaticClipboard(Some("copied".to_string()));
        expander.expand(template, &formats(), &mut clipboard)
    }

    #[test]
    fn content_without_tokens_is_unchanged() {
        let text = "Best regards,\nJane";
        assert_eq!(expand(&expander(), text), text);
    }

    #[test]
    fn date_time_and_clipboard() {
        assert_eq!(
            expand(&expander(), "{date} {time} [{clipboard}]"),
            "2024-01-15 14:05 [copied]"
        );
    }

    #[test]
    fn missing_clipboard_text_is_empty() {
        let mut clipboard = StaticClipboard(None);
        assert_eq!(expander().expand("<{clipboard}>", &formats(), &mut clipboard), "<>");
    }

    #[test]
    fn unknown_and_malformed_tokens_stay_verbatim() {
        let expander = expander();
        assert_eq!(expand(&expander, "{unknown}"), "{unknown}");
        assert_eq!(expand(&expander, "{prompt:}"), "{prompt:}");
        assert_eq!(expand(&expander, "open {date"), "open {date");
        assert_eq!(expand(&expander, "{a{date}"), "{a{date}");
        assert_eq!(expand(&expander, "{{date}}"), "{{date}}");
        assert_eq!(expand(&expander, "}{}"), "}{}");
    }

    #[test]
    fn repeated_prompt_field_is_asked_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let expander = TokenExpander::new(
            Box::new(FixedClock(instant())),
            Box::new(CountingPrompt {
                answer: Some("Ada"),
                calls: calls.clone(),
            }),
        );
        assert_eq!(
            expand(&expander, "Hi {prompt:Name}, bye {prompt:Name} ({prompt:Team})"),
            "Hi Ada, bye Ada (Ada)"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    struct EchoPrompt;

    impl ValuePrompt for EchoPrompt {
        fn request(&self, field: &str) -> oneshot::Receiver<Option<String>> {
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(Some(format!("<{}>", field)));
            rx
        }
    }

    #[test]
    fn token_ends_at_first_closing_brace() {
        let expander = TokenExpander::new(Box::new(FixedClock(instant())), Box::new(EchoPrompt));
        assert_eq!(expand(&expander, "Hi {prompt:Na{me}!"), "Hi <Na{me>!");
        assert_eq!(expand(&expander, "{prompt:a}b}"), "<a>b}");
    }

    #[test]
    fn cancelled_or_dropped_prompt_is_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cancelled = TokenExpander::new(
            Box::new(FixedClock(instant())),
            Box::new(CountingPrompt { answer: None, calls }),
        );
        assert_eq!(expand(&cancelled, "[{prompt:X}]"), "[]");

        let dropped = TokenExpander::new(Box::new(FixedClock(instant())), Box::new(DroppedPrompt));
        assert_eq!(expand(&dropped, "[{prompt:X}]"), "[]");
    }

    #[test]
    fn dotnet_patterns() {
        let dt = instant();
        assert_eq!(format_datetime(&dt, "dd/MM/yy"), "15/01/24");
        assert_eq!(format_datetime(&dt, "dddd, MMMM d"), "Monday, January 15");
        assert_eq!(format_datetime(&dt, "ddd MMM"), "Mon Jan");
        assert_eq!(format_datetime(&dt, "h:mm tt"), "2:05 PM");
        assert_eq!(format_datetime(&dt, "HH:mm:ss"), "14:05:09");
        assert_eq!(format_datetime(&dt, "'Week of' yyyy"), "Week of 2024");
        assert_eq!(format_datetime(&dt, "\\y yyyy"), "y 2024");
    }

    #[test]
    fn strftime_patterns_and_invalid_fallback() {
        let dt = instant();
        assert_eq!(format_datetime(&dt, "%Y/%m/%d"), "2024/01/15");
        assert_eq!(format_datetime(&dt, "%Q"), "%Q");
    }
}
