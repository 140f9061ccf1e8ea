use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone)]
pub struct EventTitle(String);

impl EventTitle {
    pub fn parse(s: String) -> Result<EventTitle, String> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("The event title cannot be empty.".to_string());
        }
        if trimmed.graphemes(true).count() > 200 {
            return Err("The event title cannot be longer than 200 characters.".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl AsRef<str> for EventTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
