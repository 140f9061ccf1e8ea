use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone)]
pub struct CompanyName(String);

impl CompanyName {
    /// Company names may contain punctuation such as `&` or parentheses,
    /// but never markup delimiters.
    pub fn parse(s: String) -> Result<CompanyName, String> {
        let trimmed = s.trim();
        let is_too_long = trimmed.graphemes(true).count() > 256;
        let contains_markup = trimmed.chars().any(|c| ['<', '>', '{', '}'].contains(&c));

        if trimmed.is_empty() || is_too_long || contains_markup {
            Err(format!("{} is not a valid company name.", s))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }
}

impl AsRef<str> for CompanyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
