use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone)]
pub struct ProfileName(String);

impl ProfileName {
    /// Returns an instance of `ProfileName` if the input satisfies all
    /// our validation constraints on a person's display name.
    pub fn parse(s: String) -> Result<ProfileName, String> {
        let is_empty_or_whitespace = s.trim().is_empty();
        // A grapheme is defined by the Unicode standard as a "user-perceived"
        // character: `å` is a single grapheme, but it is composed of two characters.
        let is_too_long = s.graphemes(true).count() > 256;
        let forbidden_characters = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];
        let contains_forbidden_characters = s.chars().any(|g| forbidden_characters.contains(&g));

        if is_empty_or_whitespace || is_too_long || contains_forbidden_characters {
            Err(format!("{} is not a valid name.", s))
        } else {
            Ok(Self(s.trim().to_string()))
        }
    }
}

impl AsRef<str> for ProfileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
