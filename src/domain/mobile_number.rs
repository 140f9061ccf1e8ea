#[derive(Debug, Clone)]
pub struct MobileNumber(String);

impl MobileNumber {
    /// Accepts an optional leading `+` followed by 7 to 15 digits. Spaces, dashes,
    /// dots and parentheses are separators and are dropped from the stored value.
    pub fn parse(s: String) -> Result<MobileNumber, String> {
        let trimmed = s.trim();
        let (prefix, rest) = match trimmed.strip_prefix('+') {
            Some(rest) => ("+", rest),
            None => ("", trimmed),
        };
        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(format!("{} is not a valid mobile number.", s)),
            }
        }
        if !(7..=15).contains(&digits.len()) {
            return Err(format!("{} is not a valid mobile number.", s));
        }
        Ok(Self(format!("{}{}", prefix, digits)))
    }
}

impl AsRef<str> for MobileNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
