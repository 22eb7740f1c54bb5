use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAME_RE: Regex = Regex::new(r"^[a-zA-Z\s]+$").unwrap();
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[eE][dD][uU]$").unwrap();
    // The regex crate has no lookaheads: the charset and length are one
    // anchored pattern, the four required classes are checked separately.
    static ref PASSWORD_RE: Regex = Regex::new(r"^[A-Za-z0-9@$!%*?&]{8,}$").unwrap();
    static ref PASSWORD_CLASSES: [Regex; 4] = [
        Regex::new(r"[a-z]").unwrap(),
        Regex::new(r"[A-Z]").unwrap(),
        Regex::new(r"[0-9]").unwrap(),
        Regex::new(r"[@$!%*?&]").unwrap(),
    ];
}

pub const NAME_MSG: &str = "Name must only contain letters and spaces.";
pub const EMAIL_MSG: &str = "Email must be a valid .edu email address.";
pub const PASSWORD_MSG: &str =
    "Password must contain at least one uppercase letter, one digit, and one special character.";

/// Letters and whitespace only, at least one character.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// `local@domain.edu`, suffix in any letter case.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// At least 8 characters from `[A-Za-z0-9@$!%*?&]` with one lowercase,
/// one uppercase, one digit and one symbol.
pub fn is_valid_password(password: &str) -> bool {
    PASSWORD_RE.is_match(password) && PASSWORD_CLASSES.iter().all(|re| re.is_match(password))
}
