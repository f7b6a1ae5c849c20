//! Builds the human-readable prompt description from the
//! `description-pattern` CLI key, substituting the `%1$s` placeholder
//! with the resolved application id.
//!
//! Unknown placeholders fail loudly rather than being left in place,
//! since a silently-wrong prompt description is worse than a startup
//! error.

use tb_domain::{Error, Result};

pub fn build(pattern: &str, application_id: &str) -> Result<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            Some('1') => {
                chars.next();
                if chars.peek() == Some(&'$') {
                    chars.next();
                    if chars.peek() == Some(&'s') {
                        chars.next();
                        out.push_str(application_id);
                        continue;
                    }
                }
                return Err(unknown_placeholder(pattern));
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => return Err(unknown_placeholder(pattern)),
        }
    }

    Ok(out)
}

fn unknown_placeholder(pattern: &str) -> Error {
    Error::Configuration(format!(
        "description-pattern {pattern:?} contains an unrecognized placeholder (only %1$s and %% are supported)"
    ))
}
