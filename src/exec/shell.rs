// ABOUTME: POSIX shell quoting helpers.
// ABOUTME: Every path, tag and value interpolated into a command goes through quote().

use std::borrow::Cow;

/// Quote `value` for safe interpolation into a POSIX shell command.
pub fn quote(value: &str) -> String {
    match shlex::try_quote(value) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        // Only NUL bytes are rejected; a shell argument cannot carry them anyway.
        Err(_) => format!("'{}'", value.replace('\0', "").replace('\'', "'\\''")),
    }
}

/// `export K='v';` prefix that makes `vars` visible to a shell command.
pub fn env_prefix(vars: &[(String, String)]) -> String {
    if vars.is_empty() {
        return String::new();
    }
    let assignments: Vec<String> = vars
        .iter()
        .map(|(key, value)| format!("{}={}", key, quote(value)))
        .collect();
    format!("export {}; ", assignments.join(" "))
}
