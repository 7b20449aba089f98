//! Release title and body preparation.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Default title template: the full reference, verbatim.
pub const DEFAULT_TITLE_TEMPLATE: &str = "{ref}";

/// How the commit message is turned into the release body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotesPolicy {
    /// Use the message exactly as committed.
    #[default]
    Verbatim,
    /// Backslash-escape markdown syntax and `@` so the body renders as
    /// plain text and mentions nobody.
    EscapeMarkdown,
}

impl NotesPolicy {
    /// Applies the policy to a commit message.
    #[must_use]
    pub fn apply<'a>(&self, message: &'a str) -> Cow<'a, str> {
        match self {
            Self::Verbatim => Cow::Borrowed(message),
            Self::EscapeMarkdown => escape_markdown(message),
        }
    }
}

fn escape_markdown(message: &str) -> Cow<'_, str> {
    const SPECIAL: &[char] = &[
        '\\', '`', '*', '_', '[', ']', '<', '>', '#', '|', '~', '!', '(', ')', '@',
    ];

    if !message.contains(SPECIAL) {
        return Cow::Borrowed(message);
    }

    let mut out = String::with_capacity(message.len() + 8);
    for c in message.chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Expands `{ref}` and `{tag}` in a title template.
#[must_use]
pub fn render_title(template: &str, git_ref: &str, tag_name: &str) -> String {
    template.replace("{ref}", git_ref).replace("{tag}", tag_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbatim_keeps_message() {
        let msg = "Release **6.9.6**\n\n- fixes #12 @someone";
        assert_eq!(NotesPolicy::Verbatim.apply(msg), msg);
        assert!(matches!(NotesPolicy::Verbatim.apply(msg), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_markdown() {
        let escaped = NotesPolicy::EscapeMarkdown.apply("**bold** <b> @user");
        assert_eq!(escaped, r"\*\*bold\*\* \<b\> \@user");
    }

    #[test]
    fn test_escape_plain_text_borrows() {
        let out = NotesPolicy::EscapeMarkdown.apply("plain release notes 1.0");
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_empty_body_stays_empty() {
        assert_eq!(NotesPolicy::EscapeMarkdown.apply(""), "");
        assert_eq!(NotesPolicy::Verbatim.apply(""), "");
    }

    #[test]
    fn test_render_title() {
        assert_eq!(
            render_title(DEFAULT_TITLE_TEMPLATE, "refs/tags/v6.9.6", "v6.9.6"),
            "refs/tags/v6.9.6"
        );
        assert_eq!(
            render_title("Release {tag}", "refs/tags/v6.9.6", "v6.9.6"),
            "Release v6.9.6"
        );
    }

    #[test]
    fn test_policy_serde() {
        let policy: NotesPolicy = serde_json::from_str(r#""escape_markdown""#).unwrap();
        assert_eq!(policy, NotesPolicy::EscapeMarkdown);
    }
}
