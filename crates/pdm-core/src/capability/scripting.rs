#![forbid(unsafe_code)]

//! Scripting facet: exposes a field to automation under a script keyword.

use crate::keyword::to_script_keyword;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptingCapability {
    script_keyword: String,
}

impl ScriptingCapability {
    /// Facet whose script keyword is derived from the field keyword.
    #[must_use]
    pub fn for_field(field_keyword: &str) -> Self {
        Self {
            script_keyword: to_script_keyword(field_keyword),
        }
    }

    /// Facet with an explicit script keyword.
    #[must_use]
    pub fn with_keyword(script_keyword: impl Into<String>) -> Self {
        Self {
            script_keyword: script_keyword.into(),
        }
    }

    #[must_use]
    pub fn script_keyword(&self) -> &str {
        &self.script_keyword
    }

    /// Tooltip text extended with the scripting name.
    #[must_use]
    pub fn help_string(&self, tooltip: &str) -> String {
        let mut help = tooltip.trim_end().to_string();
        if !help.is_empty() {
            if !help.ends_with('.') {
                help.push('.');
            }
            help.push(' ');
        }
        help.push_str(&format!(
            "Available to scripts as the attribute '{}'",
            self.script_keyword
        ));
        help
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_keyword_is_snake_case() {
        let cap = ScriptingCapability::for_field("UserDescription");
        assert_eq!(cap.script_keyword(), "user_description");
    }

    #[test]
    fn help_string_appends_keyword() {
        let cap = ScriptingCapability::with_keyword("count");
        assert_eq!(
            cap.help_string("Number of items"),
            "Number of items. Available to scripts as the attribute 'count'"
        );
        assert_eq!(
            cap.help_string(""),
            "Available to scripts as the attribute 'count'"
        );
    }
}
