use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use syntect::parsing::SyntaxDefinition;

use crate::error::AmbraResult;

/// The default language name, where nothing is highlighted
pub const PLAIN_LANGUAGE_NAME: &str = "plain";

/// A custom grammar registration.
///
/// The grammar source is Sublime-syntax text, the format consumed by the
/// engine. The `name` and `aliases` are what callers can refer to the
/// language by when passing a language identifier as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLanguage {
    /// The name callers use to request this language
    pub name: String,
    /// Alternative identifiers, eg file extensions
    #[serde(default)]
    pub aliases: Vec<String>,
    /// The Sublime-syntax definition source
    pub syntax: String,
}

impl CustomLanguage {
    /// Builds a registration from bare Sublime-syntax source, taking the name
    /// and aliases from the parsed definition itself.
    pub fn from_syntax(syntax: &str) -> AmbraResult<Self> {
        let definition = SyntaxDefinition::load_from_str(syntax, true, None)?;
        Ok(Self {
            name: definition.name.clone(),
            aliases: definition.file_extensions.clone(),
            syntax: syntax.to_owned(),
        })
    }

    /// Reads a JSON descriptor file containing the name, aliases and syntax
    /// source.
    pub fn load_from_file(path: impl AsRef<Path>) -> AmbraResult<Self> {
        let content = fs::read_to_string(path)?;
        let lang: CustomLanguage = serde_json::from_str(&content)?;
        // Surface bad grammars at registration time rather than on first use
        SyntaxDefinition::load_from_str(&lang.syntax, true, Some(&lang.name))?;
        Ok(lang)
    }

    pub(crate) fn definition(&self) -> AmbraResult<SyntaxDefinition> {
        Ok(SyntaxDefinition::load_from_str(
            &self.syntax,
            true,
            Some(&self.name),
        )?)
    }

    pub(crate) fn matches(&self, id: &str) -> bool {
        self.name.eq_ignore_ascii_case(id)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(id))
    }
}

/// The language requested for a highlight pass.
///
/// Callers either name a language (built-in identifier or the name/alias of a
/// registered [`CustomLanguage`]) or pass a custom grammar object inline.
#[derive(Debug, Clone, Default)]
pub enum Language {
    /// No highlighting, everything is a single plain token
    #[default]
    Plain,
    /// A built-in identifier, or the name/alias of a registered custom language
    Named(String),
    /// An inline custom grammar, used as-is
    Custom(Arc<CustomLanguage>),
}

impl From<&str> for Language {
    fn from(value: &str) -> Self {
        if value.is_empty() || value.eq_ignore_ascii_case(PLAIN_LANGUAGE_NAME) {
            Language::Plain
        } else {
            Language::Named(value.to_owned())
        }
    }
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        Language::from(value.as_str())
    }
}

impl From<CustomLanguage> for Language {
    fn from(value: CustomLanguage) -> Self {
        Language::Custom(Arc::new(value))
    }
}

impl From<Arc<CustomLanguage>> for Language {
    fn from(value: Arc<CustomLanguage>) -> Self {
        Language::Custom(value)
    }
}

/// The outcome of language resolution: which grammar a highlight pass will
/// actually use.
#[derive(Debug, Clone)]
pub(crate) enum ResolvedLanguage {
    Plain,
    /// Passed through to the engine's built-in syntax lookup
    Builtin(String),
    Custom(Arc<CustomLanguage>),
}

impl ResolvedLanguage {
    /// Resolution never fails: unknown names stay `Builtin` and are only
    /// rejected (or plain-fallbacked) at engine lookup time.
    pub(crate) fn resolve(lang: &Language, custom_languages: &[Arc<CustomLanguage>]) -> Self {
        match lang {
            Language::Plain => ResolvedLanguage::Plain,
            Language::Custom(custom) => ResolvedLanguage::Custom(custom.clone()),
            Language::Named(id) => {
                if let Some(custom) = custom_languages.iter().find(|c| c.matches(id)) {
                    ResolvedLanguage::Custom(custom.clone())
                } else {
                    ResolvedLanguage::Builtin(id.clone())
                }
            }
        }
    }

    /// The identifier used in cache keys and error messages
    pub(crate) fn id(&self) -> &str {
        match self {
            ResolvedLanguage::Plain => PLAIN_LANGUAGE_NAME,
            ResolvedLanguage::Builtin(id) => id,
            ResolvedLanguage::Custom(custom) => &custom.name,
        }
    }

    pub(crate) fn is_custom(&self) -> bool {
        matches!(self, ResolvedLanguage::Custom(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const CHIRP_SYNTAX: &str = r#"%YAML 1.2
---
name: Chirp
scope: source.chirp
file_extensions:
  - chirp
contexts:
  main:
    - match: '\b(if|else|loop)\b'
      scope: keyword.control.chirp
"#;

    #[test]
    fn can_build_custom_language_from_syntax() {
        let lang = CustomLanguage::from_syntax(CHIRP_SYNTAX).unwrap();
        assert_eq!(lang.name, "Chirp");
        assert_eq!(lang.aliases, vec!["chirp".to_owned()]);
    }

    #[test]
    fn resolves_registered_custom_language_by_name_and_alias() {
        let custom = Arc::new(CustomLanguage::from_syntax(CHIRP_SYNTAX).unwrap());
        let registered = vec![custom.clone()];

        for id in ["Chirp", "chirp", "CHIRP"] {
            let resolved = ResolvedLanguage::resolve(&Language::from(id), &registered);
            assert!(resolved.is_custom());
            assert_eq!(resolved.id(), "Chirp");
        }
    }

    #[test]
    fn unknown_names_stay_builtin() {
        let resolved = ResolvedLanguage::resolve(&Language::from("rust"), &[]);
        assert!(!resolved.is_custom());
        assert_eq!(resolved.id(), "rust");
    }

    #[test]
    fn empty_and_plain_map_to_plain() {
        for id in ["", "plain", "Plain"] {
            let resolved = ResolvedLanguage::resolve(&Language::from(id), &[]);
            assert_eq!(resolved.id(), PLAIN_LANGUAGE_NAME);
        }
    }

    #[test]
    fn inline_custom_language_is_used_verbatim() {
        let custom = CustomLanguage::from_syntax(CHIRP_SYNTAX).unwrap();
        let resolved = ResolvedLanguage::resolve(&Language::from(custom), &[]);
        assert!(resolved.is_custom());
    }

    #[test]
    fn bad_syntax_is_rejected() {
        assert!(CustomLanguage::from_syntax("not a grammar").is_err());
    }

    #[test]
    fn can_load_descriptor_from_json_file() {
        let path = std::env::temp_dir().join("ambra-chirp-descriptor.json");
        // No aliases key, the field defaults to empty
        let descriptor = serde_json::json!({ "name": "Chirp", "syntax": CHIRP_SYNTAX });
        fs::write(&path, descriptor.to_string()).unwrap();

        let lang = CustomLanguage::load_from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(lang.name, "Chirp");
        assert!(lang.aliases.is_empty());
        assert!(lang.matches("chirp"));
    }

    #[test]
    fn descriptor_aliases_are_honored() {
        let path = std::env::temp_dir().join("ambra-chirp-aliases.json");
        let descriptor = serde_json::json!({
            "name": "Chirp",
            "aliases": ["chp", "birdsong"],
            "syntax": CHIRP_SYNTAX,
        });
        fs::write(&path, descriptor.to_string()).unwrap();

        let lang = CustomLanguage::load_from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(lang.matches("birdsong"));
        assert!(!lang.matches("quack"));
    }

    #[test]
    fn descriptor_with_a_bad_grammar_is_rejected_at_load() {
        let path = std::env::temp_dir().join("ambra-bad-descriptor.json");
        fs::write(&path, r#"{"name":"Bad","syntax":"not a grammar"}"#).unwrap();

        let result = CustomLanguage::load_from_file(&path);
        fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(Error::SyntaxParse(_))));
    }

    #[test]
    fn descriptor_with_invalid_json_is_rejected() {
        let path = std::env::temp_dir().join("ambra-not-json.json");
        fs::write(&path, "{{{{").unwrap();

        let result = CustomLanguage::load_from_file(&path);
        fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(Error::Json(_))));
    }
}
