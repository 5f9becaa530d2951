use std::sync::Arc;

use once_cell::sync::Lazy;
use syntect::highlighting::Theme;
use syntect::html::{
    ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style, highlighted_html_for_string,
};
use syntect::parsing::{SyntaxReference, SyntaxSet, SyntaxSetBuilder};
use syntect::util::LinesWithEndings;

use crate::error::{AmbraResult, Error};
use crate::languages::{CustomLanguage, ResolvedLanguage};
use crate::themes::ThemeVariant;

// The engine's bundled syntaxes, loaded once per process and shared by every
// highlight pass that does not involve a custom grammar
static BUILTIN_SYNTAXES: Lazy<Arc<SyntaxSet>> =
    Lazy::new(|| Arc::new(SyntaxSet::load_defaults_newlines()));

/// How generated markup carries its styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightStyle {
    /// Colors inline in `style` attributes
    #[default]
    Inline,
    /// Scope-derived CSS classes with the given prefix. Useful for avoiding
    /// name collisions, pair with [`Highlighter::generate_css`].
    ///
    /// [`Highlighter::generate_css`]: crate::Highlighter::generate_css
    Classes(&'static str),
}

fn class_style(prefix: &'static str) -> ClassStyle {
    if prefix.is_empty() {
        ClassStyle::Spaced
    } else {
        ClassStyle::SpacedPrefixed { prefix }
    }
}

pub(crate) fn builtin_contains(id: &str) -> bool {
    BUILTIN_SYNTAXES.find_syntax_by_token(id).is_some()
}

/// One delegation unit over the external engine: a syntax set plus the
/// resolved theme variant it renders with.
///
/// The built-in variant is cheap to create (two `Arc` clones), custom
/// variants compile a grammar and are meant to be cached.
#[derive(Debug, Clone)]
pub(crate) struct Engine {
    syntaxes: Arc<SyntaxSet>,
    theme: ThemeVariant<Arc<Theme>>,
}

impl Engine {
    /// An engine over the process-wide built-in syntax set
    pub(crate) fn shared(theme: ThemeVariant<Arc<Theme>>) -> Self {
        Engine {
            syntaxes: Arc::clone(&BUILTIN_SYNTAXES),
            theme,
        }
    }

    /// Builds a fresh syntax set holding the custom grammar and a plain text
    /// fallback. This is the expensive step the engine cache exists for.
    pub(crate) fn for_custom(
        lang: &CustomLanguage,
        theme: ThemeVariant<Arc<Theme>>,
    ) -> AmbraResult<Self> {
        log::debug!("building engine for custom language '{}'", lang.name);
        let mut builder = SyntaxSetBuilder::new();
        builder.add_plain_text_syntax();
        builder.add(lang.definition()?);
        Ok(Engine {
            syntaxes: Arc::new(builder.build()),
            theme,
        })
    }

    // Token lookup (name or extension), with a case-insensitive name scan so
    // that eg `rust` finds the `Rust` syntax
    fn lookup(&self, id: &str) -> Option<&SyntaxReference> {
        self.syntaxes.find_syntax_by_token(id).or_else(|| {
            self.syntaxes
                .syntaxes()
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(id))
        })
    }

    fn find_syntax(
        &self,
        resolved: &ResolvedLanguage,
        fallback_to_plain: bool,
    ) -> AmbraResult<&SyntaxReference> {
        let syntax = match resolved {
            ResolvedLanguage::Plain => Some(self.syntaxes.find_syntax_plain_text()),
            ResolvedLanguage::Builtin(id) => self.lookup(id),
            ResolvedLanguage::Custom(custom) => self.lookup(&custom.name),
        };

        match syntax {
            Some(syntax) => Ok(syntax),
            None if fallback_to_plain => {
                log::debug!("language '{}' not found, falling back to plain", resolved.id());
                Ok(self.syntaxes.find_syntax_plain_text())
            }
            None => Err(Error::LanguageNotFound(resolved.id().to_owned())),
        }
    }

    /// Delegates markup generation to the engine.
    ///
    /// Returns the display name of the syntax actually used and the HTML. For
    /// [`HighlightStyle::Classes`] the markup is theme-independent and the
    /// theme variant only matters for [`css`]; that is why dual themes are
    /// rejected for inline rendering.
    pub(crate) fn render_html(
        &self,
        code: &str,
        resolved: &ResolvedLanguage,
        style: HighlightStyle,
        fallback_to_plain: bool,
    ) -> AmbraResult<(String, String)> {
        let syntax = self.find_syntax(resolved, fallback_to_plain)?;
        let language = syntax.name.clone();

        let html = match style {
            HighlightStyle::Inline => {
                let theme = match &self.theme {
                    ThemeVariant::Single(theme) => theme,
                    ThemeVariant::Dual { .. } => return Err(Error::DualThemeNeedsClasses),
                };
                highlighted_html_for_string(code, &self.syntaxes, syntax, theme)?
            }
            HighlightStyle::Classes(prefix) => {
                let mut generator = ClassedHTMLGenerator::new_with_class_style(
                    syntax,
                    &self.syntaxes,
                    class_style(prefix),
                );
                for line in LinesWithEndings::from(code) {
                    generator.parse_html_for_line_which_includes_newline(line)?;
                }
                format!(
                    r#"<pre class="ambra"><code data-lang="{}">{}</code></pre>"#,
                    language,
                    generator.finalize()
                )
            }
        };

        Ok((language, html))
    }
}

/// Stylesheet for class-styled markup. The dark half of a dual variant is
/// wrapped in a `prefers-color-scheme` media block.
pub(crate) fn css(theme: &ThemeVariant<Arc<Theme>>, prefix: &'static str) -> AmbraResult<String> {
    match theme {
        ThemeVariant::Single(theme) => Ok(css_for_theme_with_class_style(theme, class_style(prefix))?),
        ThemeVariant::Dual { light, dark } => {
            let light_css = css_for_theme_with_class_style(light, class_style(prefix))?;
            let dark_css = css_for_theme_with_class_style(dark, class_style(prefix))?;
            Ok(format!(
                "{light_css}\n@media (prefers-color-scheme: dark) {{\n{dark_css}}}\n"
            ))
        }
    }
}
