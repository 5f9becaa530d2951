use std::fmt;
use std::io::{BufRead, Seek};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use syntect::highlighting::Theme;

use crate::cache::EngineCache;
use crate::engine::{self, Engine, HighlightStyle};
use crate::error::AmbraResult;
use crate::languages::{CustomLanguage, Language, ResolvedLanguage};
use crate::nodes::{self, HtmlNode, Transformer};
use crate::themes::{ThemeStore, ThemeVariant};
use crate::throttle::Throttle;

#[inline]
pub(crate) fn normalize_string(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

/// Options for a single highlight pass.
#[derive(Clone)]
pub struct HighlightOptions {
    pub(crate) lang: Language,
    pub(crate) theme: ThemeVariant<String>,
    pub(crate) style: HighlightStyle,
    pub(crate) fallback_to_plain: bool,
    pub(crate) transformers: Vec<Transformer>,
}

impl HighlightOptions {
    /// Creates new highlight options with the given language and theme.
    ///
    /// Unknown language names fall back to plain text by default, which is
    /// what a keystroke-driven editor wants while an identifier is being
    /// typed. Use [`fallback_to_plain`](Self::fallback_to_plain) to surface
    /// an error instead.
    pub fn new(lang: impl Into<Language>, theme: ThemeVariant<&str>) -> Self {
        Self {
            lang: lang.into(),
            theme: theme.to_owned_names(),
            style: HighlightStyle::default(),
            fallback_to_plain: true,
            transformers: Vec::new(),
        }
    }

    /// Whether colors go inline in `style` attributes or into prefixed CSS
    /// classes
    pub fn highlight_style(mut self, style: HighlightStyle) -> Self {
        self.style = style;
        self
    }

    /// Whether to fall back to plain text when the requested language is
    /// unknown
    pub fn fallback_to_plain(mut self, value: bool) -> Self {
        self.fallback_to_plain = value;
        self
    }

    /// Adds a hook run over the generated node tree, invoked once per node,
    /// parents first. See [`remove_tab_index_from_pre`].
    ///
    /// [`remove_tab_index_from_pre`]: crate::remove_tab_index_from_pre
    pub fn transformer(mut self, f: impl Fn(&mut HtmlNode) + Send + Sync + 'static) -> Self {
        self.transformers.push(Arc::new(f));
        self
    }
}

impl fmt::Debug for HighlightOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlightOptions")
            .field("lang", &self.lang)
            .field("theme", &self.theme)
            .field("style", &self.style)
            .field("fallback_to_plain", &self.fallback_to_plain)
            .field("transformers", &self.transformers.len())
            .finish()
    }
}

/// The result of a highlight pass
#[derive(Debug, Clone)]
pub struct Highlighted {
    /// Display name of the syntax actually used, eg `Rust`
    pub language: String,
    /// The markup generated by the engine
    pub html: String,
    /// The markup converted into an owned node tree, transformers applied
    pub nodes: Vec<HtmlNode>,
}

/// The main struct in ambra.
///
/// Holds the registered custom languages and themes, the engine cache, and
/// the optional throttle. It delegates tokenization and rendering to the
/// engine; its own work is resolving what to highlight with and reusing
/// engine instances.
#[derive(Default)]
pub struct Highlighter {
    custom_languages: Vec<Arc<CustomLanguage>>,
    themes: ThemeStore,
    cache: EngineCache,
    throttle: Option<Throttle>,
}

impl Highlighter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`new`](Self::new), with throttled highlighting enabled:
    /// successive [`highlight_throttled`](Self::highlight_throttled) passes
    /// are kept at least `delay` apart.
    pub fn with_delay(delay: Duration) -> AmbraResult<Self> {
        let mut highlighter = Self::new();
        highlighter.set_delay(delay)?;
        Ok(highlighter)
    }

    /// Enables (or changes) throttling. Any pass pending on the previous
    /// delay is cancelled.
    pub fn set_delay(&mut self, delay: Duration) -> AmbraResult<()> {
        self.throttle = Some(Throttle::new(delay)?);
        Ok(())
    }

    /// Registers a custom language. The grammar is validated now so a bad
    /// definition fails here rather than on first use.
    pub fn add_custom_language(&mut self, lang: CustomLanguage) -> AmbraResult<()> {
        lang.definition()?;
        self.custom_languages.push(Arc::new(lang));
        Ok(())
    }

    /// Reads a JSON descriptor file and registers it as a custom language.
    pub fn add_custom_language_from_file(&mut self, path: impl AsRef<Path>) -> AmbraResult<()> {
        let lang = CustomLanguage::load_from_file(path)?;
        self.custom_languages.push(Arc::new(lang));
        Ok(())
    }

    /// Registers a theme under the given name, shadowing a built-in theme of
    /// the same name.
    pub fn add_theme(&mut self, name: &str, theme: Theme) {
        self.themes.add(name, theme);
    }

    /// Reads `.tmTheme` data from a reader and registers it under the given
    /// name.
    pub fn add_theme_from_reader<R: BufRead + Seek>(
        &mut self,
        name: &str,
        reader: &mut R,
    ) -> AmbraResult<()> {
        self.themes.add_from_reader(name, reader)
    }

    /// Reads a `.tmTheme` file and registers it. Returns the name the theme
    /// can be requested by.
    pub fn add_theme_from_file(&mut self, path: impl AsRef<Path>) -> AmbraResult<String> {
        self.themes.add_from_file(path)
    }

    /// Checks whether the given language is available, as a registered custom
    /// language or a built-in one
    pub fn contains_language(&self, id: &str) -> bool {
        self.custom_languages.iter().any(|c| c.matches(id)) || engine::builtin_contains(id)
    }

    /// Checks whether the given theme is available
    pub fn contains_theme(&self, name: &str) -> bool {
        self.themes.contains(name)
    }

    /// Stylesheet for [`HighlightStyle::Classes`] output with the same
    /// prefix. The dark half of a dual variant is wrapped in a
    /// `prefers-color-scheme` media block.
    pub fn generate_css(
        &self,
        theme: ThemeVariant<&str>,
        prefix: &'static str,
    ) -> AmbraResult<String> {
        let resolved = self.themes.resolve_variant(&theme.to_owned_names())?;
        engine::css(&resolved, prefix)
    }

    fn engine_for(
        &self,
        resolved: &ResolvedLanguage,
        theme_names: &ThemeVariant<String>,
    ) -> AmbraResult<Arc<Engine>> {
        let theme = self.themes.resolve_variant(theme_names)?;
        match resolved {
            ResolvedLanguage::Custom(custom) => {
                let key = EngineCache::cache_key(&custom.name, &theme_names.key());
                self.cache
                    .get_or_create(&key, || Engine::for_custom(custom, theme.clone()))
            }
            ResolvedLanguage::Builtin(_) | ResolvedLanguage::Plain => {
                Ok(Arc::new(Engine::shared(theme)))
            }
        }
    }

    /// The main entry point: one synchronous highlight pass.
    pub fn highlight(&self, code: &str, options: &HighlightOptions) -> AmbraResult<Highlighted> {
        let resolved = ResolvedLanguage::resolve(&options.lang, &self.custom_languages);
        let engine = self.engine_for(&resolved, &options.theme)?;
        run_pass(code, &resolved, &engine, options)
    }

    /// Routes a highlight pass through the throttle and delivers the result
    /// to `callback` on the throttle's worker thread.
    ///
    /// Without a configured delay this degrades to an immediate pass on the
    /// calling thread. Language and theme resolution happen up front, so a
    /// missing theme or a broken custom grammar is reported without waiting
    /// for the throttle window.
    pub fn highlight_throttled(
        &self,
        code: &str,
        options: HighlightOptions,
        callback: impl FnOnce(AmbraResult<Highlighted>) + Send + 'static,
    ) {
        let Some(throttle) = &self.throttle else {
            callback(self.highlight(code, &options));
            return;
        };

        let resolved = ResolvedLanguage::resolve(&options.lang, &self.custom_languages);
        let engine = match self.engine_for(&resolved, &options.theme) {
            Ok(engine) => engine,
            Err(err) => {
                callback(Err(err));
                return;
            }
        };

        let code = code.to_owned();
        throttle.submit(Box::new(move || {
            callback(run_pass(&code, &resolved, &engine, &options));
        }));
    }
}

fn run_pass(
    code: &str,
    resolved: &ResolvedLanguage,
    engine: &Engine,
    options: &HighlightOptions,
) -> AmbraResult<Highlighted> {
    let code = normalize_string(code);
    let (language, html) =
        engine.render_html(&code, resolved, options.style, options.fallback_to_plain)?;
    let mut parsed = nodes::parse_html(&html);
    nodes::apply_transformers(&mut parsed, &options.transformers);
    Ok(Highlighted {
        language,
        html,
        nodes: parsed,
    })
}
