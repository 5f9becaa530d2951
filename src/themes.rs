use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use syntect::highlighting::{Theme, ThemeSet};

use crate::error::{AmbraResult, Error};

// The engine ships a small set of themes, loaded once per process
static BUILTIN_THEMES: Lazy<HashMap<String, Arc<Theme>>> = Lazy::new(|| {
    ThemeSet::load_defaults()
        .themes
        .into_iter()
        .map(|(name, theme)| (name, Arc::new(theme)))
        .collect()
});

/// A single theme, or a light/dark pair rendered from one highlight pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeVariant<T> {
    Single(T),
    Dual { light: T, dark: T },
}

impl<T> ThemeVariant<T> {
    pub fn is_dual(&self) -> bool {
        matches!(self, ThemeVariant::Dual { .. })
    }
}

impl<T: AsRef<str>> ThemeVariant<T> {
    /// The stable string identifying this variant in engine cache keys
    pub(crate) fn key(&self) -> String {
        match self {
            ThemeVariant::Single(name) => name.as_ref().to_owned(),
            ThemeVariant::Dual { light, dark } => {
                format!("{}+{}", light.as_ref(), dark.as_ref())
            }
        }
    }

    pub(crate) fn to_owned_names(&self) -> ThemeVariant<String> {
        match self {
            ThemeVariant::Single(name) => ThemeVariant::Single(name.as_ref().to_owned()),
            ThemeVariant::Dual { light, dark } => ThemeVariant::Dual {
                light: light.as_ref().to_owned(),
                dark: dark.as_ref().to_owned(),
            },
        }
    }
}

/// Registered custom themes, looked up before the engine's built-in ones.
#[derive(Debug, Clone, Default)]
pub(crate) struct ThemeStore {
    themes: HashMap<String, Arc<Theme>>,
}

impl ThemeStore {
    /// Registers a theme under the given name, shadowing a built-in theme of
    /// the same name.
    pub(crate) fn add(&mut self, name: &str, theme: Theme) {
        self.themes.insert(name.to_owned(), Arc::new(theme));
    }

    /// Loads `.tmTheme` data from a reader and registers it under the given
    /// name.
    pub(crate) fn add_from_reader<R: BufRead + Seek>(
        &mut self,
        name: &str,
        reader: &mut R,
    ) -> AmbraResult<()> {
        let theme = ThemeSet::load_from_reader(reader)?;
        self.add(name, theme);
        Ok(())
    }

    /// Loads a `.tmTheme` file and registers it under its declared name, or
    /// the file stem when the theme does not declare one.
    pub(crate) fn add_from_file(&mut self, path: impl AsRef<Path>) -> AmbraResult<String> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let theme = ThemeSet::load_from_reader(&mut reader)?;
        let name = match &theme.name {
            Some(name) => name.clone(),
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        self.add(&name, theme);
        Ok(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.themes.contains_key(name) || BUILTIN_THEMES.contains_key(name)
    }

    pub(crate) fn resolve(&self, name: &str) -> AmbraResult<Arc<Theme>> {
        self.themes
            .get(name)
            .or_else(|| BUILTIN_THEMES.get(name))
            .cloned()
            .ok_or_else(|| Error::ThemeNotFound(name.to_owned()))
    }

    pub(crate) fn resolve_variant(
        &self,
        variant: &ThemeVariant<String>,
    ) -> AmbraResult<ThemeVariant<Arc<Theme>>> {
        match variant {
            ThemeVariant::Single(name) => Ok(ThemeVariant::Single(self.resolve(name)?)),
            ThemeVariant::Dual { light, dark } => Ok(ThemeVariant::Dual {
                light: self.resolve(light)?,
                dark: self.resolve(dark)?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    const MIDNIGHT_TM_THEME: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>name</key>
  <string>Midnight</string>
  <key>settings</key>
  <array>
    <dict>
      <key>settings</key>
      <dict>
        <key>foreground</key>
        <string>#F8F8F2</string>
        <key>background</key>
        <string>#272822</string>
      </dict>
    </dict>
  </array>
</dict>
</plist>
"#;

    const NAMELESS_TM_THEME: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>settings</key>
  <array>
    <dict>
      <key>settings</key>
      <dict>
        <key>foreground</key>
        <string>#111111</string>
      </dict>
    </dict>
  </array>
</dict>
</plist>
"#;

    #[test]
    fn variant_keys_are_stable() {
        assert_eq!(ThemeVariant::Single("base16-ocean.dark").key(), "base16-ocean.dark");
        assert_eq!(
            ThemeVariant::Dual {
                light: "base16-ocean.light",
                dark: "base16-ocean.dark"
            }
            .key(),
            "base16-ocean.light+base16-ocean.dark"
        );
    }

    #[test]
    fn resolves_builtin_themes() {
        let store = ThemeStore::default();
        assert!(store.contains("base16-ocean.dark"));
        assert!(store.resolve("base16-ocean.dark").is_ok());
    }

    #[test]
    fn unknown_theme_errors() {
        let store = ThemeStore::default();
        let err = store.resolve("no-such-theme").unwrap_err();
        assert!(matches!(err, Error::ThemeNotFound(name) if name == "no-such-theme"));
    }

    #[test]
    fn custom_theme_shadows_builtin() {
        let mut store = ThemeStore::default();
        let builtin = store.resolve("base16-ocean.dark").unwrap();
        store.add("base16-ocean.dark", Theme::default());
        let shadowed = store.resolve("base16-ocean.dark").unwrap();
        assert!(!Arc::ptr_eq(&builtin, &shadowed));
    }

    #[test]
    fn can_add_theme_from_reader() {
        let mut store = ThemeStore::default();
        let mut reader = Cursor::new(MIDNIGHT_TM_THEME.as_bytes());
        store.add_from_reader("midnight", &mut reader).unwrap();
        assert!(store.contains("midnight"));
        assert!(store.resolve("midnight").is_ok());
    }

    #[test]
    fn garbage_theme_data_is_rejected() {
        let mut store = ThemeStore::default();
        let mut reader = Cursor::new(b"not a plist".as_slice());
        let result = store.add_from_reader("broken", &mut reader);
        assert!(matches!(result, Err(Error::ThemeLoad(_))));
        assert!(!store.contains("broken"));
    }

    #[test]
    fn loaded_theme_file_registers_under_its_declared_name() {
        let path = std::env::temp_dir().join("ambra-midnight-test.tmTheme");
        fs::write(&path, MIDNIGHT_TM_THEME).unwrap();

        let mut store = ThemeStore::default();
        let name = store.add_from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(name, "Midnight");
        assert!(store.contains("Midnight"));
    }

    #[test]
    fn nameless_theme_file_falls_back_to_the_file_stem() {
        let path = std::env::temp_dir().join("ambra-stem-fallback.tmTheme");
        fs::write(&path, NAMELESS_TM_THEME).unwrap();

        let mut store = ThemeStore::default();
        let name = store.add_from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(name, "ambra-stem-fallback");
        assert!(store.contains("ambra-stem-fallback"));
    }

    #[test]
    fn dual_variant_resolves_both_themes() {
        let store = ThemeStore::default();
        let variant = ThemeVariant::Dual {
            light: "base16-ocean.light".to_owned(),
            dark: "base16-ocean.dark".to_owned(),
        };
        assert!(store.resolve_variant(&variant).unwrap().is_dual());
    }
}
