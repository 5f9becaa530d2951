use std::io::Read;
use std::path::PathBuf;

use ambra::{HighlightOptions, HighlightStyle, Highlighter, ThemeVariant};
use clap::Parser;

/// Highlight a file (or stdin) to HTML on stdout
#[derive(Parser)]
#[command(name = "ambra-cli", version)]
struct Args {
    /// File to highlight, stdin when omitted
    file: Option<PathBuf>,

    /// Language identifier, eg `rust`
    #[arg(long, default_value = "plain")]
    lang: String,

    /// Theme name (or `light+dark` for a dual theme)
    #[arg(long, default_value = "base16-ocean.dark")]
    theme: String,

    /// Emit CSS classes with this prefix instead of inline styles
    #[arg(long, value_name = "PREFIX")]
    class_prefix: Option<String>,

    /// Only print the stylesheet for the chosen theme
    #[arg(long)]
    css_only: bool,

    /// JSON descriptor of a custom language to register
    #[arg(long)]
    custom_language: Vec<PathBuf>,
}

const DEFAULT_CLASS_PREFIX: &str = "ambra-";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut highlighter = Highlighter::new();
    for path in &args.custom_language {
        highlighter.add_custom_language_from_file(path)?;
    }

    let theme = match args.theme.split_once('+') {
        Some((light, dark)) => ThemeVariant::Dual { light, dark },
        None => ThemeVariant::Single(args.theme.as_str()),
    };

    // HighlightStyle::Classes wants a 'static prefix; leaking the one-off
    // argument is fine in a short-lived binary
    let explicit_prefix = args.class_prefix.is_some();
    let prefix: &'static str = match &args.class_prefix {
        Some(p) => Box::leak(p.clone().into_boxed_str()),
        None => DEFAULT_CLASS_PREFIX,
    };

    if args.css_only {
        print!("{}", highlighter.generate_css(theme, prefix)?);
        return Ok(());
    }

    let code = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut options = HighlightOptions::new(args.lang.as_str(), theme);
    if explicit_prefix || theme.is_dual() {
        options = options.highlight_style(HighlightStyle::Classes(prefix));
    }

    let highlighted = highlighter.highlight(&code, &options)?;
    println!("{}", highlighted.html);

    Ok(())
}
