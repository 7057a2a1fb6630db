use ratatui::style::Color;

use crate::domain::Theme;

/// Reports the system colour-scheme preference, if one is known.
pub trait ThemeObserver {
    fn preferred(&self) -> Option<Theme>;
}

/// Reads `GLOSSARY_THEME`, then the `COLORFGBG` terminal convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvThemeObserver;

impl ThemeObserver for EnvThemeObserver {
    fn preferred(&self) -> Option<Theme> {
        let explicit = std::env::var("GLOSSARY_THEME").ok();
        let colorfgbg = std::env::var("COLORFGBG").ok();
        theme_from_env(explicit.as_deref(), colorfgbg.as_deref())
    }
}

pub fn theme_from_env(explicit: Option<&str>, colorfgbg: Option<&str>) -> Option<Theme> {
    match explicit.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        Some("dark") => return Some(Theme::Dark),
        Some("light") => return Some(Theme::Light),
        _ => {}
    }
    // "fg;bg" or "fg;default;bg"; the background is the last field.
    let background = colorfgbg?.rsplit(';').next()?.trim().parse::<u8>().ok()?;
    if background <= 6 || background == 8 {
        Some(Theme::Dark)
    } else {
        Some(Theme::Light)
    }
}

/// Startup theme: configured value, else system preference, else light.
pub fn initial_theme(configured: Option<Theme>, observer: &dyn ThemeObserver) -> Theme {
    configured
        .or_else(|| observer.preferred())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub selection: Color,
    pub hidden: Color,
    pub pending: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                background: Color::Black,
                text: Color::Gray,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                selection: Color::DarkGray,
                hidden: Color::Yellow,
                pending: Color::Red,
            },
            Theme::Light => Self {
                background: Color::White,
                text: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                selection: Color::Gray,
                hidden: Color::Magenta,
                pending: Color::Red,
            },
        }
    }
}
