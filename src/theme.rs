use ratatui::style::Color;

pub struct Theme {
    pub name: &'static str,
    pub accent: Color,
    pub secondary: Color,
    pub negative: Color,
    pub text: Color,
    pub dimmed: Color,
}

pub const THEMES: &[Theme] = &[
    Theme {
        name: "Default",
        accent: Color::Cyan,
        secondary: Color::Yellow,
        negative: Color::Red,
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Dracula",
        accent: Color::Rgb(189, 147, 249),
        secondary: Color::Rgb(255, 121, 198),
        negative: Color::Rgb(255, 85, 85),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Nord",
        accent: Color::Rgb(136, 192, 208),
        secondary: Color::Rgb(235, 203, 139),
        negative: Color::Rgb(191, 97, 106),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Tokyo Night",
        accent: Color::Rgb(122, 162, 247),
        secondary: Color::Rgb(224, 175, 104),
        negative: Color::Rgb(247, 118, 142),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Synthwave",
        accent: Color::Rgb(255, 126, 219),
        secondary: Color::Rgb(254, 222, 93),
        negative: Color::Rgb(254, 68, 80),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
];

/// Index of the theme called `name` (case-insensitive), or the default.
pub fn theme_index(name: &str) -> usize {
    THEMES
        .iter()
        .position(|t| t.name.eq_ignore_ascii_case(name.trim()))
        .unwrap_or(0)
}

pub fn next_theme(index: usize) -> usize {
    (index + 1) % THEMES.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_themes_by_name() {
        assert_eq!(THEMES[theme_index("nord")].name, "Nord");
        assert_eq!(THEMES[theme_index(" Tokyo Night ")].name, "Tokyo Night");
        assert_eq!(theme_index("no such theme"), 0);
    }

    #[test]
    fn cycling_wraps() {
        assert_eq!(next_theme(THEMES.len() - 1), 0);
        assert_eq!(next_theme(0), 1);
    }
}
