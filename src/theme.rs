use ratatui::style::{Color, Modifier, Style};

pub(crate) const BASE_STYLE: Style = Style::new().fg(Color::White).bg(Color::Black);

pub(crate) const TITLE_STYLE: Style = BASE_STYLE.add_modifier(Modifier::BOLD);

pub(crate) const WEEKDAY_STYLE: Style = BASE_STYLE.add_modifier(Modifier::BOLD);

/// Days covered by a leg are coloured by the leg's position in the list,
/// cycling through this palette
const LEG_STYLES: [Style; 4] = [
    Style::new().fg(Color::Black).bg(Color::LightCyan),
    Style::new().fg(Color::Black).bg(Color::LightGreen),
    Style::new().fg(Color::Black).bg(Color::LightYellow),
    Style::new().fg(Color::Black).bg(Color::LightMagenta),
];

pub(crate) fn leg_style(index: usize) -> Style {
    LEG_STYLES[index % LEG_STYLES.len()]
}

pub(crate) const SELECTED_STYLE: Style = BASE_STYLE.add_modifier(Modifier::REVERSED);

pub(crate) const DETAIL_STYLE: Style = BASE_STYLE.fg(Color::Gray);

pub(crate) mod status {
    use super::*;

    pub(crate) const INFO_STYLE: Style = BASE_STYLE.fg(Color::LightGreen);

    pub(crate) const ERROR_STYLE: Style = BASE_STYLE
        .fg(Color::LightRed)
        .add_modifier(Modifier::BOLD);

    pub(crate) const LOCKED_STYLE: Style = BASE_STYLE.fg(Color::DarkGray);

    pub(crate) const UNLOCKED_STYLE: Style = BASE_STYLE.fg(Color::LightGreen);
}

pub(crate) mod form {
    use super::*;

    pub(crate) const PLACEHOLDER_STYLE: Style = BASE_STYLE.fg(Color::DarkGray);

    pub(crate) const FOCUSED_FIELD_STYLE: Style = BASE_STYLE.add_modifier(Modifier::UNDERLINED);
}
