use crate::dates::format_date;
use crate::leg::Leg;
use crate::theme::{leg_style, BASE_STYLE, DETAIL_STYLE, SELECTED_STYLE, TITLE_STYLE};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    text::{Line, Span, Text},
    widgets::{Block, Paragraph, Widget},
};

/// Chronological list of legs, in the order the store delivered them
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Timeline<'a> {
    legs: &'a [Leg],
    selected: Option<usize>,
}

impl<'a> Timeline<'a> {
    pub(crate) fn new(legs: &'a [Leg], selected: Option<usize>) -> Self {
        Timeline { legs, selected }
    }

    fn lines(&self) -> (Vec<Line<'a>>, usize) {
        let mut lines = Vec::new();
        let mut selected_line = 0;
        for (i, leg) in self.legs.iter().enumerate() {
            let is_selected = self.selected == Some(i);
            if is_selected {
                selected_line = lines.len();
            }
            lines.push(Line::from_iter([
                Span::styled("▌", BASE_STYLE.fg(leg_style(i).bg.unwrap_or(Color::White))),
                Span::raw(" "),
                Span::styled(
                    leg.name.as_str(),
                    if is_selected { SELECTED_STYLE } else { TITLE_STYLE },
                ),
            ]));
            lines.push(Line::styled(
                format!(
                    "  {} – {} · {}",
                    format_date(Some(leg.start_date)),
                    format_date(Some(leg.end_date)),
                    show_days(leg.duration_days),
                ),
                BASE_STYLE,
            ));
            if is_selected {
                if let Some(created) = leg.created_at {
                    lines.push(Line::styled(
                        format!("  Added {}", format_date(Some(created.date()))),
                        DETAIL_STYLE,
                    ));
                }
            }
        }
        (lines, selected_line)
    }
}

impl Widget for Timeline<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered().title(" Timeline ").style(BASE_STYLE);
        let inner = block.inner(area);
        if self.legs.is_empty() {
            Paragraph::new(Text::styled("No legs planned yet.", DETAIL_STYLE))
                .block(block)
                .render(area, buf);
            return;
        }
        let (lines, selected_line) = self.lines();
        // Keep the selected leg and its detail lines in view
        let scroll = u16::try_from((selected_line + 3).saturating_sub(usize::from(inner.height)))
            .unwrap_or(u16::MAX);
        Paragraph::new(lines)
            .block(block)
            .scroll((scroll, 0))
            .render(area, buf);
    }
}

fn show_days(days: u32) -> String {
    if days == 1 {
        String::from("1 day")
    } else {
        format!("{days} days")
    }
}
