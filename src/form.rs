use crate::dates::format_iso_date;
use crate::leg::Leg;
use crate::store::DocumentId;
use crate::theme::{
    form::{FOCUSED_FIELD_STYLE, PLACEHOLDER_STYLE},
    BASE_STYLE,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Flex, Layout, Margin, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Clear, StatefulWidget, Widget},
};

const FORM_WIDTH: u16 = 44;
const FORM_HEIGHT: u16 = 11;
const PROMPT_WIDTH: u16 = 30;
const PROMPT_HEIGHT: u16 = 8;

/// Longest accepted field value; keeps input inside the popup
const MAX_FIELD_LEN: usize = 30;

const NAME: usize = 0;
const START: usize = 1;
const DAYS: usize = 2;
const FIELD_QTY: usize = 3;

static LABELS: [&str; FIELD_QTY] = ["Name:  ", "Start: ", "Days:  "];
static PLACEHOLDERS: [&str; FIELD_QTY] = ["Leg name", "YYYY-MM-DD", "1"];

/// Input state for adding a new leg or replacing an existing one
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct LegForm {
    target: Option<DocumentId>,
    fields: [String; FIELD_QTY],
    focus: usize,
}

impl LegForm {
    pub(crate) fn new() -> LegForm {
        LegForm::default()
    }

    pub(crate) fn editing(leg: &Leg) -> LegForm {
        LegForm {
            target: Some(leg.id.clone()),
            fields: [
                leg.name.clone(),
                format_iso_date(leg.start_date),
                leg.duration_days.to_string(),
            ],
            focus: NAME,
        }
    }

    /// The leg being replaced, or `None` for a new leg
    pub(crate) fn target(&self) -> Option<&DocumentId> {
        self.target.as_ref()
    }

    pub(crate) fn name(&self) -> &str {
        &self.fields[NAME]
    }

    pub(crate) fn start_date(&self) -> &str {
        &self.fields[START]
    }

    pub(crate) fn duration_days(&self) -> &str {
        &self.fields[DAYS]
    }

    pub(crate) fn next_field(&mut self) {
        self.focus = (self.focus + 1) % FIELD_QTY;
    }

    pub(crate) fn prev_field(&mut self) {
        self.focus = (self.focus + FIELD_QTY - 1) % FIELD_QTY;
    }

    // Returns `false` if the field is full
    pub(crate) fn push(&mut self, ch: char) -> bool {
        let field = &mut self.fields[self.focus];
        if ch.is_control() || field.chars().count() >= MAX_FIELD_LEN {
            false
        } else {
            field.push(ch);
            true
        }
    }

    // Returns `false` if the field is already empty
    pub(crate) fn pop(&mut self) -> bool {
        self.fields[self.focus].pop().is_some()
    }

    fn to_text(&self) -> Text<'static> {
        let mut lines = vec![Line::raw("")];
        for (i, (label, value)) in std::iter::zip(LABELS, &self.fields).enumerate() {
            let value = if value.is_empty() {
                Span::styled(PLACEHOLDERS[i], PLACEHOLDER_STYLE)
            } else if i == self.focus {
                Span::styled(value.clone(), FOCUSED_FIELD_STYLE)
            } else {
                Span::styled(value.clone(), BASE_STYLE)
            };
            let marker = if i == self.focus { "> " } else { "  " };
            lines.push(Line::from_iter([
                Span::styled(marker, BASE_STYLE),
                Span::styled(label, BASE_STYLE),
                value,
            ]));
        }
        lines.push(Line::raw(""));
        lines.push(Line::raw("[ENTER] save  [TAB] next  [ESC] cancel").centered());
        Text::from(lines)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct LegFormPopup;

impl StatefulWidget for LegFormPopup {
    type State = LegForm;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let title = if state.target.is_some() {
            " Edit Leg "
        } else {
            " New Leg "
        };
        let text_area = popup(area, buf, FORM_WIDTH, FORM_HEIGHT, title);
        state.to_text().render(text_area, buf);
    }
}

/// Input state for the passcode popup
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct PasscodePrompt {
    input: String,
}

impl PasscodePrompt {
    pub(crate) fn new() -> PasscodePrompt {
        PasscodePrompt::default()
    }

    pub(crate) fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    // Returns `false` if the input is full
    pub(crate) fn push(&mut self, ch: char) -> bool {
        if ch.is_control() || self.input.chars().count() >= MAX_FIELD_LEN {
            false
        } else {
            self.input.push(ch);
            true
        }
    }

    // Returns `false` if the input is already empty
    pub(crate) fn pop(&mut self) -> bool {
        self.input.pop().is_some()
    }

    fn to_text(&self) -> Text<'static> {
        let masked = "*".repeat(self.input.chars().count());
        Text::from_iter([
            Line::raw(""),
            if masked.is_empty() {
                Line::styled("passcode", PLACEHOLDER_STYLE)
            } else {
                Line::styled(masked, FOCUSED_FIELD_STYLE)
            },
            Line::raw(""),
            Line::raw("[ENTER] unlock"),
        ])
        .centered()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct PasscodePopup;

impl StatefulWidget for PasscodePopup {
    type State = PasscodePrompt;

    /*
     * ..............................
     * .┌──── Enter Passcode ──────┐.
     * .│                          │.
     * .│         ******           │.
     * .│                          │.
     * .│      [ENTER] unlock      │.
     * .└──────────────────────────┘.
     * ..............................
     */

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let text_area = popup(area, buf, PROMPT_WIDTH, PROMPT_HEIGHT, " Enter Passcode ");
        state.to_text().render(text_area, buf);
    }
}

// Clears a centered box with a one-cell margin, draws a titled border inside
// it, and returns the area within the border
fn popup(area: Rect, buf: &mut Buffer, width: u16, height: u16, title: &str) -> Rect {
    let [outer_area] = Layout::horizontal([width.min(area.width)])
        .flex(Flex::Center)
        .areas(area);
    let [outer_area] = Layout::vertical([height.min(area.height)])
        .flex(Flex::Center)
        .areas(outer_area);
    Clear.render(outer_area, buf);
    Block::new().style(BASE_STYLE).render(outer_area, buf);
    let block_area = outer_area.inner(Margin::new(1, 1));
    Block::bordered()
        .title(title)
        .title_alignment(Alignment::Center)
        .render(block_area, buf);
    block_area.inner(Margin::new(1, 1))
}
