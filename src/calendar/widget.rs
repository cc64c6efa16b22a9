use super::month::{leg_position, MonthCursor, DAYS_IN_WEEK};
use super::DateStyler;
use crate::leg::Leg;
use crate::theme::{leg_style, BASE_STYLE, TITLE_STYLE, WEEKDAY_STYLE};
use ratatui::{buffer::Buffer, layout::Rect, style::Style, widgets::Widget};
use time::Date;

static HEADER: &str = " Su  Mo  Tu  We  Th  Fr  Sa ";

/// Number of columns per day of week
const DAY_WIDTH: u16 = 4;

/// Width of the grid in columns
const MAIN_WIDTH: u16 = 28;

/// Number of lines taken up by the month title, the weekday header, and the
/// rule under it
const HEADER_LINES: u16 = 3;

/// Number of lines taken up by each week of the calendar
const WEEK_LINES: u16 = 2;

const ACS_HLINE: char = '─';

/// Total height needed to show a six-week month
pub(crate) const GRID_HEIGHT: u16 = HEADER_LINES + 6 * WEEK_LINES;

pub(crate) const GRID_WIDTH: u16 = MAIN_WIDTH;

/// Seven-column view of one month, with each day styled by a `DateStyler`
#[derive(Debug)]
pub(crate) struct MonthGrid<'a, S: ?Sized> {
    cursor: MonthCursor,
    today: Date,
    styler: &'a S,
}

impl<'a, S: DateStyler + ?Sized> MonthGrid<'a, S> {
    pub(crate) fn new(cursor: MonthCursor, today: Date, styler: &'a S) -> Self {
        MonthGrid {
            cursor,
            today,
            styler,
        }
    }
}

impl<S: DateStyler + ?Sized> Widget for MonthGrid<'_, S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let left = area.width.saturating_sub(MAIN_WIDTH) / 2;
        let area = Rect {
            x: area.x + left,
            width: area.width - left,
            ..area
        };
        let mut canvas = BufferCanvas::new(area, buf);
        canvas.draw_title(self.cursor);
        canvas.draw_header();
        let cells = self.cursor.build_grid();
        for (i, day) in cells.into_iter().enumerate() {
            let Some(day) = day else {
                continue;
            };
            let Some(date) = self.cursor.date(day) else {
                continue;
            };
            let (Ok(week_no), Ok(col)) =
                (u16::try_from(i / DAYS_IN_WEEK), u16::try_from(i % DAYS_IN_WEEK))
            else {
                continue;
            };
            let text = if date == self.today {
                format!("[{day:2}]")
            } else {
                format!(" {day:2} ")
            };
            canvas.draw_day(week_no, col, &text, self.styler.date_style(date));
        }
    }
}

impl DateStyler for [Leg] {
    fn date_style(&self, date: Date) -> Style {
        leg_position(self, date).map_or(BASE_STYLE, |(i, _)| leg_style(i))
    }
}

#[derive(Debug, Eq, PartialEq)]
struct BufferCanvas<'a> {
    area: Rect,
    buf: &'a mut Buffer,
}

impl<'a> BufferCanvas<'a> {
    fn new(area: Rect, buf: &'a mut Buffer) -> Self {
        Self { area, buf }
    }

    fn draw_title(&mut self, cursor: MonthCursor) {
        let title = format!("{} {}", cursor.month(), cursor.year());
        let width = u16::try_from(title.len()).unwrap_or(MAIN_WIDTH);
        self.mvprint(0, MAIN_WIDTH.saturating_sub(width) / 2, &title, TITLE_STYLE);
    }

    fn draw_header(&mut self) {
        self.mvprint(1, 0, HEADER, WEEKDAY_STYLE);
        self.hline(2, 0, ACS_HLINE, MAIN_WIDTH);
    }

    fn draw_day(&mut self, week_no: u16, col: u16, s: &str, style: Style) {
        self.mvprint(week_no * WEEK_LINES + HEADER_LINES, DAY_WIDTH * col, s, style);
    }

    fn mvprint(&mut self, y: u16, x: u16, s: &str, style: Style) {
        if y < self.area.height && x < self.area.width {
            self.buf.set_stringn(
                x + self.area.x,
                y + self.area.y,
                s,
                usize::from(self.area.width - x),
                style,
            );
        }
    }

    fn hline(&mut self, y: u16, x: u16, ch: char, length: u16) {
        self.mvprint(y, x, &String::from(ch).repeat(length.into()), BASE_STYLE);
    }
}
