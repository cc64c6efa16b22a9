mod month;
mod widget;
pub(crate) use self::month::{leg_for_day, MonthCursor};
pub(crate) use self::widget::{MonthGrid, GRID_HEIGHT, GRID_WIDTH};
use ratatui::style::Style;
use time::Date;

pub(crate) trait DateStyler {
    fn date_style(&self, date: Date) -> Style;
}
