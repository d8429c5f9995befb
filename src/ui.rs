use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Style, Stylize},
    symbols::{Marker, border},
    text::{Line, Span, Text},
    widgets::{
        Bar, BarChart, BarGroup, Block, Clear, Paragraph, Wrap,
        canvas::{Canvas, Points},
    },
};

use crate::domain::ShelfConfig;
use crate::model::{ChartKind, ChartView, Popup, PopupKind, UIData};

pub const STATUSLINE_HEIGHT: u16 = 1;
const MAX_BAR_WIDTH: u16 = 14;
const BAR_GAP: u16 = 1;
const PIE_RESOLUTION: usize = 160;

const SLICE_COLORS: [Color; 8] = [
    Color::LightBlue,
    Color::LightRed,
    Color::LightGreen,
    Color::Yellow,
    Color::LightMagenta,
    Color::Cyan,
    Color::Rgb(255, 165, 0),
    Color::Gray,
];

pub struct ShelfUI {
    fade_status_after: Duration,
}

impl ShelfUI {
    pub fn new(cfg: &ShelfConfig) -> Self {
        Self {
            fade_status_after: Duration::from_millis(cfg.status_fade_time),
        }
    }

    pub fn draw(&self, uidata: &UIData, frame: &mut Frame) {
        let [main_area, status_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .areas(frame.area());

        match &uidata.chart {
            Some(chart) if chart.kind == ChartKind::Bar => {
                self.render_bar_chart(chart, main_area, frame)
            }
            Some(chart) => self.render_pie_chart(chart, main_area, frame),
            None => self.render_home(uidata, main_area, frame),
        }

        self.render_statusline(uidata, status_area, frame);

        if let Some(popup) = &uidata.popup {
            self.render_popup(popup, main_area, frame);
        }
    }

    fn render_home(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let title = Line::from(" Library catalog ".bold());
        let instructions = Line::from(vec![
            " Open ".into(),
            "<O>".blue().bold(),
            " Summary ".into(),
            "<S>".blue().bold(),
            " Bar ".into(),
            "<B>".blue().bold(),
            " Pie ".into(),
            "<P>".blue().bold(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<Q> ".blue().bold(),
        ]);
        let block = Block::bordered()
            .title(title.centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK);

        let text = if uidata.name.is_empty() {
            Text::from(vec![
                Line::from(""),
                Line::from("No file loaded."),
                Line::from(vec![
                    "Press ".into(),
                    "o".blue().bold(),
                    " to open a catalog file.".into(),
                ]),
            ])
        } else {
            Text::from(vec![
                Line::from(""),
                Line::from(vec!["File: ".into(), uidata.name.clone().yellow()]),
                Line::from(format!("Rows: {}", uidata.nrows)),
                Line::from(format!("Columns: {}", uidata.columns.join(", "))),
                Line::from(vec![
                    "Grouping column: ".into(),
                    uidata.group_column.clone().bold(),
                ]),
            ])
        };

        frame.render_widget(
            Paragraph::new(text)
                .centered()
                .wrap(Wrap { trim: true })
                .block(block),
            area,
        );
    }

    fn chart_block(title: String) -> Block<'static> {
        let instructions = Line::from(vec![
            " Bar ".into(),
            "<B>".blue().bold(),
            " Pie ".into(),
            "<P>".blue().bold(),
            " Group by ".into(),
            "<G>".blue().bold(),
            " Copy ".into(),
            "<Y>".blue().bold(),
            " Back ".into(),
            "<Esc> ".blue().bold(),
        ]);
        Block::bordered()
            .title(Line::from(title.bold()).centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK)
    }

    fn bar_width(nbars: usize, width: u16) -> u16 {
        if nbars == 0 {
            return MAX_BAR_WIDTH;
        }
        let nbars = to_u16(nbars);
        let gaps = BAR_GAP.saturating_mul(nbars.saturating_sub(1));
        (width.saturating_sub(gaps) / nbars).clamp(1, MAX_BAR_WIDTH)
    }

    fn render_bar_chart(&self, chart: &ChartView, area: Rect, frame: &mut Frame) {
        let counts = &chart.counts;
        let block = ShelfUI::chart_block(format!(" Number of Books by {} ", counts.column));
        let inner_width = block.inner(area).width;

        let bars: Vec<Bar> = counts
            .iter()
            .map(|(category, count)| {
                Bar::default()
                    .value(*count as u64)
                    .label(Line::from(category.to_string()))
            })
            .collect();

        let barchart = BarChart::default()
            .block(block)
            .data(BarGroup::default().bars(&bars))
            .bar_width(ShelfUI::bar_width(bars.len(), inner_width))
            .bar_gap(BAR_GAP)
            .bar_style(Style::new().light_blue())
            .value_style(Style::new().black().on_light_blue().bold());
        frame.render_widget(barchart, area);
    }

    fn render_pie_chart(&self, chart: &ChartView, area: Rect, frame: &mut Frame) {
        let counts = &chart.counts;
        let block = ShelfUI::chart_block(format!(" Book Distribution by {} ", counts.column));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [pie_area, legend_area] =
            Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)])
                .areas(inner);

        let shares = counts.shares();
        let slices = pie_slices(&shares, PIE_RESOLUTION);
        let (x_extent, y_extent) = pie_bounds(pie_area);
        let canvas = Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([-x_extent, x_extent])
            .y_bounds([-y_extent, y_extent])
            .paint(|ctx| {
                for (idx, points) in slices.iter().enumerate() {
                    ctx.draw(&Points {
                        coords: points,
                        color: slice_color(idx),
                    });
                }
            });
        frame.render_widget(canvas, pie_area);

        let legend: Vec<Line> = counts
            .iter()
            .zip(shares.iter())
            .enumerate()
            .map(|(idx, ((category, count), share))| {
                Line::from(vec![
                    Span::styled("■ ", Style::new().fg(slice_color(idx))),
                    Span::raw(format!("{category} ")),
                    Span::styled(format!("{share:.1}%"), Style::new().bold()),
                    Span::raw(format!(" ({count})")),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(legend), legend_area);
    }

    fn render_statusline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        if let Some((mode, input)) = &uidata.prompt {
            let label = mode.label();
            let line = Line::from(vec![label.bold(), input.input.clone().into()]);
            frame.render_widget(Paragraph::new(line), area);
            let offset = to_u16(label.chars().count() + input.cursor_pos);
            let x = area.x.saturating_add(offset);
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let message = uidata.status_message.clone();
        let line = if uidata.last_status_message_update.elapsed() > self.fade_status_after {
            Line::from(message.dark_gray())
        } else {
            Line::from(message)
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_popup(&self, popup: &Popup, area: Rect, frame: &mut Frame) {
        let text_width = popup
            .message
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max(popup.title.chars().count() + 2);
        let text_height = popup.message.lines().count();
        let width = to_u16(text_width).saturating_add(4).min(area.width);
        let height = to_u16(text_height).saturating_add(2).min(area.height);
        let popup_area = centered_rect(area, width, height);

        let border_style = match popup.kind {
            PopupKind::Error => Style::new().red(),
            PopupKind::Info => Style::new().light_blue(),
        };
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", popup.title).bold()).centered())
            .border_style(border_style);

        frame.render_widget(Clear, popup_area);
        frame.render_widget(
            Paragraph::new(popup.message.clone())
                .wrap(Wrap { trim: false })
                .block(block),
            popup_area,
        );
    }
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn slice_color(idx: usize) -> Color {
    SLICE_COLORS[idx % SLICE_COLORS.len()]
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    area
}

// Canvas bounds that keep the pie round. Terminal cells are about twice as high as wide.
fn pie_bounds(area: Rect) -> (f64, f64) {
    if area.width == 0 || area.height == 0 {
        return (1.0, 1.0);
    }
    let ratio = area.width as f64 / (2.0 * area.height as f64);
    if ratio >= 1.0 {
        (ratio, 1.0)
    } else {
        (1.0, 1.0 / ratio)
    }
}

/// Sample the unit disc and assign every point to a slice. Slices start at 12 o'clock and
/// run counter-clockwise, `shares` are percentages.
pub fn pie_slices(shares: &[f64], resolution: usize) -> Vec<Vec<(f64, f64)>> {
    let mut slices: Vec<Vec<(f64, f64)>> = vec![Vec::new(); shares.len()];
    if shares.is_empty() || resolution == 0 {
        return slices;
    }

    let mut bounds = Vec::with_capacity(shares.len());
    let mut acc = 0.0;
    for share in shares {
        acc += share * 3.6;
        bounds.push(acc);
    }

    let step = 2.0 / resolution as f64;
    for i in 0..=resolution {
        let x = -1.0 + i as f64 * step;
        for j in 0..=resolution {
            let y = -1.0 + j as f64 * step;
            if x * x + y * y > 1.0 {
                continue;
            }
            let angle = (y.atan2(x).to_degrees() - 90.0).rem_euclid(360.0);
            let idx = bounds
                .iter()
                .position(|&end| angle < end)
                .unwrap_or(shares.len() - 1);
            slices[idx].push((x, y));
        }
    }
    slices
}
