//! TUI rendering for the coffee finder
//!
//! This module draws whatever the pipeline session currently holds: a loading
//! screen, a failure panel, or the ranked shops as bubbles or on a world map.

use crate::app::{App, ViewMode};
use crate::models::Marker;
use crate::pipeline::{PipelineState, Ranking};
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *}, // Imports Points, Circle, Map, etc.
};

use ratatui::text::Line;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Renders one frame of the TUI based on current application state.
///
/// # Arguments
///
/// * `f` - The ratatui frame to draw into (from `terminal.draw()`).
/// * `app` - Current application state (session, selection, view mode).
pub fn render(f: &mut Frame, app: &App) {
    match app.state() {
        PipelineState::Loading => render_loading_screen(f, app),
        PipelineState::Failed(err) => render_failure(f, &err.to_string()),
        PipelineState::Ready(ranking) => render_ranking(f, app, ranking),
    }
}

/// Spinner plus a gauge counting the pipeline inputs received so far
/// (token, location, shop list).
fn render_loading_screen(f: &mut Frame, app: &App) {
    let area = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height / 2).saturating_sub(3)),
            Constraint::Length(3), // Progress bar
            Constraint::Length(1), // Message
            Constraint::Min(0),
        ])
        .split(area);

    let received = app.session.inputs_received();
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(" Finding Coffee Nearby ")
                .borders(Borders::ALL),
        )
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Rgb(20, 20, 20)))
        .percent((received * 100 / 3) as u16);
    f.render_widget(gauge, chunks[1]);

    let spinner = SPINNER[app.tick_count % SPINNER.len()];
    let msg = Paragraph::new(format!("{spinner} Locating you and fetching shops..."))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(msg, chunks[2]);
}

fn render_failure(f: &mut Frame, message: &str) {
    let area = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Length(6),
            Constraint::Min(0),
        ])
        .split(area);

    let text = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "r retry   q quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let p = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" Could Not Load Coffee Shops ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
    f.render_widget(p, chunks[1]);
}

/// Header, sidebar (user position + ranked list) and the chart area.
fn render_ranking(f: &mut Frame, app: &App, ranking: &Ranking) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.size());

    let header = Line::from(vec![
        Span::styled(
            " Coffee Shop Finder ",
            Style::default()
                .fg(Color::Black)
                .bg(hex_color(crate::models::SHOP_COLOR))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "  {} of {} shops  │  updated {}",
                ranking.shops.len(),
                ranking.total_shops,
                ranking.computed_at.format("%H:%M:%S")
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(header), rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[1]);

    draw_sidebar(f, app, ranking, columns[0]);

    if ranking.markers.is_empty() {
        let empty = Paragraph::new("The shop list came back empty.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(empty, columns[1]);
    } else {
        match app.view_mode {
            ViewMode::Bubbles => render_bubbles(f, app, &ranking.markers, columns[1]),
            ViewMode::Map => render_map(f, app, &ranking.markers, columns[1]),
        }
    }

    let help = Paragraph::new(" ↑/↓ select   Tab toggle bubbles/map   r reload   q quit")
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, rows[2]);
}

fn draw_sidebar(f: &mut Frame, app: &App, ranking: &Ranking, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let coords = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Latitude:  ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(ranking.user.latitude.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Longitude: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(ranking.user.longitude.to_string()),
        ]),
    ])
    .block(
        Block::default()
            .title(" You ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(coords, chunks[0]);

    let items: Vec<ListItem> = ranking
        .markers
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let style = if i == app.selected_index {
                Style::default()
                    .fg(Color::Cyan)
                    .bg(Color::Rgb(30, 30, 60))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let tooltip = m.custom_tooltip.as_deref().unwrap_or("you are here");
            ListItem::new(Line::from(vec![
                Span::styled("● ", Style::default().fg(hex_color(&m.color))),
                Span::styled(m.label.clone(), style),
                Span::styled(
                    format!(" │ {tooltip}"),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Nearest Shops ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(list, chunks[1]);
}

/// Equal-sized bubbles on a ring, one per marker, labelled with the shop
/// name and its distance tooltip.
fn render_bubbles(f: &mut Frame, app: &App, markers: &[Marker], area: Rect) {
    let layout = bubble_layout(markers.len());

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(" Bubbles ")
                .borders(Borders::ALL),
        )
        .marker(symbols::Marker::Braille)
        .x_bounds([-1.0, 1.0])
        .y_bounds([-1.0, 1.0])
        .paint(|ctx| {
            for (marker, &(x, y, radius)) in markers.iter().zip(&layout) {
                ctx.draw(&Circle {
                    x,
                    y,
                    radius,
                    color: hex_color(&marker.color),
                });
            }
            ctx.layer();
            for (i, (marker, &(x, y, radius))) in markers.iter().zip(&layout).enumerate() {
                let label_style = if i == app.selected_index {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                };
                ctx.print(
                    x - radius * 0.6,
                    y,
                    Line::from(Span::styled(marker.label.clone(), label_style)),
                );
                if let Some(tooltip) = &marker.custom_tooltip {
                    ctx.print(
                        x - radius * 0.6,
                        y - radius * 0.4,
                        Line::from(Span::styled(
                            tooltip.clone(),
                            Style::default().fg(Color::DarkGray),
                        )),
                    );
                }
            }
        });

    f.render_widget(canvas, area);
}

/// World map zoomed to the markers, with the user's position as a crosshair.
fn render_map(f: &mut Frame, app: &App, markers: &[Marker], area: Rect) {
    let (x_bounds, y_bounds) = map_bounds(markers);

    let canvas = Canvas::default()
        .block(Block::default().title(" Map ").borders(Borders::ALL))
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            ctx.draw(&Map {
                color: Color::Rgb(50, 50, 50),
                resolution: MapResolution::High,
            });
            ctx.layer();

            for (i, marker) in markers.iter().enumerate() {
                let symbol = if marker.is_user() { " ⌖ " } else { " ● " };
                let mut spans = vec![Span::styled(
                    symbol,
                    Style::default().fg(hex_color(&marker.color)),
                )];
                if i == app.selected_index {
                    spans.push(Span::styled(
                        format!(" {} ", marker.label),
                        Style::default().fg(Color::Black).bg(Color::Yellow),
                    ));
                }
                ctx.print(marker.longitude, marker.latitude, Line::from(spans));
            }
        });

    f.render_widget(canvas, area);
}

/// Centre and radius of each bubble in a `[-1, 1]` square.
fn bubble_layout(count: usize) -> Vec<(f64, f64, f64)> {
    match count {
        0 => Vec::new(),
        1 => vec![(0.0, 0.0, 0.4)],
        n => {
            let ring = 0.6;
            let step = std::f64::consts::TAU / n as f64;
            // Neighbouring bubbles must not overlap: chord between centres is 2·ring·sin(step/2).
            let radius = (ring * (step / 2.0).sin() * 0.9).min(0.35);
            (0..n)
                .map(|i| {
                    let angle = std::f64::consts::FRAC_PI_2 - step * i as f64;
                    (ring * angle.cos(), ring * angle.sin(), radius)
                })
                .collect()
        }
    }
}

/// Longitude and latitude bounds covering every marker with some margin.
fn map_bounds(markers: &[Marker]) -> ([f64; 2], [f64; 2]) {
    let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
    for m in markers {
        min_lon = min_lon.min(m.longitude);
        max_lon = max_lon.max(m.longitude);
        min_lat = min_lat.min(m.latitude);
        max_lat = max_lat.max(m.latitude);
    }
    if !min_lon.is_finite() || !min_lat.is_finite() {
        return ([-180.0, 180.0], [-90.0, 90.0]);
    }

    let pad_lon = ((max_lon - min_lon) * 0.25).max(0.02);
    let pad_lat = ((max_lat - min_lat) * 0.25).max(0.02);
    (
        [(min_lon - pad_lon).max(-180.0), (max_lon + pad_lon).min(180.0)],
        [(min_lat - pad_lat).max(-90.0), (max_lat + pad_lat).min(90.0)],
    )
}

/// `#rrggbb` to a terminal color; anything else renders white.
fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Color::White;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;

    #[test]
    fn hex_color_parses_marker_colors() {
        assert_eq!(hex_color("#03dac6"), Color::Rgb(0x03, 0xda, 0xc6));
        assert_eq!(hex_color("#3700b3"), Color::Rgb(0x37, 0x00, 0xb3));
        assert_eq!(hex_color("teal"), Color::White);
        assert_eq!(hex_color("#zzzzzz"), Color::White);
    }

    #[test]
    fn bubbles_do_not_overlap() {
        for n in 2..=11 {
            let layout = bubble_layout(n);
            assert_eq!(layout.len(), n);
            for i in 0..n {
                for j in (i + 1)..n {
                    let (x1, y1, r) = layout[i];
                    let (x2, y2, _) = layout[j];
                    let gap = ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt();
                    assert!(gap > 2.0 * r, "n={n} bubbles {i},{j}");
                }
            }
        }
    }

    #[test]
    fn map_bounds_cover_markers() {
        let markers = vec![
            Marker::user(Coordinates::new(37.7749, -122.4194)),
            Marker::user(Coordinates::new(37.80, -122.27)),
        ];
        let ([lon0, lon1], [lat0, lat1]) = map_bounds(&markers);
        assert!(lon0 < -122.4194 && lon1 > -122.27);
        assert!(lat0 < 37.7749 && lat1 > 37.80);
    }

    #[test]
    fn map_bounds_for_single_point_are_not_degenerate() {
        let markers = vec![Marker::user(Coordinates::new(0.0, 0.0))];
        let ([lon0, lon1], [lat0, lat1]) = map_bounds(&markers);
        assert!(lon1 > lon0);
        assert!(lat1 > lat0);
    }
}
