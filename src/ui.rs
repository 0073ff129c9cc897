use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Chart, Clear, Dataset, GraphType, List, ListItem, Paragraph, Row,
        Table, Wrap,
    },
    Frame,
};

use crate::analysis::MAX_RAW_TEXT_LEN;
use crate::app::{App, FocusPane, InputMode};
use crate::model::{AnalysisResult, Quadrant};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut current_text = String::new();

    while let Some((_, c)) = chars.next() {
        if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some((_, c)) = chars.next() {
                if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn quadrant_color(quadrant: Quadrant) -> Color {
    match quadrant {
        Quadrant::GoldMine => Color::Green,
        Quadrant::LongTail => Color::Blue,
        Quadrant::WarZone => Color::Yellow,
        Quadrant::TrashRisk => Color::Red,
    }
}

fn format_count(value: f64) -> String {
    if value >= 1000.0 {
        format!("{:.1}k", value / 1000.0)
    } else {
        format!("{:.0}", value)
    }
}

fn pane_border_style(app: &App, pane: FocusPane) -> Style {
    if app.focus == pane {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(10),
        Constraint::Length(2),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [input_area, results_area] =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)])
            .areas(body_area);

    let [images_area, suggestions_area, data_area] = Layout::vertical([
        Constraint::Percentage(30),
        Constraint::Percentage(30),
        Constraint::Percentage(40),
    ])
    .areas(input_area);

    render_images(app, frame, images_area);
    render_suggestions(app, frame, suggestions_area);
    render_raw_data(app, frame, data_area);
    render_results(app, frame, results_area);
    render_footer(app, frame, footer_area);

    if app.input_mode == InputMode::PathPrompt {
        render_path_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            " 💎 Keyword Miner ",
            Style::default().fg(Color::Magenta).bold(),
        ),
        Span::raw("— Etsy keyword quadrant analysis · "),
        Span::styled(app.model.as_str(), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn render_images(app: &mut App, frame: &mut Frame, area: Rect) {
    let title = format!(" 1. Product Images ({}) ", app.images.len());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(pane_border_style(app, FocusPane::Images));

    if app.images.is_empty() {
        let hint = Paragraph::new("Press 'a' to add an image by path")
            .style(Style::default().fg(Color::DarkGray))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(hint, area);
        return;
    }

    let items: Vec<ListItem> = app
        .images
        .iter()
        .map(|img| ListItem::new(img.summary()))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).bold())
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, &mut app.image_state);
}

fn render_suggestions(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" AI Keyword Ideas ")
        .borders(Borders::ALL)
        .border_style(pane_border_style(app, FocusPane::Suggestions));

    if app.ideas_loading() {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        let thinking = Paragraph::new(format!("Reading your photos{}", dots))
            .style(Style::default().fg(Color::Magenta))
            .block(block);
        frame.render_widget(thinking, area);
        return;
    }

    if app.suggested_keywords.is_empty() {
        let hint = Paragraph::new("No ideas yet. Press 'g' to generate search phrases from your images.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(hint, area);
        return;
    }

    let items: Vec<ListItem> = app
        .suggested_keywords
        .iter()
        .map(|kw| ListItem::new(kw.as_str()))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).bold())
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, &mut app.suggestions_state);
}

fn render_raw_data(app: &App, frame: &mut Frame, area: Rect) {
    let char_count = app.raw_data.chars().count();
    let mut title = format!(" 2. Raw Data ({} chars) ", char_count);
    if app.input_mode == InputMode::Editing {
        title = format!(" 2. Raw Data ({} chars) — editing, Esc when done ", char_count);
    }

    let mut block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(pane_border_style(app, FocusPane::RawData));
    if char_count > MAX_RAW_TEXT_LEN {
        block = block.title_bottom(
            Line::from(" will be truncated at 60k chars ").style(Style::default().fg(Color::Yellow)),
        );
    }

    let text = if app.raw_data.is_empty() && app.input_mode != InputMode::Editing {
        Paragraph::new(
            "Paste eRank/Etsy research here (terminal paste works), e.g.\n\n\
             Cute Coaster  1520 searches  24000 competition\n\
             Desk Mat  540 searches  1200 listings",
        )
        .style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(app.raw_data.as_str())
    };

    frame.render_widget(text.block(block).wrap(Wrap { trim: false }), area);
}

fn render_results(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" SEO Report ")
        .borders(Borders::ALL)
        .border_style(pane_border_style(app, FocusPane::Results));

    let Some(result) = app.result.clone() else {
        let body = if app.analysis_loading() {
            let dots = ".".repeat(app.animation_frame as usize + 1);
            Paragraph::new(format!(
                "AI is thinking{}\n\nIdentifying product traits, filtering junk terms,\nmapping the competition matrix.",
                dots
            ))
            .style(Style::default().fg(Color::Magenta))
        } else {
            Paragraph::new(
                "Waiting for input.\n\nAdd images and raw data on the left,\nthen press 'r' to run the analysis.",
            )
            .style(Style::default().fg(Color::DarkGray))
        };
        frame.render_widget(
            body.block(block).alignment(Alignment::Center).wrap(Wrap { trim: true }),
            area,
        );
        return;
    };

    frame.render_widget(block, area);
    let inner = area.inner(ratatui::layout::Margin {
        horizontal: 1,
        vertical: 1,
    });

    let [context_area, chart_area, table_area, narrative_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(14),
        Constraint::Min(6),
        Constraint::Percentage(35),
    ])
    .areas(inner);

    render_product_context(&result, frame, context_area);
    render_chart(&result, frame, chart_area);
    render_table(app, frame, table_area);
    render_narrative(app, &result, frame, narrative_area);
}

fn render_product_context(result: &AnalysisResult, frame: &mut Frame, area: Rect) {
    let ctx = &result.product_context;
    let kind = if ctx.is_physical { "Physical" } else { "Digital" };
    let line = Line::from(vec![
        Span::styled("Niche: ", Style::default().fg(Color::DarkGray)),
        Span::styled(ctx.niche.clone(), Style::default().bold()),
        Span::raw("  ·  "),
        Span::styled("Type: ", Style::default().fg(Color::DarkGray)),
        Span::raw(kind),
        Span::raw("  ·  "),
        Span::styled("Style: ", Style::default().fg(Color::DarkGray)),
        Span::raw(ctx.visual_style.clone()),
    ]);
    frame.render_widget(Paragraph::new(line).wrap(Wrap { trim: true }), area);
}

fn render_chart(result: &AnalysisResult, frame: &mut Frame, area: Rect) {
    // One point per keyword at (competition, volume); coincident points all
    // plot (later datasets draw over earlier ones, nothing is dropped).
    let mut points: [Vec<(f64, f64)>; 4] = Default::default();
    for record in &result.keywords {
        let slot = Quadrant::ALL
            .iter()
            .position(|q| *q == record.quadrant)
            .unwrap_or(0);
        points[slot].push((record.competition, record.search_volume));
    }

    let max_x = result
        .keywords
        .iter()
        .map(|k| k.competition)
        .fold(1.0_f64, f64::max);
    let max_y = result
        .keywords
        .iter()
        .map(|k| k.search_volume)
        .fold(1.0_f64, f64::max);
    let x_bound = max_x * 1.05;
    let y_bound = max_y * 1.05;

    let datasets: Vec<Dataset> = Quadrant::ALL
        .iter()
        .zip(points.iter())
        .map(|(quadrant, data)| {
            Dataset::default()
                .name(quadrant.label())
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(quadrant_color(*quadrant)))
                .data(data)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(Block::default().title(" Quadrant Matrix ").borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .title("Competition (listings)")
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, x_bound])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format_count(x_bound / 2.0)),
                    Span::raw(format_count(x_bound)),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Searches")
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, y_bound])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format_count(y_bound / 2.0)),
                    Span::raw(format_count(y_bound)),
                ]),
        );

    frame.render_widget(chart, area);
}

fn render_table(app: &App, frame: &mut Frame, area: Rect) {
    let rows: Vec<Row> = app
        .sorted_keywords()
        .into_iter()
        .map(|record| {
            Row::new(vec![
                Span::styled(
                    record.quadrant.label(),
                    Style::default().fg(quadrant_color(record.quadrant)).bold(),
                ),
                Span::raw(record.keyword.clone()),
                Span::raw(format_count(record.search_volume)),
                Span::raw(format_count(record.competition)),
                Span::styled(record.reason.clone(), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Percentage(28),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Percentage(40),
        ],
    )
    .header(
        Row::new(vec!["Quadrant", "Keyword", "Searches", "Listings", "Reason"])
            .style(Style::default().fg(Color::DarkGray).bold()),
    )
    .block(
        Block::default()
            .title(" Keywords (by search volume) ")
            .borders(Borders::ALL),
    );

    frame.render_widget(table, area);
}

fn render_narrative(app: &App, result: &AnalysisResult, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        "💡 Value Analysis",
        Style::default().fg(Color::Green).bold(),
    )));
    for line in result.value_analysis.lines() {
        lines.push(parse_markdown_line(line));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "💰 Pricing Strategy",
        Style::default().fg(Color::Yellow).bold(),
    )));
    for line in result.pricing_strategy.lines() {
        lines.push(parse_markdown_line(line));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "🚀 Search These Next",
        Style::default().fg(Color::Cyan).bold(),
    )));
    let chips: Vec<Span> = result
        .next_steps
        .iter()
        .flat_map(|step| {
            [
                Span::styled(
                    format!(" {} ", step),
                    Style::default().fg(Color::Black).bg(Color::Cyan),
                ),
                Span::raw(" "),
            ]
        })
        .collect();
    lines.push(Line::from(chips));

    let narrative = Paragraph::new(lines)
        .block(Block::default().title(" Strategy ").borders(Borders::ALL))
        .wrap(Wrap { trim: false })
        .scroll((app.results_scroll, 0));
    frame.render_widget(narrative, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let keys = match app.input_mode {
        InputMode::Editing => "Esc finish editing · type/paste raw data".to_string(),
        InputMode::PathPrompt => "Enter add · Esc cancel".to_string(),
        InputMode::Normal => {
            "Tab panes · a add image · x remove · g ideas · y save ideas · i edit data · r analyze · q quit"
                .to_string()
        }
    };

    let mut lines = vec![Line::from(Span::styled(
        keys,
        Style::default().fg(Color::DarkGray),
    ))];

    if let Some(error) = &app.error {
        lines.insert(
            0,
            Line::from(Span::styled(
                format!("Error: {}", error),
                Style::default().fg(Color::Red).bold(),
            )),
        );
    } else if let Some(status) = &app.status {
        lines.insert(
            0,
            Line::from(Span::styled(
                status.clone(),
                Style::default().fg(Color::Green),
            )),
        );
    }

    lines.truncate(area.height as usize);
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_path_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let width = (area.width.saturating_sub(8)).clamp(20, 70);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height / 2).saturating_sub(2),
        width,
        height: 3,
    };

    frame.render_widget(Clear, popup);
    let input = Paragraph::new(app.path_input.as_str()).block(
        Block::default()
            .title(" Image file path ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(input, popup);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_markdown_becomes_styled_span() {
        let line = parse_markdown_line("the **gold** terms");
        assert_eq!(line.spans.len(), 3);
        assert!(line.spans[1]
            .style
            .add_modifier
            .contains(Modifier::BOLD));
        assert_eq!(line.spans[1].content, "gold");
    }

    #[test]
    fn unterminated_bold_is_literal() {
        let line = parse_markdown_line("a **dangling");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "a **dangling");
    }

    #[test]
    fn counts_abbreviate_thousands() {
        assert_eq!(format_count(950.0), "950");
        assert_eq!(format_count(1520.0), "1.5k");
        assert_eq!(format_count(24000.0), "24.0k");
    }
}
