//! Rendering for the terminal form.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Row, Table},
};

use super::app::{App, Field};

pub fn draw_ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Model banner
            Constraint::Length(7),  // Form
            Constraint::Min(6),     // Details
            Constraint::Length(3),  // Status + help
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], app);
    draw_form(frame, chunks[1], app);
    draw_details(frame, chunks[2], app);
    draw_footer(frame, chunks[3], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let header = Paragraph::new(app.model_line.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(" Solar AC Power Predictor "));
    frame.render_widget(header, area);
}

fn draw_form(frame: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = Field::ALL
        .iter()
        .map(|field| {
            let focused = *field == app.focus;
            let invalid = app.error_field == Some(field.key());

            let mut value = app.value(*field).to_string();
            if *field == Field::Inverter {
                value = format!("◀ {} ▶", value);
            } else if focused {
                value.push('_');
            }

            let label_style = if focused {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let value_style = if invalid {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::White)
            };

            Line::from(vec![
                Span::styled(format!("{:<30}", field.label()), label_style),
                Span::styled(value, value_style),
            ])
        })
        .collect();

    let form = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Inputs "));
    frame.render_widget(form, area);
}

fn draw_details(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL).title(" Prediction details ");

    if app.details.is_empty() {
        let hint = Paragraph::new("Fill in the inputs and press Enter.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let rows: Vec<Row> = app
        .details
        .iter()
        .map(|(label, value)| Row::new(vec![label.to_string(), value.clone()]))
        .collect();
    let table = Table::new(rows, [Constraint::Length(24), Constraint::Min(10)]).block(block);
    frame.render_widget(table, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let (text, style) = match &app.status_message {
        Some((message, _)) if app.error_field.is_some() || message.contains("Error") => {
            (message.clone(), Style::default().fg(Color::Red))
        }
        Some((message, _)) => (message.clone(), Style::default().fg(Color::Green)),
        None => (
            "[Tab/↑↓] Field  [←→] Inverter  [Enter] Predict  [Ctrl+L] Clear  [Esc] Quit".to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    };

    let footer = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}
