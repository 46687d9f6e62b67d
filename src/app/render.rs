//! Screen rendering.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

use crate::{
    events::{CustomizeFocus, Screen},
    input::render_input_box,
    jobs::JobStatus,
    layout::{create_body_layout, create_main_layout},
    quote::{self, format_currency},
    session::ColorSelection,
};

use super::{App, JobProgress};
use super::handlers::{ColorEntry, color_entries};

/// Draw the whole frame.
pub fn draw(f: &mut Frame, app: &App) {
    let main = create_main_layout(f.area());

    match app.ui.screen {
        Screen::Upload => render_upload(f, main.body, app),
        Screen::Customize => render_customize(f, main.body, app),
        Screen::Quote => render_quote(f, main.body, app),
        Screen::Cart => render_cart(f, main.body, app),
        Screen::Admin => render_admin(f, main.body, app),
        Screen::Settings => render_settings(f, main.body, app),
    }

    render_help_bar(f, main.help_bar, app);
    render_status_bar(f, main.status_bar, app);

    if let Some(input) = &app.input_box {
        render_input_box(f, input);
    }
}

fn render_upload(f: &mut Frame, area: Rect, app: &App) {
    let body = create_body_layout(area);

    let mut lines = vec![
        Line::from(Span::styled(
            "3D Print Instant Quote",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!(
            "Model file: {}",
            if app.file_path.is_empty() {
                "(none)"
            } else {
                &app.file_path
            }
        )),
        Line::from(format!(
            "Catalog: {}",
            match &app.catalog {
                Some(c) => format!("{} materials", c.materials.len()),
                None => "loading...".into(),
            }
        )),
        Line::from(""),
    ];
    lines.push(progress_line(app));
    lines.push(Line::from(""));
    lines.push(Line::from(
        "Pick a model file, then continue to customization.",
    ));

    let para = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Upload"));
    f.render_widget(para, body.list);

    render_log_panel(f, body.info_panel, app);
}

/// One-line summary of the active job, colored by state.
fn progress_line(app: &App) -> Line<'static> {
    match &app.progress {
        JobProgress::Idle => Line::from("No job in flight."),
        JobProgress::Uploading => Line::from(Span::styled(
            "Uploading model...",
            Style::default().fg(Color::Yellow),
        )),
        JobProgress::Waiting { job_id, status } => Line::from(Span::styled(
            format!("Job {job_id}: {}...", status.label()),
            Style::default().fg(Color::Yellow),
        )),
        JobProgress::Ready(job) => Line::from(Span::styled(
            format!("Job {}: quote ready", job.id),
            Style::default().fg(Color::Green),
        )),
        JobProgress::Failed { message } => Line::from(Span::styled(
            format!("Failed: {message}"),
            Style::default().fg(Color::Red),
        )),
        JobProgress::GaveUp { attempts } => Line::from(Span::styled(
            format!("Gave up after {attempts} status checks"),
            Style::default().fg(Color::Red),
        )),
    }
}

fn render_customize(f: &mut Frame, area: Rect, app: &App) {
    let body = create_body_layout(area);
    let mut lines: Vec<Line> = vec![];

    let section_title = |name: &str, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        Line::from(Span::styled(format!("{name}:"), style))
    };
    let row = |label: String, under_cursor: bool, selected: bool| {
        let marker = if under_cursor { ">" } else { " " };
        let mark = if selected { "[x]" } else { "[ ]" };
        let style = if under_cursor {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Line::from(Span::styled(format!(" {marker} {mark} {label}"), style))
    };

    if let Some(catalog) = &app.catalog {
        let focus = app.ui.focus;

        lines.push(section_title("Material", focus == CustomizeFocus::Material));
        for (i, m) in catalog.materials.iter().enumerate() {
            let selected = app.session.selection.material_id.as_deref() == Some(m.id.as_str());
            lines.push(row(
                m.name.clone(),
                focus == CustomizeFocus::Material && i == app.material_idx,
                selected,
            ));
        }
        lines.push(Line::from(""));

        lines.push(section_title("Color", focus == CustomizeFocus::Color));
        for (i, entry) in color_entries(app).iter().enumerate() {
            let selected = match (&app.session.selection.color, entry) {
                (Some(ColorSelection::Standard { hex }), ColorEntry::Standard { hex: h, .. }) => {
                    hex.eq_ignore_ascii_case(h)
                }
                (
                    Some(ColorSelection::Special { filament_id }),
                    ColorEntry::Special { id, .. },
                ) => filament_id == id,
                _ => false,
            };
            lines.push(row(
                entry.label(),
                focus == CustomizeFocus::Color && i == app.color_idx,
                selected,
            ));
        }
        if app.session.selection.is_multi_color() {
            lines.push(Line::from(Span::styled(
                "   [x] Multi-Color",
                Style::default().fg(Color::Magenta),
            )));
        }
        lines.push(Line::from(""));

        lines.push(section_title("Quality", focus == CustomizeFocus::Quality));
        let levels = catalog.quality_levels();
        for (i, level) in levels.iter().enumerate() {
            let modifier = quote::display_quality_modifier(&levels, &level.id);
            let label = format!(
                "{} ({}) {}",
                level.name,
                level.layer_height,
                if modifier == 0.0 {
                    "included".to_string()
                } else {
                    format!("{:+.0}", modifier)
                }
            );
            lines.push(row(
                label,
                app.ui.focus == CustomizeFocus::Quality && i == app.quality_idx,
                app.session.selection.quality_id() == level.id,
            ));
        }
    } else {
        lines.push(Line::from("Loading materials..."));
    }

    let para = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Customize"));
    f.render_widget(para, body.list);

    render_selection_panel(f, body.info_panel, app);
}

/// Current selection summary shown next to the customize and quote screens.
fn render_selection_panel(f: &mut Frame, area: Rect, app: &App) {
    let selection = &app.session.selection;
    let mut lines = vec![
        Line::from(format!(
            "Model: {}",
            app.session.uploaded_model.as_deref().unwrap_or_else(|| {
                if app.file_path.is_empty() {
                    "(none)"
                } else {
                    &app.file_path
                }
            })
        )),
        Line::from(format!(
            "Material: {}",
            selection
                .material_id
                .as_deref()
                .map(|id| {
                    app.catalog
                        .as_ref()
                        .and_then(|c| c.material(id))
                        .map(|m| m.name.as_str())
                        .unwrap_or(id)
                })
                .unwrap_or("(none)")
        )),
        Line::from(format!(
            "Color: {}",
            selection
                .color
                .as_ref()
                .map(ColorSelection::label)
                .unwrap_or_else(|| "(none)".into())
        )),
        Line::from(format!("Quality: {}", selection.quality_id())),
        Line::from(format!("Preview tint: {}", selection.preview_hex())),
    ];
    if let Some(ColorSelection::MultiColor { details }) = &selection.color {
        lines.push(Line::from(format!("Requirements: {details}")));
    }

    let para = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Selection"));
    f.render_widget(para, area);
}

fn render_quote(f: &mut Frame, area: Rect, app: &App) {
    let body = create_body_layout(area);

    let lines: Vec<Line> = match &app.progress {
        JobProgress::Idle => vec![Line::from("No job submitted yet.")],
        JobProgress::Uploading => vec![Line::from(Span::styled(
            "Uploading model...",
            Style::default().fg(Color::Yellow),
        ))],
        JobProgress::Waiting { status, .. } => vec![
            Line::from(Span::styled(
                "Calculating your quote...",
                Style::default().fg(Color::Yellow),
            )),
            Line::from(""),
            Line::from(format!(
                "Status: {} {}",
                status.label(),
                if *status == JobStatus::Processing {
                    "(slicing)"
                } else {
                    ""
                }
            )),
        ],
        JobProgress::Failed { message } => vec![
            Line::from(Span::styled(
                "Quote failed",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::Red),
            )),
        ],
        JobProgress::GaveUp { attempts } => vec![Line::from(Span::styled(
            format!("Gave up after {attempts} status checks. Try again later."),
            Style::default().fg(Color::Red),
        ))],
        JobProgress::Ready(job) => quote_breakdown_lines(app, job),
    };

    let para = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Quote"));
    f.render_widget(para, body.list);

    render_selection_panel(f, body.info_panel, app);
}

fn quote_breakdown_lines(app: &App, job: &crate::jobs::Job) -> Vec<Line<'static>> {
    let Some(result) = job.result() else {
        return vec![Line::from("No result attached to this job.")];
    };

    let mut lines = vec![
        Line::from(format!(
            "Filament: {:.1} g   Print time: {}",
            result.filament_used_g, result.estimated_time
        )),
        Line::from(format!(
            "Size: {:.1} x {:.1} x {:.1} mm   Volume: {:.1} cm3{}",
            result.size.x,
            result.size.y,
            result.size.z,
            result.volume_cm3,
            if result.has_supports {
                "   (supports)"
            } else {
                ""
            }
        )),
        Line::from(""),
    ];

    match quote::quote_for_result(
        result,
        app.session.selection.is_multi_color(),
        app.quantity,
        app.is_multi_part,
    ) {
        Ok(q) => {
            let money_row = |label: &str, amount: f64| {
                Line::from(format!("{label:<22}{:>10}", format_currency(amount)))
            };
            lines.push(money_row("Base price", q.base_price));
            if q.color_modifier != 0.0 {
                lines.push(money_row("Color", q.color_modifier));
            }
            if q.material_modifier != 0.0 {
                lines.push(money_row("Material", q.material_modifier));
            }
            if q.multi_color_modifier != 0.0 {
                lines.push(money_row("Multi-color", q.multi_color_modifier));
            }
            if q.quality_modifier != 0.0 {
                lines.push(money_row("Quality", q.quality_modifier));
            }
            lines.push(money_row("Unit price", q.total));
            lines.push(Line::from(""));
            lines.push(Line::from(format!(
                "Quantity: {}   Multi-part: {}",
                app.quantity,
                if app.is_multi_part { "yes" } else { "no" }
            )));
            if app.is_multi_part && app.quantity > 1 {
                lines.push(Line::from("Multi-part discount: -10%"));
            }
            lines.push(Line::from(Span::styled(
                format!("Total: {}", format_currency(q.total_with_quantity)),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
            if app.added_to_cart {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "In cart",
                    Style::default().fg(Color::Green),
                )));
            }
        }
        Err(e) => {
            lines.push(Line::from(Span::styled(
                e.to_string(),
                Style::default().fg(Color::Red),
            )));
            lines.push(Line::from("Contact the shop with your job id."));
        }
    }
    lines
}

fn render_cart(f: &mut Frame, area: Rect, app: &App) {
    let items = app.session.cart();

    let header = Row::new(vec!["", "Model", "Color", "Material", "Quality", "Qty", "Price"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let marker = if i == app.ui.selected { ">" } else { " " };
            let style = if i == app.ui.selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Row::new(vec![
                marker.to_string(),
                item.model_name.clone(),
                item.color_label.clone(),
                item.material_id.clone(),
                item.quality_id.clone(),
                item.quantity.to_string(),
                format_currency(item.price),
            ])
            .style(style)
        })
        .collect();

    let title = format!(
        "Cart ({} items, total {})",
        items.len(),
        format_currency(app.session.cart_total())
    );
    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Min(16),
            Constraint::Length(18),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}

fn render_admin(f: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(vec!["", "Job", "File", "Status", "Created", "Price"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = app
        .admin_jobs
        .iter()
        .enumerate()
        .map(|(i, job)| {
            let marker = if i == app.ui.selected { ">" } else { " " };
            let status = job.status();
            let status_style = match status {
                JobStatus::Completed => Style::default().fg(Color::Green),
                JobStatus::Failed => Style::default().fg(Color::Red),
                JobStatus::Approved => Style::default().fg(Color::Cyan),
                JobStatus::Rejected => Style::default().fg(Color::DarkGray),
                _ => Style::default().fg(Color::Yellow),
            };
            let price = job
                .result()
                .and_then(|r| r.price_info)
                .map(|p| format_currency(p.total_price))
                .unwrap_or_else(|| "-".into());
            let row_style = if i == app.ui.selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(marker.to_string()),
                Cell::from(short_id(&job.id)),
                Cell::from(job.original_filename.clone()),
                Cell::from(Span::styled(status.label(), status_style)),
                Cell::from(format_created_at(job.created_at)),
                Cell::from(price),
            ])
            .style(row_style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Length(10),
            Constraint::Min(16),
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Jobs ({})", app.admin_jobs.len())),
    );
    f.render_widget(table, area);
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Epoch seconds to a local wall-clock timestamp.
fn format_created_at(ts: Option<f64>) -> String {
    ts.and_then(|t| chrono::DateTime::from_timestamp(t as i64, 0))
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".into())
}

fn render_settings(f: &mut Frame, area: Rect, app: &App) {
    let lines = vec![
        Line::from(format!("[b] Backend URL:     {}", app.base_url_buf)),
        Line::from(format!("[i] Poll interval:   {} ms", app.interval_buf)),
        Line::from(format!(
            "[m] Max attempts:    {}",
            if app.max_attempts_buf.is_empty() {
                "unbounded"
            } else {
                &app.max_attempts_buf
            }
        )),
        Line::from(""),
        Line::from("Enter saves, Esc discards."),
    ];
    let para = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Settings"));
    f.render_widget(para, area);
}

fn render_log_panel(f: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = app
        .ui
        .log
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|l| Line::from(l.clone()))
        .collect();
    let para = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Log"));
    f.render_widget(para, area);
}

fn render_help_bar(f: &mut Frame, area: Rect, app: &App) {
    let sc = &app.shortcuts;
    let first = |keys: &[String]| keys.first().cloned().unwrap_or_default();
    let help = match app.ui.screen {
        Screen::Upload => format!(
            "{}=file  {}=customize  {}=cart  {}=jobs  {}=settings  {}=start over  {}=quit",
            first(&sc.upload.pick_file),
            first(&sc.upload.customize),
            first(&sc.upload.cart),
            first(&sc.upload.admin),
            first(&sc.upload.settings),
            first(&sc.upload.reset),
            first(&sc.upload.quit),
        ),
        Screen::Customize => format!(
            "{}=section  Up/Down=select  {}=multi-color  {}=details  {}=get quote  {}=back",
            first(&sc.customize.next_section),
            first(&sc.customize.multi_color),
            first(&sc.customize.details),
            first(&sc.customize.get_quote),
            first(&sc.customize.back),
        ),
        Screen::Quote => format!(
            "{}=quantity  {}/{}=adjust  {}=multi-part  {}=add to cart  {}=cart  {}=back",
            first(&sc.quote.quantity),
            first(&sc.quote.increment),
            first(&sc.quote.decrement),
            first(&sc.quote.multi_part),
            first(&sc.quote.add_to_cart),
            first(&sc.quote.cart),
            first(&sc.quote.back),
        ),
        Screen::Cart => format!(
            "Up/Down=select  {}=remove  {}=new upload  {}=back",
            first(&sc.cart.remove),
            first(&sc.cart.new_upload),
            first(&sc.cart.back),
        ),
        Screen::Admin => format!(
            "{}=refresh  Up/Down=select  {}=approve  {}=reject  {}=save file  {}=back",
            first(&sc.admin.refresh),
            first(&sc.admin.approve),
            first(&sc.admin.reject),
            first(&sc.admin.save_model),
            first(&sc.admin.back),
        ),
        Screen::Settings => format!(
            "{}=url  {}=interval  {}=max attempts  {}=save  {}=cancel",
            first(&sc.settings.base_url),
            first(&sc.settings.interval),
            first(&sc.settings.max_attempts),
            first(&sc.settings.save),
            first(&sc.settings.cancel),
        ),
    };
    let para = Paragraph::new(help)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(para, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (text, style) = match &app.ui.error {
        Some(e) => (e.clone(), Style::default().fg(Color::Red)),
        None => (app.ui.status.clone(), Style::default()),
    };
    let para = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(para, area);
}
