//! Keyboard handling per screen.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::{Path, PathBuf};

use crate::{
    api::PrintOptions,
    events::{CustomizeFocus, Screen},
    input::{InputBoxState, InputCallbackId},
    quote,
    session::ColorSelection,
    shortcuts::matches_shortcut,
    validate,
    worker::WorkerCmd,
};

use super::{App, JobProgress};

/// One row in the customize color list.
pub(super) enum ColorEntry {
    Standard { hex: String, name: String },
    Special { id: String, name: String },
}

impl ColorEntry {
    pub(super) fn label(&self) -> String {
        match self {
            ColorEntry::Standard { hex, name } => format!("{name} ({hex})"),
            ColorEntry::Special { id: _, name } => format!("{name} [special]"),
        }
    }
}

/// Rows shown in the color section: the selected material's stock first,
/// then the special filaments.
pub(super) fn color_entries(app: &App) -> Vec<ColorEntry> {
    let mut entries = vec![];
    if let (Some(catalog), Some(material_id)) =
        (&app.catalog, &app.session.selection.material_id)
        && let Some(material) = catalog.material(material_id)
    {
        for c in &material.colors {
            entries.push(ColorEntry::Standard {
                hex: c.hex.clone(),
                name: c.name.clone(),
            });
        }
    }
    for (id, name) in crate::catalog::special_filaments() {
        entries.push(ColorEntry::Special {
            id: id.to_string(),
            name: name.to_string(),
        });
    }
    entries
}

pub fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

/// Dispatch a key event. Returns true when the app should exit.
pub async fn handle_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    // An open input box captures everything.
    if app.input_box.is_some() {
        handle_input_box_key(app, key);
        return Ok(false);
    }

    match app.ui.screen {
        Screen::Upload => handle_upload_key(app, key).await,
        Screen::Customize => handle_customize_key(app, key).await,
        Screen::Quote => handle_quote_key(app, key).await,
        Screen::Cart => handle_cart_key(app, key).await,
        Screen::Admin => handle_admin_key(app, key).await,
        Screen::Settings => handle_settings_key(app, key).await,
    }
}

fn handle_input_box_key(app: &mut App, key: KeyEvent) {
    let sc = app.shortcuts.input_box.clone();

    if matches_shortcut(&key, &sc.confirm) {
        if let Some(finished) = app.input_box.take() {
            apply_input(app, finished.callback_id, finished.value);
        }
        return;
    }
    if matches_shortcut(&key, &sc.cancel) {
        app.input_box = None;
        return;
    }

    let Some(input) = app.input_box.as_mut() else {
        return;
    };
    if matches_shortcut(&key, &sc.backspace) {
        input.backspace();
    } else if matches_shortcut(&key, &sc.delete) {
        input.delete();
    } else if matches_shortcut(&key, &sc.left) {
        input.move_left();
    } else if matches_shortcut(&key, &sc.right) {
        input.move_right();
    } else if matches_shortcut(&key, &sc.home) {
        input.move_home();
    } else if matches_shortcut(&key, &sc.end) {
        input.move_end();
    } else if matches_shortcut(&key, &sc.clear_line) {
        input.clear_line();
    } else if let KeyCode::Char(c) = key.code
        && !key.modifiers.contains(KeyModifiers::CONTROL)
        && !key.modifiers.contains(KeyModifiers::ALT)
    {
        input.insert_char(c);
    }
}

/// Route a confirmed input value to its destination.
fn apply_input(app: &mut App, callback_id: InputCallbackId, value: String) {
    match callback_id {
        InputCallbackId::UploadFilePath => {
            app.file_path = value.trim().to_string();
            app.ui.error = None;
            if !app.file_path.is_empty() {
                app.ui.status = format!("Selected: {}", app.file_path);
            }
        }
        InputCallbackId::MultiColorDetails => {
            app.session.enable_multi_color(value);
            app.ui.status = "Multi-color enabled".into();
        }
        InputCallbackId::QuoteQuantity => match value.trim().parse::<u32>() {
            Ok(n) if n >= 1 => {
                app.quantity = n;
                app.added_to_cart = false;
            }
            _ => app.ui.error = Some(format!("invalid quantity: {value}")),
        },
        InputCallbackId::SettingsBaseUrl => app.base_url_buf = value.trim().to_string(),
        InputCallbackId::SettingsIntervalMs => app.interval_buf = value.trim().to_string(),
        InputCallbackId::SettingsMaxAttempts => app.max_attempts_buf = value.trim().to_string(),
    }
}

async fn handle_upload_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    let sc = app.shortcuts.upload.clone();

    if matches_shortcut(&key, &sc.quit) {
        return Ok(true);
    } else if matches_shortcut(&key, &sc.pick_file) {
        app.input_box = Some(InputBoxState::new(
            "Model file path:",
            app.file_path.clone(),
            InputCallbackId::UploadFilePath,
        ));
    } else if matches_shortcut(&key, &sc.customize) {
        if app.catalog.is_none() {
            app.ui.error = Some("materials not loaded yet".into());
        } else if app.file_path.is_empty() {
            app.ui.error = Some("pick a model file first".into());
        } else if let Err(e) =
            validate::validate_model_file(Path::new(&app.file_path), app.cfg.upload.max_file_size_mb)
        {
            app.ui.error = Some(e.to_string());
        } else {
            app.ui.error = None;
            app.ui.focus = CustomizeFocus::Material;
            app.ui.screen = Screen::Customize;
        }
    } else if matches_shortcut(&key, &sc.cart) {
        app.ui.selected = 0;
        app.ui.screen = Screen::Cart;
    } else if matches_shortcut(&key, &sc.admin) {
        app.ui.selected = 0;
        app.ui.screen = Screen::Admin;
        app.worker_tx.send(WorkerCmd::LoadAllJobs).await?;
        app.ui.status = "Loading jobs...".into();
    } else if matches_shortcut(&key, &sc.settings) {
        reload_settings_buffers(app);
        app.ui.screen = Screen::Settings;
    } else if matches_shortcut(&key, &sc.reset) {
        reset_flow(app).await?;
        app.ui.status = "Started over".into();
    }
    Ok(false)
}

async fn handle_customize_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    let sc = app.shortcuts.customize.clone();

    if matches_shortcut(&key, &sc.back) {
        app.ui.screen = Screen::Upload;
    } else if matches_shortcut(&key, &sc.next_section) {
        app.ui.focus = match app.ui.focus {
            CustomizeFocus::Material => CustomizeFocus::Color,
            CustomizeFocus::Color => CustomizeFocus::Quality,
            CustomizeFocus::Quality => CustomizeFocus::Material,
        };
    } else if matches_shortcut(&key, &sc.up) {
        move_customize_cursor(app, -1);
    } else if matches_shortcut(&key, &sc.down) {
        move_customize_cursor(app, 1);
    } else if matches_shortcut(&key, &sc.multi_color) {
        toggle_multi_color(app);
    } else if matches_shortcut(&key, &sc.details) {
        if let Some(ColorSelection::MultiColor { details }) = &app.session.selection.color {
            app.input_box = Some(InputBoxState::new(
                "Multi-color requirements:",
                details.clone(),
                InputCallbackId::MultiColorDetails,
            ));
        } else {
            app.ui.error = Some("enable multi-color mode first".into());
        }
    } else if matches_shortcut(&key, &sc.get_quote) {
        request_quote(app).await?;
    }
    Ok(false)
}

/// Move the cursor within the focused section, applying the highlighted
/// entry to the session.
fn move_customize_cursor(app: &mut App, delta: isize) {
    let Some(catalog) = &app.catalog else { return };

    match app.ui.focus {
        CustomizeFocus::Material => {
            let len = catalog.materials.len();
            if len == 0 {
                return;
            }
            // The first press selects the highlighted row; later presses move.
            if app.session.selection.material_id.is_some() {
                app.material_idx = step(app.material_idx, delta, len);
            }
            let material = catalog.materials[app.material_idx].clone();
            app.session.select_material(material.id.clone());
            // The color list just changed under the cursor; drop a standard
            // color the new material does not stock.
            app.color_idx = 0;
            if let Some(ColorSelection::Standard { hex }) = &app.session.selection.color
                && !material.colors.iter().any(|c| c.hex.eq_ignore_ascii_case(hex))
            {
                app.session.selection.color = None;
            }
        }
        CustomizeFocus::Color => {
            let entries = color_entries(app);
            if entries.is_empty() {
                return;
            }
            if app.session.selection.color.is_some() {
                app.color_idx = step(app.color_idx, delta, entries.len());
            }
            match &entries[app.color_idx] {
                ColorEntry::Standard { hex, .. } => app.session.select_color(hex.clone()),
                ColorEntry::Special { id, .. } => {
                    app.session.select_special_filament(id.clone())
                }
            }
        }
        CustomizeFocus::Quality => {
            let levels = catalog.quality_levels();
            if levels.is_empty() {
                return;
            }
            if !app.session.selection.quality_id.is_empty() {
                app.quality_idx = step(app.quality_idx, delta, levels.len());
            }
            app.session.select_quality(levels[app.quality_idx].id.clone());
        }
    }
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    let len = len as isize;
    (current as isize + delta).rem_euclid(len) as usize
}

fn toggle_multi_color(app: &mut App) {
    if app.session.selection.is_multi_color() {
        app.session.disable_multi_color();
        app.ui.status = "Multi-color disabled".into();
        return;
    }

    // Refuse up front when the chosen material cannot do it.
    if let (Some(catalog), Some(material_id)) = (&app.catalog, &app.session.selection.material_id)
        && let Some(material) = catalog.material(material_id)
        && !material.supports_multi_color()
    {
        app.ui.error = Some(format!(
            "{} does not support multi-color printing",
            material.name
        ));
        return;
    }

    app.input_box = Some(InputBoxState::new(
        "Multi-color requirements:",
        String::new(),
        InputCallbackId::MultiColorDetails,
    ));
}

/// Validate the selection and submit the model for slicing and pricing.
async fn request_quote(app: &mut App) -> Result<()> {
    let Some(catalog) = &app.catalog else {
        app.ui.error = Some("materials not loaded yet".into());
        return Ok(());
    };
    if let Err(e) = validate::validate_selection(catalog, &app.session.selection) {
        app.ui.error = Some(e.to_string());
        return Ok(());
    }
    let Some(color) = &app.session.selection.color else {
        app.ui.error = Some("select a color first".into());
        return Ok(());
    };

    // The color_id field carries whichever color branch is active: the
    // catalog color id, the special filament id, or the multi-color marker.
    let material_id = app
        .session
        .selection
        .material_id
        .clone()
        .unwrap_or_default();
    let color_id = match color {
        ColorSelection::Standard { hex } => catalog
            .material(&material_id)
            .and_then(|m| m.colors.iter().find(|c| c.hex.eq_ignore_ascii_case(hex)))
            .map(|c| c.id.clone())
            .unwrap_or_default(),
        ColorSelection::Special { filament_id } => filament_id.clone(),
        ColorSelection::MultiColor { .. } => "multi-color".to_string(),
    };

    let options = PrintOptions {
        material_id,
        color_id,
        quality_id: app.session.selection.quality_id().to_string(),
        fill_density: app.cfg.upload.fill_density,
        enable_supports: app.cfg.upload.enable_supports,
    };
    app.worker_tx
        .send(WorkerCmd::Upload {
            path: PathBuf::from(&app.file_path),
            options,
        })
        .await?;

    app.progress = JobProgress::Uploading;
    app.quantity = 1;
    app.is_multi_part = false;
    app.added_to_cart = false;
    app.ui.error = None;
    app.ui.status = "Uploading...".into();
    app.ui.screen = Screen::Quote;
    Ok(())
}

async fn handle_quote_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    let sc = app.shortcuts.quote.clone();

    if matches_shortcut(&key, &sc.back) {
        // Leaving the quote view tears down any poll still running.
        if matches!(
            app.progress,
            JobProgress::Uploading | JobProgress::Waiting { .. }
        ) {
            app.worker_tx.send(WorkerCmd::CancelPoll).await?;
            app.progress = JobProgress::Idle;
        }
        app.ui.screen = Screen::Customize;
    } else if matches_shortcut(&key, &sc.quantity) {
        app.input_box = Some(InputBoxState::new(
            "Quantity:",
            app.quantity.to_string(),
            InputCallbackId::QuoteQuantity,
        ));
    } else if matches_shortcut(&key, &sc.increment) {
        app.quantity = app.quantity.saturating_add(1);
        app.added_to_cart = false;
    } else if matches_shortcut(&key, &sc.decrement) {
        app.quantity = app.quantity.saturating_sub(1).max(1);
        app.added_to_cart = false;
    } else if matches_shortcut(&key, &sc.multi_part) {
        app.is_multi_part = !app.is_multi_part;
        app.added_to_cart = false;
    } else if matches_shortcut(&key, &sc.add_to_cart) {
        add_quote_to_cart(app);
    } else if matches_shortcut(&key, &sc.cart) {
        app.ui.selected = 0;
        app.ui.screen = Screen::Cart;
    }
    Ok(false)
}

fn add_quote_to_cart(app: &mut App) {
    let JobProgress::Ready(job) = &app.progress else {
        app.ui.error = Some("no quote ready to add".into());
        return;
    };
    let Some(result) = job.result() else {
        app.ui.error = Some("no quote ready to add".into());
        return;
    };
    match quote::quote_for_result(
        result,
        app.session.selection.is_multi_color(),
        app.quantity,
        app.is_multi_part,
    ) {
        Ok(q) => {
            app.session
                .add_to_cart(app.quantity, app.is_multi_part, q.total_with_quantity);
            app.added_to_cart = true;
            app.ui.status = format!(
                "Added to cart: {}",
                quote::format_currency(q.total_with_quantity)
            );
        }
        Err(e) => app.ui.error = Some(e.to_string()),
    }
}

async fn handle_cart_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    let sc = app.shortcuts.cart.clone();
    let len = app.session.cart().len();

    if matches_shortcut(&key, &sc.back) {
        app.ui.screen = Screen::Upload;
    } else if matches_shortcut(&key, &sc.up) {
        if app.ui.selected > 0 {
            app.ui.selected -= 1;
        }
    } else if matches_shortcut(&key, &sc.down) {
        if len > 0 && app.ui.selected < len - 1 {
            app.ui.selected += 1;
        }
    } else if matches_shortcut(&key, &sc.remove) {
        if len > 0 {
            app.session.remove_cart_item(app.ui.selected);
            if app.ui.selected > 0 && app.ui.selected >= app.session.cart().len() {
                app.ui.selected -= 1;
            }
            app.ui.status = "Removed item".into();
        }
    } else if matches_shortcut(&key, &sc.new_upload) {
        reset_flow(app).await?;
        app.ui.screen = Screen::Upload;
        app.ui.status = "Ready for a new model".into();
    }
    Ok(false)
}

async fn handle_admin_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    let sc = app.shortcuts.admin.clone();
    let len = app.admin_jobs.len();

    if matches_shortcut(&key, &sc.back) {
        app.ui.screen = Screen::Upload;
    } else if matches_shortcut(&key, &sc.refresh) {
        app.worker_tx.send(WorkerCmd::LoadAllJobs).await?;
        app.ui.status = "Refreshing jobs...".into();
    } else if matches_shortcut(&key, &sc.up) {
        if app.ui.selected > 0 {
            app.ui.selected -= 1;
        }
    } else if matches_shortcut(&key, &sc.down) {
        if len > 0 && app.ui.selected < len - 1 {
            app.ui.selected += 1;
        }
    } else if matches_shortcut(&key, &sc.approve) {
        admin_action(app, true).await?;
    } else if matches_shortcut(&key, &sc.reject) {
        admin_action(app, false).await?;
    } else if matches_shortcut(&key, &sc.save_model) {
        if let Some(job) = app.admin_jobs.get(app.ui.selected) {
            let filename = if job.filename.is_empty() {
                job.original_filename.clone()
            } else {
                job.filename.clone()
            };
            if filename.is_empty() {
                app.ui.error = Some("job has no stored file".into());
            } else {
                app.worker_tx
                    .send(WorkerCmd::SaveModelFile { filename })
                    .await?;
                app.ui.status = "Downloading model file...".into();
            }
        }
    }
    Ok(false)
}

/// Approve or reject the selected job. Only completed jobs qualify; the
/// check happens here so the backend never sees an invalid transition.
async fn admin_action(app: &mut App, approve: bool) -> Result<()> {
    let Some(job) = app.admin_jobs.get(app.ui.selected) else {
        return Ok(());
    };
    if job.status() != crate::jobs::JobStatus::Completed {
        app.ui.error = Some(format!(
            "only completed jobs can be {}; this one is {}",
            if approve { "approved" } else { "rejected" },
            job.status().label()
        ));
        return Ok(());
    }
    let cmd = if approve {
        WorkerCmd::ApproveJob(job.id.clone())
    } else {
        WorkerCmd::RejectJob(job.id.clone())
    };
    app.worker_tx.send(cmd).await?;
    app.ui.status = format!(
        "{} job {}...",
        if approve { "Approving" } else { "Rejecting" },
        job.id
    );
    Ok(())
}

async fn handle_settings_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    let sc = app.shortcuts.settings.clone();

    if matches_shortcut(&key, &sc.cancel) {
        reload_settings_buffers(app);
        app.ui.screen = Screen::Upload;
    } else if matches_shortcut(&key, &sc.save) {
        save_settings(app).await?;
    } else if matches_shortcut(&key, &sc.base_url) {
        app.input_box = Some(InputBoxState::new(
            "Backend base URL:",
            app.base_url_buf.clone(),
            InputCallbackId::SettingsBaseUrl,
        ));
    } else if matches_shortcut(&key, &sc.interval) {
        app.input_box = Some(InputBoxState::new(
            "Poll interval (ms):",
            app.interval_buf.clone(),
            InputCallbackId::SettingsIntervalMs,
        ));
    } else if matches_shortcut(&key, &sc.max_attempts) {
        app.input_box = Some(InputBoxState::new(
            "Max poll attempts (empty = unbounded):",
            app.max_attempts_buf.clone(),
            InputCallbackId::SettingsMaxAttempts,
        ));
    }
    Ok(false)
}

fn reload_settings_buffers(app: &mut App) {
    app.base_url_buf = app.cfg.backend.base_url.clone();
    app.interval_buf = app.cfg.poll.interval_ms.to_string();
    app.max_attempts_buf = app
        .cfg
        .poll
        .max_attempts
        .map(|n| n.to_string())
        .unwrap_or_default();
}

/// Parse the edit buffers, persist the config and hand it to the worker.
async fn save_settings(app: &mut App) -> Result<()> {
    if app.base_url_buf.is_empty() {
        app.ui.error = Some("base URL must not be empty".into());
        return Ok(());
    }
    let interval_ms = match app.interval_buf.parse::<u64>() {
        Ok(ms) if ms > 0 => ms,
        _ => {
            app.ui.error = Some(format!("invalid poll interval: {}", app.interval_buf));
            return Ok(());
        }
    };
    let max_attempts = if app.max_attempts_buf.is_empty() {
        None
    } else {
        match app.max_attempts_buf.parse::<u32>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                app.ui.error = Some(format!("invalid max attempts: {}", app.max_attempts_buf));
                return Ok(());
            }
        }
    };

    app.cfg.backend.base_url = app.base_url_buf.trim_end_matches('/').to_string();
    app.cfg.poll.interval_ms = interval_ms;
    app.cfg.poll.max_attempts = max_attempts;
    app.cfg.save(&app.cfg_path)?;
    app.worker_tx
        .send(WorkerCmd::SaveSettings(app.cfg.clone()))
        .await?;

    app.ui.error = None;
    app.ui.status = "Settings saved".into();
    app.ui.screen = Screen::Upload;
    Ok(())
}

/// Back to a blank flow: clear the selection and stop any running poll.
/// Cart contents survive.
async fn reset_flow(app: &mut App) -> Result<()> {
    app.worker_tx.send(WorkerCmd::CancelPoll).await?;
    app.session.reset_flow();
    app.progress = JobProgress::Idle;
    app.file_path.clear();
    app.quantity = 1;
    app.is_multi_part = false;
    app.added_to_cart = false;
    app.material_idx = 0;
    app.color_idx = 0;
    app.quality_idx = 0;
    app.ui.error = None;
    Ok(())
}
