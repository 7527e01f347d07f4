mod app;
mod config;
mod error;
mod layout;
mod logging;
mod names;
mod render;
mod rotation;
mod scene;
mod ui;

use std::io::{self, BufWriter, Write};
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::{
    cursor, execute, terminal,
    event::{self, Event},
};
use log::{info, warn};

use app::AtomApp;
use error::AtomError;
use layout::SHELLS;
use render::{Canvas, ColorMode, RenderMode};
use ui::{Action, Form, NAMES_ROWS};

#[derive(Parser)]
#[command(name = "orbitals", about = "Terminal atom model with orbiting, nameable electrons")]
struct Cli {
    /// Render mode
    #[arg(short, long, value_enum)]
    render: Option<RenderMode>,

    /// Color mode
    #[arg(short, long, value_enum)]
    color: Option<ColorMode>,

    /// Confirm this electron count (1-28) at startup
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Hide the status bar
    #[arg(long)]
    clean: bool,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    /// Print the config file path and a default config, then exit
    #[arg(long)]
    show_config: bool,
}

/// Redraw rate of the UI. Electron motion is driven separately by the rotation worker.
const UI_FPS: f64 = 30.0;
/// Form lines under the canvas, followed by the message line.
const FORM_ROWS: usize = 2;
/// Rows under the canvas: form, message line, then the confirmed names block.
const PANEL_ROWS: usize = FORM_ROWS + 1 + NAMES_ROWS;
const RENDER_MODES: [RenderMode; 3] = [RenderMode::Braille, RenderMode::HalfBlock, RenderMode::Ascii];
const COLOR_MODES: [ColorMode; 4] = [ColorMode::TrueColor, ColorMode::Ansi256, ColorMode::Ansi16, ColorMode::Mono];

/// Display settings after merging CLI over config over defaults.
struct Settings {
    render_mode: RenderMode,
    color_mode: ColorMode,
    color_quant: u8,
    hide_status: bool,
    initial_count: Option<u32>,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        match config::config_path() {
            Some(path) => println!("# Config file: {}", path.display()),
            None => println!("# Config file: <no config directory on this platform>"),
        }
        print!("{}", config::default_config_string());
        return Ok(());
    }

    let cfg = config::load_config();
    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.log_level.clone())
        .unwrap_or_else(|| logging::default_log_level().to_string());
    match cfg.log_dir.clone().or_else(config::default_log_dir) {
        Some(dir) => {
            if let Err(e) = logging::init_logging(&level, &dir) {
                eprintln!("Warning: logging disabled: {e}");
            }
        }
        None => eprintln!("Warning: logging disabled: no data directory"),
    }

    let settings = Settings {
        render_mode: cli.render.or(cfg.render.map(Into::into)).unwrap_or(RenderMode::Braille),
        color_mode: cli.color.or(cfg.color.map(Into::into)).unwrap_or(ColorMode::TrueColor),
        color_quant: cfg.color_quant.unwrap_or(0),
        hide_status: cli.clean || cfg.clean.unwrap_or(false),
        initial_count: cli.count,
    };

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;

    let mut writer = BufWriter::with_capacity(256 * 1024, stdout);
    let mut app = AtomApp::new(&SHELLS);
    let result = run_loop(&mut writer, &mut app, settings);
    app.shutdown();

    // Cleanup
    execute!(writer, cursor::Show, terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;

    info!("event=app_exit module=main status={}", if result.is_ok() { "ok" } else { "error" });
    result
}

fn canvas_rows(rows: u16, hide_status: bool) -> usize {
    let reserved = PANEL_ROWS + if hide_status { 0 } else { 1 };
    (rows as usize).saturating_sub(reserved).max(1)
}

fn run_loop(
    stdout: &mut BufWriter<io::Stdout>,
    app: &mut AtomApp,
    settings: Settings,
) -> io::Result<()> {
    let (mut cols, mut rows) = terminal::size()?;
    let Settings {
        mut render_mode,
        mut color_mode,
        color_quant,
        mut hide_status,
        initial_count,
    } = settings;

    let new_canvas = |cols: u16, rows: u16, render: RenderMode, color: ColorMode, hide: bool| {
        let mut c = Canvas::new(cols as usize, canvas_rows(rows, hide), render, color);
        c.color_quant = color_quant;
        c
    };
    let mut canvas = new_canvas(cols, rows, render_mode, color_mode, hide_status);

    let mut form = Form::new(&initial_count.unwrap_or(1).to_string());
    let mut modal: Option<AtomError> = None;
    if initial_count.is_some() {
        match app.confirm_count(form.count_input()) {
            Ok(count) => form.set_name_fields(count),
            Err(e) => modal = Some(e),
        }
    }

    let frame_dur = Duration::from_secs_f64(1.0 / UI_FPS);
    let mut frame_count: u64 = 0;
    let mut actual_fps: f64 = 0.0;
    let mut fps_update = Instant::now();
    let mut rebuild_canvas = false;

    loop {
        let frame_start = Instant::now();

        // Handle input (non-blocking)
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Resize(w, h) => {
                    if w >= 10 && h as usize > PANEL_ROWS + 1 {
                        cols = w;
                        rows = h;
                        rebuild_canvas = true;
                    }
                }
                Event::Key(key) => {
                    // A pending error acts as a modal dialog: the next key only dismisses it.
                    if modal.take().is_some() {
                        continue;
                    }
                    match form.handle_key(key) {
                        Action::None => {}
                        Action::Quit => return Ok(()),
                        Action::ConfirmCount(raw) => match app.confirm_count(&raw) {
                            Ok(count) => form.set_name_fields(count),
                            Err(e) => {
                                warn!("event=count_rejected module=main status=invalid input={raw:?}");
                                modal = Some(e);
                            }
                        },
                        Action::ConfirmNames(names) => {
                            if let Err(e) = app.confirm_names(&names) {
                                modal = Some(e);
                            }
                        }
                        Action::CycleRender => {
                            let idx = RENDER_MODES.iter().position(|&m| m == render_mode).unwrap_or(0);
                            render_mode = RENDER_MODES[(idx + 1) % RENDER_MODES.len()];
                            rebuild_canvas = true;
                        }
                        Action::CycleColor => {
                            let idx = COLOR_MODES.iter().position(|&m| m == color_mode).unwrap_or(0);
                            color_mode = COLOR_MODES[(idx + 1) % COLOR_MODES.len()];
                            rebuild_canvas = true;
                        }
                        Action::ToggleStatus => {
                            hide_status = !hide_status;
                            rebuild_canvas = true;
                        }
                    }
                }
                _ => {}
            }
        }

        if rebuild_canvas {
            // Re-read size to get the settled value
            let (settled_cols, settled_rows) = terminal::size()?;
            if settled_cols >= 10 && settled_rows as usize > PANEL_ROWS + 1 {
                cols = settled_cols;
                rows = settled_rows;
            }
            canvas = new_canvas(cols, rows, render_mode, color_mode, hide_status);
            write!(stdout, "\x1b[2J\x1b[H")?;
            stdout.flush()?;
            rebuild_canvas = false;
        }

        app.scene().lock().paint(&mut canvas);
        let frame = canvas.render();

        stdout.write_all(b"\x1b[H")?;
        stdout.write_all(frame.as_bytes())?;

        let width = cols as usize;
        let panel_top = canvas.term_size().1 + 1;
        let form_lines = form.panel_lines(width);
        for row in 0..FORM_ROWS {
            write!(stdout, "\x1b[{};1H\x1b[2K", panel_top + row)?;
            if let Some(line) = form_lines.get(row) {
                write!(stdout, "{}", line)?;
            }
        }
        let message_row = panel_top + FORM_ROWS;
        write!(stdout, "\x1b[{};1H\x1b[2K", message_row)?;
        if let Some(err) = &modal {
            let text = format!(" {}: {}  [any key] ", err.title(), err);
            let text: String = text.chars().take(width).collect();
            write!(stdout, "\x1b[1;37;41m{}\x1b[0m", text)?;
        }
        let names = ui::names_panel(&app.names().summary(), width, NAMES_ROWS);
        for row in 0..NAMES_ROWS {
            write!(stdout, "\x1b[{};1H\x1b[2K", message_row + 1 + row)?;
            if let Some(line) = names.get(row) {
                write!(stdout, "{}", line)?;
            }
        }

        frame_count += 1;
        if fps_update.elapsed() >= Duration::from_secs(1) {
            actual_fps = frame_count as f64 / fps_update.elapsed().as_secs_f64();
            frame_count = 0;
            fps_update = Instant::now();
        }
        if !hide_status {
            let occupancy = app
                .occupancy()
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join("/");
            let status = format!(
                " orbitals | {} electrons ({}) | names {} | {:?} | {:?} | {:?} | {:.0} fps | [F2] render  [F3] color  [F4] status  [Esc] quit ",
                app.electron_count(),
                occupancy,
                if app.names().is_confirmed() { "confirmed" } else { "pending" },
                app.driver_state(),
                render_mode,
                color_mode,
                actual_fps,
            );
            let truncated: String = status.chars().take(width).collect();
            let padded = format!("{:<width$}", truncated, width = width);
            write!(stdout, "\x1b[{};1H\x1b[7m{}\x1b[0m", rows, padded)?;
        }

        // Single flush per frame
        stdout.flush()?;

        let elapsed = frame_start.elapsed();
        if elapsed < frame_dur {
            std::thread::sleep(frame_dur - elapsed);
        }
    }
}
