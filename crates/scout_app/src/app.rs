use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::Context;
use chrono::{FixedOffset, Local, Utc};
use log::LevelFilter;
use scout_core::{update, AppState, CampusEvent, Msg};
use scout_engine::{quick_add_link, GenerativeNormalizer, ReqwestSourceFetcher, ScanPipeline};
use scout_logging::{scout_info, scout_warn};

use crate::commands::{parse_command, Command, CommandError, HELP};
use crate::config::{ConfigError, ScoutConfig};
use crate::effects::{to_calendar_entry, EffectRunner};
use crate::logging::{self, LogDestination};
use crate::render;
use crate::Cli;

/// Everything the main loop reacts to.
#[derive(Debug)]
pub enum AppInput {
    Core(Msg),
    Line(String),
    InputClosed,
}

impl From<Msg> for AppInput {
    fn from(msg: Msg) -> Self {
        AppInput::Core(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::initialize(LogDestination::from_option(cli.log_file.clone()), level);

    let config = ScoutConfig::load(cli.config.as_deref())?;
    let offset = *Local::now().offset();
    let pipeline = build_pipeline(&config)?;

    let (input_tx, input_rx) = mpsc::channel::<AppInput>();
    let runner = EffectRunner::new(
        pipeline,
        config.tick_period(),
        cli.export_dir.clone(),
        input_tx.clone(),
    )
    .context("failed to start scan engine")?;
    spawn_stdin_reader(input_tx).context("failed to start console reader")?;

    let state = AppState::with_config(config.schedule_config(offset));
    let mut app = App::new(state, runner, offset, io::stdout());
    app.start(cli.api_key, cli.auto)?;

    while let Ok(input) = input_rx.recv() {
        if app.handle_input(input)? == Flow::Quit {
            break;
        }
    }
    scout_info!("Shutting down");
    Ok(())
}

pub fn build_pipeline(config: &ScoutConfig) -> Result<ScanPipeline, ConfigError> {
    let fetcher = ReqwestSourceFetcher::new(config.fetch_settings(), config.forwarding_paths());
    let normalizer = GenerativeNormalizer::new(config.normalizer_settings()?);
    Ok(ScanPipeline::new(
        config.source_query(),
        Arc::new(fetcher),
        Arc::new(normalizer),
    ))
}

fn spawn_stdin_reader(tx: mpsc::Sender<AppInput>) -> io::Result<()> {
    thread::Builder::new()
        .name("scout-console".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(AppInput::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        scout_warn!("Console read failed: {}", err);
                        break;
                    }
                }
            }
            let _ = tx.send(AppInput::InputClosed);
        })?;
    Ok(())
}

/// Console front end: owns the core state, runs effects, prints changes.
pub struct App<W: Write> {
    state: AppState,
    runner: EffectRunner,
    offset: FixedOffset,
    out: W,
    last_printed_log: Option<u64>,
}

impl<W: Write> App<W> {
    pub fn new(state: AppState, runner: EffectRunner, offset: FixedOffset, out: W) -> Self {
        Self {
            state,
            runner,
            offset,
            out,
            last_printed_log: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn start(&mut self, api_key: Option<String>, auto: bool) -> io::Result<()> {
        writeln!(self.out, "FoodScout ready. Type 'help' for commands.")?;
        if self.runner.set_credential(api_key) {
            self.dispatch(Msg::CredentialChanged { present: true })?;
        } else {
            writeln!(self.out, "No API key set; use 'key <token>' before scanning.")?;
        }
        if auto {
            self.dispatch(Msg::AutoCheckToggled {
                enabled: true,
                now: Utc::now(),
            })?;
        }
        Ok(())
    }

    pub fn handle_input(&mut self, input: AppInput) -> io::Result<Flow> {
        match input {
            AppInput::Core(msg) => {
                self.dispatch(msg)?;
                Ok(Flow::Continue)
            }
            AppInput::Line(line) => self.handle_line(&line),
            AppInput::InputClosed if self.state.schedule().auto_enabled => {
                scout_info!("Console closed; continuing with weekly auto-check");
                Ok(Flow::Continue)
            }
            AppInput::InputClosed => Ok(Flow::Quit),
        }
    }

    pub fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        match parse_command(line) {
            Ok(command) => self.handle_command(command),
            Err(CommandError::Empty) => Ok(Flow::Continue),
            Err(err) => {
                writeln!(self.out, "{err}")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> io::Result<Flow> {
        let now = Utc::now();
        match command {
            Command::Scan => self.dispatch(Msg::ScanClicked { now })?,
            Command::Auto(enabled) => self.dispatch(Msg::AutoCheckToggled { enabled, now })?,
            Command::Status => {
                let line = render::status_line(&self.state.view(), self.offset);
                writeln!(self.out, "{line}")?;
            }
            Command::List => {
                for line in render::event_lines(&self.state.view(), self.offset) {
                    writeln!(self.out, "{line}")?;
                }
            }
            Command::Log => {
                for line in render::log_lines(&self.state.view()) {
                    writeln!(self.out, "{line}")?;
                }
            }
            Command::Select(number) => match self.event_at(number).map(|event| event.id) {
                Some(id) => self.dispatch(Msg::EventToggled(id))?,
                None => writeln!(self.out, "No event #{number}.")?,
            },
            Command::SelectAll => self.dispatch(Msg::SelectAllClicked)?,
            Command::Clear => self.dispatch(Msg::SelectionCleared)?,
            Command::Export(path) => self.dispatch(Msg::ExportRequested { path, now })?,
            Command::Link(number) => match self.event_at(number) {
                Some(event) => {
                    let link = quick_add_link(&to_calendar_entry(event));
                    writeln!(self.out, "{link}")?;
                }
                None => writeln!(self.out, "No event #{number}.")?,
            },
            Command::Key(token) => {
                let present = self.runner.set_credential(token);
                writeln!(
                    self.out,
                    "{}",
                    if present { "API key set." } else { "API key cleared." }
                )?;
                self.dispatch(Msg::CredentialChanged { present })?;
            }
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn event_at(&self, number: usize) -> Option<&CampusEvent> {
        self.state.store().events().get(number.checked_sub(1)?)
    }

    /// Feed a message through `update`, run its effects and any synchronous follow-ups.
    pub fn dispatch(&mut self, msg: Msg) -> io::Result<()> {
        let mut pending = VecDeque::from([msg]);
        while let Some(msg) = pending.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            pending.extend(self.runner.enqueue(effects, Utc::now()));
        }
        if self.state.consume_dirty() {
            self.print_new_log_entries()?;
        }
        Ok(())
    }

    fn print_new_log_entries(&mut self) -> io::Result<()> {
        let last = self.last_printed_log;
        let fresh: Vec<String> = self
            .state
            .log()
            .entries()
            .filter(|entry| last.is_none_or(|seen| entry.id > seen))
            .map(render::log_line)
            .collect();
        // Entries are newest first.
        for line in fresh.iter().rev() {
            writeln!(self.out, "{line}")?;
        }
        if let Some(latest) = self.state.log().latest() {
            self.last_printed_log = Some(latest.id);
        }
        Ok(())
    }
}
