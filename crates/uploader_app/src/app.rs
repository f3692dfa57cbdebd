use std::io::{self, BufRead};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use uploader_core::{update, AppState, Effect, Msg, Notice, Route};
use uploader_engine::{
    AtomicFileWriter, Authorizer, DriveSheetExporter, EngineEvent, EngineHandle, EventSink,
    ReqwestBackend, Services, StaticAuthorizer,
};
use uploader_logging::{set_active_view, upl_debug, upl_info};

use crate::authorizer::{CodeSlot, ConsentAuthorizer};
use crate::commands::{self, Command, HELP};
use crate::config::AppConfig;
use crate::effects::{event_to_msg, EffectRunner};
use crate::render;

enum Input {
    Line(String),
    Engine(EngineEvent<Effect>),
    Tick,
    Closed,
}

struct InputSink(mpsc::Sender<Input>);

impl EventSink<Effect> for InputSink {
    fn emit(&self, event: EngineEvent<Effect>) {
        let _ = self.0.send(Input::Engine(event));
    }
}

pub fn run(config: AppConfig, start: Route) -> anyhow::Result<()> {
    let (input_tx, input_rx) = mpsc::channel::<Input>();
    let slot = CodeSlot::default();
    let services = build_services(&config, slot.clone())?;
    let engine = EngineHandle::start(services, Arc::new(InputSink(input_tx.clone())))
        .context("starting engine runtime")?;

    spawn_stdin_reader(input_tx.clone());
    spawn_ticker(input_tx);

    let mut app = App::new(
        AppState::with_poll_settings(config.poll_settings()),
        EffectRunner::new(engine),
    );
    app.dispatch(Msg::Navigate(start));

    while let Ok(input) = input_rx.recv() {
        match input {
            Input::Line(line) => match commands::parse(&line, app.state.route()) {
                Ok(None) => {}
                Ok(Some(Command::Dispatch(msg))) => app.dispatch(msg),
                Ok(Some(Command::AuthorizationCode(code))) => {
                    if !slot.is_waiting() || !slot.deliver(code) {
                        println!("no authorization is waiting for a code");
                    }
                }
                Ok(Some(Command::Help)) => println!("{HELP}"),
                Ok(Some(Command::Quit)) => break,
                Err(err) => println!("{err}"),
            },
            Input::Engine(event) => app.dispatch(event_to_msg(event)),
            Input::Tick => app.dispatch(Msg::Tick),
            Input::Closed => break,
        }
    }
    upl_info!("leaving");
    Ok(())
}

fn build_services(config: &AppConfig, slot: CodeSlot) -> anyhow::Result<Services> {
    let backend = ReqwestBackend::new(config.client_settings())
        .with_context(|| format!("backend url {:?}", config.backend_url))?;
    let sheets = DriveSheetExporter::new(config.drive_settings())
        .with_context(|| format!("drive api url {:?}", config.drive_api))?;
    let authorizer: Arc<dyn Authorizer> =
        match (&config.authorization_code, &config.oauth_client_id) {
            (Some(code), _) => Arc::new(StaticAuthorizer::new(Some(code.clone()))),
            (None, Some(client_id)) => Arc::new(
                ConsentAuthorizer::new(client_id, &config.oauth_redirect_uri, slot)
                    .context("building consent url")?
                    .with_wait(Duration::from_secs(config.authorization_wait_secs)),
            ),
            (None, None) => Arc::new(StaticAuthorizer::new(None)),
        };
    Ok(Services {
        backend: Arc::new(backend),
        sheets: Arc::new(sheets),
        authorizer,
        downloads: AtomicFileWriter::new(config.download_dir.clone()),
    })
}

fn spawn_stdin_reader(tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(Input::Line(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(Input::Closed);
    });
}

// Coalesces rendering of bursts of completions.
fn spawn_ticker(tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        let interval = Duration::from_millis(150);
        while tx.send(Input::Tick).is_ok() {
            thread::sleep(interval);
        }
    });
}

struct App {
    state: AppState,
    runner: EffectRunner,
    notice: Option<Notice>,
}

impl App {
    fn new(state: AppState, runner: EffectRunner) -> Self {
        Self {
            state,
            runner,
            notice: None,
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let render_now = matches!(msg, Msg::Tick);
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = step(state, msg);

        for notice in self.runner.run(effects) {
            if let Some(shown) = &notice {
                if self.notice.as_ref() != Some(shown) {
                    println!("{}", render::notice_line(shown));
                }
            }
            self.notice = notice;
        }

        if render_now && state.consume_dirty() {
            print!("{}", render::render(&state.view()));
        }
        self.state = state;
    }
}

/// Folds `msg` into `state` with the logging view tag naming the view that
/// handles it, then the view that results.
fn step(state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    set_active_view(state.view_id());
    if !matches!(msg, Msg::Tick) {
        upl_debug!("dispatch {msg:?}");
    }
    let (state, effects) = update(state, msg);
    set_active_view(state.view_id());
    (state, effects)
}
