use std::io::{BufRead, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{self, Config, ConfigError};
use crate::dispatcher::{DispatchError, SearchDispatcher, SearchJob, SearchOutcome};
use crate::engine::{EngineEvent, LauncherEngine, Presenter, SearchExecutor, Snapshot};
use crate::index_service::{IndexService, MockIndex};
use crate::inline_answer::{self, InlineAnswer};
use crate::logging::{self, LoggingError};
use crate::model::{EntryKind, ResultEntry, SearchFilters};
use crate::os_integration::default_os_integration;
use crate::selection::Direction;

pub const USAGE: &str = "\
usage: quickfind-core [--config <path>] [--endpoint <host:port>] [--query <text>]
                      [--serve-mock <host:port>] [--help]

Interactive mode reads one line at a time: plain text is the query.
Commands: :down :up :select N :open :reveal :esc :ext a,b :files :dirs
          :case :regex :hidden :content :clear :help :quit";

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Usage(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub query: Option<String>,
    pub serve_mock: Option<String>,
    pub show_help: bool,
}

pub fn parse_cli_args(args: &[String]) -> Result<CliOptions, RuntimeError> {
    let mut options = CliOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| RuntimeError::Usage(format!("{flag} requires a value")))
        };
        match arg.as_str() {
            "--config" => options.config_path = Some(PathBuf::from(value("--config")?)),
            "--endpoint" => options.endpoint = Some(value("--endpoint")?),
            "--query" => options.query = Some(value("--query")?),
            "--serve-mock" => options.serve_mock = Some(value("--serve-mock")?),
            "-h" | "--help" => options.show_help = true,
            other => {
                return Err(RuntimeError::Usage(format!(
                    "unknown argument '{other}'\n{USAGE}"
                )))
            }
        }
    }
    Ok(options)
}

pub fn run_with_options(options: CliOptions) -> Result<(), RuntimeError> {
    if options.show_help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut config = config::load(options.config_path.as_deref())?;
    if options.endpoint.is_some() {
        config::apply_endpoint_override(&mut config, options.endpoint.clone());
        config::validate(&config)?;
    }
    if !config.config_path.exists() {
        config::save(&config)?;
        println!(
            "[quickfind-core] wrote default config to {}",
            config.config_path.display()
        );
    }
    let log_path = logging::init(&config)?;
    tracing::info!(
        config_path = %config.config_path.display(),
        log_path = %log_path.display(),
        endpoint = ?config.index_endpoint,
        "startup"
    );

    if let Some(address) = options.serve_mock {
        return serve_mock(&config, &address);
    }

    if let Some(query) = options.query {
        let mut stdout = std::io::stdout().lock();
        return run_one_shot(&config, &query, &mut stdout);
    }

    run_interactive(&config)
}

fn serve_mock(config: &Config, address: &str) -> Result<(), RuntimeError> {
    let listener = TcpListener::bind(address)?;
    let local = listener.local_addr()?;
    println!("[quickfind-core] serving mock index on {local}");
    tracing::info!(%local, "serving mock index");
    let service: Arc<dyn IndexService> =
        Arc::new(MockIndex::default().with_max_results(config.max_results));
    crate::transport::serve(listener, service)?;
    Ok(())
}

/// Answers a single query without the event loop.
pub fn run_one_shot(
    config: &Config,
    query: &str,
    out: &mut dyn Write,
) -> Result<(), RuntimeError> {
    if let InlineAnswer::Calculator(value) = inline_answer::evaluate(query) {
        writeln!(out, "= {value}")?;
        return Ok(());
    }

    let mut dispatcher = SearchDispatcher::from_config(config);
    match dispatcher.dispatch(query, &SearchFilters::default()) {
        Ok(results) if results.is_empty() => match inline_answer::resolve_url_shortcut(query) {
            Some(url) => writeln!(out, "-> {url}")?,
            None => writeln!(out, "No matches for '{}'.", query.trim())?,
        },
        Ok(results) => {
            for (index, entry) in results.iter().enumerate() {
                writeln!(out, "{}", render_row(index, entry, false))?;
            }
        }
        Err(DispatchError::BackendNotReady) => {
            writeln!(out, "Index service is still initializing.")?;
        }
        Err(DispatchError::SearchFailed(message)) => {
            writeln!(out, "Search error: {message}")?;
        }
    }
    Ok(())
}

#[derive(Debug)]
enum LoopMessage {
    Line(String),
    Engine(EngineEvent),
    InputClosed,
}

fn run_interactive(config: &Config) -> Result<(), RuntimeError> {
    let (sender, receiver) = mpsc::channel::<LoopMessage>();

    let dispatcher = SearchDispatcher::from_config(config);
    println!(
        "[quickfind-core] mode={} ready={} (:help for commands)",
        dispatcher.mode().label(),
        dispatcher.is_ready()
    );
    if !dispatcher.is_ready() {
        spawn_readiness_watcher(
            dispatcher.service(),
            config.ready_poll_interval(),
            sender.clone(),
        );
    }
    spawn_stdin_reader(sender.clone());

    let mut engine = LauncherEngine::new(
        dispatcher,
        Box::new(ThreadExecutor {
            sender: sender.clone(),
        }),
        Box::new(ConsolePresenter::default()),
        default_os_integration(),
    )
    .with_debounce(config.debounce());
    drop(sender);

    loop {
        let message = match engine.next_deadline() {
            Some(deadline) => {
                match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => {
                        engine.handle(Instant::now(), EngineEvent::Tick);
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match receiver.recv() {
                Ok(message) => message,
                Err(_) => break,
            },
        };

        match message {
            LoopMessage::Engine(event) => engine.handle(Instant::now(), event),
            LoopMessage::Line(line) => match parse_input_line(&line, engine.filters()) {
                InputCommand::Event(event) => engine.handle(Instant::now(), event),
                InputCommand::Help => println!("{USAGE}"),
                InputCommand::Quit => break,
                InputCommand::Unknown(command) => {
                    println!("unknown command '{command}' (:help for commands)");
                }
            },
            LoopMessage::InputClosed => break,
        }
    }

    tracing::info!("interactive session ended");
    Ok(())
}

/// Runs each job on its own thread and posts the outcome back to the loop.
struct ThreadExecutor {
    sender: Sender<LoopMessage>,
}

impl SearchExecutor for ThreadExecutor {
    fn submit(&mut self, job: SearchJob, service: Arc<dyn IndexService>) -> Option<SearchOutcome> {
        let sender = self.sender.clone();
        std::thread::spawn(move || {
            let outcome = job.run(service.as_ref());
            let _ = sender.send(LoopMessage::Engine(EngineEvent::SearchCompleted(outcome)));
        });
        None
    }
}

/// Polls until the service first reports ready, then sends a single
/// `BackendReady`.
fn spawn_readiness_watcher(
    service: Arc<dyn IndexService>,
    interval: Duration,
    sender: Sender<LoopMessage>,
) {
    std::thread::spawn(move || loop {
        std::thread::sleep(interval);
        if service.check_ready() {
            tracing::info!("readiness watcher saw index service ready");
            let _ = sender.send(LoopMessage::Engine(EngineEvent::BackendReady));
            return;
        }
    });
}

fn spawn_stdin_reader(sender: Sender<LoopMessage>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if sender.send(LoopMessage::Line(line)).is_err() {
                return;
            }
        }
        let _ = sender.send(LoopMessage::InputClosed);
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Event(EngineEvent),
    Help,
    Quit,
    Unknown(String),
}

/// Turns one console line into an engine event. Filter toggles start from
/// `filters`, the engine's current set.
pub fn parse_input_line(line: &str, filters: &SearchFilters) -> InputCommand {
    let Some(command) = line.trim_start().strip_prefix(':') else {
        return InputCommand::Event(EngineEvent::QueryChanged(line.to_string()));
    };

    let (name, argument) = match command.trim().split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (command.trim(), ""),
    };
    let mut next = filters.clone();
    let event = match name {
        "q" | "quit" => return InputCommand::Quit,
        "help" => return InputCommand::Help,
        "down" => EngineEvent::MoveSelection(Direction::Down),
        "up" => EngineEvent::MoveSelection(Direction::Up),
        "open" => EngineEvent::Submit { reveal: false },
        "reveal" => EngineEvent::Submit { reveal: true },
        "esc" => EngineEvent::Escape,
        "select" => match argument.parse::<usize>() {
            Ok(row) if row >= 1 => EngineEvent::Hover(row - 1),
            _ => return InputCommand::Unknown(line.trim().to_string()),
        },
        "ext" => {
            next.file_types = argument
                .split(',')
                .map(|value| value.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|value| !value.is_empty())
                .collect();
            EngineEvent::FiltersChanged(next)
        }
        "files" => {
            next.files_only = !next.files_only;
            next.directories_only &= !next.files_only;
            EngineEvent::FiltersChanged(next)
        }
        "dirs" => {
            next.directories_only = !next.directories_only;
            next.files_only &= !next.directories_only;
            EngineEvent::FiltersChanged(next)
        }
        "case" => {
            next.case_sensitive = !next.case_sensitive;
            EngineEvent::FiltersChanged(next)
        }
        "regex" => {
            next.use_regex = !next.use_regex;
            EngineEvent::FiltersChanged(next)
        }
        "hidden" => {
            next.include_hidden = !next.include_hidden;
            EngineEvent::FiltersChanged(next)
        }
        "content" => {
            next.search_content = !next.search_content;
            EngineEvent::FiltersChanged(next)
        }
        "clear" => EngineEvent::FiltersChanged(SearchFilters::default()),
        _ => return InputCommand::Unknown(line.trim().to_string()),
    };
    InputCommand::Event(event)
}

/// Prints a frame only when something visible changed.
#[derive(Default)]
struct ConsolePresenter {
    last: Option<Snapshot>,
}

impl Presenter for ConsolePresenter {
    fn present(&mut self, snapshot: &Snapshot) {
        let changed = self.last.as_ref().map_or(true, |last| {
            last.results != snapshot.results
                || last.selected != snapshot.selected
                || last.inline_answer != snapshot.inline_answer
                || last.loading != snapshot.loading
                || last.backend_ready != snapshot.backend_ready
        });
        if changed || snapshot.notice.is_some() {
            let mut stdout = std::io::stdout().lock();
            for line in render_snapshot(snapshot) {
                let _ = writeln!(stdout, "{line}");
            }
        }
        self.last = Some(snapshot.clone());
    }
}

pub fn render_snapshot(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(notice) = &snapshot.notice {
        lines.push(format!("! {notice}"));
    }
    if let Some(value) = snapshot.inline_answer.calculator_value() {
        lines.push(format!("= {value}  (:open copies)"));
        return lines;
    }
    if snapshot.loading {
        lines.push("searching...".to_string());
    }
    if !snapshot.backend_ready && !snapshot.query.trim().is_empty() {
        lines.push("index service is initializing".to_string());
    }
    for (index, entry) in snapshot.visible_results().iter().enumerate() {
        lines.push(render_row(index, entry, snapshot.selected == Some(index)));
    }
    lines
}

fn render_row(index: usize, entry: &ResultEntry, selected: bool) -> String {
    let marker = if selected { '>' } else { ' ' };
    let detail = match entry.kind {
        EntryKind::File => format!("{} bytes", entry.size),
        EntryKind::Folder | EntryKind::Url => entry.kind.as_str().to_string(),
    };
    format!(
        "{marker} {:>2}. {}  {}  ({detail})",
        index + 1,
        entry.name,
        entry.path
    )
}

#[cfg(test)]
mod tests {
    use super::{
        parse_cli_args, parse_input_line, render_snapshot, run_one_shot, InputCommand,
        RuntimeError,
    };
    use crate::config::Config;
    use crate::engine::{EngineEvent, Snapshot};
    use crate::inline_answer::InlineAnswer;
    use crate::model::{ResultEntry, SearchFilters};
    use crate::selection::Direction;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn cli_parses_known_flags() {
        let options =
            parse_cli_args(&args(&["--endpoint", "127.0.0.1:7878", "--query", "report"])).unwrap();
        assert_eq!(options.endpoint.as_deref(), Some("127.0.0.1:7878"));
        assert_eq!(options.query.as_deref(), Some("report"));
        assert!(!options.show_help);
    }

    #[test]
    fn cli_rejects_missing_values_and_unknown_flags() {
        assert!(matches!(
            parse_cli_args(&args(&["--config"])),
            Err(RuntimeError::Usage(_))
        ));
        assert!(matches!(
            parse_cli_args(&args(&["--bogus"])),
            Err(RuntimeError::Usage(_))
        ));
    }

    #[test]
    fn plain_lines_are_queries_and_commands_map_to_events() {
        let filters = SearchFilters::default();
        assert_eq!(
            parse_input_line("annual report", &filters),
            InputCommand::Event(EngineEvent::QueryChanged("annual report".into()))
        );
        assert_eq!(
            parse_input_line(":down", &filters),
            InputCommand::Event(EngineEvent::MoveSelection(Direction::Down))
        );
        assert_eq!(
            parse_input_line(":select 3", &filters),
            InputCommand::Event(EngineEvent::Hover(2))
        );
        assert!(matches!(
            parse_input_line(":select 0", &filters),
            InputCommand::Unknown(_)
        ));
        assert_eq!(parse_input_line(":quit", &filters), InputCommand::Quit);
    }

    #[test]
    fn filter_commands_toggle_from_current_filters() {
        let filters = SearchFilters {
            files_only: true,
            ..Default::default()
        };

        match parse_input_line(":dirs", &filters) {
            InputCommand::Event(EngineEvent::FiltersChanged(next)) => {
                assert!(next.directories_only);
                assert!(!next.files_only);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        match parse_input_line(":ext .PDF, docx,", &filters) {
            InputCommand::Event(EngineEvent::FiltersChanged(next)) => {
                assert_eq!(next.file_types, vec!["pdf".to_string(), "docx".to_string()]);
                assert!(next.files_only);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rendering_marks_selection_and_prefers_calculator() {
        let mut snapshot = Snapshot {
            query: "exa".into(),
            backend_ready: true,
            results: vec![
                ResultEntry::url("https://example.com"),
                ResultEntry::url("https://example.org"),
            ],
            selected: Some(1),
            ..Default::default()
        };
        let lines = render_snapshot(&snapshot);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with(">  2."));

        snapshot.inline_answer = InlineAnswer::Calculator("6".into());
        assert_eq!(render_snapshot(&snapshot), vec!["= 6  (:open copies)".to_string()]);
    }

    fn one_shot(query: &str) -> String {
        let config = Config {
            index_endpoint: None,
            ..Config::default()
        };
        let mut out = Vec::new();
        run_one_shot(&config, query, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn one_shot_prints_calculator_results_and_url_fallback() {
        assert_eq!(one_shot("1200 * 3 + 0.5"), "= 3,600.5\n");
        assert!(one_shot("video").contains("video.mp4"));
        assert_eq!(one_shot("example.com"), "-> https://example.com\n");
        assert_eq!(one_shot("zzz"), "No matches for 'zzz'.\n");
    }
}
