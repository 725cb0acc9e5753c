use crate::error::{CliError, Result};
use crate::ui::UiEvent;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, MakeWriter},
    prelude::*,
};

/// Console log sink that prints through the UI task so lines land above progress bars.
#[derive(Clone)]
pub struct UiLogWriter {
    sender: mpsc::Sender<UiEvent>,
}

impl UiLogWriter {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }
}

impl io::Write for UiLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let line = text.trim_end_matches('\n');
        if !line.is_empty() && self.sender.try_send(UiEvent::Log(line.to_string())).is_err() {
            // UI task gone or saturated.
            eprintln!("{}", line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for UiLogWriter {
    type Writer = UiLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub fn setup_logging(
    verbosity: u8,
    quiet: bool,
    log_file: Option<PathBuf>,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<()> {
    let level_filter = level_filter(verbosity, quiet);

    let console_layer = fmt::layer()
        .with_writer(UiLogWriter::new(ui_sender))
        .with_ansi(true)
        .with_target(false)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(level_filter)
        .with(console_layer);

    if let Some(path) = log_file {
        let file = File::create(&path).map_err(CliError::Io)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true);

        subscriber.with(file_layer).init();
    } else {
        subscriber.init();
    }

    Ok(())
}

fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use std::sync::Once;
    use std::thread;
    use std::time::Duration;
    use tracing::{debug, error, info, trace, warn};

    static INIT: Once = Once::new();

    fn ensure_global_logger_is_set() {
        INIT.call_once(|| {
            let (sender, _receiver) = mpsc::channel(16);
            setup_logging(3, false, None, sender).expect("Failed to set up global logger for tests");
        });
    }

    #[test]
    #[serial]
    fn initialization_and_macros_work() {
        ensure_global_logger_is_set();

        error!("This is an error");
        warn!("This is a warning");
        info!("This is info");
        debug!("This is debug");
        trace!("This is trace");
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_filter(0, false), LevelFilter::WARN);
        assert_eq!(level_filter(1, false), LevelFilter::INFO);
        assert_eq!(level_filter(2, false), LevelFilter::DEBUG);
        assert_eq!(level_filter(9, false), LevelFilter::TRACE);
        assert_eq!(level_filter(3, true), LevelFilter::ERROR);
    }

    #[test]
    fn ui_writer_forwards_lines_to_the_ui_channel() {
        let (sender, mut receiver) = mpsc::channel(4);
        let mut writer = UiLogWriter::new(sender);

        writer.write_all(b"stage heat started\n").unwrap();

        match receiver.try_recv().unwrap() {
            UiEvent::Log(line) => assert_eq!(line, "stage heat started"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn file_logging_can_be_added_to_global_logger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let file = File::create(log_path.clone()).unwrap();
        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true);
        let subscriber = tracing_subscriber::registry().with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            debug!("Message for file-only test.");
        });

        thread::sleep(Duration::from_millis(100));

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Message for file-only test."));
        assert!(content.contains("DEBUG"));
        assert!(content.contains("ThreadId"));
    }

    #[test]
    #[serial]
    fn invalid_log_file_path_propagates_error() {
        let invalid_path = PathBuf::from("/");

        if cfg!(unix) && invalid_path.is_dir() {
            let (sender, _receiver) = mpsc::channel(1);
            let result = setup_logging(0, false, Some(invalid_path), sender);
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}
