use gallery_engine::{EventKind, ProgressEvent, ProgressSink};

/// Prints one line per download event. Errors always go to stderr; the other
/// lines are dropped in quiet mode.
pub struct ConsoleProgress {
    quiet: bool,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: ProgressEvent) {
        let line = format_event(&event);
        if event.kind == EventKind::Error {
            eprintln!("{line}");
        } else if !self.quiet {
            println!("{line}");
        }
    }
}

pub fn format_event(event: &ProgressEvent) -> String {
    let count = if event.total_files > 0 {
        format!("({}/{}) ", event.file_index, event.total_files)
    } else {
        String::new()
    };
    let message = match event.kind {
        EventKind::Start => format!("download starting: '{}'", event.url),
        EventKind::Finished => format!("  finished downloading {} bytes", event.bytes_written),
        EventKind::NotSaved => format!("  not saving file of {} bytes", event.bytes_written),
        EventKind::Error => match &event.error {
            Some(err) => format!("error: {err}"),
            None => format!("error: download of '{}' failed", event.url),
        },
    };
    let wait = if event.wait_ms > 0 {
        format!(" and wait for {}ms", event.wait_ms)
    } else {
        String::new()
    };
    format!("{count}{message}{wait}")
}
