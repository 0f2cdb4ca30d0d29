use tracing::Level;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Installs a compact subscriber that also shows the store's debug events.
pub fn tracing_init() {
    let subscriber = tracing_subscriber::fmt()
        .with_file(false)
        .with_line_number(false)
        .with_thread_names(false)
        .with_thread_ids(true)
        .with_target(true)
        .with_max_level(Level::DEBUG)
        .with_timer(ElapsedTime::default())
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("a global tracing subscriber is already installed");
    }
}

/// Time since the demo started, so thunk delays are easy to read.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ElapsedTime {
    start: chrono::DateTime<chrono::offset::Local>,
}

impl Default for ElapsedTime {
    fn default() -> Self {
        Self {
            start: chrono::Local::now(),
        }
    }
}

impl FormatTime for ElapsedTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let elapsed = chrono::Local::now() - self.start;
        write!(w, "{:>6}ms", elapsed.num_milliseconds())
    }
}
