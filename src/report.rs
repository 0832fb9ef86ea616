use crate::model::{CheckResult, Status};
use colored::Colorize;
use dialoguer::console::Term;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
const DEFAULT_WIDTH: usize = 80;
const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Info,
    Progress,
}

impl From<Status> for Outcome {
    fn from(status: Status) -> Self {
        match status {
            Status::Pass => Outcome::Success,
            Status::Fail | Status::Unknown => Outcome::Failure,
            Status::Info => Outcome::Info,
        }
    }
}

/// Styles `message` for the given outcome. Progress lines carry no symbol.
pub fn paint(outcome: Outcome, message: &str) -> String {
    match outcome {
        Outcome::Success => format!("[+] {}", message).bright_green().bold().to_string(),
        Outcome::Failure => format!("[-] {}", message).bright_red().bold().to_string(),
        Outcome::Info => format!("[i] {}", message).bright_cyan().bold().to_string(),
        Outcome::Progress => message.bright_blue().bold().to_string(),
    }
}

fn terminal_width() -> usize {
    Term::stdout().size_checked().map(|(_, cols)| cols as usize).filter(|c| *c > 0).unwrap_or(DEFAULT_WIDTH)
}

struct Spinner {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Live "in progress" line for a blocking check, replaced by its outcome.
///
/// `begin` spawns a drawing thread that redraws `[<frame>] <message>` every
/// tick until `finish` raises the stop flag and joins it. Nothing is written
/// by the thread after `finish` returns.
pub struct StatusReporter<W: Write + Send + 'static> {
    out: Arc<Mutex<W>>,
    width: usize,
    tick: Duration,
    spinner: Option<Spinner>,
}

impl StatusReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), terminal_width())
    }
}

impl<W: Write + Send + 'static> StatusReporter<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self { out: Arc::new(Mutex::new(out)), width, tick: TICK, spinner: None }
    }

    #[cfg(test)]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.spinner.is_some()
    }

    pub fn begin(&mut self, message: &str) {
        self.halt();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let out = Arc::clone(&self.out);
        let tick = self.tick;
        let message = message.to_string();
        let handle = thread::spawn(move || {
            for frame in FRAMES.iter().cycle() {
                if flag.load(Ordering::Acquire) {
                    break;
                }
                if let Ok(mut out) = out.lock() {
                    let line = paint(Outcome::Progress, &format!("[{}] {}", frame, message));
                    let _ = write!(out, "\r{}", line);
                    let _ = out.flush();
                }
                thread::sleep(tick);
            }
        });
        self.spinner = Some(Spinner { stop, handle });
    }

    pub fn finish(&mut self, message: &str, passed: bool) {
        self.finish_with(message, if passed { Outcome::Success } else { Outcome::Failure });
    }

    /// Stops the spinner (if any), clears the line and prints `message`.
    pub fn finish_with(&mut self, message: &str, outcome: Outcome) {
        self.halt();
        if let Ok(mut out) = self.out.lock() {
            let _ = write!(out, "\r{}", " ".repeat(self.width));
            let _ = writeln!(out, "\r{}", paint(outcome, message));
            let _ = out.flush();
        }
    }

    pub fn report(&mut self, result: &CheckResult) {
        self.finish_with(&result.detail, result.status.into());
    }

    /// A standalone line that never had a spinner.
    pub fn info(&mut self, message: &str) {
        self.finish_with(message, Outcome::Info);
    }

    fn halt(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop.store(true, Ordering::Release);
            let _ = spinner.handle.join();
        }
    }
}

impl<W: Write + Send + 'static> Drop for StatusReporter<W> {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Cloneable in-memory sink so tests can read what the reporter wrote.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> { Ok(()) }
    }

    fn reporter(buf: &SharedBuf) -> StatusReporter<SharedBuf> {
        StatusReporter::new(buf.clone(), 20).with_tick(Duration::from_millis(5))
    }

    fn after_last_clear(out: &str, width: usize) -> String {
        let clear = format!("\r{}\r", " ".repeat(width));
        out.rsplit(&clear).next().unwrap().to_string()
    }

    #[test]
    fn finish_prints_exactly_one_symbol_after_clearing() {
        let buf = SharedBuf::default();
        let mut r = reporter(&buf);
        r.begin("Checking Server Side Encryption...");
        thread::sleep(Duration::from_millis(20));
        r.finish("Server Side Encryption configured.", true);

        let out = buf.contents();
        assert!(out.contains("Checking Server Side Encryption..."));
        assert!(out.contains(&format!("\r{}\r", " ".repeat(20))));
        let tail = after_last_clear(&out, 20);
        assert!(tail.contains("[+] Server Side Encryption configured."));
        assert!(!tail.contains("[-]"));
        assert!(!tail.contains("Checking"));
        assert!(tail.ends_with('\n'));
    }

    #[test]
    fn failure_uses_failure_symbol() {
        let buf = SharedBuf::default();
        let mut r = reporter(&buf);
        r.begin("Checking Audit Logging...");
        r.finish("Audit Logging not configured.", false);
        let tail = after_last_clear(&buf.contents(), 20);
        assert!(tail.contains("[-] Audit Logging not configured."));
        assert!(!tail.contains("[+]"));
    }

    #[test]
    fn finish_without_begin_just_prints() {
        let buf = SharedBuf::default();
        let mut r = reporter(&buf);
        r.finish("Bucket Found!", true);
        assert!(!r.is_active());
        assert!(buf.contents().contains("[+] Bucket Found!"));
    }

    #[test]
    fn spinner_stops_writing_after_finish() {
        let buf = SharedBuf::default();
        let mut r = reporter(&buf);
        r.begin("Validating Bucket...");
        thread::sleep(Duration::from_millis(15));
        r.finish("Bucket Found!", true);
        let len = buf.contents().len();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(buf.contents().len(), len);
        assert!(!r.is_active());
    }

    #[test]
    fn spinner_cycles_frames() {
        let buf = SharedBuf::default();
        let mut r = reporter(&buf);
        r.begin("Checking Bucket ACL...");
        thread::sleep(Duration::from_millis(40));
        r.finish("Bucket ACLs configured properly.", true);
        let out = buf.contents();
        assert!(out.contains("[|] Checking Bucket ACL..."));
        assert!(out.contains("[/] Checking Bucket ACL..."));
    }

    #[test]
    fn status_maps_to_outcome() {
        assert_eq!(Outcome::from(Status::Unknown), Outcome::Failure);
        assert_eq!(Outcome::from(Status::Info), Outcome::Info);
        assert!(paint(Outcome::Info, "x").contains("[i] x"));
    }
}
