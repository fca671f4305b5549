use std::{
    ffi::CStr,
    io::{self, Write},
    sync::{Arc, Mutex, MutexGuard, Weak},
    thread::{self, JoinHandle},
};

use config::SpinnerConfig;
use termion::{clear, color, cursor, style};

pub mod config;
pub mod error;
pub mod runner;

#[cfg(target_family = "windows")]
compile_error!("Not implemented on windows");

/// Output the spinner draws on.
pub struct Terminal {
    out: Box<dyn Write + Send>,
    /// Frames, colors and cursor movement are only written to a tty.
    is_tty: bool,
}

impl Terminal {
    /// The process stdout, animated only when it is a terminal.
    pub fn stdout() -> Self {
        let stdout = io::stdout();
        let is_tty = termion::is_tty(&stdout);
        Self::new(stdout, is_tty)
    }

    pub fn new<W: Write + Send + 'static>(out: W, is_tty: bool) -> Self {
        Self {
            out: Box::new(out),
            is_tty,
        }
    }
}

/// How the spinner ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Fail,
}

impl Status {
    fn prefix(self, is_tty: bool) -> String {
        let label = match self {
            Status::Success => "SUCCESS",
            Status::Fail => "ERROR",
        };
        if !is_tty {
            return label.to_owned();
        }
        let background = match self {
            Status::Success => color::Bg(color::Green).to_string(),
            Status::Fail => color::Bg(color::Red).to_string(),
        };
        format!(
            "{}{}{} {label} {}{}",
            style::Bold,
            background,
            color::Fg(color::Black),
            color::Bg(color::Reset),
            style::Reset,
        )
    }
}

/// Animated progress line.
/// This struct is shared with the animation thread, which redraws it
/// every `style.delay` until the spinner is stopped.
pub struct Spinner {
    is_running: bool,

    config: SpinnerConfig,

    terminal: Terminal,

    /// Number of frames drawn so far.
    tick: usize,

    pub animation_thread: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Starts the spinner. On a tty this hides the cursor and spawns the animation thread.
    pub fn start(
        config: SpinnerConfig,
        terminal: Terminal,
    ) -> Result<Arc<Mutex<Self>>, io::Error> {
        let animate = terminal.is_tty;
        let spinner = Arc::new(Mutex::new(Self {
            is_running: true,
            config,
            terminal,
            tick: 0,
            animation_thread: None,
        }));

        if animate {
            let mut guard = lock(&spinner)?;
            write!(guard.terminal.out, "{}", cursor::Hide)?;
            guard.animation_thread = Some(animation_thread(Arc::downgrade(&spinner)));
        }

        Ok(spinner)
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Stops the spinner and prints a success line.
    /// An empty message prints the spinner text instead.
    pub fn success(spinner: &Mutex<Self>, message: &str) -> Result<(), io::Error> {
        Self::finish(spinner, Some((Status::Success, message)))
    }

    /// Stops the spinner and prints an error line.
    /// An empty message prints the spinner text instead.
    pub fn fail(spinner: &Mutex<Self>, message: &str) -> Result<(), io::Error> {
        Self::finish(spinner, Some((Status::Fail, message)))
    }

    /// Stops the spinner without a result line.
    pub fn stop(spinner: &Mutex<Self>) -> Result<(), io::Error> {
        Self::finish(spinner, None)
    }

    /// Halts under the lock, then waits for the animation thread outside of it
    /// so a thread blocked on the lock can observe `is_running == false`.
    fn finish(spinner: &Mutex<Self>, result: Option<(Status, &str)>) -> Result<(), io::Error> {
        let mut guard = lock(spinner)?;
        let animation_thread = guard.animation_thread.take();
        guard.halt(result)?;
        drop(guard);
        if let Some(t) = animation_thread {
            t.join()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "Animation thread failed"))?;
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<(), io::Error> {
        let frame = self.config.style.frame(self.tick);
        self.tick = self.tick.wrapping_add(1);
        write!(
            self.terminal.out,
            "\r{}{}{}{} {}",
            clear::CurrentLine,
            color::Fg(color::LightCyan),
            frame,
            color::Fg(color::Reset),
            self.config.text,
        )?;
        self.terminal.out.flush()
    }

    fn halt(&mut self, result: Option<(Status, &str)>) -> Result<(), io::Error> {
        if !self.is_running {
            return Err(io::Error::new(io::ErrorKind::Other, "Not running"));
        }
        self.is_running = false;

        let is_tty = self.terminal.is_tty;
        let out = &mut self.terminal.out;
        if let Some((status, message)) = result {
            let message = if message.is_empty() {
                self.config.text.as_str()
            } else {
                message
            };
            if is_tty {
                write!(out, "\r{}", clear::CurrentLine)?;
            }
            write!(out, "{} {message}", status.prefix(is_tty))?;
        }

        if is_tty {
            if self.config.remove_when_done {
                write!(out, "\r{}", clear::CurrentLine)?;
            } else {
                writeln!(out)?;
            }
            write!(out, "{}", cursor::Show)?;
        } else if result.is_some() && !self.config.remove_when_done {
            writeln!(out)?;
        }
        out.flush()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if self.is_running {
            self.halt(None).ok();
        }
    }
}

fn lock(spinner: &Mutex<Spinner>) -> Result<MutexGuard<'_, Spinner>, io::Error> {
    spinner
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "Failed to aquire spinner lock"))
}

fn animation_thread(spinner: Weak<Mutex<Spinner>>) -> JoinHandle<()> {
    thread::spawn(move || loop {
        let delay = if let Some(spinner) = spinner.upgrade() {
            let Ok(mut guard) = spinner.lock() else {
                break;
            };
            if !guard.is_running || guard.draw().is_err() {
                break;
            }
            guard.config.style.delay
        } else {
            break;
        };
        thread::sleep(delay);
    })
}

/// Wrapper around libc::strsignal
pub(crate) fn signal_description(sig: i32) -> Option<String> {
    let result = unsafe { libc::strsignal(sig) };
    if result.is_null() {
        None
    } else {
        let string = unsafe { CStr::from_ptr(result) };
        Some(string.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::SpinnerStyle;

    /// Sink shared between the spinner and the test.
    #[derive(Clone, Default)]
    pub(crate) struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Sink that rejects every write, like stdout redirected to /dev/full.
    pub(crate) struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from_raw_os_error(libc::ENOSPC))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from_raw_os_error(libc::ENOSPC))
        }
    }

    #[test]
    fn unwritable_output_is_reported() {
        assert!(Spinner::start(SpinnerConfig::default(), Terminal::new(Broken, true)).is_err());

        let spinner =
            Spinner::start(SpinnerConfig::default(), Terminal::new(Broken, false)).unwrap();
        assert!(Spinner::success(&spinner, "done").is_err());
        assert!(!spinner.lock().unwrap().is_running());
    }

    #[test]
    fn plain_output_has_only_the_result_line() {
        let captured = Captured::default();
        let spinner = Spinner::start(
            SpinnerConfig::with_text("Running true"),
            Terminal::new(captured.clone(), false),
        )
        .unwrap();
        assert!(spinner.lock().unwrap().animation_thread.is_none());

        Spinner::success(&spinner, "true completed").unwrap();
        assert_eq!(captured.contents(), "SUCCESS true completed\n");
        assert!(!spinner.lock().unwrap().is_running());
    }

    #[test]
    fn empty_message_falls_back_to_text() {
        let captured = Captured::default();
        let spinner = Spinner::start(
            SpinnerConfig::with_text("Running false"),
            Terminal::new(captured.clone(), false),
        )
        .unwrap();

        Spinner::fail(&spinner, "").unwrap();
        assert_eq!(captured.contents(), "ERROR Running false\n");
    }

    #[test]
    fn tty_output_animates_and_restores_cursor() {
        let captured = Captured::default();
        let spinner = Spinner::start(
            SpinnerConfig {
                text: "Running sleep".to_owned(),
                style: SpinnerStyle::named("clock"),
                remove_when_done: false,
            },
            Terminal::new(captured.clone(), true),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(250));
        Spinner::fail(&spinner, "sleep failed: exit status 1").unwrap();

        let out = captured.contents();
        assert!(out.starts_with(&cursor::Hide.to_string()));
        assert!(out.contains("Running sleep"));
        assert!(out.contains('\\'));
        assert!(out.contains("ERROR"));
        assert!(out.contains("sleep failed: exit status 1"));
        assert!(out.ends_with(&format!("\n{}", cursor::Show)));
        assert!(spinner.lock().unwrap().animation_thread.is_none());
    }

    #[test]
    fn remove_when_done_clears_the_line() {
        let captured = Captured::default();
        let spinner = Spinner::start(
            SpinnerConfig {
                remove_when_done: true,
                ..SpinnerConfig::with_text("Running make")
            },
            Terminal::new(captured.clone(), true),
        )
        .unwrap();
        Spinner::stop(&spinner).unwrap();

        let out = captured.contents();
        assert!(out.ends_with(&format!("\r{}{}", clear::CurrentLine, cursor::Show)));
        assert!(!out.contains('\n'));
    }

    #[test]
    fn stopping_twice_is_an_error() {
        let spinner =
            Spinner::start(SpinnerConfig::default(), Terminal::new(io::sink(), false)).unwrap();
        Spinner::stop(&spinner).unwrap();
        let err = Spinner::success(&spinner, "done").unwrap_err();
        assert_eq!(err.to_string(), "Not running");
    }

    #[test]
    fn dropping_a_running_spinner_shows_the_cursor() {
        let captured = Captured::default();
        let spinner =
            Spinner::start(SpinnerConfig::default(), Terminal::new(captured.clone(), true))
                .unwrap();
        thread::sleep(Duration::from_millis(20));
        drop(spinner);
        thread::sleep(Duration::from_millis(150));
        assert!(captured.contents().ends_with(&cursor::Show.to_string()));
    }

    #[test]
    fn describes_signals() {
        let description = signal_description(libc::SIGKILL).unwrap();
        assert!(description.to_lowercase().contains("kill"));
    }
}
