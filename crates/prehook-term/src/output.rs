use std::{
    io::{self, Write},
    result::Result as StdResult,
    time::Duration,
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use indicatif::{ProgressBar, ProgressStyle};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use thiserror::Error;

/// Indentation level (in spaces) used for nested output sections.
const INDENT: usize = 4;

/// Maximum line width for wrapped warning and failure messages.
const WRAP_WIDTH: usize = 100;

/// ASCII control representation of `Ctrl+C`.
const CTRL_C: char = '\u{3}';
/// ASCII control representation of `Ctrl+D`.
const CTRL_D: char = '\u{4}';

/// Determine whether the combination of `code` and `modifiers` represents an
/// interactive cancellation such as `Ctrl+C`, `Ctrl+D`, or `Esc`.
fn is_cancel_key(code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Char(ch) => {
            if modifiers.contains(KeyModifiers::CONTROL)
                && matches!(ch.to_lowercase().next().unwrap_or(ch), 'c' | 'd')
            {
                return true;
            }

            matches!(ch, CTRL_C | CTRL_D)
        }
        KeyCode::Esc => true,
        _ => false,
    }
}

/// Errors produced by [`Output`] implementations when interacting with the user
/// or the terminal.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The requested operation is not supported by this output backend.
    #[error("{0}")]
    Unsupported(&'static str),

    /// A terminal/TTY related failure occurred.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Underlying I/O error while writing/reading to the terminal.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The user cancelled an interactive prompt.
    #[error("Prompt cancelled")]
    Cancelled,
}

/// Convenience alias for output-related fallible operations.
pub type Result<T> = StdResult<T, OutputError>;

/// Abstraction over how user-facing messages and prompts are produced.
///
/// Implementations can render to a terminal, suppress output, or emit to other
/// formats (e.g. files or JSON) in the future.
pub trait Output: Send + Sync {
    /// Print an informational message.
    fn message(&self, msg: &str) -> Result<()>;
    /// Print a success message.
    fn success(&self, msg: &str) -> Result<()>;
    /// Print a warning message.
    fn warn(&self, msg: &str) -> Result<()>;
    /// Print an error/failure message.
    fn fail(&self, msg: &str) -> Result<()>;
    /// Ask the user to confirm an action; returns `true` if confirmed.
    fn confirm(&self, prompt: &str) -> Result<bool>;
    /// Start a spinner labelled with `msg`; the spinner is inert for
    /// non-interactive backends.
    fn spinner(&self, msg: &str) -> Spinner;
    /// Flush any buffered output.
    fn finish(&self) -> Result<()>;
    /// Create a nested output section that indents subsequent messages.
    fn section(&self, header: &str) -> Box<dyn Output>;
}

/// Output implementation that suppresses all messages and rejects interactive
/// prompts. Useful for non-interactive or test environments.
pub struct Quiet;

impl Output for Quiet {
    fn message(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn success(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn warn(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn fail(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Err(OutputError::Unsupported(
            "Cannot prompt for confirmation in quiet mode",
        ))
    }

    fn spinner(&self, _msg: &str) -> Spinner {
        Spinner::hidden()
    }

    fn finish(&self) -> Result<()> {
        Ok(())
    }

    fn section(&self, _header: &str) -> Box<dyn Output> {
        Box::new(Self)
    }
}

/// Color-capable terminal renderer for user messages and prompts.
pub struct Terminal {
    /// Whether to emit ANSI color sequences when writing to stdout.
    color_choice: ColorChoice,
    /// Current indentation depth in spaces.
    indent: usize,
}

impl Terminal {
    /// Create a new terminal output.
    ///
    /// - `color`: when `true`, always render colored output; when `false`,
    ///   disable ANSI colors.
    pub fn new(color: bool) -> Self {
        let color_choice = if color {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        };
        Self {
            color_choice,
            indent: 0,
        }
    }

    /// Write `msg` using `color` while honoring the current indentation level.
    fn write_colored(&self, msg: &str, color: Color) -> Result<()> {
        let mut stdout = StandardStream::stdout(self.color_choice);
        stdout.set_color(ColorSpec::new().set_fg(Some(color)))?;
        writeln!(stdout, "{}{msg}", " ".repeat(self.indent))?;
        stdout.reset()?;
        stdout.flush()?;
        Ok(())
    }

    /// Wrap `msg` to the display width, indenting continuation lines to line
    /// up with the first.
    fn wrap(&self, msg: &str) -> String {
        let width = WRAP_WIDTH.saturating_sub(self.indent).max(20);
        let indent = " ".repeat(self.indent.min(8));
        let options = textwrap::Options::new(width).subsequent_indent(&indent);
        textwrap::fill(msg, options)
    }
}

impl Output for Terminal {
    fn message(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Cyan)
    }

    fn success(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Green)
    }

    fn warn(&self, msg: &str) -> Result<()> {
        self.write_colored(&self.wrap(msg), Color::Rgb(255, 165, 0)) // Orange
    }

    fn fail(&self, msg: &str) -> Result<()> {
        self.write_colored(&self.wrap(msg), Color::Red)
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        print!("{}{prompt} [y/n] ", " ".repeat(self.indent));
        io::stdout().flush()?;

        terminal::enable_raw_mode().map_err(|e| OutputError::Terminal(e.to_string()))?;

        let result = (|| -> Result<bool> {
            loop {
                if let Event::Key(KeyEvent {
                    code,
                    modifiers,
                    kind,
                    ..
                }) = event::read().map_err(|e| OutputError::Terminal(e.to_string()))?
                {
                    if kind != KeyEventKind::Press {
                        continue;
                    }

                    if is_cancel_key(code, modifiers) {
                        return Err(OutputError::Cancelled);
                    }

                    if let KeyCode::Char(ch) = code {
                        match ch.to_lowercase().next().unwrap_or(ch) {
                            'y' => return Ok(true),
                            'n' => return Ok(false),
                            _ => {}
                        }
                    }
                }
            }
        })();

        // Always restore terminal mode
        terminal::disable_raw_mode().map_err(|e| OutputError::Terminal(e.to_string()))?;

        match result {
            Ok(answer) => {
                println!("{}", if answer { "y" } else { "n" });
                Ok(answer)
            }
            Err(OutputError::Cancelled) => {
                println!();
                Err(OutputError::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    fn spinner(&self, msg: &str) -> Spinner {
        Spinner::visible(self.indent, msg)
    }

    fn finish(&self) -> Result<()> {
        io::stdout().flush()?;
        Ok(())
    }

    fn section(&self, header: &str) -> Box<dyn Output> {
        // Print the section header at current indent
        self.message(header)
            .expect("section header message should succeed");

        // Return a new Terminal with increased indent
        Box::new(Self {
            color_choice: self.color_choice,
            indent: self.indent + INDENT,
        })
    }
}

/// Animated progress indicator for long-running operations.
///
/// Created through [`Output::spinner`]; backends that do not render to a
/// terminal return an inert spinner so callers need not branch on quietness.
pub struct Spinner {
    /// The underlying indicatif progress bar (hidden for quiet backends).
    bar: ProgressBar,
}

impl Spinner {
    /// Tick interval for the spinner animation.
    const TICK: Duration = Duration::from_millis(100);

    /// Create a spinner rendering to stderr at the given indentation.
    fn visible(indent: usize, msg: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        let template = format!("{}{{spinner}} {{msg}}", " ".repeat(indent));
        if let Ok(style) = ProgressStyle::with_template(&template) {
            bar.set_style(style);
        }
        bar.set_message(msg.to_string());
        bar.enable_steady_tick(Self::TICK);
        Self { bar }
    }

    /// Create an inert spinner that renders nothing.
    fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Replace the spinner label.
    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    /// Stop the spinner and erase it from the terminal.
    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
