use std::time::Duration;

/// A named animation: the frames to cycle through and how long each stays on screen.
#[derive(Debug, PartialEq, Eq)]
pub struct SpinnerStyle {
    pub name: &'static str,
    pub sequence: &'static [&'static str],
    /// Delay between two frames.
    pub delay: Duration,
}

/// Style used when none is requested or the requested one is unknown.
pub const DEFAULT_STYLE: &str = "clock";

pub static DOTS: SpinnerStyle = SpinnerStyle {
    name: "dots",
    sequence: &[".", "..", "...", "...."],
    delay: Duration::from_millis(200),
};

pub static CLOCK: SpinnerStyle = SpinnerStyle {
    name: "clock",
    sequence: &["-", "\\", "|", "/"],
    delay: Duration::from_millis(100),
};

pub static BRACKETS: SpinnerStyle = SpinnerStyle {
    name: "brackets",
    sequence: &[
        "[    ]", "[=   ]", "[==  ]", "[=== ]", "[====]", "[ ===]", "[  ==]", "[   =]",
    ],
    delay: Duration::from_millis(80),
};

pub static ARROWS: SpinnerStyle = SpinnerStyle {
    name: "arrows",
    sequence: &["v", "<", "^", ">"],
    delay: Duration::from_millis(120),
};

/// Every predefined style.
pub static SPINNER_STYLES: [&SpinnerStyle; 4] = [&DOTS, &CLOCK, &BRACKETS, &ARROWS];

impl SpinnerStyle {
    /// Looks a style up by name. Unknown names get the clock style.
    pub fn named(name: &str) -> &'static SpinnerStyle {
        SPINNER_STYLES
            .iter()
            .copied()
            .find(|style| style.name == name)
            .unwrap_or(&CLOCK)
    }

    /// Frame shown on the given tick, wrapping around the sequence.
    pub fn frame(&self, tick: usize) -> &'static str {
        if self.sequence.is_empty() {
            ""
        } else {
            self.sequence[tick % self.sequence.len()]
        }
    }
}

/// Configuration for the spinner display
pub struct SpinnerConfig {
    /// Text drawn next to the animated frame. E.g. "Running make".
    pub text: String,
    /// Frames and delay of the animation.
    pub style: &'static SpinnerStyle,
    /// Clear the final line once the spinner stops.
    /// When false the last line (frame or result message) stays on screen.
    pub remove_when_done: bool,
}

impl SpinnerConfig {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            style: SpinnerStyle::named(DEFAULT_STYLE),
            remove_when_done: false,
        }
    }
}
