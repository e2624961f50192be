//! Interactive retry prompts and progress display
//!
//! Uses the dialoguer crate for confirmation prompts when the `dialoguer`
//! feature is enabled and falls back to plain stdio otherwise. Answers are fed
//! to the [`KeyboardMonitor`] so a re-run reports the key that triggered it.

use crate::host::KeyboardMonitor;
use crate::speedtest::{SpeedTestPhase, SpeedTestState};
use crate::{AppError, Result};
use std::io::{self, BufRead, Write};

/// What the user chose after a failed flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryChoice {
    Retry,
    GiveUp,
}

/// Interactive prompt manager
#[derive(Debug, Clone)]
pub struct RetryPrompt {
    /// Whether to use colored output
    use_colors: bool,
    /// Whether to use enhanced interactive features (dialoguer)
    use_enhanced: bool,
    keyboard: KeyboardMonitor,
}

impl RetryPrompt {
    pub fn new(use_colors: bool, keyboard: KeyboardMonitor) -> Self {
        Self {
            use_colors,
            use_enhanced: cfg!(feature = "dialoguer"),
            keyboard,
        }
    }

    /// Show the failure message and ask whether to run the flow again
    pub fn confirm_retry(&self, flow: &str, message: &str) -> Result<RetryChoice> {
        self.display_error(message);

        let choice = if self.use_enhanced {
            self.get_enhanced_choice(flow)?
        } else {
            let stdin = io::stdin();
            self.get_basic_choice(flow, &mut stdin.lock())?
        };

        let key = match choice {
            RetryChoice::Retry => "y",
            RetryChoice::GiveUp => "n",
        };
        self.keyboard.record_key(key, false);

        Ok(choice)
    }

    #[cfg(feature = "dialoguer")]
    fn get_enhanced_choice(&self, flow: &str) -> Result<RetryChoice> {
        use dialoguer::Confirm;

        let retry = Confirm::new()
            .with_prompt(format!("Retry {}?", flow))
            .default(true)
            .interact()
            .map_err(|e| AppError::io(format!("Prompt failed: {}", e)))?;

        Ok(if retry { RetryChoice::Retry } else { RetryChoice::GiveUp })
    }

    #[cfg(not(feature = "dialoguer"))]
    fn get_enhanced_choice(&self, flow: &str) -> Result<RetryChoice> {
        let stdin = io::stdin();
        self.get_basic_choice(flow, &mut stdin.lock())
    }

    /// Ask on stderr and read answers from `input` until one parses
    fn get_basic_choice<R: BufRead>(&self, flow: &str, input: &mut R) -> Result<RetryChoice> {
        loop {
            let prompt = format!("Retry {}? [Y/n] ", flow);
            if self.use_colors {
                use colored::Colorize;
                eprint!("{}", prompt.bold());
            } else {
                eprint!("{}", prompt);
            }
            io::stderr()
                .flush()
                .map_err(|e| AppError::io(format!("Failed to flush stderr: {}", e)))?;

            let mut line = String::new();
            let read = input
                .read_line(&mut line)
                .map_err(|e| AppError::io(format!("Failed to read input: {}", e)))?;

            // End of input counts as declining
            if read == 0 {
                eprintln!();
                return Ok(RetryChoice::GiveUp);
            }

            match parse_answer(&line) {
                Some(choice) => return Ok(choice),
                None => self.display_error(&format!("Invalid input '{}'. Please answer y or n.", line.trim())),
            }
        }
    }

    /// Render one speed test state change as a progress line
    pub fn display_progress(&self, state: &SpeedTestState) {
        let phase = match state.phase {
            SpeedTestPhase::Idle | SpeedTestPhase::Complete => return,
            SpeedTestPhase::Latency => "Measuring latency",
            SpeedTestPhase::Download => "Measuring download",
            SpeedTestPhase::Upload => "Measuring upload",
        };

        if self.use_colors {
            use colored::Colorize;
            eprintln!("{} {}... {:>3}%", "[PROGRESS]".cyan().bold(), phase, state.progress);
        } else {
            eprintln!("[PROGRESS] {}... {:>3}%", phase, state.progress);
        }
    }

    pub fn display_error(&self, message: &str) {
        if self.use_colors {
            use colored::Colorize;
            eprintln!("{} {}", "[ERROR]".red().bold(), message);
        } else {
            eprintln!("[ERROR] {}", message);
        }
    }
}

fn parse_answer(line: &str) -> Option<RetryChoice> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "y" | "yes" | "r" | "retry" => Some(RetryChoice::Retry),
        "n" | "no" | "q" | "quit" => Some(RetryChoice::GiveUp),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompt() -> RetryPrompt {
        RetryPrompt::new(false, KeyboardMonitor::new())
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("\n"), Some(RetryChoice::Retry));
        assert_eq!(parse_answer(" Yes \n"), Some(RetryChoice::Retry));
        assert_eq!(parse_answer("N"), Some(RetryChoice::GiveUp));
        assert_eq!(parse_answer("quit"), Some(RetryChoice::GiveUp));
        assert_eq!(parse_answer("maybe"), None);
    }

    #[test]
    fn test_basic_choice_skips_invalid_input() {
        let mut input = Cursor::new("what\nn\n");
        let choice = prompt().get_basic_choice("device probe", &mut input).unwrap();
        assert_eq!(choice, RetryChoice::GiveUp);
    }

    #[test]
    fn test_basic_choice_eof_gives_up() {
        let mut input = Cursor::new("");
        let choice = prompt().get_basic_choice("speed test", &mut input).unwrap();
        assert_eq!(choice, RetryChoice::GiveUp);
    }
}
