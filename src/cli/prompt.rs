//! Terminal-backed [`Operator`].

use crate::error::{CliError, Result};
use crate::operator::{GateChoice, Operator};
use std::io::{BufRead, Write};

/// Asks the questions on stdout and reads answers from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalOperator;

impl TerminalOperator {
    /// Create a terminal operator
    pub fn new() -> Self {
        Self
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        print!("{}", prompt);
        std::io::stdout().flush()?;

        let mut input = String::new();
        let read = std::io::stdin().lock().read_line(&mut input)?;
        if read == 0 {
            return Err(CliError::Cancelled {
                reason: "end of input".to_string(),
            }
            .into());
        }
        Ok(input.trim().to_string())
    }
}

fn parse_gate(answer: &str, offer_diff: bool) -> Option<GateChoice> {
    match answer.to_lowercase().as_str() {
        "p" | "publish" => Some(GateChoice::Publish),
        "f" | "fail" => Some(GateChoice::Fail),
        "d" | "diff" if offer_diff => Some(GateChoice::Diff),
        _ => None,
    }
}

impl Operator for TerminalOperator {
    fn choose_version(&self, current: &str, suggested: Option<&str>) -> Result<String> {
        loop {
            let prompt = match suggested {
                Some(s) => format!("Version number for new release (currently {}) [{}]: ", current, s),
                None => format!("Version number for new release (currently {}): ", current),
            };
            let answer = self.ask(&prompt)?;
            match (answer.is_empty(), suggested) {
                (false, _) => return Ok(answer),
                (true, Some(s)) => return Ok(s.to_string()),
                (true, None) => println!("A version number is required."),
            }
        }
    }

    fn choose_gate(&self, version: &str, offer_diff: bool) -> Result<GateChoice> {
        println!("\nPlease check candidate {} and select an action:", version);
        println!("P) Publish candidate (accept)");
        println!("F) Fail candidate (discard the release)");
        if offer_diff {
            println!("D) Diff against the previous release archive");
        }
        loop {
            let options = if offer_diff { "[P/F/D]" } else { "[P/F]" };
            let answer = self.ask(&format!("{}: ", options))?;
            if let Some(choice) = parse_gate(&answer, offer_diff) {
                return Ok(choice);
            }
            println!("Please answer one of {}", options);
        }
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{} [y/N]: ", question))?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gate_answers() {
        assert_eq!(parse_gate("P", false), Some(GateChoice::Publish));
        assert_eq!(parse_gate("fail", false), Some(GateChoice::Fail));
        assert_eq!(parse_gate("d", true), Some(GateChoice::Diff));
        assert_eq!(parse_gate("d", false), None);
        assert_eq!(parse_gate("", true), None);
    }
}
