//! An [`Exec`] answering from a script, for driving chains and relayers in tests.

use std::cell::{Cell, RefCell};

use crate::error::DriverError;
use crate::exec::{Exec, ExecOutput};

struct Rule {
    patterns: Vec<String>,
    response: Result<String, String>,
    once: bool,
}

/// Answers commands by the first rule whose patterns all occur in the
/// command line. `status` reports a height that grows by one per call.
#[derive(Default)]
pub struct ScriptedExec {
    rules: RefCell<Vec<Rule>>,
    height: Cell<u64>,
    calls: RefCell<Vec<(String, Option<Vec<u8>>)>>,
}

impl ScriptedExec {
    pub fn new() -> Self {
        Self::default().with_height(1)
    }

    pub fn with_height(self, height: u64) -> Self {
        self.height.set(height);
        self
    }

    fn rule(self, patterns: &[&str], response: Result<String, String>, once: bool) -> Self {
        self.rules.borrow_mut().push(Rule {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            response,
            once,
        });
        self
    }

    /// Answers matching commands with `stdout`.
    pub fn on(self, patterns: &[&str], stdout: &str) -> Self {
        self.rule(patterns, Ok(stdout.to_string()), false)
    }

    /// Fails matching commands with `stderr`.
    pub fn fail_on(self, patterns: &[&str], stderr: &str) -> Self {
        self.rule(patterns, Err(stderr.to_string()), false)
    }

    /// Fails the next matching command with `stderr`, then steps aside.
    pub fn fail_once(self, patterns: &[&str], stderr: &str) -> Self {
        self.rule(patterns, Err(stderr.to_string()), true)
    }

    /// Appends the rules of `other` after those of `self`.
    pub fn merge(self, other: ScriptedExec) -> Self {
        self.rules.borrow_mut().extend(other.rules.into_inner());
        self
    }

    /// Every command run so far, space separated.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(c, _)| c.clone()).collect()
    }

    /// Whether a command containing `pattern` was run.
    pub fn ran(&self, pattern: &str) -> bool {
        self.calls.borrow().iter().any(|(c, _)| c.contains(pattern))
    }

    /// Stdin given to the last command containing `pattern`.
    pub fn stdin_of(&self, pattern: &str) -> Option<Vec<u8>> {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find(|(c, _)| c.contains(pattern))
            .and_then(|(_, stdin)| stdin.clone())
    }
}

impl Exec for ScriptedExec {
    fn exec(&self, args: &[String], stdin: Option<&[u8]>) -> Result<ExecOutput, DriverError> {
        let command = args.join(" ");
        self.calls
            .borrow_mut()
            .push((command.clone(), stdin.map(<[u8]>::to_vec)));

        if args.get(1).map(String::as_str) == Some("status") {
            let height = self.height.get();
            self.height.set(height + 1);
            return Ok(ExecOutput {
                stdout: format!(r#"{{"sync_info":{{"latest_block_height":"{height}"}}}}"#)
                    .into_bytes(),
                stderr: vec![],
            });
        }

        let mut rules = self.rules.borrow_mut();
        let position = rules
            .iter()
            .position(|rule| rule.patterns.iter().all(|p| command.contains(p.as_str())));

        let Some(position) = position else {
            return Err(DriverError::Command {
                command,
                status: "exit status: 1".to_string(),
                stderr: "unscripted command".to_string(),
            });
        };

        let response = if rules[position].once {
            rules.remove(position).response
        } else {
            rules[position].response.clone()
        };

        match response {
            Ok(stdout) => Ok(ExecOutput {
                stdout: stdout.into_bytes(),
                stderr: vec![],
            }),
            Err(stderr) => Err(DriverError::Command {
                command,
                status: "exit status: 1".to_string(),
                stderr,
            }),
        }
    }
}
