//! Built-in line-oriented script engine.
//!
//! Interprets a small command language, one statement per line:
//!
//! ```text
//! speak "hello there"
//! think "I should gather wood"
//! walk 120 80
//! craft axe
//! equip axe
//! use_tool
//! drop wood 2
//! pick_up wood
//! wait 3
//! loop 4
//!   use_tool
//! end
//! ```
//!
//! The cancellation token is checked between statements.

use crate::engine::{ScriptEngine, ScriptOutcome};
use crate::error::ScriptError;
use crate::host::{ScriptBindings, ScriptHost};
use crate::token::CancellationToken;
use meadow_protocol::{Point, ScriptToRun};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Speak(String),
    Think(String),
    Walk(f64, f64),
    Craft(String),
    Equip(String),
    Drop(String, Option<u32>),
    UseTool,
    PickUp(String),
    Wait(u32),
    Loop(u32, Vec<Statement>),
}

/// Default engine and the reference vehicle for cancellation semantics.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineScriptEngine;

impl ScriptEngine for LineScriptEngine {
    fn run(
        &self,
        script: &ScriptToRun,
        bindings: &ScriptBindings,
        host: Arc<dyn ScriptHost>,
        token: Arc<CancellationToken>,
    ) -> ScriptOutcome {
        let statements = match parse(&script.source) {
            Ok(statements) => statements,
            Err(message) => return ScriptOutcome::Failed(message),
        };
        match execute_block(&statements, bindings, host.as_ref(), &token) {
            Ok(()) => ScriptOutcome::Completed,
            Err(ScriptError::Cancelled) | Err(ScriptError::Interrupted) => ScriptOutcome::Cancelled,
            Err(ScriptError::Runtime(message)) => ScriptOutcome::Failed(message),
        }
    }
}

fn execute_block(
    statements: &[Statement],
    bindings: &ScriptBindings,
    host: &dyn ScriptHost,
    token: &CancellationToken,
) -> Result<(), ScriptError> {
    for statement in statements {
        if token.is_forced() {
            return Err(ScriptError::Interrupted);
        }
        if token.is_stop_requested() {
            return Err(ScriptError::Cancelled);
        }
        match statement {
            Statement::Speak(message) => host.speak(message)?,
            Statement::Think(thought) => host.record_thought(thought)?,
            Statement::Walk(x, y) => host.walk_to(Point { x: *x, y: *y })?,
            Statement::Craft(key) => host.craft_item(key)?,
            Statement::Equip(key) => host.equip_item(key)?,
            Statement::Drop(key, amount) => host.drop_item(key, *amount)?,
            Statement::UseTool => host.use_equipped_tool()?,
            Statement::PickUp(key) => {
                let target = bindings.nearest_item(key).ok_or_else(|| {
                    ScriptError::Runtime(format!("no observed item to pick up (config_key={key})"))
                })?;
                host.pick_up(target.entity_id)?;
            }
            Statement::Wait(ticks) => host.wait_ticks(*ticks)?,
            Statement::Loop(count, body) => {
                for _ in 0..*count {
                    execute_block(body, bindings, host, token)?;
                }
            }
        }
    }
    Ok(())
}

fn parse(source: &str) -> Result<Vec<Statement>, String> {
    let mut lines = source
        .lines()
        .enumerate()
        .map(|(number, line)| (number + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));
    let statements = parse_block(&mut lines, false)?;
    Ok(statements)
}

fn parse_block<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    inside_loop: bool,
) -> Result<Vec<Statement>, String> {
    let mut statements = Vec::new();
    while let Some((number, line)) = lines.next() {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        let statement = match command {
            "end" if inside_loop => return Ok(statements),
            "end" => return Err(format!("line {number}: 'end' without 'loop'")),
            "speak" => Statement::Speak(unquote(rest)),
            "think" => Statement::Think(unquote(rest)),
            "walk" => {
                let mut parts = rest.split_whitespace();
                let x = parse_number(parts.next(), number, "walk")?;
                let y = parse_number(parts.next(), number, "walk")?;
                Statement::Walk(x, y)
            }
            "craft" => Statement::Craft(required_key(rest, number, "craft")?),
            "equip" => Statement::Equip(required_key(rest, number, "equip")?),
            "drop" => {
                let mut parts = rest.split_whitespace();
                let key = required_key(parts.next().unwrap_or(""), number, "drop")?;
                let amount = match parts.next() {
                    Some(raw) => Some(
                        raw.parse::<u32>()
                            .map_err(|_| format!("line {number}: bad drop amount '{raw}'"))?,
                    ),
                    None => None,
                };
                Statement::Drop(key, amount)
            }
            "use_tool" => Statement::UseTool,
            "pick_up" => Statement::PickUp(required_key(rest, number, "pick_up")?),
            "wait" => {
                let ticks = rest
                    .parse::<u32>()
                    .map_err(|_| format!("line {number}: bad wait tick count '{rest}'"))?;
                Statement::Wait(ticks)
            }
            "loop" => {
                let count = rest
                    .parse::<u32>()
                    .map_err(|_| format!("line {number}: bad loop count '{rest}'"))?;
                Statement::Loop(count, parse_block(lines, true)?)
            }
            other => return Err(format!("line {number}: unknown command '{other}'")),
        };
        statements.push(statement);
    }
    if inside_loop {
        return Err("unterminated 'loop' block".to_string());
    }
    Ok(statements)
}

fn required_key(rest: &str, number: usize, command: &str) -> Result<String, String> {
    if rest.is_empty() {
        return Err(format!("line {number}: '{command}' needs an item key"));
    }
    Ok(rest.to_string())
}

fn parse_number(raw: Option<&str>, number: usize, command: &str) -> Result<f64, String> {
    raw.and_then(|raw| raw.parse::<f64>().ok())
        .ok_or_else(|| format!("line {number}: '{command}' needs numeric coordinates"))
}

fn unquote(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('"')
        .trim_end_matches('"')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::LineScriptEngine;
    use crate::engine::{ScriptEngine, ScriptOutcome};
    use crate::error::ScriptError;
    use crate::host::{ScriptBindings, ScriptHost};
    use crate::token::CancellationToken;
    use meadow_protocol::{EntityId, Point, ScriptToRun};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingHost {
        fn record(&self, call: impl Into<String>) -> Result<(), ScriptError> {
            self.calls.lock().push(call.into());
            Ok(())
        }
    }

    impl ScriptHost for RecordingHost {
        fn speak(&self, message: &str) -> Result<(), ScriptError> {
            self.record(format!("speak {message}"))
        }
        fn record_thought(&self, thought: &str) -> Result<(), ScriptError> {
            self.record(format!("think {thought}"))
        }
        fn set_facial_expression(&self, emoji: &str) -> Result<(), ScriptError> {
            self.record(format!("express {emoji}"))
        }
        fn walk_to(&self, target: Point) -> Result<(), ScriptError> {
            self.record(format!("walk {} {}", target.x, target.y))
        }
        fn craft_item(&self, config_key: &str) -> Result<(), ScriptError> {
            self.record(format!("craft {config_key}"))
        }
        fn equip_item(&self, config_key: &str) -> Result<(), ScriptError> {
            self.record(format!("equip {config_key}"))
        }
        fn drop_item(&self, config_key: &str, amount: Option<u32>) -> Result<(), ScriptError> {
            self.record(format!("drop {config_key} {amount:?}"))
        }
        fn use_equipped_tool(&self) -> Result<(), ScriptError> {
            self.record("use_tool")
        }
        fn pick_up(&self, target_id: EntityId) -> Result<(), ScriptError> {
            self.record(format!("pick_up {target_id}"))
        }
        fn wait_ticks(&self, ticks: u32) -> Result<(), ScriptError> {
            self.record(format!("wait {ticks}"))
        }
    }

    fn run_source(source: &str, host: &Arc<RecordingHost>) -> ScriptOutcome {
        let engine = LineScriptEngine;
        engine.run(
            &ScriptToRun {
                script_id: Uuid::new_v4(),
                source: source.to_string(),
            },
            &ScriptBindings::default(),
            host.clone() as Arc<dyn ScriptHost>,
            Arc::new(CancellationToken::new()),
        )
    }

    #[test]
    fn executes_statements_in_order() {
        let host = Arc::new(RecordingHost::default());
        let outcome = run_source(
            "speak \"hi\"\nwalk 10 20\nloop 2\n  use_tool\nend\ncraft axe\n",
            &host,
        );
        assert_eq!(outcome, ScriptOutcome::Completed);
        assert_eq!(
            *host.calls.lock(),
            vec![
                "speak hi".to_string(),
                "walk 10 20".to_string(),
                "use_tool".to_string(),
                "use_tool".to_string(),
                "craft axe".to_string(),
            ]
        );
    }

    #[test]
    fn unknown_command_fails_with_line_number() {
        let host = Arc::new(RecordingHost::default());
        let outcome = run_source("speak \"hi\"\nfly 10 20\n", &host);
        match outcome {
            ScriptOutcome::Failed(message) => {
                assert_eq!(message.contains("line 2"), true);
                assert_eq!(message.contains("fly"), true);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn stop_request_cancels_between_statements() {
        let engine = LineScriptEngine;
        let host = Arc::new(RecordingHost::default());
        let token = Arc::new(CancellationToken::new());
        token.request_stop();

        let outcome = engine.run(
            &ScriptToRun {
                script_id: Uuid::new_v4(),
                source: "speak \"never\"".to_string(),
            },
            &ScriptBindings::default(),
            host.clone() as Arc<dyn ScriptHost>,
            token,
        );
        assert_eq!(outcome, ScriptOutcome::Cancelled);
        assert_eq!(host.calls.lock().is_empty(), true);
    }

    #[test]
    fn pick_up_without_observed_item_fails() {
        let host = Arc::new(RecordingHost::default());
        let outcome = run_source("pick_up wood\n", &host);
        match outcome {
            ScriptOutcome::Failed(message) => {
                assert_eq!(message.contains("wood"), true)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
