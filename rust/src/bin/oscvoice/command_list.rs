//! `--list-commands` output.

use std::io::{self, Write};

use oscvoice::command::Command;

fn mode_label(command: &Command) -> &'static str {
    if command.in_sentence {
        "in-sentence"
    } else {
        "exact"
    }
}

fn state_label(command: &Command) -> &'static str {
    if command.enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// One line per command, in registration order.
pub(crate) fn write_command_list<W: Write>(commands: &[Command], out: &mut W) -> io::Result<()> {
    if commands.is_empty() {
        writeln!(out, "no commands loaded")?;
        return Ok(());
    }
    let width = commands
        .iter()
        .map(|command| command.phrase.chars().count())
        .max()
        .unwrap_or(0);
    for command in commands {
        let count = command.actions.len();
        let noun = if count == 1 { "action" } else { "actions" };
        writeln!(
            out,
            "{phrase:<width$}  [{scope}] {mode} {state} {count} {noun}",
            phrase = command.phrase,
            scope = command.scope,
            mode = mode_label(command),
            state = state_label(command),
        )?;
    }
    Ok(())
}
