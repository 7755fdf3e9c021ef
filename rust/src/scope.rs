//! Scope filtering against the currently loaded context.

use crate::command::Command;

/// Commands visible under `current_context`: every global command plus those
/// scoped to exactly that context, in registry order.
pub fn visible<'a>(commands: &'a [Command], current_context: Option<&str>) -> Vec<&'a Command> {
    commands
        .iter()
        .filter(|command| command.scope.is_visible_in(current_context))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Scope;
    use rstest::rstest;

    fn fixture() -> Vec<Command> {
        vec![
            Command::new("everywhere"),
            Command::new("first avatar").scoped(Scope::Context("ctx1".to_string())),
            Command::new("second avatar").scoped(Scope::Context("ctx2".to_string())),
            Command::new("also everywhere").enabled(false),
        ]
    }

    #[rstest]
    #[case(None, &["everywhere", "also everywhere"])]
    #[case(Some("ctx1"), &["everywhere", "first avatar", "also everywhere"])]
    #[case(Some("ctx2"), &["everywhere", "second avatar", "also everywhere"])]
    #[case(Some("ctx3"), &["everywhere", "also everywhere"])]
    fn visible_keeps_global_and_matching_scope(
        #[case] context: Option<&str>,
        #[case] expected: &[&str],
    ) {
        let commands = fixture();
        let phrases: Vec<&str> = visible(&commands, context)
            .into_iter()
            .map(|command| command.phrase.as_str())
            .collect();
        assert_eq!(phrases, expected);
    }

    #[test]
    fn visible_does_not_filter_on_enabled_state() {
        let commands = fixture();
        assert!(visible(&commands, None)
            .iter()
            .any(|command| !command.enabled));
    }
}
