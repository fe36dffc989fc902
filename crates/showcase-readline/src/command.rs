//! REPL input parsing.

use showcase_interaction::PromptTemplate;

/// Completion candidates, in the order `/help` lists them.
pub const COMMANDS: &[&str] = &[
    "/clear",
    "/history",
    "/generate",
    "/image",
    "/signout",
    "/help",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Plain text sent to the chat.
    Say(String),
    Clear,
    History,
    Generate { template: PromptTemplate, input: String },
    /// Image generation; the description may be empty (rejected later).
    Image(String),
    SignOut,
    Help,
    Quit,
    /// Anything that could not be parsed; the text is shown to the user.
    Invalid(String),
}

impl Command {
    /// Parses one line of input. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed == "quit" || trimmed == "exit" {
            return Some(Command::Quit);
        }
        if !trimmed.starts_with('/') {
            return Some(Command::Say(trimmed.to_string()));
        }

        let (name, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (trimmed, ""),
        };

        let command = match name {
            "/clear" => Command::Clear,
            "/history" => Command::History,
            "/signout" => Command::SignOut,
            "/help" => Command::Help,
            "/generate" => Self::parse_generate(rest),
            "/image" => Command::Image(rest.to_string()),
            other => Command::Invalid(format!("Unknown command: {}", other)),
        };
        Some(command)
    }

    fn parse_generate(args: &str) -> Self {
        let (template, input) = match args.split_once(char::is_whitespace) {
            Some((template, input)) => (template, input.trim()),
            None => (args, ""),
        };
        if template.is_empty() {
            return Command::Invalid("Usage: /generate <template> <text>".to_string());
        }

        match template.parse::<PromptTemplate>() {
            Ok(template) => Command::Generate {
                template,
                input: input.to_string(),
            },
            Err(err) => Command::Invalid(err.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent() {
        assert_eq!(
            Command::parse("  hello there \n"),
            Some(Command::Say("hello there".to_string()))
        );
        assert_eq!(Command::parse("   "), None);
    }

    #[test]
    fn test_builtin_commands() {
        assert_eq!(Command::parse("/clear"), Some(Command::Clear));
        assert_eq!(Command::parse("/history"), Some(Command::History));
        assert_eq!(Command::parse("/signout"), Some(Command::SignOut));
        assert_eq!(Command::parse("exit"), Some(Command::Quit));
        assert!(matches!(
            Command::parse("/nope"),
            Some(Command::Invalid(message)) if message.contains("/nope")
        ));
    }

    #[test]
    fn test_generate_takes_template_and_text() {
        assert_eq!(
            Command::parse("/generate poem  the sea at night"),
            Some(Command::Generate {
                template: PromptTemplate::Poem,
                input: "the sea at night".to_string(),
            })
        );
    }

    #[test]
    fn test_image_takes_whole_description() {
        assert_eq!(
            Command::parse("/image  Futuristic city skyline at sunset "),
            Some(Command::Image("Futuristic city skyline at sunset".to_string()))
        );
        assert_eq!(Command::parse("/image"), Some(Command::Image(String::new())));
    }

    #[test]
    fn test_generate_rejects_unknown_template() {
        assert!(matches!(
            Command::parse("/generate limerick cats"),
            Some(Command::Invalid(_))
        ));
        assert!(matches!(
            Command::parse("/generate"),
            Some(Command::Invalid(message)) if message.starts_with("Usage")
        ));
    }
}
