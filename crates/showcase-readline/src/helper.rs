use std::borrow::Cow::{self, Borrowed, Owned};

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use showcase_interaction::PromptTemplate;

use crate::command::COMMANDS;

/// Rustyline helper: command completion, highlighting and inline hints.
///
/// After `/generate ` the template names are completed as well.
#[derive(Clone)]
pub struct ReplHelper {
    commands: Vec<String>,
    templates: Vec<String>,
}

impl ReplHelper {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|cmd| cmd.to_string()).collect(),
            templates: PromptTemplate::all()
                .iter()
                .map(|template| template.as_str().to_string())
                .collect(),
        }
    }

    fn matching<'a>(candidates: &'a [String], prefix: &'a str) -> impl Iterator<Item = &'a String> {
        candidates.iter().filter(move |candidate| candidate.starts_with(prefix))
    }
}

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        let to_pair = |candidate: &String| Pair {
            display: candidate.clone(),
            replacement: candidate.clone(),
        };

        if let Some(partial) = line.strip_prefix("/generate ") {
            if partial.contains(' ') {
                return Ok((pos, vec![]));
            }
            let candidates = Self::matching(&self.templates, partial).map(to_pair).collect();
            return Ok((line.len() - partial.len(), candidates));
        }

        if line.starts_with('/') && !line.contains(' ') {
            let candidates = Self::matching(&self.commands, line).map(to_pair).collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            Self::matching(&self.commands, line)
                .find(|cmd| cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for ReplHelper {}
