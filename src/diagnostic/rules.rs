use std::num::IntErrorKind;
use std::sync::OnceLock;

use regex::Regex;

/// Source file names the sandbox ever compiles.
const SOURCE_FILES: &[&str] = &["usercode.c", "usercode.cpp"];

fn compiler_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"usercode(.c|.cpp):(?P<line>\d+):(?P<column>\d+):.+?(?P<message>error:.*$)")
            .expect("compiler line pattern is valid")
    })
}

/// What a rule pulled out of a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Compiler {
        line: u32,
        column: u32,
        message: String,
    },
    Directive {
        message: String,
    },
    Linker {
        line: u32,
        message: String,
    },
}

pub struct Rule {
    pub name: &'static str,
    pub extract: fn(&str) -> Option<Extracted>,
}

/// Evaluated in order against each line; the first hit ends the scan.
pub const RULES: &[Rule] = &[
    Rule {
        name: "compiler",
        extract: compiler_error,
    },
    Rule {
        name: "directive",
        extract: directive_error,
    },
    Rule {
        name: "linker",
        extract: linker_error,
    },
];

/// Applies the rule table line by line, returning the first match.
pub fn first_match(raw: &str) -> Option<(&'static str, Extracted)> {
    raw.split('\n').find_map(|line| {
        RULES
            .iter()
            .find_map(|rule| (rule.extract)(line).map(|found| (rule.name, found)))
    })
}

/// Saturates at `u32::MAX`; anything that is not a number reads as 0.
fn to_number(s: &str) -> u32 {
    match s.trim().parse::<u32>() {
        Ok(n) => n,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => u32::MAX,
        Err(_) => 0,
    }
}

fn compiler_error(line: &str) -> Option<Extracted> {
    let caps = compiler_line_regex().captures(line)?;
    Some(Extracted::Compiler {
        line: to_number(&caps["line"]),
        column: to_number(&caps["column"]),
        message: caps["message"].trim().to_string(),
    })
}

fn directive_error(line: &str) -> Option<Extracted> {
    let (_, message) = line.split_once("#error")?;
    Some(Extracted::Directive {
        message: message.trim().to_string(),
    })
}

fn linker_error(line: &str) -> Option<Extracted> {
    if !line.contains("undefined ") {
        return None;
    }

    let parts: Vec<&str> = line.split(':').collect();
    let message = parts.last().map(|s| s.trim()).unwrap_or_default();
    let names_source = SOURCE_FILES.iter().any(|name| parts[0].contains(name));
    let line_number = match parts.get(1) {
        Some(segment) if names_source => to_number(segment),
        _ => 0,
    };

    Some(Extracted::Linker {
        line: line_number,
        message: message.to_string(),
    })
}
