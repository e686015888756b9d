use std::fmt;

/// Environment variable through which the engine names the capture file.
pub const OUTPUT_ENV: &str = "EXEC_OUTPUT";

/// Directory inside the container where the user program lives.
pub const SANDBOX_DIR: &str = "/tmp/user_code";
pub const INPUT_FILE: &str = "/tmp/user_code/programInput.txt";
pub const BINARY_FILE: &str = "/tmp/user_code/usercode";
pub const TRACE_FILE: &str = "/tmp/user_code/usercode.vgtrace";
pub const RUNTIME_HELPER: &str = "/tmp/parser/wsgi_backend.py";

/// Warnings off, debug info on, no optimisation, frame pointers kept.
pub const COMPILE_FLAGS: &[&str] = &["-w", "-ggdb", "-O0", "-fno-omit-frame-pointer"];

/// A single shell command with typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `mv <file> <dir>/<file>`
    Relocate { file: String, dir: &'static str },
    /// `echo "<text>" > <path>`; `text` must already be sanitized.
    WriteInput { text: String, path: &'static str },
    /// `<compiler> <flags> -o <output> <source> 2> $OUTPUT`
    Compile {
        compiler: &'static str,
        source: String,
        output: &'static str,
    },
    /// `python3 <helper> <language> > $OUTPUT`
    RunHelper { language: &'static str },
    /// `cat <trace> > $OUTPUT`
    DumpTrace,
}

/// How a statement is chained to what came before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Always runs.
    Then(Statement),
    /// Runs only while the capture file is still empty.
    UnlessCaptured(Statement),
}

/// Ordered list of shell steps, rendered into one `sh -c` script.
///
/// Steps are joined with `; `, so a guard only applies to its own step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, statement: Statement) -> Self {
        self.steps.push(Step::Then(statement));
        self
    }

    pub fn unless_captured(mut self, statement: Statement) -> Self {
        self.steps.push(Step::UnlessCaptured(statement));
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Relocate { file, dir } => write!(f, "mv {file} {dir}/{file}"),
            Statement::WriteInput { text, path } => write!(f, "echo \"{text}\" > {path}"),
            Statement::Compile {
                compiler,
                source,
                output,
            } => write!(
                f,
                "{compiler} {} -o {output} {SANDBOX_DIR}/{source} 2> ${OUTPUT_ENV}",
                COMPILE_FLAGS.join(" ")
            ),
            Statement::RunHelper { language } => {
                write!(f, "python3 {RUNTIME_HELPER} {language} > ${OUTPUT_ENV}")
            }
            Statement::DumpTrace => write!(f, "cat {TRACE_FILE} > ${OUTPUT_ENV}"),
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            match step {
                Step::Then(statement) => write!(f, "{statement}")?,
                Step::UnlessCaptured(statement) => {
                    write!(f, "[ -s \"${{{OUTPUT_ENV}}}\" ] || {statement}")?
                }
            }
        }
        Ok(())
    }
}
