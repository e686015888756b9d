mod script;

pub use script::{
    BINARY_FILE, INPUT_FILE, OUTPUT_ENV, SANDBOX_DIR, Script, Statement, Step, TRACE_FILE,
};

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CaptureMode;

/// Single toolchain image used for every language.
pub const DEFAULT_IMAGE: &str = "gcc-compiler:latest";
pub const TASK_NAME: &str = "execute code";
pub const TASK_TIMEOUT: Duration = Duration::from_secs(20);
pub const CPU_LIMIT: &str = "1";
pub const MEMORY_LIMIT: &str = "1000m";

/// Client payload for `POST /execute`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cpp,
}

impl Language {
    pub fn parse(raw: &str) -> Result<Self, TaskError> {
        match raw.trim() {
            "" => Err(TaskError::MissingLanguage),
            "c" => Ok(Self::C),
            "c++" => Ok(Self::Cpp),
            _ => Err(TaskError::UnknownLanguage(raw.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cpp => "c++",
        }
    }

    pub fn compiler(self) -> &'static str {
        match self {
            Self::C => "gcc",
            Self::Cpp => "g++",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::C => "usercode.c",
            Self::Cpp => "usercode.cpp",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("require: language")]
    MissingLanguage,
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub cpus: String,
    pub memory: String,
}

/// Descriptor handed to the execution engine.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTask {
    pub name: String,
    pub image: String,
    pub filename: String,
    pub compiler: String,
    pub run: String,
    #[serde(serialize_with = "serialize_timeout")]
    pub timeout: Duration,
    pub limits: Limits,
    pub files: BTreeMap<String, String>,
}

impl ExecutionTask {
    /// Timeout in the engine's duration syntax, e.g. `20s`.
    pub fn timeout_spec(&self) -> String {
        format!("{}s", self.timeout.as_secs())
    }
}

fn serialize_timeout<S: serde::Serializer>(timeout: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{}s", timeout.as_secs()))
}

/// Turns validated requests into execution tasks.
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    image: String,
    mode: CaptureMode,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE, CaptureMode::Run)
    }
}

impl TaskBuilder {
    pub fn new(image: impl Into<String>, mode: CaptureMode) -> Self {
        Self {
            image: image.into(),
            mode,
        }
    }

    /// Builds the script model without rendering it.
    ///
    /// `input` is embedded verbatim, so callers must have run it through
    /// [`crate::sanitize::validate`] first.
    pub fn script(&self, language: Language, input: &str) -> Script {
        let file_name = language.file_name();
        let after_compile = match self.mode {
            CaptureMode::Run => Statement::RunHelper {
                language: language.name(),
            },
            CaptureMode::Trace => Statement::DumpTrace,
        };

        Script::new()
            .then(Statement::Relocate {
                file: file_name.to_string(),
                dir: SANDBOX_DIR,
            })
            .then(Statement::WriteInput {
                text: input.to_string(),
                path: INPUT_FILE,
            })
            .then(Statement::Compile {
                compiler: language.compiler(),
                source: file_name.to_string(),
                output: BINARY_FILE,
            })
            .unless_captured(after_compile)
    }

    pub fn build(&self, request: &ExecRequest) -> Result<ExecutionTask, TaskError> {
        let language = Language::parse(&request.language)?;
        let filename = language.file_name().to_string();

        let mut files = BTreeMap::new();
        files.insert(filename.clone(), request.code.clone());

        Ok(ExecutionTask {
            name: TASK_NAME.to_string(),
            image: self.image.clone(),
            filename,
            compiler: language.compiler().to_string(),
            run: self.script(language, &request.input).render(),
            timeout: TASK_TIMEOUT,
            limits: Limits {
                cpus: CPU_LIMIT.to_string(),
                memory: MEMORY_LIMIT.to_string(),
            },
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(language: &str) -> ExecRequest {
        ExecRequest {
            code: "int main(void) { return 0; }".to_string(),
            language: language.to_string(),
            input: "1 2 3".to_string(),
        }
    }

    #[test]
    fn missing_language_is_rejected() {
        let err = TaskBuilder::default().build(&request("  ")).unwrap_err();
        assert_eq!(err, TaskError::MissingLanguage);
        assert!(err.to_string().contains("language"));
    }

    #[test]
    fn unknown_language_is_rejected() {
        let err = TaskBuilder::default().build(&request("java")).unwrap_err();
        assert_eq!(err.to_string(), "unknown language: java");
    }

    #[test]
    fn language_is_trimmed() {
        let task = TaskBuilder::default().build(&request(" c++\n")).unwrap();
        assert_eq!(task.compiler, "g++");
    }

    #[test]
    fn c_task_uses_gcc() {
        let task = TaskBuilder::default().build(&request("c")).unwrap();
        assert_eq!(task.filename, "usercode.c");
        assert_eq!(task.compiler, "gcc");
        assert_eq!(task.image, DEFAULT_IMAGE);
        assert_eq!(
            task.run,
            "mv usercode.c /tmp/user_code/usercode.c; \
             echo \"1 2 3\" > /tmp/user_code/programInput.txt; \
             gcc -w -ggdb -O0 -fno-omit-frame-pointer -o /tmp/user_code/usercode /tmp/user_code/usercode.c 2> $EXEC_OUTPUT; \
             [ -s \"${EXEC_OUTPUT}\" ] || python3 /tmp/parser/wsgi_backend.py c > $EXEC_OUTPUT"
        );
    }

    #[test]
    fn cpp_task_uses_gxx() {
        let task = TaskBuilder::default().build(&request("c++")).unwrap();
        assert_eq!(task.filename, "usercode.cpp");
        assert_eq!(task.compiler, "g++");
        assert!(task.run.starts_with("mv usercode.cpp /tmp/user_code/usercode.cpp; "));
        assert!(task.run.contains("g++ -w"));
        assert!(task.run.ends_with("wsgi_backend.py c++ > $EXEC_OUTPUT"));
    }

    #[test]
    fn policy_limits_are_fixed() {
        let task = TaskBuilder::default().build(&request("c")).unwrap();
        assert_eq!(task.timeout, Duration::from_secs(20));
        assert_eq!(task.timeout_spec(), "20s");
        assert_eq!(task.limits.cpus, "1");
        assert_eq!(task.limits.memory, "1000m");
        assert_eq!(task.name, "execute code");
    }

    #[test]
    fn source_code_is_materialized_unmodified() {
        let mut req = request("c");
        req.code = "#include <stdio.h>\nint main() { puts(\"$HOME `x`\"); }".to_string();
        let task = TaskBuilder::default().build(&req).unwrap();
        assert_eq!(task.files.len(), 1);
        assert_eq!(task.files["usercode.c"], req.code);
        assert!(!task.run.contains("$HOME"));
    }

    #[test]
    fn build_is_deterministic() {
        let builder = TaskBuilder::default();
        let req = request("c++");
        assert_eq!(builder.build(&req).unwrap(), builder.build(&req).unwrap());
    }

    #[test]
    fn script_steps_follow_compile_then_guarded_helper() {
        let script = TaskBuilder::default().script(Language::C, "");
        let steps = script.steps();
        assert_eq!(steps.len(), 4);
        assert!(matches!(&steps[0], Step::Then(Statement::Relocate { file, .. }) if file == "usercode.c"));
        assert!(matches!(&steps[1], Step::Then(Statement::WriteInput { text, .. }) if text.is_empty()));
        assert!(matches!(
            &steps[2],
            Step::Then(Statement::Compile { compiler: "gcc", .. })
        ));
        assert_eq!(
            steps[3],
            Step::UnlessCaptured(Statement::RunHelper { language: "c" })
        );
    }

    #[test]
    fn trace_mode_dumps_trace_file() {
        let builder = TaskBuilder::new(DEFAULT_IMAGE, CaptureMode::Trace);
        let task = builder.build(&request("c")).unwrap();
        assert!(
            task.run
                .ends_with("[ -s \"${EXEC_OUTPUT}\" ] || cat /tmp/user_code/usercode.vgtrace > $EXEC_OUTPUT")
        );
    }

    #[test]
    fn descriptor_serializes_timeout_as_duration_string() {
        let task = TaskBuilder::default().build(&request("c")).unwrap();
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["timeout"], "20s");
        assert_eq!(value["limits"]["memory"], "1000m");
    }
}
