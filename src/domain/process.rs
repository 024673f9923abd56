//! Process descriptors

use serde::Serialize;
use std::path::{Path, PathBuf};

/// A ready-to-launch external process
///
/// Descriptors are built once by a stage and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessDescriptor {
    executable: PathBuf,
    arguments: Vec<String>,
    working_directory: PathBuf,
    expected_exit_code: i32,
}

impl ProcessDescriptor {
    /// Create a descriptor that expects exit code 0
    pub fn new(
        executable: impl Into<PathBuf>,
        arguments: Vec<String>,
        working_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executable: executable.into(),
            arguments,
            working_directory: working_directory.into(),
            expected_exit_code: 0,
        }
    }

    /// Program to run
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments in launch order
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Directory the process runs in
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Exit code that counts as success
    pub fn expected_exit_code(&self) -> i32 {
        self.expected_exit_code
    }

    /// Human readable command line
    pub fn command_line(&self) -> String {
        let mut parts = vec![quote(&self.executable.display().to_string())];
        parts.extend(self.arguments.iter().map(|a| quote(a)));
        parts.join(" ")
    }
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_expects_zero() {
        let d = ProcessDescriptor::new("java", vec!["-version".to_string()], "/tmp");
        assert_eq!(d.expected_exit_code(), 0);
        assert_eq!(d.executable(), Path::new("java"));
        assert_eq!(d.arguments(), ["-version"]);
        assert_eq!(d.working_directory(), Path::new("/tmp"));
    }

    #[test]
    fn test_command_line_quotes_spaces() {
        let d = ProcessDescriptor::new(
            "java",
            vec!["-cp".to_string(), "/my tools/a.jar".to_string()],
            "/tmp",
        );
        assert_eq!(d.command_line(), "java -cp \"/my tools/a.jar\"");
    }
}
