use std::fmt::{self, Write};

#[cfg(feature = "colorized_output")]
use console::style;

/// Validation check result status
#[derive(Debug, Clone, PartialEq)]
pub enum CheckStatus {
    /// Check passed
    Ok,
    /// Check passed with warnings
    Warning(String),
    /// Check failed
    Failed(String),
}

impl CheckStatus {
    fn is_ok(&self) -> bool {
        matches!(self, CheckStatus::Ok)
    }

    fn is_warning(&self) -> bool {
        matches!(self, CheckStatus::Warning(_))
    }

    fn is_failed(&self) -> bool {
        matches!(self, CheckStatus::Failed(_))
    }

    fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "✓",
            CheckStatus::Warning(_) => "⚠",
            CheckStatus::Failed(_) => "✗",
        }
    }

    fn detail(&self) -> Option<(&'static str, &str)> {
        match self {
            CheckStatus::Ok => None,
            CheckStatus::Warning(msg) => Some(("WARNING", msg)),
            CheckStatus::Failed(msg) => Some(("FAILED", msg)),
        }
    }
}

/// Individual validation check result
#[derive(Debug, Clone)]
pub struct ValidationCheck {
    /// Name of the validation check
    pub name: String,
    /// Result status of the check
    pub status: CheckStatus,
}

impl ValidationCheck {
    pub(crate) fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Ok,
        }
    }

    pub(crate) fn warning(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Warning(message.into()),
        }
    }

    pub(crate) fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Failed(message.into()),
        }
    }
}

/// Text styling applied while rendering a report
#[derive(Clone, Copy)]
enum Paint {
    Plain,
    #[cfg(feature = "colorized_output")]
    Colored,
}

impl Paint {
    fn title(self, s: &str) -> String {
        match self {
            Paint::Plain => s.to_string(),
            #[cfg(feature = "colorized_output")]
            Paint::Colored => style(s).bold().cyan().to_string(),
        }
    }

    fn status(self, status: &CheckStatus, s: &str) -> String {
        match self {
            Paint::Plain => s.to_string(),
            #[cfg(feature = "colorized_output")]
            Paint::Colored => match status {
                CheckStatus::Ok => style(s).green().to_string(),
                CheckStatus::Warning(_) => style(s).yellow().to_string(),
                CheckStatus::Failed(_) => style(s).red().to_string(),
            },
        }
    }

    fn strong(self, status: &CheckStatus, s: &str) -> String {
        match self {
            Paint::Plain => s.to_string(),
            #[cfg(feature = "colorized_output")]
            Paint::Colored => style(self.status(status, s)).bold().to_string(),
        }
    }
}

/// Complete validation report for a STAR file
#[derive(Debug)]
pub struct ValidationReport {
    /// List of individual validation check results
    pub checks: Vec<ValidationCheck>,
    /// Path of the file that was validated
    pub file_path: String,
}

impl ValidationReport {
    /// Create a new validation report for the given file path
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            checks: Vec::new(),
            file_path: file_path.into(),
        }
    }

    /// Add a validation check result to the report
    pub fn add_check(&mut self, check: ValidationCheck) {
        self.checks.push(check);
    }

    /// Look up a check by name prefix
    pub fn check(&self, name: &str) -> Option<&ValidationCheck> {
        self.checks.iter().find(|c| c.name.starts_with(name))
    }

    /// Whether any check failed
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Whether any check produced a warning
    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    /// Number of passed checks
    pub fn success_count(&self) -> usize {
        self.count(CheckStatus::is_ok)
    }

    /// Number of warnings
    pub fn warning_count(&self) -> usize {
        self.count(CheckStatus::is_warning)
    }

    /// Number of failures
    pub fn failure_count(&self) -> usize {
        self.count(CheckStatus::is_failed)
    }

    fn count(&self, pred: fn(&CheckStatus) -> bool) -> usize {
        self.checks.iter().filter(|c| pred(&c.status)).count()
    }

    /// Status standing for the whole report
    fn overall(&self) -> CheckStatus {
        if self.has_failures() {
            CheckStatus::Failed(String::new())
        } else if self.has_warnings() {
            CheckStatus::Warning(String::new())
        } else {
            CheckStatus::Ok
        }
    }

    /// Format the report with colors when the `colorized_output` feature is on
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            self.render(Paint::Colored)
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            self.render(Paint::Plain)
        }
    }

    fn render(&self, paint: Paint) -> String {
        let mut out = String::new();
        let title = "STAR Validation Report";
        // Writing to a String cannot fail
        let _ = writeln!(out, "{}", paint.title(title));
        let _ = writeln!(out, "{}", paint.title(&"=".repeat(title.len())));
        let _ = writeln!(out, "File: {}", self.file_path);
        out.push('\n');

        for check in &self.checks {
            let status = &check.status;
            let _ = write!(
                out,
                "[{}] {}",
                paint.status(status, status.symbol()),
                paint.status(status, &check.name)
            );
            match status.detail() {
                Some((tag, msg)) => {
                    let _ = writeln!(out, " - {}: {}", paint.strong(status, tag), msg);
                }
                None => out.push('\n'),
            }
        }

        let _ = writeln!(
            out,
            "\nSummary: {} passed, {} warnings, {} failed\n",
            self.success_count(),
            self.warning_count(),
            self.failure_count()
        );

        let overall = self.overall();
        let verdict = match overall {
            CheckStatus::Ok => "Validation PASSED",
            CheckStatus::Warning(_) => "Validation PASSED with warnings",
            CheckStatus::Failed(_) => "Validation FAILED",
        };
        let _ = writeln!(out, "{}", paint.strong(&overall, verdict));
        out
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Paint::Plain))
    }
}
