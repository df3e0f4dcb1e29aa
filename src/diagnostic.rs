use serde::Serialize;

use crate::span::Span;

/// A compiler diagnostic (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    fn report<'a>(
        &'a self,
        filename: &'a str,
        colored: bool,
    ) -> ariadne::Report<'a, (&'a str, std::ops::Range<usize>)> {
        use ariadne::{Color, Config, Label, Report, ReportKind};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_config(Config::default().with_color(colored))
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.range()))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report.finish()
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        let _ = self
            .report(filename, true)
            .eprint((filename, ariadne::Source::from(source)));
    }

    /// Render without colors into a string (used for reports and tests).
    pub fn render_to_string(&self, filename: &str, source: &str) -> String {
        let mut buf = Vec::new();
        let _ = self
            .report(filename, false)
            .write((filename, ariadne::Source::from(source)), &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(0, 10, 15);
        let d = Diagnostic::error("unsupported syntax".to_string(), span);
        assert_eq!(d.severity, Severity::Error);
        assert!(d.is_error());
        assert_eq!(d.message, "unsupported syntax");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_warning_construction() {
        let d = Diagnostic::warning("function skipped".to_string(), Span::dummy());
        assert_eq!(d.severity, Severity::Warning);
        assert!(!d.is_error());
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::warning("hint".to_string(), Span::new(0, 0, 5))
            .with_note("note 1".to_string())
            .with_help("help text".to_string())
            .with_note("note 2".to_string());
        assert_eq!(d.notes, vec!["note 1".to_string(), "note 2".to_string()]);
        assert_eq!(d.help.as_deref(), Some("help text"));
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "function f() {\n  with (x) {}\n}\n";
        let d = Diagnostic::error("'with' is not supported".to_string(), Span::new(0, 17, 28))
            .with_note("the function is emitted unchanged".to_string());
        d.render("test.js", source);
        render_diagnostics(&[d], "test.js", source);
    }

    #[test]
    fn test_render_to_string_contains_message() {
        let source = "let a = 1;\n";
        let d = Diagnostic::error("bad binding".to_string(), Span::new(0, 4, 5))
            .with_help("rename it".to_string());
        let text = d.render_to_string("a.js", source);
        assert!(text.contains("bad binding"));
        assert!(text.contains("rename it"));
    }

    #[test]
    fn test_serializes_to_json() {
        let d = Diagnostic::warning("skipped".to_string(), Span::new(0, 1, 2));
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"severity\":\"warning\""));
        assert!(json.contains("\"start\":1"));
    }
}
