use console::style;

/// Styled terminal output for command results; logging goes through `tracing`
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Aligned `label: value` line
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<12} {}", style(format!("{}:", label)).dim(), value);
    }

    /// Existence marker next to a path-like value
    pub fn presence(&self, label: &str, value: impl std::fmt::Display, exists: bool) {
        let mark = if exists {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("  {:<8} {} {}", format!("{}:", label), mark, value);
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
