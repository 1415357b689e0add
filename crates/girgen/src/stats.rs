//! Completeness statistics

use std::fmt;

use crate::source::SourceBlock;

/// Counts of generated functions and of those containing placeholders
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub functions: usize,
    pub todo_functions: usize,
}

impl Stats {
    /// Count one generated function
    pub fn record(&mut self, block: &SourceBlock) {
        self.functions += 1;
        if block.contains_todo() {
            self.todo_functions += 1;
        }
    }

    /// Share of functions with placeholders, 0 when nothing was generated
    pub fn ratio(&self) -> f64 {
        if self.functions == 0 {
            0.0
        } else {
            self.todo_functions as f64 / self.functions as f64
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "todo/all functions: {}/{} ({:.1}%)",
            self.todo_functions,
            self.functions,
            self.ratio() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_ratio() {
        let mut stats = Stats::default();
        assert_eq!(stats.ratio(), 0.0);

        let mut done = SourceBlock::new();
        done.line("pub fn f() {}");
        let mut todo = SourceBlock::new();
        todo.line("pub fn g(x: gi::Todo) {}");

        stats.record(&done);
        stats.record(&done);
        stats.record(&done);
        stats.record(&todo);
        assert_eq!(stats.functions, 4);
        assert_eq!(stats.todo_functions, 1);
        assert_eq!(stats.ratio(), 0.25);
        assert_eq!(stats.to_string(), "todo/all functions: 1/4 (25.0%)");
    }
}
