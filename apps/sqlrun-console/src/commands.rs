/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sql(String),
    Tables,
    Describe(String),
    History,
    HistoryClear,
    Rerun(usize),
    Health,
    Log,
    Help,
    Quit,
    Invalid(String),
}

pub const HELP: &str = "\
Enter SQL to run it against the backend.

  \\tables            list tables
  \\describe <table>  show columns and sample rows
  \\history           show recent queries (newest first)
  \\history clear     forget recent queries
  \\rerun <n>         run entry n of \\history again
  \\health            check the backend
  \\log               show recent log entries
  \\help              show this text
  \\q                 quit";

impl Command {
    /// `None` for blank lines.
    pub fn parse(line: &str) -> Option<Command> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('\\') else {
            return Some(Command::Sql(line.to_string()));
        };
        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.collect::<Vec<_>>().join(" ");
        let cmd = match (name, arg.as_str()) {
            ("tables" | "dt", "") => Command::Tables,
            ("describe" | "d", "") => Command::Invalid("usage: \\describe <table>".into()),
            ("describe" | "d", table) => Command::Describe(table.to_string()),
            ("history", "") => Command::History,
            ("history", "clear") => Command::HistoryClear,
            ("rerun", n) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Command::Rerun(n),
                _ => Command::Invalid("usage: \\rerun <n>, n from \\history".into()),
            },
            ("health", "") => Command::Health,
            ("log", "") => Command::Log,
            ("help" | "?", "") => Command::Help,
            ("q" | "quit", "") => Command::Quit,
            _ => Command::Invalid(format!("unknown command \\{rest}; try \\help")),
        };
        Some(cmd)
    }
}
