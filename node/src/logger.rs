//! Structured logging setup, following the teacher's `slog` + `slog-async` +
//! `slog-term` + `slog-envlogger` stack: a terminal drain wrapped in an
//! async channel, filtered by `RUST_LOG` (spec.md §1 ambient logging).

use slog::{o, Drain, Logger};

pub fn build_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let term_drain = slog_term::FullFormat::new(decorator).build().fuse();
    let envlogger_drain = slog_envlogger::new(term_drain);
    let async_drain = slog_async::Async::new(envlogger_drain).build().fuse();
    Logger::root(async_drain, o!("component" => "indexer-node"))
}
