use log::{Level, LevelFilter, Metadata, Record};

/// Plain stderr logger; messages stay on stderr so card lists written to
/// stdout remain pipeable.
pub struct StderrLogger {
    max_level: LevelFilter,
}

impl StderrLogger {
    pub fn init(verbose: bool) -> Result<(), log::SetLoggerError> {
        let max_level = if verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Warn
        };
        log::set_boxed_logger(Box::new(StderrLogger { max_level }))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if record.level() <= Level::Warn {
                eprintln!("{}: {}", record.level(), record.args());
            } else {
                eprintln!("{}", record.args());
            }
        }
    }

    fn flush(&self) {}
}
