use log::{LevelFilter, SetLoggerError};

/// Log dispatch writing `[LEVEL target] message` lines. Nothing is attached as output yet.
pub fn dispatch(level: LevelFilter) -> fern::Dispatch {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        // The SQL parser is chatty at debug level.
        .level_for("sqlparser", LevelFilter::Warn)
}

/// Installs the process-wide logger, writing to stderr. Only binaries call this.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    dispatch(level).chain(std::io::stderr()).apply()
}
