pub mod error;
pub mod kernel;
pub mod list;
pub mod random;
pub mod stats;

pub use error::SimError;

pub type Result<T> = std::result::Result<T, SimError>;

/// dimensional analysis types
pub type Time = f64;
pub type ProcessId = u64;

/// initialize terminal logging for demos and embedders
pub fn init() {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("initialize logger");
}
