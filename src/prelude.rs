#![allow(unused_imports)]

pub use tracing::{Level, debug, error, info, instrument, trace, warn};

pub use crate::error::{Error, FetchError};

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
