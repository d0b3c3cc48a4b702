pub mod backup;
pub mod fetch;
pub mod restore;

use jiff::Zoned;
use jiff::civil::{Date, Time};

use pmb::{Config, Gpg};

use crate::Invocation;

/// Requested day and time, defaulting to today and the end of the day.
fn point_in_time(invocation: &Invocation) -> (Date, Time) {
    let date = invocation
        .date
        .unwrap_or_else(|| Zoned::now().datetime().date());
    let time = invocation
        .time
        .unwrap_or_else(|| jiff::civil::time(23, 59, 0, 0));
    (date, time)
}

fn signer(config: &Config) -> Gpg {
    Gpg::new(&config.tools.gpg, config.encryption.key_id.clone())
}
